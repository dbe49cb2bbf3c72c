//! The hybrid tree: bulk top-down construction and build orchestration.
//!
//! A tree is built once per dataset and read-only afterwards. Construction
//! runs the full pipeline: branch extraction, Hilbert key assignment, the
//! dual-path sort, bottom-up level construction over contiguous degree-sized
//! groups, and the leaf SOA transform. [`HybridTree::open_or_build`] first
//! tries the index file for the dataset and only rebuilds on a miss, which
//! is the one expected non-fatal branch of the build path.

use crate::branch::{self, Branch};
use crate::error::Result;
use crate::hilbert;
use crate::node::{self, Node, NodeKind, NodeSoa};
use crate::persistence;
use crate::recorder::Recorder;
use crate::sort;
use crate::types::{Point, Rect, TreeConfig};
use log::{info, warn};
use std::path::Path;

/// A bulk-loaded, read-only spatial index over `D`-dimensional data.
///
/// Internal nodes live in a flat breadth-first arena with the root at index
/// 0; child references are arena indices. The leaf level is duplicated in
/// structure-of-arrays form for the parallel scan engine.
///
/// # Example
///
/// ```rust
/// use hybridtree::{HybridTree, Point, Recorder, Rect, TreeConfig};
///
/// let points: Vec<Point<2>> = (0..100)
///     .map(|i| Point::new([i as f32, (i % 10) as f32]))
///     .collect();
/// let config = TreeConfig::default().with_degree(4);
/// let mut recorder = Recorder::default();
/// let tree = HybridTree::build(&points, config, &mut recorder).unwrap();
///
/// assert_eq!(tree.leaf_node_count(), 25);
/// assert!(tree.height() >= 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HybridTree<const D: usize> {
    pub(crate) config: TreeConfig,
    /// Breadth-first node arena, root first. Empty for an empty dataset.
    pub(crate) nodes: Vec<Node<D>>,
    /// Node count per level, root level first.
    pub(crate) level_node_count: Vec<u32>,
    /// Leaf level in SOA form, Hilbert order.
    pub(crate) leaves: Vec<NodeSoa<D>>,
}

impl<const D: usize> HybridTree<D> {
    /// Build a tree over a point dataset.
    pub fn build(points: &[Point<D>], config: TreeConfig, recorder: &mut Recorder) -> Result<Self> {
        let branches = branch::extract_from_points(points);
        Self::build_from_branches(branches, config, recorder)
    }

    /// Build a tree over a rectangle dataset.
    pub fn build_from_rects(
        rects: &[Rect<D>],
        config: TreeConfig,
        recorder: &mut Recorder,
    ) -> Result<Self> {
        let branches = branch::extract_from_rects(rects);
        Self::build_from_branches(branches, config, recorder)
    }

    fn build_from_branches(
        mut branches: Vec<Branch<D>>,
        config: TreeConfig,
        recorder: &mut Recorder,
    ) -> Result<Self> {
        if let Err(err) = config.validate(D) {
            warn!("rejected build configuration: {err}");
            return Err(err);
        }
        recorder.start();

        hilbert::assign_keys(&mut branches, config.hilbert_order);
        sort::sort_branches(&mut branches, config.parallel_sort_threshold);

        // Ordinals are 1-based so that 0 can mean "no candidate" in descent.
        for (pos, branch) in branches.iter_mut().enumerate() {
            branch.ordinal = pos as u64 + 1;
        }

        let leaves = node::transform_leaves(&branches, config.degree);
        let (nodes, level_node_count) = build_levels(branches, config.degree);

        let tree = Self {
            config,
            nodes,
            level_node_count,
            leaves,
        };
        info!(
            "built hybrid tree: height {}, {} nodes ({} leaf), {:?}",
            tree.height(),
            tree.total_node_count(),
            tree.leaf_node_count(),
            recorder.elapsed()
        );
        Ok(tree)
    }

    /// Load the tree from `path`, or build from `points` and dump on a miss.
    ///
    /// A missing index file is not an error; it signals a cold start. Any
    /// other load failure (truncation, layout mismatch, configuration
    /// mismatch) propagates.
    pub fn open_or_build<P: AsRef<Path>>(
        path: P,
        points: &[Point<D>],
        config: TreeConfig,
        recorder: &mut Recorder,
    ) -> Result<Self> {
        let path = path.as_ref();
        if let Some(tree) = Self::load(path, &config)? {
            return Ok(tree);
        }
        info!("no index file at {}, building from scratch", path.display());
        let tree = Self::build(points, config, recorder)?;
        tree.dump(path, recorder)?;
        Ok(tree)
    }

    /// Load a previously dumped tree, verifying it matches `config`.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P, config: &TreeConfig) -> Result<Option<Self>> {
        persistence::load(path.as_ref(), config)
    }

    /// Serialize the tree to an index file at `path`.
    pub fn dump<P: AsRef<Path>>(&self, path: P, recorder: &mut Recorder) -> Result<()> {
        recorder.start();
        persistence::dump(self, path.as_ref())?;
        info!(
            "dumped index file {} in {:?}",
            path.as_ref().display(),
            recorder.elapsed()
        );
        Ok(())
    }

    /// Tree height; 0 for an empty tree.
    pub fn height(&self) -> usize {
        self.level_node_count.len()
    }

    /// Total node count across every level, leaf level included.
    pub fn total_node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaf-level SOA records.
    pub fn leaf_node_count(&self) -> usize {
        self.leaves.len()
    }

    /// Node counts per level, root level first.
    pub fn level_node_count(&self) -> &[u32] {
        &self.level_node_count
    }

    /// Number of indexed data items.
    pub fn item_count(&self) -> usize {
        self.leaves.iter().map(NodeSoa::len).sum()
    }

    /// Whether the tree indexes no data.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The leaf level in SOA form.
    pub fn leaves(&self) -> &[NodeSoa<D>] {
        &self.leaves
    }

    /// The configuration the tree was built under.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }
}

/// Build every level over the sorted leaf branches, bottom level upward,
/// then flatten into a breadth-first arena with the root at index 0.
///
/// Grouping is by contiguous position, never by recomputed keys, so the
/// Hilbert ordering holds at every level and each node's children occupy a
/// contiguous run of the level below.
fn build_levels<const D: usize>(
    leaf_branches: Vec<Branch<D>>,
    degree: usize,
) -> (Vec<Node<D>>, Vec<u32>) {
    if leaf_branches.is_empty() {
        return (Vec::new(), Vec::new());
    }

    // Bottom level: leaf nodes over degree-sized branch groups.
    let mut levels: Vec<Vec<Node<D>>> = Vec::new();
    levels.push(
        leaf_branches
            .chunks(degree)
            .map(|group| Node {
                kind: NodeKind::Leaf,
                branches: group.to_vec(),
            })
            .collect(),
    );

    // Grow internal levels until a single root remains.
    while levels.last().map(Vec::len).unwrap_or(0) > 1 {
        let below = levels.last().unwrap();
        let parent_branches: Vec<Branch<D>> = below
            .iter()
            .enumerate()
            .map(|(pos, child)| summarize(child, pos as u32))
            .collect();
        let level: Vec<Node<D>> = parent_branches
            .chunks(degree)
            .map(|group| Node {
                kind: NodeKind::Internal,
                branches: group.to_vec(),
            })
            .collect();
        levels.push(level);
    }

    // Flatten top-down; child references become arena indices.
    levels.reverse();
    let level_node_count: Vec<u32> = levels.iter().map(|level| level.len() as u32).collect();

    let mut level_start = Vec::with_capacity(levels.len() + 1);
    let mut offset = 0u32;
    for level in &levels {
        level_start.push(offset);
        offset += level.len() as u32;
    }
    level_start.push(offset);

    let mut nodes = Vec::with_capacity(offset as usize);
    for (depth, level) in levels.into_iter().enumerate() {
        let child_base = level_start[depth + 1];
        for mut node in level {
            if node.kind == NodeKind::Internal {
                for branch in &mut node.branches {
                    branch.child += child_base;
                }
            }
            nodes.push(node);
        }
    }

    (nodes, level_node_count)
}

/// One parent branch covering a whole child node.
///
/// The ordinal is the child's last branch ordinal, which is the subtree
/// maximum because ordinals ascend in Hilbert order within every level.
fn summarize<const D: usize>(child: &Node<D>, pos: u32) -> Branch<D> {
    let mut rect = child.branches[0].rect;
    for branch in &child.branches[1..] {
        rect = rect.union(&branch.rect);
    }
    let last = child.branches.last().expect("nodes are never empty");
    Branch {
        rect,
        key: last.key,
        ordinal: last.ordinal,
        child: pos,
    }
}
