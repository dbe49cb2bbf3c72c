//! The hybrid traversal protocol: host descent plus chunked parallel scans.
//!
//! Each query runs a continuation loop. The host descends internal nodes
//! depth-first, left to right, pruning subtrees whose maximum leaf ordinal
//! is at or below the visited-leaf watermark or whose box misses the query;
//! the first qualifying leaf branch becomes the scan start. One chunk of
//! leaf records is then scanned in parallel, the watermark jumps past the
//! chunk, and descent repeats until no candidate remains. Only the cheap
//! descent is repeated per round; the leaf array itself was uploaded once.
//!
//! Counters accumulate on the scan engine across the whole batch and are
//! read back once at batch end.

use crate::device::DeviceBuffer;
use crate::node::NodeKind;
use crate::recorder::Recorder;
use crate::tree::HybridTree;
use crate::types::Rect;
use log::{debug, info};
use std::time::Duration;

/// Aggregate results for one query batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchStats {
    /// Number of queries in the batch.
    pub queries: usize,
    /// Total overlapping leaf branches across the batch.
    pub hits: u32,
    /// Nodes visited by host descent across the batch.
    pub node_visits_host: u32,
    /// Leaf records visited by the scan engine across the batch.
    pub node_visits_device: u32,
    /// Average continuation rounds per query.
    pub avg_jump_count: f32,
    /// Wall time for the whole batch.
    pub elapsed: Duration,
}

/// Read-only query orchestrator over a built tree.
///
/// Construction uploads the tree's leaf level into the scan engine; the
/// engine and the tree are then immutable for the serving session, so a
/// `QueryEngine` is safe to share across threads.
#[derive(Debug)]
pub struct QueryEngine<'t, const D: usize> {
    tree: &'t HybridTree<D>,
    device: DeviceBuffer<D>,
}

impl<'t, const D: usize> QueryEngine<'t, D> {
    /// Upload the tree's leaf level and prepare a serving session.
    pub fn new(tree: &'t HybridTree<D>) -> Self {
        let config = tree.config();
        let device = DeviceBuffer::upload(tree.leaves(), config.scan_blocks, config.scan_lanes);
        Self { tree, device }
    }

    /// Run a query batch and return aggregate statistics.
    ///
    /// Queries are processed sequentially; each query's leaf scanning is
    /// parallelized internally. A query overlapping nothing simply ends its
    /// loop with zero hits, it is not an error.
    pub fn search_batch(&self, queries: &[Rect<D>], recorder: &mut Recorder) -> SearchStats {
        recorder.start();
        self.device.reset();

        let degree = self.tree.config().degree;
        let leaf_count = self.tree.leaf_node_count();
        let mut node_visits_host = 0u32;
        let mut total_jumps = 0u64;

        for query in queries {
            if self.tree.is_empty() {
                continue;
            }

            // Chunk shrinking near the array end never carries over; every
            // query starts from the configured chunk size.
            let mut chunk_size = self.tree.config().chunk_size;
            let mut visited_leaf_index = 0u64;
            let mut jumps = 0u64;

            loop {
                let mut visits = 0u32;
                let start_node_index =
                    self.descend(0, query, visited_leaf_index, &mut visits);
                node_visits_host += visits;

                // No unvisited overlapping leaf branch remains.
                if start_node_index == 0 {
                    break;
                }

                let start_offset = ((start_node_index - 1) / degree as u64) as usize;
                if start_offset + chunk_size > leaf_count {
                    chunk_size = leaf_count - start_offset;
                }

                self.device.scan_chunk(query, start_offset, chunk_size);

                visited_leaf_index = ((start_offset + chunk_size) * degree) as u64;
                jumps += 1;
            }

            debug!("query finished after {} continuation rounds", jumps);
            total_jumps += jumps;
        }

        let (hits, node_visits_device) = self.device.read_counters();
        let elapsed = recorder.elapsed();
        let avg_jump_count = if queries.is_empty() {
            0.0
        } else {
            total_jumps as f32 / queries.len() as f32
        };

        info!(
            "batch of {} queries: {} hits, {} host visits, {} device visits, avg jump {:.2}, {:?}",
            queries.len(),
            hits,
            node_visits_host,
            node_visits_device,
            avg_jump_count,
            elapsed
        );

        SearchStats {
            queries: queries.len(),
            hits,
            node_visits_host,
            node_visits_device,
            avg_jump_count,
            elapsed,
        }
    }

    /// Depth-first search for the first leaf branch past the watermark.
    ///
    /// Internal branches qualify when their subtree maximum ordinal exceeds
    /// the watermark and their box overlaps the query; children are explored
    /// left to right and the first leaf-level ordinal found wins. Returns 0
    /// when no candidate exists (ordinals are 1-based).
    fn descend(
        &self,
        node_index: usize,
        query: &Rect<D>,
        visited_leaf_index: u64,
        node_visit_count: &mut u32,
    ) -> u64 {
        *node_visit_count += 1;
        let node = &self.tree.nodes[node_index];

        match node.kind {
            NodeKind::Internal => {
                for branch in &node.branches {
                    if branch.ordinal > visited_leaf_index && branch.rect.overlaps(query) {
                        let found = self.descend(
                            branch.child as usize,
                            query,
                            visited_leaf_index,
                            node_visit_count,
                        );
                        if found > 0 {
                            return found;
                        }
                    }
                }
                0
            }
            NodeKind::Leaf => {
                for branch in &node.branches {
                    if branch.ordinal > visited_leaf_index {
                        return branch.ordinal;
                    }
                }
                0
            }
        }
    }
}
