//! Node containers: array-of-structures internal nodes and the
//! structure-of-arrays leaf layout.
//!
//! Internal levels stay in branch-record form because the host descends them
//! one branch at a time. The leaf level is additionally transposed into
//! [`NodeSoa`] records so the parallel scan reads each coordinate component
//! with uniform stride across all branch slots of a node.

use crate::branch::Branch;
use crate::types::Rect;

/// Whether a node sits at the leaf level or above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Holds branches that reference child nodes.
    Internal,
    /// Holds branches that reference payloads.
    Leaf,
}

/// A fixed-capacity ordered sequence of branches.
///
/// Capacity is the tree degree; the last node of a level may be partially
/// filled. Child references are arena indices into the tree's flat node
/// array, identical in memory and in the index file.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<const D: usize> {
    /// Level tag for this node.
    pub kind: NodeKind,
    /// Branches in Hilbert order, at most `degree` of them.
    pub branches: Vec<Branch<D>>,
}

impl<const D: usize> Node<D> {
    /// Number of branches held.
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }
}

/// One leaf node's branches in structure-of-arrays form.
///
/// Coordinates are stored dimension-major: the lows of dimension `d` occupy
/// `low[d * len .. (d + 1) * len]`, so lane `slot` of a parallel scan reads
/// `low[d * len + slot]` for every dimension with the same stride. The
/// transform is lossless; [`NodeSoa::branch`] reconstructs the original
/// record.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSoa<const D: usize> {
    len: usize,
    low: Vec<f32>,
    high: Vec<f32>,
    ordinal: Vec<u64>,
    payload: Vec<u32>,
}

impl<const D: usize> NodeSoa<D> {
    /// Transpose one node's worth of leaf branches.
    pub fn from_branches(branches: &[Branch<D>]) -> Self {
        let len = branches.len();
        let mut low = vec![0.0f32; D * len];
        let mut high = vec![0.0f32; D * len];
        let mut ordinal = vec![0u64; len];
        let mut payload = vec![0u32; len];

        for (slot, branch) in branches.iter().enumerate() {
            for dim in 0..D {
                low[dim * len + slot] = branch.rect.low.coord(dim);
                high[dim * len + slot] = branch.rect.high.coord(dim);
            }
            ordinal[slot] = branch.ordinal;
            payload[slot] = branch.child;
        }

        Self {
            len,
            low,
            high,
            ordinal,
            payload,
        }
    }

    /// Number of branch slots in this record.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the record holds no branches.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the branch in `slot` overlaps `query`.
    #[inline]
    pub fn is_overlap(&self, query: &Rect<D>, slot: usize) -> bool {
        for dim in 0..D {
            let idx = dim * self.len + slot;
            if self.low[idx] > query.high.coord(dim) || self.high[idx] < query.low.coord(dim) {
                return false;
            }
        }
        true
    }

    /// Leaf ordinal of the branch in `slot`.
    #[inline]
    pub fn ordinal(&self, slot: usize) -> u64 {
        self.ordinal[slot]
    }

    /// Payload identifier of the branch in `slot`.
    pub fn payload(&self, slot: usize) -> u32 {
        self.payload[slot]
    }

    /// Reconstruct the branch record in `slot`.
    pub fn branch(&self, slot: usize) -> Branch<D> {
        let mut low = [0.0f32; D];
        let mut high = [0.0f32; D];
        for dim in 0..D {
            low[dim] = self.low[dim * self.len + slot];
            high[dim] = self.high[dim * self.len + slot];
        }
        Branch {
            rect: Rect {
                low: crate::types::Point(low),
                high: crate::types::Point(high),
            },
            key: 0,
            ordinal: self.ordinal[slot],
            child: self.payload[slot],
        }
    }

    pub(crate) fn from_raw_parts(
        len: usize,
        low: Vec<f32>,
        high: Vec<f32>,
        ordinal: Vec<u64>,
        payload: Vec<u32>,
    ) -> Self {
        Self {
            len,
            low,
            high,
            ordinal,
            payload,
        }
    }

    pub(crate) fn raw_parts(&self) -> (usize, &[f32], &[f32], &[u64], &[u32]) {
        (
            self.len,
            &self.low,
            &self.high,
            &self.ordinal,
            &self.payload,
        )
    }
}

/// Transpose the whole leaf level into SOA records of `degree` branches.
///
/// Hilbert order is preserved: record `i` holds branches
/// `i * degree .. (i + 1) * degree` of the input, the last record possibly
/// fewer.
pub fn transform_leaves<const D: usize>(branches: &[Branch<D>], degree: usize) -> Vec<NodeSoa<D>> {
    branches.chunks(degree).map(NodeSoa::from_branches).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn leaf_branch(low: [f32; 2], high: [f32; 2], ordinal: u64, payload: u32) -> Branch<2> {
        Branch {
            rect: Rect::new(Point::new(low), Point::new(high)),
            key: 0,
            ordinal,
            child: payload,
        }
    }

    #[test]
    fn test_soa_transform_is_lossless() {
        let branches = vec![
            leaf_branch([0.0, 0.0], [1.0, 1.0], 1, 10),
            leaf_branch([2.0, 3.0], [4.0, 5.0], 2, 11),
            leaf_branch([-1.0, -2.0], [0.0, 0.0], 3, 12),
        ];

        let soa = NodeSoa::from_branches(&branches);
        assert_eq!(soa.len(), 3);
        for (slot, original) in branches.iter().enumerate() {
            let restored = soa.branch(slot);
            assert_eq!(restored.rect, original.rect);
            assert_eq!(restored.ordinal, original.ordinal);
            assert_eq!(restored.child, original.child);
        }
    }

    #[test]
    fn test_soa_overlap_matches_rect_overlap() {
        let branches = vec![
            leaf_branch([0.0, 0.0], [1.0, 1.0], 1, 0),
            leaf_branch([5.0, 5.0], [6.0, 6.0], 2, 1),
        ];
        let soa = NodeSoa::from_branches(&branches);
        let query = Rect::new(Point::new([0.5, 0.5]), Point::new([2.0, 2.0]));

        assert!(soa.is_overlap(&query, 0));
        assert!(!soa.is_overlap(&query, 1));
        for (slot, branch) in branches.iter().enumerate() {
            assert_eq!(soa.is_overlap(&query, slot), branch.rect.overlaps(&query));
        }
    }

    #[test]
    fn test_transform_leaves_grouping() {
        let branches: Vec<Branch<2>> = (0..7)
            .map(|i| leaf_branch([i as f32, 0.0], [i as f32, 1.0], i as u64 + 1, i as u32))
            .collect();

        let records = transform_leaves(&branches, 3);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].len(), 3);
        assert_eq!(records[1].len(), 3);
        assert_eq!(records[2].len(), 1);

        // Hilbert order preserved across record boundaries
        assert_eq!(records[1].ordinal(0), 4);
        assert_eq!(records[2].ordinal(0), 7);
    }

    #[test]
    fn test_transform_empty_leaf_level() {
        let records = transform_leaves::<2>(&[], 4);
        assert!(records.is_empty());
    }
}
