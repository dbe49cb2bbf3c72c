//! Branch records and extraction from raw datasets.

use crate::types::{Point, Rect};

/// A bounding rectangle plus the reference it indexes.
///
/// At the leaf level `child` is the payload identifier (the position of the
/// source point or rectangle in the input dataset) and `ordinal` is the
/// branch's 1-based position in Hilbert order. At internal levels `child` is
/// the arena index of the child node and `ordinal` is the largest leaf
/// ordinal in the subtree, which is what the visited-leaf watermark is
/// tested against during descent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branch<const D: usize> {
    /// Bounding rectangle of the referenced subtree or payload.
    pub rect: Rect<D>,
    /// Hilbert curve key derived from the rectangle center.
    pub key: u64,
    /// Leaf ordinal (leaf level) or maximum leaf ordinal below (internal).
    pub ordinal: u64,
    /// Payload identifier (leaf level) or child node index (internal).
    pub child: u32,
}

/// Turn a flat point array into leaf branch records.
///
/// Each point becomes a degenerate rectangle; the payload identifier is the
/// point's position in the input. Keys and ordinals are assigned by the
/// later pipeline stages.
pub fn extract_from_points<const D: usize>(points: &[Point<D>]) -> Vec<Branch<D>> {
    points
        .iter()
        .enumerate()
        .map(|(id, point)| Branch {
            rect: Rect::from_point(*point),
            key: 0,
            ordinal: 0,
            child: id as u32,
        })
        .collect()
}

/// Turn a flat rectangle array into leaf branch records.
pub fn extract_from_rects<const D: usize>(rects: &[Rect<D>]) -> Vec<Branch<D>> {
    rects
        .iter()
        .enumerate()
        .map(|(id, rect)| Branch {
            rect: *rect,
            key: 0,
            ordinal: 0,
            child: id as u32,
        })
        .collect()
}
