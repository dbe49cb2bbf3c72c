//! Hilbert curve indexing for branch ordering.
//!
//! Branches are ordered along a D-dimensional Hilbert curve so that siblings
//! grouped by the builder cover spatially close regions. Rectangle centers
//! are quantized to `order` bits per dimension over the dataset's bounding
//! extent and mapped to a scalar curve position with the transpose-form
//! algorithm (Skilling). `D * order` must fit in 64 bits, which the
//! configuration validation enforces up front.

use crate::branch::Branch;
use crate::types::Point;

/// Map quantized coordinates to their Hilbert curve position.
///
/// Coordinates must already be quantized to `order` bits each. The result is
/// a scalar in `0..2^(D * order)`; points adjacent on the curve are adjacent
/// in space.
pub fn hilbert_index<const D: usize>(coords: [u32; D], order: u32) -> u64 {
    debug_assert!(D as u32 * order <= 64, "hilbert key must fit in 64 bits");

    let mut x = coords;
    let m = 1u32 << (order - 1);

    // Inverse undo excess work (transpose form, Skilling 2004)
    let mut q = m;
    while q > 1 {
        let p = q - 1;
        for i in 0..D {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // Gray encode
    for i in 1..D {
        x[i] ^= x[i - 1];
    }
    let mut t = 0u32;
    let mut q = m;
    while q > 1 {
        if x[D - 1] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for coord in x.iter_mut() {
        *coord ^= t;
    }

    // Interleave the transpose-form bits into one scalar, axis 0 first
    let mut key = 0u64;
    for bit in (0..order).rev() {
        for coord in x.iter() {
            key = (key << 1) | u64::from((coord >> bit) & 1);
        }
    }
    key
}

/// Assign Hilbert keys to every branch from its rectangle center.
///
/// Centers are quantized against the bounding extent of all centers in the
/// input, so key assignment is deterministic for a given dataset. Degenerate
/// extents (all centers sharing a coordinate) quantize that dimension to 0.
pub fn assign_keys<const D: usize>(branches: &mut [Branch<D>], order: u32) {
    if branches.is_empty() {
        return;
    }

    let mut low = [f32::INFINITY; D];
    let mut high = [f32::NEG_INFINITY; D];
    for branch in branches.iter() {
        let center = branch.rect.center();
        for dim in 0..D {
            low[dim] = low[dim].min(center.coord(dim));
            high[dim] = high[dim].max(center.coord(dim));
        }
    }

    let max_cell = ((1u64 << order) - 1) as f32;
    for branch in branches.iter_mut() {
        branch.key = hilbert_index(quantize(&branch.rect.center(), &low, &high, max_cell), order);
    }
}

fn quantize<const D: usize>(
    center: &Point<D>,
    low: &[f32; D],
    high: &[f32; D],
    max_cell: f32,
) -> [u32; D] {
    let mut cells = [0u32; D];
    for dim in 0..D {
        let extent = high[dim] - low[dim];
        if extent > 0.0 {
            let unit = (center.coord(dim) - low[dim]) / extent;
            cells[dim] = (unit * max_cell) as u32;
        }
    }
    cells
}
