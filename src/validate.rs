//! Multi-threaded brute-force leaf scan for cross-checking search results.
//!
//! Not part of the serving path. The leaf array is split into disjoint
//! contiguous ranges, one per available host thread; each worker scans its
//! range independently (no shared mutable state), and the per-thread results
//! are concatenated and sorted by ordinal after the join.

use crate::node::NodeSoa;
use crate::types::Rect;
use std::num::NonZeroUsize;
use std::thread;

/// Ordinals of every leaf branch overlapping `query`, ascending.
///
/// The hit count is the length of the returned vector; it must agree with
/// the scan engine's hit counter for the same query.
pub fn scan_leaves<const D: usize>(leaves: &[NodeSoa<D>], query: &Rect<D>) -> Vec<u64> {
    let threads = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(leaves.len().max(1));

    if leaves.is_empty() {
        return Vec::new();
    }

    // First range absorbs the remainder so every record is covered exactly once.
    let per_thread = leaves.len() / threads;
    let remainder = leaves.len() % threads;

    let mut matches: Vec<u64> = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(threads);
        let mut start = 0usize;
        for worker in 0..threads {
            let end = start + per_thread + if worker == 0 { remainder } else { 0 };
            let range = &leaves[start..end];
            handles.push(scope.spawn(move || scan_range(range, query)));
            start = end;
        }
        handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("scan worker panicked"))
            .collect()
    });

    matches.sort_unstable();
    matches
}

fn scan_range<const D: usize>(records: &[NodeSoa<D>], query: &Rect<D>) -> Vec<u64> {
    let mut matches = Vec::new();
    for record in records {
        for slot in 0..record.len() {
            if record.is_overlap(query, slot) {
                matches.push(record.ordinal(slot));
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::Branch;
    use crate::node::transform_leaves;
    use crate::types::Point;

    fn line_records(n: usize, degree: usize) -> Vec<NodeSoa<2>> {
        let branches: Vec<Branch<2>> = (0..n)
            .map(|i| Branch {
                rect: Rect::from_point(Point::new([i as f32, 0.0])),
                key: i as u64,
                ordinal: i as u64 + 1,
                child: i as u32,
            })
            .collect();
        transform_leaves(&branches, degree)
    }

    #[test]
    fn test_scan_finds_expected_ordinals() {
        let records = line_records(50, 4);
        let query = Rect::new(Point::new([10.0, -1.0]), Point::new([14.0, 1.0]));

        let ordinals = scan_leaves(&records, &query);
        assert_eq!(ordinals, vec![11, 12, 13, 14, 15]);
    }

    #[test]
    fn test_scan_results_are_sorted() {
        let records = line_records(200, 8);
        let query = Rect::new(Point::new([-1.0, -1.0]), Point::new([300.0, 1.0]));

        let ordinals = scan_leaves(&records, &query);
        assert_eq!(ordinals.len(), 200);
        assert!(ordinals.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_scan_empty_leaf_array() {
        let query = Rect::new(Point::new([0.0, 0.0]), Point::new([1.0, 1.0]));
        assert!(scan_leaves::<2>(&[], &query).is_empty());
    }

    #[test]
    fn test_scan_no_matches() {
        let records = line_records(30, 4);
        let query = Rect::new(Point::new([100.0, 100.0]), Point::new([200.0, 200.0]));
        assert!(scan_leaves(&records, &query).is_empty());
    }
}
