//! Hilbert-key ordering of branch records.
//!
//! Small inputs sort on the calling thread; inputs at or above the
//! configured threshold use rayon's stable parallel sort. Both paths are
//! stable ascending by key, so the choice is purely a throughput decision
//! and invisible to callers.

use crate::branch::Branch;
use log::debug;
use rayon::slice::ParallelSliceMut;

/// Sort branches ascending by Hilbert key.
///
/// Stable: branches with equal keys keep their input order. `threshold` is
/// the branch count at which sorting switches to the parallel path.
pub fn sort_branches<const D: usize>(branches: &mut [Branch<D>], threshold: usize) {
    if branches.len() >= threshold {
        debug!("parallel sort of {} branches", branches.len());
        branches.par_sort_by_key(|branch| branch.key);
    } else {
        debug!("sequential sort of {} branches", branches.len());
        branches.sort_by_key(|branch| branch.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Point, Rect};

    fn branch_with_key(key: u64, id: u32) -> Branch<2> {
        Branch {
            rect: Rect::from_point(Point::new([0.0, 0.0])),
            key,
            ordinal: 0,
            child: id,
        }
    }

    #[test]
    fn test_keys_non_decreasing_after_sort() {
        let mut branches: Vec<Branch<2>> = [5u64, 3, 9, 1, 7, 3]
            .iter()
            .enumerate()
            .map(|(id, &key)| branch_with_key(key, id as u32))
            .collect();

        sort_branches(&mut branches, usize::MAX);
        assert!(branches.windows(2).all(|pair| pair[0].key <= pair[1].key));
    }

    #[test]
    fn test_sort_is_stable_on_equal_keys() {
        let mut branches: Vec<Branch<2>> = vec![
            branch_with_key(2, 0),
            branch_with_key(1, 1),
            branch_with_key(2, 2),
            branch_with_key(1, 3),
            branch_with_key(2, 4),
        ];

        sort_branches(&mut branches, usize::MAX);
        let ids: Vec<u32> = branches.iter().map(|b| b.child).collect();
        assert_eq!(ids, vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn test_parallel_path_matches_sequential_order() {
        let keys: Vec<u64> = (0..500).map(|i| (i * 7919) % 251).collect();
        let mut sequential: Vec<Branch<2>> = keys
            .iter()
            .enumerate()
            .map(|(id, &key)| branch_with_key(key, id as u32))
            .collect();
        let mut parallel = sequential.clone();

        sort_branches(&mut sequential, usize::MAX);
        sort_branches(&mut parallel, 0);

        assert_eq!(sequential, parallel);
    }
}
