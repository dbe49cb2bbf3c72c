//! Parallel leaf-scan engine.
//!
//! Models the accelerator side of the hybrid protocol as an explicit device
//! buffer: the leaf SOA array is uploaded once before serving, per-block
//! hit and visit counters live in the buffer for the duration of a search
//! session, and each scan dispatch covers one chunk of leaf records with a
//! fixed grid of blocks striding over the chunk. Counters are reset once
//! per query batch and read back once at batch end; within a dispatch each
//! lane tests one branch slot and the per-lane partials collapse through a
//! pairwise tree reduction before touching the block counter.

use crate::node::NodeSoa;
use crate::types::Rect;
use log::debug;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Leaf records uploaded for scanning plus the session counters.
#[derive(Debug)]
pub struct DeviceBuffer<const D: usize> {
    leaves: Arc<[NodeSoa<D>]>,
    blocks: usize,
    lanes: usize,
    hits: Vec<AtomicU32>,
    visits: Vec<AtomicU32>,
}

impl<const D: usize> DeviceBuffer<D> {
    /// Copy the leaf array into the scan engine, once per serving session.
    ///
    /// `blocks` is the dispatch grid width, `lanes` the branch slots tested
    /// per record (at least the tree degree).
    pub fn upload(leaves: &[NodeSoa<D>], blocks: usize, lanes: usize) -> Self {
        debug!(
            "uploading {} leaf records ({} blocks x {} lanes)",
            leaves.len(),
            blocks,
            lanes
        );
        Self {
            leaves: leaves.to_vec().into(),
            blocks,
            lanes,
            hits: (0..blocks).map(|_| AtomicU32::new(0)).collect(),
            visits: (0..blocks).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Number of uploaded leaf records.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Zero the session counters. Dispatched once per query batch.
    pub fn reset(&self) {
        for block in 0..self.blocks {
            self.hits[block].store(0, Ordering::Relaxed);
            self.visits[block].store(0, Ordering::Relaxed);
        }
    }

    /// Scan `chunk` leaf records starting at `start`, accumulating hit and
    /// visit counts into the per-block session counters.
    ///
    /// The caller clamps `chunk` so the scan never runs past the end of the
    /// leaf array. Block `b` strides over records `start + b`,
    /// `start + b + blocks`, ... so the grid covers the chunk exactly once.
    pub fn scan_chunk(&self, query: &Rect<D>, start: usize, chunk: usize) {
        debug_assert!(start + chunk <= self.leaves.len());

        let leaves = &self.leaves;
        (0..self.blocks).into_par_iter().for_each(|block| {
            let mut lane_hits = vec![0u32; self.lanes];
            let mut block_visits = 0u32;

            let mut idx = start + block;
            while idx < start + chunk {
                let record = &leaves[idx];
                block_visits += 1;
                for lane in 0..record.len().min(self.lanes) {
                    if record.is_overlap(query, lane) {
                        lane_hits[lane] += 1;
                    }
                }
                idx += self.blocks;
            }

            let block_hits = pairwise_sum(&mut lane_hits);
            self.hits[block].fetch_add(block_hits, Ordering::Relaxed);
            self.visits[block].fetch_add(block_visits, Ordering::Relaxed);
        });
    }

    /// Read the session counters back, summed over all blocks.
    ///
    /// Called once per batch; every dispatched scan has completed by the
    /// time this returns because dispatches are synchronous.
    pub fn read_counters(&self) -> (u32, u32) {
        let hits = self.hits.iter().map(|c| c.load(Ordering::Relaxed)).sum();
        let visits = self.visits.iter().map(|c| c.load(Ordering::Relaxed)).sum();
        (hits, visits)
    }
}

/// Tree-style pairwise reduction of per-lane partial sums.
///
/// Halves the live prefix each step; an odd straggler is folded directly
/// into the first partial before the halving step.
fn pairwise_sum(partials: &mut [u32]) -> u32 {
    if partials.is_empty() {
        return 0;
    }
    let mut live = partials.len();
    while live > 1 {
        if live % 2 == 1 {
            partials[0] += partials[live - 1];
            live -= 1;
        }
        live /= 2;
        for i in 0..live {
            partials[i] += partials[i + live];
        }
    }
    partials[0]
}
