//! Core geometric types and build configuration.
//!
//! The dimensionality `D` is a compile-time parameter shared by every
//! component; all other knobs (degree, Hilbert order, scan geometry) live in
//! [`TreeConfig`] and are fixed once a tree has been built.

use crate::error::{HybridError, Result};
use serde::{Deserialize, Serialize};

/// A point in `D`-dimensional space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<const D: usize>(pub [f32; D]);

impl<const D: usize> Point<D> {
    /// Create a point from its coordinates.
    pub fn new(coords: [f32; D]) -> Self {
        Self(coords)
    }

    /// Coordinate along dimension `dim`.
    #[inline]
    pub fn coord(&self, dim: usize) -> f32 {
        self.0[dim]
    }

    /// All coordinates as a slice.
    pub fn coords(&self) -> &[f32; D] {
        &self.0
    }
}

/// An axis-aligned bounding rectangle in `D`-dimensional space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<const D: usize> {
    /// Lower corner, inclusive.
    pub low: Point<D>,
    /// Upper corner, inclusive.
    pub high: Point<D>,
}

impl<const D: usize> Rect<D> {
    /// Create a rectangle from its corners, normalizing inverted extents.
    pub fn new(a: Point<D>, b: Point<D>) -> Self {
        let mut low = [0.0f32; D];
        let mut high = [0.0f32; D];
        for dim in 0..D {
            low[dim] = a.0[dim].min(b.0[dim]);
            high[dim] = a.0[dim].max(b.0[dim]);
        }
        Self {
            low: Point(low),
            high: Point(high),
        }
    }

    /// A degenerate rectangle covering a single point.
    pub fn from_point(point: Point<D>) -> Self {
        Self {
            low: point,
            high: point,
        }
    }

    /// Center point of the rectangle.
    pub fn center(&self) -> Point<D> {
        let mut coords = [0.0f32; D];
        for dim in 0..D {
            coords[dim] = (self.low.0[dim] + self.high.0[dim]) * 0.5;
        }
        Point(coords)
    }

    /// Whether this rectangle overlaps `other` in every dimension.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        for dim in 0..D {
            if self.low.0[dim] > other.high.0[dim] || self.high.0[dim] < other.low.0[dim] {
                return false;
            }
        }
        true
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        let mut low = [0.0f32; D];
        let mut high = [0.0f32; D];
        for dim in 0..D {
            low[dim] = self.low.0[dim].min(other.low.0[dim]);
            high[dim] = self.high.0[dim].max(other.high.0[dim]);
        }
        Self {
            low: Point(low),
            high: Point(high),
        }
    }
}

/// Build and serve configuration for a hybrid tree.
///
/// A tree is built under one configuration and is only valid under that
/// configuration: `degree` and `hilbert_order` are recorded in the index file
/// header and verified on load. The scan geometry (`chunk_size`,
/// `scan_blocks`, `scan_lanes`) shapes the parallel leaf scan and may be
/// tuned per deployment.
///
/// # Example
///
/// ```rust
/// use hybridtree::TreeConfig;
///
/// let config = TreeConfig::default().with_degree(4).with_chunk_size(16);
/// assert!(config.validate(3).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum branches per node.
    #[serde(default = "TreeConfig::default_degree")]
    pub degree: usize,

    /// Bits per dimension used when quantizing rectangle centers onto the
    /// Hilbert curve. `dims * hilbert_order` must not exceed 64.
    #[serde(default = "TreeConfig::default_hilbert_order")]
    pub hilbert_order: u32,

    /// Number of leaf records covered by one scan dispatch.
    #[serde(default = "TreeConfig::default_chunk_size")]
    pub chunk_size: usize,

    /// Number of parallel scan blocks per dispatch.
    #[serde(default = "TreeConfig::default_scan_blocks")]
    pub scan_blocks: usize,

    /// Lanes per scan block; each lane tests one branch slot of a leaf
    /// record, so this must be at least `degree`.
    #[serde(default = "TreeConfig::default_scan_lanes")]
    pub scan_lanes: usize,

    /// Branch counts at or above this threshold use the parallel sort path.
    #[serde(default = "TreeConfig::default_parallel_sort_threshold")]
    pub parallel_sort_threshold: usize,
}

impl TreeConfig {
    const fn default_degree() -> usize {
        128
    }

    const fn default_hilbert_order() -> u32 {
        16
    }

    const fn default_chunk_size() -> usize {
        128
    }

    const fn default_scan_blocks() -> usize {
        128
    }

    const fn default_scan_lanes() -> usize {
        128
    }

    const fn default_parallel_sort_threshold() -> usize {
        1 << 16
    }

    /// Set the tree degree, keeping `scan_lanes` large enough to cover it.
    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        if self.scan_lanes < degree {
            self.scan_lanes = degree;
        }
        self
    }

    /// Set the Hilbert curve order (bits per dimension).
    pub fn with_hilbert_order(mut self, order: u32) -> Self {
        self.hilbert_order = order;
        self
    }

    /// Set the number of leaf records scanned per dispatch.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the parallel scan grid geometry.
    pub fn with_scan_grid(mut self, blocks: usize, lanes: usize) -> Self {
        self.scan_blocks = blocks;
        self.scan_lanes = lanes;
        self
    }

    /// Set the branch count at which sorting switches to the parallel path.
    pub fn with_parallel_sort_threshold(mut self, threshold: usize) -> Self {
        self.parallel_sort_threshold = threshold;
        self
    }

    /// Validate configuration values against the dimensionality `dims`.
    pub fn validate(&self, dims: usize) -> Result<()> {
        if dims == 0 {
            return Err(HybridError::InvalidConfig(
                "dimensionality must be at least 1".to_string(),
            ));
        }
        if self.degree < 2 {
            return Err(HybridError::InvalidConfig(format!(
                "degree must be at least 2, got {}",
                self.degree
            )));
        }
        if self.hilbert_order == 0
            || self.hilbert_order > 32
            || dims as u32 * self.hilbert_order > 64
        {
            return Err(HybridError::InvalidConfig(format!(
                "hilbert_order must satisfy 1 <= order <= 32 and dims * order <= 64, got {} for {} dims",
                self.hilbert_order, dims
            )));
        }
        if self.chunk_size == 0 {
            return Err(HybridError::InvalidConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.scan_blocks == 0 {
            return Err(HybridError::InvalidConfig(
                "scan_blocks must be at least 1".to_string(),
            ));
        }
        if self.scan_lanes < self.degree {
            return Err(HybridError::InvalidConfig(format!(
                "scan_lanes ({}) must cover every branch slot of a node (degree {})",
                self.scan_lanes, self.degree
            )));
        }
        Ok(())
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize configuration as pretty JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            degree: Self::default_degree(),
            hilbert_order: Self::default_hilbert_order(),
            chunk_size: Self::default_chunk_size(),
            scan_blocks: Self::default_scan_blocks(),
            scan_lanes: Self::default_scan_lanes(),
            parallel_sort_threshold: Self::default_parallel_sort_threshold(),
        }
    }
}
