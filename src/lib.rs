//! Hybrid CPU/parallel spatial index with Hilbert-ordered bulk loading.
//!
//! A tree is bulk-built once over point or rectangle data: branches are
//! ordered along a Hilbert curve, grouped bottom-up into a fixed-degree
//! hierarchy, and the leaf level is transposed into structure-of-arrays
//! form for the parallel scan engine. Range queries then split work between
//! host-side descent through internal nodes and chunked parallel scanning
//! of the leaf array, with a visited-leaf watermark guaranteeing each leaf
//! range is scanned at most once per query.
//!
//! ```rust
//! use hybridtree::{HybridTree, Point, QueryEngine, Recorder, Rect, TreeConfig};
//!
//! let points: Vec<Point<3>> = (0..500)
//!     .map(|i| Point::new([i as f32, (i % 7) as f32, (i % 13) as f32]))
//!     .collect();
//!
//! let config = TreeConfig::default().with_degree(4).with_chunk_size(16);
//! let mut recorder = Recorder::new();
//! let tree = HybridTree::build(&points, config, &mut recorder)?;
//!
//! let engine = QueryEngine::new(&tree);
//! let query = Rect::new(Point::new([0.0, 0.0, 0.0]), Point::new([50.0, 6.0, 12.0]));
//! let stats = engine.search_batch(&[query], &mut recorder);
//! assert!(stats.hits > 0);
//! # Ok::<(), hybridtree::HybridError>(())
//! ```

pub mod branch;
pub mod device;
pub mod error;
pub mod hilbert;
pub mod node;
pub mod persistence;
pub mod query;
pub mod recorder;
pub mod sort;
pub mod tree;
pub mod types;
pub mod validate;

pub use branch::Branch;
pub use device::DeviceBuffer;
pub use error::{HybridError, Result};
pub use node::{Node, NodeKind, NodeSoa};
pub use query::{QueryEngine, SearchStats};
pub use recorder::Recorder;
pub use tree::HybridTree;
pub use types::{Point, Rect, TreeConfig};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
