//! zcurve_index - Z-order (Morton) keys for 1D, 2D and 3D trees
//!
//! A key packs the interleaved cell coordinates, a level, a few tag bits and
//! a void bit into one unsigned integer. Sorting keys by their position bits
//! walks the tree in Z-order, so a flat sorted array of keys is a full
//! spatial index.
//!
//! # Features
//!
//! - **Layouts**: bit-field constants for every supported
//!   `(dimension, width)` pair, computed once per [`Layout`]
//! - **Key arithmetic**: level/tag/void access, axis moves with carry,
//!   father/sons/brothers, box and star neighborhoods
//! - **Slot storage**: [`SlotCollection`] partitions the position range
//!   into [`Slot`]s, with an optional lookup [`Cache`] and plain-text
//!   dump/restore
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use glam::U64Vec3;
//! use zcurve_index::{Axis, CollectionConfig, Layout, SlotCollection, SpatialKey};
//!
//! let layout = Arc::new(Layout::new(3, 32).unwrap());
//! let key = SpatialKey::from_coords(&layout, 2, U64Vec3::new(1, 3, 0));
//! let right = key.plus(Axis::X, 1);
//! assert_eq!(right.coords(), U64Vec3::new(2, 3, 0));
//!
//! let mut store: SlotCollection = SlotCollection::new(Arc::clone(&layout), CollectionConfig::DEFAULT);
//! store.insert(key.raw());
//! assert_eq!(store.count(key.raw()), 1);
//! assert_eq!(store.count(right.raw()), 0);
//! ```

pub mod config;
pub mod error;
pub mod key;
pub mod slot;
pub mod stats;

pub use config::CollectionConfig;
pub use error::{CollectionError, KeyError, LayoutError, RecordError, SlotError};
pub use key::{Axis, Family, Layout, SpatialKey};
pub use slot::{Cache, Keyed, Slot, SlotArena, SlotCollection, SlotHandle};
pub use stats::{CacheStats, CollectionStats};
