//! Z-order spatial keys.
//!
//! - [`layout`]: per-(dimension, width) bit-field constants
//! - [`spatial`]: the key view, level/tag/hash access and axis moves
//! - [`family`]: father, sons, siblings, ancestry
//! - [`neighbor`]: box and star neighborhoods

pub mod family;
pub mod layout;
pub mod neighbor;
pub mod spatial;

pub use family::Family;
pub use layout::{level_bits, Layout, NB_FREE_BITS, SUPPORTED_WIDTHS};
pub use neighbor::{BoxNeighbors, StarNeighbors};
pub use spatial::{Axis, SpatialKey};
