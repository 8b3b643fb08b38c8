//! Key storage partitioned along the Z-order curve.
//!
//! - [`Slot`]: bucket of keys whose positions lie in one half-open interval
//! - [`SlotCollection`]: ordered slots tiling the whole position range
//! - [`Cache`]: recently used slots, to skip the binary search
//! - [`record`]: plain-text dump and restore

pub mod arena;
pub mod cache;
pub mod collection;
pub mod keyed;
pub mod record;
#[allow(clippy::module_inception)]
mod slot;

pub use arena::{SlotArena, SlotHandle};
pub use cache::{Cache, CACHE_SIZE};
pub use collection::SlotCollection;
pub use keyed::Keyed;
pub use slot::{Slot, DEFAULT_CUT_DOWN_FACTOR};
