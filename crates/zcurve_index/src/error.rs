//! Error types for layout construction, key preconditions, slot checks and
//! record I/O.
//!
//! Moving a key outside the domain is not an error: `plus`/`minus` return a
//! void key instead (see [`SpatialKey::is_void`](crate::SpatialKey::is_void)).

use thiserror::Error;

/// Invalid `(dimension, width)` pair passed to
/// [`Layout::new`](crate::Layout::new).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LayoutError {
  /// Only 1, 2 and 3 dimensional trees are supported.
  #[error("unsupported dimension {0} (expected 1, 2 or 3)")]
  UnsupportedDimension(usize),
  /// Only 16, 32 and 64 bit keys are supported.
  #[error("unsupported key width {0} (expected 16, 32 or 64)")]
  UnsupportedWidth(u32),
}

/// Precondition violations on key operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeyError {
  /// Level outside `0..nlevels`.
  #[error("level {level} out of range (layout has {nlevels} levels)")]
  InvalidLevel { level: usize, nlevels: usize },
  /// Sibling enumeration requires the Z-order-minimal child.
  #[error("key {raw:#x} is not the minimal child of its sibling set")]
  NotMinimal { raw: u64 },
}

/// A slot holds a key it should not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotError {
  /// Key position outside the slot's `[s1, s2)` interval.
  #[error("key #{index} at position {pos:#x} lies outside slot [{s1:#x}, {s2:#x})")]
  Malformed { index: usize, pos: u64, s1: u64, s2: u64 },
  /// Key wider than the layout or with a level beyond `nlevels`.
  #[error("key #{index} ({raw:#x}) is not a valid key of this layout")]
  InvalidKey { index: usize, raw: u64 },
}

/// Errors reported by [`SlotCollection`](crate::SlotCollection) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
  /// Caller buffer for `copy_in_array` does not match `nb_nodes()`.
  #[error("buffer holds {actual} keys but the collection stores {expected}")]
  BufferSize { expected: usize, actual: usize },
  /// The slots no longer tile the position range.
  #[error("slot #{index} breaks the partition: {reason}")]
  BrokenPartition { index: usize, reason: &'static str },
  /// No slot exists at this index.
  #[error("slot index {index} out of range ({len} slots)")]
  NoSuchSlot { index: usize, len: usize },
  #[error(transparent)]
  Slot(#[from] SlotError),
}

/// Errors reading or writing slot records.
#[derive(Debug, Error)]
pub enum RecordError {
  #[error("record i/o failed: {0}")]
  Io(#[from] std::io::Error),
  /// A field was not an unsigned decimal integer.
  #[error("invalid {field} field: {token:?}")]
  Parse { field: &'static str, token: String },
  /// The input ended in the middle of a record.
  #[error("record truncated while reading {field}")]
  Truncated { field: &'static str },
  /// Restored slots do not tile the position range.
  #[error(transparent)]
  Collection(#[from] CollectionError),
}
