//! Anything stored in a slot exposes its raw spatial key.

/// Item carrying a raw key (see [`SpatialKey`](crate::SpatialKey)).
///
/// Slots sort, route and tag items through this integer only; any payload
/// rides along untouched.
pub trait Keyed: Copy + Send + Sync {
  /// Raw key bits.
  fn raw(&self) -> u64;

  /// Overwrite the raw key bits, keeping any payload.
  fn set_raw(&mut self, raw: u64);

  /// Item holding only `raw`; used when restoring records.
  fn from_raw(raw: u64) -> Self;
}

impl Keyed for u64 {
  #[inline]
  fn raw(&self) -> u64 {
    *self
  }

  #[inline]
  fn set_raw(&mut self, raw: u64) {
    *self = raw;
  }

  #[inline]
  fn from_raw(raw: u64) -> Self {
    raw
  }
}
