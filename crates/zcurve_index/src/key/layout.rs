//! Layout - bit-field boundaries and masks for one (dimension, width) pair.
//!
//! ```text
//!  msb                                                                  lsb
//! ┌─────────────┬─────┬──────────────────┬──────────────────────────────────┐
//! │ level       │ gap │ tags (5 bits)    │ position (dim · nlevels bits)    │
//! │ nblevelbits │     │ top bit = void   │ group 0 │ group 1 │ ... │ g n-1 │
//! └─────────────┴─────┴──────────────────┴──────────────────────────────────┘
//!                                          each group holds one digit per
//!                                          axis, ordered X Y Z (msb first)
//! ```
//!
//! A key at level `l` uses digit groups `0..=l`; deeper groups are zero
//! unless the key is hashed. Every constant here is derived once in
//! [`Layout::new`] and shared by reference.

use smallvec::SmallVec;

use super::spatial::{Axis, SpatialKey};
use crate::error::LayoutError;

/// Number of tag bits between the position and level fields.
pub const NB_FREE_BITS: usize = 5;

/// Key widths accepted by [`Layout::new`].
pub const SUPPORTED_WIDTHS: [u32; 3] = [16, 32, 64];

/// Smallest level-field width that leaves room for `dim` digits per level.
///
/// Starts from the bits left after the tag field and gives one bit at a time
/// to the level field until the level count fits.
pub const fn level_bits(dim: usize, free_bits: usize, width: usize) -> usize {
  let mut budget = width - free_bits;
  let mut bits = 0;
  while budget / dim > (1usize << bits) {
    budget -= 1;
    bits += 1;
  }
  bits
}

/// Derived constants for one `(dimension, width)` configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
  dim: usize,
  width: u32,
  nblevelbits: usize,
  nlevels: usize,
  levelshift: u32,
  width_mask: u64,
  maskpos: u64,
  level_zone: u64,
  tag_mask: u64,
  void_bit: u64,
  xbit: u64,
  ybit: u64,
  zbit: u64,
  xyzbit: u64,
  ones: Vec<u64>,
  all_ones: Vec<u64>,
  child_offsets: SmallVec<[u64; 8]>,
}

impl Layout {
  /// Derive the layout for `dim` axes packed into `width`-bit keys.
  pub fn new(dim: usize, width: u32) -> Result<Self, LayoutError> {
    if !(1..=3).contains(&dim) {
      return Err(LayoutError::UnsupportedDimension(dim));
    }
    if !SUPPORTED_WIDTHS.contains(&width) {
      return Err(LayoutError::UnsupportedWidth(width));
    }

    let size = width as usize;
    let nblevelbits = level_bits(dim, NB_FREE_BITS, size);
    let nlevels = (size - NB_FREE_BITS - nblevelbits) / dim;
    let posbits = dim * nlevels;
    let levelshift = (size - nblevelbits) as u32;

    let width_mask = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
    let maskpos = (1u64 << posbits) - 1;
    let level_zone = ((1u64 << nblevelbits) - 1) << levelshift;
    let first_free_bit = 1u64 << posbits;
    let tag_mask = ((1u64 << NB_FREE_BITS) - 1) << posbits;
    let void_bit = first_free_bit << (NB_FREE_BITS - 1);

    let xbit = 1u64 << (posbits - 1);
    let ybit = if dim >= 2 { xbit >> 1 } else { 0 };
    let zbit = if dim == 3 { xbit >> 2 } else { 0 };
    let xyzbit = xbit | ybit | zbit;

    let mut ones = Vec::with_capacity(nlevels);
    let mut all_ones = Vec::with_capacity(nlevels);
    let (mut acc, mut acc_all) = (0u64, 0u64);
    for level in 0..nlevels {
      acc |= xbit >> (dim * level);
      acc_all |= xyzbit >> (dim * level);
      ones.push(acc);
      all_ones.push(acc_all);
    }

    // Z-order: the y digit varies fastest, then x, then z.
    let child_offsets: SmallVec<[u64; 8]> = match dim {
      1 => SmallVec::from_slice(&[0, xbit]),
      2 => SmallVec::from_slice(&[0, ybit, xbit, xbit | ybit]),
      _ => SmallVec::from_slice(&[
        0,
        ybit,
        xbit,
        xbit | ybit,
        zbit,
        ybit | zbit,
        xbit | zbit,
        xbit | ybit | zbit,
      ]),
    };

    Ok(Self {
      dim,
      width,
      nblevelbits,
      nlevels,
      levelshift,
      width_mask,
      maskpos,
      level_zone,
      tag_mask,
      void_bit,
      xbit,
      ybit,
      zbit,
      xyzbit,
      ones,
      all_ones,
      child_offsets,
    })
  }

  /// Wrap a raw integer as a key of this layout.
  #[inline]
  pub fn key(&self, raw: u64) -> SpatialKey<'_> {
    SpatialKey::new(self, raw)
  }

  /// Level field of `raw`, read without building a key.
  #[inline]
  pub fn level_of(&self, raw: u64) -> usize {
    ((raw & self.level_zone) >> self.levelshift) as usize
  }

  /// True if `raw` fits the key width and names a level below `nlevels`.
  pub fn is_valid_raw(&self, raw: u64) -> bool {
    raw & !self.width_mask == 0 && self.level_of(raw) < self.nlevels
  }

  /// Number of axes.
  #[inline]
  pub fn dim(&self) -> usize {
    self.dim
  }

  /// Key width in bits.
  #[inline]
  pub fn width(&self) -> u32 {
    self.width
  }

  /// Width of the level field.
  #[inline]
  pub fn nblevelbits(&self) -> usize {
    self.nblevelbits
  }

  /// Number of tree levels (`0..nlevels` are valid).
  #[inline]
  pub fn nlevels(&self) -> usize {
    self.nlevels
  }

  /// Shift of the level field.
  #[inline]
  pub fn levelshift(&self) -> u32 {
    self.levelshift
  }

  /// `1 << levelshift`: adding it deepens a key by one level.
  #[inline]
  pub fn level_one(&self) -> u64 {
    1u64 << self.levelshift
  }

  /// All bits a key of this width may use.
  #[inline]
  pub fn width_mask(&self) -> u64 {
    self.width_mask
  }

  /// Position field mask.
  #[inline]
  pub fn maskpos(&self) -> u64 {
    self.maskpos
  }

  /// Level field mask.
  #[inline]
  pub fn level_zone(&self) -> u64 {
    self.level_zone
  }

  /// Tag field mask (all five tag bits).
  #[inline]
  pub fn tag_mask(&self) -> u64 {
    self.tag_mask
  }

  /// Shift of the lowest tag bit.
  #[inline]
  pub fn tag_shift(&self) -> u32 {
    (self.dim * self.nlevels) as u32
  }

  /// Top tag bit, marks void keys.
  #[inline]
  pub fn void_bit(&self) -> u64 {
    self.void_bit
  }

  /// Tag bit `index` (0..5) in key alignment; index 4 is the void bit.
  #[inline]
  pub fn tag_bit(&self, index: usize) -> u64 {
    debug_assert!(index < NB_FREE_BITS, "tag index {index} out of range");
    (1u64 << self.tag_shift()) << index
  }

  /// One past the largest position value; exclusive upper bound of the
  /// position range covered by a slot collection.
  #[inline]
  pub fn position_end(&self) -> u64 {
    self.maskpos + 1
  }

  /// Leading (level 0) position bit of `axis`; zero for absent axes.
  #[inline]
  pub fn axis_bit(&self, axis: Axis) -> u64 {
    match axis {
      Axis::X => self.xbit,
      Axis::Y => self.ybit,
      Axis::Z => self.zbit,
    }
  }

  /// Leading X bit.
  #[inline]
  pub fn xbit(&self) -> u64 {
    self.xbit
  }

  /// Leading Y bit (zero in 1D).
  #[inline]
  pub fn ybit(&self) -> u64 {
    self.ybit
  }

  /// Leading Z bit (zero below 3D).
  #[inline]
  pub fn zbit(&self) -> u64 {
    self.zbit
  }

  /// Leading digit group (all axes of level 0).
  #[inline]
  pub fn xyzbit(&self) -> u64 {
    self.xyzbit
  }

  /// Every digit of `axis` across all levels.
  #[inline]
  pub fn axis_mask(&self, axis: Axis) -> u64 {
    self.ones[self.nlevels - 1] >> axis.index()
  }

  /// X digits of groups `0..=level`.
  #[inline]
  pub fn ones(&self, level: usize) -> u64 {
    self.ones[level]
  }

  /// All digits of groups `0..=level`.
  #[inline]
  pub fn all_ones(&self, level: usize) -> u64 {
    self.all_ones[level]
  }

  /// Digit group of `level` (all axes).
  #[inline]
  pub fn group(&self, level: usize) -> u64 {
    self.xyzbit >> (self.dim * level)
  }

  /// Number of children per cell (`2^dim`).
  #[inline]
  pub fn tree_type(&self) -> usize {
    1 << self.dim
  }

  /// Child offsets in Z-order, aligned on digit group 0.
  ///
  /// Shift right by `dim * level` to address children at `level`.
  #[inline]
  pub fn child_offsets(&self) -> &[u64] {
    &self.child_offsets
  }

  /// Axes present in this layout, in X, Y, Z order.
  pub fn axes(&self) -> impl Iterator<Item = Axis> + '_ {
    Axis::ALL.into_iter().take(self.dim)
  }
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;
