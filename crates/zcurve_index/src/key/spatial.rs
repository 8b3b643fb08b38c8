//! SpatialKey - immutable Z-order key viewed through its [`Layout`].
//!
//! The key is a plain integer; the view carries a reference to the layout so
//! every operation can reach the shared masks without recomputing them.
//! Storage keeps bare integers (see [`Keyed`](crate::Keyed)).

use std::fmt;
use std::hash::{Hash, Hasher};

use glam::U64Vec3;

use super::layout::Layout;
use crate::error::KeyError;

/// Coordinate axis. Digits within a group are ordered X, Y, Z from the most
/// significant bit down.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Axis {
  X = 0,
  Y = 1,
  Z = 2,
}

impl Axis {
  /// All axes in digit order.
  pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

  /// Offset of this axis' digit inside a digit group.
  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }
}

/// Z-order key: level, tags and interleaved position in one integer.
///
/// Equality ignores tag bits. There is deliberately no `Ord`: raw ordering
/// (see [`SpatialKey::raw`]) is only meaningful for sorting storage.
#[derive(Clone, Copy)]
pub struct SpatialKey<'a> {
  value: u64,
  layout: &'a Layout,
}

impl<'a> SpatialKey<'a> {
  /// Wrap `raw` with its layout.
  #[inline]
  pub fn new(layout: &'a Layout, raw: u64) -> Self {
    debug_assert!(
      raw & !layout.width_mask() == 0,
      "raw key {raw:#x} exceeds {} bits",
      layout.width()
    );
    Self { value: raw, layout }
  }

  /// Key of the cell at integer coordinates `coords` on `level`.
  ///
  /// Each coordinate must be below `2^(level + 1)`; unused axes are ignored.
  pub fn from_coords(layout: &'a Layout, level: usize, coords: U64Vec3) -> Self {
    debug_assert!(level < layout.nlevels(), "level {level} out of range");
    let dim = layout.dim();
    let mut pos = 0u64;
    for axis in layout.axes() {
      let c = coords[axis.index()];
      debug_assert!(c >> (level + 1) == 0, "coordinate {c} too large for level {level}");
      for depth in 0..=level {
        if (c >> (level - depth)) & 1 == 1 {
          pos |= (layout.xbit() >> axis.index()) >> (dim * depth);
        }
      }
    }
    Self::new(layout, pos | ((level as u64) << layout.levelshift()))
  }

  /// Integer cell coordinates on this key's level; unused axes are zero.
  pub fn coords(&self) -> U64Vec3 {
    let dim = self.layout.dim();
    let level = self.level();
    let mut out = U64Vec3::ZERO;
    for axis in self.layout.axes() {
      let mut c = 0u64;
      for depth in 0..=level {
        let bit = (self.layout.xbit() >> axis.index()) >> (dim * depth);
        c = (c << 1) | u64::from(self.value & bit != 0);
      }
      out[axis.index()] = c;
    }
    out
  }

  /// Layout this key belongs to.
  #[inline]
  pub fn layout(&self) -> &'a Layout {
    self.layout
  }

  /// The whole integer, tags included.
  #[inline]
  pub fn raw(&self) -> u64 {
    self.value
  }

  /// Tree level.
  #[inline]
  pub fn level(&self) -> usize {
    self.layout.level_of(self.value)
  }

  /// Same position and tags at another level.
  ///
  /// `level` must be below `nlevels`; checked in debug builds only. Use
  /// [`SpatialKey::checked_with_level`] for untrusted input.
  #[inline]
  pub fn with_level(self, level: usize) -> Self {
    debug_assert!(
      level < self.layout.nlevels(),
      "level {level} out of range ({} levels)",
      self.layout.nlevels()
    );
    let value = (self.value & !self.layout.level_zone()) | ((level as u64) << self.layout.levelshift());
    Self { value, ..self }
  }

  /// [`SpatialKey::with_level`] with the bound reported as an error.
  pub fn checked_with_level(self, level: usize) -> Result<Self, KeyError> {
    let nlevels = self.layout.nlevels();
    if level >= nlevels {
      return Err(KeyError::InvalidLevel { level, nlevels });
    }
    Ok(self.with_level(level))
  }

  /// Position field only: the storage ordering key.
  #[inline]
  pub fn pos(&self) -> u64 {
    self.value & self.layout.maskpos()
  }

  /// Tag field, aligned as in the key.
  #[inline]
  pub fn tags(&self) -> u64 {
    self.value & self.layout.tag_mask()
  }

  /// True if every bit of `pattern` (masked to the tag field) is set.
  #[inline]
  pub fn has_tags(&self, pattern: u64) -> bool {
    let pattern = pattern & self.layout.tag_mask();
    self.value & pattern == pattern
  }

  /// Set the tag bits of `pattern`; bits outside the tag field are ignored.
  #[inline]
  pub fn with_tags(self, pattern: u64) -> Self {
    Self { value: self.value | (pattern & self.layout.tag_mask()), ..self }
  }

  /// Clear the tag bits of `pattern`; bits outside the tag field are ignored.
  #[inline]
  pub fn without_tags(self, pattern: u64) -> Self {
    Self { value: self.value & !(pattern & self.layout.tag_mask()), ..self }
  }

  /// Clear every tag bit.
  #[inline]
  pub fn cleared_tags(self) -> Self {
    Self { value: self.value & !self.layout.tag_mask(), ..self }
  }

  /// True for the "no such cell" sentinel.
  #[inline]
  pub fn is_void(&self) -> bool {
    self.value & self.layout.void_bit() != 0
  }

  /// Mark as void.
  #[inline]
  pub fn voided(self) -> Self {
    Self { value: self.value | self.layout.void_bit(), ..self }
  }

  /// Marker bit placed just below this key's digit group by `hash`.
  ///
  /// Zero on the finest level, where hashing is the identity.
  #[inline]
  fn hash_marker(&self) -> u64 {
    self.layout.xbit() >> (self.layout.dim() * (self.level() + 1))
  }

  /// Hashed form: distinguishes a cell from its first descendant, which
  /// shares its position.
  #[inline]
  pub fn hash(self) -> Self {
    debug_assert!(!self.is_hashed(), "key {:#x} is already hashed", self.value);
    Self { value: self.value | self.hash_marker(), ..self }
  }

  /// Inverse of [`SpatialKey::hash`].
  #[inline]
  pub fn unhash(self) -> Self {
    Self { value: self.value & !self.hash_marker(), ..self }
  }

  /// True if the hash marker is set.
  #[inline]
  pub fn is_hashed(&self) -> bool {
    self.value & self.hash_marker() != 0
  }

  /// Every `axis` digit down to this key's level is one.
  #[inline]
  pub fn is_max(&self, axis: Axis) -> bool {
    let c = self.layout.ones(self.level()) >> axis.index();
    self.value & c == c
  }

  /// Every `axis` digit down to this key's level is zero.
  #[inline]
  pub fn is_min(&self, axis: Axis) -> bool {
    let c = self.layout.ones(self.level()) >> axis.index();
    self.value & c == 0
  }

  /// Index among its siblings, in the order of [`SpatialKey::refine`] and
  /// [`SpatialKey::brothers`].
  pub fn child_index(&self) -> usize {
    let level = self.level();
    let shift = self.layout.dim() * (self.layout.nlevels() - 1 - level);
    let digits = ((self.value & self.layout.group(level)) >> shift) as usize;
    if self.layout.dim() < 3 {
      return digits;
    }
    // digits are x|y|z from high to low; siblings vary y, then x, then z
    let (x, y, z) = ((digits >> 2) & 1, (digits >> 1) & 1, digits & 1);
    y | (x << 1) | (z << 2)
  }

  /// True for the first child (in Z-order) of its sibling set.
  #[inline]
  pub fn is_minimal(&self) -> bool {
    self.value & self.layout.group(self.level()) == 0
  }

  /// Move `n` cells towards +`axis` on this key's level.
  ///
  /// Leaving the domain yields a void key. Digits deeper than the level are
  /// cleared, so the result is never hashed.
  pub fn plus(self, axis: Axis, n: usize) -> Self {
    self.shift(axis, n, true)
  }

  /// Move `n` cells towards -`axis` on this key's level.
  ///
  /// Leaving the domain yields a void key. Digits deeper than the level are
  /// cleared, so the result is never hashed.
  pub fn minus(self, axis: Axis, n: usize) -> Self {
    self.shift(axis, n, false)
  }

  fn shift(self, axis: Axis, n: usize, forward: bool) -> Self {
    if n == 0 {
      return self;
    }
    debug_assert!(axis.index() < self.layout.dim(), "{axis:?} absent in {}D layout", self.layout.dim());

    let layout = self.layout;
    let maskpos = layout.maskpos();
    let level = layout.level_of(self.value);
    let bit = layout.axis_bit(axis) >> (layout.dim() * level);
    let mask = layout.axis_mask(axis);
    let active = layout.all_ones(level);
    // other axes' digits: filled with ones so carries ripple across them
    let fill = maskpos & !mask;

    let mut dec = 0u64;
    for _ in 0..n {
      dec = (dec | fill).wrapping_add(bit);
    }

    let moved = if forward {
      (self.value & mask).wrapping_add(dec | fill)
    } else {
      (self.value & mask).wrapping_sub(dec & mask)
    };
    let out_of_domain = (moved & !maskpos) != 0 || (dec & !maskpos) != 0;

    let keep = (self.value & fill & active)
      | (self.value & layout.level_zone())
      | (self.value & layout.tag_mask());
    let void = if out_of_domain { layout.void_bit() } else { 0 };
    Self { value: (moved & mask & active) | keep | void, ..self }
  }
}

impl PartialEq for SpatialKey<'_> {
  fn eq(&self, other: &Self) -> bool {
    let keep = !self.layout.tag_mask();
    self.value & keep == other.value & keep
  }
}

impl Eq for SpatialKey<'_> {}

impl Hash for SpatialKey<'_> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    (self.value & !self.layout.tag_mask()).hash(state);
  }
}

impl fmt::Debug for SpatialKey<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SpatialKey")
      .field("raw", &format_args!("{:#x}", self.value))
      .field("level", &self.level())
      .field("pos", &format_args!("{:#x}", self.pos()))
      .field("tags", &format_args!("{:#07b}", self.tags() >> self.layout.tag_shift()))
      .finish()
  }
}

/// Binary rendering, msb first: `.` after the level field and between digit
/// groups, `|` between the tag field and the position.
impl fmt::Display for SpatialKey<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let layout = self.layout;
    let posbits = layout.dim() * layout.nlevels();
    let levelshift = layout.levelshift() as usize;
    for i in (0..layout.width() as usize).rev() {
      f.write_str(if self.value >> i & 1 == 1 { "1" } else { "0" })?;
      if i == posbits {
        f.write_str("|")?;
      } else if i == levelshift {
        f.write_str(".")?;
      } else if i > 0 && i < posbits && i % layout.dim() == 0 {
        f.write_str(".")?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
#[path = "spatial_test.rs"]
mod spatial_test;
