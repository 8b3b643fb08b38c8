//! Family relations: father, sons, siblings and ancestry.
//!
//! ```text
//!   level l-1          level l                 level l+1
//!  ┌─────────┐      ┌────┬────┐      first_son ┌──┬──┬──┬──┐
//!  │ father  │ ───► │ 0  │ 1  │ ─────────────► │  │  │  │  │ ...
//!  │         │      ├────┼────┤                 └──┴──┴──┴──┘
//!  └─────────┘      │ 2  │ 3  │  brothers: the 2^dim cells sharing a father,
//!                   └────┴────┘  in Z-order (child offset table)
//! ```
//!
//! All relations keep the tag bits of the key they start from.

use smallvec::SmallVec;

use super::spatial::SpatialKey;
use crate::error::KeyError;

/// Sibling or child set of one cell, in Z-order.
pub type Family<'a> = SmallVec<[SpatialKey<'a>; 8]>;

impl<'a> SpatialKey<'a> {
  /// Enclosing cell one level up; `None` at level 0.
  pub fn father(&self) -> Option<Self> {
    let level = self.level();
    if level == 0 {
      return None;
    }
    let layout = self.layout();
    let raw = self.raw();
    let value = (raw & layout.all_ones(level - 1))
      | (raw & layout.tag_mask())
      | (((level - 1) as u64) << layout.levelshift());
    Some(SpatialKey::new(layout, value))
  }

  /// Z-order-first child; `None` at the finest level.
  pub fn first_son(&self) -> Option<Self> {
    let layout = self.layout();
    if self.level() + 1 >= layout.nlevels() {
      return None;
    }
    Some(SpatialKey::new(layout, self.unhash().raw() + layout.level_one()))
  }

  /// Z-order-last child; `None` at the finest level.
  pub fn last_son(&self) -> Option<Self> {
    let layout = self.layout();
    let level = self.level();
    self
      .first_son()
      .map(|son| SpatialKey::new(layout, son.raw() + layout.group(level + 1)))
  }

  /// True if `self` is `other` or one of its ancestors.
  pub fn is_ancestor_of(&self, other: &SpatialKey<'_>) -> bool {
    let level = self.level();
    if level > other.level() {
      return false;
    }
    let mask = self.layout().all_ones(level);
    self.raw() & mask == other.raw() & mask
  }

  /// True if both keys have the same ancestor at `level`.
  ///
  /// Both keys must be at `level` or deeper.
  pub fn shares_ancestor(&self, other: &SpatialKey<'_>, level: usize) -> bool {
    debug_assert!(
      self.level() >= level && other.level() >= level,
      "keys at levels {} and {} have no ancestor at {level}",
      self.level(),
      other.level()
    );
    let mask = self.layout().all_ones(level);
    self.raw() & mask == other.raw() & mask
  }

  /// The 2^dim siblings of a minimal key, itself first, in Z-order.
  ///
  /// Panics in debug builds if the key is not minimal; see
  /// [`SpatialKey::checked_brothers`].
  pub fn brothers(&self) -> Family<'a> {
    debug_assert!(self.is_minimal(), "brothers() of non-minimal key {:#x}", self.raw());
    let layout = self.layout();
    let shift = layout.dim() * self.level();
    let base = self.raw();
    layout
      .child_offsets()
      .iter()
      .map(|offset| SpatialKey::new(layout, base + (offset >> shift)))
      .collect()
  }

  /// [`SpatialKey::brothers`] with the minimality precondition reported.
  pub fn checked_brothers(&self) -> Result<Family<'a>, KeyError> {
    if !self.is_minimal() {
      return Err(KeyError::NotMinimal { raw: self.raw() });
    }
    Ok(self.brothers())
  }

  /// The 2^dim children in Z-order; `None` at the finest level.
  pub fn refine(&self) -> Option<Family<'a>> {
    let layout = self.layout();
    let shift = layout.dim() * (self.level() + 1);
    self.first_son().map(|son| {
      let base = son.raw();
      layout
        .child_offsets()
        .iter()
        .map(|offset| SpatialKey::new(layout, base + (offset >> shift)))
        .collect()
    })
  }
}

#[cfg(test)]
#[path = "family_test.rs"]
mod family_test;
