//! Slot - an unordered bucket of keys whose positions lie in `[s1, s2)`.
//!
//! ```text
//!  position axis ──────────────────────────────────────────────────►
//!        s1                                              s2
//!        ├──────────────────────────────────────────────┤
//!        │  k7   k2 k9       k1            k4   k3       │  keys in
//!        │                                               │  arrival order
//!        └───────────────────────────────────────────────┘
//!  mark: OR of the tag fields present (may over-approximate)
//! ```
//!
//! The mark lets tag-driven maintenance skip slots that cannot contain a
//! matching key. It is a superset of the tags present: `put`, `set_tag` and
//! `set_mark` only add bits, and removal clears a bit only once no remaining
//! key carries it.

use std::sync::Arc;

use super::keyed::Keyed;
use crate::error::SlotError;
use crate::key::Layout;

/// Default spare-capacity factor for [`Slot::cut_down`].
pub const DEFAULT_CUT_DOWN_FACTOR: usize = 2;

/// Bucket of keys over a half-open position interval.
#[derive(Clone, Debug)]
pub struct Slot<T: Keyed = u64> {
  layout: Arc<Layout>,
  keys: Vec<T>,
  s1: u64,
  s2: u64,
  slot_rank: usize,
  start_rank: usize,
  mark: u8,
}

impl<T: Keyed> Slot<T> {
  /// Empty slot over `[s1, s2)` with room for `capacity` keys.
  pub fn new(layout: Arc<Layout>, s1: u64, s2: u64, capacity: usize) -> Self {
    debug_assert!(s1 <= s2, "slot bounds reversed: [{s1:#x}, {s2:#x})");
    Self {
      layout,
      keys: Vec::with_capacity(capacity),
      s1,
      s2,
      slot_rank: 0,
      start_rank: 0,
      mark: 0,
    }
  }

  /// Empty slot covering every position of `layout`.
  pub fn covering(layout: Arc<Layout>, capacity: usize) -> Self {
    let end = layout.position_end();
    Self::new(layout, 0, end, capacity)
  }

  // =========================================================================
  // Accessors
  // =========================================================================

  #[inline]
  pub fn layout(&self) -> &Arc<Layout> {
    &self.layout
  }

  /// Inclusive lower bound.
  #[inline]
  pub fn s1(&self) -> u64 {
    self.s1
  }

  /// Exclusive upper bound.
  #[inline]
  pub fn s2(&self) -> u64 {
    self.s2
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.keys.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.keys.is_empty()
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.keys.capacity()
  }

  /// Keys in storage order.
  #[inline]
  pub fn keys(&self) -> &[T] {
    &self.keys
  }

  #[inline]
  pub fn get(&self, index: usize) -> Option<&T> {
    self.keys.get(index)
  }

  #[inline]
  pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
    self.keys.get_mut(index)
  }

  /// Index of this slot in its collection (valid after relinking).
  #[inline]
  pub fn slot_rank(&self) -> usize {
    self.slot_rank
  }

  /// Global rank of this slot's first key (valid after relinking).
  #[inline]
  pub fn start_rank(&self) -> usize {
    self.start_rank
  }

  #[inline]
  pub(crate) fn set_ranks(&mut self, slot_rank: usize, start_rank: usize) {
    self.slot_rank = slot_rank;
    self.start_rank = start_rank;
  }

  #[inline]
  pub(crate) fn set_start_rank(&mut self, start_rank: usize) {
    self.start_rank = start_rank;
  }

  #[inline]
  pub(crate) fn set_bounds(&mut self, s1: u64, s2: u64) {
    self.s1 = s1;
    self.s2 = s2;
  }

  /// True if `pos` falls in `[s1, s2)`.
  #[inline]
  pub fn contains_pos(&self, pos: u64) -> bool {
    self.s1 <= pos && pos < self.s2
  }

  #[inline]
  fn pos_of(&self, item: &T) -> u64 {
    item.raw() & self.layout.maskpos()
  }

  #[inline]
  fn tags_of(&self, item: &T) -> u64 {
    item.raw() & self.layout.tag_mask()
  }

  /// Mark bits for the tag part of `pattern`.
  #[inline]
  fn summary(&self, pattern: u64) -> u8 {
    ((pattern & self.layout.tag_mask()) >> self.layout.tag_shift()) as u8
  }

  // =========================================================================
  // Insertion and lookup
  // =========================================================================

  /// Append `item`; its tags are folded into the mark.
  ///
  /// The position is not checked against the bounds.
  #[inline]
  pub fn put(&mut self, item: T) {
    self.mark |= self.summary(item.raw());
    self.keys.push(item);
  }

  /// Append every item of `items`.
  pub fn put_all<I: IntoIterator<Item = T>>(&mut self, items: I) {
    for item in items {
      self.put(item);
    }
  }

  /// Index of the first key equal to `raw`, ignoring tag bits.
  pub fn find(&self, raw: u64) -> Option<usize> {
    let keep = !self.layout.tag_mask();
    self.keys.iter().position(|k| (k.raw() ^ raw) & keep == 0)
  }

  /// Number of keys with every bit of `pattern` set.
  pub fn count_matching(&self, pattern: u64) -> usize {
    self.keys.iter().filter(|k| k.raw() & pattern == pattern).count()
  }

  // =========================================================================
  // Marks
  // =========================================================================

  /// Raw mark byte: tag field bits shifted down to bit 0.
  #[inline]
  pub fn mark(&self) -> u8 {
    self.mark
  }

  /// Mark expressed as key tag bits.
  #[inline]
  pub fn marked_tags(&self) -> u64 {
    u64::from(self.mark) << self.layout.tag_shift()
  }

  /// Add the tag bits of `pattern` to the mark.
  #[inline]
  pub fn set_mark(&mut self, pattern: u64) {
    self.mark |= self.summary(pattern);
  }

  /// Remove the tag bits of `pattern` from the mark, leaving keys unchanged.
  #[inline]
  pub fn unset_mark(&mut self, pattern: u64) {
    self.mark &= !self.summary(pattern);
  }

  /// True if the mark holds any tag bit outside `pattern`.
  #[inline]
  pub fn marked_other(&self, pattern: u64) -> bool {
    self.mark & !self.summary(pattern) != 0
  }

  /// True if the mark says void keys may be present.
  #[inline]
  pub fn has_void_keys(&self) -> bool {
    self.mark & self.summary(self.layout.void_bit()) != 0
  }

  #[inline]
  pub fn set_has_void_keys(&mut self) {
    self.set_mark(self.layout.void_bit());
  }

  /// Clear the bits of `candidates` from the mark if no key still carries
  /// them.
  fn forget_absent(&mut self, candidates: u8) {
    if candidates == 0 {
      return;
    }
    let present = self.keys.iter().fold(0u8, |acc, k| acc | self.summary(k.raw()));
    self.mark &= !(candidates & !present);
  }

  // =========================================================================
  // Tag maintenance
  // =========================================================================

  /// Remove every key whose tag field equals the tag field of `pattern`.
  ///
  /// Skipped unless the mark holds all of the pattern's tag bits; a pattern
  /// without tag bits removes nothing. Returns the number of keys removed.
  pub fn compress(&mut self, pattern: u64) -> usize {
    let m = self.summary(pattern);
    if m == 0 || self.mark & m != m {
      return 0;
    }
    let tags = pattern & self.layout.tag_mask();
    let tag_mask = self.layout.tag_mask();
    let before = self.keys.len();
    self.keys.retain(|k| k.raw() & tag_mask != tags);
    self.forget_absent(m);
    before - self.keys.len()
  }

  /// Remove keys whose tag field equals that of `a` or of `b`.
  ///
  /// Runs if the mark holds all tag bits of either pattern.
  pub fn compress_either(&mut self, a: u64, b: u64) -> usize {
    let (ma, mb) = (self.summary(a), self.summary(b));
    let hit = |m: u8| m != 0 && self.mark & m == m;
    let (run_a, run_b) = (hit(ma), hit(mb));
    if !run_a && !run_b {
      return 0;
    }
    let tag_mask = self.layout.tag_mask();
    let ta = if run_a { Some(a & tag_mask) } else { None };
    let tb = if run_b { Some(b & tag_mask) } else { None };
    let before = self.keys.len();
    self.keys.retain(|k| {
      let t = Some(k.raw() & tag_mask);
      t != ta && t != tb
    });
    self.forget_absent(ma | mb);
    before - self.keys.len()
  }

  /// Remove every key carrying any tag bit, and clear the mark.
  pub fn compress_any(&mut self) -> usize {
    let tag_mask = self.layout.tag_mask();
    let before = self.keys.len();
    self.keys.retain(|k| k.raw() & tag_mask == 0);
    self.mark = 0;
    before - self.keys.len()
  }

  /// OR the tag bits of `pattern` into every key and into the mark.
  pub fn set_tag(&mut self, pattern: u64) {
    let tags = pattern & self.layout.tag_mask();
    for k in &mut self.keys {
      k.set_raw(k.raw() | tags);
    }
    self.mark |= self.summary(tags);
  }

  /// Retag: keys carrying every tag bit of `from` get those bits replaced by
  /// the tag bits of `to`.
  ///
  /// Nothing happens unless the mark holds some bit of `from`.
  pub fn change_mark(&mut self, from: u64, to: u64) {
    let (mf, mt) = (self.summary(from), self.summary(to));
    if self.mark & mf == 0 {
      return;
    }
    let tag_mask = self.layout.tag_mask();
    let (from, to) = (from & tag_mask, to & tag_mask);
    for k in &mut self.keys {
      let raw = k.raw();
      if raw & from == from {
        k.set_raw((raw & !from) | to);
      }
    }

    // keys holding only part of `from` keep their bits
    self.mark |= mt;
    self.forget_absent(mf & !mt);
  }

  /// Logical AND of every key with `mask`.
  pub fn retain_bits(&mut self, mask: u64) {
    for k in &mut self.keys {
      k.set_raw(k.raw() & mask);
    }
    self.mark &= self.summary(mask);
  }

  /// Drop every tag bit of every key.
  pub fn clear_tags(&mut self) {
    let keep = !self.layout.tag_mask();
    for k in &mut self.keys {
      k.set_raw(k.raw() & keep);
    }
    self.mark = 0;
  }

  /// Remove all keys; bounds, ranks and allocation are kept.
  pub fn clear(&mut self) {
    self.keys.clear();
    self.mark = 0;
  }

  /// Release spare capacity when it exceeds `factor` times the length.
  ///
  /// Returns whether the slot was shrunk.
  pub fn cut_down(&mut self, factor: usize) -> bool {
    let target = self.keys.len().saturating_mul(factor.max(1));
    if self.keys.capacity() <= target {
      return false;
    }
    self.keys.shrink_to(target);
    true
  }

  // =========================================================================
  // Ordering
  // =========================================================================

  /// Stable sort by position.
  pub fn sort(&mut self) {
    let maskpos = self.layout.maskpos();
    self.keys.sort_by_key(|k| k.raw() & maskpos);
  }

  /// Sort and drop keys equal (tags ignored) to an earlier one.
  ///
  /// Returns the number of keys removed.
  pub fn uniq(&mut self) -> usize {
    let maskpos = self.layout.maskpos();
    let keep = !self.layout.tag_mask();
    self.keys.sort_by_key(|k| (k.raw() & maskpos, k.raw() & keep));
    let before = self.keys.len();
    self.keys.dedup_by(|a, b| (a.raw() ^ b.raw()) & keep == 0);
    before - self.keys.len()
  }

  /// True if two keys share a position.
  pub fn exaequo(&self) -> bool {
    let mut positions: Vec<u64> = self.keys.iter().map(|k| self.pos_of(k)).collect();
    positions.sort_unstable();
    positions.windows(2).any(|w| w[0] == w[1])
  }

  // =========================================================================
  // Splitting and merging
  // =========================================================================

  /// Sort and split into `n` slots tiling `[s1, s2)`.
  ///
  /// Each piece takes `len / n` keys and the last one the remainder, except
  /// that a boundary is pushed forward until it no longer separates two keys
  /// at the same position. Inner bounds are the first position of the next
  /// piece, so a piece left empty gets a zero-width interval.
  pub fn cut(mut self, n: usize) -> Vec<Slot<T>> {
    let n = n.max(1);
    self.sort();

    let len = self.keys.len();
    let step = len / n;
    let mut starts = Vec::with_capacity(n + 1);
    starts.push(0);
    for i in 1..n {
      let mut at = (i * step).max(starts[i - 1]);
      while at > 0 && at < len && self.pos_of(&self.keys[at]) == self.pos_of(&self.keys[at - 1]) {
        at += 1;
      }
      starts.push(at);
    }
    starts.push(len);

    let lower = |i: usize| -> u64 {
      if i == 0 {
        self.s1
      } else if starts[i] < len {
        self.pos_of(&self.keys[starts[i]])
      } else {
        self.s2
      }
    };
    let bounds: Vec<(u64, u64)> =
      (0..n).map(|i| (lower(i), if i + 1 < n { lower(i + 1) } else { self.s2 })).collect();

    let mut rest = std::mem::take(&mut self.keys).into_iter();
    bounds
      .into_iter()
      .enumerate()
      .map(|(i, (s1, s2))| {
        let count = starts[i + 1] - starts[i];
        let mut piece = Slot::new(Arc::clone(&self.layout), s1, s2, count);
        piece.put_all(rest.by_ref().take(count));
        piece
      })
      .collect()
  }

  /// Detach keys `[0, index)` into a new slot over `[s1, boundary)`; this
  /// slot keeps the rest and starts at `boundary`.
  ///
  /// Keys must be sorted, and `boundary` must lie above the detached
  /// positions and at or below the kept ones.
  pub fn cut_before(&mut self, index: usize, boundary: u64) -> Slot<T> {
    debug_assert!(index <= self.keys.len(), "cut index {index} past {} keys", self.keys.len());
    debug_assert!(
      self.s1 <= boundary && boundary <= self.s2,
      "boundary {boundary:#x} outside [{:#x}, {:#x})",
      self.s1,
      self.s2
    );
    let mut lower = Slot::new(Arc::clone(&self.layout), self.s1, boundary, self.keys.capacity());
    lower.put_all(self.keys.drain(..index));
    self.s1 = boundary;
    lower
  }

  /// Absorb an adjacent slot: bounds are united, keys appended, marks OR-ed.
  pub fn fusion(&mut self, other: Slot<T>) {
    debug_assert!(
      self.s2 == other.s1 || other.s2 == self.s1,
      "fusion of non-adjacent slots [{:#x}, {:#x}) and [{:#x}, {:#x})",
      self.s1,
      self.s2,
      other.s1,
      other.s2
    );
    self.s1 = self.s1.min(other.s1);
    self.s2 = self.s2.max(other.s2);
    self.mark |= other.mark;
    self.keys.extend(other.keys);
  }

  // =========================================================================
  // Validation and export
  // =========================================================================

  /// True if every key is valid for the layout and its position lies in
  /// `[s1, s2)`.
  pub fn test_well_formed(&self) -> bool {
    self.check_well_formed().is_ok()
  }

  /// [`Slot::test_well_formed`] naming the first offending key.
  pub fn check_well_formed(&self) -> Result<(), SlotError> {
    for (index, k) in self.keys.iter().enumerate() {
      let raw = k.raw();
      if !self.layout.is_valid_raw(raw) {
        return Err(SlotError::InvalidKey { index, raw });
      }
      let pos = self.pos_of(k);
      if !self.contains_pos(pos) {
        return Err(SlotError::Malformed { index, pos, s1: self.s1, s2: self.s2 });
      }
    }
    Ok(())
  }

  /// Copy the keys into `dst`, which must have exactly `len()` entries.
  pub fn copy_into(&self, dst: &mut [T]) {
    debug_assert_eq!(dst.len(), self.keys.len(), "copy_into buffer size");
    dst.copy_from_slice(&self.keys);
  }

  /// Tag fields of every key, OR-ed (the exact counterpart of the mark).
  pub fn present_tags(&self) -> u64 {
    self.keys.iter().fold(0, |acc, k| acc | self.tags_of(k))
  }
}

#[cfg(test)]
#[path = "slot_test.rs"]
mod slot_test;
