//! SlotCollection - ordered slots tiling the whole position range.
//!
//! ```text
//!  0                                                         position_end
//!  ├──────────┬─────────────────┬────┬──────────────────────────────┤
//!  │ slot 0   │ slot 1          │ 2  │ slot 3                       │
//!  └──────────┴─────────────────┴────┴──────────────────────────────┘
//!   start_rank: 0       len(0)    len(0)+len(1)    ...
//! ```
//!
//! Keys are stored hashed, so a cell and its first descendant (which share a
//! position) never collide. Routing is a binary search on the slot bounds,
//! optionally short-circuited by a [`Cache`].
//!
//! Structural maintenance (`split_slot*`, `merge_with_next`, `compress`)
//! leaves ranks stale; call [`SlotCollection::relink`] or
//! [`SlotCollection::finalize`] before using `start_rank`, `copy_in_array` or
//! `global_rank`.

use std::sync::Arc;

use rayon::prelude::*;

use super::arena::{SlotArena, SlotHandle};
use super::cache::Cache;
use super::keyed::Keyed;
use super::slot::Slot;
use crate::config::CollectionConfig;
use crate::error::CollectionError;
use crate::key::Layout;
use crate::stats::CollectionStats;

/// Slots covering `[0, position_end)` in position order.
#[derive(Clone, Debug)]
pub struct SlotCollection<T: Keyed = u64> {
  layout: Arc<Layout>,
  arena: SlotArena<T>,
  order: Vec<SlotHandle>,
  config: CollectionConfig,
}

impl<T: Keyed> SlotCollection<T> {
  /// One slot covering every position.
  pub fn new(layout: Arc<Layout>, config: CollectionConfig) -> Self {
    let mut arena = SlotArena::with_capacity(config.initial_slots);
    let root = arena.insert(Slot::covering(Arc::clone(&layout), config.slot_capacity));
    let mut order = Vec::with_capacity(config.initial_slots.max(1));
    order.push(root);
    Self { layout, arena, order, config }
  }

  /// Adopt `slots` in the given order; slot ranks follow that order and
  /// start ranks are kept.
  pub(crate) fn from_slots(layout: Arc<Layout>, config: CollectionConfig, slots: Vec<Slot<T>>) -> Self {
    let mut arena = SlotArena::with_capacity(slots.len());
    let order = slots
      .into_iter()
      .enumerate()
      .map(|(i, mut slot)| {
        let start = slot.start_rank();
        slot.set_ranks(i, start);
        arena.insert(slot)
      })
      .collect();
    Self { layout, arena, order, config }
  }

  /// Same partition and thresholds, no keys; each slot reserves room for
  /// every key of the source slot to be refined once.
  pub fn clone_empty(&self) -> Self {
    let mut arena = SlotArena::with_capacity(self.order.len());
    let tree_type = self.layout.tree_type();
    let order = self
      .slots()
      .map(|slot| {
        let capacity = slot.len() * tree_type;
        arena.insert(Slot::new(Arc::clone(&self.layout), slot.s1(), slot.s2(), capacity))
      })
      .collect();
    Self { layout: Arc::clone(&self.layout), arena, order, config: self.config }
  }

  // =========================================================================
  // Accessors
  // =========================================================================

  #[inline]
  pub fn layout(&self) -> &Arc<Layout> {
    &self.layout
  }

  #[inline]
  pub fn config(&self) -> &CollectionConfig {
    &self.config
  }

  /// Number of slots.
  #[inline]
  pub fn nb_slots(&self) -> usize {
    self.order.len()
  }

  /// Slot at `index` in position order.
  #[inline]
  pub fn slot(&self, index: usize) -> Option<&Slot<T>> {
    self.order.get(index).and_then(|&h| self.arena.get(h))
  }

  #[inline]
  pub fn slot_mut(&mut self, index: usize) -> Option<&mut Slot<T>> {
    let handle = *self.order.get(index)?;
    self.arena.get_mut(handle)
  }

  /// Arena handle of the slot at `index`.
  #[inline]
  pub fn handle(&self, index: usize) -> Option<SlotHandle> {
    self.order.get(index).copied()
  }

  /// The arena, for resolving handles held by a [`Cache`].
  #[inline]
  pub fn arena(&self) -> &SlotArena<T> {
    &self.arena
  }

  /// Slots in position order.
  pub fn slots(&self) -> impl Iterator<Item = &Slot<T>> + '_ {
    self.order.iter().map(move |&h| &self.arena[h])
  }

  /// Every stored key, slot by slot.
  pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
    self.slots().flat_map(|slot| slot.keys().iter())
  }

  /// Every stored key, slot by slot.
  pub fn to_vec(&self) -> Vec<T> {
    self.iter().copied().collect()
  }

  fn no_such_slot(&self, index: usize) -> CollectionError {
    CollectionError::NoSuchSlot { index, len: self.order.len() }
  }

  // =========================================================================
  // Routing
  // =========================================================================

  /// Index of the slot whose interval holds `pos`.
  pub fn find_slot(&self, pos: u64) -> usize {
    let index = self.order.partition_point(|&h| self.arena[h].s2() <= pos);
    let index = index.min(self.order.len() - 1);
    debug_assert!(
      self.arena[self.order[index]].contains_pos(pos),
      "position {pos:#x} not covered by slot #{index}"
    );
    index
  }

  /// Raw hashed form of an unhashed raw key.
  #[inline]
  fn hashed(&self, raw: u64) -> u64 {
    self.layout.key(raw).hash().raw()
  }

  /// Slot index that would hold the unhashed key `raw`.
  #[inline]
  pub fn ubound(&self, raw: u64) -> usize {
    self.ubound_hashed(self.hashed(raw))
  }

  /// Slot index that would hold the already hashed key `raw`.
  #[inline]
  pub fn ubound_hashed(&self, raw: u64) -> usize {
    self.find_slot(raw & self.layout.maskpos())
  }

  /// Cache-assisted routing: probe the cache, fall back to the binary search
  /// and remember the result.
  fn route_cached(&self, pos: u64, cache: &mut Cache) -> SlotHandle {
    if let Some(handle) = cache.find(pos, &self.arena) {
      return handle;
    }
    let handle = self.order[self.find_slot(pos)];
    cache.put_slot(handle);
    handle
  }

  // =========================================================================
  // Insertion and lookup
  // =========================================================================

  /// Store `item` (unhashed) in the slot covering its hashed position.
  pub fn insert(&mut self, mut item: T) {
    let hashed = self.hashed(item.raw());
    item.set_raw(hashed);
    let handle = self.order[self.ubound_hashed(hashed)];
    self.arena[handle].put(item);
  }

  /// [`SlotCollection::insert`] routed through `cache`.
  pub fn insert_cached(&mut self, mut item: T, cache: &mut Cache) {
    let hashed = self.hashed(item.raw());
    item.set_raw(hashed);
    let handle = self.route_cached(hashed & self.layout.maskpos(), cache);
    self.arena[handle].put(item);
  }

  /// 1 if the unhashed key `raw` is stored (tags ignored), else 0.
  pub fn count(&self, raw: u64) -> usize {
    usize::from(self.find(raw).is_some())
  }

  /// [`SlotCollection::count`] routed through `cache`; the cache remembers
  /// the slot and the key's index in it.
  pub fn count_cached(&self, raw: u64, cache: &mut Cache) -> usize {
    let hashed = self.hashed(raw);
    let handle = self.route_cached(hashed & self.layout.maskpos(), cache);
    let rank = self.arena[handle].find(hashed);
    cache.set_rank_in_slot(rank);
    usize::from(rank.is_some())
  }

  /// `(slot index, key index)` of the unhashed key `raw`.
  pub fn find(&self, raw: u64) -> Option<(usize, usize)> {
    let hashed = self.hashed(raw);
    let index = self.ubound_hashed(hashed);
    self.arena[self.order[index]].find(hashed).map(|k| (index, k))
  }

  /// Stored (hashed) item equal to the unhashed key `raw`.
  pub fn get(&self, raw: u64) -> Option<&T> {
    let (slot, key) = self.find(raw)?;
    self.slot(slot).and_then(|s| s.get(key))
  }

  /// Global rank of the key last found through `cache`.
  ///
  /// Valid only while ranks are current (see [`SlotCollection::relink`]).
  pub fn global_rank(&self, cache: &Cache) -> Option<usize> {
    let slot = self.arena.get(cache.current_slot()?)?;
    Some(slot.start_rank() + cache.rank_in_slot()?)
  }

  // =========================================================================
  // Ranks
  // =========================================================================

  /// Recompute `slot_rank` and `start_rank` from the current slot order.
  pub fn relink(&mut self) {
    let mut start = 0;
    for (i, &h) in self.order.iter().enumerate() {
      let slot = &mut self.arena[h];
      slot.set_ranks(i, start);
      start += slot.len();
    }
  }

  /// Relink after a batch of insertions.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "slots::finalize"))]
  pub fn finalize(&mut self) {
    self.relink();
    #[cfg(feature = "tracing")]
    tracing::debug!(
      slots = self.order.len(),
      nodes = self.nb_nodes(),
      max_slot_size = self.max_slot_size(),
      "slot collection finalized"
    );
  }

  // =========================================================================
  // Tag maintenance
  // =========================================================================

  /// [`Slot::compress`] on every slot; returns the number of keys removed.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "slots::compress"))]
  pub fn compress(&mut self, pattern: u64) -> usize {
    let arena = &mut self.arena;
    self.order.iter().map(|&h| arena[h].compress(pattern)).sum()
  }

  /// Remove the void keys.
  pub fn compress_void(&mut self) -> usize {
    self.compress(self.layout.void_bit())
  }

  /// [`Slot::compress_any`] on every slot.
  pub fn compress_any(&mut self) -> usize {
    let arena = &mut self.arena;
    self.order.iter().map(|&h| arena[h].compress_any()).sum()
  }

  /// Forget every tag bit of every key.
  pub fn clear_tags(&mut self) {
    for &h in &self.order {
      self.arena[h].clear_tags();
    }
  }

  /// Empty every slot, keeping the partition.
  pub fn clear(&mut self) {
    for &h in &self.order {
      self.arena[h].clear();
    }
  }

  // =========================================================================
  // Structural maintenance
  // =========================================================================

  /// Replace slot `index` by `n` slots cut from it.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), name = "slots::split_slot"))]
  pub fn split_slot(&mut self, index: usize, n: usize) -> Result<(), CollectionError> {
    let handle = *self.order.get(index).ok_or_else(|| self.no_such_slot(index))?;
    let slot = self.arena.remove(handle).ok_or_else(|| self.no_such_slot(index))?;
    let pieces: Vec<SlotHandle> = slot.cut(n).into_iter().map(|piece| self.arena.insert(piece)).collect();
    self.order.splice(index..=index, pieces);
    Ok(())
  }

  /// Split slot `index` before its `key_index`-th key in position order.
  ///
  /// The cut moves forward past keys sharing a position, so the lower slot
  /// ends at the first position it does not hold.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), name = "slots::split_slot_at"))]
  pub fn split_slot_at(&mut self, index: usize, key_index: usize) -> Result<(), CollectionError> {
    let handle = *self.order.get(index).ok_or_else(|| self.no_such_slot(index))?;
    let maskpos = self.layout.maskpos();
    let slot = &mut self.arena[handle];
    slot.sort();

    let len = slot.len();
    let pos = |i: usize| slot.keys()[i].raw() & maskpos;
    let mut at = key_index.min(len);
    while at > 0 && at < len && pos(at) == pos(at - 1) {
      at += 1;
    }
    let boundary = if at < len { pos(at) } else { slot.s2() };

    let lower = slot.cut_before(at, boundary);
    let lower = self.arena.insert(lower);
    self.order.insert(index, lower);
    Ok(())
  }

  /// Fold slot `index + 1` into slot `index`.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), name = "slots::merge_with_next"))]
  pub fn merge_with_next(&mut self, index: usize) -> Result<(), CollectionError> {
    if index + 1 >= self.order.len() {
      return Err(self.no_such_slot(index + 1));
    }
    let next = self.order.remove(index + 1);
    let absorbed = self.arena.remove(next).ok_or_else(|| self.no_such_slot(index + 1))?;
    self.arena[self.order[index]].fusion(absorbed);
    Ok(())
  }

  /// Verify that the slots tile `[0, position_end)` and hold only keys
  /// inside their bounds.
  pub fn check_partition(&self) -> Result<(), CollectionError> {
    let mut expected = 0u64;
    for (index, slot) in self.slots().enumerate() {
      if slot.s1() != expected {
        let reason = if index == 0 { "first slot does not start at 0" } else { "gap or overlap with previous slot" };
        return Err(CollectionError::BrokenPartition { index, reason });
      }
      if slot.s2() < slot.s1() {
        return Err(CollectionError::BrokenPartition { index, reason: "reversed bounds" });
      }
      slot.check_well_formed()?;
      expected = slot.s2();
    }
    if expected != self.layout.position_end() {
      return Err(CollectionError::BrokenPartition {
        index: self.order.len() - 1,
        reason: "last slot does not reach the end of the position range",
      });
    }
    Ok(())
  }

  // =========================================================================
  // Statistics
  // =========================================================================

  /// Number of stored keys.
  pub fn nb_nodes(&self) -> usize {
    self.slots().map(Slot::len).sum()
  }

  /// Stored keys per level, indexed by level. Keys with a level field
  /// beyond `nlevels` are not counted.
  pub fn nb_nodes_by_level(&self) -> Vec<usize> {
    let mut counts = vec![0; self.layout.nlevels()];
    for item in self.iter() {
      if let Some(count) = counts.get_mut(self.layout.level_of(item.raw())) {
        *count += 1;
      }
    }
    counts
  }

  pub fn max_slot_size(&self) -> usize {
    self.slots().map(Slot::len).max().unwrap_or(0)
  }

  /// Indices of slots above `slot_max_size`.
  pub fn oversized_slots(&self) -> Vec<usize> {
    self.slots_where(|len| self.config.is_oversized(len))
  }

  /// Indices of slots below `slot_min_size`.
  pub fn undersized_slots(&self) -> Vec<usize> {
    self.slots_where(|len| self.config.is_undersized(len))
  }

  fn slots_where(&self, pred: impl Fn(usize) -> bool) -> Vec<usize> {
    self.slots().enumerate().filter(|(_, s)| pred(s.len())).map(|(i, _)| i).collect()
  }

  pub fn stats(&self) -> CollectionStats {
    let mut stats = CollectionStats {
      slots: self.order.len(),
      min_slot_size: usize::MAX,
      ..Default::default()
    };
    for slot in self.slots() {
      let len = slot.len();
      stats.nodes += len;
      stats.max_slot_size = stats.max_slot_size.max(len);
      stats.min_slot_size = stats.min_slot_size.min(len);
      stats.oversized += usize::from(self.config.is_oversized(len));
      stats.undersized += usize::from(self.config.is_undersized(len));
    }
    stats
  }

  // =========================================================================
  // Bulk export
  // =========================================================================

  /// Copy every key into `dst` at its global rank, one parallel task per
  /// slot. `dst` must hold exactly `nb_nodes()` entries.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "slots::copy_in_array"))]
  pub fn copy_in_array(&self, dst: &mut [T]) -> Result<(), CollectionError> {
    let expected = self.nb_nodes();
    if dst.len() != expected {
      return Err(CollectionError::BufferSize { expected, actual: dst.len() });
    }

    let slots: Vec<&Slot<T>> = self.slots().collect();
    let mut chunks: Vec<&mut [T]> = Vec::with_capacity(slots.len());
    let mut rest = dst;
    let mut offset = 0;
    for slot in &slots {
      debug_assert_eq!(slot.start_rank(), offset, "stale ranks: relink before copy_in_array");
      let (head, tail) = std::mem::take(&mut rest).split_at_mut(slot.len());
      chunks.push(head);
      rest = tail;
      offset += slot.len();
    }

    slots
      .par_iter()
      .zip(chunks.into_par_iter())
      .for_each(|(slot, chunk)| slot.copy_into(chunk));
    Ok(())
  }
}

#[cfg(test)]
#[path = "collection_test.rs"]
mod collection_test;
