//! Generational storage for slots.
//!
//! A [`SlotHandle`] names a slot by index and generation. Freed entries are
//! recycled with a bumped generation, so a handle kept by a cache after its
//! slot was merged away fails the liveness check instead of aliasing a new
//! slot.

use std::ops::{Index, IndexMut};

use super::keyed::Keyed;
use super::slot::Slot;

/// Generational slot identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SlotHandle {
  index: u32,
  generation: u32,
}

impl SlotHandle {
  #[inline]
  pub(crate) const fn new(index: u32, generation: u32) -> Self {
    Self { index, generation }
  }

  #[inline]
  pub const fn index(self) -> usize {
    self.index as usize
  }

  #[inline]
  pub const fn generation(self) -> u32 {
    self.generation
  }
}

/// Arena owning every slot of a collection.
#[derive(Clone, Debug)]
pub struct SlotArena<T: Keyed = u64> {
  entries: Vec<Option<Slot<T>>>,
  /// last generation per entry (persists across frees)
  generations: Vec<u32>,
  free_list: Vec<usize>,
}

impl<T: Keyed> Default for SlotArena<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Keyed> SlotArena<T> {
  pub fn new() -> Self {
    Self { entries: Vec::new(), generations: Vec::new(), free_list: Vec::new() }
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      entries: Vec::with_capacity(capacity),
      generations: Vec::with_capacity(capacity),
      free_list: Vec::new(),
    }
  }

  /// Store `slot`, reusing a freed entry when one exists.
  pub fn insert(&mut self, slot: Slot<T>) -> SlotHandle {
    if let Some(idx) = self.free_list.pop() {
      let generation = self.generations[idx].saturating_add(1);
      self.generations[idx] = generation;
      self.entries[idx] = Some(slot);
      SlotHandle::new(idx as u32, generation)
    } else {
      let generation = 1_u32;
      self.entries.push(Some(slot));
      self.generations.push(generation);
      SlotHandle::new((self.entries.len() - 1) as u32, generation)
    }
  }

  /// Take the slot out; the handle (and every copy of it) goes stale.
  pub fn remove(&mut self, handle: SlotHandle) -> Option<Slot<T>> {
    if !self.is_alive(handle) {
      return None;
    }
    let slot = self.entries[handle.index()].take();
    self.free_list.push(handle.index());
    slot
  }

  /// A handle is live if its entry is occupied and the generations match.
  #[inline]
  pub fn is_alive(&self, handle: SlotHandle) -> bool {
    let idx = handle.index();
    matches!(self.entries.get(idx), Some(Some(_))) && self.generations[idx] == handle.generation
  }

  #[inline]
  pub fn get(&self, handle: SlotHandle) -> Option<&Slot<T>> {
    if !self.is_alive(handle) {
      return None;
    }
    self.entries[handle.index()].as_ref()
  }

  #[inline]
  pub fn get_mut(&mut self, handle: SlotHandle) -> Option<&mut Slot<T>> {
    if !self.is_alive(handle) {
      return None;
    }
    self.entries[handle.index()].as_mut()
  }

  /// Number of live slots.
  pub fn len(&self) -> usize {
    self.entries.len() - self.free_list.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Panics on a stale handle, like slice indexing out of bounds.
impl<T: Keyed> Index<SlotHandle> for SlotArena<T> {
  type Output = Slot<T>;

  #[inline]
  fn index(&self, handle: SlotHandle) -> &Slot<T> {
    match self.get(handle) {
      Some(slot) => slot,
      None => panic!("stale slot handle {handle:?}"),
    }
  }
}

impl<T: Keyed> IndexMut<SlotHandle> for SlotArena<T> {
  #[inline]
  fn index_mut(&mut self, handle: SlotHandle) -> &mut Slot<T> {
    match self.get_mut(handle) {
      Some(slot) => slot,
      None => panic!("stale slot handle {handle:?}"),
    }
  }
}
