//! Cache - the last few slots a lookup landed in.
//!
//! ```text
//!   entries: [ h3 | h4 | h5 | h6 | h7 | h8 | h9 | h0 | h1 | h2 ]
//!                                                  ▲
//!                                   newest ────────┘  (next eviction: newest + 1)
//! ```
//!
//! Entries are arena handles; an entry whose slot has since been merged away
//! or replaced is skipped by the generation check and simply misses.

use super::arena::{SlotArena, SlotHandle};
use super::keyed::Keyed;
use crate::stats::CacheStats;

/// Number of remembered slots.
pub const CACHE_SIZE: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
  handle: SlotHandle,
  /// Index of the last key found in that slot.
  rank: Option<usize>,
}

/// Small round-robin cache of recently used slots.
#[derive(Clone, Debug)]
pub struct Cache {
  entries: [Option<Entry>; CACHE_SIZE],
  newest: usize,
  current: usize,
  hits: u64,
  misses: u64,
}

impl Default for Cache {
  fn default() -> Self {
    Self::new()
  }
}

impl Cache {
  pub fn new() -> Self {
    Self {
      entries: [None; CACHE_SIZE],
      newest: CACHE_SIZE - 1,
      current: CACHE_SIZE - 1,
      hits: 0,
      misses: 0,
    }
  }

  /// Handle of a cached, still-live slot whose interval holds `pos`.
  ///
  /// A hit makes that entry current.
  pub fn find<T: Keyed>(&mut self, pos: u64, arena: &SlotArena<T>) -> Option<SlotHandle> {
    let found = self.entries.iter().position(|entry| {
      entry
        .and_then(|e| arena.get(e.handle))
        .is_some_and(|slot| slot.contains_pos(pos))
    });
    match found {
      Some(i) => {
        self.hits += 1;
        self.current = i;
        self.entries[i].map(|e| e.handle)
      }
      None => {
        self.misses += 1;
        None
      }
    }
  }

  /// Remember `handle`, evicting the oldest entry; it becomes current.
  pub fn put_slot(&mut self, handle: SlotHandle) {
    let oldest = (self.newest + 1) % CACHE_SIZE;
    self.entries[oldest] = Some(Entry { handle, rank: None });
    self.newest = oldest;
    self.current = oldest;
  }

  /// Record the index of the key found in the current slot (`None` after a
  /// failed search).
  pub fn set_rank_in_slot(&mut self, rank: Option<usize>) {
    if let Some(entry) = self.entries[self.current].as_mut() {
      entry.rank = rank;
    }
  }

  /// Index of the last key found in the current slot.
  pub fn rank_in_slot(&self) -> Option<usize> {
    self.entries[self.current].and_then(|e| e.rank)
  }

  /// Handle of the current slot.
  pub fn current_slot(&self) -> Option<SlotHandle> {
    self.entries[self.current].map(|e| e.handle)
  }

  /// Forget every entry; counters are kept.
  pub fn reset(&mut self) {
    self.entries = [None; CACHE_SIZE];
    self.newest = CACHE_SIZE - 1;
    self.current = CACHE_SIZE - 1;
  }

  pub fn stats(&self) -> CacheStats {
    CacheStats { hits: self.hits, misses: self.misses }
  }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;
