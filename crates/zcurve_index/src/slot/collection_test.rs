use std::collections::HashSet;

use glam::U64Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::error::SlotError;
use crate::key::SpatialKey;

fn collection(dim: usize, width: u32, config: CollectionConfig) -> SlotCollection {
  SlotCollection::new(Arc::new(Layout::new(dim, width).unwrap()), config)
}

/// Distinct random keys at random levels, unhashed.
fn random_keys(layout: &Layout, count: usize, seed: u64) -> Vec<u64> {
  let mut rng = StdRng::seed_from_u64(seed);
  let mut seen = HashSet::new();
  let mut out = Vec::with_capacity(count);
  while out.len() < count {
    let level = rng.random_range(0..layout.nlevels() - 1);
    let side = 1u64 << (level + 1);
    let mut c = U64Vec3::ZERO;
    for axis in layout.axes() {
      c[axis.index()] = rng.random_range(0..side);
    }
    let raw = SpatialKey::from_coords(layout, level, c).raw();
    if seen.insert(raw) {
      out.push(raw);
    }
  }
  out
}

// =========================================================================
// Construction
// =========================================================================

#[test]
fn test_new_covers_everything() {
  let sc = collection(3, 32, CollectionConfig::DEFAULT);
  assert_eq!(sc.nb_slots(), 1);
  assert_eq!(sc.nb_nodes(), 0);

  let root = sc.slot(0).unwrap();
  assert_eq!(root.s1(), 0);
  assert_eq!(root.s2(), sc.layout().position_end());
  assert!(root.capacity() >= CollectionConfig::DEFAULT.slot_capacity);
  assert_eq!(sc.check_partition(), Ok(()));
}

/// clone_empty keeps the partition and reserves len * 2^dim per slot.
#[test]
fn test_clone_empty() {
  let mut sc = collection(2, 32, CollectionConfig::SMALL);
  for raw in random_keys(sc.layout(), 40, 7) {
    sc.insert(raw);
  }
  sc.split_slot(0, 4).unwrap();

  let empty = sc.clone_empty();
  assert_eq!(empty.nb_slots(), 4);
  assert_eq!(empty.nb_nodes(), 0);
  for (a, b) in sc.slots().zip(empty.slots()) {
    assert_eq!((a.s1(), a.s2()), (b.s1(), b.s2()));
    assert!(b.capacity() >= a.len() * 4);
  }
}

// =========================================================================
// Insert and count
// =========================================================================

/// 2D, 16-bit: insert the origin and the X bit, look both up, miss a third.
#[test]
fn test_insert_count_2d_16() {
  let mut sc = collection(2, 16, CollectionConfig::DEFAULT);
  let xbit = sc.layout().xbit();

  sc.insert(0);
  sc.insert(xbit);

  assert_eq!(sc.count(0), 1);
  assert_eq!(sc.count(xbit), 1);
  assert_eq!(sc.count(xbit + 1), 0);
  assert_eq!(sc.nb_nodes(), 2);
}

/// Stored keys are hashed; lookups take the plain key.
#[test]
fn test_keys_stored_hashed() {
  let mut sc = collection(3, 64, CollectionConfig::DEFAULT);
  let l = Arc::clone(sc.layout());
  let key = SpatialKey::from_coords(&l, 4, U64Vec3::new(3, 17, 30));
  sc.insert(key.raw());

  let stored = *sc.get(key.raw()).unwrap();
  assert_eq!(stored, key.hash().raw());
  assert!(l.key(stored).is_hashed());
}

/// A father and its first son share a position but both stay findable.
#[test]
fn test_father_and_first_son_distinct() {
  let mut sc = collection(2, 32, CollectionConfig::DEFAULT);
  let l = Arc::clone(sc.layout());
  let father = SpatialKey::from_coords(&l, 3, U64Vec3::new(5, 2, 0));
  let son = father.first_son().unwrap();

  sc.insert(father.raw());
  assert_eq!(sc.count(son.raw()), 0);
  sc.insert(son.raw());
  assert_eq!(sc.count(father.raw()), 1);
  assert_eq!(sc.count(son.raw()), 1);
}

#[test]
fn test_count_ignores_tags() {
  let mut sc = collection(1, 32, CollectionConfig::DEFAULT);
  let l = Arc::clone(sc.layout());
  let key = SpatialKey::from_coords(&l, 5, U64Vec3::new(13, 0, 0));
  sc.insert(key.with_tags(l.tag_bit(0)).raw());

  assert_eq!(sc.count(key.raw()), 1);
  assert_eq!(sc.count(key.with_tags(l.tag_bit(2)).raw()), 1);
}

/// Cached and uncached paths agree on a multi-slot collection.
#[test]
fn test_cached_paths_agree() {
  let mut sc = collection(3, 32, CollectionConfig::SMALL);
  let keys = random_keys(sc.layout(), 300, 11);
  let (stored, absent) = keys.split_at(200);

  let mut cache = Cache::new();
  for &raw in &stored[..50] {
    sc.insert(raw);
  }
  sc.split_slot(0, 6).unwrap();
  for &raw in &stored[50..] {
    sc.insert_cached(raw, &mut cache);
  }
  assert_eq!(sc.nb_nodes(), 200);
  assert_eq!(sc.check_partition(), Ok(()));

  for &raw in stored {
    assert_eq!(sc.count(raw), 1, "stored key {raw:#x}");
    assert_eq!(sc.count_cached(raw, &mut cache), 1, "stored key {raw:#x} (cached)");
  }
  for &raw in absent {
    assert_eq!(sc.count(raw), 0, "absent key {raw:#x}");
    assert_eq!(sc.count_cached(raw, &mut cache), 0, "absent key {raw:#x} (cached)");
  }
  assert!(cache.stats().hits > 0, "repeated lookups should hit the cache");
}

/// global_rank matches the key's index in copy_in_array output.
#[test]
fn test_global_rank_after_finalize() {
  let mut sc = collection(2, 32, CollectionConfig::SMALL);
  let keys = random_keys(sc.layout(), 64, 3);
  for &raw in &keys {
    sc.insert(raw);
  }
  sc.split_slot(0, 5).unwrap();
  sc.finalize();

  let mut all = vec![0u64; sc.nb_nodes()];
  sc.copy_in_array(&mut all).unwrap();

  let mut cache = Cache::new();
  for &raw in &keys {
    assert_eq!(sc.count_cached(raw, &mut cache), 1);
    let rank = sc.global_rank(&cache).unwrap();
    assert_eq!(all[rank], sc.layout().key(raw).hash().raw());
  }
}

// =========================================================================
// Routing
// =========================================================================

#[test]
fn test_find_slot_half_open() {
  let mut sc = collection(2, 16, CollectionConfig::DEFAULT);
  for raw in [0x10u64, 0x20, 0x30, 0x40] {
    sc.slot_mut(0).unwrap().put(raw);
  }
  sc.split_slot(0, 2).unwrap();
  let boundary = sc.slot(1).unwrap().s1();
  assert_eq!(boundary, 0x30);

  assert_eq!(sc.find_slot(0), 0);
  assert_eq!(sc.find_slot(boundary - 1), 0);
  assert_eq!(sc.find_slot(boundary), 1, "s1 belongs to the upper slot");
  assert_eq!(sc.find_slot(sc.layout().maskpos()), 1);
}

#[test]
fn test_ubound() {
  let mut sc = collection(2, 32, CollectionConfig::DEFAULT);
  let l = Arc::clone(sc.layout());
  let low = SpatialKey::from_coords(&l, 0, U64Vec3::ZERO);
  let high = SpatialKey::from_coords(&l, 1, U64Vec3::new(1, 3, 0));
  sc.insert(low.raw());
  sc.insert(high.raw());
  sc.split_slot(0, 2).unwrap();

  assert_eq!(sc.ubound(low.raw()), 0);
  assert_eq!(sc.ubound_hashed(low.hash().raw()), 0);
  assert_eq!(sc.ubound(high.raw()), 1);
  assert_eq!(sc.ubound_hashed(high.hash().raw()), 1);
}

// =========================================================================
// Ranks
// =========================================================================

/// finalize: start ranks are the prefix sums of slot lengths.
#[test]
fn test_finalize_prefix_sums() {
  let mut sc = collection(3, 64, CollectionConfig::SMALL);
  for raw in random_keys(sc.layout(), 100, 5) {
    sc.insert(raw);
  }
  sc.split_slot(0, 7).unwrap();
  sc.finalize();

  let mut expected = 0;
  for (i, slot) in sc.slots().enumerate() {
    assert_eq!(slot.slot_rank(), i);
    assert_eq!(slot.start_rank(), expected, "slot {i}");
    expected += slot.len();
  }
  assert_eq!(expected, 100);
}

#[test]
fn test_copy_in_array() {
  let mut sc = collection(2, 64, CollectionConfig::SMALL);
  for raw in random_keys(sc.layout(), 500, 9) {
    sc.insert(raw);
  }
  sc.split_slot(0, 16).unwrap();
  sc.finalize();

  let mut out = vec![0u64; sc.nb_nodes()];
  sc.copy_in_array(&mut out).unwrap();
  assert_eq!(out, sc.to_vec());

  let mut short = vec![0u64; 3];
  assert_eq!(
    sc.copy_in_array(&mut short),
    Err(CollectionError::BufferSize { expected: 500, actual: 3 })
  );
}

// =========================================================================
// Maintenance
// =========================================================================

#[test]
fn test_compress_void_keys() {
  let mut sc = collection(2, 32, CollectionConfig::SMALL);
  let l = Arc::clone(sc.layout());
  let keys = random_keys(&l, 60, 13);
  for (i, &raw) in keys.iter().enumerate() {
    let raw = if i % 3 == 0 { raw | l.void_bit() } else { raw };
    sc.insert(raw);
  }
  sc.split_slot(0, 3).unwrap();

  assert_eq!(sc.compress_void(), 20);
  assert_eq!(sc.nb_nodes(), 40);
  assert!(sc.slots().all(|s| !s.has_void_keys()));
  assert_eq!(sc.compress_void(), 0);
}

#[test]
fn test_clear_tags_and_clear() {
  let mut sc = collection(1, 16, CollectionConfig::DEFAULT);
  let l = Arc::clone(sc.layout());
  sc.insert(l.key(0).with_level(2).with_tags(l.tag_bit(1)).raw());
  sc.insert(l.key(0).with_level(4).raw());

  sc.clear_tags();
  assert!(sc.iter().all(|&raw| raw & l.tag_mask() == 0));
  assert_eq!(sc.compress_any(), 0);

  sc.clear();
  assert_eq!(sc.nb_nodes(), 0);
  assert_eq!(sc.nb_slots(), 1);
}

/// split_slot_at never separates keys at one position.
#[test]
fn test_split_slot_at() {
  let mut sc = collection(2, 16, CollectionConfig::DEFAULT);
  {
    let root = sc.slot_mut(0).unwrap();
    root.put_all([0x40u64, 0x10, 0x20, 0x20, 0x80]);
  }
  sc.split_slot_at(0, 2).unwrap();

  assert_eq!(sc.nb_slots(), 2);
  let (lower, upper) = (sc.slot(0).unwrap(), sc.slot(1).unwrap());
  assert_eq!(lower.keys(), &[0x10, 0x20, 0x20]);
  assert_eq!(upper.keys(), &[0x40, 0x80]);
  assert_eq!(lower.s2(), 0x40);
  assert_eq!(upper.s1(), 0x40);
  assert_eq!(sc.check_partition(), Ok(()));
}

#[test]
fn test_split_then_merge_restores_partition() {
  let mut sc = collection(3, 32, CollectionConfig::SMALL);
  let keys = random_keys(sc.layout(), 80, 17);
  for &raw in &keys {
    sc.insert(raw);
  }
  sc.split_slot(0, 4).unwrap();
  assert_eq!(sc.nb_slots(), 4);

  while sc.nb_slots() > 1 {
    sc.merge_with_next(0).unwrap();
    assert_eq!(sc.check_partition(), Ok(()));
  }
  assert_eq!(sc.nb_nodes(), 80);
  for &raw in &keys {
    assert_eq!(sc.count(raw), 1);
  }
}

#[test]
fn test_bad_indices_are_errors() {
  let mut sc = collection(2, 32, CollectionConfig::DEFAULT);
  assert_eq!(sc.split_slot(3, 2), Err(CollectionError::NoSuchSlot { index: 3, len: 1 }));
  assert_eq!(sc.split_slot_at(1, 0), Err(CollectionError::NoSuchSlot { index: 1, len: 1 }));
  assert_eq!(sc.merge_with_next(0), Err(CollectionError::NoSuchSlot { index: 1, len: 1 }));
}

/// A cached handle to a merged-away slot misses instead of misrouting.
#[test]
fn test_cache_survives_merge() {
  let mut sc = collection(2, 32, CollectionConfig::SMALL);
  let keys = random_keys(sc.layout(), 30, 23);
  for &raw in &keys {
    sc.insert(raw);
  }
  sc.split_slot(0, 3).unwrap();

  let mut cache = Cache::new();
  for &raw in &keys {
    sc.count_cached(raw, &mut cache);
  }
  sc.merge_with_next(1).unwrap();
  for &raw in &keys {
    assert_eq!(sc.count_cached(raw, &mut cache), 1, "key {raw:#x} after merge");
  }
}

#[test]
fn test_check_partition_detects_malformed_slot() {
  let mut sc = collection(2, 16, CollectionConfig::DEFAULT);
  for raw in [0x10u64, 0x90] {
    sc.slot_mut(0).unwrap().put(raw);
  }
  sc.split_slot(0, 2).unwrap();
  sc.slot_mut(0).unwrap().put(0xf0);

  assert!(matches!(
    sc.check_partition(),
    Err(CollectionError::Slot(SlotError::Malformed { index: 1, pos: 0xf0, .. }))
  ));
}

// =========================================================================
// Statistics
// =========================================================================

#[test]
fn test_nb_nodes_by_level() {
  let mut sc = collection(2, 32, CollectionConfig::DEFAULT);
  let l = Arc::clone(sc.layout());
  for level in [0usize, 2, 2, 5] {
    let side = 1u64 << (level + 1);
    sc.insert(SpatialKey::from_coords(&l, level, U64Vec3::new(side - 1, sc.nb_nodes() as u64 % side, 0)).raw());
  }

  let counts = sc.nb_nodes_by_level();
  assert_eq!(counts.len(), l.nlevels());
  assert_eq!(counts[0], 1);
  assert_eq!(counts[2], 2);
  assert_eq!(counts[5], 1);
  assert_eq!(counts.iter().sum::<usize>(), 4);
}

/// A key whose level field is past nlevels (only reachable through raw
/// slot access or restore) is left out of the per-level counts.
#[test]
fn test_nb_nodes_by_level_skips_invalid_levels() {
  let mut sc = collection(3, 64, CollectionConfig::DEFAULT);
  let l = Arc::clone(sc.layout());
  let bogus = 31u64 << l.levelshift();
  assert!(!l.is_valid_raw(bogus));
  sc.slot_mut(0).unwrap().put(bogus);
  sc.insert(0);

  let counts = sc.nb_nodes_by_level();
  assert_eq!(counts.len(), 18);
  assert_eq!(counts.iter().sum::<usize>(), 1);
  assert_eq!(sc.nb_nodes(), 2);
  assert!(matches!(
    sc.check_partition(),
    Err(CollectionError::Slot(SlotError::InvalidKey { index: 0, raw })) if raw == bogus
  ));
}

#[test]
fn test_size_thresholds() {
  let config = CollectionConfig { slot_min_size: 5, slot_max_size: 20, ..CollectionConfig::SMALL };
  let mut sc = collection(3, 32, config);
  for raw in random_keys(sc.layout(), 50, 29) {
    sc.insert(raw);
  }
  assert_eq!(sc.oversized_slots(), vec![0]);
  assert_eq!(sc.max_slot_size(), 50);

  sc.split_slot(0, 10).unwrap();
  let stats = sc.stats();
  assert_eq!(stats.slots, 10);
  assert_eq!(stats.nodes, 50);
  assert_eq!(stats.oversized, sc.oversized_slots().len());
  assert_eq!(stats.undersized, sc.undersized_slots().len());
  assert!(stats.min_slot_size <= stats.max_slot_size);
}
