//! Sizing thresholds for a slot collection.
//!
//! The collection never rebalances by itself; these limits only feed the
//! oversized/undersized queries that an external policy acts on.

/// Slot sizing configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectionConfig {
	/// Capacity reserved for the collection's slot list.
	pub initial_slots: usize,
	/// Key capacity reserved for each new slot.
	pub slot_capacity: usize,
	/// A slot holding fewer keys is undersized (0 = never).
	pub slot_min_size: usize,
	/// A slot holding more keys is oversized.
	pub slot_max_size: usize,
}

impl CollectionConfig {
	/// Default limits for general use.
	pub const DEFAULT: Self = Self {
		initial_slots: 16,
		slot_capacity: 1024,
		slot_min_size: 64,
		slot_max_size: 4096,
	};

	/// Tiny slots, handy for exercising split and merge paths.
	pub const SMALL: Self = Self {
		initial_slots: 4,
		slot_capacity: 8,
		slot_min_size: 2,
		slot_max_size: 16,
	};

	/// No thresholds: nothing is ever over- or undersized.
	pub const UNBOUNDED: Self = Self {
		initial_slots: 1,
		slot_capacity: 0,
		slot_min_size: 0,
		slot_max_size: usize::MAX,
	};

	/// Check if a slot of `len` keys should be split.
	#[inline]
	pub fn is_oversized(&self, len: usize) -> bool {
		len > self.slot_max_size
	}

	/// Check if a slot of `len` keys should be merged with a neighbor.
	#[inline]
	pub fn is_undersized(&self, len: usize) -> bool {
		len < self.slot_min_size
	}
}

impl Default for CollectionConfig {
	fn default() -> Self {
		Self::DEFAULT
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_config() {
		let config = CollectionConfig::default();
		assert_eq!(config, CollectionConfig::DEFAULT);
		assert!(config.slot_min_size < config.slot_max_size);
		assert!(config.is_oversized(4097));
		assert!(!config.is_oversized(4096));
		assert!(config.is_undersized(63));
		assert!(!config.is_undersized(64));
	}

	#[test]
	fn test_unbounded_config() {
		let config = CollectionConfig::UNBOUNDED;
		assert!(!config.is_oversized(usize::MAX));
		assert!(!config.is_undersized(0));
	}

	#[test]
	fn test_small_config() {
		let config = CollectionConfig::SMALL;
		assert!(config.is_oversized(17));
		assert!(config.is_undersized(1));
	}
}
