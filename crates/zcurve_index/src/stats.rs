//! Snapshot statistics for collections and caches.

/// Occupancy of a slot collection at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionStats {
	/// Number of slots.
	pub slots: usize,
	/// Number of stored keys.
	pub nodes: usize,
	/// Largest slot length.
	pub max_slot_size: usize,
	/// Smallest slot length.
	pub min_slot_size: usize,
	/// Slots above `slot_max_size`.
	pub oversized: usize,
	/// Slots below `slot_min_size`.
	pub undersized: usize,
}

impl CollectionStats {
	/// Mean keys per slot (0 for an empty collection).
	#[inline]
	pub fn mean_slot_size(&self) -> f64 {
		if self.slots == 0 {
			0.0
		} else {
			self.nodes as f64 / self.slots as f64
		}
	}

	/// Slots the rebalancing policy should look at.
	#[inline]
	pub fn out_of_bounds(&self) -> usize {
		self.oversized + self.undersized
	}
}

/// Lookup counters of a [`Cache`](crate::Cache).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
	pub hits: u64,
	pub misses: u64,
}

impl CacheStats {
	/// Total lookups.
	#[inline]
	pub fn lookups(&self) -> u64 {
		self.hits + self.misses
	}

	/// Fraction of lookups that hit (0 when nothing was looked up).
	#[inline]
	pub fn hit_rate(&self) -> f64 {
		match self.lookups() {
			0 => 0.0,
			n => self.hits as f64 / n as f64,
		}
	}
}
