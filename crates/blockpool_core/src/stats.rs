//! # Pool Statistics
//!
//! Point-in-time snapshot of a pool's occupancy and lifetime counters.

/// Statistics snapshot for a [`BlockPool`](crate::BlockPool).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of blocks in the backing region.
    pub capacity: usize,
    /// Effective (rounded) block size in bytes.
    pub block_size: usize,
    /// Size of the backing region in bytes, header included.
    pub region_bytes: usize,
    /// Blocks currently available for allocation.
    pub free: usize,
    /// Pool blocks currently handed out.
    pub allocated: usize,
    /// Blocks ever promoted from virgin memory into the free list.
    pub high_water_mark: usize,
    /// Overflow blocks currently handed out.
    pub overflow_live: usize,
    /// Successful allocations over the pool's lifetime (overflow included).
    pub total_allocations: u64,
    /// Successful frees over the pool's lifetime (overflow included).
    pub total_frees: u64,
    /// Allocation requests that found the pool empty.
    pub exhausted_events: u64,
    /// Allocations served by the system allocator after exhaustion.
    pub overflow_allocations: u64,
}

impl PoolStats {
    /// Fraction of pool blocks currently allocated, in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.allocated as f64 / self.capacity as f64
    }

    /// Blocks that were never touched.
    #[inline]
    #[must_use]
    pub const fn virgin(&self) -> usize {
        self.capacity - self.high_water_mark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization() {
        let stats = PoolStats {
            capacity: 4,
            allocated: 1,
            ..PoolStats::default()
        };
        assert!((stats.utilization() - 0.25).abs() < f64::EPSILON);
        assert!(PoolStats::default().utilization().abs() < f64::EPSILON);
    }

    #[test]
    fn test_virgin_count() {
        let stats = PoolStats {
            capacity: 10,
            high_water_mark: 3,
            ..PoolStats::default()
        };
        assert_eq!(stats.virgin(), 7);
    }
}
