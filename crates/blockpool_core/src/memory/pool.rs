//! # Block Pool
//!
//! Fixed-size block allocator over one pre-reserved region.
//!
//! ## Free List
//!
//! Free blocks form a LIFO chain threaded through their first four bytes.
//! The chain is built lazily: each `allocate` promotes at most one virgin
//! block (index `high_water_mark`) by writing `high_water_mark + 1` into it,
//! so creating a pool never walks the region.
//!
//! ```text
//!  cursor
//!    │
//!    ▼
//! [ 2 | ... ] -> [ 0 | ... ] -> [ 3 | virgin ... ]
//!  block 1        block 2        block 0        block 3 (not yet promoted)
//! ```
//!
//! ## Block States
//!
//! `Virgin -> Free` once, during promotion. `Free <-> Allocated` through
//! `allocate` / `free`. Nothing returns a block to `Virgin`.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::{OverflowPolicy, PoolConfig};
use crate::error::{PoolError, PoolResult};
use crate::memory::region::BackingRegion;
use crate::stats::PoolStats;

/// Source of unique pool ids, so handles from one pool are rejected by another.
static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

/// Where a block's storage came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockOrigin {
    /// A slot inside the pool's backing region.
    Pool,
    /// A standalone system allocation made after the pool ran out.
    Overflow,
}

/// Handle to an allocated block.
///
/// Handles are plain values. Freeing the same handle twice, or using it
/// after it was freed, is reported as an error instead of corrupting the
/// free list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockHandle {
    /// Id of the pool that issued this handle.
    pool_id: u32,
    /// Block index (pool origin) or overflow slot (overflow origin).
    index: u32,
    /// Storage origin.
    origin: BlockOrigin,
}

impl BlockHandle {
    /// Block index within the pool, or overflow slot number.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Where the block's storage lives.
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> BlockOrigin {
        self.origin
    }
}

/// Lifecycle state of a pool block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockState {
    /// Never linked into the free list.
    Virgin,
    /// On the free list.
    Free,
    /// Handed out to a caller.
    Allocated,
}

/// Lifetime counters.
#[derive(Clone, Copy, Debug, Default)]
struct Counters {
    allocations: u64,
    frees: u64,
    exhausted: u64,
    overflow: u64,
}

/// A fixed-size block pool.
///
/// All blocks have the same size, rounded up to a multiple of 16 bytes.
/// Allocation and free are O(1); creation does no per-block work.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread, or wrap it in a
/// [`SharedBlockPool`](crate::SharedBlockPool).
///
/// # Example
///
/// ```rust,ignore
/// let mut pool = BlockPool::new(8, 3)?;
///
/// let a = pool.allocate().unwrap();
/// pool.write(a, 42u64)?;
/// assert_eq!(pool.read::<u64>(a)?, 42);
///
/// pool.free(a)?;
/// ```
pub struct BlockPool {
    /// Unique id stamped into every handle.
    id: u32,
    /// The backing storage.
    region: BackingRegion,
    /// Effective block size in bytes.
    block_size: usize,
    /// Number of blocks; also the "empty list" sentinel link.
    capacity: u32,
    /// Blocks ever promoted from virgin memory.
    high_water_mark: u32,
    /// Next block `allocate` returns. `None` iff `free_count == 0`.
    cursor: Option<u32>,
    /// Blocks available for allocation.
    free_count: u32,
    /// Behaviour once `free_count` reaches zero.
    overflow_policy: OverflowPolicy,
    /// Live and vacated overflow allocations.
    overflow: Vec<Option<Box<[u8]>>>,
    /// Vacated overflow slots available for reuse.
    overflow_vacant: Vec<u32>,
    /// Lifetime counters.
    counters: Counters,
}

impl BlockPool {
    /// Creates a pool of `capacity` blocks of at least `block_size` bytes.
    ///
    /// This is **O(1)** in `capacity`: the region is reserved but no block
    /// is touched until it is first allocated.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidBlockSize`] if `block_size` is zero
    /// - [`PoolError::InvalidCapacity`] if `capacity` is zero or above `u32::MAX`
    /// - [`PoolError::RegionTooLarge`] if the region size overflows
    /// - [`PoolError::BackingAllocationFailure`] if the system allocator fails
    pub fn new(block_size: usize, capacity: usize) -> PoolResult<Self> {
        Self::with_config(&PoolConfig::new(block_size, capacity))
    }

    /// Creates a pool from a [`PoolConfig`].
    ///
    /// # Errors
    ///
    /// Same as [`BlockPool::new`].
    pub fn with_config(config: &PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        let block_size = config
            .effective_block_size()
            .ok_or(PoolError::InvalidBlockSize(config.block_size))?;
        let capacity = u32::try_from(config.capacity)
            .map_err(|_| PoolError::InvalidCapacity(config.capacity))?;

        let region = BackingRegion::allocate(block_size, config.capacity)?;
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            pool_id = id,
            block_size,
            capacity,
            region_bytes = region.len_bytes(),
            "block pool initialized"
        );

        Ok(Self {
            id,
            region,
            block_size,
            capacity,
            high_water_mark: 0,
            cursor: Some(0),
            free_count: capacity,
            overflow_policy: config.overflow,
            overflow: Vec::new(),
            overflow_vacant: Vec::new(),
            counters: Counters::default(),
        })
    }

    /// Effective block size in bytes.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total number of pool blocks.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Number of blocks available for allocation.
    #[inline]
    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.free_count as usize
    }

    /// Number of pool blocks currently allocated.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        (self.capacity - self.free_count) as usize
    }

    /// Number of blocks ever promoted out of virgin memory.
    #[inline]
    #[must_use]
    pub const fn high_water_mark(&self) -> usize {
        self.high_water_mark as usize
    }

    /// Whether every pool block is allocated.
    #[inline]
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.free_count == 0
    }

    /// Configured overflow policy.
    #[inline]
    #[must_use]
    pub const fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow_policy
    }

    /// Allocates one block.
    ///
    /// Returns `None` when the pool is exhausted and no overflow is
    /// configured. This is a **O(1)** operation.
    #[inline]
    pub fn allocate(&mut self) -> Option<BlockHandle> {
        self.try_allocate().ok()
    }

    /// Allocates one block, reporting exhaustion as an error.
    ///
    /// # Errors
    ///
    /// - [`PoolError::PoolExhausted`] when no block is free and the policy
    ///   is [`OverflowPolicy::Reject`]
    /// - [`PoolError::BackingAllocationFailure`] when an overflow allocation fails
    pub fn try_allocate(&mut self) -> PoolResult<BlockHandle> {
        // Lazy promotion: link one more virgin block into the chain.
        if self.high_water_mark < self.capacity {
            let index = self.high_water_mark;
            self.region.write_link(index as usize, index + 1);
            self.high_water_mark += 1;
        }

        let Some(index) = self.cursor else {
            return self.allocate_overflow();
        };

        self.free_count -= 1;
        self.cursor = if self.free_count > 0 {
            let next = self.region.read_link(index as usize);
            debug_assert!(next < self.capacity, "free list reached the sentinel early");
            Some(next)
        } else {
            None
        };

        self.region.set_live(index as usize, true);
        self.counters.allocations += 1;

        Ok(BlockHandle {
            pool_id: self.id,
            index,
            origin: BlockOrigin::Pool,
        })
    }

    /// Returns a block to the pool.
    ///
    /// Only the first four bytes of the block are rewritten; the rest of
    /// the payload is left as-is. This is a **O(1)** operation.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidHandle`] if the handle came from another pool
    ///   or names a block that was never handed out
    /// - [`PoolError::DoubleFree`] if the block is already free
    pub fn free(&mut self, handle: BlockHandle) -> PoolResult<()> {
        if handle.origin == BlockOrigin::Overflow {
            return self.free_overflow(handle);
        }

        let index = self.pool_index(handle)?;
        if !self.region.is_live(index) {
            tracing::warn!(pool_id = self.id, index, "double free rejected");
            return Err(PoolError::DoubleFree { index: handle.index });
        }

        // An empty list is marked by linking to `capacity`.
        let next = self.cursor.unwrap_or(self.capacity);
        self.region.write_link(index, next);
        self.cursor = Some(handle.index);
        self.free_count += 1;

        self.region.set_live(index, false);
        self.counters.frees += 1;
        Ok(())
    }

    /// Payload bytes of an allocated block.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidHandle`] for foreign or out-of-range handles
    /// - [`PoolError::UseAfterFree`] if the block was freed
    pub fn block(&self, handle: BlockHandle) -> PoolResult<&[u8]> {
        match handle.origin {
            BlockOrigin::Pool => {
                let index = self.live_index(handle)?;
                Ok(self.region.block(index))
            }
            BlockOrigin::Overflow => {
                let slot = self.overflow_slot(handle)?;
                self.overflow[slot]
                    .as_deref()
                    .ok_or(PoolError::UseAfterFree { index: handle.index })
            }
        }
    }

    /// Mutable payload bytes of an allocated block.
    ///
    /// # Errors
    ///
    /// Same as [`BlockPool::block`].
    pub fn block_mut(&mut self, handle: BlockHandle) -> PoolResult<&mut [u8]> {
        match handle.origin {
            BlockOrigin::Pool => {
                let index = self.live_index(handle)?;
                Ok(self.region.block_mut(index))
            }
            BlockOrigin::Overflow => {
                let slot = self.overflow_slot(handle)?;
                self.overflow[slot]
                    .as_deref_mut()
                    .ok_or(PoolError::UseAfterFree { index: handle.index })
            }
        }
    }

    /// Reads a `T` from the start of a block.
    ///
    /// # Errors
    ///
    /// [`PoolError::PayloadTooLarge`] if `T` does not fit, otherwise as
    /// [`BlockPool::block`].
    pub fn read<T: bytemuck::Pod>(&self, handle: BlockHandle) -> PoolResult<T> {
        let size = self.payload_size::<T>()?;
        let bytes = self.block(handle)?;
        Ok(bytemuck::pod_read_unaligned(&bytes[..size]))
    }

    /// Writes a `T` to the start of a block.
    ///
    /// # Errors
    ///
    /// Same as [`BlockPool::read`].
    pub fn write<T: bytemuck::Pod>(&mut self, handle: BlockHandle, value: T) -> PoolResult<()> {
        let size = self.payload_size::<T>()?;
        let bytes = self.block_mut(handle)?;
        bytes[..size].copy_from_slice(bytemuck::bytes_of(&value));
        Ok(())
    }

    /// State of pool block `index`, or `None` if out of range.
    #[must_use]
    pub fn block_state(&self, index: usize) -> Option<BlockState> {
        if index >= self.capacity() {
            return None;
        }
        if index >= self.high_water_mark() {
            return Some(BlockState::Virgin);
        }
        if self.region.is_live(index) {
            Some(BlockState::Allocated)
        } else {
            Some(BlockState::Free)
        }
    }

    /// Returns a statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity(),
            block_size: self.block_size,
            region_bytes: self.region.len_bytes(),
            free: self.free_count(),
            allocated: self.allocated_count(),
            high_water_mark: self.high_water_mark(),
            overflow_live: self.overflow.len() - self.overflow_vacant.len(),
            total_allocations: self.counters.allocations,
            total_frees: self.counters.frees,
            exhausted_events: self.counters.exhausted,
            overflow_allocations: self.counters.overflow,
        }
    }

    /// Releases the backing region and returns the final statistics.
    ///
    /// Dropping the pool has the same effect. Every handle issued by this
    /// pool becomes meaningless afterwards.
    pub fn release(self) -> PoolStats {
        let stats = self.stats();
        tracing::debug!(
            pool_id = self.id,
            allocations = stats.total_allocations,
            frees = stats.total_frees,
            "block pool released"
        );
        stats
    }

    /// Serves an allocation after the pool ran out.
    fn allocate_overflow(&mut self) -> PoolResult<BlockHandle> {
        self.counters.exhausted += 1;

        if self.overflow_policy == OverflowPolicy::Reject {
            return Err(PoolError::PoolExhausted {
                capacity: self.capacity(),
            });
        }

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(self.block_size)
            .map_err(|_| PoolError::BackingAllocationFailure {
                bytes: self.block_size,
            })?;
        storage.resize(self.block_size, 0u8);
        let storage = storage.into_boxed_slice();

        let slot = if let Some(slot) = self.overflow_vacant.pop() {
            self.overflow[slot as usize] = Some(storage);
            slot
        } else {
            let slot = u32::try_from(self.overflow.len()).map_err(|_| {
                PoolError::PoolExhausted {
                    capacity: self.capacity(),
                }
            })?;
            self.overflow.push(Some(storage));
            slot
        };

        tracing::trace!(pool_id = self.id, slot, "overflow block allocated");
        self.counters.allocations += 1;
        self.counters.overflow += 1;

        Ok(BlockHandle {
            pool_id: self.id,
            index: slot,
            origin: BlockOrigin::Overflow,
        })
    }

    /// Hands an overflow block back to the system allocator.
    fn free_overflow(&mut self, handle: BlockHandle) -> PoolResult<()> {
        let slot = self.overflow_slot(handle)?;
        if self.overflow[slot].take().is_none() {
            tracing::warn!(pool_id = self.id, slot, "double free of overflow block rejected");
            return Err(PoolError::DoubleFree { index: handle.index });
        }
        self.overflow_vacant.push(handle.index);
        self.counters.frees += 1;
        Ok(())
    }

    /// Maps a pool handle to its block index.
    ///
    /// Blocks at or past the high-water mark were never handed out, so
    /// handles naming them cannot be genuine.
    fn pool_index(&self, handle: BlockHandle) -> PoolResult<usize> {
        if handle.pool_id != self.id || handle.index >= self.high_water_mark {
            tracing::warn!(
                pool_id = self.id,
                handle_pool = handle.pool_id,
                index = handle.index,
                "foreign block handle rejected"
            );
            return Err(PoolError::InvalidHandle { index: handle.index });
        }
        Ok(handle.index as usize)
    }

    /// Maps a pool handle to the index of a currently allocated block.
    fn live_index(&self, handle: BlockHandle) -> PoolResult<usize> {
        let index = self.pool_index(handle)?;
        if !self.region.is_live(index) {
            return Err(PoolError::UseAfterFree { index: handle.index });
        }
        Ok(index)
    }

    /// Maps an overflow handle to its slot.
    fn overflow_slot(&self, handle: BlockHandle) -> PoolResult<usize> {
        let slot = handle.index as usize;
        if handle.pool_id != self.id || slot >= self.overflow.len() {
            return Err(PoolError::InvalidHandle { index: handle.index });
        }
        Ok(slot)
    }

    /// Size of `T`, checked against the block size.
    fn payload_size<T>(&self) -> PoolResult<usize> {
        let size = std::mem::size_of::<T>();
        if size > self.block_size {
            return Err(PoolError::PayloadTooLarge {
                size,
                block_size: self.block_size,
            });
        }
        Ok(size)
    }
}

impl fmt::Debug for BlockPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockPool")
            .field("id", &self.id)
            .field("block_size", &self.block_size)
            .field("capacity", &self.capacity)
            .field("high_water_mark", &self.high_water_mark)
            .field("cursor", &self.cursor)
            .field("free_count", &self.free_count)
            .field("overflow_policy", &self.overflow_policy)
            .finish_non_exhaustive()
    }
}

impl Drop for BlockPool {
    fn drop(&mut self) {
        let leaked = self.allocated_count() + self.overflow.len() - self.overflow_vacant.len();
        if leaked > 0 {
            tracing::warn!(pool_id = self.id, leaked, "block pool dropped with live blocks");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_allocate_free() {
        let mut pool = BlockPool::new(8, 10).unwrap();

        let h1 = pool.allocate().unwrap();
        pool.write(h1, 42u32).unwrap();
        assert_eq!(pool.read::<u32>(h1).unwrap(), 42);
        assert_eq!(pool.allocated_count(), 1);

        pool.free(h1).unwrap();
        assert_eq!(pool.allocated_count(), 0);
        assert_eq!(pool.free_count(), 10);
    }

    #[test]
    fn test_pool_full() {
        let mut pool = BlockPool::new(16, 2).unwrap();

        let _ = pool.allocate().unwrap();
        let _ = pool.allocate().unwrap();
        assert!(pool.allocate().is_none());
        assert!(pool.is_exhausted());
        assert_eq!(
            pool.try_allocate(),
            Err(PoolError::PoolExhausted { capacity: 2 })
        );
        assert_eq!(pool.stats().exhausted_events, 2);
    }

    #[test]
    fn test_pool_reuse() {
        let mut pool = BlockPool::new(16, 1).unwrap();

        let h1 = pool.allocate().unwrap();
        pool.free(h1).unwrap();

        let h2 = pool.allocate().unwrap();
        assert_eq!(h1.index(), h2.index()); // Same slot reused
    }

    #[test]
    fn test_creation_touches_no_blocks() {
        let pool = BlockPool::new(64, 1_000_000).unwrap();
        assert_eq!(pool.high_water_mark(), 0);
        assert_eq!(pool.free_count(), 1_000_000);
        assert_eq!(pool.block_state(0), Some(BlockState::Virgin));
        assert_eq!(pool.block_state(999_999), Some(BlockState::Virgin));
        assert_eq!(pool.block_state(1_000_000), None);
    }

    #[test]
    fn test_promotion_is_one_block_per_allocation() {
        let mut pool = BlockPool::new(16, 4).unwrap();
        let h = pool.allocate().unwrap();
        assert_eq!(pool.high_water_mark(), 1);

        pool.free(h).unwrap();
        let _ = pool.allocate().unwrap();
        assert_eq!(pool.high_water_mark(), 2);
        assert_eq!(pool.block_state(0), Some(BlockState::Allocated));
        assert_eq!(pool.block_state(1), Some(BlockState::Free));
        assert_eq!(pool.block_state(2), Some(BlockState::Virgin));
    }

    #[test]
    fn test_double_free_detected() {
        let mut pool = BlockPool::new(16, 4).unwrap();
        let h = pool.allocate().unwrap();
        pool.free(h).unwrap();

        assert_eq!(pool.free(h), Err(PoolError::DoubleFree { index: 0 }));
        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn test_use_after_free_detected() {
        let mut pool = BlockPool::new(16, 4).unwrap();
        let h = pool.allocate().unwrap();
        pool.free(h).unwrap();

        assert_eq!(pool.block(h), Err(PoolError::UseAfterFree { index: 0 }));
        assert_eq!(
            pool.write(h, 1u8),
            Err(PoolError::UseAfterFree { index: 0 })
        );
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut a = BlockPool::new(16, 4).unwrap();
        let mut b = BlockPool::new(16, 4).unwrap();
        let ha = a.allocate().unwrap();
        let _ = b.allocate().unwrap();

        assert_eq!(b.free(ha), Err(PoolError::InvalidHandle { index: 0 }));
        assert_eq!(b.allocated_count(), 1);
        a.free(ha).unwrap();
    }

    #[test]
    fn test_payload_too_large() {
        let mut pool = BlockPool::new(16, 1).unwrap();
        let h = pool.allocate().unwrap();
        assert_eq!(
            pool.write(h, [0u64; 3]),
            Err(PoolError::PayloadTooLarge {
                size: 24,
                block_size: 16
            })
        );
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            BlockPool::new(0, 4),
            Err(PoolError::InvalidBlockSize(0))
        ));
        assert!(matches!(
            BlockPool::new(16, 0),
            Err(PoolError::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_overflow_to_system() {
        let config = PoolConfig::new(24, 1).with_overflow(OverflowPolicy::System);
        let mut pool = BlockPool::with_config(&config).unwrap();

        let inside = pool.allocate().unwrap();
        let outside = pool.allocate().unwrap();
        assert_eq!(inside.origin(), BlockOrigin::Pool);
        assert_eq!(outside.origin(), BlockOrigin::Overflow);
        assert_eq!(pool.block(outside).unwrap().len(), 32);

        pool.write(outside, 7u64).unwrap();
        assert_eq!(pool.read::<u64>(outside).unwrap(), 7);

        pool.free(outside).unwrap();
        assert_eq!(
            pool.free(outside),
            Err(PoolError::DoubleFree { index: 0 })
        );
        assert_eq!(
            pool.block(outside),
            Err(PoolError::UseAfterFree { index: 0 })
        );

        let stats = pool.stats();
        assert_eq!(stats.overflow_allocations, 1);
        assert_eq!(stats.overflow_live, 0);
        pool.free(inside).unwrap();
    }

    #[test]
    fn test_release_reports_counters() {
        let mut pool = BlockPool::new(16, 3).unwrap();
        let h = pool.allocate().unwrap();
        pool.free(h).unwrap();
        let _ = pool.allocate().unwrap();

        let stats = pool.release();
        assert_eq!(stats.total_allocations, 2);
        assert_eq!(stats.total_frees, 1);
        assert_eq!(stats.allocated, 1);
    }
}
