//! # Backing Region
//!
//! The single contiguous allocation a pool carves its blocks from.

// SAFETY: This module owns the raw allocation behind every pool.
// All other modules reach it through the safe slice accessors below.
#![allow(unsafe_code)]
//!
//! ## Layout
//!
//! ```text
//! | liveness bitset (padded to 16) | block 0 | block 1 | ... | block N-1 |
//! ^ base, 16-byte aligned           ^ header_len
//! ```
//!
//! The region is zero-filled by the allocator, so no per-block work happens
//! at creation time. Blocks are only touched when the pool promotes them.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use crate::error::{PoolError, PoolResult};

/// Alignment and size granularity of every block.
pub const BLOCK_ALIGN: usize = 16;

/// Bytes at the front of a free block used for the free-list link.
pub const LINK_SIZE: usize = std::mem::size_of::<u32>();

/// Rounds `size` up to the next multiple of [`BLOCK_ALIGN`].
///
/// Returns `None` on arithmetic overflow.
#[inline]
#[must_use]
pub const fn round_up(size: usize) -> Option<usize> {
    match size.checked_add(BLOCK_ALIGN - 1) {
        Some(padded) => Some(padded & !(BLOCK_ALIGN - 1)),
        None => None,
    }
}

/// Owned backing storage for one pool.
pub(crate) struct BackingRegion {
    /// Start of the allocation (header first, blocks after).
    storage: NonNull<u8>,
    /// Layout the storage was allocated with.
    layout: Layout,
    /// Size of the liveness header in bytes.
    header_len: usize,
    /// Effective block size in bytes.
    block_size: usize,
    /// Number of blocks.
    capacity: usize,
}

impl BackingRegion {
    /// Reserves a zeroed region for `capacity` blocks of `block_size` bytes.
    ///
    /// `block_size` must already be rounded to [`BLOCK_ALIGN`].
    pub(crate) fn allocate(block_size: usize, capacity: usize) -> PoolResult<Self> {
        debug_assert!(block_size >= LINK_SIZE && block_size % BLOCK_ALIGN == 0);
        debug_assert!(capacity > 0);

        let too_large = PoolError::RegionTooLarge { block_size, capacity };

        let header_len = round_up(capacity.div_ceil(8)).ok_or_else(|| too_large.clone())?;
        let total = capacity
            .checked_mul(block_size)
            .and_then(|blocks| blocks.checked_add(header_len))
            .ok_or_else(|| too_large.clone())?;
        let layout = Layout::from_size_align(total, BLOCK_ALIGN).map_err(|_| too_large)?;

        // SAFETY: `total` is non-zero (capacity > 0, block_size >= 16).
        let ptr = unsafe { alloc_zeroed(layout) };
        let storage = NonNull::new(ptr)
            .ok_or(PoolError::BackingAllocationFailure { bytes: total })?;

        Ok(Self {
            storage,
            layout,
            header_len,
            block_size,
            capacity,
        })
    }

    /// Total size of the allocation in bytes.
    #[inline]
    pub(crate) fn len_bytes(&self) -> usize {
        self.layout.size()
    }

    /// Payload bytes of block `index`.
    #[inline]
    pub(crate) fn block(&self, index: usize) -> &[u8] {
        assert!(index < self.capacity, "block index out of range");
        // SAFETY: index < capacity keeps the range inside the allocation,
        // and the memory was zero-initialized on allocation.
        unsafe {
            std::slice::from_raw_parts(self.block_ptr(index), self.block_size)
        }
    }

    /// Mutable payload bytes of block `index`.
    #[inline]
    pub(crate) fn block_mut(&mut self, index: usize) -> &mut [u8] {
        assert!(index < self.capacity, "block index out of range");
        // SAFETY: as in `block`; `&mut self` guarantees exclusivity.
        unsafe {
            std::slice::from_raw_parts_mut(self.block_ptr(index), self.block_size)
        }
    }

    /// Reads the free-list link stored in the leading bytes of a block.
    #[inline]
    pub(crate) fn read_link(&self, index: usize) -> u32 {
        bytemuck::pod_read_unaligned(&self.block(index)[..LINK_SIZE])
    }

    /// Writes a free-list link. Bytes past [`LINK_SIZE`] are left untouched.
    #[inline]
    pub(crate) fn write_link(&mut self, index: usize, next: u32) {
        self.block_mut(index)[..LINK_SIZE].copy_from_slice(&next.to_ne_bytes());
    }

    /// Whether block `index` is currently handed out.
    #[inline]
    pub(crate) fn is_live(&self, index: usize) -> bool {
        self.header()[index / 8] & (1 << (index % 8)) != 0
    }

    /// Marks block `index` as allocated or free.
    #[inline]
    pub(crate) fn set_live(&mut self, index: usize, live: bool) {
        let mask = 1u8 << (index % 8);
        let byte = &mut self.header_mut()[index / 8];
        if live {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// Address of block `index`.
    ///
    /// # Safety
    ///
    /// Index must be < capacity.
    #[inline]
    unsafe fn block_ptr(&self, index: usize) -> *mut u8 {
        self.storage
            .as_ptr()
            .add(self.header_len + index * self.block_size)
    }

    #[inline]
    fn header(&self) -> &[u8] {
        // SAFETY: the header occupies the first `header_len` bytes.
        unsafe { std::slice::from_raw_parts(self.storage.as_ptr(), self.header_len) }
    }

    #[inline]
    fn header_mut(&mut self) -> &mut [u8] {
        // SAFETY: as in `header`; `&mut self` guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.storage.as_ptr(), self.header_len) }
    }
}

impl Drop for BackingRegion {
    fn drop(&mut self) {
        // SAFETY: We allocated this memory with this exact layout.
        unsafe {
            dealloc(self.storage.as_ptr(), self.layout);
        }
    }
}

// SAFETY: BackingRegion exclusively owns its allocation.
unsafe impl Send for BackingRegion {}
// SAFETY: shared access only hands out shared slices.
unsafe impl Sync for BackingRegion {}
