//! # Pool Error Types
//!
//! All errors that can occur while creating or using a block pool.

use thiserror::Error;

/// Errors that can occur in the block pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The system allocator could not supply the backing region.
    #[error("backing allocation failed: could not reserve {bytes} bytes")]
    BackingAllocationFailure {
        /// Total size of the requested region.
        bytes: usize,
    },

    /// `capacity * block_size` does not fit in a single allocation.
    #[error("backing region too large: {capacity} blocks of {block_size} bytes")]
    RegionTooLarge {
        /// Effective (rounded) block size.
        block_size: usize,
        /// Requested block count.
        capacity: usize,
    },

    /// Requested block size cannot hold a linkage index.
    #[error("invalid block size: {0}")]
    InvalidBlockSize(usize),

    /// Requested capacity is zero or exceeds the linkage index range.
    #[error("invalid capacity: {0}")]
    InvalidCapacity(usize),

    /// No free blocks remain.
    #[error("pool exhausted: all {capacity} blocks are allocated")]
    PoolExhausted {
        /// Capacity of the exhausted pool.
        capacity: usize,
    },

    /// Handle did not originate from this pool or lies outside its region.
    #[error("invalid handle: block {index} does not belong to this pool")]
    InvalidHandle {
        /// Index carried by the rejected handle.
        index: u32,
    },

    /// Handle was freed twice.
    #[error("double free of block {index}")]
    DoubleFree {
        /// Index of the block.
        index: u32,
    },

    /// Payload access through a handle that was already freed.
    #[error("use after free of block {index}")]
    UseAfterFree {
        /// Index of the block.
        index: u32,
    },

    /// Typed payload does not fit in one block.
    #[error("payload of {size} bytes does not fit in a {block_size}-byte block")]
    PayloadTooLarge {
        /// Size of the payload type.
        size: usize,
        /// Effective block size.
        block_size: usize,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
