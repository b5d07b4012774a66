//! # Blockpool Core
//!
//! Single size-class memory pool designed for:
//! - Workloads that create and destroy many same-sized objects
//! - O(1) allocate and free
//! - O(1) creation regardless of capacity
//!
//! ## Architecture Rules
//!
//! 1. **One region per pool** - All blocks come from a single allocation
//! 2. **Lazy free list** - Blocks are linked only when first handed out
//! 3. **Checked handles** - Double frees and foreign handles are errors, not corruption
//!
//! ## Example
//!
//! ```rust,ignore
//! use blockpool_core::{BlockPool, PoolError};
//!
//! let mut pool = BlockPool::new(8, 3)?;
//! let a = pool.allocate().expect("fresh pool");
//! pool.write(a, [1u32, 2u32])?;
//! pool.free(a)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod memory;
pub mod stats;
pub mod sync;

pub use config::{OverflowPolicy, PoolConfig};
pub use error::{PoolError, PoolResult};
pub use memory::{BlockHandle, BlockOrigin, BlockPool, BlockState, BLOCK_ALIGN, LINK_SIZE};
pub use stats::PoolStats;
pub use sync::SharedBlockPool;
