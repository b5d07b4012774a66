//! # Memory Management
//!
//! Fixed-size block pool over one pre-reserved region.
//!
//! ## Design Philosophy
//!
//! The region is reserved once, when the pool is created. Afterwards:
//! - No heap allocations on allocate/free
//! - No per-block setup until a block is first used
//! - Constant-time, branch-light hot path

mod pool;
pub(crate) mod region;

pub use pool::{BlockHandle, BlockOrigin, BlockPool, BlockState};
pub use region::{round_up, BLOCK_ALIGN, LINK_SIZE};
