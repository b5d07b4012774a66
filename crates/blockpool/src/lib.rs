//! # Blockpool
//!
//! The fixed-block allocator plus a small timing harness that compares it
//! with boxing every record through the system allocator.
//!
//! ## Modules
//!
//! - `harness`: Timed fill runs for the pool and for `Box`

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod harness;

// Re-export the allocator
pub use blockpool_core as core;

pub use blockpool_core::{BlockHandle, BlockPool, PoolConfig, PoolError, PoolResult, PoolStats};
pub use harness::{run_pool, run_system, Record, RunReport};
