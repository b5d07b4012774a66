//! # Cross-thread Access
//!
//! A [`BlockPool`](crate::BlockPool) has no internal locking. Callers on
//! several threads must serialize every operation on it.
//!
//! ```text
//! Thread 1 ──┐
//! Thread 2 ──┼──> [Mutex] ──> BlockPool
//! Thread N ──┘    (whole-pool lock, held for one operation)
//! ```
//!
//! [`SharedBlockPool`] is that serialization, packaged as a cloneable handle.

mod shared;

pub use shared::SharedBlockPool;
