//! Mutex-guarded pool shared between threads.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::PoolConfig;
use crate::error::PoolResult;
use crate::memory::{BlockHandle, BlockPool};
use crate::stats::PoolStats;

/// A [`BlockPool`] behind a single lock.
///
/// Clones share the same pool. Every method takes the lock for exactly one
/// pool operation, so handles can be allocated on one thread and freed on
/// another.
#[derive(Clone, Debug)]
pub struct SharedBlockPool {
    inner: Arc<Mutex<BlockPool>>,
}

impl SharedBlockPool {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: BlockPool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    /// Creates and wraps a pool from a config.
    ///
    /// # Errors
    ///
    /// Same as [`BlockPool::with_config`].
    pub fn with_config(config: &PoolConfig) -> PoolResult<Self> {
        BlockPool::with_config(config).map(Self::new)
    }

    /// Allocates one block. See [`BlockPool::allocate`].
    #[inline]
    pub fn allocate(&self) -> Option<BlockHandle> {
        self.inner.lock().allocate()
    }

    /// Allocates one block. See [`BlockPool::try_allocate`].
    ///
    /// # Errors
    ///
    /// Same as [`BlockPool::try_allocate`].
    #[inline]
    pub fn try_allocate(&self) -> PoolResult<BlockHandle> {
        self.inner.lock().try_allocate()
    }

    /// Frees one block. See [`BlockPool::free`].
    ///
    /// # Errors
    ///
    /// Same as [`BlockPool::free`].
    #[inline]
    pub fn free(&self, handle: BlockHandle) -> PoolResult<()> {
        self.inner.lock().free(handle)
    }

    /// Runs `f` on a block's payload while holding the lock.
    ///
    /// # Errors
    ///
    /// Same as [`BlockPool::block_mut`].
    pub fn with_block<R>(
        &self,
        handle: BlockHandle,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> PoolResult<R> {
        let mut pool = self.inner.lock();
        let bytes = pool.block_mut(handle)?;
        Ok(f(bytes))
    }

    /// Returns a statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.inner.lock().stats()
    }
}
