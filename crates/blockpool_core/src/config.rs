//! # Pool Configuration
//!
//! Pool parameters, loadable from TOML once at startup.
//!
//! ```toml
//! block_size = 48
//! capacity = 100000
//! overflow = "system"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};
use crate::memory::region::round_up;

/// What happens when `allocate` finds no free block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Report exhaustion to the caller.
    #[default]
    Reject,
    /// Serve the request from the system allocator instead.
    System,
}

/// Configuration for a [`BlockPool`](crate::BlockPool).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Requested block size in bytes, rounded up to a multiple of 16.
    pub block_size: usize,
    /// Number of blocks in the backing region.
    pub capacity: usize,
    /// Behaviour once every block is allocated.
    pub overflow: OverflowPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_size: 64,
            capacity: 1024,
            overflow: OverflowPolicy::Reject,
        }
    }
}

impl PoolConfig {
    /// Creates a config with the default overflow policy.
    #[must_use]
    pub const fn new(block_size: usize, capacity: usize) -> Self {
        Self {
            block_size,
            capacity,
            overflow: OverflowPolicy::Reject,
        }
    }

    /// Sets the overflow policy.
    #[must_use]
    pub const fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] on malformed TOML, or the
    /// validation error for out-of-range parameters.
    pub fn from_toml_str(source: &str) -> PoolResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| PoolError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the parameters without allocating anything.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidBlockSize`] for zero or unroundable sizes
    /// - [`PoolError::InvalidCapacity`] for zero or more than `u32::MAX` blocks
    pub fn validate(&self) -> PoolResult<()> {
        if self.block_size == 0 || round_up(self.block_size).is_none() {
            return Err(PoolError::InvalidBlockSize(self.block_size));
        }
        if self.capacity == 0 || u32::try_from(self.capacity).is_err() {
            return Err(PoolError::InvalidCapacity(self.capacity));
        }
        Ok(())
    }

    /// Block size after rounding, if valid.
    #[must_use]
    pub const fn effective_block_size(&self) -> Option<usize> {
        if self.block_size == 0 {
            return None;
        }
        round_up(self.block_size)
    }
}
