//! # Timing Harness
//!
//! Fills `count` slots once from a block pool and once through `Box`,
//! measuring wall time for each. Pool creation is inside the timed region,
//! so the O(1) setup is part of what gets measured.

use std::time::{Duration, Instant};

use blockpool_core::{BlockPool, PoolResult};

/// The record type being allocated: two 32-bit integers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Record {
    /// First field.
    pub a: i32,
    /// Second field.
    pub b: i32,
}

/// Outcome of one timed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Which allocator was measured.
    pub label: &'static str,
    /// Allocations attempted.
    pub requested: usize,
    /// Allocations that succeeded.
    pub succeeded: usize,
    /// Iteration at which the first allocation failed, if any.
    pub first_failure: Option<usize>,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl RunReport {
    /// Elapsed time in whole milliseconds.
    #[inline]
    #[must_use]
    pub fn millis(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

/// Creates a pool sized for `count` records and allocates all of them.
///
/// # Errors
///
/// Returns the pool's creation error if the backing region cannot be
/// reserved.
pub fn run_pool(count: usize) -> PoolResult<RunReport> {
    let start = Instant::now();

    let mut pool = BlockPool::new(std::mem::size_of::<Record>(), count)?;
    let mut held = Vec::with_capacity(count);
    let mut first_failure = None;

    for i in 0..count {
        match pool.allocate() {
            Some(handle) => {
                pool.write(handle, Record::default())?;
                held.push(handle);
            }
            None => {
                if first_failure.is_none() {
                    tracing::warn!(iteration = i, "pool ran out during timed run");
                    first_failure = Some(i);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    let succeeded = held.len();

    for handle in held {
        pool.free(handle)?;
    }

    Ok(RunReport {
        label: "block pool",
        requested: count,
        succeeded,
        first_failure,
        elapsed,
    })
}

/// Boxes `count` records through the system allocator.
#[must_use]
pub fn run_system(count: usize) -> RunReport {
    let start = Instant::now();

    let mut held = Vec::with_capacity(count);
    for _ in 0..count {
        held.push(Box::new(Record::default()));
    }

    let elapsed = start.elapsed();
    drop(held);

    RunReport {
        label: "system",
        requested: count,
        succeeded: count,
        first_failure: None,
        elapsed,
    }
}
