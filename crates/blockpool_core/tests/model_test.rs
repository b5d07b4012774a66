//! Randomized allocate/free interleavings checked against a stack model.

use blockpool_core::{BlockHandle, BlockPool, BlockState, PoolError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Expected pool behaviour: a LIFO of freed handles on top of fresh indices.
struct Model {
    capacity: u32,
    next_fresh: u32,
    freed: Vec<u32>,
    live: Vec<BlockHandle>,
}

impl Model {
    fn new(capacity: u32) -> Self {
        Self {
            capacity,
            next_fresh: 0,
            freed: Vec::new(),
            live: Vec::new(),
        }
    }

    fn expected_next(&self) -> Option<u32> {
        self.freed.last().copied().or_else(|| {
            (self.next_fresh < self.capacity).then_some(self.next_fresh)
        })
    }
}

fn run_seed(seed: u64, capacity: u32, steps: usize) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pool = BlockPool::new(24, capacity as usize).unwrap();
    let mut model = Model::new(capacity);

    for _ in 0..steps {
        let allocate = model.live.is_empty() || rng.gen_bool(0.55);

        if allocate {
            let expected = model.expected_next();
            let got = pool.allocate();
            assert_eq!(got.map(|h| h.index()), expected, "seed {seed}");

            if let Some(handle) = got {
                if model.freed.last() == Some(&handle.index()) {
                    model.freed.pop();
                } else {
                    model.next_fresh += 1;
                }
                pool.write(handle, u64::from(handle.index()) | 0xA5A5_0000_0000)
                    .unwrap();
                model.live.push(handle);
            }
        } else {
            let victim = rng.gen_range(0..model.live.len());
            let handle = model.live.swap_remove(victim);
            assert_eq!(
                pool.read::<u64>(handle).unwrap(),
                u64::from(handle.index()) | 0xA5A5_0000_0000
            );
            pool.free(handle).unwrap();
            model.freed.push(handle.index());
        }

        assert_eq!(pool.allocated_count(), model.live.len());
        assert_eq!(pool.free_count(), capacity as usize - model.live.len());
        assert!(pool.high_water_mark() <= pool.capacity());
    }

    for handle in &model.live {
        assert_eq!(
            pool.block_state(handle.index() as usize),
            Some(BlockState::Allocated)
        );
    }
}

#[test]
fn test_random_interleavings_match_model() {
    for seed in 0..32 {
        run_seed(seed, 17, 2_000);
    }
}

#[test]
fn test_random_interleavings_large_pool() {
    run_seed(0xB10C, 4096, 20_000);
}

#[test]
fn test_every_freed_handle_rejected_twice() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut pool = BlockPool::new(16, 64).unwrap();
    let handles: Vec<_> = (0..64).map(|_| pool.allocate().unwrap()).collect();

    let mut order: Vec<usize> = (0..handles.len()).collect();
    for i in (1..order.len()).rev() {
        order.swap(i, rng.gen_range(0..=i));
    }

    for &i in &order {
        pool.free(handles[i]).unwrap();
        assert_eq!(
            pool.free(handles[i]),
            Err(PoolError::DoubleFree {
                index: handles[i].index()
            })
        );
    }
    assert_eq!(pool.free_count(), 64);
}
