//! Worker fan-out for the per-source propagation work.
//!
//! The flattened grid is split into contiguous source-index ranges, one per
//! worker, and each range runs on a dedicated rayon pool. Partitioning is by
//! source index only: a worker writes wherever its sources' light reaches,
//! which is why the shared map uses atomic max-blend cells. Every fan-out
//! joins before returning, so the return of [`WorkerPool::scatter`] is the
//! barrier between the main pass and each bounce iteration.

use crate::engine::EngineError;

/// Fixed-size thread pool sized by the engine configuration.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self, EngineError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;
        Ok(WorkerPool { pool, workers })
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `work` over the source domain `0..per_source.len()`, split into
    /// one contiguous range per worker. `work` receives the range's base
    /// index and the matching mutable slice of per-source state, so each
    /// source's slot is owned by exactly one worker. Joins before returning.
    pub fn scatter<T, F>(&self, per_source: &mut [T], work: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync,
    {
        let len = per_source.len();
        if len == 0 {
            return;
        }
        let chunk = len.div_ceil(self.workers);
        let work = &work;
        self.pool.scope(|scope| {
            for (slot, part) in per_source.chunks_mut(chunk).enumerate() {
                scope.spawn(move |_| work(slot * chunk, part));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_partitions_cover_every_source_once() {
        let pool = WorkerPool::new(3).expect("pool");
        let mut visits = vec![0u32; 10];
        pool.scatter(&mut visits, |_base, part| {
            for slot in part {
                *slot += 1;
            }
        });
        assert!(visits.iter().all(|&v| v == 1), "visits: {visits:?}");
    }

    #[test]
    fn test_base_indices_match_slots() {
        let pool = WorkerPool::new(4).expect("pool");
        let mut indices = vec![usize::MAX; 11];
        pool.scatter(&mut indices, |base, part| {
            for (offset, slot) in part.iter_mut().enumerate() {
                *slot = base + offset;
            }
        });
        for (i, &got) in indices.iter().enumerate() {
            assert_eq!(got, i);
        }
    }

    #[test]
    fn test_empty_domain_is_a_no_op() {
        let pool = WorkerPool::new(2).expect("pool");
        let ran = AtomicUsize::new(0);
        let mut empty: Vec<u8> = Vec::new();
        pool.scatter(&mut empty, |_, _| {
            ran.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(ran.load(Ordering::Relaxed), 0);
    }
}
