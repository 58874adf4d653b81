//! Bounded worker pool for batch ingestion and ranking.
//!
//! One pool is built per process and shared by every fan-out, so ingestion
//! and ranking running in the same process never oversubscribe the CPU.

use std::fmt;
use std::num::NonZeroUsize;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A failure isolated to one item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item: String,
    pub error: String,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.error)
    }
}

/// Successful results of a batch plus the items that failed.
///
/// Successes keep the input order of the items that produced them.
#[derive(Debug)]
pub struct Batch<R> {
    pub succeeded: Vec<R>,
    pub failures: Vec<ItemFailure>,
}

/// A fixed-capacity thread pool.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    size: usize,
}

impl WorkerPool {
    /// Build a pool with `size` threads, or one per available hardware
    /// thread when `size` is `None`.
    pub fn new(size: Option<usize>) -> Result<Self> {
        let size = size.filter(|&n| n > 0).unwrap_or_else(default_parallelism);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("cantus-worker-{i}"))
            .build()
            .map_err(|e| Error::Pool(e.to_string()))?;
        log::debug!("Worker pool started with {} threads", size);
        Ok(Self { pool, size })
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Apply `f` to every item on the pool and wait for all of them.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }

    /// Apply a fallible `f` to every item, keeping failures per item.
    ///
    /// A failing item is logged and recorded under `label(item)`; it never
    /// stops its siblings.
    pub fn map_isolated<T, R, E, F, L>(&self, items: &[T], label: L, f: F) -> Batch<R>
    where
        T: Sync,
        R: Send,
        E: fmt::Display + Send,
        F: Fn(&T) -> std::result::Result<R, E> + Sync + Send,
        L: Fn(&T) -> String,
    {
        let results = self.map(items, f);

        let mut succeeded = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (item, result) in items.iter().zip(results) {
            match result {
                Ok(value) => succeeded.push(value),
                Err(e) => {
                    let failure = ItemFailure {
                        item: label(item),
                        error: e.to_string(),
                    };
                    log::warn!("{}", failure);
                    failures.push(failure);
                }
            }
        }

        Batch {
            succeeded,
            failures,
        }
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
