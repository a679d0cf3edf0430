// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use rayon::prelude::*;
use std::ops::Range;

/// Environment variable overriding the worker thread count.
pub const THREADS_ENV_VAR: &str = "TIER_SOLVER_THREADS";

/// Default chunk length for dynamic scheduling over positions.
pub const DEFAULT_CHUNK: u64 = 1 << 14;

/// Determines the worker thread count from the process environment.
///
/// Read once at solver start; constant for the duration of one tier solve.
#[must_use]
pub fn thread_count() -> usize {
    std::env::var(THREADS_ENV_VAR)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(num_cpus::get)
}

/// Builds a dedicated worker pool of `threads` threads.
pub fn pool(threads: usize) -> crate::Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| crate::Error::Runtime(format!("cannot build thread pool: {e}")))
}

/// Dynamically-scheduled parallel loop over `0..len`, handing each worker
/// one chunk of positions at a time.
///
/// All writes performed inside `f` are visible after this returns (the
/// join at the end of the loop is a barrier).
pub fn for_each_chunk<F>(len: u64, chunk: u64, f: F)
where
    F: Fn(Range<u64>) + Send + Sync,
{
    debug_assert!(chunk > 0);

    let chunks = len.div_ceil(chunk);

    (0..chunks).into_par_iter().for_each(|i| {
        let start = i * chunk;
        let end = (start + chunk).min(len);
        f(start..end);
    });
}

/// Parallel fold + merge over `0..len` in chunks.
pub fn fold_chunks<T, F, M>(len: u64, chunk: u64, identity: impl Fn() -> T + Send + Sync, f: F, merge: M) -> T
where
    T: Send,
    F: Fn(T, Range<u64>) -> T + Send + Sync,
    M: Fn(T, T) -> T + Send + Sync,
{
    debug_assert!(chunk > 0);

    let chunks = len.div_ceil(chunk);

    (0..chunks)
        .into_par_iter()
        .fold(&identity, |acc, i| {
            let start = i * chunk;
            let end = (start + chunk).min(len);
            f(acc, start..end)
        })
        .reduce(&identity, merge)
}

/// Runs `f` over every item of `items` in parallel, collecting results in order.
pub fn map_items<T, R, F>(items: Vec<T>, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Send + Sync,
{
    items.into_par_iter().map(f).collect()
}
