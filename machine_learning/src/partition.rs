//! Static split of the training set across workers.

use std::{num::NonZeroUsize, ops::Range};

/// The range of samples `worker` is responsible for out of `total`.
///
/// Every worker gets `total / workers` samples and the last one also takes the remainder,
/// so the ranges are contiguous, disjoint and cover `0..total`.
///
/// # Panics
/// If `worker >= workers`.
pub fn partition(total: usize, worker: usize, workers: NonZeroUsize) -> Range<usize> {
    let workers = workers.get();
    assert!(worker < workers, "worker {worker} out of {workers}");

    let chunk = total / workers;
    let start = worker * chunk;
    let end = if worker == workers - 1 {
        total
    } else {
        start + chunk
    };

    start..end
}

/// Every range of the split, in worker order.
pub fn partitions(total: usize, workers: NonZeroUsize) -> impl Iterator<Item = Range<usize>> {
    (0..workers.get()).map(move |worker| partition(total, worker, workers))
}
