use std::time::Duration;

/// Where a worker spent its time, accumulated over every step.
#[derive(Debug, Default, Clone)]
pub struct WorkerMetrics {
    pub compute_time: Duration,
    pub reduce_time: Duration,
    pub update_time: Duration,
    pub broadcast_time: Duration,
    pub barrier_time: Duration,

    pub steps: u64,
    pub samples: u64,
}

impl WorkerMetrics {
    #[inline]
    pub fn bump_step(&mut self) {
        self.steps += 1;
    }

    #[inline]
    pub fn add_samples(&mut self, n: usize) {
        self.samples += n as u64;
    }

    /// Time spent waiting on or talking to other workers.
    pub fn comm_time(&self) -> Duration {
        self.reduce_time + self.broadcast_time + self.barrier_time
    }
}
