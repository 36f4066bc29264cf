use std::time::Duration;

/// What a worker observed during a single training step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub step: usize,
    /// Wall time of this step alone.
    pub duration: Duration,
    /// Wall time since training started, at the end of this step.
    pub elapsed: Duration,
    /// The loss summed over this worker's partition.
    pub local_loss: f32,
    /// The loss summed over the whole dataset, only known by the root.
    pub total_loss: Option<f32>,
}

impl StepReport {
    /// The total loss averaged over `samples`, if this report has one.
    pub fn mean_loss(&self, samples: usize) -> Option<f32> {
        self.total_loss.map(|loss| loss / samples as f32)
    }
}
