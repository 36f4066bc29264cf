use crate::model::{GradientBuffer, Parameters};

/// Computes a worker's share of a training step.
///
/// Implementors own whatever they need to reach their partition of the dataset,
/// the trainer moves them in and out of the blocking pool every step.
pub trait StepExecutor: Send + 'static {
    /// The amount of samples covered by this executor.
    fn samples(&self) -> usize;

    /// Called once before the first step.
    fn prepare(&mut self) {}

    /// Accumulates the gradient and loss of every sample into `grad`.
    ///
    /// # Arguments
    /// * `params` - The current parameters.
    /// * `grad` - A zeroed gradient buffer.
    fn execute(&mut self, params: &Parameters, grad: &mut GradientBuffer);

    /// Called once after the last step.
    fn release(&mut self) {}
}

impl<E: StepExecutor + ?Sized> StepExecutor for Box<E> {
    fn samples(&self) -> usize {
        (**self).samples()
    }

    fn prepare(&mut self) {
        (**self).prepare()
    }

    fn execute(&mut self, params: &Parameters, grad: &mut GradientBuffer) {
        (**self).execute(params, grad)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
