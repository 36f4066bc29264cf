use machine_learning::{
    ModelShape,
    model::{GradientBuffer, Parameters},
};

/// Persistent buffers reused across steps to avoid per-iteration allocations.
#[derive(Debug)]
pub struct WorkerState {
    pub step: usize,

    /// Local copy of the parameters, identical across workers after every step.
    pub params: Parameters,

    /// Gradient and loss accumulator.
    pub grad: GradientBuffer,
}

impl WorkerState {
    pub fn new(params: Parameters) -> Self {
        let shape: ModelShape = params.shape();

        Self {
            step: 0,
            params,
            grad: GradientBuffer::zeros(shape),
        }
    }

    #[inline]
    pub fn zero_grad(&mut self) {
        self.grad.zero();
    }

    #[inline]
    pub fn inc_step(&mut self) {
        self.step += 1;
    }
}
