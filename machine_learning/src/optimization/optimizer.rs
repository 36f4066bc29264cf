use crate::Result;

/// An `Optimizer` turns a reduced gradient into a parameter update.
pub trait Optimizer {
    /// Takes a single step over `params` given `grad`.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient used for taking the step, laid out like `params`.
    ///
    /// # Returns
    /// An error if the buffers' lengths differ.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;
}
