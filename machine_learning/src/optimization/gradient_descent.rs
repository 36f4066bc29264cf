use std::num::NonZeroUsize;

use super::Optimizer;
use crate::{MlErr, Result};

/// Full batch gradient descent over a gradient summed across `samples` examples.
#[derive(Debug, Clone, Copy)]
pub struct GradientDescent {
    learning_rate: f32,
    samples: f32,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update_params`.
    /// * `samples` - The size of the whole training set, the gradient is averaged over it.
    pub fn new(learning_rate: f32, samples: NonZeroUsize) -> Self {
        Self {
            learning_rate,
            samples: samples.get() as f32,
        }
    }
}

impl Optimizer for GradientDescent {
    /// Steps in the opposite direction of the mean gradient, `p -= lr * g / N`.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        if params.len() != grad.len() {
            return Err(MlErr::SizeMismatch {
                what: "gradient",
                got: grad.len(),
                expected: params.len(),
            });
        }

        let lr = self.learning_rate;
        let n = self.samples;

        for (p, g) in params.iter_mut().zip(grad) {
            *p -= lr * g / n;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(samples: usize) -> NonZeroUsize {
        NonZeroUsize::new(samples).unwrap()
    }

    #[test]
    fn step_is_averaged() {
        let mut optimizer = GradientDescent::new(0.5, n(4));
        let mut params = [1., 1., 1.];

        optimizer.update_params(&mut params, &[4., -8., 0.]).unwrap();
        assert_eq!(params, [0.5, 2., 1.]);
    }

    #[test]
    fn zero_learning_rate_is_a_no_op() {
        let mut optimizer = GradientDescent::new(0., n(3));
        let mut params = [0.1, -0.2, 0.3];

        optimizer.update_params(&mut params, &[7., 8., 9.]).unwrap();
        assert_eq!(params, [0.1, -0.2, 0.3]);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let mut optimizer = GradientDescent::new(0.5, n(1));
        assert!(optimizer.update_params(&mut [0.; 2], &[0.; 3]).is_err());
    }
}
