use crate::{MlErr, Result};

/// The dimensions of a single layer softmax classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelShape {
    labels: usize,
    image_size: usize,
}

impl ModelShape {
    /// Ten digit classes over 28x28 images.
    pub const MNIST: Self = Self {
        labels: 10,
        image_size: 28 * 28,
    };

    /// Creates a new `ModelShape`.
    ///
    /// # Arguments
    /// * `labels` - The amount of classes.
    /// * `image_size` - The amount of pixels per image.
    ///
    /// # Returns
    /// An error if either dimension is zero.
    pub fn new(labels: usize, image_size: usize) -> Result<Self> {
        if labels == 0 || image_size == 0 {
            return Err(MlErr::InvalidShape { labels, image_size });
        }

        Ok(Self { labels, image_size })
    }

    pub fn labels(&self) -> usize {
        self.labels
    }

    pub fn image_size(&self) -> usize {
        self.image_size
    }

    /// The amount of weights, `labels x image_size`.
    pub fn nweights(&self) -> usize {
        self.labels * self.image_size
    }

    /// The amount of trainable parameters, biases and weights.
    pub fn nparams(&self) -> usize {
        self.labels + self.nweights()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnist_param_count() {
        assert_eq!(ModelShape::MNIST.nparams(), 10 + 10 * 784);
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert!(ModelShape::new(0, 4).is_err());
        assert!(ModelShape::new(2, 0).is_err());
        assert!(ModelShape::new(2, 4).is_ok());
    }
}
