use ndarray::{ArrayView1, ArrayView2};

use crate::{MlErr, ModelShape, Result, initialization::ParamGen};

/// The trainable state of the classifier.
///
/// Stored flat as `[bias | weights]`, weights in row major order with one row per label.
/// This is the exact layout sent over the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    shape: ModelShape,
    data: Box<[f32]>,
}

impl Parameters {
    /// Creates a new `Parameters` with every value set to zero.
    pub fn zeros(shape: ModelShape) -> Self {
        Self {
            shape,
            data: vec![0.; shape.nparams()].into_boxed_slice(),
        }
    }

    /// Creates a new `Parameters` from an already laid out buffer.
    ///
    /// # Returns
    /// An error if `data` doesn't hold exactly `shape.nparams()` values.
    pub fn from_vec(shape: ModelShape, data: Vec<f32>) -> Result<Self> {
        if data.len() != shape.nparams() {
            return Err(MlErr::SizeMismatch {
                what: "parameters",
                got: data.len(),
                expected: shape.nparams(),
            });
        }

        Ok(Self {
            shape,
            data: data.into_boxed_slice(),
        })
    }

    /// Fills a new `Parameters` with values taken from `param_gen`, biases first.
    ///
    /// # Returns
    /// An error if the generator runs out before every parameter was set.
    pub fn generate<G: ParamGen + ?Sized>(shape: ModelShape, param_gen: &mut G) -> Result<Self> {
        let mut params = Self::zeros(shape);
        let mut filled = 0;

        while filled < params.len() {
            match param_gen.fill(&mut params.data[filled..]) {
                0 => {
                    return Err(MlErr::ParamGenExhausted {
                        got: filled,
                        expected: params.len(),
                    });
                }
                n => filled += n,
            }
        }

        Ok(params)
    }

    pub fn shape(&self) -> ModelShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// The per label bias, of size `labels`.
    pub fn bias(&self) -> ArrayView1<'_, f32> {
        ArrayView1::from(&self.data[..self.shape.labels()])
    }

    /// The weight matrix, of shape `labels x image_size`.
    pub fn weights(&self) -> ArrayView2<'_, f32> {
        let dims = (self.shape.labels(), self.shape.image_size());

        // SAFETY: The buffer length is checked against the shape on construction.
        ArrayView2::from_shape(dims, &self.data[self.shape.labels()..]).unwrap()
    }
}
