use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};

use super::{Parameters, Workspace, forward::hypothesis};
use crate::{MlErr, ModelShape, Result, data::Label};

/// The accumulated gradient of the loss and the loss itself.
///
/// Stored flat as `[bias grad | weight grad | loss]`, so a single reduction
/// over the buffer sums the three of them.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBuffer {
    shape: ModelShape,
    data: Box<[f32]>,
}

impl GradientBuffer {
    /// Creates a new zeroed `GradientBuffer`.
    pub fn zeros(shape: ModelShape) -> Self {
        Self {
            shape,
            data: vec![0.; shape.nparams() + 1].into_boxed_slice(),
        }
    }

    /// Creates a new `GradientBuffer` from an already laid out buffer.
    pub fn from_vec(shape: ModelShape, data: Vec<f32>) -> Result<Self> {
        let expected = shape.nparams() + 1;
        if data.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "gradient",
                got: data.len(),
                expected,
            });
        }

        Ok(Self {
            shape,
            data: data.into_boxed_slice(),
        })
    }

    pub fn shape(&self) -> ModelShape {
        self.shape
    }

    /// Sets every slot back to zero, loss included.
    pub fn zero(&mut self) {
        self.data.fill(0.);
    }

    /// The accumulated loss.
    pub fn loss(&self) -> f32 {
        self.data[self.data.len() - 1]
    }

    /// The gradient without the loss slot, laid out like `Parameters`.
    pub fn params_grad(&self) -> &[f32] {
        &self.data[..self.data.len() - 1]
    }

    /// The whole buffer, loss slot included.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn bias_grad(&self) -> ArrayView1<'_, f32> {
        ArrayView1::from(&self.data[..self.shape.labels()])
    }

    pub fn weight_grad(&self) -> ArrayView2<'_, f32> {
        let dims = (self.shape.labels(), self.shape.image_size());
        let weights = &self.data[self.shape.labels()..self.shape.nparams()];

        // SAFETY: The buffer length is checked against the shape on construction.
        ArrayView2::from_shape(dims, weights).unwrap()
    }

    fn view_mut(&mut self) -> (ArrayViewMut1<'_, f32>, ArrayViewMut2<'_, f32>, &mut f32) {
        let dims = (self.shape.labels(), self.shape.image_size());
        let (bias, rest) = self.data.split_at_mut(self.shape.labels());
        let (weights, loss) = rest.split_at_mut(self.shape.nweights());

        // SAFETY: The buffer length is checked against the shape on construction.
        let weights = ArrayViewMut2::from_shape(dims, weights).unwrap();
        (ArrayViewMut1::from(bias), weights, &mut loss[0])
    }

    /// Adds `other` into `self` slot by slot.
    ///
    /// # Panics
    /// If the shapes differ.
    pub fn merge(&mut self, other: &GradientBuffer) {
        assert_eq!(self.shape, other.shape, "merging gradients of different shapes");

        for (acc, g) in self.data.iter_mut().zip(other.data.iter()) {
            *acc += g;
        }
    }
}

/// Runs one example through the model and adds its gradient and loss into `grad`.
///
/// # Arguments
/// * `image` - The raw pixels of the example.
/// * `label` - The expected class, must be lower than `labels`.
/// * `params` - The model's parameters.
/// * `grad` - The buffer the gradient and loss are added into.
/// * `ws` - Scratch buffers sized for `params.shape()`.
///
/// # Returns
/// The cross entropy loss of this example.
pub fn accumulate(
    image: &[u8],
    label: Label,
    params: &Parameters,
    grad: &mut GradientBuffer,
    ws: &mut Workspace,
) -> f32 {
    let label = label as usize;
    debug_assert!(label < params.shape().labels());
    debug_assert_eq!(image.len(), params.shape().image_size());

    hypothesis(image, params, ws);

    let x = ArrayView1::from(&ws.pixels[..]);
    let (mut bias_grad, mut weight_grad, loss_slot) = grad.view_mut();

    for (i, &a) in ws.activations.iter().enumerate() {
        let g = if i == label { a - 1. } else { a };

        bias_grad[i] += g;
        weight_grad.row_mut(i).scaled_add(g, &x);
    }

    let loss = -ws.activations[label].ln();
    *loss_slot += loss;
    loss
}
