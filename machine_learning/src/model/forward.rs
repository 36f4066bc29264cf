use ndarray::{ArrayView1, ArrayViewMut1, linalg};

use super::Parameters;
use crate::ModelShape;

const PIXEL_SCALE: f32 = 255.;

/// Scratch buffers reused across examples so the inner loop never allocates.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub(crate) pixels: Vec<f32>,
    pub(crate) activations: Vec<f32>,
}

impl Workspace {
    pub fn new(shape: ModelShape) -> Self {
        Self {
            pixels: vec![0.; shape.image_size()],
            activations: vec![0.; shape.labels()],
        }
    }

    /// The class probabilities of the last example run through `hypothesis`.
    pub fn activations(&self) -> &[f32] {
        &self.activations
    }
}

/// Scales raw pixel intensities into `[0, 1]`.
pub fn normalize(image: &[u8], out: &mut [f32]) {
    for (x, &px) in out.iter_mut().zip(image) {
        *x = px as f32 / PIXEL_SCALE;
    }
}

/// Turns logits into probabilities in place, shifting by the max logit first.
pub fn softmax(activations: &mut [f32]) {
    let max = activations
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);

    let mut sum = 0.;
    for a in activations.iter_mut() {
        *a = (*a - max).exp();
        sum += *a;
    }

    for a in activations.iter_mut() {
        *a /= sum;
    }
}

/// Runs one image through the model, leaving the class probabilities in `ws`.
///
/// # Arguments
/// * `image` - The raw pixels of the image, of size `image_size`.
/// * `params` - The model's parameters.
/// * `ws` - Scratch buffers sized for `params.shape()`.
pub fn hypothesis<'ws>(image: &[u8], params: &Parameters, ws: &'ws mut Workspace) -> &'ws [f32] {
    normalize(image, &mut ws.pixels);

    let x = ArrayView1::from(&ws.pixels[..]);
    let mut logits = ArrayViewMut1::from(&mut ws.activations[..]);
    logits.assign(&params.bias());
    linalg::general_mat_vec_mul(1., &params.weights(), &x, 1., &mut logits);

    softmax(&mut ws.activations);
    &ws.activations
}

/// Computes the class probabilities of a single image.
pub fn forward(image: &[u8], params: &Parameters) -> Vec<f32> {
    let mut ws = Workspace::new(params.shape());
    hypothesis(image, params, &mut ws).to_vec()
}

/// The index of the most likely class, the first one on ties.
pub fn predict(probs: &[f32]) -> usize {
    probs
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &p)| {
            if p > max { (i, p) } else { (best, max) }
        })
        .0
}
