#![allow(dead_code)]

use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};

use machine_learning::{
    ModelShape,
    data::Dataset,
    initialization::RandParamGen,
    model::{GradientBuffer, Parameters, Workspace},
    optimization::{GradientDescent, Optimizer},
    training::accumulate_batch,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use worker::config::{ClusterConfig, ComputeConfig, DatasetConfig, ParamGenConfig, TrainingConfig};

pub fn n(x: usize) -> NonZeroUsize {
    NonZeroUsize::new(x).unwrap()
}

pub fn config(workers: usize, steps: usize, learning_rate: f32) -> TrainingConfig {
    TrainingConfig {
        train: DatasetConfig {
            images: PathBuf::from("unused-images"),
            labels: PathBuf::from("unused-labels"),
        },
        test: None,
        labels: 3,
        steps: n(steps),
        learning_rate,
        seed: Some(7),
        init: ParamGenConfig::default(),
        compute: ComputeConfig::default(),
        cluster: ClusterConfig::Local { workers: n(workers) },
    }
}

pub fn random_dataset(samples: usize, image_size: usize, labels: u8, seed: u64) -> Arc<Dataset> {
    let mut rng = StdRng::seed_from_u64(seed);
    let pixels = (0..samples * image_size).map(|_| rng.random()).collect();
    let labels = (0..samples).map(|_| rng.random_range(0..labels)).collect();
    Arc::new(Dataset::new(image_size, pixels, labels).unwrap())
}

/// The parameters the root starts from given `config`'s default init and seed.
pub fn initial_params(shape: ModelShape, seed: u64) -> Parameters {
    let rng = StdRng::seed_from_u64(seed);
    let mut param_gen = RandParamGen::uniform(rng, shape.nparams(), 0., 1.).unwrap();
    Parameters::generate(shape, &mut param_gen).unwrap()
}

/// Single threaded full batch training, the reference every run is checked against.
pub fn serial_training(
    dataset: &Dataset,
    mut params: Parameters,
    steps: usize,
    learning_rate: f32,
) -> (Parameters, Vec<f32>) {
    let shape = params.shape();
    let mut optimizer = GradientDescent::new(learning_rate, n(dataset.len()));
    let mut grad = GradientBuffer::zeros(shape);
    let mut ws = Workspace::new(shape);
    let mut losses = Vec::new();

    for _ in 0..steps {
        grad.zero();
        accumulate_batch(dataset.as_batch(), &params, &mut grad, &mut ws);
        optimizer
            .update_params(params.as_mut_slice(), grad.params_grad())
            .unwrap();
        losses.push(grad.loss());
    }

    (params, losses)
}

pub fn assert_close(a: &[f32], b: &[f32], tol: f32) {
    assert_eq!(a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!((x - y).abs() <= tol, "at {i}: {x} != {y}");
    }
}
