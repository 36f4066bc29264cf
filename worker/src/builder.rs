use std::{num::NonZeroUsize, sync::Arc};

use collective::Collective;
use log::info;
use machine_learning::{
    MlErr, ModelShape,
    data::Dataset,
    initialization::{ConstParamGen, RandParamGen},
    model::Parameters,
    optimization::GradientDescent,
    partition::partition,
    training::{DeviceStep, LocalStep, StepExecutor},
};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    Result, Trainer, WorkerErr,
    config::{ComputeConfig, ParamGenConfig, TrainingConfig},
};

/// A trainer as assembled from a config.
pub type ConfiguredTrainer<C> = Trainer<C, Box<dyn StepExecutor>, GradientDescent>;

/// Assembles the trainer of each worker of a run from the shared config and dataset.
#[derive(Clone)]
pub struct WorkerBuilder {
    cfg: TrainingConfig,
    dataset: Arc<Dataset>,
    shape: ModelShape,
    samples: NonZeroUsize,
    seed: u64,
}

impl WorkerBuilder {
    /// Creates a new `WorkerBuilder`.
    ///
    /// # Arguments
    /// * `cfg` - The run's config.
    /// * `dataset` - The training set, shared by every worker of this process.
    ///
    /// # Returns
    /// An error if the dataset is empty or holds a label the model can't represent.
    pub fn new(cfg: TrainingConfig, dataset: Arc<Dataset>) -> Result<Self> {
        let samples = NonZeroUsize::new(dataset.len()).ok_or(MlErr::EmptyDataset)?;
        let shape = ModelShape::new(cfg.labels, dataset.image_size())?;
        dataset.check_labels(shape.labels())?;

        let seed = cfg.seed.unwrap_or_else(rand::random);
        info!(seed = seed, samples = samples.get(); "training set ready");

        Ok(Self {
            cfg,
            dataset,
            shape,
            samples,
            seed,
        })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.cfg
    }

    pub fn shape(&self) -> ModelShape {
        self.shape
    }

    /// Builds the trainer of the worker behind `collective`.
    pub fn build<C: Collective>(&self, collective: C) -> Result<ConfiguredTrainer<C>> {
        let ctx = collective.context();
        let range = partition(self.samples.get(), ctx.rank(), ctx.world_size());

        let executor: Box<dyn StepExecutor> = match self.cfg.compute {
            ComputeConfig::Threads { threads } => Box::new(LocalStep::with_threads(
                self.dataset.clone(),
                range,
                self.shape,
                threads,
            )?),
            ComputeConfig::Devices {
                devices,
                threads_per_device,
            } => Box::new(DeviceStep::new(
                self.dataset.clone(),
                range,
                self.shape,
                devices,
                threads_per_device,
            )?),
        };

        let params = if ctx.is_root() {
            self.initial_params()?
        } else {
            Parameters::zeros(self.shape)
        };

        let optimizer = GradientDescent::new(self.cfg.learning_rate, self.samples);

        Ok(Trainer::new(
            self.cfg.steps,
            self.samples.get(),
            collective,
            executor,
            optimizer,
            params,
        ))
    }

    fn initial_params(&self) -> Result<Parameters> {
        let limit = self.shape.nparams();

        let params = match self.cfg.init {
            ParamGenConfig::Uniform { low, high } => {
                let rng = StdRng::seed_from_u64(self.seed);
                let mut param_gen = RandParamGen::uniform(rng, limit, low, high)
                    .map_err(|e| WorkerErr::InvalidConfig(e.to_string()))?;

                Parameters::generate(self.shape, &mut param_gen)?
            }
            ParamGenConfig::Const { value } => {
                Parameters::generate(self.shape, &mut ConstParamGen::new(value, limit))?
            }
        };

        Ok(params)
    }
}
