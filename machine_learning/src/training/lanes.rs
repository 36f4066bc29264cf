use std::num::NonZeroUsize;

use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use crate::{
    ModelShape, Result,
    data::Batch,
    model::{GradientBuffer, Parameters, Workspace, accumulate},
    partition::partition,
};

/// Accumulates every sample of `batch` into `grad` in order.
///
/// # Returns
/// The loss summed over the batch.
pub fn accumulate_batch(
    batch: Batch<'_>,
    params: &Parameters,
    grad: &mut GradientBuffer,
    ws: &mut Workspace,
) -> f32 {
    batch
        .iter()
        .map(|(image, label)| accumulate(image, label, params, grad, ws))
        .sum()
}

struct Lane {
    grad: GradientBuffer,
    ws: Workspace,
}

/// A thread pool where each thread accumulates its own sub chunk of a batch.
///
/// Lanes never share an accumulator, they're merged in lane order once all of them are done.
pub struct Lanes {
    pool: ThreadPool,
    lanes: Vec<Lane>,
    ws: Workspace,
}

impl Lanes {
    /// Creates a new `Lanes`.
    ///
    /// # Arguments
    /// * `shape` - The model's shape, used to size each lane's buffers.
    /// * `threads` - The amount of lanes and pool threads.
    /// * `name` - The prefix for the pool's thread names.
    ///
    /// # Returns
    /// An error if the pool can't be built.
    pub fn new(shape: ModelShape, threads: NonZeroUsize, name: &str) -> Result<Self> {
        let prefix = name.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.get())
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()?;

        let lanes = if threads.get() == 1 {
            Vec::new()
        } else {
            (0..threads.get())
                .map(|_| Lane {
                    grad: GradientBuffer::zeros(shape),
                    ws: Workspace::new(shape),
                })
                .collect()
        };

        Ok(Self {
            pool,
            lanes,
            ws: Workspace::new(shape),
        })
    }

    /// Runs `op` inside this pool.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Accumulates every sample of `batch` into `grad`.
    ///
    /// With a single lane samples go straight into `grad`, in order.
    pub fn accumulate(&mut self, batch: Batch<'_>, params: &Parameters, grad: &mut GradientBuffer) {
        if self.lanes.is_empty() {
            let ws = &mut self.ws;
            self.pool
                .install(|| accumulate_batch(batch, params, grad, ws));
            return;
        }

        // SAFETY: There is more than one lane in this branch.
        let nlanes = NonZeroUsize::new(self.lanes.len()).unwrap();
        let lanes = &mut self.lanes;

        self.pool.install(|| {
            lanes.par_iter_mut().enumerate().for_each(|(i, lane)| {
                lane.grad.zero();
                let chunk = batch.slice(partition(batch.len(), i, nlanes));
                accumulate_batch(chunk, params, &mut lane.grad, &mut lane.ws);
            })
        });

        for lane in self.lanes.iter() {
            grad.merge(&lane.grad);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{data::Dataset, initialization::RandParamGen};

    fn setup(samples: usize) -> (Dataset, Parameters) {
        let shape = ModelShape::new(3, 5).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let pixels = (0..samples * 5).map(|_| rng.random()).collect();
        let labels = (0..samples).map(|_| rng.random_range(0..3)).collect();
        let dataset = Dataset::new(5, pixels, labels).unwrap();

        let mut param_gen = RandParamGen::uniform(rng, shape.nparams(), -1., 1.).unwrap();
        let params = Parameters::generate(shape, &mut param_gen).unwrap();
        (dataset, params)
    }

    #[test]
    fn single_lane_is_serial() {
        let (dataset, params) = setup(37);
        let shape = params.shape();

        let mut serial = GradientBuffer::zeros(shape);
        accumulate_batch(dataset.as_batch(), &params, &mut serial, &mut Workspace::new(shape));

        let mut lanes = Lanes::new(shape, NonZeroUsize::MIN, "test").unwrap();
        let mut grad = GradientBuffer::zeros(shape);
        lanes.accumulate(dataset.as_batch(), &params, &mut grad);

        assert_eq!(grad, serial);
    }

    #[test]
    fn many_lanes_match_serial() {
        let (dataset, params) = setup(101);
        let shape = params.shape();

        let mut serial = GradientBuffer::zeros(shape);
        accumulate_batch(dataset.as_batch(), &params, &mut serial, &mut Workspace::new(shape));

        for threads in [2, 3, 8] {
            let threads = NonZeroUsize::new(threads).unwrap();
            let mut lanes = Lanes::new(shape, threads, "test").unwrap();

            // twice, lanes must be reset between calls
            for _ in 0..2 {
                let mut grad = GradientBuffer::zeros(shape);
                lanes.accumulate(dataset.as_batch(), &params, &mut grad);

                for (a, b) in grad.as_slice().iter().zip(serial.as_slice()) {
                    assert!((a - b).abs() < 1e-3, "{a} != {b}");
                }
            }
        }
    }

    #[test]
    fn more_lanes_than_samples() {
        let (dataset, params) = setup(2);
        let shape = params.shape();

        let mut lanes = Lanes::new(shape, NonZeroUsize::new(4).unwrap(), "test").unwrap();
        let mut grad = GradientBuffer::zeros(shape);
        lanes.accumulate(dataset.as_batch(), &params, &mut grad);

        assert!(grad.loss() > 0.);
    }
}
