use std::{num::NonZeroUsize, ops::Range, sync::Arc};

use log::debug;
use rayon::prelude::*;

use super::{Lanes, StepExecutor, local::check_range};
use crate::{
    ModelShape, Result,
    data::Dataset,
    model::{GradientBuffer, Parameters},
    partition::partition,
};

/// An offload target: a dedicated pool holding its own copy of a data chunk.
struct Device {
    id: usize,
    range: Range<usize>,
    lanes: Lanes,
    grad: GradientBuffer,
    staged: Option<Dataset>,
}

impl Device {
    fn stage(&mut self, dataset: &Dataset) -> usize {
        let chunk = dataset.view(self.range.clone());
        let staged = self.lanes.install(|| chunk.to_dataset());
        let bytes = staged.len() * (staged.image_size() + 1);

        self.staged = Some(staged);
        bytes
    }

    fn compute(&mut self, params: &Parameters) {
        self.grad.zero();

        if let Some(staged) = &self.staged {
            self.lanes.accumulate(staged.as_batch(), params, &mut self.grad);
        }
    }
}

/// Runs a worker's partition split over several devices.
///
/// Each device gets its chunk copied once, computes into its own gradient buffer and
/// the device buffers are merged in device order after every device is done.
pub struct DeviceStep {
    dataset: Arc<Dataset>,
    range: Range<usize>,
    devices: Vec<Device>,
}

impl DeviceStep {
    /// Creates a new `DeviceStep`.
    ///
    /// # Arguments
    /// * `dataset` - The shared training set.
    /// * `range` - This worker's partition of `dataset`.
    /// * `shape` - The model's shape.
    /// * `devices` - The amount of devices.
    /// * `threads_per_device` - The size of each device's pool.
    ///
    /// # Returns
    /// An error if `range` goes past the end of `dataset` or a pool can't be built.
    pub fn new(
        dataset: Arc<Dataset>,
        range: Range<usize>,
        shape: ModelShape,
        devices: NonZeroUsize,
        threads_per_device: NonZeroUsize,
    ) -> Result<Self> {
        check_range(&dataset, &range)?;

        let devices = (0..devices.get())
            .map(|id| {
                let sub = partition(range.len(), id, devices);
                let lanes = Lanes::new(shape, threads_per_device, &format!("device-{id}"))?;

                Ok(Device {
                    id,
                    range: range.start + sub.start..range.start + sub.end,
                    lanes,
                    grad: GradientBuffer::zeros(shape),
                    staged: None,
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            dataset,
            range,
            devices,
        })
    }

    pub fn is_staged(&self) -> bool {
        self.devices.iter().all(|device| device.staged.is_some())
    }

    /// Copies each device's chunk into device memory, every device at once.
    ///
    /// Returns after all devices hold their chunk.
    pub fn stage(&mut self) {
        let dataset = &self.dataset;

        self.devices.par_iter_mut().for_each(|device| {
            let bytes = device.stage(dataset);
            debug!(device = device.id, bytes = bytes; "staged chunk");
        });
    }

    /// Drops every staged chunk.
    pub fn detach(&mut self) {
        self.devices.par_iter_mut().for_each(|device| {
            if let Some(staged) = device.staged.take() {
                device.lanes.install(move || drop(staged));
                debug!(device = device.id; "detached chunk");
            }
        });
    }
}

impl StepExecutor for DeviceStep {
    fn samples(&self) -> usize {
        self.range.len()
    }

    fn prepare(&mut self) {
        self.stage();
    }

    fn execute(&mut self, params: &Parameters, grad: &mut GradientBuffer) {
        if !self.is_staged() {
            debug!("staging before first step");
            self.stage();
        }

        self.devices
            .par_iter_mut()
            .for_each(|device| device.compute(params));

        for device in self.devices.iter() {
            grad.merge(&device.grad);
        }
    }

    fn release(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Workspace, training::accumulate_batch};

    fn dataset() -> Arc<Dataset> {
        let pixels = (0..99 * 3).map(|x: usize| (x * 91 % 256) as u8).collect();
        let labels = (0..99).map(|i| i % 3).collect();
        Arc::new(Dataset::new(3, pixels, labels).unwrap())
    }

    fn n(x: usize) -> NonZeroUsize {
        NonZeroUsize::new(x).unwrap()
    }

    #[test]
    fn device_chunks_tile_the_partition() {
        let shape = ModelShape::new(3, 3).unwrap();
        let step = DeviceStep::new(dataset(), 10..60, shape, n(3), n(1)).unwrap();

        let ranges: Vec<_> = step.devices.iter().map(|d| d.range.clone()).collect();
        assert_eq!(ranges, [10..26, 26..42, 42..60]);
    }

    #[test]
    fn stage_and_detach() {
        let shape = ModelShape::new(3, 3).unwrap();
        let mut step = DeviceStep::new(dataset(), 0..99, shape, n(2), n(2)).unwrap();

        assert!(!step.is_staged());
        step.prepare();
        assert!(step.is_staged());

        step.release();
        assert!(step.devices.iter().all(|d| d.staged.is_none()));
    }

    #[test]
    fn matches_serial() {
        let shape = ModelShape::new(3, 3).unwrap();
        let dataset = dataset();
        let data: Vec<f32> = (0..shape.nparams()).map(|i| (i as f32 * 0.1).sin()).collect();
        let params = Parameters::from_vec(shape, data).unwrap();

        let mut serial = GradientBuffer::zeros(shape);
        accumulate_batch(dataset.view(5..90), &params, &mut serial, &mut Workspace::new(shape));

        let mut step = DeviceStep::new(dataset, 5..90, shape, n(4), n(2)).unwrap();
        step.prepare();

        for _ in 0..2 {
            let mut grad = GradientBuffer::zeros(shape);
            step.execute(&params, &mut grad);

            for (a, b) in grad.as_slice().iter().zip(serial.as_slice()) {
                assert!((a - b).abs() < 1e-3, "{a} != {b}");
            }
        }
    }

    #[test]
    fn stages_lazily() {
        let shape = ModelShape::new(3, 3).unwrap();
        let params = Parameters::zeros(shape);
        let mut step = DeviceStep::new(dataset(), 0..9, shape, n(2), n(1)).unwrap();

        let mut grad = GradientBuffer::zeros(shape);
        step.execute(&params, &mut grad);

        assert!(step.is_staged());
        assert!((grad.loss() - 9. * 3f32.ln()).abs() < 1e-4);
    }
}
