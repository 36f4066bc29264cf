use std::{num::NonZeroUsize, ops::Range, sync::Arc};

use super::{Lanes, StepExecutor};
use crate::{
    MlErr, ModelShape, Result,
    data::Dataset,
    model::{GradientBuffer, Parameters},
};

/// Runs a worker's partition on a local thread pool.
pub struct LocalStep {
    dataset: Arc<Dataset>,
    range: Range<usize>,
    lanes: Lanes,
}

impl LocalStep {
    /// Creates a new `LocalStep`.
    ///
    /// # Arguments
    /// * `dataset` - The shared training set.
    /// * `range` - This worker's partition of `dataset`.
    /// * `lanes` - The pool the partition is split over.
    ///
    /// # Returns
    /// An error if `range` goes past the end of `dataset`.
    pub fn new(dataset: Arc<Dataset>, range: Range<usize>, lanes: Lanes) -> Result<Self> {
        check_range(&dataset, &range)?;

        Ok(Self {
            dataset,
            range,
            lanes,
        })
    }

    /// Shortcut for a `LocalStep` with a fresh pool of `threads` lanes.
    pub fn with_threads(
        dataset: Arc<Dataset>,
        range: Range<usize>,
        shape: ModelShape,
        threads: NonZeroUsize,
    ) -> Result<Self> {
        let lanes = Lanes::new(shape, threads, "lane")?;
        Self::new(dataset, range, lanes)
    }
}

impl StepExecutor for LocalStep {
    fn samples(&self) -> usize {
        self.range.len()
    }

    fn execute(&mut self, params: &Parameters, grad: &mut GradientBuffer) {
        let batch = self.dataset.view(self.range.clone());
        self.lanes.accumulate(batch, params, grad);
    }
}

pub(super) fn check_range(dataset: &Dataset, range: &Range<usize>) -> Result<()> {
    if range.start > range.end || range.end > dataset.len() {
        return Err(MlErr::SizeMismatch {
            what: "partition end",
            got: range.end,
            expected: dataset.len(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Workspace, training::accumulate_batch};

    fn dataset() -> Arc<Dataset> {
        let pixels = (0..40u8).map(|x| x.wrapping_mul(37)).collect();
        let labels = (0..10).map(|i| i % 2).collect();
        Arc::new(Dataset::new(4, pixels, labels).unwrap())
    }

    #[test]
    fn covers_only_its_range() {
        let shape = ModelShape::new(2, 4).unwrap();
        let dataset = dataset();
        let params = Parameters::zeros(shape);

        let mut step =
            LocalStep::with_threads(dataset.clone(), 3..7, shape, NonZeroUsize::MIN).unwrap();
        assert_eq!(step.samples(), 4);

        let mut grad = GradientBuffer::zeros(shape);
        step.execute(&params, &mut grad);

        let mut expected = GradientBuffer::zeros(shape);
        let mut ws = Workspace::new(shape);
        accumulate_batch(dataset.view(3..7), &params, &mut expected, &mut ws);

        assert_eq!(grad, expected);
        assert!((grad.loss() - 4. * 2f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn rejects_range_past_the_end() {
        let shape = ModelShape::new(2, 4).unwrap();
        let res = LocalStep::with_threads(dataset(), 5..11, shape, NonZeroUsize::MIN);
        assert!(res.is_err());
    }

    #[test]
    fn empty_range_leaves_buffer_zeroed() {
        let shape = ModelShape::new(2, 4).unwrap();
        let params = Parameters::zeros(shape);

        let threads = NonZeroUsize::new(3).unwrap();
        let mut step = LocalStep::with_threads(dataset(), 0..0, shape, threads).unwrap();

        let mut grad = GradientBuffer::zeros(shape);
        step.execute(&params, &mut grad);
        assert_eq!(grad, GradientBuffer::zeros(shape));
    }
}
