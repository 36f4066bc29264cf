use rayon::prelude::*;

use crate::{
    data::Batch,
    model::{Parameters, Workspace, hypothesis, predict},
};

/// The fraction of samples in `batch` whose most likely class is their label.
///
/// Returns zero for an empty batch.
pub fn accuracy(batch: Batch<'_>, params: &Parameters) -> f32 {
    if batch.is_empty() {
        return 0.;
    }

    let shape = params.shape();
    let hits = (0..batch.len())
        .into_par_iter()
        .map_init(
            || Workspace::new(shape),
            |ws, i| {
                let probs = hypothesis(batch.image(i), params, ws);
                predict(probs) == batch.label(i) as usize
            },
        )
        .filter(|&hit| hit)
        .count();

    hits as f32 / batch.len() as f32
}
