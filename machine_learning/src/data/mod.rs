mod dataset;
pub mod mnist;

pub use dataset::{Batch, Dataset, Label};
