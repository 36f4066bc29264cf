pub mod data;
mod error;
pub mod evaluation;
pub mod initialization;
pub mod model;
pub mod optimization;
pub mod partition;
mod shape;
pub mod training;

pub use error::{MlErr, Result};
pub use shape::ModelShape;
