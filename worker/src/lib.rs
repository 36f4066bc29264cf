pub mod builder;
pub mod config;
pub mod error;
pub mod launch;
pub mod metrics;
pub mod report;
pub mod state;
pub mod trainer;

pub use builder::WorkerBuilder;
pub use config::TrainingConfig;
pub use error::{Result, WorkerErr};
pub use trainer::{Trainer, TrainingOutcome};
