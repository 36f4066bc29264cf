mod collective;
mod context;
mod error;
mod local;
pub mod tcp;

pub use collective::Collective;
pub use context::{ROOT, WorkerContext};
pub use error::{CollectiveErr, Result};
pub use local::{LocalCollective, group};
