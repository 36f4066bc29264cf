use std::{error::Error, fmt, io};

use collective::CollectiveErr;
use machine_learning::{MlErr, data::mnist::MnistErr};

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Worker runtime failures.
#[derive(Debug)]
pub enum WorkerErr {
    Io(io::Error),
    InvalidConfig(String),
    Json(serde_json::Error),
    Dataset(MnistErr),
    Ml(MlErr),
    Collective(CollectiveErr),
    Join(String),
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::InvalidConfig(detail) => write!(f, "invalid config: {detail}"),
            WorkerErr::Json(e) => write!(f, "malformed config: {e}"),
            WorkerErr::Dataset(e) => write!(f, "dataset error: {e}"),
            WorkerErr::Ml(e) => write!(f, "{e}"),
            WorkerErr::Collective(e) => write!(f, "collective error: {e}"),
            WorkerErr::Join(detail) => write!(f, "compute task failed: {detail}"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Io(e) => Some(e),
            WorkerErr::Json(e) => Some(e),
            WorkerErr::Dataset(e) => Some(e),
            WorkerErr::Ml(e) => Some(e),
            WorkerErr::Collective(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for WorkerErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<MnistErr> for WorkerErr {
    fn from(value: MnistErr) -> Self {
        Self::Dataset(value)
    }
}

impl From<MlErr> for WorkerErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<CollectiveErr> for WorkerErr {
    fn from(value: CollectiveErr) -> Self {
        Self::Collective(value)
    }
}

impl From<tokio::task::JoinError> for WorkerErr {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Join(value.to_string())
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
