use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type for collective operations.
pub type Result<T> = std::result::Result<T, CollectiveErr>;

/// The collective module's error type.
#[derive(Debug)]
pub enum CollectiveErr {
    Io(io::Error),
    InvalidRank {
        rank: usize,
        world_size: usize,
    },
    SizeMismatch {
        op: &'static str,
        got: usize,
        expected: usize,
    },
    UnexpectedMessage {
        op: &'static str,
        got: &'static str,
    },
    Remote(String),
    Bootstrap(String),
}

impl Display for CollectiveErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectiveErr::Io(e) => write!(f, "io error: {e}"),
            CollectiveErr::InvalidRank { rank, world_size } => {
                write!(f, "rank {rank} is out of range for {world_size} workers")
            }
            CollectiveErr::SizeMismatch { op, got, expected } => write!(
                f,
                "size mismatch during {op}, got {got} and expected {expected}"
            ),
            CollectiveErr::UnexpectedMessage { op, got } => {
                write!(f, "unexpected {got} message during {op}")
            }
            CollectiveErr::Remote(detail) => write!(f, "peer failed: {detail}"),
            CollectiveErr::Bootstrap(detail) => write!(f, "bootstrap failed: {detail}"),
        }
    }
}

impl Error for CollectiveErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CollectiveErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CollectiveErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<CollectiveErr> for io::Error {
    fn from(value: CollectiveErr) -> Self {
        match value {
            CollectiveErr::Io(e) => e,
            other => io::Error::other(other.to_string()),
        }
    }
}
