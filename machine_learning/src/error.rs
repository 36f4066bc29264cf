use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidShape {
        labels: usize,
        image_size: usize,
    },
    LabelOutOfRange {
        index: usize,
        label: u8,
        labels: usize,
    },
    EmptyDataset,
    ParamGenExhausted {
        got: usize,
        expected: usize,
    },
    ThreadPool(String),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "size mismatch for {what}, got {got} and expected {expected}"),
            MlErr::InvalidShape { labels, image_size } => write!(
                f,
                "invalid model shape, {labels} labels and {image_size} pixels per image must both be positive"
            ),
            MlErr::LabelOutOfRange {
                index,
                label,
                labels,
            } => write!(
                f,
                "the label {label} of sample {index} is out of range for a model with {labels} labels"
            ),
            MlErr::EmptyDataset => write!(f, "can't train over an empty dataset"),
            MlErr::ParamGenExhausted { got, expected } => write!(
                f,
                "the parameter generator was exhausted after {got} of {expected} parameters"
            ),
            MlErr::ThreadPool(detail) => write!(f, "failed to build thread pool: {detail}"),
        }
    }
}

impl Error for MlErr {}

impl From<rayon::ThreadPoolBuildError> for MlErr {
    fn from(value: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(value.to_string())
    }
}
