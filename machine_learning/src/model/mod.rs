mod forward;
mod gradient;
mod params;

pub use forward::{Workspace, forward, hypothesis, normalize, predict, softmax};
pub use gradient::{GradientBuffer, accumulate};
pub use params::Parameters;
