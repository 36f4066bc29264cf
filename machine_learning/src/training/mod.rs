mod device;
mod executor;
mod lanes;
mod local;

pub use device::DeviceStep;
pub use executor::StepExecutor;
pub use lanes::{Lanes, accumulate_batch};
pub use local::LocalStep;
