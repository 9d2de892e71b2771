pub mod batch;
pub mod health;
pub mod hierarchy;

pub use batch::{dispatch_batch, Batch};
pub use health::HealthMonitor;
