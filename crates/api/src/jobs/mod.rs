//! Background job scheduler and job implementations.

mod expiry;
mod pool_metrics;
mod scheduler;

pub use expiry::ExpirySweepJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::JobScheduler;
