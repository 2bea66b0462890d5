pub mod distinct_value;
pub mod scoped;
pub mod metrics;

pub use distinct_value::{DistinctString, DistinctValue, StopReason};
pub use metrics::MetricsCollector;
pub use scoped::ScopedDistinctString;
