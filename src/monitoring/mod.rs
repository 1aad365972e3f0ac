mod metrics;

pub use metrics::GroupMetrics;
