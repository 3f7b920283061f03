//! Feature discovery and system health.

pub mod check;
pub mod feature;
pub mod monitor;

pub use check::{CheckOutcome, HealthCheck, HealthCheckResult, HealthStatus, SystemStatus};
pub use feature::{
    FeatureDiscoveryResult, FeatureProbe, FeatureRecord, FeatureStatus, GeneratorProbe, ProbeOutcome, StaticProbe,
};
pub use monitor::{FeatureHealthMonitor, InitializationReport, ResourceGauge, StaticGauge};
