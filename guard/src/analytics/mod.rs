//! Usage, performance, error and satisfaction analytics.

pub mod alert;
pub mod event;
pub mod recorder;
pub mod report;

pub use alert::{AlertType, PerformanceAlert};
pub use event::{AnalyticsEvent, EventPayload};
pub use recorder::AnalyticsRecorder;
pub use report::{AnalyticsReport, FeatureUsageStats, TimeRange};
