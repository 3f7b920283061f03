//! Optional capabilities and their probes.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::generator::Generator;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Capability status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    Available,
    Partial,
    Unavailable,
}

impl FeatureStatus {
    pub fn health_score(&self) -> u8 {
        match self {
            Self::Available => 100,
            Self::Partial => 60,
            Self::Unavailable => 0,
        }
    }

    /// Available or partial.
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

/// What a probe observed.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Available,
    /// Reachable but degraded
    Degraded(String),
    Unavailable(String),
}

impl ProbeOutcome {
    pub fn status(&self) -> FeatureStatus {
        match self {
            Self::Available => FeatureStatus::Available,
            Self::Degraded(_) => FeatureStatus::Partial,
            Self::Unavailable(_) => FeatureStatus::Unavailable,
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Available => None,
            Self::Degraded(d) | Self::Unavailable(d) => Some(d.clone()),
        }
    }
}

/// Probe for one optional capability.
#[async_trait]
pub trait FeatureProbe: Send + Sync {
    /// Capability name (e.g. `character_memory`).
    fn name(&self) -> &str;

    /// Capabilities this one needs.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether the capability is a prompt enhancement offered to generators,
    /// as opposed to a generator backend itself.
    fn is_enhancement(&self) -> bool {
        true
    }

    async fn probe(&self) -> ProbeOutcome;
}

/// Probe backed by a generator's availability check.
///
/// Available when the generator reports available within `slow_after`,
/// partial when it answers but slowly, unavailable when it reports
/// unavailable or does not answer within `give_up_after`.
pub struct GeneratorProbe {
    name: String,
    generator: Arc<dyn Generator>,
    slow_after: Duration,
    give_up_after: Duration,
    dependencies: Vec<String>,
    enhancement: bool,
}

impl GeneratorProbe {
    /// Probe a generator backend; named after the generator.
    pub fn backend(generator: Arc<dyn Generator>, slow_after: Duration, give_up_after: Duration) -> Self {
        Self {
            name: generator.id().to_string(),
            generator,
            slow_after,
            give_up_after,
            dependencies: Vec::new(),
            enhancement: false,
        }
    }

    /// Probe an enhancement served by a generator.
    pub fn enhancement(
        name: impl Into<String>,
        generator: Arc<dyn Generator>,
        slow_after: Duration,
        give_up_after: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            generator,
            slow_after,
            give_up_after,
            dependencies: Vec::new(),
            enhancement: true,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

#[async_trait]
impl FeatureProbe for GeneratorProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    fn is_enhancement(&self) -> bool {
        self.enhancement
    }

    async fn probe(&self) -> ProbeOutcome {
        let started = Instant::now();
        match tokio::time::timeout(self.give_up_after, self.generator.is_available()).await {
            Err(_) => ProbeOutcome::Unavailable(format!(
                "{} did not answer within {}ms",
                self.generator.id(),
                self.give_up_after.as_millis()
            )),
            Ok(false) => ProbeOutcome::Unavailable(format!("{} reports unavailable", self.generator.id())),
            Ok(true) => {
                let elapsed = started.elapsed();
                if elapsed > self.slow_after {
                    ProbeOutcome::Degraded(format!("{} answered in {}ms", self.generator.id(), elapsed.as_millis()))
                } else {
                    ProbeOutcome::Available
                }
            }
        }
    }
}

/// Probe with a fixed outcome, for capabilities toggled by configuration.
pub struct StaticProbe {
    name: String,
    outcome: ProbeOutcome,
    dependencies: Vec<String>,
}

impl StaticProbe {
    pub fn new(name: impl Into<String>, outcome: ProbeOutcome) -> Self {
        Self {
            name: name.into(),
            outcome,
            dependencies: Vec::new(),
        }
    }

    pub fn available(name: impl Into<String>) -> Self {
        Self::new(name, ProbeOutcome::Available)
    }

    pub fn unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(name, ProbeOutcome::Unavailable(reason.into()))
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

#[async_trait]
impl FeatureProbe for StaticProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    async fn probe(&self) -> ProbeOutcome {
        self.outcome.clone()
    }
}

/// Probe result for one capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct FeatureRecord {
    pub name: String,
    pub status: FeatureStatus,
    pub health_score: u8,
    pub dependencies: Vec<String>,
    pub enhancement: bool,
    pub detail: Option<String>,
    pub response_ms: u64,
    pub last_checked: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl FeatureRecord {
    pub fn is_usable(&self) -> bool {
        self.status.is_usable()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.last_checked + ChronoDuration::seconds(self.ttl_secs as i64)
    }
}

/// Result of one feature discovery run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct FeatureDiscoveryResult {
    pub features: Vec<FeatureRecord>,
    pub discovered_at: DateTime<Utc>,
    pub available_count: usize,
    pub partial_count: usize,
    pub unavailable_count: usize,
}

impl FeatureDiscoveryResult {
    pub fn new(features: Vec<FeatureRecord>, discovered_at: DateTime<Utc>) -> Self {
        let count = |status| features.iter().filter(|f| f.status == status).count();
        let available_count = count(FeatureStatus::Available);
        let partial_count = count(FeatureStatus::Partial);
        let unavailable_count = count(FeatureStatus::Unavailable);
        Self {
            features,
            discovered_at,
            available_count,
            partial_count,
            unavailable_count,
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureRecord> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn is_usable(&self, name: &str) -> bool {
        self.get(name).is_some_and(FeatureRecord::is_usable)
    }

    pub fn usable_count(&self) -> usize {
        self.available_count + self.partial_count
    }

    /// Available / total; zero when nothing is declared.
    pub fn availability_ratio(&self) -> f64 {
        if self.features.is_empty() {
            0.0
        } else {
            self.available_count as f64 / self.features.len() as f64
        }
    }

    /// Names of usable prompt enhancements.
    pub fn usable_enhancements(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|f| f.enhancement && f.is_usable())
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl_secs: u64) -> bool {
        now < self.discovered_at + ChronoDuration::seconds(ttl_secs as i64)
    }
}
