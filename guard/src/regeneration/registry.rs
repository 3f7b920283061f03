//! Registry of in-flight sessions, keyed by content unit.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;

use super::session::ValidationOutcome;
use crate::health::ResourceGauge;

/// Handle joiners subscribe through.
pub struct SessionHandle {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    result: watch::Receiver<Option<ValidationOutcome>>,
}

impl SessionHandle {
    pub(crate) fn new(
        session_id: String,
        started_at: DateTime<Utc>,
        result: watch::Receiver<Option<ValidationOutcome>>,
    ) -> Self {
        Self {
            session_id,
            started_at,
            result,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ValidationOutcome>> {
        self.result.clone()
    }
}

/// At most one session per content key.
pub struct SessionRegistry {
    pub(crate) sessions: DashMap<String, SessionHandle>,
    limit: usize,
}

impl SessionRegistry {
    pub fn new(limit: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sessions.contains_key(key)
    }

    /// Session id running for `key`, if any.
    pub fn session_id(&self, key: &str) -> Option<String> {
        self.sessions.get(key).map(|h| h.session_id.clone())
    }

    pub(crate) fn subscribe(&self, key: &str) -> Option<watch::Receiver<Option<ValidationOutcome>>> {
        self.sessions.get(key).map(|h| h.subscribe())
    }

    pub(crate) fn remove(&self, key: &str) {
        self.sessions.remove(key);
    }
}

impl ResourceGauge for SessionRegistry {
    fn utilization(&self) -> f64 {
        if self.limit == 0 {
            return 1.0;
        }
        self.len() as f64 / self.limit as f64
    }
}

/// Removes a session's registry entry when its task ends, panics included.
pub(crate) struct RegistrationGuard {
    registry: Arc<SessionRegistry>,
    key: String,
}

impl RegistrationGuard {
    pub(crate) fn new(registry: Arc<SessionRegistry>, key: String) -> Self {
        Self { registry, key }
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.key);
    }
}
