//! History/analytics store collaborator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;

use crate::analytics::AnalyticsEvent;
use crate::regeneration::RegenerationSession;

/// Maximum records kept by the in-memory store before pruning.
const MAX_MEMORY_RECORDS: usize = 50_000;

/// Store errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Record rejected: {0}")]
    Rejected(String),
}

/// A persisted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum HistoryRecord {
    /// Analytics event
    Event(AnalyticsEvent),
    /// A regeneration session that reached a terminal state
    SessionArchived(RegenerationSession),
}

impl HistoryRecord {
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Event(_) => RecordType::Event,
            Self::SessionArchived(_) => RecordType::SessionArchived,
        }
    }

    /// Session the record belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            Self::Event(event) => &event.session_id,
            Self::SessionArchived(session) => &session.session_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Event(event) => event.timestamp,
            Self::SessionArchived(session) => session.finished_at.unwrap_or(session.started_at),
        }
    }
}

/// Record discriminant for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Event,
    SessionArchived,
}

/// Query filter; unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub record_type: Option<RecordType>,
    pub session_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Newest first when set
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn sessions() -> Self {
        Self {
            record_type: Some(RecordType::SessionArchived),
            ..Default::default()
        }
    }

    pub fn events() -> Self {
        Self {
            record_type: Some(RecordType::Event),
            ..Default::default()
        }
    }

    pub fn for_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &HistoryRecord) -> bool {
        if self.record_type.is_some_and(|t| t != record.record_type()) {
            return false;
        }
        if self.session_id.as_deref().is_some_and(|id| id != record.session_id()) {
            return false;
        }
        let ts = record.timestamp();
        if self.since.is_some_and(|since| ts < since) {
            return false;
        }
        if self.until.is_some_and(|until| ts > until) {
            return false;
        }
        true
    }
}

/// Append/query persistence for events and archived sessions.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: HistoryRecord) -> Result<(), StoreError>;

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<HistoryRecord>, StoreError>;
}

/// Bounded in-memory store.
pub struct MemoryHistoryStore {
    records: RwLock<VecDeque<HistoryRecord>>,
    max_records: usize,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::with_max_records(MAX_MEMORY_RECORDS)
    }

    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            max_records,
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: HistoryRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.push_back(record);
        while records.len() > self.max_records {
            records.pop_front();
        }
        Ok(())
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<HistoryRecord>, StoreError> {
        let records = self.records.read().await;
        let matching = records.iter().rev().filter(|r| filter.matches(r)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}
