//! In-memory store.
//!
//! Orders records by creation time, then id, as the Postgres store does. Used by
//! the test suites and for running the trigger locally without a database.
//! Individual record updates can be made to fail, and every mutation is
//! counted so callers can assert that nothing was written.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use hushlog_core::models::project::{ProjectConfig, ProjectId, TenantBacklog};
use hushlog_core::models::query_record::{AnonymizedRecord, QueryRecord};
use hushlog_core::models::usage::UsageEvent;

use crate::error::StorageError;
use crate::store::{QueryLogStore, UsageRecorder};

struct StoredRecord {
    project_id: ProjectId,
    created_at: jiff::Timestamp,
    record: QueryRecord,
}

#[derive(Default)]
struct State {
    records: Vec<StoredRecord>,
    configs: HashMap<ProjectId, ProjectConfig>,
    failing_updates: HashSet<String>,
    fail_reads: bool,
    deletes: usize,
    updates: usize,
}

// Reads made to fail look like a database that stopped answering.
fn read_failure() -> StorageError {
    StorageError::Database(sqlx::Error::PoolTimedOut)
}

#[derive(Clone, Default)]
pub struct InMemoryQueryLogStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryQueryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record stamped with the current time.
    pub async fn insert(&self, project_id: &ProjectId, record: QueryRecord) {
        self.insert_at(project_id, record, jiff::Timestamp::now()).await;
    }

    pub async fn insert_at(
        &self,
        project_id: &ProjectId,
        record: QueryRecord,
        created_at: jiff::Timestamp,
    ) {
        self.state.lock().await.records.push(StoredRecord {
            project_id: project_id.clone(),
            created_at,
            record,
        });
    }

    pub async fn set_config(&self, project_id: &ProjectId, config: ProjectConfig) {
        self.state
            .lock()
            .await
            .configs
            .insert(project_id.clone(), config);
    }

    /// Make every later update of `id` fail as if the row were missing.
    pub async fn fail_updates_for(&self, id: &str) {
        self.state
            .lock()
            .await
            .failing_updates
            .insert(id.to_string());
    }

    /// Make every read fail.
    pub async fn fail_reads(&self) {
        self.state.lock().await.fail_reads = true;
    }

    pub async fn get(&self, project_id: &ProjectId, id: &str) -> Option<QueryRecord> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .find(|r| &r.project_id == project_id && r.record.id == id)
            .map(|r| r.record.clone())
    }

    /// Number of successful update and delete calls so far.
    pub async fn write_count(&self) -> usize {
        let state = self.state.lock().await;
        state.updates + state.deletes
    }
}

#[async_trait]
impl QueryLogStore for InMemoryQueryLogStore {
    async fn fetch_unprocessed(
        &self,
        project_id: &ProjectId,
        limit: usize,
    ) -> Result<Vec<QueryRecord>, StorageError> {
        let state = self.state.lock().await;
        if state.fail_reads {
            return Err(read_failure());
        }

        let mut rows: Vec<&StoredRecord> = state
            .records
            .iter()
            .filter(|r| &r.project_id == project_id && !r.record.processed)
            .collect();
        rows.sort_by(|a, b| {
            (a.created_at, &a.record.id).cmp(&(b.created_at, &b.record.id))
        });

        Ok(rows
            .into_iter()
            .take(limit)
            .map(|r| r.record.clone())
            .collect())
    }

    async fn delete_records(
        &self,
        project_id: &ProjectId,
        ids: &[String],
    ) -> Result<u64, StorageError> {
        let mut state = self.state.lock().await;
        let before = state.records.len();
        state
            .records
            .retain(|r| !(&r.project_id == project_id && ids.contains(&r.record.id)));
        let removed = (before - state.records.len()) as u64;
        state.deletes += 1;
        Ok(removed)
    }

    async fn mark_anonymized(
        &self,
        project_id: &ProjectId,
        record: &AnonymizedRecord,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        if state.failing_updates.contains(&record.id) {
            return Err(StorageError::NotFound {
                id: record.id.clone(),
            });
        }

        let stored = state
            .records
            .iter_mut()
            .find(|r| &r.project_id == project_id && r.record.id == record.id)
            .ok_or_else(|| StorageError::NotFound {
                id: record.id.clone(),
            })?;

        stored.record.prompt = record.prompt.clone();
        stored.record.response = record.response.clone();
        stored.record.processed = true;
        state.updates += 1;
        Ok(())
    }

    async fn project_config(&self, project_id: &ProjectId) -> Result<ProjectConfig, StorageError> {
        let state = self.state.lock().await;
        if state.fail_reads {
            return Err(read_failure());
        }
        Ok(state.configs.get(project_id).cloned().unwrap_or_default())
    }

    async fn stale_projects(&self, limit: usize) -> Result<Vec<TenantBacklog>, StorageError> {
        let state = self.state.lock().await;
        if state.fail_reads {
            return Err(read_failure());
        }

        let mut oldest: HashMap<&ProjectId, jiff::Timestamp> = HashMap::new();
        for r in state.records.iter().filter(|r| !r.record.processed) {
            oldest
                .entry(&r.project_id)
                .and_modify(|t| *t = (*t).min(r.created_at))
                .or_insert(r.created_at);
        }

        let mut backlog: Vec<TenantBacklog> = oldest
            .into_iter()
            .map(|(project_id, oldest_unprocessed_at)| TenantBacklog {
                project_id: project_id.clone(),
                oldest_unprocessed_at,
            })
            .collect();
        backlog.sort_by(|a, b| {
            (a.oldest_unprocessed_at, a.project_id.as_str())
                .cmp(&(b.oldest_unprocessed_at, b.project_id.as_str()))
        });
        backlog.truncate(limit);
        Ok(backlog)
    }
}

/// Collects usage events in memory.
#[derive(Clone, Default)]
pub struct InMemoryUsageRecorder {
    events: Arc<Mutex<Vec<UsageEvent>>>,
}

impl InMemoryUsageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<UsageEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl UsageRecorder for InMemoryUsageRecorder {
    async fn record(&self, event: &UsageEvent) -> Result<(), StorageError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
