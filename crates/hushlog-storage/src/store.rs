use async_trait::async_trait;

use hushlog_core::models::project::{ProjectConfig, ProjectId, TenantBacklog};
use hushlog_core::models::query_record::{AnonymizedRecord, QueryRecord};
use hushlog_core::models::usage::UsageEvent;

use crate::error::StorageError;

/// Read/write access to query records and project settings.
///
/// Every operation is scoped to a single project except
/// [`stale_projects`](QueryLogStore::stale_projects), which spans tenants.
#[async_trait]
pub trait QueryLogStore: Send + Sync {
    /// Up to `limit` unprocessed records, oldest first.
    async fn fetch_unprocessed(
        &self,
        project_id: &ProjectId,
        limit: usize,
    ) -> Result<Vec<QueryRecord>, StorageError>;

    /// Permanently delete records. Returns how many rows were removed.
    async fn delete_records(
        &self,
        project_id: &ProjectId,
        ids: &[String],
    ) -> Result<u64, StorageError>;

    /// Overwrite a record's text with the anonymized version and mark it
    /// processed. Fails with [`StorageError::NotFound`] if no row matched.
    async fn mark_anonymized(
        &self,
        project_id: &ProjectId,
        record: &AnonymizedRecord,
    ) -> Result<(), StorageError>;

    /// The project's settings, or defaults if it has none.
    async fn project_config(&self, project_id: &ProjectId) -> Result<ProjectConfig, StorageError>;

    /// At most `limit` projects with unprocessed records, stalest backlog
    /// first, ties broken by project id.
    async fn stale_projects(&self, limit: usize) -> Result<Vec<TenantBacklog>, StorageError>;
}

/// Write-only metering sink.
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    async fn record(&self, event: &UsageEvent) -> Result<(), StorageError>;
}
