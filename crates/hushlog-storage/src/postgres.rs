//! Postgres-backed store.
//!
//! Expects the tables and materialized view described in `schema.sql`.
//! The pool is built once at start-up and handed to whoever needs it; there
//! is no process-wide client.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use hushlog_core::models::project::{ProjectConfig, ProjectId, TenantBacklog};
use hushlog_core::models::query_record::{AnonymizedRecord, QueryRecord};
use hushlog_core::models::usage::UsageEvent;

use crate::error::StorageError;
use crate::store::{QueryLogStore, UsageRecorder};

/// Connect a small pool. The job is sequential, so a couple of
/// connections is plenty.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

#[derive(FromRow)]
struct QueryRow {
    id: String,
    prompt: Option<String>,
    response: Option<String>,
    processed: bool,
}

impl From<QueryRow> for QueryRecord {
    fn from(row: QueryRow) -> Self {
        Self {
            id: row.id,
            prompt: row.prompt,
            response: row.response,
            processed: row.processed,
        }
    }
}

#[derive(FromRow)]
struct BacklogRow {
    project_id: String,
    oldest_unprocessed_ms: i64,
}

impl TryFrom<BacklogRow> for TenantBacklog {
    type Error = StorageError;

    fn try_from(row: BacklogRow) -> Result<Self, Self::Error> {
        let decode = |reason: String| StorageError::Decode {
            table: "projects_with_unprocessed_queries",
            reason,
        };
        Ok(Self {
            project_id: ProjectId::new(row.project_id).map_err(|e| decode(e.to_string()))?,
            oldest_unprocessed_at: jiff::Timestamp::from_millisecond(row.oldest_unprocessed_ms)
                .map_err(|e| decode(e.to_string()))?,
        })
    }
}

/// [`QueryLogStore`] and [`UsageRecorder`] over a shared Postgres pool.
#[derive(Clone)]
pub struct PgQueryLogStore {
    pool: PgPool,
}

impl PgQueryLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl QueryLogStore for PgQueryLogStore {
    async fn fetch_unprocessed(
        &self,
        project_id: &ProjectId,
        limit: usize,
    ) -> Result<Vec<QueryRecord>, StorageError> {
        let rows = sqlx::query_as::<_, QueryRow>(
            r#"
            SELECT id, prompt, response, processed
            FROM query_logs
            WHERE project_id = $1 AND processed = false
            ORDER BY created_at ASC, id ASC
            LIMIT $2
            "#,
        )
        .bind(project_id.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        debug!(project_id = %project_id, count = rows.len(), "fetched unprocessed records");
        Ok(rows.into_iter().map(QueryRecord::from).collect())
    }

    async fn delete_records(
        &self,
        project_id: &ProjectId,
        ids: &[String],
    ) -> Result<u64, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM query_logs WHERE project_id = $1 AND id = ANY($2)")
            .bind(project_id.as_str())
            .bind(ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn mark_anonymized(
        &self,
        project_id: &ProjectId,
        record: &AnonymizedRecord,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE query_logs
            SET processed = true, prompt = $3, response = $4
            WHERE project_id = $1 AND id = $2
            "#,
        )
        .bind(project_id.as_str())
        .bind(&record.id)
        .bind(record.prompt.as_deref())
        .bind(record.response.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                id: record.id.clone(),
            });
        }
        Ok(())
    }

    async fn project_config(&self, project_id: &ProjectId) -> Result<ProjectConfig, StorageError> {
        let key: Option<Option<String>> = sqlx::query_scalar(
            "SELECT openai_api_key FROM project_settings WHERE project_id = $1",
        )
        .bind(project_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(ProjectConfig {
            openai_api_key: key.flatten(),
        })
    }

    async fn stale_projects(&self, limit: usize) -> Result<Vec<TenantBacklog>, StorageError> {
        let rows = sqlx::query_as::<_, BacklogRow>(
            r#"
            SELECT project_id,
                   (EXTRACT(EPOCH FROM oldest_unprocessed_at) * 1000)::bigint AS oldest_unprocessed_ms
            FROM projects_with_unprocessed_queries
            ORDER BY oldest_unprocessed_at ASC, project_id ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TenantBacklog::try_from).collect()
    }
}

#[async_trait]
impl UsageRecorder for PgQueryLogStore {
    async fn record(&self, event: &UsageEvent) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO usage_events (project_id, provider, model, tokens, source)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.project_id.as_str())
        .bind(event.model.provider)
        .bind(event.model.model_id)
        .bind(event.tokens as i64)
        .bind(event.source)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
