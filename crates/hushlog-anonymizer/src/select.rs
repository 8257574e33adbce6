//! Batch selection.
//!
//! A page of unprocessed records is fetched, records too large to ever share
//! a prompt are deleted, and the rest is cut down to the longest prefix whose
//! estimated cost stays strictly under the model's batch budget.

use tracing::{debug, error, warn};

use hushlog_core::models::model::ModelSelector;
use hushlog_core::models::project::ProjectId;
use hushlog_core::models::query_record::{Batch, QueryRecord};
use hushlog_core::models::token_count::estimate_tokens;
use hushlog_storage::QueryLogStore;

use crate::error::AnonymizeError;

/// Records fetched per project per run.
pub const PAGE_SIZE: usize = 10;

/// A record paired with its estimated token cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostedRecord {
    pub record: QueryRecord,
    pub cost: u64,
}

/// What batch selection did for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub batch: Batch,
    /// Unprocessed records seen in the page.
    pub fetched: usize,
    /// Ids of oversized records that were deleted.
    pub evicted: Vec<String>,
}

impl Selection {
    pub fn is_idle(&self) -> bool {
        self.fetched == 0
    }
}

/// Estimate every record's cost. A record that cannot be serialized is
/// logged and left out; it stays unprocessed.
pub fn estimate_all(records: Vec<QueryRecord>) -> Vec<CostedRecord> {
    records
        .into_iter()
        .filter_map(|record| match estimate_tokens(&record) {
            Ok(cost) => Some(CostedRecord { record, cost }),
            Err(e) => {
                error!(record_id = %record.id, error = %e, "failed to estimate record cost");
                None
            }
        })
        .collect()
}

/// Split records into `(fits, oversized)`, where oversized means a cost
/// strictly above `threshold`. Order is preserved on both sides.
pub fn partition_oversized(
    records: Vec<CostedRecord>,
    threshold: u64,
) -> (Vec<CostedRecord>, Vec<CostedRecord>) {
    records.into_iter().partition(|r| r.cost <= threshold)
}

/// Keep the longest prefix whose cumulative cost is strictly below `budget`.
pub fn trim_to_budget(records: Vec<CostedRecord>, budget: u64) -> Batch {
    let mut total = 0u64;
    let mut batch = Vec::with_capacity(records.len());

    for costed in records {
        let next = total.saturating_add(costed.cost);
        if next >= budget {
            break;
        }
        total = next;
        batch.push(costed.record);
    }

    batch
}

/// Select the next batch for a project.
///
/// Oversized records are deleted from the store as a side effect. Deleting
/// is irreversible and a failure to delete is only logged: the records are
/// excluded from this run either way.
pub async fn select_batch(
    store: &dyn QueryLogStore,
    project_id: &ProjectId,
    model: &ModelSelector,
) -> Result<Selection, AnonymizeError> {
    let records = store
        .fetch_unprocessed(project_id, PAGE_SIZE)
        .await
        .map_err(AnonymizeError::Fetch)?;

    let fetched = records.len();
    if fetched == 0 {
        return Ok(Selection::default());
    }

    let (fits, oversized) = partition_oversized(estimate_all(records), model.overflow_threshold());

    let evicted: Vec<String> = oversized.iter().map(|r| r.record.id.clone()).collect();
    if !evicted.is_empty() {
        for r in &oversized {
            warn!(
                project_id = %project_id,
                record_id = %r.record.id,
                estimated_tokens = r.cost,
                threshold = model.overflow_threshold(),
                "deleting record too large to ever fit in a batch"
            );
        }
        if let Err(e) = store.delete_records(project_id, &evicted).await {
            error!(project_id = %project_id, error = %e, "failed to delete oversized records");
        }
    }

    let batch = trim_to_budget(fits, model.batch_budget());

    debug!(
        project_id = %project_id,
        fetched,
        evicted = evicted.len(),
        selected = batch.len(),
        "batch selected"
    );

    Ok(Selection {
        batch,
        fetched,
        evicted,
    })
}
