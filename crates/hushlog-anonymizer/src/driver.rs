//! Sends a selected batch through the model and writes the result back.

use std::collections::HashSet;

use tracing::{error, info, warn};

use hushlog_core::models::project::ProjectId;
use hushlog_core::models::query_record::QueryRecord;
use hushlog_core::models::usage::UsageEvent;
use hushlog_openai::anonymize::{anonymization_request, parse_anonymized};
use hushlog_openai::client::CompletionClient;
use hushlog_openai::tokens::billed_tokens;
use hushlog_storage::{QueryLogStore, UsageRecorder};

use crate::context::JobContext;
use crate::error::AnonymizeError;

/// Anonymize one batch, returning the number of records the model returned.
///
/// This is [`anonymize_batch`] with every failure logged and counted as zero.
pub async fn process_batch(
    ctx: &JobContext,
    project_id: &ProjectId,
    batch: &[QueryRecord],
) -> usize {
    match anonymize_batch(ctx, project_id, batch).await {
        Ok(count) => count,
        Err(e) => {
            error!(
                project_id = %project_id,
                stage = e.stage().as_str(),
                error = %e,
                "anonymization failed"
            );
            0
        }
    }
}

/// Anonymize one batch.
///
/// An empty batch is a no-op. Otherwise one completion request is made; its
/// usage is metered as soon as it succeeds. Each returned record is written
/// independently and a failed write is only logged, so the count is the
/// number of parsed entries rather than the number of successful writes.
/// Entries whose id was not in `batch` are counted but never written.
pub async fn anonymize_batch(
    ctx: &JobContext,
    project_id: &ProjectId,
    batch: &[QueryRecord],
) -> Result<usize, AnonymizeError> {
    if batch.is_empty() {
        return Ok(0);
    }

    let request = anonymization_request(&ctx.model, batch).map_err(AnonymizeError::Prompt)?;
    let api_key = resolve_api_key(ctx, project_id).await;

    let completion = ctx
        .completions
        .complete(&api_key, &request)
        .await
        .map_err(AnonymizeError::Completion)?;

    let tokens = billed_tokens(&completion.usage);
    let event = UsageEvent::anonymizer(project_id.clone(), ctx.model, tokens);
    if let Err(e) = ctx.usage.record(&event).await {
        error!(project_id = %project_id, tokens, error = %e, "failed to record usage");
    }

    let records = parse_anonymized(&completion.text).map_err(|e| {
        error!(
            project_id = %project_id,
            raw = %completion.text,
            "model output was not a record array"
        );
        AnonymizeError::Parse(e)
    })?;

    let submitted: HashSet<&str> = batch.iter().map(|r| r.id.as_str()).collect();

    let mut written = 0usize;
    for record in &records {
        if !submitted.contains(record.id.as_str()) {
            warn!(
                project_id = %project_id,
                record_id = %record.id,
                "model returned a record that was not submitted, skipping"
            );
            continue;
        }
        match ctx.store.mark_anonymized(project_id, record).await {
            Ok(()) => written += 1,
            Err(e) => {
                warn!(
                    project_id = %project_id,
                    record_id = %record.id,
                    error = %e,
                    "failed to store anonymized record"
                );
            }
        }
    }

    info!(
        project_id = %project_id,
        submitted = batch.len(),
        returned = records.len(),
        written,
        tokens,
        "batch anonymized"
    );

    Ok(records.len())
}

/// The project's own key if it has one, else the process default.
async fn resolve_api_key(ctx: &JobContext, project_id: &ProjectId) -> String {
    match ctx.store.project_config(project_id).await {
        Ok(config) => config
            .api_key()
            .map(str::to_string)
            .unwrap_or_else(|| ctx.default_api_key.clone()),
        Err(e) => {
            warn!(
                project_id = %project_id,
                error = %e,
                "failed to read project config, using default key"
            );
            ctx.default_api_key.clone()
        }
    }
}
