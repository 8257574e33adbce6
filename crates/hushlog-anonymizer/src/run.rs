//! Per-invocation orchestration: one named project, or the stalest backlog.

use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use hushlog_core::models::project::ProjectId;
use hushlog_storage::QueryLogStore;

use crate::context::JobContext;
use crate::driver::anonymize_batch;
use crate::error::FailureStage;
use crate::select::select_batch;

/// Projects visited per run when none is named.
pub const MAX_PROJECTS_PER_RUN: usize = 20;

/// How a single project's run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No unprocessed records.
    Idle,
    /// Records exist but none fit in a batch this time.
    Trimmed { evicted: usize },
    Anonymized { processed: usize, evicted: usize },
    Failed { stage: FailureStage },
}

impl RunOutcome {
    pub fn processed(&self) -> usize {
        match self {
            RunOutcome::Anonymized { processed, .. } => *processed,
            _ => 0,
        }
    }

    pub fn evicted(&self) -> usize {
        match self {
            RunOutcome::Trimmed { evicted } | RunOutcome::Anonymized { evicted, .. } => *evicted,
            _ => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Idle => "idle",
            RunOutcome::Trimmed { .. } => "trimmed",
            RunOutcome::Anonymized { .. } => "anonymized",
            RunOutcome::Failed { .. } => "failed",
        }
    }
}

/// Totals over every project a run visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub projects: usize,
    pub processed: usize,
    pub failed: usize,
}

impl RunSummary {
    fn add(&mut self, outcome: &RunOutcome) {
        self.projects += 1;
        self.processed += outcome.processed();
        if matches!(outcome, RunOutcome::Failed { .. }) {
            self.failed += 1;
        }
    }
}

/// Select and anonymize one batch for a project.
pub async fn anonymize_project(ctx: &JobContext, project_id: &ProjectId) -> RunOutcome {
    let outcome = match select_batch(ctx.store.as_ref(), project_id, &ctx.model).await {
        Err(e) => {
            error!(project_id = %project_id, error = %e, "batch selection failed");
            RunOutcome::Failed { stage: e.stage() }
        }
        Ok(selection) if selection.is_idle() => RunOutcome::Idle,
        Ok(selection) if selection.batch.is_empty() => RunOutcome::Trimmed {
            evicted: selection.evicted.len(),
        },
        Ok(selection) => match anonymize_batch(ctx, project_id, &selection.batch).await {
            Ok(processed) => RunOutcome::Anonymized {
                processed,
                evicted: selection.evicted.len(),
            },
            Err(e) => {
                error!(project_id = %project_id, error = %e, "anonymization failed");
                RunOutcome::Failed { stage: e.stage() }
            }
        },
    };

    match &outcome {
        RunOutcome::Failed { stage } => info!(
            project_id = %project_id,
            outcome = outcome.label(),
            stage = stage.as_str(),
            "project run finished"
        ),
        _ => info!(
            project_id = %project_id,
            outcome = outcome.label(),
            processed = outcome.processed(),
            evicted = outcome.evicted(),
            "project run finished"
        ),
    }

    outcome
}

/// Work through the projects with the stalest backlog, one at a time.
pub async fn anonymize_backlog(ctx: &JobContext) -> RunSummary {
    let mut summary = RunSummary::default();

    let backlog = match ctx.store.stale_projects(MAX_PROJECTS_PER_RUN).await {
        Ok(backlog) => backlog,
        Err(e) => {
            error!(error = %e, "failed to read project backlog");
            return summary;
        }
    };

    for entry in &backlog {
        let outcome = anonymize_project(ctx, &entry.project_id).await;
        summary.add(&outcome);
    }

    summary
}

/// Entry point for one scheduled invocation. Returns the total number of
/// records anonymized; never fails.
pub async fn run(ctx: &JobContext, project_id: Option<&ProjectId>) -> usize {
    let run_id = Uuid::new_v4();
    let span = info_span!("anonymize_run", run_id = %run_id);

    async move {
        let summary = match project_id {
            Some(project_id) => {
                let mut summary = RunSummary::default();
                summary.add(&anonymize_project(ctx, project_id).await);
                summary
            }
            None => anonymize_backlog(ctx).await,
        };

        info!(
            projects = summary.projects,
            processed = summary.processed,
            failed = summary.failed,
            "anonymization run complete"
        );

        summary.processed
    }
    .instrument(span)
    .await
}
