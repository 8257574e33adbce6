use serde::{Deserialize, Serialize};

use super::model::ModelSelector;
use super::project::ProjectId;

/// Source label attached to every usage event this job records.
pub const USAGE_SOURCE: &str = "query-anonymizer";

/// A metering entry: tokens spent on behalf of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageEvent {
    pub project_id: ProjectId,
    pub model: ModelSelector,
    pub tokens: u64,
    pub source: &'static str,
}

impl UsageEvent {
    pub fn anonymizer(project_id: ProjectId, model: ModelSelector, tokens: u64) -> Self {
        Self {
            project_id,
            model,
            tokens,
            source: USAGE_SOURCE,
        }
    }
}
