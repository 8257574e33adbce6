use std::sync::Arc;

use hushlog_core::models::model::ModelSelector;
use hushlog_openai::client::CompletionClient;
use hushlog_storage::{QueryLogStore, UsageRecorder};

/// The collaborators one anonymization run needs, built once at start-up
/// and passed in explicitly.
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn QueryLogStore>,
    pub usage: Arc<dyn UsageRecorder>,
    pub completions: Arc<dyn CompletionClient>,
    pub model: ModelSelector,
    /// Used when a project has no key of its own.
    pub default_api_key: String,
}
