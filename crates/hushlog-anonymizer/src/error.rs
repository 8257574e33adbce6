use thiserror::Error;

use hushlog_openai::error::CompletionError;
use hushlog_storage::error::StorageError;

/// Where in the pipeline a project's run gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Fetch,
    Prompt,
    Completion,
    Parse,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Fetch => "fetch",
            FailureStage::Prompt => "prompt",
            FailureStage::Completion => "completion",
            FailureStage::Parse => "parse",
        }
    }
}

#[derive(Debug, Error)]
pub enum AnonymizeError {
    #[error("failed to fetch unprocessed records: {0}")]
    Fetch(#[source] StorageError),

    #[error("failed to build prompt: {0}")]
    Prompt(#[source] CompletionError),

    #[error("completion failed: {0}")]
    Completion(#[source] CompletionError),

    #[error("model returned unusable output: {0}")]
    Parse(#[source] CompletionError),
}

impl AnonymizeError {
    pub fn stage(&self) -> FailureStage {
        match self {
            AnonymizeError::Fetch(_) => FailureStage::Fetch,
            AnonymizeError::Prompt(_) => FailureStage::Prompt,
            AnonymizeError::Completion(_) => FailureStage::Completion,
            AnonymizeError::Parse(_) => FailureStage::Parse,
        }
    }
}
