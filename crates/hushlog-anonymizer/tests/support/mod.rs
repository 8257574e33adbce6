#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use hushlog_anonymizer::JobContext;
use hushlog_core::models::model::ModelSelector;
use hushlog_core::models::project::ProjectId;
use hushlog_core::models::query_record::QueryRecord;
use hushlog_openai::chat::{ChatCompletionRequest, Completion, Usage};
use hushlog_openai::client::CompletionClient;
use hushlog_openai::error::CompletionError;
use hushlog_storage::memory::{InMemoryQueryLogStore, InMemoryUsageRecorder};

pub const DEFAULT_KEY: &str = "sk-default";

/// A model small enough that test records can overflow it: both the
/// overflow threshold and the batch budget are 100 tokens.
pub const TINY_MODEL: ModelSelector = ModelSelector {
    provider: "openai",
    model_id: "tiny-test-model",
    context_window: 200,
};

/// One recorded call to [`ScriptedCompletions`].
#[derive(Debug, Clone)]
pub struct Call {
    pub api_key: String,
    pub request: ChatCompletionRequest,
}

/// Replays queued results in order and records every request.
#[derive(Clone, Default)]
pub struct ScriptedCompletions {
    replies: Arc<Mutex<VecDeque<Result<Completion, CompletionError>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedCompletions {
    pub fn reply(&self, text: &str, total_tokens: u64) {
        self.replies.lock().unwrap().push_back(Ok(Completion {
            text: text.to_string(),
            usage: Usage {
                prompt_tokens: total_tokens,
                completion_tokens: 0,
                total_tokens,
            },
        }));
    }

    pub fn fail(&self, error: CompletionError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletions {
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<Completion, CompletionError> {
        self.calls.lock().unwrap().push(Call {
            api_key: api_key.to_string(),
            request: request.clone(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::ResponseParse("no scripted reply".to_string())))
    }
}

pub struct Harness {
    pub store: InMemoryQueryLogStore,
    pub usage: InMemoryUsageRecorder,
    pub completions: ScriptedCompletions,
    pub ctx: JobContext,
}

pub fn harness(model: ModelSelector) -> Harness {
    let store = InMemoryQueryLogStore::new();
    let usage = InMemoryUsageRecorder::new();
    let completions = ScriptedCompletions::default();
    let ctx = JobContext {
        store: Arc::new(store.clone()),
        usage: Arc::new(usage.clone()),
        completions: Arc::new(completions.clone()),
        model,
        default_api_key: DEFAULT_KEY.to_string(),
    };
    Harness {
        store,
        usage,
        completions,
        ctx,
    }
}

pub fn project(id: &str) -> ProjectId {
    ProjectId::new(id).unwrap()
}

pub fn at(seconds: i64) -> jiff::Timestamp {
    jiff::Timestamp::from_second(seconds).unwrap()
}

/// Insert records in the given order, one second apart.
pub async fn seed(store: &InMemoryQueryLogStore, project_id: &ProjectId, records: Vec<QueryRecord>) {
    for (i, record) in records.into_iter().enumerate() {
        store.insert_at(project_id, record, at(1_000 + i as i64)).await;
    }
}

pub fn scrubbed_reply(ids: &[&str]) -> String {
    let records: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "prompt": format!("[NAME] asked {id}"),
                "response": format!("[NAME] answered {id}"),
            })
        })
        .collect();
    serde_json::to_string(&records).unwrap()
}
