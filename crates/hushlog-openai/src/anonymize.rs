//! The anonymization prompt round trip.
//!
//! A batch of query records is embedded as a JSON array in one instruction
//! prompt; the model is asked to answer with an array of the same shape.
//! Sending the request and recording usage are left to the caller so that
//! metering happens whether or not the answer parses.

use hushlog_core::models::model::ModelSelector;
use hushlog_core::models::query_record::{AnonymizedRecord, QueryRecord};

use crate::chat::{ChatCompletionRequest, ChatMessage};
use crate::error::CompletionError;

/// Upper bound on completion tokens per request.
pub const MAX_COMPLETION_TOKENS: u32 = 2048;

const TEMPERATURE: f32 = 0.2;

const ANONYMIZATION_INSTRUCTIONS: &str = "\
You are given a JSON array of logged user queries. Each element has an \"id\", \
a \"prompt\" and a \"response\". Rewrite the \"prompt\" and \"response\" text \
so that it contains no personally identifying information: replace names, \
email addresses, phone numbers, street addresses, account numbers and similar \
details with generic placeholders such as [NAME] or [EMAIL]. Keep everything \
else as close to the original as possible. Do not change any \"id\" value, do \
not add or remove elements, and keep null fields null. Respond with the \
resulting JSON array only, with no commentary.";

/// Build the single user prompt for a batch.
pub fn build_prompt(batch: &[QueryRecord]) -> Result<String, CompletionError> {
    let records = serde_json::to_string(batch)?;
    Ok(format!("{ANONYMIZATION_INSTRUCTIONS}\n\nRecords:\n{records}"))
}

/// Build the low-randomness, single-candidate request for a batch.
pub fn anonymization_request(
    model: &ModelSelector,
    batch: &[QueryRecord],
) -> Result<ChatCompletionRequest, CompletionError> {
    Ok(ChatCompletionRequest {
        model: model.model_id.to_string(),
        messages: vec![ChatMessage::user(build_prompt(batch)?)],
        temperature: TEMPERATURE,
        top_p: 1.0,
        frequency_penalty: 0.0,
        presence_penalty: 0.0,
        n: 1,
        stream: false,
        max_tokens: MAX_COMPLETION_TOKENS,
    })
}

/// Parse the model's answer into anonymized records.
///
/// Accepts the array bare or wrapped in a Markdown code fence.
pub fn parse_anonymized(text: &str) -> Result<Vec<AnonymizedRecord>, CompletionError> {
    serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        CompletionError::SchemaViolation(format!(
            "failed to parse anonymized records: {e}. Response: {text}"
        ))
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop an optional language tag on the opening fence.
    rest.trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim()
}
