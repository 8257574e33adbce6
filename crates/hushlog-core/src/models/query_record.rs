use serde::{Deserialize, Serialize};

/// One logged interaction, as stored in `query_logs`.
///
/// Serialized with exactly these field names: the same JSON is embedded in
/// the anonymization prompt and used for token estimation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: String,
    pub prompt: Option<String>,
    pub response: Option<String>,
    pub processed: bool,
}

impl QueryRecord {
    pub fn new(id: impl Into<String>, prompt: Option<&str>, response: Option<&str>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.map(str::to_string),
            response: response.map(str::to_string),
            processed: false,
        }
    }
}

/// A record as returned by the model after PII has been stripped.
///
/// Only `id`, `prompt` and `response` are meaningful; anything else the
/// model echoes back (such as `processed`) is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizedRecord {
    pub id: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

/// The ordered set of records assembled for a single prompt.
pub type Batch = Vec<QueryRecord>;
