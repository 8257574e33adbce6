use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::query_record::QueryRecord;

/// Bytes of serialized JSON assumed per token.
///
/// Real English text averages closer to four, so dividing by three
/// overestimates on purpose.
pub const BYTES_PER_TOKEN: u64 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCount {
    pub input: u64,
    pub output: u64,
}

impl TokenCount {
    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}

/// Approximate the token cost of a record from its full JSON size.
pub fn estimate_tokens(record: &QueryRecord) -> Result<u64, CoreError> {
    let bytes = serde_json::to_vec(record)?.len() as u64;
    Ok(bytes.div_ceil(BYTES_PER_TOKEN))
}
