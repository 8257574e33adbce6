use hushlog_core::models::token_count::TokenCount;

use crate::chat::Usage;

/// Extract token counts from a completion `usage` block.
pub fn extract_token_usage(usage: &Usage) -> TokenCount {
    TokenCount {
        input: usage.prompt_tokens,
        output: usage.completion_tokens,
    }
}

/// The total the provider bills for, falling back to the sum of the parts
/// when the provider omits `total_tokens`.
pub fn billed_tokens(usage: &Usage) -> u64 {
    if usage.total_tokens > 0 {
        usage.total_tokens
    } else {
        extract_token_usage(usage).total()
    }
}
