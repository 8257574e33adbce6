use serde::Serialize;

/// The chat-completion model the anonymizer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelSelector {
    pub provider: &'static str,
    pub model_id: &'static str,
    /// Hard context-window cutoff, in tokens.
    pub context_window: u64,
}

impl ModelSelector {
    /// The single model this job runs against.
    pub const ANONYMIZER: ModelSelector = ModelSelector {
        provider: "openai",
        model_id: "gpt-3.5-turbo-16k",
        context_window: 16_384,
    };

    /// A single record estimated above this size can never be batched.
    pub fn overflow_threshold(&self) -> u64 {
        self.context_window / 2
    }

    /// A batch's summed estimate must stay strictly below this.
    ///
    /// The other half of the window is left for the instructions and the
    /// model's own completion.
    pub fn batch_budget(&self) -> u64 {
        self.context_window / 2
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::ANONYMIZER
    }
}
