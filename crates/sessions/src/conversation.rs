use {
    chrono::{DateTime, Utc},
    palaver_common::LlmMessage,
};

/// One conversation thread with a model. A session has at most one active
/// conversation and keeps finished ones as history.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub prompt: Vec<LlmMessage>,
    pub messages: Vec<LlmMessage>,
    pub use_model: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Conversation {
    pub fn new(prompt: Vec<LlmMessage>, use_model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            prompt,
            messages: Vec::new(),
            use_model: use_model.into(),
            create_time: now,
            update_time: now,
        }
    }

    /// Append an exchange (user message plus replies) to the thread.
    pub fn record(&mut self, user: LlmMessage, replies: &[LlmMessage]) {
        self.messages.push(user);
        self.messages.extend_from_slice(replies);
        self.update_time = Utc::now();
    }
}
