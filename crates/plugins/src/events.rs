use std::fmt;

use {
    palaver_common::{LlmMessage, MessageChain},
    serde::{Deserialize, Serialize},
};

// ── EventKind ───────────────────────────────────────────────────────────────

/// Pipeline lifecycle events plugins can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PersonMessageReceived,
    GroupMessageReceived,
    PersonCommandSent,
    GroupCommandSent,
    PromptPreProcessing,
    NormalMessageResponded,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl EventKind {
    /// All variants, for iteration.
    pub const ALL: &'static [EventKind] = &[
        Self::PersonMessageReceived,
        Self::GroupMessageReceived,
        Self::PersonCommandSent,
        Self::GroupCommandSent,
        Self::PromptPreProcessing,
        Self::NormalMessageResponded,
    ];
}

// ── PluginEvent ─────────────────────────────────────────────────────────────

/// Typed payload carried with each event emission.
#[derive(Debug, Clone)]
pub enum PluginEvent {
    PersonMessageReceived {
        launcher_id: String,
        sender_id: String,
        message_chain: MessageChain,
    },
    GroupMessageReceived {
        launcher_id: String,
        sender_id: String,
        message_chain: MessageChain,
    },
    PersonCommandSent {
        launcher_id: String,
        sender_id: String,
        command: String,
        params: Vec<String>,
        text_message: String,
        is_admin: bool,
    },
    GroupCommandSent {
        launcher_id: String,
        sender_id: String,
        command: String,
        params: Vec<String>,
        text_message: String,
        is_admin: bool,
    },
    PromptPreProcessing {
        session_key: String,
        prompt: Vec<LlmMessage>,
    },
    NormalMessageResponded {
        launcher_id: String,
        sender_id: String,
        response_text: String,
    },
}

impl PluginEvent {
    /// Returns the [`EventKind`] variant that matches this payload.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PersonMessageReceived { .. } => EventKind::PersonMessageReceived,
            Self::GroupMessageReceived { .. } => EventKind::GroupMessageReceived,
            Self::PersonCommandSent { .. } => EventKind::PersonCommandSent,
            Self::GroupCommandSent { .. } => EventKind::GroupCommandSent,
            Self::PromptPreProcessing { .. } => EventKind::PromptPreProcessing,
            Self::NormalMessageResponded { .. } => EventKind::NormalMessageResponded,
        }
    }
}
