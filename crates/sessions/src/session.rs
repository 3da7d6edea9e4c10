use std::sync::Arc;

use {
    chrono::{DateTime, Utc},
    palaver_common::{LauncherType, LlmMessage},
    tokio::sync::{Mutex, Semaphore},
};

use crate::conversation::Conversation;

/// One conversation identity, keyed by `(launcher_type, launcher_id)`.
///
/// The admission slot is a one-permit semaphore: the scheduler holds a permit
/// for the whole pipeline run, so at most one query per session is in flight.
pub struct Session {
    pub launcher_type: LauncherType,
    pub launcher_id: String,
    pub create_time: DateTime<Utc>,
    admission: Arc<Semaphore>,
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    using_conversation: Option<Conversation>,
    history: Vec<Conversation>,
}

impl Session {
    pub fn new(launcher_type: LauncherType, launcher_id: impl Into<String>) -> Self {
        Self {
            launcher_type,
            launcher_id: launcher_id.into(),
            create_time: Utc::now(),
            admission: Arc::new(Semaphore::new(1)),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Stable key of this session, e.g. `group_1234`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.launcher_type, self.launcher_id)
    }

    /// The admission slot. The scheduler try-acquires an owned permit from it
    /// while holding the pool lock.
    pub fn admission(&self) -> &Arc<Semaphore> {
        &self.admission
    }

    /// True if a query for this session is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.admission.available_permits() == 0
    }

    /// Messages of the active conversation, starting one with the given
    /// prompt and model if none is active.
    pub async fn conversation_messages(
        &self,
        prompt: &[LlmMessage],
        use_model: &str,
    ) -> Vec<LlmMessage> {
        let mut state = self.state.lock().await;
        let conversation = state
            .using_conversation
            .get_or_insert_with(|| Conversation::new(prompt.to_vec(), use_model));
        conversation.messages.clone()
    }

    /// Record a completed exchange into the active conversation. A no-op if
    /// the conversation was reset while the query was in flight.
    pub async fn record_exchange(&self, user: LlmMessage, replies: &[LlmMessage]) {
        let mut state = self.state.lock().await;
        if let Some(conversation) = state.using_conversation.as_mut() {
            conversation.record(user, replies);
        }
    }

    /// Move the active conversation to history.
    pub async fn reset_conversation(&self) {
        let mut state = self.state.lock().await;
        if let Some(conversation) = state.using_conversation.take() {
            state.history.push(conversation);
        }
    }

    /// Number of archived conversations.
    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }
}
