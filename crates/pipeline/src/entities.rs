//! The query data model: one inbound request's full processing state, and
//! the result shape stages hand back to the executor.

use std::{fmt, sync::Arc};

use {
    futures::stream::BoxStream,
    palaver_common::{LauncherType, LlmMessage, MessageChain},
    palaver_platform::{MessageEvent, PlatformAdapter},
    palaver_providers::{FunctionSchema, ModelInfo},
    palaver_sessions::Session,
};

// ── Query ───────────────────────────────────────────────────────────────────

/// One unit of work: an inbound event plus all state accumulated while it
/// traverses the stage chain.
///
/// A query is owned by exactly one pipeline run. Forking stages yield clones,
/// each of which exclusively drives its own sub-chain; forks are strictly
/// nested within the run's task, never concurrent.
#[derive(Clone)]
pub struct Query {
    /// Assigned at pool-admission time, monotonically increasing.
    pub query_id: u64,
    pub launcher_type: LauncherType,
    pub launcher_id: String,
    pub sender_id: String,
    pub message_event: MessageEvent,
    pub message_chain: MessageChain,
    pub adapter: Arc<dyn PlatformAdapter>,
    pub bot_id: String,

    // State below is populated by stages as the query moves down the chain.
    pub pipeline_config: serde_json::Value,
    pub session: Option<Arc<Session>>,
    pub prompt: Vec<LlmMessage>,
    pub messages: Vec<LlmMessage>,
    pub user_message: Option<LlmMessage>,
    pub use_model: Option<ModelInfo>,
    pub use_funcs: Vec<FunctionSchema>,
    pub resp_messages: Vec<LlmMessage>,
    pub resp_message_chains: Vec<MessageChain>,
    /// Name of the stage currently executing, for error attribution.
    pub current_stage: Option<String>,
}

impl Query {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        query_id: u64,
        launcher_type: LauncherType,
        launcher_id: impl Into<String>,
        sender_id: impl Into<String>,
        message_event: MessageEvent,
        message_chain: MessageChain,
        adapter: Arc<dyn PlatformAdapter>,
        bot_id: impl Into<String>,
    ) -> Self {
        Self {
            query_id,
            launcher_type,
            launcher_id: launcher_id.into(),
            sender_id: sender_id.into(),
            message_event,
            message_chain,
            adapter,
            bot_id: bot_id.into(),
            pipeline_config: serde_json::Value::Null,
            session: None,
            prompt: Vec::new(),
            messages: Vec::new(),
            user_message: None,
            use_model: None,
            use_funcs: Vec::new(),
            resp_messages: Vec::new(),
            resp_message_chains: Vec::new(),
            current_stage: None,
        }
    }

    /// Conversation key of this query, e.g. `group_1234`.
    pub fn session_key(&self) -> String {
        format!("{}_{}", self.launcher_type, self.launcher_id)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("query_id", &self.query_id)
            .field("launcher_type", &self.launcher_type)
            .field("launcher_id", &self.launcher_id)
            .field("sender_id", &self.sender_id)
            .field("current_stage", &self.current_stage)
            .finish_non_exhaustive()
    }
}

// ── Stage results ───────────────────────────────────────────────────────────

/// Whether the chain proceeds past a stage result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    /// Proceed to the next stage with `new_query`.
    Continue,
    /// Stop this execution path.
    Interrupt,
}

/// The outcome of one stage execution (or one element of a fork).
///
/// Besides the continuation decision, a result carries independent notice
/// side-channels the executor dispatches to their own sinks.
#[derive(Debug, Clone)]
pub struct StageProcessResult {
    pub result_type: ResultType,
    pub new_query: Query,
    /// User-facing reply, sent through the query's origin adapter.
    pub user_notice: Option<MessageChain>,
    pub debug_notice: Option<String>,
    pub console_notice: Option<String>,
    pub error_notice: Option<String>,
}

impl StageProcessResult {
    pub fn continue_with(new_query: Query) -> Self {
        Self {
            result_type: ResultType::Continue,
            new_query,
            user_notice: None,
            debug_notice: None,
            console_notice: None,
            error_notice: None,
        }
    }

    pub fn interrupt(new_query: Query) -> Self {
        Self {
            result_type: ResultType::Interrupt,
            ..Self::continue_with(new_query)
        }
    }

    pub fn with_user_notice(mut self, notice: MessageChain) -> Self {
        self.user_notice = Some(notice);
        self
    }

    pub fn with_debug_notice(mut self, notice: impl Into<String>) -> Self {
        self.debug_notice = Some(notice.into());
        self
    }

    pub fn with_console_notice(mut self, notice: impl Into<String>) -> Self {
        self.console_notice = Some(notice.into());
        self
    }

    pub fn with_error_notice(mut self, notice: impl Into<String>) -> Self {
        self.error_notice = Some(notice.into());
        self
    }
}

/// What a stage hands back: one result, or a lazy finite sequence of results
/// (a fork). Each `Continue` element of a fork drives the remainder of the
/// chain to completion before the next element is produced.
pub enum StageOutput {
    Single(StageProcessResult),
    Stream(BoxStream<'static, crate::error::Result<StageProcessResult>>),
}
