use std::sync::Arc;

use {async_trait::async_trait, tracing::debug};

use crate::{
    entities::{Query, StageOutput},
    error::Result,
    stage::{PipelineStage, StageDeps},
    stages::{chat_handler::ChatHandler, command_handler::CommandHandler},
};

/// Routes each query to the command handler (prefixed messages) or the chat
/// handler (everything else). Both handlers fork: every reply they produce
/// drives the remainder of the chain independently.
pub struct ProcessorStage {
    deps: Arc<StageDeps>,
    chat: ChatHandler,
    command: CommandHandler,
}

impl ProcessorStage {
    pub fn new(deps: Arc<StageDeps>) -> Self {
        Self {
            chat: ChatHandler::new(Arc::clone(&deps)),
            command: CommandHandler::new(Arc::clone(&deps)),
            deps,
        }
    }
}

#[async_trait]
impl PipelineStage for ProcessorStage {
    async fn process(&self, query: Query, _stage_name: &str) -> Result<StageOutput> {
        let prefix = &self.deps.app_config.command.prefix;
        let text = query.message_chain.text();
        let is_command = !prefix.is_empty() && text.trim_start().starts_with(prefix.as_str());

        debug!(query_id = query.query_id, is_command, "routing query");
        if is_command {
            self.command.handle(query).await
        } else {
            self.chat.handle(query).await
        }
    }
}
