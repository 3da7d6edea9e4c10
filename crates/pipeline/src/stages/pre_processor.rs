use std::sync::Arc;

use {
    async_trait::async_trait,
    palaver_common::LlmMessage,
    palaver_plugins::PluginEvent,
    serde::Deserialize,
};

use crate::{
    entities::{Query, StageOutput, StageProcessResult},
    error::Result,
    stage::{PipelineStage, StageDeps},
    stages::config_section,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct AiConfig {
    model: String,
    prompt: String,
    /// Conversation rounds kept when copying history into the query.
    max_round: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: "echo".into(),
            prompt: String::new(),
            max_round: 10,
        }
    }
}

/// Resolves the query's session, conversation history, model, and enabled
/// functions, and builds the user message the processor will send.
pub struct PreProcessorStage {
    deps: Arc<StageDeps>,
    ai: AiConfig,
}

impl PreProcessorStage {
    pub fn new(deps: Arc<StageDeps>) -> Self {
        Self {
            deps,
            ai: AiConfig::default(),
        }
    }
}

#[async_trait]
impl PipelineStage for PreProcessorStage {
    async fn initialize(&mut self, pipeline_config: &serde_json::Value) -> Result<()> {
        self.ai = config_section(pipeline_config, "/ai");
        Ok(())
    }

    async fn process(&self, mut query: Query, _stage_name: &str) -> Result<StageOutput> {
        let Some(model) = self.deps.providers.get_model(&self.ai.model) else {
            let notice = format!("model {} is not registered", self.ai.model);
            return Ok(StageOutput::Single(
                StageProcessResult::interrupt(query).with_error_notice(notice),
            ));
        };

        let session = self
            .deps
            .sessions
            .get_or_create(query.launcher_type, &query.launcher_id);

        let prompt = if self.ai.prompt.is_empty() {
            Vec::new()
        } else {
            vec![LlmMessage::system(self.ai.prompt.clone())]
        };
        let history = session.conversation_messages(&prompt, &model.name).await;
        let keep = self.ai.max_round.saturating_mul(2);
        let start = history.len().saturating_sub(keep);

        query.session = Some(Arc::clone(&session));
        query.prompt = prompt;
        query.messages = history[start..].to_vec();
        query.user_message = Some(LlmMessage::user(query.message_chain.text()));
        query.use_funcs = if model.supports_functions {
            self.deps.providers.enabled_functions()
        } else {
            Vec::new()
        };
        query.use_model = Some(model);

        let ctx = self
            .deps
            .plugins
            .emit_event(PluginEvent::PromptPreProcessing {
                session_key: query.session_key(),
                prompt: query.prompt.clone(),
            })
            .await;
        if let Some(alter) = ctx.alter {
            query.prompt = vec![LlmMessage::system(alter)];
        }

        Ok(StageOutput::Single(StageProcessResult::continue_with(query)))
    }
}
