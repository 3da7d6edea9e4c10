use std::sync::Arc;

use {
    async_trait::async_trait,
    palaver_common::{MessageChain, Role},
    palaver_plugins::PluginEvent,
};

use crate::{
    entities::{Query, StageOutput, StageProcessResult},
    error::Result,
    stage::{PipelineStage, StageDeps},
};

/// Wraps the newest response message into an outbound message chain. For
/// model replies, plugins get a final veto via `NormalMessageResponded`.
pub struct ResponseWrapperStage {
    deps: Arc<StageDeps>,
}

impl ResponseWrapperStage {
    pub fn new(deps: Arc<StageDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl PipelineStage for ResponseWrapperStage {
    async fn process(&self, mut query: Query, _stage_name: &str) -> Result<StageOutput> {
        let Some(message) = query.resp_messages.last().cloned() else {
            return Ok(StageOutput::Single(
                StageProcessResult::interrupt(query).with_debug_notice("no response to wrap"),
            ));
        };

        if message.role == Role::Assistant {
            let ctx = self
                .deps
                .plugins
                .emit_event(PluginEvent::NormalMessageResponded {
                    launcher_id: query.launcher_id.clone(),
                    sender_id: query.sender_id.clone(),
                    response_text: message.content.clone(),
                })
                .await;
            if ctx.is_prevented_default() {
                return Ok(StageOutput::Single(
                    StageProcessResult::interrupt(query)
                        .with_debug_notice("response suppressed by plugin"),
                ));
            }
        }

        query
            .resp_message_chains
            .push(MessageChain::plain(message.content));
        Ok(StageOutput::Single(StageProcessResult::continue_with(query)))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        async_trait::async_trait,
        palaver_common::LlmMessage,
        palaver_config::PalaverConfig,
        palaver_plugins::{EventContext, EventHandler, EventKind, PluginRouter},
    };

    use {
        super::*,
        crate::{
            entities::ResultType,
            testutil::{RecordingAdapter, make_deps, make_deps_with, person_query},
        },
    };

    fn single(output: StageOutput) -> StageProcessResult {
        match output {
            StageOutput::Single(result) => result,
            StageOutput::Stream(_) => panic!("expected single result"),
        }
    }

    #[tokio::test]
    async fn wraps_the_newest_response() {
        let stage = ResponseWrapperStage::new(make_deps());
        let mut query = person_query(1, "u1", "hi", RecordingAdapter::new());
        query.resp_messages.push(LlmMessage::assistant("first"));
        query.resp_messages.push(LlmMessage::assistant("second"));

        let result = single(stage.process(query, "response-wrapper").await.unwrap());
        assert_eq!(result.result_type, ResultType::Continue);
        let chains = &result.new_query.resp_message_chains;
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].text(), "second");
    }

    #[tokio::test]
    async fn no_response_interrupts() {
        let stage = ResponseWrapperStage::new(make_deps());
        let query = person_query(1, "u1", "hi", RecordingAdapter::new());
        let result = single(stage.process(query, "response-wrapper").await.unwrap());
        assert_eq!(result.result_type, ResultType::Interrupt);
    }

    #[tokio::test]
    async fn plugin_may_suppress_a_model_reply() {
        struct Suppressor;

        #[async_trait]
        impl EventHandler for Suppressor {
            fn name(&self) -> &str {
                "suppressor"
            }

            fn events(&self) -> &[EventKind] {
                &[EventKind::NormalMessageResponded]
            }

            async fn handle(&self, ctx: &mut EventContext) -> anyhow::Result<()> {
                ctx.prevent_default();
                Ok(())
            }
        }

        let mut router = PluginRouter::new();
        router.register(Arc::new(Suppressor));
        let stage = ResponseWrapperStage::new(make_deps_with(PalaverConfig::default(), router));

        let mut query = person_query(1, "u1", "hi", RecordingAdapter::new());
        query.resp_messages.push(LlmMessage::assistant("secret"));
        let result = single(stage.process(query, "response-wrapper").await.unwrap());
        assert_eq!(result.result_type, ResultType::Interrupt);

        // Command output is not subject to the veto.
        let mut query = person_query(2, "u1", "hi", RecordingAdapter::new());
        query.resp_messages.push(LlmMessage::command("pong"));
        let result = single(stage.process(query, "response-wrapper").await.unwrap());
        assert_eq!(result.result_type, ResultType::Continue);
    }
}
