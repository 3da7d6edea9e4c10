use std::time::Duration;

use {
    async_trait::async_trait,
    palaver_common::MessageElement,
    rand::Rng,
    serde::Deserialize,
    tracing::debug,
};

use crate::{
    entities::{Query, StageOutput, StageProcessResult},
    error::Result,
    executor::OutputMisc,
    stage::PipelineStage,
    stages::config_section,
};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct ForceDelayConfig {
    /// Artificial delay range in seconds before replying.
    min: u64,
    max: u64,
}

/// Delivers the wrapped response through the originating adapter, after an
/// optional artificial delay.
#[derive(Default)]
pub struct SendResponseStage {
    delay: ForceDelayConfig,
    misc: OutputMisc,
}

#[async_trait]
impl PipelineStage for SendResponseStage {
    async fn initialize(&mut self, pipeline_config: &serde_json::Value) -> Result<()> {
        self.delay = config_section(pipeline_config, "/output/force-delay");
        self.misc = OutputMisc::from_pipeline_config(pipeline_config);
        Ok(())
    }

    async fn process(&self, query: Query, _stage_name: &str) -> Result<StageOutput> {
        let Some(chain) = query.resp_message_chains.last() else {
            return Ok(StageOutput::Single(
                StageProcessResult::interrupt(query).with_debug_notice("no response to send"),
            ));
        };

        let mut message = chain.clone();
        if self.misc.at_sender && query.message_event.is_group() {
            message.prepend(MessageElement::At {
                target: query.sender_id.clone(),
            });
        }

        let secs = if self.delay.max > self.delay.min {
            rand::rng().random_range(self.delay.min..=self.delay.max)
        } else {
            self.delay.min
        };
        if secs > 0 {
            debug!(query_id = query.query_id, secs, "delaying response");
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }

        query
            .adapter
            .reply_message(&query.message_event, &message, self.misc.quote_origin)
            .await?;
        Ok(StageOutput::Single(StageProcessResult::continue_with(query)))
    }
}
