use {async_stream::stream, async_trait::async_trait, futures::StreamExt, palaver_common::MessageChain, serde::Deserialize};

use crate::{
    entities::{Query, StageOutput, StageProcessResult},
    error::Result,
    stage::PipelineStage,
    stages::config_section,
};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct LongTextConfig {
    /// Responses over this many characters are split.
    threshold: usize,
}

impl Default for LongTextConfig {
    fn default() -> Self {
        Self { threshold: 1500 }
    }
}

/// Splits an over-threshold response into several messages, each of which
/// re-enters the later stages independently (a fork).
pub struct LongTextStage {
    threshold: usize,
}

impl Default for LongTextStage {
    fn default() -> Self {
        Self {
            threshold: LongTextConfig::default().threshold,
        }
    }
}

fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

#[async_trait]
impl PipelineStage for LongTextStage {
    async fn initialize(&mut self, pipeline_config: &serde_json::Value) -> Result<()> {
        let cfg: LongTextConfig = config_section(pipeline_config, "/output/long-text-processing");
        self.threshold = cfg.threshold.max(1);
        Ok(())
    }

    async fn process(&self, query: Query, _stage_name: &str) -> Result<StageOutput> {
        let Some(chain) = query.resp_message_chains.last() else {
            return Ok(StageOutput::Single(StageProcessResult::continue_with(query)));
        };

        let text = chain.text();
        if text.chars().count() <= self.threshold {
            return Ok(StageOutput::Single(StageProcessResult::continue_with(query)));
        }

        let chunks = split_chunks(&text, self.threshold);
        let stream = stream! {
            let query = query;
            for chunk in chunks {
                let mut forked = query.clone();
                if let Some(last) = forked.resp_message_chains.last_mut() {
                    *last = MessageChain::plain(chunk);
                }
                yield Ok(StageProcessResult::continue_with(forked));
            }
        };
        Ok(StageOutput::Stream(stream.boxed()))
    }
}
