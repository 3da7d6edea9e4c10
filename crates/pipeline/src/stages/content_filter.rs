use {async_trait::async_trait, palaver_common::MessageChain, serde::Deserialize};

use crate::{
    entities::{Query, StageOutput, StageProcessResult},
    error::Result,
    stage::PipelineStage,
    stages::config_section,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct ContentFilterConfig {
    banned_words: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterPhase {
    /// Before the processor: checks the user's inbound message.
    Income,
    /// After the processor: checks the model's reply.
    Output,
}

/// Banned-word scan. The income phase blocks the query outright; the output
/// phase masks matches in the response messages.
pub struct ContentFilterStage {
    phase: FilterPhase,
    banned: Vec<String>,
}

impl ContentFilterStage {
    pub fn pre() -> Self {
        Self {
            phase: FilterPhase::Income,
            banned: Vec::new(),
        }
    }

    pub fn post() -> Self {
        Self {
            phase: FilterPhase::Output,
            banned: Vec::new(),
        }
    }
}

#[async_trait]
impl PipelineStage for ContentFilterStage {
    async fn initialize(&mut self, pipeline_config: &serde_json::Value) -> Result<()> {
        let cfg: ContentFilterConfig = config_section(pipeline_config, "/safety/content-filter");
        self.banned = cfg.banned_words;
        Ok(())
    }

    async fn process(&self, mut query: Query, _stage_name: &str) -> Result<StageOutput> {
        match self.phase {
            FilterPhase::Income => {
                let text = query.message_chain.text();
                if self.banned.iter().any(|w| text.contains(w.as_str())) {
                    let notice = format!("query {} blocked by content filter", query.query_id);
                    return Ok(StageOutput::Single(
                        StageProcessResult::interrupt(query)
                            .with_user_notice(MessageChain::plain(
                                "your message was blocked by the content filter",
                            ))
                            .with_console_notice(notice),
                    ));
                }
            },
            FilterPhase::Output => {
                for message in &mut query.resp_messages {
                    for word in &self.banned {
                        if message.content.contains(word.as_str()) {
                            let mask = "*".repeat(word.chars().count());
                            message.content = message.content.replace(word.as_str(), &mask);
                        }
                    }
                }
            },
        }
        Ok(StageOutput::Single(StageProcessResult::continue_with(query)))
    }
}
