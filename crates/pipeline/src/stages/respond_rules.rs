use {
    async_trait::async_trait,
    palaver_common::{LauncherType, MessageChain},
    regex::Regex,
    serde::Deserialize,
};

use crate::{
    entities::{Query, StageOutput, StageProcessResult},
    error::Result,
    stage::PipelineStage,
    stages::config_section,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct RespondRulesConfig {
    at_bot: bool,
    prefix: Vec<String>,
    regexp: Vec<String>,
    random: f64,
}

/// Gate for group messages: only those matching a respond rule (at-mention,
/// prefix, regex, or random sampling) enter the rest of the chain. Direct
/// messages always pass.
#[derive(Default)]
pub struct RespondRulesStage {
    at_bot: bool,
    prefix: Vec<String>,
    patterns: Vec<Regex>,
    random: f64,
}

#[async_trait]
impl PipelineStage for RespondRulesStage {
    async fn initialize(&mut self, pipeline_config: &serde_json::Value) -> Result<()> {
        let cfg: RespondRulesConfig = config_section(pipeline_config, "/trigger/group-respond-rules");
        let mut patterns = Vec::with_capacity(cfg.regexp.len());
        for raw in &cfg.regexp {
            let pattern = Regex::new(raw)
                .map_err(|e| anyhow::anyhow!("invalid respond-rule regex {raw:?}: {e}"))?;
            patterns.push(pattern);
        }
        self.at_bot = cfg.at_bot;
        self.prefix = cfg.prefix;
        self.patterns = patterns;
        self.random = cfg.random;
        Ok(())
    }

    async fn process(&self, mut query: Query, _stage_name: &str) -> Result<StageOutput> {
        if query.launcher_type != LauncherType::Group {
            return Ok(StageOutput::Single(StageProcessResult::continue_with(query)));
        }

        let text = query.message_chain.text();
        let trimmed = text.trim().to_string();

        if self.at_bot && query.message_chain.mentions(query.adapter.account_id()) {
            // Matched by mention: strip it so later stages see the bare text.
            query.message_chain = query.message_chain.without_mentions();
            return Ok(StageOutput::Single(StageProcessResult::continue_with(query)));
        }

        if let Some(prefix) = self.prefix.iter().find(|p| trimmed.starts_with(p.as_str())) {
            let rest = trimmed[prefix.len()..].to_string();
            query.message_chain = MessageChain::plain(rest);
            return Ok(StageOutput::Single(StageProcessResult::continue_with(query)));
        }

        if self.patterns.iter().any(|p| p.is_match(&text)) {
            return Ok(StageOutput::Single(StageProcessResult::continue_with(query)));
        }

        if self.random > 0.0 && rand::random::<f64>() < self.random {
            return Ok(StageOutput::Single(StageProcessResult::continue_with(query)));
        }

        Ok(StageOutput::Single(
            StageProcessResult::interrupt(query)
                .with_debug_notice("group message matched no respond rule"),
        ))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {palaver_common::MessageElement, serde_json::json};

    use {
        super::*,
        crate::{
            entities::ResultType,
            testutil::{RecordingAdapter, group_query, person_query},
        },
    };

    async fn stage(config: serde_json::Value) -> RespondRulesStage {
        let mut stage = RespondRulesStage::default();
        stage
            .initialize(&json!({"trigger": {"group-respond-rules": config}}))
            .await
            .unwrap();
        stage
    }

    fn single(output: StageOutput) -> StageProcessResult {
        match output {
            StageOutput::Single(result) => result,
            StageOutput::Stream(_) => panic!("expected single result"),
        }
    }

    #[tokio::test]
    async fn person_messages_always_pass() {
        let stage = stage(json!({"at-bot": true})).await;
        let query = person_query(1, "u1", "hello", RecordingAdapter::new());
        let result = single(stage.process(query, "respond-rules").await.unwrap());
        assert_eq!(result.result_type, ResultType::Continue);
    }

    #[tokio::test]
    async fn unmatched_group_message_interrupts() {
        let stage = stage(json!({"at-bot": true})).await;
        let query = group_query(
            1,
            "g1",
            "u1",
            MessageChain::plain("just chatting"),
            RecordingAdapter::new(),
        );
        let result = single(stage.process(query, "respond-rules").await.unwrap());
        assert_eq!(result.result_type, ResultType::Interrupt);
    }

    #[tokio::test]
    async fn mention_matches_and_is_stripped() {
        let stage = stage(json!({"at-bot": true})).await;
        let chain = MessageChain::new(vec![
            MessageElement::At {
                target: "bot-account".into(),
            },
            MessageElement::Plain { text: "ping".into() },
        ]);
        let query = group_query(1, "g1", "u1", chain, RecordingAdapter::new());
        let result = single(stage.process(query, "respond-rules").await.unwrap());
        assert_eq!(result.result_type, ResultType::Continue);
        assert!(!result.new_query.message_chain.mentions("bot-account"));
        assert_eq!(result.new_query.message_chain.text(), "ping");
    }

    #[tokio::test]
    async fn prefix_matches_and_is_stripped() {
        let stage = stage(json!({"prefix": ["bot:"]})).await;
        let query = group_query(
            1,
            "g1",
            "u1",
            MessageChain::plain("bot: what time is it"),
            RecordingAdapter::new(),
        );
        let result = single(stage.process(query, "respond-rules").await.unwrap());
        assert_eq!(result.result_type, ResultType::Continue);
        assert_eq!(result.new_query.message_chain.text(), " what time is it");
    }

    #[tokio::test]
    async fn regex_matches_without_rewriting() {
        let stage = stage(json!({"regexp": ["(?i)weather"]})).await;
        let query = group_query(
            1,
            "g1",
            "u1",
            MessageChain::plain("how is the Weather today"),
            RecordingAdapter::new(),
        );
        let result = single(stage.process(query, "respond-rules").await.unwrap());
        assert_eq!(result.result_type, ResultType::Continue);
        assert_eq!(
            result.new_query.message_chain.text(),
            "how is the Weather today"
        );
    }

    #[tokio::test]
    async fn invalid_regex_fails_initialize() {
        let mut stage = RespondRulesStage::default();
        let err = stage
            .initialize(&json!({"trigger": {"group-respond-rules": {"regexp": ["("]}}}))
            .await;
        assert!(err.is_err());
    }
}
