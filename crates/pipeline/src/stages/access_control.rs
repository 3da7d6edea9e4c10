use {async_trait::async_trait, serde::Deserialize};

use crate::{
    entities::{Query, StageOutput, StageProcessResult},
    error::Result,
    stage::PipelineStage,
    stages::config_section,
};

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct AccessControlConfig {
    mode: String,
    blacklist: Vec<String>,
    whitelist: Vec<String>,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            mode: "blacklist".into(),
            blacklist: Vec::new(),
            whitelist: Vec::new(),
        }
    }
}

/// Conversation allow/deny list. Entries are session keys (`person_123`,
/// `group_456`) or type wildcards (`person_*`, `group_*`).
#[derive(Default)]
pub struct AccessControlStage {
    mode: String,
    blacklist: Vec<String>,
    whitelist: Vec<String>,
}

impl AccessControlStage {
    fn listed(list: &[String], key: &str, wildcard: &str) -> bool {
        list.iter().any(|entry| entry == key || entry == wildcard)
    }
}

#[async_trait]
impl PipelineStage for AccessControlStage {
    async fn initialize(&mut self, pipeline_config: &serde_json::Value) -> Result<()> {
        let cfg: AccessControlConfig = config_section(pipeline_config, "/trigger/access-control");
        self.mode = cfg.mode;
        self.blacklist = cfg.blacklist;
        self.whitelist = cfg.whitelist;
        Ok(())
    }

    async fn process(&self, query: Query, _stage_name: &str) -> Result<StageOutput> {
        let key = query.session_key();
        let wildcard = format!("{}_*", query.launcher_type);

        let denied = if self.mode == "whitelist" {
            !Self::listed(&self.whitelist, &key, &wildcard)
        } else {
            Self::listed(&self.blacklist, &key, &wildcard)
        };

        if denied {
            let notice = format!("query {} refused by access control", query.query_id);
            return Ok(StageOutput::Single(
                StageProcessResult::interrupt(query).with_console_notice(notice),
            ));
        }
        Ok(StageOutput::Single(StageProcessResult::continue_with(query)))
    }
}
