//! Config schema types: the application config file and persisted pipeline
//! records.

use serde::{Deserialize, Serialize};

/// Root application configuration (`palaver.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PalaverConfig {
    pub concurrency: ConcurrencyConfig,
    /// Conversation keys (`person_<id>` / `group_<id>`) granted admin
    /// privilege in command handling.
    pub admins: Vec<String>,
    pub command: CommandConfig,
}

/// Concurrency limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Maximum pipeline executions in flight at once, across all sessions.
    pub pipeline: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { pipeline: 8 }
    }
}

/// Command routing options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Messages starting with this prefix are routed to the command handler.
    pub prefix: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self { prefix: "!".into() }
    }
}

/// One persisted pipeline: an ordered stage list plus the nested
/// configuration blob that stage `initialize` consumes verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub stages: Vec<String>,
    #[serde(default)]
    pub config: serde_json::Value,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = PalaverConfig::default();
        assert_eq!(cfg.concurrency.pipeline, 8);
        assert_eq!(cfg.command.prefix, "!");
        assert!(cfg.admins.is_empty());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: PalaverConfig = toml::from_str(
            r#"
            admins = ["person_1"]

            [concurrency]
            pipeline = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.concurrency.pipeline, 2);
        assert_eq!(cfg.admins, vec!["person_1"]);
        assert_eq!(cfg.command.prefix, "!");
    }

    #[test]
    fn pipeline_record_parses() {
        let record: PipelineRecord = serde_json::from_str(
            r#"{
                "id": "p-1",
                "name": "default",
                "stages": ["pre-processor", "processor"],
                "config": {"ai": {"model": "echo"}}
            }"#,
        )
        .unwrap();
        assert_eq!(record.stages.len(), 2);
        assert_eq!(record.config["ai"]["model"], "echo");
        assert!(record.description.is_empty());
    }
}
