use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use {async_trait::async_trait, serde::Deserialize, tokio::sync::Mutex};

use crate::{
    entities::{Query, StageOutput, StageProcessResult},
    error::Result,
    stage::PipelineStage,
    stages::config_section,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct RateLimitConfig {
    /// Window length in seconds.
    window_length: u64,
    /// Queries allowed per window, per conversation.
    limitation: u32,
    /// `drop` interrupts over-limit queries; `wait` suspends until the
    /// window rolls over.
    strategy: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_length: 60,
            limitation: 60,
            strategy: "drop".into(),
        }
    }
}

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window per-conversation rate gate.
#[derive(Default)]
pub struct RateLimitStage {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
}

#[async_trait]
impl PipelineStage for RateLimitStage {
    async fn initialize(&mut self, pipeline_config: &serde_json::Value) -> Result<()> {
        self.config = config_section(pipeline_config, "/safety/rate-limit");
        Ok(())
    }

    async fn process(&self, query: Query, _stage_name: &str) -> Result<StageOutput> {
        let key = query.session_key();
        let window_length = Duration::from_secs(self.config.window_length);

        loop {
            let wait = {
                let mut windows = self.windows.lock().await;
                let now = Instant::now();
                let window = windows.entry(key.clone()).or_insert(Window {
                    started: now,
                    count: 0,
                });
                if now.duration_since(window.started) >= window_length {
                    window.started = now;
                    window.count = 0;
                }

                if window.count < self.config.limitation {
                    window.count += 1;
                    return Ok(StageOutput::Single(StageProcessResult::continue_with(query)));
                }
                if self.config.strategy == "drop" {
                    let notice =
                        format!("query {} dropped by rate limit for {key}", query.query_id);
                    return Ok(StageOutput::Single(
                        StageProcessResult::interrupt(query).with_console_notice(notice),
                    ));
                }
                window_length.saturating_sub(now.duration_since(window.started))
            };
            tokio::time::sleep(wait.max(Duration::from_millis(10))).await;
        }
    }
}
