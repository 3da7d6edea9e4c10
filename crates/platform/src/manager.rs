use std::sync::Arc;

use {tokio::sync::RwLock, tracing::info};

use crate::adapter::PlatformAdapter;

/// A bot binding: one adapter account routed to one pipeline.
#[derive(Clone)]
pub struct Bot {
    pub id: String,
    pub name: String,
    pub adapter: Arc<dyn PlatformAdapter>,
    pub use_pipeline_id: String,
}

/// Registry of configured bots. The controller resolves the bot at dispatch
/// time rather than capturing it at admission, so a reconfigured bot takes
/// effect for queries still waiting in the pool.
#[derive(Default)]
pub struct PlatformManager {
    bots: RwLock<Vec<Bot>>,
}

impl PlatformManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_bot(&self, bot: Bot) {
        info!(bot = %bot.id, pipeline = %bot.use_pipeline_id, "registered bot");
        self.bots.write().await.push(bot);
    }

    pub async fn get_bot_by_id(&self, id: &str) -> Option<Bot> {
        self.bots.read().await.iter().find(|b| b.id == id).cloned()
    }

    pub async fn remove_bot(&self, id: &str) {
        self.bots.write().await.retain(|b| b.id != id);
    }
}
