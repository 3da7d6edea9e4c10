use {anyhow::Result, async_trait::async_trait, palaver_common::{LauncherType, MessageChain}};

use crate::events::MessageEvent;

/// One connected messaging platform. Each platform (or each account on a
/// platform) implements this to receive replies from the pipeline.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Adapter identifier (e.g. "telegram", "console").
    fn id(&self) -> &str;

    /// The bot's own account id on the platform, used for at-mention
    /// detection in group messages.
    fn account_id(&self) -> &str;

    /// Reply to the conversation an event originated from, optionally
    /// quoting the original message.
    async fn reply_message(
        &self,
        source: &MessageEvent,
        message: &MessageChain,
        quote_origin: bool,
    ) -> Result<()>;

    /// Send a message to an arbitrary target.
    async fn send_message(
        &self,
        target_type: LauncherType,
        target_id: &str,
        message: &MessageChain,
    ) -> Result<()>;
}
