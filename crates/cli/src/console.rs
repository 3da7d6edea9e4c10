//! Console platform adapter: chat with the bot from the terminal.

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    palaver_common::{LauncherType, MessageChain},
    palaver_pipeline::QueryPool,
    palaver_platform::{MessageEvent, PlatformAdapter},
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::debug,
};

pub const CONSOLE_BOT_ID: &str = "console";
const CONSOLE_USER: &str = "console-user";

/// Adapter that prints replies to stdout.
pub struct ConsoleAdapter;

#[async_trait]
impl PlatformAdapter for ConsoleAdapter {
    fn id(&self) -> &str {
        "console"
    }

    fn account_id(&self) -> &str {
        "palaver"
    }

    async fn reply_message(
        &self,
        _source: &MessageEvent,
        message: &MessageChain,
        _quote_origin: bool,
    ) -> Result<()> {
        println!("palaver> {}", message.text());
        Ok(())
    }

    async fn send_message(
        &self,
        _target_type: LauncherType,
        target_id: &str,
        message: &MessageChain,
    ) -> Result<()> {
        println!("palaver ({target_id})> {}", message.text());
        Ok(())
    }
}

/// Read stdin lines and admit each as a person query.
pub async fn input_loop(pool: Arc<QueryPool>, adapter: Arc<ConsoleAdapter>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let chain = MessageChain::plain(text);
        let query = pool
            .add_query(
                LauncherType::Person,
                CONSOLE_USER,
                CONSOLE_USER,
                MessageEvent::Person {
                    sender_id: CONSOLE_USER.into(),
                    message_chain: chain.clone(),
                },
                chain,
                Arc::clone(&adapter) as Arc<dyn PlatformAdapter>,
                CONSOLE_BOT_ID,
            )
            .await;
        debug!(query_id = query.query_id, "admitted console message");
    }
    Ok(())
}
