//! Shared helpers for this crate's unit tests.

use std::sync::{Arc, Mutex};

use {
    anyhow::Result,
    async_trait::async_trait,
    palaver_common::{LauncherType, MessageChain},
    palaver_config::PalaverConfig,
    palaver_platform::{MessageEvent, PlatformAdapter},
    palaver_plugins::PluginRouter,
    palaver_providers::{EchoRequester, ModelInfo, ProviderManager},
    palaver_sessions::SessionManager,
};

use crate::{entities::Query, stage::StageDeps};

pub(crate) fn make_deps() -> Arc<StageDeps> {
    make_deps_with(PalaverConfig::default(), PluginRouter::new())
}

pub(crate) fn make_deps_with(app_config: PalaverConfig, plugins: PluginRouter) -> Arc<StageDeps> {
    let mut providers = ProviderManager::new(Arc::new(EchoRequester));
    providers.register_model(ModelInfo {
        name: "echo".into(),
        provider: "builtin".into(),
        supports_functions: false,
    });
    Arc::new(StageDeps {
        app_config: Arc::new(app_config),
        sessions: Arc::new(SessionManager::new()),
        plugins: Arc::new(plugins),
        providers: Arc::new(providers),
    })
}

/// Adapter that records every outbound reply.
pub(crate) struct RecordingAdapter {
    pub sent: Mutex<Vec<MessageChain>>,
}

impl RecordingAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|m| m.text())
            .collect()
    }
}

#[async_trait]
impl PlatformAdapter for RecordingAdapter {
    fn id(&self) -> &str {
        "recording"
    }

    fn account_id(&self) -> &str {
        "bot-account"
    }

    async fn reply_message(
        &self,
        _source: &MessageEvent,
        message: &MessageChain,
        _quote_origin: bool,
    ) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
        Ok(())
    }

    async fn send_message(
        &self,
        _target_type: LauncherType,
        _target_id: &str,
        message: &MessageChain,
    ) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
        Ok(())
    }
}

pub(crate) fn person_query(
    query_id: u64,
    sender: &str,
    text: &str,
    adapter: Arc<dyn PlatformAdapter>,
) -> Query {
    let chain = MessageChain::plain(text);
    Query::new(
        query_id,
        LauncherType::Person,
        sender,
        sender,
        MessageEvent::Person {
            sender_id: sender.into(),
            message_chain: chain.clone(),
        },
        chain,
        adapter,
        "bot-1",
    )
}

pub(crate) fn group_query(
    query_id: u64,
    group: &str,
    sender: &str,
    chain: MessageChain,
    adapter: Arc<dyn PlatformAdapter>,
) -> Query {
    Query::new(
        query_id,
        LauncherType::Group,
        group,
        sender,
        MessageEvent::Group {
            group_id: group.into(),
            sender_id: sender.into(),
            message_chain: chain.clone(),
        },
        chain,
        adapter,
        "bot-1",
    )
}
