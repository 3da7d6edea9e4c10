use std::sync::Arc;

use {
    async_stream::stream,
    futures::StreamExt,
    palaver_common::{LauncherType, LlmMessage, MessageChain},
    palaver_plugins::PluginEvent,
    tracing::info,
};

use crate::{
    entities::{Query, StageOutput, StageProcessResult},
    error::Result,
    stage::StageDeps,
};

enum CommandOutput {
    Text(String),
    Error(String),
}

/// Parses and executes prefixed command messages. Each command output is
/// yielded as its own continuation, the same fork contract the chat handler
/// uses, so multi-output commands produce one reply each.
pub struct CommandHandler {
    deps: Arc<StageDeps>,
}

impl CommandHandler {
    pub fn new(deps: Arc<StageDeps>) -> Self {
        Self { deps }
    }

    pub async fn handle(&self, query: Query) -> Result<StageOutput> {
        let prefix = self.deps.app_config.command.prefix.clone();
        let text = query.message_chain.text().trim().to_string();
        let command_text = text
            .strip_prefix(prefix.as_str())
            .unwrap_or(text.as_str())
            .to_string();

        let is_admin = self.deps.app_config.admins.contains(&query.session_key());
        let mut parts = command_text.split_whitespace();
        let command = parts.next().unwrap_or_default().to_string();
        let params: Vec<String> = parts.map(str::to_string).collect();

        let event = match query.launcher_type {
            LauncherType::Person => PluginEvent::PersonCommandSent {
                launcher_id: query.launcher_id.clone(),
                sender_id: query.sender_id.clone(),
                command: command.clone(),
                params: params.clone(),
                text_message: text.clone(),
                is_admin,
            },
            LauncherType::Group => PluginEvent::GroupCommandSent {
                launcher_id: query.launcher_id.clone(),
                sender_id: query.sender_id.clone(),
                command: command.clone(),
                params: params.clone(),
                text_message: text.clone(),
                is_admin,
            },
        };
        let ctx = self.deps.plugins.emit_event(event).await;

        let deps = Arc::clone(&self.deps);
        let stream = stream! {
            let mut query = query;

            if ctx.is_prevented_default() {
                // A plugin took the command over; relay its reply if any.
                match ctx.reply {
                    Some(reply) => {
                        query.resp_messages.push(LlmMessage::command(reply.text()));
                        yield Ok(StageProcessResult::continue_with(query.clone()));
                    },
                    None => yield Ok(StageProcessResult::interrupt(query.clone())),
                }
                return;
            }
            if let Some(alter) = ctx.alter {
                query.message_chain = MessageChain::plain(alter);
            }

            for output in run_builtin(&deps, &command, &params, is_admin, &query).await {
                match output {
                    CommandOutput::Text(content) => {
                        query.resp_messages.push(LlmMessage::command(content));
                        yield Ok(StageProcessResult::continue_with(query.clone()));
                    },
                    CommandOutput::Error(message) => {
                        info!(query_id = query.query_id, command = %command, "command failed: {message}");
                        query.resp_messages.push(LlmMessage::command(format!("error: {message}")));
                        yield Ok(StageProcessResult::continue_with(query.clone()));
                    },
                }
            }
        };
        Ok(StageOutput::Stream(stream.boxed()))
    }
}

async fn run_builtin(
    deps: &Arc<StageDeps>,
    command: &str,
    params: &[String],
    is_admin: bool,
    query: &Query,
) -> Vec<CommandOutput> {
    match command {
        "help" => vec![CommandOutput::Text(
            "available commands: help, model, reset, version".into(),
        )],
        "version" => vec![CommandOutput::Text(format!(
            "palaver {}",
            env!("CARGO_PKG_VERSION")
        ))],
        "model" => {
            if !params.is_empty() {
                return vec![CommandOutput::Error(
                    "changing the model requires editing the pipeline configuration".into(),
                )];
            }
            let name = query
                .pipeline_config
                .pointer("/ai/model")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            vec![CommandOutput::Text(format!("current model: {name}"))]
        },
        "reset" => {
            if query.launcher_type == LauncherType::Group && !is_admin {
                return vec![CommandOutput::Error("permission denied".into())];
            }
            let session = deps
                .sessions
                .get_or_create(query.launcher_type, &query.launcher_id);
            session.reset_conversation().await;
            vec![CommandOutput::Text("conversation reset".into())]
        },
        _ => vec![CommandOutput::Error(format!("unknown command: {command}"))],
    }
}
