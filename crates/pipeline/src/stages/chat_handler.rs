use std::sync::Arc;

use {async_stream::stream, futures::StreamExt, palaver_common::LlmMessage, tracing::debug};

use crate::{
    entities::{Query, StageOutput, StageProcessResult},
    error::Result,
    stage::StageDeps,
};

/// Invokes the selected model and yields one continuation per reply message,
/// so each reply independently traverses the rest of the chain.
pub struct ChatHandler {
    deps: Arc<StageDeps>,
}

impl ChatHandler {
    pub fn new(deps: Arc<StageDeps>) -> Self {
        Self { deps }
    }

    pub async fn handle(&self, query: Query) -> Result<StageOutput> {
        let Some(model) = query.use_model.clone() else {
            return Ok(StageOutput::Single(
                StageProcessResult::interrupt(query)
                    .with_error_notice("no model selected; is the pre-processor configured?"),
            ));
        };

        let mut conversation =
            Vec::with_capacity(query.prompt.len() + query.messages.len() + 1);
        conversation.extend(query.prompt.iter().cloned());
        conversation.extend(query.messages.iter().cloned());
        if let Some(user) = query.user_message.clone() {
            conversation.push(user);
        }

        let requester = self.deps.providers.requester();
        let stream = stream! {
            let mut query = query;
            match requester.invoke(&model, &conversation, &query.use_funcs).await {
                Ok(replies) => {
                    debug!(query_id = query.query_id, count = replies.len(), "model replied");
                    let mut produced: Vec<LlmMessage> = Vec::with_capacity(replies.len());
                    for reply in replies {
                        produced.push(reply.clone());
                        query.resp_messages.push(reply);
                        yield Ok(StageProcessResult::continue_with(query.clone()));
                    }
                    // Persist the exchange once every reply has driven its
                    // sub-chain.
                    if let (Some(session), Some(user)) =
                        (query.session.clone(), query.user_message.clone())
                    {
                        session.record_exchange(user, &produced).await;
                    }
                },
                Err(e) => {
                    let notice = format!("model request failed: {e:#}");
                    yield Ok(StageProcessResult::interrupt(query.clone()).with_error_notice(notice));
                },
            }
        };
        Ok(StageOutput::Stream(stream.boxed()))
    }
}
