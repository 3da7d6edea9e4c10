use {
    anyhow::Result,
    async_trait::async_trait,
    palaver_common::LlmMessage,
    serde::{Deserialize, Serialize},
};

/// A model a pipeline can select.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub supports_functions: bool,
}

/// A callable function exposed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// Sends one conversation to a model provider and returns the reply
/// messages. One request may yield several messages (e.g. tool-call rounds).
#[async_trait]
pub trait ProviderRequester: Send + Sync {
    async fn invoke(
        &self,
        model: &ModelInfo,
        messages: &[LlmMessage],
        functions: &[FunctionSchema],
    ) -> Result<Vec<LlmMessage>>;
}

/// Development requester: replies with the last user message, verbatim.
pub struct EchoRequester;

#[async_trait]
impl ProviderRequester for EchoRequester {
    async fn invoke(
        &self,
        _model: &ModelInfo,
        messages: &[LlmMessage],
        _functions: &[FunctionSchema],
    ) -> Result<Vec<LlmMessage>> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == palaver_common::Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(vec![LlmMessage::assistant(last_user)])
    }
}
