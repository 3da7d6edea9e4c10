//! Built-in pipeline stages.

mod access_control;
mod chat_handler;
mod command_handler;
mod content_filter;
mod long_text;
mod pre_processor;
mod processor;
mod rate_limit;
mod respond_rules;
mod response_wrapper;
mod send_response;

pub use {
    access_control::AccessControlStage,
    content_filter::ContentFilterStage,
    long_text::LongTextStage,
    pre_processor::PreProcessorStage,
    processor::ProcessorStage,
    rate_limit::RateLimitStage,
    respond_rules::RespondRulesStage,
    response_wrapper::ResponseWrapperStage,
    send_response::SendResponseStage,
};

/// Deserialize one section of the pipeline config blob, falling back to the
/// section's defaults when absent or malformed.
pub(crate) fn config_section<T>(config: &serde_json::Value, pointer: &str) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    config
        .pointer(pointer)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}
