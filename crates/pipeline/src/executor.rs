//! The stage chain executor: linear continuation plus depth-first forking.

use std::sync::Arc;

use {
    futures::{FutureExt, StreamExt, future::BoxFuture},
    palaver_common::{LauncherType, MessageElement},
    palaver_config::PipelineRecord,
    palaver_plugins::{PluginEvent, PluginRouter},
    serde::Deserialize,
    tracing::{debug, error, info},
};

use crate::{
    entities::{Query, ResultType, StageOutput, StageProcessResult},
    error::Result,
    stage::PipelineStage,
};

/// One bound stage: the name it was registered under plus the instance.
pub struct StageBinding {
    pub name: String,
    pub stage: Box<dyn PipelineStage>,
}

/// Output options read once from the pipeline config blob.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub(crate) struct OutputMisc {
    pub at_sender: bool,
    pub quote_origin: bool,
}

impl OutputMisc {
    pub(crate) fn from_pipeline_config(config: &serde_json::Value) -> Self {
        config
            .pointer("/output/misc")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

/// An immutable, loaded pipeline: the persisted record plus its bound,
/// initialized stage instances.
pub struct RuntimePipeline {
    record: PipelineRecord,
    stages: Vec<StageBinding>,
    plugins: Arc<PluginRouter>,
    output: OutputMisc,
}

impl RuntimePipeline {
    pub(crate) fn new(
        record: PipelineRecord,
        stages: Vec<StageBinding>,
        plugins: Arc<PluginRouter>,
    ) -> Self {
        let output = OutputMisc::from_pipeline_config(&record.config);
        Self {
            record,
            stages,
            plugins,
            output,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn pipeline_name(&self) -> &str {
        &self.record.name
    }

    pub fn record(&self) -> &PipelineRecord {
        &self.record
    }

    /// Execute the stage chain for one query.
    ///
    /// Any failure inside the chain is caught here and logged with the query
    /// id and the stage active at failure time; it never reaches the
    /// scheduler.
    pub async fn run(&self, mut query: Query) {
        let query_id = query.query_id;
        query.pipeline_config = self.record.config.clone();

        let event = match query.launcher_type {
            LauncherType::Person => PluginEvent::PersonMessageReceived {
                launcher_id: query.launcher_id.clone(),
                sender_id: query.sender_id.clone(),
                message_chain: query.message_chain.clone(),
            },
            LauncherType::Group => PluginEvent::GroupMessageReceived {
                launcher_id: query.launcher_id.clone(),
                sender_id: query.sender_id.clone(),
                message_chain: query.message_chain.clone(),
            },
        };
        let ctx = self.plugins.emit_event(event).await;
        if ctx.is_prevented_default() {
            debug!(query_id, "message event prevented default, skipping stage chain");
            return;
        }

        debug!(query_id, pipeline = %self.record.name, "processing query");
        if let Err(e) = self.execute_from(0, query).await {
            let stage = e.stage_name().unwrap_or("unknown").to_string();
            error!(query_id, stage = %stage, error = %e, "query processing failed");
        }
        debug!(query_id, "query processed");
    }

    /// Drive the chain from stage `index`.
    ///
    /// A stage returning a stream forks the chain: every `Continue` element
    /// recursively drives the remainder of the chain to completion before
    /// the stream is polled for its next element, so sub-chains interleave
    /// depth-first. Once the stream is exhausted this path ends; the loop
    /// does not also advance past the forking stage.
    fn execute_from(&self, index: usize, query: Query) -> BoxFuture<'_, Result<()>> {
        async move {
            let mut i = index;
            let mut query = query;
            while i < self.stages.len() {
                let binding = &self.stages[i];
                query.current_stage = Some(binding.name.clone());

                let output = binding
                    .stage
                    .process(query, &binding.name)
                    .await
                    .map_err(|e| e.attribute(&binding.name))?;

                match output {
                    StageOutput::Single(result) => {
                        self.dispatch_notices(&result)
                            .await
                            .map_err(|e| e.attribute(&binding.name))?;
                        match result.result_type {
                            ResultType::Interrupt => {
                                debug!(stage = %binding.name, "stage interrupted query");
                                return Ok(());
                            },
                            ResultType::Continue => query = result.new_query,
                        }
                    },
                    StageOutput::Stream(mut results) => {
                        while let Some(item) = results.next().await {
                            let result = item.map_err(|e| e.attribute(&binding.name))?;
                            self.dispatch_notices(&result)
                                .await
                                .map_err(|e| e.attribute(&binding.name))?;
                            match result.result_type {
                                ResultType::Interrupt => {
                                    debug!(stage = %binding.name, "stage interrupted query");
                                    break;
                                },
                                ResultType::Continue => {
                                    self.execute_from(i + 1, result.new_query).await?;
                                },
                            }
                        }
                        return Ok(());
                    },
                }

                i += 1;
            }
            Ok(())
        }
        .boxed()
    }

    /// Dispatch every notice a result carries to its own sink.
    async fn dispatch_notices(&self, result: &StageProcessResult) -> Result<()> {
        let query = &result.new_query;
        if let Some(notice) = &result.user_notice {
            let mut message = notice.clone();
            if self.output.at_sender && query.message_event.is_group() {
                message.prepend(MessageElement::At {
                    target: query.sender_id.clone(),
                });
            }
            query
                .adapter
                .reply_message(&query.message_event, &message, self.output.quote_origin)
                .await?;
        }
        if let Some(text) = &result.debug_notice {
            debug!(query_id = query.query_id, "{text}");
        }
        if let Some(text) = &result.console_notice {
            info!(query_id = query.query_id, "{text}");
        }
        if let Some(text) = &result.error_notice {
            error!(query_id = query.query_id, "{text}");
        }
        Ok(())
    }
}
