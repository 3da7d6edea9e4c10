//! The stage capability interface and the name-to-constructor registry.

use std::{collections::HashMap, sync::Arc};

use {
    async_trait::async_trait,
    palaver_config::PalaverConfig,
    palaver_plugins::PluginRouter,
    palaver_providers::ProviderManager,
    palaver_sessions::SessionManager,
};

use crate::{
    entities::{Query, StageOutput},
    error::{Error, Result},
};

/// Shared collaborators handed to every stage constructor.
pub struct StageDeps {
    pub app_config: Arc<PalaverConfig>,
    pub sessions: Arc<SessionManager>,
    pub plugins: Arc<PluginRouter>,
    pub providers: Arc<ProviderManager>,
}

/// One pipeline step.
///
/// Instances are constructed once per pipeline and reused across every query
/// routed to it, so stages keep per-query state on the [`Query`] itself.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Called once with the owning pipeline's configuration blob, before the
    /// stage serves its first query.
    async fn initialize(&mut self, _pipeline_config: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    /// Execute this stage against one query. `stage_name` is the name the
    /// stage was registered under in the pipeline record.
    async fn process(&self, query: Query, stage_name: &str) -> Result<StageOutput>;
}

type StageCtor = Box<dyn Fn(Arc<StageDeps>) -> Box<dyn PipelineStage> + Send + Sync>;

/// Explicit stage registry, populated by a registration call at startup.
#[derive(Default)]
pub struct StageRegistry {
    ctors: HashMap<String, StageCtor>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, ctor: F)
    where
        F: Fn(Arc<StageDeps>) -> Box<dyn PipelineStage> + Send + Sync + 'static,
    {
        self.ctors.insert(name.into(), Box::new(ctor));
    }

    pub fn construct(&self, name: &str, deps: Arc<StageDeps>) -> Result<Box<dyn PipelineStage>> {
        match self.ctors.get(name) {
            Some(ctor) => Ok(ctor(deps)),
            None => Err(Error::UnknownStage(name.to_string())),
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ctors.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Register every built-in stage under its persisted name.
pub fn register_default_stages(registry: &mut StageRegistry) {
    use crate::stages::{
        AccessControlStage, ContentFilterStage, LongTextStage, PreProcessorStage, ProcessorStage,
        RateLimitStage, RespondRulesStage, ResponseWrapperStage, SendResponseStage,
    };

    registry.register("respond-rules", |_| Box::new(RespondRulesStage::default()));
    registry.register("access-control", |_| Box::new(AccessControlStage::default()));
    registry.register("rate-limit", |_| Box::new(RateLimitStage::default()));
    registry.register("content-filter-pre", |_| Box::new(ContentFilterStage::pre()));
    registry.register("pre-processor", |deps| Box::new(PreProcessorStage::new(deps)));
    registry.register("processor", |deps| Box::new(ProcessorStage::new(deps)));
    registry.register("content-filter-post", |_| Box::new(ContentFilterStage::post()));
    registry.register("response-wrapper", |deps| Box::new(ResponseWrapperStage::new(deps)));
    registry.register("long-text", |_| Box::new(LongTextStage::default()));
    registry.register("send-response", |_| Box::new(SendResponseStage::default()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_every_builtin() {
        let mut registry = StageRegistry::new();
        register_default_stages(&mut registry);
        let names = registry.names();
        for name in [
            "access-control",
            "content-filter-post",
            "content-filter-pre",
            "long-text",
            "pre-processor",
            "processor",
            "rate-limit",
            "respond-rules",
            "response-wrapper",
            "send-response",
        ] {
            assert!(names.contains(&name.to_string()), "missing {name}");
        }
    }

    #[test]
    fn unknown_stage_is_an_error() {
        let registry = StageRegistry::new();
        let deps = crate::testutil::make_deps();
        assert!(matches!(
            registry.construct("missing", deps),
            Err(Error::UnknownStage(_))
        ));
    }
}
