use std::sync::Arc;

use {
    palaver_config::PipelineRecord,
    tokio::sync::RwLock,
    tracing::info,
};

use crate::{
    error::Result,
    executor::{RuntimePipeline, StageBinding},
    stage::{StageDeps, StageRegistry},
};

/// Loads persisted pipeline records into runtime pipelines and resolves them
/// by identifier.
pub struct PipelineManager {
    pipelines: RwLock<Vec<Arc<RuntimePipeline>>>,
    registry: StageRegistry,
    deps: Arc<StageDeps>,
}

impl PipelineManager {
    pub fn new(registry: StageRegistry, deps: Arc<StageDeps>) -> Self {
        Self {
            pipelines: RwLock::new(Vec::new()),
            registry,
            deps,
        }
    }

    pub async fn load_records(&self, records: Vec<PipelineRecord>) -> Result<()> {
        for record in records {
            self.load_pipeline(record).await?;
        }
        Ok(())
    }

    /// Instantiate and initialize the record's configured stage list, then
    /// publish the pipeline for lookup.
    pub async fn load_pipeline(&self, record: PipelineRecord) -> Result<()> {
        let mut stages = Vec::with_capacity(record.stages.len());
        for name in &record.stages {
            let mut stage = self.registry.construct(name, Arc::clone(&self.deps))?;
            stage
                .initialize(&record.config)
                .await
                .map_err(|e| e.attribute(name))?;
            stages.push(StageBinding {
                name: name.clone(),
                stage,
            });
        }

        info!(id = %record.id, name = %record.name, stages = record.stages.len(), "loaded pipeline");
        let pipeline = Arc::new(RuntimePipeline::new(
            record,
            stages,
            Arc::clone(&self.deps.plugins),
        ));
        self.pipelines.write().await.push(pipeline);
        Ok(())
    }

    pub async fn get_pipeline_by_id(&self, id: &str) -> Option<Arc<RuntimePipeline>> {
        self.pipelines
            .read()
            .await
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }

    pub async fn remove_pipeline(&self, id: &str) {
        self.pipelines.write().await.retain(|p| p.id() != id);
    }
}

/// The stock pipeline record used when no persisted records exist yet.
pub fn default_pipeline_record(id: impl Into<String>) -> PipelineRecord {
    PipelineRecord {
        id: id.into(),
        name: "default".into(),
        description: "Stock chat pipeline".into(),
        stages: vec![
            "respond-rules".into(),
            "access-control".into(),
            "rate-limit".into(),
            "content-filter-pre".into(),
            "pre-processor".into(),
            "processor".into(),
            "content-filter-post".into(),
            "response-wrapper".into(),
            "long-text".into(),
            "send-response".into(),
        ],
        config: serde_json::json!({
            "trigger": {
                "group-respond-rules": { "at-bot": true, "prefix": [] },
                "access-control": { "mode": "blacklist", "blacklist": [] }
            },
            "safety": {
                "content-filter": { "banned-words": [] },
                "rate-limit": { "window-length": 60, "limitation": 60, "strategy": "drop" }
            },
            "ai": { "model": "echo", "prompt": "", "max-round": 10 },
            "output": {
                "long-text-processing": { "threshold": 1500 },
                "force-delay": { "min": 0, "max": 0 },
                "misc": { "at-sender": false, "quote-origin": false }
            }
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::register_default_stages;

    fn manager() -> PipelineManager {
        let mut registry = StageRegistry::new();
        register_default_stages(&mut registry);
        PipelineManager::new(registry, crate::testutil::make_deps())
    }

    #[tokio::test]
    async fn load_lookup_remove() {
        let mgr = manager();
        mgr.load_pipeline(default_pipeline_record("p-1"))
            .await
            .unwrap();

        let pipeline = mgr.get_pipeline_by_id("p-1").await.unwrap();
        assert_eq!(pipeline.pipeline_name(), "default");
        assert!(mgr.get_pipeline_by_id("p-2").await.is_none());

        mgr.remove_pipeline("p-1").await;
        assert!(mgr.get_pipeline_by_id("p-1").await.is_none());
    }

    #[tokio::test]
    async fn unknown_stage_name_fails_loading() {
        let mgr = manager();
        let mut record = default_pipeline_record("p-bad");
        record.stages.push("no-such-stage".into());
        assert!(mgr.load_pipeline(record).await.is_err());
    }
}
