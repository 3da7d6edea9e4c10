//! Application wiring: builds every manager, loads pipelines, registers the
//! console bot, and runs the scheduler.

use std::sync::Arc;

use {
    palaver_config::{PalaverConfig, PipelineRecord},
    palaver_pipeline::{
        Controller, PipelineManager, QueryPool, StageDeps, StageRegistry, default_pipeline_record,
        register_default_stages,
    },
    palaver_platform::{Bot, PlatformAdapter, PlatformManager},
    palaver_plugins::PluginRouter,
    palaver_providers::{EchoRequester, ModelInfo, ProviderManager},
    palaver_sessions::SessionManager,
    palaver_tasks::{LifecycleScope, TaskClass, TaskManager},
    tracing::info,
};

use crate::console::{CONSOLE_BOT_ID, ConsoleAdapter, input_loop};

pub struct App {
    pool: Arc<QueryPool>,
    tasks: Arc<TaskManager>,
    controller: Arc<Controller>,
    console: Arc<ConsoleAdapter>,
}

impl App {
    pub async fn build(
        config: PalaverConfig,
        records: Vec<PipelineRecord>,
    ) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let sessions = Arc::new(SessionManager::new());
        let plugins = Arc::new(PluginRouter::new());

        let mut providers = ProviderManager::new(Arc::new(EchoRequester));
        providers.register_model(ModelInfo {
            name: "echo".into(),
            provider: "builtin".into(),
            supports_functions: false,
        });
        let providers = Arc::new(providers);

        let deps = Arc::new(StageDeps {
            app_config: Arc::clone(&config),
            sessions: Arc::clone(&sessions),
            plugins: Arc::clone(&plugins),
            providers,
        });

        let mut registry = StageRegistry::new();
        register_default_stages(&mut registry);
        let pipelines = Arc::new(PipelineManager::new(registry, deps));

        let records = if records.is_empty() {
            info!("no pipeline records found, using the stock pipeline");
            vec![default_pipeline_record(uuid::Uuid::new_v4().to_string())]
        } else {
            records
        };
        let first_pipeline_id = records[0].id.clone();
        pipelines.load_records(records).await?;

        let console = Arc::new(ConsoleAdapter);
        let platforms = Arc::new(PlatformManager::new());
        platforms
            .register_bot(Bot {
                id: CONSOLE_BOT_ID.into(),
                name: "console".into(),
                adapter: Arc::clone(&console) as Arc<dyn PlatformAdapter>,
                use_pipeline_id: first_pipeline_id,
            })
            .await;

        let pool = Arc::new(QueryPool::new());
        let tasks = Arc::new(TaskManager::new());
        let controller = Controller::new(
            Arc::clone(&pool),
            sessions,
            platforms,
            pipelines,
            Arc::clone(&tasks),
            config.concurrency.pipeline,
        );

        Ok(Self {
            pool,
            tasks,
            controller,
            console,
        })
    }

    /// Spawn the scheduler and the console input loop, then wait for every
    /// tracked task.
    pub async fn run(self) -> anyhow::Result<()> {
        let controller = Arc::clone(&self.controller);
        self.tasks.create_task(
            async move {
                controller.run().await;
                Ok(serde_json::Value::Null)
            },
            TaskClass::System,
            "controller",
            "query-controller",
            "Query controller",
            vec![LifecycleScope::Application],
        );

        let pool = Arc::clone(&self.pool);
        let console = Arc::clone(&self.console);
        self.tasks.create_task(
            async move {
                input_loop(pool, console).await?;
                Ok(serde_json::Value::Null)
            },
            TaskClass::System,
            "platform",
            "console-input",
            "Console input loop",
            vec![LifecycleScope::Application, LifecycleScope::Platform],
        );

        info!("palaver is running; type a message and press enter");
        self.tasks.wait_all().await;
        Ok(())
    }
}
