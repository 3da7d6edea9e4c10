//! The scheduler: scans the pool in arrival order, admits the first query
//! whose session is free, and dispatches it under the global concurrency
//! limit.

use std::sync::Arc;

use {
    palaver_platform::PlatformManager,
    palaver_sessions::SessionManager,
    palaver_tasks::{LifecycleScope, TaskClass, TaskManager},
    tokio::sync::{OwnedSemaphorePermit, Semaphore},
    tracing::{debug, error, info},
};

use crate::{entities::Query, manager::PipelineManager, pool::QueryPool};

pub struct Controller {
    pool: Arc<QueryPool>,
    sessions: Arc<SessionManager>,
    platforms: Arc<PlatformManager>,
    pipelines: Arc<PipelineManager>,
    tasks: Arc<TaskManager>,
    /// Bounds concurrent pipeline executions across all sessions.
    global_permits: Arc<Semaphore>,
}

impl Controller {
    pub fn new(
        pool: Arc<QueryPool>,
        sessions: Arc<SessionManager>,
        platforms: Arc<PlatformManager>,
        pipelines: Arc<PipelineManager>,
        tasks: Arc<TaskManager>,
        max_pipeline_concurrency: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool,
            sessions,
            platforms,
            pipelines,
            tasks,
            global_permits: Arc::new(Semaphore::new(max_pipeline_concurrency)),
        })
    }

    /// The scheduling loop. Runs until its task is cancelled; iteration
    /// errors are logged and the loop continues.
    pub async fn run(self: Arc<Self>) {
        info!("query controller started");
        loop {
            if let Err(e) = self.dispatch_next().await {
                error!(error = %e, "controller loop error");
            }
        }
    }

    /// One scheduling iteration: select and dispatch an eligible query, or
    /// park until the pool signals.
    async fn dispatch_next(&self) -> anyhow::Result<()> {
        let mut queue = self.pool.lock().await;

        let mut selected: Option<(usize, OwnedSemaphorePermit)> = None;
        for (index, query) in queue.iter().enumerate() {
            let session = self
                .sessions
                .get_or_create(query.launcher_type, &query.launcher_id);
            debug!(query_id = query.query_id, session = %session.key(), "checking query");

            // First query whose session slot is free wins; the slot is taken
            // while the pool lock is still held so a concurrent scan cannot
            // pick the same session twice.
            if let Ok(permit) = session.admission().clone().try_acquire_owned() {
                selected = Some((index, permit));
                break;
            }
        }

        match selected {
            Some((index, permit)) => {
                if let Some(query) = queue.remove(index) {
                    drop(queue);
                    self.spawn_query_task(query, permit);
                }
            },
            None => {
                // Pool empty, or every represented session is at its limit:
                // park until a query arrives or a slot is released. The
                // waiter is registered before the lock drops so the signal
                // cannot slip past.
                let notified = self.pool.wait_signal();
                let mut notified = std::pin::pin!(notified);
                notified.as_mut().enable();
                drop(queue);
                notified.await;
            },
        }
        Ok(())
    }

    /// Run one admitted query as a tracked task, holding a global permit for
    /// the duration and releasing the session slot at the end.
    fn spawn_query_task(&self, query: Query, session_permit: OwnedSemaphorePermit) {
        let pool = Arc::clone(&self.pool);
        let platforms = Arc::clone(&self.platforms);
        let pipelines = Arc::clone(&self.pipelines);
        let global = Arc::clone(&self.global_permits);
        let query_id = query.query_id;

        self.tasks.create_task(
            async move {
                match global.acquire_owned().await {
                    Ok(_global_permit) => {
                        // Resolve the bot first, then its pipeline, so a bot
                        // reconfigured while the query waited in the pool
                        // dispatches against the latest binding.
                        match platforms.get_bot_by_id(&query.bot_id).await {
                            Some(bot) => {
                                match pipelines.get_pipeline_by_id(&bot.use_pipeline_id).await {
                                    Some(pipeline) => pipeline.run(query).await,
                                    None => debug!(
                                        query_id,
                                        pipeline = %bot.use_pipeline_id,
                                        "pipeline not found, dropping query"
                                    ),
                                }
                            },
                            None => debug!(query_id, "bot not found, dropping query"),
                        }
                    },
                    // The semaphore only closes during shutdown.
                    Err(_) => {},
                }

                // Release the session slot under the pool lock and wake the
                // scheduler for a re-scan.
                let queue = pool.lock().await;
                drop(session_permit);
                pool.signal();
                drop(queue);

                Ok(serde_json::Value::Null)
            },
            TaskClass::System,
            "query",
            format!("query-{query_id}"),
            "",
            vec![LifecycleScope::Application, LifecycleScope::Platform],
        );
    }
}
