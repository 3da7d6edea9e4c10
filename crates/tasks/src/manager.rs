use std::{
    future::Future,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use {tokio::sync::watch, tracing::debug};

use crate::{
    context::TaskContext,
    wrapper::{LifecycleScope, RunState, TaskClass, TaskSnapshot, TaskWrapper},
};

/// Registry of every spawned asynchronous unit of work.
///
/// Entries are never pruned: finished tasks stay visible to introspection
/// for the process lifetime.
#[derive(Default)]
pub struct TaskManager {
    tasks: Mutex<Vec<Arc<TaskWrapper>>>,
    next_id: AtomicU64,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` immediately and register it.
    ///
    /// The work runs as its own task; a monitor records its outcome (result,
    /// error, or cancellation) into the wrapper so introspection and
    /// [`TaskManager::wait_all`] never disturb the work itself.
    pub fn create_task<F>(
        &self,
        work: F,
        class: TaskClass,
        kind: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        scopes: Vec<LifecycleScope>,
    ) -> Arc<TaskWrapper>
    where
        F: Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        self.spawn(work, class, kind.into(), name.into(), label.into(), scopes, Arc::new(TaskContext::new()))
    }

    /// Like [`TaskManager::create_task`] with `TaskClass::User`.
    pub fn create_user_task<F>(
        &self,
        work: F,
        kind: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        scopes: Vec<LifecycleScope>,
    ) -> Arc<TaskWrapper>
    where
        F: Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        self.create_task(work, TaskClass::User, kind, name, label, scopes)
    }

    /// Spawn with a caller-provided trace context (shared with the work).
    pub fn create_task_with_context<F>(
        &self,
        work: F,
        class: TaskClass,
        kind: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        scopes: Vec<LifecycleScope>,
        context: Arc<TaskContext>,
    ) -> Arc<TaskWrapper>
    where
        F: Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        self.spawn(work, class, kind.into(), name.into(), label.into(), scopes, context)
    }

    fn spawn<F>(
        &self,
        work: F,
        class: TaskClass,
        kind: String,
        name: String,
        label: String,
        scopes: Vec<LifecycleScope>,
        context: Arc<TaskContext>,
    ) -> Arc<TaskWrapper>
    where
        F: Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(RwLock::new(RunState::default()));
        let (done_tx, done_rx) = watch::channel(false);

        let inner = tokio::spawn(work);
        let abort = inner.abort_handle();

        let monitor_state = Arc::clone(&state);
        let monitor_name = name.clone();
        tokio::spawn(async move {
            let outcome = inner.await;
            {
                let mut state = monitor_state.write().unwrap_or_else(|e| e.into_inner());
                match outcome {
                    Ok(Ok(value)) => state.result = Some(value),
                    Ok(Err(e)) => state.error = Some(format!("{e:#}")),
                    Err(join) if join.is_cancelled() => state.cancelled = true,
                    Err(join) => state.error = Some(join.to_string()),
                }
                state.done = true;
            }
            debug!(task = %monitor_name, "task settled");
            let _ = done_tx.send(true);
        });

        let wrapper = Arc::new(TaskWrapper::new(
            id, class, kind, name, label, scopes, context, state, abort, done_rx,
        ));
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::clone(&wrapper));
        wrapper
    }

    /// Wait for every currently-registered unit to settle. Individual
    /// failures and cancellations are absorbed.
    pub async fn wait_all(&self) {
        let tasks: Vec<Arc<TaskWrapper>> = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for task in tasks {
            task.wait().await;
        }
    }

    pub fn get_task_by_id(&self, id: u64) -> Option<Arc<TaskWrapper>> {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    /// Cancel every unfinished unit whose scope set contains `scope`.
    pub fn cancel_by_scope(&self, scope: LifecycleScope) {
        for task in self.tasks.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            if !task.is_done() && task.scopes.contains(&scope) {
                debug!(task = %task.name, ?scope, "cancelling task by scope");
                task.cancel();
            }
        }
    }

    /// Cancel one unit by id if it is still running.
    pub fn cancel_task(&self, id: u64) {
        if let Some(task) = self.get_task_by_id(id)
            && !task.is_done()
        {
            task.cancel();
        }
    }

    /// Snapshots of every tracked unit, optionally filtered by class.
    pub fn snapshots(&self, class: Option<TaskClass>) -> Vec<TaskSnapshot> {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|t| class.is_none_or(|c| t.class == c))
            .map(|t| t.snapshot())
            .collect()
    }
}
