use std::sync::{Arc, RwLock};

use {
    serde::{Deserialize, Serialize},
    tokio::{sync::watch, task::AbortHandle},
};

use crate::context::{TaskContext, TaskContextSnapshot};

// ── Scopes and classification ───────────────────────────────────────────────

/// Subsystem tag used to cancel groups of tasks together (e.g. restart all
/// platform tasks without touching pipeline executions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleScope {
    Application,
    Platform,
    Plugin,
    Provider,
}

/// Whether the task was spawned by the system or directly by a user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskClass {
    System,
    User,
}

// ── Run state ───────────────────────────────────────────────────────────────

/// Outcome of a unit of work, recorded by the monitor once the inner task
/// settles. Readable at any time without touching the task itself.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub done: bool,
    pub cancelled: bool,
    pub error: Option<String>,
    pub result: Option<serde_json::Value>,
}

/// Serializable view of one tracked task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: u64,
    pub class: TaskClass,
    pub kind: String,
    pub name: String,
    pub label: String,
    pub scopes: Vec<LifecycleScope>,
    pub context: TaskContextSnapshot,
    pub runtime: RuntimeSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSnapshot {
    pub done: bool,
    pub cancelled: bool,
    pub error: Option<String>,
    pub result: Option<serde_json::Value>,
}

// ── TaskWrapper ─────────────────────────────────────────────────────────────

/// One tracked asynchronous unit of work.
pub struct TaskWrapper {
    pub id: u64,
    pub class: TaskClass,
    pub kind: String,
    pub name: String,
    pub label: String,
    pub scopes: Vec<LifecycleScope>,
    context: Arc<TaskContext>,
    state: Arc<RwLock<RunState>>,
    abort: AbortHandle,
    done_rx: watch::Receiver<bool>,
}

impl TaskWrapper {
    pub(crate) fn new(
        id: u64,
        class: TaskClass,
        kind: String,
        name: String,
        label: String,
        scopes: Vec<LifecycleScope>,
        context: Arc<TaskContext>,
        state: Arc<RwLock<RunState>>,
        abort: AbortHandle,
        done_rx: watch::Receiver<bool>,
    ) -> Self {
        let label = if label.is_empty() { name.clone() } else { label };
        Self {
            id,
            class,
            kind,
            name,
            label,
            scopes,
            context,
            state,
            abort,
            done_rx,
        }
    }

    pub fn context(&self) -> &Arc<TaskContext> {
        &self.context
    }

    pub fn is_done(&self) -> bool {
        self.read().done
    }

    pub fn is_cancelled(&self) -> bool {
        self.read().cancelled
    }

    /// Request cooperative cancellation. Observed at the unit's next
    /// suspension point; a no-op once the task has finished.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    /// Wait for this unit to settle, whatever the outcome.
    pub async fn wait(&self) {
        let mut rx = self.done_rx.clone();
        // An error means the monitor is gone, which only happens after it
        // published the final state.
        let _ = rx.wait_for(|done| *done).await;
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let state = self.read();
        TaskSnapshot {
            id: self.id,
            class: self.class,
            kind: self.kind.clone(),
            name: self.name.clone(),
            label: self.label.clone(),
            scopes: self.scopes.clone(),
            context: self.context.snapshot(),
            runtime: RuntimeSnapshot {
                done: state.done,
                cancelled: state.cancelled,
                error: state.error.clone(),
                result: state.result.clone(),
            },
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RunState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }
}
