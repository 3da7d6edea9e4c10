use std::sync::Mutex;

use {
    chrono::Utc,
    serde::{Deserialize, Serialize},
};

/// Free-text progress log attached to a tracked task. The running work
/// appends lines; introspection reads a snapshot.
#[derive(Debug, Default)]
pub struct TaskContext {
    inner: Mutex<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    current_action: String,
    log: String,
}

impl Default for ContextInner {
    fn default() -> Self {
        Self {
            current_action: "default".into(),
            log: String::new(),
        }
    }
}

/// Serializable view of a [`TaskContext`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskContextSnapshot {
    pub current_action: String,
    pub log: String,
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current_action(&self, action: impl Into<String>) {
        self.lock().current_action = action.into();
    }

    /// Append a timestamped line, optionally switching the current action.
    pub fn trace(&self, msg: &str, action: Option<&str>) {
        let mut inner = self.lock();
        if let Some(action) = action {
            inner.current_action = action.to_string();
        }
        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("{stamp} | {} | {msg}\n", inner.current_action);
        inner.log.push_str(&line);
    }

    pub fn snapshot(&self) -> TaskContextSnapshot {
        let inner = self.lock();
        TaskContextSnapshot {
            current_action: inner.current_action.clone(),
            log: inner.log.clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ContextInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
