use std::sync::Arc;

use {dashmap::DashMap, palaver_common::LauncherType, tracing::debug};

use crate::session::Session;

/// Keyed session table. Sessions are created lazily on first reference and
/// live for the process lifetime.
#[derive(Default)]
pub struct SessionManager {
    sessions: DashMap<(LauncherType, String), Arc<Session>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &self,
        launcher_type: LauncherType,
        launcher_id: &str,
    ) -> Arc<Session> {
        if let Some(session) = self.sessions.get(&(launcher_type, launcher_id.to_string())) {
            return Arc::clone(&session);
        }
        let session = Arc::new(Session::new(launcher_type, launcher_id));
        debug!(key = %session.key(), "created session");
        self.sessions
            .entry((launcher_type, launcher_id.to_string()))
            .or_insert(session)
            .clone()
    }

    pub fn get(&self, launcher_type: LauncherType, launcher_id: &str) -> Option<Arc<Session>> {
        self.sessions
            .get(&(launcher_type, launcher_id.to_string()))
            .map(|s| Arc::clone(&s))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
