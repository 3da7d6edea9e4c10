use std::{collections::HashMap, sync::Arc};

use {
    anyhow::Result,
    async_trait::async_trait,
    tracing::{debug, info, warn},
};

use crate::{
    context::EventContext,
    events::{EventKind, PluginEvent},
};

// ── EventHandler trait ──────────────────────────────────────────────────────

/// One plugin-registered listener.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// A human-readable name for this handler.
    fn name(&self) -> &str;

    /// Which events this handler subscribes to.
    fn events(&self) -> &[EventKind];

    /// Priority for ordering. Higher values run first. Default is 0.
    fn priority(&self) -> i32 {
        0
    }

    /// Observe the event and optionally mutate the context.
    async fn handle(&self, ctx: &mut EventContext) -> Result<()>;
}

// ── PluginRouter ────────────────────────────────────────────────────────────

/// Dispatches emitted events to every subscribed handler, in priority order.
#[derive(Default)]
pub struct PluginRouter {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl PluginRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for all events it subscribes to.
    /// Handlers are sorted by priority (descending) within each event.
    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        for &event in handler.events() {
            let handlers = self.handlers.entry(event).or_default();
            handlers.push(Arc::clone(&handler));
            handlers.sort_by_key(|h| std::cmp::Reverse(h.priority()));
        }
        info!(handler = handler.name(), "event handler registered");
    }

    /// Returns true if any handlers are registered for the given event.
    pub fn has_handlers(&self, event: EventKind) -> bool {
        self.handlers.get(&event).is_some_and(|v| !v.is_empty())
    }

    /// Emit an event to every subscribed handler and return the final
    /// context. Handler failures are logged and do not stop dispatch.
    pub async fn emit_event(&self, event: PluginEvent) -> EventContext {
        let kind = event.kind();
        let mut ctx = EventContext::new(event);

        let Some(handlers) = self.handlers.get(&kind) else {
            return ctx;
        };
        debug!(event = %kind, count = handlers.len(), "dispatching plugin event");

        for handler in handlers {
            if let Err(e) = handler.handle(&mut ctx).await {
                warn!(handler = handler.name(), event = %kind, error = %e, "event handler failed");
            }
        }
        ctx
    }
}
