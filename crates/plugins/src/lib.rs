//! Plugin event emission: the event model, the per-emission context plugins
//! mutate, and the priority-ordered dispatch router.
//!
//! Plugin loading and packaging are out of scope here; this crate defines the
//! call/return contract the pipeline uses at its plugin boundary.

pub mod context;
pub mod events;
pub mod router;

pub use {
    context::EventContext,
    events::{EventKind, PluginEvent},
    router::{EventHandler, PluginRouter},
};
