//! Registry of every asynchronous unit of work the application spawns.
//!
//! Each unit is wrapped with an id, a classification, lifecycle scopes, and a
//! trace context, supporting scoped cancellation (restart one subsystem
//! without touching the rest) and introspection of finished or running work.

pub mod context;
pub mod manager;
pub mod wrapper;

pub use {
    context::TaskContext,
    manager::TaskManager,
    wrapper::{LifecycleScope, TaskClass, TaskSnapshot, TaskWrapper},
};
