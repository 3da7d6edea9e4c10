//! Platform adapter boundary: inbound message events, the adapter trait, and
//! bot bindings.

pub mod adapter;
pub mod events;
pub mod manager;

pub use {
    adapter::PlatformAdapter,
    events::MessageEvent,
    manager::{Bot, PlatformManager},
};
