//! Shared data model used across all palaver crates.

pub mod llm;
pub mod types;

pub use {
    llm::{LlmMessage, Role},
    types::{LauncherType, MessageChain, MessageElement},
};
