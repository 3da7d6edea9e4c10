//! Per-conversation sessions: identity, conversation history, and the
//! admission slot that serializes pipeline runs within one conversation.

pub mod conversation;
pub mod manager;
pub mod session;

pub use {
    conversation::Conversation,
    manager::SessionManager,
    session::Session,
};
