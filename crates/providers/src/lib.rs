//! Model-provider boundary: the requester trait the processor stage invokes,
//! plus model registration and lookup.
//!
//! Real provider protocol clients live behind [`ProviderRequester`]
//! implementations supplied at wiring time; this crate ships only the
//! contract and a development echo requester.

pub mod manager;
pub mod requester;

pub use {
    manager::ProviderManager,
    requester::{EchoRequester, FunctionSchema, ModelInfo, ProviderRequester},
};
