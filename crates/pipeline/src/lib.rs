//! The query scheduling and pipeline execution engine.
//!
//! Inbound events become [`Query`]s in the [`QueryPool`]; the [`Controller`]
//! admits them under per-session and global concurrency limits and dispatches
//! each through its bot's [`RuntimePipeline`], an ordered stage chain that
//! supports depth-first forking.

pub mod controller;
pub mod entities;
pub mod error;
pub mod executor;
pub mod manager;
pub mod pool;
pub mod stage;
pub mod stages;

#[cfg(test)]
pub(crate) mod testutil;

pub use {
    controller::Controller,
    entities::{Query, ResultType, StageOutput, StageProcessResult},
    error::{Error, Result},
    executor::{RuntimePipeline, StageBinding},
    manager::{PipelineManager, default_pipeline_record},
    pool::QueryPool,
    stage::{PipelineStage, StageDeps, StageRegistry, register_default_stages},
};
