//! Application configuration (TOML) and persisted pipeline records (JSON).

pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{discover_and_load, load_config, load_pipeline_records},
    schema::{ConcurrencyConfig, PalaverConfig, PipelineRecord},
};
