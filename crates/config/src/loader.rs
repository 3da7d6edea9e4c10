use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    schema::{PalaverConfig, PipelineRecord},
};

/// Standard config file name.
const CONFIG_FILENAME: &str = "palaver.toml";

/// Directory of persisted pipeline records, relative to the config dir.
const PIPELINES_DIR: &str = "pipelines";

/// Load the application config from the given path.
pub fn load_config(path: &Path) -> Result<PalaverConfig> {
    let raw = std::fs::read_to_string(path)?;
    toml::from_str(&raw).map_err(|source| Error::Toml {
        path: path.display().to_string(),
        source,
    })
}

/// Load config from `<dir>/palaver.toml`, falling back to defaults when the
/// file does not exist or fails to parse.
pub fn discover_and_load(dir: &Path) -> PalaverConfig {
    let path = dir.join(CONFIG_FILENAME);
    if !path.exists() {
        debug!(path = %path.display(), "no config file found, using defaults");
        return PalaverConfig::default();
    }
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            PalaverConfig::default()
        },
    }
}

/// Load every pipeline record from `<dir>/pipelines/*.json`.
///
/// Records are returned sorted by file name so load order is stable across
/// runs. A missing directory yields an empty list.
pub fn load_pipeline_records(dir: &Path) -> Result<Vec<PipelineRecord>> {
    let pipelines_dir = dir.join(PIPELINES_DIR);
    if !pipelines_dir.is_dir() {
        return Ok(vec![]);
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(&pipelines_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = std::fs::read_to_string(&path)?;
        let record: PipelineRecord =
            serde_json::from_str(&raw).map_err(|source| Error::Record {
                path: path.display().to_string(),
                source,
            })?;
        debug!(id = %record.id, name = %record.name, "loaded pipeline record");
        records.push(record);
    }
    Ok(records)
}
