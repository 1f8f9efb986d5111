//! Configuration loading for the CLI

use anyhow::{Context, Result};
use drift_lib::RecommenderConfig;
use std::path::{Path, PathBuf};

/// Prefix of environment overrides, e.g. `DRIFT_OPTIMIZATION_INTERVAL=60`
const ENV_PREFIX: &str = "DRIFT";

/// Load the recommender configuration.
///
/// An explicit `--config` file must exist; otherwise the default file is
/// used when present. Environment variables override file values.
pub fn load(override_path: Option<&Path>) -> Result<RecommenderConfig> {
    let mut builder = config::Config::builder();

    match override_path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        None => {
            if let Some(path) = default_config_path() {
                builder = builder.add_source(config::File::from(path).required(false));
            }
        }
    }

    let settings = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
        .context("Failed to load configuration")?;

    let config: RecommenderConfig = settings
        .try_deserialize()
        .context("Failed to parse configuration")?;
    config.validate()?;
    Ok(config)
}

/// `~/.config/drift/config.toml`
fn default_config_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".config").join("drift").join("config.toml"))
}
