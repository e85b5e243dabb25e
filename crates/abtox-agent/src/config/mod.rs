//! Configuration loading for abtox.
//! Reads abtox.toml from the current directory or the path in ABTOX_CONFIG,
//! then applies command-line overrides.

use std::path::{Path, PathBuf};

use abtox_common::RunConfig;
use anyhow::Context;

pub const DEFAULT_CONFIG_FILE: &str = "abtox.toml";
pub const CONFIG_ENV: &str = "ABTOX_CONFIG";

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub query: Option<String>,
    pub page_size: Option<usize>,
    pub max_pages: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub fetch_details: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(ref q) = self.query {
            config.registry.query_term = q.clone();
        }
        if let Some(n) = self.page_size {
            config.registry.page_size = n;
        }
        if let Some(n) = self.max_pages {
            config.registry.max_pages = Some(n);
        }
        if let Some(ref dir) = self.output_dir {
            config.output.dir = dir.display().to_string();
        }
        if self.fetch_details {
            config.registry.fetch_details = true;
        }
    }
}

/// Resolve which file to read: an explicit path, then ABTOX_CONFIG, then
/// abtox.toml. Only the implicit default may be absent.
fn resolve_path(explicit: Option<&Path>) -> (PathBuf, bool) {
    if let Some(p) = explicit {
        return (p.to_path_buf(), true);
    }
    match std::env::var(CONFIG_ENV) {
        Ok(p) if !p.trim().is_empty() => (PathBuf::from(p), true),
        _ => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    }
}

/// Load, override and validate the run configuration.
/// Returns the config and the file it came from, if any.
pub fn load(explicit: Option<&Path>, overrides: &Overrides) -> anyhow::Result<(RunConfig, Option<PathBuf>)> {
    let (path, required) = resolve_path(explicit);

    let (mut config, source) = if path.exists() {
        let cfg = RunConfig::from_path(&path)
            .with_context(|| format!("loading config from {}", path.display()))?;
        (cfg, Some(path))
    } else if required {
        anyhow::bail!("Config file not found: {}", path.display());
    } else {
        (RunConfig::default(), None)
    };

    overrides.apply(&mut config);
    config.validate().context("invalid configuration after command-line overrides")?;
    Ok((config, source))
}

mod tests;
