//! Run configuration for an extraction run.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! runnable configuration. Files may be TOML, YAML or JSON; the format is
//! picked from the extension.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AbtoxError, Result};

/// Complete configuration for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Upstream registry and pagination settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Antibody-trial detection policy
    #[serde(default)]
    pub filter: FilterConfig,

    /// Output tables
    #[serde(default)]
    pub output: OutputConfig,
}

// ── Registry ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryConfig {
    /// Studies search endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Term sent as `query.term` on the first page only
    #[serde(default = "default_query_term")]
    pub query_term: String,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Stop after this many pages (None = follow the cursor to the end)
    #[serde(default)]
    pub max_pages: Option<usize>,

    /// Pause between page fetches, to respect upstream rate limits
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Fetch `/studies/{nctId}` for kept trials whose search payload has no results section
    #[serde(default)]
    pub fetch_details: bool,

    /// Worker pool size for detail fetches
    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,
}

fn default_base_url() -> String { "https://clinicaltrials.gov/api/v2/studies".to_string() }
fn default_query_term() -> String { "antibody".to_string() }
fn default_page_size() -> usize { 100 }
fn default_page_delay_ms() -> u64 { 250 }
fn default_timeout_secs() -> u64 { 60 }
fn default_user_agent() -> String { crate::sandbox::DEFAULT_USER_AGENT.to_string() }
fn default_detail_concurrency() -> usize { 4 }

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            query_term: default_query_term(),
            page_size: default_page_size(),
            max_pages: None,
            page_delay_ms: default_page_delay_ms(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            fetch_details: false,
            detail_concurrency: default_detail_concurrency(),
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

// ── Filter policy ─────────────────────────────────────────────────────────────

/// Tunable boundary of the antibody-trial heuristic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterConfig {
    /// Declared intervention types accepted as therapeutic (case-insensitive)
    #[serde(default = "default_therapeutic_types")]
    pub therapeutic_types: Vec<String>,

    /// Accept a strict `…mab` name regardless of declared type
    #[serde(default = "default_true")]
    pub mab_suffix_overrides_type: bool,
}

fn default_therapeutic_types() -> Vec<String> {
    vec!["drug".to_string(), "biological".to_string()]
}
fn default_true() -> bool { true }

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            therapeutic_types: default_therapeutic_types(),
            mab_suffix_overrides_type: true,
        }
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Directory the tables are written to
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Categories listed per intervention in the top-categories table
    #[serde(default = "default_top_n")]
    pub top_n_categories: usize,

    /// Also write the plain-text run digest
    #[serde(default = "default_true")]
    pub write_digest: bool,
}

fn default_output_dir() -> String { "data".to_string() }
fn default_top_n() -> usize { 5 }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            top_n_categories: default_top_n(),
            write_digest: true,
        }
    }
}

// ── Helper Methods ─────────────────────────────────────────────────────────────

impl RunConfig {
    /// Load from a TOML, YAML or JSON file, chosen by extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let config: Self = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| AbtoxError::Config(format!("{}: {e}", path.display())))?,
            "json" => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)
                .map_err(|e| AbtoxError::Config(format!("{}: {e}", path.display())))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let r = &self.registry;
        if r.page_size == 0 || r.page_size > 1000 {
            return Err(AbtoxError::Config(format!(
                "registry.page_size must be in 1..=1000, got {}",
                r.page_size
            )));
        }
        if r.max_pages == Some(0) {
            return Err(AbtoxError::Config("registry.max_pages must be at least 1".into()));
        }
        if r.timeout_secs == 0 {
            return Err(AbtoxError::Config("registry.timeout_secs must be at least 1".into()));
        }
        if r.detail_concurrency == 0 {
            return Err(AbtoxError::Config("registry.detail_concurrency must be at least 1".into()));
        }
        if r.query_term.trim().is_empty() {
            return Err(AbtoxError::Config("registry.query_term must not be empty".into()));
        }
        Ok(())
    }

    pub fn page_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.registry.page_delay_ms)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
