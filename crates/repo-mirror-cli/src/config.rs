use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// GitHub token. The `GITHUB_TOKEN` environment variable wins over this.
    pub token: Option<String>,
    /// Fetch/write units in flight per mirror.
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub mirrors: Vec<MirrorEntry>,
}

/// One remote directory mirrored into one local directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirrorEntry {
    pub label: String,
    pub owner: String,
    pub repo: String,
    /// Omitted means the repository's default branch.
    pub branch: Option<String>,
    pub remote_path: String,
    /// Local directory; a leading `~/` expands to the home directory.
    pub local_path: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub delete_stale: bool,
}

fn default_true() -> bool {
    true
}

impl MirrorEntry {
    /// The local directory with `~/` expanded.
    pub fn resolved_local_path(&self) -> PathBuf {
        expand_home(&self.local_path, dirs::home_dir().as_deref())
    }
}

fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Config file path: `~/.config/repo-mirror/mirrors.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("repo-mirror").join("mirrors.toml"))
}

/// Load config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path().context("could not determine config directory")?,
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;

    toml::from_str(&contents).with_context(|| format!("failed to parse config at {}", path.display()))
}

/// Environment token first, then the configured one.
pub fn github_token(config: &AppConfig) -> Option<String> {
    std::env::var("GITHUB_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
        .or_else(|| config.token.clone())
}
