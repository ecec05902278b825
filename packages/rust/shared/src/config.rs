//! Application configuration for halopub.
//!
//! User config lives at `~/.halopub/halopub.toml`.
//! CLI flags (and their env vars) override config file values, which override defaults.
//! The bearer token itself is never written to disk; the file only names the
//! environment variable that holds it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{HaloPubError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "halopub.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".halopub";

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8090";

/// Path of the legacy, non-aggregated API under the base URL.
const LEGACY_API_PATH: &str = "/api/v1alpha1";

/// Path of the console API group under the base URL.
const CONSOLE_API_PATH: &str = "/apis/api.console.halo.run/v1alpha1";

// ---------------------------------------------------------------------------
// Config structs (matching halopub.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend connection settings.
    #[serde(default)]
    pub halo: HaloSection,
}

/// `[halo]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaloSection {
    /// Backend base URL, e.g. `https://blog.example.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the bearer token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for HaloSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_token_env() -> String {
    "HALO_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Runtime connection config (merged from config file + CLI flags)
// ---------------------------------------------------------------------------

/// Values supplied on the command line or through their env vars.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

/// Resolved backend connection: where to send requests and how to authenticate.
#[derive(Clone)]
pub struct HaloConfig {
    base_url: String,
    token: String,
}

impl std::fmt::Debug for HaloConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaloConfig")
            .field("base_url", &self.base_url)
            .field("token", &if self.has_token() { "<redacted>" } else { "<none>" })
            .finish()
    }
}

impl HaloConfig {
    /// Build a connection config, validating the base URL.
    ///
    /// Trailing slashes are trimmed so paths can be appended verbatim.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed)
            .map_err(|e| HaloPubError::config(format!("invalid base URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HaloPubError::config(format!(
                "base URL '{base_url}' must use http or https"
            )));
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            token: token.into(),
        })
    }

    /// Merge overrides, the config file and the environment.
    ///
    /// `env` looks up environment variables; it is a parameter so the merge
    /// can be exercised without touching the process environment.
    pub fn resolve(
        app: &AppConfig,
        overrides: &ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let base_url = overrides
            .base_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&app.halo.base_url);

        let token = overrides
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| env(&app.halo.token_env).filter(|t| !t.is_empty()))
            .unwrap_or_default();

        if token.is_empty() {
            tracing::warn!(
                token_env = %app.halo.token_env,
                "no bearer token configured, requests will be unauthenticated"
            );
        }

        Self::new(base_url, token)
    }

    /// Backend base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Prefix for paths outside the `/apis/` aggregated namespace.
    pub fn api_url(&self) -> String {
        format!("{}{LEGACY_API_PATH}", self.base_url)
    }

    /// Prefix for console-API endpoints.
    pub fn console_api_url(&self) -> String {
        format!("{}{CONSOLE_API_PATH}", self.base_url)
    }

    /// Public URL under which a post with `slug` is served.
    pub fn archive_url(&self, slug: &str) -> String {
        format!("{}/archives/{slug}", self.base_url)
    }

    /// Whether a non-empty token is configured.
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Headers attached to every backend request.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", format!("Bearer {}", self.token)),
            ("Content-Type", "application/json".to_string()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.halopub/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| HaloPubError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.halopub/halopub.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HaloPubError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| HaloPubError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
///
/// An existing file is left untouched unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    init_config_in(&config_dir()?, force)
}

/// [`init_config`] against an explicit directory.
pub fn init_config_in(dir: &Path, force: bool) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() && !force {
        return Err(HaloPubError::config(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )));
    }

    std::fs::create_dir_all(dir).map_err(|e| HaloPubError::io(dir, e))?;
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| HaloPubError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| HaloPubError::io(&path, e))?;
    tracing::info!(?path, overwritten = force, "wrote default config file");

    Ok(path)
}
