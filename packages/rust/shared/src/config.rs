//! Application configuration for compenrich.
//!
//! Lookup order: an explicit `--config` path, then `./compenrich.toml`
//! (project-local, kept out of version control), then
//! `~/.compenrich/compenrich.toml`, then built-in defaults.
//! CLI flags override config file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompenrichError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "compenrich.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".compenrich";

// ---------------------------------------------------------------------------
// Config structs (matching compenrich.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input/output defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Completion API settings.
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Input table location.
    #[serde(default = "default_input_path")]
    pub input_path: String,

    /// Output JSON array location.
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Single-byte field delimiter of the input table.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_path: default_output_path(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_input_path() -> String {
    "toll_manufacture.csv".into()
}
fn default_output_path() -> String {
    "final_chemexpo_data.json".into()
}
fn default_delimiter() -> char {
    ','
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Inline API key. Only for untracked, project-local config files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.perplexity.ai".into()
}
fn default_model() -> String {
    "sonar-pro".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.compenrich/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CompenrichError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.compenrich/compenrich.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Path of the project-local config file in the working directory.
pub fn local_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Load the application config.
///
/// An explicit path must exist. Otherwise the first existing file of
/// `./compenrich.toml` and the user config is used, or defaults if neither
/// exists.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return load_config_from(path);
    }

    let local = local_config_path();
    if local.exists() {
        return load_config_from(&local);
    }

    let user = config_file_path()?;
    if user.exists() {
        return load_config_from(&user);
    }

    tracing::debug!("no config file found, using defaults");
    Ok(AppConfig::default())
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CompenrichError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CompenrichError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CompenrichError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CompenrichError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CompenrichError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the API key: the configured env var first, then the inline key.
pub fn resolve_api_key(config: &CompletionConfig) -> Result<String> {
    let var_name = &config.api_key_env;
    if let Ok(val) = std::env::var(var_name) {
        if !val.trim().is_empty() {
            return Ok(val);
        }
    }

    match config.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(key.to_string()),
        _ => Err(CompenrichError::config(format!(
            "API key not found. Set the {var_name} environment variable \
             or `api_key` under [completion] in ./{CONFIG_FILE_NAME}"
        ))),
    }
}
