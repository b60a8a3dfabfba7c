//! Application configuration for the IOD schema extractor.
//!
//! User config lives at `~/.iodschema/iodschema.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "iodschema.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".iodschema";

// ---------------------------------------------------------------------------
// Config structs (matching iodschema.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the standard's DocBook sources come from.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Output file locations.
    #[serde(default)]
    pub output: OutputConfig,

    /// HTTP retrieval settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// `[sources]` section. Each value is a URL or a local file path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// PS3.3 (information object definitions).
    #[serde(default = "default_part03")]
    pub part03: String,

    /// PS3.6 (data dictionary).
    #[serde(default = "default_part06")]
    pub part06: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            part03: default_part03(),
            part06: default_part06(),
        }
    }
}

fn default_part03() -> String {
    "http://dicom.nema.org/medical/dicom/current/source/docbook/part03/part03.xml".into()
}
fn default_part06() -> String {
    "http://dicom.nema.org/medical/dicom/current/source/docbook/part06/part06.xml".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the IOD/module schema is written.
    #[serde(default = "default_iods_path")]
    pub iods_path: String,

    /// Where the parsed data dictionary is cached.
    #[serde(default = "default_dictionary_path")]
    pub dictionary_path: String,

    /// Pretty-print JSON output.
    #[serde(default)]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            iods_path: default_iods_path(),
            dictionary_path: default_dictionary_path(),
            pretty: false,
        }
    }
}

fn default_iods_path() -> String {
    "IODs.json".into()
}
fn default_dictionary_path() -> String {
    "data-dictionary.json".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout. The standard's parts are tens of megabytes.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.iodschema/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| SchemaError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.iodschema/iodschema.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SchemaError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SchemaError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SchemaError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SchemaError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
