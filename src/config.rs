use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub forms: FormsConfig,
    #[serde(default)]
    pub data: DataConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub hooks: HooksConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FormsConfig {
    /// Directory scanned for `*.form.toml` category definition files.
    #[serde(default = "default_forms_dir")]
    pub dir: PathBuf,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            dir: default_forms_dir(),
        }
    }
}

fn default_forms_dir() -> PathBuf {
    PathBuf::from("./content/forms")
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    /// Directory holding one JSON array file per category.
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./content/forms_data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    /// SQLite file backing the derived metadata search index.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HooksConfig {
    /// Upper bound on a single hook invocation, in seconds.
    #[serde(default = "default_hook_timeout")]
    pub timeout_secs: u64,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_hook_timeout(),
        }
    }
}

fn default_hook_timeout() -> u64 {
    10
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.hooks.timeout_secs == 0 {
        anyhow::bail!("hooks.timeout_secs must be > 0");
    }

    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    Ok(config)
}
