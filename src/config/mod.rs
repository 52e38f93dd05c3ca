#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TaskdeckError;

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "TASKDECK_API_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub connect_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            connect_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub icons: bool,
    /// Seconds a success message stays on screen before auto-dismissal.
    pub success_message_secs: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            icons: true,
            success_message_secs: 3,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), TaskdeckError> {
        let url = self.api.base_url.trim();
        if url.is_empty() {
            return Err(TaskdeckError::Config(
                "api.base_url must not be empty".to_owned(),
            ));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TaskdeckError::Config(format!(
                "api.base_url must start with http:// or https:// (got '{url}')"
            )));
        }
        if self.api.connect_timeout_ms == 0 {
            return Err(TaskdeckError::Config(
                "api.connect_timeout_ms must be >= 1".to_owned(),
            ));
        }
        if self.ui.success_message_secs == 0 {
            return Err(TaskdeckError::Config(
                "ui.success_message_secs must be >= 1".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
}

pub fn default_paths() -> anyhow::Result<ConfigPaths> {
    let unix = home_config_path_unix();
    if !cfg!(windows) {
        return Ok(ConfigPaths { config_file: unix });
    }

    // Windows: prefer the Unix-style path if present for portability.
    if unix.exists() {
        return Ok(ConfigPaths { config_file: unix });
    }

    let proj = ProjectDirs::from("com", "taskdeck", "taskdeck")
        .context("failed to determine platform config directory")?;
    Ok(ConfigPaths {
        config_file: proj.config_dir().join("config.toml"),
    })
}

fn home_config_path_unix() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".config").join("taskdeck").join("config.toml")
}

fn home_dir() -> Option<PathBuf> {
    if let Some(v) = std::env::var_os("HOME") {
        return Some(PathBuf::from(v));
    }
    if let Some(v) = std::env::var_os("USERPROFILE") {
        return Some(PathBuf::from(v));
    }
    None
}

/// Resolved configuration: file (when present), then the environment
/// override, then env-var expansion inside the base URL.
pub fn load() -> anyhow::Result<Config> {
    let paths = default_paths()?;
    let mut cfg = load_from_file(&paths.config_file)?;
    apply_env_override(&mut cfg, std::env::var(API_URL_ENV).ok().as_deref());
    cfg.api.base_url = expand_env_vars(cfg.api.base_url.trim());
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_file(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let cfg: Config = toml::from_str(&raw)
        .with_context(|| format!("failed to deserialize TOML in {}", path.display()))?;
    Ok(cfg)
}

pub fn apply_env_override(cfg: &mut Config, value: Option<&str>) {
    if let Some(url) = value
        && !url.trim().is_empty()
    {
        cfg.api.base_url = url.trim().to_owned();
    }
}

fn expand_env_vars(input: &str) -> String {
    // Expand $VAR and ${VAR}. Leave unknown vars untouched.
    let Ok(re) = regex::Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?") else {
        return input.to_owned();
    };
    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let key = &caps[1];
        std::env::var(key).unwrap_or_else(|_| caps[0].to_owned())
    })
    .to_string()
}

pub fn list_resolved_toml() -> anyhow::Result<String> {
    let cfg = load()?;
    Ok(toml::to_string_pretty(&cfg)?)
}

pub fn get_value_string(key: &str) -> anyhow::Result<String> {
    let cfg = load()?;
    lookup_value(&cfg, key)
        .map(format_value_for_stdout)
        .ok_or_else(|| TaskdeckError::InvalidConfigKey(key.to_owned()).into())
}

fn lookup_value(cfg: &Config, key: &str) -> Option<serde_json::Value> {
    let mut v = serde_json::to_value(cfg).ok()?;
    for seg in key.split('.').filter(|s| !s.is_empty()) {
        match v {
            serde_json::Value::Object(mut map) => {
                v = map.remove(seg)?;
            }
            _ => return None,
        }
    }
    Some(v)
}

fn format_value_for_stdout(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_owned(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s,
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}
