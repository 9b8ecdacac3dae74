use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::filter::DEFAULT_PAGE_SIZE;
use crate::{Error, Result};

pub const API_URL_ENV: &str = "POKEDEX_API_URL";
pub const API_KEY_ENV: &str = "POKEDEX_API_KEY";

/// Main configuration structure
///
/// This gets loaded from config file, env vars, and CLI args.
/// Priority: CLI > Env > File > Defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load config from the default location; a missing file means defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = self.to_toml()?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// `<config dir>/pokedex/config.toml` - XDG on Linux, AppData on Windows
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| Error::Config("Could not find config directory".into()))?;
        Ok(dir.join("pokedex").join("config.toml"))
    }

    /// `<cache dir>/pokedex/snapshots.db`
    pub fn snapshot_path() -> Result<PathBuf> {
        let dir = dirs::cache_dir().ok_or_else(|| Error::Config("Could not find cache directory".into()))?;
        Ok(dir.join("pokedex").join("snapshots.db"))
    }

    /// Layer `POKEDEX_API_URL` / `POKEDEX_API_KEY` over the file values
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(API_KEY_ENV).ok(),
        );
    }

    /// Layer explicit values (CLI flags, env) on top; empty strings are ignored
    pub fn apply_overrides(&mut self, base_url: Option<String>, api_key: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api.api_key = Some(key);
        }
    }

    /// Reject values that would only blow up later
    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!("api.base_url must be an http(s) URL, got '{}'", url)));
        }
        if self.api.timeout_secs == 0 {
            return Err(Error::Config("api.timeout_secs must be at least 1".into()));
        }
        crate::pagination::validate_page_size(self.ui.page_size)
            .map_err(|e| Error::Config(format!("ui.page_size: {}", e)))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as `x-api-key` on create/update/delete
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries for reads; mutations are never retried
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    pokedex_api::DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds a fetched page or record is served without refetching
    #[serde(default = "default_stale_secs")]
    pub stale_secs: u64,

    /// Keep last-known-good pages in SQLite
    #[serde(default = "default_snapshot_enabled")]
    pub snapshot_enabled: bool,

    /// Skip the backend and use the built-in demo data
    #[serde(default)]
    pub offline_mode: bool,
}

fn default_stale_secs() -> u64 {
    30
}

fn default_snapshot_enabled() -> bool {
    true
}

impl CacheConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_secs: default_stale_secs(),
            snapshot_enabled: default_snapshot_enabled(),
            offline_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Quiet period before a typed search is sent
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Names may only contain letters, spaces, hyphens and apostrophes
    #[serde(default = "default_true")]
    pub strict_names: bool,

    /// Enable mouse support in TUI
    #[serde(default = "default_true")]
    pub mouse_enabled: bool,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl UiConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            debounce_ms: default_debounce_ms(),
            strict_names: true,
            mouse_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:3001/api");
        assert_eq!(config.cache.stale_secs, 30);
        assert_eq!(config.ui.debounce_ms, 300);
        assert!(config.ui.strict_names);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            api_key = "secret"

            [ui]
            page_size = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.api.max_retries, 3);
        assert_eq!(config.ui.page_size, 20);
        assert!(config.cache.snapshot_enabled);
    }

    #[test]
    fn test_zero_retries_accepted() {
        let config: Config = toml::from_str(
            r#"
            [api]
            max_retries = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.api.max_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = Config::default();
        config.api.api_key = Some("from-file".into());

        config.apply_overrides(Some("https://pokedex.example/api".into()), Some(String::new()));
        assert_eq!(config.api.base_url, "https://pokedex.example/api");
        assert_eq!(config.api.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.api.base_url = "localhost:3001".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ui.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.cache.offline_mode = true;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
        assert_eq!(Config::load_from(&dir.path().join("missing.toml")).unwrap(), Config::default());
    }
}
