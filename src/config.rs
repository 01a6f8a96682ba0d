use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const APP_DIR: &str = "it-news";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedSource,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Spreadsheet the news rows are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub sheet_id: String,

    #[serde(default = "default_range")]
    pub range: String,

    pub api_key: Option<String>,

    #[serde(default = "default_recommended_marker")]
    pub recommended_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,

    pub api_key: Option<String>,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_app_id")]
    pub app_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Token-derived user id. Anonymous sign-in is used when unset.
    pub user_id: Option<String>,
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_range() -> String {
    "news".to_string()
}

fn default_recommended_marker() -> String {
    "추천".to_string()
}

fn default_completion_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        .to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("store.db").to_string_lossy().to_string()
}

fn default_app_id() -> String {
    "it-news-app-preview".to_string()
}

impl Default for FeedSource {
    fn default() -> Self {
        Self {
            base_url: default_sheets_base_url(),
            sheet_id: String::new(),
            range: default_range(),
            api_key: None,
            recommended_marker: default_recommended_marker(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_endpoint(),
            api_key: None,
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            app_id: default_app_id(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Reads the config at `path`, writing a default one first if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.completion.max_attempts == 0 {
            return Err(AppError::Config(
                "completion.max_attempts must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("feed.base_url", &self.feed.base_url),
            ("completion.endpoint", &self.completion.endpoint),
        ] {
            url::Url::parse(value)
                .map_err(|e| AppError::Config(format!("{name} is not a valid URL: {e}")))?;
        }
        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.completion.max_attempts, 3);
        assert_eq!(config.feed.range, "news");
        assert_eq!(config.store.app_id, "it-news-app-preview");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[feed]\nsheet_id = \"abc\"\napi_key = \"k\"\n\n[identity]\nuser_id = \"u-1\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.feed.sheet_id, "abc");
        assert_eq!(config.feed.api_key.as_deref(), Some("k"));
        assert_eq!(config.feed.recommended_marker, "추천");
        assert_eq!(config.completion.base_backoff_ms, 1000);
        assert_eq!(config.identity.user_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[completion]\nmax_attempts = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));
    }
}
