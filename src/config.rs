//! Configuration file handling with TOML support.

use crate::api::{DEFAULT_LOOKBACK_DAYS, DEFAULT_NEWS_LIMIT, RateLimitDetector};
use crate::view::FetchOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Stock API client settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Search flow settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Detail view settings
    #[serde(default)]
    pub detail: DetailConfig,

    /// REST backend settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Stock API client settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

/// Search flow settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Substrings that mark an upstream error as a quota refusal
    #[serde(default = "default_rate_limit_markers")]
    pub rate_limit_markers: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rate_limit_markers: default_rate_limit_markers(),
        }
    }
}

fn default_rate_limit_markers() -> Vec<String> {
    vec!["request allocation".to_string(), "rate limit".to_string()]
}

/// Detail view settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DetailConfig {
    /// Lookback window for enhanced metrics, in days
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Number of news articles to request
    #[serde(default = "default_news_limit")]
    pub news_limit: u32,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            news_limit: default_news_limit(),
        }
    }
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}
fn default_news_limit() -> u32 {
    DEFAULT_NEWS_LIMIT
}

/// REST backend settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from default location or create default.
    pub fn load_or_default() -> Self {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        warn!(error = %e, "Failed to load config");
                    }
                }
            }
        }
        Config::default()
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stock-researcher").join("config.toml"))
    }

    /// The API base URL, preferring an explicit override. Blank values count as unset.
    pub fn api_url(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .or(self.api.base_url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }

    /// Request timeout, preferring an explicit override in seconds.
    pub fn timeout(&self, explicit: Option<u64>) -> Duration {
        Duration::from_secs(explicit.unwrap_or(self.api.timeout))
    }

    pub fn rate_limit_detector(&self) -> RateLimitDetector {
        RateLimitDetector::new(&self.search.rate_limit_markers)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            lookback_days: self.detail.lookback_days,
            news_limit: self.detail.news_limit,
        }
    }
}

/// Generate a sample configuration file content.
pub fn sample_config() -> &'static str {
    r##"# Stock Researcher Configuration File

[api]
# Base URL of the stock API, including the /api prefix
base_url = "http://localhost:5000/api"
# Request timeout in seconds
timeout = 10

[search]
# Upstream error text containing any of these marks a rate-limit refusal
rate_limit_markers = ["request allocation", "rate limit"]

[detail]
# Lookback window for enhanced metrics, in days
lookback_days = 180
# Number of news articles to request
news_limit = 10

[server]
bind = "0.0.0.0"
port = 5000
"##
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(sample_config()).unwrap();
        assert_eq!(config.api.base_url.as_deref(), Some("http://localhost:5000/api"));
        assert_eq!(config.detail, DetailConfig::default());
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.search, SearchConfig::default());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[api]\ntimeout = 3\n").unwrap();
        assert_eq!(config.api.timeout, 3);
        assert!(config.api.base_url.is_none());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.detail.lookback_days, 180);
    }

    #[test]
    fn test_api_url_precedence() {
        let mut config = Config::default();
        assert_eq!(config.api_url(None), None);

        config.api.base_url = Some("http://file/api".to_string());
        assert_eq!(config.api_url(None).as_deref(), Some("http://file/api"));
        assert_eq!(config.api_url(Some("http://flag/api")).as_deref(), Some("http://flag/api"));

        config.api.base_url = Some("   ".to_string());
        assert_eq!(config.api_url(None), None);
    }

    #[test]
    fn test_timeout_override() {
        let config = Config::default();
        assert_eq!(config.timeout(None), Duration::from_secs(10));
        assert_eq!(config.timeout(Some(2)), Duration::from_secs(2));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "stock-researcher-config-{}.toml",
            std::process::id()
        ));
        fs::write(&path, "[api]\nbase_url = \"http://saved/api\"\n\n[detail]\nnews_limit = 4\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.api_url(None).as_deref(), Some("http://saved/api"));
        assert_eq!(loaded.detail.news_limit, 4);
        assert_eq!(loaded.detail.lookback_days, 180);

        let _ = fs::remove_file(&path);
    }
}
