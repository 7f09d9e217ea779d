use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HubError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub page_size: u32,
    pub prefetch_threshold: usize,
    pub notice_ttl_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            prefetch_threshold: 3,
            notice_ttl_ms: 2000,
        }
    }
}

impl FeedConfig {
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }
}

/// Server-side filter for the home feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PopularConfig {
    pub min_stars: u64,
    pub pushed_within_days: i64,
}

impl Default for PopularConfig {
    fn default() -> Self {
        Self {
            min_stars: 10_000,
            pushed_within_days: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub token_env: Option<String>,
    pub token_command: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token_env: Some("GITHUB_TOKEN".to_string()),
            token_command: Some("gh auth token".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
    pub render_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 250,
            render_rate_ms: 16,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub popular: PopularConfig,
    pub github: GitHubConfig,
    pub ui: UiConfig,
    pub log_file: bool,
}

/// ~/.config/hubfeed/config.toml
pub fn config_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("hubfeed").join("config.toml"))
}

impl Config {
    /// Load the default config file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Config::default();
        };

        let Ok(content) = std::fs::read_to_string(&path) else {
            return Config::default();
        };

        Config::parse(&content).unwrap_or_default()
    }

    /// Load an explicitly requested config file. Unlike [`Config::load`] a
    /// missing or malformed file is an error.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HubError::Config(format!("{}: {}", path.display(), e)))?;
        Config::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| HubError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.feed.page_size == 0 {
            return Err(HubError::Config("feed.page_size must be positive".into()));
        }
        if self.feed.page_size > 100 {
            // GitHub caps per_page at 100
            return Err(HubError::Config("feed.page_size must be at most 100".into()));
        }
        if self.popular.pushed_within_days < 0 {
            return Err(HubError::Config(
                "popular.pushed_within_days must not be negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
log_file = true

[feed]
page_size = 30
prefetch_threshold = 5
notice_ttl_ms = 1500

[popular]
min_stars = 500
pushed_within_days = 7

[github]
token_env = "HUBFEED_TOKEN"

[ui]
tick_rate_ms = 100
"#;
        let config = Config::parse(toml_str).unwrap();
        assert!(config.log_file);
        assert_eq!(config.feed.page_size, 30);
        assert_eq!(config.feed.prefetch_threshold, 5);
        assert_eq!(config.feed.notice_ttl(), Duration::from_millis(1500));
        assert_eq!(config.popular.min_stars, 500);
        assert_eq!(config.popular.pushed_within_days, 7);
        assert_eq!(config.github.token_env.as_deref(), Some("HUBFEED_TOKEN"));
        // Unset keys inside a present section keep their defaults
        assert_eq!(config.github.token_command.as_deref(), Some("gh auth token"));
        assert_eq!(config.ui.tick_rate_ms, 100);
        assert_eq!(config.ui.render_rate_ms, 16);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.feed.page_size, 20);
        assert_eq!(config.feed.prefetch_threshold, 3);
        assert_eq!(config.popular.min_stars, 10_000);
        assert_eq!(config.popular.pushed_within_days, 3);
        assert!(!config.log_file);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = Config::parse("[feed]\npage_size = 0\n").unwrap_err();
        assert!(matches!(err, HubError::Config(_)));
    }

    #[test]
    fn oversized_page_is_rejected() {
        assert!(Config::parse("[feed]\npage_size = 101\n").is_err());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Config::parse("[feed\npage_size = ").unwrap_err();
        assert!(matches!(err, HubError::Config(_)));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_path(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, HubError::Config(_)));
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[feed]\npage_size = 50\n").unwrap();
        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.feed.page_size, 50);
    }
}
