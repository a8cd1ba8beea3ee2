//! Configuration management for yamltrail.
//!
//! Configuration is loaded from multiple sources and merged, later sources
//! overriding earlier ones field by field:
//! 1. Global config: `~/.config/yamltrail/config.json`
//! 2. Environment variable: `YAMLTRAIL_CONFIG_CONTENT`
//! 3. Project config: `yamltrail.json` in the repository root

use crate::error::{ConfigError, HistoryResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use yamltrail_snapshot::StoreConfig;
use yamltrail_util::LogLevel;

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "yamltrail.json";

/// Environment variable holding inline JSON config.
pub const CONFIG_CONTENT_ENV: &str = "YAMLTRAIL_CONFIG_CONTENT";

const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level ("trace" .. "error").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Snapshot store settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreSettings>,

    /// History scan settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistorySettings>,

    /// Restore settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore: Option<RestoreSettings>,
}

/// Snapshot store settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Deadline for each store call, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Author name for recorded commits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    /// Author email for recorded commits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
}

/// History scan settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Buffered versions between a running scan and its consumer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_capacity: Option<usize>,

    /// Stop walking after this many commits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_commits: Option<usize>,
}

/// Restore settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreSettings {
    /// Treat an unparseable live document as empty instead of failing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_unreadable: Option<bool>,
}

impl StoreSettings {
    fn merge(mut self, other: Self) -> Self {
        if other.timeout_ms.is_some() {
            self.timeout_ms = other.timeout_ms;
        }
        if other.author_name.is_some() {
            self.author_name = other.author_name;
        }
        if other.author_email.is_some() {
            self.author_email = other.author_email;
        }
        self
    }
}

impl HistorySettings {
    fn merge(mut self, other: Self) -> Self {
        if other.channel_capacity.is_some() {
            self.channel_capacity = other.channel_capacity;
        }
        if other.max_commits.is_some() {
            self.max_commits = other.max_commits;
        }
        self
    }
}

impl RestoreSettings {
    fn merge(mut self, other: Self) -> Self {
        if other.replace_unreadable.is_some() {
            self.replace_unreadable = other.replace_unreadable;
        }
        self
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Returns the merged config and the files it was read from.
    pub async fn load(project_dir: Option<&Path>) -> HistoryResult<(Self, Vec<PathBuf>)> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        if let Some(global_dir) = yamltrail_util::path::config_dir() {
            let path = global_dir.join("config.json");
            if path.exists() {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        if let Ok(content) = std::env::var(CONFIG_CONTENT_ENV) {
            config = config.merge(Self::parse(&content, "<env>")?);
        }

        if let Some(dir) = project_dir {
            let path = dir.join(PROJECT_CONFIG_FILE);
            if path.exists() {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        config.validate()?;
        tracing::debug!(sources = sources.len(), "Loaded configuration");
        Ok((config, sources))
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> HistoryResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse configuration JSON.
    pub fn parse(content: &str, source: &str) -> HistoryResult<Self> {
        serde_json::from_str(content).map_err(|e| {
            ConfigError::InvalidJson {
                path: source.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Merge with another config, preferring values from `other` when set.
    pub fn merge(self, other: Self) -> Self {
        Self {
            log_level: other.log_level.or(self.log_level),
            store: merge_section(self.store, other.store, StoreSettings::merge),
            history: merge_section(self.history, other.history, HistorySettings::merge),
            restore: merge_section(self.restore, other.restore, RestoreSettings::merge),
        }
    }

    /// Reject values that would make the engine unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.log_level {
            if LogLevel::parse(level).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "log_level".to_string(),
                    message: format!("unknown level '{level}'"),
                });
            }
        }
        if self.store.as_ref().and_then(|s| s.timeout_ms) == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "store.timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.history.as_ref().and_then(|h| h.channel_capacity) == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "history.channel_capacity".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Store settings with defaults applied.
    pub fn store_config(&self) -> StoreConfig {
        let defaults = StoreConfig::default();
        let store = self.store.clone().unwrap_or_default();
        StoreConfig {
            timeout: Duration::from_millis(store.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
            author_name: store.author_name.unwrap_or(defaults.author_name),
            author_email: store.author_email.unwrap_or(defaults.author_email),
        }
    }

    pub fn channel_capacity(&self) -> usize {
        self.history
            .as_ref()
            .and_then(|h| h.channel_capacity)
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY)
            .max(1)
    }

    pub fn max_commits(&self) -> Option<usize> {
        self.history.as_ref().and_then(|h| h.max_commits)
    }

    pub fn replace_unreadable(&self) -> bool {
        self.restore
            .as_ref()
            .and_then(|r| r.replace_unreadable)
            .unwrap_or(false)
    }
}

fn merge_section<T>(base: Option<T>, other: Option<T>, merge: fn(T, T) -> T) -> Option<T> {
    match (base, other) {
        (Some(b), Some(o)) => Some(merge(b, o)),
        (b, None) => b,
        (None, o) => o,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = Config::parse(
            r#"{ "log_level": "debug", "store": { "timeout_ms": 500 } }"#,
            "test",
        )
        .unwrap();
        assert_eq!(config.log_level(), Some(LogLevel::Debug));
        assert_eq!(config.store_config().timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_json_names_source() {
        let err = Config::parse("{ nope", "yamltrail.json").unwrap_err();
        assert!(err.to_string().contains("yamltrail.json"));
    }

    #[test]
    fn test_merge_config() {
        let base = Config {
            log_level: Some("info".into()),
            store: Some(StoreSettings {
                timeout_ms: Some(1000),
                author_name: Some("base".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let other = Config {
            store: Some(StoreSettings {
                timeout_ms: Some(2000),
                ..Default::default()
            }),
            restore: Some(RestoreSettings {
                replace_unreadable: Some(true),
            }),
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.log_level.as_deref(), Some("info"));
        let store = merged.store.clone().unwrap();
        assert_eq!(store.timeout_ms, Some(2000));
        assert_eq!(store.author_name.as_deref(), Some("base"));
        assert!(merged.replace_unreadable());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.channel_capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.max_commits(), None);
        assert!(!config.replace_unreadable());
        assert_eq!(
            config.store_config().timeout,
            Duration::from_millis(DEFAULT_TIMEOUT_MS)
        );
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = Config::parse(r#"{ "store": { "timeout_ms": 0 } }"#, "test").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_project_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            r#"{ "history": { "max_commits": 50 } }"#,
        )
        .unwrap();

        let (config, sources) = Config::load(Some(dir.path())).await.unwrap();
        assert_eq!(config.max_commits(), Some(50));
        assert!(sources.contains(&dir.path().join(PROJECT_CONFIG_FILE)));
    }
}
