//! Settings file parser for ~/.config/plaintextfeeds/config.toml.
//!
//! The settings file is optional: a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde, though we log a warning when
//! the file contains potential typos.
//!
//! The feed list itself is a separate plain-text file, see
//! [`crate::feed::load_feed_list`].
use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The feed list is missing or unreadable. Fatal: nothing is fetched.
    #[error("Failed to read feed list '{}': {source}", path.display())]
    FeedList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level settings.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed list location. `None` means `~/.plaintextfeeds`.
    pub feeds_file: Option<PathBuf>,

    /// Seen-entry state location. `None` means `~/.plaintextfeeds.seen.json`.
    pub state_file: Option<PathBuf>,

    /// Deadline for one feed, covering the request and the body read.
    pub timeout_secs: u64,

    /// Largest feed body accepted, in bytes.
    pub max_feed_bytes: u64,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// strftime format for entry dates in the digest.
    pub date_format: String,

    /// Whether to end the digest with the list of feeds that had nothing new.
    pub list_unchanged_feeds: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds_file: None,
            state_file: None,
            timeout_secs: 30,
            max_feed_bytes: 10 * 1024 * 1024,
            user_agent: concat!("plaintextfeeds/", env!("CARGO_PKG_VERSION")).to_string(),
            date_format: "%d %B %Y at %H:%M:%S".to_string(),
            list_unchanged_feeds: true,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "feeds_file",
        "state_file",
        "timeout_secs",
        "max_feed_bytes",
        "user_agent",
        "date_format",
        "list_unchanged_feeds",
    ];

    /// Load settings from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
    /// - Out-of-range values or a bad `date_format` → `Err(ConfigError::InvalidValue)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_feed_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_feed_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        // chrono panics when formatting with an invalid specifier, so reject it up front
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidValue {
                key: "date_format",
                reason: format!("'{}' is not a valid strftime format", self.date_format),
            });
        }
        Ok(())
    }

    /// Feed list path: the configured one, or `~/.plaintextfeeds`.
    pub fn feeds_path(&self, home: &Path) -> PathBuf {
        self.feeds_file
            .as_deref()
            .map(|p| expand_home(p, home))
            .unwrap_or_else(|| home.join(".plaintextfeeds"))
    }

    /// State path: the configured one, or `~/.plaintextfeeds.seen.json`.
    pub fn state_path(&self, home: &Path) -> PathBuf {
        self.state_file
            .as_deref()
            .map(|p| expand_home(p, home))
            .unwrap_or_else(|| home.join(".plaintextfeeds.seen.json"))
    }

    /// Resolves the feed list and state paths for a run.
    ///
    /// Paths given on the command line win over the settings file, which
    /// wins over the defaults in `home`.
    pub fn resolve_paths(
        &self,
        cli_feeds: Option<PathBuf>,
        cli_state: Option<PathBuf>,
        home: &Path,
    ) -> (PathBuf, PathBuf) {
        (
            cli_feeds.unwrap_or_else(|| self.feeds_path(home)),
            cli_state.unwrap_or_else(|| self.state_path(home)),
        )
    }
}

/// Replaces a leading `~` component with `home`.
pub fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

// ============================================================================
// Tests
// ============================================================================
