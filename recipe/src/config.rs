//! Runtime configuration for extract-recipe.
//!
//! Resolves where the Claude Code data lives and where the user's pattern
//! override file is expected. Command-line flags override environment
//! variables, which override the defaults.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `EXTRACT_RECIPE_CLAUDE_DIR` | `~/.claude` | Claude Code directory (holds `history.jsonl` and `paste-cache/`) |
//! | `EXTRACT_RECIPE_CONFIG` | `~/.config/extract-recipe/patterns.conf` | Pattern override file |
//!
//! # Example
//!
//! ```no_run
//! use extract_recipe::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("History: {}", config.history_path().display());
//! ```

use std::env;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

/// Environment variable overriding the Claude Code directory.
pub const CLAUDE_DIR_ENV: &str = "EXTRACT_RECIPE_CLAUDE_DIR";

/// Environment variable overriding the pattern configuration path.
pub const CONFIG_PATH_ENV: &str = "EXTRACT_RECIPE_CONFIG";

/// Default Claude Code directory name relative to home.
const DEFAULT_CLAUDE_DIR: &str = ".claude";

/// Default pattern override location relative to home.
const DEFAULT_PATTERNS_PATH: &str = ".config/extract-recipe/patterns.conf";

/// History log file name inside the Claude directory.
const HISTORY_FILE: &str = "history.jsonl";

/// Paste cache directory name inside the Claude directory.
const PASTE_CACHE_DIR: &str = "paste-cache";

/// Errors that can occur while resolving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable has an unusable value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Claude Code directory containing `history.jsonl` and `paste-cache/`.
    pub claude_dir: PathBuf,

    /// Location of the user's pattern override file. It may not exist, in
    /// which case the packaged defaults are used.
    pub patterns_path: PathBuf,
}

impl Config {
    /// Creates a `Config` from environment variables and defaults.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - An `EXTRACT_RECIPE_*` variable is set but empty
    /// - The home directory cannot be determined (needed for default paths)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Optional: EXTRACT_RECIPE_CLAUDE_DIR (default: ~/.claude)
        let claude_dir = match path_from_env(CLAUDE_DIR_ENV)? {
            Some(path) => path,
            None => home_dir()?.join(DEFAULT_CLAUDE_DIR),
        };

        // Optional: EXTRACT_RECIPE_CONFIG (default: ~/.config/extract-recipe/patterns.conf)
        let patterns_path = match path_from_env(CONFIG_PATH_ENV)? {
            Some(path) => path,
            None => home_dir()?.join(DEFAULT_PATTERNS_PATH),
        };

        Ok(Self {
            claude_dir,
            patterns_path,
        })
    }

    /// Applies command-line overrides on top of this configuration.
    #[must_use]
    pub fn with_overrides(mut self, claude_dir: Option<PathBuf>, patterns_path: Option<PathBuf>) -> Self {
        if let Some(dir) = claude_dir {
            self.claude_dir = dir;
        }
        if let Some(path) = patterns_path {
            self.patterns_path = path;
        }
        self
    }

    /// Path to the prompt history log.
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.claude_dir.join(HISTORY_FILE)
    }

    /// Directory holding content-addressed paste files.
    #[must_use]
    pub fn paste_cache_dir(&self) -> PathBuf {
        self.claude_dir.join(PASTE_CACHE_DIR)
    }

    /// Path to the user's pattern override file.
    #[must_use]
    pub fn patterns_path(&self) -> &Path {
        &self.patterns_path
    }
}

fn home_dir() -> Result<PathBuf, ConfigError> {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDirectory)
}

fn path_from_env(key: &str) -> Result<Option<PathBuf>, ConfigError> {
    match env::var(key) {
        Ok(val) if val.trim().is_empty() => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "expected a path, got an empty string".to_string(),
        }),
        Ok(val) => Ok(Some(PathBuf::from(val))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Runs `f` with every `EXTRACT_RECIPE_*` variable removed, restoring
    /// them afterwards.
    fn with_clean_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let saved_vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with("EXTRACT_RECIPE_"))
            .collect();

        for (key, _) in &saved_vars {
            env::remove_var(key);
        }

        let result = f();

        for key in [CLAUDE_DIR_ENV, CONFIG_PATH_ENV] {
            env::remove_var(key);
        }
        for (key, value) in saved_vars {
            env::set_var(key, value);
        }

        result
    }

    #[test]
    #[serial]
    fn test_defaults() {
        with_clean_env(|| {
            let config = Config::from_env().expect("should resolve defaults");

            assert!(config.claude_dir.ends_with(DEFAULT_CLAUDE_DIR));
            assert!(config.patterns_path.ends_with("extract-recipe/patterns.conf"));
            assert!(config.history_path().ends_with(".claude/history.jsonl"));
            assert!(config.paste_cache_dir().ends_with(".claude/paste-cache"));
        });
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        with_clean_env(|| {
            env::set_var(CLAUDE_DIR_ENV, "/custom/claude");
            env::set_var(CONFIG_PATH_ENV, "/custom/patterns.conf");

            let config = Config::from_env().expect("should parse env config");

            assert_eq!(config.claude_dir, PathBuf::from("/custom/claude"));
            assert_eq!(config.patterns_path, PathBuf::from("/custom/patterns.conf"));
            assert_eq!(
                config.history_path(),
                PathBuf::from("/custom/claude/history.jsonl")
            );
        });
    }

    #[test]
    #[serial]
    fn test_empty_env_value_rejected() {
        with_clean_env(|| {
            env::set_var(CLAUDE_DIR_ENV, "  ");

            let err = Config::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, .. } if key == CLAUDE_DIR_ENV
            ));
        });
    }

    #[test]
    #[serial]
    fn test_cli_overrides_win_over_env() {
        with_clean_env(|| {
            env::set_var(CLAUDE_DIR_ENV, "/from/env");

            let config = Config::from_env()
                .expect("should parse env config")
                .with_overrides(Some(PathBuf::from("/from/flag")), None);

            assert_eq!(config.claude_dir, PathBuf::from("/from/flag"));
            assert!(config.patterns_path.ends_with("patterns.conf"));
        });
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            key: CONFIG_PATH_ENV.to_string(),
            message: "expected a path, got an empty string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for EXTRACT_RECIPE_CONFIG: expected a path, got an empty string"
        );
    }
}
