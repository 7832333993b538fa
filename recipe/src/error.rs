//! Error types for extract-recipe.
//!
//! Each pipeline stage owns a focused error enum; [`RecipeError`] gathers
//! them so callers that drive the whole pipeline can use a single `?`.
//!
//! Only some failures are fatal. A malformed history line
//! ([`HistoryParseError`](crate::history::HistoryParseError)) or a missing
//! paste cache file ([`PasteError`](crate::paste::PasteError)) is recovered
//! where it happens and surfaces as a warning, never as a `RecipeError`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::history::HistoryError;
use crate::patterns::PatternError;

/// Errors that abort a recipe extraction run.
///
/// # Examples
///
/// ```no_run
/// use extract_recipe::config::Config;
/// use extract_recipe::error::Result;
///
/// fn run() -> Result<usize> {
///     let config = Config::from_env()?;
///     let (_patterns, history) = extract_recipe::load_sources(&config)?;
///     Ok(history.entries.len())
/// }
/// ```
#[derive(Error, Debug)]
pub enum RecipeError {
    /// Runtime configuration could not be resolved.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The history log could not be loaded.
    #[error("history error: {0}")]
    History(#[from] HistoryError),

    /// The pattern configuration could not be loaded or initialised.
    #[error("pattern configuration error: {0}")]
    Patterns(#[from] PatternError),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for recipe extraction.
pub type Result<T> = std::result::Result<T, RecipeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn config_error_display() {
        let err = RecipeError::Config(ConfigError::NoHomeDirectory);
        assert_eq!(
            err.to_string(),
            "configuration error: failed to determine home directory"
        );
    }

    #[test]
    fn history_source_not_found_display() {
        let err: RecipeError =
            HistoryError::SourceNotFound(PathBuf::from("/tmp/none/history.jsonl")).into();
        assert_eq!(
            err.to_string(),
            "history error: history file not found at /tmp/none/history.jsonl"
        );
    }

    #[test]
    fn already_exists_conversion() {
        let err: RecipeError = PatternError::AlreadyExists(PathBuf::from("/x/patterns.conf")).into();
        assert!(matches!(err, RecipeError::Patterns(PatternError::AlreadyExists(_))));
        assert!(err.to_string().contains("/x/patterns.conf"));
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: RecipeError = io_err.into();
        assert!(matches!(err, RecipeError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err: RecipeError = json_err.into();
        assert!(matches!(err, RecipeError::Json(_)));
        assert!(err.to_string().contains("JSON error"));
    }
}
