//! extract-recipe - prompt recipes from Claude Code history.
//!
//! Claude Code appends every prompt a user types to `~/.claude/history.jsonl`.
//! This crate turns that log into a readable "recipe": the prompts for one
//! project, grouped by session, with injected boilerplate removed, pasted
//! blocks inlined and plan-mode prompts collapsed to their titles.
//!
//! # Pipeline
//!
//! ```text
//! history.jsonl -> PromptEntry -> Session -> Recipe -> markdown | JSON
//!                                              |
//!                                         (redaction)
//! ```
//!
//! The whole log is read and sorted before anything is grouped. Nothing is
//! written except by [`patterns::init_user_config`].
//!
//! # Privacy
//!
//! Recipes contain whatever the user typed. The [`privacy`] module masks home
//! directories, session ids and common credential shapes on request. It is a
//! best-effort filter, not a guarantee.
//!
//! # Modules
//!
//! - [`config`]: Directory and pattern file locations
//! - [`error`]: Crate-wide error type
//! - [`patterns`]: Section-based pattern file (strip, skip, plan, redact, ...)
//! - [`history`]: `history.jsonl` ingestion
//! - [`session`]: Grouping by project and session
//! - [`classify`]: Per-prompt cleanup and classification
//! - [`paste`]: Paste cache resolution
//! - [`privacy`]: Redaction
//! - [`types`]: Recipe document model
//! - [`formatter`]: Recipe assembly, markdown/JSON rendering, tables
//! - [`matching`]: Project argument resolution and suggestions
//! - [`utils`]: Shared helpers

pub mod classify;
pub mod config;
pub mod error;
pub mod formatter;
pub mod history;
pub mod matching;
pub mod paste;
pub mod patterns;
pub mod privacy;
pub mod session;
pub mod types;
pub mod utils;

pub use classify::{Classified, Classifier, ContextBreak, ContextCommand, PromptKind};
pub use config::{Config, ConfigError};
pub use error::{RecipeError, Result};
pub use formatter::{Formatter, OutputFormat, RenderOptions};
pub use history::{load_history, parse_history, HistoryError, PasteRef, PromptEntry};
pub use patterns::{PatternError, PatternSet, SectionKind};
pub use privacy::{PrivacyPipeline, SessionIdMap};
pub use session::{group_by_session, list_projects, ProjectSummary, Session};
pub use types::{Recipe, RecipeCollection, RecipeItem, RecipeSession};

use history::ParsedHistory;

/// Loads the pattern set and prompt history named by `config`.
///
/// # Errors
///
/// Fails if the pattern override cannot be read or compiled, or if the
/// history file is missing. Malformed history lines are not errors; they are
/// reported in [`ParsedHistory::malformed`].
pub fn load_sources(config: &Config) -> Result<(PatternSet, ParsedHistory)> {
    let patterns = PatternSet::load(config.patterns_path())?;
    let history = load_history(&config.history_path())?;
    Ok((patterns, history))
}
