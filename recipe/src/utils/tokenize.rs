//! Slash command tokenizer.
//!
//! Claude Code records slash commands in history exactly as typed, e.g.
//! `/clear switching to the parser work` or `/compact keep the test plan`.
//! This module splits such text into the command name and its free-form
//! trailing text.
//!
//! # Example
//!
//! ```
//! use extract_recipe::utils::tokenize::split_slash_command;
//!
//! let cmd = split_slash_command("/clear start over").unwrap();
//! assert_eq!(cmd.name, "clear");
//! assert_eq!(cmd.args, "start over");
//!
//! assert!(split_slash_command("not a command").is_none());
//! ```

/// A slash command split into name and trailing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand<'a> {
    /// The command token after `/`, e.g. `clear`.
    pub name: &'a str,
    /// Everything after the command token, trimmed. May span several lines.
    pub args: &'a str,
}

/// Splits a leading slash command into name and trailing text.
///
/// Leading whitespace before the `/` is ignored. The command name runs until
/// the first whitespace character and must be non-empty; a `/` followed
/// directly by whitespace is not a command.
///
/// # Examples
///
/// ```
/// use extract_recipe::utils::tokenize::split_slash_command;
///
/// let cmd = split_slash_command("  /compact\nkeep the plan").unwrap();
/// assert_eq!(cmd.name, "compact");
/// assert_eq!(cmd.args, "keep the plan");
///
/// assert_eq!(split_slash_command("/sdd:plan").unwrap().name, "sdd:plan");
/// assert!(split_slash_command("/").is_none());
/// assert!(split_slash_command("/ clear").is_none());
/// assert!(split_slash_command("a/b").is_none());
/// ```
#[must_use]
pub fn split_slash_command(text: &str) -> Option<SlashCommand<'_>> {
    let rest = text.trim_start().strip_prefix('/')?;

    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let name = &rest[..end];
    if name.is_empty() {
        return None;
    }

    Some(SlashCommand {
        name,
        args: rest[end..].trim(),
    })
}
