//! Per-prompt classification and cleanup.
//!
//! Every prompt is first stripped of boilerplate using the `[strip]`
//! patterns, then sorted into one of four kinds:
//!
//! | Kind | Rule | Rendered as |
//! |------|------|-------------|
//! | [`PromptKind::Skip`] | `[skip]` matches the text as typed, or nothing is left after stripping | nothing |
//! | [`PromptKind::ContextBreak`] | `/clear`, `/compact` or `/compress`, optionally followed by a comment | an annotation, never numbered |
//! | [`PromptKind::Plan`] | `[plan]` matches the text as typed | the plan title |
//! | [`PromptKind::Prompt`] | anything else | the cleaned text |

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::history::PromptEntry;
use crate::patterns::{PatternSet, SectionKind};
use crate::utils::tokenize::split_slash_command;

/// Prefix Claude Code puts on an approved plan, used when no `[plan]`
/// patterns are configured.
pub const PLAN_SENTINEL: &str = "Implement the following plan:";

/// Title used for plans without any markdown heading.
pub const UNTITLED_PLAN: &str = "untitled plan";

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+(\S.*)$").expect("valid heading regex"));

static PLAN_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^plan:\s*").expect("valid plan prefix regex"));

/// Commands that reset the assistant's conversational context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextCommand {
    Clear,
    Compact,
    Compress,
}

impl ContextCommand {
    /// Looks up a command by its slash name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "clear" => Some(Self::Clear),
            "compact" => Some(Self::Compact),
            "compress" => Some(Self::Compress),
            _ => None,
        }
    }

    /// The slash name without the leading `/`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Compact => "compact",
            Self::Compress => "compress",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Self::Clear => "cleared",
            Self::Compact => "compacted",
            Self::Compress => "compressed",
        }
    }
}

/// A context reset found in the prompt stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBreak {
    pub command: ContextCommand,
    /// Free text typed after the command, if any.
    pub comment: Option<String>,
}

impl fmt::Display for ContextBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context {}", self.command.past_tense())?;
        if let Some(comment) = &self.comment {
            write!(f, ": {comment}")?;
        }
        Ok(())
    }
}

/// What a prompt turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    Skip,
    ContextBreak(ContextBreak),
    Plan { title: String },
    Prompt,
}

/// A classified prompt with its boilerplate-free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: PromptKind,
    /// Display text after `[strip]` patterns, trimmed.
    pub cleaned: String,
}

/// Applies the pattern set to individual prompts.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    patterns: &'a PatternSet,
}

impl<'a> Classifier<'a> {
    #[must_use]
    pub fn new(patterns: &'a PatternSet) -> Self {
        Self { patterns }
    }

    /// Classifies one prompt.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use extract_recipe::classify::{Classifier, PromptKind};
    /// use extract_recipe::history::PromptEntry;
    /// use extract_recipe::patterns::PatternSet;
    ///
    /// let patterns = PatternSet::packaged().unwrap();
    /// let entry = PromptEntry {
    ///     display: "Implement the following plan:\n# Plan: Add caching\n...".to_string(),
    ///     pasted_contents: HashMap::new(),
    ///     timestamp: 0,
    ///     project: "/p".to_string(),
    ///     session_id: None,
    /// };
    ///
    /// let classified = Classifier::new(&patterns).classify(&entry);
    /// assert_eq!(classified.kind, PromptKind::Plan { title: "Add caching".to_string() });
    /// ```
    #[must_use]
    pub fn classify(&self, entry: &PromptEntry) -> Classified {
        let display = entry.display.as_str();
        let cleaned = self.patterns.strip_all(display).trim().to_string();

        let kind = if self.patterns.matches_any(SectionKind::Skip, display) || cleaned.is_empty() {
            PromptKind::Skip
        } else if let Some(context_break) = detect_context_break(&cleaned) {
            PromptKind::ContextBreak(context_break)
        } else if self.is_plan(display) {
            PromptKind::Plan {
                title: extract_plan_title(&cleaned),
            }
        } else {
            PromptKind::Prompt
        };

        Classified { kind, cleaned }
    }

    /// Whether `display` is a plan-mode prompt.
    ///
    /// Uses the `[plan]` patterns, or [`PLAN_SENTINEL`] when none are
    /// configured.
    #[must_use]
    pub fn is_plan(&self, display: &str) -> bool {
        if self.patterns.has_section(SectionKind::Plan) {
            self.patterns.matches_any(SectionKind::Plan, display)
        } else {
            display.trim_start().starts_with(PLAN_SENTINEL)
        }
    }
}

/// Recognises `/clear`, `/compact` and `/compress` with an optional comment.
#[must_use]
pub fn detect_context_break(text: &str) -> Option<ContextBreak> {
    let cmd = split_slash_command(text)?;
    let command = ContextCommand::from_name(cmd.name)?;
    let comment = (!cmd.args.is_empty()).then(|| cmd.args.to_string());
    Some(ContextBreak { command, comment })
}

/// Title of a plan: its first markdown heading, minus any `Plan:` prefix.
///
/// ```
/// use extract_recipe::classify::extract_plan_title;
///
/// assert_eq!(extract_plan_title("intro\n## plan:  Ship it\n# Later"), "Ship it");
/// assert_eq!(extract_plan_title("no headings here"), "untitled plan");
/// ```
#[must_use]
pub fn extract_plan_title(text: &str) -> String {
    HEADING_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| PLAN_PREFIX_RE.replace(m.as_str().trim(), "").trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED_PLAN.to_string())
}
