//! Pattern configuration for prompt cleanup, classification and redaction.
//!
//! Patterns live in a small section file:
//!
//! ```text
//! [strip]
//! (?s)<system-reminder>.*?</system-reminder>
//!
//! [redact]
//! [A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,} = [EMAIL]
//! ```
//!
//! # Lookup order
//!
//! 1. The override file (`--config`, `EXTRACT_RECIPE_CONFIG`, or
//!    `~/.config/extract-recipe/patterns.conf`), if it exists
//! 2. The packaged defaults compiled into the binary
//!
//! An override replaces the packaged defaults entirely. Use
//! [`init_user_config`] to copy the defaults somewhere editable.
//!
//! # Example
//!
//! ```
//! use extract_recipe::patterns::{PatternSet, SectionKind};
//!
//! let patterns = PatternSet::parse("[skip]\n^/exit$\n").unwrap();
//! assert!(patterns.matches_any(SectionKind::Skip, "/exit"));
//! assert!(!patterns.matches_any(SectionKind::Skip, "refactor the parser"));
//! ```

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// The pattern file shipped with the binary.
pub const DEFAULT_PATTERNS: &str = include_str!("../patterns.conf");

/// Section that receives lines appearing before any header.
const IMPLICIT_SECTION: &str = "strip";

/// Separator between pattern and replacement in pair sections.
const PAIR_SEPARATOR: &str = " = ";

/// Errors that can occur while loading or initialising pattern configuration.
#[derive(Error, Debug)]
pub enum PatternError {
    /// The override file exists but could not be read.
    #[error("failed to read pattern file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A line is not a valid regular expression.
    #[error("invalid pattern in [{section}] at line {line}: {source}")]
    InvalidPattern {
        section: String,
        line: usize,
        #[source]
        source: regex::Error,
    },

    /// `init_user_config` refused to overwrite an existing file.
    #[error("pattern file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Writing the default configuration failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Well-known section names.
///
/// Anything else found in a pattern file is kept as an opaque plain section
/// under its verbatim name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Boilerplate removed from prompt text.
    Strip,
    /// Prompts omitted from the recipe.
    Skip,
    /// Plan-mode prompts collapsed to their title.
    Plan,
    /// Capitalized words ignored by the audit view.
    Stopwords,
    /// `pattern = replacement` pairs applied when redacting.
    Redact,
}

impl SectionKind {
    /// All well-known sections.
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Strip,
        SectionKind::Skip,
        SectionKind::Plan,
        SectionKind::Stopwords,
        SectionKind::Redact,
    ];

    /// The section header name, without brackets.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            SectionKind::Strip => "strip",
            SectionKind::Skip => "skip",
            SectionKind::Plan => "plan",
            SectionKind::Stopwords => "stopwords",
            SectionKind::Redact => "redact",
        }
    }

    /// Looks up a well-known section by header name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether lines in this section are `pattern = replacement` pairs.
    #[must_use]
    pub fn is_pair(self) -> bool {
        matches!(self, SectionKind::Redact)
    }
}

/// A compiled pattern with its replacement template.
#[derive(Debug, Clone)]
pub struct PatternPair {
    pub pattern: Regex,
    pub replacement: String,
}

/// Compiled lines of one section.
#[derive(Debug, Clone)]
pub enum PatternSection {
    Plain(Vec<Regex>),
    Pair(Vec<PatternPair>),
}

/// An immutable, compiled set of pattern sections.
///
/// Built once at startup and passed by reference to whatever needs it.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    sections: HashMap<String, PatternSection>,
}

impl PatternSet {
    /// Loads the override file if it exists, otherwise the packaged defaults.
    ///
    /// # Errors
    ///
    /// - [`PatternError::Unreadable`] if the override exists but cannot be read
    /// - [`PatternError::InvalidPattern`] if any line fails to compile
    pub fn load(override_path: &Path) -> Result<Self, PatternError> {
        let patterns = if override_path.exists() {
            debug!(path = %override_path.display(), "Loading user pattern file");
            let text =
                fs::read_to_string(override_path).map_err(|source| PatternError::Unreadable {
                    path: override_path.to_path_buf(),
                    source,
                })?;
            Self::parse(&text)?
        } else {
            debug!(
                path = %override_path.display(),
                "No user pattern file, using packaged defaults"
            );
            Self::packaged()?
        };
        debug!(sections = ?patterns.section_names(), "Compiled pattern sections");
        Ok(patterns)
    }

    /// Compiles the packaged default patterns.
    pub fn packaged() -> Result<Self, PatternError> {
        Self::parse(DEFAULT_PATTERNS)
    }

    /// Parses pattern file text.
    ///
    /// Blank lines and `#` comments are ignored. Pair lines without a
    /// `" = "` separator are dropped.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let mut sections: HashMap<String, PatternSection> = HashMap::new();
        let mut current = IMPLICIT_SECTION.to_string();

        for (idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(name) = section_header(line) {
                current = name.to_string();
                continue;
            }

            let compile = |pattern: &str| {
                Regex::new(pattern).map_err(|source| PatternError::InvalidPattern {
                    section: current.clone(),
                    line: idx + 1,
                    source,
                })
            };

            let section = sections.entry(current.clone()).or_insert_with(|| {
                if SectionKind::from_name(&current).is_some_and(SectionKind::is_pair) {
                    PatternSection::Pair(Vec::new())
                } else {
                    PatternSection::Plain(Vec::new())
                }
            });

            match section {
                PatternSection::Pair(pairs) => {
                    let Some((pattern, replacement)) = line.rsplit_once(PAIR_SEPARATOR) else {
                        debug!(section = %current, line = idx + 1, "Ignoring pair line without separator");
                        continue;
                    };
                    pairs.push(PatternPair {
                        pattern: compile(pattern)?,
                        replacement: replacement.to_string(),
                    });
                }
                PatternSection::Plain(patterns) => patterns.push(compile(line)?),
            }
        }

        Ok(Self { sections })
    }

    /// Plain patterns of a well-known section, in file order.
    #[must_use]
    pub fn plain(&self, kind: SectionKind) -> &[Regex] {
        self.plain_named(kind.name())
    }

    /// Plain patterns of any section by name, including unknown ones.
    #[must_use]
    pub fn plain_named(&self, name: &str) -> &[Regex] {
        match self.sections.get(name) {
            Some(PatternSection::Plain(patterns)) => patterns,
            _ => &[],
        }
    }

    /// Pattern/replacement pairs of a pair section, in file order.
    #[must_use]
    pub fn pairs(&self, kind: SectionKind) -> &[PatternPair] {
        match self.sections.get(kind.name()) {
            Some(PatternSection::Pair(pairs)) => pairs,
            _ => &[],
        }
    }

    /// Whether the set has at least one entry for `kind`.
    #[must_use]
    pub fn has_section(&self, kind: SectionKind) -> bool {
        match self.sections.get(kind.name()) {
            Some(PatternSection::Plain(patterns)) => !patterns.is_empty(),
            Some(PatternSection::Pair(pairs)) => !pairs.is_empty(),
            None => false,
        }
    }

    /// Names of every section present, sorted.
    #[must_use]
    pub fn section_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns true if any plain pattern in `kind` matches `text`.
    #[must_use]
    pub fn matches_any(&self, kind: SectionKind, text: &str) -> bool {
        self.plain(kind).iter().any(|p| p.is_match(text))
    }

    /// Removes every `strip` match from `text`, applying patterns in file order.
    #[must_use]
    pub fn strip_all(&self, text: &str) -> String {
        self.plain(SectionKind::Strip)
            .iter()
            .fold(text.to_string(), |acc, pattern| {
                pattern.replace_all(&acc, "").into_owned()
            })
    }
}

/// The section name if `line` is a `[name]` header.
///
/// Names are limited to ASCII letters, digits, `_` and `-`, so a pattern
/// line such as `[a-z]+ = [X]` is never mistaken for a header.
fn section_header(line: &str) -> Option<&str> {
    let name = line.strip_prefix('[')?.strip_suffix(']')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then_some(name)
}

/// Copies the packaged defaults to `target`.
///
/// Parent directories are created as needed. Never overwrites: if `target`
/// already exists this fails with [`PatternError::AlreadyExists`].
pub fn init_user_config(target: &Path) -> Result<PathBuf, PatternError> {
    if target.exists() {
        return Err(PatternError::AlreadyExists(target.to_path_buf()));
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(PatternError::AlreadyExists(target.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    file.write_all(DEFAULT_PATTERNS.as_bytes())?;

    Ok(target.to_path_buf())
}
