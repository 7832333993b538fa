//! Recipe assembly and rendering.
//!
//! [`Formatter`] turns grouped sessions into the [`Recipe`] document model,
//! numbering prompts, collapsing plans, inlining pastes and, when asked,
//! redacting the result. Both output formats are rendered from that model.
//!
//! Numbering depends on the mode:
//!
//! - Normal: one running counter per recipe. Skipped prompts and context
//!   breaks do not consume a number.
//! - Redacted: every context break opens a new displayed session, and
//!   prompts are numbered `<session>.<n>` from 1 within it. Dates are
//!   dropped.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use regex::Regex;
use tracing::debug;

use crate::classify::{Classifier, PromptKind};
use crate::history::PromptEntry;
use crate::paste::resolve_pastes;
use crate::patterns::{PatternSet, SectionKind};
use crate::privacy::PrivacyPipeline;
use crate::session::{filter_by_project, group_by_session, ProjectSummary, Session};
use crate::types::{Recipe, RecipeCollection, RecipeItem, RecipeSession};

/// Display format for prompt timestamps.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Label for the bucket of prompts without a session id.
pub const NO_SESSION_LABEL: &str = "Session (no ID)";

/// Characters of the session id shown in headings.
const SESSION_ID_PREFIX_LEN: usize = 8;

/// Most entries reported by the audit view.
pub const AUDIT_LIMIT: usize = 50;

static CAPITALIZED_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z0-9]{2,}\b").expect("valid capitalized word regex")
});

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

/// Independent rendering toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    /// Mask paths, ids and secrets; scope numbering to context segments.
    pub redact: bool,
    /// Show prompts as typed: no stripping, no plan collapsing, epoch ms.
    pub raw: bool,
}

/// Formats a millisecond timestamp as `YYYY-MM-DD HH:MM:SS UTC`.
///
/// ```
/// use extract_recipe::formatter::format_timestamp;
///
/// assert_eq!(format_timestamp(1_700_000_000_000).as_deref(), Some("2023-11-14 22:13:20 UTC"));
/// ```
#[must_use]
pub fn format_timestamp(timestamp_ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map(|dt| dt.format(DATE_FORMAT).to_string())
}

/// Builds and renders recipes.
#[derive(Debug, Clone, Copy)]
pub struct Formatter<'a> {
    patterns: &'a PatternSet,
    paste_cache_dir: &'a Path,
    options: RenderOptions,
}

impl<'a> Formatter<'a> {
    #[must_use]
    pub fn new(patterns: &'a PatternSet, paste_cache_dir: &'a Path, options: RenderOptions) -> Self {
        Self {
            patterns,
            paste_cache_dir,
            options,
        }
    }

    /// Builds one document holding a recipe per project, in the given order.
    ///
    /// Under redaction the whole document shares one session id map.
    #[must_use]
    pub fn build(&self, entries: &[PromptEntry], projects: &[&str]) -> Vec<Recipe> {
        let mut recipes: Vec<Recipe> = projects
            .iter()
            .map(|project| {
                let filtered = filter_by_project(entries, project);
                self.recipe(project, &group_by_session(&filtered))
            })
            .collect();

        if self.options.redact {
            PrivacyPipeline::new(self.patterns).redact_recipes(&mut recipes);
        }
        recipes
    }

    /// Assembles the unredacted document model for one project.
    ///
    /// Text is left as-is; [`build`](Self::build) applies redaction. The
    /// structure (labels, numbering, dates) already follows the redaction
    /// toggle.
    #[must_use]
    pub fn recipe(&self, project: &str, sessions: &[Session<'_>]) -> Recipe {
        let classifier = Classifier::new(self.patterns);
        let mut rendered: Vec<RecipeSession> = Vec::new();
        let mut prompt_number = 0usize;

        for session in sessions {
            let mut current = self.open_session(session.session_id);
            let mut in_current = 0usize;

            for entry in &session.prompts {
                let classified = classifier.classify(entry);
                match classified.kind {
                    PromptKind::Skip => {
                        debug!(timestamp = entry.timestamp, "Skipping prompt");
                    }
                    PromptKind::ContextBreak(context_break) => {
                        if self.options.redact && in_current > 0 {
                            self.close_session(&mut rendered, current);
                            current = self.open_session(session.session_id);
                            in_current = 0;
                        }
                        current.items.push(RecipeItem::ContextBreak {
                            command: context_break.command.name().to_string(),
                            comment: context_break.comment,
                        });
                    }
                    kind => {
                        prompt_number += 1;
                        in_current += 1;
                        let number = if self.options.redact {
                            format!("{}.{in_current}", rendered.len() + 1)
                        } else {
                            prompt_number.to_string()
                        };
                        let (timestamp, date) = self.stamp(entry);

                        let item = match kind {
                            PromptKind::Plan { title } if !self.options.raw => RecipeItem::Plan {
                                number,
                                timestamp,
                                date,
                                title,
                            },
                            _ => RecipeItem::Prompt {
                                number,
                                timestamp,
                                date,
                                text: self.body(entry, &classified.cleaned),
                            },
                        };
                        current.items.push(item);
                    }
                }
            }

            self.close_session(&mut rendered, current);
        }

        Recipe {
            project: project.to_string(),
            sessions: rendered,
        }
    }

    /// Renders a document in the requested format.
    ///
    /// `collection` selects the `--all` JSON shape (`{"projects": [...]}`);
    /// otherwise a single recipe is emitted as a bare object.
    pub fn render(
        &self,
        recipes: &[Recipe],
        format: OutputFormat,
        collection: bool,
    ) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Markdown => Ok(recipes
                .iter()
                .map(|recipe| self.to_markdown(recipe))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Json if collection => {
                let collection = RecipeCollection {
                    projects: recipes.to_vec(),
                };
                Ok(format!("{}\n", serde_json::to_string_pretty(&collection)?))
            }
            OutputFormat::Json => match recipes {
                [recipe] => Ok(format!("{}\n", serde_json::to_string_pretty(recipe)?)),
                _ => Ok(format!("{}\n", serde_json::to_string_pretty(recipes)?)),
            },
        }
    }

    /// Renders one recipe as markdown.
    #[must_use]
    pub fn to_markdown(&self, recipe: &Recipe) -> String {
        let mut blocks = vec![format!("# Recipe: {}", recipe.project)];

        for session in &recipe.sessions {
            blocks.push(format!("## {}", session.label));
            for item in &session.items {
                match item {
                    RecipeItem::Prompt {
                        number,
                        timestamp,
                        date,
                        text,
                    } => {
                        blocks.push(self.prompt_heading(number, *timestamp, date.as_deref()));
                        blocks.push(text.clone());
                    }
                    RecipeItem::Plan {
                        number,
                        timestamp,
                        date,
                        title,
                    } => {
                        blocks.push(self.prompt_heading(number, *timestamp, date.as_deref()));
                        blocks.push(format!("[Plan: {title}]"));
                    }
                    RecipeItem::ContextBreak { command, comment } => {
                        blocks.push(context_break_note(command, comment.as_deref()));
                    }
                }
            }
        }

        let mut out = blocks.join("\n\n");
        out.push('\n');
        out
    }

    fn prompt_heading(&self, number: &str, timestamp: Option<i64>, date: Option<&str>) -> String {
        let mut heading = format!("### Prompt {number}");
        if let Some(date) = date {
            heading.push_str(" \u{2014} ");
            heading.push_str(date);
        }
        if self.options.raw {
            if let Some(ts) = timestamp {
                heading.push_str(&format!(" ({ts})"));
            }
        }
        heading
    }

    fn open_session(&self, session_id: Option<&str>) -> RecipeSession {
        RecipeSession {
            session_id: session_id.map(str::to_string),
            label: String::new(),
            items: Vec::new(),
        }
    }

    /// Labels and keeps `session` unless it ended up empty.
    fn close_session(&self, rendered: &mut Vec<RecipeSession>, mut session: RecipeSession) {
        if session.items.is_empty() {
            return;
        }
        session.label = if self.options.redact {
            format!("Session {}", rendered.len() + 1)
        } else {
            match session.session_id.as_deref() {
                Some(id) => format!("Session {}", id.chars().take(SESSION_ID_PREFIX_LEN).collect::<String>()),
                None => NO_SESSION_LABEL.to_string(),
            }
        };
        rendered.push(session);
    }

    fn stamp(&self, entry: &PromptEntry) -> (Option<i64>, Option<String>) {
        if self.options.redact {
            (None, None)
        } else {
            (Some(entry.timestamp), format_timestamp(entry.timestamp))
        }
    }

    fn body(&self, entry: &PromptEntry, cleaned: &str) -> String {
        let source = if self.options.raw {
            entry.display.as_str()
        } else {
            cleaned
        };
        resolve_pastes(source, &entry.pasted_contents, self.paste_cache_dir)
    }
}

/// The inline annotation for a context break, e.g. `*Context cleared: cleanup*`.
#[must_use]
pub fn context_break_note(command: &str, comment: Option<&str>) -> String {
    let verb = match command {
        "clear" => "cleared",
        "compact" => "compacted",
        "compress" => "compressed",
        other => other,
    };
    match comment {
        Some(comment) => format!("*Context {verb}: {comment}*"),
        None => format!("*Context {verb}*"),
    }
}

/// Renders left-aligned columns separated by two spaces, with a dashed rule
/// under the header. Trailing padding is trimmed.
fn format_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();

    let mut lines = vec![line(&header), line(&rule)];
    lines.extend(rows.iter().map(|row| line(row)));
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Renders the `--list` table.
///
/// ```
/// use extract_recipe::formatter::format_project_list;
/// use extract_recipe::session::ProjectSummary;
///
/// let table = format_project_list(&[ProjectSummary {
///     project: "/src/app".to_string(),
///     prompt_count: 12,
///     session_count: 3,
/// }]);
/// assert_eq!(table, "Project   Prompts  Sessions\n--------  -------  --------\n/src/app  12       3\n");
/// ```
#[must_use]
pub fn format_project_list(projects: &[ProjectSummary]) -> String {
    if projects.is_empty() {
        return "No projects found.\n".to_string();
    }
    let rows: Vec<Vec<String>> = projects
        .iter()
        .map(|p| {
            vec![
                p.project.clone(),
                p.prompt_count.to_string(),
                p.session_count.to_string(),
            ]
        })
        .collect();
    format_table(&["Project", "Prompts", "Sessions"], &rows)
}

/// Counts capitalized words across prompts, for tuning `[stopwords]`.
///
/// Skipped prompts are ignored and boilerplate is stripped first. Words
/// matching a stopword pattern are excluded. Returns words seen at least
/// twice, most frequent first (ties alphabetical), at most [`AUDIT_LIMIT`].
#[must_use]
pub fn audit_words(entries: &[&PromptEntry], patterns: &PatternSet) -> Vec<(String, usize)> {
    let classifier = Classifier::new(patterns);
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let cleaned: Vec<String> = entries
        .iter()
        .map(|entry| classifier.classify(entry))
        .filter(|c| c.kind != PromptKind::Skip)
        .map(|c| c.cleaned)
        .collect();

    for text in &cleaned {
        for word in CAPITALIZED_WORD_RE.find_iter(text).map(|m| m.as_str()) {
            if !patterns.matches_any(SectionKind::Stopwords, word) {
                *counts.entry(word).or_default() += 1;
            }
        }
    }

    let mut repeated: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|&(_, count)| count >= 2)
        .map(|(word, count)| (word.to_string(), count))
        .collect();
    repeated.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    repeated.truncate(AUDIT_LIMIT);
    repeated
}

/// Renders the `--audit` table.
#[must_use]
pub fn format_audit(words: &[(String, usize)]) -> String {
    if words.is_empty() {
        return "No repeated capitalized words found.\n".to_string();
    }
    let rows: Vec<Vec<String>> = words
        .iter()
        .map(|(word, count)| vec![count.to_string(), word.clone()])
        .collect();
    format_table(&["Count", "Word"], &rows)
}
