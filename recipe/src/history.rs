//! Claude Code prompt history ingestion.
//!
//! Claude Code appends one JSON object per submitted prompt to
//! `~/.claude/history.jsonl`:
//!
//! ```json
//! {
//!   "display": "Refactor the parser [Pasted text #1 +42 lines]",
//!   "pastedContents": {"1": {"id": 1, "type": "text", "contentHash": "9f86d08..."}},
//!   "timestamp": 1738567268363,
//!   "project": "/home/ubuntu/Projects/webapp",
//!   "sessionId": "6e45a55c-3124-4cc8-ad85-040a5c316009"
//! }
//! ```
//!
//! `display`, `timestamp` and `project` are required; `sessionId` and
//! `pastedContents` are optional. Loading is lenient: a bad line is logged
//! and skipped, and only a missing history file aborts the load.
//!
//! # Example
//!
//! ```
//! use extract_recipe::history::parse_history;
//!
//! let content = r#"{"display": "second", "timestamp": 20, "project": "/p"}
//! not json
//! {"display": "first", "timestamp": 10, "project": "/p", "sessionId": "a"}"#;
//!
//! let parsed = parse_history(content);
//! assert_eq!(parsed.entries.len(), 2);
//! assert_eq!(parsed.malformed.len(), 1);
//! assert_eq!(parsed.entries[0].display, "first");
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors for a single history line. These are never fatal.
#[derive(Debug, Error)]
pub enum HistoryParseError {
    /// Failed to parse the JSON structure.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The line is valid JSON but not an object.
    #[error("expected a JSON object")]
    NotAnObject,

    /// The line is not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    /// The `display` field is missing from the entry.
    #[error("missing required field: display")]
    MissingDisplay,

    /// The `timestamp` field is missing from the entry.
    #[error("missing required field: timestamp")]
    MissingTimestamp,

    /// The `project` field is missing from the entry.
    #[error("missing required field: project")]
    MissingProject,
}

/// Errors that abort loading the history log.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The history file itself does not exist.
    #[error("history file not found at {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Failed to read the history file.
    #[error("failed to read history file: {0}")]
    Io(#[from] io::Error),
}

/// Reference from a paste marker in a prompt to its cached content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteRef {
    /// The marker id as it appears in `[Pasted text #<id> ...]`.
    pub local_id: String,
    /// Paste kind as recorded by Claude Code (usually `"text"`).
    pub kind: Option<String>,
    /// Key into the paste cache directory.
    pub content_hash: Option<String>,
}

/// One prompt submitted by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptEntry {
    /// The prompt text as displayed in Claude Code.
    pub display: String,
    /// Paste references keyed by local marker id.
    pub pasted_contents: HashMap<String, PasteRef>,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    /// Absolute path of the project the prompt was issued in.
    pub project: String,
    /// Claude Code session id; absent for prompts outside a tracked session.
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    display: String,
    timestamp: i64,
    project: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    pasted_contents: Option<HashMap<String, RawPasteRef>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPasteRef {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    content_hash: Option<String>,
}

impl From<RawEntry> for PromptEntry {
    fn from(raw: RawEntry) -> Self {
        let pasted_contents = raw
            .pasted_contents
            .unwrap_or_default()
            .into_iter()
            .map(|(local_id, paste)| {
                let paste_ref = PasteRef {
                    local_id: local_id.clone(),
                    kind: paste.kind,
                    content_hash: paste.content_hash,
                };
                (local_id, paste_ref)
            })
            .collect();

        Self {
            display: raw.display,
            pasted_contents,
            timestamp: raw.timestamp,
            project: raw.project,
            session_id: raw.session_id,
        }
    }
}

/// A history line that was skipped.
#[derive(Debug)]
pub struct MalformedLine {
    /// 1-based line number in the source.
    pub line_number: usize,
    /// Why the line was rejected.
    pub error: HistoryParseError,
}

/// Result of parsing a whole history log.
#[derive(Debug, Default)]
pub struct ParsedHistory {
    /// Well-formed entries sorted by timestamp (stable for ties).
    pub entries: Vec<PromptEntry>,
    /// Lines that were skipped, in file order.
    pub malformed: Vec<MalformedLine>,
}

/// Parses a single line from history.jsonl into a [`PromptEntry`].
///
/// # Example
///
/// ```
/// use extract_recipe::history::parse_history_entry;
///
/// let line = r#"{"display": "/commit", "timestamp": 1738567268363, "project": "/home/user/project"}"#;
/// let entry = parse_history_entry(line).unwrap();
///
/// assert_eq!(entry.display, "/commit");
/// assert_eq!(entry.session_id, None);
/// ```
pub fn parse_history_entry(line: &str) -> Result<PromptEntry, HistoryParseError> {
    // Parse to a generic value first so missing fields get specific errors
    let value: serde_json::Value = serde_json::from_str(line)?;

    if !value.is_object() {
        return Err(HistoryParseError::NotAnObject);
    }
    if value.get("display").is_none() {
        return Err(HistoryParseError::MissingDisplay);
    }
    if value.get("timestamp").is_none() {
        return Err(HistoryParseError::MissingTimestamp);
    }
    if value.get("project").is_none() {
        return Err(HistoryParseError::MissingProject);
    }

    let raw: RawEntry = serde_json::from_value(value)?;
    Ok(raw.into())
}

/// Parses history.jsonl content, keeping every well-formed line.
///
/// Blank lines are ignored. Each rejected line is logged at `warn` and
/// recorded in [`ParsedHistory::malformed`]. Entries come back sorted by
/// timestamp; entries with equal timestamps keep their file order.
#[must_use]
pub fn parse_history(content: &str) -> ParsedHistory {
    parse_lines(content.split('\n').map(Ok))
}

fn parse_lines<'a, I>(lines: I) -> ParsedHistory
where
    I: Iterator<Item = Result<&'a str, HistoryParseError>>,
{
    let mut parsed = ParsedHistory::default();

    for (idx, line) in lines.enumerate() {
        let line_number = idx + 1;
        let result = line.and_then(|line| {
            if line.trim().is_empty() {
                Ok(None)
            } else {
                parse_history_entry(line.trim()).map(Some)
            }
        });

        match result {
            Ok(Some(entry)) => parsed.entries.push(entry),
            Ok(None) => {}
            Err(error) => {
                warn!(line = line_number, error = %error, "Skipping malformed history line");
                parsed.malformed.push(MalformedLine { line_number, error });
            }
        }
    }

    // sort_by_key is stable, so equal timestamps keep file order
    parsed.entries.sort_by_key(|entry| entry.timestamp);
    parsed
}

/// Loads and parses the history log at `path`.
///
/// Invalid UTF-8 is rejected per line rather than for the whole file.
///
/// # Errors
///
/// - [`HistoryError::SourceNotFound`] if `path` does not exist
/// - [`HistoryError::Io`] for any other read failure
pub fn load_history(path: &Path) -> Result<ParsedHistory, HistoryError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(HistoryError::SourceNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let lines = bytes.split(|&b| b == b'\n').map(|line| {
        std::str::from_utf8(line).map_err(|_| HistoryParseError::InvalidUtf8)
    });
    let parsed = parse_lines(lines);

    debug!(
        path = %path.display(),
        entries = parsed.entries.len(),
        malformed = parsed.malformed.len(),
        "Loaded prompt history"
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn line(display: &str, timestamp: i64, project: &str, session: Option<&str>) -> String {
        let mut value = serde_json::json!({
            "display": display,
            "timestamp": timestamp,
            "project": project,
        });
        if let Some(session) = session {
            value["sessionId"] = serde_json::Value::String(session.to_string());
        }
        value.to_string()
    }

    #[test]
    fn test_parse_minimal_entry() {
        let entry = parse_history_entry(&line("hello", 1, "/p", None)).unwrap();
        assert_eq!(entry.display, "hello");
        assert_eq!(entry.timestamp, 1);
        assert_eq!(entry.project, "/p");
        assert!(entry.session_id.is_none());
        assert!(entry.pasted_contents.is_empty());
    }

    #[test]
    fn test_parse_pasted_contents() {
        let line = r#"{"display": "see [Pasted text #2 +3 lines]", "timestamp": 5, "project": "/p",
            "pastedContents": {"2": {"id": 2, "type": "text", "contentHash": "abc123"}}}"#;
        let entry = parse_history_entry(&line.replace('\n', " ")).unwrap();

        let paste = entry.pasted_contents.get("2").expect("paste ref");
        assert_eq!(paste.local_id, "2");
        assert_eq!(paste.kind.as_deref(), Some("text"));
        assert_eq!(paste.content_hash.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_null_optional_fields() {
        let line = r#"{"display": "x", "timestamp": 5, "project": "/p", "sessionId": null, "pastedContents": null}"#;
        let entry = parse_history_entry(line).unwrap();
        assert!(entry.session_id.is_none());
        assert!(entry.pasted_contents.is_empty());
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            parse_history_entry(r#"{"timestamp": 1, "project": "/p"}"#),
            Err(HistoryParseError::MissingDisplay)
        ));
        assert!(matches!(
            parse_history_entry(r#"{"display": "x", "project": "/p"}"#),
            Err(HistoryParseError::MissingTimestamp)
        ));
        assert!(matches!(
            parse_history_entry(r#"{"display": "x", "timestamp": 1}"#),
            Err(HistoryParseError::MissingProject)
        ));
    }

    #[test]
    fn test_wrong_field_type_is_invalid_json() {
        let result = parse_history_entry(r#"{"display": "x", "timestamp": "soon", "project": "/p"}"#);
        assert!(matches!(result, Err(HistoryParseError::InvalidJson(_))));
    }

    #[test]
    fn test_non_object_line() {
        assert!(matches!(
            parse_history_entry("[1, 2, 3]"),
            Err(HistoryParseError::NotAnObject)
        ));
    }

    #[test]
    fn test_one_malformed_line_among_many() {
        let content = [
            line("a", 3, "/p", None),
            "{broken".to_string(),
            line("b", 1, "/p", None),
            line("c", 2, "/p", None),
        ]
        .join("\n");

        let parsed = parse_history(&content);
        assert_eq!(parsed.entries.len(), 3);
        assert_eq!(parsed.malformed.len(), 1);
        assert_eq!(parsed.malformed[0].line_number, 2);
    }

    #[test]
    fn test_sorted_and_stable() {
        let content = [
            line("late", 30, "/p", None),
            line("tie-first", 10, "/p", None),
            line("tie-second", 10, "/p", None),
            line("middle", 20, "/p", None),
        ]
        .join("\n");

        let displays: Vec<String> = parse_history(&content)
            .entries
            .into_iter()
            .map(|e| e.display)
            .collect();
        assert_eq!(displays, vec!["tie-first", "tie-second", "middle", "late"]);
    }

    #[test]
    fn test_blank_lines_are_not_malformed() {
        let content = format!("\n{}\n   \n\n", line("a", 1, "/p", None));
        let parsed = parse_history(&content);
        assert_eq!(parsed.entries.len(), 1);
        assert!(parsed.malformed.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_history(Path::new("/definitely/not/here/history.jsonl")).unwrap_err();
        assert!(matches!(err, HistoryError::SourceNotFound(_)));
    }

    #[test]
    fn test_load_skips_invalid_utf8_line() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(line("ok", 1, "/p", None).as_bytes()).unwrap();
        file.write_all(b"\n\xff\xfe{}\n").unwrap();
        file.write_all(line("ok2", 2, "/p", None).as_bytes()).unwrap();
        file.flush().unwrap();

        let parsed = load_history(file.path()).unwrap();
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.malformed.len(), 1);
        assert!(matches!(
            parsed.malformed[0].error,
            HistoryParseError::InvalidUtf8
        ));
    }
}
