//! Inlining of large pasted blocks.
//!
//! When a user pastes a long block, Claude Code shows a marker such as
//! `[Pasted text #2 +26 lines]` in the prompt and stores the text in
//! `~/.claude/paste-cache/<contentHash>.txt`. The resolver swaps each marker
//! for the cached text between delimiter lines.
//!
//! Resolution never fails the render. Markers without paste metadata are left
//! as they are, and a missing cache file becomes a short inline note.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;
use tracing::warn;

use crate::history::PasteRef;

/// Extension of files in the paste cache.
pub const PASTE_EXTENSION: &str = "txt";

static PASTE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[Pasted text #(\d+) \+(\d+) lines?\]").expect("valid paste marker regex")
});

/// A paste that could not be inlined. Recovered by the resolver.
#[derive(Debug, Error)]
pub enum PasteError {
    /// The cache file for a referenced paste does not exist or is unreadable.
    #[error("cache file missing for pasted text #{paste_id} ({file_name})")]
    MissingCache { paste_id: String, file_name: String },
}

impl PasteError {
    /// The note left in place of the marker.
    fn inline_note(&self) -> String {
        match self {
            PasteError::MissingCache { paste_id, file_name } => {
                format!("[Pasted text #{paste_id}: cache file missing ({file_name})]")
            }
        }
    }
}

/// Cache file path for a content hash.
#[must_use]
pub fn cache_file_path(paste_cache_dir: &Path, content_hash: &str) -> PathBuf {
    paste_cache_dir.join(format!("{content_hash}.{PASTE_EXTENSION}"))
}

/// Replaces paste markers in `text` with cached paste content.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use std::path::Path;
/// use extract_recipe::paste::resolve_pastes;
///
/// // No metadata for #1: the marker is left as-is.
/// let text = "see [Pasted text #1 +4 lines]";
/// assert_eq!(resolve_pastes(text, &HashMap::new(), Path::new("/nowhere")), text);
/// ```
#[must_use]
pub fn resolve_pastes(
    text: &str,
    pasted_contents: &HashMap<String, PasteRef>,
    paste_cache_dir: &Path,
) -> String {
    PASTE_MARKER_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let paste_id = &caps[1];
            let Some(content_hash) = pasted_contents
                .get(paste_id)
                .and_then(|paste| paste.content_hash.as_deref())
            else {
                return caps[0].to_string();
            };

            match read_paste(paste_id, content_hash, paste_cache_dir) {
                Ok(content) => format!(
                    "\n--- Pasted text #{paste_id} ---\n{content}\n--- End pasted text #{paste_id} ---\n"
                ),
                Err(err) => {
                    warn!(
                        paste_id,
                        cache_file = %cache_file_path(paste_cache_dir, content_hash).display(),
                        error = %err,
                        "Pasted text not found in cache"
                    );
                    err.inline_note()
                }
            }
        })
        .into_owned()
}

/// Whether `content_hash` names a file directly inside the cache directory.
fn is_plain_hash(content_hash: &str) -> bool {
    !content_hash.is_empty()
        && content_hash != "."
        && !content_hash.contains("..")
        && !content_hash.contains(['/', '\\', '\0'])
}

fn read_paste(paste_id: &str, content_hash: &str, paste_cache_dir: &Path) -> Result<String, PasteError> {
    let missing = || PasteError::MissingCache {
        paste_id: paste_id.to_string(),
        file_name: format!("{content_hash}.{PASTE_EXTENSION}"),
    };
    if !is_plain_hash(content_hash) {
        return Err(missing());
    }
    fs::read_to_string(cache_file_path(paste_cache_dir, content_hash)).map_err(|_| missing())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn refs(entries: &[(&str, Option<&str>)]) -> HashMap<String, PasteRef> {
        entries
            .iter()
            .map(|(id, hash)| {
                (
                    id.to_string(),
                    PasteRef {
                        local_id: id.to_string(),
                        kind: Some("text".to_string()),
                        content_hash: hash.map(str::to_string),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_marker_replaced_with_cached_content() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("abc.txt"), "line one\nline two").unwrap();

        let out = resolve_pastes(
            "before [Pasted text #3 +10 lines] after",
            &refs(&[("3", Some("abc"))]),
            dir.path(),
        );

        assert_eq!(
            out,
            "before \n--- Pasted text #3 ---\nline one\nline two\n--- End pasted text #3 ---\n after"
        );
    }

    #[test]
    fn test_singular_line_marker() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("h.txt"), "x").unwrap();
        let out = resolve_pastes("[Pasted text #1 +1 line]", &refs(&[("1", Some("h"))]), dir.path());
        assert!(out.contains("--- Pasted text #1 ---\nx\n--- End pasted text #1 ---"));
    }

    #[test]
    fn test_missing_cache_file_note() {
        let dir = TempDir::new().unwrap();
        let out = resolve_pastes(
            "[Pasted text #3 +10 lines]",
            &refs(&[("3", Some("deadbeef"))]),
            dir.path(),
        );
        assert_eq!(out, "[Pasted text #3: cache file missing (deadbeef.txt)]");
        assert!(!out.contains("[Pasted text #3 +10 lines]"));
    }

    #[test]
    fn test_marker_without_metadata_untouched() {
        let dir = TempDir::new().unwrap();
        let text = "[Pasted text #7 +2 lines]";
        assert_eq!(resolve_pastes(text, &HashMap::new(), dir.path()), text);
    }

    #[test]
    fn test_marker_without_hash_untouched() {
        let dir = TempDir::new().unwrap();
        let text = "[Pasted text #2 +5 lines]";
        assert_eq!(resolve_pastes(text, &refs(&[("2", None)]), dir.path()), text);
    }

    #[test]
    fn test_multiple_markers() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "AAA").unwrap();

        let out = resolve_pastes(
            "[Pasted text #1 +3 lines] and [Pasted text #2 +3 lines]",
            &refs(&[("1", Some("a")), ("2", Some("b"))]),
            dir.path(),
        );
        assert!(out.contains("--- Pasted text #1 ---\nAAA\n"));
        assert!(out.contains("[Pasted text #2: cache file missing (b.txt)]"));
    }

    #[test]
    fn test_hash_outside_cache_dir_not_read() {
        let root = TempDir::new().unwrap();
        let cache = root.path().join("paste-cache");
        fs::create_dir(&cache).unwrap();
        fs::write(root.path().join("outside.txt"), "private").unwrap();

        let out = resolve_pastes(
            "[Pasted text #1 +1 line]",
            &refs(&[("1", Some("../outside"))]),
            &cache,
        );
        assert_eq!(out, "[Pasted text #1: cache file missing (../outside.txt)]");
        assert!(!out.contains("private"));
    }

    #[test]
    fn test_plain_hash_rules() {
        assert!(is_plain_hash("3f2a9c"));
        assert!(!is_plain_hash(""));
        assert!(!is_plain_hash(".."));
        assert!(!is_plain_hash("a/b"));
        assert!(!is_plain_hash("a\\b"));
    }

    #[test]
    fn test_cache_file_path() {
        assert_eq!(
            cache_file_path(Path::new("/c/paste-cache"), "ff00"),
            PathBuf::from("/c/paste-cache/ff00.txt")
        );
    }
}
