//! Grouping of prompt history by project and session.
//!
//! Prompts without a session id are collected into one synthetic session
//! that is always listed first; real sessions follow in order of their first
//! prompt. Prompts inside a session keep the history's timestamp order.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::history::PromptEntry;

/// Prompts sharing one session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session<'a> {
    /// `None` for the bucket of prompts issued outside any tracked session.
    pub session_id: Option<&'a str>,
    /// Prompts in timestamp order.
    pub prompts: Vec<&'a PromptEntry>,
}

impl<'a> Session<'a> {
    fn new(session_id: Option<&'a str>) -> Self {
        Self {
            session_id,
            prompts: Vec::new(),
        }
    }

    /// Timestamp of the first prompt, if any.
    #[must_use]
    pub fn started_at(&self) -> Option<i64> {
        self.prompts.first().map(|p| p.timestamp)
    }
}

/// Per-project totals for `--list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub project: String,
    pub prompt_count: usize,
    pub session_count: usize,
}

/// Keeps the entries whose project path equals `project` exactly.
#[must_use]
pub fn filter_by_project<'a>(entries: &'a [PromptEntry], project: &str) -> Vec<&'a PromptEntry> {
    entries.iter().filter(|e| e.project == project).collect()
}

/// Groups entries into sessions.
///
/// The session-less bucket, if non-empty, comes first. Other sessions are
/// ordered by the timestamp of their first prompt; sessions starting at the
/// same millisecond keep first-seen order.
///
/// # Example
///
/// ```
/// use extract_recipe::history::parse_history;
/// use extract_recipe::session::group_by_session;
///
/// let parsed = parse_history(r#"{"display": "a", "timestamp": 1, "project": "/p", "sessionId": "s1"}
/// {"display": "b", "timestamp": 2, "project": "/p"}"#);
/// let entries: Vec<_> = parsed.entries.iter().collect();
///
/// let sessions = group_by_session(&entries);
/// assert_eq!(sessions[0].session_id, None);
/// assert_eq!(sessions[1].session_id, Some("s1"));
/// ```
#[must_use]
pub fn group_by_session<'a>(entries: &[&'a PromptEntry]) -> Vec<Session<'a>> {
    let mut unsessioned = Session::new(None);
    let mut sessions: Vec<Session<'a>> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for &entry in entries {
        match entry.session_id.as_deref() {
            None => unsessioned.prompts.push(entry),
            Some(id) => {
                let slot = *index.entry(id).or_insert_with(|| {
                    sessions.push(Session::new(Some(id)));
                    sessions.len() - 1
                });
                sessions[slot].prompts.push(entry);
            }
        }
    }

    // Stable, so sessions starting at the same instant keep first-seen order
    sessions.sort_by_key(|s| s.started_at());

    let mut result = Vec::with_capacity(sessions.len() + 1);
    if !unsessioned.prompts.is_empty() {
        result.push(unsessioned);
    }
    result.extend(sessions);
    result
}

/// Summarises every project, sorted by path.
///
/// Each distinct session id counts once; prompts without a session id add
/// one more synthetic session.
#[must_use]
pub fn list_projects(entries: &[PromptEntry]) -> Vec<ProjectSummary> {
    #[derive(Default)]
    struct Tally<'a> {
        prompts: usize,
        sessions: HashSet<&'a str>,
        has_unsessioned: bool,
    }

    let mut projects: BTreeMap<&str, Tally<'_>> = BTreeMap::new();
    for entry in entries {
        let tally = projects.entry(entry.project.as_str()).or_default();
        tally.prompts += 1;
        match entry.session_id.as_deref() {
            Some(id) => {
                tally.sessions.insert(id);
            }
            None => tally.has_unsessioned = true,
        }
    }

    projects
        .into_iter()
        .map(|(project, tally)| ProjectSummary {
            project: project.to_string(),
            prompt_count: tally.prompts,
            session_count: tally.sessions.len() + usize::from(tally.has_unsessioned),
        })
        .collect()
}

/// Distinct project paths in sorted order.
#[must_use]
pub fn project_paths(entries: &[PromptEntry]) -> Vec<String> {
    let mut paths: Vec<String> = entries.iter().map(|e| e.project.clone()).collect();
    paths.sort_unstable();
    paths.dedup();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn entry(display: &str, timestamp: i64, project: &str, session: Option<&str>) -> PromptEntry {
        PromptEntry {
            display: display.to_string(),
            pasted_contents: Map::new(),
            timestamp,
            project: project.to_string(),
            session_id: session.map(str::to_string),
        }
    }

    #[test]
    fn test_filter_by_project_is_exact() {
        let entries = vec![
            entry("a", 1, "/work/app", None),
            entry("b", 2, "/work/app2", None),
            entry("c", 3, "/work/app", None),
        ];
        let filtered = filter_by_project(&entries, "/work/app");
        let displays: Vec<&str> = filtered.iter().map(|e| e.display.as_str()).collect();
        assert_eq!(displays, vec!["a", "c"]);
    }

    #[test]
    fn test_unsessioned_bucket_first() {
        let entries = vec![
            entry("s1", 1, "/p", Some("one")),
            entry("none", 5, "/p", None),
            entry("s2", 3, "/p", Some("two")),
        ];
        let refs: Vec<&PromptEntry> = entries.iter().collect();

        let sessions = group_by_session(&refs);
        let ids: Vec<Option<&str>> = sessions.iter().map(|s| s.session_id).collect();
        assert_eq!(ids, vec![None, Some("one"), Some("two")]);
    }

    #[test]
    fn test_sessions_ordered_by_first_prompt() {
        // Interleaved sessions: "late" is seen first but starts later.
        let mut entries = vec![
            entry("b1", 20, "/p", Some("late")),
            entry("a1", 10, "/p", Some("early")),
            entry("b2", 30, "/p", Some("late")),
            entry("a2", 40, "/p", Some("early")),
        ];
        entries.sort_by_key(|e| e.timestamp);
        let refs: Vec<&PromptEntry> = entries.iter().collect();

        let sessions = group_by_session(&refs);
        assert_eq!(sessions[0].session_id, Some("early"));
        assert_eq!(sessions[1].session_id, Some("late"));

        let early: Vec<&str> = sessions[0].prompts.iter().map(|p| p.display.as_str()).collect();
        assert_eq!(early, vec!["a1", "a2"]);
    }

    #[test]
    fn test_no_empty_unsessioned_bucket() {
        let entries = vec![entry("a", 1, "/p", Some("s"))];
        let refs: Vec<&PromptEntry> = entries.iter().collect();
        let sessions = group_by_session(&refs);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, Some("s"));
    }

    #[test]
    fn test_list_projects_counts() {
        let entries = vec![
            entry("1", 1, "A", Some("abcd1234")),
            entry("2", 2, "A", Some("abcd1234")),
            entry("3", 3, "A", None),
            entry("4", 4, "B", Some("zzzz")),
        ];

        let summaries = list_projects(&entries);
        assert_eq!(
            summaries,
            vec![
                ProjectSummary {
                    project: "A".to_string(),
                    prompt_count: 3,
                    session_count: 2,
                },
                ProjectSummary {
                    project: "B".to_string(),
                    prompt_count: 1,
                    session_count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_project_paths_sorted_and_distinct() {
        let entries = vec![
            entry("1", 1, "/b", None),
            entry("2", 2, "/a", None),
            entry("3", 3, "/b", None),
        ];
        assert_eq!(project_paths(&entries), vec!["/a", "/b"]);
    }
}
