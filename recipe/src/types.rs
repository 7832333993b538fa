//! Structured recipe document model.
//!
//! Both output formats are rendered from these types: JSON serializes them
//! directly, markdown walks them in [`crate::formatter`].

use serde::{Deserialize, Serialize};

/// One item in a rendered session.
///
/// Uses serde's internally tagged representation:
///
/// ```
/// use extract_recipe::types::RecipeItem;
///
/// let item = RecipeItem::ContextBreak {
///     command: "clear".to_string(),
///     comment: Some("cleanup".to_string()),
/// };
/// let json = serde_json::to_string(&item).unwrap();
/// assert_eq!(json, r#"{"type":"context_break","command":"clear","comment":"cleanup"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecipeItem {
    /// An ordinary prompt.
    Prompt {
        /// `"7"`, or `"2.3"` when numbering is scoped to sub-sessions.
        number: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date: Option<String>,
        text: String,
    },
    /// A plan-mode prompt collapsed to its title.
    Plan {
        number: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date: Option<String>,
        title: String,
    },
    /// `/clear`, `/compact` or `/compress`. Never numbered.
    ContextBreak {
        command: String,
        #[serde(default)]
        comment: Option<String>,
    },
}

/// A displayed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSession {
    /// Source session id; under redaction, its stable per-document number.
    pub session_id: Option<String>,
    /// Heading text, e.g. `Session 6e45a55c` or `Session (no ID)`.
    pub label: String,
    pub items: Vec<RecipeItem>,
}

/// The recipe for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub project: String,
    pub sessions: Vec<RecipeSession>,
}

/// Wrapper for `--all` JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeCollection {
    pub projects: Vec<Recipe>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_serialization_omits_missing_dates() {
        let item = RecipeItem::Prompt {
            number: "1.2".to_string(),
            timestamp: None,
            date: None,
            text: "hello".to_string(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "prompt", "number": "1.2", "text": "hello"})
        );
    }

    #[test]
    fn test_plan_serialization() {
        let item = RecipeItem::Plan {
            number: "4".to_string(),
            timestamp: Some(1000),
            date: Some("1970-01-01 00:00:01 UTC".to_string()),
            title: "Add caching".to_string(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "plan");
        assert_eq!(json["timestamp"], 1000);
        assert_eq!(json["title"], "Add caching");
    }

    #[test]
    fn test_context_break_comment_null() {
        let item = RecipeItem::ContextBreak {
            command: "compact".to_string(),
            comment: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "context_break", "command": "compact", "comment": null})
        );
    }

    #[test]
    fn test_recipe_deserialization() {
        let json = r#"{
            "project": "/p",
            "sessions": [{"session_id": null, "label": "Session (no ID)", "items": [
                {"type": "prompt", "number": "1", "text": "hi"}
            ]}]
        }"#;
        let recipe: Recipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.sessions.len(), 1);
        assert!(matches!(
            recipe.sessions[0].items[0],
            RecipeItem::Prompt { .. }
        ));
    }
}
