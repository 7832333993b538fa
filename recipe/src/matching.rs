//! Resolution of the PROJECT argument to project paths.

use std::collections::BTreeMap;

use similar::TextDiff;

/// Minimum similarity for a fuzzy suggestion.
pub const SUGGESTION_CUTOFF: f32 = 0.5;

/// Most path suffixes offered as suggestions.
pub const MAX_SUGGESTIONS: usize = 5;

/// Finds the projects selected by `target`.
///
/// A full path equal to `target` always wins. With `exact`, a project
/// matches when its path ends with `/target`, so `-e app` selects
/// `/src/app` but not `/src/app2`. Otherwise `target` is a
/// case-insensitive substring.
///
/// ```
/// use extract_recipe::matching::match_projects;
///
/// let all = vec!["/src/app".to_string(), "/src/app2".to_string()];
/// assert_eq!(match_projects("APP", &all, false).len(), 2);
/// assert_eq!(match_projects("app", &all, true), vec!["/src/app"]);
/// ```
#[must_use]
pub fn match_projects<'a>(target: &str, all_paths: &'a [String], exact: bool) -> Vec<&'a str> {
    if let Some(path) = all_paths.iter().find(|p| p.as_str() == target) {
        return vec![path.as_str()];
    }

    if exact {
        let suffix = format!("/{target}");
        all_paths
            .iter()
            .filter(|p| p.ends_with(&suffix))
            .map(String::as_str)
            .collect()
    } else {
        let needle = target.to_lowercase();
        all_paths
            .iter()
            .filter(|p| p.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }
}

/// Suggests projects whose trailing path components resemble `target`.
///
/// Compares `target` with the last N components of each path, where N is
/// the number of components in `target`, so typos in a project name still
/// find it. Best matches come first.
#[must_use]
pub fn fuzzy_suggest<'a>(target: &str, all_paths: &'a [String]) -> Vec<&'a str> {
    let components = target.matches('/').count() + 1;

    let mut by_suffix: BTreeMap<String, Vec<&'a str>> = BTreeMap::new();
    for path in all_paths {
        let parts: Vec<&str> = path.split('/').collect();
        let suffix = parts[parts.len().saturating_sub(components)..].join("/");
        by_suffix.entry(suffix).or_default().push(path.as_str());
    }

    let mut scored: Vec<(f32, &String)> = by_suffix
        .keys()
        .map(|suffix| (TextDiff::from_chars(target, suffix.as_str()).ratio(), suffix))
        .filter(|&(ratio, _)| ratio >= SUGGESTION_CUTOFF)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.truncate(MAX_SUGGESTIONS);

    scored
        .into_iter()
        .flat_map(|(_, suffix)| by_suffix[suffix].iter().copied())
        .collect()
}
