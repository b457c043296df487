//! Path and pattern utilities shared by the change set builder and processors

use crate::error::{Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Separator used for root-relative repository paths.
pub const SEPARATOR: char = '/';

/// Normalize a repository-relative path so that it begins with a separator.
///
/// Git reports paths without a leading slash; change sets always carry one.
///
/// ```
/// use content_deployer::path::normalize_repo_path;
///
/// assert_eq!(normalize_repo_path("site/a.xml"), "/site/a.xml");
/// assert_eq!(normalize_repo_path("/site/a.xml"), "/site/a.xml");
/// ```
pub fn normalize_repo_path(path: &str) -> String {
    if path.starts_with(SEPARATOR) {
        path.to_string()
    } else {
        format!("{}{}", SEPARATOR, path)
    }
}

/// Resolve a change set path against a working copy root.
///
/// The leading separator is stripped first, so `/site/a.xml` under `/repo`
/// becomes `/repo/site/a.xml` rather than replacing the root.
pub fn resolve_in_root(root: &Path, path: &str) -> PathBuf {
    root.join(path.trim_start_matches(SEPARATOR))
}

/// Compile a pattern so that it only matches the entire input.
///
/// Patterns in site configuration follow full-string semantics: `.*\.xml$`
/// and `.*\.xml` behave the same, and `site/.*` does not match
/// `/site/a.xml`.
pub fn full_match_regex(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(Error::Regex)
}

/// Compile a list of full-match patterns.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| full_match_regex(p)).collect()
}

/// Whether `path` fully matches any of the compiled patterns.
pub fn matches_any(path: &str, patterns: &[Regex]) -> bool {
    !path.is_empty() && patterns.iter().any(|p| p.is_match(path))
}

/// Substitute every `%s` in a printf-style format string with `value`.
///
/// Index id formats in existing site files are written as `%s-default`.
pub fn format_placeholder(format: &str, value: &str) -> String {
    format.replace("%s", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_repo_path() {
        assert_eq!(normalize_repo_path("a.xml"), "/a.xml");
        assert_eq!(normalize_repo_path("site/website/index.xml"), "/site/website/index.xml");
        assert_eq!(normalize_repo_path("/already/rooted"), "/already/rooted");
    }

    #[test]
    fn test_resolve_in_root() {
        let root = Path::new("/var/repo");
        assert_eq!(
            resolve_in_root(root, "/site/a.xml"),
            PathBuf::from("/var/repo/site/a.xml")
        );
        assert_eq!(
            resolve_in_root(root, "site/a.xml"),
            PathBuf::from("/var/repo/site/a.xml")
        );
    }

    #[test]
    fn test_full_match_regex_is_anchored() {
        let regex = full_match_regex(r"/site/.*\.xml").unwrap();
        assert!(regex.is_match("/site/a.xml"));
        assert!(!regex.is_match("/static/site/a.xml"));
        assert!(!regex.is_match("/site/a.xml.bak"));
    }

    #[test]
    fn test_full_match_regex_keeps_alternation_grouped() {
        let regex = full_match_regex(r"/a\.xml|/b\.xml").unwrap();
        assert!(regex.is_match("/a.xml"));
        assert!(regex.is_match("/b.xml"));
        assert!(!regex.is_match("/a.xml/b.xml"));
    }

    #[test]
    fn test_full_match_regex_is_case_sensitive() {
        let regex = full_match_regex(r".*\.xml$").unwrap();
        assert!(!regex.is_match("/site/A.XML"));
    }

    #[test]
    fn test_matches_any() {
        let patterns = compile_patterns(&[r".*\.jpg".to_string(), r".*\.png".to_string()]).unwrap();
        assert!(matches_any("/images/a.png", &patterns));
        assert!(!matches_any("/site/a.xml", &patterns));
        assert!(!matches_any("", &patterns));
        assert!(!matches_any("/images/a.png", &[]));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(full_match_regex("(unclosed"), Err(Error::Regex(_))));
    }

    #[test]
    fn test_format_placeholder() {
        assert_eq!(format_placeholder("%s-default", "acme"), "acme-default");
        assert_eq!(format_placeholder("static", "acme"), "static");
    }
}
