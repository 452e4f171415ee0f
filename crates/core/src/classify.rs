use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::token::Token;

static MEMBER_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d+\)\s*$").expect("valid member count regex"));

const TITLE_PHRASE: &str = "project and member breakdown";
const TITLE_WORDS: [&str; 3] = ["project", "member", "duration"];

/// Whether a page carries the project/member breakdown table.
///
/// Matches the report title, or all of "project", "member" and "duration"
/// anywhere on the page when the title is phrased differently.
pub fn is_breakdown_page(tokens: &[Token]) -> bool {
    let text = tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    text.contains(TITLE_PHRASE) || TITLE_WORDS.iter().all(|w| text.contains(w))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowKind {
    Project,
    Total,
    WithoutProject,
    Member,
}

impl RowKind {
    /// Member rows are detail lines and never reach the output.
    pub fn is_kept(self) -> bool {
        !matches!(self, RowKind::Member)
    }
}

impl std::fmt::Display for RowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RowKind::Project => "project",
            RowKind::Total => "total",
            RowKind::WithoutProject => "without project",
            RowKind::Member => "member",
        };
        f.write_str(name)
    }
}

/// Label a row from its left-column text.
///
/// Returns `None` for blank text.
pub fn classify(left_text: &str) -> Option<(RowKind, String)> {
    let text = left_text.trim();
    if text.is_empty() {
        return None;
    }

    let lower = text.to_lowercase();
    if lower.starts_with("total") {
        return Some((RowKind::Total, "TOTAL".to_string()));
    }
    if lower.starts_with("without") {
        return Some((RowKind::WithoutProject, "Without project".to_string()));
    }
    if let Some(m) = MEMBER_COUNT_RE.find(text) {
        let label = text[..m.start()].trim().to_string();
        return Some((RowKind::Project, label));
    }

    Some((RowKind::Member, text.to_string()))
}

/// `"24,13%"` -> `"24.13%"`.
pub fn normalize_percent(text: &str) -> String {
    text.trim().replace(',', ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tests::make_token;

    fn page(words: &[&str]) -> Vec<Token> {
        words
            .iter()
            .enumerate()
            .map(|(i, w)| make_token(w, 50.0 * i as f32, 100.0))
            .collect()
    }

    // ============================================================================
    // is_breakdown_page tests
    // ============================================================================

    #[test]
    fn test_title_phrase_matches() {
        assert!(is_breakdown_page(&page(&["Project", "and", "Member", "Breakdown"])));
    }

    #[test]
    fn test_fallback_words_any_order() {
        assert!(is_breakdown_page(&page(&["DURATION", "Members", "PROJECT"])));
    }

    #[test]
    fn test_missing_word_rejects() {
        assert!(!is_breakdown_page(&page(&["Project", "Duration", "Summary"])));
    }

    #[test]
    fn test_empty_page_rejects() {
        assert!(!is_breakdown_page(&[]));
    }

    // ============================================================================
    // classify tests
    // ============================================================================

    #[test]
    fn test_member_count_suffix_is_project() {
        assert_eq!(
            classify("Website Redesign (4)"),
            Some((RowKind::Project, "Website Redesign".to_string()))
        );
    }

    #[test]
    fn test_member_count_with_trailing_space() {
        assert_eq!(
            classify("Marketing (2)  "),
            Some((RowKind::Project, "Marketing".to_string()))
        );
    }

    #[test]
    fn test_total_any_case() {
        for text in ["Total", "TOTAL", "total hours"] {
            assert_eq!(classify(text), Some((RowKind::Total, "TOTAL".to_string())));
        }
    }

    #[test]
    fn test_without_project() {
        assert_eq!(
            classify("Without project (3)"),
            Some((RowKind::WithoutProject, "Without project".to_string()))
        );
    }

    #[test]
    fn test_plain_name_is_member() {
        assert_eq!(
            classify("Jane Doe"),
            Some((RowKind::Member, "Jane Doe".to_string()))
        );
    }

    #[test]
    fn test_parenthesized_word_is_member() {
        assert_eq!(classify("Ops (lead)").map(|(k, _)| k), Some(RowKind::Member));
    }

    #[test]
    fn test_blank_is_dropped() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("   "), None);
    }

    #[test]
    fn test_only_member_is_not_kept() {
        assert!(RowKind::Project.is_kept());
        assert!(RowKind::Total.is_kept());
        assert!(RowKind::WithoutProject.is_kept());
        assert!(!RowKind::Member.is_kept());
    }

    // ============================================================================
    // normalize_percent tests
    // ============================================================================

    #[test]
    fn test_normalize_percent() {
        assert_eq!(normalize_percent("24,13%"), "24.13%");
        assert_eq!(normalize_percent(" 100% "), "100%");
        assert_eq!(normalize_percent("7.5%"), "7.5%");
    }
}
