//! Extracted page item.

use serde::{Deserialize, Serialize};

/// One discrete unit of content extracted from the target page.
///
/// Items are immutable once constructed. Cross-run identity is the `link`
/// when one exists, and `identity_hash` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedItem {
    /// Item title, never empty
    pub title: String,

    /// Absolute URL of the item, if one could be extracted
    pub link: Option<String>,

    /// Extracted body text
    pub content: String,

    /// Deterministic SHA-256 hex digest of the item's canonical form
    pub identity_hash: String,
}

impl ParsedItem {
    /// Case-insensitive keyword match over title and content.
    ///
    /// An empty keyword list matches everything.
    pub fn matches_keywords(&self, keywords: &[String]) -> bool {
        if keywords.is_empty() {
            return true;
        }
        let haystack = format!("{} {}", self.title, self.content).to_lowercase();
        keywords
            .iter()
            .any(|keyword| haystack.contains(&keyword.to_lowercase()))
    }

    /// Message text for notification dispatch: title, plus the link on a
    /// second line when present.
    pub fn notification_text(&self) -> String {
        match &self.link {
            Some(link) => format!("{}\n{}", self.title, link),
            None => self.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_item(title: &str, content: &str) -> ParsedItem {
        ParsedItem {
            title: title.to_string(),
            link: None,
            content: content.to_string(),
            identity_hash: "0".repeat(64),
        }
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let item = make_item("Big Sale Today", "everything must go");
        assert!(item.matches_keywords(&["sale".to_string()]));
        assert!(item.matches_keywords(&["SALE".to_string()]));
    }

    #[test]
    fn test_keywords_no_match() {
        let item = make_item("Regular Update", "nothing special");
        assert!(!item.matches_keywords(&["sale".to_string()]));
    }

    #[test]
    fn test_keywords_match_in_content() {
        let item = make_item("Weekly roundup", "huge SALE this friday");
        assert!(item.matches_keywords(&["sale".to_string()]));
    }

    #[test]
    fn test_empty_keyword_list_matches() {
        let item = make_item("Anything", "at all");
        assert!(item.matches_keywords(&[]));
    }

    #[test]
    fn test_notification_text_with_link() {
        let mut item = make_item("Title", "body");
        item.link = Some("https://example.com/1".to_string());
        assert_eq!(item.notification_text(), "Title\nhttps://example.com/1");
    }

    #[test]
    fn test_notification_text_without_link() {
        let item = make_item("Title", "body");
        assert_eq!(item.notification_text(), "Title");
    }
}
