//! Keyword classification for goal fragments
//!
//! Plain substring membership: no tokenization and no word boundaries, so a
//! keyword embedded in a longer word still matches ("reopen" is navigation).

const NAVIGATION_KEYWORDS: &[&str] = &["navigate", "go to", "visit", "open", "browse to"];

const CONTENT_KEYWORDS: &[&str] = &[
    "get content",
    "page content",
    "read page",
    "extract content",
    "analyze page",
];

const SEARCH_KEYWORDS: &[&str] = &["search", "find", "look for", "type"];

const CLICK_KEYWORDS: &[&str] = &["click", "press", "tap", "select"];

const URL_MARKERS: &[&str] = &[".com", ".org", ".net", ".edu", ".gov", "http", "www."];

/// Which intent categories a fragment belongs to. Categories are not exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntentFlags {
    pub navigation: bool,
    pub content: bool,
    pub search: bool,
    pub click: bool,
}

impl IntentFlags {
    pub fn any(&self) -> bool {
        self.navigation || self.content || self.search || self.click
    }
}

/// Classify a lower-cased, trimmed fragment
pub fn classify(fragment: &str) -> IntentFlags {
    IntentFlags {
        navigation: is_navigation(fragment),
        content: is_content_read(fragment),
        search: is_search(fragment),
        click: is_click(fragment),
    }
}

pub fn is_navigation(fragment: &str) -> bool {
    contains_any(fragment, NAVIGATION_KEYWORDS)
}

pub fn is_content_read(fragment: &str) -> bool {
    contains_any(fragment, CONTENT_KEYWORDS)
}

pub fn is_search(fragment: &str) -> bool {
    contains_any(fragment, SEARCH_KEYWORDS)
}

pub fn is_click(fragment: &str) -> bool {
    contains_any(fragment, CLICK_KEYWORDS)
}

/// Whether the text carries anything that looks like part of a URL
pub fn contains_url_marker(text: &str) -> bool {
    contains_any(text, URL_MARKERS)
}

/// Check if text contains any of the keywords
pub(crate) fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}
