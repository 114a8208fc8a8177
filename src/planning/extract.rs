//! Entity extraction from goal fragments
//!
//! Pulls a URL, a coarse selector or a search term out of a fragment. These
//! never fail: when nothing specific is found they fall back to something the
//! extension can still act on. Selector refinement happens in the page.

use regex::Regex;

use super::keywords::contains_url_marker;

/// Used when a goal names no site at all
pub const DEFAULT_SEARCH_URL: &str = "https://google.com";

/// Sites recognised by bare name, checked in this order
const KNOWN_SITES: &[(&str, &str)] = &[
    ("google", "https://google.com"),
    ("github", "https://github.com"),
    ("youtube", "https://youtube.com"),
    ("facebook", "https://facebook.com"),
    ("twitter", "https://twitter.com"),
    ("linkedin", "https://linkedin.com"),
];

/// Phrases that introduce a search term, checked in this order
const SEARCH_INTRODUCERS: &[&str] = &["search for ", "search ", "find ", "look for "];

lazy_static::lazy_static! {
    static ref DOMAIN_PATTERN: Regex = Regex::new(
        r"(?i)(?:https?://)?(?:www\.)?[a-z0-9-]+\.(?:com|org|net|edu|gov|io|co)(?:/\S*)?"
    )
    .expect("domain pattern is valid");
}

/// Extract a navigable URL from a goal fragment
pub fn extract_url(goal: &str) -> String {
    if let Some(found) = DOMAIN_PATTERN.find(goal) {
        return with_scheme(found.as_str());
    }

    if let Some(word) = goal.split_whitespace().find(|w| contains_url_marker(w)) {
        return with_scheme(word);
    }

    KNOWN_SITES
        .iter()
        .find(|(site, _)| goal.contains(site))
        .map(|(_, url)| url.to_string())
        .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string())
}

fn with_scheme(candidate: &str) -> String {
    if candidate.starts_with("http") {
        candidate.to_string()
    } else {
        format!("https://{}", candidate)
    }
}

/// Pick a selector for a click fragment
pub fn extract_selector(goal: &str) -> String {
    if goal.contains("button") {
        "button".to_string()
    } else if goal.contains("link") {
        "a".to_string()
    } else {
        "*".to_string()
    }
}

/// Extract the search term from a search fragment
pub fn extract_search_term(goal: &str) -> String {
    let lowered = goal.to_lowercase();

    for introducer in SEARCH_INTRODUCERS {
        if let Some(idx) = lowered.find(introducer) {
            return lowered[idx + introducer.len()..].trim().to_string();
        }
    }

    lowered.trim().to_string()
}
