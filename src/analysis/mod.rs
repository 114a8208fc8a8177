//! Page content analysis
//!
//! Looks at a page snapshot sent by the extension and reports selectors for
//! its interactive elements, a coarse content type, and a few suggestions
//! for what could be done next.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::error::{RelayError, RelayResult};

const INTERACTIVE: &str = "input, button, a, select, textarea";
const SEARCH_FIELDS: &str = "input[type='search'], input[name='q'], [role='searchbox']";
const SEARCH_SUGGESTION_FIELDS: &str = "input[type='search'], input[name='q']";
const NAVIGATION: &str = "nav, .navigation, .menu";
const BUTTONS: &str = "button, input[type='submit'], input[type='button']";

/// Coarse classification of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Search,
    Form,
    Navigation,
    General,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Search => "search",
            ContentType::Form => "form",
            ContentType::Navigation => "navigation",
            ContentType::General => "general",
        }
    }
}

/// `CONTENT_ANALYSIS` payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAnalysis {
    pub selectors: Vec<String>,
    pub suggestions: Vec<String>,
    pub content_type: ContentType,
}

/// Analyze an HTML snapshot. Blank documents such as `about:blank` come back
/// as `general` with nothing to suggest.
pub fn analyze_page(html: &str) -> RelayResult<ContentAnalysis> {
    let document = Html::parse_document(html);

    let interactive = parse_selector(INTERACTIVE)?;
    let selectors = document.select(&interactive).map(selector_for).collect();

    Ok(ContentAnalysis {
        selectors,
        suggestions: suggestions(&document)?,
        content_type: content_type(&document)?,
    })
}

fn parse_selector(css: &str) -> RelayResult<Selector> {
    Selector::parse(css).map_err(|e| RelayError::Analysis(format!("bad selector {}: {}", css, e)))
}

fn count(document: &Html, css: &str) -> RelayResult<usize> {
    let selector = parse_selector(css)?;
    Ok(document.select(&selector).count())
}

/// Most specific selector available for one element
///
/// Preference: id, name, a lone class, role, tag with type, bare tag.
pub fn selector_for(element: ElementRef<'_>) -> String {
    let el = element.value();
    let attr = |name: &str| el.attr(name).filter(|v| !v.is_empty());

    if let Some(id) = attr("id") {
        return format!("#{}", id);
    }

    if let Some(name) = attr("name") {
        return format!("[name='{}']", name);
    }

    if let Some(class) = attr("class") {
        let classes: Vec<&str> = class.split_whitespace().collect();
        if classes.len() == 1 {
            return format!(".{}", classes[0]);
        }
    }

    if let Some(role) = attr("role") {
        return format!("[role='{}']", role);
    }

    let tag = el.name();
    match attr("type") {
        Some(kind) => format!("{}[type='{}']", tag, kind),
        None => tag.to_string(),
    }
}

fn content_type(document: &Html) -> RelayResult<ContentType> {
    if count(document, SEARCH_FIELDS)? > 0 {
        return Ok(ContentType::Search);
    }
    if count(document, "form")? > 0 {
        return Ok(ContentType::Form);
    }
    if count(document, NAVIGATION)? > 0 {
        return Ok(ContentType::Navigation);
    }
    Ok(ContentType::General)
}

fn suggestions(document: &Html) -> RelayResult<Vec<String>> {
    let mut suggestions = Vec::new();

    if count(document, SEARCH_SUGGESTION_FIELDS)? > 0 {
        suggestions.push("Search for something".to_string());
    }

    let links = count(document, "a[href]")?;
    if links > 0 {
        suggestions.push(format!("Click on one of {} links", links));
    }

    let buttons = count(document, BUTTONS)?;
    if buttons > 0 {
        suggestions.push(format!("Click on one of {} buttons", buttons));
    }

    Ok(suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <form action="/search">
            <input name="q" type="text">
            <button class="btn primary" type="submit">Go</button>
          </form>
          <a href="/about" id="about">About</a>
          <a href="/help" class="help">Help</a>
          <a role="button">Menu</a>
        </body></html>
    "#;

    #[test]
    fn test_selector_preference() {
        let analysis = analyze_page(SEARCH_PAGE).unwrap();
        assert_eq!(
            analysis.selectors,
            vec![
                "[name='q']",
                "button[type='submit']",
                "#about",
                ".help",
                "[role='button']",
            ]
        );
    }

    #[test]
    fn test_search_page() {
        let analysis = analyze_page(SEARCH_PAGE).unwrap();
        assert_eq!(analysis.content_type, ContentType::Search);
        assert_eq!(
            analysis.suggestions,
            vec![
                "Search for something",
                "Click on one of 2 links",
                "Click on one of 1 buttons",
            ]
        );
    }

    #[test]
    fn test_content_type_precedence() {
        let form = analyze_page("<form><input type='email'></form><nav></nav>").unwrap();
        assert_eq!(form.content_type, ContentType::Form);
        assert_eq!(form.selectors, vec!["input[type='email']"]);

        let nav = analyze_page("<div class='menu'><a href='/'>Home</a></div>").unwrap();
        assert_eq!(nav.content_type, ContentType::Navigation);

        let plain = analyze_page("<p>Just text</p>").unwrap();
        assert_eq!(plain.content_type, ContentType::General);
        assert!(plain.selectors.is_empty());
        assert!(plain.suggestions.is_empty());
    }

    #[test]
    fn test_blank_html_is_general() {
        let analysis = analyze_page("   ").unwrap();
        assert_eq!(
            analysis,
            ContentAnalysis {
                selectors: vec![],
                suggestions: vec![],
                content_type: ContentType::General,
            }
        );
    }

    #[test]
    fn test_wire_format() {
        let analysis = analyze_page("<a href='/x'>x</a>").unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["contentType"], "general");
        assert_eq!(json["selectors"][0], "a");
    }
}
