//! Alternate planner support: eligibility, response parsing and validation
//!
//! The oracle is an LLM that turns free text into steps. Its output is
//! untrusted: only known actions survive, and steps that look hallucinated
//! are filtered out unless that would leave nothing.

use anyhow::{anyhow, Result};
use serde::Deserialize;

use super::keywords::contains_any;
use super::types::{Command, Plan, PlanProposal};

/// Phrases that suggest an ambiguous goal worth sending to the oracle
const AMBIGUOUS_PHRASES: &[&str] = &[
    "find", "get", "show", "look for", "look up", "what is", "tell me", "help me", "can you",
    "i want", "i need", "please", "select", "choose", "pick",
];

/// Phrases the rule-based planner handles well on its own
const SIMPLE_PATTERNS: &[&str] = &[
    "navigate to",
    "go to",
    "visit",
    "search for",
    "click",
    "type",
];

const LONG_GOAL_CHARS: usize = 80;
const UNPATTERNED_GOAL_CHARS: usize = 30;

const ALLOWED_ACTIONS: &[&str] = &["navigate", "input", "click", "get_content"];

/// Navigation targets that are almost always copied from prompt examples
const PLACEHOLDER_URL_MARKERS: &[&str] = &["example.com", "checkout"];

const PLACEHOLDER_SELECTOR_MARKER: &str = "example";

/// Whether a goal is ambiguous or long enough to ask the oracle
pub fn should_use_alternate_planner(goal: &str) -> bool {
    let goal = goal.trim().to_lowercase();

    if contains_any(&goal, AMBIGUOUS_PHRASES) {
        return true;
    }

    if goal.len() > LONG_GOAL_CHARS {
        return true;
    }

    !contains_any(&goal, SIMPLE_PATTERNS) && goal.len() > UNPATTERNED_GOAL_CHARS
}

/// Parsed oracle response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParsedGoal {
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub steps: Vec<ProposedStep>,
    #[serde(default)]
    pub confidence: f64,
}

/// A step as the oracle wrote it, before validation
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProposedStep {
    #[serde(default)]
    pub action: String,
    pub url: Option<String>,
    pub selector: Option<String>,
    pub text: Option<String>,
}

impl ProposedStep {
    /// Build a command if the action is known and its fields are present
    fn into_command(self) -> Option<Command> {
        match self.action.as_str() {
            "navigate" => self.url.filter(|u| !u.is_empty()).map(Command::navigate),
            "click" => self.selector.filter(|s| !s.is_empty()).map(Command::click),
            "input" => match (self.selector, self.text) {
                (Some(selector), Some(text)) if !selector.is_empty() => {
                    Some(Command::input(selector, text))
                }
                _ => None,
            },
            "get_content" => Some(Command::get_content()),
            _ => None,
        }
    }
}

/// Parse raw oracle text into a goal.
///
/// Accepts a bare object, or any number of objects scattered through the
/// text, fenced or not (steps merged in order, highest confidence kept).
pub fn parse_oracle_response(response: &str) -> Result<ParsedGoal> {
    if let Ok(parsed) = serde_json::from_str::<ParsedGoal>(response.trim()) {
        return Ok(parsed);
    }

    let mut merged: Option<ParsedGoal> = None;
    for object in json_objects(response) {
        let parsed: ParsedGoal = match serde_json::from_str(object) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Skipping unparsable object in oracle response: {}", e);
                continue;
            }
        };

        merged = Some(match merged {
            None => parsed,
            Some(mut acc) => {
                acc.steps.extend(parsed.steps);
                acc.confidence = acc.confidence.max(parsed.confidence);
                acc
            }
        });
    }

    merged.ok_or_else(|| {
        anyhow!(
            "No valid JSON found in oracle response: {}",
            response.chars().take(200).collect::<String>()
        )
    })
}

/// Every complete, brace-balanced top-level object in `text`, in order.
/// Braces inside string literals are ignored.
fn json_objects(text: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        objects.push(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    objects
}

/// Turn proposed steps into commands, dropping unknown or malformed actions
pub fn validate_steps(steps: Vec<ProposedStep>) -> Plan {
    steps
        .into_iter()
        .filter_map(|step| {
            if !ALLOWED_ACTIONS.contains(&step.action.as_str()) {
                tracing::warn!("Dropping oracle step with unknown action '{}'", step.action);
                return None;
            }
            let action = step.action.clone();
            let command = step.into_command();
            if command.is_none() {
                tracing::warn!("Dropping oracle '{}' step with missing fields", action);
            }
            command
        })
        .collect()
}

/// Remove commands that look fabricated. Reverts to the input if nothing
/// would remain.
pub fn sanitize_commands(commands: Plan) -> Plan {
    let mut kept: Plan = Vec::with_capacity(commands.len());

    for (i, command) in commands.iter().enumerate() {
        let drop = match command {
            Command::Navigate { url } => {
                let url = url.to_lowercase();
                contains_any(&url, PLACEHOLDER_URL_MARKERS)
            }
            Command::Click { selector } => {
                selector.to_lowercase().contains(PLACEHOLDER_SELECTOR_MARKER)
            }
            Command::GetContent {} => {
                i == 0 && matches!(commands.get(1), Some(Command::Click { .. }))
            }
            Command::Input { .. } => false,
        };

        if drop {
            tracing::debug!("Filtering suspicious oracle command: {:?}", command);
        } else {
            kept.push(command.clone());
        }
    }

    if kept.is_empty() {
        tracing::debug!("Filtering removed every oracle command, keeping originals");
        return commands;
    }

    kept
}

/// Parse, validate and sanitize an oracle response into a proposal
pub fn proposal_from_response(response: &str) -> Result<PlanProposal> {
    let parsed = parse_oracle_response(response)?;
    tracing::debug!(
        "Oracle intent '{}' with {} raw steps",
        parsed.intent,
        parsed.steps.len()
    );

    let validated = validate_steps(parsed.steps);
    if validated.is_empty() {
        anyhow::bail!("Oracle response contained no valid steps");
    }

    Ok(PlanProposal::new(
        sanitize_commands(validated),
        parsed.confidence,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligibility() {
        assert!(should_use_alternate_planner(
            "find a recipe for lasagna and show me reviews"
        ));
        assert!(!should_use_alternate_planner("search for cats"));
        assert!(!should_use_alternate_planner("go to github.com"));
        assert!(should_use_alternate_planner("Please open my inbox"));
    }

    #[test]
    fn test_eligibility_by_length() {
        let long = format!("go to {}.com", "a".repeat(80));
        assert!(should_use_alternate_planner(&long));

        // No simple pattern and longer than 30 characters
        assert!(should_use_alternate_planner(
            "compare the two laptops on this page side by side"
        ));
        // No simple pattern but short
        assert!(!should_use_alternate_planner("youtube.com"));
    }

    #[test]
    fn test_parse_single_object() {
        let parsed = parse_oracle_response(
            r#"{"intent": "search", "steps": [{"action": "navigate", "url": "https://google.com"}], "confidence": 0.9}"#,
        )
        .unwrap();
        assert_eq!(parsed.intent, "search");
        assert_eq!(parsed.steps.len(), 1);
        assert_eq!(parsed.confidence, 0.9);
    }

    #[test]
    fn test_parse_fenced_object() {
        let response = "Here you go:\n```json\n{\"steps\": [{\"action\": \"get_content\"}], \"confidence\": 0.5}\n```";
        let parsed = parse_oracle_response(response).unwrap();
        assert_eq!(parsed.steps.len(), 1);
    }

    #[test]
    fn test_parse_concatenated_objects_merges_steps() {
        let response = r##"{"intent": "a", "steps": [{"action": "navigate", "url": "https://amazon.com"}], "confidence": 0.6}
{"intent": "b", "steps": [{"action": "input", "selector": "#q", "text": "shoes {size 9}"}, {"action": "click", "selector": "button"}], "confidence": 0.8}"##;
        let parsed = parse_oracle_response(response).unwrap();
        assert_eq!(parsed.steps.len(), 3);
        assert_eq!(parsed.steps[0].action, "navigate");
        assert_eq!(parsed.steps[1].text.as_deref(), Some("shoes {size 9}"));
        assert_eq!(parsed.confidence, 0.8);
    }

    #[test]
    fn test_parse_merges_every_fenced_block() {
        let response = "First:\n```json\n{\"steps\": [{\"action\": \"navigate\", \"url\": \"https://ebay.com\"}], \"confidence\": 0.6}\n```\nThen:\n```json\n{\"steps\": [{\"action\": \"click\", \"selector\": \"a\"}], \"confidence\": 0.9}\n```";
        let parsed = parse_oracle_response(response).unwrap();
        let actions: Vec<&str> = parsed.steps.iter().map(|s| s.action.as_str()).collect();
        assert_eq!(actions, vec!["navigate", "click"]);
        assert_eq!(parsed.confidence, 0.9);
    }

    #[test]
    fn test_parse_bare_object_then_fenced_object() {
        let response = "{\"steps\": [{\"action\": \"navigate\", \"url\": \"https://ebay.com\"}], \"confidence\": 0.5}\nand also\n```json\n{\"steps\": [{\"action\": \"input\", \"selector\": \"#gh-ac\", \"text\": \"lamp\"}], \"confidence\": 0.4}\n```";
        let parsed = parse_oracle_response(response).unwrap();
        assert_eq!(parsed.steps.len(), 2);
        assert_eq!(parsed.steps[0].action, "navigate");
        assert_eq!(parsed.steps[1].text.as_deref(), Some("lamp"));
        assert_eq!(parsed.confidence, 0.5);
    }

    #[test]
    fn test_parse_no_json() {
        assert!(parse_oracle_response("I cannot help with that").is_err());
    }

    #[test]
    fn test_validate_drops_unknown_actions() {
        let steps = vec![
            ProposedStep {
                action: "find".to_string(),
                text: Some("cats".to_string()),
                ..Default::default()
            },
            ProposedStep {
                action: "navigate".to_string(),
                url: Some("https://google.com".to_string()),
                ..Default::default()
            },
            ProposedStep {
                action: "click".to_string(),
                ..Default::default()
            },
        ];
        assert_eq!(
            validate_steps(steps),
            vec![Command::navigate("https://google.com")]
        );
    }

    #[test]
    fn test_sanitize_drops_placeholder_navigation() {
        let commands = vec![
            Command::navigate("https://example.com"),
            Command::input("#q", "cats"),
            Command::click("button[type='submit']"),
        ];
        assert_eq!(
            sanitize_commands(commands),
            vec![
                Command::input("#q", "cats"),
                Command::click("button[type='submit']"),
            ]
        );
    }

    #[test]
    fn test_sanitize_reverts_when_everything_is_filtered() {
        let commands = vec![Command::navigate("https://example.com")];
        assert_eq!(sanitize_commands(commands.clone()), commands);
    }

    #[test]
    fn test_sanitize_other_heuristics() {
        let commands = vec![
            Command::get_content(),
            Command::click(".product-card"),
            Command::click("#example-button"),
            Command::navigate("https://shop.com/checkout"),
        ];
        assert_eq!(
            sanitize_commands(commands),
            vec![Command::click(".product-card")]
        );
    }

    #[test]
    fn test_sanitize_keeps_get_content_not_followed_by_click() {
        let commands = vec![Command::get_content(), Command::navigate("https://a.com")];
        assert_eq!(sanitize_commands(commands.clone()), commands);
    }

    #[test]
    fn test_proposal_rejects_all_invalid() {
        let response = r#"{"steps": [{"action": "scroll"}], "confidence": 0.99}"#;
        assert!(proposal_from_response(response).is_err());
    }
}
