//! Core types for goal planning

use serde::{Deserialize, Serialize};

/// A single browser action sent to the extension.
///
/// Serializes to the flat wire shape the content script expects:
/// `{"action": "navigate", "url": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    Navigate { url: String },
    Click { selector: String },
    Input { selector: String, text: String },
    GetContent {},
}

impl Command {
    pub fn navigate(url: impl Into<String>) -> Self {
        Command::Navigate { url: url.into() }
    }

    pub fn click(selector: impl Into<String>) -> Self {
        Command::Click {
            selector: selector.into(),
        }
    }

    pub fn input(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Command::Input {
            selector: selector.into(),
            text: text.into(),
        }
    }

    pub fn get_content() -> Self {
        Command::GetContent {}
    }

    /// Wire action tag
    pub fn action(&self) -> &'static str {
        match self {
            Command::Navigate { .. } => "navigate",
            Command::Click { .. } => "click",
            Command::Input { .. } => "input",
            Command::GetContent {} => "get_content",
        }
    }

    pub fn is_navigation(&self) -> bool {
        matches!(self, Command::Navigate { .. })
    }
}

/// Ordered list of commands derived from one goal
pub type Plan = Vec<Command>;

/// A plan produced by a planning strategy, with its self-reported confidence
#[derive(Debug, Clone, PartialEq)]
pub struct PlanProposal {
    pub commands: Plan,
    /// 0.0 - 1.0
    pub confidence: f64,
}

impl PlanProposal {
    pub fn new(commands: Plan, confidence: f64) -> Self {
        Self {
            commands,
            confidence,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Last known snapshot of the page shown by the extension.
///
/// Only used to ground the alternate planner; replaced wholesale whenever
/// a fresh snapshot arrives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageContext {
    pub url: String,
    pub title: String,
    /// "search", "form", "navigation" or "general"
    pub content_type: String,
    pub text: String,
    pub html: String,
    pub ready_state: String,
}
