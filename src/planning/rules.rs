//! Rule-based goal planning
//!
//! Maps each goal fragment to at most one command by keyword priority, and
//! splits compound goals ("go to X and search for Y") on conjunctions.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use super::extract::{extract_search_term, extract_selector, extract_url};
use super::keywords::{self, contains_any};
use super::planner::PlanStrategy;
use super::types::{Command, PageContext, Plan, PlanProposal};

/// Candidate selectors for a search box across common sites
pub const SEARCH_INPUT_SELECTOR: &str = "input[name='q'], textarea[name='q'], input[type='search'], input[type='text'][name='q'], #search, [role='searchbox']";

/// Candidate selectors for the button that submits a search
pub const SUBMIT_BUTTON_SELECTOR: &str = "input[type='submit'], button[type='submit'], button[name='btnK'], button[name='btnG'], [aria-label*='Search' i], [value*='Search' i]";

/// Substrings that mark a goal as compound
const CONJUNCTION_MARKERS: &[&str] = &[" and ", ", then ", " then "];

lazy_static::lazy_static! {
    static ref CONJUNCTION_SPLIT: Regex =
        Regex::new(r"\s*,\s*(?:and|then)\s+|\s+(?:and|then)\s+").expect("conjunction pattern is valid");
}

/// Plan a single fragment. Returns `None` when no category matches.
pub fn plan_fragment(fragment: &str) -> Option<Command> {
    let fragment = fragment.trim().to_lowercase();
    let intent = keywords::classify(&fragment);

    if intent.navigation {
        return Some(Command::navigate(extract_url(&fragment)));
    }

    if intent.content {
        return Some(Command::get_content());
    }

    // A lone search fragment only fills the box; the submit click is added
    // by the compound splitter.
    if intent.search {
        return Some(Command::input(
            SEARCH_INPUT_SELECTOR,
            extract_search_term(&fragment),
        ));
    }

    if intent.click {
        return Some(Command::click(extract_selector(&fragment)));
    }

    if keywords::contains_url_marker(&fragment) {
        return Some(Command::navigate(extract_url(&fragment)));
    }

    None
}

/// Whether a goal should go through the compound splitter
pub fn is_compound(goal: &str) -> bool {
    contains_any(goal, CONJUNCTION_MARKERS)
}

/// Split a compound goal and plan every fragment in order
pub fn plan_compound(goal: &str) -> Plan {
    let mut commands = Vec::new();

    for fragment in CONJUNCTION_SPLIT.split(goal) {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }

        let Some(command) = plan_fragment(fragment) else {
            tracing::debug!("No command for fragment '{}', skipping", fragment);
            continue;
        };

        let needs_submit =
            matches!(command, Command::Input { .. }) && keywords::is_search(&fragment.to_lowercase());
        commands.push(command);

        if needs_submit {
            commands.push(Command::click(SUBMIT_BUTTON_SELECTOR));
        }
    }

    commands
}

/// Keyword-driven planner used when no oracle is configured or it fails
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedPlanner;

impl RuleBasedPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan a whole goal. An empty result means the goal was not understood.
    pub fn plan_goal(&self, goal: &str) -> Plan {
        let goal = goal.trim().to_lowercase();
        tracing::debug!("Rule-based planning for goal: {}", goal);

        if is_compound(&goal) {
            plan_compound(&goal)
        } else {
            plan_fragment(&goal).into_iter().collect()
        }
    }
}

#[async_trait]
impl PlanStrategy for RuleBasedPlanner {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn plan(&self, goal: &str, _context: Option<&PageContext>) -> Result<PlanProposal> {
        Ok(PlanProposal::new(self.plan_goal(goal), 1.0))
    }
}
