//! Goal Planning Module
//!
//! Turns free-text goals into ordered browser command plans, either with
//! keyword rules or with an LLM oracle whose output is validated first.

pub mod extract;
pub mod keywords;
pub mod oracle;
pub mod planner;
pub mod prompts;
pub mod rules;
pub mod types;

pub use oracle::should_use_alternate_planner;
pub use planner::{GoalPlanner, OraclePlanner, PlanStrategy};
pub use rules::RuleBasedPlanner;
pub use types::{Command, PageContext, Plan, PlanProposal};
