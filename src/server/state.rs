//! Server state management
//!
//! Shared state handed to every HTTP handler and WebSocket connection.

use std::sync::Arc;

use crate::config::Config;
use crate::planning::GoalPlanner;
use crate::sequencer::TaskSequencer;

/// Shared application state for the server
pub struct AppState {
    /// Configuration the server was started with
    pub config: Config,

    /// Owns every in-flight task across connections
    pub sequencer: Arc<TaskSequencer>,
}

impl AppState {
    pub fn new(config: Config, planner: GoalPlanner) -> Self {
        let sequencer = TaskSequencer::new(Arc::new(planner), config.sequencer.clone());
        Self {
            config,
            sequencer: Arc::new(sequencer),
        }
    }

    /// Whether goals may be routed to the LLM planner
    pub fn llm_planner_enabled(&self) -> bool {
        self.sequencer.planner().has_oracle()
    }
}
