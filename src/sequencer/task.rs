//! Task definitions for the sequencer

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::planning::{Command, Plan};
use crate::server::types::CommandSequence;

/// Process-wide counter so ids stay unique within one clock second
static TASK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Plan attached, nothing issued yet
    #[default]
    Pending,
    /// First command has been issued
    Executing,
    /// Every command issued and reported
    Completed,
    /// Stopped by the failure policy or by expiry
    Failed,
    /// Cancelled by a client
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// The extension's report about one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    #[serde(default)]
    pub step: usize,
    #[serde(default)]
    pub action: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub timestamp: String,
    /// Task the step belongs to, when the extension echoes it back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl StepOutcome {
    pub fn success(step: usize, action: &str) -> Self {
        Self {
            step,
            action: action.to_string(),
            success: true,
            details: None,
            error: None,
            timestamp: Utc::now().to_rfc3339(),
            task_id: None,
        }
    }

    pub fn failure(step: usize, action: &str, error: &str) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::success(step, action)
        }
    }

    pub fn for_task(mut self, task_id: &str) -> Self {
        self.task_id = Some(task_id.to_string());
        self
    }
}

/// Execution record for one in-flight plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task
    pub id: String,
    /// Goal text as submitted
    pub goal: String,
    pub plan: Plan,
    /// Index of the command currently awaiting its outcome
    pub current_step: usize,
    pub status: TaskStatus,
    /// One entry per reported outcome, in order
    pub results: Vec<StepOutcome>,
    /// Connection that submitted the goal
    pub owner: String,
    pub created_at: DateTime<Utc>,
    /// Reclaimed if no progress happens before this
    pub deadline: DateTime<Utc>,
    pub consecutive_failures: u32,
    /// Creation order
    pub seq: u64,
}

impl Task {
    /// Create a pending task with a fresh id
    pub fn new(goal: String, plan: Plan, owner: String, ttl: Duration) -> Self {
        let seq = TASK_COUNTER.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        Self {
            id: format!("task_{}_{}", now.timestamp(), seq),
            goal,
            plan,
            current_step: 0,
            status: TaskStatus::Pending,
            results: Vec::new(),
            owner,
            created_at: now,
            deadline: deadline_from(now, ttl),
            consecutive_failures: 0,
            seq,
        }
    }

    /// Command awaiting its outcome, if the plan is not exhausted
    pub fn current_command(&self) -> Option<&Command> {
        self.plan.get(self.current_step)
    }

    pub fn is_multi_step(&self) -> bool {
        self.plan.len() > 1
    }

    pub fn is_finished(&self) -> bool {
        self.current_step >= self.plan.len()
    }

    /// Append an outcome and move the cursor forward by one
    pub fn record(&mut self, outcome: StepOutcome) {
        if outcome.success {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
        }
        self.results.push(outcome);
        self.current_step = (self.current_step + 1).min(self.plan.len());
    }

    pub fn extend_deadline(&mut self, ttl: Duration) {
        self.deadline = deadline_from(Utc::now(), ttl);
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Wire view of the plan and its progress
    pub fn sequence(&self) -> CommandSequence {
        CommandSequence {
            commands: self.plan.clone(),
            task_id: self.id.clone(),
            total: self.plan.len(),
            current: self.current_step,
        }
    }

    /// Error text of the most recent failed step
    pub fn last_error(&self) -> Option<&str> {
        self.results
            .iter()
            .rev()
            .find(|r| !r.success)
            .and_then(|r| r.error.as_deref())
    }
}

fn deadline_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(1));
    now + ttl
}
