//! Task Sequencer
//!
//! Drives a plan through the extension one command at a time. A task is
//! created when a goal is submitted and advanced each time the extension
//! reports the outcome of the command it was last given. Tasks leave the
//! store when they complete, fail, are cancelled or expire.

pub mod store;
pub mod task;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::config::SequencerConfig;
use crate::error::{RelayError, RelayResult};
use crate::planning::{Command, GoalPlanner, PageContext};
use crate::server::types::ServerMessage;

pub use store::{InMemoryTaskStore, TaskStore};
pub use task::{StepOutcome, Task, TaskStatus};

/// Where outbound messages for one connection go
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn send(&self, message: ServerMessage) -> RelayResult<()>;
}

#[async_trait]
impl CommandSink for mpsc::Sender<ServerMessage> {
    async fn send(&self, message: ServerMessage) -> RelayResult<()> {
        mpsc::Sender::send(self, message)
            .await
            .map_err(|_| RelayError::Disconnected)
    }
}

/// Lifecycle notifications for observers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    Created {
        task_id: String,
        goal: String,
        total_steps: usize,
    },
    StepIssued {
        task_id: String,
        step: usize,
        command: Command,
    },
    StepRecorded {
        task_id: String,
        outcome: StepOutcome,
    },
    Completed {
        task_id: String,
    },
    Failed {
        task_id: String,
        reason: String,
    },
    Cancelled {
        task_id: String,
    },
}

impl TaskEvent {
    pub fn task_id(&self) -> &str {
        match self {
            TaskEvent::Created { task_id, .. }
            | TaskEvent::StepIssued { task_id, .. }
            | TaskEvent::StepRecorded { task_id, .. }
            | TaskEvent::Completed { task_id }
            | TaskEvent::Failed { task_id, .. }
            | TaskEvent::Cancelled { task_id } => task_id,
        }
    }

    /// Event name, used as the SSE event type
    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::Created { .. } => "Created",
            TaskEvent::StepIssued { .. } => "StepIssued",
            TaskEvent::StepRecorded { .. } => "StepRecorded",
            TaskEvent::Completed { .. } => "Completed",
            TaskEvent::Failed { .. } => "Failed",
            TaskEvent::Cancelled { .. } => "Cancelled",
        }
    }
}

/// What a reported outcome did to its task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepProgress {
    /// The next command was issued
    Advanced { task_id: String, step: usize },
    /// Every command has been reported; the task is gone
    Completed { task_id: String },
    /// The failure policy stopped the task; the task is gone
    Aborted { task_id: String },
}

/// Decision taken under the store lock, acted on after it is released
enum Transition {
    Advance(Task),
    Complete(Task),
    Abort(Task),
}

/// Owns every in-flight task and moves them through their plans
pub struct TaskSequencer {
    planner: Arc<GoalPlanner>,
    store: Arc<dyn TaskStore>,
    config: SequencerConfig,
    /// Serializes every read-modify-write against the store
    write_lock: Mutex<()>,
    events: broadcast::Sender<TaskEvent>,
}

impl TaskSequencer {
    pub fn new(planner: Arc<GoalPlanner>, config: SequencerConfig) -> Self {
        Self::with_store(planner, Arc::new(InMemoryTaskStore::new()), config)
    }

    pub fn with_store(
        planner: Arc<GoalPlanner>,
        store: Arc<dyn TaskStore>,
        config: SequencerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            planner,
            store,
            config,
            write_lock: Mutex::new(()),
            events,
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn planner(&self) -> &GoalPlanner {
        &self.planner
    }

    /// Receive lifecycle events for every task
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: TaskEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Plan `goal` and issue its first command to `sink`
    ///
    /// Multi-command plans are announced with `COMMAND_SEQUENCE` first.
    /// Returns the new task's id.
    pub async fn submit(
        &self,
        goal: &str,
        context: Option<&PageContext>,
        owner: &str,
        sink: &dyn CommandSink,
    ) -> RelayResult<String> {
        let plan = self.planner.plan(goal, context).await;
        if plan.is_empty() {
            tracing::warn!("Could not plan goal: {}", goal);
            return Err(RelayError::GoalParse {
                goal: goal.to_string(),
            });
        }

        let mut task = Task::new(
            goal.to_string(),
            plan,
            owner.to_string(),
            self.config.task_ttl(),
        );
        task.status = TaskStatus::Executing;
        let task_id = task.id.clone();

        {
            let _guard = self.write_lock.lock().await;
            self.store.insert(task.clone()).await;
        }

        tracing::info!(
            "📋 Task {} created with {} command(s) for goal: {}",
            task_id,
            task.plan.len(),
            goal
        );
        self.emit(TaskEvent::Created {
            task_id: task_id.clone(),
            goal: task.goal.clone(),
            total_steps: task.plan.len(),
        });

        let first = task.plan[0].clone();
        if let Err(e) = Self::issue_first(&task, &first, sink).await {
            let _guard = self.write_lock.lock().await;
            self.store.remove(&task_id).await;
            tracing::warn!("❌ Task {} dropped before its first command: {}", task_id, e);
            return Err(e);
        }
        self.emit(TaskEvent::StepIssued {
            task_id: task_id.clone(),
            step: 0,
            command: first,
        });

        Ok(task_id)
    }

    async fn issue_first(task: &Task, first: &Command, sink: &dyn CommandSink) -> RelayResult<()> {
        if task.is_multi_step() {
            sink.send(ServerMessage::CommandSequence(task.sequence()))
                .await?;
        }
        sink.send(ServerMessage::Command(first.clone())).await
    }

    /// Record an outcome and issue whatever comes next
    ///
    /// Outcomes that match no task are logged and dropped, so replays after
    /// completion are harmless.
    pub async fn report_outcome(
        &self,
        outcome: StepOutcome,
        owner: &str,
        sink: &dyn CommandSink,
    ) -> RelayResult<Option<StepProgress>> {
        let transition = {
            let _guard = self.write_lock.lock().await;

            let Some(mut task) = self.locate(&outcome, owner).await else {
                tracing::warn!(
                    "No active task for outcome of step {} ({}), {} task(s) active",
                    outcome.step,
                    outcome.action,
                    self.store.len().await
                );
                return Ok(None);
            };

            if outcome.success {
                tracing::debug!("Task {} step {} succeeded", task.id, task.current_step);
            } else {
                tracing::warn!(
                    "⚠️  Task {} step {} failed: {}",
                    task.id,
                    task.current_step,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }

            task.status = TaskStatus::Executing;
            task.record(outcome.clone());
            task.extend_deadline(self.config.task_ttl());
            self.emit(TaskEvent::StepRecorded {
                task_id: task.id.clone(),
                outcome: outcome.clone(),
            });

            if !outcome.success
                && self
                    .config
                    .failure_policy
                    .should_abort(task.consecutive_failures)
            {
                task.status = TaskStatus::Failed;
                self.store.remove(&task.id).await;
                Transition::Abort(task)
            } else if task.is_finished() {
                task.status = TaskStatus::Completed;
                self.store.remove(&task.id).await;
                Transition::Complete(task)
            } else {
                self.store.update(task.clone()).await;
                Transition::Advance(task)
            }
        };

        match transition {
            Transition::Advance(task) => self.advance(task, sink).await,
            Transition::Complete(task) => {
                tracing::info!("✅ Task {} completed", task.id);
                self.emit(TaskEvent::Completed {
                    task_id: task.id.clone(),
                });
                sink.send(ServerMessage::TaskComplete {
                    message: format!("Successfully completed multi-step task: {}", task.goal),
                })
                .await?;
                Ok(Some(StepProgress::Completed { task_id: task.id }))
            }
            Transition::Abort(task) => {
                let message = format!(
                    "Task stopped after step {} failed: {}",
                    task.current_step,
                    task.last_error().unwrap_or("unknown error")
                );
                tracing::warn!("❌ Task {} aborted: {}", task.id, message);
                self.emit(TaskEvent::Failed {
                    task_id: task.id.clone(),
                    reason: message.clone(),
                });
                sink.send(ServerMessage::TaskFailed {
                    task_id: task.id.clone(),
                    message,
                })
                .await?;
                Ok(Some(StepProgress::Aborted { task_id: task.id }))
            }
        }
    }

    /// Announce progress, let the page settle, then issue the next command
    async fn advance(&self, task: Task, sink: &dyn CommandSink) -> RelayResult<Option<StepProgress>> {
        sink.send(ServerMessage::CommandSequenceUpdate(task.sequence()))
            .await?;

        let settle = match task.plan.get(task.current_step.saturating_sub(1)) {
            Some(previous) if previous.is_navigation() => self.config.navigation_settle(),
            _ => self.config.step_settle(),
        };
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        // Cancelled or reaped while settling
        if self.store.get(&task.id).await.is_none() {
            tracing::debug!("Task {} went away while settling", task.id);
            return Ok(None);
        }

        let Some(next) = task.current_command().cloned() else {
            return Ok(None);
        };
        tracing::info!(
            "▶️  Task {} issuing step {}/{}: {}",
            task.id,
            task.current_step + 1,
            task.plan.len(),
            next.action()
        );
        sink.send(ServerMessage::Command(next.clone())).await?;
        self.emit(TaskEvent::StepIssued {
            task_id: task.id.clone(),
            step: task.current_step,
            command: next,
        });

        Ok(Some(StepProgress::Advanced {
            task_id: task.id,
            step: task.current_step,
        }))
    }

    /// Find the task an outcome belongs to. Must be called under the lock.
    async fn locate(&self, outcome: &StepOutcome, owner: &str) -> Option<Task> {
        if let Some(task_id) = outcome.task_id.as_deref() {
            return self.store.get(task_id).await;
        }

        // Untagged outcome: oldest executing task, this connection's first,
        // else the oldest pending one
        let tasks = self.store.list().await;
        let executing = |t: &&Task| t.status == TaskStatus::Executing;
        tasks
            .iter()
            .filter(executing)
            .find(|t| t.owner == owner)
            .or_else(|| tasks.iter().find(executing))
            .or_else(|| tasks.iter().find(|t| t.status == TaskStatus::Pending))
            .cloned()
    }

    /// Stop a task. Returns its final record if it was still active.
    pub async fn cancel(&self, task_id: &str) -> Option<Task> {
        let mut task = {
            let _guard = self.write_lock.lock().await;
            self.store.remove(task_id).await?
        };
        task.status = TaskStatus::Cancelled;

        tracing::info!("🛑 Task {} cancelled", task_id);
        self.emit(TaskEvent::Cancelled {
            task_id: task.id.clone(),
        });
        Some(task)
    }

    /// Remove tasks whose deadline passed before `now`
    pub async fn reap_expired(&self, now: DateTime<Utc>) -> Vec<Task> {
        let reaped: Vec<Task> = {
            let _guard = self.write_lock.lock().await;
            let mut reaped = Vec::new();
            for task in self.store.list().await {
                if task.is_expired(now) {
                    if let Some(mut task) = self.store.remove(&task.id).await {
                        task.status = TaskStatus::Failed;
                        reaped.push(task);
                    }
                }
            }
            reaped
        };

        for task in &reaped {
            tracing::warn!(
                "⏱️  Task {} expired at step {}/{}",
                task.id,
                task.current_step,
                task.plan.len()
            );
            self.emit(TaskEvent::Failed {
                task_id: task.id.clone(),
                reason: "expired".to_string(),
            });
        }
        reaped
    }

    pub async fn get_task(&self, task_id: &str) -> Option<Task> {
        self.store.get(task_id).await
    }

    pub async fn list_tasks(&self) -> Vec<Task> {
        self.store.list().await
    }

    pub async fn active_count(&self) -> usize {
        self.store.len().await
    }
}
