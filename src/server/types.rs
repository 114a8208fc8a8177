//! Server types and DTOs
//!
//! Wire envelopes exchanged with the browser extension over the WebSocket,
//! and the JSON bodies of the HTTP endpoints.

use serde::{Deserialize, Serialize};

use crate::analysis::ContentAnalysis;
use crate::error::{ErrorCode, RelayError};
use crate::planning::Command;
use crate::sequencer::{Task, TaskStatus};

// ============================================================================
// WebSocket envelopes
// ============================================================================

/// Inbound envelope before its payload is interpreted
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// `EXECUTE_TASK` payload
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteTaskPayload {
    pub goal: String,
}

/// `PAGE_CONTENT` payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContentPayload {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ready_state: String,
}

/// `CANCEL_TASK` payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelTaskPayload {
    pub task_id: String,
}

/// Progress view of a multi-step task, announced before the first command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSequence {
    pub commands: Vec<Command>,
    pub task_id: String,
    pub total: usize,
    pub current: usize,
}

/// `ERROR` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub code: ErrorCode,
}

/// Messages sent from the relay to the extension
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// One command to execute now
    Command(Command),
    /// A multi-step plan is starting
    CommandSequence(CommandSequence),
    /// A multi-step plan moved to its next step
    CommandSequenceUpdate(CommandSequence),
    TaskComplete {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    TaskFailed {
        task_id: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    TaskCancelled {
        task_id: String,
    },
    ContentAnalysis(ContentAnalysis),
    Error(ErrorPayload),
}

impl ServerMessage {
    pub fn error(err: &RelayError) -> Self {
        ServerMessage::Error(ErrorPayload {
            message: err.to_string(),
            code: err.code(),
        })
    }

    /// Wire type tag, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Command(_) => "COMMAND",
            ServerMessage::CommandSequence(_) => "COMMAND_SEQUENCE",
            ServerMessage::CommandSequenceUpdate(_) => "COMMAND_SEQUENCE_UPDATE",
            ServerMessage::TaskComplete { .. } => "TASK_COMPLETE",
            ServerMessage::TaskFailed { .. } => "TASK_FAILED",
            ServerMessage::TaskCancelled { .. } => "TASK_CANCELLED",
            ServerMessage::ContentAnalysis(_) => "CONTENT_ANALYSIS",
            ServerMessage::Error(_) => "ERROR",
        }
    }
}

// ============================================================================
// HTTP DTOs
// ============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub llm_planner: bool,
    pub active_tasks: usize,
}

/// Task summary for list view
#[derive(Debug, Serialize)]
pub struct TaskSummary {
    pub id: String,
    pub goal: String,
    pub status: TaskStatus,
    pub current_step: usize,
    pub total_steps: usize,
    pub created_at: String,
    pub deadline: String,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            goal: task.goal.clone(),
            status: task.status,
            current_step: task.current_step,
            total_steps: task.plan.len(),
            created_at: task.created_at.to_rfc3339(),
            deadline: task.deadline.to_rfc3339(),
        }
    }
}

/// Task list response
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskSummary>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_envelope() {
        let msg = ServerMessage::Command(Command::navigate("https://google.com"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "COMMAND",
                "payload": {"action": "navigate", "url": "https://google.com"}
            })
        );
    }

    #[test]
    fn test_sequence_envelope_uses_camel_case() {
        let msg = ServerMessage::CommandSequenceUpdate(CommandSequence {
            commands: vec![Command::get_content()],
            task_id: "task_1_1".to_string(),
            total: 1,
            current: 0,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "COMMAND_SEQUENCE_UPDATE");
        assert_eq!(json["payload"]["taskId"], "task_1_1");
        assert_eq!(json["payload"]["total"], 1);
    }

    #[test]
    fn test_error_envelope() {
        let msg = ServerMessage::error(&RelayError::UnknownType("PING".to_string()));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ERROR");
        assert_eq!(json["payload"]["code"], "UNKNOWN_TYPE");
    }

    #[test]
    fn test_task_failed_envelope() {
        let msg = ServerMessage::TaskFailed {
            task_id: "task_9_9".to_string(),
            message: "stopped".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["payload"]["taskId"], "task_9_9");
    }

    #[test]
    fn test_raw_envelope_without_payload() {
        let raw: RawEnvelope = serde_json::from_str(r#"{"type": "HANDSHAKE"}"#).unwrap();
        assert_eq!(raw.kind, "HANDSHAKE");
        assert!(raw.payload.is_null());
    }

    #[test]
    fn test_page_content_payload() {
        let payload: PageContentPayload = serde_json::from_value(serde_json::json!({
            "html": "<html></html>",
            "title": "T",
            "url": "https://a.com",
            "text": "hi",
            "readyState": "complete"
        }))
        .unwrap();
        assert_eq!(payload.ready_state, "complete");
    }
}
