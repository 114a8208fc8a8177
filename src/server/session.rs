//! Per-connection relay session
//!
//! Each WebSocket connection gets one session. It interprets inbound
//! envelopes, keeps the latest page snapshot for that connection, and turns
//! every non-fatal error into an `ERROR` envelope so the connection stays
//! open.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::analysis::analyze_page;
use crate::error::{RelayError, RelayResult};
use crate::planning::PageContext;
use crate::sequencer::{CommandSink, StepOutcome, TaskSequencer};

use super::types::{
    CancelTaskPayload, ExecuteTaskPayload, PageContentPayload, RawEnvelope, ServerMessage,
};

/// State owned by a single extension connection
pub struct RelaySession {
    id: String,
    sequencer: Arc<TaskSequencer>,
    outbound: mpsc::Sender<ServerMessage>,
    /// Latest page snapshot; dropped with the session
    page: Option<PageContext>,
}

impl RelaySession {
    pub fn new(sequencer: Arc<TaskSequencer>, outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sequencer,
            outbound,
            page: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn page_context(&self) -> Option<&PageContext> {
        self.page.as_ref()
    }

    async fn reply(&self, message: ServerMessage) -> RelayResult<()> {
        CommandSink::send(&self.outbound, message).await
    }

    /// Handle one inbound text frame
    ///
    /// Only returns an error when the connection can no longer be written to.
    pub async fn handle_text(&mut self, text: &str) -> RelayResult<()> {
        match self.dispatch(text).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!("[{}] {} ({})", self.id, e, e.code().as_str());
                self.reply(ServerMessage::error(&e)).await
            }
        }
    }

    async fn dispatch(&mut self, text: &str) -> RelayResult<()> {
        let envelope: RawEnvelope = serde_json::from_str(text).map_err(RelayError::InvalidJson)?;
        tracing::debug!("[{}] Received {}", self.id, envelope.kind);

        match envelope.kind.as_str() {
            "HANDSHAKE" => {
                tracing::info!("[{}] Handshake received from extension", self.id);
                Ok(())
            }
            "EXECUTE_TASK" => {
                let payload: ExecuteTaskPayload =
                    payload_of(&envelope, RelayError::TaskFormat)?;
                self.execute_task(payload).await
            }
            "PAGE_CONTENT" => {
                let payload: PageContentPayload =
                    payload_of(&envelope, RelayError::ContentFormat)?;
                self.page_content(payload).await
            }
            "COMMAND_COMPLETE" => self.command_complete(envelope.payload).await,
            "CANCEL_TASK" => {
                let payload: CancelTaskPayload = payload_of(&envelope, RelayError::TaskFormat)?;
                self.cancel_task(payload).await
            }
            other => Err(RelayError::UnknownType(other.to_string())),
        }
    }

    async fn execute_task(&mut self, payload: ExecuteTaskPayload) -> RelayResult<()> {
        tracing::info!("[{}] Processing goal: {}", self.id, payload.goal);
        self.sequencer
            .submit(&payload.goal, self.page.as_ref(), &self.id, &self.outbound)
            .await?;
        Ok(())
    }

    async fn page_content(&mut self, payload: PageContentPayload) -> RelayResult<()> {
        tracing::info!("[{}] Analyzing page content from: {}", self.id, payload.url);

        let mut page = PageContext {
            url: payload.url,
            title: payload.title,
            content_type: String::new(),
            text: payload.text,
            html: payload.html,
            ready_state: payload.ready_state,
        };

        let analysis = analyze_page(&page.html);
        if let Ok(analysis) = &analysis {
            page.content_type = analysis.content_type.as_str().to_string();
        }
        self.page = Some(page);

        let analysis = analysis?;
        self.reply(ServerMessage::ContentAnalysis(analysis)).await
    }

    async fn command_complete(&mut self, payload: serde_json::Value) -> RelayResult<()> {
        // Malformed reports are dropped, the extension does not expect a reply
        let outcome: StepOutcome = match serde_json::from_value(payload) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("[{}] Failed to parse command result: {}", self.id, e);
                return Ok(());
            }
        };

        self.sequencer
            .report_outcome(outcome, &self.id, &self.outbound)
            .await?;
        Ok(())
    }

    async fn cancel_task(&mut self, payload: CancelTaskPayload) -> RelayResult<()> {
        match self.sequencer.cancel(&payload.task_id).await {
            Some(task) => {
                self.reply(ServerMessage::TaskCancelled { task_id: task.id })
                    .await
            }
            None => {
                tracing::debug!("[{}] Nothing to cancel for {}", self.id, payload.task_id);
                Ok(())
            }
        }
    }
}

/// Decode an envelope's payload, distinguishing absent from malformed
fn payload_of<T: DeserializeOwned>(
    envelope: &RawEnvelope,
    malformed: fn(serde_json::Error) -> RelayError,
) -> RelayResult<T> {
    if envelope.payload.is_null() {
        return Err(RelayError::MissingPayload(envelope.kind.clone()));
    }
    serde_json::from_value(envelope.payload.clone()).map_err(malformed)
}
