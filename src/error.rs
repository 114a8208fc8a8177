//! Relay error types
//!
//! Every error the relay reports to a connection carries a stable wire code
//! so the extension can react to it without parsing the message text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire error codes sent in `ERROR` envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ParseError,
    PayloadError,
    TaskFormatError,
    GoalParseError,
    ContentFormatError,
    UnknownType,
    AnalysisError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::PayloadError => "PAYLOAD_ERROR",
            ErrorCode::TaskFormatError => "TASK_FORMAT_ERROR",
            ErrorCode::GoalParseError => "GOAL_PARSE_ERROR",
            ErrorCode::ContentFormatError => "CONTENT_FORMAT_ERROR",
            ErrorCode::UnknownType => "UNKNOWN_TYPE",
            ErrorCode::AnalysisError => "ANALYSIS_ERROR",
        }
    }
}

/// Errors surfaced by the relay core
#[derive(Debug, Error)]
pub enum RelayError {
    /// Inbound frame was not valid JSON
    #[error("Invalid JSON format")]
    InvalidJson(#[source] serde_json::Error),

    /// A message type that requires a payload arrived without one
    #[error("Missing payload for {0}")]
    MissingPayload(String),

    /// `EXECUTE_TASK` payload did not match `{goal}`
    #[error("Invalid task payload format")]
    TaskFormat(#[source] serde_json::Error),

    /// The goal produced an empty plan
    #[error("Could not understand the goal")]
    GoalParse { goal: String },

    /// `PAGE_CONTENT` payload did not match the page snapshot shape
    #[error("Invalid page content format")]
    ContentFormat(#[source] serde_json::Error),

    /// Unrecognized envelope type
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// Page snapshot could not be analyzed
    #[error("Failed to analyze page content: {0}")]
    Analysis(String),

    /// Outbound channel to the connection is gone
    #[error("Connection closed")]
    Disconnected,
}

impl RelayError {
    /// Wire code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            RelayError::InvalidJson(_) => ErrorCode::ParseError,
            RelayError::MissingPayload(_) => ErrorCode::PayloadError,
            RelayError::TaskFormat(_) => ErrorCode::TaskFormatError,
            RelayError::GoalParse { .. } => ErrorCode::GoalParseError,
            RelayError::ContentFormat(_) => ErrorCode::ContentFormatError,
            RelayError::UnknownType(_) => ErrorCode::UnknownType,
            RelayError::Analysis(_) => ErrorCode::AnalysisError,
            RelayError::Disconnected => ErrorCode::PayloadError,
        }
    }

    /// Whether the connection should be torn down after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, RelayError::Disconnected)
    }
}

pub type RelayResult<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_serialize_as_wire_strings() {
        let json = serde_json::to_string(&ErrorCode::GoalParseError).unwrap();
        assert_eq!(json, "\"GOAL_PARSE_ERROR\"");
        assert_eq!(ErrorCode::UnknownType.as_str(), "UNKNOWN_TYPE");
    }

    #[test]
    fn test_goal_parse_error_maps_to_code() {
        let err = RelayError::GoalParse {
            goal: "hello there".to_string(),
        };
        assert_eq!(err.code(), ErrorCode::GoalParseError);
        assert_eq!(err.to_string(), "Could not understand the goal");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_only_disconnect_is_fatal() {
        assert!(RelayError::Disconnected.is_fatal());
        assert!(!RelayError::UnknownType("PING".to_string()).is_fatal());
    }
}
