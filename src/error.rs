//! Error types for the gateway.
//!
//! Tool-boundary errors use a single flat [`ToolError`] categorised by what
//! the caller can do next, not by where the failure originated. The kind and
//! status fields are stable strings in the wire payload so MCP clients can
//! branch on them programmatically.

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::{Map, Value};

/// Closed set of error categories exposed to MCP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Session ID is unknown; the caller must open a new session.
    SessionNotFound,
    /// No worker process is bound; retry after reopening the session.
    WorkerUnavailable,
    /// The analysis engine rejected or failed the operation.
    IdaOperationFailed,
    /// Request validation failed; fix the input.
    InvalidInput,
    /// Hex-Rays is not installed or not licensed.
    DecompilerUnavailable,
    /// Unknown server-side fault.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "session_not_found",
            Self::WorkerUnavailable => "worker_unavailable",
            Self::IdaOperationFailed => "ida_operation_failed",
            Self::InvalidInput => "invalid_input",
            Self::DecompilerUnavailable => "decompiler_unavailable",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit retry-ability. No guessing from error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    Permanent,
    Temporary,
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permanent => f.write_str("permanent"),
            Self::Temporary => f.write_str("temporary"),
        }
    }
}

/// The single flat error type returned by every MCP tool handler.
#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub kind: ErrorKind,
    pub status: ErrorStatus,
    pub message: String,
    pub operation: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.operation, self.message)
    }
}

impl std::error::Error for ToolError {}

impl ToolError {
    pub fn session_not_found(operation: &str, session_id: &str) -> Self {
        let mut context = Map::new();
        context.insert("session_id".into(), Value::from(session_id));
        Self {
            kind: ErrorKind::SessionNotFound,
            status: ErrorStatus::Permanent,
            message: format!("session {session_id} not found"),
            operation: operation.to_string(),
            context,
        }
    }

    pub fn worker_unavailable(
        operation: &str,
        session_id: &str,
        detail: &dyn std::fmt::Display,
    ) -> Self {
        let mut context = Map::new();
        context.insert("session_id".into(), Value::from(session_id));
        context.insert("detail".into(), Value::from(detail.to_string()));
        Self {
            kind: ErrorKind::WorkerUnavailable,
            status: ErrorStatus::Temporary,
            message: "worker process not available".to_string(),
            operation: operation.to_string(),
            context,
        }
    }

    pub fn ida_operation_failed(
        operation: &str,
        session_id: &str,
        err: &dyn std::fmt::Display,
    ) -> Self {
        let mut context = Map::new();
        context.insert("session_id".into(), Value::from(session_id));
        Self {
            kind: ErrorKind::IdaOperationFailed,
            status: ErrorStatus::Permanent,
            message: err.to_string(),
            operation: operation.to_string(),
            context,
        }
    }

    pub fn invalid_input(operation: &str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidInput,
            status: ErrorStatus::Permanent,
            message: message.into(),
            operation: operation.to_string(),
            context: Map::new(),
        }
    }

    pub fn decompiler_unavailable(operation: &str, session_id: &str) -> Self {
        let mut context = Map::new();
        context.insert("session_id".into(), Value::from(session_id));
        Self {
            kind: ErrorKind::DecompilerUnavailable,
            status: ErrorStatus::Permanent,
            message: "decompiler not available (Hex-Rays not installed or not licensed)"
                .to_string(),
            operation: operation.to_string(),
            context,
        }
    }

    pub fn internal(operation: &str, err: &dyn std::fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Internal,
            status: ErrorStatus::Permanent,
            message: err.to_string(),
            operation: operation.to_string(),
            context: Map::new(),
        }
    }

    /// Convert to an MCP CallToolResult with `is_error: true` and the
    /// serialized error as the JSON body.
    pub fn to_tool_result(&self) -> CallToolResult {
        let body = serde_json::to_string_pretty(self)
            .unwrap_or_else(|_| format!("{{\"kind\":\"{}\"}}", self.kind));
        CallToolResult::error(vec![Content::text(body)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_has_stable_kind_and_status_strings() {
        let err = ToolError::session_not_found("get_functions", "abc-123");
        let body = serde_json::to_value(&err).unwrap();
        assert_eq!(body["kind"], "session_not_found");
        assert_eq!(body["status"], "permanent");
        assert_eq!(body["operation"], "get_functions");
        assert_eq!(body["context"]["session_id"], "abc-123");
    }

    #[test]
    fn worker_unavailable_is_temporary() {
        let err = ToolError::worker_unavailable("get_strings", "s1", &"no worker");
        let body = serde_json::to_value(&err).unwrap();
        assert_eq!(body["kind"], "worker_unavailable");
        assert_eq!(body["status"], "temporary");
        assert_eq!(body["context"]["detail"], "no worker");
    }

    #[test]
    fn empty_context_is_omitted() {
        let err = ToolError::invalid_input("get_functions", "limit must be greater than zero");
        let body = serde_json::to_value(&err).unwrap();
        assert!(body.get("context").is_none());
    }

    #[test]
    fn display_includes_kind_and_operation() {
        let err = ToolError::ida_operation_failed("get_disasm", "s1", &"addr out of range");
        let text = err.to_string();
        assert!(text.contains("ida_operation_failed"));
        assert!(text.contains("get_disasm"));
        assert!(text.contains("addr out of range"));
    }
}
