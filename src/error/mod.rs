//! Error taxonomy for workflow execution
//!
//! Every failure surfaced by a node, the sandbox or the executor itself is
//! classified into a closed set of [`ErrorKind`]s. Recoverability is derived
//! from the kind: security-class kinds are never recoverable.

mod retry;

pub use retry::{RetryPolicy, Retryable, retry_with_backoff};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Categories of errors that can occur during a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Validation,
    NodeNotFound,
    Connection,
    Execution,
    Timeout,
    Memory,
    Resource,
    ServiceUnavailable,
    Service,
    Authentication,
    SecurityViolation,
    PermissionDenied,
    SandboxViolation,
    Network,
    Http,
    System,
    Internal,
}

impl ErrorKind {
    /// All kinds, in declaration order
    pub const ALL: [ErrorKind; 18] = [
        ErrorKind::Configuration,
        ErrorKind::Validation,
        ErrorKind::NodeNotFound,
        ErrorKind::Connection,
        ErrorKind::Execution,
        ErrorKind::Timeout,
        ErrorKind::Memory,
        ErrorKind::Resource,
        ErrorKind::ServiceUnavailable,
        ErrorKind::Service,
        ErrorKind::Authentication,
        ErrorKind::SecurityViolation,
        ErrorKind::PermissionDenied,
        ErrorKind::SandboxViolation,
        ErrorKind::Network,
        ErrorKind::Http,
        ErrorKind::System,
        ErrorKind::Internal,
    ];

    /// Returns true for kinds that must never be retried or continued past
    pub fn is_security(&self) -> bool {
        matches!(
            self,
            ErrorKind::SecurityViolation | ErrorKind::PermissionDenied | ErrorKind::SandboxViolation
        )
    }

    /// Default recoverability for this kind
    pub fn is_recoverable_by_default(&self) -> bool {
        !self.is_security()
    }

    /// Wire name of the kind (`snake_case`)
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Validation => "validation",
            ErrorKind::NodeNotFound => "node_not_found",
            ErrorKind::Connection => "connection",
            ErrorKind::Execution => "execution",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Memory => "memory",
            ErrorKind::Resource => "resource",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::Service => "service",
            ErrorKind::Authentication => "authentication",
            ErrorKind::SecurityViolation => "security_violation",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::SandboxViolation => "sandbox_violation",
            ErrorKind::Network => "network",
            ErrorKind::Http => "http",
            ErrorKind::System => "system",
            ErrorKind::Internal => "internal",
        }
    }

    /// Short hint suitable for showing to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "Check the node configuration.",
            ErrorKind::Validation => "The input or script is not valid.",
            ErrorKind::NodeNotFound => "This node type is not installed.",
            ErrorKind::Connection => "A connection in the workflow is broken.",
            ErrorKind::Execution => "The node failed while running.",
            ErrorKind::Timeout => "The operation took too long and was stopped.",
            ErrorKind::Memory => "The operation used too much memory.",
            ErrorKind::Resource => "A required resource is not available.",
            ErrorKind::ServiceUnavailable => "The service is unavailable, try again later.",
            ErrorKind::Service => "The service returned an error.",
            ErrorKind::Authentication => "Authentication failed, check your credentials.",
            ErrorKind::SecurityViolation => "The operation was blocked for security reasons.",
            ErrorKind::PermissionDenied => "Permission denied.",
            ErrorKind::SandboxViolation => "The script tried to use a forbidden capability.",
            ErrorKind::Network => "A network error occurred.",
            ErrorKind::Http => "The HTTP request failed.",
            ErrorKind::System => "A system error occurred.",
            ErrorKind::Internal => "An internal error occurred.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the node an error is attributed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
}

/// A classified failure surfaced by a node or the executor
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct WorkflowError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeRef>,
    pub recoverable: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

impl WorkflowError {
    /// Create an error with the kind's default recoverability
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            node: None,
            recoverable: kind.is_recoverable_by_default(),
            timestamp: Utc::now(),
            context: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn node_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NodeNotFound, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn security_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SecurityViolation, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Override recoverability. Security-class kinds stay non-recoverable.
    pub fn with_recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable && !self.kind.is_security();
        self
    }

    /// Attribute the error to a node
    pub fn with_node(
        mut self,
        id: impl Into<String>,
        node_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.node = Some(NodeRef {
            id: id.into(),
            node_type: node_type.into(),
            name: name.into(),
        });
        self
    }

    /// Attach a diagnostic context value
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Message prefixed with the user-facing hint for the kind
    pub fn user_message(&self) -> String {
        format!("{} {}", self.kind.user_message(), self.message)
    }

    /// Emit this error through `tracing`
    pub fn log(&self) {
        let node = self.node.as_ref().map(|n| n.id.as_str()).unwrap_or("-");
        if self.recoverable {
            tracing::warn!(kind = %self.kind, node, "{}", self.message);
        } else {
            tracing::error!(kind = %self.kind, node, "{}", self.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_recoverability() {
        for kind in ErrorKind::ALL {
            let expected = !matches!(
                kind,
                ErrorKind::SecurityViolation
                    | ErrorKind::PermissionDenied
                    | ErrorKind::SandboxViolation
            );
            assert_eq!(WorkflowError::new(kind, "x").recoverable, expected, "{kind}");
        }
    }

    #[test]
    fn test_security_kinds_cannot_be_made_recoverable() {
        let err = WorkflowError::security_violation("blocked").with_recoverable(true);
        assert!(!err.recoverable);

        let err = WorkflowError::new(ErrorKind::SandboxViolation, "blocked").with_recoverable(true);
        assert!(!err.recoverable);

        let err = WorkflowError::execution("boom").with_recoverable(false);
        assert!(!err.recoverable);
    }

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(
            serde_json::to_value(ErrorKind::NodeNotFound).unwrap(),
            "node_not_found"
        );
        for kind in ErrorKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
    }

    #[test]
    fn test_error_builder() {
        let err = WorkflowError::execution("boom")
            .with_node("b", "transform", "Step B")
            .with_context("attempt", 2);

        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.node.as_ref().unwrap().id, "b");
        assert_eq!(err.context.as_ref().unwrap()["attempt"], 2);
        assert!(err.user_message().contains("boom"));
    }

    #[test]
    fn test_error_serializes_type_field() {
        let err = WorkflowError::timeout("slow").with_node("a", "http", "Fetch");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["node"]["type"], "http");
        assert!(json.get("context").is_none());
    }
}
