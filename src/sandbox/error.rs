use crate::error::{ErrorKind, Retryable, WorkflowError};
use std::time::Duration;
use thiserror::Error;

/// Sandbox failures, classified for the calling node
#[derive(Debug, Clone, Error)]
pub enum SandboxError {
    /// Rejected by the static deny-list before any context was created
    #[error("script rejected: {reason} (matched '{matched}')")]
    DenyPattern { reason: String, matched: String },

    #[error("code too large (max {max} bytes, got {actual} bytes)")]
    CodeTooLarge { max: usize, actual: usize },

    #[error("compile error: {0}")]
    Compile(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("script timed out after {0:?}")]
    Timeout(Duration),

    #[error("memory limit exceeded: {0}")]
    MemoryLimit(String),

    #[error("sandbox internal error: {0}")]
    Internal(String),
}

impl SandboxError {
    /// Stable classification name
    pub fn classification(&self) -> &'static str {
        match self {
            SandboxError::DenyPattern { .. } | SandboxError::CodeTooLarge { .. } => {
                "deny_pattern_violation"
            }
            SandboxError::Compile(_) => "compile_error",
            SandboxError::Runtime(_) => "runtime_error",
            SandboxError::Timeout(_) => "timeout",
            SandboxError::MemoryLimit(_) => "memory_limit",
            SandboxError::Internal(_) => "internal",
        }
    }

    /// Taxonomy kind this failure is reported as
    pub fn kind(&self) -> ErrorKind {
        match self {
            SandboxError::DenyPattern { .. } => ErrorKind::SandboxViolation,
            SandboxError::CodeTooLarge { .. } => ErrorKind::Validation,
            SandboxError::Compile(_) => ErrorKind::Validation,
            SandboxError::Runtime(_) => ErrorKind::Execution,
            SandboxError::Timeout(_) => ErrorKind::Timeout,
            SandboxError::MemoryLimit(_) => ErrorKind::Memory,
            SandboxError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl Retryable for SandboxError {
    fn is_retryable(&self) -> bool {
        matches!(self, SandboxError::Timeout(_) | SandboxError::Internal(_))
    }
}

impl From<SandboxError> for WorkflowError {
    fn from(err: SandboxError) -> Self {
        WorkflowError::new(err.kind(), err.to_string())
            .with_context("classification", err.classification())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_and_kind() {
        let deny = SandboxError::DenyPattern {
            reason: "process access".into(),
            matched: "process.".into(),
        };
        assert_eq!(deny.classification(), "deny_pattern_violation");
        assert_eq!(deny.kind(), ErrorKind::SandboxViolation);

        let timeout = SandboxError::Timeout(Duration::from_millis(100));
        assert_eq!(timeout.classification(), "timeout");
        assert_eq!(timeout.kind(), ErrorKind::Timeout);

        assert_eq!(SandboxError::Compile("x".into()).classification(), "compile_error");
        assert_eq!(SandboxError::Runtime("x".into()).kind(), ErrorKind::Execution);
    }

    #[test]
    fn test_into_workflow_error() {
        let err: WorkflowError = SandboxError::DenyPattern {
            reason: "dynamic eval".into(),
            matched: "eval(".into(),
        }
        .into();

        assert_eq!(err.kind, ErrorKind::SandboxViolation);
        assert!(!err.recoverable);
        assert_eq!(
            err.context.unwrap()["classification"],
            "deny_pattern_violation"
        );

        let err: WorkflowError = SandboxError::Runtime("oops".into()).into();
        assert!(err.recoverable);
    }
}
