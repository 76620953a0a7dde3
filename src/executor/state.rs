//! Run and node execution state

use crate::error::WorkflowError;
use crate::graph::NodeData;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node outputs keyed by node id, in the order the nodes completed
pub type NodeOutputs = IndexMap<String, Vec<NodeData>>;

/// Status recorded on a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Pending,
    Running,
    Completed,
    Error,
}

/// One entry in a run's append-only execution log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLogEntry {
    pub node_id: String,
    pub node_name: String,
    pub node_type: String,
    pub timestamp: DateTime<Utc>,
    pub status: LogStatus,

    /// Milliseconds the node took
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    /// First input item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<NodeData>,

    /// First output item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<NodeData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Messages the node logged through its context
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl ExecutionLogEntry {
    pub(crate) fn new(node_id: &str, node_name: &str, node_type: &str, status: LogStatus) -> Self {
        Self {
            node_id: node_id.to_string(),
            node_name: node_name.to_string(),
            node_type: node_type.to_string(),
            timestamp: Utc::now(),
            status,
            duration: None,
            input: None,
            output: None,
            error: None,
            messages: Vec::new(),
        }
    }
}

/// Per-node status reported to progress callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Success,
    Error,
}

/// Snapshot of one node's execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionState {
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<NodeData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<NodeData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeExecutionState {
    pub fn pending() -> Self {
        Self {
            status: NodeStatus::Pending,
            start_time: None,
            end_time: None,
            duration: None,
            input: None,
            output: None,
            error: None,
        }
    }

    pub(crate) fn running(input: &[NodeData]) -> Self {
        Self {
            status: NodeStatus::Running,
            start_time: Some(Utc::now()),
            input: Some(input.to_vec()),
            ..Self::pending()
        }
    }

    pub(crate) fn succeed(&mut self, output: &[NodeData], duration_ms: u64) {
        self.status = NodeStatus::Success;
        self.end_time = Some(Utc::now());
        self.duration = Some(duration_ms);
        self.output = Some(output.to_vec());
    }

    pub(crate) fn fail(&mut self, error: &str, duration_ms: u64) {
        self.status = NodeStatus::Error;
        self.end_time = Some(Utc::now());
        self.duration = Some(duration_ms);
        self.error = Some(error.to_string());
    }
}

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Failed,
    Aborted,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Outcome of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,

    /// Terminal run state
    pub status: RunStatus,

    /// Total milliseconds
    pub duration: u64,

    /// Outputs of every node that completed, in execution order
    pub outputs: NodeOutputs,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Structured error behind `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<WorkflowError>,

    pub log: Vec<ExecutionLogEntry>,
}

impl ExecutionResult {
    /// Failed result with no node executed
    pub(crate) fn rejected(error: WorkflowError, duration: u64) -> Self {
        Self {
            success: false,
            status: RunStatus::Failed,
            duration,
            outputs: NodeOutputs::new(),
            error: Some(error.message.clone()),
            failure: Some(error),
            log: Vec::new(),
        }
    }

    /// Log entries for one node, in order
    pub fn entries_for<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a ExecutionLogEntry> {
        self.log.iter().filter(move |e| e.node_id == node_id)
    }

    /// Final log entry for a node
    pub fn last_entry(&self, node_id: &str) -> Option<&ExecutionLogEntry> {
        self.log.iter().rev().find(|e| e.node_id == node_id)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_entry_wire_format() {
        let mut entry =
            ExecutionLogEntry::new("a", "Start", "manual_trigger", LogStatus::Completed);
        entry.duration = Some(12);
        entry.output = Some(NodeData::from_value(json!({"x": 1})));

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["nodeId"], "a");
        assert_eq!(value["nodeType"], "manual_trigger");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["duration"], 12);
        assert!(value.get("error").is_none());
        assert!(value.get("messages").is_none());
    }

    #[test]
    fn test_node_state_transitions() {
        let input = vec![NodeData::empty()];
        let mut state = NodeExecutionState::running(&input);
        assert_eq!(state.status, NodeStatus::Running);
        assert!(state.start_time.is_some());

        state.fail("boom", 5);
        assert_eq!(state.status, NodeStatus::Error);
        assert_eq!(state.error.as_deref(), Some("boom"));
        assert_eq!(state.duration, Some(5));
    }

    #[test]
    fn test_rejected_result() {
        let result = ExecutionResult::rejected(WorkflowError::validation("bad graph"), 0);
        assert!(!result.success);
        assert_eq!(result.status, RunStatus::Failed);
        assert!(result.log.is_empty());
        assert_eq!(result.error.as_deref(), Some("bad graph"));

        let text = result.to_json().unwrap();
        let back: ExecutionResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back.status, RunStatus::Failed);
    }

    #[test]
    fn test_run_status_terminal() {
        assert!(!RunStatus::Idle.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Aborted.is_terminal());
        assert_eq!(RunStatus::Completed.to_string(), "completed");
    }
}
