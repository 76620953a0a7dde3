//! Per-node execution context and progress reporting

use super::cancel::CancellationToken;
use super::services::Services;
use super::state::{NodeExecutionState, NodeOutputs};
use crate::graph::{Node, NodeData, Workflow};
use std::sync::Mutex;

/// What a node sees of the run it belongs to.
///
/// Everything is borrowed read-only from the executor; the only thing a node
/// can add is log messages.
pub struct ExecutionContext<'a> {
    workflow: &'a Workflow,
    node: &'a Node,
    outputs: &'a NodeOutputs,
    cancellation: &'a CancellationToken,
    services: &'a Services,
    messages: Mutex<Vec<String>>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        workflow: &'a Workflow,
        node: &'a Node,
        outputs: &'a NodeOutputs,
        cancellation: &'a CancellationToken,
        services: &'a Services,
    ) -> Self {
        Self {
            workflow,
            node,
            outputs,
            cancellation,
            services,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn workflow(&self) -> &Workflow {
        self.workflow
    }

    /// The node being executed
    pub fn node(&self) -> &Node {
        self.node
    }

    /// Outputs of every node completed so far
    pub fn outputs(&self) -> &NodeOutputs {
        self.outputs
    }

    /// Output of an earlier node, if it has run
    pub fn output_of(&self, node_id: &str) -> Option<&[NodeData]> {
        self.outputs.get(node_id).map(|items| items.as_slice())
    }

    pub fn cancellation(&self) -> &CancellationToken {
        self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn services(&self) -> &Services {
        self.services
    }

    /// Log a message for this node; it is also attached to the node's log entry
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(
            node_id = %self.node.id,
            node_type = %self.node.node_type,
            "{}",
            message
        );
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }

    pub(crate) fn take_messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|mut messages| std::mem::take(&mut *messages))
            .unwrap_or_default()
    }
}

/// Receives node state transitions during a run
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, node_id: &str, state: &NodeExecutionState);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, &NodeExecutionState) + Send + Sync,
{
    fn on_progress(&self, node_id: &str, state: &NodeExecutionState) {
        self(node_id, state)
    }
}
