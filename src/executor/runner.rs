//! Executor - walks a workflow and drives each node to completion

use super::cancel::CancellationToken;
use super::context::{ExecutionContext, ProgressSink};
use super::services::Services;
use super::state::{
    ExecutionLogEntry, ExecutionResult, LogStatus, NodeExecutionState, NodeOutputs, RunStatus,
};
use crate::error::WorkflowError;
use crate::graph::{Node, NodeData, Workflow};
use crate::registry::NodeRegistry;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::Instrument;

/// Runs workflows against a node registry, one node at a time
pub struct Executor {
    registry: Arc<NodeRegistry>,
    cancellation: CancellationToken,
    status: Mutex<RunStatus>,
}

/// Puts the executor into its terminal state when the run ends, including
/// when the run future is dropped part-way
struct RunGuard<'a> {
    status: &'a Mutex<RunStatus>,
    outcome: RunStatus,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut status) = self.status.lock() {
            *status = self.outcome;
        }
    }
}

impl Executor {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            cancellation: CancellationToken::new(),
            status: Mutex::new(RunStatus::Idle),
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Request cancellation. The current node finishes; no further node starts.
    ///
    /// The token is one-shot: later runs on this executor abort immediately
    /// unless a fresh token is installed with [`Executor::with_cancellation`].
    pub fn abort(&self) {
        tracing::info!("Abort requested");
        self.cancellation.cancel();
    }

    /// Current run state
    pub fn status(&self) -> RunStatus {
        self.status.lock().map(|s| *s).unwrap_or(RunStatus::Failed)
    }

    /// Run `workflow` to completion, failure or cancellation.
    ///
    /// Never returns an error: the result's `success`, `error` and `failure`
    /// fields carry the outcome, and partial progress is always included.
    pub async fn run(
        &self,
        workflow: &Workflow,
        services: &Services,
        on_progress: Option<&dyn ProgressSink>,
    ) -> ExecutionResult {
        let started = Instant::now();

        let mut guard = match self.begin() {
            Some(guard) => guard,
            None => {
                let err = WorkflowError::execution("a run is already in progress on this executor");
                tracing::warn!(workflow_id = %workflow.id, "{}", err);
                return ExecutionResult::rejected(err, 0);
            }
        };

        let span = tracing::info_span!(
            "workflow_run",
            workflow_id = %workflow.id,
            workflow = %workflow.name
        );

        let result = self
            .execute_workflow(workflow, services, on_progress, started)
            .instrument(span)
            .await;

        guard.outcome = result.status;
        result
    }

    fn begin(&self) -> Option<RunGuard<'_>> {
        let mut status = self.status.lock().ok()?;
        if *status == RunStatus::Running {
            return None;
        }
        *status = RunStatus::Running;
        Some(RunGuard {
            status: &self.status,
            outcome: RunStatus::Aborted,
        })
    }

    async fn execute_workflow(
        &self,
        workflow: &Workflow,
        services: &Services,
        on_progress: Option<&dyn ProgressSink>,
        started: Instant,
    ) -> ExecutionResult {
        let errors = workflow.validate();
        if !errors.is_empty() {
            let err = WorkflowError::validation(format!(
                "workflow is invalid: {}",
                errors.join("; ")
            ))
            .with_context("errors", errors);
            err.log();
            return ExecutionResult::rejected(err, elapsed_ms(started));
        }

        let Some(order) = workflow.execution_order() else {
            let err = WorkflowError::validation("workflow contains a cyclic dependency");
            err.log();
            return ExecutionResult::rejected(err, elapsed_ms(started));
        };

        tracing::info!(nodes = order.len(), "Starting workflow run");

        let mut outputs = NodeOutputs::new();
        let mut log = Vec::new();
        let mut failure = None;
        let mut aborted = false;

        for node_id in &order {
            if self.cancellation.is_cancelled() {
                tracing::info!(next_node = %node_id, "Run cancelled");
                aborted = true;
                break;
            }

            let Some(node) = workflow.node(node_id) else {
                continue;
            };

            let inputs = gather_inputs(workflow, node, &outputs);
            let result = self
                .execute_node(workflow, node, inputs, &outputs, services, on_progress, &mut log)
                .await;

            match result {
                Ok(items) => {
                    outputs.insert(node.id.clone(), items);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let duration = elapsed_ms(started);

        if let Some(err) = failure {
            let node_label = err
                .node
                .as_ref()
                .map(|n| n.name.clone())
                .unwrap_or_default();
            return ExecutionResult {
                success: false,
                status: RunStatus::Failed,
                duration,
                outputs,
                error: Some(format!("node '{}' failed: {}", node_label, err.message)),
                failure: Some(err),
                log,
            };
        }

        if aborted {
            return ExecutionResult {
                success: false,
                status: RunStatus::Aborted,
                duration,
                outputs,
                error: Some("execution aborted".to_string()),
                failure: Some(
                    WorkflowError::execution("execution aborted")
                        .with_context("reason", "cancelled"),
                ),
                log,
            };
        }

        tracing::info!(duration_ms = duration, "Workflow run completed");

        ExecutionResult {
            success: true,
            status: RunStatus::Completed,
            duration,
            outputs,
            error: None,
            failure: None,
            log,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_node(
        &self,
        workflow: &Workflow,
        node: &Node,
        inputs: Vec<NodeData>,
        outputs: &NodeOutputs,
        services: &Services,
        on_progress: Option<&dyn ProgressSink>,
        log: &mut Vec<ExecutionLogEntry>,
    ) -> Result<Vec<NodeData>, WorkflowError> {
        let name = node.display_name();
        let started = Instant::now();
        let mut state = NodeExecutionState::running(&inputs);
        let input_snapshot = inputs.first().cloned();

        let Some(definition) = self.registry.get(&node.node_type) else {
            let err =
                WorkflowError::node_not_found(format!("unknown node type '{}'", node.node_type))
                    .with_node(&node.id, &node.node_type, name);
            let mut entry =
                ExecutionLogEntry::new(&node.id, name, &node.node_type, LogStatus::Error);
            entry.duration = Some(0);
            entry.error = Some(err.message.clone());
            log.push(entry);
            state.fail(&err.message, 0);
            notify(on_progress, &node.id, &state);
            err.log();
            return Err(err);
        };

        log.push(ExecutionLogEntry::new(
            &node.id,
            name,
            &node.node_type,
            LogStatus::Running,
        ));
        notify(on_progress, &node.id, &state);
        tracing::debug!(
            node_id = %node.id,
            node_type = %node.node_type,
            items = inputs.len(),
            "Executing node"
        );

        let ctx = ExecutionContext::new(workflow, node, outputs, &self.cancellation, services);
        let result = definition.execute(inputs, &node.config, &ctx).await;
        let duration = elapsed_ms(started);

        let mut entry =
            ExecutionLogEntry::new(&node.id, name, &node.node_type, LogStatus::Completed);
        entry.duration = Some(duration);
        entry.input = input_snapshot;
        entry.messages = ctx.take_messages();

        match result {
            Ok(items) => {
                entry.output = items.first().cloned();
                log.push(entry);
                state.succeed(&items, duration);
                notify(on_progress, &node.id, &state);
                tracing::info!(
                    node_id = %node.id,
                    duration_ms = duration,
                    items = items.len(),
                    "Node completed"
                );
                Ok(items)
            }
            Err(err) => {
                let err = err.with_node(&node.id, &node.node_type, name);
                entry.status = LogStatus::Error;
                entry.error = Some(err.message.clone());
                log.push(entry);
                state.fail(&err.message, duration);
                notify(on_progress, &node.id, &state);
                err.log();
                Err(err)
            }
        }
    }
}

/// Outputs of the node's predecessors, concatenated in connection order.
/// A node without predecessors gets a single empty item.
fn gather_inputs(
    workflow: &Workflow,
    node: &Node,
    outputs: &NodeOutputs,
) -> Vec<NodeData> {
    let previous = workflow.previous_nodes(&node.id);
    if previous.is_empty() {
        return vec![NodeData::empty()];
    }

    previous
        .iter()
        .filter_map(|p| outputs.get(&p.id))
        .flat_map(|items| items.iter().cloned())
        .collect()
}

fn notify(sink: Option<&dyn ProgressSink>, node_id: &str, state: &NodeExecutionState) {
    if let Some(sink) = sink {
        sink.on_progress(node_id, state);
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
