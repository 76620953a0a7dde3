//! CLI command implementations

use super::output::{OutputEvent, OutputHandler, ProgressReporter};
use crate::config::{EngineConfig, load_workflow_file};
use crate::executor::{CancellationToken, ExecutionResult, Executor, Services};
use crate::graph::Workflow;
use crate::nodes::builtin_registry;
use crate::registry::{NodeCategory, NodeRegistry};
use crate::sandbox::{SandboxExecutor, SandboxOptions};
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Sandbox and built-in registry configured from `config`
pub fn build_runtime(config: &EngineConfig) -> (Arc<SandboxExecutor>, Arc<NodeRegistry>) {
    let sandbox = Arc::new(SandboxExecutor::new(config.sandbox_config()));
    let registry = builtin_registry(sandbox.clone(), &config.retry_policy());
    (sandbox, Arc::new(registry))
}

/// Run a workflow file
pub async fn run_workflow(
    path: &Path,
    config: &EngineConfig,
    token: CancellationToken,
    save_result: Option<&Path>,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let workflow = load_workflow_file(path)?;
    let (_sandbox, registry) = build_runtime(config);

    handler.emit(OutputEvent::WorkflowStart {
        name: workflow.name.clone(),
        nodes: workflow.nodes.len(),
    });

    let executor = Executor::new(registry).with_cancellation(token);
    let reporter = ProgressReporter::new(handler, &workflow);
    let result = executor
        .run(&workflow, &Services::default(), Some(&reporter))
        .await;

    if let Some(ref error) = result.error {
        handler.emit(OutputEvent::WorkflowError {
            error: error.clone(),
        });
    }

    handler.emit(OutputEvent::WorkflowComplete {
        success: result.success,
        status: result.status.to_string(),
        duration_ms: result.duration,
        nodes_completed: result.outputs.len(),
    });

    if let Some(target) = save_result {
        let json = result.to_json()?;
        std::fs::write(target, json).with_context(|| format!("writing {}", target.display()))?;
        handler.emit(OutputEvent::Debug {
            message: format!("Saved execution result to {}", target.display()),
        });
    }

    let final_output = final_output(&workflow, &result);
    handler.result(result.success, final_output.as_ref());

    Ok(if result.success { 0 } else { 1 })
}

/// JSON items of the last node in execution order that produced output
fn final_output(workflow: &Workflow, result: &ExecutionResult) -> Option<Value> {
    let order = workflow.execution_order()?;
    order
        .iter()
        .rev()
        .find_map(|id| result.outputs.get(id))
        .map(|items| Value::Array(items.iter().map(|d| d.to_value()).collect()))
}

/// Validate a workflow file against the graph rules and the registry
pub fn validate_workflow(
    path: &Path,
    registry: &NodeRegistry,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let workflow = match load_workflow_file(path) {
        Ok(wf) => wf,
        Err(e) => {
            handler.emit(OutputEvent::WorkflowError {
                error: format!("Failed to load workflow: {:#}", e),
            });
            return Ok(1);
        }
    };

    let mut errors = workflow.validate();
    if errors.is_empty() && workflow.execution_order().is_none() {
        errors.push("workflow contains a cyclic dependency".to_string());
    }
    for node in &workflow.nodes {
        if !registry.contains(&node.node_type) {
            errors.push(format!(
                "node '{}' has unknown type '{}'",
                node.id, node.node_type
            ));
        }
    }

    if errors.is_empty() {
        handler.emit(OutputEvent::Info {
            message: format!(
                "✓ Workflow '{}' is valid ({} nodes, {} connections)",
                workflow.name,
                workflow.nodes.len(),
                workflow.connections.len()
            ),
        });
        return Ok(0);
    }

    handler.emit(OutputEvent::Info {
        message: format!(
            "✗ Workflow '{}' has {} error(s):",
            workflow.name,
            errors.len()
        ),
    });
    for err in &errors {
        handler.emit(OutputEvent::Info {
            message: format!("  - {}", err),
        });
    }
    Ok(1)
}

/// Print the execution order of a workflow file
pub fn print_order(path: &Path, handler: &dyn OutputHandler) -> Result<i32> {
    let workflow = load_workflow_file(path)?;

    match workflow.execution_order() {
        Some(order) => {
            for (i, id) in order.iter().enumerate() {
                let name = workflow.node(id).map(|n| n.display_name()).unwrap_or(id);
                handler.emit(OutputEvent::Info {
                    message: format!("{}. {} ({})", i + 1, id, name),
                });
            }
            Ok(0)
        }
        None => {
            handler.emit(OutputEvent::WorkflowError {
                error: "workflow contains a cyclic dependency".into(),
            });
            Ok(1)
        }
    }
}

/// List registered node types
pub fn list_nodes(
    registry: &NodeRegistry,
    category: Option<&str>,
    search: Option<&str>,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let mut definitions = registry.search(search.unwrap_or(""));
    if let Some(c) = category {
        let category = NodeCategory::parse(c)
            .ok_or_else(|| anyhow::anyhow!("unknown node category '{}'", c))?;
        definitions.retain(|d| d.category() == category);
    }

    if definitions.is_empty() {
        handler.emit(OutputEvent::Info {
            message: "(no matching node types)".into(),
        });
        return Ok(0);
    }

    for def in definitions {
        handler.emit(OutputEvent::Info {
            message: format!(
                "{:<16} [{}] {} - {}",
                def.node_type(),
                def.category(),
                def.name(),
                def.description()
            ),
        });
    }
    Ok(0)
}

/// Evaluate a script in the sandbox
pub async fn eval_script(
    sandbox: &SandboxExecutor,
    code: &str,
    args: &[String],
    timeout_ms: Option<u64>,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let args = parse_script_args(args)?;
    let mut options: SandboxOptions = sandbox.default_options().clone();
    if let Some(ms) = timeout_ms {
        options.timeout = Duration::from_millis(ms);
    }

    match sandbox.execute(code, args, &options).await {
        Ok(output) => {
            for line in &output.logs {
                handler.emit(OutputEvent::Info {
                    message: line.clone(),
                });
            }
            handler.emit(OutputEvent::Debug {
                message: format!("evaluated in {}ms", output.execution_time_ms),
            });
            handler.result(true, Some(&output.result));
            Ok(0)
        }
        Err(e) => {
            handler.emit(OutputEvent::WorkflowError {
                error: format!("{} ({})", e, e.classification()),
            });
            handler.result(false, None);
            Ok(1)
        }
    }
}

/// Parse `key=value` script arguments; values are JSON when they parse as
/// JSON, otherwise strings
fn parse_script_args(args: &[String]) -> Result<Map<String, Value>> {
    let mut parsed = Map::new();

    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("argument '{}' is not in key=value form", arg))?;
        let value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        parsed.insert(key.to_string(), value);
    }

    Ok(parsed)
}
