//! Built-in node types
//!
//! Core node types that need no external service:
//! - `manual_trigger` - emits configured data to start a run
//! - `set` - sets fields from templates
//! - `transform` - reshapes items with a sandboxed script
//! - `switch` - routes items by sandboxed conditions
//! - `merge` - passes the combined inputs through
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::nodes::register_builtins;
//!
//! let mut registry = NodeRegistry::new();
//! register_builtins(&mut registry, Arc::new(SandboxExecutor::default()), &RetryPolicy::default());
//! ```

mod manual_trigger;
mod merge;
mod set;
mod switch;
mod template;
mod transform;

pub use manual_trigger::ManualTriggerNode;
pub use merge::MergeNode;
pub use set::SetNode;
pub use switch::SwitchNode;
pub use template::TemplateEngine;
pub use transform::TransformNode;

use crate::error::{RetryPolicy, WorkflowError};
use crate::graph::NodeData;
use crate::registry::NodeRegistry;
use crate::sandbox::{SandboxExecutor, SandboxOptions};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Register every built-in node type.
///
/// `retry` governs re-evaluation of transform scripts that time out.
pub fn register_builtins(
    registry: &mut NodeRegistry,
    sandbox: Arc<SandboxExecutor>,
    retry: &RetryPolicy,
) {
    registry.register(Arc::new(ManualTriggerNode::new()));
    registry.register(Arc::new(SetNode::new()));
    registry.register(Arc::new(
        TransformNode::new(sandbox.clone()).with_retry_policy(retry.clone()),
    ));
    registry.register(Arc::new(SwitchNode::new(sandbox)));
    registry.register(Arc::new(MergeNode::new()));
}

/// A registry holding only the built-in node types
pub fn builtin_registry(sandbox: Arc<SandboxExecutor>, retry: &RetryPolicy) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_builtins(&mut registry, sandbox, retry);
    registry
}

/// Turn a JSON value into items: an object is one item, an array yields one
/// item per element, null yields nothing and any other scalar is wrapped as
/// `{"value": ...}`
pub(crate) fn items_from_value(value: Value) -> Vec<NodeData> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(elements) => elements
            .into_iter()
            .filter(|v| !v.is_null())
            .map(NodeData::from_value)
            .collect(),
        other => vec![NodeData::from_value(other)],
    }
}

/// Sandbox limits for a node, from its `timeout_ms`/`memory_limit_mb` config
pub(crate) fn sandbox_options(
    sandbox: &SandboxExecutor,
    config: &Map<String, Value>,
) -> Result<SandboxOptions, WorkflowError> {
    let mut options = sandbox.default_options().clone();
    if let Some(ms) = config.get("timeout_ms").and_then(Value::as_u64) {
        options.timeout = Duration::from_millis(ms);
    }
    if let Some(mb) = optional_int::<usize>(config, "memory_limit_mb")? {
        options.memory_limit_mb = mb;
    }
    Ok(options)
}

/// Non-negative integer parameter that must fit `T`
pub(crate) fn optional_int<T: TryFrom<u64>>(
    config: &Map<String, Value>,
    name: &str,
) -> Result<Option<T>, WorkflowError> {
    let Some(n) = config.get(name).and_then(Value::as_u64) else {
        return Ok(None);
    };
    T::try_from(n).map(Some).map_err(|_| {
        WorkflowError::configuration(format!("parameter '{}' is out of range: {}", name, n))
            .with_context("parameter", name)
    })
}

/// Required string parameter, or a configuration error
pub(crate) fn required_str<'a>(
    config: &'a Map<String, Value>,
    name: &str,
) -> Result<&'a str, WorkflowError> {
    match config.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(_) => Err(WorkflowError::configuration(format!(
            "parameter '{}' must be a non-empty string",
            name
        ))),
        None => Err(WorkflowError::configuration(format!(
            "missing required parameter '{}'",
            name
        ))),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::error::WorkflowError;
    use crate::executor::{CancellationToken, ExecutionContext, NodeOutputs, Services};
    use crate::graph::{Node, NodeData, Workflow};
    use crate::registry::NodeDefinition;
    use serde_json::Value;

    /// Run one node definition outside an executor
    pub async fn run_node(
        definition: &dyn NodeDefinition,
        config: Value,
        inputs: Vec<NodeData>,
    ) -> Result<Vec<NodeData>, WorkflowError> {
        let mut node = Node::new("n1", definition.node_type(), "Node");
        node.config = config.as_object().cloned().unwrap_or_default();
        let mut workflow = Workflow::new("wf", "Test");
        workflow.add_node(node.clone());

        let outputs = NodeOutputs::new();
        let token = CancellationToken::new();
        let services = Services::default();
        let ctx = ExecutionContext::new(&workflow, &node, &outputs, &token, &services);

        definition.execute(inputs, &node.config, &ctx).await
    }

    pub fn items(values: &[Value]) -> Vec<NodeData> {
        values.iter().cloned().map(NodeData::from_value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Executor, Services};
    use crate::graph::{Node, Workflow};
    use serde_json::json;

    #[test]
    fn test_items_from_value() {
        assert!(items_from_value(Value::Null).is_empty());
        assert_eq!(items_from_value(json!({"a": 1})).len(), 1);
        assert_eq!(items_from_value(json!([{"a": 1}, null, 3])).len(), 2);
        assert_eq!(items_from_value(json!(5))[0].json["value"], 5);
    }

    #[test]
    fn test_optional_int_checks_range() {
        let config = json!({"small": 7, "huge": 5_000_000_000u64, "text": "x"});
        let config = config.as_object().unwrap();

        assert_eq!(optional_int::<u32>(config, "small").unwrap(), Some(7));
        assert_eq!(optional_int::<u32>(config, "missing").unwrap(), None);
        assert_eq!(optional_int::<u32>(config, "text").unwrap(), None);

        let err = optional_int::<u32>(config, "huge").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
        assert!(err.message.contains("5000000000"));
    }

    #[test]
    fn test_register_builtins_is_idempotent() {
        let sandbox = Arc::new(SandboxExecutor::default());
        let retry = RetryPolicy::new(0, 10);
        let mut registry = builtin_registry(sandbox.clone(), &retry);
        assert_eq!(
            registry.types(),
            vec!["manual_trigger", "merge", "set", "switch", "transform"]
        );

        register_builtins(&mut registry, sandbox, &retry);
        assert_eq!(registry.len(), 5);
    }

    #[tokio::test]
    async fn test_builtin_pipeline() {
        let sandbox = Arc::new(SandboxExecutor::default());
        let registry = builtin_registry(sandbox, &RetryPolicy::new(0, 10));
        let executor = Executor::new(Arc::new(registry));

        let mut wf = Workflow::new("wf-orders", "Orders");
        wf.add_node(Node::new("start", "manual_trigger", "Start").with_config(
            "data",
            json!([{"item": "pen", "qty": 3}, {"item": "desk", "qty": 1}]),
        ));
        wf.add_node(
            Node::new("total", "transform", "Total")
                .with_config("code", "#{ item: json.item, qty: json.qty, big: json.qty > 2 }"),
        );
        wf.add_node(Node::new("label", "set", "Label").with_config(
            "values",
            json!({"label": "{{ json.item | upper }} x{{ json.qty }}"}),
        ));
        wf.add_node(Node::new("route", "switch", "Route").with_config(
            "rules",
            json!([{"condition": "json.big", "route": "bulk"}]),
        ));
        wf.add_connection("start", "total");
        wf.add_connection("total", "label");
        wf.add_connection("label", "route");

        let result = executor.run(&wf, &Services::default(), None).await;

        assert!(result.success, "{:?}", result.error);
        let routed = &result.outputs["route"];
        assert_eq!(routed.len(), 2);
        assert_eq!(routed[0].json["label"], "PEN x3");
        assert_eq!(routed[0].json["route"], "bulk");
        assert_eq!(routed[1].json["route"], "default");
    }
}
