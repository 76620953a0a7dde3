use super::{items_from_value, optional_int, required_str, sandbox_options};
use crate::error::{RetryPolicy, WorkflowError, retry_with_backoff};
use crate::executor::ExecutionContext;
use crate::graph::NodeData;
use crate::registry::{NodeCategory, NodeDefinition, ParamKind, ParamSpec, param_value};
use crate::sandbox::{SandboxExecutor, SandboxOptions, SandboxOutput};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Reshapes items with a sandboxed script.
///
/// In `each` mode the script runs once per item with `json` and `index` in
/// scope; in `all` mode it runs once with `items`. The script's value becomes
/// the output: a map is one item, an array of maps is several, a scalar is
/// wrapped as `{"value": ...}` and `()` drops the item.
pub struct TransformNode {
    sandbox: Arc<SandboxExecutor>,
    retry: RetryPolicy,
    parameters: Vec<ParamSpec>,
}

impl TransformNode {
    pub fn new(sandbox: Arc<SandboxExecutor>) -> Self {
        Self {
            sandbox,
            retry: RetryPolicy {
                max_retries: 0,
                ..Default::default()
            },
            parameters: vec![
                ParamSpec::new("code", "Code", ParamKind::Code).required(),
                ParamSpec::new("mode", "Mode", ParamKind::Options)
                    .with_options(&["each", "all"])
                    .with_default("each")
                    .with_description("Run once per item or once for all items"),
                ParamSpec::new("timeout_ms", "Timeout (ms)", ParamKind::Number),
                ParamSpec::new("memory_limit_mb", "Memory Limit (MB)", ParamKind::Number),
                ParamSpec::new("retries", "Retries", ParamKind::Number)
                    .with_description("Extra attempts after a timeout"),
            ],
        }
    }

    /// Retry policy for timed-out or internally failed evaluations
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn evaluate(
        &self,
        code: &str,
        args: Map<String, Value>,
        options: &SandboxOptions,
        retry: &RetryPolicy,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Value, WorkflowError> {
        let sandbox = self.sandbox.as_ref();
        let args = &args;
        let output: SandboxOutput =
            retry_with_backoff(move || sandbox.execute(code, args.clone(), options), retry).await?;

        for line in &output.logs {
            ctx.log(line.clone());
        }
        Ok(output.result)
    }
}

#[async_trait]
impl NodeDefinition for TransformNode {
    fn node_type(&self) -> &str {
        "transform"
    }

    fn name(&self) -> &str {
        "Transform"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Transform
    }

    fn description(&self) -> &str {
        "Reshapes items with a script"
    }

    fn parameters(&self) -> &[ParamSpec] {
        &self.parameters
    }

    async fn execute(
        &self,
        inputs: Vec<NodeData>,
        config: &Map<String, Value>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<NodeData>, WorkflowError> {
        let code = required_str(config, "code")?;
        let options = sandbox_options(&self.sandbox, config)?;
        let mut retry = self.retry.clone();
        if let Some(n) = optional_int::<u32>(config, "retries")? {
            retry.max_retries = n;
        }

        let mode = param_value(&self.parameters, config, "mode")
            .and_then(Value::as_str)
            .unwrap_or("each");

        match mode {
            "all" => {
                let items: Vec<Value> = inputs.iter().map(NodeData::to_value).collect();
                let mut args = Map::new();
                args.insert("items".into(), Value::Array(items));

                let result = self.evaluate(code, args, &options, &retry, ctx).await?;
                Ok(items_from_value(result))
            }
            "each" => {
                let mut outputs = Vec::with_capacity(inputs.len());
                for (index, item) in inputs.into_iter().enumerate() {
                    let mut args = Map::new();
                    args.insert("json".into(), Value::Object(item.json));
                    args.insert("index".into(), Value::from(index));

                    let result = self
                        .evaluate(code, args, &options, &retry, ctx)
                        .await
                        .map_err(|e| e.with_context("item", index))?;

                    let mut produced = items_from_value(result);
                    if let (Some(binary), [single]) = (item.binary, produced.as_mut_slice()) {
                        single.binary = Some(binary);
                    }
                    outputs.extend(produced);
                }
                Ok(outputs)
            }
            other => Err(WorkflowError::configuration(format!(
                "unknown transform mode '{}', expected 'each' or 'all'",
                other
            ))),
        }
    }
}
