use super::template::TemplateEngine;
use crate::error::WorkflowError;
use crate::executor::ExecutionContext;
use crate::graph::NodeData;
use crate::registry::{NodeCategory, NodeDefinition, ParamKind, ParamSpec, param_value};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

/// Sets fields on every item from templated `values`.
///
/// String values are templates rendered against `{json, index}`; other values
/// are copied as-is. With `keep_only`, the item is replaced by the set fields.
pub struct SetNode {
    engine: TemplateEngine,
    parameters: Vec<ParamSpec>,
}

impl SetNode {
    pub fn new() -> Self {
        Self {
            engine: TemplateEngine::new(),
            parameters: vec![
                ParamSpec::new("values", "Values", ParamKind::Json)
                    .required()
                    .with_description("Field name to template mapping"),
                ParamSpec::new("keep_only", "Keep Only Set Fields", ParamKind::Boolean)
                    .with_default(false),
            ],
        }
    }
}

impl Default for SetNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeDefinition for SetNode {
    fn node_type(&self) -> &str {
        "set"
    }

    fn name(&self) -> &str {
        "Set"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Data
    }

    fn description(&self) -> &str {
        "Sets item fields from templates"
    }

    fn parameters(&self) -> &[ParamSpec] {
        &self.parameters
    }

    async fn execute(
        &self,
        inputs: Vec<NodeData>,
        config: &Map<String, Value>,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<NodeData>, WorkflowError> {
        let values = match config.get("values") {
            Some(Value::Object(values)) => values,
            Some(_) => {
                return Err(WorkflowError::configuration("parameter 'values' must be an object"));
            }
            None => return Err(WorkflowError::configuration("missing required parameter 'values'")),
        };
        let keep_only = param_value(&self.parameters, config, "keep_only")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mut outputs = Vec::with_capacity(inputs.len());
        for (index, item) in inputs.into_iter().enumerate() {
            let scope = json!({"json": &item.json, "index": index});

            let mut json = if keep_only { Map::new() } else { item.json };
            for (field, template) in values {
                let value = match template {
                    Value::String(t) => self.engine.evaluate(t, &scope).map_err(|e| {
                        WorkflowError::validation(format!("field '{}': {}", field, e))
                            .with_context("item", index)
                    })?,
                    other => other.clone(),
                };
                json.insert(field.clone(), value);
            }

            outputs.push(NodeData {
                json,
                binary: item.binary,
            });
        }

        Ok(outputs)
    }
}
