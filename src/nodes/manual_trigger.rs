use super::items_from_value;
use crate::error::WorkflowError;
use crate::executor::ExecutionContext;
use crate::graph::NodeData;
use crate::registry::{NodeCategory, NodeDefinition, ParamKind, ParamSpec};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Starts a run with the items in its `data` parameter
pub struct ManualTriggerNode {
    parameters: Vec<ParamSpec>,
}

impl ManualTriggerNode {
    pub fn new() -> Self {
        Self {
            parameters: vec![
                ParamSpec::new("data", "Data", ParamKind::Json)
                    .with_description("Object or array of objects to emit"),
            ],
        }
    }
}

impl Default for ManualTriggerNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeDefinition for ManualTriggerNode {
    fn node_type(&self) -> &str {
        "manual_trigger"
    }

    fn name(&self) -> &str {
        "Manual Trigger"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Trigger
    }

    fn description(&self) -> &str {
        "Starts the workflow with static data"
    }

    fn parameters(&self) -> &[ParamSpec] {
        &self.parameters
    }

    async fn execute(
        &self,
        _inputs: Vec<NodeData>,
        config: &Map<String, Value>,
        _ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<NodeData>, WorkflowError> {
        let items = match config.get("data") {
            None | Some(Value::Null) => Vec::new(),
            Some(data) => items_from_value(data.clone()),
        };

        if items.is_empty() {
            return Ok(vec![NodeData::empty()]);
        }
        Ok(items)
    }
}
