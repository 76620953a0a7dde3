use crate::error::WorkflowError;
use crate::executor::ExecutionContext;
use crate::graph::NodeData;
use crate::registry::{NodeCategory, NodeDefinition};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Passes the concatenated outputs of all predecessors through
#[derive(Default)]
pub struct MergeNode;

impl MergeNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NodeDefinition for MergeNode {
    fn node_type(&self) -> &str {
        "merge"
    }

    fn name(&self) -> &str {
        "Merge"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Flow
    }

    fn description(&self) -> &str {
        "Combines items from several branches"
    }

    async fn execute(
        &self,
        inputs: Vec<NodeData>,
        _config: &Map<String, Value>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<NodeData>, WorkflowError> {
        ctx.log(format!("merged {} items", inputs.len()));
        Ok(inputs)
    }
}
