//! Node definition contract

use crate::error::WorkflowError;
use crate::executor::ExecutionContext;
use crate::graph::NodeData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Palette category of a node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    Trigger,
    Transform,
    Flow,
    Ai,
    Data,
    Integration,
    Output,
}

impl NodeCategory {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trigger" => Some(Self::Trigger),
            "transform" => Some(Self::Transform),
            "flow" => Some(Self::Flow),
            "ai" => Some(Self::Ai),
            "data" => Some(Self::Data),
            "integration" => Some(Self::Integration),
            "output" => Some(Self::Output),
            _ => None,
        }
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Trigger => "trigger",
            Self::Transform => "transform",
            Self::Flow => "flow",
            Self::Ai => "ai",
            Self::Data => "data",
            Self::Integration => "integration",
            Self::Output => "output",
        };
        f.write_str(s)
    }
}

/// Kind of value a parameter accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    Json,
    /// Script source evaluated in the sandbox
    Code,
    /// One of a fixed list of `options`
    Options,
}

/// Declared configuration parameter of a node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub display_name: String,
    pub kind: ParamKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            kind,
            required: false,
            default: None,
            description: String::new(),
            options: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Static description of a node type, used for registry comparison and listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
    pub category: NodeCategory,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

/// Capability contract every node type satisfies
#[async_trait]
pub trait NodeDefinition: Send + Sync {
    /// Type identifier referenced by `Node::node_type`
    fn node_type(&self) -> &str;

    /// Display name
    fn name(&self) -> &str;

    fn category(&self) -> NodeCategory;

    fn description(&self) -> &str {
        ""
    }

    fn parameters(&self) -> &[ParamSpec] {
        &[]
    }

    /// Run the node over its inputs.
    ///
    /// Any `Err` is treated by the executor as a node failure and halts the run.
    async fn execute(
        &self,
        inputs: Vec<NodeData>,
        config: &Map<String, Value>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<NodeData>, WorkflowError>;

    /// Descriptor built from the static metadata
    fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            node_type: self.node_type().to_string(),
            name: self.name().to_string(),
            category: self.category(),
            description: self.description().to_string(),
            parameters: self.parameters().to_vec(),
        }
    }
}

/// Read a config value, falling back to the parameter's declared default
pub fn param_value<'a>(
    params: &'a [ParamSpec],
    config: &'a Map<String, Value>,
    name: &str,
) -> Option<&'a Value> {
    config.get(name).or_else(|| {
        params
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.default.as_ref())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_parse() {
        assert_eq!(NodeCategory::parse("Transform"), Some(NodeCategory::Transform));
        assert_eq!(NodeCategory::parse("AI"), Some(NodeCategory::Ai));
        assert_eq!(NodeCategory::parse("nope"), None);
        assert_eq!(NodeCategory::Flow.to_string(), "flow");
    }

    #[test]
    fn test_param_value_default() {
        let params = vec![
            ParamSpec::new("mode", "Mode", ParamKind::Options)
                .with_options(&["each", "all"])
                .with_default("each"),
        ];
        let mut config = Map::new();
        assert_eq!(param_value(&params, &config, "mode"), Some(&json!("each")));

        config.insert("mode".into(), json!("all"));
        assert_eq!(param_value(&params, &config, "mode"), Some(&json!("all")));
        assert_eq!(param_value(&params, &config, "other"), None);
    }
}
