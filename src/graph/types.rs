//! Node, connection and data-item types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One unit of work in a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique within a workflow
    pub id: String,

    /// Node type, resolved against the registry at run time
    #[serde(rename = "type")]
    pub node_type: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Canvas position
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,

    /// Type-specific configuration
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Node {
    /// Create a node at the origin with empty config
    pub fn new(
        id: impl Into<String>,
        node_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            name: name.into(),
            x: 0.0,
            y: 0.0,
            config: Map::new(),
        }
    }

    /// Set the canvas position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Set a config value
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Name to show in logs, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub from: String,
    pub to: String,
}

impl Connection {
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Binary attachment on a data item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryData {
    /// Base64-encoded payload
    pub data: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// The unit of data flowing along a connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub json: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<HashMap<String, BinaryData>>,
}

impl NodeData {
    /// An item with an empty JSON object
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap a JSON object
    pub fn new(json: Map<String, Value>) -> Self {
        Self { json, binary: None }
    }

    /// Build an item from any JSON value. Objects are used as-is, anything
    /// else is wrapped as `{"value": ...}`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(map),
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other);
                Self::new(map)
            }
        }
    }

    /// Attach a binary payload
    pub fn with_binary(mut self, key: impl Into<String>, data: BinaryData) -> Self {
        self.binary
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), data);
        self
    }

    /// The JSON payload as a `Value`
    pub fn to_value(&self) -> Value {
        Value::Object(self.json.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_deserialize_type_field() {
        let node: Node = serde_json::from_value(json!({
            "id": "a",
            "type": "transform",
            "name": "Clean",
            "x": 10,
            "y": 20,
            "config": {"code": "json"}
        }))
        .unwrap();

        assert_eq!(node.node_type, "transform");
        assert_eq!(node.x, 10.0);
        assert_eq!(node.config["code"], "json");
    }

    #[test]
    fn test_node_defaults() {
        let node: Node = serde_json::from_value(json!({"id": "a", "type": "merge"})).unwrap();
        assert!(node.config.is_empty());
        assert_eq!(node.display_name(), "a");
    }

    #[test]
    fn test_node_data_from_value() {
        let item = NodeData::from_value(json!({"a": 1}));
        assert_eq!(item.json["a"], 1);

        let item = NodeData::from_value(json!(42));
        assert_eq!(item.json["value"], 42);
    }

    #[test]
    fn test_node_data_binary_skipped_when_absent() {
        let json = serde_json::to_value(NodeData::empty()).unwrap();
        assert_eq!(json, json!({"json": {}}));

        let item = NodeData::empty().with_binary(
            "file",
            BinaryData {
                data: "aGk=".into(),
                mime_type: "text/plain".into(),
                file_name: None,
            },
        );
        let json = serde_json::to_value(item).unwrap();
        assert_eq!(json["binary"]["file"]["mimeType"], "text/plain");
    }
}
