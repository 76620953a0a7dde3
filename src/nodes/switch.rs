use super::sandbox_options;
use crate::error::WorkflowError;
use crate::executor::ExecutionContext;
use crate::graph::NodeData;
use crate::registry::{NodeCategory, NodeDefinition, ParamKind, ParamSpec, param_value};
use crate::sandbox::SandboxExecutor;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
struct Rule {
    condition: String,
    route: String,
}

/// Tags every item with the route of the first rule whose condition holds
pub struct SwitchNode {
    sandbox: Arc<SandboxExecutor>,
    parameters: Vec<ParamSpec>,
}

impl SwitchNode {
    pub fn new(sandbox: Arc<SandboxExecutor>) -> Self {
        Self {
            sandbox,
            parameters: vec![
                ParamSpec::new("rules", "Rules", ParamKind::Json)
                    .required()
                    .with_description("List of {condition, route}; conditions are scripts"),
                ParamSpec::new("default_route", "Default Route", ParamKind::String)
                    .with_default("default"),
                ParamSpec::new("route_field", "Route Field", ParamKind::String)
                    .with_default("route"),
                ParamSpec::new("timeout_ms", "Timeout (ms)", ParamKind::Number),
            ],
        }
    }

    fn rules(config: &Map<String, Value>) -> Result<Vec<Rule>, WorkflowError> {
        let raw = config
            .get("rules")
            .cloned()
            .ok_or_else(|| WorkflowError::configuration("missing required parameter 'rules'"))?;
        serde_json::from_value(raw)
            .map_err(|e| WorkflowError::configuration(format!("invalid 'rules': {}", e)))
    }
}

#[async_trait]
impl NodeDefinition for SwitchNode {
    fn node_type(&self) -> &str {
        "switch"
    }

    fn name(&self) -> &str {
        "Switch"
    }

    fn category(&self) -> NodeCategory {
        NodeCategory::Flow
    }

    fn description(&self) -> &str {
        "Routes items by condition"
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
        let rules = Self::rules(config)?;
        let options = sandbox_options(&self.sandbox, config)?;
        let default_route = param_value(&self.parameters, config, "default_route")
            .and_then(Value::as_str)
            .unwrap_or("default")
            .to_string();
        let route_field = param_value(&self.parameters, config, "route_field")
            .and_then(Value::as_str)
            .unwrap_or("route")
            .to_string();

        let mut outputs = Vec::with_capacity(inputs.len());
        for (index, mut item) in inputs.into_iter().enumerate() {
            let mut route = None;

            for rule in &rules {
                let mut args = Map::new();
                args.insert("json".into(), Value::Object(item.json.clone()));
                args.insert("index".into(), Value::from(index));

                let output = self
                    .sandbox
                    .execute(&rule.condition, args, &options)
                    .await
                    .map_err(|e| {
                        WorkflowError::from(e)
                            .with_context("item", index)
                            .with_context("route", rule.route.as_str())
                    })?;

                match output.result {
                    Value::Bool(true) => {
                        route = Some(rule.route.clone());
                        break;
                    }
                    Value::Bool(false) => {}
                    other => {
                        return Err(WorkflowError::validation(format!(
                            "condition for route '{}' returned {} instead of a boolean",
                            rule.route, other
                        ))
                        .with_context("item", index));
                    }
                }
            }

            let route = route.unwrap_or_else(|| default_route.clone());
            item.json.insert(route_field.clone(), Value::String(route));
            outputs.push(item);
        }

        ctx.log(format!("routed {} items", outputs.len()));
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::nodes::testing::{items, run_node};
    use serde_json::json;

    fn node() -> SwitchNode {
        SwitchNode::new(Arc::new(SandboxExecutor::default()))
    }

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let inputs = items(&[json!({"amount": 5}), json!({"amount": 50}), json!({"amount": 500})]);

        let out = run_node(
            &node(),
            json!({
                "rules": [
                    {"condition": "json.amount > 100", "route": "large"},
                    {"condition": "json.amount > 10", "route": "medium"}
                ],
                "default_route": "small"
            }),
            inputs,
        )
        .await
        .unwrap();

        let routes: Vec<_> = out.iter().map(|d| d.json["route"].clone()).collect();
        assert_eq!(routes, vec![json!("small"), json!("medium"), json!("large")]);
    }

    #[tokio::test]
    async fn test_custom_route_field() {
        let out = run_node(
            &node(),
            json!({"rules": [], "route_field": "lane"}),
            items(&[json!({"a": 1})]),
        )
        .await
        .unwrap();

        assert_eq!(out[0].json["lane"], "default");
        assert_eq!(out[0].json["a"], 1);
    }

    #[tokio::test]
    async fn test_non_boolean_condition() {
        let err = run_node(
            &node(),
            json!({"rules": [{"condition": "json.amount", "route": "x"}]}),
            items(&[json!({"amount": 3})]),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("instead of a boolean"));
    }

    #[tokio::test]
    async fn test_invalid_rules() {
        let err = run_node(&node(), json!({"rules": "nope"}), items(&[json!({})]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
