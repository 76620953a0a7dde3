//! Field templates for the `set` node

use minijinja::value::Value as TemplateValue;
use minijinja::{Environment, Error, ErrorKind, State};
use serde_json::Value;

/// Renders `{{ ... }}` templates against an item.
///
/// Wraps minijinja with strict undefined handling and a `json` filter.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        env.add_filter("json", filter_json);
        Self { env }
    }

    /// Render `template` to a string
    pub fn render(&self, template: &str, ctx: &Value) -> Result<String, String> {
        self.env
            .render_str(template, ctx)
            .map_err(|e| describe(&e))
    }

    /// Evaluate a template into a JSON value.
    ///
    /// A template that is exactly one `{{ expression }}` keeps the
    /// expression's type (numbers stay numbers, lists stay lists). Anything
    /// else renders to a string.
    pub fn evaluate(&self, template: &str, ctx: &Value) -> Result<Value, String> {
        if let Some(expr) = single_expression(template) {
            let compiled = self.env.compile_expression(expr).map_err(|e| describe(&e))?;
            let value = compiled.eval(ctx).map_err(|e| describe(&e))?;
            return serde_json::to_value(&value).map_err(|e| e.to_string());
        }

        self.render(template, ctx).map(Value::String)
    }
}

/// The inner expression if `template` is a single `{{ ... }}` block
fn single_expression(template: &str) -> Option<&str> {
    let inner = template.trim().strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") || inner.contains("{%") {
        return None;
    }
    Some(inner.trim())
}

fn describe(err: &Error) -> String {
    let mut msg = err.to_string();
    if let Some(detail) = err.detail() {
        if !msg.contains(detail) {
            msg = format!("{}: {}", msg, detail);
        }
    }
    msg
}

/// Serialize value to JSON string
fn filter_json(_state: &State, value: TemplateValue) -> Result<TemplateValue, Error> {
    let json = serde_json::to_string(&value).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("JSON serialization failed: {}", e),
        )
    })?;
    Ok(TemplateValue::from(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_string() {
        let engine = TemplateEngine::new();
        let ctx = json!({"json": {"name": "Ada"}});

        let out = engine.render("Hello, {{ json.name }}!", &ctx).unwrap();
        assert_eq!(out, "Hello, Ada!");
    }

    #[test]
    fn test_single_expression_keeps_type() {
        let engine = TemplateEngine::new();
        let ctx = json!({"json": {"price": 4, "tags": ["a", "b"]}});

        assert_eq!(engine.evaluate("{{ json.price * 2 }}", &ctx).unwrap(), json!(8));
        assert_eq!(engine.evaluate(" {{ json.tags }} ", &ctx).unwrap(), json!(["a", "b"]));
        assert_eq!(
            engine.evaluate("total: {{ json.price }}", &ctx).unwrap(),
            json!("total: 4")
        );
    }

    #[test]
    fn test_undefined_is_an_error() {
        let engine = TemplateEngine::new();
        let ctx = json!({"json": {}});

        assert!(engine.render("{{ json.missing.deeper }}", &ctx).is_err());
        assert!(engine.render("{{ nope }}", &ctx).is_err());
    }

    #[test]
    fn test_json_filter() {
        let engine = TemplateEngine::new();
        let ctx = json!({"json": {"v": {"a": 1}}});

        assert_eq!(engine.render("{{ json.v | json }}", &ctx).unwrap(), r#"{"a":1}"#);
        assert!(engine.render("{{ json.v | shell_escape }}", &ctx).is_err());
    }

    #[test]
    fn test_single_expression_detection() {
        assert_eq!(single_expression("{{ a }}"), Some("a"));
        assert_eq!(single_expression("{{ a }} and {{ b }}"), None);
        assert_eq!(single_expression("plain"), None);
    }
}
