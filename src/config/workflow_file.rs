//! Workflow file loading

use crate::graph::Workflow;
use anyhow::{Context, Result};
use std::path::Path;

/// Load a workflow from a `.json` or `.toml` file.
///
/// Only parses; structural problems are reported by
/// [`Workflow::validate`] or when the workflow runs.
pub fn load_workflow_file(path: &Path) -> Result<Workflow> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let workflow: Workflow = match extension.as_deref() {
        Some("json") => serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?,
        Some("toml") => toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?,
        _ => anyhow::bail!(
            "unsupported workflow file '{}': expected .json or .toml",
            path.display()
        ),
    };

    tracing::debug!(
        path = %path.display(),
        nodes = workflow.nodes.len(),
        connections = workflow.connections.len(),
        "Loaded workflow"
    );

    Ok(workflow)
}

/// Save a workflow as pretty JSON
pub fn save_workflow_file(workflow: &Workflow, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(workflow)?;
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;
    use tempfile::TempDir;

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wf.json");
        std::fs::write(
            &path,
            r#"{
                "id": "wf-1",
                "name": "Demo",
                "nodes": [
                    {"id": "a", "type": "manual_trigger", "name": "Start"},
                    {"id": "b", "type": "transform", "config": {"code": "json"}}
                ],
                "connections": [{"id": "c1", "from": "a", "to": "b"}]
            }"#,
        )
        .unwrap();

        let wf = load_workflow_file(&path).unwrap();
        assert_eq!(wf.nodes.len(), 2);
        assert_eq!(wf.nodes[1].config["code"], "json");
        assert!(wf.validate().is_empty());
    }

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wf.toml");
        std::fs::write(
            &path,
            r#"
            id = "wf-2"
            name = "Toml"

            [[nodes]]
            id = "a"
            type = "manual_trigger"

            [nodes.config]
            data = [{ n = 1 }, { n = 2 }]

            [[nodes]]
            id = "b"
            type = "merge"

            [[connections]]
            id = "c1"
            from = "a"
            to = "b"
        "#,
        )
        .unwrap();

        let wf = load_workflow_file(&path).unwrap();
        assert_eq!(wf.execution_order(), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(wf.nodes[0].config["data"][1]["n"], 2);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/wf.json");
        let mut wf = Workflow::new("wf-3", "Saved");
        wf.add_node(Node::new("a", "merge", "A"));

        save_workflow_file(&wf, &path).unwrap();
        assert_eq!(load_workflow_file(&path).unwrap(), wf);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wf.yaml");
        std::fs::write(&path, "id: x").unwrap();

        let err = load_workflow_file(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }
}
