//! Workflow graph: structural validation and execution ordering

use super::types::{Connection, Node};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A workflow: nodes plus the connections between them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub connections: Vec<Connection>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Create an empty workflow
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Check structural soundness.
    ///
    /// Returns human-readable errors; an empty list means every connection
    /// references existing nodes and node ids are unique. Cycles are not
    /// reported here, see [`Workflow::execution_order`].
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                errors.push(format!("duplicate node id '{}'", node.id));
            }
        }

        for conn in &self.connections {
            if !seen.contains(conn.from.as_str()) {
                errors.push(format!(
                    "connection '{}' references unknown source node '{}'",
                    conn.id, conn.from
                ));
            }
            if !seen.contains(conn.to.as_str()) {
                errors.push(format!(
                    "connection '{}' references unknown target node '{}'",
                    conn.id, conn.to
                ));
            }
        }

        errors
    }

    /// Topological order of node ids, or `None` if the graph has a cycle.
    ///
    /// Among nodes whose dependencies are satisfied, the one that appears
    /// first in the node array runs first, so the same graph always yields
    /// the same order.
    pub fn execution_order(&self) -> Option<Vec<String>> {
        let index: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; self.nodes.len()];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];

        for conn in &self.connections {
            let (Some(&from), Some(&to)) =
                (index.get(conn.from.as_str()), index.get(conn.to.as_str()))
            else {
                continue;
            };
            in_degree[to] += 1;
            successors[from].push(to);
        }

        // Ready set keyed by node-array position: the earliest ready node always goes next
        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(current) = ready.pop_first() {
            order.push(self.nodes[current].id.clone());

            for &succ in &successors[current] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.insert(succ);
                }
            }
        }

        if order.len() == self.nodes.len() {
            Some(order)
        } else {
            None
        }
    }

    /// Nodes with a connection into `node_id`, in connection order
    pub fn previous_nodes(&self, node_id: &str) -> Vec<&Node> {
        self.connections
            .iter()
            .filter(|c| c.to == node_id)
            .filter_map(|c| self.node(&c.from))
            .collect()
    }

    /// Nodes with a connection out of `node_id`, in connection order
    pub fn next_nodes(&self, node_id: &str) -> Vec<&Node> {
        self.connections
            .iter()
            .filter(|c| c.from == node_id)
            .filter_map(|c| self.node(&c.to))
            .collect()
    }

    // Editor operations. The executor never mutates a workflow.

    /// Append a node. Returns false if the id is already taken.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.node(&node.id).is_some() {
            return false;
        }
        self.nodes.push(node);
        self.touch();
        true
    }

    /// Remove a node and every connection attached to it
    pub fn remove_node(&mut self, node_id: &str) -> Option<Node> {
        let index = self.nodes.iter().position(|n| n.id == node_id)?;
        let node = self.nodes.remove(index);
        self.connections.retain(|c| c.from != node_id && c.to != node_id);
        self.touch();
        Some(node)
    }

    /// Apply `update` to a node in place
    pub fn update_node(&mut self, node_id: &str, update: impl FnOnce(&mut Node)) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) else {
            return false;
        };
        update(node);
        self.touch();
        true
    }

    /// Connect two nodes, returning the connection id.
    ///
    /// Returns `None` if the same edge already exists. Endpoints are not
    /// checked here; [`Workflow::validate`] reports dangling connections.
    pub fn add_connection(&mut self, from: &str, to: &str) -> Option<String> {
        if self.connections.iter().any(|c| c.from == from && c.to == to) {
            return None;
        }

        let mut id = format!("{}->{}", from, to);
        let mut suffix = 1;
        while self.connections.iter().any(|c| c.id == id) {
            suffix += 1;
            id = format!("{}->{}#{}", from, to, suffix);
        }

        self.connections.push(Connection::new(id.clone(), from, to));
        self.touch();
        Some(id)
    }

    /// Remove a connection by id
    pub fn remove_connection(&mut self, connection_id: &str) -> Option<Connection> {
        let index = self.connections.iter().position(|c| c.id == connection_id)?;
        let conn = self.connections.remove(index);
        self.touch();
        Some(conn)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow(ids: &[&str], edges: &[(&str, &str)]) -> Workflow {
        let mut wf = Workflow::new("wf", "test");
        for id in ids {
            wf.nodes.push(Node::new(*id, "noop", *id));
        }
        for (i, (from, to)) in edges.iter().enumerate() {
            wf.connections
                .push(Connection::new(format!("c{}", i), *from, *to));
        }
        wf
    }

    #[test]
    fn test_chain_order() {
        let wf = workflow(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        assert_eq!(wf.execution_order().unwrap(), vec!["A", "B", "C"]);
        assert!(wf.validate().is_empty());
    }

    #[test]
    fn test_chain_order_independent_of_node_array_order() {
        let wf = workflow(&["C", "B", "A"], &[("A", "B"), ("B", "C")]);
        assert_eq!(wf.execution_order().unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_cycle_returns_none_but_validates() {
        let wf = workflow(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        assert!(wf.execution_order().is_none());
        assert!(wf.validate().is_empty());
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let wf = workflow(&["A"], &[("A", "A")]);
        assert!(wf.execution_order().is_none());
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        let wf = workflow(&["X", "Y", "Z", "M"], &[("Y", "M"), ("X", "M")]);
        assert_eq!(wf.execution_order().unwrap(), vec!["X", "Y", "Z", "M"]);

        let wf = workflow(&["Z", "Y", "X"], &[]);
        assert_eq!(wf.execution_order().unwrap(), vec!["Z", "Y", "X"]);
    }

    #[test]
    fn test_diamond_order() {
        let wf = workflow(
            &["start", "left", "right", "end"],
            &[
                ("start", "right"),
                ("start", "left"),
                ("left", "end"),
                ("right", "end"),
            ],
        );
        // Both branches become ready together; node-array order decides
        assert_eq!(
            wf.execution_order().unwrap(),
            vec!["start", "left", "right", "end"]
        );
    }

    #[test]
    fn test_validate_dangling_connection() {
        let wf = workflow(&["A"], &[("A", "ghost"), ("nobody", "A")]);
        let errors = wf.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("ghost")));
        assert!(errors.iter().any(|e| e.contains("nobody")));
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let wf = workflow(&["A", "A"], &[]);
        let errors = wf.validate();
        assert!(errors[0].contains("duplicate node id 'A'"));
    }

    #[test]
    fn test_previous_nodes_in_connection_order() {
        let wf = workflow(&["A", "B", "C"], &[("B", "C"), ("A", "C")]);
        let prev: Vec<_> = wf.previous_nodes("C").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(prev, vec!["B", "A"]);
        assert!(wf.previous_nodes("A").is_empty());

        let next: Vec<_> = wf.next_nodes("A").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(next, vec!["C"]);
    }

    #[test]
    fn test_editor_operations() {
        let mut wf = workflow(&["A", "B"], &[]);
        assert!(!wf.add_node(Node::new("A", "noop", "dup")));
        assert!(wf.add_node(Node::new("C", "noop", "C")));

        let id = wf.add_connection("A", "B").unwrap();
        assert!(wf.add_connection("A", "B").is_none());
        wf.add_connection("B", "C").unwrap();
        assert_eq!(wf.execution_order().unwrap(), vec!["A", "B", "C"]);

        assert!(wf.update_node("B", |n| n.name = "Renamed".into()));
        assert_eq!(wf.node("B").unwrap().name, "Renamed");
        assert!(!wf.update_node("missing", |_| {}));

        wf.remove_node("B").unwrap();
        assert!(wf.connections.is_empty());
        assert!(wf.remove_connection(&id).is_none());
    }

    #[test]
    fn test_workflow_json_roundtrip_fields() {
        let json = serde_json::json!({
            "id": "wf-1",
            "name": "Demo",
            "nodes": [{"id": "a", "type": "manual_trigger"}],
            "connections": [],
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-02T00:00:00Z"
        });
        let wf: Workflow = serde_json::from_value(json).unwrap();
        assert_eq!(wf.nodes.len(), 1);
        assert_eq!(wf.created_at.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }
}
