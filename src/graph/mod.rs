//! In-memory workflow graph
//!
//! This module handles:
//! - Node, connection and data-item types
//! - Structural validation (dangling connections, duplicate ids)
//! - Deterministic topological ordering with cycle detection
//! - Editor-side mutations
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::graph::{Node, Workflow};
//!
//! let mut wf = Workflow::new("wf-1", "Demo");
//! wf.add_node(Node::new("a", "manual_trigger", "Start"));
//! wf.add_node(Node::new("b", "transform", "Clean"));
//! wf.add_connection("a", "b");
//!
//! assert!(wf.validate().is_empty());
//! assert_eq!(wf.execution_order(), Some(vec!["a".into(), "b".into()]));
//! ```

mod types;
mod workflow;

pub use types::{BinaryData, Connection, Node, NodeData};
pub use workflow::Workflow;
