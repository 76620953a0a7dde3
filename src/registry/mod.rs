//! Node type registry
//!
//! Maps a node-type identifier to its executable definition. A registry is an
//! explicit instance, built once and shared (usually behind an `Arc`) by the
//! executor and the editor.
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::registry::NodeRegistry;
//!
//! let mut registry = NodeRegistry::new();
//! registry.register(Arc::new(MyNode));
//!
//! let def = registry.get("my_node").unwrap();
//! ```

mod definition;

pub use definition::{
    NodeCategory, NodeDefinition, NodeDescriptor, ParamKind, ParamSpec, param_value,
};

use std::collections::HashMap;
use std::sync::Arc;

/// What happened when a definition was registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// First registration for this type
    Added,
    /// An identical definition was already registered; nothing changed
    Unchanged,
    /// A different definition replaced the existing one
    Replaced { warning: String },
}

impl RegisterOutcome {
    /// Warning for the caller, if any
    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Replaced { warning } => Some(warning),
            _ => None,
        }
    }
}

/// Registry of available node types
#[derive(Clone, Default)]
pub struct NodeRegistry {
    definitions: HashMap<String, Arc<dyn NodeDefinition>>,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type.
    ///
    /// Re-registering an identical definition is a no-op. A different
    /// definition for the same type overwrites the old one and returns a
    /// warning.
    pub fn register(&mut self, definition: Arc<dyn NodeDefinition>) -> RegisterOutcome {
        let node_type = definition.node_type().to_string();

        let outcome = match self.definitions.get(&node_type) {
            None => RegisterOutcome::Added,
            Some(existing) => {
                if Arc::ptr_eq(existing, &definition)
                    || existing.descriptor() == definition.descriptor()
                {
                    return RegisterOutcome::Unchanged;
                }
                let warning = format!(
                    "node type '{}' was already registered; replacing previous definition",
                    node_type
                );
                tracing::warn!(node_type = %node_type, "{}", warning);
                RegisterOutcome::Replaced { warning }
            }
        };

        tracing::debug!(node_type = %node_type, "Registered node type");
        self.definitions.insert(node_type, definition);
        outcome
    }

    /// Get a definition by type
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeDefinition>> {
        self.definitions.get(node_type).cloned()
    }

    /// Check if a type is registered
    pub fn contains(&self, node_type: &str) -> bool {
        self.definitions.contains_key(node_type)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All registered type ids, sorted
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<_> = self.definitions.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    /// Descriptors of all registered types, sorted by type id
    pub fn descriptors(&self) -> Vec<NodeDescriptor> {
        let mut descriptors: Vec<_> = self.definitions.values().map(|d| d.descriptor()).collect();
        descriptors.sort_by(|a, b| a.node_type.cmp(&b.node_type));
        descriptors
    }

    /// Definitions in a category, sorted by type id
    pub fn by_category(&self, category: NodeCategory) -> Vec<Arc<dyn NodeDefinition>> {
        self.sorted_matching(|d| d.category() == category)
    }

    /// Case-insensitive search over type id, name and description
    pub fn search(&self, query: &str) -> Vec<Arc<dyn NodeDefinition>> {
        let query = query.to_lowercase();
        self.sorted_matching(|d| {
            d.node_type().to_lowercase().contains(&query)
                || d.name().to_lowercase().contains(&query)
                || d.description().to_lowercase().contains(&query)
        })
    }

    fn sorted_matching(
        &self,
        predicate: impl Fn(&dyn NodeDefinition) -> bool,
    ) -> Vec<Arc<dyn NodeDefinition>> {
        let mut matches: Vec<_> = self
            .definitions
            .values()
            .filter(|d| predicate(d.as_ref()))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.node_type().cmp(b.node_type()));
        matches
    }
}
