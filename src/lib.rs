//! nodeflow: a workflow execution engine
//!
//! Workflows are directed acyclic graphs of typed nodes. The [`executor`]
//! runs them in dependency order, feeding each node the items its
//! predecessors produced; script-bearing nodes evaluate user code in the
//! [`sandbox`].

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod logging;
pub mod nodes;
pub mod registry;
pub mod sandbox;
