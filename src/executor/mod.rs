//! Workflow executor
//!
//! This module handles:
//! - Linear, fail-fast execution of a workflow in topological order
//! - Per-node state, progress callbacks and the execution log
//! - Cooperative cancellation between nodes
//! - The context and service bundle handed to node definitions
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::executor::{Executor, Services};
//!
//! let executor = Executor::new(Arc::new(registry));
//! let result = executor.run(&workflow, &Services::default(), None).await;
//!
//! if !result.success {
//!     eprintln!("{}", result.error.unwrap_or_default());
//! }
//! ```

mod cancel;
mod context;
mod runner;
mod services;
mod state;

pub use cancel::CancellationToken;
pub use context::{ExecutionContext, ProgressSink};
pub use runner::Executor;
pub use services::{
    ChatClient, ChatMessage, ChatRequest, ChatResponse, HttpClient, HttpRequest, HttpResponse,
    Services, VaultAccess,
};
pub use state::{
    ExecutionLogEntry, ExecutionResult, LogStatus, NodeExecutionState, NodeOutputs, NodeStatus,
    RunStatus,
};
