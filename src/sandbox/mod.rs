//! Sandboxed evaluation of user scripts
//!
//! Scripts are written in Rhai and evaluated in a fresh, restricted engine
//! per call:
//! - a static deny-list rejects obvious escape attempts before any engine
//!   exists
//! - modules, `eval` and host I/O are unavailable
//! - execution is preempted once the timeout elapses
//! - string, array and map growth is capped by the memory limit
//!
//! Failures carry a stable classification (`deny_pattern_violation`,
//! `compile_error`, `runtime_error`, `timeout`, `memory_limit`, `internal`)
//! and convert into a [`crate::error::WorkflowError`].
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::sandbox::{SandboxExecutor, SandboxOptions};
//!
//! let sandbox = SandboxExecutor::default();
//! let mut args = serde_json::Map::new();
//! args.insert("price".into(), 10.into());
//!
//! let output = sandbox.execute("price * 2", args, &SandboxOptions::default()).await?;
//! assert_eq!(output.result, 20);
//! ```

mod convert;
mod deny_list;
mod error;
mod executor;

pub use convert::{dynamic_to_json, json_to_dynamic};
pub use error::SandboxError;
pub use executor::{SandboxConfig, SandboxExecutor, SandboxOptions, SandboxOutput, SandboxStats};
