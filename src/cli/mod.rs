//! CLI module for nodeflow
//!
//! This module provides:
//! - Command implementations (run, validate, order, nodes, eval)
//! - Output handlers (console, JSON, quiet)
//! - Signal handling for graceful shutdown
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::cli::{commands, output};
//!
//! let handler = output::create_handler(output::OutputMode::Console, false);
//! let exit_code =
//!     commands::run_workflow(path, &config, token, None, &*handler).await?;
//! ```

pub mod commands;
pub mod output;
pub mod signals;

pub use commands::{
    build_runtime, eval_script, list_nodes, print_order, run_workflow, validate_workflow,
};
pub use output::{OutputEvent, OutputHandler, OutputMode, ProgressReporter, create_handler};
pub use signals::{request_shutdown, setup_signal_handlers};
