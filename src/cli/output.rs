//! Output handlers for CLI commands
//!
//! Supports console (pretty), JSON, and quiet output modes.

use crate::executor::{NodeExecutionState, NodeStatus, ProgressSink};
use crate::graph::Workflow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, Write};

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

impl OutputMode {
    /// Pick the mode from the global flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if json {
            Self::Json
        } else if quiet {
            Self::Quiet
        } else {
            Self::Console
        }
    }
}

/// Events emitted during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputEvent {
    WorkflowStart {
        name: String,
        nodes: usize,
    },
    NodeStart {
        id: String,
        name: String,
        index: usize,
        total: usize,
    },
    NodeComplete {
        id: String,
        duration_ms: u64,
        items: usize,
    },
    NodeError {
        id: String,
        error: String,
    },
    WorkflowComplete {
        success: bool,
        status: String,
        duration_ms: u64,
        nodes_completed: usize,
    },
    WorkflowError {
        error: String,
    },
    Info {
        message: String,
    },
    Debug {
        message: String,
    },
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);

    /// Write the final result
    fn result(&self, success: bool, output: Option<&Value>);
}

/// Console output handler
pub struct ConsoleHandler {
    debug: bool,
}

impl ConsoleHandler {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    fn format_duration(ms: u64) -> String {
        if ms < 1000 {
            format!("{}ms", ms)
        } else {
            format!("{:.1}s", ms as f64 / 1000.0)
        }
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::WorkflowStart { name, nodes } => {
                eprintln!("Running workflow '{}' ({} nodes)", name, nodes);
            }
            OutputEvent::NodeStart {
                name, index, total, ..
            } => {
                eprint!("[{}/{}] {}... ", index, total, name);
                let _ = io::stderr().flush();
            }
            OutputEvent::NodeComplete {
                duration_ms, items, ..
            } => {
                eprintln!("✓ {} items ({})", items, Self::format_duration(duration_ms));
            }
            OutputEvent::NodeError { error, .. } => {
                eprintln!("✗");
                eprintln!("  {}", error);
            }
            OutputEvent::WorkflowComplete {
                success,
                status,
                duration_ms,
                nodes_completed,
            } => {
                eprintln!();
                if success {
                    eprintln!(
                        "✓ Workflow completed successfully ({} nodes in {})",
                        nodes_completed,
                        Self::format_duration(duration_ms)
                    );
                } else {
                    eprintln!(
                        "✗ Workflow {} after {} nodes ({})",
                        status,
                        nodes_completed,
                        Self::format_duration(duration_ms)
                    );
                }
            }
            OutputEvent::WorkflowError { error } => {
                eprintln!("Error: {}", error);
            }
            OutputEvent::Info { message } => {
                eprintln!("{}", message);
            }
            OutputEvent::Debug { message } => {
                if self.debug {
                    eprintln!("[debug] {}", message);
                }
            }
        }
    }

    fn result(&self, _success: bool, output: Option<&Value>) {
        if let Some(out) = output {
            if let Ok(s) = serde_json::to_string_pretty(out) {
                println!("{}", s);
            }
        }
    }
}

/// JSON output handler
pub struct JsonHandler {
    pretty: bool,
}

impl JsonHandler {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn print_json<T: Serialize>(&self, value: &T) {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };

        if let Ok(s) = json {
            println!("{}", s);
        }
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        self.print_json(&event);
    }

    fn result(&self, success: bool, output: Option<&Value>) {
        #[derive(Serialize)]
        struct FinalResult<'a> {
            success: bool,
            output: Option<&'a Value>,
        }

        self.print_json(&FinalResult { success, output });
    }
}

/// Quiet handler that only prints the final output
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, _event: OutputEvent) {}

    fn result(&self, _success: bool, output: Option<&Value>) {
        if let Some(out) = output {
            println!("{}", out);
        }
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode, debug: bool) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler::new(debug)),
        OutputMode::Json => Box::new(JsonHandler::new(false)),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}

/// Turns executor progress callbacks into output events
pub struct ProgressReporter<'a> {
    handler: &'a dyn OutputHandler,
    order: Vec<String>,
    workflow: &'a Workflow,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(handler: &'a dyn OutputHandler, workflow: &'a Workflow) -> Self {
        Self {
            handler,
            order: workflow.execution_order().unwrap_or_default(),
            workflow,
        }
    }
}

impl ProgressSink for ProgressReporter<'_> {
    fn on_progress(&self, node_id: &str, state: &NodeExecutionState) {
        let event = match state.status {
            NodeStatus::Pending => return,
            NodeStatus::Running => {
                let index = self
                    .order
                    .iter()
                    .position(|id| id == node_id)
                    .map(|i| i + 1)
                    .unwrap_or(0);
                let name = self
                    .workflow
                    .node(node_id)
                    .map(|n| n.display_name().to_string())
                    .unwrap_or_else(|| node_id.to_string());
                OutputEvent::NodeStart {
                    id: node_id.to_string(),
                    name,
                    index,
                    total: self.order.len(),
                }
            }
            NodeStatus::Success => OutputEvent::NodeComplete {
                id: node_id.to_string(),
                duration_ms: state.duration.unwrap_or(0),
                items: state.output.as_ref().map(|o| o.len()).unwrap_or(0),
            },
            NodeStatus::Error => OutputEvent::NodeError {
                id: node_id.to_string(),
                error: state.error.clone().unwrap_or_default(),
            },
        };
        self.handler.emit(event);
    }
}
