//! Configuration types and loading for nodeflow

mod engine;
mod workflow_file;

pub use engine::{EngineConfig, LoggingSettings, RetrySettings, SandboxSettings};
pub use workflow_file::{load_workflow_file, save_workflow_file};
