//! Restricted script evaluation
//!
//! Each call gets a fresh Rhai engine with no module resolver, no `eval`,
//! captured `print`/`debug`, and size caps derived from the memory limit.
//! Evaluation runs on a blocking worker raced against a timer; the engine's
//! progress hook terminates the script once the deadline passes or the race
//! was lost, so an abandoned script never keeps running.

use super::convert::{dynamic_to_json, json_to_dynamic, object_to_script_map};
use super::deny_list;
use super::error::SandboxError;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Per-call resource limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxOptions {
    /// Wall-clock limit for one evaluation
    pub timeout: Duration,

    /// Memory cap in megabytes
    pub memory_limit_mb: usize,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            memory_limit_mb: 64,
        }
    }
}

impl SandboxOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_memory_limit_mb(mut self, memory_limit_mb: usize) -> Self {
        self.memory_limit_mb = memory_limit_mb;
        self
    }

    fn memory_limit_bytes(&self) -> usize {
        self.memory_limit_mb.max(1).saturating_mul(1024 * 1024)
    }
}

/// Sandbox-wide configuration
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Limits used when the caller does not pass its own
    pub defaults: SandboxOptions,

    /// Max script length in bytes
    pub max_code_length: usize,

    /// Max captured `print`/`debug` lines per call
    pub max_log_lines: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            defaults: SandboxOptions::default(),
            max_code_length: 100_000,
            max_log_lines: 1000,
        }
    }
}

/// Result of a successful evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SandboxOutput {
    /// Value of the script's last expression
    pub result: Value,

    pub execution_time_ms: u64,

    /// Approximate bytes moved across the sandbox boundary
    pub memory_usage: Option<usize>,

    /// Lines printed by the script
    pub logs: Vec<String>,
}

/// Counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SandboxStats {
    pub executions: u64,
    pub failures: u64,
    /// Calls rejected by the deny-list or size check
    pub rejected: u64,
    pub contexts_created: u64,
    pub active_contexts: u64,
}

#[derive(Debug, Default)]
struct Counters {
    executions: AtomicU64,
    failures: AtomicU64,
    rejected: AtomicU64,
    contexts_created: AtomicU64,
    active_contexts: AtomicU64,
}

/// Tracks one live evaluation context; released on drop
struct ContextGuard {
    counters: Arc<Counters>,
}

impl ContextGuard {
    fn acquire(counters: Arc<Counters>) -> Self {
        counters.contexts_created.fetch_add(1, Ordering::SeqCst);
        counters.active_contexts.fetch_add(1, Ordering::SeqCst);
        Self { counters }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.counters.active_contexts.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Evaluates short user scripts under restrictions
#[derive(Debug, Default)]
pub struct SandboxExecutor {
    config: SandboxConfig,
    counters: Arc<Counters>,
}

impl SandboxExecutor {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Limits applied by [`SandboxExecutor::execute_default`]
    pub fn default_options(&self) -> &SandboxOptions {
        &self.config.defaults
    }

    pub fn stats(&self) -> SandboxStats {
        let c = &self.counters;
        SandboxStats {
            executions: c.executions.load(Ordering::SeqCst),
            failures: c.failures.load(Ordering::SeqCst),
            rejected: c.rejected.load(Ordering::SeqCst),
            contexts_created: c.contexts_created.load(Ordering::SeqCst),
            active_contexts: c.active_contexts.load(Ordering::SeqCst),
        }
    }

    /// Evaluate with the configured default limits
    pub async fn execute_default(
        &self,
        code: &str,
        args: Map<String, Value>,
    ) -> Result<SandboxOutput, SandboxError> {
        let options = self.config.defaults.clone();
        self.execute(code, args, &options).await
    }

    /// Evaluate `code` with `args` in scope.
    ///
    /// `args` are visible both as the `args` map and, for keys that are valid
    /// identifiers, as top-level variables.
    pub async fn execute(
        &self,
        code: &str,
        args: Map<String, Value>,
        options: &SandboxOptions,
    ) -> Result<SandboxOutput, SandboxError> {
        self.counters.executions.fetch_add(1, Ordering::SeqCst);

        let result = self.evaluate(code, args, options).await;
        if let Err(ref e) = result {
            self.counters.failures.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(
                classification = e.classification(),
                error = %e,
                "Sandbox evaluation failed"
            );
        }
        result
    }

    async fn evaluate(
        &self,
        code: &str,
        args: Map<String, Value>,
        options: &SandboxOptions,
    ) -> Result<SandboxOutput, SandboxError> {
        if let Err(e) = deny_list::check(code, self.config.max_code_length) {
            self.counters.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(e);
        }

        let memory_limit = options.memory_limit_bytes();
        let args_size = serde_json::to_vec(&args)
            .map_err(|e| SandboxError::Internal(format!("failed to serialize args: {}", e)))?
            .len();
        if args_size > memory_limit {
            return Err(SandboxError::MemoryLimit(format!(
                "arguments are {} bytes, limit is {} bytes",
                args_size, memory_limit
            )));
        }

        let start = Instant::now();
        let abort = Arc::new(AtomicBool::new(false));
        let job = Evaluation {
            code: code.to_string(),
            args,
            timeout: options.timeout,
            deadline: start + options.timeout,
            abort: abort.clone(),
            memory_limit,
            max_log_lines: self.config.max_log_lines,
            counters: self.counters.clone(),
        };

        let handle = tokio::task::spawn_blocking(move || job.run());

        let (result, logs) = match tokio::time::timeout(options.timeout, handle).await {
            Ok(Ok(outcome)) => outcome?,
            Ok(Err(e)) => {
                return Err(SandboxError::Internal(format!("evaluation task failed: {}", e)));
            }
            Err(_) => {
                // Lost the race: make the progress hook stop the script
                abort.store(true, Ordering::SeqCst);
                return Err(SandboxError::Timeout(options.timeout));
            }
        };

        let output_size = serde_json::to_vec(&result)
            .map_err(|e| SandboxError::Internal(format!("failed to serialize result: {}", e)))?
            .len();
        if output_size > memory_limit {
            return Err(SandboxError::MemoryLimit(format!(
                "result is {} bytes, limit is {} bytes",
                output_size, memory_limit
            )));
        }

        Ok(SandboxOutput {
            result,
            execution_time_ms: start.elapsed().as_millis() as u64,
            memory_usage: Some(args_size + output_size),
            logs,
        })
    }
}

/// One evaluation, moved onto a blocking worker
struct Evaluation {
    code: String,
    args: Map<String, Value>,
    timeout: Duration,
    deadline: Instant,
    abort: Arc<AtomicBool>,
    memory_limit: usize,
    max_log_lines: usize,
    counters: Arc<Counters>,
}

impl Evaluation {
    fn run(self) -> Result<(Value, Vec<String>), SandboxError> {
        let _context = ContextGuard::acquire(self.counters.clone());
        let logs = Arc::new(Mutex::new(Vec::new()));
        let engine = self.build_engine(logs.clone());

        let ast = engine
            .compile(&self.code)
            .map_err(|e| SandboxError::Compile(e.to_string()))?;

        let mut scope = Scope::new();
        for (name, value) in &self.args {
            if is_identifier(name) {
                scope.push_dynamic(name.clone(), json_to_dynamic(value.clone()));
            }
        }
        scope.push_dynamic("args", Dynamic::from_map(object_to_script_map(self.args)));

        let value = engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
            .map_err(|e| classify(*e, self.timeout))?;

        let logs = logs
            .lock()
            .map(|mut lines| std::mem::take(&mut *lines))
            .unwrap_or_default();

        Ok((dynamic_to_json(value), logs))
    }

    fn build_engine(&self, logs: Arc<Mutex<Vec<String>>>) -> Engine {
        let mut engine = Engine::new();

        engine.set_module_resolver(DummyModuleResolver::new());
        engine.disable_symbol("eval");

        engine.set_max_string_size(self.memory_limit);
        engine.set_max_array_size((self.memory_limit / 32).max(1));
        engine.set_max_map_size((self.memory_limit / 64).max(1));
        engine.set_max_call_levels(64);
        engine.set_max_expr_depths(128, 64);

        let deadline = self.deadline;
        let abort = self.abort.clone();
        engine.on_progress(move |ops| {
            let expired =
                abort.load(Ordering::Relaxed) || (ops % 256 == 0 && Instant::now() >= deadline);
            if expired {
                Some(Dynamic::from("timeout".to_string()))
            } else {
                None
            }
        });

        let max_lines = self.max_log_lines;
        let sink = logs.clone();
        engine.on_print(move |line| capture(&sink, line, max_lines));
        let sink = logs;
        engine.on_debug(move |line, _source, _pos| capture(&sink, line, max_lines));

        engine.register_fn("to_json", |value: Dynamic| -> String {
            serde_json::to_string(&dynamic_to_json(value)).unwrap_or_default()
        });
        engine.register_fn("parse_json", |text: &str| -> Dynamic {
            serde_json::from_str::<Value>(text)
                .map(json_to_dynamic)
                .unwrap_or(Dynamic::UNIT)
        });
        engine.register_fn("keys_sorted", |map: rhai::Map| -> rhai::Array {
            let mut keys: Vec<String> = map.keys().map(|k| k.to_string()).collect();
            keys.sort();
            keys.into_iter().map(Dynamic::from).collect()
        });

        engine
    }
}

fn capture(sink: &Mutex<Vec<String>>, line: &str, max_lines: usize) {
    if let Ok(mut lines) = sink.lock() {
        if lines.len() < max_lines {
            lines.push(line.to_string());
        }
    }
}

fn classify(err: EvalAltResult, timeout: Duration) -> SandboxError {
    match err {
        EvalAltResult::ErrorTerminated(..) => SandboxError::Timeout(timeout),
        EvalAltResult::ErrorDataTooLarge(what, _) => SandboxError::MemoryLimit(what),
        EvalAltResult::ErrorParsing(e, _) => SandboxError::Compile(e.to_string()),
        other => SandboxError::Runtime(other.to_string()),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
