use anyhow::Result;
use clap::{Parser, Subcommand};
use nodeflow::cli::{self, OutputMode};
use nodeflow::config::EngineConfig;
use nodeflow::executor::CancellationToken;
use nodeflow::logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nodeflow")]
#[command(about = "Run node-based workflows with sandboxed script nodes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory holding `.nodeflow/config.toml` (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,

    /// Also write JSON log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow file
    Run {
        /// Workflow file (.json or .toml)
        file: PathBuf,

        /// Emit events and the result as JSON lines
        #[arg(long)]
        json: bool,

        /// Write the full execution result to this file
        #[arg(long)]
        save_result: Option<PathBuf>,
    },

    /// Validate a workflow file without running it
    Validate {
        file: PathBuf,
    },

    /// Print the execution order of a workflow file
    Order {
        file: PathBuf,
    },

    /// List available node types
    Nodes {
        /// Only show this category
        #[arg(long)]
        category: Option<String>,

        /// Filter by type, name or description
        #[arg(long)]
        search: Option<String>,
    },

    /// Evaluate a script in the sandbox
    Eval {
        code: String,

        /// Script argument as key=value (value parsed as JSON when possible)
        #[arg(long = "arg")]
        args: Vec<String>,

        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = EngineConfig::load(cli.dir.as_deref())?;
    let log_file = cli.log_file.clone().or_else(|| config.log_file());
    let log_guard = logging::init_logging(cli.debug, cli.quiet, log_file)?;

    let json = matches!(cli.command, Commands::Run { json: true, .. });
    let handler = cli::create_handler(OutputMode::from_flags(json, cli.quiet), cli.debug);

    let code = match cli.command {
        Commands::Run {
            file, save_result, ..
        } => {
            let token = CancellationToken::new();
            tokio::spawn(cli::setup_signal_handlers(token.clone()));
            cli::run_workflow(&file, &config, token, save_result.as_deref(), &*handler).await?
        }

        Commands::Validate { file } => {
            let (_, registry) = cli::build_runtime(&config);
            cli::validate_workflow(&file, &registry, &*handler)?
        }

        Commands::Order { file } => cli::print_order(&file, &*handler)?,

        Commands::Nodes { category, search } => {
            let (_, registry) = cli::build_runtime(&config);
            cli::list_nodes(&registry, category.as_deref(), search.as_deref(), &*handler)?
        }

        Commands::Eval {
            code,
            args,
            timeout_ms,
        } => {
            let (sandbox, _) = cli::build_runtime(&config);
            cli::eval_script(&sandbox, &code, &args, timeout_ms, &*handler).await?
        }
    };

    if code != 0 {
        drop(log_guard);
        std::process::exit(code);
    }

    Ok(())
}
