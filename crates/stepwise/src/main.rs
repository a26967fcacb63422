use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use stepwise_core::snapshot::{DEFAULT_MAX_STACK_DEPTH, DEFAULT_MAX_VALUE_LEN};
use stepwise_core::{spawn_session, Exit, SessionConfig, SnapshotLimits};
use stepwise_script::ScriptTarget;
use stepwise_ui::{ConsoleFormat, OutputWriter};
use stepwise_utils::{info, init_logging, init_logging_for_tui, LogGuard, LogLevel};

/// An interactive statement-level debugger for scripts.
#[derive(Parser, Debug)]
#[command(name = "stepwise")]
#[command(version)]
#[command(about = "An interactive statement-level debugger for scripts", long_about = None)]
struct Cli
{
    /// Path to the script to debug
    script: PathBuf,

    /// Use the line-oriented console instead of the TUI
    #[arg(long, default_value_t = false)]
    headless: bool,

    /// Snapshot format in headless mode (text or json)
    #[arg(long, default_value = "text")]
    format: ConsoleFormat,

    /// Maximum characters shown for a variable's value
    #[arg(long, default_value_t = DEFAULT_MAX_VALUE_LEN)]
    max_value_len: usize,

    /// Maximum number of call stack entries shown
    #[arg(long, default_value_t = DEFAULT_MAX_STACK_DEPTH)]
    max_stack_depth: usize,

    /// How often the TUI polls for new snapshots, in milliseconds
    #[arg(long, default_value_t = 50)]
    poll_interval_ms: u64,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long)]
    log_level: Option<LogLevel>,
}

impl Cli
{
    const fn session_config(&self) -> SessionConfig
    {
        SessionConfig {
            limits: SnapshotLimits {
                max_value_len: self.max_value_len,
                max_stack_depth: self.max_stack_depth,
            },
        }
    }
}

fn main()
{
    let cli = Cli::parse();

    if !cli.script.exists() {
        eprintln!("Error: {} not found", cli.script.display());
        process::exit(1);
    }

    let _guard = match init_observer_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    let result = if cli.headless { run_headless(&cli) } else { run_tui(&cli) };
    match result {
        Ok(exit) => info!("Session finished: {exit:?}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn init_observer_logging(cli: &Cli) -> Result<LogGuard, stepwise_utils::LoggingError>
{
    if cli.headless {
        init_logging(cli.log_level)
    } else {
        let (path, guard) = init_logging_for_tui(cli.log_level)?;
        info!("Logging to {}", path.display());
        Ok(guard)
    }
}

fn run_headless(cli: &Cli) -> Result<Exit, Box<dyn std::error::Error>>
{
    let script = cli.script.clone();
    let session = spawn_session(cli.session_config(), move || ScriptTarget::load(script, Box::new(io::stdout())))?;
    Ok(stepwise_ui::run_headless(session, cli.format)?)
}

fn run_tui(cli: &Cli) -> Result<Exit, Box<dyn std::error::Error>>
{
    let (writer, output) = OutputWriter::channel();
    let script = cli.script.clone();
    let session = spawn_session(cli.session_config(), move || ScriptTarget::load(script, Box::new(writer)))?;

    let runtime = tokio::runtime::Runtime::new()?;
    let label = cli.script.display().to_string();
    let poll_interval = Duration::from_millis(cli.poll_interval_ms);
    let exit = runtime.block_on(stepwise_ui::run_tui(session, &label, output, poll_interval))?;

    if let Exit::Failed(reason) = &exit {
        println!("\nProgram failed: {reason}");
    }
    Ok(exit)
}
