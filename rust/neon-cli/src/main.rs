//! neonx: run a compiled Neon module.

use std::path::{Path, PathBuf};

use clap::Parser;
use neon_vm::{Bytecode, Diagnostics, Executor, ExecutorConfig, RunOutcome, VmError};
use tracing_subscriber::EnvFilter;

/// Picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG: &str = "neon.toml";
const LOG_ENV: &str = "NEON_LOG";

// ANSI color helpers
fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}
fn gray(s: &str) -> String {
    format!("\x1b[90m{}\x1b[0m", s)
}

#[derive(Parser, Debug)]
#[command(name = "neonx", version, about = "Run a compiled Neon module")]
struct Cli {
    /// Print execution statistics after the run
    #[arg(short = 'd', long = "stats")]
    stats: bool,

    /// Log every executed instruction
    #[arg(short = 'D', long = "trace")]
    trace: bool,

    /// Skip assertion code
    #[arg(short = 'n', long = "no-assert")]
    no_assert: bool,

    /// Executor limits as TOML (default: ./neon.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print execution statistics as JSON
    #[arg(long)]
    stats_json: bool,

    /// Compiled module (.neonx)
    module: PathBuf,

    /// Program arguments, visible as sys$args
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.trace);
    let code = match cmd_run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", red("error:"), e);
            1
        }
    };
    std::process::exit(code);
}

fn init_logging(trace: bool) {
    let filter = if trace {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults, then the config file, then command-line flags.
fn resolve_config(cli: &Cli, default_path: &Path) -> Result<ExecutorConfig, String> {
    let mut config = match &cli.config {
        Some(path) => ExecutorConfig::load_from(path)?,
        None if default_path.is_file() => ExecutorConfig::load_from(default_path)?,
        None => ExecutorConfig::default(),
    };
    if cli.no_assert {
        config.enable_assert = false;
    }
    Ok(config)
}

fn cmd_run(cli: &Cli) -> Result<i32, String> {
    let config = resolve_config(cli, Path::new(DEFAULT_CONFIG))?;
    let bytes = std::fs::read(&cli.module).map_err(|e| {
        format!(
            "cannot read file '{}': {}",
            bold(&cli.module.display().to_string()),
            e
        )
    })?;
    let module = Bytecode::decode(&bytes)
        .map_err(|e| format!("{}: {}", cli.module.display(), e))?;
    tracing::debug!(
        module = %cli.module.display(),
        code_len = module.code.len(),
        strings = module.strings.len(),
        "module loaded"
    );

    let mut vm = Executor::new(&module, config);
    vm.set_args(cli.args.clone());
    let result = vm.run();
    report(cli, &vm.diagnostics())?;
    exit_code(result)
}

fn exit_code(result: Result<RunOutcome, VmError>) -> Result<i32, String> {
    match result {
        Ok(RunOutcome::Completed) => Ok(0),
        Ok(RunOutcome::Exit(code)) => Ok(code),
        Err(VmError::UnhandledException(e)) => Err(format!(
            "unhandled exception {} ({}) (code {})",
            e.name, e.info, e.code
        )),
        Err(e) => Err(format!("runtime error: {}", e)),
    }
}

/// Statistics go to stderr so they never mix with program output.
fn report(cli: &Cli, d: &Diagnostics) -> Result<(), String> {
    if cli.stats {
        eprintln!("{} {}", gray("opcodes:"), d.opcodes);
        eprintln!("{} {}", gray("max stack:"), d.max_stack);
        eprintln!("{} {}", gray("max call depth:"), d.max_call_depth);
        eprintln!("{} {:?}", gray("elapsed:"), d.elapsed);
    }
    if cli.stats_json {
        let json = serde_json::to_string_pretty(d).map_err(|e| e.to_string())?;
        eprintln!("{}", json);
    }
    Ok(())
}
