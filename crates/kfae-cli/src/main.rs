use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kfae_ast::ast::Expr;
use kfae_cli::{Cont, Env, Machine, Value};
use kfae_resolve::{translate, Scope};
use serde::Serialize;

/// Maximum program file size in bytes (1MB)
const MAX_SOURCE_SIZE: usize = 1_000_000;

#[derive(Parser, Debug)]
#[command(name = "kfae")]
#[command(about = "KFAE: arithmetic, first-class functions and first-class continuations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a program
    Run {
        /// Path to a JSON-encoded surface program
        file: String,

        /// Abort after this many machine steps
        #[arg(long)]
        max_steps: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },

    /// Resolve names and dump the core tree
    Resolve {
        /// Path to a JSON-encoded surface program
        file: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
}

#[derive(ValueEnum, Clone, Debug)]
enum Format {
    Pretty,
    Json,
}

#[derive(Serialize)]
struct RunReport {
    kind: &'static str,
    value: String,
    steps: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            max_steps,
            format,
        } => cmd_run(&file, max_steps, format),

        Commands::Resolve { file, format } => cmd_resolve(&file, format),
    }
}

/// Log to stderr, filtered by `RUST_LOG`. Nothing is installed when it is
/// unset.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn load_program(path: &str) -> Result<Expr> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read program file '{}'", path))?;

    if src.len() > MAX_SOURCE_SIZE {
        eprintln!(
            "Error: program file exceeds {}MB limit ({} bytes)",
            MAX_SOURCE_SIZE / 1_000_000,
            src.len()
        );
        std::process::exit(1);
    }

    serde_json::from_str(&src).with_context(|| format!("Invalid program in '{}'", path))
}

fn resolve_or_exit(program: &Expr) -> std::rc::Rc<kfae_resolve::ir::Expr> {
    match translate(program, &Scope::new()) {
        Ok(core) => core,
        Err(e) => {
            eprintln!("Resolve error: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_run(
    file: &str,
    max_steps: Option<u64>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_program(file)?;
    let core = resolve_or_exit(&program);

    let machine = match max_steps {
        Some(limit) => Machine::new().with_step_limit(limit),
        None => Machine::new(),
    };

    let outcome = match machine.interp_counted(core, Env::new(), Cont::Done) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            std::process::exit(1);
        }
    };

    match format {
        Format::Pretty => print_result(&outcome.value),
        Format::Json => {
            let report = RunReport {
                kind: outcome.value.kind(),
                value: outcome.value.to_string(),
                steps: outcome.steps,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn print_result(value: &Value) {
    println!("result = {}", value);
}

fn cmd_resolve(file: &str, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_program(file)?;
    let core = resolve_or_exit(&program);

    match format {
        Format::Pretty => println!("{}", core),
        Format::Json => println!("{}", serde_json::to_string_pretty(&*core)?),
    }
    Ok(())
}
