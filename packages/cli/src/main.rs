mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{apply, invert, replay, transform, ApplyArgs, InvertArgs, ReplayArgs, TransformArgs};
use tracing_subscriber::EnvFilter;

/// Flowdoc CLI - offline tooling for collaborative flow documents
#[derive(Parser, Debug)]
#[command(name = "flowdoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply operations to a document
    Apply(ApplyArgs),

    /// Print the operation that undoes another
    Invert(InvertArgs),

    /// Rebase an operation past a concurrent one
    Transform(TransformArgs),

    /// Run a scripted multi-client session against an in-memory server
    Replay(ReplayArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Apply(args) => apply(args),
        Command::Invert(args) => invert(args),
        Command::Transform(args) => transform(args),
        Command::Replay(args) => replay(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
