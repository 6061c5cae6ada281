use anyhow::Result;
use clap::Args;
use colored::Colorize;
use flowdoc_editor::BatchOperation;
use std::path::PathBuf;

use super::{load_content, load_operations, print_json};

#[derive(Args, Debug)]
pub struct InvertArgs {
    /// Operation JSON file, `-` for stdin
    pub ops: PathBuf,

    /// Content JSON file the operation applies to
    #[arg(short, long, conflicts_with = "text")]
    pub content: Option<PathBuf>,

    /// Plain text the operation applies to
    #[arg(short, long)]
    pub text: Option<String>,
}

pub fn invert(args: InvertArgs) -> Result<()> {
    let content = load_content(args.content.as_deref(), args.text.as_deref())?;
    let Some(op) = BatchOperation::from_vec(load_operations(&args.ops)?) else {
        eprintln!("{} Nothing to invert", "⚠️".yellow());
        return Ok(());
    };

    match op.invert(&content)? {
        Some(inverse) => print_json(&inverse),
        None => {
            eprintln!("{} {} cannot be undone", "✗".red(), op.name());
            std::process::exit(2);
        }
    }
}
