use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use flowdoc_editor::{FlowContent, Operation};
use std::path::PathBuf;

use super::{load_content, load_operations, print_json};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Operation JSON file (a single operation or an array), `-` for stdin
    pub ops: PathBuf,

    /// Content JSON file to start from
    #[arg(short, long, conflicts_with = "text")]
    pub content: Option<PathBuf>,

    /// Plain text to start from
    #[arg(short, long)]
    pub text: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub fn apply(args: ApplyArgs) -> Result<()> {
    let content = load_content(args.content.as_deref(), args.text.as_deref())?;
    let ops = load_operations(&args.ops)?;
    let result = apply_all(&content, &ops)?;

    if args.format == "json" {
        print_json(&result)?;
    } else {
        eprintln!("{} Applied {} operation(s)", "✓".green(), ops.len());
        println!("{}", result.plain_text());
    }
    Ok(())
}

pub(crate) fn apply_all(content: &FlowContent, ops: &[Operation]) -> Result<FlowContent> {
    ops.iter().enumerate().try_fold(content.clone(), |content, (i, op)| {
        op.apply_to_content(&content, None)
            .with_context(|| format!("Operation {} ({}) failed", i, op.name()))
    })
}
