use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use flowdoc_editor::Operation;
use std::path::PathBuf;

use super::{print_json, read_json};

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// The operation that ran first
    pub first: PathBuf,

    /// The concurrent operation to rebase past `first`
    pub second: PathBuf,
}

pub fn transform(args: TransformArgs) -> Result<()> {
    let first: Operation = read_json(&args.first).context("Reading first operation")?;
    let second: Operation = read_json(&args.second).context("Reading second operation")?;

    match first.transform(&second) {
        Some(rebased) => print_json(&rebased),
        None => {
            eprintln!(
                "{} {} no longer applies after {}",
                "✗".red(),
                second.name(),
                first.name()
            );
            std::process::exit(2);
        }
    }
}
