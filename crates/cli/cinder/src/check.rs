//! Check command implementation

use crate::render;
use anyhow::Result;
use cn_driver::CompileConfig;
use colored::Colorize;
use std::path::Path;

pub fn check(path: &Path, config: CompileConfig) -> Result<()> {
    println!("{} {}", "Checking".green().bold(), path.display());

    let output = cn_driver::compile_json(path, config)?;
    for diagnostic in &output.diagnostics {
        eprintln!("{}\n", render::diagnostic(path, diagnostic));
    }
    if output.truncated {
        eprintln!("{} further diagnostics were suppressed", "note:".cyan().bold());
    }

    let functs = output.functs().count();
    let structs = output.structs().count();
    if !output.has_errors() {
        println!(
            "{} {structs} structs, {functs} functions, no errors found",
            "Success:".green().bold()
        );
        return Ok(());
    }

    let mut counts: Vec<_> = output.error_counts().into_iter().collect();
    counts.sort_by_key(|(code, _)| code.as_str());
    for (code, count) in &counts {
        eprintln!("  {count} x {code}");
    }
    let total: usize = counts.iter().map(|(_, count)| count).sum();
    eprintln!("{} {total} errors found", "Failed:".red().bold());
    anyhow::bail!("Check failed with {total} errors")
}
