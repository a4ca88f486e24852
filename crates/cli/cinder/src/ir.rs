//! IR dump command

use crate::render;
use anyhow::Result;
use cn_driver::CompileConfig;
use cn_ir::{FunctDisplay, StructDisplay};
use std::path::Path;

pub fn print_ir(path: &Path, config: CompileConfig) -> Result<()> {
    let output = cn_driver::compile_json(path, config)?;
    let interner = output.table.interner();

    for (name, decl) in output.structs() {
        let rendered = StructDisplay {
            name: &name,
            decl,
            interner,
            names: &output.table,
        };
        println!("{rendered}");
    }
    for (name, funct) in output.functs() {
        let rendered = FunctDisplay {
            name: &name,
            funct,
            interner,
            names: &output.table,
        };
        println!("\n{rendered}");
    }

    for diagnostic in &output.diagnostics {
        eprintln!("{}\n", render::diagnostic(path, diagnostic));
    }
    if output.has_errors() {
        anyhow::bail!("IR contains errors");
    }
    Ok(())
}
