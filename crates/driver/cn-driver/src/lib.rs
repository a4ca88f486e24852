//! Compilation driver
//!
//! Ties the passes together: a [`Session`] lowers a set of parsed files,
//! verifies the result and hands back the declarations with their
//! diagnostics.

pub mod config;

pub use config::{CompileConfig, CONFIG_FILE};

use anyhow::{Context, Result};
use cn_diagnostic::{Diagnostic, ErrorCode, InternalError};
use cn_intern::Interner;
use cn_ir::{verify, IrFunct, IrStruct};
use cn_lower::{lower_files, LowerOptions, LoweredProgram};
use cn_resolve::{DeclKind, DeclRef, DeclTable};
use cn_syntax::{preorder, NodeRef, SourceFile};
use rustc_hash::FxHashMap;
use std::path::Path;
use tracing::{debug, info_span};

/// One compiler invocation
#[derive(Debug, Clone)]
pub struct Session {
    config: CompileConfig,
    interner: Interner,
}

/// Everything a compilation produced
#[derive(Debug)]
pub struct CompileOutput {
    /// Declarations, including builtins, with their lowered IR
    pub table: DeclTable,
    /// Diagnostics in the order they were found
    pub diagnostics: Vec<Diagnostic>,
    /// Diagnostics were dropped because of `max_errors`
    pub truncated: bool,
}

impl Session {
    #[must_use]
    pub fn new(config: CompileConfig) -> Self {
        Self::with_interner(config, Interner::new())
    }

    /// Session sharing an existing interner
    #[must_use]
    pub fn with_interner(config: CompileConfig, interner: Interner) -> Self {
        Self { config, interner }
    }

    #[must_use]
    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    #[must_use]
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Lower `files` to IR
    ///
    /// User errors end up in [`CompileOutput::diagnostics`]; an `Err` means
    /// the compiler itself produced inconsistent IR.
    pub fn compile(&self, files: &[SourceFile]) -> Result<CompileOutput, InternalError> {
        let _span = info_span!("compile", files = files.len()).entered();
        let nodes: usize = files
            .iter()
            .map(|file| preorder(NodeRef::File(file)).len())
            .sum();
        debug!(nodes, "compiling");

        let options = LowerOptions {
            strict_inference: self.config.strict_inference,
        };
        let LoweredProgram { table, diagnostics } =
            lower_files(files, self.interner.clone(), options)?;

        if self.config.verify_ir {
            for (idx, funct) in table.functs().iter().enumerate() {
                verify(idx, funct)?;
            }
        }

        let mut diagnostics = diagnostics.into_vec();
        let truncated = match self.config.max_errors {
            Some(max) if diagnostics.len() > max => {
                diagnostics.truncate(max);
                true
            }
            _ => false,
        };
        Ok(CompileOutput {
            table,
            diagnostics,
            truncated,
        })
    }
}

impl CompileOutput {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Number of diagnostics per code
    #[must_use]
    pub fn error_counts(&self) -> FxHashMap<ErrorCode, usize> {
        let mut counts = FxHashMap::default();
        for diagnostic in &self.diagnostics {
            *counts.entry(diagnostic.code).or_insert(0) += 1;
        }
        counts
    }

    /// User structs with their display names; builtins are skipped
    pub fn structs(&self) -> impl Iterator<Item = (String, &IrStruct)> {
        self.table
            .structs()
            .iter()
            .enumerate()
            .skip(DeclTable::BOOL.index() + 1)
            .map(|(index, decl)| (self.display_name(DeclKind::Struct, index), decl))
    }

    pub fn functs(&self) -> impl Iterator<Item = (String, &IrFunct)> {
        self.table
            .functs()
            .iter()
            .enumerate()
            .map(|(index, funct)| (self.display_name(DeclKind::Funct, index), funct))
    }

    /// Function by its full name, such as `geo::area`
    #[must_use]
    pub fn funct(&self, name: &str) -> Option<&IrFunct> {
        let name = cn_resolve::Name::parse(self.table.interner(), name);
        let id = self.table.get(&name)?.as_funct()?;
        Some(self.table.funct(id))
    }

    fn display_name(&self, kind: DeclKind, index: usize) -> String {
        self.table.display_name(DeclRef {
            kind,
            index: index as u32,
        })
    }
}

/// Read a JSON list of source files and compile it
pub fn compile_json(path: &Path, config: CompileConfig) -> Result<CompileOutput> {
    let files = read_ast(path)?;
    Session::new(config)
        .compile(&files)
        .with_context(|| format!("Internal compiler error while compiling {}", path.display()))
}

/// Parse a JSON AST file
pub fn read_ast(path: &Path) -> Result<Vec<SourceFile>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read AST file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse AST file: {}", path.display()))
}
