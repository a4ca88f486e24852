//! Integration test utilities for Cinder
//!
//! Programs are built with [`AstBuilder`] instead of being parsed, then run
//! through the driver.

use anyhow::Result;
use cn_diagnostic::ErrorCode;
use cn_driver::{CompileConfig, CompileOutput, Session};
use cn_ir::FunctDisplay;
use cn_span::FileId;
use cn_syntax::{AstBuilder, Item, SourceFile};
use std::path::{Path, PathBuf};

/// Test fixture helper
pub struct TestFixture {
    /// Configuration the fixture compiles with
    pub config: CompileConfig,
    /// Files registered in the fixture
    pub files: Vec<SourceFile>,
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CompileConfig::default(),
            files: Vec::new(),
        }
    }

    /// Adds a file whose items are produced by `build`
    pub fn add_file(&mut self, build: impl FnOnce(&mut AstBuilder) -> Vec<Item>) -> FileId {
        let file = FileId::new(self.files.len() as u32);
        let mut ast = AstBuilder::new(file);
        let items = build(&mut ast);
        self.files.push(ast.file(items));
        file
    }

    /// Runs the driver over every file
    ///
    /// # Errors
    ///
    /// Returns an error if the compiler hits an internal error
    pub fn compile(&self) -> Result<CompileOutput> {
        Ok(Session::new(self.config.clone()).compile(&self.files)?)
    }

    /// Writes the files as a JSON AST into `dir`
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join("ast.json");
        std::fs::write(&path, serde_json::to_string_pretty(&self.files)?)?;
        Ok(path)
    }
}

/// Compile a single file built by `build`
///
/// # Errors
///
/// Returns an error if the compiler hits an internal error
pub fn compile_one(build: impl FnOnce(&mut AstBuilder) -> Vec<Item>) -> Result<CompileOutput> {
    let mut fixture = TestFixture::new();
    fixture.add_file(build);
    fixture.compile()
}

/// Diagnostic codes in report order
#[must_use]
pub fn codes(output: &CompileOutput) -> Vec<ErrorCode> {
    output.diagnostics.iter().map(|diag| diag.code).collect()
}

/// Diagnostic messages in report order
#[must_use]
pub fn messages(output: &CompileOutput) -> Vec<&str> {
    output
        .diagnostics
        .iter()
        .map(|diag| diag.message.as_str())
        .collect()
}

/// Pretty IR of the function called `name`
#[must_use]
pub fn funct_ir(output: &CompileOutput, name: &str) -> Option<String> {
    let funct = output.funct(name)?;
    Some(
        FunctDisplay {
            name,
            funct,
            interner: output.table.interner(),
            names: &output.table,
        }
        .to_string(),
    )
}
