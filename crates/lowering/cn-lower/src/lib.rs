//! Lowering from syntax trees to IR
//!
//! Lowering runs in three passes over every file:
//!
//! 1. **bind**: every struct and function name is registered in the
//!    [`DeclTable`], so declarations may be used before they appear.
//! 2. **signatures**: struct fields, parameter types and return types are
//!    resolved.
//! 3. **bodies**: each function body is lowered to segments, with type
//!    inference local to the function.
//!
//! User errors become diagnostics and lowering carries on; only an
//! [`InternalError`] stops the run.

mod bind;
mod body;
mod expr;
mod signature;

use cn_diagnostic::{Diagnostics, InternalError};
use cn_intern::Interner;
use cn_resolve::{DeclTable, Name};
use cn_syntax::{Path, SourceFile};
use tracing::{debug_span, info};

/// Knobs for one lowering run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowerOptions {
    /// Reject a second, conflicting type for an already inferred value
    /// instead of letting the last write win
    pub strict_inference: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            strict_inference: true,
        }
    }
}

/// Declarations and diagnostics produced by [`lower_files`]
#[derive(Debug)]
pub struct LoweredProgram {
    pub table: DeclTable,
    pub diagnostics: Diagnostics,
}

/// Lower every file into one declaration table
pub fn lower_files(
    files: &[SourceFile],
    interner: Interner,
    options: LowerOptions,
) -> Result<LoweredProgram, InternalError> {
    let mut table = DeclTable::new(interner);
    let mut diagnostics = Diagnostics::new();

    let pending = bind::bind_files(files, &mut table, &mut diagnostics);
    signature::resolve_signatures(&pending, &mut table, &mut diagnostics)?;

    let mut bodies = Vec::new();
    {
        let _span = debug_span!("bodies").entered();
        for item in &pending.functs {
            if let Some(body) = &item.decl.body {
                let funct = body::lower_body(
                    &table,
                    &mut diagnostics,
                    item,
                    body,
                    options.strict_inference,
                )?;
                bodies.push((item.id, funct));
            }
        }
    }
    for (id, funct) in bodies {
        *table.funct_mut(id) = funct;
    }

    info!(
        structs = table.structs().len(),
        functs = table.functs().len(),
        diagnostics = diagnostics.len(),
        "lowering finished"
    );
    Ok(LoweredProgram { table, diagnostics })
}

/// Interned form of a syntax path, without its leading `::`
pub(crate) fn path_name(interner: &Interner, path: &Path) -> Name {
    path.segments
        .iter()
        .map(|segment| interner.intern(&segment.text))
        .collect()
}
