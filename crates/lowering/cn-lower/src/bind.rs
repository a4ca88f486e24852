//! First pass: register every declaration name

use crate::path_name;
use cn_diagnostic::Diagnostics;
use cn_ir::FunctId;
use cn_resolve::{DeclTable, Name, UseScope};
use cn_syntax::{FunctDecl, Item, SourceFile, StructDecl};
use cn_ty::StructId;
use tracing::{debug, debug_span};

/// Struct waiting for its fields
pub(crate) struct PendingStruct<'ast> {
    pub id: StructId,
    pub decl: &'ast StructDecl,
    pub scope: UseScope,
}

/// Function waiting for its signature and body
pub(crate) struct PendingFunct<'ast> {
    pub id: FunctId,
    pub decl: &'ast FunctDecl,
    pub scope: UseScope,
}

/// Work left for the later passes, with the directives each declaration saw
#[derive(Default)]
pub(crate) struct Pending<'ast> {
    pub structs: Vec<PendingStruct<'ast>>,
    pub functs: Vec<PendingFunct<'ast>>,
}

pub(crate) fn bind_files<'ast>(
    files: &'ast [SourceFile],
    table: &mut DeclTable,
    diagnostics: &mut Diagnostics,
) -> Pending<'ast> {
    let _span = debug_span!("bind").entered();
    let mut pending = Pending::default();
    let mut binder = Binder {
        table,
        diagnostics,
        pending: &mut pending,
    };
    for file in files {
        binder.bind_items(&file.items, &Name::root(), UseScope::new());
    }
    debug!(
        structs = pending.structs.len(),
        functs = pending.functs.len(),
        "bound declarations"
    );
    pending
}

struct Binder<'a, 'ast> {
    table: &'a mut DeclTable,
    diagnostics: &'a mut Diagnostics,
    pending: &'a mut Pending<'ast>,
}

impl<'ast> Binder<'_, 'ast> {
    /// Bind `items` declared in `namespace`
    ///
    /// A bare `use` extends the scope of the following siblings only; a
    /// `use` block and a namespace get their own extended scope, which is
    /// dropped when they end.
    fn bind_items(&mut self, items: &'ast [Item], namespace: &Name, scope: UseScope) {
        let mut scope = scope;
        for item in items {
            match item {
                Item::Namespace(decl) => {
                    let relative = path_name(self.table.interner(), &decl.name);
                    let inner = if decl.name.absolute {
                        relative
                    } else {
                        namespace.join(&relative)
                    };
                    let inner_scope = scope.with(inner.clone());
                    self.bind_items(&decl.items, &inner, inner_scope);
                }
                Item::Use(decl) => {
                    let prefix = path_name(self.table.interner(), &decl.path);
                    match &decl.items {
                        None => scope = scope.with(prefix),
                        Some(items) => self.bind_items(items, namespace, scope.with(prefix)),
                    }
                }
                Item::Struct(decl) => {
                    let name = namespace.child(self.table.interner().intern(&decl.name.text));
                    match self.table.create_struct(name, decl.span) {
                        Ok(id) => self.pending.structs.push(PendingStruct {
                            id,
                            decl,
                            scope: scope.clone(),
                        }),
                        Err(err) => self.diagnostics.push(err.to_diagnostic()),
                    }
                }
                Item::Funct(decl) => {
                    let name = namespace.child(self.table.interner().intern(&decl.name.text));
                    match self.table.create_funct(name, decl.span) {
                        Ok(id) => self.pending.functs.push(PendingFunct {
                            id,
                            decl,
                            scope: scope.clone(),
                        }),
                        Err(err) => self.diagnostics.push(err.to_diagnostic()),
                    }
                }
            }
        }
    }
}
