//! Second pass: struct fields and function signatures

use crate::bind::Pending;
use crate::path_name;
use cn_diagnostic::{Diagnostic, Diagnostics, ErrorCode, InternalError};
use cn_ir::{Field, FunctBuilder};
use cn_resolve::{DeclTable, UseScope};
use cn_syntax::{TypeExpr, TypeExprKind};
use cn_ty::Type;
use tracing::{debug_span, trace};

/// Resolve type syntax; failures are reported and become `Error`
pub(crate) fn lower_type(
    table: &DeclTable,
    diagnostics: &mut Diagnostics,
    scope: &UseScope,
    ty: &TypeExpr,
) -> Type {
    match &ty.kind {
        TypeExprKind::Path(path) => {
            let name = path_name(table.interner(), path);
            match table.resolve_type(&name, path.absolute, scope, path.span) {
                Ok(id) => Type::Struct(id),
                Err(err) => {
                    diagnostics.push(err.to_diagnostic());
                    Type::Error
                }
            }
        }
        TypeExprKind::Pointer {
            mutable, pointee, ..
        } => Type::pointer(*mutable, lower_type(table, diagnostics, scope, pointee)),
        TypeExprKind::Tuple(elements) => Type::Tuple(
            elements
                .iter()
                .map(|element| lower_type(table, diagnostics, scope, element))
                .collect(),
        ),
        TypeExprKind::Funct { params, returns } => {
            let params = params
                .iter()
                .map(|param| lower_type(table, diagnostics, scope, param))
                .collect();
            let returns = returns
                .as_deref()
                .map_or_else(Type::unit, |returns| lower_type(table, diagnostics, scope, returns));
            Type::funct(returns, params)
        }
    }
}

pub(crate) fn resolve_signatures(
    pending: &Pending<'_>,
    table: &mut DeclTable,
    diagnostics: &mut Diagnostics,
) -> Result<(), InternalError> {
    let _span = debug_span!("signatures").entered();

    for item in &pending.structs {
        for field in &item.decl.fields {
            let ty = lower_type(table, diagnostics, &item.scope, &field.ty);
            let name = table.interner().intern(&field.name.text);
            if let Some((_, first)) = table.struct_decl(item.id).field(name) {
                diagnostics.push(
                    Diagnostic::error(
                        ErrorCode::DuplicateDeclaration,
                        format!("field `{}` is declared more than once", field.name.text),
                        field.span,
                    )
                    .with_inner("first declared here", first.span),
                );
                continue;
            }
            trace!(field = %field.name.text, "resolved field");
            table.struct_decl_mut(item.id).fields.push(Field {
                name,
                ty,
                span: field.span,
            });
        }
    }

    for item in &pending.functs {
        let decl = item.decl;
        let mut builder = FunctBuilder::new(item.id.index());
        for param in &decl.params {
            let ty = lower_type(table, diagnostics, &item.scope, &param.ty);
            let name = table.interner().intern(&param.name.text);
            builder.add_param(name, ty, param.mutable, param.span)?;
        }
        let return_type = decl.returns.as_ref().map_or_else(Type::unit, |returns| {
            lower_type(table, diagnostics, &item.scope, returns)
        });
        let mut signature = builder.into_signature(return_type, decl.span);
        signature.external = decl.body.is_none();
        *table.funct_mut(item.id) = signature;
    }

    Ok(())
}
