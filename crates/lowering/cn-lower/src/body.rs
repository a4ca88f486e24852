//! Third pass: function bodies
//!
//! Each body gets its own [`InferenceEngine`]. Expressions are lowered
//! destination-first: the caller says where the value goes and the
//! expression writes it there. A failed statement is reported, skipped, and
//! the rest of the block is still lowered.

use crate::bind::PendingFunct;
use crate::path_name;
use crate::signature::lower_type;
use cn_diagnostic::{Diagnostics, ErrorCode, InternalError};
use cn_intern::Symbol;
use cn_ir::{DataAccess, FunctBuilder, Instruction, IrFunct, Literal, RegisterId, Terminator};
use cn_resolve::{DeclTable, ResolutionError, UseScope};
use cn_span::FileSpan;
use cn_syntax::{Expr, Ident, Stmt, StmtKind, TypeExpr};
use cn_ty::{InferError, InferenceEngine, Type};
use tracing::{debug, debug_span};

/// Outcome of lowering one expression
#[derive(Debug, thiserror::Error)]
pub(crate) enum LowerError {
    /// A diagnostic was recorded; the enclosing statement is skipped
    #[error("diagnostic already reported")]
    Reported,

    /// Compiler defect; aborts the session
    #[error(transparent)]
    Internal(#[from] InternalError),
}

pub(crate) type Lowered<T = ()> = Result<T, LowerError>;

/// Assignment state of a local at one point in the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InitState {
    /// Assigned on every path reaching this point
    pub definite: bool,
    /// Assigned on at least one path reaching this point
    pub possible: bool,
}

impl InitState {
    pub const UNASSIGNED: Self = Self {
        definite: false,
        possible: false,
    };
    pub const ASSIGNED: Self = Self {
        definite: true,
        possible: true,
    };
    /// Code after a `return`: no path reaches it
    pub const UNREACHABLE: Self = Self {
        definite: true,
        possible: false,
    };

    /// State where two control-flow paths meet
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        Self {
            definite: self.definite && other.definite,
            possible: self.possible || other.possible,
        }
    }
}

/// A local variable or parameter in scope
#[derive(Debug, Clone)]
pub(crate) struct Local {
    pub name: Symbol,
    pub register: RegisterId,
    pub mutable: bool,
    pub init: InitState,
    /// Number of enclosing `while` bodies at the declaration
    pub loop_depth: usize,
}

pub(crate) struct BodyLowerer<'a> {
    pub table: &'a DeclTable,
    pub diagnostics: &'a mut Diagnostics,
    pub engine: InferenceEngine,
    pub builder: FunctBuilder,
    pub scope: UseScope,
    pub locals: Vec<Local>,
    /// Where the function's value goes
    pub result: DataAccess,
    pub return_type: Type,
    /// Number of `while` bodies being lowered
    pub loop_depth: usize,
}

pub(crate) fn lower_body(
    table: &DeclTable,
    diagnostics: &mut Diagnostics,
    item: &PendingFunct<'_>,
    body: &Expr,
    strict_inference: bool,
) -> Result<IrFunct, InternalError> {
    let name = table.display_name(item.id.into());
    let _span = debug_span!("lower_body", funct = %name).entered();

    let signature = table.funct(item.id);
    let mut builder = FunctBuilder::from_signature(item.id.index(), signature);
    let locals = signature
        .bindings
        .iter()
        .map(|binding| Local {
            name: binding.name,
            register: binding.register,
            mutable: binding.mutable,
            init: InitState::ASSIGNED,
            loop_depth: 0,
        })
        .collect();
    let return_type = signature.return_type.clone();
    let result = if return_type.is_unit() {
        DataAccess::Discard
    } else {
        DataAccess::register(builder.add_register(return_type.clone(), body.span))
    };

    let mut lowerer = BodyLowerer {
        table,
        diagnostics,
        engine: InferenceEngine::new(strict_inference),
        builder,
        scope: item.scope.clone(),
        locals,
        result,
        return_type,
        loop_depth: 0,
    };
    lowerer.lower_root(body)?;
    lowerer.finish(item.decl.span)
}

impl BodyLowerer<'_> {
    fn lower_root(&mut self, body: &Expr) -> Result<(), InternalError> {
        let result = self.result.clone();
        Self::recover(self.lower_into(body, &result))?;
        if !self.builder.is_terminated() {
            let exit = self.exit();
            self.builder.terminate(exit)?;
        }
        Ok(())
    }

    /// Solve inference, report what stayed open, and seal the function
    fn finish(mut self, span: FileSpan) -> Result<IrFunct, InternalError> {
        for (err, span) in self.engine.solve() {
            self.report_infer(err, span);
        }
        for (_, origin) in self.engine.unresolved() {
            self.diagnostics.error(
                ErrorCode::InferenceImpossible,
                "type annotations needed: cannot infer the type of this value",
                origin,
            );
        }
        let engine = &self.engine;
        self.builder.map_register_types(|ty| engine.concretize(ty));
        let funct = self.builder.finish(self.return_type, span)?;
        debug!(
            registers = funct.registers.len(),
            segments = funct.segments.len(),
            instructions = funct.instruction_count(),
            "lowered body"
        );
        Ok(funct)
    }

    /// How the function is left from the current segment
    pub fn exit(&self) -> Terminator {
        match &self.result {
            DataAccess::Discard => Terminator::End,
            result => Terminator::Return(result.clone()),
        }
    }

    /// Turn a reported failure into `false`; internal errors keep propagating
    pub fn recover(outcome: Lowered) -> Result<bool, InternalError> {
        match outcome {
            Ok(()) => Ok(true),
            Err(LowerError::Reported) => Ok(false),
            Err(LowerError::Internal(err)) => Err(err),
        }
    }

    // Diagnostics

    pub fn error(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: FileSpan,
    ) -> LowerError {
        self.diagnostics.error(code, message, span);
        LowerError::Reported
    }

    pub fn report(&mut self, err: &ResolutionError) -> LowerError {
        self.diagnostics.push(err.to_diagnostic());
        LowerError::Reported
    }

    fn report_infer(&mut self, err: InferError, span: FileSpan) {
        let (code, message) = match err {
            InferError::Mismatch { expected, found } => {
                if expected.contains_error() || found.contains_error() {
                    return;
                }
                (
                    ErrorCode::IncompatibleTypes,
                    format!(
                        "mismatched types: expected `{}`, found `{}`",
                        self.type_name(&expected),
                        self.type_name(&found)
                    ),
                )
            }
            InferError::NotFunct { found } => (
                ErrorCode::IncompatibleTypes,
                format!("type `{}` is not callable", self.type_name(&found)),
            ),
            InferError::ArgumentCount { expected, found } => (
                ErrorCode::WrongArgumentNumber,
                format!("function takes {expected} arguments but {found} were supplied"),
            ),
            InferError::Recursive { ty, .. } => (
                ErrorCode::IncompatibleTypes,
                format!("cannot build the recursive type `{}`", self.type_name(&ty)),
            ),
        };
        self.diagnostics.error(code, message, span);
    }

    pub fn type_name(&self, ty: &Type) -> String {
        self.engine.resolve(ty).display(self.table).to_string()
    }

    // Types

    /// Make the value type `found` agree with `expected`
    pub fn unify_at(&mut self, expected: &Type, found: &Type, span: FileSpan) -> Lowered {
        match self.engine.unify(expected, found) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.report_infer(err, span);
                Err(LowerError::Reported)
            }
        }
    }

    /// Type of the location `access` denotes; `None` for `Discard`
    pub fn access_type(&self, access: &DataAccess) -> Option<Type> {
        let DataAccess::Register {
            register,
            fields,
            deref,
        } = access
        else {
            return None;
        };
        let mut ty = self.builder.register_type(*register).clone();
        if *deref {
            ty = match self.engine.shallow(&ty) {
                Type::Pointer { pointee, .. } => *pointee,
                _ => Type::Error,
            };
        }
        for field in fields {
            ty = match self.engine.shallow(&ty) {
                Type::Struct(id) => self
                    .table
                    .struct_decl(id)
                    .fields
                    .get(*field)
                    .map_or(Type::Error, |decl| decl.ty.clone()),
                Type::Tuple(elements) => elements.get(*field).cloned().unwrap_or(Type::Error),
                _ => Type::Error,
            };
        }
        Some(ty)
    }

    /// Record that a value of type `found` was written to `dest`
    pub fn assign(&mut self, dest: &DataAccess, found: &Type, span: FileSpan) -> Lowered {
        match self.access_type(dest) {
            Some(expected) => self.unify_at(&expected, found, span),
            None => Ok(()),
        }
    }

    /// Settle an open destination as `Error` after its writer failed
    fn poison(&mut self, dest: &DataAccess) {
        if let Some(ty) = self.access_type(dest)
            && let Type::Placeholder(slot) = self.engine.shallow(&ty)
        {
            let _ = self.engine.infer_type(slot, &Type::Error);
        }
    }

    // Local assignment state

    pub fn init_states(&self) -> Vec<InitState> {
        self.locals.iter().map(|local| local.init).collect()
    }

    pub fn restore_init_states(&mut self, states: &[InitState]) {
        for (local, state) in self.locals.iter_mut().zip(states) {
            local.init = *state;
        }
    }

    /// Merge the state of another path arriving at the current point
    pub fn join_init_states(&mut self, states: &[InitState]) {
        for (local, state) in self.locals.iter_mut().zip(states) {
            local.init = local.init.join(*state);
        }
    }

    pub fn mark_unreachable(&mut self) {
        for local in &mut self.locals {
            local.init = InitState::UNREACHABLE;
        }
    }

    // Registers

    pub fn temp(&mut self, span: FileSpan) -> RegisterId {
        let ty = self.engine.placeholder(span);
        self.builder.add_register(ty, span)
    }

    pub fn temp_typed(&mut self, ty: Type, span: FileSpan) -> RegisterId {
        self.builder.add_register(ty, span)
    }

    // Lowering entry points

    /// Lower `expr`, writing its value to `dest`
    pub fn lower_into(&mut self, expr: &Expr, dest: &DataAccess) -> Lowered {
        let outcome = self.lower_expr(expr, dest);
        if matches!(outcome, Err(LowerError::Reported)) {
            self.poison(dest);
        }
        outcome
    }

    pub fn move_literal(
        &mut self,
        literal: Literal,
        ty: &Type,
        dest: &DataAccess,
        span: FileSpan,
    ) -> Lowered {
        self.builder.push(Instruction::MoveLiteral {
            literal,
            dest: dest.clone(),
        });
        self.assign(dest, ty, span)
    }

    pub fn move_unit(&mut self, dest: &DataAccess, span: FileSpan) -> Lowered {
        self.move_literal(Literal::unit(), &Type::unit(), dest, span)
    }

    /// `{ s1; s2; e }`
    ///
    /// Every statement but the last writes into a fresh temporary; the last
    /// one writes into `dest`. Locals and `use` directives end with the block.
    pub fn lower_block(&mut self, stmts: &[Stmt], dest: &DataAccess, span: FileSpan) -> Lowered {
        let Some((last, init)) = stmts.split_last() else {
            return self.move_unit(dest, span);
        };
        let saved_locals = self.locals.len();
        let saved_scope = self.scope.clone();
        for stmt in init {
            Self::recover(self.lower_stmt(stmt, None))?;
        }
        Self::recover(self.lower_stmt(last, Some(dest)))?;
        self.locals.truncate(saved_locals);
        self.scope = saved_scope;
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt, dest: Option<&DataAccess>) -> Lowered {
        match &stmt.kind {
            StmtKind::Expr(expr) => match dest {
                Some(dest) => self.lower_into(expr, dest),
                None => {
                    let temp = self.temp(expr.span);
                    self.lower_into(expr, &DataAccess::register(temp))
                }
            },
            StmtKind::Let {
                name,
                mutable,
                ty,
                init,
            } => {
                let outcome = self.lower_let(name, *mutable, ty.as_ref(), init.as_ref());
                if let Some(dest) = dest {
                    self.move_unit(dest, stmt.span)?;
                }
                outcome
            }
            StmtKind::Use(path) => {
                self.scope = self.scope.with(path_name(self.table.interner(), path));
                match dest {
                    Some(dest) => self.move_unit(dest, stmt.span),
                    None => Ok(()),
                }
            }
        }
    }

    /// `let [mut] name [: ty] [= init]`
    ///
    /// The initializer is lowered before the name becomes visible. The
    /// local is bound even when the initializer fails, so later uses do not
    /// report it as undeclared.
    fn lower_let(
        &mut self,
        name: &Ident,
        mutable: bool,
        ty: Option<&TypeExpr>,
        init: Option<&Expr>,
    ) -> Lowered {
        let ty = match ty {
            Some(ty) => lower_type(self.table, self.diagnostics, &self.scope, ty),
            None => self.engine.placeholder(name.span),
        };
        let register = self.builder.add_register(ty, name.span);
        let symbol = self.table.interner().intern(&name.text);
        let outcome = match init {
            Some(init) => self.lower_into(init, &DataAccess::register(register)),
            None => Ok(()),
        };
        self.builder.bind(symbol, register, mutable);
        self.locals.push(Local {
            name: symbol,
            register,
            mutable,
            init: if init.is_some() {
                InitState::ASSIGNED
            } else {
                InitState::UNASSIGNED
            },
            loop_depth: self.loop_depth,
        });
        outcome
    }
}
