//! Expression and place lowering

use crate::body::{BodyLowerer, InitState, LowerError, Lowered};
use crate::path_name;
use cn_diagnostic::ErrorCode;
use cn_ir::{DataAccess, Instruction, Literal, Terminator};
use cn_resolve::DeclTable;
use cn_span::FileSpan;
use cn_syntax::{Expr, ExprKind, FieldInit, Ident, Path};
use cn_ty::{Rule, Type};

/// A location that can be read, written or addressed
#[derive(Debug, Clone)]
pub(crate) struct Place {
    pub access: DataAccess,
    pub ty: Type,
    pub mutable: bool,
    /// Materialized from a non-place value
    pub temporary: bool,
    /// Whole local this place names, if any
    pub local: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Read,
    Assign,
    Address,
}

impl BodyLowerer<'_> {
    pub fn lower_expr(&mut self, expr: &Expr, dest: &DataAccess) -> Lowered {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Block(stmts) => self.lower_block(stmts, dest, span),
            ExprKind::Int(value) => {
                self.move_literal(Literal::Int(*value), &Type::Struct(DeclTable::INT), dest, span)
            }
            ExprKind::Bool(value) => {
                self.move_literal(Literal::Bool(*value), &Type::Struct(DeclTable::BOOL), dest, span)
            }
            ExprKind::Tuple(elements) => self.lower_tuple(elements, dest, span),
            ExprKind::StructLit { path, fields } => self.lower_struct_lit(path, fields, dest, span),
            ExprKind::Name(path) => match self.lower_place(expr, Mode::Read)? {
                Some(place) => self.copy_place(place, dest, span),
                None => self.lower_decl_value(path, dest, span),
            },
            ExprKind::Field { .. } | ExprKind::Deref(_) => {
                let place = self.place_or_temp(expr)?;
                self.copy_place(place, dest, span)
            }
            ExprKind::AddressOf { mutable, operand } => {
                self.lower_address_of(*mutable, operand, dest, span)
            }
            ExprKind::Call { callee, args } => self.lower_call(callee, args, dest, span),
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.lower_if(condition, then_branch, else_branch.as_deref(), dest, span),
            ExprKind::While { condition, body } => self.lower_while(condition, body, dest, span),
            ExprKind::Assign { target, value } => self.lower_assign(target, value, dest, span),
            ExprKind::Return(value) => self.lower_return(value.as_deref(), dest, span),
        }
    }

    // Places

    /// Lower `expr` as a place, or `None` when it does not denote one
    pub fn lower_place(&mut self, expr: &Expr, mode: Mode) -> Lowered<Option<Place>> {
        match &expr.kind {
            ExprKind::Name(path) => match self.lookup_local(path) {
                Some(index) => self.local_place(index, mode, expr.span).map(Some),
                None => Ok(None),
            },
            ExprKind::Field { base, field } => self.lower_field(base, field).map(Some),
            ExprKind::Deref(operand) => self.lower_deref(operand).map(Some),
            _ => Ok(None),
        }
    }

    /// A place for `expr`, spilling non-places into a fresh temporary
    fn place_or_temp(&mut self, expr: &Expr) -> Lowered<Place> {
        if let Some(place) = self.lower_place(expr, Mode::Read)? {
            return Ok(place);
        }
        let temp = self.temp(expr.span);
        let access = DataAccess::register(temp);
        self.lower_into(expr, &access)?;
        Ok(Place {
            access,
            ty: self.builder.register_type(temp).clone(),
            mutable: true,
            temporary: true,
            local: None,
        })
    }

    fn lookup_local(&self, path: &Path) -> Option<usize> {
        let ident = path.as_single()?;
        let symbol = self.table.interner().get(&ident.text)?;
        self.locals.iter().rposition(|local| local.name == symbol)
    }

    fn local_place(&mut self, index: usize, mode: Mode, span: FileSpan) -> Lowered<Place> {
        let local = self.locals[index].clone();
        if !local.init.definite && mode != Mode::Assign {
            let name = self.table.interner().resolve(&local.name).to_string();
            return Err(self.error(
                ErrorCode::UninitializedLocal,
                format!("`{name}` is used before it is assigned"),
                span,
            ));
        }
        Ok(Place {
            access: DataAccess::register(local.register),
            ty: self.builder.register_type(local.register).clone(),
            // The first assignment of a deferred `let` is its initialization,
            // unless a loop may repeat it
            mutable: local.mutable
                || (!local.init.possible && local.loop_depth == self.loop_depth),
            temporary: false,
            local: Some(index),
        })
    }

    fn lower_field(&mut self, base: &Expr, field: &Ident) -> Lowered<Place> {
        let place = self.place_or_temp(base)?;
        let base_ty = self.engine.shallow(&place.ty);
        let found = match &base_ty {
            Type::Struct(id) => {
                let decl = self.table.struct_decl(*id);
                self.table
                    .interner()
                    .get(&field.text)
                    .and_then(|symbol| decl.field(symbol))
                    .map(|(index, decl)| (index, decl.ty.clone()))
            }
            Type::Tuple(elements) => field
                .text
                .parse::<usize>()
                .ok()
                .and_then(|index| elements.get(index).map(|ty| (index, ty.clone()))),
            Type::Placeholder(_) => {
                return Err(self.error(
                    ErrorCode::InferenceImpossible,
                    "type annotations needed: \
                     the type of this value must be known to access its fields",
                    base.span,
                ));
            }
            Type::Error => return Err(LowerError::Reported),
            _ => None,
        };
        let Some((index, ty)) = found else {
            let ty = self.type_name(&base_ty);
            return Err(self.error(
                ErrorCode::Undeclared,
                format!("no field `{}` on type `{ty}`", field.text),
                field.span,
            ));
        };
        Ok(Place {
            access: place.access.field(index),
            ty,
            mutable: place.mutable,
            temporary: place.temporary,
            local: None,
        })
    }

    fn lower_deref(&mut self, operand: &Expr) -> Lowered<Place> {
        let place = self.place_or_temp(operand)?;
        let ty = self.engine.shallow(&place.ty);
        match &ty {
            Type::Pointer { mutable, pointee } => {
                let register = match place.access.as_plain() {
                    Some(register) => register,
                    None => {
                        let temp = self.temp_typed(ty.clone(), operand.span);
                        self.builder.push_move(place.access, DataAccess::register(temp));
                        temp
                    }
                };
                Ok(Place {
                    access: DataAccess::Register {
                        register,
                        fields: Vec::new(),
                        deref: true,
                    },
                    ty: (**pointee).clone(),
                    mutable: *mutable,
                    temporary: false,
                    local: None,
                })
            }
            Type::Placeholder(_) => Err(self.error(
                ErrorCode::InferenceImpossible,
                "type annotations needed: the type of this value must be known to dereference it",
                operand.span,
            )),
            Type::Error => Err(LowerError::Reported),
            other => {
                let ty = self.type_name(other);
                Err(self.error(
                    ErrorCode::CannotDereference,
                    format!("type `{ty}` cannot be dereferenced"),
                    operand.span,
                ))
            }
        }
    }

    fn copy_place(&mut self, place: Place, dest: &DataAccess, span: FileSpan) -> Lowered {
        if !dest.is_discard() {
            self.builder.push_move(place.access, dest.clone());
        }
        self.assign(dest, &place.ty, span)
    }

    // Values

    /// A path that is not a local: must name a function
    fn lower_decl_value(&mut self, path: &Path, dest: &DataAccess, span: FileSpan) -> Lowered {
        let name = path_name(self.table.interner(), path);
        let decl = match self.table.resolve(&name, path.absolute, &self.scope, path.span) {
            Ok(decl) => decl,
            Err(err) => return Err(self.report(&err)),
        };
        let Some(id) = decl.as_funct() else {
            let found = self.table.display_name(decl);
            return Err(self.error(
                ErrorCode::WrongDeclarationKind,
                format!("expected value, found struct `{found}`"),
                span,
            ));
        };
        let ty = self.table.funct(id).signature();
        self.move_literal(Literal::Funct(id), &ty, dest, span)
    }

    fn lower_tuple(&mut self, elements: &[Expr], dest: &DataAccess, span: FileSpan) -> Lowered {
        if elements.is_empty() {
            return self.move_unit(dest, span);
        }
        let mut accesses = Vec::with_capacity(elements.len());
        let mut types = Vec::with_capacity(elements.len());
        for element in elements {
            let temp = self.temp(element.span);
            let access = DataAccess::register(temp);
            self.lower_into(element, &access)?;
            accesses.push(access);
            types.push(self.builder.register_type(temp).clone());
        }
        self.move_literal(Literal::Tuple(accesses), &Type::Tuple(types), dest, span)
    }

    fn lower_struct_lit(
        &mut self,
        path: &Path,
        inits: &[FieldInit],
        dest: &DataAccess,
        span: FileSpan,
    ) -> Lowered {
        let table = self.table;
        let name = path_name(table.interner(), path);
        let id = match table.resolve_type(&name, path.absolute, &self.scope, path.span) {
            Ok(id) => id,
            Err(err) => return Err(self.report(&err)),
        };
        let decl = table.struct_decl(id);
        let struct_name = table.display_name(id.into());

        let mut values: Vec<Option<DataAccess>> = vec![None; decl.fields.len()];
        let mut failed = false;
        for init in inits {
            let found = table
                .interner()
                .get(&init.name.text)
                .and_then(|symbol| decl.field(symbol));
            let Some((index, field)) = found else {
                self.error(
                    ErrorCode::Undeclared,
                    format!("struct `{struct_name}` has no field named `{}`", init.name.text),
                    init.name.span,
                );
                failed = true;
                continue;
            };
            if values[index].is_some() {
                self.error(
                    ErrorCode::IncompatibleTypes,
                    format!("field `{}` is initialized more than once", init.name.text),
                    init.span,
                );
                failed = true;
                continue;
            }
            let temp = self.temp_typed(field.ty.clone(), init.value.span);
            let access = DataAccess::register(temp);
            failed |= !Self::recover(self.lower_into(&init.value, &access))?;
            values[index] = Some(access);
        }

        let missing: Vec<String> = decl
            .fields
            .iter()
            .zip(&values)
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| format!("`{}`", table.interner().resolve(&field.name)))
            .collect();
        if !missing.is_empty() {
            let plural = if missing.len() == 1 { "" } else { "s" };
            self.error(
                ErrorCode::IncompatibleTypes,
                format!(
                    "missing field{plural} {} in initializer of `{struct_name}`",
                    missing.join(", ")
                ),
                span,
            );
            failed = true;
        }
        if failed {
            return Err(LowerError::Reported);
        }

        let fields = values.into_iter().flatten().collect();
        self.move_literal(Literal::Struct { id, fields }, &Type::Struct(id), dest, span)
    }

    fn lower_address_of(
        &mut self,
        mutable: bool,
        operand: &Expr,
        dest: &DataAccess,
        span: FileSpan,
    ) -> Lowered {
        let place = match self.lower_place(operand, Mode::Address)? {
            Some(place) if !place.temporary => place,
            _ => {
                return Err(self.error(
                    ErrorCode::CannotAddress,
                    "cannot take the address of a temporary value",
                    operand.span,
                ));
            }
        };
        if mutable && !place.mutable {
            return Err(self.error(
                ErrorCode::CannotAddress,
                "cannot take a mutable address of an immutable place",
                operand.span,
            ));
        }
        let ty = Type::pointer(mutable, place.ty);
        match place.access {
            // `&*p` is `p`
            DataAccess::Register {
                register,
                fields,
                deref: true,
            } if fields.is_empty() => {
                self.builder.push_move(DataAccess::register(register), dest.clone());
            }
            source => self.builder.push(Instruction::MoveAddress {
                source,
                mutable,
                dest: dest.clone(),
            }),
        }
        self.assign(dest, &ty, span)
    }

    fn lower_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        dest: &DataAccess,
        span: FileSpan,
    ) -> Lowered {
        let callee_place = self.place_or_temp(callee)?;
        let mut accesses = Vec::with_capacity(args.len());
        let mut arg_types = Vec::with_capacity(args.len());
        for arg in args {
            let temp = self.temp(arg.span);
            let access = DataAccess::register(temp);
            self.lower_into(arg, &access)?;
            accesses.push(access);
            arg_types.push(self.builder.register_type(temp).clone());
        }

        let returns = match self.engine.shallow(&callee_place.ty) {
            Type::Funct { returns, params } => {
                if let Some(params) = params {
                    if params.len() != args.len() {
                        return Err(self.error(
                            ErrorCode::WrongArgumentNumber,
                            format!(
                                "function takes {} arguments but {} were supplied",
                                params.len(),
                                args.len()
                            ),
                            span,
                        ));
                    }
                    for ((param, arg_ty), arg) in params.iter().zip(&arg_types).zip(args) {
                        self.unify_at(param, arg_ty, arg.span)?;
                    }
                }
                *returns
            }
            Type::Placeholder(slot) => {
                let result = self.engine.add_slot(span);
                self.engine.add_rule(Rule::IsFunctSlot {
                    slot,
                    args: arg_types,
                    returns: result,
                    span,
                });
                Type::Placeholder(result)
            }
            Type::Error => return Err(LowerError::Reported),
            other => {
                let ty = self.type_name(&other);
                return Err(self.error(
                    ErrorCode::IncompatibleTypes,
                    format!("type `{ty}` is not callable"),
                    callee.span,
                ));
            }
        };

        self.builder.push(Instruction::MoveCall {
            callee: callee_place.access,
            args: accesses,
            dest: dest.clone(),
        });
        self.assign(dest, &returns, span)
    }

    // Control flow

    fn lower_if(
        &mut self,
        condition: &Expr,
        then_branch: &Expr,
        else_branch: Option<&Expr>,
        dest: &DataAccess,
        span: FileSpan,
    ) -> Lowered {
        let cond = self.temp_typed(Type::Struct(DeclTable::BOOL), condition.span);
        let cond = DataAccess::register(cond);
        self.lower_into(condition, &cond)?;
        let then_segment = self.builder.new_segment();
        let before = self.init_states();

        let Some(else_branch) = else_branch else {
            let join = self.builder.new_segment();
            self.builder.terminate(Terminator::Branch {
                condition: cond,
                on_true: then_segment,
                on_false: join,
            })?;
            self.builder.switch_to(then_segment);
            let temp = self.temp(then_branch.span);
            Self::recover(self.lower_into(then_branch, &DataAccess::register(temp)))?;
            self.builder.terminate(Terminator::Goto(join))?;
            self.builder.switch_to(join);
            self.join_init_states(&before);
            return self.move_unit(dest, span);
        };

        let else_segment = self.builder.new_segment();
        self.builder.terminate(Terminator::Branch {
            condition: cond,
            on_true: then_segment,
            on_false: else_segment,
        })?;
        self.builder.switch_to(then_segment);
        Self::recover(self.lower_into(then_branch, dest))?;
        let then_end = self.builder.current();
        let after_then = self.init_states();
        self.restore_init_states(&before);
        self.builder.switch_to(else_segment);
        Self::recover(self.lower_into(else_branch, dest))?;
        let else_end = self.builder.current();
        self.join_init_states(&after_then);

        let join = self.builder.new_segment();
        for end in [then_end, else_end] {
            self.builder.switch_to(end);
            self.builder.terminate(Terminator::Goto(join))?;
        }
        self.builder.switch_to(join);
        Ok(())
    }

    fn lower_while(
        &mut self,
        condition: &Expr,
        body: &Expr,
        dest: &DataAccess,
        span: FileSpan,
    ) -> Lowered {
        let head = self.builder.new_segment();
        self.builder.terminate(Terminator::Goto(head))?;
        self.builder.switch_to(head);
        let cond = self.temp_typed(Type::Struct(DeclTable::BOOL), condition.span);
        let cond = DataAccess::register(cond);
        // The condition runs once more than the body
        self.loop_depth += 1;
        let outcome = Self::recover(self.lower_into(condition, &cond));
        self.loop_depth -= 1;
        outcome?;
        let before = self.init_states();

        let body_segment = self.builder.new_segment();
        let after = self.builder.new_segment();
        self.builder.terminate(Terminator::Branch {
            condition: cond,
            on_true: body_segment,
            on_false: after,
        })?;
        self.builder.switch_to(body_segment);
        let temp = self.temp(body.span);
        self.loop_depth += 1;
        let outcome = Self::recover(self.lower_into(body, &DataAccess::register(temp)));
        self.loop_depth -= 1;
        outcome?;
        self.builder.terminate(Terminator::Goto(head))?;
        self.join_init_states(&before);

        self.builder.switch_to(after);
        self.move_unit(dest, span)
    }

    fn lower_assign(
        &mut self,
        target: &Expr,
        value: &Expr,
        dest: &DataAccess,
        span: FileSpan,
    ) -> Lowered {
        let place = match self.lower_place(target, Mode::Assign)? {
            Some(place) if !place.temporary => place,
            _ => {
                return Err(self.error(
                    ErrorCode::CannotAssign,
                    "invalid left-hand side of assignment",
                    target.span,
                ));
            }
        };
        if !place.mutable {
            let message = match place.local {
                Some(index) => {
                    let local = &self.locals[index];
                    let name = self.table.interner().resolve(&local.name);
                    if local.init.possible {
                        format!("cannot assign twice to immutable local `{name}`")
                    } else {
                        format!("cannot assign to immutable local `{name}` inside a loop")
                    }
                }
                None => "cannot assign to an immutable place".to_string(),
            };
            return Err(self.error(ErrorCode::CannotAssign, message, target.span));
        }
        self.lower_into(value, &place.access)?;
        if let Some(index) = place.local {
            self.locals[index].init = InitState::ASSIGNED;
        }
        self.move_unit(dest, span)
    }

    fn lower_return(&mut self, value: Option<&Expr>, dest: &DataAccess, span: FileSpan) -> Lowered {
        match value {
            Some(value) => {
                let target = if self.result.is_discard() {
                    DataAccess::register(self.temp_typed(Type::unit(), value.span))
                } else {
                    self.result.clone()
                };
                self.lower_into(value, &target)?;
            }
            None if !self.return_type.is_unit() && !self.return_type.contains_error() => {
                let expected = self.type_name(&self.return_type);
                return Err(self.error(
                    ErrorCode::IncompatibleTypes,
                    format!("`return` without a value in a function returning `{expected}`"),
                    span,
                ));
            }
            None => {}
        }

        let exit = self.exit();
        self.builder.terminate(exit)?;
        let dead = self.builder.new_segment();
        self.builder.switch_to(dead);
        self.mark_unreachable();

        if let Some(ty) = self.access_type(dest)
            && let Type::Placeholder(slot) = self.engine.shallow(&ty)
        {
            self.engine.mark_diverging(slot);
        }
        Ok(())
    }
}
