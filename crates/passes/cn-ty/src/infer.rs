//! Slot-based type inference
//!
//! One [`InferenceEngine`] lives for the lowering of one function body.
//! Lowering allocates slots wherever a type is not known yet, writes concrete
//! types into them as it learns them, and queues [`Rule`]s for constraints
//! that can only be checked once more is known. [`InferenceEngine::solve`]
//! runs the rules to a fixed point after the body is lowered.

use crate::ty::{Slot, Type};
use cn_span::FileSpan;
use thiserror::Error;
use tracing::{debug, trace};

/// Inference failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferError {
    /// Two types that must agree do not
    #[error("type mismatch: expected {expected:?}, found {found:?}")]
    Mismatch {
        /// Type required by context
        expected: Type,
        /// Type actually provided
        found: Type,
    },

    /// A called value is not a function
    #[error("{found:?} is not callable")]
    NotFunct {
        /// Type of the called value
        found: Type,
    },

    /// A call passes the wrong number of arguments
    #[error("expected {expected} arguments, found {found}")]
    ArgumentCount {
        /// Parameter count of the callee
        expected: usize,
        /// Number of arguments passed
        found: usize,
    },

    /// A slot would have to contain itself
    #[error("{slot} occurs in {ty:?}")]
    Recursive {
        /// Slot being bound
        slot: Slot,
        /// Type containing the slot
        ty: Type,
    },
}

/// Deferred constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Both slots must end up structurally identical
    IsSameSlot {
        /// First slot
        left: Slot,
        /// Second slot
        right: Slot,
        /// Where the constraint arose
        span: FileSpan,
    },

    /// `slot` must be a function callable with `args`, returning `returns`
    IsFunctSlot {
        /// Slot of the callee
        slot: Slot,
        /// Argument types in order
        args: Vec<Type>,
        /// Slot receiving the return type
        returns: Slot,
        /// Call site
        span: FileSpan,
    },
}

impl Rule {
    fn span(&self) -> FileSpan {
        match self {
            Self::IsSameSlot { span, .. } | Self::IsFunctSlot { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone)]
struct SlotInfo {
    binding: Option<Type>,
    origin: FileSpan,
    diverging: bool,
}

/// What happened to a rule during one solving round
enum Progress {
    Done,
    Pending,
}

/// Per-function inference state
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    slots: Vec<SlotInfo>,
    rules: Vec<Rule>,
    strict: bool,
}

impl InferenceEngine {
    /// Create an engine
    ///
    /// With `strict` set, a second write to a slot must agree with the
    /// first. Otherwise the latest incompatible write replaces the binding.
    #[must_use]
    pub fn new(strict: bool) -> Self {
        Self {
            slots: Vec::new(),
            rules: Vec::new(),
            strict,
        }
    }

    /// Allocate an unresolved slot introduced at `origin`
    pub fn add_slot(&mut self, origin: FileSpan) -> Slot {
        let slot = Slot(self.slots.len() as u32);
        self.slots.push(SlotInfo {
            binding: None,
            origin,
            diverging: false,
        });
        trace!(%slot, %origin, "allocated inference slot");
        slot
    }

    /// Allocate a slot and wrap it in a placeholder type
    pub fn placeholder(&mut self, origin: FileSpan) -> Type {
        Type::Placeholder(self.add_slot(origin))
    }

    /// Where `slot` was introduced
    #[must_use]
    pub fn origin(&self, slot: Slot) -> FileSpan {
        self.slots[slot.index()].origin
    }

    #[must_use]
    pub fn is_bound(&self, slot: Slot) -> bool {
        self.slots[slot.index()].binding.is_some()
    }

    /// Mark a slot whose only writer never completes (e.g. `return`)
    ///
    /// If nothing else constrains it, it defaults to `()` during solving.
    pub fn mark_diverging(&mut self, slot: Slot) {
        self.slots[slot.index()].diverging = true;
    }

    /// Bind a concrete type to `slot`
    pub fn infer_type(&mut self, slot: Slot, ty: &Type) -> Result<(), InferError> {
        self.unify(&Type::Placeholder(slot), ty)
    }

    /// Queue a deferred constraint
    pub fn add_rule(&mut self, rule: Rule) {
        trace!(?rule, "queued inference rule");
        self.rules.push(rule);
    }

    #[must_use]
    pub fn pending_rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Follow bindings at the top level only
    #[must_use]
    pub fn shallow(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        while let Type::Placeholder(slot) = current {
            match &self.slots[slot.index()].binding {
                Some(binding) => current = binding.clone(),
                None => break,
            }
        }
        current
    }

    /// Substitute every bound slot, recursively
    #[must_use]
    pub fn resolve(&self, ty: &Type) -> Type {
        match self.shallow(ty) {
            Type::Pointer { mutable, pointee } => Type::pointer(mutable, self.resolve(&pointee)),
            Type::Funct { returns, params } => Type::Funct {
                returns: Box::new(self.resolve(&returns)),
                params: params
                    .map(|params| params.iter().map(|param| self.resolve(param)).collect()),
            },
            Type::Tuple(elements) => {
                Type::Tuple(elements.iter().map(|element| self.resolve(element)).collect())
            }
            other => other,
        }
    }

    /// Resolve `ty` and replace every slot still unbound with `Error`
    #[must_use]
    pub fn concretize(&self, ty: &Type) -> Type {
        match self.resolve(ty) {
            Type::Placeholder(_) => Type::Error,
            Type::Pointer { mutable, pointee } => Type::pointer(mutable, self.concretize(&pointee)),
            Type::Funct { returns, params } => Type::Funct {
                returns: Box::new(self.concretize(&returns)),
                params: params
                    .map(|params| params.iter().map(|param| self.concretize(param)).collect()),
            },
            Type::Tuple(elements) => {
                Type::Tuple(elements.iter().map(|element| self.concretize(element)).collect())
            }
            other => other,
        }
    }

    /// Make `found` agree with `expected`, writing through placeholders
    pub fn unify(&mut self, expected: &Type, found: &Type) -> Result<(), InferError> {
        if !self.strict
            && let Type::Placeholder(slot) = expected
            && self.is_bound(*slot)
        {
            let current = self.resolve(expected);
            let incoming = self.resolve(found);
            if !current.is_match(&incoming) && !incoming.contains_slot(*slot) {
                debug!(%slot, ?current, ?incoming, "overwriting inferred type");
                self.slots[slot.index()].binding = Some(incoming);
                return Ok(());
            }
        }

        let expected = self.shallow(expected);
        let found = self.shallow(found);
        match (&expected, &found) {
            (Type::Placeholder(left), Type::Placeholder(right)) => {
                if left != right {
                    let span = self.origin(*left);
                    self.add_rule(Rule::IsSameSlot {
                        left: *left,
                        right: *right,
                        span,
                    });
                }
                Ok(())
            }
            (Type::Placeholder(slot), other) | (other, Type::Placeholder(slot)) => {
                self.bind(*slot, other)
            }
            (Type::Error, _) | (_, Type::Error) => Ok(()),
            (
                Type::Pointer {
                    mutable: expected_mut,
                    pointee: expected_pointee,
                },
                Type::Pointer {
                    mutable: found_mut,
                    pointee: found_pointee,
                },
            ) => {
                if expected_mut != found_mut {
                    return Err(self.mismatch(&expected, &found));
                }
                self.unify(expected_pointee, found_pointee)
                    .map_err(|_| self.mismatch(&expected, &found))
            }
            (Type::Struct(left), Type::Struct(right)) if left == right => Ok(()),
            (
                Type::Funct {
                    returns: expected_ret,
                    params: expected_params,
                },
                Type::Funct {
                    returns: found_ret,
                    params: found_params,
                },
            ) => {
                if let (Some(expected_params), Some(found_params)) =
                    (expected_params, found_params)
                {
                    self.unify_all(expected_params, found_params)
                        .map_err(|_| self.mismatch(&expected, &found))?;
                }
                self.unify(expected_ret, found_ret)
                    .map_err(|_| self.mismatch(&expected, &found))
            }
            (Type::Tuple(expected_elements), Type::Tuple(found_elements)) => self
                .unify_all(expected_elements, found_elements)
                .map_err(|_| self.mismatch(&expected, &found)),
            _ => Err(self.mismatch(&expected, &found)),
        }
    }

    fn unify_all(&mut self, expected: &[Type], found: &[Type]) -> Result<(), InferError> {
        if expected.len() != found.len() {
            return Err(InferError::Mismatch {
                expected: Type::Tuple(expected.to_vec()),
                found: Type::Tuple(found.to_vec()),
            });
        }
        for (expected, found) in expected.iter().zip(found) {
            self.unify(expected, found)?;
        }
        Ok(())
    }

    fn bind(&mut self, slot: Slot, ty: &Type) -> Result<(), InferError> {
        let ty = self.resolve(ty);
        if ty.contains_slot(slot) {
            return Err(InferError::Recursive { slot, ty });
        }
        trace!(%slot, ?ty, "inferred slot");
        self.slots[slot.index()].binding = Some(ty);
        Ok(())
    }

    fn mismatch(&self, expected: &Type, found: &Type) -> InferError {
        InferError::Mismatch {
            expected: self.resolve(expected),
            found: self.resolve(found),
        }
    }

    /// Process every queued rule to a fixed point
    ///
    /// Returns the failures together with the span of the rule that failed.
    /// Slots that stay unbound afterwards are listed by [`Self::unresolved`].
    pub fn solve(&mut self) -> Vec<(InferError, FileSpan)> {
        let mut errors = Vec::new();
        loop {
            self.run_rules(&mut errors);
            if self.settle_stuck_rule() || self.default_diverging() {
                continue;
            }
            break;
        }
        debug!(
            slots = self.slots.len(),
            errors = errors.len(),
            unresolved = self.unresolved().len(),
            "solved inference rules"
        );
        errors
    }

    fn run_rules(&mut self, errors: &mut Vec<(InferError, FileSpan)>) {
        loop {
            let mut progressed = false;
            let rules = std::mem::take(&mut self.rules);
            for rule in rules {
                let span = rule.span();
                match self.apply(&rule) {
                    Ok(Progress::Done) => progressed = true,
                    Ok(Progress::Pending) => self.rules.push(rule),
                    Err(err) => {
                        progressed = true;
                        if let Rule::IsFunctSlot { returns, .. } = &rule {
                            self.poison(*returns);
                        }
                        errors.push((err, span));
                    }
                }
            }
            if !progressed {
                break;
            }
        }
    }

    fn apply(&mut self, rule: &Rule) -> Result<Progress, InferError> {
        match rule {
            Rule::IsSameSlot { left, right, .. } => {
                let left = Type::Placeholder(*left);
                let right = Type::Placeholder(*right);
                let (left_now, right_now) = (self.shallow(&left), self.shallow(&right));
                if left_now.as_placeholder().is_some() && right_now.as_placeholder().is_some() {
                    return Ok(if left_now == right_now {
                        Progress::Done
                    } else {
                        Progress::Pending
                    });
                }
                self.unify(&left, &right)?;
                Ok(Progress::Done)
            }
            Rule::IsFunctSlot {
                slot,
                args,
                returns,
                ..
            } => match self.shallow(&Type::Placeholder(*slot)) {
                Type::Placeholder(_) => Ok(Progress::Pending),
                Type::Error => {
                    self.poison(*returns);
                    Ok(Progress::Done)
                }
                Type::Funct {
                    returns: funct_returns,
                    params,
                } => {
                    if let Some(params) = params {
                        if params.len() != args.len() {
                            return Err(InferError::ArgumentCount {
                                expected: params.len(),
                                found: args.len(),
                            });
                        }
                        for (param, arg) in params.iter().zip(args) {
                            self.unify(param, arg)?;
                        }
                    }
                    self.unify(&Type::Placeholder(*returns), &funct_returns)?;
                    Ok(Progress::Done)
                }
                other => Err(InferError::NotFunct {
                    found: self.resolve(&other),
                }),
            },
        }
    }

    /// Settle `slot` as `Error` unless something already bound it
    fn poison(&mut self, slot: Slot) {
        if let Some(root) = self.shallow(&Type::Placeholder(slot)).as_placeholder() {
            self.slots[root.index()].binding = Some(Type::Error);
        }
    }

    /// Break the first rule that cannot make progress on its own
    ///
    /// Two unbound slots that must agree are linked; an unbound callee is
    /// inferred from its call site.
    fn settle_stuck_rule(&mut self) -> bool {
        let Some(rule) = self.rules.first().cloned() else {
            return false;
        };
        match rule {
            Rule::IsSameSlot { left, right, .. } => {
                let root = self.shallow(&Type::Placeholder(right));
                if let Some(left_root) = self.shallow(&Type::Placeholder(left)).as_placeholder()
                    && root != Type::Placeholder(left_root)
                {
                    trace!(%left_root, ?root, "linking slots");
                    self.slots[left_root.index()].binding = Some(root);
                }
                self.rules.remove(0);
            }
            Rule::IsFunctSlot {
                slot,
                args,
                returns,
                ..
            } => {
                let Some(root) = self.shallow(&Type::Placeholder(slot)).as_placeholder() else {
                    self.rules.remove(0);
                    return true;
                };
                let funct = self.resolve(&Type::funct(Type::Placeholder(returns), args));
                if funct.contains_slot(root) {
                    self.rules.remove(0);
                } else {
                    trace!(%root, ?funct, "inferred callee from call site");
                    self.slots[root.index()].binding = Some(funct);
                }
            }
        }
        true
    }

    fn default_diverging(&mut self) -> bool {
        let mut changed = false;
        for info in &mut self.slots {
            if info.diverging && info.binding.is_none() {
                info.binding = Some(Type::unit());
                changed = true;
            }
        }
        changed
    }

    /// Slots left without a binding, with the span that introduced them
    #[must_use]
    pub fn unresolved(&self) -> Vec<(Slot, FileSpan)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, info)| info.binding.is_none())
            .map(|(idx, info)| (Slot(idx as u32), info.origin))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::StructId;
    use cn_span::{FileId, Span};

    fn span(start: u32) -> FileSpan {
        FileSpan::new(FileId::new(0), Span::new(start, start + 1))
    }

    fn int() -> Type {
        Type::Struct(StructId(0))
    }

    fn boolean() -> Type {
        Type::Struct(StructId(1))
    }

    #[test]
    fn binding_resolves_placeholder() {
        let mut engine = InferenceEngine::new(true);
        let slot = engine.add_slot(span(0));
        engine.infer_type(slot, &int()).unwrap();
        assert_eq!(engine.resolve(&Type::Placeholder(slot)), int());
        assert!(engine.unresolved().is_empty());
    }

    #[test]
    fn strict_engine_rejects_conflicting_write() {
        let mut engine = InferenceEngine::new(true);
        let slot = engine.add_slot(span(0));
        engine.infer_type(slot, &int()).unwrap();
        let err = engine.infer_type(slot, &boolean()).unwrap_err();
        assert_eq!(
            err,
            InferError::Mismatch {
                expected: int(),
                found: boolean(),
            }
        );
    }

    #[test]
    fn lax_engine_keeps_last_write() {
        let mut engine = InferenceEngine::new(false);
        let slot = engine.add_slot(span(0));
        engine.infer_type(slot, &int()).unwrap();
        engine.infer_type(slot, &boolean()).unwrap();
        assert_eq!(engine.resolve(&Type::Placeholder(slot)), boolean());
    }

    #[test]
    fn same_slot_rule_propagates_after_binding() {
        let mut engine = InferenceEngine::new(true);
        let left = engine.placeholder(span(0));
        let right = engine.placeholder(span(2));
        engine.unify(&left, &right).unwrap();
        assert_eq!(engine.pending_rules().len(), 1);

        engine.unify(&right, &Type::pointer(false, int())).unwrap();
        assert!(engine.solve().is_empty());
        assert_eq!(engine.resolve(&left), Type::pointer(false, int()));
    }

    #[test]
    fn linked_slots_stay_unresolved_together() {
        let mut engine = InferenceEngine::new(true);
        let left = engine.placeholder(span(0));
        let right = engine.placeholder(span(2));
        engine.unify(&left, &right).unwrap();
        assert!(engine.solve().is_empty());
        assert_eq!(engine.unresolved().len(), 1);
        assert_eq!(engine.concretize(&left), Type::Error);
    }

    #[test]
    fn funct_rule_checks_arity_and_return() {
        let mut engine = InferenceEngine::new(true);
        let callee = engine.add_slot(span(0));
        let result = engine.add_slot(span(2));
        engine.add_rule(Rule::IsFunctSlot {
            slot: callee,
            args: vec![int()],
            returns: result,
            span: span(4),
        });
        engine
            .infer_type(callee, &Type::funct(boolean(), vec![int()]))
            .unwrap();
        assert!(engine.solve().is_empty());
        assert_eq!(engine.resolve(&Type::Placeholder(result)), boolean());

        let mut engine = InferenceEngine::new(true);
        let callee = engine.add_slot(span(0));
        let result = engine.add_slot(span(2));
        engine.add_rule(Rule::IsFunctSlot {
            slot: callee,
            args: vec![int(), int()],
            returns: result,
            span: span(4),
        });
        engine
            .infer_type(callee, &Type::funct(boolean(), vec![int()]))
            .unwrap();
        let errors = engine.solve();
        assert_eq!(
            errors,
            vec![(
                InferError::ArgumentCount {
                    expected: 1,
                    found: 2
                },
                span(4)
            )]
        );
        // The failed call's result is already diagnosed
        assert!(engine.unresolved().is_empty());
        assert_eq!(engine.concretize(&Type::Placeholder(result)), Type::Error);
    }

    #[test]
    fn funct_rule_rejects_non_function() {
        let mut engine = InferenceEngine::new(true);
        let callee = engine.add_slot(span(0));
        let result = engine.add_slot(span(2));
        engine.add_rule(Rule::IsFunctSlot {
            slot: callee,
            args: Vec::new(),
            returns: result,
            span: span(4),
        });
        engine.infer_type(callee, &int()).unwrap();
        let errors = engine.solve();
        assert!(matches!(errors.as_slice(), [(InferError::NotFunct { .. }, _)]));
        assert!(engine.unresolved().is_empty());
    }

    #[test]
    fn error_callee_settles_result() {
        let mut engine = InferenceEngine::new(true);
        let callee = engine.add_slot(span(0));
        let result = engine.add_slot(span(2));
        engine.add_rule(Rule::IsFunctSlot {
            slot: callee,
            args: vec![int()],
            returns: result,
            span: span(4),
        });
        engine.infer_type(callee, &Type::Error).unwrap();
        assert!(engine.solve().is_empty());
        assert!(engine.unresolved().is_empty());
    }

    #[test]
    fn unconstrained_callee_is_inferred_from_call() {
        let mut engine = InferenceEngine::new(true);
        let callee = engine.add_slot(span(0));
        let result = engine.add_slot(span(2));
        engine.add_rule(Rule::IsFunctSlot {
            slot: callee,
            args: vec![int()],
            returns: result,
            span: span(4),
        });
        engine.infer_type(result, &boolean()).unwrap();
        assert!(engine.solve().is_empty());
        assert_eq!(
            engine.resolve(&Type::Placeholder(callee)),
            Type::funct(boolean(), vec![int()])
        );
    }

    #[test]
    fn diverging_slot_defaults_to_unit() {
        let mut engine = InferenceEngine::new(true);
        let slot = engine.add_slot(span(0));
        engine.mark_diverging(slot);
        assert!(engine.solve().is_empty());
        assert_eq!(engine.resolve(&Type::Placeholder(slot)), Type::unit());
    }

    #[test]
    fn error_absorbs_everything() {
        let mut engine = InferenceEngine::new(true);
        assert!(engine.unify(&Type::Error, &int()).is_ok());
        assert!(engine
            .unify(&Type::Tuple(vec![Type::Error, int()]), &Type::Tuple(vec![boolean(), int()]))
            .is_ok());
    }

    #[test]
    fn error_poisons_open_slot() {
        let mut engine = InferenceEngine::new(true);
        let slot = engine.add_slot(span(0));
        engine.infer_type(slot, &Type::Error).unwrap();
        assert!(engine.unresolved().is_empty());
        assert!(engine.infer_type(slot, &int()).is_ok());
    }

    #[test]
    fn recursive_binding_is_rejected() {
        let mut engine = InferenceEngine::new(true);
        let slot = engine.add_slot(span(0));
        let err = engine
            .infer_type(slot, &Type::pointer(true, Type::Placeholder(slot)))
            .unwrap_err();
        assert!(matches!(err, InferError::Recursive { .. }));
    }
}
