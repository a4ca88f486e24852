//! Incremental construction of a function body

use crate::{
    Binding, DataAccess, Instruction, IrFunct, Register, RegisterId, Segment, SegmentId, Terminator,
};
use cn_diagnostic::InternalError;
use cn_intern::Symbol;
use cn_span::FileSpan;
use cn_ty::Type;
use tracing::trace;

#[derive(Debug, Clone, Default)]
struct OpenSegment {
    instructions: Vec<Instruction>,
    terminator: Option<Terminator>,
}

/// Builder for one function's registers, bindings and segments
///
/// Segments are open until they receive their terminator; [`Self::finish`]
/// refuses to produce a function with an open segment.
#[derive(Debug)]
pub struct FunctBuilder {
    function: usize,
    registers: Vec<Register>,
    param_count: usize,
    bindings: Vec<Binding>,
    segments: Vec<OpenSegment>,
    current: SegmentId,
}

impl FunctBuilder {
    /// Start a body for function number `function`, with an open entry segment
    #[must_use]
    pub fn new(function: usize) -> Self {
        Self {
            function,
            registers: Vec::new(),
            param_count: 0,
            bindings: Vec::new(),
            segments: vec![OpenSegment::default()],
            current: SegmentId::ENTRY,
        }
    }

    /// Start from a function whose signature is already resolved
    #[must_use]
    pub fn from_signature(function: usize, funct: &IrFunct) -> Self {
        let mut builder = Self::new(function);
        builder.registers = funct.registers.clone();
        builder.param_count = funct.param_count;
        builder.bindings = funct.bindings.clone();
        builder
    }

    /// Append a parameter register and its binding
    pub fn add_param(
        &mut self,
        name: Symbol,
        ty: Type,
        mutable: bool,
        span: FileSpan,
    ) -> Result<RegisterId, InternalError> {
        if self.registers.len() != self.param_count {
            return Err(InternalError::ParameterCount {
                function: self.function,
                param_count: self.param_count,
                registers: self.registers.len(),
            });
        }
        let register = self.add_register(ty, span);
        self.param_count += 1;
        self.bind(name, register, mutable);
        Ok(register)
    }

    /// Allocate the next register
    pub fn add_register(&mut self, ty: Type, span: FileSpan) -> RegisterId {
        let id = RegisterId(self.registers.len() as u32);
        self.registers.push(Register { ty, span });
        id
    }

    /// Append a name binding
    pub fn bind(&mut self, name: Symbol, register: RegisterId, mutable: bool) -> usize {
        self.bindings.push(Binding {
            name,
            register,
            mutable,
        });
        self.bindings.len() - 1
    }

    #[must_use]
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    #[must_use]
    pub fn register_type(&self, register: RegisterId) -> &Type {
        &self.registers[register.index()].ty
    }

    /// Rewrite every register type, e.g. once inference has finished
    pub fn map_register_types(&mut self, mut map: impl FnMut(&Type) -> Type) {
        for register in &mut self.registers {
            register.ty = map(&register.ty);
        }
    }

    /// Create a new open segment; the current segment is unchanged
    pub fn new_segment(&mut self) -> SegmentId {
        let id = SegmentId(self.segments.len() as u32);
        self.segments.push(OpenSegment::default());
        trace!(function = self.function, segment = %id, "created segment");
        id
    }

    /// Segment that receives new instructions
    #[must_use]
    pub fn current(&self) -> SegmentId {
        self.current
    }

    pub fn switch_to(&mut self, segment: SegmentId) {
        self.current = segment;
    }

    /// Append an instruction to the current segment
    pub fn push(&mut self, instruction: Instruction) {
        self.segments[self.current.index()]
            .instructions
            .push(instruction);
    }

    /// Shorthand for a plain move
    pub fn push_move(&mut self, source: DataAccess, dest: DataAccess) {
        self.push(Instruction::Move { source, dest });
    }

    /// Close the current segment
    pub fn terminate(&mut self, terminator: Terminator) -> Result<(), InternalError> {
        let segment = &mut self.segments[self.current.index()];
        if segment.terminator.is_some() {
            return Err(InternalError::DuplicateTerminator {
                function: self.function,
                segment: self.current.0,
            });
        }
        segment.terminator = Some(terminator);
        Ok(())
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.segments[self.current.index()].terminator.is_some()
    }

    /// Produce a body-less function holding only the parameters
    #[must_use]
    pub fn into_signature(self, return_type: Type, span: FileSpan) -> IrFunct {
        IrFunct {
            registers: self.registers,
            param_count: self.param_count,
            bindings: self.bindings,
            segments: Vec::new(),
            return_type,
            external: true,
            span,
        }
    }

    /// Produce the function, checking that every segment is closed
    pub fn finish(self, return_type: Type, span: FileSpan) -> Result<IrFunct, InternalError> {
        let function = self.function;
        let segments = self
            .segments
            .into_iter()
            .enumerate()
            .map(|(idx, segment)| {
                let terminator = segment.terminator.ok_or(InternalError::MissingTerminator {
                    function,
                    segment: idx as u32,
                })?;
                Ok(Segment {
                    instructions: segment.instructions,
                    terminator,
                })
            })
            .collect::<Result<Vec<_>, InternalError>>()?;

        Ok(IrFunct {
            registers: self.registers,
            param_count: self.param_count,
            bindings: self.bindings,
            segments,
            return_type,
            external: false,
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Literal;
    use cn_intern::Interner;
    use cn_span::{FileId, Span};

    fn span() -> FileSpan {
        FileSpan::new(FileId::new(0), Span::new(0, 1))
    }

    #[test]
    fn open_segment_is_an_internal_error() {
        let mut builder = FunctBuilder::new(4);
        builder.terminate(Terminator::End).unwrap();
        let _dangling = builder.new_segment();

        let err = builder.finish(Type::unit(), span()).unwrap_err();
        assert_eq!(
            err,
            InternalError::MissingTerminator {
                function: 4,
                segment: 1
            }
        );
    }

    #[test]
    fn second_terminator_is_rejected() {
        let mut builder = FunctBuilder::new(0);
        builder.terminate(Terminator::End).unwrap();
        assert!(matches!(
            builder.terminate(Terminator::End),
            Err(InternalError::DuplicateTerminator { segment: 0, .. })
        ));
    }

    #[test]
    fn params_come_first() {
        let interner = Interner::new();
        let mut builder = FunctBuilder::new(0);
        let first = builder
            .add_param(interner.intern("a"), Type::unit(), false, span())
            .unwrap();
        let second = builder
            .add_param(interner.intern("b"), Type::unit(), true, span())
            .unwrap();
        assert_eq!((first, second), (RegisterId(0), RegisterId(1)));

        builder.add_register(Type::unit(), span());
        assert!(builder
            .add_param(interner.intern("c"), Type::unit(), false, span())
            .is_err());
    }

    #[test]
    fn instructions_go_to_current_segment() {
        let mut builder = FunctBuilder::new(0);
        let next = builder.new_segment();
        builder.terminate(Terminator::Goto(next)).unwrap();
        builder.switch_to(next);
        builder.push(Instruction::MoveLiteral {
            literal: Literal::Int(1),
            dest: DataAccess::Discard,
        });
        builder.terminate(Terminator::End).unwrap();

        let funct = builder.finish(Type::unit(), span()).unwrap();
        assert!(funct.segments[0].instructions.is_empty());
        assert_eq!(funct.segments[1].instructions.len(), 1);
    }
}
