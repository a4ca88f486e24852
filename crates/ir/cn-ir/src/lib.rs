//! Control-flow Intermediate Representation
//!
//! Every function owns a register list and a segment list. Registers and
//! segments are referenced by index into those lists, so a segment never
//! holds a reference to the segments it branches to. Finished IR is the
//! only thing code generation sees: every name is resolved and every
//! register type is concrete.

pub mod builder;
pub mod pretty;
pub mod verify;

pub use builder::FunctBuilder;
pub use pretty::{FunctDisplay, IrNames, StructDisplay};
pub use verify::{reachable_segments, verify};

use cn_intern::Symbol;
use cn_span::FileSpan;
use cn_ty::{StructId, Type};
use derive_more::Display;
use std::fmt;

/// Register index within one function
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("r{_0}")]
pub struct RegisterId(pub u32);

impl RegisterId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Segment index within one function
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("s{_0}")]
pub struct SegmentId(pub u32);

impl SegmentId {
    /// Every function body starts here
    pub const ENTRY: Self = Self(0);

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a function declaration
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("fn#{_0}")]
pub struct FunctId(pub u32);

impl FunctId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Struct field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name
    pub name: Symbol,
    /// Field type
    pub ty: Type,
    /// Declaration site
    pub span: FileSpan,
}

/// A struct declaration with its fields in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrStruct {
    /// Fields; the field index is the position in this list
    pub fields: Vec<Field>,
    /// Declaration site
    pub span: FileSpan,
}

impl IrStruct {
    #[must_use]
    pub fn new(span: FileSpan) -> Self {
        Self {
            fields: Vec::new(),
            span,
        }
    }

    /// Index and declaration of the field called `name`
    #[must_use]
    pub fn field(&self, name: Symbol) -> Option<(usize, &Field)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, field)| field.name == name)
    }
}

/// Typed value slot of a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    /// Register type
    pub ty: Type,
    /// Where the value comes from
    pub span: FileSpan,
}

/// Local name bound to a register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Local name
    pub name: Symbol,
    /// Backing register
    pub register: RegisterId,
    /// Declared `mut`
    pub mutable: bool,
}

/// A storage location, or nowhere
///
/// `Register { register, fields, deref }` denotes `(*register).f1.f2...` when
/// `deref` is set and `register.f1.f2...` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataAccess {
    /// Write-only sink; the value is dropped
    Discard,
    /// A register with an optional dereference and field chain
    Register {
        /// Accessed register
        register: RegisterId,
        /// Field indices applied in order
        fields: Vec<usize>,
        /// Dereference the register before the field chain
        deref: bool,
    },
}

impl DataAccess {
    /// The plain register, no fields and no dereference
    #[must_use]
    pub fn register(register: RegisterId) -> Self {
        Self::Register {
            register,
            fields: Vec::new(),
            deref: false,
        }
    }

    /// Extend the field chain
    #[must_use]
    pub fn field(self, index: usize) -> Self {
        match self {
            Self::Discard => Self::Discard,
            Self::Register {
                register,
                mut fields,
                deref,
            } => {
                fields.push(index);
                Self::Register {
                    register,
                    fields,
                    deref,
                }
            }
        }
    }

    /// The accessed register, if any
    #[must_use]
    pub fn base(&self) -> Option<RegisterId> {
        match self {
            Self::Discard => None,
            Self::Register { register, .. } => Some(*register),
        }
    }

    /// A bare register with no projection
    #[must_use]
    pub fn as_plain(&self) -> Option<RegisterId> {
        match self {
            Self::Register {
                register,
                fields,
                deref: false,
            } if fields.is_empty() => Some(*register),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_discard(&self) -> bool {
        matches!(self, Self::Discard)
    }
}

impl fmt::Display for DataAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discard => f.write_str("_"),
            Self::Register {
                register,
                fields,
                deref,
            } => {
                match (deref, fields.is_empty()) {
                    (true, true) => write!(f, "*{register}")?,
                    (true, false) => write!(f, "(*{register})")?,
                    (false, _) => write!(f, "{register}")?,
                }
                for field in fields {
                    write!(f, ".{field}")?;
                }
                Ok(())
            }
        }
    }
}

/// Literal payload of a move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Integer constant
    Int(i64),
    /// Boolean constant
    Bool(bool),
    /// Tuple of the given elements; `()` when empty
    Tuple(Vec<DataAccess>),
    /// Struct value, one access per field in field order
    Struct {
        /// Struct being built
        id: StructId,
        /// Field values
        fields: Vec<DataAccess>,
    },
    /// Function value
    Funct(FunctId),
}

impl Literal {
    /// The empty tuple `()`
    #[must_use]
    pub fn unit() -> Self {
        Self::Tuple(Vec::new())
    }
}

/// Straight-line instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `dest = literal`
    MoveLiteral {
        /// Value
        literal: Literal,
        /// Destination
        dest: DataAccess,
    },
    /// `dest = source`
    Move {
        /// Copied location
        source: DataAccess,
        /// Destination
        dest: DataAccess,
    },
    /// `dest = &source` / `dest = &mut source`
    MoveAddress {
        /// Addressed location
        source: DataAccess,
        /// Mutable pointer
        mutable: bool,
        /// Destination
        dest: DataAccess,
    },
    /// `dest = callee(args...)`
    MoveCall {
        /// Called function value
        callee: DataAccess,
        /// Arguments in order
        args: Vec<DataAccess>,
        /// Destination
        dest: DataAccess,
    },
}

impl Instruction {
    /// Where the instruction writes
    #[must_use]
    pub fn dest(&self) -> &DataAccess {
        match self {
            Self::MoveLiteral { dest, .. }
            | Self::Move { dest, .. }
            | Self::MoveAddress { dest, .. }
            | Self::MoveCall { dest, .. } => dest,
        }
    }

    /// Every location the instruction reads or writes
    #[must_use]
    pub fn accesses(&self) -> Vec<&DataAccess> {
        match self {
            Self::MoveLiteral { literal, dest } => {
                let mut accesses = match literal {
                    Literal::Tuple(elements)
                    | Literal::Struct {
                        fields: elements, ..
                    } => elements.iter().collect(),
                    Literal::Int(_) | Literal::Bool(_) | Literal::Funct(_) => Vec::new(),
                };
                accesses.push(dest);
                accesses
            }
            Self::Move { source, dest } | Self::MoveAddress { source, dest, .. } => {
                vec![source, dest]
            }
            Self::MoveCall { callee, args, dest } => std::iter::once(callee)
                .chain(args)
                .chain(std::iter::once(dest))
                .collect(),
        }
    }
}

/// How control leaves a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    /// Leave the function without a value
    End,
    /// Leave the function with a value
    Return(DataAccess),
    /// Continue in another segment
    Goto(SegmentId),
    /// Two-way branch on a `bool`
    Branch {
        /// Tested value
        condition: DataAccess,
        /// Taken when the condition is true
        on_true: SegmentId,
        /// Taken when the condition is false
        on_false: SegmentId,
    },
}

impl Terminator {
    /// Segments control may continue in
    #[must_use]
    pub fn successors(&self) -> Vec<SegmentId> {
        match self {
            Self::End | Self::Return(_) => Vec::new(),
            Self::Goto(target) => vec![*target],
            Self::Branch {
                on_true, on_false, ..
            } => vec![*on_true, *on_false],
        }
    }

    /// Locations the terminator reads
    #[must_use]
    pub fn accesses(&self) -> Vec<&DataAccess> {
        match self {
            Self::Return(value) => vec![value],
            Self::Branch { condition, .. } => vec![condition],
            Self::End | Self::Goto(_) => Vec::new(),
        }
    }
}

/// Basic block: instructions followed by exactly one terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Instructions in execution order
    pub instructions: Vec<Instruction>,
    /// Exit
    pub terminator: Terminator,
}

/// A function declaration with its lowered body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrFunct {
    /// Registers; `0..param_count` are the parameters
    pub registers: Vec<Register>,
    /// Number of parameters
    pub param_count: usize,
    /// Local names in the order they were bound
    pub bindings: Vec<Binding>,
    /// Segments; execution starts in [`SegmentId::ENTRY`]
    pub segments: Vec<Segment>,
    /// Declared return type
    pub return_type: Type,
    /// Declared without a body
    pub external: bool,
    /// Declaration site
    pub span: FileSpan,
}

impl IrFunct {
    /// A declaration whose signature has not been resolved yet
    #[must_use]
    pub fn new(span: FileSpan) -> Self {
        Self {
            registers: Vec::new(),
            param_count: 0,
            bindings: Vec::new(),
            segments: Vec::new(),
            return_type: Type::unit(),
            external: false,
            span,
        }
    }

    /// Parameter registers in declaration order
    #[must_use]
    pub fn params(&self) -> &[Register] {
        &self.registers[..self.param_count.min(self.registers.len())]
    }

    /// The function type built from the parameters and return type
    #[must_use]
    pub fn signature(&self) -> Type {
        Type::funct(
            self.return_type.clone(),
            self.params().iter().map(|param| param.ty.clone()).collect(),
        )
    }

    #[must_use]
    pub fn register(&self, id: RegisterId) -> Option<&Register> {
        self.registers.get(id.index())
    }

    #[must_use]
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id.index())
    }

    /// Total number of instructions over all segments
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.segments
            .iter()
            .map(|segment| segment.instructions.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_display() {
        let plain = DataAccess::register(RegisterId(2));
        assert_eq!(plain.to_string(), "r2");
        assert_eq!(plain.clone().field(0).field(3).to_string(), "r2.0.3");

        let deref = DataAccess::Register {
            register: RegisterId(1),
            fields: Vec::new(),
            deref: true,
        };
        assert_eq!(deref.to_string(), "*r1");
        assert_eq!(deref.field(1).to_string(), "(*r1).1");
        assert_eq!(DataAccess::Discard.field(4).to_string(), "_");
    }

    #[test]
    fn plain_access_only_without_projection() {
        assert_eq!(DataAccess::register(RegisterId(5)).as_plain(), Some(RegisterId(5)));
        assert_eq!(DataAccess::register(RegisterId(5)).field(0).as_plain(), None);
        assert_eq!(DataAccess::Discard.base(), None);
    }

    #[test]
    fn terminator_successors() {
        let branch = Terminator::Branch {
            condition: DataAccess::register(RegisterId(0)),
            on_true: SegmentId(1),
            on_false: SegmentId(2),
        };
        assert_eq!(branch.successors(), vec![SegmentId(1), SegmentId(2)]);
        assert!(Terminator::End.successors().is_empty());
        assert_eq!(Terminator::Goto(SegmentId(4)).successors(), vec![SegmentId(4)]);
    }

    #[test]
    fn call_reads_callee_and_args() {
        let call = Instruction::MoveCall {
            callee: DataAccess::register(RegisterId(0)),
            args: vec![DataAccess::register(RegisterId(1))],
            dest: DataAccess::Discard,
        };
        assert_eq!(call.accesses().len(), 3);
        assert!(call.dest().is_discard());
    }
}
