//! Type representation

use derive_more::Display;
use std::fmt;

/// Index of a struct declaration
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("struct#{_0}")]
pub struct StructId(pub u32);

impl StructId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Inference slot, private to one function's inference pass
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("?{_0}")]
pub struct Slot(pub u32);

impl Slot {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A type in the type system
///
/// The variant set is closed. Scalars such as `int` and `bool` are builtin
/// structs, and `()` is the empty tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Already diagnosed; never produces further diagnostics
    Error,

    /// Not yet inferred
    Placeholder(Slot),

    /// Pointer type
    Pointer {
        /// `*mut` pointer
        mutable: bool,
        /// Pointee type
        pointee: Box<Type>,
    },

    /// Struct type
    Struct(StructId),

    /// Function type
    Funct {
        /// Return type
        returns: Box<Type>,
        /// Parameter types, `None` when the arity is unknown
        params: Option<Vec<Type>>,
    },

    /// Tuple type
    Tuple(Vec<Type>),
}

impl Type {
    /// The empty tuple `()`
    #[must_use]
    pub fn unit() -> Self {
        Self::Tuple(Vec::new())
    }

    #[must_use]
    pub fn pointer(mutable: bool, pointee: Self) -> Self {
        Self::Pointer {
            mutable,
            pointee: Box::new(pointee),
        }
    }

    #[must_use]
    pub fn funct(returns: Self, params: Vec<Self>) -> Self {
        Self::Funct {
            returns: Box::new(returns),
            params: Some(params),
        }
    }

    /// Function type whose arity is not known yet
    #[must_use]
    pub fn funct_any_arity(returns: Self) -> Self {
        Self::Funct {
            returns: Box::new(returns),
            params: None,
        }
    }

    #[must_use]
    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Tuple(elements) if elements.is_empty())
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// The slot of a top-level placeholder
    #[must_use]
    pub fn as_placeholder(&self) -> Option<Slot> {
        match self {
            Self::Placeholder(slot) => Some(*slot),
            _ => None,
        }
    }

    /// Whether `predicate` holds for this type or any type nested in it
    pub fn any(&self, predicate: &mut impl FnMut(&Self) -> bool) -> bool {
        if predicate(self) {
            return true;
        }
        match self {
            Self::Error | Self::Placeholder(_) | Self::Struct(_) => false,
            Self::Pointer { pointee, .. } => pointee.any(predicate),
            Self::Funct { returns, params } => {
                returns.any(predicate)
                    || params
                        .iter()
                        .flatten()
                        .any(|param| param.any(predicate))
            }
            Self::Tuple(elements) => elements.iter().any(|element| element.any(predicate)),
        }
    }

    /// No `Error` or `Placeholder` anywhere in the type
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.any(&mut |ty| matches!(ty, Self::Error | Self::Placeholder(_)))
    }

    /// An `Error` appears somewhere in the type; it was diagnosed already
    #[must_use]
    pub fn contains_error(&self) -> bool {
        self.any(&mut Self::is_error)
    }

    #[must_use]
    pub fn contains_slot(&self, slot: Slot) -> bool {
        self.any(&mut |ty| *ty == Self::Placeholder(slot))
    }

    /// Exact structural equality
    ///
    /// Placeholders are only the same as the identical slot; pointer
    /// mutability and function arity must match exactly.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Error, Self::Error) => true,
            (Self::Placeholder(left), Self::Placeholder(right)) => left == right,
            (
                Self::Pointer {
                    mutable: left_mut,
                    pointee: left,
                },
                Self::Pointer {
                    mutable: right_mut,
                    pointee: right,
                },
            ) => left_mut == right_mut && left.is_same(right),
            (Self::Struct(left), Self::Struct(right)) => left == right,
            (
                Self::Funct {
                    returns: left_ret,
                    params: left_params,
                },
                Self::Funct {
                    returns: right_ret,
                    params: right_params,
                },
            ) => {
                left_ret.is_same(right_ret)
                    && match (left_params, right_params) {
                        (Some(left), Some(right)) => all_pairs(left, right, Self::is_same),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (Self::Tuple(left), Self::Tuple(right)) => all_pairs(left, right, Self::is_same),
            _ => false,
        }
    }

    /// Inference-compatible matching
    ///
    /// A placeholder matches anything, as does `Error` (it has been reported
    /// already). A function of unknown arity matches any arity.
    #[must_use]
    pub fn is_match(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Placeholder(_) | Self::Error, _)
            | (_, Self::Placeholder(_) | Self::Error) => true,
            (
                Self::Pointer {
                    mutable: left_mut,
                    pointee: left,
                },
                Self::Pointer {
                    mutable: right_mut,
                    pointee: right,
                },
            ) => left_mut == right_mut && left.is_match(right),
            (Self::Struct(left), Self::Struct(right)) => left == right,
            (
                Self::Funct {
                    returns: left_ret,
                    params: left_params,
                },
                Self::Funct {
                    returns: right_ret,
                    params: right_params,
                },
            ) => {
                left_ret.is_match(right_ret)
                    && match (left_params, right_params) {
                        (Some(left), Some(right)) => all_pairs(left, right, Self::is_match),
                        _ => true,
                    }
            }
            (Self::Tuple(left), Self::Tuple(right)) => all_pairs(left, right, Self::is_match),
            _ => false,
        }
    }

    /// Render with struct names supplied by `names`
    pub fn display<'a>(&'a self, names: &'a dyn StructNames) -> TypeDisplay<'a> {
        TypeDisplay { ty: self, names }
    }
}

fn all_pairs(left: &[Type], right: &[Type], same: impl Fn(&Type, &Type) -> bool) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(left, right)| same(left, right))
}

/// Source of struct names for rendering types
pub trait StructNames {
    /// Display name of a struct
    fn struct_name(&self, id: StructId) -> String;
}

/// Names structs by their index; used where no declaration table is at hand
pub struct Anonymous;

impl StructNames for Anonymous {
    fn struct_name(&self, id: StructId) -> String {
        id.to_string()
    }
}

/// Displays a type
pub struct TypeDisplay<'a> {
    ty: &'a Type,
    names: &'a dyn StructNames,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names;
        match self.ty {
            Type::Error => f.write_str("{error}"),
            Type::Placeholder(slot) => write!(f, "{slot}"),
            Type::Pointer { mutable, pointee } => {
                let qualifier = if *mutable { "mut" } else { "const" };
                write!(f, "*{qualifier} {}", pointee.display(names))
            }
            Type::Struct(id) => f.write_str(&names.struct_name(*id)),
            Type::Funct { returns, params } => {
                f.write_str("fn(")?;
                match params {
                    Some(params) => write_list(f, params, names)?,
                    None => f.write_str("..")?,
                }
                write!(f, ") -> {}", returns.display(names))
            }
            Type::Tuple(elements) => {
                f.write_str("(")?;
                write_list(f, elements, names)?;
                if elements.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, types: &[Type], names: &dyn StructNames) -> fmt::Result {
    for (idx, ty) in types.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", ty.display(names))?;
    }
    Ok(())
}
