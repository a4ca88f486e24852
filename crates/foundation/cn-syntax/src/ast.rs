//! Declaration and expression nodes
//!
//! This is the tree the parser hands over. Identifiers are plain strings;
//! interning happens during lowering.

use cn_span::{FileId, FileSpan};
use serde::{Deserialize, Serialize};

/// A single identifier with its location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    /// Identifier text
    pub text: String,
    /// Source location
    pub span: FileSpan,
}

/// A `::`-separated path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    /// Path segments in order
    pub segments: Vec<Ident>,
    /// Written with a leading `::`
    #[serde(default)]
    pub absolute: bool,
    /// Source location
    pub span: FileSpan,
}

impl Path {
    /// Whether this path is a single, relative identifier
    #[must_use]
    pub fn as_single(&self) -> Option<&Ident> {
        match self.segments.as_slice() {
            [only] if !self.absolute => Some(only),
            _ => None,
        }
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.absolute {
            f.write_str("::")?;
        }
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str("::")?;
            }
            f.write_str(&segment.text)?;
        }
        Ok(())
    }
}

/// Root of one parsed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    /// File identifier
    pub file: FileId,
    /// Top-level items
    pub items: Vec<Item>,
    /// Source location of the whole file
    pub span: FileSpan,
}

/// Top-level or namespace-level item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    /// `namespace A::B { ... }`
    Namespace(NamespaceDecl),
    /// `use P::*;` or `use P::* { ... }`
    Use(UseDecl),
    /// `struct S { ... }`
    Struct(StructDecl),
    /// `fn f(...) -> T { ... }`
    Funct(FunctDecl),
}

/// Namespace declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDecl {
    /// Namespace path, relative to the enclosing namespace
    pub name: Path,
    /// Items declared inside
    pub items: Vec<Item>,
    /// Source location
    pub span: FileSpan,
}

/// Import-all directive
///
/// Without `items` the directive applies to the following sibling items;
/// with `items` it only applies inside that block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseDecl {
    /// Imported prefix
    pub path: Path,
    /// Items of a `use` block
    #[serde(default)]
    pub items: Option<Vec<Item>>,
    /// Source location
    pub span: FileSpan,
}

/// Struct declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    /// Struct name
    pub name: Ident,
    /// Fields in declaration order
    pub fields: Vec<FieldDecl>,
    /// Source location
    pub span: FileSpan,
}

/// Struct field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Field name
    pub name: Ident,
    /// Field type
    pub ty: TypeExpr,
    /// Source location
    pub span: FileSpan,
}

/// Function declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctDecl {
    /// Function name
    pub name: Ident,
    /// Parameters in declaration order
    pub params: Vec<ParamDecl>,
    /// Declared return type (`()` when absent)
    #[serde(default)]
    pub returns: Option<TypeExpr>,
    /// Body; external functions have none
    #[serde(default)]
    pub body: Option<Expr>,
    /// Source location
    pub span: FileSpan,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Parameter name
    pub name: Ident,
    /// Declared `mut`
    #[serde(default)]
    pub mutable: bool,
    /// Parameter type
    pub ty: TypeExpr,
    /// Source location
    pub span: FileSpan,
}

/// Type syntax
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeExpr {
    /// Kind of type expression
    pub kind: TypeExprKind,
    /// Source location
    pub span: FileSpan,
}

/// Kinds of type syntax
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeExprKind {
    /// Named type
    Path(Path),
    /// `*'a mut T` / `*const T`
    Pointer {
        /// `mut` pointer
        mutable: bool,
        /// Lifetime annotation, accepted but not part of the type
        #[serde(default)]
        lifetime: Option<Ident>,
        /// Pointee type
        pointee: Box<TypeExpr>,
    },
    /// `(A, B)`; `()` is the unit type
    Tuple(Vec<TypeExpr>),
    /// `fn(A, B) -> R`
    Funct {
        /// Parameter types
        params: Vec<TypeExpr>,
        /// Return type (`()` when absent)
        #[serde(default)]
        returns: Option<Box<TypeExpr>>,
    },
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// Kind of expression
    pub kind: ExprKind,
    /// Source location
    pub span: FileSpan,
}

/// Kinds of expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    /// `{ s1; s2; e }`, the last statement is the value
    Block(Vec<Stmt>),
    /// Integer literal
    Int(i64),
    /// Boolean literal
    Bool(bool),
    /// Tuple literal; `()` is the empty tuple
    Tuple(Vec<Expr>),
    /// `S { a: e1, b: e2 }`
    StructLit {
        /// Struct path
        path: Path,
        /// Field initializers
        fields: Vec<FieldInit>,
    },
    /// Local, parameter, or function reference
    Name(Path),
    /// `base.field`; tuple elements use numeric names
    Field {
        /// Accessed value
        base: Box<Expr>,
        /// Field name
        field: Ident,
    },
    /// `&e` / `&mut e`
    AddressOf {
        /// `&mut`
        mutable: bool,
        /// Addressed place
        operand: Box<Expr>,
    },
    /// `*e`
    Deref(Box<Expr>),
    /// `callee(args...)`
    Call {
        /// Called value
        callee: Box<Expr>,
        /// Arguments in order
        args: Vec<Expr>,
    },
    /// `if c { .. } else { .. }`
    If {
        /// Condition
        condition: Box<Expr>,
        /// True arm
        then_branch: Box<Expr>,
        /// False arm
        #[serde(default)]
        else_branch: Option<Box<Expr>>,
    },
    /// `while c { .. }`
    While {
        /// Loop condition
        condition: Box<Expr>,
        /// Loop body
        body: Box<Expr>,
    },
    /// `target = value`
    Assign {
        /// Written place
        target: Box<Expr>,
        /// Stored value
        value: Box<Expr>,
    },
    /// `return` / `return e`
    Return(Option<Box<Expr>>),
}

/// Field initializer in a struct literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInit {
    /// Field name
    pub name: Ident,
    /// Initial value
    pub value: Expr,
    /// Source location
    pub span: FileSpan,
}

/// Statement inside a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// Kind of statement
    pub kind: StmtKind,
    /// Source location
    pub span: FileSpan,
}

/// Kinds of statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StmtKind {
    /// Expression statement
    Expr(Expr),
    /// `let [mut] x [: T] [= e]`
    Let {
        /// Bound name
        name: Ident,
        /// `let mut`
        #[serde(default)]
        mutable: bool,
        /// Type annotation
        #[serde(default)]
        ty: Option<TypeExpr>,
        /// Initializer
        #[serde(default)]
        init: Option<Expr>,
    },
    /// `use P::*;` scoped to the rest of the block
    Use(Path),
}
