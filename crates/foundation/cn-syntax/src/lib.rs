//! Syntax tree consumed by the semantic core
//!
//! Tokenizing and parsing happen elsewhere; the parser hands over a
//! [`SourceFile`] built from the closed node types in [`ast`]. Every node
//! exposes its span and its children through [`AstNode`].

pub mod ast;
pub mod builder;
pub mod node;

pub use ast::{
    Expr, ExprKind, FieldDecl, FieldInit, FunctDecl, Ident, Item, NamespaceDecl, ParamDecl, Path,
    SourceFile, Stmt, StmtKind, StructDecl, TypeExpr, TypeExprKind, UseDecl,
};
pub use builder::AstBuilder;
pub use node::{preorder, AstNode, NodeRef};
