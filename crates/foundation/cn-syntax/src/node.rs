//! Uniform node view: span plus ordered children

use crate::ast::{
    Expr, ExprKind, FieldDecl, FieldInit, FunctDecl, Item, ParamDecl, SourceFile, Stmt, StmtKind,
    TypeExpr, TypeExprKind,
};
use cn_span::FileSpan;

/// Common interface of every syntax node
pub trait AstNode {
    /// Source location of the node
    fn span(&self) -> FileSpan;

    /// Child nodes in source order
    fn children(&self) -> Vec<NodeRef<'_>>;
}

/// Borrowed reference to any node
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    /// File root
    File(&'a SourceFile),
    /// Item
    Item(&'a Item),
    /// Struct field
    Field(&'a FieldDecl),
    /// Function parameter
    Param(&'a ParamDecl),
    /// Type expression
    Type(&'a TypeExpr),
    /// Expression
    Expr(&'a Expr),
    /// Struct literal field initializer
    FieldInit(&'a FieldInit),
    /// Statement
    Stmt(&'a Stmt),
}

impl NodeRef<'_> {
    /// Short human-readable node kind
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Item(Item::Namespace(_)) => "namespace",
            Self::Item(Item::Use(_)) => "use",
            Self::Item(Item::Struct(_)) => "struct",
            Self::Item(Item::Funct(_)) => "funct",
            Self::Field(_) => "field",
            Self::Param(_) => "param",
            Self::Type(_) => "type",
            Self::Expr(_) => "expr",
            Self::FieldInit(_) => "field_init",
            Self::Stmt(_) => "stmt",
        }
    }
}

impl<'a> NodeRef<'a> {
    /// Child nodes in source order, borrowing from the tree rather than from `self`
    #[must_use]
    pub fn child_nodes(self) -> Vec<NodeRef<'a>> {
        match self {
            Self::File(node) => node.children(),
            Self::Item(node) => node.children(),
            Self::Field(node) => vec![NodeRef::Type(&node.ty)],
            Self::Param(node) => vec![NodeRef::Type(&node.ty)],
            Self::Type(node) => node.children(),
            Self::Expr(node) => node.children(),
            Self::FieldInit(node) => vec![NodeRef::Expr(&node.value)],
            Self::Stmt(node) => node.children(),
        }
    }
}

impl AstNode for NodeRef<'_> {
    fn span(&self) -> FileSpan {
        match self {
            Self::File(node) => node.span,
            Self::Item(node) => node.span(),
            Self::Field(node) => node.span,
            Self::Param(node) => node.span,
            Self::Type(node) => node.span,
            Self::Expr(node) => node.span,
            Self::FieldInit(node) => node.span,
            Self::Stmt(node) => node.span,
        }
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        self.child_nodes()
    }
}

impl AstNode for SourceFile {
    fn span(&self) -> FileSpan {
        self.span
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        self.items.iter().map(NodeRef::Item).collect()
    }
}

impl AstNode for Item {
    fn span(&self) -> FileSpan {
        match self {
            Self::Namespace(decl) => decl.span,
            Self::Use(decl) => decl.span,
            Self::Struct(decl) => decl.span,
            Self::Funct(decl) => decl.span,
        }
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        match self {
            Self::Namespace(decl) => decl.items.iter().map(NodeRef::Item).collect(),
            Self::Use(decl) => decl
                .items
                .iter()
                .flatten()
                .map(NodeRef::Item)
                .collect(),
            Self::Struct(decl) => decl.fields.iter().map(NodeRef::Field).collect(),
            Self::Funct(decl) => funct_children(decl),
        }
    }
}

fn funct_children(decl: &FunctDecl) -> Vec<NodeRef<'_>> {
    let mut children: Vec<NodeRef<'_>> = decl.params.iter().map(NodeRef::Param).collect();
    children.extend(decl.returns.iter().map(NodeRef::Type));
    children.extend(decl.body.iter().map(NodeRef::Expr));
    children
}

impl AstNode for TypeExpr {
    fn span(&self) -> FileSpan {
        self.span
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        match &self.kind {
            TypeExprKind::Path(_) => Vec::new(),
            TypeExprKind::Pointer { pointee, .. } => vec![NodeRef::Type(pointee)],
            TypeExprKind::Tuple(elements) => elements.iter().map(NodeRef::Type).collect(),
            TypeExprKind::Funct { params, returns } => {
                let mut children: Vec<NodeRef<'_>> = params.iter().map(NodeRef::Type).collect();
                children.extend(returns.iter().map(|ret| NodeRef::Type(ret)));
                children
            }
        }
    }
}

impl AstNode for Expr {
    fn span(&self) -> FileSpan {
        self.span
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        match &self.kind {
            ExprKind::Block(stmts) => stmts.iter().map(NodeRef::Stmt).collect(),
            ExprKind::Int(_) | ExprKind::Bool(_) | ExprKind::Name(_) => Vec::new(),
            ExprKind::Tuple(elements) => elements.iter().map(NodeRef::Expr).collect(),
            ExprKind::StructLit { fields, .. } => fields.iter().map(NodeRef::FieldInit).collect(),
            ExprKind::Field { base, .. } => vec![NodeRef::Expr(base)],
            ExprKind::AddressOf { operand, .. } | ExprKind::Deref(operand) => {
                vec![NodeRef::Expr(operand)]
            }
            ExprKind::Call { callee, args } => std::iter::once(NodeRef::Expr(&**callee))
                .chain(args.iter().map(NodeRef::Expr))
                .collect(),
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut children = vec![NodeRef::Expr(condition), NodeRef::Expr(then_branch)];
                children.extend(else_branch.iter().map(|arm| NodeRef::Expr(arm)));
                children
            }
            ExprKind::While { condition, body } => {
                vec![NodeRef::Expr(condition), NodeRef::Expr(body)]
            }
            ExprKind::Assign { target, value } => vec![NodeRef::Expr(target), NodeRef::Expr(value)],
            ExprKind::Return(value) => value.iter().map(|val| NodeRef::Expr(val)).collect(),
        }
    }
}

impl AstNode for Stmt {
    fn span(&self) -> FileSpan {
        self.span
    }

    fn children(&self) -> Vec<NodeRef<'_>> {
        match &self.kind {
            StmtKind::Expr(expr) => vec![NodeRef::Expr(expr)],
            StmtKind::Let { ty, init, .. } => {
                let mut children: Vec<NodeRef<'_>> = ty.iter().map(NodeRef::Type).collect();
                children.extend(init.iter().map(NodeRef::Expr));
                children
            }
            StmtKind::Use(_) => Vec::new(),
        }
    }
}

/// All nodes below and including `root`, parents before children
#[must_use]
pub fn preorder(root: NodeRef<'_>) -> Vec<NodeRef<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let children = node.child_nodes();
        out.push(node);
        stack.extend(children.into_iter().rev());
    }
    out
}
