//! Programmatic AST construction
//!
//! Every node created through [`AstBuilder`] gets a fresh, strictly increasing
//! span, so diagnostics produced for a hand-built tree still point at
//! distinguishable locations.

use crate::ast::{
    Expr, ExprKind, FieldDecl, FieldInit, FunctDecl, Ident, Item, NamespaceDecl, ParamDecl, Path,
    SourceFile, Stmt, StmtKind, StructDecl, TypeExpr, TypeExprKind, UseDecl,
};
use cn_span::{FileId, FileSpan, Span};

/// Helper to build AST
#[derive(Debug)]
pub struct AstBuilder {
    file: FileId,
    cursor: u32,
}

impl AstBuilder {
    /// Creates a new AST builder for `file`
    #[must_use]
    pub fn new(file: FileId) -> Self {
        Self { file, cursor: 0 }
    }

    /// Next synthetic span
    pub fn span(&mut self) -> FileSpan {
        let start = self.cursor;
        self.cursor += 2;
        FileSpan::new(self.file, Span::new(start, start + 1))
    }

    pub fn ident(&mut self, text: &str) -> Ident {
        Ident {
            text: text.to_string(),
            span: self.span(),
        }
    }

    /// Parse `A::B` (or `::A::B` for an absolute path)
    pub fn path(&mut self, text: &str) -> Path {
        let span = self.span();
        let (absolute, rest) = match text.strip_prefix("::") {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let segments = rest.split("::").map(|segment| self.ident(segment)).collect();
        Path {
            segments,
            absolute,
            span,
        }
    }

    // Types

    pub fn ty(&mut self, path: &str) -> TypeExpr {
        let path = self.path(path);
        self.type_expr(TypeExprKind::Path(path))
    }

    pub fn ty_ptr(&mut self, mutable: bool, pointee: TypeExpr) -> TypeExpr {
        self.type_expr(TypeExprKind::Pointer {
            mutable,
            lifetime: None,
            pointee: Box::new(pointee),
        })
    }

    /// Pointer type carrying a lifetime annotation
    pub fn ty_ptr_lifetime(
        &mut self,
        mutable: bool,
        lifetime: &str,
        pointee: TypeExpr,
    ) -> TypeExpr {
        let lifetime = self.ident(lifetime);
        self.type_expr(TypeExprKind::Pointer {
            mutable,
            lifetime: Some(lifetime),
            pointee: Box::new(pointee),
        })
    }

    pub fn ty_tuple(&mut self, elements: Vec<TypeExpr>) -> TypeExpr {
        self.type_expr(TypeExprKind::Tuple(elements))
    }

    pub fn ty_funct(&mut self, params: Vec<TypeExpr>, returns: Option<TypeExpr>) -> TypeExpr {
        self.type_expr(TypeExprKind::Funct {
            params,
            returns: returns.map(Box::new),
        })
    }

    fn type_expr(&mut self, kind: TypeExprKind) -> TypeExpr {
        TypeExpr {
            kind,
            span: self.span(),
        }
    }

    // Expressions

    pub fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr {
            kind,
            span: self.span(),
        }
    }

    pub fn int(&mut self, value: i64) -> Expr {
        self.expr(ExprKind::Int(value))
    }

    pub fn bool(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::Bool(value))
    }

    pub fn unit(&mut self) -> Expr {
        self.expr(ExprKind::Tuple(Vec::new()))
    }

    pub fn tuple(&mut self, elements: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Tuple(elements))
    }

    pub fn name(&mut self, path: &str) -> Expr {
        let path = self.path(path);
        self.expr(ExprKind::Name(path))
    }

    pub fn field(&mut self, base: Expr, field: &str) -> Expr {
        let field = self.ident(field);
        self.expr(ExprKind::Field {
            base: Box::new(base),
            field,
        })
    }

    pub fn addr(&mut self, mutable: bool, operand: Expr) -> Expr {
        self.expr(ExprKind::AddressOf {
            mutable,
            operand: Box::new(operand),
        })
    }

    pub fn deref(&mut self, operand: Expr) -> Expr {
        self.expr(ExprKind::Deref(Box::new(operand)))
    }

    pub fn call(&mut self, callee: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            callee: Box::new(callee),
            args,
        })
    }

    pub fn if_(&mut self, condition: Expr, then_branch: Expr, else_branch: Option<Expr>) -> Expr {
        self.expr(ExprKind::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        })
    }

    pub fn while_(&mut self, condition: Expr, body: Expr) -> Expr {
        self.expr(ExprKind::While {
            condition: Box::new(condition),
            body: Box::new(body),
        })
    }

    pub fn assign(&mut self, target: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    pub fn ret(&mut self, value: Option<Expr>) -> Expr {
        self.expr(ExprKind::Return(value.map(Box::new)))
    }

    pub fn struct_lit(&mut self, path: &str, fields: Vec<(&str, Expr)>) -> Expr {
        let path = self.path(path);
        let fields = fields
            .into_iter()
            .map(|(name, value)| FieldInit {
                name: self.ident(name),
                value,
                span: self.span(),
            })
            .collect();
        self.expr(ExprKind::StructLit { path, fields })
    }

    /// Block whose statements are the given expressions
    pub fn block(&mut self, exprs: Vec<Expr>) -> Expr {
        let stmts = exprs.into_iter().map(|expr| self.stmt_expr(expr)).collect();
        self.expr(ExprKind::Block(stmts))
    }

    pub fn block_stmts(&mut self, stmts: Vec<Stmt>) -> Expr {
        self.expr(ExprKind::Block(stmts))
    }

    // Statements

    pub fn stmt_expr(&mut self, expr: Expr) -> Stmt {
        let span = expr.span;
        Stmt {
            kind: StmtKind::Expr(expr),
            span,
        }
    }

    pub fn let_(
        &mut self,
        name: &str,
        mutable: bool,
        ty: Option<TypeExpr>,
        init: Option<Expr>,
    ) -> Stmt {
        let name = self.ident(name);
        Stmt {
            kind: StmtKind::Let {
                name,
                mutable,
                ty,
                init,
            },
            span: self.span(),
        }
    }

    pub fn use_stmt(&mut self, path: &str) -> Stmt {
        let path = self.path(path);
        Stmt {
            kind: StmtKind::Use(path),
            span: self.span(),
        }
    }

    // Items

    pub fn struct_(&mut self, name: &str, fields: Vec<(&str, TypeExpr)>) -> Item {
        let name = self.ident(name);
        let fields = fields
            .into_iter()
            .map(|(field, ty)| FieldDecl {
                name: self.ident(field),
                ty,
                span: self.span(),
            })
            .collect();
        Item::Struct(StructDecl {
            name,
            fields,
            span: self.span(),
        })
    }

    pub fn param(&mut self, name: &str, mutable: bool, ty: TypeExpr) -> ParamDecl {
        ParamDecl {
            name: self.ident(name),
            mutable,
            ty,
            span: self.span(),
        }
    }

    pub fn funct(
        &mut self,
        name: &str,
        params: Vec<ParamDecl>,
        returns: Option<TypeExpr>,
        body: Expr,
    ) -> Item {
        self.funct_decl(name, params, returns, Some(body))
    }

    /// Function declared without a body
    pub fn extern_funct(
        &mut self,
        name: &str,
        params: Vec<ParamDecl>,
        returns: Option<TypeExpr>,
    ) -> Item {
        self.funct_decl(name, params, returns, None)
    }

    fn funct_decl(
        &mut self,
        name: &str,
        params: Vec<ParamDecl>,
        returns: Option<TypeExpr>,
        body: Option<Expr>,
    ) -> Item {
        let name = self.ident(name);
        Item::Funct(FunctDecl {
            name,
            params,
            returns,
            body,
            span: self.span(),
        })
    }

    pub fn namespace(&mut self, name: &str, items: Vec<Item>) -> Item {
        let name = self.path(name);
        Item::Namespace(NamespaceDecl {
            name,
            items,
            span: self.span(),
        })
    }

    /// `use P::*;`
    pub fn use_all(&mut self, path: &str) -> Item {
        let path = self.path(path);
        Item::Use(UseDecl {
            path,
            items: None,
            span: self.span(),
        })
    }

    /// `use P::* { items }`
    pub fn use_block(&mut self, path: &str, items: Vec<Item>) -> Item {
        let path = self.path(path);
        Item::Use(UseDecl {
            path,
            items: Some(items),
            span: self.span(),
        })
    }

    pub fn file(&mut self, items: Vec<Item>) -> SourceFile {
        let end = self.cursor;
        SourceFile {
            file: self.file,
            items,
            span: FileSpan::new(self.file, Span::new(0, end)),
        }
    }
}
