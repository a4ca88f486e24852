//! Session-wide declaration table

use crate::error::{suggest, ResolutionError};
use crate::name::Name;
use crate::scope::UseScope;
use cn_intern::Interner;
use cn_ir::{FunctId, IrFunct, IrNames, IrStruct};
use cn_span::FileSpan;
use cn_ty::{StructId, StructNames};
use indexmap::IndexMap;
use tracing::debug;

/// Kind of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    /// Struct declaration
    Struct,
    /// Function declaration
    Funct,
}

impl DeclKind {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Funct => "function",
        }
    }
}

/// Handle to a declaration; stable for the whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef {
    /// Declaration kind
    pub kind: DeclKind,
    /// Index into the list of that kind
    pub index: u32,
}

impl DeclRef {
    #[must_use]
    pub fn as_struct(self) -> Option<StructId> {
        (self.kind == DeclKind::Struct).then_some(StructId(self.index))
    }

    #[must_use]
    pub fn as_funct(self) -> Option<FunctId> {
        (self.kind == DeclKind::Funct).then_some(FunctId(self.index))
    }
}

impl From<StructId> for DeclRef {
    fn from(id: StructId) -> Self {
        Self {
            kind: DeclKind::Struct,
            index: id.0,
        }
    }
}

impl From<FunctId> for DeclRef {
    fn from(id: FunctId) -> Self {
        Self {
            kind: DeclKind::Funct,
            index: id.0,
        }
    }
}

/// Registry of every struct and function declared in a session
///
/// A name is bound at most once; a second registration is rejected and
/// leaves the table unchanged. Builtin scalar structs `int` and `bool` are
/// registered at construction.
#[derive(Debug)]
pub struct DeclTable {
    interner: Interner,
    names: IndexMap<Name, DeclRef>,
    structs: Vec<IrStruct>,
    struct_names: Vec<Name>,
    functs: Vec<IrFunct>,
    funct_names: Vec<Name>,
}

impl DeclTable {
    /// Builtin integer type
    pub const INT: StructId = StructId(0);
    /// Builtin boolean type
    pub const BOOL: StructId = StructId(1);

    #[must_use]
    pub fn new(interner: Interner) -> Self {
        let mut table = Self {
            interner,
            names: IndexMap::new(),
            structs: Vec::new(),
            struct_names: Vec::new(),
            functs: Vec::new(),
            funct_names: Vec::new(),
        };
        for builtin in ["int", "bool"] {
            let name = Name::parse(&table.interner, builtin);
            let id = StructId(table.structs.len() as u32);
            table.names.insert(name.clone(), id.into());
            table.structs.push(IrStruct::new(FileSpan::default()));
            table.struct_names.push(name);
        }
        table
    }

    #[must_use]
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    fn check_unbound(&self, name: &Name, span: FileSpan) -> Result<(), ResolutionError> {
        match self.names.get(name) {
            Some(existing) => Err(ResolutionError::Duplicate {
                name: name.display(&self.interner),
                first: self.span_of(*existing),
                second: span,
            }),
            None => Ok(()),
        }
    }

    /// Register a struct under its fully scoped name
    pub fn create_struct(
        &mut self,
        name: Name,
        span: FileSpan,
    ) -> Result<StructId, ResolutionError> {
        self.check_unbound(&name, span)?;
        let id = StructId(self.structs.len() as u32);
        debug!(name = %name.display(&self.interner), %id, "declared struct");
        self.names.insert(name.clone(), id.into());
        self.structs.push(IrStruct::new(span));
        self.struct_names.push(name);
        Ok(id)
    }

    /// Register a function under its fully scoped name
    pub fn create_funct(&mut self, name: Name, span: FileSpan) -> Result<FunctId, ResolutionError> {
        self.check_unbound(&name, span)?;
        let id = FunctId(self.functs.len() as u32);
        debug!(name = %name.display(&self.interner), %id, "declared function");
        self.names.insert(name.clone(), id.into());
        self.functs.push(IrFunct::new(span));
        self.funct_names.push(name);
        Ok(id)
    }

    /// Exact lookup of a fully scoped name
    #[must_use]
    pub fn get(&self, name: &Name) -> Option<DeclRef> {
        self.names.get(name).copied()
    }

    /// Every declaration `name` may refer to under `scope`
    ///
    /// A relative name is tried under each directive prefix, innermost
    /// first, and then as written. An absolute name is only tried as
    /// written. Candidates reaching the same declaration count once.
    #[must_use]
    pub fn get_decls_with_use_directives(
        &self,
        name: &Name,
        absolute: bool,
        scope: &UseScope,
    ) -> Vec<DeclRef> {
        let mut found = Vec::new();
        let mut try_candidate = |candidate: &Name| {
            if let Some(decl) = self.get(candidate)
                && !found.contains(&decl)
            {
                found.push(decl);
            }
        };
        if !absolute {
            for prefix in scope.iter() {
                try_candidate(&prefix.join(name));
            }
        }
        try_candidate(name);
        found
    }

    /// Require exactly one candidate
    pub fn validate_single_decl(
        &self,
        candidates: &[DeclRef],
        name: &Name,
        span: FileSpan,
    ) -> Result<DeclRef, ResolutionError> {
        match candidates {
            [only] => Ok(*only),
            [] => Err(ResolutionError::Undeclared {
                name: name.display(&self.interner),
                span,
                suggestions: self.suggestions(name),
            }),
            _ => Err(ResolutionError::Ambiguous {
                name: name.display(&self.interner),
                candidates: candidates
                    .iter()
                    .map(|decl| self.display_name(*decl))
                    .collect(),
                span,
            }),
        }
    }

    /// Require a declaration that names a type
    pub fn validate_as_type(
        &self,
        decl: DeclRef,
        name: &Name,
        span: FileSpan,
    ) -> Result<StructId, ResolutionError> {
        decl.as_struct().ok_or_else(|| ResolutionError::WrongKind {
            name: name.display(&self.interner),
            expected: "type",
            found: decl.kind.describe(),
            span,
        })
    }

    /// Lookup plus single-candidate validation
    pub fn resolve(
        &self,
        name: &Name,
        absolute: bool,
        scope: &UseScope,
        span: FileSpan,
    ) -> Result<DeclRef, ResolutionError> {
        let candidates = self.get_decls_with_use_directives(name, absolute, scope);
        self.validate_single_decl(&candidates, name, span)
    }

    /// Lookup of a name used as a type
    pub fn resolve_type(
        &self,
        name: &Name,
        absolute: bool,
        scope: &UseScope,
        span: FileSpan,
    ) -> Result<StructId, ResolutionError> {
        let decl = self.resolve(name, absolute, scope, span)?;
        self.validate_as_type(decl, name, span)
    }

    fn suggestions(&self, name: &Name) -> Vec<String> {
        let Some(last) = name.last() else {
            return Vec::new();
        };
        let target = self.interner.resolve(&last);
        suggest(
            target,
            self.names
                .keys()
                .filter_map(|known| known.last())
                .map(|segment| self.interner.resolve(&segment)),
        )
    }

    /// Fully scoped name of a declaration
    #[must_use]
    pub fn name_of(&self, decl: DeclRef) -> &Name {
        match decl.kind {
            DeclKind::Struct => &self.struct_names[decl.index as usize],
            DeclKind::Funct => &self.funct_names[decl.index as usize],
        }
    }

    #[must_use]
    pub fn display_name(&self, decl: DeclRef) -> String {
        self.name_of(decl).display(&self.interner)
    }

    /// Declaration site; `None` for builtins
    #[must_use]
    pub fn span_of(&self, decl: DeclRef) -> Option<FileSpan> {
        match decl.kind {
            DeclKind::Struct if decl.index <= Self::BOOL.0 => None,
            DeclKind::Struct => Some(self.structs[decl.index as usize].span),
            DeclKind::Funct => Some(self.functs[decl.index as usize].span),
        }
    }

    #[must_use]
    pub fn struct_decl(&self, id: StructId) -> &IrStruct {
        &self.structs[id.index()]
    }

    pub fn struct_decl_mut(&mut self, id: StructId) -> &mut IrStruct {
        &mut self.structs[id.index()]
    }

    #[must_use]
    pub fn funct(&self, id: FunctId) -> &IrFunct {
        &self.functs[id.index()]
    }

    pub fn funct_mut(&mut self, id: FunctId) -> &mut IrFunct {
        &mut self.functs[id.index()]
    }

    #[must_use]
    pub fn structs(&self) -> &[IrStruct] {
        &self.structs
    }

    #[must_use]
    pub fn functs(&self) -> &[IrFunct] {
        &self.functs
    }
}

impl StructNames for DeclTable {
    fn struct_name(&self, id: StructId) -> String {
        self.display_name(id.into())
    }
}

impl IrNames for DeclTable {
    fn funct_name(&self, id: FunctId) -> String {
        self.display_name(id.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cn_diagnostic::ErrorCode;
    use cn_span::{FileId, Span};

    fn span(start: u32) -> FileSpan {
        FileSpan::new(FileId::new(0), Span::new(start, start + 1))
    }

    fn table() -> DeclTable {
        DeclTable::new(Interner::new())
    }

    fn name(table: &DeclTable, text: &str) -> Name {
        Name::parse(table.interner(), text)
    }

    #[test]
    fn builtins_are_registered() {
        let table = table();
        assert_eq!(table.get(&name(&table, "int")), Some(DeclTable::INT.into()));
        assert_eq!(table.get(&name(&table, "bool")), Some(DeclTable::BOOL.into()));
        assert_eq!(table.struct_name(DeclTable::BOOL), "bool");
    }

    #[test]
    fn duplicate_struct_is_rejected_once() {
        let mut table = table();
        let path = name(&table, "geo::Point");
        let first = table.create_struct(path.clone(), span(0)).unwrap();
        let err = table.create_struct(path.clone(), span(10)).unwrap_err();

        assert_eq!(err.code(), ErrorCode::DuplicateDeclaration);
        assert_eq!(
            err,
            ResolutionError::Duplicate {
                name: "geo::Point".to_string(),
                first: Some(span(0)),
                second: span(10),
            }
        );
        assert_eq!(table.get(&path), Some(first.into()));
        assert_eq!(table.structs().len(), 3);
    }

    #[test]
    fn struct_and_funct_share_the_namespace() {
        let mut table = table();
        table.create_funct(name(&table, "f"), span(0)).unwrap();
        assert!(table.create_struct(name(&table, "f"), span(2)).is_err());
    }

    #[test]
    fn directives_extend_relative_lookup() {
        let mut table = table();
        let bar = table.create_struct(name(&table, "Foo::Bar"), span(0)).unwrap();
        let scope = UseScope::new().with(name(&table, "Foo"));

        let found = table.get_decls_with_use_directives(&name(&table, "Bar"), false, &scope);
        assert_eq!(found, vec![bar.into()]);

        let found = table.get_decls_with_use_directives(&name(&table, "Bar"), true, &scope);
        assert!(found.is_empty());
        let bar = name(&table, "Bar");
        let found = table.get_decls_with_use_directives(&bar, false, &UseScope::new());
        assert!(found.is_empty());
    }

    #[test]
    fn repeated_directive_counts_once() {
        let mut table = table();
        table.create_struct(name(&table, "Foo::Bar"), span(0)).unwrap();
        let scope = UseScope::new()
            .with(name(&table, "Foo"))
            .with(name(&table, "Foo"));
        let found = table.get_decls_with_use_directives(&name(&table, "Bar"), false, &scope);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn ambiguous_lookup_lists_candidates() {
        let mut table = table();
        for prefix in ["a", "b", "c"] {
            table
                .create_struct(name(&table, &format!("{prefix}::Bar")), span(0))
                .unwrap();
        }
        let scope = UseScope::new()
            .with(name(&table, "a"))
            .with(name(&table, "b"))
            .with(name(&table, "c"));
        let err = table
            .resolve(&name(&table, "Bar"), false, &scope, span(9))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AmbiguousDeclaration);
        assert_eq!(
            err.to_string(),
            "ambiguous name `Bar`: candidates are `c::Bar`, `b::Bar` ...and 1 other"
        );
    }

    #[test]
    fn undeclared_suggests_close_names() {
        let mut table = table();
        table.create_struct(name(&table, "Point"), span(0)).unwrap();
        let err = table
            .resolve(&name(&table, "Pont"), false, &UseScope::new(), span(3))
            .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::Undeclared {
                name: "Pont".to_string(),
                span: span(3),
                suggestions: vec!["Point".to_string()],
            }
        );
    }

    #[test]
    fn function_is_not_a_type() {
        let mut table = table();
        let f = table.create_funct(name(&table, "f"), span(0)).unwrap();
        let err = table
            .resolve_type(&name(&table, "f"), false, &UseScope::new(), span(4))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::WrongDeclarationKind);
        assert_eq!(err.to_string(), "expected type, found function `f`");
        assert_eq!(table.display_name(f.into()), "f");
    }
}
