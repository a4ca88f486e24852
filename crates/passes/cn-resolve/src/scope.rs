//! Lexically scoped use directives

use crate::name::Name;
use std::rc::Rc;

#[derive(Debug)]
struct Directive {
    prefix: Name,
    parent: Option<Rc<Directive>>,
}

/// The import-all directives active at one point of the program
///
/// A scope is an immutable list shared with the scopes it was extended
/// from. Extending returns a new scope and leaves the original untouched,
/// so a snapshot taken when a declaration is registered keeps exactly the
/// directives that were visible there.
#[derive(Debug, Clone, Default)]
pub struct UseScope {
    head: Option<Rc<Directive>>,
    len: usize,
}

impl UseScope {
    /// No directives
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// This scope plus `use prefix::*`
    #[must_use]
    pub fn with(&self, prefix: Name) -> Self {
        Self {
            head: Some(Rc::new(Directive {
                prefix,
                parent: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Directive prefixes, innermost first
    pub fn iter(&self) -> impl Iterator<Item = &Name> {
        std::iter::successors(self.head.as_deref(), |directive| directive.parent.as_deref())
            .map(|directive| &directive.prefix)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cn_intern::Interner;

    #[test]
    fn extending_leaves_snapshot_untouched() {
        let interner = Interner::new();
        let outer = UseScope::new().with(Name::parse(&interner, "a"));
        let inner = outer.with(Name::parse(&interner, "b"));

        assert_eq!(outer.len(), 1);
        assert_eq!(inner.len(), 2);
        let prefixes: Vec<_> = inner.iter().map(|name| name.display(&interner)).collect();
        assert_eq!(prefixes, vec!["b", "a"]);
        let prefixes: Vec<_> = outer.iter().map(|name| name.display(&interner)).collect();
        assert_eq!(prefixes, vec!["a"]);
    }
}
