//! Scoped names

use cn_intern::{Interner, Symbol};

/// A `::`-separated path of identifiers
///
/// The empty name is the root namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Name(Vec<Symbol>);

impl Name {
    /// The root namespace
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Intern every segment of `a::b::c`
    #[must_use]
    pub fn parse(interner: &Interner, text: &str) -> Self {
        Self(
            text.split("::")
                .filter(|segment| !segment.is_empty())
                .map(|segment| interner.intern(segment))
                .collect(),
        )
    }

    /// `self::other`
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut segments = self.0.clone();
        segments.extend_from_slice(&other.0);
        Self(segments)
    }

    /// `self::segment`
    #[must_use]
    pub fn child(&self, segment: Symbol) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    #[must_use]
    pub fn last(&self) -> Option<Symbol> {
        self.0.last().copied()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as `a::b::c`
    #[must_use]
    pub fn display(&self, interner: &Interner) -> String {
        self.0
            .iter()
            .map(|segment| interner.resolve(segment))
            .collect::<Vec<_>>()
            .join("::")
    }
}

impl FromIterator<Symbol> for Name {
    fn from_iter<T: IntoIterator<Item = Symbol>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
