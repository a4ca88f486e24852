//! String interning for symbols

pub use lasso::Spur as Symbol;
use lasso::ThreadedRodeo;
use std::sync::Arc;

/// Thread-safe string interner
///
/// Cloning is cheap: clones share the same underlying table.
#[derive(Clone)]
pub struct Interner {
    inner: Arc<ThreadedRodeo>,
}

impl Interner {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ThreadedRodeo::new()),
        }
    }

    pub fn intern(&self, s: &str) -> Symbol {
        self.inner.get_or_intern(s)
    }

    /// Look up a string without interning it
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.inner.get(s)
    }

    pub fn resolve(&self, sym: &Symbol) -> &str {
        self.inner.resolve(sym)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner")
            .field("len", &self.inner.len())
            .finish()
    }
}
