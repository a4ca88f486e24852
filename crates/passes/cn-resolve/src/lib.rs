//! Declarations and name lookup
//!
//! The [`DeclTable`] maps fully scoped [`Name`]s to struct and function
//! declarations. Unqualified lookups go through the import-all directives
//! of a [`UseScope`]; the table reports every candidate and leaves it to
//! the caller to demand exactly one.

pub mod error;
pub mod name;
pub mod scope;
pub mod table;

pub use error::ResolutionError;
pub use name::Name;
pub use scope::UseScope;
pub use table::{DeclKind, DeclRef, DeclTable};
