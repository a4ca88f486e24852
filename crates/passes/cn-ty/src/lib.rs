//! Type model and inference engine
//!
//! [`Type`] is the closed set of types every later stage works with.
//! [`InferenceEngine`] solves the placeholder slots a function body
//! introduces while it is being lowered.

pub mod infer;
pub mod ty;

pub use infer::{InferError, InferenceEngine, Rule};
pub use ty::{Anonymous, Slot, StructId, StructNames, Type, TypeDisplay};
