//! Structured diagnostics
//!
//! The semantic core never formats or prints anything: every user-facing
//! problem becomes a [`Diagnostic`] record pushed into a [`Diagnostics`] sink,
//! and rendering is left to whoever consumes the records.
//!
//! Compiler defects are different. They are reported as [`InternalError`]
//! values and abort the session.

use cn_span::FileSpan;
use derive_more::Display;
use serde::Serialize;

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// Supplementary information
    #[display("note")]
    Note,
    /// Suspicious but accepted
    #[display("warning")]
    Warning,
    /// Compilation cannot produce usable output
    #[display("error")]
    Error,
}

/// Diagnostic taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    /// No declaration or local with this name is visible
    Undeclared,
    /// Several declarations match an unqualified name
    AmbiguousDeclaration,
    /// A declaration of the wrong kind was referenced (e.g. a function used as a type)
    WrongDeclarationKind,
    /// A name was declared twice in the same scope
    DuplicateDeclaration,
    /// Two types that must agree do not
    IncompatibleTypes,
    /// A type could not be inferred
    InferenceImpossible,
    /// A call passes the wrong number of arguments
    WrongArgumentNumber,
    /// The target of an assignment is not writable
    CannotAssign,
    /// The operand of `&` has no address (or is not mutable enough)
    CannotAddress,
    /// The operand of `*` is not a pointer
    CannotDereference,
    /// A local is read before it was assigned
    UninitializedLocal,
    /// A compiler invariant was violated
    Internal,
}

impl ErrorCode {
    /// Stable machine-readable code
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undeclared => "resolve::undeclared",
            Self::AmbiguousDeclaration => "resolve::ambiguous",
            Self::WrongDeclarationKind => "resolve::wrong_kind",
            Self::DuplicateDeclaration => "resolve::duplicate",
            Self::IncompatibleTypes => "types::incompatible",
            Self::InferenceImpossible => "types::inference_impossible",
            Self::WrongArgumentNumber => "types::argument_count",
            Self::CannotAssign => "lower::cannot_assign",
            Self::CannotAddress => "lower::cannot_address",
            Self::CannotDereference => "lower::cannot_dereference",
            Self::UninitializedLocal => "lower::uninitialized_local",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nested message attached to a diagnostic (e.g. "first declared here")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InnerMessage {
    /// Message text
    pub message: String,
    /// Locations the message refers to
    pub spans: Vec<FileSpan>,
}

/// A single structured diagnostic record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Taxonomy code
    pub code: ErrorCode,
    /// Message text
    pub message: String,
    /// One or more primary locations
    pub spans: Vec<FileSpan>,
    /// Optional supplementary context
    pub inner: Option<Box<InnerMessage>>,
}

impl Diagnostic {
    /// Create an error diagnostic at a single location
    #[must_use]
    pub fn error(code: ErrorCode, message: impl Into<String>, span: FileSpan) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            spans: vec![span],
            inner: None,
        }
    }

    /// Attach a nested message
    #[must_use]
    pub fn with_inner(mut self, message: impl Into<String>, span: FileSpan) -> Self {
        self.inner = Some(Box::new(InnerMessage {
            message: message.into(),
            spans: vec![span],
        }));
        self
    }

    /// The first primary location
    #[must_use]
    pub fn primary_span(&self) -> Option<FileSpan> {
        self.spans.first().copied()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Append-only sink of diagnostics for one session
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.records.push(diagnostic);
    }

    /// Shorthand for pushing an error
    pub fn error(&mut self, code: ErrorCode, message: impl Into<String>, span: FileSpan) {
        self.push(Diagnostic::error(code, message, span));
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.records.iter().any(Diagnostic::is_error)
    }

    /// Number of records carrying `code`
    #[must_use]
    pub fn count(&self, code: ErrorCode) -> usize {
        self.records.iter().filter(|diag| diag.code == code).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.records.extend(iter);
    }
}

/// Violated compiler invariant
///
/// These are compiler defects, never user errors, and abort the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    /// A segment was finished without a terminator
    #[error("segment {segment} of function #{function} has no terminator")]
    MissingTerminator {
        /// Function index
        function: usize,
        /// Segment index
        segment: u32,
    },

    /// A terminator was set twice on the same segment
    #[error("segment {segment} of function #{function} already has a terminator")]
    DuplicateTerminator {
        /// Function index
        function: usize,
        /// Segment index
        segment: u32,
    },

    /// A terminator targets a segment that does not exist
    #[error("function #{function} branches to missing segment {target}")]
    DanglingSegment {
        /// Function index
        function: usize,
        /// Missing segment index
        target: u32,
    },

    /// An instruction or binding references a register that does not exist
    #[error("function #{function} references missing register {register}")]
    DanglingRegister {
        /// Function index
        function: usize,
        /// Missing register index
        register: u32,
    },

    /// A placeholder type reached finished IR
    #[error("register {register} of function #{function} still has a placeholder type")]
    UnresolvedPlaceholder {
        /// Function index
        function: usize,
        /// Register index
        register: u32,
    },

    /// Parameter count exceeds the register list
    #[error("function #{function} declares {param_count} parameters but has {registers} registers")]
    ParameterCount {
        /// Function index
        function: usize,
        /// Declared parameter count
        param_count: usize,
        /// Register count
        registers: usize,
    },
}

impl InternalError {
    /// Describe this defect as a diagnostic record
    #[must_use]
    pub fn to_diagnostic(&self, span: FileSpan) -> Diagnostic {
        Diagnostic::error(ErrorCode::Internal, format!("internal compiler error: {self}"), span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cn_span::{FileId, Span};

    fn span(start: u32) -> FileSpan {
        FileSpan::new(FileId::new(0), Span::new(start, start + 1))
    }

    #[test]
    fn builder_attaches_inner_message() {
        let diag =
            Diagnostic::error(ErrorCode::DuplicateDeclaration, "`A` declared twice", span(10))
                .with_inner("first declared here", span(2));

        assert_eq!(diag.primary_span(), Some(span(10)));
        let inner = diag.inner.as_ref().map(|inner| inner.spans.clone());
        assert_eq!(inner, Some(vec![span(2)]));
    }

    #[test]
    fn sink_counts_by_code() {
        let mut diags = Diagnostics::new();
        diags.error(ErrorCode::Undeclared, "no `x`", span(0));
        diags.error(ErrorCode::Undeclared, "no `y`", span(1));
        diags.error(ErrorCode::CannotAssign, "cannot assign", span(2));

        assert!(diags.has_errors());
        assert_eq!(diags.count(ErrorCode::Undeclared), 2);
        assert_eq!(diags.count(ErrorCode::InferenceImpossible), 0);
    }

    #[test]
    fn internal_error_message() {
        let err = InternalError::MissingTerminator {
            function: 3,
            segment: 1,
        };
        assert_eq!(err.to_string(), "segment 1 of function #3 has no terminator");
        assert_eq!(err.to_diagnostic(span(0)).code, ErrorCode::Internal);
    }
}
