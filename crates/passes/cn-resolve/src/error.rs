//! Error types for declaration lookup

use cn_diagnostic::{Diagnostic, ErrorCode};
use cn_span::FileSpan;

/// Errors that occur while registering or looking up declarations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// No declaration is visible under this name
    #[error("cannot find `{name}` in this scope")]
    Undeclared {
        /// The name that was not found
        name: String,
        /// Where the name was used
        span: FileSpan,
        /// Similar declared names
        suggestions: Vec<String>,
    },

    /// More than one declaration is visible under this name
    #[error("ambiguous name `{name}`: candidates are {}", candidate_list(.candidates))]
    Ambiguous {
        /// The name as written
        name: String,
        /// Fully qualified candidates, in probing order
        candidates: Vec<String>,
        /// Where the name was used
        span: FileSpan,
    },

    /// The declaration exists but is of the wrong kind
    #[error("expected {expected}, found {found} `{name}`")]
    WrongKind {
        /// The name as written
        name: String,
        /// Required kind
        expected: &'static str,
        /// Kind actually found
        found: &'static str,
        /// Where the name was used
        span: FileSpan,
    },

    /// The name is already bound
    #[error("{}", duplicate_message(.name, .first.is_none()))]
    Duplicate {
        /// Fully qualified name
        name: String,
        /// First declaration; `None` when the name is a builtin
        first: Option<FileSpan>,
        /// Rejected declaration
        second: FileSpan,
    },
}

impl ResolutionError {
    /// Diagnostic taxonomy code
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Undeclared { .. } => ErrorCode::Undeclared,
            Self::Ambiguous { .. } => ErrorCode::AmbiguousDeclaration,
            Self::WrongKind { .. } => ErrorCode::WrongDeclarationKind,
            Self::Duplicate { .. } => ErrorCode::DuplicateDeclaration,
        }
    }

    /// Location the diagnostic points at
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Undeclared { span, .. }
            | Self::Ambiguous { span, .. }
            | Self::WrongKind { span, .. } => {
                *span
            }
            Self::Duplicate { second, .. } => *second,
        }
    }

    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.code(), self.to_string(), self.span());
        match self {
            Self::Duplicate {
                first: Some(first), ..
            } => diagnostic.with_inner("first declared here", *first),
            Self::Undeclared {
                suggestions, span, ..
            } if !suggestions.is_empty() => {
                let names: Vec<_> = suggestions.iter().map(|name| format!("`{name}`")).collect();
                diagnostic.with_inner(format!("did you mean {}?", names.join(" or ")), *span)
            }
            _ => diagnostic,
        }
    }
}

fn duplicate_message(name: &str, builtin: bool) -> String {
    if builtin {
        format!("`{name}` is a builtin type and cannot be redeclared")
    } else {
        format!("`{name}` is declared more than once")
    }
}

/// `` `a` and `b` `` for two candidates, `` `a`, `b` ...and N other `` beyond
fn candidate_list(candidates: &[String]) -> String {
    match candidates {
        [first, second] => format!("`{first}` and `{second}`"),
        [first, second, rest @ ..] => format!("`{first}`, `{second}` ...and {} other", rest.len()),
        [only] => format!("`{only}`"),
        [] => String::new(),
    }
}

/// Declared names within a small edit distance of `target`, closest first
pub fn suggest<'a>(target: &str, available: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let limit = (target.chars().count() / 3).max(1);
    let mut scored: Vec<(&str, usize)> = available
        .into_iter()
        .filter(|candidate| *candidate != target)
        .map(|candidate| (candidate, levenshtein_distance(target, candidate)))
        .filter(|(_, distance)| *distance <= limit)
        .collect();
    scored.sort_by_key(|(_, distance)| *distance);

    let mut names: Vec<String> = Vec::new();
    for (name, _) in scored {
        if names.len() == 3 {
            break;
        }
        if !names.iter().any(|known| known == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn levenshtein_distance(source: &str, target: &str) -> usize {
    let target: Vec<char> = target.chars().collect();
    let mut previous: Vec<usize> = (0..=target.len()).collect();
    for (idx, source_char) in source.chars().enumerate() {
        let mut current = vec![idx + 1; target.len() + 1];
        for (jdx, target_char) in target.iter().enumerate() {
            let cost = usize::from(source_char != *target_char);
            current[jdx + 1] = (previous[jdx + 1] + 1)
                .min(current[jdx] + 1)
                .min(previous[jdx] + cost);
        }
        previous = current;
    }
    previous[target.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cn_span::{FileId, Span};

    fn span() -> FileSpan {
        FileSpan::new(FileId::new(0), Span::new(4, 5))
    }

    fn ambiguous(candidates: &[&str]) -> String {
        ResolutionError::Ambiguous {
            name: "Bar".to_string(),
            candidates: candidates.iter().map(ToString::to_string).collect(),
            span: span(),
        }
        .to_string()
    }

    #[test]
    fn ambiguity_names_both_candidates() {
        assert_eq!(
            ambiguous(&["a::Bar", "b::Bar"]),
            "ambiguous name `Bar`: candidates are `a::Bar` and `b::Bar`"
        );
    }

    #[test]
    fn ambiguity_counts_the_rest() {
        let text = ambiguous(&["a::Bar", "b::Bar", "c::Bar", "d::Bar"]);
        assert_eq!(
            text,
            "ambiguous name `Bar`: candidates are `a::Bar`, `b::Bar` ...and 2 other"
        );
        assert!(ambiguous(&["a::Bar", "b::Bar", "c::Bar"]).ends_with("...and 1 other"));
    }

    #[test]
    fn duplicate_points_at_first_declaration() {
        let first = FileSpan::new(FileId::new(0), Span::new(0, 1));
        let diag = ResolutionError::Duplicate {
            name: "A".to_string(),
            first: Some(first),
            second: span(),
        }
        .to_diagnostic();
        assert_eq!(diag.code, ErrorCode::DuplicateDeclaration);
        assert_eq!(diag.primary_span(), Some(span()));
        assert_eq!(diag.inner.map(|inner| inner.spans), Some(vec![first]));
    }

    #[test]
    fn builtin_duplicate_has_no_note() {
        let diag = ResolutionError::Duplicate {
            name: "int".to_string(),
            first: None,
            second: span(),
        }
        .to_diagnostic();
        assert_eq!(diag.message, "`int` is a builtin type and cannot be redeclared");
        assert!(diag.inner.is_none());
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("abc", "def"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn suggestions_are_close_names() {
        let found = suggest("Pont", ["Point", "Line", "Pointer"]);
        assert_eq!(found, vec!["Point".to_string()]);
    }
}
