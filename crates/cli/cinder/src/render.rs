//! Terminal rendering of diagnostics

use cn_diagnostic::{Diagnostic, Severity};
use colored::Colorize;
use std::path::Path;

/// `error[resolve::undeclared]: message` followed by its locations
pub fn diagnostic(input: &Path, diagnostic: &Diagnostic) -> String {
    let label = match diagnostic.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Note => "note".cyan().bold(),
    };
    let mut out = format!(
        "{label}{}: {}",
        format!("[{}]", diagnostic.code).bold(),
        diagnostic.message.bold()
    );
    for span in &diagnostic.spans {
        out.push_str(&format!("\n  {} {}:{span}", "-->".blue(), input.display()));
    }
    if let Some(inner) = &diagnostic.inner {
        out.push_str(&format!("\n  {} {}", "=".blue(), inner.message));
        for span in &inner.spans {
            out.push_str(&format!("\n    {} {}:{span}", "-->".blue(), input.display()));
        }
    }
    out
}
