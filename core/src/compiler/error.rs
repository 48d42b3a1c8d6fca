//! Errors returned by [`Compiler::finish`](super::Compiler::finish).

use thiserror::Error;

use crate::diagnostics::{Diagnostic, Severity};
use crate::emit::ReferencableError;

#[derive(Debug, Error)]
pub enum Error {
    /// Source errors. Warnings recorded alongside them are kept.
    #[error("compilation failed with {} error(s)", error_count(.diagnostics))]
    Compilation { diagnostics: Vec<Diagnostic> },

    /// A label or temporary was left unresolved or assigned twice.
    #[error("internal code generation error: {0}")]
    Internal(#[from] ReferencableError),
}

fn error_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count()
}

impl Error {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Error::Compilation { diagnostics } => diagnostics,
            Error::Internal(_) => &[],
        }
    }
}
