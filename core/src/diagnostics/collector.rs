use tracing::debug;

use super::{Context, Diagnostic, ErrorKind, Severity};
use crate::syntax::Anchor;

/// Shared sink for diagnostics of one compilation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `kind` at `anchor` with the kind's default severity.
    pub fn report(&mut self, anchor: &Anchor, kind: ErrorKind) {
        self.push(Diagnostic::new(anchor, kind));
    }

    pub fn report_with(&mut self, anchor: &Anchor, kind: ErrorKind, context: &[Context]) {
        let mut diagnostic = Diagnostic::new(anchor, kind);
        diagnostic.related = context.iter().map(Context::to_related_info).collect();
        self.push(diagnostic);
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        debug!(
            code = diagnostic.code,
            line = diagnostic.anchor.line,
            message = %diagnostic.message,
            "Recorded diagnostic"
        );
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// True if any recorded diagnostic matches `predicate`.
    pub fn any(&self, predicate: impl Fn(&ErrorKind) -> bool) -> bool {
        self.items.iter().any(|d| predicate(&d.kind))
    }

    pub fn append(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
