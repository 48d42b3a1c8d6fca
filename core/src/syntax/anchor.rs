use core::ops::Range;

/// Byte range into a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Span(pub Range<usize>);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span(start..end)
    }

    pub fn start(&self) -> usize {
        self.0.start
    }

    pub fn end(&self) -> usize {
        self.0.end
    }

    pub fn len(&self) -> usize {
        self.0.end.saturating_sub(self.0.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both `self` and `other`.
    pub fn combine(&self, other: &Span) -> Span {
        Span(self.0.start.min(other.0.start)..self.0.end.max(other.0.end))
    }

    pub fn str_of<'a>(&self, source: &'a str) -> &'a str {
        &source[self.0.clone()]
    }
}

/// Source location attached to every lexical and expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Anchor {
    pub file: u32,
    pub span: Span,
    /// 1-based source line.
    pub line: u32,
}

impl Anchor {
    pub fn new(file: u32, span: Span, line: u32) -> Self {
        Self { file, span, line }
    }

    /// Anchor spanning from `self` to `other`. The line of `self` wins.
    pub fn to(&self, other: &Anchor) -> Anchor {
        Anchor {
            file: self.file,
            span: self.span.combine(&other.span),
            line: self.line,
        }
    }
}
