//! Top-level separator scanning (TrySub).
//!
//! A single left-to-right pass over a token slice with an explicit stack of
//! open brackets and pending ternary `?`. Every higher level construct
//! (tuple, lambda, assignment, ternary, sequence) finds its split point
//! through here instead of a grammar.

use bitflags::bitflags;

use crate::diagnostics::{Diagnostics, ErrorKind};
use crate::syntax::{Lexical, LexicalType};

bitflags! {
    /// Separator classes a scan can stop at.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct SplitFlag: u16 {
        const COMMA = 1;
        const SEMICOLON = 1 << 1;
        const ASSIGNMENT = 1 << 2;
        const LAMBDA = 1 << 3;
        const QUESTION = 1 << 4;
        const COLON = 1 << 5;
        const QUESTION_NULL = 1 << 6;
    }
}

impl SplitFlag {
    fn matches(self, kind: LexicalType) -> bool {
        match kind {
            LexicalType::Comma => self.contains(SplitFlag::COMMA),
            LexicalType::Semicolon => self.contains(SplitFlag::SEMICOLON),
            LexicalType::Lambda => self.contains(SplitFlag::LAMBDA),
            LexicalType::Question => self.contains(SplitFlag::QUESTION),
            LexicalType::Colon => self.contains(SplitFlag::COLON),
            LexicalType::QuestionNull => self.contains(SplitFlag::QUESTION_NULL),
            kind if kind.is_assignment() => self.contains(SplitFlag::ASSIGNMENT),
            _ => false,
        }
    }
}

/// Result of a separator scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// Index of the first top-level separator.
    Found(usize),
    NotFound,
    /// Brackets do not pair up; a diagnostic has been recorded.
    Unbalanced,
}

#[derive(Debug, Clone, Copy)]
enum Open {
    Bracket { kind: u8, index: usize },
    Question { index: usize },
}

const CLOSING: [&str; 3] = [")", "]", "}"];

/// Finds the first top-level token of class `flags`, validating bracket
/// pairing over the whole slice.
pub fn try_sub(tokens: &[Lexical<'_>], flags: SplitFlag, diagnostics: &mut Diagnostics) -> Split {
    let mut stack: Vec<Open> = Vec::new();
    let mut found = None;

    for (index, token) in tokens.iter().enumerate() {
        if let Some(kind) = token.kind.open_bracket() {
            stack.push(Open::Bracket { kind, index });
            continue;
        }
        if let Some(kind) = token.kind.close_bracket() {
            // A `?` left open inside the brackets is missing its `:`.
            if let Some(Open::Question { index }) = stack.last() {
                diagnostics.report(
                    &tokens[*index].anchor,
                    ErrorKind::MissingPairedSymbol { expected: ":" },
                );
                return Split::Unbalanced;
            }
            match stack.pop() {
                Some(Open::Bracket { kind: open, .. }) if open == kind => {}
                Some(Open::Bracket { kind: open, index }) => {
                    diagnostics.report(
                        &tokens[index].anchor,
                        ErrorKind::MissingPairedSymbol {
                            expected: CLOSING[open as usize],
                        },
                    );
                    return Split::Unbalanced;
                }
                _ => {
                    diagnostics.report(
                        &token.anchor,
                        ErrorKind::UnexpectedToken {
                            text: token.text.to_string(),
                        },
                    );
                    return Split::Unbalanced;
                }
            }
            continue;
        }

        if stack.is_empty() && found.is_none() && flags.matches(token.kind) {
            found = Some(index);
            continue;
        }
        match token.kind {
            LexicalType::Question => stack.push(Open::Question { index }),
            LexicalType::Colon => {
                if let Some(Open::Question { .. }) = stack.last() {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    // Unmatched top-level `?` is reported by the ternary parser as a missing `:`.
    while let Some(Open::Question { .. }) = stack.last() {
        stack.pop();
    }
    if let Some(Open::Bracket { kind, index }) = stack.last() {
        diagnostics.report(
            &tokens[*index].anchor,
            ErrorKind::MissingPairedSymbol {
                expected: CLOSING[*kind as usize],
            },
        );
        return Split::Unbalanced;
    }

    found.map_or(Split::NotFound, Split::Found)
}

/// Same scan as [`try_sub`] on a slice already known to be balanced.
pub fn find_split(tokens: &[Lexical<'_>], flags: SplitFlag) -> Option<usize> {
    let mut depth = 0usize;
    let mut questions = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        if token.kind.open_bracket().is_some() {
            depth += 1;
        } else if token.kind.close_bracket().is_some() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && questions.is_empty() && flags.matches(token.kind) {
            return Some(index);
        } else if token.kind == LexicalType::Question {
            questions.push(depth);
        } else if token.kind == LexicalType::Colon && questions.last() == Some(&depth) {
            questions.pop();
        }
    }
    None
}

/// Splits a balanced slice at every top-level occurrence of `flags`.
pub fn split_all<'t, 'a>(tokens: &'t [Lexical<'a>], flags: SplitFlag) -> Vec<&'t [Lexical<'a>]> {
    let mut parts = Vec::new();
    let mut rest = tokens;
    while let Some(index) = find_split(rest, flags) {
        parts.push(&rest[..index]);
        rest = &rest[index + 1..];
    }
    parts.push(rest);
    parts
}

/// Index of the bracket closing the one opened at `open`.
/// The symbol that closes the bracket token `open`.
pub fn closing_symbol(open: &Lexical<'_>) -> &'static str {
    open.kind
        .open_bracket()
        .map_or(")", |kind| CLOSING[kind as usize])
}

pub fn matching_close(tokens: &[Lexical<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        if token.kind.open_bracket().is_some() {
            depth += 1;
        } else if token.kind.close_bracket().is_some() {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn scan(source: &str, flags: SplitFlag) -> (Split, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let lines = tokenize(0, source, 4, &mut diagnostics);
        let split = try_sub(&lines[0].lexicals, flags, &mut diagnostics);
        (split, diagnostics)
    }

    #[test]
    fn test_first_top_level_comma() {
        let (split, _) = scan("f(a, b), c", SplitFlag::COMMA);
        assert_eq!(split, Split::Found(6));
    }

    #[test]
    fn test_separator_inside_brackets_is_ignored() {
        let (split, _) = scan("[a, b] + {c, d}", SplitFlag::COMMA);
        assert_eq!(split, Split::NotFound);
    }

    #[test]
    fn test_nested_ternary_colon() {
        // The first `:` closes the inner `?`, the second one is top level.
        let (split, _) = scan("a ? b ? c : d : e", SplitFlag::QUESTION);
        assert_eq!(split, Split::Found(1));
        let mut diagnostics = Diagnostics::new();
        let lines = tokenize(0, "b ? c : d : e", 4, &mut diagnostics);
        assert_eq!(
            try_sub(&lines[0].lexicals, SplitFlag::COLON, &mut diagnostics),
            Split::Found(5)
        );
    }

    #[test]
    fn test_question_invoke_counts_as_bracket() {
        let (split, _) = scan("d?(1, 2), 3", SplitFlag::COMMA);
        assert_eq!(split, Split::Found(6));
    }

    #[test]
    fn test_unbalanced_reports_missing_pair() {
        let (split, diagnostics) = scan("f(a, [b)", SplitFlag::COMMA);
        assert_eq!(split, Split::Unbalanced);
        assert!(diagnostics.any(|k| matches!(k, ErrorKind::MissingPairedSymbol { expected: "]" })));

        let (split, diagnostics) = scan("(a + b", SplitFlag::COMMA);
        assert_eq!(split, Split::Unbalanced);
        assert!(diagnostics.any(|k| matches!(k, ErrorKind::MissingPairedSymbol { expected: ")" })));
    }

    #[test]
    fn test_closing_symbol_follows_the_opener() {
        let mut diagnostics = Diagnostics::new();
        let lines = tokenize(0, "f(a) g?(a) x[1] y?[1] {1}", 4, &mut diagnostics);
        let closers: Vec<&str> = lines[0]
            .lexicals
            .iter()
            .filter(|token| token.kind.open_bracket().is_some())
            .map(closing_symbol)
            .collect();
        assert_eq!(closers, vec![")", ")", "]", "]", "}"]);
    }

    #[test]
    fn test_split_all_and_matching_close() {
        let mut diagnostics = Diagnostics::new();
        let lines = tokenize(0, "a, f(b, c), d", 4, &mut diagnostics);
        let parts = split_all(&lines[0].lexicals, SplitFlag::COMMA);
        assert_eq!(parts.iter().map(|p| p.len()).collect::<Vec<_>>(), vec![1, 6, 1]);
        assert_eq!(matching_close(&lines[0].lexicals, 3), Some(7));
    }
}
