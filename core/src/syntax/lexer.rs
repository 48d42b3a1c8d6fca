//! Reference line lexer.
//!
//! Production front-ends feed the compiler their own `Line`s. This lexer
//! exists so source text can be compiled directly (tests, tools, the
//! `rain` facade). Each non-blank physical line becomes one `Line`; `//`
//! starts a comment that runs to the end of the line.

use logos::Logos;
use tracing::trace;

use super::{Anchor, Lexical, LexicalType, Line, Span};
use crate::diagnostics::{Diagnostics, ErrorKind};

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\f\r]+")]
enum Token {
    #[regex(r"//[^\n]*", logos::skip)]
    Comment,

    #[token("(")]
    BracketLeft0,
    #[token("[")]
    BracketLeft1,
    #[token("{")]
    BracketLeft2,
    #[token(")")]
    BracketRight0,
    #[token("]")]
    BracketRight1,
    #[token("}")]
    BracketRight2,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    #[token("=")]
    Assignment,
    #[token("==")]
    Equals,
    #[token("=>")]
    Lambda,
    #[token("&")]
    BitAnd,
    #[token("&&")]
    LogicAnd,
    #[token("&=")]
    BitAndAssignment,
    #[token("|")]
    BitOr,
    #[token("||")]
    LogicOr,
    #[token("|=")]
    BitOrAssignment,
    #[token("^")]
    BitXor,
    #[token("^=")]
    BitXorAssignment,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEquals,
    #[token("<<")]
    ShiftLeft,
    #[token("<<=")]
    ShiftLeftAssignment,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEquals,
    #[token(">>")]
    ShiftRight,
    #[token(">>=")]
    ShiftRightAssignment,
    #[token("+")]
    Plus,
    #[token("++")]
    Increment,
    #[token("+=")]
    PlusAssignment,
    #[token("-")]
    Minus,
    #[token("--")]
    Decrement,
    #[token("-=")]
    MinusAssignment,
    #[token("*")]
    Mul,
    #[token("*=")]
    MulAssignment,
    #[token("/")]
    Div,
    #[token("/=")]
    DivAssignment,
    #[token("%")]
    Mod,
    #[token("%=")]
    ModAssignment,
    #[token("!")]
    Not,
    #[token("!=")]
    NotEquals,
    #[token("~")]
    Negate,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,
    #[token("?.")]
    QuestionDot,
    #[token("?(")]
    QuestionInvoke,
    #[token("?[")]
    QuestionIndex,
    #[token("??")]
    QuestionNull,
    #[token(":")]
    Colon,

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*")]
    ConstReal,
    #[regex(r"[0-9][0-9_]*")]
    ConstNumber,
    #[regex(r"0[bB][01_]+")]
    ConstBinary,
    #[regex(r"0[xX][0-9a-fA-F_]+")]
    ConstHexadecimal,
    #[regex(r"'(?:[^'\\]|\\.)*'")]
    ConstChars,
    #[regex(r#""(?:[^"\\]|\\.)*""#)]
    ConstString,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Word,
}

impl Token {
    fn lexical_type(self) -> LexicalType {
        match self {
            Token::Comment => LexicalType::Unknown,
            Token::BracketLeft0 => LexicalType::BracketLeft0,
            Token::BracketLeft1 => LexicalType::BracketLeft1,
            Token::BracketLeft2 => LexicalType::BracketLeft2,
            Token::BracketRight0 => LexicalType::BracketRight0,
            Token::BracketRight1 => LexicalType::BracketRight1,
            Token::BracketRight2 => LexicalType::BracketRight2,
            Token::Comma => LexicalType::Comma,
            Token::Semicolon => LexicalType::Semicolon,
            Token::Assignment => LexicalType::Assignment,
            Token::Equals => LexicalType::Equals,
            Token::Lambda => LexicalType::Lambda,
            Token::BitAnd => LexicalType::BitAnd,
            Token::LogicAnd => LexicalType::LogicAnd,
            Token::BitAndAssignment => LexicalType::BitAndAssignment,
            Token::BitOr => LexicalType::BitOr,
            Token::LogicOr => LexicalType::LogicOr,
            Token::BitOrAssignment => LexicalType::BitOrAssignment,
            Token::BitXor => LexicalType::BitXor,
            Token::BitXorAssignment => LexicalType::BitXorAssignment,
            Token::Less => LexicalType::Less,
            Token::LessEquals => LexicalType::LessEquals,
            Token::ShiftLeft => LexicalType::ShiftLeft,
            Token::ShiftLeftAssignment => LexicalType::ShiftLeftAssignment,
            Token::Greater => LexicalType::Greater,
            Token::GreaterEquals => LexicalType::GreaterEquals,
            Token::ShiftRight => LexicalType::ShiftRight,
            Token::ShiftRightAssignment => LexicalType::ShiftRightAssignment,
            Token::Plus => LexicalType::Plus,
            Token::Increment => LexicalType::Increment,
            Token::PlusAssignment => LexicalType::PlusAssignment,
            Token::Minus => LexicalType::Minus,
            Token::Decrement => LexicalType::Decrement,
            Token::MinusAssignment => LexicalType::MinusAssignment,
            Token::Mul => LexicalType::Mul,
            Token::MulAssignment => LexicalType::MulAssignment,
            Token::Div => LexicalType::Div,
            Token::DivAssignment => LexicalType::DivAssignment,
            Token::Mod => LexicalType::Mod,
            Token::ModAssignment => LexicalType::ModAssignment,
            Token::Not => LexicalType::Not,
            Token::NotEquals => LexicalType::NotEquals,
            Token::Negate => LexicalType::Negate,
            Token::Dot => LexicalType::Dot,
            Token::Question => LexicalType::Question,
            Token::QuestionDot => LexicalType::QuestionDot,
            Token::QuestionInvoke => LexicalType::QuestionInvoke,
            Token::QuestionIndex => LexicalType::QuestionIndex,
            Token::QuestionNull => LexicalType::QuestionNull,
            Token::Colon => LexicalType::Colon,
            Token::ConstReal => LexicalType::ConstReal,
            Token::ConstNumber => LexicalType::ConstNumber,
            Token::ConstBinary => LexicalType::ConstBinary,
            Token::ConstHexadecimal => LexicalType::ConstHexadecimal,
            Token::ConstChars => LexicalType::ConstChars,
            Token::ConstString => LexicalType::ConstString,
            Token::Word => LexicalType::Word,
        }
    }
}

/// Splits `source` into indented lines of lexicals.
///
/// Unrecognized characters are reported as `UnknownToken` and kept as
/// `LexicalType::Unknown` so the expression parser rejects the line.
pub fn tokenize<'a>(
    file: u32,
    source: &'a str,
    tab_width: u32,
    diagnostics: &mut Diagnostics,
) -> Vec<Line<'a>> {
    let mut lines = Vec::new();
    let mut offset = 0;

    for (number, raw) in source.split('\n').enumerate() {
        let line_number = number as u32 + 1;
        let line_start = offset;
        offset += raw.len() + 1;

        let mut indent = 0;
        for ch in raw.chars() {
            match ch {
                ' ' => indent += 1,
                '\t' => indent += tab_width,
                _ => break,
            }
        }

        let mut lexicals = Vec::new();
        let mut lexer = Token::lexer(raw);
        while let Some(token) = lexer.next() {
            let range = lexer.span();
            let anchor = Anchor::new(
                file,
                Span::new(line_start + range.start, line_start + range.end),
                line_number,
            );
            let kind = match token {
                Ok(token) => token.lexical_type(),
                Err(()) => {
                    diagnostics.report(&anchor, ErrorKind::UnknownToken {
                        text: lexer.slice().to_string(),
                    });
                    LexicalType::Unknown
                }
            };
            lexicals.push(Lexical::new(kind, anchor, lexer.slice()));
        }

        if lexicals.is_empty() {
            continue;
        }

        let first = &lexicals[0].anchor;
        let last = &lexicals[lexicals.len() - 1].anchor;
        trace!(line = line_number, indent, count = lexicals.len(), "Tokenized line");
        lines.push(Line {
            indent,
            anchor: first.to(last),
            lexicals,
        });
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(line: &Line<'_>) -> Vec<LexicalType> {
        line.lexicals.iter().map(|l| l.kind).collect()
    }

    #[test]
    fn test_indent_and_comments() {
        let mut diagnostics = Diagnostics::new();
        let lines = tokenize(0, "a = 1 // set\n\n    if a\n\tb", 4, &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].indent, 0);
        assert_eq!(lines[1].indent, 4);
        assert_eq!(lines[1].anchor.line, 3);
        assert_eq!(lines[2].indent, 4);
        assert_eq!(
            kinds(&lines[0]),
            vec![
                LexicalType::Word,
                LexicalType::Assignment,
                LexicalType::ConstNumber
            ]
        );
    }

    #[test]
    fn test_longest_match_operators() {
        let mut diagnostics = Diagnostics::new();
        let lines = tokenize(0, "a ?? b?.c <<= d?(e) => 1.5", 4, &mut diagnostics);
        assert_eq!(
            kinds(&lines[0]),
            vec![
                LexicalType::Word,
                LexicalType::QuestionNull,
                LexicalType::Word,
                LexicalType::QuestionDot,
                LexicalType::Word,
                LexicalType::ShiftLeftAssignment,
                LexicalType::Word,
                LexicalType::QuestionInvoke,
                LexicalType::Word,
                LexicalType::BracketRight0,
                LexicalType::Lambda,
                LexicalType::ConstReal,
            ]
        );
    }

    #[test]
    fn test_spans_are_absolute() {
        let mut diagnostics = Diagnostics::new();
        let source = "x\n  \"hi\"";
        let lines = tokenize(7, source, 4, &mut diagnostics);
        let lexical = &lines[1].lexicals[0];
        assert_eq!(lexical.kind, LexicalType::ConstString);
        assert_eq!(lexical.anchor.span.str_of(source), "\"hi\"");
        assert_eq!(lexical.anchor.file, 7);
    }

    #[test]
    fn test_unknown_character_reported() {
        let mut diagnostics = Diagnostics::new();
        let lines = tokenize(0, "a @ b", 4, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(lines[0].lexicals[1].kind, LexicalType::Unknown);
    }
}
