use core::fmt;

use super::Anchor;

/// Classification of a lexical item.
///
/// Bracket kinds are numbered: `0` is `()`, `1` is `[]`, `2` is `{}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexicalType {
    Unknown,

    BracketLeft0,
    BracketLeft1,
    BracketLeft2,
    BracketRight0,
    BracketRight1,
    BracketRight2,
    Comma,
    Semicolon,

    Assignment,
    Equals,
    Lambda,
    BitAnd,
    LogicAnd,
    BitAndAssignment,
    BitOr,
    LogicOr,
    BitOrAssignment,
    BitXor,
    BitXorAssignment,
    Less,
    LessEquals,
    ShiftLeft,
    ShiftLeftAssignment,
    Greater,
    GreaterEquals,
    ShiftRight,
    ShiftRightAssignment,
    Plus,
    Increment,
    PlusAssignment,
    Minus,
    Decrement,
    MinusAssignment,
    Mul,
    MulAssignment,
    Div,
    DivAssignment,
    Mod,
    ModAssignment,
    Not,
    NotEquals,
    Negate,
    Dot,
    Question,
    QuestionDot,
    QuestionInvoke,
    QuestionIndex,
    QuestionNull,
    Colon,

    ConstReal,
    ConstNumber,
    ConstBinary,
    ConstHexadecimal,
    ConstChars,
    ConstString,
    Word,
}

impl LexicalType {
    /// `=` and every compound assignment.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            LexicalType::Assignment
                | LexicalType::BitAndAssignment
                | LexicalType::BitOrAssignment
                | LexicalType::BitXorAssignment
                | LexicalType::ShiftLeftAssignment
                | LexicalType::ShiftRightAssignment
                | LexicalType::PlusAssignment
                | LexicalType::MinusAssignment
                | LexicalType::MulAssignment
                | LexicalType::DivAssignment
                | LexicalType::ModAssignment
        )
    }

    pub fn is_constant(self) -> bool {
        matches!(
            self,
            LexicalType::ConstReal
                | LexicalType::ConstNumber
                | LexicalType::ConstBinary
                | LexicalType::ConstHexadecimal
                | LexicalType::ConstChars
                | LexicalType::ConstString
        )
    }

    /// Opening bracket kind, counting `?(` and `?[` as their plain forms.
    pub fn open_bracket(self) -> Option<u8> {
        match self {
            LexicalType::BracketLeft0 | LexicalType::QuestionInvoke => Some(0),
            LexicalType::BracketLeft1 | LexicalType::QuestionIndex => Some(1),
            LexicalType::BracketLeft2 => Some(2),
            _ => None,
        }
    }

    pub fn close_bracket(self) -> Option<u8> {
        match self {
            LexicalType::BracketRight0 => Some(0),
            LexicalType::BracketRight1 => Some(1),
            LexicalType::BracketRight2 => Some(2),
            _ => None,
        }
    }
}

/// A classified slice of source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexical<'a> {
    pub kind: LexicalType,
    pub anchor: Anchor,
    pub text: &'a str,
}

impl<'a> Lexical<'a> {
    pub fn new(kind: LexicalType, anchor: Anchor, text: &'a str) -> Self {
        Self { kind, anchor, text }
    }
}

impl fmt::Display for Lexical<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text)
    }
}

/// One logical source line with its indentation level.
#[derive(Debug, Clone, PartialEq)]
pub struct Line<'a> {
    pub indent: u32,
    pub anchor: Anchor,
    pub lexicals: Vec<Lexical<'a>>,
}

/// Reserved words recognized by the expression parser and statement builder.
pub mod keyword {
    pub const IF: &str = "if";
    pub const ELIF: &str = "elif";
    pub const ELSE: &str = "else";
    pub const WHILE: &str = "while";
    pub const FOR: &str = "for";
    pub const BREAK: &str = "break";
    pub const CONTINUE: &str = "continue";
    pub const RETURN: &str = "return";
    pub const WAIT: &str = "wait";
    pub const EXIT: &str = "exit";
    pub const TRY: &str = "try";
    pub const CATCH: &str = "catch";
    pub const FINALLY: &str = "finally";

    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";
    pub const NULL: &str = "null";
    pub const VAR: &str = "var";
    pub const IS: &str = "is";
    pub const AS: &str = "as";
    pub const AND: &str = "and";
    pub const OR: &str = "or";
    pub const START: &str = "start";

    const ALL: &[&str] = &[
        IF, ELIF, ELSE, WHILE, FOR, BREAK, CONTINUE, RETURN, WAIT, EXIT, TRY, CATCH, FINALLY,
        TRUE, FALSE, NULL, VAR, IS, AS, AND, OR, START,
    ];

    pub fn is_keyword(word: &str) -> bool {
        ALL.contains(&word)
    }
}
