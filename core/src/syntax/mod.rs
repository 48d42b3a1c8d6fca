//! Source-level building blocks: anchors, lexicals and lines.

mod anchor;
pub mod lexer;
mod lexical;
pub mod literal;

pub use anchor::{Anchor, Span};
pub use lexical::{Lexical, LexicalType, Line, keyword};
