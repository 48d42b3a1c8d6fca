//! Typed expressions and the parser that builds them from lexicals.

mod attribute;
mod convert;
mod expr;
mod fold;
mod lambda;
mod local;
mod operator;
mod overload;
mod parser;
mod postfix;
pub mod split;
mod structure;

#[cfg(test)]
mod parser_test;

pub use attribute::Attribute;
pub use convert::{COST_LADDER, COST_NARROW, COST_WIDEN, measure_type};
pub use expr::{
    BlurryLambda, Callee, Conversion, ExprRef, Expression, ExpressionKind, Invocation,
    LambdaFunction, MethodGroup,
};
pub use fold::{Folded, fold_binary, fold_convert, fold_unary};
pub use local::{Capture, FrameLocals, Local, LocalContext};
pub use operator::{
    BinaryOp, BinaryResolution, OperandKind, Operator, PRIORITY_UNARY, Shape, UnaryOp,
    resolve_binary, resolve_unary,
};
pub use parser::ExpressionParser;
