//! Typed expression trees.
//!
//! Expressions are allocated in the per-function arena and never mutated
//! after construction. Converting an expression wraps it in a new node.

use super::attribute::Attribute;
use super::local::{Capture, Local};
use super::operator::{BinaryOp, UnaryOp};
use crate::syntax::{Anchor, Lexical};
use crate::types::{CompilingType, Constant, Declaration, Definition};

pub type ExprRef<'a> = &'a Expression<'a>;

#[derive(Debug)]
pub struct Expression<'a> {
    pub anchor: Anchor,
    /// Tuple type of the value(s) this expression evaluates to.
    pub returns: &'a [CompilingType],
    pub attribute: Attribute,
    pub kind: ExpressionKind<'a>,
}

impl<'a> Expression<'a> {
    /// The single type of a one-valued expression.
    pub fn ty(&self) -> Option<CompilingType> {
        match self.returns {
            [ty] => Some(*ty),
            _ => None,
        }
    }

    pub fn constant(&self) -> Option<&Constant<'a>> {
        match &self.kind {
            ExpressionKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.kind, ExpressionKind::Invalid) || self.ty().is_some_and(|t| t.is_invalid())
    }

    /// True when evaluating the expression only to drop its value has no
    /// observable effect.
    pub fn is_pure(&self) -> bool {
        match &self.kind {
            ExpressionKind::Constant(_)
            | ExpressionKind::Local(_)
            | ExpressionKind::Global(_)
            | ExpressionKind::Type(_)
            | ExpressionKind::Lambda(_)
            | ExpressionKind::Method(_) => true,
            ExpressionKind::Binary { left, right, .. } | ExpressionKind::Logic { left, right, .. } => {
                left.is_pure() && right.is_pure()
            }
            ExpressionKind::Unary { operand, .. } => operand.is_pure(),
            ExpressionKind::Convert { source, .. } => source.is_pure(),
            _ => false,
        }
    }
}

/// Representation change applied by a `Convert` node. The target type is
/// the node's own return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Between byte, char, integer and real (either direction).
    Numeric { from: CompilingType },
    /// Resize between `real` (1) and `real2`..`real4`.
    Vector { from: u32, to: u32 },
    Stringify { from: CompilingType },
    /// Same bits, new static type: `null` to a handle, upcasts, enum and integer.
    Retype,
    /// Checked handle downcast yielding `null` on failure.
    Downcast,
}

#[derive(Debug, Clone, Copy)]
pub enum Callee<'a> {
    Global(Declaration),
    Native(Declaration),
    Member {
        target: ExprRef<'a>,
        function: Declaration,
    },
    Virtual {
        target: ExprRef<'a>,
        function: Declaration,
    },
    Delegate(ExprRef<'a>),
    Constructor {
        definition: Definition,
        function: Declaration,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub callee: Callee<'a>,
    pub arguments: &'a [ExprRef<'a>],
    /// `?(`: skip the call when the delegate is null.
    pub question: bool,
}

/// A function name not yet bound to one overload.
#[derive(Debug, Clone, Copy)]
pub struct MethodGroup<'a> {
    pub name: &'a str,
    pub candidates: &'a [Declaration],
    pub target: Option<ExprRef<'a>>,
    pub question: bool,
}

/// A lambda whose parameter types are not known yet.
#[derive(Debug, Clone, Copy)]
pub struct BlurryLambda<'a> {
    pub parameters: &'a [&'a str],
    pub body: &'a [Lexical<'a>],
}

#[derive(Debug)]
pub enum ExpressionKind<'a> {
    Constant(Constant<'a>),
    Local(Local<'a>),
    /// A local declared by this expression; evaluating it resets the slot.
    Declare(Local<'a>),
    Global(Declaration),
    Member {
        target: ExprRef<'a>,
        member: Declaration,
        question: bool,
    },
    Method(MethodGroup<'a>),
    Invoke(Invocation<'a>),
    Tuple(&'a [ExprRef<'a>]),
    TupleElement {
        source: ExprRef<'a>,
        index: usize,
    },
    Binary {
        op: BinaryOp,
        left: ExprRef<'a>,
        right: ExprRef<'a>,
    },
    Unary {
        op: UnaryOp,
        operand: ExprRef<'a>,
    },
    /// Short-circuit `&&` (`and == true`) and `||`.
    Logic {
        and: bool,
        left: ExprRef<'a>,
        right: ExprRef<'a>,
    },
    Convert {
        source: ExprRef<'a>,
        conversion: Conversion,
    },
    /// `value is T`.
    IsCast {
        source: ExprRef<'a>,
        target: CompilingType,
    },
    VectorConstruct {
        components: &'a [ExprRef<'a>],
    },
    VectorSwizzle {
        source: ExprRef<'a>,
        components: &'a [u8],
    },
    ArrayCreate {
        length: ExprRef<'a>,
    },
    ArrayInit {
        elements: &'a [ExprRef<'a>],
    },
    ArrayElement {
        array: ExprRef<'a>,
        index: ExprRef<'a>,
        question: bool,
    },
    StringElement {
        string: ExprRef<'a>,
        index: ExprRef<'a>,
    },
    /// `.length` of an array or string.
    Length(ExprRef<'a>),
    Question {
        condition: ExprRef<'a>,
        true_value: ExprRef<'a>,
        false_value: ExprRef<'a>,
    },
    NullCoalesce {
        value: ExprRef<'a>,
        fallback: ExprRef<'a>,
    },
    /// Plain assignment; compound forms are lowered to a `Binary` source
    /// that reads the target.
    Assignment {
        target: ExprRef<'a>,
        source: ExprRef<'a>,
    },
    Step {
        op: UnaryOp,
        prefix: bool,
        target: ExprRef<'a>,
    },
    /// `a; b; c` evaluates in order and yields the last value.
    Sequence(&'a [ExprRef<'a>]),
    Lambda(BlurryLambda<'a>),
    LambdaCreate {
        function: u32,
        captures: &'a [Capture<'a>],
    },
    DelegateCreate {
        function: Declaration,
        target: Option<ExprRef<'a>>,
    },
    TaskCreate {
        invocation: ExprRef<'a>,
    },
    TaskElement {
        task: ExprRef<'a>,
        index: usize,
    },
    Type(CompilingType),
    BlurrySet(&'a [ExprRef<'a>]),
    /// `var name` awaiting the type of its first assignment.
    BlurryVariable {
        name: &'a str,
    },
    /// Placeholder produced after a diagnostic so parsing can continue.
    Invalid,
}

impl<'a> ExpressionKind<'a> {
    /// Whether a value of this kind can be stored into.
    pub fn is_assignable(&self) -> bool {
        match self {
            ExpressionKind::Local(_)
            | ExpressionKind::Declare(_)
            | ExpressionKind::Global(_)
            | ExpressionKind::BlurryVariable { .. } => true,
            ExpressionKind::Member { question, .. } | ExpressionKind::ArrayElement { question, .. } => {
                !question
            }
            ExpressionKind::Tuple(items) => items.iter().all(|e| e.kind.is_assignable()),
            _ => false,
        }
    }
}

/// A lambda body compiled once its delegate type became known.
#[derive(Debug)]
pub struct LambdaFunction<'a> {
    pub anchor: Anchor,
    pub delegate: Definition,
    pub parameters: usize,
    pub returns: &'a [CompilingType],
    pub locals: Vec<Local<'a>>,
    pub captures: Vec<Capture<'a>>,
    pub body: ExprRef<'a>,
}
