//! Statement trees. Every block is owned by exactly one parent statement
//! or by the function.

use crate::expression::{ExprRef, Local};
use crate::syntax::Anchor;

/// Identifies a loop for `break`/`continue` binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopId(pub u32);

#[derive(Debug)]
pub struct Block<'a> {
    /// Indentation of the block's lines.
    pub indent: u32,
    pub anchor: Anchor,
    pub statements: Vec<Statement<'a>>,
    /// Named locals whose scope ends with the block.
    pub locals: Vec<Local<'a>>,
}

impl<'a> Block<'a> {
    pub fn new(indent: u32, anchor: Anchor) -> Self {
        Block {
            indent,
            anchor,
            statements: Vec::new(),
            locals: Vec::new(),
        }
    }

    /// The block holds exactly one branch created by `elif`.
    pub(crate) fn is_chained(&self) -> bool {
        matches!(self.statements.as_slice(), [Statement::Branch(branch)] if branch.chained)
    }
}

#[derive(Debug)]
pub struct Branch<'a> {
    pub anchor: Anchor,
    pub condition: ExprRef<'a>,
    pub true_branch: Block<'a>,
    pub false_branch: Option<Block<'a>>,
    /// Created by `elif`; lives alone in the false block of the previous branch.
    pub chained: bool,
    /// Locals declared by the condition.
    pub locals: Vec<Local<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    While,
    For,
}

#[derive(Debug)]
pub struct Loop<'a> {
    pub anchor: Anchor,
    pub kind: LoopKind,
    pub id: LoopId,
    /// `for` initializers, evaluated once.
    pub init: &'a [ExprRef<'a>],
    /// `None` loops until a `break`.
    pub condition: Option<ExprRef<'a>>,
    /// `for` step expressions, evaluated after the body and on `continue`.
    pub step: &'a [ExprRef<'a>],
    pub body: Block<'a>,
    /// Runs when the condition fails; skipped by `break`.
    pub else_block: Option<Block<'a>>,
    /// Locals declared by the loop header.
    pub locals: Vec<Local<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Break,
    Continue,
}

impl JumpKind {
    pub fn keyword(self) -> &'static str {
        match self {
            JumpKind::Break => "break",
            JumpKind::Continue => "continue",
        }
    }
}

#[derive(Debug)]
pub struct Jump<'a> {
    pub anchor: Anchor,
    pub kind: JumpKind,
    /// Guard of `break cond` / `continue cond`.
    pub condition: Option<ExprRef<'a>>,
    /// Bound by [`super::init_jump_target`].
    pub target: Option<LoopId>,
}

#[derive(Debug)]
pub struct Catch<'a> {
    pub anchor: Anchor,
    /// `catch code` stores the exit code into this integer local.
    pub exit_code: Option<Local<'a>>,
    pub block: Block<'a>,
}

#[derive(Debug)]
pub struct Try<'a> {
    pub anchor: Anchor,
    pub body: Block<'a>,
    pub catch: Option<Catch<'a>>,
    pub finally: Option<Block<'a>>,
}

#[derive(Debug)]
pub enum Statement<'a> {
    Block(Block<'a>),
    Expression(ExprRef<'a>),
    Branch(Branch<'a>),
    Loop(Loop<'a>),
    Jump(Jump<'a>),
    Try(Try<'a>),
    /// `wait` yields once; `wait task` suspends until the task finishes.
    Wait {
        anchor: Anchor,
        task: Option<ExprRef<'a>>,
    },
    /// `exit [code]` raises an exit with an integer code.
    Exit {
        anchor: Anchor,
        code: Option<ExprRef<'a>>,
    },
    Return {
        anchor: Anchor,
        values: &'a [ExprRef<'a>],
    },
    /// Placeholder for an `else` line until its block is attached.
    ElseMarker {
        anchor: Anchor,
    },
}

impl<'a> Statement<'a> {
    pub fn anchor(&self) -> &Anchor {
        match self {
            Statement::Block(block) => &block.anchor,
            Statement::Expression(expr) => &expr.anchor,
            Statement::Branch(branch) => &branch.anchor,
            Statement::Loop(l) => &l.anchor,
            Statement::Jump(jump) => &jump.anchor,
            Statement::Try(t) => &t.anchor,
            Statement::Wait { anchor, .. }
            | Statement::Exit { anchor, .. }
            | Statement::Return { anchor, .. }
            | Statement::ElseMarker { anchor } => anchor,
        }
    }
}
