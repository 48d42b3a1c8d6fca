//! Statement and control-flow trees built from indented lines.

mod builder;
mod check;
mod jump;
mod nest;
mod stmt;

#[cfg(test)]
mod builder_test;

pub use builder::StatementBuilder;
pub use check::{check_finally_returns, check_return};
pub use jump::init_jump_target;
pub use stmt::{Block, Branch, Catch, Jump, JumpKind, Loop, LoopId, LoopKind, Statement, Try};
