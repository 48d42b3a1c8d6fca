//! Path checks run after the tree is complete.
//!
//! Both checks are conservative: they look at statement shapes only, never
//! at condition values. A loop counts as returning only through a statement
//! inside it, even when its condition is absent or `true`.

use super::stmt::{Block, JumpKind, Loop, LoopId, Statement};
use crate::diagnostics::{Diagnostics, ErrorKind};
use crate::syntax::Anchor;

/// Reports `NotAllPathsReturn` at `anchor` unless every path through
/// `body` ends in `return` or `exit`.
pub fn check_return(body: &Block<'_>, anchor: &Anchor, diagnostics: &mut Diagnostics) {
    if !block_terminates(body) {
        diagnostics.report(anchor, ErrorKind::NotAllPathsReturn);
    }
}

pub(crate) fn block_terminates(block: &Block<'_>) -> bool {
    block.statements.iter().any(statement_terminates)
}

fn statement_terminates(statement: &Statement<'_>) -> bool {
    match statement {
        Statement::Return { .. } | Statement::Exit { .. } => true,
        Statement::Block(block) => block_terminates(block),
        Statement::Branch(branch) => {
            block_terminates(&branch.true_branch)
                && branch.false_branch.as_ref().is_some_and(block_terminates)
        }
        Statement::Loop(l) => loop_terminates(l),
        Statement::Try(t) => {
            t.finally.as_ref().is_some_and(block_terminates)
                || (block_terminates(&t.body)
                    && t.catch.as_ref().is_none_or(|catch| block_terminates(&catch.block)))
        }
        Statement::Expression(_)
        | Statement::Jump(_)
        | Statement::Wait { .. }
        | Statement::ElseMarker { .. } => false,
    }
}

fn loop_terminates(l: &Loop<'_>) -> bool {
    if breaks_to(&l.body, l.id) {
        return false;
    }
    block_terminates(&l.body) || l.else_block.as_ref().is_some_and(block_terminates)
}

/// Any `break` bound to `id` inside `block`, guarded or not.
fn breaks_to(block: &Block<'_>, id: LoopId) -> bool {
    block.statements.iter().any(|statement| match statement {
        Statement::Jump(jump) => jump.kind == JumpKind::Break && jump.target == Some(id),
        Statement::Block(inner) => breaks_to(inner, id),
        Statement::Branch(branch) => {
            breaks_to(&branch.true_branch, id)
                || branch.false_branch.as_ref().is_some_and(|b| breaks_to(b, id))
        }
        Statement::Loop(l) => {
            breaks_to(&l.body, id) || l.else_block.as_ref().is_some_and(|b| breaks_to(b, id))
        }
        Statement::Try(t) => {
            breaks_to(&t.body, id)
                || t.catch.as_ref().is_some_and(|c| breaks_to(&c.block, id))
                || t.finally.as_ref().is_some_and(|b| breaks_to(b, id))
        }
        _ => false,
    })
}

/// Reports every `return` that would leave the body or catch block of a
/// `try` with a `finally`.
pub fn check_finally_returns(block: &Block<'_>, diagnostics: &mut Diagnostics) {
    visit_returns(block, false, diagnostics);
}

fn visit_returns(block: &Block<'_>, guarded: bool, diagnostics: &mut Diagnostics) {
    for statement in &block.statements {
        match statement {
            Statement::Return { anchor, .. } if guarded => {
                diagnostics.report(anchor, ErrorKind::ReturnLeavesFinally);
            }
            Statement::Block(inner) => visit_returns(inner, guarded, diagnostics),
            Statement::Branch(branch) => {
                visit_returns(&branch.true_branch, guarded, diagnostics);
                if let Some(false_branch) = &branch.false_branch {
                    visit_returns(false_branch, guarded, diagnostics);
                }
            }
            Statement::Loop(l) => {
                visit_returns(&l.body, guarded, diagnostics);
                if let Some(else_block) = &l.else_block {
                    visit_returns(else_block, guarded, diagnostics);
                }
            }
            Statement::Try(t) => {
                let inner = guarded || t.finally.is_some();
                visit_returns(&t.body, inner, diagnostics);
                if let Some(catch) = &t.catch {
                    visit_returns(&catch.block, inner, diagnostics);
                }
                if let Some(finally) = &t.finally {
                    visit_returns(finally, guarded, diagnostics);
                }
            }
            _ => {}
        }
    }
}
