use tracing::trace;

use super::stmt::{Block, LoopId, Statement};
use crate::diagnostics::{Diagnostics, ErrorKind};

/// Binds every `break`/`continue` to its innermost enclosing loop.
///
/// A loop's `else` block belongs to the surrounding loop. Jumps that
/// would cross a `try` boundary are still bound, so code generation sees a
/// consistent tree, but they are reported.
pub fn init_jump_target(block: &mut Block<'_>, diagnostics: &mut Diagnostics) {
    bind_block(block, None, false, diagnostics);
}

fn bind_block(block: &mut Block<'_>, current: Option<LoopId>, in_try: bool, diagnostics: &mut Diagnostics) {
    for statement in &mut block.statements {
        match statement {
            Statement::Block(inner) => bind_block(inner, current, in_try, diagnostics),
            Statement::Branch(branch) => {
                bind_block(&mut branch.true_branch, current, in_try, diagnostics);
                if let Some(false_branch) = &mut branch.false_branch {
                    bind_block(false_branch, current, in_try, diagnostics);
                }
            }
            Statement::Loop(l) => {
                bind_block(&mut l.body, Some(l.id), false, diagnostics);
                if let Some(else_block) = &mut l.else_block {
                    bind_block(else_block, current, in_try, diagnostics);
                }
            }
            Statement::Try(t) => {
                let in_try = in_try || current.is_some();
                bind_block(&mut t.body, current, in_try, diagnostics);
                if let Some(catch) = &mut t.catch {
                    bind_block(&mut catch.block, current, in_try, diagnostics);
                }
                if let Some(finally) = &mut t.finally {
                    bind_block(finally, current, in_try, diagnostics);
                }
            }
            Statement::Jump(jump) => {
                let keyword = jump.kind.keyword();
                match current {
                    None => diagnostics.report(&jump.anchor, ErrorKind::JumpOutsideLoop { keyword }),
                    Some(id) => {
                        if in_try {
                            diagnostics.report(&jump.anchor, ErrorKind::JumpLeavesTry { keyword });
                        }
                        trace!(keyword, target = id.0, "Bound jump");
                        jump.target = Some(id);
                    }
                }
            }
            Statement::Expression(_)
            | Statement::Wait { .. }
            | Statement::Exit { .. }
            | Statement::Return { .. }
            | Statement::ElseMarker { .. } => {}
        }
    }
}
