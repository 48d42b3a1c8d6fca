use tracing::trace;

use super::{EmitResult, FunctionCodegen, LoopLabels};
use crate::emit::generator::Label;
use crate::emit::instruction::Opcode;
use crate::emit::logic_block::LogicBlock;
use crate::expression::{ExprRef, Local};
use crate::statement::{Block, Branch, Jump, JumpKind, Loop, LoopKind, Statement, Try};
use crate::types::Constant;

impl<'g, 'a> FunctionCodegen<'g, 'a> {
    pub(crate) fn block(&mut self, block: &Block<'a>) -> EmitResult<()> {
        for statement in &block.statements {
            self.statement(statement)?;
        }
        self.release_locals(&block.locals);
        Ok(())
    }

    /// Releases the managed locals of a scope that code generation reached.
    /// Jumps out of the scope leave them to the function's exit cleanup.
    fn release_locals(&mut self, locals: &[Local<'a>]) {
        for local in locals {
            if !local.ty.is_managed() {
                continue;
            }
            if let Some(variable) = self.variables.local(local) {
                self.release(&variable);
            }
        }
    }

    fn statement(&mut self, statement: &Statement<'a>) -> EmitResult<()> {
        match statement {
            Statement::Block(block) => self.block(block),
            Statement::Expression(expr) => {
                self.mark_line(expr.anchor.line);
                let mut block = LogicBlock::open(self);
                block.evaluate_values(*expr)?;
                block.close()
            }
            Statement::Branch(branch) => self.branch(branch),
            Statement::Loop(l) => self.emit_loop(l),
            Statement::Jump(jump) => self.emit_jump(jump),
            Statement::Try(t) => self.emit_try(t),
            Statement::Wait { anchor, task } => {
                self.mark_line(anchor.line);
                let Some(task) = task else {
                    self.generator.write(Opcode::Yield);
                    return Ok(());
                };
                let mut block = LogicBlock::open(self);
                let task = block.evaluate(*task)?;
                block.generator.write(Opcode::Wait);
                block.write_variable(&task);
                block.guard();
                block.close()
            }
            Statement::Exit { anchor, code } => {
                self.mark_line(anchor.line);
                let mut block = LogicBlock::open(self);
                let code = match code {
                    Some(code) => block.evaluate(*code)?,
                    None => block.constant(&Constant::Integer(0)),
                };
                block.generator.write(Opcode::Exit);
                block.write_variable(&code);
                block.guard();
                block.close()
            }
            Statement::Return { anchor, values } => {
                self.mark_line(anchor.line);
                let mut block = LogicBlock::open(self);
                let mut evaluated = Vec::with_capacity(values.len());
                for value in values.iter() {
                    evaluated.extend(block.evaluate_values(*value)?);
                }
                block.store_returns(&evaluated);
                block.close()?;
                let exit = self.exit;
                self.jump(exit);
                Ok(())
            }
            Statement::ElseMarker { .. } => unreachable!("else marker survived block assembly"),
        }
    }

    /// Jumps to `label` when `condition` evaluates to `when`. Constant
    /// conditions fold to an unconditional jump or to nothing.
    fn condition_jump(
        &mut self,
        condition: ExprRef<'a>,
        when: bool,
        label: Label,
    ) -> EmitResult<()> {
        if let Some(Constant::Bool(value)) = condition.constant() {
            if *value == when {
                self.jump(label);
            }
            return Ok(());
        }
        let mut block = LogicBlock::open(self);
        let value = block.evaluate(condition)?;
        block.close()?;
        // Bool temporaries are not released, so the slot is still valid.
        self.jump_if(&value, when, label);
        Ok(())
    }

    fn branch(&mut self, branch: &Branch<'a>) -> EmitResult<()> {
        self.mark_line(branch.anchor.line);
        let otherwise = self.generator.new_label();
        let end = self.generator.new_label();
        self.condition_jump(branch.condition, false, otherwise)?;
        self.block(&branch.true_branch)?;
        if let Some(false_branch) = &branch.false_branch {
            self.jump(end);
            self.generator.set_label(otherwise)?;
            self.block(false_branch)?;
        } else {
            self.generator.set_label(otherwise)?;
        }
        self.generator.set_label(end)?;
        self.release_locals(&branch.locals);
        Ok(())
    }

    fn emit_loop(&mut self, l: &Loop<'a>) -> EmitResult<()> {
        self.mark_line(l.anchor.line);
        for init in l.init.iter() {
            let mut block = LogicBlock::open(self);
            block.evaluate_values(*init)?;
            block.close()?;
        }

        let head = self.generator.new_label();
        let break_label = self.generator.new_label();
        let continue_label = match l.kind {
            LoopKind::While => head,
            LoopKind::For => self.generator.new_label(),
        };
        let otherwise = if l.else_block.is_some() {
            self.generator.new_label()
        } else {
            break_label
        };
        trace!(id = l.id.0, "Emitting loop");
        self.loops.insert(
            l.id,
            LoopLabels {
                break_label,
                continue_label,
            },
        );

        self.generator.set_label(head)?;
        if let Some(condition) = l.condition {
            self.condition_jump(condition, false, otherwise)?;
        }
        self.block(&l.body)?;
        if l.kind == LoopKind::For {
            self.generator.set_label(continue_label)?;
            for step in l.step.iter() {
                let mut block = LogicBlock::open(self);
                block.evaluate_values(*step)?;
                block.close()?;
            }
        }
        self.jump(head);
        if let Some(else_block) = &l.else_block {
            self.generator.set_label(otherwise)?;
            self.block(else_block)?;
        }
        self.generator.set_label(break_label)?;
        self.loops.remove(&l.id);
        self.release_locals(&l.locals);
        Ok(())
    }

    fn emit_jump(&mut self, jump: &Jump<'a>) -> EmitResult<()> {
        self.mark_line(jump.anchor.line);
        let Some(labels) = jump.target.and_then(|id| self.loops.get(&id).copied()) else {
            panic!("'{}' without a bound loop", jump.kind.keyword());
        };
        let label = match jump.kind {
            JumpKind::Break => labels.break_label,
            JumpKind::Continue => labels.continue_label,
        };
        match jump.condition {
            Some(condition) => self.condition_jump(condition, true, label),
            None => {
                self.jump(label);
                Ok(())
            }
        }
    }

    /// The body's handler is the catch clause, else the finally clause.
    /// `finally` ends with `ExitJump` so a pending exit keeps propagating.
    fn emit_try(&mut self, t: &Try<'a>) -> EmitResult<()> {
        self.mark_line(t.anchor.line);
        let outer = self.handler;
        let end = self.generator.new_label();
        let catch_label = self.generator.new_label();
        let finally_label = self.generator.new_label();
        let after_body = if t.finally.is_some() { finally_label } else { end };

        self.handler = if t.catch.is_some() {
            catch_label
        } else if t.finally.is_some() {
            finally_label
        } else {
            outer
        };
        self.block(&t.body)?;
        self.handler = outer;
        self.jump(after_body);

        if let Some(catch) = &t.catch {
            self.generator.set_label(catch_label)?;
            self.mark_line(catch.anchor.line);
            self.generator.write(Opcode::Catch);
            match &catch.exit_code {
                Some(local) => {
                    let code = self.local(local);
                    self.generator.write(true);
                    self.write_variable(&code);
                }
                None => self.generator.write(false),
            }
            if t.finally.is_some() {
                self.handler = finally_label;
            }
            self.block(&catch.block)?;
            self.handler = outer;
            self.jump(after_body);
        }

        if let Some(finally) = &t.finally {
            self.generator.set_label(finally_label)?;
            self.block(finally)?;
            self.generator.write(Opcode::ExitJump);
            self.generator.write_label(outer);
        }
        self.generator.set_label(end)
    }
}
