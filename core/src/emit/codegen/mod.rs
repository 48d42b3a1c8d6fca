//! Lowers statement and expression trees of one function to bytecode.
//!
//! Every expression evaluates into a [`Variable`]: locals and globals are
//! used in place, everything else lands in a temporary. Statement-level
//! evaluations run inside a [`LogicBlock`](super::LogicBlock) so their
//! temporaries are released on both the normal and the exit path.

mod expression;
mod statement;

#[cfg(test)]
mod codegen_test;

use hashbrown::HashMap;
use tracing::debug;

use super::debug::LineTable;
use super::generator::{Generator, Label};
use super::instruction::{GLOBAL_BIT, Opcode};
use super::referencable::ReferencableError;
use super::variable::{Address, DeclaredLocal, Variable, VariableAllocator};
use crate::expression::{Capture, ExprRef, Local};
use crate::resolver::Resolver;
use crate::statement::{Block, LoopId};
use crate::types::CompilingType;

pub type EmitResult<T> = Result<T, ReferencableError>;

/// Where the code of one function goes.
pub struct Output<'g> {
    pub generator: &'g mut Generator,
    pub lines: &'g mut LineTable,
    pub breakpoints: &'g mut Vec<u32>,
}

/// Frame facts of an emitted function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLayout {
    pub entry: u32,
    pub frame_size: u32,
    pub locals: Vec<DeclaredLocal>,
}

/// What a function runs: a statement body, or the expression of a lambda.
#[derive(Debug, Clone, Copy)]
pub enum FunctionBody<'b, 'a> {
    Block(&'b Block<'a>),
    Expression(ExprRef<'a>),
}

/// The frame shape a function is entered with.
#[derive(Debug, Clone, Copy)]
pub struct FrameSignature<'b, 'a> {
    pub returns: &'b [CompilingType],
    /// Locals receiving the call arguments, in order.
    pub parameters: &'b [Local<'a>],
    /// Lambda locals receiving captured values after the arguments.
    pub captures: &'b [Capture<'a>],
}

#[derive(Debug, Clone, Copy)]
struct LoopLabels {
    break_label: Label,
    continue_label: Label,
}

pub struct FunctionCodegen<'g, 'a> {
    pub(crate) generator: &'g mut Generator,
    lines: &'g mut LineTable,
    breakpoints: &'g mut Vec<u32>,
    resolver: &'a dyn Resolver,
    pub(crate) variables: VariableAllocator,
    /// Target of `ExitJump`: the innermost landing pad or catch handler.
    pub(crate) handler: Label,
    /// Cleanup and `Return` at the end of the function.
    exit: Label,
    loops: HashMap<LoopId, LoopLabels>,
    /// Function-table index of the first lambda of this function.
    lambda_base: u32,
    debug: bool,
}

/// Emits one function and returns its frame layout.
pub fn emit_function<'a>(
    output: Output<'_>,
    resolver: &'a dyn Resolver,
    signature: FrameSignature<'_, 'a>,
    body: FunctionBody<'_, 'a>,
    lambda_base: u32,
    debug: bool,
    align_locals: bool,
) -> EmitResult<FunctionLayout> {
    let Output {
        generator,
        lines,
        breakpoints,
    } = output;
    let entry = generator.position().0;
    let handler = generator.new_label();
    let mut codegen = FunctionCodegen {
        generator,
        lines,
        breakpoints,
        resolver,
        variables: VariableAllocator::new(signature.returns.len(), align_locals),
        handler,
        exit: handler,
        loops: HashMap::new(),
        lambda_base,
        debug,
    };

    codegen.generator.write(Opcode::Enter);
    let frame_size = codegen.variables.frame_size_address();
    codegen.generator.write_referencable(frame_size);
    for parameter in signature.parameters {
        codegen.variables.declare_local(parameter);
    }
    for capture in signature.captures {
        codegen.variables.declare_local(&capture.inner);
    }

    match body {
        FunctionBody::Block(block) => codegen.block(block)?,
        FunctionBody::Expression(expr) => codegen.expression_body(expr, signature.returns)?,
    }

    codegen.generator.set_label(codegen.exit)?;
    let managed: Vec<Variable> = codegen
        .variables
        .declared_locals()
        .iter()
        .filter(|local| local.ty.is_managed())
        .map(|local| Variable {
            address: Address::Frame(local.offset),
            ty: local.ty,
        })
        .collect();
    for variable in &managed {
        codegen.release(variable);
    }
    codegen.generator.write(Opcode::Return);

    let FunctionCodegen {
        generator,
        variables,
        ..
    } = codegen;
    let locals = variables.declared_locals().to_vec();
    let frame_size = variables.finish(generator)?;
    generator.release_labels()?;
    debug!(
        entry,
        frame_size,
        code_size = generator.position().0 - entry,
        "Emitted function"
    );
    Ok(FunctionLayout {
        entry,
        frame_size,
        locals,
    })
}

impl<'g, 'a> FunctionCodegen<'g, 'a> {
    /// A fresh temporary of type `ty`.
    pub(crate) fn temporary(&mut self, ty: CompilingType) -> Variable {
        self.variables.temporary(ty)
    }

    pub(crate) fn local(&mut self, local: &Local<'a>) -> Variable {
        self.variables.declare_local(local)
    }

    /// Writes the address operand of `variable`.
    pub(crate) fn write_variable(&mut self, variable: &Variable) {
        match variable.address {
            Address::Frame(offset) => self.generator.write(offset),
            Address::Global(offset) => self.generator.write(offset | GLOBAL_BIT),
            Address::Temporary(slot) => {
                let address = self.variables.slot_address(slot);
                self.generator.write_referencable(address);
            }
        }
    }

    /// `Release kind dst`.
    pub(crate) fn release(&mut self, variable: &Variable) {
        self.generator.write(Opcode::Release);
        self.generator.write(variable.kind());
        self.write_variable(variable);
    }

    /// `ExitJump handler`, required after every instruction that can raise.
    pub(crate) fn guard(&mut self) {
        self.generator.write(Opcode::ExitJump);
        let handler = self.handler;
        self.generator.write_label(handler);
    }

    pub(crate) fn jump(&mut self, label: Label) {
        self.generator.write(Opcode::Jump);
        self.generator.write_label(label);
    }

    /// `JumpIf`/`JumpIfNot` on a bool slot.
    pub(crate) fn jump_if(&mut self, condition: &Variable, when: bool, label: Label) {
        self.generator
            .write(if when { Opcode::JumpIf } else { Opcode::JumpIfNot });
        self.write_variable(condition);
        self.generator.write_label(label);
    }

    /// `Move kind dst src`, skipped when both are the same slot.
    pub(crate) fn move_to(&mut self, dst: &Variable, src: &Variable) {
        if dst.address == src.address {
            return;
        }
        self.generator.write(Opcode::Move);
        self.generator.write(dst.kind());
        self.write_variable(dst);
        self.write_variable(src);
    }

    /// Records the line of the statement about to be emitted.
    fn mark_line(&mut self, line: u32) {
        let offset = self.generator.position().0;
        self.lines.add(offset, line);
        if self.debug {
            self.breakpoints.push(offset);
            self.generator.write(Opcode::Breakpoint);
            self.generator.write(line);
        }
    }
}
