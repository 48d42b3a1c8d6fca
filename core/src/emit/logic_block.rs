//! Scope guard around the evaluation of one statement-level expression.
//!
//! Opening a block installs a fresh landing pad as the exit handler, so
//! every `ExitJump` emitted inside targets it. Closing the block releases
//! the managed temporaries allocated inside it on the normal path and, only
//! when something jumped to the pad, emits the pad itself:
//!
//! ```text
//!     Release t0..tn        ; normal path
//!     Jump   skip
//! pad:
//!     Release t0..tn
//!     Jump   previous handler
//! skip:
//! ```
//!
//! Without managed temporaries the pad is not emitted at all; its pending
//! jumps are forwarded to the previous handler.

use core::ops::{Deref, DerefMut};

use tracing::trace;

use super::codegen::FunctionCodegen;
use super::generator::Label;
use super::instruction::Opcode;
use super::referencable::ReferencableError;
use super::variable::TemporaryMark;

pub struct LogicBlock<'c, 'g, 'a> {
    codegen: &'c mut FunctionCodegen<'g, 'a>,
    pad: Label,
    previous: Label,
    mark: TemporaryMark,
    closed: bool,
}

impl<'c, 'g, 'a> LogicBlock<'c, 'g, 'a> {
    pub fn open(codegen: &'c mut FunctionCodegen<'g, 'a>) -> Self {
        let pad = codegen.generator.new_label();
        let previous = core::mem::replace(&mut codegen.handler, pad);
        let mark = codegen.variables.mark();
        LogicBlock {
            codegen,
            pad,
            previous,
            mark,
            closed: false,
        }
    }

    pub fn close(mut self) -> Result<(), ReferencableError> {
        self.closed = true;
        let codegen = &mut *self.codegen;
        codegen.handler = self.previous;
        let released = codegen.variables.clear_to(self.mark);
        for variable in &released {
            codegen.release(variable);
        }

        if !codegen.generator.is_referenced(self.pad) {
            return Ok(());
        }
        if released.is_empty() {
            codegen.generator.forward_label(self.pad, self.previous);
            return Ok(());
        }
        trace!(temporaries = released.len(), "Emitting landing pad");
        let skip = codegen.generator.new_label();
        codegen.generator.write(Opcode::Jump);
        codegen.generator.write_label(skip);
        codegen.generator.set_label(self.pad)?;
        for variable in &released {
            codegen.release(variable);
        }
        codegen.generator.write(Opcode::Jump);
        codegen.generator.write_label(self.previous);
        codegen.generator.set_label(skip)
    }
}

impl<'g, 'a> Deref for LogicBlock<'_, 'g, 'a> {
    type Target = FunctionCodegen<'g, 'a>;

    fn deref(&self) -> &Self::Target {
        &*self.codegen
    }
}

impl DerefMut for LogicBlock<'_, '_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.codegen
    }
}

impl Drop for LogicBlock<'_, '_, '_> {
    fn drop(&mut self) {
        // Left without `close` only while an error propagates.
        if !self.closed {
            self.codegen.handler = self.previous;
        }
    }
}
