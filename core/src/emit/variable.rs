//! Per-function frame layout.
//!
//! ```text
//! ┌────────┬──────────────┬──────────────────┬─────────────────┬───────────────┐
//! │ header │ return slots │ parameters and   │ managed         │ value         │
//! │ 16     │ 4 per value  │ locals           │ temporaries     │ temporaries   │
//! └────────┴──────────────┴──────────────────┴─────────────────┴───────────────┘
//! ```
//!
//! Locals get a fixed offset the first time code generation reaches them.
//! Temporaries live on top of the locals, so their operands are written as
//! [`Referencable`] frame offsets and patched in [`VariableAllocator::finish`].
//!
//! Managed temporaries (strings, entities, handles) and plain value
//! temporaries grow separate regions. A managed slot therefore only ever
//! holds zero or a live reference, and a landing pad may release it even
//! when the exit is raised before the slot was written.

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::trace;

use super::generator::Generator;
use super::instruction::ValueKind;
use super::referencable::{FrameOffset, Referencable, ReferencableError};
use crate::expression::Local;
use crate::types::CompilingType;

/// Bytes reserved at the start of every frame for the VM.
pub const FRAME_HEADER: u32 = 16;

/// Size of one return slot; it holds a pointer to the caller's destination.
pub const RETURN_SLOT_SIZE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    /// Fixed frame offset.
    Frame(u32),
    /// Data-segment offset.
    Global(u32),
    /// Index of a temporary slot, patched when the frame is final.
    Temporary(u32),
}

/// A storage location and the type stored there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    pub address: Address,
    pub ty: CompilingType,
}

impl Variable {
    pub fn kind(&self) -> ValueKind {
        ValueKind::of(&self.ty)
    }

    pub fn is_managed(&self) -> bool {
        self.ty.is_managed()
    }

    /// The same storage viewed as `ty`.
    pub fn retyped(self, ty: CompilingType) -> Variable {
        Variable { ty, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Region {
    Managed,
    Value,
}

#[derive(Debug)]
struct TemporarySlot {
    region: Region,
    offset: u32,
    address: Referencable<FrameOffset>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Cursor {
    current: u32,
    top: u32,
}

impl Cursor {
    fn bump(&mut self, size: u32, alignment: u32) -> u32 {
        let offset = align(self.current, alignment);
        self.current = offset + size;
        self.top = self.top.max(self.current);
        offset
    }
}

/// Temporary state to return to when a logic block closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporaryMark {
    managed: u32,
    value: u32,
    live: usize,
}

/// A local as recorded for the debug table.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredLocal {
    pub index: u32,
    pub name: String,
    pub offset: u32,
    pub ty: CompilingType,
}

#[derive(Debug)]
pub struct VariableAllocator {
    returns: u32,
    align_locals: bool,
    locals_top: u32,
    locals: HashMap<u32, Variable>,
    declared: Vec<DeclaredLocal>,
    managed: Cursor,
    value: Cursor,
    slots: Vec<TemporarySlot>,
    slot_index: HashMap<(Region, u32), u32>,
    /// Managed temporaries not yet released, in allocation order.
    live: Vec<Variable>,
    frame_size: Referencable<FrameOffset>,
}

fn align(offset: u32, alignment: u32) -> u32 {
    offset.div_ceil(alignment) * alignment
}

impl VariableAllocator {
    pub fn new(returns: usize, align_locals: bool) -> Self {
        let returns = returns as u32;
        VariableAllocator {
            returns,
            align_locals,
            locals_top: FRAME_HEADER + returns * RETURN_SLOT_SIZE,
            locals: HashMap::new(),
            declared: Vec::new(),
            managed: Cursor::default(),
            value: Cursor::default(),
            slots: Vec::new(),
            slot_index: HashMap::new(),
            live: Vec::new(),
            frame_size: Referencable::new(),
        }
    }

    pub fn return_count(&self) -> u32 {
        self.returns
    }

    /// Frame offset of the return slot `index`.
    pub fn return_slot(&self, index: usize) -> u32 {
        debug_assert!((index as u32) < self.returns, "return slot {} out of range", index);
        FRAME_HEADER + index as u32 * RETURN_SLOT_SIZE
    }

    /// Gives `local` its frame offset, or returns the one it already has.
    pub fn declare_local(&mut self, local: &Local<'_>) -> Variable {
        if let Some(variable) = self.locals.get(&local.index) {
            return *variable;
        }
        let offset = if self.align_locals {
            align(self.locals_top, local.ty.alignment())
        } else {
            self.locals_top
        };
        self.locals_top = offset + local.ty.size();
        let variable = Variable {
            address: Address::Frame(offset),
            ty: local.ty,
        };
        trace!(name = local.name, index = local.index, offset, "Declared local");
        self.locals.insert(local.index, variable);
        self.declared.push(DeclaredLocal {
            index: local.index,
            name: local.name.to_string(),
            offset,
            ty: local.ty,
        });
        variable
    }

    /// The slot of `local` if code generation already reached it.
    pub fn local(&self, local: &Local<'_>) -> Option<Variable> {
        self.locals.get(&local.index).copied()
    }

    /// Locals in declaration order.
    pub fn declared_locals(&self) -> &[DeclaredLocal] {
        &self.declared
    }

    /// DeclareTemporary: a slot on top of the locals that lives until the
    /// enclosing logic block closes.
    pub fn temporary(&mut self, ty: CompilingType) -> Variable {
        let region = if ty.is_managed() { Region::Managed } else { Region::Value };
        let cursor = match region {
            Region::Managed => &mut self.managed,
            Region::Value => &mut self.value,
        };
        let offset = cursor.bump(ty.size().max(1), ty.alignment());
        let slot = match self.slot_index.get(&(region, offset)) {
            Some(&slot) => slot,
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(TemporarySlot {
                    region,
                    offset,
                    address: Referencable::new(),
                });
                self.slot_index.insert((region, offset), slot);
                slot
            }
        };
        let variable = Variable {
            address: Address::Temporary(slot),
            ty,
        };
        if region == Region::Managed {
            self.live.push(variable);
        }
        variable
    }

    pub fn mark(&self) -> TemporaryMark {
        TemporaryMark {
            managed: self.managed.current,
            value: self.value.current,
            live: self.live.len(),
        }
    }

    /// Rewinds both temporary cursors to `mark`
    /// and hands back the managed temporaries that need a release.
    pub fn clear_to(&mut self, mark: TemporaryMark) -> SmallVec<[Variable; 4]> {
        debug_assert!(mark.live <= self.live.len(), "temporary marks closed out of order");
        self.managed.current = mark.managed;
        self.value.current = mark.value;
        self.live.drain(mark.live..).collect()
    }

    /// Bytes in use by temporaries right now, both regions together.
    pub fn temporary_cursor(&self) -> u32 {
        self.managed.current + self.value.current
    }

    pub(crate) fn slot_address(&mut self, slot: u32) -> &mut Referencable<FrameOffset> {
        &mut self.slots[slot as usize].address
    }

    pub(crate) fn frame_size_address(&mut self) -> &mut Referencable<FrameOffset> {
        &mut self.frame_size
    }

    /// Fixes every temporary operand and the frame size. Returns the frame
    /// size in bytes.
    pub fn finish(mut self, generator: &mut Generator) -> Result<u32, ReferencableError> {
        let managed_base = align(self.locals_top, 8);
        let value_base = align(managed_base + self.managed.top, 8);
        let frame_size = align(value_base + self.value.top, 8);
        for slot in self.slots.drain(..) {
            let base = match slot.region {
                Region::Managed => managed_base,
                Region::Value => value_base,
            };
            let mut address = slot.address;
            generator.patch(&mut address, FrameOffset(base + slot.offset))?;
            address.dispose()?;
        }
        generator.patch(&mut self.frame_size, FrameOffset(frame_size))?;
        trace!(
            locals = self.locals_top,
            managed = self.managed.top,
            value = self.value.top,
            frame_size,
            "Frame laid out"
        );
        let frame = core::mem::take(&mut self.frame_size);
        frame.dispose()?;
        Ok(frame_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Anchor;
    use pretty_assertions::assert_eq;

    fn local(index: u32, ty: CompilingType) -> Local<'static> {
        Local {
            anchor: Anchor::default(),
            name: "x",
            index,
            ty,
        }
    }

    #[test]
    fn test_locals_follow_return_slots() {
        let mut variables = VariableAllocator::new(2, false);
        assert_eq!(variables.return_count(), 2);
        assert_eq!(variables.return_slot(1), 20);
        let a = variables.declare_local(&local(0, CompilingType::BOOL));
        let b = variables.declare_local(&local(1, CompilingType::INTEGER));
        assert_eq!(a.address, Address::Frame(24));
        assert_eq!(b.address, Address::Frame(25));
        // Declaring again keeps the slot.
        assert_eq!(variables.declare_local(&local(0, CompilingType::BOOL)), a);
    }

    #[test]
    fn test_alignment_pass() {
        let mut variables = VariableAllocator::new(0, true);
        variables.declare_local(&local(0, CompilingType::BOOL));
        let b = variables.declare_local(&local(1, CompilingType::INTEGER));
        let c = variables.declare_local(&local(2, CompilingType::CHAR));
        assert_eq!(b.address, Address::Frame(24));
        assert_eq!(c.address, Address::Frame(32));
    }

    #[test]
    fn test_temporaries_rewind_and_report_managed() {
        let mut variables = VariableAllocator::new(0, false);
        let outer = variables.mark();
        variables.temporary(CompilingType::INTEGER);
        let inner = variables.mark();
        let s = variables.temporary(CompilingType::STRING);
        variables.temporary(CompilingType::REAL);
        assert_eq!(variables.temporary_cursor(), 4 + 16);

        let released = variables.clear_to(inner);
        assert_eq!(released.as_slice(), &[s]);
        assert_eq!(variables.temporary_cursor(), 8);
        assert!(variables.clear_to(outer).is_empty());
        assert_eq!(variables.temporary_cursor(), 0);
    }

    #[test]
    fn test_finish_patches_temporaries_above_locals() {
        let mut generator = Generator::new(0);
        let mut variables = VariableAllocator::new(1, false);
        variables.declare_local(&local(0, CompilingType::BOOL));
        let handle = variables.temporary(CompilingType::HANDLE);
        let value = variables.temporary(CompilingType::INTEGER);
        for variable in [handle, value] {
            let Address::Temporary(slot) = variable.address else {
                panic!("expected a temporary");
            };
            generator.write_referencable(variables.slot_address(slot));
        }
        generator.write_referencable(variables.frame_size_address());

        let frame_size = variables.finish(&mut generator).unwrap();
        // Locals end at 21; managed temporaries start at 24, values at 32.
        assert_eq!(frame_size, 40);
        let words: Vec<u32> = generator
            .code()
            .chunks(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(words, vec![24, 32, 40]);
    }
}
