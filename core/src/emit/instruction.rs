//! Rain VM opcodes.
//!
//! # Encoding
//!
//! Every instruction is a one byte opcode followed by fixed-width
//! little-endian operands:
//!
//! ```text
//! ┌────────┬──────────────────────────────┐
//! │ opcode │ operands (per opcode layout) │
//! │ 1 byte │ u8 / u16 / u32 / i64 / f64   │
//! └────────┴──────────────────────────────┘
//! ```
//!
//! Variable operands are `u32` addresses. Frame addresses are offsets
//! into the current frame; addresses with [`GLOBAL_BIT`] set index the
//! data segment. Jump targets are absolute `u32` code addresses.
//!
//! Parameterized ops carry a [`ValueKind`] byte and an operator byte
//! instead of one opcode per type.
//!
//! # Exits
//!
//! Instructions for which [`Opcode::can_raise`] holds are followed by
//! `ExitJump(target)`, which jumps when an exit is pending.

use core::fmt;

use static_assertions::const_assert_eq;

use crate::expression::{OperandKind, Operator, Shape};
use crate::types::{CompilingType, Declaration, Definition};

/// Marks a data-segment address.
pub const GLOBAL_BIT: u32 = 0x8000_0000;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Special (0x00)
    /// Zeroed memory halts instead of running garbage.
    Halt = 0x00,
    Nop = 0x01,
    /// `line:u32`
    Breakpoint = 0x02,

    // Frame (0x08 - 0x0F)
    /// `frame_size:u32`. Zero-fills the frame.
    Enter = 0x08,
    Return = 0x09,
    /// `kind:u8 slot:u32 src:u32`. Stores through a return pointer.
    ReturnStore = 0x0A,
    /// `kind:u8 dst:u32`. Releases the old value and zero-fills the slot.
    Clear = 0x0B,
    /// `kind:u8 dst:u32`. Same as `Clear`; marks the end of a lifetime.
    Release = 0x0C,

    // Constants (0x10 - 0x1F)
    /// `dst:u32 value:u8`
    ConstBool = 0x10,
    /// `dst:u32 value:u8`
    ConstByte = 0x11,
    /// `dst:u32 value:u16`
    ConstChar = 0x12,
    /// `dst:u32 value:i64`
    ConstInteger = 0x13,
    /// `dst:u32 value:f64`
    ConstReal = 0x14,
    /// `dst:u32 index:u32` into the code-string table.
    ConstString = 0x15,
    /// `dst:u32 type`, see [`encode_type`].
    ConstType = 0x16,
    /// `kind:u8 dst:u32`
    ConstNull = 0x17,

    // Data movement and arithmetic (0x20 - 0x2F)
    /// `kind:u8 dst:u32 src:u32`
    Move = 0x20,
    /// `op:u8 kind:u8 shape:u8 dst:u32 left:u32 right:u32`
    Binary = 0x21,
    /// `op:u8 kind:u8 dst:u32 src:u32`
    Unary = 0x22,
    /// `op:u8 kind:u8 dst:u32`. In-place `++`/`--`.
    Step = 0x23,
    /// `from:u8 to:u8 dst:u32 src:u32` between numeric kinds.
    Convert = 0x24,
    /// `from:u8 to:u8 dst:u32 src:u32` between `real` and `realN`.
    VectorResize = 0x25,
    /// `kind:u8 dst:u32 src:u32`
    Stringify = 0x26,
    /// `dst:u32 src:u32 type`. Yields `null` when the cast fails.
    Downcast = 0x27,
    /// `dst:u32 src:u32 type`
    IsCast = 0x28,
    /// `dst:u32 count:u8 (src:u32 dimension:u8)*`
    VectorConstruct = 0x29,
    /// `dst:u32 src:u32 count:u8 component:u8*`
    Swizzle = 0x2A,

    // Control flow (0x30 - 0x3F)
    /// `target:u32`
    Jump = 0x30,
    /// `cond:u32 target:u32`
    JumpIf = 0x31,
    /// `cond:u32 target:u32`
    JumpIfNot = 0x32,
    /// `kind:u8 src:u32 target:u32`
    JumpIfNull = 0x33,
    /// `kind:u8 src:u32 target:u32`
    JumpIfNotNull = 0x34,
    /// `target:u32`. Jumps when an exit is pending.
    ExitJump = 0x35,
    /// `code:u32`. Raises an exit.
    Exit = 0x36,
    /// `has_dst:u8 [dst:u32]`. Clears the pending exit, optionally storing its code.
    Catch = 0x37,

    // Calls (0x40 - 0x4F)
    // `function` is laid out by [`encode_function`]. Every call ends with
    // `argc:u8 arg:u32* retc:u8 ret:u32*`; arguments are copied into the
    // callee's leading locals.
    /// `function`
    Call = 0x40,
    /// `function`
    CallNative = 0x41,
    /// `function target:u32`
    CallMember = 0x42,
    /// `function target:u32`
    CallVirtual = 0x43,
    /// `delegate:u32`
    CallDelegate = 0x44,
    /// `type function dst:u32` followed by the arguments only.
    New = 0x45,

    // Closures and coroutines (0x50 - 0x5F)
    /// `dst:u32 function has_target:u8 [target:u32]`
    DelegateCreate = 0x50,
    /// `dst:u32 lambda:u32 count:u8 src:u32*`
    LambdaCreate = 0x51,
    /// `dst:u32 call:u8` followed by the call operands without returns.
    Start = 0x52,
    /// `kind:u8 dst:u32 task:u32 index:u8`
    TaskElement = 0x53,
    /// `task:u32`
    Wait = 0x54,
    /// Suspends the running task for one step.
    Yield = 0x55,

    // Arrays, strings and members (0x60 - 0x6F)
    /// `type dst:u32 length:u32`. `type` is the element type.
    ArrayCreate = 0x60,
    /// `type dst:u32 count:u32 src:u32*`
    ArrayInit = 0x61,
    /// `kind:u8 dst:u32 array:u32 index:u32`
    ArrayLoad = 0x62,
    /// `kind:u8 array:u32 index:u32 src:u32`
    ArrayStore = 0x63,
    /// `dst:u32 array:u32`
    ArrayLength = 0x64,
    /// `dst:u32 string:u32`
    StringLength = 0x65,
    /// `dst:u32 string:u32 index:u32`
    StringElement = 0x66,
    /// `kind:u8 dst:u32 target:u32 field:u32`
    MemberLoad = 0x67,
    /// `kind:u8 target:u32 field:u32 src:u32`
    MemberStore = 0x68,
}

const_assert_eq!(core::mem::size_of::<Opcode>(), 1);

impl Opcode {
    /// Instructions that may leave an exit pending.
    pub fn can_raise(self) -> bool {
        matches!(
            self,
            Opcode::Binary
                | Opcode::Exit
                | Opcode::Call
                | Opcode::CallNative
                | Opcode::CallMember
                | Opcode::CallVirtual
                | Opcode::CallDelegate
                | Opcode::New
                | Opcode::Start
                | Opcode::TaskElement
                | Opcode::Wait
                | Opcode::ArrayCreate
                | Opcode::ArrayLoad
                | Opcode::ArrayStore
                | Opcode::StringElement
                | Opcode::MemberLoad
                | Opcode::MemberStore
        )
    }

    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Jump
                | Opcode::JumpIf
                | Opcode::JumpIfNot
                | Opcode::JumpIfNull
                | Opcode::JumpIfNotNull
                | Opcode::ExitJump
        )
    }
}

/// Storage class of a slot, as the VM sees it.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool = 0,
    Byte = 1,
    Char = 2,
    Integer = 3,
    Real = 4,
    Real2 = 5,
    Real3 = 6,
    Real4 = 7,
    Type = 8,
    String = 9,
    Entity = 10,
    Handle = 11,
}

const_assert_eq!(core::mem::size_of::<ValueKind>(), 1);

impl ValueKind {
    /// Kind of a slot of type `ty`. Enums are stored as integers and every
    /// handle-like type as a handle id; `null` defaults to a handle.
    pub fn of(ty: &CompilingType) -> ValueKind {
        if ty.is_handle() || ty.is_null() {
            return ValueKind::Handle;
        }
        if ty.is_enum() {
            return ValueKind::Integer;
        }
        match ty.definition {
            Definition::BOOL => ValueKind::Bool,
            Definition::BYTE => ValueKind::Byte,
            Definition::CHAR => ValueKind::Char,
            Definition::INTEGER => ValueKind::Integer,
            Definition::REAL => ValueKind::Real,
            Definition::REAL2 => ValueKind::Real2,
            Definition::REAL3 => ValueKind::Real3,
            Definition::REAL4 => ValueKind::Real4,
            Definition::TYPE => ValueKind::Type,
            Definition::STRING => ValueKind::String,
            Definition::ENTITY => ValueKind::Entity,
            _ => panic!("no storage kind for type {}", ty),
        }
    }

    pub fn is_managed(self) -> bool {
        matches!(self, ValueKind::String | ValueKind::Entity | ValueKind::Handle)
    }
}

impl From<OperandKind> for ValueKind {
    fn from(kind: OperandKind) -> Self {
        match kind {
            OperandKind::Bool => ValueKind::Bool,
            OperandKind::Integer => ValueKind::Integer,
            OperandKind::Real => ValueKind::Real,
            OperandKind::Vector(2) => ValueKind::Real2,
            OperandKind::Vector(3) => ValueKind::Real3,
            OperandKind::Vector(4) => ValueKind::Real4,
            OperandKind::Vector(n) => panic!("no vector with {} components", n),
            OperandKind::String => ValueKind::String,
            OperandKind::Handle => ValueKind::Handle,
            OperandKind::Entity => ValueKind::Entity,
            OperandKind::Type => ValueKind::Type,
        }
    }
}

/// Operator byte of `Binary`, `Unary` and `Step`.
pub fn operator_code(operator: Operator) -> u8 {
    match operator {
        Operator::LogicOr => b'o',
        Operator::LogicAnd => b'a',
        Operator::BitOr => b'|',
        Operator::BitXor => b'^',
        Operator::BitAnd => b'&',
        Operator::Equals => b'=',
        Operator::NotEquals => b'!',
        Operator::Less => b'<',
        Operator::LessEquals => b'l',
        Operator::Greater => b'>',
        Operator::GreaterEquals => b'g',
        Operator::ShiftLeft => b'L',
        Operator::ShiftRight => b'R',
        Operator::Plus => b'+',
        Operator::Minus => b'-',
        Operator::Mul => b'*',
        Operator::Div => b'/',
        Operator::Mod => b'%',
        Operator::Negative => b'n',
        Operator::Not => b'~',
        Operator::Inverse => b'i',
        Operator::Increment => b'I',
        Operator::Decrement => b'D',
        Operator::Start => panic!("'start' has no operator encoding"),
    }
}

pub fn shape_code(shape: Shape) -> u8 {
    match shape {
        Shape::Uniform => 0,
        Shape::VectorScalar => 1,
        Shape::ScalarVector => 2,
    }
}

/// `library:u32 code:u8 index:u32 dimension:u32`, the operand layout of a
/// type in code.
pub fn encode_type(ty: &CompilingType) -> [u8; 13] {
    let mut bytes = [0u8; 13];
    bytes[..4].copy_from_slice(&ty.definition.library.to_le_bytes());
    bytes[4] = ty.definition.code as u8;
    bytes[5..9].copy_from_slice(&ty.definition.index.to_le_bytes());
    bytes[9..].copy_from_slice(&ty.dimension.to_le_bytes());
    bytes
}

/// `library:u32 define:u32 index:u32 overload:u32`, the operand layout of
/// a function in code.
pub fn encode_function(function: &Declaration) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes[..4].copy_from_slice(&function.library.to_le_bytes());
    bytes[4..8].copy_from_slice(&function.define.to_le_bytes());
    bytes[8..12].copy_from_slice(&function.index.to_le_bytes());
    bytes[12..].copy_from_slice(&function.overload.to_le_bytes());
    bytes
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_halt_is_zero() {
        assert_eq!(Opcode::Halt as u8, 0);
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(ValueKind::of(&CompilingType::INTEGER.array_of()), ValueKind::Handle);
        assert_eq!(ValueKind::of(&CompilingType::NULL), ValueKind::Handle);
        assert_eq!(ValueKind::of(&CompilingType::REAL3), ValueKind::Real3);
        assert!(ValueKind::String.is_managed());
        assert!(!ValueKind::Real.is_managed());
    }

    #[test]
    fn test_can_raise() {
        assert!(Opcode::Call.can_raise());
        assert!(Opcode::ArrayLoad.can_raise());
        assert!(!Opcode::Move.can_raise());
        assert!(!Opcode::Downcast.can_raise());
        assert!(Opcode::ExitJump.is_jump());
        assert!(!Opcode::Exit.is_jump());
    }
}
