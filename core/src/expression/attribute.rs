use bitflags::bitflags;

use crate::types::CompilingType;

bitflags! {
    /// What may legally follow an expression during the token scan.
    ///
    /// `OPERATOR` marks the scan position right after an operator (or at
    /// the start), where an operand is expected.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct Attribute: u16 {
        const OPERATOR = 1;
        const VALUE = 1 << 1;
        const CONSTANT = 1 << 2;
        const ASSIGNABLE = 1 << 3;
        const CALLABLE = 1 << 4;
        const ARRAY = 1 << 5;
        const TUPLE = 1 << 6;
        const TASK = 1 << 7;
        const TYPE = 1 << 8;
        const METHOD = 1 << 9;
    }
}

impl Attribute {
    pub const NONE: Attribute = Attribute::empty();

    /// Attributes of a single value of type `ty`.
    pub fn of_type(ty: &CompilingType) -> Attribute {
        let mut attribute = Attribute::VALUE;
        if ty.is_array() {
            attribute |= Attribute::ARRAY;
        } else if ty.is_delegate() {
            attribute |= Attribute::CALLABLE;
        } else if ty.is_task() {
            attribute |= Attribute::TASK;
        }
        attribute
    }

    /// Attributes of an expression returning `returns`.
    pub fn of_tuple(returns: &[CompilingType]) -> Attribute {
        match returns {
            [] => Attribute::NONE,
            [ty] => Attribute::of_type(ty),
            _ => Attribute::TUPLE,
        }
    }
}
