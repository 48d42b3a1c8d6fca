use super::CompilingType;

/// A compile-time value.
///
/// Strings borrow from the function's expression arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant<'a> {
    Null,
    Bool(bool),
    Byte(u8),
    Char(u16),
    Integer(i64),
    Real(f64),
    String(&'a str),
    Type(CompilingType),
    /// Enum element value, typed by its enum.
    Enum(CompilingType, i64),
}

impl<'a> Constant<'a> {
    pub fn ty(&self) -> CompilingType {
        match self {
            Constant::Null => CompilingType::NULL,
            Constant::Bool(_) => CompilingType::BOOL,
            Constant::Byte(_) => CompilingType::BYTE,
            Constant::Char(_) => CompilingType::CHAR,
            Constant::Integer(_) => CompilingType::INTEGER,
            Constant::Real(_) => CompilingType::REAL,
            Constant::String(_) => CompilingType::STRING,
            Constant::Type(_) => CompilingType::TYPE,
            Constant::Enum(ty, _) => *ty,
        }
    }

    /// Integer view of numeric constants (byte, char, integer, enum).
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Constant::Byte(v) => Some(i64::from(v)),
            Constant::Char(v) => Some(i64::from(v)),
            Constant::Integer(v) => Some(v),
            Constant::Enum(_, v) => Some(v),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match *self {
            Constant::Real(v) => Some(v),
            _ => self.as_integer().map(|v| v as f64),
        }
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Constant::Real(v) => v == 0.0,
            _ => self.as_integer() == Some(0),
        }
    }
}
