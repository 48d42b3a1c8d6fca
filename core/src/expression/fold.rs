//! Compile-time evaluation of operators and conversions on constants.

use bumpalo::Bump;

use super::operator::{BinaryOp, OperandKind, Operator, UnaryOp};
use crate::types::{CompilingType, Constant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Folded<'a> {
    Value(Constant<'a>),
    DivideByZero,
    /// Valid operation that is left to run time.
    Deferred,
}

fn compare<T: PartialOrd>(operator: Operator, left: T, right: T) -> Option<bool> {
    Some(match operator {
        Operator::Equals => left == right,
        Operator::NotEquals => left != right,
        Operator::Less => left < right,
        Operator::LessEquals => left <= right,
        Operator::Greater => left > right,
        Operator::GreaterEquals => left >= right,
        _ => return None,
    })
}

fn fold_integer(operator: Operator, left: i64, right: i64) -> Folded<'static> {
    let value = match operator {
        Operator::Plus => left.wrapping_add(right),
        Operator::Minus => left.wrapping_sub(right),
        Operator::Mul => left.wrapping_mul(right),
        Operator::Div | Operator::Mod if right == 0 => return Folded::DivideByZero,
        Operator::Div => left.wrapping_div(right),
        Operator::Mod => left.wrapping_rem(right),
        Operator::BitAnd => left & right,
        Operator::BitOr => left | right,
        Operator::BitXor => left ^ right,
        Operator::ShiftLeft => left.wrapping_shl(right as u32),
        Operator::ShiftRight => left.wrapping_shr(right as u32),
        _ => {
            return compare(operator, left, right)
                .map_or(Folded::Deferred, |b| Folded::Value(Constant::Bool(b)));
        }
    };
    Folded::Value(Constant::Integer(value))
}

fn fold_real(operator: Operator, left: f64, right: f64) -> Folded<'static> {
    let value = match operator {
        Operator::Plus => left + right,
        Operator::Minus => left - right,
        Operator::Mul => left * right,
        Operator::Div if right == 0.0 => return Folded::DivideByZero,
        Operator::Div => left / right,
        _ => {
            return compare(operator, left, right)
                .map_or(Folded::Deferred, |b| Folded::Value(Constant::Bool(b)));
        }
    };
    Folded::Value(Constant::Real(value))
}

/// Folds `left op right` where both operands were already converted to
/// the operator's operand types.
pub fn fold_binary<'a>(
    arena: &'a Bump,
    op: &BinaryOp,
    left: &Constant<'a>,
    right: &Constant<'a>,
) -> Folded<'a> {
    match op.operands {
        OperandKind::Integer => match (left.as_integer(), right.as_integer()) {
            (Some(l), Some(r)) => match (fold_integer(op.operator, l, r), left) {
                // Bitwise operators on flag enums keep the enum type.
                (Folded::Value(Constant::Integer(v)), Constant::Enum(ty, _)) => {
                    Folded::Value(Constant::Enum(*ty, v))
                }
                (folded, _) => folded,
            },
            _ => Folded::Deferred,
        },
        OperandKind::Real => match (left.as_real(), right.as_real()) {
            (Some(l), Some(r)) => fold_real(op.operator, l, r),
            _ => Folded::Deferred,
        },
        OperandKind::Bool => match (left, right) {
            (Constant::Bool(l), Constant::Bool(r)) => {
                let value = match op.operator {
                    Operator::LogicAnd | Operator::BitAnd => *l && *r,
                    Operator::LogicOr | Operator::BitOr => *l || *r,
                    Operator::BitXor | Operator::NotEquals => l != r,
                    Operator::Equals => l == r,
                    _ => return Folded::Deferred,
                };
                Folded::Value(Constant::Bool(value))
            }
            _ => Folded::Deferred,
        },
        OperandKind::String => match (left, right) {
            (Constant::String(l), Constant::String(r)) => match op.operator {
                Operator::Plus => {
                    let mut joined = String::with_capacity(l.len() + r.len());
                    joined.push_str(l);
                    joined.push_str(r);
                    Folded::Value(Constant::String(arena.alloc_str(&joined)))
                }
                _ => compare(op.operator, *l, *r)
                    .map_or(Folded::Deferred, |b| Folded::Value(Constant::Bool(b))),
            },
            _ => Folded::Deferred,
        },
        OperandKind::Type => match (left, right) {
            (Constant::Type(l), Constant::Type(r)) => match op.operator {
                Operator::Equals => Folded::Value(Constant::Bool(l == r)),
                Operator::NotEquals => Folded::Value(Constant::Bool(l != r)),
                _ => Folded::Deferred,
            },
            _ => Folded::Deferred,
        },
        OperandKind::Handle => match (left, right) {
            (Constant::Null, Constant::Null) => match op.operator {
                Operator::Equals => Folded::Value(Constant::Bool(true)),
                Operator::NotEquals => Folded::Value(Constant::Bool(false)),
                _ => Folded::Deferred,
            },
            _ => Folded::Deferred,
        },
        OperandKind::Vector(_) | OperandKind::Entity => Folded::Deferred,
    }
}

pub fn fold_unary<'a>(op: &UnaryOp, operand: &Constant<'a>) -> Option<Constant<'a>> {
    match (op.operator, operand) {
        (Operator::Not, Constant::Bool(v)) => Some(Constant::Bool(!v)),
        (Operator::Negative, Constant::Real(v)) => Some(Constant::Real(-v)),
        (Operator::Negative, value) => value.as_integer().map(|v| Constant::Integer(v.wrapping_neg())),
        (Operator::Inverse, value) => value.as_integer().map(|v| Constant::Integer(!v)),
        _ => None,
    }
}

/// Converts a constant to `target`, or `None` when the conversion only
/// exists at run time.
pub fn fold_convert<'a>(
    arena: &'a Bump,
    value: &Constant<'a>,
    target: &CompilingType,
) -> Option<Constant<'a>> {
    if value.ty() == *target {
        return Some(*value);
    }
    match *target {
        CompilingType::BYTE => value
            .as_integer()
            .or_else(|| value.as_real().map(|r| r as i64))
            .map(|v| Constant::Byte(v as u8)),
        CompilingType::CHAR => value
            .as_integer()
            .or_else(|| value.as_real().map(|r| r as i64))
            .map(|v| Constant::Char(v as u16)),
        CompilingType::INTEGER => value
            .as_integer()
            .or_else(|| value.as_real().map(|r| r as i64))
            .map(Constant::Integer),
        CompilingType::REAL => value.as_real().map(Constant::Real),
        CompilingType::STRING => {
            let text = match value {
                Constant::Bool(v) => v.to_string(),
                Constant::Char(v) => char::from_u32(u32::from(*v))?.to_string(),
                Constant::Byte(_) | Constant::Integer(_) | Constant::Enum(..) => {
                    value.as_integer()?.to_string()
                }
                Constant::Real(v) => v.to_string(),
                _ => return None,
            };
            Some(Constant::String(arena.alloc_str(&text)))
        }
        ty if ty.is_enum() => value.as_integer().map(|v| Constant::Enum(ty, v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::operator::Shape;
    use pretty_assertions::assert_eq;

    fn op(operator: Operator, operands: OperandKind) -> BinaryOp {
        BinaryOp {
            operator,
            operands,
            shape: Shape::Uniform,
        }
    }

    #[test]
    fn test_fold_integer_arithmetic() {
        let arena = Bump::new();
        let folded = fold_binary(
            &arena,
            &op(Operator::Plus, OperandKind::Integer),
            &Constant::Integer(3),
            &Constant::Integer(4),
        );
        assert_eq!(folded, Folded::Value(Constant::Integer(7)));
        let folded = fold_binary(
            &arena,
            &op(Operator::Less, OperandKind::Integer),
            &Constant::Integer(3),
            &Constant::Integer(4),
        );
        assert_eq!(folded, Folded::Value(Constant::Bool(true)));
    }

    #[test]
    fn test_divide_by_zero_is_not_folded() {
        let arena = Bump::new();
        for operator in [Operator::Div, Operator::Mod] {
            let folded = fold_binary(
                &arena,
                &op(operator, OperandKind::Integer),
                &Constant::Integer(5),
                &Constant::Integer(0),
            );
            assert_eq!(folded, Folded::DivideByZero);
        }
    }

    #[test]
    fn test_fold_string_concat() {
        let arena = Bump::new();
        let folded = fold_binary(
            &arena,
            &op(Operator::Plus, OperandKind::String),
            &Constant::String("ab"),
            &Constant::String("cd"),
        );
        assert_eq!(folded, Folded::Value(Constant::String("abcd")));
    }

    #[test]
    fn test_fold_convert() {
        let arena = Bump::new();
        assert_eq!(
            fold_convert(&arena, &Constant::Integer(2), &CompilingType::REAL),
            Some(Constant::Real(2.0))
        );
        assert_eq!(
            fold_convert(&arena, &Constant::Real(2.9), &CompilingType::INTEGER),
            Some(Constant::Integer(2))
        );
        assert_eq!(
            fold_convert(&arena, &Constant::Integer(42), &CompilingType::STRING),
            Some(Constant::String("42"))
        );
        assert_eq!(fold_convert(&arena, &Constant::Null, &CompilingType::HANDLE), None);
    }
}
