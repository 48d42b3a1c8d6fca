//! Operator priorities and type-directed operator resolution.

use crate::resolver::Resolver;
use crate::syntax::LexicalType;
use crate::types::CompilingType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    LogicOr,
    LogicAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equals,
    NotEquals,
    Less,
    LessEquals,
    Greater,
    GreaterEquals,
    ShiftLeft,
    ShiftRight,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,

    // Prefix operators.
    Negative,
    Not,
    Inverse,
    Increment,
    Decrement,
    Start,
}

/// Priority of prefix operators; higher than every binary operator.
pub const PRIORITY_UNARY: u8 = 11;

impl Operator {
    /// Binary operator for a lexical in operand-consumed position.
    pub fn binary(kind: LexicalType) -> Option<Operator> {
        Some(match kind {
            LexicalType::LogicOr => Operator::LogicOr,
            LexicalType::LogicAnd => Operator::LogicAnd,
            LexicalType::BitOr => Operator::BitOr,
            LexicalType::BitXor => Operator::BitXor,
            LexicalType::BitAnd => Operator::BitAnd,
            LexicalType::Equals => Operator::Equals,
            LexicalType::NotEquals => Operator::NotEquals,
            LexicalType::Less => Operator::Less,
            LexicalType::LessEquals => Operator::LessEquals,
            LexicalType::Greater => Operator::Greater,
            LexicalType::GreaterEquals => Operator::GreaterEquals,
            LexicalType::ShiftLeft => Operator::ShiftLeft,
            LexicalType::ShiftRight => Operator::ShiftRight,
            LexicalType::Plus => Operator::Plus,
            LexicalType::Minus => Operator::Minus,
            LexicalType::Mul => Operator::Mul,
            LexicalType::Div => Operator::Div,
            LexicalType::Mod => Operator::Mod,
            _ => return None,
        })
    }

    /// Prefix operator for a lexical in operand-expected position.
    pub fn prefix(kind: LexicalType) -> Option<Operator> {
        Some(match kind {
            LexicalType::Minus => Operator::Negative,
            LexicalType::Not => Operator::Not,
            LexicalType::Negate => Operator::Inverse,
            LexicalType::Increment => Operator::Increment,
            LexicalType::Decrement => Operator::Decrement,
            _ => return None,
        })
    }

    /// Operator applied by a compound assignment (`+=` is `Plus`).
    pub fn compound(kind: LexicalType) -> Option<Operator> {
        Some(match kind {
            LexicalType::PlusAssignment => Operator::Plus,
            LexicalType::MinusAssignment => Operator::Minus,
            LexicalType::MulAssignment => Operator::Mul,
            LexicalType::DivAssignment => Operator::Div,
            LexicalType::ModAssignment => Operator::Mod,
            LexicalType::BitAndAssignment => Operator::BitAnd,
            LexicalType::BitOrAssignment => Operator::BitOr,
            LexicalType::BitXorAssignment => Operator::BitXor,
            LexicalType::ShiftLeftAssignment => Operator::ShiftLeft,
            LexicalType::ShiftRightAssignment => Operator::ShiftRight,
            _ => return None,
        })
    }

    pub fn priority(self) -> u8 {
        match self {
            Operator::LogicOr => 1,
            Operator::LogicAnd => 2,
            Operator::BitOr => 3,
            Operator::BitXor => 4,
            Operator::BitAnd => 5,
            Operator::Equals | Operator::NotEquals => 6,
            Operator::Less | Operator::LessEquals | Operator::Greater | Operator::GreaterEquals => 7,
            Operator::ShiftLeft | Operator::ShiftRight => 8,
            Operator::Plus | Operator::Minus => 9,
            Operator::Mul | Operator::Div | Operator::Mod => 10,
            Operator::Negative
            | Operator::Not
            | Operator::Inverse
            | Operator::Increment
            | Operator::Decrement
            | Operator::Start => PRIORITY_UNARY,
        }
    }

    pub fn is_unary(self) -> bool {
        self.priority() == PRIORITY_UNARY
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::LogicOr => "||",
            Operator::LogicAnd => "&&",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::BitAnd => "&",
            Operator::Equals => "==",
            Operator::NotEquals => "!=",
            Operator::Less => "<",
            Operator::LessEquals => "<=",
            Operator::Greater => ">",
            Operator::GreaterEquals => ">=",
            Operator::ShiftLeft => "<<",
            Operator::ShiftRight => ">>",
            Operator::Plus => "+",
            Operator::Minus | Operator::Negative => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Not => "!",
            Operator::Inverse => "~",
            Operator::Increment => "++",
            Operator::Decrement => "--",
            Operator::Start => "start",
        }
    }
}

/// Operand family selecting the instruction of a resolved operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Bool,
    Integer,
    Real,
    /// `real2`..`real4`, by component count.
    Vector(u8),
    String,
    Handle,
    Entity,
    Type,
}

/// Operand arrangement for vector arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Uniform,
    VectorScalar,
    ScalarVector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryOp {
    pub operator: Operator,
    pub operands: OperandKind,
    pub shape: Shape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnaryOp {
    pub operator: Operator,
    pub operand: OperandKind,
}

/// Outcome of resolving a binary operator for a pair of operand types.
///
/// `left` and `right` are the types the operands must be converted to
/// before the operation applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryResolution {
    pub left: CompilingType,
    pub right: CompilingType,
    pub result: CompilingType,
    pub op: BinaryOp,
}

fn uniform(
    operator: Operator,
    operands: OperandKind,
    operand: CompilingType,
    result: CompilingType,
) -> BinaryResolution {
    BinaryResolution {
        left: operand,
        right: operand,
        result,
        op: BinaryOp {
            operator,
            operands,
            shape: Shape::Uniform,
        },
    }
}

/// Common type on the byte/char → integer → real ladder.
fn promote(left: &CompilingType, right: &CompilingType) -> Option<CompilingType> {
    let rank = left.numeric_rank()?.max(right.numeric_rank()?);
    Some(if rank == 2 {
        CompilingType::REAL
    } else {
        CompilingType::INTEGER
    })
}

fn integral(ty: &CompilingType) -> bool {
    matches!(ty.numeric_rank(), Some(0 | 1))
}

fn numeric_kind(ty: &CompilingType) -> OperandKind {
    if *ty == CompilingType::REAL {
        OperandKind::Real
    } else {
        OperandKind::Integer
    }
}

fn stringifiable(ty: &CompilingType) -> bool {
    ty.numeric_rank().is_some()
        || ty.is_vector()
        || ty.is_enum()
        || matches!(
            *ty,
            CompilingType::BOOL | CompilingType::STRING | CompilingType::TYPE
        )
}

fn related_handles(left: &CompilingType, right: &CompilingType, resolver: &dyn Resolver) -> bool {
    if left.is_null() || right.is_null() {
        return left.is_handle() || right.is_handle() || left == right;
    }
    if !left.is_handle() || !right.is_handle() {
        return false;
    }
    if left == right {
        return true;
    }
    if left.dimension != right.dimension {
        return false;
    }
    if left.dimension > 0 {
        return left.definition == right.definition;
    }
    resolver
        .inherit_distance(&left.definition, &right.definition)
        .or_else(|| resolver.inherit_distance(&right.definition, &left.definition))
        .is_some()
}

/// Resolves `left <operator> right`.
///
/// `compound` is set for compound assignments, which additionally accept
/// `realN += realM` / `realN -= realM` across dimensions (the right side is
/// resized to the left). Scalar-left vector multiplication is only
/// available on the plain operator, and `scalar / vector` never is.
pub fn resolve_binary(
    operator: Operator,
    left: &CompilingType,
    right: &CompilingType,
    compound: bool,
    resolver: &dyn Resolver,
) -> Option<BinaryResolution> {
    use Operator::*;

    if left.is_array() || right.is_array() {
        return match operator {
            Equals | NotEquals if related_handles(left, right, resolver) => Some(handle_compare(
                operator, left, right,
            )),
            _ => None,
        };
    }

    match operator {
        LogicAnd | LogicOr => {
            (*left == CompilingType::BOOL && *right == CompilingType::BOOL).then(|| {
                uniform(operator, OperandKind::Bool, CompilingType::BOOL, CompilingType::BOOL)
            })
        }

        Equals | NotEquals => {
            if let Some(common) = promote(left, right) {
                return Some(uniform(operator, numeric_kind(&common), common, CompilingType::BOOL));
            }
            if left == right {
                let kind = match *left {
                    CompilingType::BOOL => OperandKind::Bool,
                    CompilingType::STRING => OperandKind::String,
                    CompilingType::TYPE => OperandKind::Type,
                    CompilingType::ENTITY => OperandKind::Entity,
                    ty if ty.is_enum() => OperandKind::Integer,
                    ty if ty.is_vector() => OperandKind::Vector(ty.vector_dimension()? as u8),
                    ty if ty.is_handle() => OperandKind::Handle,
                    _ => return None,
                };
                return Some(uniform(operator, kind, *left, CompilingType::BOOL));
            }
            let entity_null = |a: &CompilingType, b: &CompilingType| {
                *a == CompilingType::ENTITY && b.is_null()
            };
            if entity_null(left, right) || entity_null(right, left) {
                return Some(uniform(
                    operator,
                    OperandKind::Entity,
                    CompilingType::ENTITY,
                    CompilingType::BOOL,
                ));
            }
            related_handles(left, right, resolver).then(|| handle_compare(operator, left, right))
        }

        Less | LessEquals | Greater | GreaterEquals => {
            if let Some(common) = promote(left, right) {
                return Some(uniform(operator, numeric_kind(&common), common, CompilingType::BOOL));
            }
            (left == right && left.is_enum())
                .then(|| uniform(operator, OperandKind::Integer, *left, CompilingType::BOOL))
        }

        BitAnd | BitOr | BitXor => {
            if *left == CompilingType::BOOL && *right == CompilingType::BOOL {
                return Some(uniform(operator, OperandKind::Bool, *left, *left));
            }
            if left == right && left.is_enum() {
                return Some(uniform(operator, OperandKind::Integer, *left, *left));
            }
            (integral(left) && integral(right)).then(|| {
                uniform(
                    operator,
                    OperandKind::Integer,
                    CompilingType::INTEGER,
                    CompilingType::INTEGER,
                )
            })
        }

        ShiftLeft | ShiftRight | Mod => (integral(left) && integral(right)).then(|| {
            uniform(
                operator,
                OperandKind::Integer,
                CompilingType::INTEGER,
                CompilingType::INTEGER,
            )
        }),

        Plus | Minus | Mul | Div => {
            if operator == Plus
                && (*left == CompilingType::STRING || *right == CompilingType::STRING)
            {
                return (stringifiable(left) && stringifiable(right)).then(|| {
                    uniform(
                        operator,
                        OperandKind::String,
                        CompilingType::STRING,
                        CompilingType::STRING,
                    )
                });
            }
            if let Some(common) = promote(left, right) {
                return Some(uniform(operator, numeric_kind(&common), common, common));
            }
            resolve_vector(operator, left, right, compound)
        }

        Negative | Not | Inverse | Increment | Decrement | Start => None,
    }
}

fn handle_compare(
    operator: Operator,
    left: &CompilingType,
    right: &CompilingType,
) -> BinaryResolution {
    BinaryResolution {
        left: *left,
        right: *right,
        result: CompilingType::BOOL,
        op: BinaryOp {
            operator,
            operands: OperandKind::Handle,
            shape: Shape::Uniform,
        },
    }
}

fn resolve_vector(
    operator: Operator,
    left: &CompilingType,
    right: &CompilingType,
    compound: bool,
) -> Option<BinaryResolution> {
    let left_vector = left.is_vector().then(|| left.vector_dimension()).flatten();
    let right_vector = right.is_vector().then(|| right.vector_dimension()).flatten();
    let scalar = |ty: &CompilingType| ty.numeric_rank().is_some();

    let with_shape = |shape: Shape, dimension: u32, left_ty, right_ty| {
        let result = CompilingType::vector(dimension)?;
        Some(BinaryResolution {
            left: left_ty,
            right: right_ty,
            result,
            op: BinaryOp {
                operator,
                operands: OperandKind::Vector(dimension as u8),
                shape,
            },
        })
    };

    match (left_vector, right_vector) {
        (Some(l), Some(r)) if l == r => with_shape(Shape::Uniform, l, *left, *right),
        (Some(l), Some(_)) if compound && matches!(operator, Operator::Plus | Operator::Minus) => {
            with_shape(Shape::Uniform, l, *left, *left)
        }
        (Some(l), None) if scalar(right) && matches!(operator, Operator::Mul | Operator::Div) => {
            with_shape(Shape::VectorScalar, l, *left, CompilingType::REAL)
        }
        (None, Some(r)) if !compound && scalar(left) && operator == Operator::Mul => {
            with_shape(Shape::ScalarVector, r, CompilingType::REAL, *right)
        }
        _ => None,
    }
}

/// Resolves a prefix operator, returning the operand target type, the
/// result type and the typed operation.
pub fn resolve_unary(
    operator: Operator,
    operand: &CompilingType,
) -> Option<(CompilingType, CompilingType, UnaryOp)> {
    let (target, kind) = match operator {
        Operator::Not if *operand == CompilingType::BOOL => (*operand, OperandKind::Bool),
        Operator::Inverse if integral(operand) => (CompilingType::INTEGER, OperandKind::Integer),
        Operator::Negative => match operand.numeric_rank() {
            Some(2) => (CompilingType::REAL, OperandKind::Real),
            Some(_) => (CompilingType::INTEGER, OperandKind::Integer),
            None if operand.is_vector() => {
                (*operand, OperandKind::Vector(operand.vector_dimension()? as u8))
            }
            None => return None,
        },
        Operator::Increment | Operator::Decrement => match *operand {
            CompilingType::INTEGER => (*operand, OperandKind::Integer),
            CompilingType::REAL => (*operand, OperandKind::Real),
            _ => return None,
        },
        _ => return None,
    };
    Some((
        target,
        target,
        UnaryOp {
            operator,
            operand: kind,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SymbolTable;
    use pretty_assertions::assert_eq;

    fn binary(
        operator: Operator,
        left: CompilingType,
        right: CompilingType,
        compound: bool,
    ) -> Option<BinaryResolution> {
        resolve_binary(operator, &left, &right, compound, &SymbolTable::new())
    }

    #[test]
    fn test_promotion_ladder() {
        let r = binary(Operator::Plus, CompilingType::BYTE, CompilingType::INTEGER, false).unwrap();
        assert_eq!(r.result, CompilingType::INTEGER);
        assert_eq!(r.left, CompilingType::INTEGER);
        let r = binary(Operator::Mul, CompilingType::INTEGER, CompilingType::REAL, false).unwrap();
        assert_eq!(r.result, CompilingType::REAL);
        assert_eq!(r.op.operands, OperandKind::Real);
        let r = binary(Operator::Less, CompilingType::CHAR, CompilingType::CHAR, false).unwrap();
        assert_eq!(r.result, CompilingType::BOOL);
        assert_eq!(r.op.operands, OperandKind::Integer);
    }

    #[test]
    fn test_vector_dimensions() {
        assert!(binary(Operator::Plus, CompilingType::REAL3, CompilingType::REAL2, false).is_none());
        let r = binary(Operator::Plus, CompilingType::REAL3, CompilingType::REAL2, true).unwrap();
        assert_eq!(r.right, CompilingType::REAL3);
        assert!(binary(Operator::Mul, CompilingType::REAL3, CompilingType::REAL2, true).is_none());
    }

    #[test]
    fn test_vector_scalar_asymmetry() {
        let r = binary(Operator::Mul, CompilingType::REAL, CompilingType::REAL2, false).unwrap();
        assert_eq!(r.op.shape, Shape::ScalarVector);
        let r = binary(Operator::Div, CompilingType::REAL2, CompilingType::INTEGER, false).unwrap();
        assert_eq!((r.op.shape, r.right), (Shape::VectorScalar, CompilingType::REAL));
        assert!(binary(Operator::Div, CompilingType::REAL, CompilingType::REAL2, false).is_none());
        assert!(binary(Operator::Mul, CompilingType::REAL, CompilingType::REAL2, true).is_none());
        assert!(binary(Operator::Mod, CompilingType::REAL2, CompilingType::REAL2, true).is_none());
    }

    #[test]
    fn test_string_concat() {
        let r = binary(Operator::Plus, CompilingType::STRING, CompilingType::INTEGER, false).unwrap();
        assert_eq!(r.right, CompilingType::STRING);
        assert!(binary(Operator::Minus, CompilingType::STRING, CompilingType::STRING, false).is_none());
        assert!(binary(Operator::Plus, CompilingType::STRING, CompilingType::HANDLE, false).is_none());
    }

    #[test]
    fn test_handle_equality_with_null() {
        let r = binary(Operator::Equals, CompilingType::HANDLE, CompilingType::NULL, false).unwrap();
        assert_eq!(r.op.operands, OperandKind::Handle);
        assert!(binary(Operator::Equals, CompilingType::STRING, CompilingType::NULL, false).is_none());
    }

    #[test]
    fn test_priorities() {
        assert!(Operator::Mul.priority() > Operator::Plus.priority());
        assert!(Operator::Plus.priority() > Operator::Less.priority());
        assert!(Operator::LogicAnd.priority() > Operator::LogicOr.priority());
        assert!(Operator::Negative.is_unary());
    }
}
