//! Implicit and explicit conversions (TryAssignmentConvert).
//!
//! Conversions are measured before they are built: overload resolution
//! compares measures without touching the tree, and only the winner's
//! arguments are converted for real.

use super::expr::{Conversion, ExprRef, ExpressionKind, MethodGroup};
use super::fold::fold_convert;
use super::parser::ExpressionParser;
use crate::diagnostics::ErrorKind;
use crate::resolver::{Resolver, Signature};
use crate::syntax::Anchor;
use crate::types::{CompilingType, Constant, Declaration, Definition};

/// One step along byte/char → integer → real.
pub const COST_LADDER: u32 = 0xff;
/// Dropping vector components.
pub const COST_NARROW: u32 = 0xfff;
/// Padding vector components.
pub const COST_WIDEN: u32 = 0xffff;

/// Cost of implicitly converting a value of type `source` to `target`, or
/// `None` when no implicit conversion exists.
pub fn measure_type(resolver: &dyn Resolver, source: &CompilingType, target: &CompilingType) -> Option<u32> {
    if source == target || source.is_invalid() || target.is_invalid() {
        return Some(0);
    }
    if source.is_null() {
        return target.is_nullable().then_some(0);
    }

    if let (Some(from), Some(to)) = (source.numeric_rank(), target.numeric_rank()) {
        return (from < to).then(|| (to - from) * COST_LADDER);
    }

    if let Some(to) = target.vector_dimension() {
        // Scalars climb the ladder to `real` before resizing.
        let (ladder, from) = match (source.numeric_rank(), source.vector_dimension()) {
            (_, Some(from)) => (0, from),
            (Some(rank), None) => ((2 - rank) * COST_LADDER, 1),
            (None, None) => return None,
        };
        let resize = match from.cmp(&to) {
            core::cmp::Ordering::Equal => 0,
            core::cmp::Ordering::Greater => COST_NARROW,
            core::cmp::Ordering::Less => COST_WIDEN,
        };
        return Some(ladder + resize);
    }

    if source.is_handle() && target.is_handle() {
        if source.is_array() {
            return (*target == CompilingType::HANDLE).then_some(1);
        }
        if target.is_array() {
            return None;
        }
        return resolver.inherit_distance(&target.definition, &source.definition);
    }
    None
}

impl<'a> ExpressionParser<'a> {
    /// Parameters and returns of a concrete delegate type.
    pub(crate) fn delegate_signature(&self, target: &CompilingType) -> Option<Signature> {
        if !target.is_delegate() || target.definition == Definition::DELEGATE {
            return None;
        }
        self.resolver().definition_signature(&target.definition)
    }

    /// The overload of `group` whose signature is exactly `signature`.
    pub(crate) fn bind_method(&self, group: &MethodGroup<'a>, signature: &Signature) -> Option<Declaration> {
        group
            .candidates
            .iter()
            .copied()
            .find(|candidate| self.resolver().signature(candidate).as_ref() == Some(signature))
    }

    /// Cost of converting `expr` to `target` (Measure). Invalid
    /// expressions convert to anything for free so one error does not
    /// cascade.
    pub fn measure(&self, expr: ExprRef<'a>, target: &CompilingType) -> Option<u32> {
        if expr.is_invalid() || target.is_invalid() {
            return Some(0);
        }
        match &expr.kind {
            ExpressionKind::Lambda(lambda) => {
                let signature = self.delegate_signature(target)?;
                (signature.parameters.len() == lambda.parameters.len()).then_some(0)
            }
            ExpressionKind::Method(group) => {
                let signature = self.delegate_signature(target)?;
                self.bind_method(group, &signature).map(|_| 0)
            }
            ExpressionKind::BlurrySet(items) => {
                if !target.is_array() {
                    return None;
                }
                let element = target.element();
                items
                    .iter()
                    .all(|item| self.measure(*item, &element).is_some())
                    .then_some(0)
            }
            ExpressionKind::TaskCreate { invocation } if target.is_task() && *target != CompilingType::TASK => {
                let signature = self.resolver().definition_signature(&target.definition)?;
                (signature.returns.as_slice() == invocation.returns).then_some(0)
            }
            _ => measure_type(self.resolver(), &expr.ty()?, target),
        }
    }

    fn retype(&self, expr: ExprRef<'a>, target: &CompilingType) -> ExprRef<'a> {
        self.node(
            expr.anchor.clone(),
            &[*target],
            ExpressionKind::Convert {
                source: expr,
                conversion: Conversion::Retype,
            },
        )
    }

    fn convert_numeric(&self, expr: ExprRef<'a>, from: CompilingType, target: &CompilingType) -> ExprRef<'a> {
        if let Some(value) = expr.constant().and_then(|c| fold_convert(self.arena(), c, target)) {
            return self.constant(expr.anchor.clone(), value);
        }
        self.node(
            expr.anchor.clone(),
            &[*target],
            ExpressionKind::Convert {
                source: expr,
                conversion: Conversion::Numeric { from },
            },
        )
    }

    fn resize_vector(&self, expr: ExprRef<'a>, from: u32, to: u32) -> Option<ExprRef<'a>> {
        if from == to {
            return Some(expr);
        }
        let target = CompilingType::vector(to)?;
        Some(self.node(
            expr.anchor.clone(),
            &[target],
            ExpressionKind::Convert {
                source: expr,
                conversion: Conversion::Vector { from, to },
            },
        ))
    }

    pub(crate) fn stringify(&self, expr: ExprRef<'a>) -> Option<ExprRef<'a>> {
        let from = expr.ty()?;
        if from == CompilingType::STRING {
            return Some(expr);
        }
        if let Some(value) = expr
            .constant()
            .and_then(|c| fold_convert(self.arena(), c, &CompilingType::STRING))
        {
            return Some(self.constant(expr.anchor.clone(), value));
        }
        Some(self.node(
            expr.anchor.clone(),
            &[CompilingType::STRING],
            ExpressionKind::Convert {
                source: expr,
                conversion: Conversion::Stringify { from },
            },
        ))
    }

    /// Builds the conversion of `expr` to `target`. Only called after
    /// [`Self::measure`] accepted the pair.
    fn convert_to(&mut self, expr: ExprRef<'a>, target: &CompilingType) -> Option<ExprRef<'a>> {
        if expr.is_invalid() || expr.ty() == Some(*target) {
            return Some(expr);
        }
        match &expr.kind {
            ExpressionKind::Lambda(lambda) => return self.compile_lambda(expr, lambda, target),
            ExpressionKind::Method(group) => {
                let signature = self.delegate_signature(target)?;
                let function = self.bind_method(group, &signature)?;
                return Some(self.node(
                    expr.anchor.clone(),
                    &[*target],
                    ExpressionKind::DelegateCreate {
                        function,
                        target: group.target,
                    },
                ));
            }
            ExpressionKind::BlurrySet(items) => {
                let element = target.element();
                let mut elements = Vec::with_capacity(items.len());
                for item in items.iter() {
                    elements.push(self.convert_to(*item, &element)?);
                }
                let elements = self.alloc_exprs(&elements);
                return Some(self.node(
                    expr.anchor.clone(),
                    &[*target],
                    ExpressionKind::ArrayInit { elements },
                ));
            }
            _ => {}
        }

        let source = expr.ty()?;
        if source.is_null() || (source.is_handle() && target.is_handle()) {
            return Some(self.retype(expr, target));
        }
        if source.numeric_rank().is_some() && target.numeric_rank().is_some() {
            return Some(self.convert_numeric(expr, source, target));
        }
        let to = target.vector_dimension()?;
        let (expr, from) = match source.vector_dimension() {
            Some(from) => (expr, from),
            None => (self.convert_numeric(expr, source, &CompilingType::REAL), 1),
        };
        self.resize_vector(expr, from, to)
    }

    /// Short description of what `expr` is, for mismatch diagnostics.
    pub(crate) fn describe_value(&self, expr: ExprRef<'a>) -> String {
        match &expr.kind {
            ExpressionKind::Lambda(_) => "a lambda".to_string(),
            ExpressionKind::Method(group) => format!("method group '{}'", group.name),
            ExpressionKind::BlurrySet(_) => "a '{}' set".to_string(),
            ExpressionKind::Type(ty) => format!("type name {}", self.type_name(ty)),
            _ => match expr.returns {
                [] => "no value".to_string(),
                [ty] => self.type_name(ty),
                types => {
                    let names: Vec<String> = types.iter().map(|t| self.type_name(t)).collect();
                    format!("({})", names.join(", "))
                }
            },
        }
    }

    /// Implicitly converts `expr` to `target`, reporting `TypeMismatch`
    /// when no conversion exists.
    pub fn try_assignment_convert(&mut self, expr: ExprRef<'a>, target: &CompilingType) -> Option<ExprRef<'a>> {
        if self.measure(expr, target).is_none() {
            self.report(
                &expr.anchor,
                ErrorKind::TypeMismatch {
                    expected: self.type_name(target),
                    found: self.describe_value(expr),
                },
            );
            return None;
        }
        self.convert_to(expr, target)
    }

    /// Tuple form: converts `items` to `targets` one by one. A single
    /// multi-valued item may also supply every target when its types
    /// already line up.
    pub fn try_assignment_convert_tuple(
        &mut self,
        items: &[ExprRef<'a>],
        targets: &[CompilingType],
        anchor: &Anchor,
    ) -> Option<&'a [ExprRef<'a>]> {
        if let [item] = items {
            if item.returns.len() > 1 && item.returns.len() == targets.len() {
                for (found, expected) in item.returns.iter().zip(targets) {
                    if !self.is_representation_preserving(found, expected) {
                        self.report(
                            &item.anchor,
                            ErrorKind::TypeMismatch {
                                expected: self.type_name(expected),
                                found: self.type_name(found),
                            },
                        );
                        return None;
                    }
                }
                return Some(self.alloc_exprs(items));
            }
        }
        if items.len() != targets.len() {
            self.report(
                anchor,
                ErrorKind::TupleCountMismatch {
                    expected: targets.len(),
                    found: items.len(),
                },
            );
            return None;
        }
        let mut converted = Vec::with_capacity(items.len());
        let mut failed = false;
        for (item, target) in items.iter().zip(targets) {
            match self.try_assignment_convert(*item, target) {
                Some(item) => converted.push(item),
                None => failed = true,
            }
        }
        (!failed).then(|| self.alloc_exprs(&converted))
    }

    /// A value of `found` can be stored as `expected` without any code.
    pub(crate) fn is_representation_preserving(&self, found: &CompilingType, expected: &CompilingType) -> bool {
        found == expected
            || (found.is_null() && expected.is_nullable())
            || (found.is_handle()
                && expected.is_handle()
                && measure_type(self.resolver(), found, expected).is_some())
    }

    /// Converts a binary operand to the type its operator resolved to.
    pub(crate) fn convert_operand(&mut self, expr: ExprRef<'a>, target: &CompilingType) -> Option<ExprRef<'a>> {
        if expr.ty() == Some(*target) {
            return Some(expr);
        }
        if *target == CompilingType::STRING {
            return self.stringify(expr);
        }
        self.try_assignment_convert(expr, target)
    }

    /// `expr as T`.
    pub(crate) fn try_explicit_convert(
        &mut self,
        expr: ExprRef<'a>,
        target: &CompilingType,
        anchor: Anchor,
    ) -> Option<ExprRef<'a>> {
        if self.measure(expr, target).is_some() {
            return self.convert_to(expr, target);
        }
        let Some(source) = expr.ty() else {
            return self.invalid_cast(expr, target, &anchor);
        };

        if source.numeric_rank().is_some() && target.numeric_rank().is_some() {
            return Some(self.convert_numeric(expr, source, target));
        }
        let integral = |ty: &CompilingType| matches!(ty.numeric_rank(), Some(0 | 1));
        if (source.is_enum() && integral(target)) || (integral(&source) && target.is_enum()) {
            if let Some(value) = expr.constant().and_then(|c| fold_convert(self.arena(), c, target)) {
                return Some(self.constant(anchor, value));
            }
            return Some(self.retype(expr, target));
        }
        if let (Some(from), Some(to)) = (source.vector_dimension(), target.vector_dimension()) {
            return self.resize_vector(expr, from, to);
        }
        if source.is_handle()
            && target.is_handle()
            && !source.is_array()
            && !target.is_array()
            && self
                .resolver()
                .inherit_distance(&source.definition, &target.definition)
                .is_some()
        {
            return Some(self.node(
                anchor,
                &[*target],
                ExpressionKind::Convert {
                    source: expr,
                    conversion: Conversion::Downcast,
                },
            ));
        }
        if *target == CompilingType::STRING && !source.is_handle() && source != CompilingType::ENTITY {
            return self.stringify(expr);
        }
        self.invalid_cast(expr, target, &anchor)
    }

    fn invalid_cast(&mut self, expr: ExprRef<'a>, target: &CompilingType, anchor: &Anchor) -> Option<ExprRef<'a>> {
        self.report(
            anchor,
            ErrorKind::InvalidCast {
                from: self.describe_value(expr),
                to: self.type_name(target),
            },
        );
        None
    }

    /// `expr is T`: a run-time type test between related handle types.
    pub(crate) fn make_is(
        &mut self,
        source: ExprRef<'a>,
        target: CompilingType,
        anchor: Anchor,
    ) -> Option<ExprRef<'a>> {
        if source.ty().is_some_and(|ty| ty.is_null()) && target.is_handle() {
            return Some(self.constant(anchor, Constant::Bool(false)));
        }
        let related = source.ty().is_some_and(|ty| {
            ty.is_handle()
                && target.is_handle()
                && ty.dimension == target.dimension
                && (measure_type(self.resolver(), &ty, &target).is_some()
                    || measure_type(self.resolver(), &target, &ty).is_some())
        });
        if !related {
            return self.invalid_cast(source, &target, &anchor);
        }
        Some(self.node(
            anchor,
            &[CompilingType::BOOL],
            ExpressionKind::IsCast { source, target },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SymbolTable;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ladder_costs_add_up() {
        let table = SymbolTable::new();
        let measure = |s, t| measure_type(&table, &s, &t);
        assert_eq!(measure(CompilingType::INTEGER, CompilingType::INTEGER), Some(0));
        assert_eq!(measure(CompilingType::BYTE, CompilingType::INTEGER), Some(COST_LADDER));
        assert_eq!(measure(CompilingType::BYTE, CompilingType::REAL), Some(2 * COST_LADDER));
        assert_eq!(measure(CompilingType::INTEGER, CompilingType::BYTE), None);
        assert_eq!(measure(CompilingType::BYTE, CompilingType::CHAR), None);
    }

    #[test]
    fn test_vector_costs() {
        let table = SymbolTable::new();
        let measure = |s, t| measure_type(&table, &s, &t);
        assert_eq!(measure(CompilingType::REAL4, CompilingType::REAL2), Some(COST_NARROW));
        assert_eq!(measure(CompilingType::REAL2, CompilingType::REAL3), Some(COST_WIDEN));
        assert_eq!(
            measure(CompilingType::INTEGER, CompilingType::REAL3),
            Some(COST_LADDER + COST_WIDEN)
        );
        assert!(COST_NARROW < COST_WIDEN);
    }

    #[test]
    fn test_null_and_handles() {
        let mut table = SymbolTable::new();
        let base = table.add_class("Base", None, &[]);
        let derived = table.add_class("Derived", Some(base), &[]);
        let base = CompilingType::new(base, 0);
        let derived = CompilingType::new(derived, 0);
        assert_eq!(measure_type(&table, &CompilingType::NULL, &base), Some(0));
        assert_eq!(measure_type(&table, &CompilingType::NULL, &CompilingType::ENTITY), Some(0));
        assert_eq!(measure_type(&table, &CompilingType::NULL, &CompilingType::INTEGER), None);
        assert_eq!(measure_type(&table, &derived, &base), Some(1));
        assert_eq!(measure_type(&table, &base, &derived), None);
        assert_eq!(measure_type(&table, &derived.array_of(), &CompilingType::HANDLE), Some(1));
        assert_eq!(measure_type(&table, &derived.array_of(), &base.array_of()), None);
    }
}
