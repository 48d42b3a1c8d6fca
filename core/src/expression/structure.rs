//! Routines for the separators that bind looser than any operator.

use super::attribute::Attribute;
use super::expr::{BlurryLambda, ExprRef, ExpressionKind};
use super::operator::Operator;
use super::parser::ExpressionParser;
use super::split::{SplitFlag, find_split, split_all};
use crate::diagnostics::ErrorKind;
use crate::syntax::{Anchor, Lexical, LexicalType, keyword};
use crate::types::{CompilingType, Constant};

impl<'a> ExpressionParser<'a> {
    pub(crate) fn parse_sequence(
        &mut self,
        tokens: &'a [Lexical<'a>],
        at: usize,
    ) -> Option<ExprRef<'a>> {
        let mut items = Vec::new();
        let mut failed = false;
        for part in split_all(tokens, SplitFlag::SEMICOLON) {
            let around = part.first().unwrap_or(&tokens[at]).anchor.clone();
            match self.parse_part(part, &around) {
                Some(item) => items.push(item),
                None => failed = true,
            }
        }
        if failed {
            return None;
        }
        let anchor = items[0].anchor.to(&items[items.len() - 1].anchor);
        let returns = items[items.len() - 1].returns;
        let items = self.alloc_exprs(&items);
        Some(self.node(anchor, returns, ExpressionKind::Sequence(items)))
    }

    pub(crate) fn parse_lambda(
        &mut self,
        tokens: &'a [Lexical<'a>],
        at: usize,
    ) -> Option<ExprRef<'a>> {
        let arrow = &tokens[at];
        let Some(parameters) = lambda_parameters(&tokens[..at]) else {
            let anchor = tokens[0].anchor.to(&arrow.anchor);
            self.report(&anchor, ErrorKind::InvalidLambdaParameters);
            return None;
        };
        let body = &tokens[at + 1..];
        let Some(last) = body.last() else {
            self.report(&arrow.anchor, ErrorKind::MissingExpression);
            return None;
        };
        let anchor = tokens[0].anchor.to(&last.anchor);
        let lambda = BlurryLambda {
            parameters: self.arena().alloc_slice_copy(&parameters),
            body,
        };
        Some(self.node(anchor, &[CompilingType::BLURRY], ExpressionKind::Lambda(lambda)))
    }

    pub(crate) fn parse_assignment(
        &mut self,
        tokens: &'a [Lexical<'a>],
        at: usize,
    ) -> Option<ExprRef<'a>> {
        let operator = &tokens[at];
        let (left, right) = (&tokens[..at], &tokens[at + 1..]);
        if left.is_empty() || right.is_empty() {
            self.report(&operator.anchor, ErrorKind::MissingExpression);
            return None;
        }
        let targets = self.parse_items(left, &operator.anchor);
        // The source is parsed even when a target failed, for its diagnostics.
        let source = self.parse(right)?;
        let targets = targets?;
        let anchor = tokens[0].anchor.to(&tokens[tokens.len() - 1].anchor);

        if let Some(compound) = Operator::compound(operator.kind) {
            let [target] = targets.as_slice() else {
                self.report(&operator.anchor, ErrorKind::TupleCountMismatch {
                    expected: 1,
                    found: targets.len(),
                });
                return None;
            };
            return self.make_compound(compound, *target, source, anchor);
        }
        debug_assert_eq!(operator.kind, LexicalType::Assignment);
        match targets.as_slice() {
            [target] => self.make_assignment(*target, source, anchor),
            _ => self.make_tuple_assignment(&targets, source, anchor),
        }
    }

    fn check_assignable(&mut self, target: ExprRef<'a>) -> Option<()> {
        if target.attribute.contains(Attribute::ASSIGNABLE) {
            return Some(());
        }
        if !target.is_invalid() {
            self.report(&target.anchor, ErrorKind::NotAssignable);
        }
        None
    }

    /// `var name` takes the type of its first value.
    fn bind_blurry(
        &mut self,
        target: ExprRef<'a>,
        source_ty: Option<CompilingType>,
    ) -> Option<ExprRef<'a>> {
        let ExpressionKind::BlurryVariable { name } = target.kind else {
            return Some(target);
        };
        match source_ty {
            Some(ty) if !ty.is_blurry() && !ty.is_null() && !ty.is_invalid() => {
                self.declare_local(name, target.anchor.clone(), ty)
            }
            _ => {
                self.report(&target.anchor, ErrorKind::CannotInferType);
                None
            }
        }
    }

    pub(crate) fn make_assignment(
        &mut self,
        target: ExprRef<'a>,
        source: ExprRef<'a>,
        anchor: Anchor,
    ) -> Option<ExprRef<'a>> {
        self.check_assignable(target)?;
        let target = self.bind_blurry(target, source.ty())?;
        let ty = target.ty()?;
        let source = self.try_assignment_convert(source, &ty)?;
        Some(self.node(anchor, &[ty], ExpressionKind::Assignment { target, source }))
    }

    fn make_compound(
        &mut self,
        operator: Operator,
        target: ExprRef<'a>,
        source: ExprRef<'a>,
        anchor: Anchor,
    ) -> Option<ExprRef<'a>> {
        self.check_assignable(target)?;
        if matches!(target.kind, ExpressionKind::BlurryVariable { .. }) {
            self.report(&target.anchor, ErrorKind::CannotInferType);
            return None;
        }
        let ty = target.ty()?;
        let value = self.make_binary(operator, target, source, anchor.clone(), true)?;
        let source = self.try_assignment_convert(value, &ty)?;
        Some(self.node(anchor, &[ty], ExpressionKind::Assignment { target, source }))
    }

    fn make_tuple_assignment(
        &mut self,
        targets: &[ExprRef<'a>],
        source: ExprRef<'a>,
        anchor: Anchor,
    ) -> Option<ExprRef<'a>> {
        for target in targets {
            self.check_assignable(*target)?;
        }
        // Either one expression per target or one multi-valued expression.
        let sources: Vec<ExprRef<'a>> = match &source.kind {
            ExpressionKind::Tuple(items) => items.to_vec(),
            _ => vec![source],
        };
        let source_types: Vec<CompilingType> = sources.iter().flat_map(|s| s.returns.iter().copied()).collect();
        if source_types.len() != targets.len() {
            self.report(
                &source.anchor,
                ErrorKind::TupleCountMismatch {
                    expected: targets.len(),
                    found: source_types.len(),
                },
            );
            return None;
        }

        let mut bound = Vec::with_capacity(targets.len());
        for (target, ty) in targets.iter().zip(&source_types) {
            bound.push(self.bind_blurry(*target, Some(*ty))?);
        }
        let target_types: Vec<CompilingType> = bound.iter().filter_map(|t| t.ty()).collect();

        let source = if sources.len() == targets.len() {
            let mut converted = Vec::with_capacity(sources.len());
            for (item, ty) in sources.iter().zip(&target_types) {
                converted.push(self.try_assignment_convert(*item, ty)?);
            }
            let items = self.alloc_exprs(&converted);
            self.node(source.anchor.clone(), &target_types, ExpressionKind::Tuple(items))
        } else {
            // A multi-valued call cannot be converted element-wise.
            for (found, expected) in source_types.iter().zip(&target_types) {
                if !self.is_representation_preserving(found, expected) {
                    self.report(
                        &source.anchor,
                        ErrorKind::TypeMismatch {
                            expected: self.type_name(expected),
                            found: self.type_name(found),
                        },
                    );
                    return None;
                }
            }
            source
        };

        let targets = self.alloc_exprs(&bound);
        let target = self.node(
            anchor.clone(),
            &target_types,
            ExpressionKind::Tuple(targets),
        );
        Some(self.node(anchor, &target_types, ExpressionKind::Assignment { target, source }))
    }

    pub(crate) fn parse_question(
        &mut self,
        tokens: &'a [Lexical<'a>],
        at: usize,
    ) -> Option<ExprRef<'a>> {
        let question = &tokens[at];
        let rest = &tokens[at + 1..];
        let Some(colon) = find_split(rest, SplitFlag::COLON) else {
            self.report(&question.anchor, ErrorKind::MissingColon);
            return None;
        };
        let condition = self.parse_part(&tokens[..at], &question.anchor);
        let true_value = self.parse_part(&rest[..colon], &question.anchor);
        let false_value = self.parse_part(&rest[colon + 1..], &rest[colon].anchor);
        let (condition, true_value, false_value) = (condition?, true_value?, false_value?);
        let condition = self.convert_condition(condition)?;
        let anchor = tokens[0].anchor.to(&tokens[tokens.len() - 1].anchor);

        let ty = self.unify(true_value, false_value)?;
        let true_value = self.try_assignment_convert(true_value, &ty)?;
        let false_value = self.try_assignment_convert(false_value, &ty)?;

        if let Some(Constant::Bool(value)) = condition.constant() {
            return Some(if *value { true_value } else { false_value });
        }
        Some(self.node(
            anchor,
            &[ty],
            ExpressionKind::Question {
                condition,
                true_value,
                false_value,
            },
        ))
    }

    /// Type both branches of a conditional can be converted to, preferring
    /// the cheaper direction.
    fn unify(&mut self, left: ExprRef<'a>, right: ExprRef<'a>) -> Option<CompilingType> {
        let (Some(left_ty), Some(right_ty)) = (left.ty(), right.ty()) else {
            self.report(&left.anchor.to(&right.anchor), ErrorKind::TupleCountMismatch {
                expected: 1,
                found: left.returns.len().max(right.returns.len()),
            });
            return None;
        };
        if left_ty == right_ty && !left_ty.is_blurry() {
            return Some(left_ty);
        }
        let to_left = (!left_ty.is_blurry() && !left_ty.is_null())
            .then(|| self.measure(right, &left_ty))
            .flatten();
        let to_right = (!right_ty.is_blurry() && !right_ty.is_null())
            .then(|| self.measure(left, &right_ty))
            .flatten();
        match (to_left, to_right) {
            (Some(l), Some(r)) if r < l => Some(right_ty),
            (Some(_), _) => Some(left_ty),
            (None, Some(_)) => Some(right_ty),
            (None, None) if left_ty.is_blurry() || right_ty.is_blurry() => {
                self.report(&left.anchor.to(&right.anchor), ErrorKind::CannotInferType);
                None
            }
            (None, None) => {
                self.report(
                    &right.anchor,
                    ErrorKind::TypeMismatch {
                        expected: self.type_name(&left_ty),
                        found: self.type_name(&right_ty),
                    },
                );
                None
            }
        }
    }

    /// Converts a condition to `bool`, reporting `ConditionNotBool`.
    pub fn convert_condition(&mut self, condition: ExprRef<'a>) -> Option<ExprRef<'a>> {
        match condition.ty() {
            Some(CompilingType::BOOL) => Some(condition),
            _ if condition.is_invalid() => None,
            ty => {
                let found = ty.map_or_else(|| "a tuple".to_string(), |t| self.type_name(&t));
                self.report(&condition.anchor, ErrorKind::ConditionNotBool { found });
                None
            }
        }
    }

    pub(crate) fn parse_tuple(&mut self, tokens: &'a [Lexical<'a>]) -> Option<ExprRef<'a>> {
        let anchor = tokens[0].anchor.to(&tokens[tokens.len() - 1].anchor);
        let items = self.parse_items(tokens, &anchor)?;
        let returns: Vec<CompilingType> = items.iter().flat_map(|e| e.returns.iter().copied()).collect();
        let items = self.alloc_exprs(&items);
        Some(self.node(anchor, &returns, ExpressionKind::Tuple(items)))
    }

    pub(crate) fn parse_null_coalesce(
        &mut self,
        tokens: &'a [Lexical<'a>],
        at: usize,
    ) -> Option<ExprRef<'a>> {
        let operator = &tokens[at];
        let value = self.parse_part(&tokens[..at], &operator.anchor);
        let fallback = self.parse_part(&tokens[at + 1..], &operator.anchor);
        let (value, fallback) = (value?, fallback?);
        let anchor = tokens[0].anchor.to(&tokens[tokens.len() - 1].anchor);

        let ty = match value.ty() {
            Some(ty) if ty.is_nullable() => ty,
            ty => {
                let operands = ty.map_or_else(|| "a tuple".to_string(), |t| self.type_name(&t));
                self.report(&anchor, ErrorKind::InvalidOperator {
                    operator: "??",
                    operands,
                });
                return None;
            }
        };
        let fallback = self.try_assignment_convert(fallback, &ty)?;
        Some(self.node(anchor, &[ty], ExpressionKind::NullCoalesce { value, fallback }))
    }
}

/// Parameter names of `x => …`, `() => …` or `(a, b) => …`.
fn lambda_parameters<'a>(tokens: &[Lexical<'a>]) -> Option<Vec<&'a str>> {
    let is_name = |t: &Lexical<'_>| t.kind == LexicalType::Word && !keyword::is_keyword(t.text);
    match tokens {
        [name] if is_name(name) => Some(vec![name.text]),
        [open, inner @ .., close]
            if open.kind == LexicalType::BracketLeft0 && close.kind == LexicalType::BracketRight0 =>
        {
            if inner.is_empty() {
                return Some(Vec::new());
            }
            split_all(inner, SplitFlag::COMMA)
                .into_iter()
                .map(|part| match part {
                    [name] if is_name(name) => Some(name.text),
                    _ => None,
                })
                .collect()
        }
        _ => None,
    }
}
