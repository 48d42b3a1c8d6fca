//! Postfix forms applied to the operand on top of the scan: calls,
//! construction, indexing, member access and `start`.

use super::attribute::Attribute;
use super::expr::{Callee, ExprRef, ExpressionKind, Invocation, MethodGroup};
use super::overload::Resolved;
use super::parser::ExpressionParser;
use crate::diagnostics::ErrorKind;
use crate::resolver::Signature;
use crate::syntax::{Anchor, Lexical};
use crate::types::{CompilingType, Declaration, DeclarationCode, TypeCode};

const SWIZZLE_SETS: [&str; 2] = ["xyzw", "rgba"];

/// Component indices of a swizzle like `xy` or `bgr`.
fn swizzle_components(name: &str, dimension: u32) -> Option<Vec<u8>> {
    if name.is_empty() || name.len() > 4 {
        return None;
    }
    SWIZZLE_SETS.iter().find_map(|set| {
        name.chars()
            .map(|c| set.find(c).filter(|&i| (i as u32) < dimension).map(|i| i as u8))
            .collect()
    })
}

impl<'a> ExpressionParser<'a> {
    fn invoke(
        &self,
        anchor: Anchor,
        returns: &[CompilingType],
        callee: Callee<'a>,
        arguments: &'a [ExprRef<'a>],
        question: bool,
    ) -> ExprRef<'a> {
        self.node(
            anchor,
            returns,
            ExpressionKind::Invoke(Invocation {
                callee,
                arguments,
                question,
            }),
        )
    }

    /// `callee(arguments)` or `callee?(arguments)`.
    pub(crate) fn parse_call(
        &mut self,
        callee: ExprRef<'a>,
        arguments: &[ExprRef<'a>],
        anchor: Anchor,
        question: bool,
    ) -> Option<ExprRef<'a>> {
        let anchor = callee.anchor.to(&anchor);
        if callee.is_invalid() || arguments.iter().any(|a| a.is_invalid()) {
            return Some(self.invalid(anchor));
        }

        match &callee.kind {
            ExpressionKind::Method(group) if !question => self.call_method(group, arguments, anchor),
            ExpressionKind::Type(ty) if !question => self.construct(*ty, arguments, anchor),
            _ if callee.attribute.contains(Attribute::CALLABLE) => {
                let signature = callee
                    .ty()
                    .and_then(|ty| self.resolver().definition_signature(&ty.definition));
                let Some(signature) = signature else {
                    self.report(&callee.anchor, ErrorKind::NotCallable);
                    return None;
                };
                let arguments =
                    self.try_assignment_convert_tuple(arguments, &signature.parameters, &anchor)?;
                Some(self.invoke(
                    anchor,
                    &signature.returns,
                    Callee::Delegate(callee),
                    arguments,
                    question,
                ))
            }
            _ => {
                self.report(&callee.anchor, ErrorKind::NotCallable);
                None
            }
        }
    }

    fn call_method(
        &mut self,
        group: &MethodGroup<'a>,
        arguments: &[ExprRef<'a>],
        anchor: Anchor,
    ) -> Option<ExprRef<'a>> {
        let Resolved {
            function,
            signature,
            arguments,
        } = self.resolve_overload(group.name, &anchor, group.candidates, arguments)?;
        let callee = match group.target {
            None if function.code == DeclarationCode::NativeFunction => Callee::Native(function),
            None => Callee::Global(function),
            Some(target) if self.resolver().is_virtual(&function) => Callee::Virtual { target, function },
            Some(target) => Callee::Member { target, function },
        };
        Some(self.invoke(anchor, &signature.returns, callee, arguments, group.question))
    }

    /// `Type(arguments)`: vector construction, kernel casts, class
    /// constructors and delegate wrapping.
    fn construct(
        &mut self,
        ty: CompilingType,
        arguments: &[ExprRef<'a>],
        anchor: Anchor,
    ) -> Option<ExprRef<'a>> {
        if let Some(dimension) = ty.vector_dimension().filter(|_| ty.is_vector()) {
            return self.construct_vector(ty, dimension, arguments, anchor);
        }
        if ty.is_array() {
            self.report(&anchor, ErrorKind::NotCallable);
            return None;
        }

        match ty.definition.code {
            TypeCode::Handle if !ty.definition.is_kernel() => {
                let constructors = self.resolver().constructors(&ty.definition);
                let function = if constructors.is_empty() && arguments.is_empty() {
                    Resolved {
                        function: Declaration::INVALID,
                        signature: Signature::new(&[], &[]),
                        arguments: &[],
                    }
                } else {
                    let name = self.type_name(&ty);
                    self.resolve_overload(&name, &anchor, &constructors, arguments)?
                };
                let callee = Callee::Constructor {
                    definition: ty.definition,
                    function: function.function,
                };
                Some(self.invoke(anchor, &[ty], callee, function.arguments, false))
            }
            TypeCode::Delegate | TypeCode::Struct | TypeCode::Enum => match arguments {
                [argument] if ty.is_delegate() => self.try_assignment_convert(*argument, &ty),
                [argument] => self.try_explicit_convert(*argument, &ty, anchor),
                _ => {
                    self.report(
                        &anchor,
                        ErrorKind::TupleCountMismatch {
                            expected: 1,
                            found: arguments.len(),
                        },
                    );
                    None
                }
            },
            _ => {
                self.report(&anchor, ErrorKind::NotCallable);
                None
            }
        }
    }

    /// `realN(...)` from scalars and smaller vectors whose component
    /// counts add up to `N`, or a resize of a single vector.
    fn construct_vector(
        &mut self,
        ty: CompilingType,
        dimension: u32,
        arguments: &[ExprRef<'a>],
        anchor: Anchor,
    ) -> Option<ExprRef<'a>> {
        if let [argument] = arguments {
            if argument.ty().is_some_and(|t| t.is_vector()) {
                return self.try_explicit_convert(*argument, &ty, anchor);
            }
        }
        let mut components = Vec::with_capacity(arguments.len());
        let mut count = 0;
        for argument in arguments {
            match argument.ty().and_then(|t| t.vector_dimension().filter(|_| t.is_vector())) {
                Some(size) => {
                    count += size;
                    components.push(*argument);
                }
                None => {
                    count += 1;
                    components.push(self.try_assignment_convert(*argument, &CompilingType::REAL)?);
                }
            }
        }
        if count != dimension {
            self.report(
                &anchor,
                ErrorKind::TupleCountMismatch {
                    expected: dimension as usize,
                    found: count as usize,
                },
            );
            return None;
        }
        let components = self.alloc_exprs(&components);
        Some(self.node(anchor, &[ty], ExpressionKind::VectorConstruct { components }))
    }

    /// Value of a constant tuple or task index within `0..count`.
    fn constant_index(&mut self, index: ExprRef<'a>, count: usize) -> Option<usize> {
        let Some(value) = index.constant().and_then(|c| c.as_integer()) else {
            self.report(&index.anchor, ErrorKind::ConstantIndexRequired);
            return None;
        };
        if value < 0 || value as usize >= count {
            self.report(&index.anchor, ErrorKind::IndexOutOfRange { index: value, count });
            return None;
        }
        Some(value as usize)
    }

    /// Return types of a task-typed expression.
    fn task_returns(&self, task: ExprRef<'a>) -> Option<&'a [CompilingType]> {
        if let ExpressionKind::TaskCreate { invocation } = &task.kind {
            return Some(invocation.returns);
        }
        let ty = task.ty()?;
        let signature = self.resolver().definition_signature(&ty.definition)?;
        Some(self.arena().alloc_slice_copy(&signature.returns))
    }

    /// `target[inner]` or `target?[inner]`. On a type name this is either
    /// an array type (`T[]`) or an array creation (`T[n]`).
    pub(crate) fn parse_index(
        &mut self,
        target: ExprRef<'a>,
        inner: &'a [Lexical<'a>],
        anchor: Anchor,
        question: bool,
    ) -> Option<ExprRef<'a>> {
        let anchor = target.anchor.to(&anchor);
        if let ExpressionKind::Type(ty) = target.kind {
            if question {
                self.report(&anchor, ErrorKind::NotIndexable { ty: self.type_name(&ty) });
                return None;
            }
            if inner.is_empty() {
                return Some(self.node(anchor, &[], ExpressionKind::Type(ty.array_of())));
            }
            let length = self.parse(inner)?;
            let length = self.try_assignment_convert(length, &CompilingType::INTEGER)?;
            return Some(self.node(anchor, &[ty.array_of()], ExpressionKind::ArrayCreate { length }));
        }

        let index = self.parse_part(inner, &anchor)?;
        if target.is_invalid() || index.is_invalid() {
            return Some(self.invalid(anchor));
        }

        let Some(ty) = target.ty() else {
            if target.returns.len() < 2 || question {
                let ty = self.describe_value(target);
                self.report(&anchor, ErrorKind::NotIndexable { ty });
                return None;
            }
            let index = self.constant_index(index, target.returns.len())?;
            return Some(self.node(
                anchor,
                &[target.returns[index]],
                ExpressionKind::TupleElement { source: target, index },
            ));
        };

        if ty.is_array() {
            let index = self.try_assignment_convert(index, &CompilingType::INTEGER)?;
            return Some(self.node(
                anchor,
                &[ty.element()],
                ExpressionKind::ArrayElement {
                    array: target,
                    index,
                    question,
                },
            ));
        }
        if ty == CompilingType::STRING && !question {
            let index = self.try_assignment_convert(index, &CompilingType::INTEGER)?;
            return Some(self.node(
                anchor,
                &[CompilingType::CHAR],
                ExpressionKind::StringElement { string: target, index },
            ));
        }
        if ty.is_task() && !question {
            if let Some(returns) = self.task_returns(target) {
                let index = self.constant_index(index, returns.len())?;
                return Some(self.node(
                    anchor,
                    &[returns[index]],
                    ExpressionKind::TaskElement { task: target, index },
                ));
            }
        }
        self.report(&anchor, ErrorKind::NotIndexable { ty: self.type_name(&ty) });
        None
    }

    /// `target.name` or `target?.name`.
    pub(crate) fn parse_member(
        &mut self,
        target: ExprRef<'a>,
        name: &'a Lexical<'a>,
        question: bool,
    ) -> Option<ExprRef<'a>> {
        let anchor = target.anchor.to(&name.anchor);
        if target.is_invalid() {
            return Some(self.invalid(anchor));
        }

        if let ExpressionKind::Type(ty) = target.kind {
            if ty.is_enum() && !question {
                let element = self
                    .resolver()
                    .find_member(&ty.definition, name.text)
                    .into_iter()
                    .find(|d| d.code == DeclarationCode::EnumElement);
                if let Some(value) = element.and_then(|d| self.resolver().constant_value(&d)) {
                    return Some(self.constant(anchor, value));
                }
            }
            return self.unknown_member(&ty, name);
        }

        let Some(ty) = target.ty() else {
            let ty = self.describe_value(target);
            self.report(
                &name.anchor,
                ErrorKind::UnknownMember {
                    ty,
                    name: name.text.to_string(),
                },
            );
            return None;
        };
        if question && !ty.is_nullable() {
            self.report(
                &anchor,
                ErrorKind::InvalidOperator {
                    operator: "?.",
                    operands: self.type_name(&ty),
                },
            );
            return None;
        }

        if name.text == "length" && (ty.is_array() || ty == CompilingType::STRING) {
            return Some(self.node(anchor, &[CompilingType::INTEGER], ExpressionKind::Length(target)));
        }

        if let Some(dimension) = ty.vector_dimension().filter(|_| ty.is_vector()) {
            let Some(components) = swizzle_components(name.text, dimension) else {
                self.report(
                    &name.anchor,
                    ErrorKind::InvalidSwizzle {
                        name: name.text.to_string(),
                    },
                );
                return None;
            };
            let result = CompilingType::vector(components.len() as u32)?;
            let components = self.arena().alloc_slice_copy(&components);
            return Some(self.node(
                anchor,
                &[result],
                ExpressionKind::VectorSwizzle {
                    source: target,
                    components,
                },
            ));
        }

        if ty.is_handle() && !ty.is_array() {
            if let Some(member) = self.find_handle_member(target, &ty, name, question, anchor) {
                return Some(member);
            }
        }
        self.unknown_member(&ty, name)
    }

    /// Walks `ty` and its parents for a field or the overloads of a
    /// method. Overrides hide the parent function with the same signature.
    fn find_handle_member(
        &mut self,
        target: ExprRef<'a>,
        ty: &CompilingType,
        name: &'a Lexical<'a>,
        question: bool,
        anchor: Anchor,
    ) -> Option<ExprRef<'a>> {
        let resolver = self.resolver();
        let mut functions: Vec<Declaration> = Vec::new();
        let mut signatures: Vec<Signature> = Vec::new();
        let mut current = Some(ty.definition);
        while let Some(definition) = current {
            for declaration in resolver.find_member(&definition, name.text) {
                match declaration.code {
                    DeclarationCode::MemberVariable if functions.is_empty() => {
                        let member_ty = resolver.variable_type(&declaration)?;
                        return Some(self.node(
                            anchor,
                            &[member_ty],
                            ExpressionKind::Member {
                                target,
                                member: declaration,
                                question,
                            },
                        ));
                    }
                    DeclarationCode::MemberFunction | DeclarationCode::InterfaceFunction => {
                        let Some(signature) = resolver.signature(&declaration) else {
                            continue;
                        };
                        if !signatures.contains(&signature) {
                            signatures.push(signature);
                            functions.push(declaration);
                        }
                    }
                    _ => {}
                }
            }
            current = resolver.parent(&definition);
        }
        if functions.is_empty() {
            return None;
        }
        let group = MethodGroup {
            name: name.text,
            candidates: self.arena().alloc_slice_copy(&functions),
            target: Some(target),
            question,
        };
        Some(self.node(anchor, &[], ExpressionKind::Method(group)))
    }

    fn unknown_member(&mut self, ty: &CompilingType, name: &Lexical<'_>) -> Option<ExprRef<'a>> {
        self.report(
            &name.anchor,
            ErrorKind::UnknownMember {
                ty: self.type_name(ty),
                name: name.text.to_string(),
            },
        );
        None
    }

    /// `start call`: runs a script call as a new task.
    pub(crate) fn make_task(&mut self, operand: ExprRef<'a>, anchor: Anchor) -> Option<ExprRef<'a>> {
        if operand.is_invalid() {
            return Some(self.invalid(anchor));
        }
        let startable = matches!(
            &operand.kind,
            ExpressionKind::Invoke(Invocation {
                callee: Callee::Global(_)
                    | Callee::Member { .. }
                    | Callee::Virtual { .. }
                    | Callee::Delegate(_),
                ..
            })
        );
        if !startable {
            self.report(
                &anchor,
                ErrorKind::InvalidOperator {
                    operator: "start",
                    operands: self.describe_value(operand),
                },
            );
            return None;
        }
        Some(self.node(
            anchor,
            &[CompilingType::TASK],
            ExpressionKind::TaskCreate { invocation: operand },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_swizzle_components() {
        assert_eq!(swizzle_components("xy", 2), Some(vec![0, 1]));
        assert_eq!(swizzle_components("bgr", 3), Some(vec![2, 1, 0]));
        assert_eq!(swizzle_components("z", 2), None);
        assert_eq!(swizzle_components("xg", 4), None);
        assert_eq!(swizzle_components("xyzwx", 4), None);
    }
}
