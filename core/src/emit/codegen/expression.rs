use smallvec::SmallVec;

use super::{EmitResult, FunctionCodegen};
use crate::emit::generator::Label;
use crate::emit::instruction::{Opcode, ValueKind, encode_function, operator_code, shape_code};
use crate::emit::logic_block::LogicBlock;
use crate::emit::variable::{Address, Variable};
use crate::expression::{Callee, Conversion, ExprRef, ExpressionKind, Invocation};
use crate::types::{CompilingType, Constant, Declaration};

/// Values of one evaluated expression, in tuple order.
pub(crate) type Values = SmallVec<[Variable; 2]>;

fn one(variable: Variable) -> EmitResult<Values> {
    Ok(SmallVec::from_elem(variable, 1))
}

/// Storage an assignment or step writes back to.
enum Place {
    Slot(Variable),
    Member {
        target: Variable,
        field: u32,
        ty: CompilingType,
    },
    Element {
        array: Variable,
        index: Variable,
        ty: CompilingType,
    },
}

/// Resolved callee operands.
enum CallTarget {
    Global(Declaration),
    Native(Declaration),
    Member { function: Declaration, target: Variable },
    Virtual { function: Declaration, target: Variable },
    Delegate(Variable),
    Constructor {
        ty: CompilingType,
        function: Declaration,
        dst: Variable,
    },
}

impl CallTarget {
    fn opcode(&self) -> Opcode {
        match self {
            CallTarget::Global(_) => Opcode::Call,
            CallTarget::Native(_) => Opcode::CallNative,
            CallTarget::Member { .. } => Opcode::CallMember,
            CallTarget::Virtual { .. } => Opcode::CallVirtual,
            CallTarget::Delegate(_) => Opcode::CallDelegate,
            CallTarget::Constructor { .. } => Opcode::New,
        }
    }
}

fn is_place(expr: ExprRef<'_>) -> bool {
    matches!(
        expr.kind,
        ExpressionKind::Local(_) | ExpressionKind::Declare(_) | ExpressionKind::Global(_)
    )
}

fn single_type(expr: ExprRef<'_>) -> CompilingType {
    expr.ty()
        .unwrap_or_else(|| panic!("expected a single value, found {} values", expr.returns.len()))
}

impl<'g, 'a> FunctionCodegen<'g, 'a> {
    /// Evaluates a single-valued expression.
    pub(crate) fn evaluate(&mut self, expr: ExprRef<'a>) -> EmitResult<Variable> {
        let values = self.evaluate_values(expr)?;
        match values.as_slice() {
            [value] => Ok(*value),
            other => panic!("expression of {} values used as one value", other.len()),
        }
    }

    /// Evaluates an expression of any arity.
    pub(crate) fn evaluate_values(&mut self, expr: ExprRef<'a>) -> EmitResult<Values> {
        match &expr.kind {
            ExpressionKind::Constant(value) => one(self.constant(value)),
            ExpressionKind::Local(local) => one(self.local(local)),
            ExpressionKind::Declare(local) => {
                let slot = self.local(local);
                self.generator.write(Opcode::Clear);
                self.generator.write(slot.kind());
                self.write_variable(&slot);
                one(slot)
            }
            ExpressionKind::Global(declaration) => one(self.global(declaration, single_type(expr))),
            ExpressionKind::Member {
                target,
                member,
                question,
            } => {
                let target = self.evaluate(target)?;
                let field = self.field(member);
                let dst = self.temporary(single_type(expr));
                let skip = self.skip_if_null(&target, &[dst], *question);
                self.generator.write(Opcode::MemberLoad);
                self.generator.write(dst.kind());
                self.write_variable(&dst);
                self.write_variable(&target);
                self.generator.write(field);
                self.guard();
                self.place_skip(skip)?;
                one(dst)
            }
            ExpressionKind::Invoke(invocation) => self.invoke(invocation, expr.returns),
            ExpressionKind::Tuple(items) => {
                let mut values = Values::new();
                for item in items.iter() {
                    values.extend(self.evaluate_values(*item)?);
                }
                Ok(values)
            }
            ExpressionKind::TupleElement { source, index } => {
                let values = self.evaluate_values(source)?;
                one(values[*index])
            }
            ExpressionKind::Binary { op, left, right } => {
                let mut l = self.evaluate(left)?;
                if is_place(left) && !right.is_pure() {
                    // The right operand may store into the left one.
                    let copy = self.temporary(l.ty);
                    self.move_to(&copy, &l);
                    l = copy;
                }
                let r = self.evaluate(right)?;
                let dst = self.temporary(single_type(expr));
                self.generator.write(Opcode::Binary);
                self.generator.write(operator_code(op.operator));
                self.generator.write(ValueKind::from(op.operands));
                self.generator.write(shape_code(op.shape));
                self.write_variable(&dst);
                self.write_variable(&l);
                self.write_variable(&r);
                self.guard();
                one(dst)
            }
            ExpressionKind::Unary { op, operand } => {
                let src = self.evaluate(operand)?;
                let dst = self.temporary(single_type(expr));
                self.generator.write(Opcode::Unary);
                self.generator.write(operator_code(op.operator));
                self.generator.write(ValueKind::from(op.operand));
                self.write_variable(&dst);
                self.write_variable(&src);
                one(dst)
            }
            ExpressionKind::Logic { and, left, right } => {
                let dst = self.temporary(CompilingType::BOOL);
                let end = self.generator.new_label();
                let l = self.evaluate(left)?;
                self.move_to(&dst, &l);
                // `&&` stops on false, `||` on true.
                self.jump_if(&dst, !*and, end);
                let r = self.evaluate(right)?;
                self.move_to(&dst, &r);
                self.generator.set_label(end)?;
                one(dst)
            }
            ExpressionKind::Convert { source, conversion } => {
                self.convert(source, conversion, single_type(expr))
            }
            ExpressionKind::IsCast { source, target } => {
                let src = self.evaluate(source)?;
                let dst = self.temporary(CompilingType::BOOL);
                self.generator.write(Opcode::IsCast);
                self.write_variable(&dst);
                self.write_variable(&src);
                self.generator.write_type(target);
                one(dst)
            }
            ExpressionKind::VectorConstruct { components } => {
                let mut sources: SmallVec<[(Variable, u8); 4]> = SmallVec::new();
                for component in components.iter() {
                    let variable = self.evaluate(*component)?;
                    let dimension = variable
                        .ty
                        .vector_dimension()
                        .unwrap_or_else(|| panic!("vector component of type {}", variable.ty));
                    sources.push((variable, dimension as u8));
                }
                let dst = self.temporary(single_type(expr));
                self.generator.write(Opcode::VectorConstruct);
                self.write_variable(&dst);
                self.generator.write(sources.len() as u8);
                for (variable, dimension) in &sources {
                    self.write_variable(variable);
                    self.generator.write(*dimension);
                }
                one(dst)
            }
            ExpressionKind::VectorSwizzle { source, components } => {
                let src = self.evaluate(source)?;
                let dst = self.temporary(single_type(expr));
                self.generator.write(Opcode::Swizzle);
                self.write_variable(&dst);
                self.write_variable(&src);
                self.generator.write(components.len() as u8);
                self.generator.write_bytes(components);
                one(dst)
            }
            ExpressionKind::ArrayCreate { length } => {
                let ty = single_type(expr);
                let length = self.evaluate(length)?;
                let dst = self.temporary(ty);
                self.generator.write(Opcode::ArrayCreate);
                self.generator.write_type(&ty.element());
                self.write_variable(&dst);
                self.write_variable(&length);
                self.guard();
                one(dst)
            }
            ExpressionKind::ArrayInit { elements } => {
                let ty = single_type(expr);
                let mut sources: SmallVec<[Variable; 4]> = SmallVec::new();
                for element in elements.iter() {
                    sources.push(self.evaluate(*element)?);
                }
                let dst = self.temporary(ty);
                self.generator.write(Opcode::ArrayInit);
                self.generator.write_type(&ty.element());
                self.write_variable(&dst);
                self.generator.write(sources.len() as u32);
                for source in &sources {
                    self.write_variable(source);
                }
                one(dst)
            }
            ExpressionKind::ArrayElement {
                array,
                index,
                question,
            } => {
                let array = self.evaluate(array)?;
                let index = self.evaluate(index)?;
                let dst = self.temporary(single_type(expr));
                let skip = self.skip_if_null(&array, &[dst], *question);
                self.load_element(&dst, &array, &index);
                self.place_skip(skip)?;
                one(dst)
            }
            ExpressionKind::StringElement { string, index } => {
                let string = self.evaluate(string)?;
                let index = self.evaluate(index)?;
                let dst = self.temporary(CompilingType::CHAR);
                self.generator.write(Opcode::StringElement);
                self.write_variable(&dst);
                self.write_variable(&string);
                self.write_variable(&index);
                self.guard();
                one(dst)
            }
            ExpressionKind::Length(source) => {
                let src = self.evaluate(source)?;
                let dst = self.temporary(CompilingType::INTEGER);
                self.generator.write(if src.ty.is_array() {
                    Opcode::ArrayLength
                } else {
                    Opcode::StringLength
                });
                self.write_variable(&dst);
                self.write_variable(&src);
                one(dst)
            }
            ExpressionKind::Question {
                condition,
                true_value,
                false_value,
            } => {
                let dst = self.temporary(single_type(expr));
                let otherwise = self.generator.new_label();
                let end = self.generator.new_label();
                let condition = self.evaluate(condition)?;
                self.jump_if(&condition, false, otherwise);
                let value = self.evaluate(true_value)?;
                self.move_to(&dst, &value);
                self.jump(end);
                self.generator.set_label(otherwise)?;
                let value = self.evaluate(false_value)?;
                self.move_to(&dst, &value);
                self.generator.set_label(end)?;
                one(dst)
            }
            ExpressionKind::NullCoalesce { value, fallback } => {
                let dst = self.temporary(single_type(expr));
                let end = self.generator.new_label();
                let value = self.evaluate(value)?;
                self.move_to(&dst, &value);
                self.generator.write(Opcode::JumpIfNotNull);
                self.generator.write(dst.kind());
                self.write_variable(&dst);
                self.generator.write_label(end);
                let fallback = self.evaluate(fallback)?;
                self.move_to(&dst, &fallback);
                self.generator.set_label(end)?;
                one(dst)
            }
            ExpressionKind::Assignment { target, source } => self.assign(target, source),
            ExpressionKind::Step { op, prefix, target } => {
                let place = self.place(target)?;
                let current = self.load(&place);
                let previous = if *prefix {
                    None
                } else {
                    let copy = self.temporary(current.ty);
                    self.move_to(&copy, &current);
                    Some(copy)
                };
                self.generator.write(Opcode::Step);
                self.generator.write(operator_code(op.operator));
                self.generator.write(ValueKind::from(op.operand));
                self.write_variable(&current);
                self.store(&place, &current);
                one(previous.unwrap_or(current))
            }
            ExpressionKind::Sequence(items) => {
                let mut values = Values::new();
                for item in items.iter() {
                    values = self.evaluate_values(*item)?;
                }
                Ok(values)
            }
            ExpressionKind::LambdaCreate { function, captures } => {
                let mut sources: SmallVec<[Variable; 4]> = SmallVec::new();
                for capture in captures.iter() {
                    sources.push(self.local(&capture.outer));
                }
                let dst = self.temporary(single_type(expr));
                self.generator.write(Opcode::LambdaCreate);
                self.write_variable(&dst);
                self.generator.write(self.lambda_base + function);
                self.generator.write(sources.len() as u8);
                for source in &sources {
                    self.write_variable(source);
                }
                one(dst)
            }
            ExpressionKind::DelegateCreate { function, target } => {
                let target = match target {
                    Some(target) => Some(self.evaluate(target)?),
                    None => None,
                };
                let dst = self.temporary(single_type(expr));
                self.generator.write(Opcode::DelegateCreate);
                self.write_variable(&dst);
                self.generator.write_bytes(&encode_function(function));
                self.generator.write(target.is_some());
                if let Some(target) = &target {
                    self.write_variable(target);
                }
                one(dst)
            }
            ExpressionKind::TaskCreate { invocation } => {
                let ExpressionKind::Invoke(invocation) = &invocation.kind else {
                    panic!("task created from a non-invocation");
                };
                let call = self.call_target(invocation)?;
                let arguments = self.arguments(invocation)?;
                let dst = self.temporary(single_type(expr));
                self.generator.write(Opcode::Start);
                self.write_variable(&dst);
                self.generator.write(call.opcode() as u8);
                self.write_call_operands(&call, &arguments, None);
                self.guard();
                one(dst)
            }
            ExpressionKind::TaskElement { task, index } => {
                let task = self.evaluate(task)?;
                let dst = self.temporary(single_type(expr));
                self.generator.write(Opcode::TaskElement);
                self.generator.write(dst.kind());
                self.write_variable(&dst);
                self.write_variable(&task);
                self.generator.write(*index as u8);
                self.guard();
                one(dst)
            }
            ExpressionKind::Method(_)
            | ExpressionKind::Lambda(_)
            | ExpressionKind::BlurrySet(_)
            | ExpressionKind::BlurryVariable { .. }
            | ExpressionKind::Type(_)
            | ExpressionKind::Invalid => {
                unreachable!("{:?} reached code generation unresolved", expr.kind)
            }
        }
    }

    pub(super) fn constant(&mut self, value: &Constant<'a>) -> Variable {
        let ty = match value {
            Constant::Null => CompilingType::HANDLE,
            other => other.ty(),
        };
        let dst = self.temporary(ty);
        match *value {
            Constant::Null => {
                self.generator.write(Opcode::ConstNull);
                self.generator.write(ValueKind::Handle);
                self.write_variable(&dst);
            }
            Constant::Bool(v) => {
                self.generator.write(Opcode::ConstBool);
                self.write_variable(&dst);
                self.generator.write(v);
            }
            Constant::Byte(v) => {
                self.generator.write(Opcode::ConstByte);
                self.write_variable(&dst);
                self.generator.write(v);
            }
            Constant::Char(v) => {
                self.generator.write(Opcode::ConstChar);
                self.write_variable(&dst);
                self.generator.write(v);
            }
            Constant::Integer(v) | Constant::Enum(_, v) => {
                self.generator.write(Opcode::ConstInteger);
                self.write_variable(&dst);
                self.generator.write(v);
            }
            Constant::Real(v) => {
                self.generator.write(Opcode::ConstReal);
                self.write_variable(&dst);
                self.generator.write(v);
            }
            Constant::String(v) => {
                let index = self.generator.code_string(v);
                self.generator.write(Opcode::ConstString);
                self.write_variable(&dst);
                self.generator.write(index);
            }
            Constant::Type(ty) => {
                self.generator.write(Opcode::ConstType);
                self.write_variable(&dst);
                self.generator.write_type(&ty);
            }
        }
        dst
    }

    fn global(&self, declaration: &Declaration, ty: CompilingType) -> Variable {
        let Some(offset) = self.resolver.variable_address(declaration) else {
            panic!("global '{}' has no data address", self.resolver.name(declaration));
        };
        Variable {
            address: Address::Global(offset),
            ty,
        }
    }

    fn field(&self, member: &Declaration) -> u32 {
        let Some(offset) = self.resolver.variable_address(member) else {
            panic!("member '{}' has no field offset", self.resolver.name(member));
        };
        offset
    }

    /// For `?.`, `?[` and `?(`: resets `results` and skips to the returned
    /// label when `target` is null.
    fn skip_if_null(
        &mut self,
        target: &Variable,
        results: &[Variable],
        question: bool,
    ) -> Option<Label> {
        if !question {
            return None;
        }
        for result in results {
            self.generator.write(Opcode::Clear);
            self.generator.write(result.kind());
            self.write_variable(result);
        }
        let skip = self.generator.new_label();
        self.generator.write(Opcode::JumpIfNull);
        self.generator.write(target.kind());
        self.write_variable(target);
        self.generator.write_label(skip);
        Some(skip)
    }

    fn place_skip(&mut self, skip: Option<Label>) -> EmitResult<()> {
        match skip {
            Some(label) => self.generator.set_label(label),
            None => Ok(()),
        }
    }

    fn load_element(&mut self, dst: &Variable, array: &Variable, index: &Variable) {
        self.generator.write(Opcode::ArrayLoad);
        self.generator.write(dst.kind());
        self.write_variable(dst);
        self.write_variable(array);
        self.write_variable(index);
        self.guard();
    }

    fn convert(
        &mut self,
        source: ExprRef<'a>,
        conversion: &Conversion,
        ty: CompilingType,
    ) -> EmitResult<Values> {
        if let Conversion::Retype = conversion {
            if matches!(source.constant(), Some(Constant::Null)) {
                let dst = self.temporary(ty);
                self.generator.write(Opcode::ConstNull);
                self.generator.write(dst.kind());
                self.write_variable(&dst);
                return one(dst);
            }
            let src = self.evaluate(source)?;
            if src.kind() == ValueKind::of(&ty) {
                return one(src.retyped(ty));
            }
            let dst = self.temporary(ty);
            self.move_to(&dst, &src);
            return one(dst);
        }

        let src = self.evaluate(source)?;
        let dst = self.temporary(ty);
        match *conversion {
            Conversion::Numeric { from } => {
                self.generator.write(Opcode::Convert);
                self.generator.write(ValueKind::of(&from));
                self.generator.write(dst.kind());
            }
            Conversion::Vector { from, to } => {
                let kind = |dimension: u32| match CompilingType::vector(dimension) {
                    Some(ty) => ValueKind::of(&ty),
                    None => panic!("no vector of dimension {}", dimension),
                };
                self.generator.write(Opcode::VectorResize);
                self.generator.write(kind(from));
                self.generator.write(kind(to));
            }
            Conversion::Stringify { from } => {
                self.generator.write(Opcode::Stringify);
                self.generator.write(ValueKind::of(&from));
            }
            Conversion::Downcast => {
                self.generator.write(Opcode::Downcast);
                self.write_variable(&dst);
                self.write_variable(&src);
                self.generator.write_type(&ty);
                return one(dst);
            }
            Conversion::Retype => unreachable!(),
        }
        self.write_variable(&dst);
        self.write_variable(&src);
        one(dst)
    }

    fn place(&mut self, target: ExprRef<'a>) -> EmitResult<Place> {
        Ok(match &target.kind {
            ExpressionKind::Local(local) | ExpressionKind::Declare(local) => {
                Place::Slot(self.local(local))
            }
            ExpressionKind::Global(declaration) => {
                Place::Slot(self.global(declaration, single_type(target)))
            }
            ExpressionKind::Member { target: object, member, .. } => {
                let object = self.evaluate(object)?;
                Place::Member {
                    target: object,
                    field: self.field(member),
                    ty: single_type(target),
                }
            }
            ExpressionKind::ArrayElement { array, index, .. } => {
                let array = self.evaluate(array)?;
                let index = self.evaluate(index)?;
                Place::Element {
                    array,
                    index,
                    ty: single_type(target),
                }
            }
            other => unreachable!("store into {:?}", other),
        })
    }

    fn load(&mut self, place: &Place) -> Variable {
        match place {
            Place::Slot(variable) => *variable,
            Place::Member { target, field, ty } => {
                let dst = self.temporary(*ty);
                self.generator.write(Opcode::MemberLoad);
                self.generator.write(dst.kind());
                self.write_variable(&dst);
                self.write_variable(target);
                self.generator.write(*field);
                self.guard();
                dst
            }
            Place::Element { array, index, ty } => {
                let dst = self.temporary(*ty);
                self.load_element(&dst, array, index);
                dst
            }
        }
    }

    fn store(&mut self, place: &Place, value: &Variable) {
        match place {
            Place::Slot(variable) => self.move_to(variable, value),
            Place::Member { target, field, ty } => {
                self.generator.write(Opcode::MemberStore);
                self.generator.write(ValueKind::of(ty));
                self.write_variable(target);
                self.generator.write(*field);
                self.write_variable(value);
                self.guard();
            }
            Place::Element { array, index, ty } => {
                self.generator.write(Opcode::ArrayStore);
                self.generator.write(ValueKind::of(ty));
                self.write_variable(array);
                self.write_variable(index);
                self.write_variable(value);
                self.guard();
            }
        }
    }

    /// The source is evaluated before the target's subexpressions.
    fn assign(&mut self, target: ExprRef<'a>, source: ExprRef<'a>) -> EmitResult<Values> {
        if let ExpressionKind::Tuple(items) = &target.kind {
            let values = self.evaluate_values(source)?;
            debug_assert_eq!(values.len(), items.len(), "tuple assignment arity");
            for (item, value) in items.iter().zip(&values) {
                let place = self.place(*item)?;
                self.store(&place, value);
            }
            return Ok(values);
        }
        let value = self.evaluate(source)?;
        let place = self.place(target)?;
        self.store(&place, &value);
        match place {
            Place::Slot(variable) => one(variable),
            _ => one(value),
        }
    }

    fn call_target(&mut self, invocation: &Invocation<'a>) -> EmitResult<CallTarget> {
        Ok(match invocation.callee {
            Callee::Global(function) => CallTarget::Global(function),
            Callee::Native(function) => CallTarget::Native(function),
            Callee::Member { target, function } => CallTarget::Member {
                function,
                target: self.evaluate(target)?,
            },
            Callee::Virtual { target, function } => CallTarget::Virtual {
                function,
                target: self.evaluate(target)?,
            },
            Callee::Delegate(delegate) => CallTarget::Delegate(self.evaluate(delegate)?),
            Callee::Constructor {
                definition,
                function,
            } => {
                let ty = CompilingType::new(definition, 0);
                CallTarget::Constructor {
                    ty,
                    function,
                    dst: self.temporary(ty),
                }
            }
        })
    }

    fn arguments(&mut self, invocation: &Invocation<'a>) -> EmitResult<SmallVec<[Variable; 4]>> {
        let mut arguments = SmallVec::new();
        for argument in invocation.arguments.iter() {
            arguments.push(self.evaluate(*argument)?);
        }
        Ok(arguments)
    }

    fn invoke(
        &mut self,
        invocation: &Invocation<'a>,
        returns: &'a [CompilingType],
    ) -> EmitResult<Values> {
        let call = self.call_target(invocation)?;
        let arguments = self.arguments(invocation)?;
        if let CallTarget::Constructor { dst, .. } = call {
            self.generator.write(Opcode::New);
            self.write_call_operands(&call, &arguments, None);
            self.guard();
            return one(dst);
        }

        let results: Values = returns.iter().map(|ty| self.temporary(*ty)).collect();
        let skip = match &call {
            CallTarget::Delegate(delegate) => {
                let delegate = *delegate;
                self.skip_if_null(&delegate, &results, invocation.question)
            }
            _ => None,
        };
        self.generator.write(call.opcode());
        self.write_call_operands(&call, &arguments, Some(&results));
        self.guard();
        self.place_skip(skip)?;
        Ok(results)
    }

    /// Callee operands, then `argc arg*`, then `retc ret*` unless
    /// `results` is `None`.
    fn write_call_operands(
        &mut self,
        call: &CallTarget,
        arguments: &[Variable],
        results: Option<&[Variable]>,
    ) {
        match call {
            CallTarget::Global(function) | CallTarget::Native(function) => {
                self.generator.write_bytes(&encode_function(function));
            }
            CallTarget::Member { function, target } | CallTarget::Virtual { function, target } => {
                self.generator.write_bytes(&encode_function(function));
                self.write_variable(target);
            }
            CallTarget::Delegate(delegate) => self.write_variable(delegate),
            CallTarget::Constructor { ty, function, dst } => {
                self.generator.write_type(ty);
                self.generator.write_bytes(&encode_function(function));
                self.write_variable(dst);
            }
        }
        self.generator.write(arguments.len() as u8);
        for argument in arguments {
            self.write_variable(argument);
        }
        if let Some(results) = results {
            self.generator.write(results.len() as u8);
            for result in results {
                self.write_variable(result);
            }
        }
    }

    /// Body of a lambda: its value goes to the return slots.
    pub(crate) fn expression_body(
        &mut self,
        body: ExprRef<'a>,
        returns: &[CompilingType],
    ) -> EmitResult<()> {
        self.mark_line(body.anchor.line);
        let mut block = LogicBlock::open(self);
        let values = block.evaluate_values(body)?;
        if !returns.is_empty() {
            block.store_returns(&values);
        }
        block.close()
    }

    pub(crate) fn store_returns(&mut self, values: &[Variable]) {
        for (index, value) in values.iter().enumerate() {
            let slot = self.variables.return_slot(index);
            self.generator.write(Opcode::ReturnStore);
            self.generator.write(value.kind());
            self.generator.write(slot);
            self.write_variable(value);
        }
    }
}
