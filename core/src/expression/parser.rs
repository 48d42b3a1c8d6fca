//! Operator-precedence expression parser with integrated typing.
//!
//! `try_parse` first routes on top-level separators (sequence, lambda,
//! assignment, ternary, tuple, null-coalesce), then runs a shunting-yard
//! scan over what is left. Operators are reduced as soon as a lower or
//! equal priority operator arrives, resolving operand types and folding
//! constants on the way.

use bumpalo::Bump;
use tracing::trace;

use super::attribute::Attribute;
use super::expr::{ExprRef, Expression, ExpressionKind, LambdaFunction, MethodGroup};
use super::fold::{Folded, fold_binary, fold_unary};
use super::local::LocalContext;
use super::operator::{Operator, resolve_binary, resolve_unary};
use super::split::{
    Split, SplitFlag, closing_symbol, find_split, matching_close, split_all, try_sub,
};
use crate::diagnostics::{Diagnostics, ErrorKind};
use crate::resolver::Resolver;
use crate::syntax::{Anchor, Lexical, LexicalType, keyword, literal};
use crate::types::{CompilingType, Constant, DeclarationCode};

/// Parses the expressions of one function.
///
/// Owns the function's local scopes and the lambdas compiled so far; the
/// resolver is only read.
pub struct ExpressionParser<'a> {
    arena: &'a Bump,
    resolver: &'a dyn Resolver,
    pub diagnostics: Diagnostics,
    pub locals: LocalContext<'a>,
    pub lambdas: Vec<LambdaFunction<'a>>,
}

#[derive(Debug, Clone)]
struct Pending {
    operator: Operator,
    anchor: Anchor,
}

/// Operand and operator stacks of one shunting-yard pass.
struct Scan<'a> {
    operands: Vec<ExprRef<'a>>,
    operators: Vec<Pending>,
    /// Attribute of the last pushed item; `OPERATOR` while an operand is due.
    attribute: Attribute,
}

impl<'a> Scan<'a> {
    fn new() -> Self {
        Scan {
            operands: Vec::new(),
            operators: Vec::new(),
            attribute: Attribute::OPERATOR,
        }
    }

    fn expecting(&self) -> bool {
        self.attribute.contains(Attribute::OPERATOR)
    }

    fn push_operand(&mut self, operand: ExprRef<'a>) {
        self.attribute = operand.attribute;
        self.operands.push(operand);
    }

    fn push_operator(&mut self, pending: Pending) {
        self.attribute = Attribute::OPERATOR;
        self.operators.push(pending);
    }

    fn pop_operand(&mut self) -> ExprRef<'a> {
        self.operands
            .pop()
            .expect("operand stack checked by attribute gating")
    }
}

impl<'a> ExpressionParser<'a> {
    pub fn new(arena: &'a Bump, resolver: &'a dyn Resolver) -> Self {
        ExpressionParser {
            arena,
            resolver,
            diagnostics: Diagnostics::new(),
            locals: LocalContext::new(),
            lambdas: Vec::new(),
        }
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    pub fn resolver(&self) -> &'a dyn Resolver {
        self.resolver
    }

    pub(crate) fn report(&mut self, anchor: &Anchor, kind: ErrorKind) {
        self.diagnostics.report(anchor, kind);
    }

    pub(crate) fn type_name(&self, ty: &CompilingType) -> String {
        self.resolver.type_name(ty)
    }

    pub(crate) fn node(
        &self,
        anchor: Anchor,
        returns: &[CompilingType],
        kind: ExpressionKind<'a>,
    ) -> ExprRef<'a> {
        let attribute = match &kind {
            ExpressionKind::Type(_) => Attribute::TYPE,
            ExpressionKind::Method(_) => Attribute::METHOD,
            ExpressionKind::BlurryVariable { .. } => Attribute::ASSIGNABLE,
            other => {
                let mut attribute = Attribute::of_tuple(returns);
                if other.is_assignable() {
                    attribute |= Attribute::ASSIGNABLE;
                }
                if matches!(other, ExpressionKind::Constant(_)) {
                    attribute |= Attribute::CONSTANT;
                }
                attribute
            }
        };
        self.arena.alloc(Expression {
            anchor,
            returns: self.arena.alloc_slice_copy(returns),
            attribute,
            kind,
        })
    }

    pub(crate) fn invalid(&self, anchor: Anchor) -> ExprRef<'a> {
        self.node(anchor, &[CompilingType::INVALID], ExpressionKind::Invalid)
    }

    pub(crate) fn constant(&self, anchor: Anchor, value: Constant<'a>) -> ExprRef<'a> {
        self.node(anchor, &[value.ty()], ExpressionKind::Constant(value))
    }

    pub(crate) fn alloc_exprs(&self, items: &[ExprRef<'a>]) -> &'a [ExprRef<'a>] {
        self.arena.alloc_slice_copy(items)
    }

    /// Parses one logical expression (TryParse).
    pub fn try_parse(&mut self, tokens: &'a [Lexical<'a>]) -> Option<ExprRef<'a>> {
        let first = tokens.first()?;
        if try_sub(tokens, SplitFlag::empty(), &mut self.diagnostics) == Split::Unbalanced {
            return None;
        }
        trace!(line = first.anchor.line, count = tokens.len(), "Parsing expression");
        self.parse(tokens)
    }

    /// Parses a comma separated list of expressions (TryParseTuple).
    pub fn try_parse_tuple(&mut self, tokens: &'a [Lexical<'a>]) -> Option<&'a [ExprRef<'a>]> {
        let first = tokens.first()?;
        if try_sub(tokens, SplitFlag::empty(), &mut self.diagnostics) == Split::Unbalanced {
            return None;
        }
        let around = first.anchor.clone();
        let items = self.parse_items(tokens, &around)?;
        Some(self.alloc_exprs(&items))
    }

    /// Parses a balanced slice, reporting `MissingExpression` at `around`
    /// when it is empty.
    pub(crate) fn parse_part(
        &mut self,
        tokens: &'a [Lexical<'a>],
        around: &Anchor,
    ) -> Option<ExprRef<'a>> {
        if tokens.is_empty() {
            self.report(around, ErrorKind::MissingExpression);
            return None;
        }
        self.parse(tokens)
    }

    /// Parses every comma separated item, continuing past failed items so
    /// each reports its own diagnostics.
    pub(crate) fn parse_items(
        &mut self,
        tokens: &'a [Lexical<'a>],
        around: &Anchor,
    ) -> Option<Vec<ExprRef<'a>>> {
        let mut items = Vec::new();
        let mut failed = false;
        for part in split_all(tokens, SplitFlag::COMMA) {
            let around = part.first().map_or(around.clone(), |t| t.anchor.clone());
            match self.parse_part(part, &around) {
                Some(item) => items.push(item),
                None => failed = true,
            }
        }
        (!failed).then_some(items)
    }

    /// Structural dispatch. The order matters: every separator checked
    /// here binds looser than any value operator.
    pub(crate) fn parse(&mut self, tokens: &'a [Lexical<'a>]) -> Option<ExprRef<'a>> {
        debug_assert!(!tokens.is_empty());
        if let Some(at) = find_split(tokens, SplitFlag::SEMICOLON) {
            return self.parse_sequence(tokens, at);
        }
        if let Some(at) = find_split(tokens, SplitFlag::LAMBDA) {
            return self.parse_lambda(tokens, at);
        }
        if let Some(at) = find_split(tokens, SplitFlag::ASSIGNMENT) {
            return self.parse_assignment(tokens, at);
        }
        if let Some(at) = find_split(tokens, SplitFlag::QUESTION) {
            return self.parse_question(tokens, at);
        }
        if find_split(tokens, SplitFlag::COMMA).is_some() {
            return self.parse_tuple(tokens);
        }
        if let Some(at) = find_split(tokens, SplitFlag::QUESTION_NULL) {
            return self.parse_null_coalesce(tokens, at);
        }
        self.parse_operators(tokens)
    }

    fn parse_operators(&mut self, tokens: &'a [Lexical<'a>]) -> Option<ExprRef<'a>> {
        let mut scan = Scan::new();
        let mut index = 0;
        while index < tokens.len() {
            index = self.scan_token(&mut scan, tokens, index)?;
        }
        if scan.expecting() {
            let last = &tokens[tokens.len() - 1];
            self.report(&last.anchor, ErrorKind::MissingExpression);
            return None;
        }
        while let Some(pending) = scan.operators.pop() {
            self.reduce(&mut scan, pending)?;
        }
        debug_assert_eq!(scan.operands.len(), 1);
        scan.operands.pop()
    }

    fn unexpected(&mut self, token: &Lexical<'_>) -> Option<usize> {
        self.report(
            &token.anchor,
            ErrorKind::UnexpectedToken {
                text: token.text.to_string(),
            },
        );
        None
    }

    /// Consumes the token at `index` and returns the index of the next one.
    fn scan_token(
        &mut self,
        scan: &mut Scan<'a>,
        tokens: &'a [Lexical<'a>],
        index: usize,
    ) -> Option<usize> {
        let token = &tokens[index];
        let expecting = scan.expecting();

        match token.kind {
            LexicalType::BracketLeft0 | LexicalType::QuestionInvoke => {
                let close = self.close_of(tokens, index)?;
                let inner = &tokens[index + 1..close];
                let anchor = token.anchor.to(&tokens[close].anchor);
                let question = token.kind == LexicalType::QuestionInvoke;
                if expecting {
                    if question {
                        return self.unexpected(token);
                    }
                    let inner = self.parse_part(inner, &anchor)?;
                    scan.push_operand(inner);
                } else {
                    let callee = scan.pop_operand();
                    let arguments = if inner.is_empty() {
                        Vec::new()
                    } else {
                        self.parse_items(inner, &anchor)?
                    };
                    let call = self.parse_call(callee, &arguments, anchor, question)?;
                    scan.push_operand(call);
                }
                Some(close + 1)
            }

            LexicalType::BracketLeft1 | LexicalType::QuestionIndex => {
                if expecting {
                    return self.unexpected(token);
                }
                let close = self.close_of(tokens, index)?;
                let inner = &tokens[index + 1..close];
                let anchor = token.anchor.to(&tokens[close].anchor);
                let target = scan.pop_operand();
                let question = token.kind == LexicalType::QuestionIndex;
                let indexed = self.parse_index(target, inner, anchor, question)?;
                scan.push_operand(indexed);
                Some(close + 1)
            }

            LexicalType::BracketLeft2 => {
                if !expecting {
                    return self.unexpected(token);
                }
                let close = self.close_of(tokens, index)?;
                let inner = &tokens[index + 1..close];
                let anchor = token.anchor.to(&tokens[close].anchor);
                let items = if inner.is_empty() {
                    Vec::new()
                } else {
                    self.parse_items(inner, &anchor)?
                };
                let items = self.alloc_exprs(&items);
                let set = self.node(anchor, &[CompilingType::BLURRY], ExpressionKind::BlurrySet(items));
                scan.push_operand(set);
                Some(close + 1)
            }

            LexicalType::Dot | LexicalType::QuestionDot => {
                if expecting {
                    return self.unexpected(token);
                }
                let Some(name) = tokens.get(index + 1).filter(|t| t.kind == LexicalType::Word)
                else {
                    self.report(&token.anchor, ErrorKind::MissingExpression);
                    return None;
                };
                let target = scan.pop_operand();
                let question = token.kind == LexicalType::QuestionDot;
                let member = self.parse_member(target, name, question)?;
                scan.push_operand(member);
                Some(index + 2)
            }

            LexicalType::Increment | LexicalType::Decrement => {
                let operator = if token.kind == LexicalType::Increment {
                    Operator::Increment
                } else {
                    Operator::Decrement
                };
                if expecting {
                    scan.push_operator(Pending {
                        operator,
                        anchor: token.anchor.clone(),
                    });
                } else {
                    let target = scan.pop_operand();
                    let anchor = target.anchor.to(&token.anchor);
                    let step = self.make_step(operator, target, anchor, false)?;
                    scan.push_operand(step);
                }
                Some(index + 1)
            }

            kind if kind.is_constant() => {
                if !expecting {
                    return self.unexpected(token);
                }
                let constant = self.parse_literal(token)?;
                scan.push_operand(constant);
                Some(index + 1)
            }

            LexicalType::Word => self.scan_word(scan, tokens, index),

            LexicalType::Unknown => None,

            kind => {
                if expecting {
                    let Some(operator) = Operator::prefix(kind) else {
                        return self.unexpected(token);
                    };
                    scan.push_operator(Pending {
                        operator,
                        anchor: token.anchor.clone(),
                    });
                } else {
                    let Some(operator) = Operator::binary(kind) else {
                        return self.unexpected(token);
                    };
                    self.push_binary(scan, operator, token.anchor.clone())?;
                }
                Some(index + 1)
            }
        }
    }

    fn close_of(&mut self, tokens: &[Lexical<'_>], open: usize) -> Option<usize> {
        let close = matching_close(tokens, open);
        if close.is_none() {
            self.report(
                &tokens[open].anchor,
                ErrorKind::MissingPairedSymbol {
                    expected: closing_symbol(&tokens[open]),
                },
            );
        }
        close
    }

    fn push_binary(&mut self, scan: &mut Scan<'a>, operator: Operator, anchor: Anchor) -> Option<()> {
        while let Some(top) = scan.operators.last() {
            if top.operator.priority() < operator.priority() {
                break;
            }
            let pending = scan.operators.pop()?;
            self.reduce(scan, pending)?;
        }
        scan.push_operator(Pending { operator, anchor });
        Some(())
    }

    fn scan_word(
        &mut self,
        scan: &mut Scan<'a>,
        tokens: &'a [Lexical<'a>],
        index: usize,
    ) -> Option<usize> {
        let token = &tokens[index];
        let expecting = scan.expecting();
        let anchor = token.anchor.clone();

        match token.text {
            keyword::TRUE | keyword::FALSE | keyword::NULL => {
                if !expecting {
                    return self.unexpected(token);
                }
                let value = match token.text {
                    keyword::TRUE => Constant::Bool(true),
                    keyword::FALSE => Constant::Bool(false),
                    _ => Constant::Null,
                };
                scan.push_operand(self.constant(anchor, value));
                Some(index + 1)
            }
            keyword::AND | keyword::OR => {
                if expecting {
                    return self.unexpected(token);
                }
                let operator = if token.text == keyword::AND {
                    Operator::LogicAnd
                } else {
                    Operator::LogicOr
                };
                self.push_binary(scan, operator, anchor)?;
                Some(index + 1)
            }
            keyword::IS | keyword::AS => {
                if expecting {
                    return self.unexpected(token);
                }
                let Some((target, next)) = self.parse_type_name(tokens, index + 1) else {
                    self.report(&anchor, ErrorKind::MissingExpression);
                    return None;
                };
                let source = scan.pop_operand();
                let anchor = source.anchor.to(&tokens[next - 1].anchor);
                let cast = if token.text == keyword::IS {
                    self.make_is(source, target, anchor)?
                } else {
                    self.try_explicit_convert(source, &target, anchor)?
                };
                scan.push_operand(cast);
                Some(next)
            }
            keyword::VAR => {
                let name = tokens
                    .get(index + 1)
                    .filter(|t| t.kind == LexicalType::Word && !keyword::is_keyword(t.text));
                let Some(name) = name.filter(|_| expecting) else {
                    return self.unexpected(token);
                };
                let anchor = anchor.to(&name.anchor);
                let variable = self.node(
                    anchor,
                    &[CompilingType::BLURRY],
                    ExpressionKind::BlurryVariable { name: name.text },
                );
                scan.push_operand(variable);
                Some(index + 2)
            }
            keyword::START => {
                if !expecting {
                    return self.unexpected(token);
                }
                scan.push_operator(Pending {
                    operator: Operator::Start,
                    anchor,
                });
                Some(index + 1)
            }
            word if keyword::is_keyword(word) => self.unexpected(token),
            word => {
                if !expecting {
                    // `Type name` declares a local.
                    if scan.attribute.contains(Attribute::TYPE) {
                        let ty = match scan.pop_operand().kind {
                            ExpressionKind::Type(ty) => ty,
                            _ => unreachable!("TYPE attribute on a non-type expression"),
                        };
                        let declared = self.declare_local(word, anchor, ty)?;
                        scan.push_operand(declared);
                        return Some(index + 1);
                    }
                    return self.unexpected(token);
                }
                let operand = self.resolve_name(word, anchor)?;
                scan.push_operand(operand);
                Some(index + 1)
            }
        }
    }

    pub(crate) fn declare_local(
        &mut self,
        name: &'a str,
        anchor: Anchor,
        ty: CompilingType,
    ) -> Option<ExprRef<'a>> {
        match self.locals.add_local(name, anchor.clone(), ty) {
            Ok(local) => Some(self.node(anchor, &[ty], ExpressionKind::Declare(local))),
            Err(_) => {
                self.report(
                    &anchor,
                    ErrorKind::DuplicateLocal {
                        name: name.to_string(),
                    },
                );
                None
            }
        }
    }

    /// Binds a word in operand position: local, kernel type, then resolver.
    fn resolve_name(&mut self, name: &'a str, anchor: Anchor) -> Option<ExprRef<'a>> {
        if let Some(local) = self.locals.find(name) {
            let ty = local.ty;
            return Some(self.node(anchor, &[ty], ExpressionKind::Local(local)));
        }
        if let Some(ty) = CompilingType::from_kernel_name(name) {
            return Some(self.node(anchor, &[], ExpressionKind::Type(ty)));
        }

        let declarations = self.resolver.find(name);
        let Some(first) = declarations.first().copied() else {
            self.report(
                &anchor,
                ErrorKind::UndefinedName {
                    name: name.to_string(),
                },
            );
            return None;
        };

        match first.code {
            DeclarationCode::Definition
            | DeclarationCode::Interface
            | DeclarationCode::Enum
            | DeclarationCode::Delegate
            | DeclarationCode::Task => {
                let definition = self.resolver.definition(&first)?;
                let ty = CompilingType::new(definition, 0);
                Some(self.node(anchor, &[], ExpressionKind::Type(ty)))
            }
            DeclarationCode::GlobalVariable => {
                let ty = self.resolver.variable_type(&first)?;
                Some(self.node(anchor, &[ty], ExpressionKind::Global(first)))
            }
            DeclarationCode::Constant => {
                let value = self.resolver.constant_value(&first)?;
                Some(self.constant(anchor, value))
            }
            _ => {
                let candidates: Vec<_> = declarations.into_iter().filter(|d| d.is_function()).collect();
                if candidates.is_empty() {
                    self.report(
                        &anchor,
                        ErrorKind::UndefinedName {
                            name: name.to_string(),
                        },
                    );
                    return None;
                }
                let group = MethodGroup {
                    name,
                    candidates: self.arena.alloc_slice_copy(&candidates),
                    target: None,
                    question: false,
                };
                Some(self.node(anchor, &[], ExpressionKind::Method(group)))
            }
        }
    }

    /// Reads a type name (`real3`, `Shape`, `integer[][]`) starting at
    /// `index`. Returns the type and the index after it.
    pub(crate) fn parse_type_name(
        &mut self,
        tokens: &[Lexical<'a>],
        index: usize,
    ) -> Option<(CompilingType, usize)> {
        let word = tokens.get(index).filter(|t| t.kind == LexicalType::Word)?;
        let mut ty = match CompilingType::from_kernel_name(word.text) {
            Some(ty) => ty,
            None => {
                let declaration = self
                    .resolver
                    .find(word.text)
                    .into_iter()
                    .find(|d| self.resolver.definition(d).is_some())?;
                CompilingType::new(self.resolver.definition(&declaration)?, 0)
            }
        };
        let mut next = index + 1;
        while tokens.get(next).map(|t| t.kind) == Some(LexicalType::BracketLeft1)
            && tokens.get(next + 1).map(|t| t.kind) == Some(LexicalType::BracketRight1)
        {
            ty = ty.array_of();
            next += 2;
        }
        Some((ty, next))
    }

    fn parse_literal(&mut self, token: &'a Lexical<'a>) -> Option<ExprRef<'a>> {
        let anchor = token.anchor.clone();
        let value = match token.kind {
            LexicalType::ConstNumber => literal::parse_integer(token.text, 10).map(Constant::Integer),
            LexicalType::ConstBinary => {
                literal::parse_integer(&token.text[2..], 2).map(Constant::Integer)
            }
            LexicalType::ConstHexadecimal => {
                literal::parse_integer(&token.text[2..], 16).map(Constant::Integer)
            }
            LexicalType::ConstReal => literal::parse_real(token.text).map(Constant::Real),
            LexicalType::ConstChars => {
                literal::decode_chars(self.arena, token.text).map(|value| match value {
                    literal::CharsValue::Char(c) => Constant::Char(c),
                    literal::CharsValue::Integer(v) => Constant::Integer(v),
                })
            }
            LexicalType::ConstString => {
                literal::unescape(self.arena, token.text, '"').map(Constant::String)
            }
            _ => unreachable!("parse_literal on {:?}", token.kind),
        };
        match value {
            Ok(value) => Some(self.constant(anchor, value)),
            Err(error) => {
                self.report(
                    &anchor,
                    ErrorKind::InvalidLiteral {
                        message: error.to_string(),
                    },
                );
                None
            }
        }
    }

    fn reduce(&mut self, scan: &mut Scan<'a>, pending: Pending) -> Option<()> {
        let result = if pending.operator.is_unary() {
            let operand = scan.pop_operand();
            let anchor = pending.anchor.to(&operand.anchor);
            match pending.operator {
                Operator::Start => self.make_task(operand, anchor)?,
                Operator::Increment | Operator::Decrement => {
                    self.make_step(pending.operator, operand, anchor, true)?
                }
                operator => self.make_unary(operator, operand, anchor)?,
            }
        } else {
            let right = scan.pop_operand();
            let left = scan.pop_operand();
            let anchor = left.anchor.to(&right.anchor);
            self.make_binary(pending.operator, left, right, anchor, false)?
        };
        // The reduced value replaces the operands; what follows is decided
        // by the scan, not by this value.
        scan.operands.push(result);
        Some(())
    }

    fn make_unary(
        &mut self,
        operator: Operator,
        operand: ExprRef<'a>,
        anchor: Anchor,
    ) -> Option<ExprRef<'a>> {
        if operand.is_invalid() {
            return Some(self.invalid(anchor));
        }
        let resolved = operand.ty().and_then(|ty| resolve_unary(operator, &ty));
        let Some((target, result, op)) = resolved else {
            let operands = operand
                .ty()
                .map_or_else(|| "a tuple".to_string(), |ty| self.type_name(&ty));
            self.report(
                &anchor,
                ErrorKind::InvalidOperator {
                    operator: operator.symbol(),
                    operands,
                },
            );
            return None;
        };
        let operand = self.try_assignment_convert(operand, &target)?;
        if let Some(value) = operand.constant().and_then(|c| fold_unary(&op, c)) {
            return Some(self.constant(anchor, value));
        }
        Some(self.node(anchor, &[result], ExpressionKind::Unary { op, operand }))
    }

    pub(crate) fn make_step(
        &mut self,
        operator: Operator,
        target: ExprRef<'a>,
        anchor: Anchor,
        prefix: bool,
    ) -> Option<ExprRef<'a>> {
        if !target.attribute.contains(Attribute::ASSIGNABLE) || target.ty().is_none() {
            self.report(&target.anchor, ErrorKind::NotAssignable);
            return None;
        }
        let ty = target.ty()?;
        let Some((_, result, op)) = resolve_unary(operator, &ty) else {
            self.report(
                &anchor,
                ErrorKind::InvalidOperator {
                    operator: operator.symbol(),
                    operands: self.type_name(&ty),
                },
            );
            return None;
        };
        Some(self.node(anchor, &[result], ExpressionKind::Step { op, prefix, target }))
    }

    /// Resolves, converts and folds `left operator right`.
    pub(crate) fn make_binary(
        &mut self,
        operator: Operator,
        left: ExprRef<'a>,
        right: ExprRef<'a>,
        anchor: Anchor,
        compound: bool,
    ) -> Option<ExprRef<'a>> {
        if left.is_invalid() || right.is_invalid() {
            return Some(self.invalid(anchor));
        }
        let (Some(left_ty), Some(right_ty)) = (left.ty(), right.ty()) else {
            self.report(
                &anchor,
                ErrorKind::InvalidOperator {
                    operator: operator.symbol(),
                    operands: "a tuple".to_string(),
                },
            );
            return None;
        };
        let Some(resolution) = resolve_binary(operator, &left_ty, &right_ty, compound, self.resolver)
        else {
            let operands = format!("{} and {}", self.type_name(&left_ty), self.type_name(&right_ty));
            self.report(
                &anchor,
                ErrorKind::InvalidOperator {
                    operator: operator.symbol(),
                    operands,
                },
            );
            return None;
        };

        let left = self.convert_operand(left, &resolution.left)?;
        let right = self.convert_operand(right, &resolution.right)?;

        if matches!(operator, Operator::LogicAnd | Operator::LogicOr) {
            let and = operator == Operator::LogicAnd;
            if let (Some(Constant::Bool(l)), Some(Constant::Bool(r))) = (left.constant(), right.constant()) {
                let value = if and { *l && *r } else { *l || *r };
                return Some(self.constant(anchor, Constant::Bool(value)));
            }
            return Some(self.node(
                anchor,
                &[CompilingType::BOOL],
                ExpressionKind::Logic { and, left, right },
            ));
        }

        let op = resolution.op;
        let divides = matches!(operator, Operator::Div | Operator::Mod);
        if let (Some(l), Some(r)) = (left.constant(), right.constant()) {
            match fold_binary(self.arena, &op, l, r) {
                Folded::Value(value) => return Some(self.constant(anchor, value)),
                Folded::DivideByZero => self.report(&right.anchor, ErrorKind::DivideByZero),
                Folded::Deferred => {}
            }
        } else if divides && right.constant().is_some_and(|c| c.is_zero()) {
            self.report(&right.anchor, ErrorKind::DivideByZero);
        }

        Some(self.node(
            anchor,
            &[resolution.result],
            ExpressionKind::Binary { op, left, right },
        ))
    }
}
