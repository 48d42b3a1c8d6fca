//! Builds the statement tree of one function body.
//!
//! Lines are first grouped by indentation ([`nest`]); each line is then
//! dispatched on its leading keyword. Header expressions go through the
//! function's [`ExpressionParser`], so locals declared by a header are
//! visible in the block under it.

use tracing::debug;

use super::check::{check_finally_returns, check_return};
use super::jump::init_jump_target;
use super::nest::{LineNode, nest};
use super::stmt::{
    Block, Branch, Catch, Jump, JumpKind, Loop, LoopId, LoopKind, Statement, Try,
};
use crate::diagnostics::ErrorKind;
use crate::expression::split::{Split, SplitFlag, split_all, try_sub};
use crate::expression::{ExprRef, ExpressionKind, ExpressionParser};
use crate::syntax::{Anchor, Lexical, LexicalType, Line, keyword};
use crate::types::CompilingType;

pub struct StatementBuilder<'p, 'a> {
    parser: &'p mut ExpressionParser<'a>,
    returns: &'a [CompilingType],
    next_loop: u32,
}

impl<'p, 'a> StatementBuilder<'p, 'a> {
    /// `returns` are the declared return types of the function. Parameters
    /// must already be declared in the parser's locals.
    pub fn new(parser: &'p mut ExpressionParser<'a>, returns: &'a [CompilingType]) -> Self {
        StatementBuilder {
            parser,
            returns,
            next_loop: 0,
        }
    }

    /// Builds the body, binds jumps and checks returns.
    pub fn build(mut self, lines: &'a [Line<'a>], anchor: Anchor) -> Block<'a> {
        let nodes = nest(lines, &mut self.parser.diagnostics);
        let indent = lines.first().map_or(0, |line| line.indent);
        let mut body = self.build_block(&nodes, indent, anchor.clone());

        let diagnostics = &mut self.parser.diagnostics;
        init_jump_target(&mut body, diagnostics);
        check_finally_returns(&body, diagnostics);
        if !self.returns.is_empty() {
            check_return(&body, &anchor, diagnostics);
        }
        debug!(
            statements = body.statements.len(),
            loops = self.next_loop,
            "Built function body"
        );
        body
    }

    fn build_block(&mut self, nodes: &[LineNode<'a>], indent: u32, anchor: Anchor) -> Block<'a> {
        self.parser.locals.push_scope();
        let mut block = Block::new(indent, anchor);
        for node in nodes {
            self.build_line(node, &mut block);
        }
        block.locals = self.parser.locals.pop_scope();
        block
    }

    /// Block made of the lines nested under `node`.
    fn build_children(&mut self, node: &LineNode<'a>) -> Block<'a> {
        let line = node.line;
        let indent = node.children.first().map_or(line.indent, |child| child.line.indent);
        self.build_block(&node.children, indent, line.anchor.clone())
    }

    fn build_line(&mut self, node: &LineNode<'a>, block: &mut Block<'a>) {
        let line = node.line;
        let Some(first) = line.lexicals.first() else {
            return;
        };
        let rest = &line.lexicals[1..];
        let word = if first.kind == LexicalType::Word {
            first.text
        } else {
            ""
        };

        let statement = match word {
            keyword::IF => Some(Statement::Branch(self.build_branch(node, rest, false))),
            keyword::ELIF => {
                self.build_elif(node, rest, block);
                None
            }
            keyword::ELSE => {
                self.build_else(node, rest, block);
                None
            }
            keyword::WHILE => Some(self.build_while(node, rest)),
            keyword::FOR => self.build_for(node, rest),
            keyword::TRY => {
                self.expect_end(rest);
                let body = self.build_children(node);
                Some(Statement::Try(Try {
                    anchor: first.anchor.clone(),
                    body,
                    catch: None,
                    finally: None,
                }))
            }
            keyword::CATCH => {
                self.build_catch(node, rest, block);
                None
            }
            keyword::FINALLY => {
                self.build_finally(node, rest, block);
                None
            }
            keyword::BREAK | keyword::CONTINUE => {
                self.reject_children(node);
                let kind = if word == keyword::BREAK {
                    JumpKind::Break
                } else {
                    JumpKind::Continue
                };
                self.build_jump(first, kind, rest)
            }
            keyword::RETURN => {
                self.reject_children(node);
                self.build_return(first, rest)
            }
            keyword::WAIT => {
                self.reject_children(node);
                self.build_wait(first, rest)
            }
            keyword::EXIT => {
                self.reject_children(node);
                self.build_exit(first, rest)
            }
            _ => {
                self.reject_children(node);
                self.build_expression(&line.lexicals)
            }
        };
        if let Some(statement) = statement {
            block.statements.push(statement);
        }
    }

    fn reject_children(&mut self, node: &LineNode<'a>) {
        if let Some(child) = node.children.first() {
            self.parser
                .diagnostics
                .report(&child.line.anchor, ErrorKind::UnexpectedIndent);
        }
    }

    fn expect_end(&mut self, rest: &[Lexical<'a>]) {
        if let Some(token) = rest.first() {
            self.parser.diagnostics.report(
                &token.anchor,
                ErrorKind::UnexpectedToken {
                    text: token.text.to_string(),
                },
            );
        }
    }

    /// Parses a bool condition; a failed condition becomes an invalid
    /// placeholder so the statement keeps its shape.
    fn parse_condition(&mut self, tokens: &'a [Lexical<'a>], around: &Anchor) -> ExprRef<'a> {
        if tokens.is_empty() {
            self.parser
                .diagnostics
                .report(around, ErrorKind::MissingExpression);
            return self.parser.invalid(around.clone());
        }
        let condition = self.parser.try_parse(tokens);
        condition
            .and_then(|condition| self.parser.convert_condition(condition))
            .unwrap_or_else(|| self.parser.invalid(tokens[0].anchor.clone()))
    }

    fn build_branch(&mut self, node: &LineNode<'a>, rest: &'a [Lexical<'a>], chained: bool) -> Branch<'a> {
        let anchor = node.line.anchor.clone();
        self.parser.locals.push_scope();
        let condition = self.parse_condition(rest, &anchor);
        let true_branch = self.build_children(node);
        let locals = self.parser.locals.pop_scope();
        Branch {
            anchor,
            condition,
            true_branch,
            false_branch: None,
            chained,
            locals,
        }
    }

    fn build_elif(&mut self, node: &LineNode<'a>, rest: &'a [Lexical<'a>], block: &mut Block<'a>) {
        let anchor = node.line.anchor.clone();
        let branch = self.build_branch(node, rest, true);
        let kind = match block.statements.last_mut() {
            Some(Statement::Branch(head)) => {
                let tail = chain_tail(head);
                if tail.false_branch.is_none() {
                    let mut wrapper = Block::new(node.line.indent, anchor);
                    wrapper.statements.push(Statement::Branch(branch));
                    tail.false_branch = Some(wrapper);
                    return;
                }
                ErrorKind::DuplicateElse
            }
            _ => ErrorKind::ElseWithoutBranch,
        };
        self.parser.diagnostics.report(&anchor, kind);
    }

    /// The marker holds the `else` position while its block is built and
    /// is replaced by that block.
    fn build_else(&mut self, node: &LineNode<'a>, rest: &[Lexical<'a>], block: &mut Block<'a>) {
        let anchor = node.line.anchor.clone();
        self.expect_end(rest);
        block.statements.push(Statement::ElseMarker {
            anchor: anchor.clone(),
        });
        let else_block = self.build_children(node);
        let marker = block.statements.pop();
        debug_assert!(matches!(marker, Some(Statement::ElseMarker { .. })));

        let slot = match block.statements.last_mut() {
            Some(Statement::Branch(head)) => &mut chain_tail(head).false_branch,
            Some(Statement::Loop(l)) => &mut l.else_block,
            _ => {
                self.parser
                    .diagnostics
                    .report(&anchor, ErrorKind::ElseWithoutBranch);
                return;
            }
        };
        if slot.is_some() {
            self.parser.diagnostics.report(&anchor, ErrorKind::DuplicateElse);
            return;
        }
        *slot = Some(else_block);
    }

    fn next_loop_id(&mut self) -> LoopId {
        let id = LoopId(self.next_loop);
        self.next_loop += 1;
        id
    }

    fn build_while(&mut self, node: &LineNode<'a>, rest: &'a [Lexical<'a>]) -> Statement<'a> {
        let anchor = node.line.anchor.clone();
        self.parser.locals.push_scope();
        let condition = (!rest.is_empty()).then(|| self.parse_condition(rest, &anchor));
        let id = self.next_loop_id();
        let body = self.build_children(node);
        let locals = self.parser.locals.pop_scope();
        Statement::Loop(Loop {
            anchor,
            kind: LoopKind::While,
            id,
            init: &[],
            condition,
            step: &[],
            body,
            else_block: None,
            locals,
        })
    }

    /// `for init, condition, step...`. Empty initializer and step parts
    /// are skipped; the condition is required.
    fn build_for(&mut self, node: &LineNode<'a>, rest: &'a [Lexical<'a>]) -> Option<Statement<'a>> {
        let anchor = node.line.anchor.clone();
        if try_sub(rest, SplitFlag::empty(), &mut self.parser.diagnostics) == Split::Unbalanced {
            return None;
        }
        let parts = split_all(rest, SplitFlag::COMMA);
        if parts.len() < 2 || parts[1].is_empty() {
            self.parser
                .diagnostics
                .report(&anchor, ErrorKind::InvalidForClauses);
            return None;
        }

        self.parser.locals.push_scope();
        let init = self.parse_clauses(&parts[..1]);
        let condition = self.parse_condition(parts[1], &anchor);
        let step = self.parse_clauses(&parts[2..]);
        let id = self.next_loop_id();
        let body = self.build_children(node);
        let locals = self.parser.locals.pop_scope();

        Some(Statement::Loop(Loop {
            anchor,
            kind: LoopKind::For,
            id,
            init,
            condition: Some(condition),
            step,
            body,
            else_block: None,
            locals,
        }))
    }

    fn parse_clauses(&mut self, parts: &[&'a [Lexical<'a>]]) -> &'a [ExprRef<'a>] {
        let clauses: Vec<ExprRef<'a>> = parts
            .iter()
            .filter(|part| !part.is_empty())
            .filter_map(|part| self.parser.try_parse(*part))
            .collect();
        self.parser.arena().alloc_slice_copy(&clauses)
    }

    fn build_catch(&mut self, node: &LineNode<'a>, rest: &'a [Lexical<'a>], block: &mut Block<'a>) {
        let anchor = node.line.anchor.clone();
        self.parser.locals.push_scope();
        let exit_code = match rest {
            [] => None,
            [name] if name.kind == LexicalType::Word && !keyword::is_keyword(name.text) => self
                .parser
                .locals
                .add_local(name.text, name.anchor.clone(), CompilingType::INTEGER)
                .ok(),
            [token, ..] => {
                self.expect_end(std::slice::from_ref(token));
                None
            }
        };
        let catch_block = self.build_children(node);
        // The exit code local is owned by the catch, not by a block.
        self.parser.locals.pop_scope();

        match block.statements.last_mut() {
            Some(Statement::Try(t)) if t.catch.is_none() && t.finally.is_none() => {
                t.catch = Some(Catch {
                    anchor,
                    exit_code,
                    block: catch_block,
                });
            }
            _ => self.parser.diagnostics.report(
                &anchor,
                ErrorKind::MisplacedClause {
                    keyword: keyword::CATCH,
                },
            ),
        }
    }

    fn build_finally(&mut self, node: &LineNode<'a>, rest: &[Lexical<'a>], block: &mut Block<'a>) {
        let anchor = node.line.anchor.clone();
        self.expect_end(rest);
        let finally_block = self.build_children(node);
        match block.statements.last_mut() {
            Some(Statement::Try(t)) if t.finally.is_none() => t.finally = Some(finally_block),
            _ => self.parser.diagnostics.report(
                &anchor,
                ErrorKind::MisplacedClause {
                    keyword: keyword::FINALLY,
                },
            ),
        }
    }

    fn build_jump(
        &mut self,
        first: &'a Lexical<'a>,
        kind: JumpKind,
        rest: &'a [Lexical<'a>],
    ) -> Option<Statement<'a>> {
        let condition = (!rest.is_empty()).then(|| self.parse_condition(rest, &first.anchor));
        Some(Statement::Jump(Jump {
            anchor: first.anchor.clone(),
            kind,
            condition,
            target: None,
        }))
    }

    fn build_return(&mut self, first: &'a Lexical<'a>, rest: &'a [Lexical<'a>]) -> Option<Statement<'a>> {
        let anchor = first.anchor.clone();
        let values: &'a [ExprRef<'a>] = if rest.is_empty() {
            if !self.returns.is_empty() {
                self.parser.diagnostics.report(
                    &anchor,
                    ErrorKind::TupleCountMismatch {
                        expected: self.returns.len(),
                        found: 0,
                    },
                );
                return None;
            }
            &[]
        } else {
            let items = self.parser.try_parse_tuple(rest)?;
            let around = anchor.to(&rest[rest.len() - 1].anchor);
            self.parser
                .try_assignment_convert_tuple(items, self.returns, &around)?
        };
        Some(Statement::Return { anchor, values })
    }

    fn build_wait(&mut self, first: &'a Lexical<'a>, rest: &'a [Lexical<'a>]) -> Option<Statement<'a>> {
        let task = if rest.is_empty() {
            None
        } else {
            let task = self.parser.try_parse(rest)?;
            if !task.ty().is_some_and(|ty| ty.is_task()) {
                let found = self.parser.describe_value(task);
                self.parser.diagnostics.report(
                    &task.anchor,
                    ErrorKind::TypeMismatch {
                        expected: "a task".to_string(),
                        found,
                    },
                );
                return None;
            }
            Some(task)
        };
        Some(Statement::Wait {
            anchor: first.anchor.clone(),
            task,
        })
    }

    fn build_exit(&mut self, first: &'a Lexical<'a>, rest: &'a [Lexical<'a>]) -> Option<Statement<'a>> {
        let code = if rest.is_empty() {
            None
        } else {
            let code = self.parser.try_parse(rest)?;
            Some(
                self.parser
                    .try_assignment_convert(code, &CompilingType::INTEGER)?,
            )
        };
        Some(Statement::Exit {
            anchor: first.anchor.clone(),
            code,
        })
    }

    fn build_expression(&mut self, tokens: &'a [Lexical<'a>]) -> Option<Statement<'a>> {
        let expr = self.parser.try_parse(tokens)?;
        match expr.kind {
            ExpressionKind::BlurryVariable { .. } => {
                self.parser
                    .diagnostics
                    .report(&expr.anchor, ErrorKind::CannotInferType);
                return None;
            }
            _ if expr.is_pure() && !expr.is_invalid() => {
                self.parser
                    .diagnostics
                    .report(&expr.anchor, ErrorKind::UnusedValue);
            }
            _ => {}
        }
        Some(Statement::Expression(expr))
    }
}

/// Last branch of an `if`/`elif` chain.
fn chain_tail<'s, 'a>(mut branch: &'s mut Branch<'a>) -> &'s mut Branch<'a> {
    loop {
        if !branch.false_branch.as_ref().is_some_and(Block::is_chained) {
            return branch;
        }
        match branch.false_branch.as_mut().map(|b| &mut b.statements[0]) {
            Some(Statement::Branch(next)) => branch = next,
            _ => unreachable!("chained block holds a branch"),
        }
    }
}
