use bumpalo::Bump;
use pretty_assertions::assert_eq;

use super::*;
use crate::diagnostics::{Diagnostics, ErrorKind};
use crate::resolver::SymbolTable;
use crate::syntax::{Line, lexer::tokenize};
use crate::types::{CompilingType, Constant};

fn lines(source: &str) -> Vec<Line<'_>> {
    let mut diagnostics = Diagnostics::new();
    let lines = tokenize(0, source, 4, &mut diagnostics);
    assert!(diagnostics.is_empty(), "lexer diagnostics: {:?}", diagnostics);
    lines
}

fn constant_of<'a>(expr: Option<ExprRef<'a>>) -> Constant<'a> {
    match expr.map(|e| &e.kind) {
        Some(ExpressionKind::Constant(value)) => *value,
        other => panic!("expected a constant, got {:?}", other),
    }
}

#[test]
fn test_constant_folding_respects_precedence() {
    crate::test_utils::init_test_logging();
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines("3 + 4 * 2\n(3 + 4) * 2\n3 + 4");
    let mut parser = ExpressionParser::new(&arena, &table);

    assert_eq!(constant_of(parser.try_parse(&lines[0].lexicals)), Constant::Integer(11));
    assert_eq!(constant_of(parser.try_parse(&lines[1].lexicals)), Constant::Integer(14));
    assert_eq!(constant_of(parser.try_parse(&lines[2].lexicals)), Constant::Integer(7));
    assert!(parser.diagnostics.is_empty());
}

#[test]
fn test_divide_by_constant_zero_still_yields_expression() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines("5 / 0");
    let mut parser = ExpressionParser::new(&arena, &table);

    let expr = parser.try_parse(&lines[0].lexicals).expect("degraded expression");
    assert!(matches!(expr.kind, ExpressionKind::Binary { .. }));
    assert_eq!(expr.ty(), Some(CompilingType::INTEGER));
    assert!(parser.diagnostics.any(|k| *k == ErrorKind::DivideByZero));
}

#[test]
fn test_string_concatenation_stringifies_operand() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines("\"n=\" + 3");
    let mut parser = ExpressionParser::new(&arena, &table);

    assert_eq!(constant_of(parser.try_parse(&lines[0].lexicals)), Constant::String("n=3"));
}

#[test]
fn test_overload_prefers_exact_match() {
    let arena = Bump::new();
    let mut table = SymbolTable::new();
    let f_byte = table.add_function("f", &[CompilingType::BYTE], &[CompilingType::INTEGER]);
    let f_integer = table.add_function("f", &[CompilingType::INTEGER], &[CompilingType::INTEGER]);
    table.add_global_variable("b", CompilingType::BYTE);
    let lines = lines("f(1)\nf(b)");
    let mut parser = ExpressionParser::new(&arena, &table);

    let callee = |expr: Option<ExprRef<'_>>| match expr.map(|e| &e.kind) {
        Some(ExpressionKind::Invoke(Invocation {
            callee: Callee::Global(function),
            ..
        })) => *function,
        other => panic!("expected a global call, got {:?}", other),
    };
    assert_eq!(callee(parser.try_parse(&lines[0].lexicals)), f_integer);
    assert_eq!(callee(parser.try_parse(&lines[1].lexicals)), f_byte);
    assert!(parser.diagnostics.is_empty());
}

#[test]
fn test_equal_cost_overloads_are_ambiguous() {
    let arena = Bump::new();
    let mut table = SymbolTable::new();
    table.add_function("g", &[CompilingType::INTEGER, CompilingType::REAL], &[]);
    table.add_function("g", &[CompilingType::REAL, CompilingType::INTEGER], &[]);
    let lines = lines("g(1, 1)");
    let mut parser = ExpressionParser::new(&arena, &table);

    assert!(parser.try_parse(&lines[0].lexicals).is_none());
    let diagnostic = parser.diagnostics.iter().next().expect("one diagnostic");
    match &diagnostic.kind {
        ErrorKind::AmbiguousFunction { name, candidates } => {
            assert_eq!(name, "g");
            assert_eq!(candidates, &vec!["g(integer, real)".to_string(), "g(real, integer)".to_string()]);
        }
        other => panic!("unexpected diagnostic {:?}", other),
    }
    assert_eq!(diagnostic.related.len(), 2);
}

#[test]
fn test_operand_after_operand_is_rejected() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines("3 4");
    let mut parser = ExpressionParser::new(&arena, &table);

    assert!(parser.try_parse(&lines[0].lexicals).is_none());
    assert!(parser.diagnostics.any(|k| matches!(k, ErrorKind::UnexpectedToken { text } if text == "4")));
}

#[test]
fn test_var_takes_type_of_first_value() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines("var x = 2.5\nvar y = null");
    let mut parser = ExpressionParser::new(&arena, &table);

    let expr = parser.try_parse(&lines[0].lexicals).expect("assignment");
    match &expr.kind {
        ExpressionKind::Assignment { target, .. } => {
            assert!(matches!(&target.kind, ExpressionKind::Declare(local) if local.name == "x"));
        }
        other => panic!("expected an assignment, got {:?}", other),
    }
    assert_eq!(parser.locals.locals()[0].ty, CompilingType::REAL);

    assert!(parser.try_parse(&lines[1].lexicals).is_none());
    assert!(parser.diagnostics.any(|k| *k == ErrorKind::CannotInferType));
}

#[test]
fn test_tuple_assignment_counts_values() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines("integer a, integer b = 1");
    let mut parser = ExpressionParser::new(&arena, &table);

    assert!(parser.try_parse(&lines[0].lexicals).is_none());
    assert!(
        parser
            .diagnostics
            .any(|k| *k == ErrorKind::TupleCountMismatch { expected: 2, found: 1 })
    );
}

#[test]
fn test_constant_condition_selects_branch() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines("true ? 1 : 2.5");
    let mut parser = ExpressionParser::new(&arena, &table);

    assert_eq!(constant_of(parser.try_parse(&lines[0].lexicals)), Constant::Real(1.0));
}

#[test]
fn test_lambda_captures_outer_local() {
    crate::test_utils::init_test_logging();
    let arena = Bump::new();
    let mut table = SymbolTable::new();
    let op = table.add_delegate("Op", &[CompilingType::INTEGER], &[CompilingType::INTEGER]);
    table.add_function(
        "apply",
        &[CompilingType::new(op, 0), CompilingType::INTEGER],
        &[CompilingType::INTEGER],
    );
    let lines = lines("integer n = 3\napply(x => x + n, 1)");
    let mut parser = ExpressionParser::new(&arena, &table);

    parser.try_parse(&lines[0].lexicals).expect("declaration");
    let call = parser.try_parse(&lines[1].lexicals).expect("call");
    assert_eq!(call.ty(), Some(CompilingType::INTEGER));
    assert!(parser.diagnostics.is_empty(), "{:?}", parser.diagnostics);

    assert_eq!(parser.lambdas.len(), 1);
    let lambda = &parser.lambdas[0];
    assert_eq!(lambda.parameters, 1);
    assert_eq!(lambda.captures.len(), 1);
    assert_eq!(lambda.captures[0].outer.name, "n");
    // The parameter comes first, then the captured copy.
    assert_eq!(lambda.locals.len(), 2);
}

#[test]
fn test_vector_construction_and_swizzle() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines("real3(1, 2, 3).xy\nreal3(1, 2).x");
    let mut parser = ExpressionParser::new(&arena, &table);

    let expr = parser.try_parse(&lines[0].lexicals).expect("swizzle");
    assert_eq!(expr.ty(), Some(CompilingType::REAL2));
    assert!(matches!(expr.kind, ExpressionKind::VectorSwizzle { .. }));

    assert!(parser.try_parse(&lines[1].lexicals).is_none());
    assert!(
        parser
            .diagnostics
            .any(|k| *k == ErrorKind::TupleCountMismatch { expected: 3, found: 2 })
    );
}

#[test]
fn test_undefined_name() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines("missing + 1");
    let mut parser = ExpressionParser::new(&arena, &table);

    assert!(parser.try_parse(&lines[0].lexicals).is_none());
    assert!(parser.diagnostics.any(|k| matches!(k, ErrorKind::UndefinedName { name } if name == "missing")));
}
