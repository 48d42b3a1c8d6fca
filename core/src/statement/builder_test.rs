use bumpalo::Bump;
use indoc::indoc;
use pretty_assertions::assert_eq;

use super::*;
use crate::diagnostics::{Diagnostics, ErrorKind, Severity};
use crate::expression::ExpressionParser;
use crate::resolver::SymbolTable;
use crate::syntax::{Anchor, Line, lexer::tokenize};
use crate::types::CompilingType;

fn lines(source: &str) -> Vec<Line<'_>> {
    let mut diagnostics = Diagnostics::new();
    let lines = tokenize(0, source, 4, &mut diagnostics);
    assert!(diagnostics.is_empty(), "lexer diagnostics: {:?}", diagnostics);
    lines
}

/// Builds `lines` as the body of a function taking `a: integer`.
fn build<'a>(
    arena: &'a Bump,
    table: &'a SymbolTable,
    lines: &'a [Line<'a>],
    returns: &'a [CompilingType],
) -> (Block<'a>, Diagnostics) {
    let mut parser = ExpressionParser::new(arena, table);
    parser
        .locals
        .add_local("a", Anchor::default(), CompilingType::INTEGER)
        .expect("fresh frame");
    let body = StatementBuilder::new(&mut parser, returns).build(lines, Anchor::default());
    (body, parser.diagnostics)
}

fn kinds(diagnostics: &Diagnostics) -> Vec<ErrorKind> {
    diagnostics.iter().map(|d| d.kind.clone()).collect()
}

fn ends_in_return(block: &Block<'_>) -> bool {
    matches!(block.statements.last(), Some(Statement::Return { .. }))
}

#[test]
fn test_if_else_returns_on_all_paths() {
    crate::test_utils::init_test_logging();
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines(indoc! {"
        if a > 0
            return 1
        else
            return 0
    "});
    let (body, diagnostics) = build(&arena, &table, &lines, &[CompilingType::INTEGER]);

    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert_eq!(body.statements.len(), 1);
    let Statement::Branch(branch) = &body.statements[0] else {
        panic!("expected a branch, got {:?}", body.statements[0]);
    };
    assert!(ends_in_return(&branch.true_branch));
    assert!(ends_in_return(branch.false_branch.as_ref().expect("else block")));
}

#[test]
fn test_elif_chain_nests_to_the_right() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines(indoc! {"
        if a == 1
            return 10
        elif a == 2
            return 20
        elif a == 3
            return 30
        else
            return 0
    "});
    let (body, diagnostics) = build(&arena, &table, &lines, &[CompilingType::INTEGER]);

    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert_eq!(body.statements.len(), 1);

    let mut depth = 0;
    let mut current = &body.statements[0];
    loop {
        let Statement::Branch(branch) = current else {
            panic!("expected a branch, got {:?}", current);
        };
        depth += 1;
        assert_eq!(branch.chained, depth > 1);
        let false_branch = branch.false_branch.as_ref().expect("every link has a false block");
        if !false_branch.is_chained() {
            assert!(ends_in_return(false_branch));
            break;
        }
        current = &false_branch.statements[0];
    }
    assert_eq!(depth, 3);
}

#[test]
fn test_missing_else_does_not_return_on_all_paths() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines(indoc! {"
        if a > 0
            return 1
    "});
    let (_, diagnostics) = build(&arena, &table, &lines, &[CompilingType::INTEGER]);
    assert_eq!(kinds(&diagnostics), vec![ErrorKind::NotAllPathsReturn]);
}

#[test]
fn test_endless_loop_counts_as_returning_until_it_breaks() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let endless = lines(indoc! {"
        while
            a += 1
            return a
    "});
    let (_, diagnostics) = build(&arena, &table, &endless, &[CompilingType::INTEGER]);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let breaking = lines(indoc! {"
        while
            break a > 3
            a += 1
    "});
    let (body, diagnostics) = build(&arena, &table, &breaking, &[CompilingType::INTEGER]);
    assert_eq!(kinds(&diagnostics), vec![ErrorKind::NotAllPathsReturn]);
    let Statement::Loop(l) = &body.statements[0] else {
        panic!("expected a loop");
    };
    assert!(l.condition.is_none());
    match &l.body.statements[0] {
        Statement::Jump(jump) => {
            assert_eq!(jump.target, Some(l.id));
            assert!(jump.condition.is_some());
        }
        other => panic!("expected a jump, got {:?}", other),
    }
}

#[test]
fn test_endless_loop_without_return_is_reported() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    for source in ["while\n    a += 1\n", "while true\n    a += 1\n"] {
        let lines = lines(source);
        let (_, diagnostics) = build(&arena, &table, &lines, &[CompilingType::INTEGER]);
        assert_eq!(kinds(&diagnostics), vec![ErrorKind::NotAllPathsReturn], "{}", source);
    }
}

#[test]
fn test_jumps_bind_to_innermost_loop() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines(indoc! {"
        while a < 10
            while a < 5
                break
            continue
    "});
    let (body, diagnostics) = build(&arena, &table, &lines, &[]);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let Statement::Loop(outer) = &body.statements[0] else {
        panic!("expected a loop");
    };
    let Statement::Loop(inner) = &outer.body.statements[0] else {
        panic!("expected a nested loop");
    };
    assert_ne!(outer.id, inner.id);
    match (&inner.body.statements[0], &outer.body.statements[1]) {
        (Statement::Jump(brk), Statement::Jump(cont)) => {
            assert_eq!((brk.kind, brk.target), (JumpKind::Break, Some(inner.id)));
            assert_eq!((cont.kind, cont.target), (JumpKind::Continue, Some(outer.id)));
        }
        other => panic!("unexpected statements {:?}", other),
    }
}

#[test]
fn test_jump_errors() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines(indoc! {"
        break
        while a < 3
            try
                continue
    "});
    let (_, diagnostics) = build(&arena, &table, &lines, &[]);
    assert_eq!(
        kinds(&diagnostics),
        vec![
            ErrorKind::JumpOutsideLoop { keyword: "break" },
            ErrorKind::JumpLeavesTry { keyword: "continue" },
        ]
    );
}

#[test]
fn test_for_declares_loop_local() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines(indoc! {"
        for integer i = 0, i < 10, i++
            a += i
        for a
    "});
    let (body, diagnostics) = build(&arena, &table, &lines, &[]);

    assert_eq!(kinds(&diagnostics), vec![ErrorKind::InvalidForClauses]);
    assert_eq!(body.statements.len(), 1);
    let Statement::Loop(l) = &body.statements[0] else {
        panic!("expected a loop");
    };
    assert_eq!(l.kind, LoopKind::For);
    assert_eq!((l.init.len(), l.step.len()), (1, 1));
    let names: Vec<&str> = l.locals.iter().map(|local| local.name).collect();
    assert_eq!(names, vec!["i"]);
}

#[test]
fn test_else_placement_errors() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines(indoc! {"
        a = 1
        else
            a = 2
        while a < 3
            a += 1
        else
            a = 0
        else
            a = 5
    "});
    let (body, diagnostics) = build(&arena, &table, &lines, &[]);

    assert_eq!(
        kinds(&diagnostics),
        vec![ErrorKind::ElseWithoutBranch, ErrorKind::DuplicateElse]
    );
    let Statement::Loop(l) = &body.statements[1] else {
        panic!("expected a loop");
    };
    assert!(l.else_block.is_some());
    // Markers never survive assembly.
    assert!(
        !body
            .statements
            .iter()
            .any(|s| matches!(s, Statement::ElseMarker { .. }))
    );
}

#[test]
fn test_try_clauses() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines(indoc! {"
        try
            exit 3
        catch code
            a = code
        finally
            a = 0
        finally
            a = 1
    "});
    let (body, diagnostics) = build(&arena, &table, &lines, &[]);

    assert_eq!(
        kinds(&diagnostics),
        vec![ErrorKind::MisplacedClause { keyword: "finally" }]
    );
    let Statement::Try(t) = &body.statements[0] else {
        panic!("expected a try");
    };
    let catch = t.catch.as_ref().expect("catch clause");
    let code = catch.exit_code.as_ref().expect("exit code local");
    assert_eq!((code.name, code.ty), ("code", CompilingType::INTEGER));
    assert!(t.finally.is_some());
}

#[test]
fn test_return_cannot_leave_finally() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines(indoc! {"
        try
            return 1
        finally
            a = 0
        return 2
    "});
    let (_, diagnostics) = build(&arena, &table, &lines, &[CompilingType::INTEGER]);
    assert_eq!(kinds(&diagnostics), vec![ErrorKind::ReturnLeavesFinally]);
}

#[test]
fn test_statement_type_checks() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines(indoc! {"
        if a
            a = 1
        a + 1
        return
        wait a
    "});
    let (_, diagnostics) = build(&arena, &table, &lines, &[CompilingType::INTEGER]);

    let found: Vec<(&'static str, Severity)> =
        diagnostics.iter().map(|d| (d.code, d.severity)).collect();
    assert_eq!(
        found,
        vec![
            ("E107", Severity::Error),
            ("W001", Severity::Warning),
            ("E111", Severity::Error),
            ("E101", Severity::Error),
            ("E201", Severity::Error),
        ]
    );
}

#[test]
fn test_unexpected_indent_under_simple_statement() {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let lines = lines(indoc! {"
        a = 1
            a = 2
    "});
    let (body, diagnostics) = build(&arena, &table, &lines, &[]);
    assert_eq!(kinds(&diagnostics), vec![ErrorKind::UnexpectedIndent]);
    assert_eq!(body.statements.len(), 1);
}
