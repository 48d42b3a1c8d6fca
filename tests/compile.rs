use indoc::indoc;
use pretty_assertions::assert_eq;
use rain::types::CompilingType;
use rain::{CompilerOptions, Error, ErrorKind, FunctionSource, Parameter, Severity, SymbolTable};

const INTEGER: CompilingType = CompilingType::INTEGER;

fn function<'s>(
    name: &'s str,
    parameters: &'s [Parameter<'s>],
    returns: &'s [CompilingType],
    body: &'s str,
) -> FunctionSource<'s> {
    FunctionSource {
        name,
        parameters,
        returns,
        body,
    }
}

fn error_kinds(error: &Error) -> Vec<ErrorKind> {
    error.diagnostics().iter().map(|d| d.kind.clone()).collect()
}

#[test]
fn test_if_else_function() {
    let table = SymbolTable::new();
    let parameters = [Parameter {
        name: "a",
        ty: INTEGER,
    }];
    let body = indoc! {"
        if a > 0
            return 1
        else
            return 0
    "};
    let module = rain::compile(
        &table,
        CompilerOptions::default(),
        &[function("sign", &parameters, &[INTEGER], body)],
    )
    .unwrap();

    let sign = module.function("sign").unwrap();
    assert_eq!((sign.entry, sign.frame_size), (0, 48));
    assert_eq!(module.lines.entries(), &[(5, 1), (48, 2), (81, 4)]);
    assert_eq!(module.lines.line_of(60), Some(2));
    assert!(module.warnings.is_empty());
}

#[test]
fn test_errors_of_every_function_are_reported() {
    let table = SymbolTable::new();
    let result = rain::compile(
        &table,
        CompilerOptions::default(),
        &[
            function("first", &[], &[], "break"),
            function("second", &[], &[], "integer x = y"),
        ],
    );
    let error = result.unwrap_err();
    assert_eq!(
        error_kinds(&error),
        vec![
            ErrorKind::JumpOutsideLoop { keyword: "break" },
            ErrorKind::UndefinedName {
                name: "y".to_string()
            },
        ]
    );
    assert_eq!(error.to_string(), "compilation failed with 2 error(s)");
}

#[test]
fn test_return_cannot_leave_finally() {
    let table = SymbolTable::new();
    let body = indoc! {"
        try
            return 1
        finally
            integer b = 0
        return 2
    "};
    let error = rain::compile(
        &table,
        CompilerOptions::default(),
        &[function("f", &[], &[INTEGER], body)],
    )
    .unwrap_err();
    assert_eq!(error_kinds(&error), vec![ErrorKind::ReturnLeavesFinally]);
}

#[test]
fn test_warnings_do_not_fail_the_module() {
    let table = SymbolTable::new();
    let parameters = [Parameter {
        name: "a",
        ty: INTEGER,
    }];
    let module = rain::compile(
        &table,
        CompilerOptions::default(),
        &[function("f", &parameters, &[], "a + 1")],
    )
    .unwrap();
    let warnings: Vec<(&str, Severity)> = module
        .warnings
        .iter()
        .map(|d| (d.code, d.severity))
        .collect();
    assert_eq!(warnings, vec![("W001", Severity::Warning)]);
}

#[test]
fn test_loops_and_handlers_compile() {
    let mut table = SymbolTable::new();
    table.add_native("log", &[CompilingType::STRING], &[]);
    let parameters = [Parameter {
        name: "limit",
        ty: INTEGER,
    }];
    let body = indoc! {"
        integer total = 0
        for integer i = 0, i < limit, i++
            continue i % 2 == 0
            total += i
        else
            log(\"done\")
        try
            while
                total -= 1
                break total < 0
        catch code
            total = code
        finally
            log(\"cleanup\")
        return total
    "};
    let options = CompilerOptions {
        debug: true,
        align_locals: true,
        ..CompilerOptions::default()
    };
    let module = rain::compile(
        &table,
        options,
        &[function("odd_sum", &parameters, &[INTEGER], body)],
    )
    .unwrap();

    assert_eq!(module.code_strings, vec!["done".to_string(), "cleanup".to_string()]);
    let debug = module.debug.as_ref().unwrap();
    let locals: Vec<&str> = debug.functions[0]
        .locals
        .iter()
        .map(|local| local.name.as_str())
        .collect();
    assert_eq!(locals, vec!["limit", "total", "i", "code"]);
    for local in &debug.functions[0].locals {
        assert_eq!(local.offset % 8, 0, "{} is aligned", local.name);
    }
    let frame_size = module.functions[0].frame_size;
    assert_eq!(frame_size % 8, 0);
}
