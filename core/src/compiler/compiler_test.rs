use indoc::indoc;
use pretty_assertions::assert_eq;

use super::*;
use crate::emit::Opcode;
use crate::resolver::SymbolTable;

const INTEGER: CompilingType = CompilingType::INTEGER;

fn integer_param(name: &str) -> Parameter<'_> {
    Parameter { name, ty: INTEGER }
}

#[test]
fn test_functions_are_laid_out_in_compile_order() {
    crate::test_utils::init_test_logging();
    let mut table = SymbolTable::new();
    table.add_function("square", &[INTEGER], &[INTEGER]);
    let mut compiler = Compiler::new(&table, CompilerOptions::default());

    let parameters = [integer_param("x")];
    let square = compiler
        .compile_function(&FunctionSource {
            name: "square",
            parameters: &parameters,
            returns: &[INTEGER],
            body: "return x * x",
        })
        .unwrap();
    let twice = compiler
        .compile_function(&FunctionSource {
            name: "twice",
            parameters: &parameters,
            returns: &[INTEGER],
            body: "return square(x) + square(x)",
        })
        .unwrap();
    assert_eq!((square, twice), (Some(0), Some(1)));

    let module = compiler.finish().unwrap();
    let names: Vec<&str> = module.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["square", "twice"]);

    // Header 16, one return slot, `x` at 20, one integer temporary at 32.
    let square = module.function("square").unwrap();
    assert_eq!((square.entry, square.frame_size), (0, 40));

    let twice = module.function("twice").unwrap();
    assert!(twice.entry > 0);
    assert_eq!(module.code[twice.entry as usize], Opcode::Enter as u8);
    assert_eq!(module.code.last(), Some(&(Opcode::Return as u8)));
    assert!(module.debug.is_none());
}

#[test]
fn test_source_errors_fail_the_module() {
    let table = SymbolTable::new();
    let mut compiler = Compiler::new(&table, CompilerOptions::default());

    let result = compiler
        .compile_function(&FunctionSource {
            name: "broken",
            parameters: &[],
            returns: &[INTEGER],
            body: "return missing",
        })
        .unwrap();
    assert_eq!(result, None);
    assert!(compiler.diagnostics().has_errors());

    let error = compiler.finish().unwrap_err();
    assert!(
        error
            .diagnostics()
            .iter()
            .any(|d| matches!(&d.kind, ErrorKind::UndefinedName { name } if name == "missing"))
    );
    assert!(error.to_string().starts_with("compilation failed with"));
}

#[test]
fn test_duplicate_parameters_are_reported() {
    let table = SymbolTable::new();
    let mut compiler = Compiler::new(&table, CompilerOptions::default());
    let parameters = [integer_param("x"), integer_param("x")];
    let result = compiler
        .compile_function(&FunctionSource {
            name: "f",
            parameters: &parameters,
            returns: &[],
            body: "x = 1",
        })
        .unwrap();
    assert_eq!(result, None);
    assert!(
        compiler
            .diagnostics()
            .any(|kind| matches!(kind, ErrorKind::DuplicateLocal { .. }))
    );
}

#[test]
fn test_lambdas_follow_their_function() {
    crate::test_utils::init_test_logging();
    let mut table = SymbolTable::new();
    let op = table.add_delegate("Op", &[INTEGER], &[INTEGER]);
    table.add_native("apply", &[CompilingType::new(op, 0), INTEGER], &[INTEGER]);
    let options = CompilerOptions {
        debug: true,
        ..CompilerOptions::default()
    };
    let mut compiler = Compiler::new(&table, options);

    compiler
        .compile_function(&FunctionSource {
            name: "main",
            parameters: &[],
            returns: &[INTEGER],
            body: indoc! {"
                integer n = 3
                return apply(x => x + n, 1)
            "},
        })
        .unwrap();
    let module = compiler.finish().unwrap();

    let names: Vec<&str> = module.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["main", "main$lambda0"]);
    let lambda = module.function("main$lambda0").unwrap();
    assert!(lambda.entry > module.functions[0].entry);

    let debug = module.debug.expect("debug table");
    let locals = |index: usize| -> Vec<String> {
        debug.functions[index]
            .locals
            .iter()
            .map(|local| local.name.clone())
            .collect()
    };
    assert_eq!(locals(0), vec!["n"]);
    // Arguments first, then captured copies.
    assert_eq!(locals(1), vec!["x", "n"]);
    assert_eq!(debug.functions[1].locals[0].offset, 20);
    assert!(!debug.breakpoints.is_empty());
    for &offset in &debug.breakpoints {
        assert_eq!(module.code[offset as usize], Opcode::Breakpoint as u8);
    }
}

#[test]
fn test_global_initializers_fill_the_data_segment() {
    let mut table = SymbolTable::new();
    let limit = table.add_global_variable("limit", INTEGER);
    let title = table.add_global_variable("title", CompilingType::STRING);
    let flag = table.add_global_variable("flag", CompilingType::BOOL);
    let options = CompilerOptions {
        data_size: table.data_size() as usize,
        ..CompilerOptions::default()
    };
    let mut compiler = Compiler::new(&table, options);

    compiler.declare_global(&limit, Constant::Integer(42));
    compiler.declare_global(&title, Constant::String("hello"));
    compiler.declare_global(&flag, Constant::Bool(true));
    let module = compiler.finish().unwrap();

    assert_eq!(module.data.len(), 13);
    assert_eq!(module.data[..8], 42i64.to_le_bytes());
    // The string slot stays zero until the loader fills in the id.
    assert_eq!(module.data[8..12], [0, 0, 0, 0]);
    assert_eq!(module.data[12], 1);
    assert_eq!(module.data_strings.len(), 1);
    assert_eq!(module.data_strings[0].value, "hello");
    assert_eq!(module.data_strings[0].addresses, vec![8]);
}

#[test]
fn test_code_strings_are_shared_across_functions() {
    let mut table = SymbolTable::new();
    table.add_native("print", &[CompilingType::STRING], &[]);
    let mut compiler = Compiler::new(&table, CompilerOptions::default());
    for name in ["first", "second"] {
        compiler
            .compile_function(&FunctionSource {
                name,
                parameters: &[],
                returns: &[],
                body: "print(\"hello\")",
            })
            .unwrap();
    }
    let module = compiler.finish().unwrap();
    assert_eq!(module.code_strings, vec!["hello".to_string()]);

    let mut expected = 1u32.to_le_bytes().to_vec();
    expected.extend_from_slice(&5u32.to_le_bytes());
    expected.extend_from_slice(b"hello");
    assert_eq!(module.encoded_code_strings(), expected);
}
