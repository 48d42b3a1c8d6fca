use bumpalo::Bump;
use hashbrown::HashMap;
use indoc::indoc;
use pretty_assertions::assert_eq;

use super::*;
use crate::diagnostics::Diagnostics;
use crate::emit::LogicBlock;
use crate::emit::instruction::ValueKind;
use crate::expression::ExpressionParser;
use crate::resolver::SymbolTable;
use crate::statement::StatementBuilder;
use crate::syntax::{Anchor, Line, lexer::tokenize};

struct Emitted {
    code: Vec<u8>,
    layout: FunctionLayout,
    lines: LineTable,
    breakpoints: Vec<u32>,
}

/// Compiles `source` as the body of a function taking `a: integer`.
fn emit(source: &str, returns: &[CompilingType], debug: bool) -> Emitted {
    let arena = Bump::new();
    let table = SymbolTable::new();
    let mut diagnostics = Diagnostics::new();
    let lines: Vec<Line<'_>> = tokenize(0, source, 4, &mut diagnostics);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let returns: &[CompilingType] = arena.alloc_slice_copy(returns);
    let mut parser = ExpressionParser::new(&arena, &table);
    parser
        .locals
        .add_local("a", Anchor::default(), CompilingType::INTEGER)
        .expect("fresh frame");
    let body = StatementBuilder::new(&mut parser, returns).build(&lines, Anchor::default());
    assert!(parser.diagnostics.is_empty(), "{:?}", parser.diagnostics);
    let parameters = parser.locals.locals()[..1].to_vec();

    let mut generator = Generator::new(0);
    let mut line_table = LineTable::new();
    let mut breakpoints = Vec::new();
    let layout = emit_function(
        Output {
            generator: &mut generator,
            lines: &mut line_table,
            breakpoints: &mut breakpoints,
        },
        &table,
        FrameSignature {
            returns,
            parameters: &parameters,
            captures: &[],
        },
        FunctionBody::Block(&body),
        0,
        debug,
        false,
    )
    .expect("labels and temporaries resolve");
    Emitted {
        code: generator.into_parts().code,
        layout,
        lines: line_table,
        breakpoints,
    }
}

/// Runs `f` against a bare function codegen, then closes the function
/// with `Return` at the exit label.
fn with_codegen(f: impl FnOnce(&mut FunctionCodegen<'_, '_>)) -> Vec<u8> {
    let table = SymbolTable::new();
    let mut generator = Generator::new(0);
    let mut lines = LineTable::new();
    let mut breakpoints = Vec::new();
    let exit = generator.new_label();
    let mut codegen = FunctionCodegen {
        generator: &mut generator,
        lines: &mut lines,
        breakpoints: &mut breakpoints,
        resolver: &table,
        variables: VariableAllocator::new(0, false),
        handler: exit,
        exit,
        loops: HashMap::new(),
        lambda_base: 0,
        debug: false,
    };
    f(&mut codegen);
    assert_eq!(codegen.handler, exit, "logic blocks restore the handler");
    codegen.generator.set_label(exit).unwrap();
    codegen.generator.write(Opcode::Return);
    let FunctionCodegen {
        generator: g,
        variables,
        ..
    } = codegen;
    variables.finish(g).unwrap();
    g.release_labels().unwrap();
    generator.into_parts().code
}

fn u32le(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

#[derive(Default)]
struct Bytes(Vec<u8>);

impl Bytes {
    fn op(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    fn word(self, value: u32) -> Self {
        self.op(&u32le(value))
    }

    fn integer(self, value: i64) -> Self {
        self.op(&value.to_le_bytes())
    }
}

#[test]
fn test_if_else_lowers_to_patched_jumps() {
    crate::test_utils::init_test_logging();
    let emitted = emit(
        indoc! {"
            if a > 0
                return 1
            else
                return 0
        "},
        &[CompilingType::INTEGER],
        false,
    );

    // Frame: header 16, one return slot, `a` at 20, temporaries from 32.
    let exit = 109;
    let expected = Bytes::default()
        .op(&[Opcode::Enter as u8])
        .word(48)
        .op(&[Opcode::ConstInteger as u8])
        .word(32)
        .integer(0)
        .op(&[Opcode::Binary as u8, b'>', ValueKind::Integer as u8, 0])
        .word(40)
        .word(20)
        .word(32)
        .op(&[Opcode::ExitJump as u8])
        .word(exit)
        .op(&[Opcode::JumpIfNot as u8])
        .word(40)
        .word(81)
        .op(&[Opcode::ConstInteger as u8])
        .word(32)
        .integer(1)
        .op(&[Opcode::ReturnStore as u8, ValueKind::Integer as u8])
        .word(16)
        .word(32)
        .op(&[Opcode::Jump as u8])
        .word(exit)
        .op(&[Opcode::Jump as u8])
        .word(exit)
        .op(&[Opcode::ConstInteger as u8])
        .word(32)
        .integer(0)
        .op(&[Opcode::ReturnStore as u8, ValueKind::Integer as u8])
        .word(16)
        .word(32)
        .op(&[Opcode::Jump as u8])
        .word(exit)
        .op(&[Opcode::Return as u8]);

    assert_eq!(emitted.code, expected.0);
    assert_eq!(emitted.layout.frame_size, 48);
    assert_eq!(emitted.layout.entry, 0);
    assert_eq!(emitted.lines.entries(), &[(5, 1), (48, 2), (81, 4)]);
    assert!(emitted.breakpoints.is_empty());
}

#[test]
fn test_logic_block_releases_temporaries_on_both_paths() {
    let code = with_codegen(|codegen| {
        let before = codegen.variables.temporary_cursor();
        let mut block = LogicBlock::open(codegen);
        block.temporary(CompilingType::STRING);
        block.temporary(CompilingType::INTEGER);
        block.guard();
        block.close().unwrap();
        assert_eq!(codegen.variables.temporary_cursor(), before);
    });

    let release = [Opcode::Release as u8, ValueKind::String as u8];
    let expected = Bytes::default()
        .op(&[Opcode::ExitJump as u8])
        .word(16)
        .op(&release)
        .word(16)
        .op(&[Opcode::Jump as u8])
        .word(27)
        .op(&release)
        .word(16)
        .op(&[Opcode::Jump as u8])
        .word(27)
        .op(&[Opcode::Return as u8]);
    assert_eq!(code, expected.0);
}

#[test]
fn test_landing_pad_elided_without_managed_temporaries() {
    let code = with_codegen(|codegen| {
        let mut block = LogicBlock::open(codegen);
        block.temporary(CompilingType::INTEGER);
        block.guard();
        block.close().unwrap();
    });
    // The exit jump goes straight to the function exit.
    let expected = Bytes::default()
        .op(&[Opcode::ExitJump as u8])
        .word(5)
        .op(&[Opcode::Return as u8]);
    assert_eq!(code, expected.0);
}

#[test]
fn test_unreferenced_pad_emits_only_normal_release() {
    let code = with_codegen(|codegen| {
        let mut outer = LogicBlock::open(codegen);
        let inner_mark = outer.variables.mark();
        {
            let mut inner = LogicBlock::open(&mut outer);
            inner.temporary(CompilingType::HANDLE);
            inner.close().unwrap();
        }
        assert_eq!(outer.variables.mark(), inner_mark);
        outer.close().unwrap();
    });
    let expected = Bytes::default()
        .op(&[Opcode::Release as u8, ValueKind::Handle as u8])
        .word(16)
        .op(&[Opcode::Return as u8]);
    assert_eq!(code, expected.0);
}

#[test]
fn test_debug_mode_emits_breakpoints() {
    let emitted = emit(
        indoc! {"
            a = 1
            a += 2
        "},
        &[],
        true,
    );
    assert_eq!(emitted.breakpoints.len(), 2);
    let first = emitted.breakpoints[0] as usize;
    assert_eq!(emitted.code[first], Opcode::Breakpoint as u8);
    assert_eq!(emitted.code[first + 1..first + 5], u32le(1));
    let second = emitted.breakpoints[1] as usize;
    assert_eq!(emitted.code[second + 1..second + 5], u32le(2));
    assert_eq!(emitted.lines.line_of(emitted.breakpoints[1]), Some(2));
}

#[test]
fn test_control_flow_resolves_every_label() {
    let emitted = emit(
        indoc! {"
            for integer i = 0, i < 10, i++
                continue i == 3
                a += i
                break a > 20
            else
                a = 0
            while a > 0
                a--
            try
                exit 3
            catch code
                a = code
            finally
                a += 1
        "},
        &[],
        false,
    );
    let names: Vec<&str> = emitted
        .layout
        .locals
        .iter()
        .map(|local| local.name.as_str())
        .collect();
    assert_eq!(names, vec!["a", "i", "code"]);
    assert_eq!(emitted.code.last(), Some(&(Opcode::Return as u8)));
}

#[test]
fn test_constant_conditions_fold() {
    let folded = emit(
        indoc! {"
            while true
                break
        "},
        &[],
        false,
    );
    // Enter, Jump to break, Jump to head, Return.
    let expected = Bytes::default()
        .op(&[Opcode::Enter as u8])
        .word(24)
        .op(&[Opcode::Jump as u8])
        .word(15)
        .op(&[Opcode::Jump as u8])
        .word(5)
        .op(&[Opcode::Return as u8]);
    assert_eq!(folded.code, expected.0);
}

#[test]
fn test_exit_raises_its_code() {
    // Frame: header 16, `a` at 16, one integer temporary at 24.
    let exit_with = |code: i64| {
        Bytes::default()
            .op(&[Opcode::Enter as u8])
            .word(32)
            .op(&[Opcode::ConstInteger as u8])
            .word(24)
            .integer(code)
            .op(&[Opcode::Exit as u8])
            .word(24)
            .op(&[Opcode::ExitJump as u8])
            .word(28)
            .op(&[Opcode::Return as u8])
            .0
    };

    let explicit = emit("exit 3\n", &[], false);
    assert_eq!(explicit.code, exit_with(3));

    // A bare `exit` raises code 0.
    let bare = emit("exit\n", &[], false);
    assert_eq!(bare.code, exit_with(0));
    assert_eq!(bare.layout.frame_size, 32);
}

#[test]
fn test_bare_wait_yields() {
    let emitted = emit("wait\n", &[], false);
    let expected = Bytes::default()
        .op(&[Opcode::Enter as u8])
        .word(24)
        .op(&[Opcode::Yield as u8, Opcode::Return as u8]);
    assert_eq!(emitted.code, expected.0);
    assert_eq!(emitted.lines.line_of(5), Some(1));
}
