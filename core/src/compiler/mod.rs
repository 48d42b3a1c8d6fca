//! Function-level compiler driver.
//!
//! Each function is tokenized, parsed into a statement tree inside its own
//! arena and emitted into the shared code buffer. Lambdas created by a
//! function are emitted right after it as functions of their own. Source
//! errors accumulate until [`Compiler::finish`], which only produces a
//! [`Module`] when none was recorded.

mod error;
mod options;

#[cfg(test)]
mod compiler_test;

use bumpalo::Bump;
use tracing::debug;

pub use error::Error;
pub use options::CompilerOptions;

use crate::diagnostics::{Diagnostic, Diagnostics, ErrorKind};
use crate::emit::{
    DataString, DebugFunction, DebugLocal, DebugTable, FrameSignature, FunctionBody,
    FunctionLayout, Generator, LineTable, Output, emit_function, encode_strings,
};
use crate::expression::{ExpressionParser, Local};
use crate::resolver::Resolver;
use crate::statement::StatementBuilder;
use crate::syntax::{Anchor, Span, lexer::tokenize};
use crate::types::{CompilingType, Constant, Declaration};

#[derive(Debug, Clone, Copy)]
pub struct Parameter<'s> {
    pub name: &'s str,
    pub ty: CompilingType,
}

/// One function to compile: its signature and the text of its body.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSource<'s> {
    pub name: &'s str,
    pub parameters: &'s [Parameter<'s>],
    pub returns: &'s [CompilingType],
    pub body: &'s str,
}

/// Entry of the module's function table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub name: String,
    pub entry: u32,
    pub frame_size: u32,
}

/// A compiled module.
#[derive(Debug, Clone)]
pub struct Module {
    pub code: Vec<u8>,
    pub data: Vec<u8>,
    pub code_strings: Vec<String>,
    pub data_strings: Vec<DataString>,
    /// In compile order. Lambdas follow the function that created them.
    pub functions: Vec<FunctionEntry>,
    pub lines: LineTable,
    /// Present when compiled with [`CompilerOptions::debug`].
    pub debug: Option<DebugTable>,
    /// Warnings recorded while compiling.
    pub warnings: Vec<Diagnostic>,
}

impl Module {
    pub fn function(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// The code-string table in its length-prefixed binary form.
    pub fn encoded_code_strings(&self) -> Vec<u8> {
        encode_strings(&self.code_strings)
    }
}

pub struct Compiler<'r> {
    resolver: &'r dyn Resolver,
    options: CompilerOptions,
    generator: Generator,
    lines: LineTable,
    breakpoints: Vec<u32>,
    functions: Vec<FunctionEntry>,
    debug_functions: Vec<DebugFunction>,
    diagnostics: Diagnostics,
}

impl<'r> Compiler<'r> {
    pub fn new(resolver: &'r dyn Resolver, options: CompilerOptions) -> Self {
        Self {
            resolver,
            generator: Generator::new(options.data_size),
            options,
            lines: LineTable::new(),
            breakpoints: Vec::new(),
            functions: Vec::new(),
            debug_functions: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Compiles one function and returns its index in the function table,
    /// or `None` when its source has errors.
    pub fn compile_function(&mut self, function: &FunctionSource<'_>) -> Result<Option<u32>, Error> {
        debug!(name = function.name, "Compiling function");
        let arena = Bump::new();
        let mut diagnostics = Diagnostics::new();
        let lines = tokenize(
            self.options.file,
            function.body,
            self.options.tab_width,
            &mut diagnostics,
        );
        let anchor = Anchor::new(self.options.file, Span::new(0, function.body.len()), 1);

        let returns: &[CompilingType] = arena.alloc_slice_copy(function.returns);
        let mut parser = ExpressionParser::new(&arena, self.resolver);
        for parameter in function.parameters {
            if parser
                .locals
                .add_local(parameter.name, anchor.clone(), parameter.ty)
                .is_err()
            {
                diagnostics.report(
                    &anchor,
                    ErrorKind::DuplicateLocal {
                        name: parameter.name.to_string(),
                    },
                );
            }
        }
        let body = StatementBuilder::new(&mut parser, returns).build(&lines, anchor);
        let parameters: Vec<Local<'_>> = parser
            .locals
            .locals()
            .iter()
            .take(function.parameters.len())
            .cloned()
            .collect();
        let lambdas = std::mem::take(&mut parser.lambdas);
        diagnostics.append(std::mem::take(&mut parser.diagnostics));
        debug!(
            name = function.name,
            arena_bytes = arena.allocated_bytes(),
            lambdas = lambdas.len(),
            "Parsed function"
        );

        let failed = diagnostics.has_errors();
        self.diagnostics.append(diagnostics);
        if failed {
            return Ok(None);
        }

        let index = self.functions.len() as u32;
        let lambda_base = index + 1;
        let layout = self.emit(
            FrameSignature {
                returns,
                parameters: &parameters,
                captures: &[],
            },
            FunctionBody::Block(&body),
            lambda_base,
        )?;
        self.record(function.name.to_string(), layout);

        for (position, lambda) in lambdas.iter().enumerate() {
            let layout = self.emit(
                FrameSignature {
                    returns: lambda.returns,
                    parameters: &lambda.locals[..lambda.parameters],
                    captures: &lambda.captures,
                },
                FunctionBody::Expression(lambda.body),
                lambda_base,
            )?;
            self.record(format!("{}$lambda{}", function.name, position), layout);
        }
        Ok(Some(index))
    }

    fn emit<'a>(
        &mut self,
        signature: FrameSignature<'_, 'a>,
        body: FunctionBody<'_, 'a>,
        lambda_base: u32,
    ) -> Result<FunctionLayout, Error>
    where
        'r: 'a,
    {
        let layout = emit_function(
            Output {
                generator: &mut self.generator,
                lines: &mut self.lines,
                breakpoints: &mut self.breakpoints,
            },
            self.resolver,
            signature,
            body,
            lambda_base,
            self.options.debug,
            self.options.align_locals,
        )?;
        Ok(layout)
    }

    fn record(&mut self, name: String, layout: FunctionLayout) {
        debug!(
            name = %name,
            entry = layout.entry,
            frame_size = layout.frame_size,
            "Compiled function"
        );
        if self.options.debug {
            self.debug_functions.push(DebugFunction {
                name: name.clone(),
                entry: layout.entry,
                locals: layout
                    .locals
                    .iter()
                    .map(|local| DebugLocal {
                        name: local.name.clone(),
                        offset: local.offset,
                        ty: local.ty,
                    })
                    .collect(),
            });
        }
        self.functions.push(FunctionEntry {
            name,
            entry: layout.entry,
            frame_size: layout.frame_size,
        });
    }

    /// Writes the initial value of a global variable into the data segment.
    ///
    /// Numbers are stored little-endian; strings are registered in the
    /// data-string table for the loader to fill in. Null leaves the zeroed
    /// slot untouched.
    pub fn declare_global(&mut self, global: &Declaration, value: Constant<'_>) {
        let Some(address) = self.resolver.variable_address(global) else {
            panic!("global '{}' has no data address", self.resolver.name(global));
        };
        debug!(address, value = ?value, "Declared global data");
        match value {
            Constant::Null => {}
            Constant::Bool(v) => self.generator.write_data(address, &[u8::from(v)]),
            Constant::Byte(v) => self.generator.write_data(address, &[v]),
            Constant::Char(v) => self.generator.write_data(address, &v.to_le_bytes()),
            Constant::Integer(v) | Constant::Enum(_, v) => {
                self.generator.write_data(address, &v.to_le_bytes())
            }
            Constant::Real(v) => self.generator.write_data(address, &v.to_le_bytes()),
            Constant::String(v) => self.generator.data_string(v, address),
            Constant::Type(ty) => panic!("type constant {} has no data form", ty),
        }
    }

    pub fn finish(self) -> Result<Module, Error> {
        if self.diagnostics.has_errors() {
            return Err(Error::Compilation {
                diagnostics: self.diagnostics.into_vec(),
            });
        }
        let parts = self.generator.into_parts();
        debug!(
            code_size = parts.code.len(),
            data_size = parts.data.len(),
            functions = self.functions.len(),
            "Finished module"
        );
        let debug = self.options.debug.then(|| DebugTable {
            functions: self.debug_functions,
            breakpoints: self.breakpoints,
        });
        Ok(Module {
            code: parts.code,
            data: parts.data,
            code_strings: parts.code_strings,
            data_strings: parts.data_strings,
            functions: self.functions,
            lines: self.lines,
            debug,
            warnings: self.diagnostics.into_vec(),
        })
    }
}
