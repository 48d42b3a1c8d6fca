//! Rain - bytecode compiler for an indentation-structured scripting language
//!
//! # Overview
//!
//! Rain compiles function bodies into a compact bytecode with a fixed frame
//! layout, explicit exception landing pads and source line tables. Names are
//! resolved through a host-supplied [`Resolver`], so the compiler can be
//! embedded next to any runtime that knows how to describe its declarations.
//!
//! # Quick Start
//!
//! ```
//! use rain::{CompilerOptions, FunctionSource, Parameter, SymbolTable, types::CompilingType};
//!
//! let table = SymbolTable::new();
//! let parameters = [Parameter { name: "n", ty: CompilingType::INTEGER }];
//! let source = FunctionSource {
//!     name: "double",
//!     parameters: &parameters,
//!     returns: &[CompilingType::INTEGER],
//!     body: "return n * 2",
//! };
//!
//! let module = rain::compile(&table, CompilerOptions::default(), &[source]).unwrap();
//! assert_eq!(module.functions[0].name, "double");
//! ```
//!
//! Compilation errors carry diagnostics anchored in the function body; see
//! [`render_error_to_string`] for printing them against the source.

mod error_renderer;

pub use error_renderer::{
    render_diagnostics_to, render_error, render_error_to, render_error_to_string,
    render_error_to_string_no_color,
};

// Re-export public API from rain_core
pub use rain_core::compiler::FunctionEntry;
pub use rain_core::diagnostics::{Diagnostic, ErrorKind, RelatedInfo, Severity};
pub use rain_core::resolver::{Resolver, SymbolTable};
pub use rain_core::{Compiler, CompilerOptions, Error, FunctionSource, Module, Parameter};
pub use rain_core::{emit, syntax, types};

/// Compiles `functions` into one module.
///
/// Every function is compiled even after an earlier one failed, so the
/// returned error lists the diagnostics of all of them.
pub fn compile(
    resolver: &dyn Resolver,
    options: CompilerOptions,
    functions: &[FunctionSource<'_>],
) -> Result<Module, Error> {
    let mut compiler = Compiler::new(resolver, options);
    for function in functions {
        compiler.compile_function(function)?;
    }
    compiler.finish()
}
