//! Compiler back end for an indentation-structured scripting language.
//!
//! Source lines are tokenized into [`syntax::Line`]s, parsed into typed
//! expression trees by [`expression::ExpressionParser`], grouped into
//! statements by [`statement::StatementBuilder`] and emitted as bytecode by
//! [`emit`]. [`compiler::Compiler`] drives the pipeline per function.

pub mod compiler;
pub mod diagnostics;
pub mod emit;
pub mod expression;
pub mod resolver;
pub mod statement;
pub mod syntax;
pub mod types;

pub use compiler::{Compiler, CompilerOptions, Error, FunctionSource, Module, Parameter};

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_overload_resolution() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
