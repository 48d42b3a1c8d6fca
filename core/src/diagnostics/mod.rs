//! Diagnostics produced while compiling: kinds, codes and the collector.

mod collector;
mod context;
mod error;

pub use collector::Diagnostics;
pub use context::Context;
pub use error::{Diagnostic, ErrorKind, RelatedInfo, Severity};
