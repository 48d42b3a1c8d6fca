//! Compile-time type model: types, declarations and constants.

mod compiling_type;
mod constant;
mod declaration;

pub use compiling_type::{CompilingType, Definition, LIBRARY_KERNEL, Tuple, TypeCode};
pub use constant::Constant;
pub use declaration::{Declaration, DeclarationCode, Visibility};
