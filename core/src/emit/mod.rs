//! Bytecode emission: labels, the code and data buffers, frame layout and
//! the lowering of statement trees.

pub mod codegen;
pub mod debug;
pub mod generator;
pub mod instruction;
pub mod logic_block;
pub mod referencable;
pub mod variable;

pub use codegen::{EmitResult, FrameSignature, FunctionBody, FunctionLayout, Output, emit_function};
pub use debug::{DebugFunction, DebugLocal, DebugTable, LineTable};
pub use generator::{DataString, Generator, GeneratorOutput, Label, encode_strings};
pub use instruction::{GLOBAL_BIT, Opcode, ValueKind};
pub use logic_block::LogicBlock;
pub use referencable::{CodeAddress, FrameOffset, Referencable, ReferencableError};
pub use variable::{Address, DeclaredLocal, Variable, VariableAllocator};
