//! Symbol resolution consulted by the expression parser.
//!
//! The compiler owns no symbol state. Every name, signature and
//! inheritance question goes through a [`Resolver`], which the embedding
//! application implements over its declaration tables. [`SymbolTable`] is
//! an in-memory implementation for tools and tests.

mod table;

pub use table::SymbolTable;

use crate::types::{CompilingType, Constant, Declaration, Definition, Tuple};

/// Parameter and return types of a function, constructor, delegate or task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub parameters: Tuple,
    pub returns: Tuple,
}

impl Signature {
    pub fn new(parameters: &[CompilingType], returns: &[CompilingType]) -> Self {
        Self {
            parameters: Tuple::from_slice(parameters),
            returns: Tuple::from_slice(returns),
        }
    }
}

pub trait Resolver {
    /// Every declaration visible under `name`, overloads included.
    fn find(&self, name: &str) -> Vec<Declaration>;

    /// Members declared directly on `definition` (not inherited).
    fn find_member(&self, definition: &Definition, name: &str) -> Vec<Declaration>;

    /// The type a `DeclarationCode::Definition`/`Enum`/`Delegate`/`Task`/`Interface` names.
    fn definition(&self, declaration: &Declaration) -> Option<Definition>;

    fn parent(&self, definition: &Definition) -> Option<Definition>;

    /// Inheritance distance from `source` up to `target` (TryGetInherit).
    ///
    /// `Some(0)` when equal, `None` when `source` does not derive from or
    /// implement `target`.
    fn inherit_distance(&self, target: &Definition, source: &Definition) -> Option<u32>;

    fn constructors(&self, definition: &Definition) -> Vec<Declaration>;

    /// Signature of a function-like declaration.
    fn signature(&self, declaration: &Declaration) -> Option<Signature>;

    /// Signature of a delegate or task type. Tasks have no parameters.
    fn definition_signature(&self, definition: &Definition) -> Option<Signature>;

    fn variable_type(&self, declaration: &Declaration) -> Option<CompilingType>;

    /// Data-segment offset of a global, or field offset of a member variable.
    fn variable_address(&self, declaration: &Declaration) -> Option<u32>;

    fn constant_value(&self, declaration: &Declaration) -> Option<Constant<'_>>;

    /// Member functions dispatched through the object's vtable.
    fn is_virtual(&self, declaration: &Declaration) -> bool;

    fn name(&self, declaration: &Declaration) -> String;

    fn type_name(&self, ty: &CompilingType) -> String {
        ty.to_string()
    }

    /// Readable `name(params) -> returns` used in overload diagnostics.
    fn describe(&self, declaration: &Declaration) -> String {
        let name = self.name(declaration);
        match self.signature(declaration) {
            Some(signature) => {
                let params: Vec<String> = signature
                    .parameters
                    .iter()
                    .map(|p| self.type_name(p))
                    .collect();
                format!("{}({})", name, params.join(", "))
            }
            None => name,
        }
    }
}
