/// Visibility of a declaration outside its library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    None,
    Public,
    Internal,
    Space,
    Protected,
    Private,
}

/// What kind of entity a `Declaration` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationCode {
    Invalid,
    /// A type. `index` and `define` mirror the `Definition`.
    Definition,
    /// Field of a class; `define` is the owning class.
    MemberVariable,
    /// Method of a class; `define` is the owning class, `overload` the overload slot.
    MemberFunction,
    Constructor,
    Delegate,
    Task,
    Interface,
    InterfaceFunction,
    GlobalVariable,
    GlobalFunction,
    NativeFunction,
    Constant,
    Enum,
    EnumElement,
    Lambda,
    LocalVariable,
}

/// Tagged, indexed reference to a named compile-time entity.
///
/// Declarations are plain values; two declarations are the same entity
/// exactly when all fields compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Declaration {
    pub library: u32,
    pub visibility: Visibility,
    pub code: DeclarationCode,
    pub index: u32,
    pub define: u32,
    pub overload: u32,
}

impl Declaration {
    pub const INVALID: Declaration = Declaration {
        library: 0,
        visibility: Visibility::None,
        code: DeclarationCode::Invalid,
        index: 0,
        define: 0,
        overload: 0,
    };

    pub fn new(library: u32, visibility: Visibility, code: DeclarationCode, index: u32) -> Self {
        Self {
            library,
            visibility,
            code,
            index,
            define: 0,
            overload: 0,
        }
    }

    pub fn with_define(mut self, define: u32) -> Self {
        self.define = define;
        self
    }

    pub fn with_overload(mut self, overload: u32) -> Self {
        self.overload = overload;
        self
    }

    /// Callable as a function (global, native, member or interface method).
    pub fn is_function(&self) -> bool {
        matches!(
            self.code,
            DeclarationCode::GlobalFunction
                | DeclarationCode::NativeFunction
                | DeclarationCode::MemberFunction
                | DeclarationCode::InterfaceFunction
        )
    }
}
