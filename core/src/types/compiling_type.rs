use core::fmt;

use smallvec::SmallVec;

/// Library id of the built-in kernel types.
pub const LIBRARY_KERNEL: u32 = 0;

/// Library id reserved for compiler sentinels (`null`, blurry, invalid).
const LIBRARY_SENTINEL: u32 = u32::MAX;

/// Broad category of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Invalid,
    /// Kernel value types: bool, byte, char, integer, reals, type, string, entity.
    Struct,
    Enum,
    /// Classes (reference counted objects).
    Handle,
    Interface,
    Delegate,
    /// Coroutine types.
    Task,
}

/// Identifies a kernel or user type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Definition {
    pub library: u32,
    pub code: TypeCode,
    pub index: u32,
}

impl Definition {
    pub const fn new(library: u32, code: TypeCode, index: u32) -> Self {
        Self {
            library,
            code,
            index,
        }
    }

    const fn kernel(code: TypeCode, index: u32) -> Self {
        Self::new(LIBRARY_KERNEL, code, index)
    }

    pub const BOOL: Definition = Definition::kernel(TypeCode::Struct, 0);
    pub const BYTE: Definition = Definition::kernel(TypeCode::Struct, 1);
    pub const CHAR: Definition = Definition::kernel(TypeCode::Struct, 2);
    pub const INTEGER: Definition = Definition::kernel(TypeCode::Struct, 3);
    pub const REAL: Definition = Definition::kernel(TypeCode::Struct, 4);
    pub const REAL2: Definition = Definition::kernel(TypeCode::Struct, 5);
    pub const REAL3: Definition = Definition::kernel(TypeCode::Struct, 6);
    pub const REAL4: Definition = Definition::kernel(TypeCode::Struct, 7);
    pub const TYPE: Definition = Definition::kernel(TypeCode::Struct, 8);
    pub const STRING: Definition = Definition::kernel(TypeCode::Struct, 9);
    pub const ENTITY: Definition = Definition::kernel(TypeCode::Struct, 10);
    /// Root of every class and array.
    pub const HANDLE: Definition = Definition::kernel(TypeCode::Handle, 0);
    pub const DELEGATE: Definition = Definition::kernel(TypeCode::Delegate, 0);
    pub const TASK: Definition = Definition::kernel(TypeCode::Task, 0);

    pub const NULL: Definition = Definition::new(LIBRARY_SENTINEL, TypeCode::Invalid, 0);
    pub const BLURRY: Definition = Definition::new(LIBRARY_SENTINEL, TypeCode::Invalid, 1);
    pub const INVALID: Definition = Definition::new(LIBRARY_SENTINEL, TypeCode::Invalid, 2);

    pub fn is_kernel(&self) -> bool {
        self.library == LIBRARY_KERNEL
    }
}

/// A definition plus array nesting depth (0 = scalar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompilingType {
    pub definition: Definition,
    pub dimension: u32,
}

/// Tuple type: what an expression evaluates to.
pub type Tuple = SmallVec<[CompilingType; 2]>;

impl CompilingType {
    pub const fn new(definition: Definition, dimension: u32) -> Self {
        Self {
            definition,
            dimension,
        }
    }

    const fn scalar(definition: Definition) -> Self {
        Self::new(definition, 0)
    }

    pub const BOOL: CompilingType = CompilingType::scalar(Definition::BOOL);
    pub const BYTE: CompilingType = CompilingType::scalar(Definition::BYTE);
    pub const CHAR: CompilingType = CompilingType::scalar(Definition::CHAR);
    pub const INTEGER: CompilingType = CompilingType::scalar(Definition::INTEGER);
    pub const REAL: CompilingType = CompilingType::scalar(Definition::REAL);
    pub const REAL2: CompilingType = CompilingType::scalar(Definition::REAL2);
    pub const REAL3: CompilingType = CompilingType::scalar(Definition::REAL3);
    pub const REAL4: CompilingType = CompilingType::scalar(Definition::REAL4);
    pub const TYPE: CompilingType = CompilingType::scalar(Definition::TYPE);
    pub const STRING: CompilingType = CompilingType::scalar(Definition::STRING);
    pub const ENTITY: CompilingType = CompilingType::scalar(Definition::ENTITY);
    pub const HANDLE: CompilingType = CompilingType::scalar(Definition::HANDLE);
    pub const DELEGATE: CompilingType = CompilingType::scalar(Definition::DELEGATE);
    pub const TASK: CompilingType = CompilingType::scalar(Definition::TASK);

    /// Type of the untyped `null` literal.
    pub const NULL: CompilingType = CompilingType::scalar(Definition::NULL);
    /// Placeholder for lambdas, `var` and `{}` sets until a target type is known.
    pub const BLURRY: CompilingType = CompilingType::scalar(Definition::BLURRY);
    /// Type of degraded expressions produced after a diagnostic.
    pub const INVALID: CompilingType = CompilingType::scalar(Definition::INVALID);

    pub fn tuple(types: &[CompilingType]) -> Tuple {
        Tuple::from_slice(types)
    }

    pub fn is_array(&self) -> bool {
        self.dimension > 0
    }

    pub fn element(&self) -> CompilingType {
        debug_assert!(self.dimension > 0, "element of non-array type {}", self);
        CompilingType::new(self.definition, self.dimension.saturating_sub(1))
    }

    pub fn array_of(&self) -> CompilingType {
        CompilingType::new(self.definition, self.dimension + 1)
    }

    pub fn is_null(&self) -> bool {
        *self == CompilingType::NULL
    }

    pub fn is_blurry(&self) -> bool {
        *self == CompilingType::BLURRY
    }

    pub fn is_invalid(&self) -> bool {
        *self == CompilingType::INVALID
    }

    /// Stored as a handle id: arrays, classes, interfaces, delegates, tasks.
    pub fn is_handle(&self) -> bool {
        self.dimension > 0
            || matches!(
                self.definition.code,
                TypeCode::Handle | TypeCode::Interface | TypeCode::Delegate | TypeCode::Task
            )
    }

    /// May hold `null`.
    pub fn is_nullable(&self) -> bool {
        self.is_handle() || *self == CompilingType::ENTITY
    }

    /// Slots of this type must be released when they go out of scope.
    pub fn is_managed(&self) -> bool {
        self.is_handle() || *self == CompilingType::STRING || *self == CompilingType::ENTITY
    }

    pub fn is_enum(&self) -> bool {
        self.dimension == 0 && self.definition.code == TypeCode::Enum
    }

    pub fn is_delegate(&self) -> bool {
        self.dimension == 0 && self.definition.code == TypeCode::Delegate
    }

    pub fn is_task(&self) -> bool {
        self.dimension == 0 && self.definition.code == TypeCode::Task
    }

    /// Position on the numeric promotion ladder: byte and char < integer < real.
    pub fn numeric_rank(&self) -> Option<u32> {
        match *self {
            CompilingType::BYTE | CompilingType::CHAR => Some(0),
            CompilingType::INTEGER => Some(1),
            CompilingType::REAL => Some(2),
            _ => None,
        }
    }

    /// Component count of `real` (1) and the `realN` vectors.
    pub fn vector_dimension(&self) -> Option<u32> {
        match *self {
            CompilingType::REAL => Some(1),
            CompilingType::REAL2 => Some(2),
            CompilingType::REAL3 => Some(3),
            CompilingType::REAL4 => Some(4),
            _ => None,
        }
    }

    pub fn vector(dimension: u32) -> Option<CompilingType> {
        match dimension {
            1 => Some(CompilingType::REAL),
            2 => Some(CompilingType::REAL2),
            3 => Some(CompilingType::REAL3),
            4 => Some(CompilingType::REAL4),
            _ => None,
        }
    }

    /// `real2`, `real3` or `real4`.
    pub fn is_vector(&self) -> bool {
        matches!(self.vector_dimension(), Some(2..=4))
    }

    /// Slot size in bytes.
    pub fn size(&self) -> u32 {
        if self.is_handle() {
            return 4;
        }
        match self.definition {
            Definition::BOOL | Definition::BYTE => 1,
            Definition::CHAR => 2,
            Definition::INTEGER | Definition::REAL | Definition::ENTITY => 8,
            Definition::REAL2 => 16,
            Definition::REAL3 => 24,
            Definition::REAL4 => 32,
            Definition::TYPE | Definition::STRING => 4,
            def if def.code == TypeCode::Enum => 8,
            _ => 0,
        }
    }

    pub fn alignment(&self) -> u32 {
        self.size().clamp(1, 8)
    }

    pub fn kernel_name(&self) -> Option<&'static str> {
        if self.dimension > 0 {
            return None;
        }
        Some(match self.definition {
            Definition::BOOL => "bool",
            Definition::BYTE => "byte",
            Definition::CHAR => "char",
            Definition::INTEGER => "integer",
            Definition::REAL => "real",
            Definition::REAL2 => "real2",
            Definition::REAL3 => "real3",
            Definition::REAL4 => "real4",
            Definition::TYPE => "type",
            Definition::STRING => "string",
            Definition::ENTITY => "entity",
            Definition::HANDLE => "handle",
            Definition::DELEGATE => "delegate",
            Definition::TASK => "task",
            Definition::NULL => "null",
            Definition::BLURRY => "blurry",
            Definition::INVALID => "invalid",
            _ => return None,
        })
    }

    pub fn from_kernel_name(name: &str) -> Option<CompilingType> {
        Some(match name {
            "bool" => CompilingType::BOOL,
            "byte" => CompilingType::BYTE,
            "char" => CompilingType::CHAR,
            "integer" => CompilingType::INTEGER,
            "real" => CompilingType::REAL,
            "real2" => CompilingType::REAL2,
            "real3" => CompilingType::REAL3,
            "real4" => CompilingType::REAL4,
            "type" => CompilingType::TYPE,
            "string" => CompilingType::STRING,
            "entity" => CompilingType::ENTITY,
            "handle" => CompilingType::HANDLE,
            "delegate" => CompilingType::DELEGATE,
            "task" => CompilingType::TASK,
            _ => return None,
        })
    }
}

impl fmt::Display for CompilingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scalar = CompilingType::new(self.definition, 0);
        match scalar.kernel_name() {
            Some(name) => f.write_str(name)?,
            None => write!(
                f,
                "{:?}#{}.{}",
                self.definition.code, self.definition.library, self.definition.index
            )?,
        }
        for _ in 0..self.dimension {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sizes() {
        assert_eq!(CompilingType::BOOL.size(), 1);
        assert_eq!(CompilingType::CHAR.size(), 2);
        assert_eq!(CompilingType::REAL3.size(), 24);
        assert_eq!(CompilingType::STRING.size(), 4);
        assert_eq!(CompilingType::INTEGER.array_of().size(), 4);
        assert_eq!(CompilingType::REAL4.alignment(), 8);
        assert_eq!(CompilingType::BOOL.alignment(), 1);
    }

    #[test]
    fn test_managed() {
        assert!(CompilingType::STRING.is_managed());
        assert!(CompilingType::ENTITY.is_managed());
        assert!(CompilingType::REAL.array_of().is_managed());
        assert!(!CompilingType::INTEGER.is_managed());
        assert!(!CompilingType::STRING.is_handle());
    }

    #[test]
    fn test_display() {
        assert_eq!(CompilingType::INTEGER.array_of().array_of().to_string(), "integer[][]");
        let user = CompilingType::new(Definition::new(3, TypeCode::Handle, 2), 0);
        assert_eq!(user.to_string(), "Handle#3.2");
    }

    #[test]
    fn test_kernel_names_roundtrip() {
        for name in ["bool", "byte", "integer", "real3", "string", "handle"] {
            let ty = CompilingType::from_kernel_name(name).unwrap();
            assert_eq!(ty.kernel_name(), Some(name));
        }
    }
}
