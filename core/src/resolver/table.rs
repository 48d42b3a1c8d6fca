use hashbrown::HashMap;

use super::{Resolver, Signature};
use crate::types::{
    CompilingType, Constant, Declaration, DeclarationCode, Definition, TypeCode, Visibility,
};

/// Library id assigned to everything declared through a `SymbolTable`.
const LIBRARY_SELF: u32 = 1;

#[derive(Debug)]
struct DefinitionInfo {
    name: String,
    definition: Definition,
    parent: Option<Definition>,
    interfaces: Vec<Definition>,
    constructors: Vec<Declaration>,
    signature: Option<Signature>,
    field_top: u32,
}

#[derive(Debug)]
struct FunctionInfo {
    name: String,
    signature: Signature,
    is_virtual: bool,
}

#[derive(Debug)]
struct VariableInfo {
    name: String,
    ty: CompilingType,
    address: u32,
}

#[derive(Debug)]
enum StoredConstant {
    Value(Constant<'static>),
    String(String),
}

#[derive(Debug)]
struct ConstantInfo {
    name: String,
    value: StoredConstant,
}

/// In-memory declaration table implementing [`Resolver`].
///
/// Globals get consecutive data-segment offsets, member variables get
/// consecutive field offsets inside their class (after the parent's fields).
#[derive(Debug, Default)]
pub struct SymbolTable {
    names: HashMap<String, Vec<Declaration>>,
    members: HashMap<(Definition, String), Vec<Declaration>>,
    definitions: Vec<DefinitionInfo>,
    functions: Vec<FunctionInfo>,
    variables: Vec<VariableInfo>,
    constants: Vec<ConstantInfo>,
    data_size: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of data segment needed by the declared globals.
    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    fn declare(&mut self, name: &str, declaration: Declaration) {
        self.names
            .entry(name.to_string())
            .or_default()
            .push(declaration);
    }

    fn declare_member(&mut self, owner: Definition, name: &str, declaration: Declaration) {
        self.members
            .entry((owner, name.to_string()))
            .or_default()
            .push(declaration);
    }

    fn overload_count(&self, key: Option<Definition>, name: &str) -> u32 {
        let existing = match key {
            Some(owner) => self.members.get(&(owner, name.to_string())),
            None => self.names.get(name),
        };
        existing.map_or(0, |d| d.len() as u32)
    }

    fn add_definition(
        &mut self,
        name: &str,
        code: TypeCode,
        parent: Option<Definition>,
        interfaces: &[Definition],
        signature: Option<Signature>,
    ) -> Definition {
        let index = self.definitions.len() as u32;
        let definition = Definition::new(LIBRARY_SELF, code, index);
        let field_top = parent
            .and_then(|p| self.info(&p))
            .map_or(0, |info| info.field_top);
        self.definitions.push(DefinitionInfo {
            name: name.to_string(),
            definition,
            parent,
            interfaces: interfaces.to_vec(),
            constructors: Vec::new(),
            signature,
            field_top,
        });
        let declaration_code = match code {
            TypeCode::Enum => DeclarationCode::Enum,
            TypeCode::Delegate => DeclarationCode::Delegate,
            TypeCode::Task => DeclarationCode::Task,
            TypeCode::Interface => DeclarationCode::Interface,
            _ => DeclarationCode::Definition,
        };
        let declaration = Declaration::new(LIBRARY_SELF, Visibility::Public, declaration_code, index);
        self.declare(name, declaration);
        definition
    }

    fn info(&self, definition: &Definition) -> Option<&DefinitionInfo> {
        if definition.library != LIBRARY_SELF {
            return None;
        }
        self.definitions
            .get(definition.index as usize)
            .filter(|info| info.definition == *definition)
    }

    fn add_function_info(&mut self, name: &str, signature: Signature, is_virtual: bool) -> u32 {
        let index = self.functions.len() as u32;
        self.functions.push(FunctionInfo {
            name: name.to_string(),
            signature,
            is_virtual,
        });
        index
    }

    pub fn add_class(
        &mut self,
        name: &str,
        parent: Option<Definition>,
        interfaces: &[Definition],
    ) -> Definition {
        self.add_definition(name, TypeCode::Handle, parent, interfaces, None)
    }

    pub fn add_interface(&mut self, name: &str, parents: &[Definition]) -> Definition {
        self.add_definition(name, TypeCode::Interface, None, parents, None)
    }

    pub fn add_delegate(
        &mut self,
        name: &str,
        parameters: &[CompilingType],
        returns: &[CompilingType],
    ) -> Definition {
        let signature = Signature::new(parameters, returns);
        self.add_definition(name, TypeCode::Delegate, None, &[], Some(signature))
    }

    pub fn add_task(&mut self, name: &str, returns: &[CompilingType]) -> Definition {
        let signature = Signature::new(&[], returns);
        self.add_definition(name, TypeCode::Task, None, &[], Some(signature))
    }

    pub fn add_enum(&mut self, name: &str, elements: &[(&str, i64)]) -> Definition {
        let definition = self.add_definition(name, TypeCode::Enum, None, &[], None);
        let ty = CompilingType::new(definition, 0);
        for (element, value) in elements {
            let index = self.constants.len() as u32;
            self.constants.push(ConstantInfo {
                name: element.to_string(),
                value: StoredConstant::Value(Constant::Enum(ty, *value)),
            });
            let declaration =
                Declaration::new(LIBRARY_SELF, Visibility::Public, DeclarationCode::EnumElement, index)
                    .with_define(definition.index);
            self.declare_member(definition, element, declaration);
        }
        definition
    }

    pub fn add_global_variable(&mut self, name: &str, ty: CompilingType) -> Declaration {
        let alignment = ty.alignment();
        let address = self.data_size.div_ceil(alignment) * alignment;
        self.data_size = address + ty.size();
        let index = self.variables.len() as u32;
        self.variables.push(VariableInfo {
            name: name.to_string(),
            ty,
            address,
        });
        let declaration =
            Declaration::new(LIBRARY_SELF, Visibility::Public, DeclarationCode::GlobalVariable, index);
        self.declare(name, declaration);
        declaration
    }

    pub fn add_constant(&mut self, name: &str, value: Constant<'_>) -> Declaration {
        let index = self.constants.len() as u32;
        let value = match value {
            Constant::String(s) => StoredConstant::String(s.to_string()),
            Constant::Null => StoredConstant::Value(Constant::Null),
            Constant::Bool(v) => StoredConstant::Value(Constant::Bool(v)),
            Constant::Byte(v) => StoredConstant::Value(Constant::Byte(v)),
            Constant::Char(v) => StoredConstant::Value(Constant::Char(v)),
            Constant::Integer(v) => StoredConstant::Value(Constant::Integer(v)),
            Constant::Real(v) => StoredConstant::Value(Constant::Real(v)),
            Constant::Type(v) => StoredConstant::Value(Constant::Type(v)),
            Constant::Enum(t, v) => StoredConstant::Value(Constant::Enum(t, v)),
        };
        self.constants.push(ConstantInfo {
            name: name.to_string(),
            value,
        });
        let declaration =
            Declaration::new(LIBRARY_SELF, Visibility::Public, DeclarationCode::Constant, index);
        self.declare(name, declaration);
        declaration
    }

    pub fn add_function(
        &mut self,
        name: &str,
        parameters: &[CompilingType],
        returns: &[CompilingType],
    ) -> Declaration {
        self.add_global(name, DeclarationCode::GlobalFunction, parameters, returns)
    }

    pub fn add_native(
        &mut self,
        name: &str,
        parameters: &[CompilingType],
        returns: &[CompilingType],
    ) -> Declaration {
        self.add_global(name, DeclarationCode::NativeFunction, parameters, returns)
    }

    fn add_global(
        &mut self,
        name: &str,
        code: DeclarationCode,
        parameters: &[CompilingType],
        returns: &[CompilingType],
    ) -> Declaration {
        let overload = self.overload_count(None, name);
        let index = self.add_function_info(name, Signature::new(parameters, returns), false);
        let declaration =
            Declaration::new(LIBRARY_SELF, Visibility::Public, code, index).with_overload(overload);
        self.declare(name, declaration);
        declaration
    }

    pub fn add_member_variable(
        &mut self,
        owner: Definition,
        name: &str,
        ty: CompilingType,
    ) -> Declaration {
        let index = self.variables.len() as u32;
        let info = self
            .definitions
            .get_mut(owner.index as usize)
            .filter(|info| info.definition == owner)
            .unwrap_or_else(|| panic!("unknown class {:?}", owner));
        let alignment = ty.alignment();
        let address = info.field_top.div_ceil(alignment) * alignment;
        info.field_top = address + ty.size();
        self.variables.push(VariableInfo {
            name: name.to_string(),
            ty,
            address,
        });
        let declaration =
            Declaration::new(LIBRARY_SELF, Visibility::Public, DeclarationCode::MemberVariable, index)
                .with_define(owner.index);
        self.declare_member(owner, name, declaration);
        declaration
    }

    pub fn add_member_function(
        &mut self,
        owner: Definition,
        name: &str,
        parameters: &[CompilingType],
        returns: &[CompilingType],
        is_virtual: bool,
    ) -> Declaration {
        let code = if owner.code == TypeCode::Interface {
            DeclarationCode::InterfaceFunction
        } else {
            DeclarationCode::MemberFunction
        };
        let overload = self.overload_count(Some(owner), name);
        let index =
            self.add_function_info(name, Signature::new(parameters, returns), is_virtual);
        let declaration = Declaration::new(LIBRARY_SELF, Visibility::Public, code, index)
            .with_define(owner.index)
            .with_overload(overload);
        self.declare_member(owner, name, declaration);
        declaration
    }

    pub fn add_constructor(&mut self, owner: Definition, parameters: &[CompilingType]) -> Declaration {
        let name = self
            .info(&owner)
            .map(|info| info.name.clone())
            .unwrap_or_default();
        let overload = self.info(&owner).map_or(0, |info| info.constructors.len() as u32);
        let index = self.add_function_info(&name, Signature::new(parameters, &[]), false);
        let declaration =
            Declaration::new(LIBRARY_SELF, Visibility::Public, DeclarationCode::Constructor, index)
                .with_define(owner.index)
                .with_overload(overload);
        if let Some(info) = self.definitions.get_mut(owner.index as usize) {
            info.constructors.push(declaration);
        }
        declaration
    }

    fn interface_distance(&self, interfaces: &[Definition], target: &Definition) -> Option<u32> {
        interfaces
            .iter()
            .filter_map(|iface| {
                if iface == target {
                    return Some(1);
                }
                let parents = &self.info(iface)?.interfaces;
                self.interface_distance(parents, target).map(|d| d + 1)
            })
            .min()
    }
}

impl Resolver for SymbolTable {
    fn find(&self, name: &str) -> Vec<Declaration> {
        self.names.get(name).cloned().unwrap_or_default()
    }

    fn find_member(&self, definition: &Definition, name: &str) -> Vec<Declaration> {
        self.members
            .get(&(*definition, name.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn definition(&self, declaration: &Declaration) -> Option<Definition> {
        match declaration.code {
            DeclarationCode::Definition
            | DeclarationCode::Enum
            | DeclarationCode::Delegate
            | DeclarationCode::Task
            | DeclarationCode::Interface => self
                .definitions
                .get(declaration.index as usize)
                .map(|info| info.definition),
            _ => None,
        }
    }

    fn parent(&self, definition: &Definition) -> Option<Definition> {
        self.info(definition).and_then(|info| info.parent)
    }

    fn inherit_distance(&self, target: &Definition, source: &Definition) -> Option<u32> {
        if target == source {
            return Some(0);
        }
        match (target.code, source.code) {
            (TypeCode::Delegate, TypeCode::Delegate) if *target == Definition::DELEGATE => {
                return Some(1);
            }
            (TypeCode::Task, TypeCode::Task) if *target == Definition::TASK => return Some(1),
            _ => {}
        }

        let mut best: Option<u32> = None;
        let mut distance = 0;
        let mut current = Some(*source);
        while let Some(definition) = current {
            if definition == *target {
                best = Some(best.map_or(distance, |b| b.min(distance)));
                break;
            }
            let info = self.info(&definition);
            if target.code == TypeCode::Interface {
                if let Some(d) = info.and_then(|i| self.interface_distance(&i.interfaces, target)) {
                    best = Some(best.map_or(distance + d, |b| b.min(distance + d)));
                }
            }
            current = info.and_then(|i| i.parent);
            distance += 1;
        }

        if best.is_none()
            && *target == Definition::HANDLE
            && matches!(source.code, TypeCode::Handle | TypeCode::Interface)
        {
            return Some(distance);
        }
        best
    }

    fn constructors(&self, definition: &Definition) -> Vec<Declaration> {
        self.info(definition)
            .map(|info| info.constructors.clone())
            .unwrap_or_default()
    }

    fn signature(&self, declaration: &Declaration) -> Option<Signature> {
        match declaration.code {
            DeclarationCode::GlobalFunction
            | DeclarationCode::NativeFunction
            | DeclarationCode::MemberFunction
            | DeclarationCode::InterfaceFunction
            | DeclarationCode::Constructor => self
                .functions
                .get(declaration.index as usize)
                .map(|f| f.signature.clone()),
            DeclarationCode::Delegate | DeclarationCode::Task => self
                .definitions
                .get(declaration.index as usize)
                .and_then(|info| info.signature.clone()),
            _ => None,
        }
    }

    fn definition_signature(&self, definition: &Definition) -> Option<Signature> {
        self.info(definition).and_then(|info| info.signature.clone())
    }

    fn variable_type(&self, declaration: &Declaration) -> Option<CompilingType> {
        match declaration.code {
            DeclarationCode::GlobalVariable | DeclarationCode::MemberVariable => {
                self.variables.get(declaration.index as usize).map(|v| v.ty)
            }
            _ => None,
        }
    }

    fn variable_address(&self, declaration: &Declaration) -> Option<u32> {
        match declaration.code {
            DeclarationCode::GlobalVariable | DeclarationCode::MemberVariable => self
                .variables
                .get(declaration.index as usize)
                .map(|v| v.address),
            _ => None,
        }
    }

    fn constant_value(&self, declaration: &Declaration) -> Option<Constant<'_>> {
        match declaration.code {
            DeclarationCode::Constant | DeclarationCode::EnumElement => {
                let info = self.constants.get(declaration.index as usize)?;
                Some(match &info.value {
                    StoredConstant::Value(value) => *value,
                    StoredConstant::String(s) => Constant::String(s.as_str()),
                })
            }
            _ => None,
        }
    }

    fn is_virtual(&self, declaration: &Declaration) -> bool {
        match declaration.code {
            DeclarationCode::InterfaceFunction => true,
            DeclarationCode::MemberFunction => self
                .functions
                .get(declaration.index as usize)
                .is_some_and(|f| f.is_virtual),
            _ => false,
        }
    }

    fn name(&self, declaration: &Declaration) -> String {
        let name = match declaration.code {
            DeclarationCode::GlobalFunction
            | DeclarationCode::NativeFunction
            | DeclarationCode::MemberFunction
            | DeclarationCode::InterfaceFunction
            | DeclarationCode::Constructor => self
                .functions
                .get(declaration.index as usize)
                .map(|f| f.name.as_str()),
            DeclarationCode::GlobalVariable | DeclarationCode::MemberVariable => self
                .variables
                .get(declaration.index as usize)
                .map(|v| v.name.as_str()),
            DeclarationCode::Constant | DeclarationCode::EnumElement => self
                .constants
                .get(declaration.index as usize)
                .map(|c| c.name.as_str()),
            DeclarationCode::Definition
            | DeclarationCode::Enum
            | DeclarationCode::Delegate
            | DeclarationCode::Task
            | DeclarationCode::Interface => self
                .definitions
                .get(declaration.index as usize)
                .map(|d| d.name.as_str()),
            _ => None,
        };
        name.unwrap_or("<unknown>").to_string()
    }

    fn type_name(&self, ty: &CompilingType) -> String {
        match self.info(&ty.definition) {
            Some(info) => {
                let mut name = info.name.clone();
                for _ in 0..ty.dimension {
                    name.push_str("[]");
                }
                name
            }
            None => ty.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_overloads_share_name() {
        let mut table = SymbolTable::new();
        let a = table.add_function("f", &[CompilingType::BYTE], &[]);
        let b = table.add_function("f", &[CompilingType::INTEGER], &[]);
        assert_eq!(table.find("f"), vec![a, b]);
        assert_eq!(b.overload, 1);
        assert_eq!(table.describe(&b), "f(integer)");
    }

    #[test]
    fn test_global_addresses_are_aligned() {
        let mut table = SymbolTable::new();
        let flag = table.add_global_variable("flag", CompilingType::BOOL);
        let count = table.add_global_variable("count", CompilingType::INTEGER);
        assert_eq!(table.variable_address(&flag), Some(0));
        assert_eq!(table.variable_address(&count), Some(8));
        assert_eq!(table.data_size(), 16);
    }

    #[test]
    fn test_inherit_distance() {
        let mut table = SymbolTable::new();
        let shape = table.add_interface("Shape", &[]);
        let base = table.add_class("Base", None, &[shape]);
        let derived = table.add_class("Derived", Some(base), &[]);
        assert_eq!(table.inherit_distance(&derived, &derived), Some(0));
        assert_eq!(table.inherit_distance(&base, &derived), Some(1));
        assert_eq!(table.inherit_distance(&shape, &derived), Some(2));
        assert_eq!(table.inherit_distance(&Definition::HANDLE, &derived), Some(2));
        assert_eq!(table.inherit_distance(&derived, &base), None);
    }

    #[test]
    fn test_member_fields_follow_parent() {
        let mut table = SymbolTable::new();
        let base = table.add_class("Base", None, &[]);
        table.add_member_variable(base, "x", CompilingType::INTEGER);
        let derived = table.add_class("Derived", Some(base), &[]);
        let y = table.add_member_variable(derived, "y", CompilingType::REAL);
        assert_eq!(table.variable_address(&y), Some(8));
        assert_eq!(table.find_member(&derived, "y"), vec![y]);
        assert!(table.find_member(&derived, "x").is_empty());
    }

    #[test]
    fn test_enum_elements() {
        let mut table = SymbolTable::new();
        let color = table.add_enum("Color", &[("Red", 0), ("Blue", 2)]);
        let blue = table.find_member(&color, "Blue");
        assert_eq!(
            table.constant_value(&blue[0]),
            Some(Constant::Enum(CompilingType::new(color, 0), 2))
        );
    }

    #[test]
    fn test_members_constructors_and_tasks() {
        let mut table = SymbolTable::new();
        let point = table.add_class("Point", None, &[]);
        let length = table.add_member_function(point, "length", &[], &[CompilingType::REAL], true);
        let new = table.add_constructor(point, &[CompilingType::REAL, CompilingType::REAL]);
        assert_eq!(table.find_member(&point, "length"), vec![length]);
        assert!(table.is_virtual(&length));
        assert_eq!(table.constructors(&point), vec![new]);
        assert_eq!(table.describe(&new), "Point(real, real)");

        let job = table.add_task("Job", &[CompilingType::INTEGER]);
        let signature = table.definition_signature(&job).unwrap();
        assert!(signature.parameters.is_empty());
        assert_eq!(signature.returns.as_slice(), &[CompilingType::INTEGER]);
    }

    #[test]
    fn test_string_constants_are_owned() {
        let mut table = SymbolTable::new();
        let greeting = {
            let text = String::from("hi");
            table.add_constant("GREETING", Constant::String(&text))
        };
        assert_eq!(table.find("GREETING"), vec![greeting]);
        assert_eq!(table.constant_value(&greeting), Some(Constant::String("hi")));
    }
}
