//! Per-type field descriptors, built once when a parse dump is loaded.
//!
//! Every parsed structure of a given type shares one immutable [`StructType`] that lists its
//! declared fields in format order followed by its derived fields in discovery order. The
//! [`TypeTag`] of each field is decided here, so node construction never has to inspect the
//! runtime shape of a value to pick what kind of node to build.

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Closed set of named symbols for an enumeration type.
pub struct EnumType {
    /// Type name as written in the format description.
    pub name: String,
    /// Symbols in declaration order.
    pub symbols: Vec<EnumSymbol>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One named value of an [`EnumType`].
pub struct EnumSymbol {
    /// Symbol name as written in the format description.
    pub name: String,
    /// Raw value the symbol stands for.
    pub value: i64,
}

impl EnumType {
    /// Symbol name for a raw value, if one matches.
    #[must_use]
    pub fn symbol_for(&self, raw: i64) -> Option<&str> {
        self.symbols
            .iter()
            .find(|symbol| symbol.value == raw)
            .map(|symbol| symbol.name.as_str())
    }
}

#[derive(Debug, Clone)]
/// What a field holds, fixed when its descriptor is built.
pub enum TypeTag {
    /// Nested structure of the named type.
    Struct(String),
    /// Enumeration resolved against its full symbol set.
    Enum(Arc<EnumType>),
    /// Primitive or byte buffer, by its format type name (`u4`, `str`, `bytes`, ...).
    Scalar(String),
}

impl TypeTag {
    /// Name shown to the user for this type.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Struct(name) | Self::Scalar(name) => name,
            Self::Enum(enum_type) => &enum_type.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Whether a field is stored in the byte layout or computed from other fields.
pub enum FieldRole {
    /// Read from the input in format order.
    Declared,
    /// Computed on access; carries no span of its own.
    Derived,
}

#[derive(Debug, Clone)]
/// One field of a structure type.
pub struct FieldDescriptor {
    /// Field name, used to call its accessor.
    pub name: String,
    /// What the field (or each element of a repeated field) holds.
    pub tag: TypeTag,
    /// True for repeated fields, which become array nodes.
    pub repeated: bool,
    /// Whether the field is stored or derived.
    pub role: FieldRole,
}

#[derive(Debug)]
/// Shared descriptor for every parsed instance of one structure type.
pub struct StructType {
    /// Type name as written in the format description.
    pub name: String,
    fields: Vec<FieldDescriptor>,
}

impl StructType {
    /// Builds a descriptor, ordering declared fields before derived ones.
    ///
    /// Each group keeps the order it was given in.
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        let (mut declared, derived): (Vec<_>, Vec<_>) = fields
            .into_iter()
            .partition(|field| field.role == FieldRole::Declared);
        declared.extend(derived);

        Self {
            name: name.into(),
            fields: declared,
        }
    }

    /// Fields in tree display order: declared fields, then derived fields.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Descriptor of the field called `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Default)]
/// All structure and enumeration descriptors known to one loaded format.
pub struct TypeRegistry {
    structs: HashMap<String, Arc<StructType>>,
    enums: HashMap<String, Arc<EnumType>>,
}

impl TypeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a structure type and returns the shared descriptor.
    pub fn insert_struct(&mut self, struct_type: StructType) -> Arc<StructType> {
        let shared = Arc::new(struct_type);
        self.structs
            .insert(shared.name.clone(), Arc::clone(&shared));
        shared
    }

    /// Registers an enumeration type and returns the shared descriptor.
    pub fn insert_enum(&mut self, enum_type: EnumType) -> Arc<EnumType> {
        let shared = Arc::new(enum_type);
        self.enums.insert(shared.name.clone(), Arc::clone(&shared));
        shared
    }

    /// Structure type called `name`.
    #[must_use]
    pub fn struct_type(&self, name: &str) -> Option<Arc<StructType>> {
        self.structs.get(name).cloned()
    }

    /// Enumeration type called `name`.
    #[must_use]
    pub fn enum_type(&self, name: &str) -> Option<Arc<EnumType>> {
        self.enums.get(name).cloned()
    }
}
