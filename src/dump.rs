//! Parse dumps: the JSON form in which an external parser hands over its object graph.
//!
//! A dump carries the type declarations of the compiled format (declared fields in order,
//! derived fields in discovery order, enumerations with their symbols) and one root structure
//! with its values and the span metadata recorded while parsing. Loading resolves every type
//! name once and builds the shared descriptors that all structure instances point at.

use crate::error::LoadError;
use crate::graph::{DumpedStruct, ParsedStruct, Value};
use crate::schema::{EnumSymbol, EnumType, FieldDescriptor, FieldRole, StructType, TypeRegistry, TypeTag};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
/// Top-level document written by the parser.
pub struct ParseDump {
    /// Structure types by name.
    #[serde(default)]
    pub types: HashMap<String, DumpType>,
    /// Enumeration symbols by enum type name, in declaration order.
    #[serde(default)]
    pub enums: HashMap<String, Vec<DumpSymbol>>,
    /// The structure the whole file was parsed into.
    pub root: DumpStruct,
}

#[derive(Debug, Deserialize)]
/// Declaration of one structure type.
pub struct DumpType {
    /// Fields stored in the byte layout, in format order.
    #[serde(default)]
    pub seq: Vec<DumpField>,
    /// Fields computed on access, in discovery order.
    #[serde(default)]
    pub instances: Vec<DumpField>,
}

#[derive(Debug, Deserialize)]
/// Declaration of one field.
pub struct DumpField {
    /// Field name, unique within its structure type.
    pub name: String,
    /// Primitive type name (`u4`, `str`, `bytes`, ...) or the name of a structure type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Enumeration the raw value is resolved against.
    #[serde(default, rename = "enum")]
    pub enum_name: Option<String>,
    /// Whether the field repeats.
    #[serde(default)]
    pub repeat: bool,
}

#[derive(Debug, Deserialize)]
/// One named value of an enumeration.
pub struct DumpSymbol {
    /// Symbol name.
    pub name: String,
    /// Raw value the symbol stands for.
    pub value: i64,
}

#[derive(Debug, Deserialize)]
/// One parsed structure instance.
pub struct DumpStruct {
    /// Name of a structure type declared in `types`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Bytes consumed while parsing this structure.
    #[serde(default)]
    pub end: u64,
    /// Field values by name; absent optional fields are left out.
    #[serde(default)]
    pub fields: HashMap<String, DumpValue>,
    /// Accessor failures by field name.
    #[serde(default)]
    pub errors: HashMap<String, String>,
    /// Field start offsets, relative to this structure.
    #[serde(default)]
    pub attr_start: HashMap<String, u64>,
    /// Field end offsets (exclusive), relative to this structure.
    #[serde(default)]
    pub attr_end: HashMap<String, u64>,
    /// Per-element start offsets of repeated fields, relative to the field.
    #[serde(default)]
    pub arr_start: HashMap<String, Vec<u64>>,
    /// Per-element end offsets of repeated fields, relative to the field.
    #[serde(default)]
    pub arr_end: HashMap<String, Vec<u64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Externally tagged field value: `{"u": 5}`, `{"bytes": [1, 2]}`, `"null"`, ...
pub enum DumpValue {
    /// Field skipped while parsing.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    I(i64),
    /// Unsigned integer.
    U(u64),
    /// Floating-point number.
    F(f64),
    /// Decoded string.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Raw enumeration value.
    Enum(i64),
    /// Nested structure.
    Struct(Box<DumpStruct>),
    /// Elements of a repeated field.
    Array(Vec<DumpValue>),
}

/// A parse dump with its types resolved.
pub struct LoadedDump {
    /// Every structure and enumeration descriptor in the dump.
    pub registry: TypeRegistry,
    /// The parsed root structure.
    pub root: Arc<dyn ParsedStruct>,
}

/// Parse a dump from its JSON text.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or refers to undeclared types.
pub fn parse_dump(json: &str) -> Result<LoadedDump, LoadError> {
    let dump: ParseDump = serde_json::from_str(json)?;
    let registry = build_registry(&dump)?;
    let root: Arc<dyn ParsedStruct> = convert_struct(&registry, dump.root)?;

    info!(
        root_type = %root.struct_type().name,
        consumed = root.consumed_len(),
        "loaded parse dump"
    );
    Ok(LoadedDump { registry, root })
}

/// Read and parse a dump file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_dump(path: &Path) -> Result<LoadedDump, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    parse_dump(&contents)
}

fn build_registry(dump: &ParseDump) -> Result<TypeRegistry, LoadError> {
    let mut registry = TypeRegistry::new();

    for (name, symbols) in &dump.enums {
        registry.insert_enum(EnumType {
            name: name.clone(),
            symbols: symbols
                .iter()
                .map(|symbol| EnumSymbol {
                    name: symbol.name.clone(),
                    value: symbol.value,
                })
                .collect(),
        });
    }

    for (name, declared) in &dump.types {
        let mut fields = Vec::with_capacity(declared.seq.len() + declared.instances.len());
        for (role, group) in [
            (FieldRole::Declared, &declared.seq),
            (FieldRole::Derived, &declared.instances),
        ] {
            for field in group {
                fields.push(FieldDescriptor {
                    name: field.name.clone(),
                    tag: resolve_tag(dump, &registry, name, field)?,
                    repeated: field.repeat,
                    role,
                });
            }
        }
        registry.insert_struct(StructType::new(name.clone(), fields));
    }

    Ok(registry)
}

fn resolve_tag(
    dump: &ParseDump,
    registry: &TypeRegistry,
    owner: &str,
    field: &DumpField,
) -> Result<TypeTag, LoadError> {
    if let Some(enum_name) = &field.enum_name {
        return registry
            .enum_type(enum_name)
            .map(TypeTag::Enum)
            .ok_or_else(|| LoadError::UnknownType {
                owner: owner.to_string(),
                name: enum_name.clone(),
            });
    }
    if dump.types.contains_key(&field.type_name) {
        Ok(TypeTag::Struct(field.type_name.clone()))
    } else {
        Ok(TypeTag::Scalar(field.type_name.clone()))
    }
}

fn convert_struct(registry: &TypeRegistry, raw: DumpStruct) -> Result<Arc<DumpedStruct>, LoadError> {
    let struct_type = registry
        .struct_type(&raw.type_name)
        .ok_or_else(|| LoadError::UnknownStruct(raw.type_name.clone()))?;

    let mut builder = DumpedStruct::builder(Arc::clone(&struct_type)).end(raw.end);
    for (name, value) in raw.fields {
        // a struct-valued field whose type name resolved to nothing known
        if let Some(TypeTag::Scalar(type_name)) = struct_type.field(&name).map(|field| &field.tag) {
            if holds_struct(&value) {
                return Err(LoadError::UnknownType {
                    owner: raw.type_name.clone(),
                    name: type_name.clone(),
                });
            }
        }
        builder = builder.value(&name, convert_value(registry, value)?);
    }
    for (name, reason) in &raw.errors {
        builder = builder.error(name, reason);
    }
    for (name, start) in raw.attr_start {
        builder = builder.span_start(&name, start);
    }
    for (name, end) in raw.attr_end {
        builder = builder.span_end(&name, end);
    }
    let mut arr_end = raw.arr_end;
    for (name, starts) in raw.arr_start {
        if let Some(ends) = arr_end.remove(&name) {
            builder = builder.elements(&name, starts, ends);
        }
    }

    Ok(builder.build())
}

fn holds_struct(value: &DumpValue) -> bool {
    match value {
        DumpValue::Struct(_) => true,
        DumpValue::Array(items) => items.iter().any(holds_struct),
        _ => false,
    }
}

fn convert_value(registry: &TypeRegistry, raw: DumpValue) -> Result<Value, LoadError> {
    Ok(match raw {
        DumpValue::Null => Value::Null,
        DumpValue::Bool(b) => Value::Bool(b),
        DumpValue::I(i) => Value::Int(i),
        DumpValue::U(u) => Value::UInt(u),
        DumpValue::F(f) => Value::Float(f),
        DumpValue::Str(s) => Value::Str(s),
        DumpValue::Bytes(bytes) => Value::Bytes(bytes),
        DumpValue::Enum(raw) => Value::Enum(raw),
        DumpValue::Struct(inner) => Value::Struct(convert_struct(registry, *inner)?),
        DumpValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| convert_value(registry, item))
                .collect::<Result<_, _>>()?,
        ),
    })
}

#[cfg(test)]
#[path = "tests/dump.rs"]
mod tests;
