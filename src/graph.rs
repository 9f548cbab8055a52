//! The parsed object graph handed over by the external parser.
//!
//! A [`ParsedStruct`] exposes its shared type descriptor, a fallible accessor per field and the
//! span metadata the parser recorded while reading: one relative `(start, end)` pair per field
//! and, for repeated fields, one pair per element. [`DumpedStruct`] is the implementation backed
//! by a loaded parse dump.

use crate::error::AccessError;
use crate::schema::StructType;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A parsed structure as seen through its accessors.
pub trait ParsedStruct: fmt::Debug + Send + Sync {
    /// Descriptor shared by every instance of this structure's type.
    fn struct_type(&self) -> &Arc<StructType>;

    /// Invokes the accessor for `name`.
    ///
    /// An optional field that was skipped during parsing yields [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Returns an error if the field is unknown or its accessor fails.
    fn field(&self, name: &str) -> Result<Value, AccessError>;

    /// Recorded `(start, end)` of a field, relative to this structure's start.
    ///
    /// `None` for fields absent from the input and for derived fields.
    fn field_span(&self, name: &str) -> Option<(u64, u64)>;

    /// Recorded per-element start and end offsets of a repeated field.
    fn element_offsets(&self, name: &str) -> Option<(&[u64], &[u64])>;

    /// Number of bytes consumed while parsing this structure.
    fn consumed_len(&self) -> u64;
}

#[derive(Clone, Debug)]
/// A resolved field value.
pub enum Value {
    /// Absent optional field.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating-point number.
    Float(f64),
    /// Decoded string.
    Str(String),
    /// Raw byte buffer.
    Bytes(Vec<u8>),
    /// Raw numeric value of an enumeration; symbols come from the field's type tag.
    Enum(i64),
    /// Nested structure.
    Struct(Arc<dyn ParsedStruct>),
    /// Elements of a repeated field.
    Array(Vec<Value>),
}

impl Value {
    /// Short name of the runtime shape, for error messages.
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "a boolean",
            Self::Int(_) | Self::UInt(_) | Self::Float(_) => "a number",
            Self::Str(_) => "a string",
            Self::Bytes(_) => "a byte buffer",
            Self::Enum(_) => "an enum value",
            Self::Struct(_) => "a structure",
            Self::Array(_) => "an array",
        }
    }
}

#[derive(Debug)]
/// Structure backed by the contents of a parse dump.
pub struct DumpedStruct {
    struct_type: Arc<StructType>,
    values: HashMap<String, Value>,
    errors: HashMap<String, String>,
    attr_start: HashMap<String, u64>,
    attr_end: HashMap<String, u64>,
    arr_start: HashMap<String, Vec<u64>>,
    arr_end: HashMap<String, Vec<u64>>,
    end: u64,
}

impl DumpedStruct {
    /// Starts a structure of the given type with no fields set.
    #[must_use]
    pub fn builder(struct_type: Arc<StructType>) -> DumpedStructBuilder {
        DumpedStructBuilder {
            inner: Self {
                struct_type,
                values: HashMap::new(),
                errors: HashMap::new(),
                attr_start: HashMap::new(),
                attr_end: HashMap::new(),
                arr_start: HashMap::new(),
                arr_end: HashMap::new(),
                end: 0,
            },
        }
    }
}

impl ParsedStruct for DumpedStruct {
    fn struct_type(&self) -> &Arc<StructType> {
        &self.struct_type
    }

    fn field(&self, name: &str) -> Result<Value, AccessError> {
        if let Some(reason) = self.errors.get(name) {
            return Err(AccessError::Failed {
                field: name.to_string(),
                reason: reason.clone(),
            });
        }
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }
        if self.struct_type.field(name).is_some() {
            Ok(Value::Null)
        } else {
            Err(AccessError::NoSuchField(name.to_string()))
        }
    }

    fn field_span(&self, name: &str) -> Option<(u64, u64)> {
        Some((*self.attr_start.get(name)?, *self.attr_end.get(name)?))
    }

    fn element_offsets(&self, name: &str) -> Option<(&[u64], &[u64])> {
        Some((self.arr_start.get(name)?, self.arr_end.get(name)?))
    }

    fn consumed_len(&self) -> u64 {
        self.end
    }
}

/// Incremental construction of a [`DumpedStruct`].
pub struct DumpedStructBuilder {
    inner: DumpedStruct,
}

impl DumpedStructBuilder {
    #[must_use]
    /// Sets the value returned by the accessor for `name`.
    pub fn value(mut self, name: &str, value: Value) -> Self {
        self.inner.values.insert(name.to_string(), value);
        self
    }

    #[must_use]
    /// Records the relative span of a field.
    pub fn span(mut self, name: &str, start: u64, end: u64) -> Self {
        self.inner.attr_start.insert(name.to_string(), start);
        self.inner.attr_end.insert(name.to_string(), end);
        self
    }

    #[must_use]
    /// Records only the start of a field's relative span.
    pub fn span_start(mut self, name: &str, start: u64) -> Self {
        self.inner.attr_start.insert(name.to_string(), start);
        self
    }

    #[must_use]
    /// Records only the end of a field's relative span.
    pub fn span_end(mut self, name: &str, end: u64) -> Self {
        self.inner.attr_end.insert(name.to_string(), end);
        self
    }

    #[must_use]
    /// Records per-element offsets of a repeated field, relative to the field's start.
    pub fn elements(mut self, name: &str, starts: Vec<u64>, ends: Vec<u64>) -> Self {
        self.inner.arr_start.insert(name.to_string(), starts);
        self.inner.arr_end.insert(name.to_string(), ends);
        self
    }

    #[must_use]
    /// Makes the accessor for `name` fail with `reason`.
    pub fn error(mut self, name: &str, reason: &str) -> Self {
        self.inner
            .errors
            .insert(name.to_string(), reason.to_string());
        self
    }

    #[must_use]
    /// Sets the number of bytes the structure consumed.
    pub fn end(mut self, end: u64) -> Self {
        self.inner.end = end;
        self
    }

    #[must_use]
    /// Finishes the structure.
    pub fn build(self) -> Arc<DumpedStruct> {
        Arc::new(self.inner)
    }
}
