//! Typed nodes of the structural tree and the rules for materializing their children.
//!
//! A node is either a structure (children are its fields), an array (children are its
//! elements), a leaf value or enumeration, or an error placeholder. Children are produced by
//! [`NodeData::children`], which is pure: it reads the parsed graph and the node's own absolute
//! span and returns detached child nodes, each with its span already translated to absolute
//! file coordinates. It never fails as a whole; a field that cannot be read becomes an error
//! leaf next to its intact siblings.

use crate::error::ExpandError;
use crate::graph::{ParsedStruct, Value};
use crate::schema::{FieldDescriptor, TypeTag};
use crate::span::{ByteRange, OffsetMode};
use std::fmt::Write;
use std::sync::Arc;
use tracing::warn;

/// Name given to the root structure node.
pub const ROOT_NAME: &str = "[root]";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Category of a node, used by renderers to pick icons and colours.
pub enum NodeKind {
    /// A structure; children are its fields.
    Struct,
    /// A repeated field; children are its elements.
    Array,
    /// A leaf value.
    Value,
    /// A leaf enumeration value.
    Enum,
    /// A placeholder for something that could not be read.
    Error,
}

#[derive(Clone, Debug)]
/// Per-element offsets of an array, already checked to match the element count.
pub struct ElementOffsets {
    starts: Vec<u64>,
    ends: Vec<u64>,
}

impl ElementOffsets {
    /// Recorded start of each element.
    #[must_use]
    pub fn starts(&self) -> &[u64] {
        &self.starts
    }

    /// Recorded end of each element.
    #[must_use]
    pub fn ends(&self) -> &[u64] {
        &self.ends
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Payload {
    Struct(Arc<dyn ParsedStruct>),
    Array {
        elements: Vec<Value>,
        element_tag: TypeTag,
        offsets: Option<ElementOffsets>,
    },
    Value {
        value: Value,
        tag: TypeTag,
    },
    Error(ExpandError),
}

#[derive(Clone, Debug)]
/// A node that has been built but not yet attached to a tree.
pub struct NodeData {
    /// Field name, element index such as `[2]`, or the root or error marker.
    pub name: String,
    /// Absolute span, or `None` for absent and derived fields.
    pub span: Option<ByteRange>,
    pub(crate) payload: Payload,
}

impl NodeData {
    /// Root node for a parsed structure, spanning every byte it consumed.
    #[must_use]
    pub fn root(parsed: Arc<dyn ParsedStruct>) -> Self {
        let span = ByteRange::new(0, parsed.consumed_len());
        Self {
            name: ROOT_NAME.to_string(),
            span: Some(span),
            payload: Payload::Struct(parsed),
        }
    }

    pub(crate) fn error(name: impl Into<String>, span: Option<ByteRange>, error: ExpandError) -> Self {
        Self {
            name: name.into(),
            span,
            payload: Payload::Error(error),
        }
    }

    /// What this node is, for rendering.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match &self.payload {
            Payload::Struct(_) => NodeKind::Struct,
            Payload::Array { .. } => NodeKind::Array,
            Payload::Value {
                tag: TypeTag::Enum(_),
                value: Value::Enum(_),
            } => NodeKind::Enum,
            Payload::Value { .. } => NodeKind::Value,
            Payload::Error(_) => NodeKind::Error,
        }
    }

    /// Resolved value of a leaf node.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Value { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Declared type of a leaf node, or the element type of an array node.
    #[must_use]
    pub fn value_type(&self) -> Option<&TypeTag> {
        match &self.payload {
            Payload::Value { tag, .. } => Some(tag),
            Payload::Array { element_tag, .. } => Some(element_tag),
            _ => None,
        }
    }

    /// Recorded per-element offsets of an array node.
    #[must_use]
    pub fn element_offsets(&self) -> Option<&ElementOffsets> {
        match &self.payload {
            Payload::Array { offsets, .. } => offsets.as_ref(),
            _ => None,
        }
    }

    /// Parsed structure behind a structure node.
    #[must_use]
    pub fn parsed_struct(&self) -> Option<&Arc<dyn ParsedStruct>> {
        match &self.payload {
            Payload::Struct(parsed) => Some(parsed),
            _ => None,
        }
    }

    /// What went wrong, for an error node.
    #[must_use]
    pub fn error_detail(&self) -> Option<&ExpandError> {
        match &self.payload {
            Payload::Error(error) => Some(error),
            _ => None,
        }
    }

    /// True if this node can never have children.
    ///
    /// Structures are only known to be empty once expanded, so they report `false` here.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match &self.payload {
            Payload::Struct(_) => false,
            Payload::Array { elements, .. } => elements.is_empty(),
            Payload::Value { .. } | Payload::Error(_) => true,
        }
    }

    /// Builds this node's children: fields in descriptor order for a structure, one node per
    /// element for an array, nothing for leaves.
    #[must_use]
    pub fn children(&self, mode: OffsetMode) -> Vec<NodeData> {
        match &self.payload {
            Payload::Struct(parsed) => parsed
                .struct_type()
                .fields()
                .iter()
                .map(|field| field_node(parsed.as_ref(), field, self.span, mode))
                .collect(),
            Payload::Array {
                elements,
                element_tag,
                offsets,
            } => elements
                .iter()
                .enumerate()
                .map(|(i, element)| {
                    let name = format!("[{i}]");
                    let span = offsets.as_ref().and_then(|offsets| {
                        recorded_span(&name, self.span, offsets.starts[i], offsets.ends[i], mode)
                    });
                    typed_node(name, element.clone(), element_tag, span)
                })
                .collect(),
            Payload::Value { .. } | Payload::Error(_) => Vec::new(),
        }
    }

    /// Text after the node name: what the node holds.
    #[must_use]
    pub fn value_string(&self, bytes_preview: usize) -> String {
        match &self.payload {
            Payload::Struct(parsed) => format!("struct {}", parsed.struct_type().name),
            Payload::Array {
                elements,
                element_tag,
                ..
            } => format!("{}[{}]", element_tag.display_name(), elements.len()),
            Payload::Value {
                value,
                tag: TypeTag::Enum(enum_type),
            } => match value {
                Value::Enum(raw) => match enum_type.symbol_for(*raw) {
                    Some(symbol) => format!("{}::{symbol} ({raw:#x})", enum_type.name),
                    None => format!("{}::??? ({raw})", enum_type.name),
                },
                other => format_scalar(other, bytes_preview),
            },
            Payload::Value { value, tag } => {
                format!("{} = {}", tag.display_name(), format_scalar(value, bytes_preview))
            }
            Payload::Error(error) => format!("[error] {error}"),
        }
    }

    /// Full display string, `name: value`.
    #[must_use]
    pub fn label(&self, bytes_preview: usize) -> String {
        format!("{}: {}", self.name, self.value_string(bytes_preview))
    }
}

/// Renders a byte buffer as `[0x01, 0x02, ...]`, showing at most `limit` bytes.
#[must_use]
pub fn format_bytes(data: &[u8], limit: usize) -> String {
    let shown = data.len().min(limit);
    let mut out = String::from("[");
    for (i, byte) in data[..shown].iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "0x{byte:02X}");
    }
    if data.len() > shown {
        out.push_str(if shown > 0 { ", ..." } else { "..." });
    }
    out.push(']');
    out
}

fn format_scalar(value: &Value, bytes_preview: usize) -> String {
    match value {
        Value::Null => "[null]".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) | Value::Enum(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => s.clone(),
        Value::Bytes(bytes) => format_bytes(bytes, bytes_preview),
        Value::Struct(parsed) => format!("struct {}", parsed.struct_type().name),
        Value::Array(items) => format!("[{} entries]", items.len()),
    }
}

fn field_node(
    parent: &dyn ParsedStruct,
    field: &FieldDescriptor,
    anchor: Option<ByteRange>,
    mode: OffsetMode,
) -> NodeData {
    let value = match parent.field(&field.name) {
        Ok(value) => value,
        Err(error) => {
            warn!(field = %field.name, %error, "field accessor failed");
            return NodeData::error(field.name.clone(), None, error.into());
        }
    };

    let span = parent
        .field_span(&field.name)
        .and_then(|(start, end)| recorded_span(&field.name, anchor, start, end, mode));

    if !field.repeated {
        return typed_node(field.name.clone(), value, &field.tag, span);
    }

    match value {
        Value::Array(elements) => {
            let offsets = match parent.element_offsets(&field.name) {
                Some((starts, ends))
                    if starts.len() != elements.len() || ends.len() != elements.len() =>
                {
                    let error = ExpandError::OffsetMismatch {
                        field: field.name.clone(),
                        elements: elements.len(),
                        starts: starts.len(),
                        ends: ends.len(),
                    };
                    warn!(%error, "malformed array offsets");
                    return NodeData::error(field.name.clone(), span, error);
                }
                Some((starts, ends)) => Some(ElementOffsets {
                    starts: starts.to_vec(),
                    ends: ends.to_vec(),
                }),
                None => None,
            };
            NodeData {
                name: field.name.clone(),
                span,
                payload: Payload::Array {
                    elements,
                    element_tag: field.tag.clone(),
                    offsets,
                },
            }
        }
        Value::Null => typed_node(field.name.clone(), Value::Null, &field.tag, span),
        other => mismatch(field.name.clone(), span, "an array", &other),
    }
}

/// Absolute span for recorded offsets, or `None` if they cannot be placed.
fn recorded_span(
    name: &str,
    anchor: Option<ByteRange>,
    start: u64,
    end: u64,
    mode: OffsetMode,
) -> Option<ByteRange> {
    if end < start {
        warn!(field = name, start, end, "recorded span ends before it starts");
        return None;
    }
    mode.translate(anchor, start, end)
}

/// Node for a single (non-repeated) value, dispatched on the declared type tag.
fn typed_node(name: String, value: Value, tag: &TypeTag, span: Option<ByteRange>) -> NodeData {
    let payload = match (tag, value) {
        (_, Value::Null) => Payload::Value {
            value: Value::Null,
            tag: tag.clone(),
        },
        (TypeTag::Struct(_), Value::Struct(parsed)) => Payload::Struct(parsed),
        (TypeTag::Struct(_), other) => return mismatch(name, span, "a structure", &other),
        (TypeTag::Enum(_), Value::Enum(raw) | Value::Int(raw)) => Payload::Value {
            value: Value::Enum(raw),
            tag: tag.clone(),
        },
        (TypeTag::Enum(_), Value::UInt(raw)) => match i64::try_from(raw) {
            Ok(raw) => Payload::Value {
                value: Value::Enum(raw),
                tag: tag.clone(),
            },
            Err(_) => {
                return mismatch(name, span, "an enum value", &Value::UInt(raw));
            }
        },
        (TypeTag::Enum(_), other) => return mismatch(name, span, "an enum value", &other),
        (TypeTag::Scalar(_), other @ (Value::Struct(_) | Value::Array(_))) => {
            return mismatch(name, span, "a scalar", &other);
        }
        (TypeTag::Scalar(_), value) => Payload::Value {
            value,
            tag: tag.clone(),
        },
    };

    NodeData {
        name,
        span,
        payload,
    }
}

fn mismatch(name: String, span: Option<ByteRange>, expected: &'static str, found: &Value) -> NodeData {
    let error = ExpandError::KindMismatch {
        field: name.clone(),
        expected,
        found: found.shape(),
    };
    warn!(%error, "value does not match its declared type");
    NodeData::error(name, span, error)
}

#[cfg(test)]
#[path = "tests/node.rs"]
mod tests;
