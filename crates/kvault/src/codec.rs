// ai
//! 🗜️ The record codec: `Record` in, `EntryPoint` bytes out, and back again.
//!
//! 🎬 COLD OPEN: INT. CUSTOMS OFFICE, NIGHT
//!
//! Every document leaving the cluster gets the same treatment. It is stamped
//! with where it came from (`index`), what it claims to be (`type`), and its
//! luggage is searched field by field against the manifest (`source`). Anything
//! not on the manifest stays behind. Anything on the manifest but the wrong
//! shape gets the document detained. There is no appeals process.
//!
//! The manifest is a [`SchemaDescription`], compiled once per process into a
//! lookup table. After that the codec is stateless: `pack` and `unpack` can be
//! called for every record of a ten-million-document run without allocating
//! anything but the output. 🦆
//!
//! ## Mapping JSON onto the wire
//!
//! | schema                | JSON accepted on pack            | JSON produced on unpack |
//! |-----------------------|----------------------------------|-------------------------|
//! | `string`              | string                           | string                  |
//! | `bool`                | boolean                          | boolean                 |
//! | `double` / `float`    | any number                       | number                  |
//! | integer types         | integer within the type's range  | integer                 |
//! | message               | object                           | object                  |
//! | `repeated X`          | array of X                       | array of X              |
//!
//! `null` is treated as absent. Integral doubles come back as JSON integers,
//! which is how the rest of the JSON world treats them anyway.

pub mod schema;
pub(crate) mod wire;

use std::collections::HashMap;

use serde_json::{Map, Number, Value};

use crate::common::Record;
use schema::{Cardinality, FieldType, ScalarType, SchemaDescription, SchemaError};
use wire::WireType;

/// 📛 The envelope message every archive entry is wrapped in.
pub const ENTRY_POINT: &str = "EntryPoint";

/// 💀 Per-record encode/decode failures. Terminal for the pipeline that hits them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("required field '{path}' is missing")]
    MissingRequired { path: String },
    #[error("field '{path}' expects {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("field '{path}' value {value} does not fit in {ty}")]
    OutOfRange {
        path: String,
        value: String,
        ty: &'static str,
    },
    #[error("field '{path}' decoded to a non-finite float")]
    NonFiniteFloat { path: String },
    #[error("field '{path}' is not valid UTF-8")]
    InvalidUtf8 { path: String },
    #[error("field '{path}' arrived as wire type {found}, the schema says {expected}")]
    WireTypeMismatch { path: String, expected: u8, found: u8 },
    #[error("input ended in the middle of a value")]
    Truncated,
    #[error("varint is longer than ten bytes")]
    VarintOverflow,
    #[error("unsupported wire type {0}")]
    UnsupportedWireType(u8),
    #[error("invalid field number {0}")]
    InvalidFieldNumber(u64),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Scalar(ScalarType),
    Message(usize),
}

#[derive(Debug)]
struct CompiledField {
    name: String,
    number: u32,
    cardinality: Cardinality,
    slot: Slot,
    wire_type: WireType,
}

#[derive(Debug)]
struct CompiledMessage {
    name: String,
    fields: Vec<CompiledField>,
    by_number: HashMap<u32, usize>,
}

/// 📐 Where the three envelope fields live inside the compiled `EntryPoint`.
#[derive(Debug)]
struct Envelope {
    message: usize,
    index: u32,
    kind: u32,
    source: u32,
    source_message: usize,
}

/// 🗜️ A loaded schema, ready to pack and unpack records.
///
/// There is no empty or half-loaded codec: construction either resolves the
/// whole schema and validates the envelope, or fails.
#[derive(Debug)]
pub struct RecordCodec {
    messages: Vec<CompiledMessage>,
    envelope: Envelope,
}

impl RecordCodec {
    /// 📖 Parse schema text and compile it.
    pub fn load(schema_text: &str) -> Result<Self, CodecError> {
        Self::from_description(&SchemaDescription::parse(schema_text)?)
    }

    /// 🔧 Compile an already-built description.
    pub fn from_description(schema: &SchemaDescription) -> Result<Self, CodecError> {
        let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(schema.messages.len());
        for (position, message) in schema.messages.iter().enumerate() {
            if by_name.insert(message.name.as_str(), position).is_some() {
                return Err(SchemaError::DuplicateMessage {
                    message: message.name.clone(),
                }
                .into());
            }
        }

        let mut messages = Vec::with_capacity(schema.messages.len());
        for message in &schema.messages {
            let mut fields = Vec::with_capacity(message.fields.len());
            let mut by_number = HashMap::with_capacity(message.fields.len());
            for field in &message.fields {
                let slot = match &field.ty {
                    FieldType::Scalar(scalar) => Slot::Scalar(*scalar),
                    FieldType::Message(target) => match by_name.get(target.as_str()) {
                        Some(&position) => Slot::Message(position),
                        None => {
                            return Err(SchemaError::UnresolvedReference {
                                message: message.name.clone(),
                                field: field.name.clone(),
                                target: target.clone(),
                            }
                            .into());
                        }
                    },
                };
                by_number.insert(field.number, fields.len());
                fields.push(CompiledField {
                    name: field.name.clone(),
                    number: field.number,
                    cardinality: field.cardinality,
                    slot,
                    wire_type: field.ty.wire_type(),
                });
            }
            messages.push(CompiledMessage {
                name: message.name.clone(),
                fields,
                by_number,
            });
        }

        let entry = *by_name.get(ENTRY_POINT).ok_or(SchemaError::MissingEntryPoint)?;
        let envelope = Self::check_envelope(&messages, entry)?;
        Ok(Self { messages, envelope })
    }

    fn check_envelope(messages: &[CompiledMessage], entry: usize) -> Result<Envelope, SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidEntryPoint { reason };
        let fields = &messages[entry].fields;
        let find = |name: &str| fields.iter().find(|f| f.name == name);

        let string_field = |name: &str| -> Result<u32, SchemaError> {
            match find(name) {
                Some(f) if f.cardinality != Cardinality::Repeated && matches!(f.slot, Slot::Scalar(ScalarType::String)) => {
                    Ok(f.number)
                }
                Some(_) => Err(invalid(format!("'{name}' must be a singular string"))),
                None => Err(invalid(format!("no '{name}' field"))),
            }
        };
        let index = string_field("index")?;
        let kind = string_field("type")?;
        let (source, source_message) = match find("source") {
            Some(CompiledField {
                number,
                cardinality,
                slot: Slot::Message(target),
                ..
            }) if *cardinality != Cardinality::Repeated => (*number, *target),
            Some(_) => return Err(invalid("'source' must be a singular message".to_string())),
            None => return Err(invalid("no 'source' field".to_string())),
        };

        // -- anything else required in the envelope could never be filled from a Record
        if let Some(extra) = fields
            .iter()
            .find(|f| f.cardinality == Cardinality::Required && !matches!(f.name.as_str(), "index" | "type" | "source"))
        {
            return Err(invalid(format!("unexpected required field '{}'", extra.name)));
        }

        Ok(Envelope {
            message: entry,
            index,
            kind,
            source,
            source_message,
        })
    }

    /// 🏷️ Name of the message the record bodies are encoded as.
    pub fn source_message(&self) -> &str {
        &self.messages[self.envelope.source_message].name
    }

    /// 📦 Encode one record as an `EntryPoint` message.
    pub fn pack(&self, record: &Record) -> Result<Vec<u8>, CodecError> {
        let mut body = Vec::new();
        self.encode_message(self.envelope.source_message, &record.body, "source", &mut body)?;

        let mut out = Vec::with_capacity(body.len() + record.collection.len() + record.kind.len() + 16);
        wire::put_key(&mut out, self.envelope.index, WireType::LengthDelimited);
        wire::put_bytes(&mut out, record.collection.as_bytes());
        wire::put_key(&mut out, self.envelope.kind, WireType::LengthDelimited);
        wire::put_bytes(&mut out, record.kind.as_bytes());
        wire::put_key(&mut out, self.envelope.source, WireType::LengthDelimited);
        wire::put_bytes(&mut out, &body);
        Ok(out)
    }

    /// 📭 Decode one `EntryPoint` message back into a record.
    pub fn unpack(&self, bytes: &[u8]) -> Result<Record, CodecError> {
        let mut envelope = self.decode_message(self.envelope.message, bytes, "")?;
        let collection = take_string(&mut envelope, "index")?;
        let kind = take_string(&mut envelope, "type")?;
        let body = match envelope.remove("source") {
            Some(Value::Object(body)) => body,
            _ => {
                return Err(CodecError::MissingRequired {
                    path: "source".to_string(),
                });
            }
        };
        Ok(Record {
            collection,
            kind,
            body,
        })
    }

    // ===== encode =====

    fn encode_message(
        &self,
        message: usize,
        body: &Map<String, Value>,
        path: &str,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        for field in &self.messages[message].fields {
            let value = body.get(&field.name).filter(|v| !v.is_null());
            match (field.cardinality, value) {
                (Cardinality::Required, None) => {
                    return Err(CodecError::MissingRequired {
                        path: child(path, &field.name),
                    });
                }
                (_, None) => {}
                (Cardinality::Repeated, Some(Value::Array(items))) => {
                    for item in items {
                        self.encode_value(field, item, path, out)?;
                    }
                }
                (Cardinality::Repeated, Some(other)) => {
                    return Err(CodecError::TypeMismatch {
                        path: child(path, &field.name),
                        expected: "array",
                        found: json_kind(other),
                    });
                }
                (_, Some(value)) => self.encode_value(field, value, path, out)?,
            }
        }
        Ok(())
    }

    fn encode_value(&self, field: &CompiledField, value: &Value, path: &str, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let mismatch = |expected: &'static str| CodecError::TypeMismatch {
            path: child(path, &field.name),
            expected,
            found: json_kind(value),
        };

        wire::put_key(out, field.number, field.wire_type);
        match field.slot {
            Slot::Message(target) => {
                let Value::Object(nested) = value else {
                    return Err(mismatch("object"));
                };
                let mut buf = Vec::new();
                self.encode_message(target, nested, &child(path, &field.name), &mut buf)?;
                wire::put_bytes(out, &buf);
            }
            Slot::Scalar(ScalarType::String) => {
                let Value::String(text) = value else {
                    return Err(mismatch("string"));
                };
                wire::put_bytes(out, text.as_bytes());
            }
            Slot::Scalar(ScalarType::Bool) => {
                let Value::Bool(flag) = value else {
                    return Err(mismatch("boolean"));
                };
                wire::put_varint(out, u64::from(*flag));
            }
            Slot::Scalar(ScalarType::Double) => {
                let number = value.as_f64().ok_or_else(|| mismatch("number"))?;
                out.extend_from_slice(&number.to_le_bytes());
            }
            Slot::Scalar(ScalarType::Float) => {
                let number = value.as_f64().ok_or_else(|| mismatch("number"))?;
                if number.abs() > f64::from(f32::MAX) {
                    return Err(out_of_range(path, field, value, "float"));
                }
                out.extend_from_slice(&(number as f32).to_le_bytes());
            }
            Slot::Scalar(scalar) => {
                let Value::Number(number) = value else {
                    return Err(mismatch("integer"));
                };
                self.encode_integer(field, scalar, number, path, out)?;
            }
        }
        Ok(())
    }

    fn encode_integer(
        &self,
        field: &CompiledField,
        scalar: ScalarType,
        number: &Number,
        path: &str,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        let raw = Value::Number(number.clone());
        let range = |ty: &'static str| out_of_range(path, field, &raw, ty);
        if number.is_f64() {
            return Err(CodecError::TypeMismatch {
                path: child(path, &field.name),
                expected: "integer",
                found: "float",
            });
        }
        let signed = number.as_i64();
        let unsigned = number.as_u64();

        match scalar {
            ScalarType::Int32 => {
                let v = signed.filter(|v| i32::try_from(*v).is_ok()).ok_or_else(|| range("int32"))?;
                wire::put_varint(out, v as u64);
            }
            ScalarType::Int64 => {
                let v = signed.ok_or_else(|| range("int64"))?;
                wire::put_varint(out, v as u64);
            }
            ScalarType::Uint32 => {
                let v = unsigned.filter(|v| u32::try_from(*v).is_ok()).ok_or_else(|| range("uint32"))?;
                wire::put_varint(out, v);
            }
            ScalarType::Uint64 => {
                let v = unsigned.ok_or_else(|| range("uint64"))?;
                wire::put_varint(out, v);
            }
            ScalarType::Sint32 => {
                let v = signed.filter(|v| i32::try_from(*v).is_ok()).ok_or_else(|| range("sint32"))?;
                wire::put_varint(out, wire::zigzag(v));
            }
            ScalarType::Sint64 => {
                let v = signed.ok_or_else(|| range("sint64"))?;
                wire::put_varint(out, wire::zigzag(v));
            }
            ScalarType::Fixed32 => {
                let v = unsigned.and_then(|v| u32::try_from(v).ok()).ok_or_else(|| range("fixed32"))?;
                out.extend_from_slice(&v.to_le_bytes());
            }
            ScalarType::Fixed64 => {
                let v = unsigned.ok_or_else(|| range("fixed64"))?;
                out.extend_from_slice(&v.to_le_bytes());
            }
            ScalarType::Sfixed32 => {
                let v = signed.and_then(|v| i32::try_from(v).ok()).ok_or_else(|| range("sfixed32"))?;
                out.extend_from_slice(&v.to_le_bytes());
            }
            ScalarType::Sfixed64 => {
                let v = signed.ok_or_else(|| range("sfixed64"))?;
                out.extend_from_slice(&v.to_le_bytes());
            }
            // -- handled by encode_value before we get here
            ScalarType::Double | ScalarType::Float | ScalarType::Bool | ScalarType::String => {}
        }
        Ok(())
    }

    // ===== decode =====

    fn decode_message(&self, message: usize, buf: &[u8], path: &str) -> Result<Map<String, Value>, CodecError> {
        let compiled = &self.messages[message];
        let mut decoded = Map::new();
        let mut idx = 0;
        while idx < buf.len() {
            let (number, wire_type) = wire::get_key(buf, &mut idx)?;
            let Some(&position) = compiled.by_number.get(&number) else {
                wire::skip_field(buf, &mut idx, wire_type)?;
                continue;
            };
            let field = &compiled.fields[position];

            if field.cardinality == Cardinality::Repeated {
                let packable = matches!(field.slot, Slot::Scalar(s) if s != ScalarType::String);
                let mut fresh = Vec::new();
                if packable && wire_type == WireType::LengthDelimited {
                    // -- packed encoding: one length-delimited run of bare scalars
                    let run = wire::get_bytes(buf, &mut idx)?;
                    let mut run_idx = 0;
                    while run_idx < run.len() {
                        fresh.push(self.decode_value(field, run, &mut run_idx, path)?);
                    }
                } else {
                    check_wire_type(field, wire_type, path)?;
                    fresh.push(self.decode_value(field, buf, &mut idx, path)?);
                }
                append_repeated(&mut decoded, &field.name, fresh);
            } else {
                check_wire_type(field, wire_type, path)?;
                let value = self.decode_value(field, buf, &mut idx, path)?;
                // -- singular field seen twice: last one wins
                decoded.insert(field.name.clone(), value);
            }
        }

        for field in &compiled.fields {
            if field.cardinality == Cardinality::Required && !decoded.contains_key(&field.name) {
                return Err(CodecError::MissingRequired {
                    path: child(path, &field.name),
                });
            }
        }
        Ok(decoded)
    }

    fn decode_value(&self, field: &CompiledField, buf: &[u8], idx: &mut usize, path: &str) -> Result<Value, CodecError> {
        let scalar = match field.slot {
            Slot::Message(target) => {
                let nested = wire::get_bytes(buf, idx)?;
                return Ok(Value::Object(self.decode_message(target, nested, &child(path, &field.name))?));
            }
            Slot::Scalar(scalar) => scalar,
        };
        let value = match scalar {
            ScalarType::String => {
                let raw = wire::get_bytes(buf, idx)?;
                let text = std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8 {
                    path: child(path, &field.name),
                })?;
                Value::String(text.to_string())
            }
            ScalarType::Bool => Value::Bool(wire::get_varint(buf, idx)? != 0),
            ScalarType::Double => float_value(f64::from_le_bytes(wire::get_fixed64(buf, idx)?), path, field)?,
            ScalarType::Float => float_value(f64::from(f32::from_le_bytes(wire::get_fixed32(buf, idx)?)), path, field)?,
            ScalarType::Int32 => Value::from(wire::get_varint(buf, idx)? as i64 as i32),
            ScalarType::Int64 => Value::from(wire::get_varint(buf, idx)? as i64),
            ScalarType::Uint32 => Value::from(wire::get_varint(buf, idx)? as u32),
            ScalarType::Uint64 => Value::from(wire::get_varint(buf, idx)?),
            ScalarType::Sint32 => Value::from(wire::unzigzag(wire::get_varint(buf, idx)?) as i32),
            ScalarType::Sint64 => Value::from(wire::unzigzag(wire::get_varint(buf, idx)?)),
            ScalarType::Fixed32 => Value::from(u32::from_le_bytes(wire::get_fixed32(buf, idx)?)),
            ScalarType::Fixed64 => Value::from(u64::from_le_bytes(wire::get_fixed64(buf, idx)?)),
            ScalarType::Sfixed32 => Value::from(i32::from_le_bytes(wire::get_fixed32(buf, idx)?)),
            ScalarType::Sfixed64 => Value::from(i64::from_le_bytes(wire::get_fixed64(buf, idx)?)),
        };
        Ok(value)
    }
}

// ===== helpers =====

fn child(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn out_of_range(path: &str, field: &CompiledField, value: &Value, ty: &'static str) -> CodecError {
    CodecError::OutOfRange {
        path: child(path, &field.name),
        value: value.to_string(),
        ty,
    }
}

fn check_wire_type(field: &CompiledField, found: WireType, path: &str) -> Result<(), CodecError> {
    if field.wire_type == found {
        Ok(())
    } else {
        Err(CodecError::WireTypeMismatch {
            path: child(path, &field.name),
            expected: field.wire_type as u8,
            found: found as u8,
        })
    }
}

// -- largest integer an f64 holds exactly
const F64_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn float_value(number: f64, path: &str, field: &CompiledField) -> Result<Value, CodecError> {
    if number.fract() == 0.0 && number.abs() <= F64_EXACT_INT {
        return Ok(Value::from(number as i64));
    }
    Number::from_f64(number)
        .map(Value::Number)
        .ok_or_else(|| CodecError::NonFiniteFloat {
            path: child(path, &field.name),
        })
}

fn append_repeated(decoded: &mut Map<String, Value>, name: &str, values: Vec<Value>) {
    if values.is_empty() {
        return;
    }
    match decoded.get_mut(name) {
        Some(Value::Array(items)) => items.extend(values),
        _ => {
            decoded.insert(name.to_string(), Value::Array(values));
        }
    }
}

fn take_string(envelope: &mut Map<String, Value>, name: &str) -> Result<String, CodecError> {
    match envelope.remove(name) {
        Some(Value::String(text)) => Ok(text),
        _ => Err(CodecError::MissingRequired { path: name.to_string() }),
    }
}
