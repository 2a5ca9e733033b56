// ai
//! 📜 Schema descriptions: the message definitions an archive is written against.
//!
//! 🎬 *[a text file sits on disk. it was generated once, from a live cluster,
//! on a Tuesday. nobody has regenerated it since. the mapping has changed twice.]*
//!
//! A [`SchemaDescription`] is a flat list of proto2-style messages. It can be
//! rendered to the text artifact (`render`) and parsed back from it (`parse`).
//! The grammar is the small subset the generator emits, plus the bits people
//! tend to add by hand:
//!
//! ```text
//! syntax = "proto2";           // optional, ignored
//! // comments, anywhere
//! message Author {
//!     optional string name = 1;
//! }
//! message Post {
//!     optional string title = 1;
//!     repeated string tags = 2;
//!     optional Author author = 3;
//! }
//! ```
//!
//! Nested `message` blocks, `enum`, `oneof`, options and `bytes` are not part
//! of the subset. The parser says so instead of guessing. 🦆

use std::fmt;

use super::wire::{MAX_FIELD_NUMBER, WireType};

/// 💀 Everything that can go wrong while producing or reading a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("no mapping found for '{collection}/{kind}'")]
    MissingMapping { collection: String, kind: String },
    #[error("'{path}' has no properties to turn into a message")]
    EmptyProperties { path: String },
    #[error("field '{path}' has type '{remote_type}', which has no archive equivalent")]
    UnsupportedType { path: String, remote_type: String },
    #[error("schema text, line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("message '{message}' is defined twice")]
    DuplicateMessage { message: String },
    #[error("field '{message}.{field}' refers to unknown message '{target}'")]
    UnresolvedReference {
        message: String,
        field: String,
        target: String,
    },
    #[error("field '{path}' has a name the schema text cannot carry")]
    InvalidFieldName { path: String },
    #[error("the schema has no 'EntryPoint' message")]
    MissingEntryPoint,
    #[error("'EntryPoint' is not a usable envelope: {reason}")]
    InvalidEntryPoint { reason: String },
}

/// 🔢 Scalar types the codec knows how to put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
}

impl ScalarType {
    pub fn proto_name(self) -> &'static str {
        match self {
            ScalarType::Double => "double",
            ScalarType::Float => "float",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint32 => "uint32",
            ScalarType::Uint64 => "uint64",
            ScalarType::Sint32 => "sint32",
            ScalarType::Sint64 => "sint64",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Fixed64 => "fixed64",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Sfixed64 => "sfixed64",
            ScalarType::Bool => "bool",
            ScalarType::String => "string",
        }
    }

    pub fn from_proto_name(name: &str) -> Option<Self> {
        Some(match name {
            "double" => ScalarType::Double,
            "float" => ScalarType::Float,
            "int32" => ScalarType::Int32,
            "int64" => ScalarType::Int64,
            "uint32" => ScalarType::Uint32,
            "uint64" => ScalarType::Uint64,
            "sint32" => ScalarType::Sint32,
            "sint64" => ScalarType::Sint64,
            "fixed32" => ScalarType::Fixed32,
            "fixed64" => ScalarType::Fixed64,
            "sfixed32" => ScalarType::Sfixed32,
            "sfixed64" => ScalarType::Sfixed64,
            "bool" => ScalarType::Bool,
            "string" => ScalarType::String,
            _ => return None,
        })
    }

    pub(crate) fn wire_type(self) -> WireType {
        match self {
            ScalarType::Double | ScalarType::Fixed64 | ScalarType::Sfixed64 => WireType::Fixed64,
            ScalarType::Float | ScalarType::Fixed32 | ScalarType::Sfixed32 => WireType::Fixed32,
            ScalarType::String => WireType::LengthDelimited,
            _ => WireType::Varint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarType),
    /// 📎 Reference to another message in the same description, by name.
    Message(String),
}

impl FieldType {
    fn proto_name(&self) -> &str {
        match self {
            FieldType::Scalar(scalar) => scalar.proto_name(),
            FieldType::Message(name) => name,
        }
    }

    pub(crate) fn wire_type(&self) -> WireType {
        match self {
            FieldType::Scalar(scalar) => scalar.wire_type(),
            FieldType::Message(_) => WireType::LengthDelimited,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Optional,
    Repeated,
    Required,
}

impl Cardinality {
    fn label(self) -> &'static str {
        match self {
            Cardinality::Optional => "optional",
            Cardinality::Repeated => "repeated",
            Cardinality::Required => "required",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub cardinality: Cardinality,
    pub ty: FieldType,
    pub name: String,
    pub number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// 📜 An ordered set of message definitions. Order is preserved through
/// `render` and `parse`, which is what makes generated artifacts reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDescription {
    pub messages: Vec<MessageDef>,
}

impl SchemaDescription {
    pub fn message(&self, name: &str) -> Option<&MessageDef> {
        self.messages.iter().find(|m| m.name == name)
    }

    /// 🖨️ The text artifact: one block per message, one tab of indent per field,
    /// blocks joined by newlines, no trailing newline.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for message in &self.messages {
            lines.push(format!("message {} {{", message.name));
            for field in &message.fields {
                lines.push(format!(
                    "\t{} {} {} = {};",
                    field.cardinality.label(),
                    field.ty.proto_name(),
                    field.name,
                    field.number
                ));
            }
            lines.push("}".to_string());
        }
        lines.join("\n")
    }

    /// 📖 Parse schema text. Structural checks only (names, numbers,
    /// duplicates). Whether references resolve is the codec's business.
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        Parser::new(text)?.parse_file()
    }
}

impl fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// ===== Parser =====

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(u64),
    Quoted(String),
    Symbol(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "'{w}'"),
            Token::Number(n) => write!(f, "'{n}'"),
            Token::Quoted(q) => write!(f, "\"{q}\""),
            Token::Symbol(c) => write!(f, "'{c}'"),
        }
    }
}

fn parse_error(line: usize, reason: impl Into<String>) -> SchemaError {
    SchemaError::Parse {
        line,
        reason: reason.into(),
    }
}

// -- names come straight from the cluster mapping (`@timestamp`, `user-agent`, `título`),
// so a word is anything that is not whitespace, punctuation of the grammar, or a quote
fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '{' | '}' | '=' | ';' | '"')
}

/// ✅ Whether `name` survives `render` then `parse` unchanged, as a field or message name.
pub(crate) fn is_representable_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(is_word_char)
        && !name.contains("//")
        && !name.starts_with('.')
        && !name.chars().all(|c| c.is_ascii_digit())
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, SchemaError> {
    let mut tokens = Vec::new();
    for (line_idx, raw_line) in text.lines().enumerate() {
        let line = line_idx + 1;
        let code = match raw_line.find("//") {
            Some(at) => &raw_line[..at],
            None => raw_line,
        };
        let mut chars = code.char_indices().peekable();
        while let Some(&(start, c)) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else if matches!(c, '{' | '}' | '=' | ';') {
                tokens.push((line, Token::Symbol(c)));
                chars.next();
            } else if c == '"' {
                chars.next();
                let mut quoted = String::new();
                let mut closed = false;
                for (_, q) in chars.by_ref() {
                    if q == '"' {
                        closed = true;
                        break;
                    }
                    quoted.push(q);
                }
                if !closed {
                    return Err(parse_error(line, "unterminated string"));
                }
                tokens.push((line, Token::Quoted(quoted)));
            } else {
                let mut end = start;
                while let Some(&(i, w)) = chars.peek() {
                    if is_word_char(w) {
                        end = i + w.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let word = &code[start..end];
                if word.chars().all(|d| d.is_ascii_digit()) {
                    let number = word
                        .parse::<u64>()
                        .map_err(|_| parse_error(line, format!("number '{word}' is too large")))?;
                    tokens.push((line, Token::Number(number)));
                } else {
                    tokens.push((line, Token::Word(word.to_string())));
                }
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Result<Self, SchemaError> {
        Ok(Self {
            tokens: tokenize(text)?,
            pos: 0,
        })
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(line, _)| *line)
            .unwrap_or(1)
    }

    fn next(&mut self) -> Result<Token, SchemaError> {
        let line = self.line();
        let token = self
            .tokens
            .get(self.pos)
            .map(|(_, t)| t.clone())
            .ok_or_else(|| parse_error(line, "unexpected end of schema"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<(), SchemaError> {
        let line = self.line();
        match self.next()? {
            Token::Symbol(c) if c == symbol => Ok(()),
            other => Err(parse_error(line, format!("expected '{symbol}', found {other}"))),
        }
    }

    fn expect_word(&mut self, what: &str) -> Result<String, SchemaError> {
        let line = self.line();
        match self.next()? {
            Token::Word(word) => Ok(word),
            other => Err(parse_error(line, format!("expected {what}, found {other}"))),
        }
    }

    fn parse_file(mut self) -> Result<SchemaDescription, SchemaError> {
        let mut schema = SchemaDescription::default();
        while self.pos < self.tokens.len() {
            let line = self.line();
            match self.expect_word("'message'")?.as_str() {
                "syntax" => {
                    self.expect_symbol('=')?;
                    match self.next()? {
                        Token::Quoted(version) if version == "proto2" || version == "proto3" => {}
                        other => return Err(parse_error(line, format!("unknown syntax {other}"))),
                    }
                    self.expect_symbol(';')?;
                }
                "message" => {
                    let message = self.parse_message()?;
                    if schema.message(&message.name).is_some() {
                        return Err(SchemaError::DuplicateMessage {
                            message: message.name,
                        });
                    }
                    schema.messages.push(message);
                }
                other => {
                    return Err(parse_error(line, format!("expected 'message', found '{other}'")));
                }
            }
        }
        Ok(schema)
    }

    fn parse_message(&mut self) -> Result<MessageDef, SchemaError> {
        let name = self.expect_word("a message name")?;
        self.expect_symbol('{')?;
        let mut fields: Vec<FieldDef> = Vec::new();
        loop {
            let line = self.line();
            let first = match self.next()? {
                Token::Symbol('}') => break,
                Token::Word(word) => word,
                other => return Err(parse_error(line, format!("expected a field, found {other}"))),
            };
            // -- proto3 style fields have no label; treat them as optional
            let (cardinality, type_name) = match first.as_str() {
                "optional" => (Cardinality::Optional, self.expect_word("a field type")?),
                "repeated" => (Cardinality::Repeated, self.expect_word("a field type")?),
                "required" => (Cardinality::Required, self.expect_word("a field type")?),
                "message" | "enum" | "oneof" | "map" | "reserved" | "extensions" | "option" => {
                    return Err(parse_error(line, format!("'{first}' inside a message is not supported")));
                }
                _ => (Cardinality::Optional, first),
            };
            if type_name == "bytes" || type_name == "group" {
                return Err(parse_error(line, format!("field type '{type_name}' is not supported")));
            }
            let ty = match ScalarType::from_proto_name(&type_name) {
                Some(scalar) => FieldType::Scalar(scalar),
                None => FieldType::Message(type_name.trim_start_matches('.').to_string()),
            };
            let field_name = self.expect_word("a field name")?;
            self.expect_symbol('=')?;
            let number = match self.next()? {
                Token::Number(n) if (1..=u64::from(MAX_FIELD_NUMBER)).contains(&n) => n as u32,
                other => {
                    return Err(parse_error(line, format!("field '{field_name}' has invalid number {other}")));
                }
            };
            self.expect_symbol(';')?;
            if fields.iter().any(|f| f.name == field_name) {
                return Err(parse_error(line, format!("field '{field_name}' is declared twice in '{name}'")));
            }
            if fields.iter().any(|f| f.number == number) {
                return Err(parse_error(line, format!("field number {number} is used twice in '{name}'")));
            }
            fields.push(FieldDef {
                cardinality,
                ty,
                name: field_name,
                number,
            });
        }
        Ok(MessageDef { name, fields })
    }
}
