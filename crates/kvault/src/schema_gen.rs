// ai
//! 🧬 Schema generation: turn a live index mapping into archive message definitions.
//!
//! 🎬 *[an engineer runs `GET /blog/_mapping/post`. forty lines of JSON scroll by.]*
//! *[they squint. they sigh. they open a text editor.]*
//! *[they close the text editor. they run `kvault-cli schema` instead.]*
//!
//! The walk is depth-first over `properties`. Every object field becomes its
//! own message, emitted before the message that uses it, and the top-level
//! message is followed by the `EntryPoint` envelope. The output is stable:
//! same mapping in, byte-identical text out, so a schema file can live in git
//! next to the archives it describes. 🦆
//!
//! ## Cardinality, or: the plural heuristic
//!
//! Mappings don't say whether a field holds one value or many. We guess:
//! `nested` fields are repeated, and so is any field whose name ends in `s`.
//! It is a heuristic. It is wrong for `status`, `address` and `gas`. So it can
//! be switched off, and individual dotted paths can be forced either way from
//! the `[schema]` config section.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::backends::RemoteIndex;
use crate::codec::ENTRY_POINT;
use crate::codec::schema::{
    Cardinality, FieldDef, FieldType, MessageDef, ScalarType, SchemaDescription, SchemaError, is_representable_name,
};

/// 🔧 How repeated-vs-optional is decided for each generated field.
///
/// Paths are dotted from the top-level message: `tags`, `author.aliases`.
/// Explicit `repeated` / `optional` entries beat everything else.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CardinalityRule {
    pub plural_heuristic: bool,
    pub repeated: Vec<String>,
    pub optional: Vec<String>,
}

impl Default for CardinalityRule {
    fn default() -> Self {
        Self {
            plural_heuristic: true,
            repeated: Vec::new(),
            optional: Vec::new(),
        }
    }
}

impl CardinalityRule {
    pub fn cardinality(&self, path: &str, field_name: &str, nested: bool) -> Cardinality {
        if self.repeated.iter().any(|p| p == path) {
            Cardinality::Repeated
        } else if self.optional.iter().any(|p| p == path) {
            Cardinality::Optional
        } else if nested || (self.plural_heuristic && field_name.ends_with('s')) {
            Cardinality::Repeated
        } else {
            Cardinality::Optional
        }
    }
}

/// 📡 Fetch the mapping for `collection/kind` and render the schema text.
pub(crate) async fn generate(
    client: &dyn RemoteIndex,
    collection: &str,
    kind: &str,
    rule: &CardinalityRule,
) -> Result<String> {
    let mapping = client
        .get_mapping(collection, kind)
        .await
        .with_context(|| format!("💀 Could not fetch the mapping for '{collection}/{kind}'. The cluster kept its secrets."))?;
    let schema = describe(&mapping, collection, kind, rule)
        .with_context(|| format!("💀 The mapping for '{collection}/{kind}' does not translate into a schema."))?;
    debug!("🧬 generated {} messages for '{collection}/{kind}'", schema.messages.len());
    Ok(schema.render())
}

/// 🧬 Build the description from a mapping response. Pure, no I/O.
pub fn describe(
    mapping: &Value,
    collection: &str,
    kind: &str,
    rule: &CardinalityRule,
) -> Result<SchemaDescription, SchemaError> {
    let properties = top_level_properties(mapping, collection, kind)?;
    let mut generator = Generator {
        rule,
        messages: Vec::new(),
    };
    if !is_representable_name(&message_name(kind)) {
        return Err(SchemaError::InvalidFieldName { path: kind.to_string() });
    }
    let top = generator.build(message_name(kind), None, properties, "")?;
    generator.messages.push(MessageDef {
        name: ENTRY_POINT.to_string(),
        fields: vec![
            envelope_field("index", FieldType::Scalar(ScalarType::String), 1),
            envelope_field("type", FieldType::Scalar(ScalarType::String), 2),
            envelope_field("source", FieldType::Message(top), 3),
        ],
    });
    Ok(SchemaDescription {
        messages: generator.messages,
    })
}

fn envelope_field(name: &str, ty: FieldType, number: u32) -> FieldDef {
    FieldDef {
        cardinality: Cardinality::Required,
        ty,
        name: name.to_string(),
        number,
    }
}

/// 🔍 Find `properties` in either the typed or the typeless response layout.
fn top_level_properties<'a>(mapping: &'a Value, collection: &str, kind: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    let missing = || SchemaError::MissingMapping {
        collection: collection.to_string(),
        kind: kind.to_string(),
    };
    // -- an alias comes back keyed by the concrete index name, so a lone key is good enough
    let per_index = match mapping.get(collection) {
        Some(found) => found,
        None => match mapping.as_object() {
            Some(indices) if indices.len() == 1 => indices.values().next().ok_or_else(missing)?,
            _ => return Err(missing()),
        },
    };
    let mappings = per_index.get("mappings").ok_or_else(missing)?;
    let properties = mappings
        .get(kind)
        .and_then(|typed| typed.get("properties"))
        .or_else(|| mappings.get("properties"))
        .and_then(Value::as_object)
        .ok_or_else(missing)?;
    Ok(properties)
}

fn message_name(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn scalar_for(remote_type: &str) -> Option<ScalarType> {
    match remote_type {
        "string" | "text" | "keyword" | "date" | "geo_point" => Some(ScalarType::String),
        "long" | "integer" | "short" | "byte" => Some(ScalarType::Sint64),
        "boolean" => Some(ScalarType::Bool),
        "double" | "float" | "half_float" | "scaled_float" => Some(ScalarType::Double),
        _ => None,
    }
}

struct Generator<'r> {
    rule: &'r CardinalityRule,
    messages: Vec<MessageDef>,
}

impl Generator<'_> {
    /// Builds one message (children first) and returns the name it was registered under.
    fn build(
        &mut self,
        name: String,
        parent: Option<&str>,
        properties: &Map<String, Value>,
        path: &str,
    ) -> Result<String, SchemaError> {
        if properties.is_empty() {
            return Err(SchemaError::EmptyProperties {
                path: if path.is_empty() { name } else { path.to_string() },
            });
        }

        let mut fields = Vec::with_capacity(properties.len());
        for (position, (field_name, spec)) in properties.iter().enumerate() {
            let field_path = if path.is_empty() {
                field_name.clone()
            } else {
                format!("{path}.{field_name}")
            };
            if !is_representable_name(field_name) || !is_representable_name(&message_name(field_name)) {
                return Err(SchemaError::InvalidFieldName { path: field_path });
            }
            let remote_type = spec.get("type").and_then(Value::as_str);
            let nested = remote_type == Some("nested");
            let is_object = spec.get("properties").is_some() || matches!(remote_type, Some("object") | Some("nested"));

            let ty = if is_object {
                let children = spec
                    .get("properties")
                    .and_then(Value::as_object)
                    .ok_or_else(|| SchemaError::EmptyProperties {
                        path: field_path.clone(),
                    })?;
                FieldType::Message(self.build(message_name(field_name), Some(&name), children, &field_path)?)
            } else {
                let remote_type = remote_type.unwrap_or("<none>");
                FieldType::Scalar(scalar_for(remote_type).ok_or_else(|| SchemaError::UnsupportedType {
                    path: field_path.clone(),
                    remote_type: remote_type.to_string(),
                })?)
            };

            fields.push(FieldDef {
                cardinality: self.rule.cardinality(&field_path, field_name, nested),
                ty,
                name: field_name.clone(),
                number: position as u32 + 1,
            });
        }
        Ok(self.register(name, parent, fields))
    }

    /// 📛 Same name, same fields: share it. Same name, different fields: qualify with the parent.
    fn register(&mut self, name: String, parent: Option<&str>, fields: Vec<FieldDef>) -> String {
        let mut candidate = name.clone();
        let mut attempt = 1u32;
        loop {
            match self.messages.iter().find(|m| m.name == candidate) {
                Some(existing) if existing.fields == fields => return candidate,
                None if candidate != ENTRY_POINT => {
                    self.messages.push(MessageDef {
                        name: candidate.clone(),
                        fields,
                    });
                    return candidate;
                }
                _ => {
                    attempt += 1;
                    candidate = match (parent, attempt) {
                        (Some(parent), 2) => format!("{parent}{name}"),
                        (Some(parent), n) => format!("{parent}{name}{n}"),
                        (None, n) => format!("{name}{n}"),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::in_mem::InMemoryIndex;
    use crate::codec::RecordCodec;
    use serde_json::json;

    fn blog_mapping() -> Value {
        json!({
            "blog": {"mappings": {"post": {"properties": {
                "title": {"type": "string"},
                "tags": {"type": "keyword"},
                "views": {"type": "long"},
                "author": {"properties": {
                    "name": {"type": "text"},
                    "verified": {"type": "boolean"}
                }},
                "comments": {"type": "nested", "properties": {
                    "body": {"type": "text"},
                    "score": {"type": "float"}
                }},
                "published_at": {"type": "date"}
            }}}}
        })
    }

    #[test]
    fn the_one_where_the_blog_mapping_becomes_exactly_this_text() {
        let schema = describe(&blog_mapping(), "blog", "post", &CardinalityRule::default()).unwrap();
        let expected = [
            "message Author {",
            "\toptional string name = 1;",
            "\toptional bool verified = 2;",
            "}",
            "message Comments {",
            "\toptional string body = 1;",
            "\toptional double score = 2;",
            "}",
            "message Post {",
            "\toptional string title = 1;",
            "\trepeated string tags = 2;",
            "\trepeated sint64 views = 3;",
            "\toptional Author author = 4;",
            "\trepeated Comments comments = 5;",
            "\toptional string published_at = 6;",
            "}",
            "message EntryPoint {",
            "\trequired string index = 1;",
            "\trequired string type = 2;",
            "\trequired Post source = 3;",
            "}",
        ]
        .join("\n");
        assert_eq!(schema.render(), expected);
    }

    #[test]
    fn the_one_where_the_same_mapping_twice_gives_the_same_bytes_twice() {
        let rule = CardinalityRule::default();
        let once = describe(&blog_mapping(), "blog", "post", &rule).unwrap().render();
        let twice = describe(&blog_mapping(), "blog", "post", &rule).unwrap().render();
        assert_eq!(once, twice);
    }

    #[test]
    fn the_one_where_views_is_rescued_from_the_plural_heuristic() {
        let rule = CardinalityRule {
            plural_heuristic: true,
            repeated: vec!["author.name".to_string()],
            optional: vec!["views".to_string()],
        };
        let schema = describe(&blog_mapping(), "blog", "post", &rule).unwrap();
        let post = schema.message("Post").unwrap();
        assert_eq!(post.fields[2].cardinality, Cardinality::Optional);
        let author = schema.message("Author").unwrap();
        assert_eq!(author.fields[0].cardinality, Cardinality::Repeated);
    }

    #[test]
    fn the_one_where_the_heuristic_can_be_switched_off_but_nested_still_counts() {
        let rule = CardinalityRule {
            plural_heuristic: false,
            ..CardinalityRule::default()
        };
        let schema = describe(&blog_mapping(), "blog", "post", &rule).unwrap();
        let post = schema.message("Post").unwrap();
        assert_eq!(post.fields[1].cardinality, Cardinality::Optional);
        assert_eq!(post.fields[4].cardinality, Cardinality::Repeated);
    }

    #[test]
    fn the_one_where_typeless_mappings_work_too() {
        let mapping = json!({"blog": {"mappings": {"properties": {"title": {"type": "text"}}}}});
        let schema = describe(&mapping, "blog", "_doc", &CardinalityRule::default()).unwrap();
        assert!(schema.message("_doc").is_some());
        assert_eq!(schema.message(ENTRY_POINT).unwrap().fields[2].ty, FieldType::Message("_doc".to_string()));
    }

    #[test]
    fn the_one_where_two_different_addresses_stop_fighting_over_a_name() {
        let mapping = json!({"crm": {"mappings": {"person": {"properties": {
            "home": {"properties": {"address": {"properties": {"street": {"type": "text"}}}}},
            "work": {"properties": {"address": {"properties": {"company": {"type": "text"}}}}},
            "other": {"properties": {"address": {"properties": {"street": {"type": "text"}}}}}
        }}}}});
        let rule = CardinalityRule {
            plural_heuristic: false,
            ..CardinalityRule::default()
        };
        let schema = describe(&mapping, "crm", "person", &rule).unwrap();
        let names: Vec<&str> = schema.messages.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Address", "Home", "WorkAddress", "Work", "Other", "Person", "EntryPoint"]);
        // -- identical shapes share one definition
        assert_eq!(schema.message("Other").unwrap().fields[0].ty, FieldType::Message("Address".to_string()));
    }

    #[test]
    fn the_one_where_a_field_called_entry_point_does_not_hijack_the_envelope() {
        let mapping = json!({"c": {"mappings": {"k": {"properties": {
            "entryPoint": {"properties": {"x": {"type": "long"}}}
        }}}}});
        let schema = describe(&mapping, "c", "k", &CardinalityRule::default()).unwrap();
        assert!(schema.message("KEntryPoint").is_some());
        RecordCodec::from_description(&schema).expect("💀 the envelope should still be the real one");
    }

    #[test]
    fn the_one_where_ip_addresses_are_a_bridge_too_far() {
        let mapping = json!({"c": {"mappings": {"k": {"properties": {"origin": {"type": "ip"}}}}}});
        assert_eq!(
            describe(&mapping, "c", "k", &CardinalityRule::default()),
            Err(SchemaError::UnsupportedType {
                path: "origin".to_string(),
                remote_type: "ip".to_string()
            })
        );
    }

    #[test]
    fn the_one_where_nothing_to_describe_is_an_error_not_an_empty_file() {
        let empty = json!({"c": {"mappings": {"k": {"properties": {}}}}});
        assert!(matches!(
            describe(&empty, "c", "k", &CardinalityRule::default()),
            Err(SchemaError::EmptyProperties { .. })
        ));
        assert!(matches!(
            describe(&json!({}), "c", "k", &CardinalityRule::default()),
            Err(SchemaError::MissingMapping { .. })
        ));
    }

    #[test]
    fn the_one_where_the_generated_schema_is_one_the_codec_accepts() {
        let schema = describe(&blog_mapping(), "blog", "post", &CardinalityRule::default()).unwrap();
        let text = schema.render();
        let codec = RecordCodec::load(&text).unwrap();
        assert_eq!(codec.source_message(), "Post");
    }

    #[test]
    fn the_one_where_at_timestamp_survives_generate_render_load() {
        let mapping = json!({"logs": {"mappings": {"event": {"properties": {
            "@timestamp": {"type": "date"},
            "user-agent": {"type": "keyword"},
            "título": {"type": "text"}
        }}}}});
        let rule = CardinalityRule {
            plural_heuristic: false,
            ..CardinalityRule::default()
        };
        let text = describe(&mapping, "logs", "event", &rule).unwrap().render();
        assert!(text.contains("\toptional string @timestamp = 1;"), "{text}");

        let codec = RecordCodec::load(&text).expect("💀 a logstash mapping should load back");
        let record = match json!({"@timestamp": "2024-01-01T00:00:00Z", "user-agent": "curl/8.0", "título": "hola"}) {
            Value::Object(body) => crate::common::Record::new("logs", "event", body),
            _ => unreachable!(),
        };
        let bytes = codec.pack(&record).unwrap();
        assert_eq!(codec.unpack(&bytes).unwrap(), record);
    }

    #[test]
    fn the_one_where_a_name_with_a_space_in_it_is_refused_up_front() {
        let mapping = json!({"c": {"mappings": {"k": {"properties": {
            "ok": {"properties": {"two words": {"type": "text"}}}
        }}}}});
        assert_eq!(
            describe(&mapping, "c", "k", &CardinalityRule::default()),
            Err(SchemaError::InvalidFieldName {
                path: "ok.two words".to_string()
            })
        );

        let equals = json!({"c": {"mappings": {"k": {"properties": {"a=b": {"type": "long"}}}}}});
        assert!(matches!(
            describe(&equals, "c", "k", &CardinalityRule::default()),
            Err(SchemaError::InvalidFieldName { .. })
        ));
    }

    #[tokio::test]
    async fn the_one_where_generate_asks_the_cluster_and_renders_the_answer() {
        let index = InMemoryIndex::with_mapping(blog_mapping());
        let text = generate(&index, "blog", "post", &CardinalityRule::default()).await.unwrap();
        assert!(text.ends_with("\trequired Post source = 3;\n}"));
        assert_eq!(index.mapping_requests(), vec![("blog".to_string(), "post".to_string())]);
    }
}
