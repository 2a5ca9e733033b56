// ai
//! 📦 Common data structures: the one struct every stage of kvault agrees on.
//!
//! 🎬 COLD OPEN: INT. DATA CENTER, 3:47 AM
//!
//! A scroll page lands. Ten documents tumble out, blinking in the fluorescent
//! light. Each one gets a name tag (`collection`), a department (`kind`), and
//! a backpack full of JSON (`body`). They do not know whether they are headed
//! for a gzip file or back into a cluster. Neither do we, until the config says so.
//!
//! 🦆
//!
//! `Record` is the unit of flow: created by the read side of the remote index
//! or by unpacking an archive envelope, mutated by transforms, consumed by
//! packing or by the write side.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 🎯 One document, its address, and its payload.
///
/// `collection` and `kind` are plain mutable fields on purpose: transforms are
/// allowed to reroute a record to a different index/type on its way through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// 📡 The logical index this record belongs to.
    pub collection: String,
    /// 🏷️ The logical type within the collection.
    pub kind: String,
    /// 📦 The document itself. Field name → JSON value, nesting allowed.
    pub body: Map<String, Value>,
}

impl Record {
    /// 🚀 Assemble a record from its three parts. No validation: a body without
    /// an `id` is perfectly fine until someone tries to write it to the cluster.
    pub fn new(collection: impl Into<String>, kind: impl Into<String>, body: Map<String, Value>) -> Self {
        Self {
            collection: collection.into(),
            kind: kind.into(),
            body,
        }
    }

    /// 🔑 The document id as text, if the body carries a usable one.
    ///
    /// Strings come back as-is, integers as their decimal form. Anything else
    /// (floats, objects, `null`) is not an id we are willing to send.
    pub fn id(&self) -> Option<String> {
        match self.body.get("id")? {
            Value::String(id) => Some(id.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body_of(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("💀 test fixture must be a JSON object"),
        }
    }

    #[test]
    fn the_one_where_string_and_integer_ids_both_get_a_name_tag() {
        let stringy = Record::new("c", "t", body_of(json!({"id": "abc"})));
        let numeric = Record::new("c", "t", body_of(json!({"id": 42})));
        assert_eq!(stringy.id(), Some("abc".to_string()));
        assert_eq!(numeric.id(), Some("42".to_string()));
    }

    #[test]
    fn the_one_where_floats_and_missing_ids_are_turned_away() {
        let floaty = Record::new("c", "t", body_of(json!({"id": 1.5})));
        let nameless = Record::new("c", "t", body_of(json!({"title": "who am i"})));
        assert_eq!(floaty.id(), None);
        assert_eq!(nameless.id(), None);
    }
}
