// ai
//! ✂️ Field surgery: removing what should not travel, renaming what must not collide.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::Transform;
use crate::common::Record;

/// ✂️ Removes a fixed set of top-level body fields. Missing ones are ignored.
#[derive(Debug, Clone)]
pub struct StripFields {
    fields: Vec<String>,
}

impl StripFields {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

#[async_trait]
impl Transform for StripFields {
    async fn transform(&mut self, mut record: Record) -> Result<Vec<Record>> {
        for field in &self.fields {
            // -- shift_remove keeps the remaining keys in their original order
            record.body.shift_remove(field);
        }
        Ok(vec![record])
    }
}

/// 🏷️ Rewrites `body.id` to `<prefix><id>`, so a reload does not trample the originals.
///
/// Integer ids become strings on the way (`7` → `"new_7"`). A record without
/// a usable id passes through untouched; the write side will have words with
/// it later if it needs one.
#[derive(Debug, Clone)]
pub struct PrefixId {
    prefix: String,
}

impl PrefixId {
    pub fn new(prefix: String) -> Self {
        Self { prefix }
    }
}

#[async_trait]
impl Transform for PrefixId {
    async fn transform(&mut self, mut record: Record) -> Result<Vec<Record>> {
        if let Some(id) = record.id() {
            record.body.insert("id".to_string(), Value::String(format!("{}{}", self.prefix, id)));
        }
        Ok(vec![record])
    }
}
