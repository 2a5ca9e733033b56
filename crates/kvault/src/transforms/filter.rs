// ai
//! 🚫 Stages that decide who gets in.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

use super::Transform;
use crate::common::Record;

/// 🚫 Drops records whose top-level `field` equals `equals` exactly.
///
/// JSON equality, so `"1"` and `1` are different people. A record that lacks
/// the field is kept.
#[derive(Debug, Clone)]
pub struct Skip {
    field: String,
    equals: Value,
}

impl Skip {
    pub fn new(field: String, equals: Value) -> Self {
        Self { field, equals }
    }
}

#[async_trait]
impl Transform for Skip {
    async fn transform(&mut self, record: Record) -> Result<Vec<Record>> {
        if record.body.get(&self.field) == Some(&self.equals) {
            trace!("🚫 skipping {:?}: {} = {}", record.id(), self.field, self.equals);
            return Ok(Vec::new());
        }
        Ok(vec![record])
    }
}

/// 🧱 Drops every record. The pipeline still reads everything; nothing gets written.
#[derive(Debug, Clone, Copy, Default)]
pub struct Breaker;

#[async_trait]
impl Transform for Breaker {
    async fn transform(&mut self, _record: Record) -> Result<Vec<Record>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(body) => Record::new("c", "k", body),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn the_one_where_test_accounts_stay_out_of_staging() {
        let mut skip = Skip::new("creator".into(), json!("test"));
        assert!(skip.transform(record(json!({"creator": "test"}))).await.unwrap().is_empty());
        assert_eq!(skip.transform(record(json!({"creator": "ana"}))).await.unwrap().len(), 1);
        assert_eq!(skip.transform(record(json!({"title": "no creator"}))).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn the_one_where_types_matter_for_equality() {
        let mut skip = Skip::new("n".into(), json!(1));
        assert_eq!(skip.transform(record(json!({"n": "1"}))).await.unwrap().len(), 1);
        assert!(skip.transform(record(json!({"n": 1}))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn the_one_where_the_breaker_breaks() {
        assert!(Breaker.transform(record(json!({"id": 1}))).await.unwrap().is_empty());
    }
}
