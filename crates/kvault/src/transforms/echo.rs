// ai
//! 📣 Stages that talk about the records going past without touching them.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::Transform;
use crate::common::Record;

/// 📣 Logs each record at info level, then hands it on unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

#[async_trait]
impl Transform for Echo {
    async fn transform(&mut self, record: Record) -> Result<Vec<Record>> {
        info!(
            collection = %record.collection,
            kind = %record.kind,
            body = %serde_json::Value::Object(record.body.clone()),
            "📣 record"
        );
        Ok(vec![record])
    }
}

/// 🔢 Counts records and logs the running total every `every` records.
#[derive(Debug, Clone)]
pub struct Count {
    every: u64,
    seen: u64,
}

impl Count {
    /// `every` of 0 is treated as 1, since "log every zeroth record" is not a thing.
    pub fn new(every: u64) -> Self {
        Self { every: every.max(1), seen: 0 }
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }
}

#[async_trait]
impl Transform for Count {
    async fn transform(&mut self, record: Record) -> Result<Vec<Record>> {
        self.seen += 1;
        if self.seen % self.every == 0 {
            info!("🔢 {} records so far", self.seen);
        }
        Ok(vec![record])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[tokio::test]
    async fn the_one_where_the_counter_counts_and_the_records_keep_moving() {
        let mut count = Count::new(0);
        for _ in 0..4 {
            let out = count.transform(Record::new("c", "k", Map::new())).await.unwrap();
            assert_eq!(out.len(), 1);
        }
        assert_eq!(count.seen(), 4);
        assert_eq!(Echo.transform(Record::new("c", "k", Map::new())).await.unwrap().len(), 1);
    }
}
