//! # Previously, on kvault...
//!
//! 🎬 The cluster was down. Or it was never up. Or it was up, but on somebody
//! else's laptop, in a docker-compose file nobody could find. The tests had to
//! run anyway.
//!
//! `InMemoryIndex` is a [`RemoteIndex`] that lives in a `Vec`. It pages the
//! way a real scroll does, counts every request it receives, and remembers
//! every document it was asked to create. That makes it the witness stand for
//! the properties that matter: how many pages were fetched, whether creates
//! overlapped, whether the scroll context was released.
//!
//! 🦆
//!
//! ⚠️ This is NOT for production. It is behind `#[cfg(test)]` for a reason.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::backends::{RemoteIndex, SearchPage, SearchQuery};
use crate::common::Record;

/// 📦 `{"id": "doc-<n>", "n": n}` for n in 0..count. The world's most boring corpus.
pub(crate) fn numbered_docs(count: usize) -> Vec<Map<String, Value>> {
    (0..count)
        .map(|n| match json!({"id": format!("doc-{n}"), "n": n}) {
            Value::Object(map) => map,
            _ => unreachable!("json! of an object literal is an object"),
        })
        .collect()
}

#[derive(Debug, Default)]
struct Ledger {
    position: usize,
    page_size: usize,
    page_requests: usize,
    scrolls_served: usize,
    cleared_scrolls: usize,
    mapping_requests: Vec<(String, String)>,
    created: Vec<Record>,
    in_flight_creates: usize,
    max_in_flight_creates: usize,
}

#[derive(Debug, Default)]
pub(crate) struct InMemoryIndex {
    docs: Vec<Map<String, Value>>,
    default_page_size: usize,
    advertised_total: Option<u64>,
    fail_scroll_after: Option<usize>,
    rejected_id: Option<String>,
    mapping: Value,
    ledger: Mutex<Ledger>,
}

impl InMemoryIndex {
    pub(crate) fn with_docs(docs: Vec<Map<String, Value>>, page_size: usize) -> Self {
        Self {
            docs,
            default_page_size: page_size.max(1),
            ..Self::default()
        }
    }

    pub(crate) fn with_mapping(mapping: Value) -> Self {
        Self {
            mapping,
            ..Self::default()
        }
    }

    /// 🤥 Claim a different `hits.total` than the docs we actually have.
    pub(crate) fn advertising(mut self, total: u64) -> Self {
        self.advertised_total = Some(total);
        self
    }

    /// 💥 Serve `count` scroll continuations, then fail every one after.
    pub(crate) fn failing_scroll_after(mut self, count: usize) -> Self {
        self.fail_scroll_after = Some(count);
        self
    }

    /// 🚫 Refuse to create the document with this id.
    pub(crate) fn rejecting_id(mut self, id: &str) -> Self {
        self.rejected_id = Some(id.to_string());
        self
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn page_requests(&self) -> usize {
        self.ledger().page_requests
    }

    pub(crate) fn cleared_scrolls(&self) -> usize {
        self.ledger().cleared_scrolls
    }

    pub(crate) fn mapping_requests(&self) -> Vec<(String, String)> {
        self.ledger().mapping_requests.clone()
    }

    pub(crate) fn created(&self) -> Vec<Record> {
        self.ledger().created.clone()
    }

    pub(crate) fn created_ids(&self) -> Vec<String> {
        self.ledger().created.iter().filter_map(Record::id).collect()
    }

    pub(crate) fn max_in_flight_creates(&self) -> usize {
        self.ledger().max_in_flight_creates
    }

    fn next_slice(&self, ledger: &mut Ledger) -> SearchPage {
        let start = ledger.position.min(self.docs.len());
        let end = (start + ledger.page_size).min(self.docs.len());
        ledger.position = end;
        SearchPage {
            scroll_id: Some("scroll-1".to_string()),
            total: self.advertised_total.unwrap_or(self.docs.len() as u64),
            hits: self.docs[start..end].to_vec(),
        }
    }
}

#[async_trait]
impl RemoteIndex for InMemoryIndex {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
        let mut ledger = self.ledger();
        ledger.page_requests += 1;
        ledger.position = 0;
        ledger.page_size = query
            .page_size
            .map(|size| size as usize)
            .unwrap_or(self.default_page_size)
            .max(1);
        Ok(self.next_slice(&mut ledger))
    }

    async fn scroll(&self, scroll_id: &str, _keep_alive: &str) -> Result<SearchPage> {
        let mut ledger = self.ledger();
        ledger.page_requests += 1;
        if scroll_id != "scroll-1" {
            anyhow::bail!("unknown scroll id '{scroll_id}'");
        }
        if self.fail_scroll_after.is_some_and(|limit| ledger.scrolls_served >= limit) {
            anyhow::bail!("search_context_missing_exception");
        }
        ledger.scrolls_served += 1;
        Ok(self.next_slice(&mut ledger))
    }

    async fn clear_scroll(&self, _scroll_id: &str) -> Result<()> {
        self.ledger().cleared_scrolls += 1;
        Ok(())
    }

    async fn create(&self, collection: &str, kind: &str, id: &str, body: &Map<String, Value>) -> Result<()> {
        {
            let mut ledger = self.ledger();
            ledger.in_flight_creates += 1;
            ledger.max_in_flight_creates = ledger.max_in_flight_creates.max(ledger.in_flight_creates);
        }
        // -- give any overlapping create a chance to show up in the ledger
        tokio::task::yield_now().await;
        let mut ledger = self.ledger();
        ledger.in_flight_creates -= 1;
        if self.rejected_id.as_deref() == Some(id) {
            anyhow::bail!("version_conflict_engine_exception for '{id}'");
        }
        ledger.created.push(Record::new(collection, kind, body.clone()));
        Ok(())
    }

    async fn get_mapping(&self, collection: &str, kind: &str) -> Result<Value> {
        self.ledger()
            .mapping_requests
            .push((collection.to_string(), kind.to_string()));
        Ok(self.mapping.clone())
    }
}
