// ai
//! 🔁 The remote index as a pipeline endpoint: a scroll cursor on the way out,
//! one acknowledged `_create` per record on the way in.
//!
//! 🎬 *[the scroll cursor wakes. it has one job. it remembers how far it got.]*
//! *[it does not trust the cluster to tell it when to stop.]*
//!
//! ## The read side is a three-state machine
//!
//! ```text
//!   Idle ──search──▶ Scanning{scroll_id, yielded, total} ──scroll──▶ … ──▶ Done
//!     │                        │
//!     └──── any error ─────────┴──────────────────────────────────────────▶ Done
//! ```
//!
//! - `total` is whatever the first page advertised. It is not refreshed.
//! - The page that brings `yielded` up to `total` is the last one, even if it
//!   is full. No extra round trip to find out the next page is empty.
//! - An empty page before `total` is reached is an error. The cluster
//!   promised more than it delivered and looping would only ask again.
//! - Leaving `Scanning` for any reason releases the scroll context, best effort.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, trace, warn};

use super::ElasticsearchConfig;
use super::client::{RemoteIndex, SearchPage, SearchQuery};
use crate::backends::{Sink, Source};
use crate::common::Record;
use crate::progress::{ProgressMetrics, ProgressUnit};

/// 📐 Everything the duplex needs to know, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DuplexConfig {
    pub collection: String,
    pub kind: String,
    pub page_size: Option<u64>,
    pub keep_alive: String,
}

impl From<&ElasticsearchConfig> for DuplexConfig {
    fn from(config: &ElasticsearchConfig) -> Self {
        Self {
            collection: config.collection.clone(),
            kind: config.kind.clone(),
            page_size: config.page_size,
            keep_alive: config.scroll_keep_alive.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cursor {
    scroll_id: String,
    yielded: u64,
    total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScanState {
    Idle,
    Scanning(Cursor),
    Done,
}

/// 🔁 Reads a collection page by page, or writes records one acknowledged create at a time.
///
/// One instance serves one direction per run, and never has more than one
/// request in flight: `&mut self` on both traits sees to that.
pub(crate) struct RemoteIndexDuplex {
    client: Arc<dyn RemoteIndex>,
    config: DuplexConfig,
    state: ScanState,
    written: u64,
    progress: Option<ProgressMetrics>,
}

// 🎭 manual Debug because ProgressMetrics has a ProgressBar inside it, and the client is a trait object
impl std::fmt::Debug for RemoteIndexDuplex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteIndexDuplex")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("written", &self.written)
            .finish()
    }
}

impl RemoteIndexDuplex {
    pub(crate) fn new(client: Arc<dyn RemoteIndex>, config: DuplexConfig) -> Self {
        Self {
            client,
            config,
            state: ScanState::Idle,
            written: 0,
            progress: None,
        }
    }

    /// 📊 Attach a progress display. `label` is what the bar says it is doing.
    pub(crate) fn with_progress(mut self, label: String, unit: ProgressUnit, total: u64) -> Self {
        self.progress = Some(ProgressMetrics::new(label, total, unit));
        self
    }

    fn query(&self) -> SearchQuery {
        SearchQuery {
            collection: self.config.collection.clone(),
            kind: self.config.kind.clone(),
            page_size: self.config.page_size,
            keep_alive: self.config.keep_alive.clone(),
        }
    }

    fn records_from(&self, page: SearchPage) -> Vec<Record> {
        page.hits
            .into_iter()
            .map(|body| Record::new(self.config.collection.clone(), self.config.kind.clone(), body))
            .collect()
    }

    /// 🧹 Best effort. A scroll context that outlives us costs the cluster a
    /// little heap until `keep_alive` runs out. Not worth failing a finished run over.
    async fn release(&self, scroll_id: &str) {
        match self.client.clear_scroll(scroll_id).await {
            Ok(()) => trace!("🧹 scroll context released"),
            Err(err) => warn!("⚠️ could not release scroll context, it will expire on its own: {err:#}"),
        }
    }

    fn finish_progress(&self) {
        if let Some(progress) = &self.progress {
            progress.finish();
        }
    }
}

#[async_trait]
impl Source for RemoteIndexDuplex {
    async fn next_page(&mut self) -> Result<Option<Vec<Record>>> {
        // -- whatever happens below, an early return leaves us Done
        let state = std::mem::replace(&mut self.state, ScanState::Done);
        let (page, yielded_before, total, previous_id) = match state {
            ScanState::Done => return Ok(None),
            ScanState::Idle => {
                let page = self.client.search(&self.query()).await.with_context(|| {
                    format!(
                        "💀 The opening search on '{}/{}' went nowhere. No cursor, no documents, no dice.",
                        self.config.collection, self.config.kind
                    )
                })?;
                let total = page.total;
                info!("📡 scan of '{}/{}' opened: {} documents advertised", self.config.collection, self.config.kind, total);
                if let Some(progress) = &mut self.progress {
                    progress.set_total(total);
                }
                (page, 0, total, None)
            }
            ScanState::Scanning(cursor) => {
                let page = match self.client.scroll(&cursor.scroll_id, &self.config.keep_alive).await {
                    Ok(page) => page,
                    Err(err) => {
                        self.release(&cursor.scroll_id).await;
                        return Err(err.context(format!(
                            "💀 The scroll died after {} of {} documents. The cursor is gone and so is our place in line.",
                            cursor.yielded, cursor.total
                        )));
                    }
                };
                (page, cursor.yielded, cursor.total, Some(cursor.scroll_id))
            }
        };

        let count = page.hits.len() as u64;
        let yielded = yielded_before + count;
        let scroll_id = page.scroll_id.clone().or(previous_id);
        debug!("📄 page of {count} hits, {yielded}/{total} so far");
        let records = self.records_from(page);
        if let Some(progress) = &mut self.progress {
            progress.update(0, count);
        }

        if yielded >= total {
            if let Some(id) = scroll_id {
                self.release(&id).await;
            }
            self.finish_progress();
            info!("🏁 scan of '{}/{}' complete: {yielded} documents", self.config.collection, self.config.kind);
            return Ok(if records.is_empty() { None } else { Some(records) });
        }

        if records.is_empty() {
            if let Some(id) = scroll_id {
                self.release(&id).await;
            }
            anyhow::bail!(
                "💀 The cluster ran dry at {yielded} of {total} advertised documents. Someone is deleting while we read, or the count was a lie."
            );
        }

        let Some(scroll_id) = scroll_id else {
            anyhow::bail!("💀 A page arrived without a scroll id. We know where we are but not how to get to the next page.");
        };
        self.state = ScanState::Scanning(Cursor {
            scroll_id,
            yielded,
            total,
        });
        Ok(Some(records))
    }
}

#[async_trait]
impl Sink for RemoteIndexDuplex {
    async fn send(&mut self, record: Record) -> Result<()> {
        let id = record.id().with_context(|| {
            format!(
                "💀 A record bound for '{}/{}' has no usable 'id'. We need a string or an integer to create it with.",
                record.collection, record.kind
            )
        })?;
        self.client
            .create(&record.collection, &record.kind, &id, &record.body)
            .await
            .with_context(|| format!("💀 Creating '{}/{}/{}' failed. Nothing after it was sent.", record.collection, record.kind, id))?;
        self.written += 1;
        trace!("✅ '{id}' acknowledged ({} written)", self.written);
        if let Some(progress) = &mut self.progress {
            progress.update(0, 1);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.finish_progress();
        info!("🏁 {} documents created in the cluster", self.written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::in_mem::{InMemoryIndex, numbered_docs};
    use serde_json::json;

    fn duplex(index: &Arc<InMemoryIndex>) -> RemoteIndexDuplex {
        RemoteIndexDuplex::new(
            index.clone(),
            DuplexConfig {
                collection: "blog".to_string(),
                kind: "post".to_string(),
                page_size: None,
                keep_alive: "30m".to_string(),
            },
        )
    }

    async fn drain(source: &mut RemoteIndexDuplex) -> Result<Vec<Record>> {
        let mut all = Vec::new();
        while let Some(page) = source.next_page().await? {
            assert!(!page.is_empty(), "💀 Some pages must never be empty");
            all.extend(page);
        }
        Ok(all)
    }

    async fn scan(n: usize, p: usize) -> (Vec<Record>, Arc<InMemoryIndex>) {
        let index = Arc::new(InMemoryIndex::with_docs(numbered_docs(n), p));
        let mut source = duplex(&index);
        let records = drain(&mut source).await.unwrap();
        // -- and it stays done
        assert!(source.next_page().await.unwrap().is_none());
        (records, index)
    }

    fn ids(records: &[Record]) -> Vec<u64> {
        records.iter().map(|r| r.body["n"].as_u64().unwrap()).collect()
    }

    #[tokio::test]
    async fn the_one_where_an_empty_index_ends_after_one_request() {
        let (records, index) = scan(0, 10).await;
        assert!(records.is_empty());
        assert_eq!(index.page_requests(), 1);
    }

    #[tokio::test]
    async fn the_one_where_a_full_last_page_is_still_the_last_page() {
        let (records, index) = scan(20, 10).await;
        assert_eq!(ids(&records), (0..20).collect::<Vec<_>>());
        // -- search + one scroll, no third request to discover emptiness
        assert_eq!(index.page_requests(), 2);
        assert_eq!(index.cleared_scrolls(), 1);
    }

    #[tokio::test]
    async fn the_one_where_a_ragged_last_page_arrives_in_order() {
        let (records, index) = scan(25, 10).await;
        assert_eq!(ids(&records), (0..25).collect::<Vec<_>>());
        assert_eq!(index.page_requests(), 3);
        assert!(records.iter().all(|r| r.collection == "blog" && r.kind == "post"));
    }

    #[tokio::test]
    async fn the_one_where_the_cluster_promises_more_than_it_has() {
        let index = Arc::new(InMemoryIndex::with_docs(numbered_docs(5), 10).advertising(8));
        let mut source = duplex(&index);
        assert_eq!(source.next_page().await.unwrap().map(|p| p.len()), Some(5));
        let err = source.next_page().await.unwrap_err();
        assert!(format!("{err:#}").contains("ran dry at 5 of 8"), "{err:#}");
        // -- an error is the end, not a pause
        assert!(source.next_page().await.unwrap().is_none());
        assert_eq!(index.page_requests(), 2);
    }

    #[tokio::test]
    async fn the_one_where_a_failed_scroll_is_terminal_and_releases_the_cursor() {
        let index = Arc::new(InMemoryIndex::with_docs(numbered_docs(30), 10).failing_scroll_after(1));
        let mut source = duplex(&index);
        assert!(source.next_page().await.unwrap().is_some());
        assert!(source.next_page().await.unwrap().is_some());
        assert!(source.next_page().await.is_err());
        assert!(source.next_page().await.unwrap().is_none());
        assert_eq!(index.cleared_scrolls(), 1);
    }

    #[tokio::test]
    async fn the_one_where_each_create_waits_for_the_one_before_it() {
        let index = Arc::new(InMemoryIndex::default());
        let mut sink = duplex(&index);
        for n in 0..5 {
            let body = match json!({"id": n, "n": n}) {
                serde_json::Value::Object(map) => map,
                _ => unreachable!(),
            };
            sink.send(Record::new("blog", "post", body)).await.unwrap();
        }
        sink.close().await.unwrap();
        assert_eq!(index.created_ids(), vec!["0", "1", "2", "3", "4"]);
        assert_eq!(index.max_in_flight_creates(), 1);
    }

    #[tokio::test]
    async fn the_one_where_a_record_without_an_id_stops_the_line() {
        let index = Arc::new(InMemoryIndex::default());
        let mut sink = duplex(&index);
        let err = sink.send(Record::new("blog", "post", serde_json::Map::new())).await.unwrap_err();
        assert!(format!("{err}").contains("no usable 'id'"));
        assert!(index.created_ids().is_empty());
    }
}
