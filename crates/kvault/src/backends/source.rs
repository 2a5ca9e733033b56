use anyhow::Result;
use async_trait::async_trait;

use crate::backends::{archive, elasticsearch};
use crate::common::Record;

/// 🚰 A source that produces one page of records per call.
///
/// Implement this trait and you too can be the origin of someone else's data problems.
///
/// # Contract 📜
/// - `next_page` returns `Some(records)` while data flows, one page per call.
/// - `None` = end of stream. The well is dry. The golden retriever goes home. 🐕
/// - `Some` pages are never empty. An empty page means end of stream, so say `None`.
/// - The source is pulled, never pushed: it must not fetch page N+1 until asked.
///   That is the whole backpressure story, and it fits on an index card.
/// - The borrow checker demands `&mut self` because sources have state. And feelings. Mostly state.
#[async_trait]
pub(crate) trait Source: std::fmt::Debug + Send {
    /// 📄 Fetch the next page.
    ///
    /// Returns `Err(...)` when something has gone sideways, sidelong, or fully upside-down.
    async fn next_page(&mut self) -> Result<Option<Vec<Record>>>;
}

/// 🎭 The many faces of a Source: a polymorphic casting call for data origins.
///
/// Each variant wraps a concrete source. The enum itself dispatches via
/// `impl Source for SourceBackend`, so the workers never need to know (or care)
/// whether they're reading from a cluster or a file.
/// Ancient proverb: "He who hardcodes the backend, migrates only once."
#[derive(Debug)]
pub(crate) enum SourceBackend {
    Elasticsearch(elasticsearch::RemoteIndexDuplex),
    Archive(archive::ArchiveSource),
}

#[async_trait]
impl Source for SourceBackend {
    async fn next_page(&mut self) -> Result<Option<Vec<Record>>> {
        match self {
            SourceBackend::Elasticsearch(es) => es.next_page().await,
            SourceBackend::Archive(archive) => archive.next_page().await,
        }
    }
}
