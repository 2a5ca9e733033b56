use anyhow::Result;
use async_trait::async_trait;

use crate::backends::{archive, elasticsearch};
use crate::common::Record;

/// 🕳️ A sink that accepts one record at a time.
///
/// The yin to the source's yang. The drain at the bottom of the pipeline tub.
///
/// # Contract 📜
/// - `send` returns only once the record is durably handed off: acknowledged by
///   the cluster, or written into the archive's encoder. The caller awaits it before
///   sending the next one, so at most one write is ever in flight.
/// - `close` flushes, finalizes, and bids the data a fond farewell. MUST be called
///   on the happy path. Skipping `close` on an archive leaves a gzip stream without
///   its trailer, which is a bug. It is also considered rude.
/// - Ancient proverb: "He who puts business logic in the Sink, debugs in production."
#[async_trait]
pub(crate) trait Sink: std::fmt::Debug + Send {
    /// 📡 Hand one record to the destination.
    async fn send(&mut self, record: Record) -> Result<()>;
    /// 🗑️ Flush, finalize, and release. Call this. Always. Not even Fridays are exempt.
    async fn close(&mut self) -> Result<()>;
}

/// 🎭 The many faces of a Sink. Mirrors `SourceBackend` on the other end of the pipeline.
/// Whoever designed this was clearly a fan of symmetry. Or they ran out of ideas.
#[derive(Debug)]
pub(crate) enum SinkBackend {
    Elasticsearch(elasticsearch::RemoteIndexDuplex),
    Archive(archive::ArchiveSink),
}

#[async_trait]
impl Sink for SinkBackend {
    async fn send(&mut self, record: Record) -> Result<()> {
        match self {
            SinkBackend::Elasticsearch(sink) => sink.send(record).await,
            SinkBackend::Archive(sink) => sink.send(record).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            SinkBackend::Elasticsearch(sink) => sink.close().await,
            SinkBackend::Archive(sink) => sink.close().await,
        }
    }
}
