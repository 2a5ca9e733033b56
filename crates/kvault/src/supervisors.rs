//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 *[dramatic orchestral music swells]*
//! 🎬 "In a world where pages arrive faster than clusters can swallow them..."
//! 🎬 "One supervisor dared to make them wait."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor module: part middle manager, part helicopter parent.
//! It wires one source worker and one sink worker together with a bounded
//! channel, waits for them, and decides whose fault it was.
//!
//! ```text
//!   SourceWorker ──▶ bounded(queue_capacity) ──▶ SinkWorker ──▶ TransformChain ──▶ Sink
//! ```
//!
//! ⚠️ DO NOT MAKE THE WORKERS PUB EVER
//! 🔒 Like Fight Club, but for async tasks. First rule: you don't pub the workers.

mod workers;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::app_config::RuntimeConfig;
use crate::backends::{SinkBackend, SourceBackend};
use crate::transforms::TransformChain;
use workers::{SinkWorker, SourceWorker, Worker};

/// 📊 What a finished run has to say for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineReport {
    /// 📥 Records the source produced.
    pub read: u64,
    /// 📤 Records the sink accepted, after transforms had their say.
    pub written: u64,
}

/// 📦 The Supervisor: because even async tasks need someone hovering over them
/// asking "is it done yet?"
#[derive(Debug, Clone)]
pub(crate) struct Supervisor {
    runtime: RuntimeConfig,
}

impl Supervisor {
    pub(crate) fn new(runtime: RuntimeConfig) -> Self {
        Self { runtime }
    }

    /// 🧵 Run one pipeline to completion.
    ///
    /// The sink worker is awaited first. If it failed, its error is the
    /// root cause (the source only ever fails after that with "nobody is
    /// listening") and the source task is aborted. A source failure travels
    /// down the channel and comes back out of the sink worker, so either way
    /// there is exactly one error to report.
    pub(crate) async fn run(
        &self,
        source: SourceBackend,
        transforms: TransformChain,
        sink: SinkBackend,
    ) -> Result<PipelineReport> {
        let capacity = self.runtime.queue_capacity.max(1);
        debug!("🧵 starting workers, queue capacity {capacity}");
        let (tx, rx) = async_channel::bounded(capacity);

        let source_handle = SourceWorker::new(tx, source).start();
        let sink_handle = SinkWorker::new(rx, transforms, sink).start();

        let written = match sink_handle.await.context("💀 The sink worker panicked. It took the pipeline with it.")? {
            Ok(written) => written,
            Err(err) => {
                source_handle.abort();
                return Err(err);
            }
        };
        let read = source_handle
            .await
            .context("💀 The source worker panicked after the sink had already finished. Rude.")??;

        info!("🏁 pipeline finished: {read} read, {written} written");
        Ok(PipelineReport { read, written })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::backends::elasticsearch::DuplexConfig;
    use crate::backends::in_mem::{InMemoryIndex, numbered_docs};
    use crate::backends::{RemoteIndex, RemoteIndexDuplex};
    use crate::transforms::TransformConfig;

    fn duplex(index: &Arc<InMemoryIndex>, collection: &str) -> RemoteIndexDuplex {
        let client: Arc<dyn RemoteIndex> = index.clone();
        RemoteIndexDuplex::new(
            client,
            DuplexConfig {
                collection: collection.to_string(),
                kind: "doc".to_string(),
                page_size: None,
                keep_alive: "1m".to_string(),
            },
        )
    }

    fn supervisor(queue_capacity: usize) -> Supervisor {
        Supervisor::new(RuntimeConfig { queue_capacity })
    }

    #[tokio::test]
    async fn the_one_where_every_record_crosses_over_in_order() {
        let from = Arc::new(InMemoryIndex::with_docs(numbered_docs(23), 5));
        let to = Arc::new(InMemoryIndex::default());

        let report = supervisor(3)
            .run(
                SourceBackend::Elasticsearch(duplex(&from, "src")),
                TransformChain::new(),
                SinkBackend::Elasticsearch(duplex(&to, "dst")),
            )
            .await
            .unwrap();

        assert_eq!(report, PipelineReport { read: 23, written: 23 });
        let expected: Vec<String> = (0..23).map(|n| format!("doc-{n}")).collect();
        assert_eq!(to.created_ids(), expected);
    }

    #[tokio::test]
    async fn the_one_where_transforms_change_the_headcount() {
        let from = Arc::new(InMemoryIndex::with_docs(numbered_docs(4), 10));
        let to = Arc::new(InMemoryIndex::default());
        let chain = TransformChain::from_configs(&[
            TransformConfig::Clone {
                copies: 2,
                redirect: false,
                annotate_field: None,
            },
            TransformConfig::PrefixId { prefix: "new_".into() },
        ]);

        let report = supervisor(10)
            .run(
                SourceBackend::Elasticsearch(duplex(&from, "src")),
                chain,
                SinkBackend::Elasticsearch(duplex(&to, "dst")),
            )
            .await
            .unwrap();

        assert_eq!(report, PipelineReport { read: 4, written: 8 });
        assert_eq!(to.created_ids()[..2], ["new_doc-0".to_string(), "new_doc-0".to_string()]);
    }

    #[tokio::test]
    async fn the_one_where_the_sink_error_is_the_one_you_hear_about() {
        let from = Arc::new(InMemoryIndex::with_docs(numbered_docs(30), 10));
        let to = Arc::new(InMemoryIndex::default().rejecting_id("doc-4"));

        let err = supervisor(2)
            .run(
                SourceBackend::Elasticsearch(duplex(&from, "src")),
                TransformChain::new(),
                SinkBackend::Elasticsearch(duplex(&to, "dst")),
            )
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("doc-4"), "{err:#}");
        assert_eq!(to.created_ids().len(), 4);
    }

    #[tokio::test]
    async fn the_one_where_a_source_failure_surfaces_through_the_sink() {
        let from = Arc::new(InMemoryIndex::with_docs(numbered_docs(30), 10).failing_scroll_after(0));
        let to = Arc::new(InMemoryIndex::default());

        let err = supervisor(4)
            .run(
                SourceBackend::Elasticsearch(duplex(&from, "src")),
                TransformChain::new(),
                SinkBackend::Elasticsearch(duplex(&to, "dst")),
            )
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("source"), "{err:#}");
        // -- the first page made it across before the scroll blew up
        assert_eq!(to.created_ids().len(), 10);
    }
}
