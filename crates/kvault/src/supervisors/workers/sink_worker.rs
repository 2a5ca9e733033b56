//! 🎬 *[a channel fills with records. somewhere, a sink waits.]*
//! *[the clock on the wall reads 2:47am.]*
//!
//! 🗑️ The SinkWorker: patient, tireless, and deeply unbothered by the chaos
//! happening upstream. It takes one record off the channel, runs it through
//! the transform chain, and hands every result to the sink, one acknowledged
//! send at a time. Only then does it take the next one.
//!
//! ⚠️ On a forwarded source error it stops without closing the sink. A half
//! archive with a proper gzip trailer looks finished, and it is not.

use anyhow::{Context, Result};
use async_channel::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::Worker;
use crate::backends::{Sink, SinkBackend};
use crate::common::Record;
use crate::transforms::TransformChain;

#[derive(Debug)]
pub(crate) struct SinkWorker {
    rx: Receiver<Result<Record>>,
    transforms: TransformChain,
    sink: SinkBackend,
}

impl SinkWorker {
    pub(crate) fn new(rx: Receiver<Result<Record>>, transforms: TransformChain, sink: SinkBackend) -> Self {
        Self { rx, transforms, sink }
    }
}

impl Worker for SinkWorker {
    fn start(mut self) -> JoinHandle<Result<u64>> {
        tokio::spawn(async move {
            debug!("📥 SinkWorker started draining channel...");
            let mut written = 0u64;
            loop {
                match self.rx.recv().await {
                    Ok(Ok(record)) => {
                        let outputs = self
                            .transforms
                            .apply(record)
                            .await
                            .context("💀 A transform stage refused a record. The pipeline stops here.")?;
                        for output in outputs {
                            self.sink.send(output).await?;
                            written += 1;
                        }
                        trace!("🪣 SinkWorker has written {written}");
                    }
                    Ok(Err(source_err)) => {
                        return Err(source_err.context("💀 The source gave up mid-stream. The sink was left unclosed."));
                    }
                    Err(_) => {
                        // -- channel is empty and closed
                        debug!("🏁 SinkWorker: channel closed. Closing the sink.");
                        self.sink.close().await.context("💀 SinkWorker failed to close the sink")?;
                        return Ok(written);
                    }
                }
            }
        })
    }
}
