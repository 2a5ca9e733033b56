//! 🎬 *[a page lands. the source worker hands it over one record at a time.]*
//! *[the channel is full. the source worker waits. it is good at waiting.]*
//!
//! 🚰 The SourceWorker pulls pages and pushes their records into the channel.
//! It asks for page N+1 only after every record of page N has been accepted,
//! so a slow sink slows the scroll down instead of piling pages up in memory.

use anyhow::{Context, Result};
use async_channel::Sender;
use tokio::task::JoinHandle;
use tracing::debug;

use super::Worker;
use crate::backends::{Source, SourceBackend};
use crate::common::Record;

#[derive(Debug)]
pub(crate) struct SourceWorker {
    tx: Sender<Result<Record>>,
    source: SourceBackend,
}

impl SourceWorker {
    pub(crate) fn new(tx: Sender<Result<Record>>, source: SourceBackend) -> Self {
        Self { tx, source }
    }

    async fn pump(&mut self, read: &mut u64) -> Result<()> {
        while let Some(page) = self.source.next_page().await? {
            debug!("🚰 SourceWorker forwarding a page of {} records", page.len());
            for record in page {
                self.tx
                    .send(Ok(record))
                    .await
                    .context("💀 The sink hung up mid-page. Nobody is listening anymore.")?;
                *read += 1;
            }
        }
        Ok(())
    }
}

impl Worker for SourceWorker {
    fn start(mut self) -> JoinHandle<Result<u64>> {
        tokio::spawn(async move {
            let mut read = 0u64;
            let outcome = self.pump(&mut read).await;
            match outcome {
                Ok(()) => {
                    debug!("🏁 SourceWorker: stream exhausted after {read} records. Closing the channel.");
                    self.tx.close();
                    Ok(read)
                }
                Err(err) => {
                    // -- hand the error to the sink side, in order; if it is already gone, keep it ourselves
                    match self.tx.send(Err(err)).await {
                        Ok(()) => Ok(read),
                        Err(returned) => match returned.into_inner() {
                            Err(err) => Err(err),
                            Ok(_) => Ok(read),
                        },
                    }
                }
            }
        })
    }
}
