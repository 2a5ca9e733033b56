//! 🧵 Workers: the ones who actually do the work while the Supervisor takes
//! all the credit in the sprint retro.
//!
//! Two of them, one on each end of a bounded channel. The channel carries
//! `Result<Record>` rather than `Record` so a source failure can travel the
//! same road as the data and arrive in order, after everything that was read
//! before it. 🦆

use anyhow::Result;
use tokio::task::JoinHandle;

mod sink_worker;
mod source_worker;

pub(super) use sink_worker::SinkWorker;
pub(super) use source_worker::SourceWorker;

/// 🏗️ A background worker, that does work. duh.
///
/// The handle resolves to how many records the worker moved.
pub(super) trait Worker {
    fn start(self) -> JoinHandle<Result<u64>>;
}
