//! 🔌 Backends: where the real I/O happens.
//!
//! 🚰 Source backends pour records, Sink backends swallow them.
//! There are exactly two places a record can live outside this process:
//! a search cluster, or a gzip'd archive on disk. Both of them read, both of
//! them write, and the pipeline does not care which end is which.
//!
//! 🎭 The casting sheet:
//! - `elasticsearch`: the remote index. Scroll out, `_create` in.
//! - `archive`: length-delimited `EntryPoint` frames behind a gzip curtain.
//! - `in_mem`: a pretend cluster that lives in a `Vec`, for tests only.
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

mod sink;
mod source;

pub(crate) mod archive;
pub(crate) mod elasticsearch;
#[cfg(test)]
pub(crate) mod in_mem;

pub(crate) use sink::{Sink, SinkBackend};
pub(crate) use source::{Source, SourceBackend};

pub use archive::{ArchiveConfig, Compression};
pub use elasticsearch::ElasticsearchConfig;
pub(crate) use elasticsearch::{ElasticsearchClient, RemoteIndex, RemoteIndexDuplex, SearchPage, SearchQuery};
pub(crate) use archive::{ArchiveSink, ArchiveSource};
