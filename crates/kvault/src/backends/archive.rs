//! 🗄️ The archive backend: a file of length-prefixed `EntryPoint` messages,
//! the whole stream gzip'd.
//!
//! ```text
//!   gzip( varint(len₀) EntryPoint₀  varint(len₁) EntryPoint₁  … )
//! ```
//!
//! Nothing else. No header, no index, no footer beyond gzip's own. Which
//! means `zcat archive | protoc --decode_raw` gets you most of the way
//! when all else fails, and all else does eventually fail. 🦆

mod archive_sink;
mod archive_source;
mod compression;
mod frame;

pub(crate) use archive_sink::ArchiveSink;
pub(crate) use archive_source::ArchiveSource;

use std::path::PathBuf;

use serde::Deserialize;

/// 🫁 How the frame stream is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Gzip,
    /// Raw frames. Mostly for debugging with a hex editor and a strong stomach.
    None,
}

// 🗄️ ArchiveConfig: where the schema lives and how the bytes are squished.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ArchiveConfig {
    /// 📜 The schema text every entry is packed against.
    #[serde(default = "default_schema_file")]
    pub schema_file: PathBuf,
    #[serde(default)]
    pub compression: Compression,
    /// 📄 Records per page when reading an archive back.
    #[serde(default = "default_read_batch_size")]
    pub read_batch_size: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            schema_file: default_schema_file(),
            compression: Compression::default(),
            read_batch_size: default_read_batch_size(),
        }
    }
}

fn default_schema_file() -> PathBuf {
    PathBuf::from("asset.proto")
}

fn default_read_batch_size() -> usize {
    1000
}
