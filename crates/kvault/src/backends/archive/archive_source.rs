// ai
//! 📖 Reading an archive back: chunked reads, incremental gunzip, frame
//! splitting, unpack. Memory stays bounded by one read chunk plus one page of
//! records, however large the archive is.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::{fs::File, io::AsyncReadExt};
use tracing::{debug, info};

use super::Compression;
use super::compression::BlockDecoder;
use super::frame::FrameReader;
use crate::backends::Source;
use crate::codec::RecordCodec;
use crate::common::Record;
use crate::progress::{ProgressMetrics, ProgressUnit};

const READ_CHUNK: usize = 64 * 1024;

pub(crate) struct ArchiveSource {
    file: File,
    // -- `None` once the file hit EOF and the decoder has been finished
    decoder: Option<BlockDecoder>,
    frames: FrameReader,
    codec: Arc<RecordCodec>,
    batch_size: usize,
    path: PathBuf,
    chunk: Vec<u8>,
    eof: bool,
    entries: u64,
    progress: Option<ProgressMetrics>,
}

// 🎭 manual Debug because ProgressMetrics has a ProgressBar inside it
impl std::fmt::Debug for ArchiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSource")
            .field("path", &self.path)
            .field("batch_size", &self.batch_size)
            .field("entries", &self.entries)
            .field("eof", &self.eof)
            .finish()
    }
}

impl ArchiveSource {
    pub(crate) async fn new(
        path: &Path,
        codec: Arc<RecordCodec>,
        compression: Compression,
        batch_size: usize,
    ) -> Result<Self> {
        let file = File::open(path).await.with_context(|| {
            format!(
                "💀 The door to '{}' would not budge. It might not exist. The permissions might be wrong. We remain outside.",
                path.display()
            )
        })?;
        Ok(Self {
            file,
            decoder: Some(BlockDecoder::new(compression)),
            frames: FrameReader::default(),
            codec,
            batch_size: batch_size.max(1),
            path: path.to_path_buf(),
            chunk: vec![0u8; READ_CHUNK],
            eof: false,
            entries: 0,
            progress: None,
        })
    }

    /// 📊 Show a byte-based progress bar, sized to the archive on disk.
    pub(crate) async fn with_progress(mut self) -> Self {
        let size = self.file.metadata().await.map(|m| m.len()).unwrap_or(0);
        self.progress = Some(ProgressMetrics::new(self.path.display().to_string(), size, ProgressUnit::Bytes));
        self
    }

    /// Pull the next chunk off disk into the frame reader.
    async fn fill(&mut self) -> Result<()> {
        let read = self
            .file
            .read(&mut self.chunk)
            .await
            .with_context(|| format!("💀 Reading '{}' failed partway through.", self.path.display()))?;
        if let Some(progress) = &mut self.progress {
            progress.update(read as u64, 0);
        }
        if read == 0 {
            self.eof = true;
            if let Some(decoder) = self.decoder.take() {
                let tail = decoder.finish().with_context(|| {
                    format!("💀 '{}' is not a complete gzip stream. It was cut short, or it was never gzip.", self.path.display())
                })?;
                self.frames.push(&tail);
            }
            return Ok(());
        }
        let decoder = self
            .decoder
            .as_mut()
            .context("💀 Data after the end of the archive. The universe is not supposed to work like that.")?;
        decoder
            .write(&self.chunk[..read])
            .with_context(|| format!("💀 '{}' does not decompress. Wrong compression setting, or a corrupt file.", self.path.display()))?;
        let out = decoder.take_output();
        self.frames.push(&out);
        Ok(())
    }
}

#[async_trait]
impl Source for ArchiveSource {
    async fn next_page(&mut self) -> Result<Option<Vec<Record>>> {
        let mut records = Vec::new();
        loop {
            while records.len() < self.batch_size {
                let Some(frame) = self.frames.next_frame()? else {
                    break;
                };
                let record = self
                    .codec
                    .unpack(&frame)
                    .with_context(|| format!("💀 Entry {} of '{}' does not decode.", self.entries + 1, self.path.display()))?;
                self.entries += 1;
                records.push(record);
            }
            if records.len() >= self.batch_size || self.eof {
                break;
            }
            self.fill().await?;
        }

        if records.is_empty() {
            self.frames.finish()?;
            if let Some(progress) = &self.progress {
                progress.finish();
            }
            info!("🏁 {} entries read from '{}'", self.entries, self.path.display());
            return Ok(None);
        }
        debug!("📖 page of {} entries from the archive", records.len());
        if let Some(progress) = &mut self.progress {
            progress.update(0, records.len() as u64);
        }
        Ok(Some(records))
    }
}
