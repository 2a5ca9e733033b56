// ai
//! 🗄️ *[a record arrives. it is packed, framed, squished, and written down.]*
//! *[it will sleep in this file until someone runs `load`. maybe years.]*

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::{
    fs::File,
    io::{self, AsyncWriteExt},
};
use tracing::{info, trace};

use super::Compression;
use super::compression::BlockEncoder;
use super::frame::encode_frame;
use crate::backends::Sink;
use crate::codec::RecordCodec;
use crate::common::Record;

/// 📦 Packs each record and appends it to the archive file.
#[derive(Debug)]
pub(crate) struct ArchiveSink {
    file_buf: io::BufWriter<File>,
    // -- `None` once closed; the gzip trailer has been written and there is no going back
    encoder: Option<BlockEncoder>,
    codec: Arc<RecordCodec>,
    path: PathBuf,
    frame: Vec<u8>,
    written: u64,
}

impl ArchiveSink {
    pub(crate) async fn new(path: &Path, codec: Arc<RecordCodec>, compression: Compression) -> Result<Self> {
        let file_handle = File::create(path).await.with_context(|| {
            format!(
                "💀 The archive '{}' could not be conjured into existence. \
                 One of us was wrong about whether the parent directory existed. It was us.",
                path.display()
            )
        })?;
        Ok(Self {
            file_buf: io::BufWriter::new(file_handle),
            encoder: Some(BlockEncoder::new(compression)),
            codec,
            path: path.to_path_buf(),
            frame: Vec::new(),
            written: 0,
        })
    }
}

#[async_trait]
impl Sink for ArchiveSink {
    async fn send(&mut self, record: Record) -> Result<()> {
        let packed = self.codec.pack(&record).with_context(|| {
            format!(
                "💀 Record {:?} in '{}/{}' does not fit the schema. The archive would be lying if it took it.",
                record.id(),
                record.collection,
                record.kind
            )
        })?;
        let encoder = self
            .encoder
            .as_mut()
            .context("💀 The archive was already closed. Writing after the gzip trailer is how archives become folklore.")?;

        self.frame.clear();
        encode_frame(&mut self.frame, &packed);
        encoder.write(&self.frame).context("💀 The gzip encoder choked on a frame.")?;
        let ready = encoder.take_output();
        if !ready.is_empty() {
            self.file_buf
                .write_all(&ready)
                .await
                .with_context(|| format!("💀 Writing to '{}' failed. The disk has opinions today.", self.path.display()))?;
        }
        self.written += 1;
        trace!("📬 entry {} packed ({} bytes)", self.written, packed.len());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(encoder) = self.encoder.take() {
            let tail = encoder.finish().context("💀 The gzip trailer would not come out.")?;
            self.file_buf.write_all(&tail).await?;
        }
        self.file_buf.flush().await.with_context(|| {
            format!(
                "💀 Flushing '{}' failed. The buffer held its data to the very end, and the disk said no.",
                self.path.display()
            )
        })?;
        info!("🏁 {} entries archived to '{}'", self.written, self.path.display());
        Ok(())
    }
}
