//! 📏 Varint length-delimited framing over an incrementally filled buffer.

use anyhow::Result;
use bytes::{Buf, Bytes, BytesMut};

use crate::codec::CodecError;
use crate::codec::wire::{get_varint, put_varint};

/// 🚧 One entry larger than this is a corrupt length prefix, not a document.
pub(crate) const MAX_FRAME_LEN: u64 = 64 * 1024 * 1024;

pub(crate) fn encode_frame(out: &mut Vec<u8>, payload: &[u8]) {
    put_varint(out, payload.len() as u64);
    out.extend_from_slice(payload);
}

/// 🧩 Splits a byte stream that arrives in arbitrary chunks back into frames.
#[derive(Debug, Default)]
pub(crate) struct FrameReader {
    buf: BytesMut,
}

impl FrameReader {
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Next complete frame, or `None` when more input is needed.
    pub(crate) fn next_frame(&mut self) -> Result<Option<Bytes>> {
        let mut idx = 0;
        let len = match get_varint(&self.buf, &mut idx) {
            Ok(len) => len,
            Err(CodecError::Truncated) => return Ok(None),
            Err(other) => return Err(anyhow::Error::new(other).context("💀 A frame length prefix is garbage.")),
        };
        if len > MAX_FRAME_LEN {
            anyhow::bail!("💀 A frame claims to be {len} bytes long. We don't believe it, and neither should you.");
        }
        let len = len as usize;
        if self.buf.len() < idx + len {
            return Ok(None);
        }
        self.buf.advance(idx);
        Ok(Some(self.buf.split_to(len).freeze()))
    }

    /// ✅ Input is over: anything still buffered is half a frame.
    pub(crate) fn finish(&self) -> Result<()> {
        if !self.buf.is_empty() {
            anyhow::bail!(
                "💀 The archive ends in the middle of an entry ({} stray bytes). It was cut short, or it was never finished.",
                self.buf.len()
            );
        }
        Ok(())
    }
}
