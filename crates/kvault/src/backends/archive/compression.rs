//! 🫁 Streaming gzip in both directions, without owning the I/O.
//!
//! Both sides wrap a `Vec<u8>` and get drained after every write, so the
//! async file handle stays on the outside and flate2 never blocks on disk.

use std::io::{self, Write};
use std::mem;

use flate2::write::{GzDecoder, GzEncoder};

use super::Compression;

#[derive(Debug)]
pub(crate) enum BlockEncoder {
    Gzip(GzEncoder<Vec<u8>>),
    Plain(Vec<u8>),
}

impl BlockEncoder {
    pub(crate) fn new(compression: Compression) -> Self {
        match compression {
            Compression::Gzip => BlockEncoder::Gzip(GzEncoder::new(Vec::new(), flate2::Compression::default())),
            Compression::None => BlockEncoder::Plain(Vec::new()),
        }
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            BlockEncoder::Gzip(encoder) => encoder.write_all(bytes),
            BlockEncoder::Plain(out) => {
                out.extend_from_slice(bytes);
                Ok(())
            }
        }
    }

    /// 🪣 Whatever compressed output is ready so far.
    pub(crate) fn take_output(&mut self) -> Vec<u8> {
        match self {
            BlockEncoder::Gzip(encoder) => mem::take(encoder.get_mut()),
            BlockEncoder::Plain(out) => mem::take(out),
        }
    }

    /// 🏁 The remaining output, gzip trailer included.
    pub(crate) fn finish(self) -> io::Result<Vec<u8>> {
        match self {
            BlockEncoder::Gzip(encoder) => encoder.finish(),
            BlockEncoder::Plain(out) => Ok(out),
        }
    }
}

#[derive(Debug)]
pub(crate) enum BlockDecoder {
    Gzip(GzDecoder<Vec<u8>>),
    Plain(Vec<u8>),
}

impl BlockDecoder {
    pub(crate) fn new(compression: Compression) -> Self {
        match compression {
            Compression::Gzip => BlockDecoder::Gzip(GzDecoder::new(Vec::new())),
            Compression::None => BlockDecoder::Plain(Vec::new()),
        }
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            BlockDecoder::Gzip(decoder) => decoder.write_all(bytes),
            BlockDecoder::Plain(out) => {
                out.extend_from_slice(bytes);
                Ok(())
            }
        }
    }

    pub(crate) fn take_output(&mut self) -> Vec<u8> {
        match self {
            BlockDecoder::Gzip(decoder) => mem::take(decoder.get_mut()),
            BlockDecoder::Plain(out) => mem::take(out),
        }
    }

    pub(crate) fn finish(self) -> io::Result<Vec<u8>> {
        match self {
            BlockDecoder::Gzip(decoder) => decoder.finish(),
            BlockDecoder::Plain(out) => Ok(out),
        }
    }
}
