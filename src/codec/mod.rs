//! Content-encoding codecs.
//!
//! # Data Flow
//! ```text
//! startup:
//!     config.compression.codecs
//!     → registry.rs (token → Arc<dyn Codec>, case-insensitive)
//!     → shared read-only by the compression stage
//!
//! per request:
//!     compressed request body
//!         → stream.rs decompress_body (blocking worker, Codec::decoder)
//!         → plain body for the application
//!     plain response body
//!         → stream.rs compress_body (blocking worker, Codec::encoder)
//!         → encoded body for the caller
//! ```
//!
//! # Design Decisions
//! - Codecs are plain `std::io` transforms; the async bridge lives in stream.rs
//! - Every codec streams: neither direction needs the whole payload in memory
//! - Encoders are finished explicitly so trailers and end marks are written

pub mod deflate;
pub mod gzip;
pub mod lz4;
pub mod registry;
pub mod stream;

use std::io::{self, Read, Write};

pub use registry::{CodecRegistry, BUILTIN_ENCODINGS};
pub use stream::{compress_body, decompress_body};

/// Boxed writable sink handed to an encoder.
pub type Sink = Box<dyn Write + Send>;

/// Boxed readable source handed to a decoder.
pub type Source = Box<dyn Read + Send>;

/// A named two-way streaming transform for one content-encoding token.
pub trait Codec: Send + Sync {
    /// The encoding token this codec answers to (e.g. `gzip`).
    fn encoding(&self) -> &'static str;

    /// Wrap `sink` in a compressing writer.
    fn encoder(&self, sink: Sink) -> io::Result<Box<dyn Encoder>>;

    /// Wrap `source` in a decompressing reader.
    fn decoder(&self, source: Source) -> io::Result<Box<dyn Read + Send>>;
}

/// A compressing writer that must be finished to produce a complete stream.
pub trait Encoder: Write + Send {
    /// Write any trailing data and flush the underlying sink.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// Compress `input` into memory. Convenience for tests and small payloads.
pub fn compress_to_vec(codec: &dyn Codec, input: &[u8]) -> io::Result<Vec<u8>> {
    let buffer = SharedBuffer::default();
    let mut encoder = codec.encoder(Box::new(buffer.clone()))?;
    encoder.write_all(input)?;
    encoder.finish()?;
    Ok(buffer.take())
}

/// Decompress `input` into memory. Convenience for tests and small payloads.
pub fn decompress_to_vec(codec: &dyn Codec, input: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = codec.decoder(Box::new(io::Cursor::new(input.to_vec())))?;
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// In-memory sink that stays readable after the encoder takes ownership of a clone.
#[derive(Clone, Default)]
struct SharedBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn take(&self) -> Vec<u8> {
        match self.0.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| io::Error::other("buffer lock poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
