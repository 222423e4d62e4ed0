//! gzip (RFC 1952) codec backed by flate2.

use std::io::{self, Read, Write};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::codec::{Codec, Encoder, Sink, Source};

pub const ENCODING: &str = "gzip";

#[derive(Debug, Clone, Copy, Default)]
pub struct GzipCodec {
    level: Compression,
}

impl GzipCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }
}

impl Codec for GzipCodec {
    fn encoding(&self) -> &'static str {
        ENCODING
    }

    fn encoder(&self, sink: Sink) -> io::Result<Box<dyn Encoder>> {
        Ok(Box::new(GzipEncoder(GzEncoder::new(sink, self.level))))
    }

    fn decoder(&self, source: Source) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(MultiGzDecoder::new(source)))
    }
}

struct GzipEncoder(GzEncoder<Sink>);

impl Write for GzipEncoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Encoder for GzipEncoder {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut sink = self.0.finish()?;
        sink.flush()
    }
}
