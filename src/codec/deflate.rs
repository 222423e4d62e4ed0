//! `deflate` content-coding: a zlib (RFC 1950) wrapped deflate stream, as HTTP defines it.

use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::codec::{Codec, Encoder, Sink, Source};

pub const ENCODING: &str = "deflate";

#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateCodec {
    level: Compression,
}

impl DeflateCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Codec for DeflateCodec {
    fn encoding(&self) -> &'static str {
        ENCODING
    }

    fn encoder(&self, sink: Sink) -> io::Result<Box<dyn Encoder>> {
        Ok(Box::new(DeflateEncoder(ZlibEncoder::new(sink, self.level))))
    }

    fn decoder(&self, source: Source) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(ZlibDecoder::new(source)))
    }
}

struct DeflateEncoder(ZlibEncoder<Sink>);

impl Write for DeflateEncoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Encoder for DeflateEncoder {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut sink = self.0.finish()?;
        sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{compress_to_vec, decompress_to_vec};

    #[test]
    fn test_output_is_zlib_framed() {
        let encoded = compress_to_vec(&DeflateCodec::new(), b"abcabcabcabc").unwrap();
        // CMF/FLG pair must be a multiple of 31 with method 8.
        assert_eq!(encoded[0] & 0x0f, 8);
        assert_eq!(((encoded[0] as u16) << 8 | encoded[1] as u16) % 31, 0);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result = decompress_to_vec(&DeflateCodec::new(), b"definitely not zlib");
        assert!(result.is_err());
    }

    #[test]
    fn test_truncated_stream_is_rejected() {
        let codec = DeflateCodec::new();
        let payload = b"zlib framed payload ".repeat(100);
        let encoded = compress_to_vec(&codec, &payload).unwrap();

        for cut in [encoded.len() / 2, encoded.len() - 4, encoded.len() - 1] {
            assert!(decompress_to_vec(&codec, &encoded[..cut]).is_err(), "cut at {}", cut);
        }
    }
}
