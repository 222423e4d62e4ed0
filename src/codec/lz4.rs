//! LZ4 frame format codec (lz4_flex), with content checksums enabled.

use std::io::{self, Read, Write};

use lz4_flex::frame::{BlockMode, BlockSize, FrameDecoder, FrameEncoder, FrameInfo};

use crate::codec::{Codec, Encoder, Sink, Source};

pub const ENCODING: &str = "lz4";

#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl Lz4Codec {
    pub fn new() -> Self {
        Self
    }

    fn frame_info() -> FrameInfo {
        FrameInfo::new()
            .block_size(BlockSize::Max64KB)
            .block_mode(BlockMode::Linked)
            .content_checksum(true)
    }
}

impl Codec for Lz4Codec {
    fn encoding(&self) -> &'static str {
        ENCODING
    }

    fn encoder(&self, sink: Sink) -> io::Result<Box<dyn Encoder>> {
        Ok(Box::new(Lz4Encoder(FrameEncoder::with_frame_info(
            Self::frame_info(),
            sink,
        ))))
    }

    fn decoder(&self, source: Source) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(FrameDecoder::new(source)))
    }
}

struct Lz4Encoder(FrameEncoder<Sink>);

impl Write for Lz4Encoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Encoder for Lz4Encoder {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut sink = self.0.finish().map_err(io::Error::other)?;
        sink.flush()
    }
}
