//! Streaming body adapters.
//!
//! # Responsibilities
//! - Bridge an async request/response body to the blocking `std::io` codec streams
//! - Start the transform lazily, on the first poll of the new body
//! - Bound read-ahead with a small channel so a slow consumer throttles the worker
//! - Release codec streams on completion, error, or when the consumer goes away
//!
//! # Design Decisions
//! - Codec work runs on `spawn_blocking`; the source body is read through `SyncIoBridge`
//! - A failed transform ends the body with an error item, never with truncated data
//! - A closed channel means the consumer is gone: the worker stops and drops everything

use std::io::{self, Read, Write};
use std::sync::Arc;

use axum::body::Body;
use bytes::Bytes;
use futures_util::{stream, Stream, StreamExt, TryStreamExt};
use tokio::sync::mpsc;
use tokio_util::io::{StreamReader, SyncIoBridge};

use crate::codec::{Codec, Source};

/// Chunk size used when pulling decoded bytes out of a codec.
const CHUNK_SIZE: usize = 16 * 1024;

/// Maximum number of chunks buffered between worker and consumer.
const CHANNEL_DEPTH: usize = 4;

type Chunk = io::Result<Bytes>;

/// Replace `body` with a body that yields its decompressed contents.
pub fn decompress_body(body: Body, codec: Arc<dyn Codec>) -> Body {
    let lazy = stream::once(async move { receiver_stream(spawn_decoder(body, codec)) }).flatten();
    Body::from_stream(lazy)
}

/// Replace `body` with a body that yields its compressed contents.
pub fn compress_body(body: Body, codec: Arc<dyn Codec>) -> Body {
    let lazy = stream::once(async move { receiver_stream(spawn_encoder(body, codec)) }).flatten();
    Body::from_stream(lazy)
}

fn blocking_source(body: Body) -> SyncIoBridge<impl tokio::io::AsyncRead + Unpin + Send> {
    let data = body.into_data_stream().map_err(io::Error::other);
    SyncIoBridge::new(StreamReader::new(data))
}

fn spawn_decoder(body: Body, codec: Arc<dyn Codec>) -> mpsc::Receiver<Chunk> {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    let source: Source = Box::new(blocking_source(body));

    tokio::task::spawn_blocking(move || {
        let encoding = codec.encoding();
        let result = codec.decoder(source).and_then(|mut decoder| {
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                let n = match decoder.read(&mut buf) {
                    Ok(0) => return Ok(()),
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };
                if tx.blocking_send(Ok(Bytes::copy_from_slice(&buf[..n]))).is_err() {
                    return Err(consumer_gone());
                }
            }
        });
        finish_worker(&tx, encoding, "decompress", result);
    });

    rx
}

fn spawn_encoder(body: Body, codec: Arc<dyn Codec>) -> mpsc::Receiver<Chunk> {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    let mut source = blocking_source(body);

    tokio::task::spawn_blocking(move || {
        let encoding = codec.encoding();
        let sink = ChannelWriter { tx: tx.clone() };
        let result = codec.encoder(Box::new(sink)).and_then(|mut encoder| {
            io::copy(&mut source, &mut encoder)?;
            encoder.finish()
        });
        finish_worker(&tx, encoding, "compress", result);
    });

    rx
}

/// Report the worker result. The codec stream and source have already been dropped.
fn finish_worker(tx: &mpsc::Sender<Chunk>, encoding: &str, direction: &str, result: io::Result<()>) {
    match result {
        Ok(()) => {}
        Err(_) if tx.is_closed() => {
            tracing::debug!(encoding, direction, "Body consumer went away, codec stream released");
        }
        Err(e) => {
            tracing::warn!(encoding, direction, error = %e, "Body transform failed");
            let _ = tx.blocking_send(Err(e));
        }
    }
}

fn consumer_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "body consumer dropped")
}

fn receiver_stream(rx: mpsc::Receiver<Chunk>) -> impl Stream<Item = Chunk> + Send {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|chunk| (chunk, rx)) })
}

/// `Write` end of the worker channel; each write becomes one body chunk.
struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| consumer_gone())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
