//! Newline-delimited framing over async byte streams
//!
//! One JSON document per line. The reader never hands out a partial line: a
//! trailing fragment without a terminator at end of stream is dropped.

use crate::error::{Result, TransportError};
use crate::traits::{LineSink, LineSource};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::warn;

/// Writes newline-terminated frames to an async writer
pub struct LineWriter<W> {
    inner: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin + Send> LineWriter<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self {
            inner: BufWriter::new(writer),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> LineSink for LineWriter<W> {
    async fn write_line(&mut self, line: &[u8]) -> Result<()> {
        if line.contains(&b'\n') {
            return Err(TransportError::InvalidFrame(
                "outbound frame contains an embedded newline".to_string(),
            ));
        }

        self.inner
            .write_all(line)
            .await
            .map_err(TransportError::Write)?;
        self.inner
            .write_all(b"\n")
            .await
            .map_err(TransportError::Write)?;
        self.inner.flush().await.map_err(TransportError::Write)?;

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.shutdown().await.map_err(TransportError::Write)
    }
}

/// Reads newline-terminated frames from an async reader
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> LineReader<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            buf: Vec::with_capacity(4096),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> LineSource for LineReader<R> {
    async fn read_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();

        let read = self.inner.read_until(b'\n', &mut self.buf).await?;
        if read == 0 {
            return Ok(None); // EOF
        }

        if self.buf.last() != Some(&b'\n') {
            warn!(bytes = read, "Discarding unterminated line at end of stream");
            return Ok(None);
        }

        self.buf.pop();
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }

        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}
