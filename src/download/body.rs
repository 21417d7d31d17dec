//! Streaming response body backed by an open resource
//!
//! The transport pulls frames out of the body; each poll reads at most one
//! buffer worth of bytes. When the peer goes away the transport drops the
//! body, which drops the resource handle with it.

use bytes::BytesMut;
use hyper::body::{Body, Bytes, Frame, SizeHint};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

use super::resource::ResourceReader;

pub struct ResourceBody {
    /// `None` once the stream has finished or failed
    reader: Option<Box<dyn ResourceReader>>,
    /// Frames are split off this buffer and handed out without copying
    buf: BytesMut,
    buffer_size: usize,
    remaining: u64,
    length: u64,
    label: String,
}

impl ResourceBody {
    /// Stream exactly `length` bytes from the reader's current position
    pub fn new(
        reader: Box<dyn ResourceReader>,
        length: u64,
        buffer_size: usize,
        label: impl Into<String>,
    ) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            reader: (length > 0).then_some(reader),
            buf: BytesMut::with_capacity(buffer_size),
            buffer_size,
            remaining: length,
            length,
            label: label.into(),
        }
    }

    fn sent(&self) -> u64 {
        self.length - self.remaining
    }

    fn fail(&mut self, err: io::Error) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        self.reader = None;
        tracing::warn!(
            resource = %self.label,
            sent = self.sent(),
            expected = self.length,
            error = %err,
            "download aborted by a read failure after headers were sent"
        );
        Poll::Ready(Some(Err(err)))
    }
}

impl Body for ResourceBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        let Some(reader) = this.reader.as_mut() else {
            return Poll::Ready(None);
        };

        let want = usize::try_from(this.remaining)
            .map_or(this.buffer_size, |r| r.min(this.buffer_size));
        // Reclaims the previous allocation once the transport has released
        // the last frame split from it
        this.buf.clear();
        this.buf.resize(want, 0);
        let mut read_buf = ReadBuf::new(&mut this.buf[..]);

        match Pin::new(reader.as_mut()).poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(err)) => this.fail(err),
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled().len();
                if filled == 0 {
                    return this.fail(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "resource ended before the advertised length",
                    ));
                }

                this.buf.truncate(filled);
                let chunk = this.buf.split().freeze();
                this.remaining -= chunk.len() as u64;
                if this.remaining == 0 {
                    this.reader = None;
                }
                Poll::Ready(Some(Ok(Frame::data(chunk))))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.reader.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining)
    }
}

impl Drop for ResourceBody {
    fn drop(&mut self) {
        if self.reader.is_some() {
            tracing::debug!(
                resource = %self.label,
                sent = self.sent(),
                expected = self.length,
                "download stopped early (connection probably closed by the client)"
            );
        }
    }
}
