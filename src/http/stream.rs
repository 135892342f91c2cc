//! Streaming response bodies
//!
//! `TextStream` turns a stream of byte chunks into UTF-8 text chunks. A
//! multi-byte character split across two chunks is held back until the next
//! chunk completes it, so every yielded string is valid text.

use crate::error::{Error, Result};
use bytes::Bytes;
use futures::stream::{BoxStream, FusedStream};
use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tracing::debug;

/// Text stream returned by `Client::get_streamed`
pub type ResponseStream = TextStream<BoxStream<'static, Result<Bytes>>>;

pin_project! {
    /// Lazy, finite, non-restartable sequence of text chunks bound to one
    /// open response. Dropping it closes the underlying exchange.
    pub struct TextStream<S> {
        #[pin]
        inner: S,
        // Incomplete trailing bytes of a multi-byte sequence
        pending: Vec<u8>,
        // Decode failure reported after the text preceding it
        failed: Option<Error>,
        finished: bool,
        bytes_read: u64,
    }
}

impl<S> TextStream<S> {
    /// Wrap a byte-chunk stream
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            failed: None,
            finished: false,
            bytes_read: 0,
        }
    }

    /// Body bytes received so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<S, E> Stream for TextStream<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Error>,
{
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if *this.finished {
                return Poll::Ready(None);
            }
            if let Some(error) = this.failed.take() {
                *this.finished = true;
                return Poll::Ready(Some(Err(error)));
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    *this.bytes_read += chunk.len() as u64;
                    this.pending.extend_from_slice(&chunk);

                    let (text, error) = take_complete_text(this.pending);
                    if error.is_some() {
                        this.pending.clear();
                        *this.failed = error;
                    }
                    if let Some(text) = text {
                        return Poll::Ready(Some(Ok(text)));
                    }
                    // Either only part of a character so far, or a failure to report next
                }
                Some(Err(e)) => {
                    *this.finished = true;
                    this.pending.clear();
                    let error = Error::stream(e);
                    debug!(bytes_read = *this.bytes_read, error = %error, "Stream aborted");
                    return Poll::Ready(Some(Err(error)));
                }
                None => {
                    *this.finished = true;
                    if !this.pending.is_empty() {
                        let dangling = this.pending.len();
                        this.pending.clear();
                        return Poll::Ready(Some(Err(Error::decode(format!(
                            "stream ended inside a multi-byte UTF-8 sequence ({dangling} dangling bytes)"
                        )))));
                    }
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl<S, E> FusedStream for TextStream<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Error>,
{
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

impl<S> std::fmt::Debug for TextStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextStream")
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .field("bytes_read", &self.bytes_read)
            .finish_non_exhaustive()
    }
}

/// Split off the longest valid UTF-8 prefix of `buf`.
///
/// The text is `None` when `buf` holds nothing but the start of a character.
/// An invalid sequence yields the text before it together with the error.
fn take_complete_text(buf: &mut Vec<u8>) -> (Option<String>, Option<Error>) {
    let (valid, error) = match std::str::from_utf8(buf.as_slice()) {
        Ok(_) => (buf.len(), None),
        Err(e) if e.error_len().is_none() => (e.valid_up_to(), None),
        Err(e) => (
            e.valid_up_to(),
            Some(Error::decode(format!(
                "invalid UTF-8 in response stream: {e}"
            ))),
        ),
    };

    if valid == 0 {
        return (None, error);
    }

    let rest = buf.split_off(valid);
    let complete = std::mem::replace(buf, rest);
    match String::from_utf8(complete) {
        Ok(text) => (Some(text), error),
        Err(e) => (None, Some(Error::decode(e.to_string()))),
    }
}
