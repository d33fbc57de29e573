//! `Stream` adapter from raw response bytes to [`StreamEvent`]s.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures_util::Stream;
use pin_project_lite::pin_project;

use sme_types::error::ChatError;
use sme_types::event::StreamEvent;

use super::decoder::FrameDecoder;

pin_project! {
    /// Lazily decodes a byte stream into events.
    ///
    /// Polls the byte source once per chunk and yields every event that
    /// chunk completed before polling again. A transport error is yielded
    /// once, after which the stream ends.
    pub struct EventStream<S> {
        #[pin]
        inner: S,
        decoder: FrameDecoder,
        ready: VecDeque<StreamEvent>,
        done: bool,
    }
}

impl<S> EventStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }

    /// Lines dropped so far because their payload failed to parse.
    pub fn malformed_count(&self) -> usize {
        self.decoder.malformed_count()
    }
}

impl<S> Stream for EventStream<S>
where
    S: Stream<Item = Result<Bytes, ChatError>>,
{
    type Item = Result<StreamEvent, ChatError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(event) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if *this.done {
                return Poll::Ready(None);
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    let events = this.decoder.feed(&chunk);
                    this.ready.extend(events);
                }
                Some(Err(e)) => {
                    *this.done = true;
                    this.decoder.finish();
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    *this.done = true;
                    this.decoder.finish();
                }
            }
        }
    }
}
