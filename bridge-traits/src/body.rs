//! Single-consumption response body
//!
//! The transport hands a response body over as a stream of chunks that can be
//! read to completion exactly once. Every component that wants to look at the
//! bytes for a side effect (logging, metrics) has two legal options:
//!
//! - [`Body::buffer`]: drain the stream into memory and leave the buffered
//!   copy in place so later readers see the same bytes.
//! - [`Body::tee`]: split the body into two independent halves, each yielding
//!   the full original byte sequence.
//!
//! [`Body::take`] is the destructive hand-off. Whoever takes the body owns the
//! only copy, and the original slot is left [`consumed`](Body::is_consumed):
//! reading it afterwards yields zero bytes.
//!
//! ```ignore
//! use bridge_traits::body::Body;
//!
//! let mut body = Body::from_stream(stream);
//! let logged = body.buffer().await?;      // body still holds the bytes
//! let parsed = body.collect().await?;     // same bytes as `logged`
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Waker};

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream, StreamExt};

use crate::error::Result;

/// Boxed chunk stream as delivered by a transport.
pub type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'static>>;

/// Response body that can be read to completion at most once unless buffered.
pub struct Body {
    state: BodyState,
}

enum BodyState {
    Empty,
    Buffered(Bytes),
    Streaming(BodyStream),
    /// A destructive reader already took the bytes.
    Consumed,
}

impl Body {
    pub fn empty() -> Self {
        Self {
            state: BodyState::Empty,
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            state: BodyState::Buffered(bytes.into()),
        }
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            state: BodyState::Streaming(Box::pin(stream)),
        }
    }

    /// Split a buffered payload into a stream of `chunk_size` pieces.
    ///
    /// Mostly useful for feeding deterministic streams into tests.
    pub fn chunked(bytes: impl Into<Bytes>, chunk_size: usize) -> Self {
        let bytes = bytes.into();
        let chunk_size = chunk_size.max(1);
        let chunks: Vec<io::Result<Bytes>> = (0..bytes.len())
            .step_by(chunk_size)
            .map(|start| Ok(bytes.slice(start..(start + chunk_size).min(bytes.len()))))
            .collect();
        Self::from_stream(stream::iter(chunks))
    }

    /// Empty and buffered bodies can be read any number of times.
    pub fn is_replayable(&self) -> bool {
        matches!(self.state, BodyState::Empty | BodyState::Buffered(_))
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state, BodyState::Streaming(_))
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self.state, BodyState::Consumed)
    }

    /// Exact length when known without reading the stream.
    pub fn size_hint(&self) -> Option<usize> {
        match &self.state {
            BodyState::Empty | BodyState::Consumed => Some(0),
            BodyState::Buffered(bytes) => Some(bytes.len()),
            BodyState::Streaming(_) => None,
        }
    }

    /// Borrow the bytes of a buffered body.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.state {
            BodyState::Buffered(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Move the body out, leaving this slot consumed.
    pub fn take(&mut self) -> Body {
        Body {
            state: std::mem::replace(&mut self.state, BodyState::Consumed),
        }
    }

    /// Read the body to completion.
    ///
    /// A consumed body collects to zero bytes rather than an error: that is
    /// exactly what a stage downstream of a destructive reader observes.
    pub async fn collect(self) -> Result<Bytes> {
        match self.state {
            BodyState::Empty | BodyState::Consumed => Ok(Bytes::new()),
            BodyState::Buffered(bytes) => Ok(bytes),
            BodyState::Streaming(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Drain the body into memory, keep the buffered copy and return the bytes.
    ///
    /// On a stream error the partially read bytes are discarded and the body
    /// is left consumed; callers get the error, never a truncated payload.
    pub async fn buffer(&mut self) -> Result<Bytes> {
        match &self.state {
            BodyState::Buffered(bytes) => return Ok(bytes.clone()),
            BodyState::Empty | BodyState::Consumed => return Ok(Bytes::new()),
            BodyState::Streaming(_) => {}
        }

        let bytes = self.take().collect().await?;
        self.state = BodyState::Buffered(bytes.clone());
        Ok(bytes)
    }

    /// Split into two bodies that each yield the full original bytes.
    ///
    /// Streams are split lazily: whichever half is polled first pulls the
    /// next chunk from the source and queues a copy for the other half. A
    /// half that lags behind accumulates its queue in memory.
    pub fn tee(self) -> (Body, Body) {
        match self.state {
            BodyState::Empty => (Body::empty(), Body::empty()),
            BodyState::Consumed => (
                Body {
                    state: BodyState::Consumed,
                },
                Body {
                    state: BodyState::Consumed,
                },
            ),
            BodyState::Buffered(bytes) => {
                (Body::from_bytes(bytes.clone()), Body::from_bytes(bytes))
            }
            BodyState::Streaming(source) => {
                let shared = Arc::new(Mutex::new(TeeShared {
                    source: Some(source),
                    queues: [VecDeque::new(), VecDeque::new()],
                    wakers: [None, None],
                    closed: [false, false],
                }));
                let left = TeeHalf {
                    side: 0,
                    shared: Arc::clone(&shared),
                };
                let right = TeeHalf { side: 1, shared };
                (Body::from_stream(left), Body::from_stream(right))
            }
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            BodyState::Empty => f.write_str("Body::Empty"),
            BodyState::Buffered(bytes) => f
                .debug_struct("Body::Buffered")
                .field("len", &bytes.len())
                .finish(),
            BodyState::Streaming(_) => f.write_str("Body::Streaming"),
            BodyState::Consumed => f.write_str("Body::Consumed"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::from_bytes(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::from_bytes(text)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::from_bytes(Bytes::from_static(text.as_bytes()))
    }
}

enum TeeItem {
    Chunk(Bytes),
    Error(io::ErrorKind, String),
}

impl TeeItem {
    fn into_result(self) -> io::Result<Bytes> {
        match self {
            TeeItem::Chunk(bytes) => Ok(bytes),
            TeeItem::Error(kind, message) => Err(io::Error::new(kind, message)),
        }
    }
}

struct TeeShared {
    source: Option<BodyStream>,
    queues: [VecDeque<TeeItem>; 2],
    wakers: [Option<Waker>; 2],
    closed: [bool; 2],
}

impl TeeShared {
    fn forward(&mut self, to: usize, item: TeeItem) {
        if !self.closed[to] {
            self.queues[to].push_back(item);
        }
        self.wake(to);
    }

    fn wake(&mut self, side: usize) {
        if let Some(waker) = self.wakers[side].take() {
            waker.wake();
        }
    }
}

struct TeeHalf {
    side: usize,
    shared: Arc<Mutex<TeeShared>>,
}

impl Stream for TeeHalf {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let side = self.side;
        let other = 1 - side;
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(item) = shared.queues[side].pop_front() {
            return Poll::Ready(Some(item.into_result()));
        }

        let Some(source) = shared.source.as_mut() else {
            return Poll::Ready(None);
        };

        let polled = source.as_mut().poll_next(cx);
        match polled {
            Poll::Ready(Some(Ok(chunk))) => {
                shared.forward(other, TeeItem::Chunk(chunk.clone()));
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                shared.forward(other, TeeItem::Error(err.kind(), err.to_string()));
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                shared.source = None;
                shared.wake(other);
                Poll::Ready(None)
            }
            Poll::Pending => {
                // The source only remembers the latest waker; park ours so the
                // other half can wake us when it pulls a chunk on our behalf.
                shared.wakers[side] = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl Drop for TeeHalf {
    fn drop(&mut self) {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        let side = self.side;
        shared.closed[side] = true;
        shared.queues[side].clear();
        shared.wakers[side] = None;
        shared.wake(1 - side);
    }
}
