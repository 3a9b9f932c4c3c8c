//! The task that drives one streaming session.

use std::fmt::Display;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::classify::{classify, ClassifiedFrame};
use super::decode::{Disposition, Protocol};
use super::reader::FrameReader;
use crate::error::StreamError;

/// One unit of stream output: a decoded event or the terminal error.
pub type StreamOutcome<E> = Result<E, StreamError>;

/// Pump lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpState {
    /// The first line has not been read yet; it may be a bare error object.
    AwaitingFirstLine,
    Streaming,
    /// Cancellation was observed; nothing more is delivered.
    Draining,
    Closed,
}

/// Outcome of handing one item to the consumer.
enum Delivery {
    Delivered,
    Cancelled,
    ConsumerGone,
}

/// State owned by the pump task for the lifetime of one stream.
///
/// Dropping the session drops the reader and with it the transport body.
struct StreamSession<P, S> {
    reader: FrameReader<S>,
    state: PumpState,
    lines_read: u64,
    delivered: u64,
    _protocol: PhantomData<fn() -> P>,
}

impl<P, S, E> StreamSession<P, S>
where
    P: Protocol,
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display,
{
    fn new(source: S) -> Self {
        Self {
            reader: FrameReader::new(source),
            state: PumpState::AwaitingFirstLine,
            lines_read: 0,
            delivered: 0,
            _protocol: PhantomData,
        }
    }

    async fn run(
        mut self,
        tx: mpsc::Sender<StreamOutcome<P::Event>>,
        cancel: CancellationToken,
    ) {
        tracing::debug!(protocol = P::NAME, "stream session opened");

        while self.state != PumpState::Closed {
            self.state = self.step(&tx, &cancel).await;
        }

        tracing::debug!(
            protocol = P::NAME,
            lines = self.lines_read,
            delivered = self.delivered,
            cancelled = cancel.is_cancelled(),
            "stream session closed"
        );
        // `self` and `tx` drop here, closing the transport and the channel.
    }

    async fn step(
        &mut self,
        tx: &mpsc::Sender<StreamOutcome<P::Event>>,
        cancel: &CancellationToken,
    ) -> PumpState {
        match self.state {
            PumpState::AwaitingFirstLine | PumpState::Streaming => {}
            PumpState::Draining => {
                tracing::debug!(protocol = P::NAME, "stream cancelled, discarding input");
                return PumpState::Closed;
            }
            PumpState::Closed => return PumpState::Closed,
        }

        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PumpState::Draining,
            read = self.reader.next_line() => read,
        };
        // A read that completed while cancellation fired is discarded.
        if cancel.is_cancelled() {
            return PumpState::Draining;
        }

        let line = match read {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::debug!(protocol = P::NAME, "end of stream");
                return PumpState::Closed;
            }
            Err(err) => {
                tracing::warn!(protocol = P::NAME, error = %err, "stream read failed");
                self.deliver(tx, cancel, Err(err)).await;
                return PumpState::Closed;
            }
        };

        let first_line = self.state == PumpState::AwaitingFirstLine;
        self.lines_read += 1;

        match classify(&line, first_line) {
            ClassifiedFrame::Ignorable => {
                tracing::trace!(protocol = P::NAME, "ignoring line");
                PumpState::Streaming
            }
            ClassifiedFrame::ErrorFrame(err) => {
                tracing::warn!(protocol = P::NAME, code = %err.code, message = %err.message, "upstream returned an error");
                self.deliver(tx, cancel, Err(StreamError::Upstream(err)))
                    .await;
                PumpState::Closed
            }
            ClassifiedFrame::DataFrame(payload) => match P::decode(payload) {
                Err(err) => {
                    tracing::warn!(protocol = P::NAME, error = %err, "failed to decode event");
                    self.deliver(tx, cancel, Err(err)).await;
                    PumpState::Closed
                }
                Ok(event) => match P::disposition(&event) {
                    Disposition::Continue => match self.deliver(tx, cancel, Ok(event)).await {
                        Delivery::Delivered => PumpState::Streaming,
                        Delivery::Cancelled => PumpState::Draining,
                        Delivery::ConsumerGone => PumpState::Closed,
                    },
                    Disposition::DeliverThenClose => {
                        tracing::debug!(protocol = P::NAME, "terminal event");
                        self.deliver(tx, cancel, Ok(event)).await;
                        PumpState::Closed
                    }
                    Disposition::CloseSilently => {
                        tracing::debug!(protocol = P::NAME, "end-of-answer marker");
                        PumpState::Closed
                    }
                },
            },
        }
    }

    /// Hand one outcome to the consumer, waiting for room in the channel.
    async fn deliver(
        &mut self,
        tx: &mpsc::Sender<StreamOutcome<P::Event>>,
        cancel: &CancellationToken,
        outcome: StreamOutcome<P::Event>,
    ) -> Delivery {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Delivery::Cancelled,
            sent = tx.send(outcome) => match sent {
                Ok(()) => {
                    self.delivered += 1;
                    Delivery::Delivered
                }
                Err(_) => {
                    tracing::debug!(protocol = P::NAME, "consumer dropped the stream");
                    Delivery::ConsumerGone
                }
            },
        }
    }
}

/// Spawn a pump task decoding `source` with protocol `P`.
///
/// Must be called from within a Tokio runtime. The pump stops when `cancel`
/// (or the returned stream's own token) is cancelled, when the returned
/// stream is dropped, or when the input ends.
pub fn spawn_pump<P, S, E>(source: S, cancel: &CancellationToken) -> EventStream<P::Event>
where
    P: Protocol,
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    // Single-slot handoff: at most one outcome waits ahead of the consumer.
    let (tx, rx) = mpsc::channel(1);
    let token = cancel.child_token();
    let session = StreamSession::<P, S>::new(source);
    tokio::spawn(session.run(tx, token.clone()));
    EventStream { rx, cancel: token }
}

/// Consumer side of a streaming session.
///
/// Yields outcomes in arrival order. A terminal error, if any, is the last
/// item. Once cancelled, the stream yields nothing more.
#[must_use = "streams do nothing unless polled"]
pub struct EventStream<E> {
    rx: mpsc::Receiver<StreamOutcome<E>>,
    cancel: CancellationToken,
}

impl<E> EventStream<E> {
    /// Stop the session. Nothing is yielded after this call.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the session has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token controlling this session; cancelling it stops the pump.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl<E> Stream for EventStream<E> {
    type Item = StreamOutcome<E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancel.is_cancelled() {
            this.rx.close();
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

impl<E> Drop for EventStream<E> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<E> std::fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
