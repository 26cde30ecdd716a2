//! The channel samples travel through during a collection cycle.
//!
//! A [`SampleSink`] has many writers and one reader ([`SampleStream`]). The
//! only [`UnboundedSender`] lives behind a mutex, so closing the sink ends the
//! stream right away even while detached writers still hold a handle to it.
//! Subcollectors never see the sink directly, they get a [`SampleSender`]
//! which also refuses writes once the cycle's [`WorkingWindow`] has closed.

use crate::sample::Sample;
use futures::Stream;
use std::{
    pin::Pin,
    sync::{
        Arc,
        Mutex,
        PoisonError,
    },
    task::{
        Context,
        Poll,
    },
    time::Duration,
};
use tokio::{
    sync::mpsc::{
        unbounded_channel,
        UnboundedReceiver,
        UnboundedSender,
    },
    time::Instant,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("sending sample after the collection window has closed")]
    WindowClosed,
    #[error("sending sample to a closed sink")]
    SinkClosed,
}

/// Deadline and cancellation signal shared by every task of one cycle.
#[derive(Debug, Clone)]
pub struct WorkingWindow {
    deadline: Instant,
    cancellation: CancellationToken,
}

impl WorkingWindow {
    pub fn new(timeout: Duration) -> Self {
        let now = Instant::now();
        // Saturate absurd timeouts instead of overflowing the clock.
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365));
        Self::until(deadline)
    }

    pub fn until(deadline: Instant) -> Self {
        Self {
            deadline,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn close(&self) {
        self.cancellation.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancellation.is_cancelled() || Instant::now() >= self.deadline
    }
}

#[derive(Debug, Clone)]
pub struct SampleSink {
    sender: Arc<Mutex<Option<UnboundedSender<Sample>>>>,
}

impl SampleSink {
    pub fn channel() -> (Self, SampleStream) {
        let (sender, receiver) = unbounded_channel();
        let sink = Self {
            sender: Arc::new(Mutex::new(Some(sender))),
        };
        (sink, SampleStream { receiver })
    }

    pub fn send(&self, sample: Sample) -> Result<(), SendError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.send(sample).map_err(|_| SendError::SinkClosed),
            None => Err(SendError::SinkClosed),
        }
    }

    /// Ends the stream once the buffered samples are read. Later sends fail.
    pub fn close(&self) {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn is_closed(&self) -> bool {
        match self.sender.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(sender) => sender.is_closed(),
            None => true,
        }
    }
}

/// Reading end of a [`SampleSink`].
#[derive(Debug)]
pub struct SampleStream {
    receiver: UnboundedReceiver<Sample>,
}

impl Stream for SampleStream {
    type Item = Sample;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Liveness checked handle on a [`SampleSink`] given to each subcollector.
#[derive(Debug, Clone)]
pub struct SampleSender {
    sink: SampleSink,
    window: WorkingWindow,
}

impl SampleSender {
    pub fn new(sink: SampleSink, window: WorkingWindow) -> Self {
        Self { sink, window }
    }

    pub fn window(&self) -> &WorkingWindow {
        &self.window
    }

    pub fn send(&self, sample: Sample) -> Result<(), SendError> {
        if self.window.is_closed() {
            return Err(SendError::WindowClosed);
        }
        self.sink.send(sample)
    }
}
