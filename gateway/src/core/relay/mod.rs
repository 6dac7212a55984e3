//! Streaming relay.
//!
//! Turns an upstream [`EventStream`] into the frames of one outbound
//! `text/event-stream` response. The relay keeps at most one upstream read in
//! flight and yields one frame at a time, so the transport's own backpressure
//! decides how fast upstream events are pulled.
//!
//! # Termination
//!
//! | upstream                | frames after the last data frame | outcome     |
//! |-------------------------|----------------------------------|-------------|
//! | ends normally           | `[DONE]`                         | `Completed` |
//! | yields an error         | none                             | `Failed`    |
//! | token cancelled         | none                             | `Cancelled` |
//! | body dropped by client  | none                             | `Cancelled` |
//!
//! Failures after the response headers were sent cannot change the status
//! code, so callers only observe them as a stream that ends without `[DONE]`.

mod frame;

pub use frame::{DONE_SENTINEL, OutboundFrame};

use std::future::Future;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::core::upstream::{EventStream, UpstreamError};
use crate::errors::{AppError, AppResult};

/// Outbound frames of one response
pub type FrameStream = Pin<Box<dyn Stream<Item = OutboundFrame> + Send>>;

/// How a relayed stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

impl RelayOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayOutcome::Completed => "completed",
            RelayOutcome::Cancelled => "cancelled",
            RelayOutcome::Failed(_) => "failed",
        }
    }
}

/// Per-request relay identity and cancellation
#[derive(Debug)]
pub struct RelayContext {
    pub request_id: String,
    /// Endpoint variant for logs (`chat`, `rag`, `audio`)
    pub variant: &'static str,
    pub cancel: CancellationToken,
    outcome_tx: Option<oneshot::Sender<RelayOutcome>>,
}

impl RelayContext {
    pub fn new(request_id: impl Into<String>, variant: &'static str, cancel: CancellationToken) -> Self {
        Self {
            request_id: request_id.into(),
            variant,
            cancel,
            outcome_tx: None,
        }
    }

    /// Also deliver the final outcome to `tx` once the stream ends
    pub fn with_outcome_sender(mut self, tx: oneshot::Sender<RelayOutcome>) -> Self {
        self.outcome_tx = Some(tx);
        self
    }
}

/// Records the outcome of one stream and logs it exactly once.
///
/// Dropped without an outcome means the transport dropped the body, i.e. the
/// caller disconnected. The request token is cancelled in that case so any
/// upstream work still in flight stops too.
struct RelayGuard {
    ctx: RelayContext,
    frames: usize,
    outcome: Option<RelayOutcome>,
}

impl RelayGuard {
    fn new(ctx: RelayContext) -> Self {
        Self {
            ctx,
            frames: 0,
            outcome: None,
        }
    }

    fn record_frame(&mut self) {
        self.frames += 1;
    }

    fn finish(&mut self, outcome: RelayOutcome) {
        if self.outcome.is_some() {
            return;
        }

        let ctx = &self.ctx;
        match &outcome {
            RelayOutcome::Completed => info!(
                request_id = %ctx.request_id,
                variant = ctx.variant,
                frames = self.frames,
                outcome = outcome.as_str(),
                "Stream completed"
            ),
            RelayOutcome::Cancelled => info!(
                request_id = %ctx.request_id,
                variant = ctx.variant,
                frames = self.frames,
                outcome = outcome.as_str(),
                "Stream was cancelled"
            ),
            RelayOutcome::Failed(reason) => error!(
                request_id = %ctx.request_id,
                variant = ctx.variant,
                frames = self.frames,
                outcome = outcome.as_str(),
                error = %reason,
                "Stream terminated early"
            ),
        }
        if let Some(tx) = self.ctx.outcome_tx.take() {
            let _ = tx.send(outcome.clone());
        }
        self.outcome = Some(outcome);
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            self.ctx.cancel.cancel();
            self.finish(RelayOutcome::Cancelled);
        }
    }
}

/// Relay events from `open` to the caller, preceded by `lead` frames.
///
/// `lead` frames are emitted before `open` is polled. `open` resolves to the
/// event source; if it fails, the stream ends after the lead frames with no
/// sentinel. Every suspension point races against `ctx.cancel`.
pub fn relay<F>(ctx: RelayContext, lead: Vec<OutboundFrame>, open: F) -> FrameStream
where
    F: Future<Output = AppResult<EventStream>> + Send + 'static,
{
    let cancel = ctx.cancel.clone();

    Box::pin(async_stream::stream! {
        let mut guard = RelayGuard::new(ctx);

        for frame in lead {
            if cancel.is_cancelled() {
                guard.finish(RelayOutcome::Cancelled);
                return;
            }
            guard.record_frame();
            yield frame;
        }

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            opened = open => opened,
        };
        let mut events = match opened {
            Ok(events) => events,
            Err(AppError::Cancelled) => {
                guard.finish(RelayOutcome::Cancelled);
                return;
            }
            Err(err) => {
                guard.finish(RelayOutcome::Failed(err.to_string()));
                return;
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => Some(Err(UpstreamError::Cancelled)),
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    tracing::trace!(kind = event.kind().as_str(), "Relaying event");
                    guard.record_frame();
                    yield OutboundFrame::Data(event.into_payload());
                }
                Some(Err(UpstreamError::Cancelled)) => {
                    guard.finish(RelayOutcome::Cancelled);
                    break;
                }
                Some(Err(err)) => {
                    guard.finish(RelayOutcome::Failed(err.to_string()));
                    break;
                }
                None => {
                    guard.record_frame();
                    guard.finish(RelayOutcome::Completed);
                    yield OutboundFrame::Done;
                    break;
                }
            }
        }
    })
}

/// Relay an already opened event stream with no lead frames
pub fn relay_opened(ctx: RelayContext, events: EventStream) -> FrameStream {
    relay(ctx, Vec::new(), std::future::ready(Ok(events)))
}
