//! Marshaling of extractor completions back to the owning strip

use crate::{ExtractError, Thumbnail};
use crossbeam_channel::Sender;
use filmstrip_core::RationalTime;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identifier of one generation session. Strictly increasing per strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared cancellation flag for one session
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the session as cancelled; visible to every clone
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A successfully extracted frame
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    /// Frame image at the requested pixel size
    pub image: Thumbnail,
    /// Time the frame actually came from; may differ from the requested time
    pub actual_time: RationalTime,
}

/// One extraction result, tagged with the session that requested it
#[derive(Debug)]
pub struct FrameEvent {
    pub session: SessionId,
    /// Timestamp as it appeared in the request
    pub requested: RationalTime,
    pub result: Result<ExtractedFrame, ExtractError>,
}

/// Handle an extractor uses to report frames for one session.
///
/// Deliveries are queued for the owner thread and applied one at a time.
/// Once the session is cancelled, or the owning strip is gone, delivering is
/// a no-op.
#[derive(Debug, Clone)]
pub struct FrameSink {
    session: SessionId,
    token: CancellationToken,
    tx: Sender<FrameEvent>,
}

impl FrameSink {
    pub fn new(session: SessionId, token: CancellationToken, tx: Sender<FrameEvent>) -> Self {
        Self { session, token, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Token extractors may poll to stop work early
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Queues a result. Returns false if it was dropped.
    pub fn deliver(
        &self,
        requested: RationalTime,
        result: Result<ExtractedFrame, ExtractError>,
    ) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.tx
            .send(FrameEvent {
                session: self.session,
                requested,
                result,
            })
            .is_ok()
    }

    /// Queues a successfully extracted frame
    pub fn frame(&self, requested: RationalTime, actual_time: RationalTime, image: Thumbnail) -> bool {
        self.deliver(requested, Ok(ExtractedFrame { image, actual_time }))
    }

    /// Queues a failure for one timestamp
    pub fn failure(&self, requested: RationalTime, error: ExtractError) -> bool {
        self.deliver(requested, Err(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use image::RgbaImage;

    #[test]
    fn test_cancelled_sink_drops_deliveries() {
        let (tx, rx) = unbounded();
        let token = CancellationToken::new();
        let sink = FrameSink::new(SessionId(3), token.clone(), tx);

        let image = Arc::new(RgbaImage::new(4, 4));
        let at = RationalTime::from_millis(10);
        assert!(sink.frame(at, at, image.clone()));
        token.cancel();
        assert!(!sink.frame(at, at, image));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session, SessionId(3));
    }

    #[test]
    fn test_delivery_after_owner_dropped() {
        let (tx, rx) = unbounded();
        let sink = FrameSink::new(SessionId(1), CancellationToken::new(), tx);
        drop(rx);
        assert!(!sink.failure(RationalTime::zero(), ExtractError::Decode("eof".into())));
    }
}
