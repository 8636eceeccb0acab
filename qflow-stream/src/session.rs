use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::frame::{Envelope, Frame};

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("streaming session receiver has been dropped")]
    Closed,
}

/// The sender half of a request's event stream. Wraps a bounded channel so a
/// slow or absent consumer applies back-pressure instead of letting a run
/// buffer unboundedly in memory.
///
/// Every frame kind except `progress` always enqueues, blocking the caller if
/// the channel is full — charts, insights, and completion/error frames must
/// never be dropped (spec §4.10, §9). `progress` frames are allowed to
/// coalesce: when the channel has no room, the latest one replaces whatever
/// was previously buffered in a single side slot, and is flushed opportunistically
/// the next time any frame is sent.
pub struct StreamingSession {
    sender: Sender<Envelope>,
    next_seq: AtomicU64,
    pending_progress: Mutex<Option<Frame>>,
}

impl StreamingSession {
    pub fn new(capacity: usize) -> (Self, Receiver<Envelope>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender, next_seq: AtomicU64::new(0), pending_progress: Mutex::new(None) }, receiver)
    }

    fn assign_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Attempts to drain a buffered progress frame into the channel. Never blocks;
    /// leaves the frame buffered if the channel is still full.
    fn try_flush_pending(&self) {
        let mut slot = self.pending_progress.lock().unwrap_or_else(|e| e.into_inner());
        let Some(frame) = slot.take() else { return };
        let envelope = Envelope { seq: self.assign_seq(), frame };
        if let Err(TrySendError::Full(envelope)) = self.sender.try_send(envelope) {
            *slot = Some(envelope.frame);
        }
    }

    pub async fn send(&self, frame: Frame) -> Result<(), StreamError> {
        self.try_flush_pending();
        if matches!(frame, Frame::Progress { .. }) {
            match self.sender.try_send(Envelope { seq: self.assign_seq(), frame }) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(envelope)) => {
                    *self.pending_progress.lock().unwrap_or_else(|e| e.into_inner()) = Some(envelope.frame);
                    Ok(())
                }
                Err(TrySendError::Closed(_)) => Err(StreamError::Closed),
            }
        } else {
            let envelope = Envelope { seq: self.assign_seq(), frame };
            self.sender.send(envelope).await.map_err(|_| StreamError::Closed)
        }
    }
}
