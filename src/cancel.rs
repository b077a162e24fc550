//! Broadcast-once cancellation.
//!
//! The signal owns the only [`Sender`] of a channel that never carries a
//! message. Cancelling drops that sender, which disconnects every
//! [`CancelListener`] at once. A disconnected channel stays disconnected,
//! so the signal can never be reset.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared cancellation signal for every worker of a pipeline
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    sender: Arc<Mutex<Option<Sender<()>>>>,
    receiver: Receiver<()>,
}

impl CancellationSignal {
    /// Create a signal in the not-cancelled state
    pub fn new() -> Self {
        let (sender, receiver) = channel::bounded(0);
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
            receiver,
        }
    }

    /// Signal cancellation.
    ///
    /// Returns `true` for the call that actually signaled and `false` for
    /// every later call.
    pub fn cancel(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    /// Check whether cancellation has been signaled
    pub fn is_cancelled(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Get a listener that workers can multiplex against their input
    pub fn listener(&self) -> CancelListener {
        CancelListener {
            receiver: self.receiver.clone(),
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of a [`CancellationSignal`].
///
/// A listener does not keep the signal alive and cannot trigger it.
#[derive(Debug, Clone)]
pub struct CancelListener {
    receiver: Receiver<()>,
}

impl CancelListener {
    /// Channel that becomes ready (disconnected) once cancellation is signaled.
    ///
    /// Meant for use inside `crossbeam::select!`; any readiness means cancelled.
    pub fn channel(&self) -> &Receiver<()> {
        &self.receiver
    }

    /// Check whether cancellation has been signaled, without blocking
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.receiver.try_recv(),
            Err(channel::TryRecvError::Disconnected)
        )
    }
}
