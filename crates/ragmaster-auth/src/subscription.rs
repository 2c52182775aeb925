//! Cancellable handle over the backend's auth event stream.

use crate::types::AuthEvent;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

/// Receives backend auth events until closed.
///
/// Lagging behind is not fatal: skipped events are logged and the next
/// available one is returned.
pub struct AuthEventSubscription {
    receiver: Option<broadcast::Receiver<AuthEvent>>,
}

impl AuthEventSubscription {
    pub fn new(receiver: broadcast::Receiver<AuthEvent>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// Next event if one is queued.
    pub fn try_recv(&mut self) -> Option<AuthEvent> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Auth event subscriber lagged");
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Wait for the next event. Returns `None` once closed.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Auth event subscriber lagged");
                }
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Stop receiving. Further calls return `None`.
    pub fn close(&mut self) {
        if self.receiver.take().is_some() {
            debug!("Auth event subscription closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.receiver.is_none()
    }
}
