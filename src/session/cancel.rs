//! Cooperative cancellation token with an abort cause.
//!
//! The session checks the token before every await on the next chunk
//! and before applying each buffered frame; the timeout timer and the
//! explicit cancel affordance both fire the same token with different
//! causes. Re-armed at the start of each exchange, so a stale cancel
//! from a previous turn cannot leak into the next one.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

use super::state::AbortCause;

#[derive(Debug, Default)]
struct Inner {
    cause: Mutex<Option<AbortCause>>,
    notify: Notify,
}

/// Cloneable cancellation token. All clones share one state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    /// Create an unfired token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token. The first cause wins; returns whether this call
    /// was the one that fired it.
    pub fn fire(&self, cause: AbortCause) -> bool {
        let mut slot = self
            .inner
            .cause
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(cause);
        drop(slot);
        self.inner.notify.notify_waiters();
        true
    }

    /// Re-arm for a new exchange.
    pub fn reset(&self) {
        let mut slot = self
            .inner
            .cause
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// The cause, if fired.
    pub fn cause(&self) -> Option<AbortCause> {
        *self
            .inner
            .cause
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the token has fired.
    pub fn is_fired(&self) -> bool {
        self.cause().is_some()
    }

    /// Wait until the token fires.
    pub async fn fired(&self) -> AbortCause {
        loop {
            // Register interest before checking, so a fire between the
            // check and the await cannot be missed.
            let notified = self.inner.notify.notified();
            if let Some(cause) = self.cause() {
                return cause;
            }
            notified.await;
        }
    }
}
