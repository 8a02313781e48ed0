//! Transient user-facing notifications
//!
//! Toasts sit outside the bus catalogue: they are fire-and-forget hints for
//! whatever UI layer is listening, delivered over a bounded broadcast channel.
//! Slow receivers lag and lose the oldest toasts.

use roster_core::{FailureKind, ToastLevel};
use tokio::sync::broadcast;
use tracing::debug;

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Severity.
    pub level: ToastLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Toast {
    /// Toast at `level`.
    pub fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Broadcast queue of [`Toast`]s.
#[derive(Debug, Clone)]
pub struct ToastQueue {
    tx: broadcast::Sender<Toast>,
}

impl ToastQueue {
    /// Queue retaining at most `capacity` undelivered toasts per receiver.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every toast published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.tx.subscribe()
    }

    /// Publish `toast`; dropped silently when nobody listens.
    pub fn publish(&self, toast: Toast) {
        if self.tx.send(toast).is_err() {
            debug!("toast dropped, no subscribers");
        }
    }

    /// Publish `message` at the severity `failure` calls for.
    ///
    /// Failures that never surface as toasts are only logged.
    pub fn raise(&self, failure: FailureKind, message: impl Into<String>) {
        match failure.toast_level() {
            Some(level) => self.publish(Toast::new(level, message)),
            None => debug!(%failure, "failure kind is not shown as a toast"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_toasts() {
        let queue = ToastQueue::new(4);
        let mut rx = queue.subscribe();

        queue.raise(FailureKind::SwitchFailure, "switch failed");

        let toast = rx.recv().await.unwrap();
        assert_eq!(toast.level, ToastLevel::Error);
        assert_eq!(toast.message, "switch failed");
    }

    #[tokio::test]
    async fn silent_failure_kinds_raise_nothing() {
        let queue = ToastQueue::new(4);
        let mut rx = queue.subscribe();

        queue.raise(FailureKind::SilentRefreshFailure, "refresh failed");

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        ToastQueue::new(1).publish(Toast::new(ToastLevel::Info, "hello"));
    }

    #[tokio::test]
    async fn lagging_receiver_skips_oldest() {
        let queue = ToastQueue::new(1);
        let mut rx = queue.subscribe();
        queue.publish(Toast::new(ToastLevel::Warning, "first"));
        queue.publish(Toast::new(ToastLevel::Warning, "second"));

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.unwrap().message, "second");
    }
}
