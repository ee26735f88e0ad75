//! Cooperative shutdown signal shared by every pipeline in a session.
//!
//! One controller, many signals. Every suspension point in the system (queue
//! pops, the keepalive tick, window loops) selects against its signal, so a
//! single `trigger` stops all capture and processing without joining on
//! anything that might be blocked.

use tokio::sync::watch;

/// Owning side of the shutdown signal.
///
/// Clones share the same underlying flag, so the emitter can hold one to
/// trip the session when the connection dies.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    /// Hand out a signal for a pipeline or queue to observe.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Fire the signal. Idempotent.
    pub fn trigger(&self) {
        // send_replace never fails even with no receivers alive.
        self.tx.send_replace(true);
    }

    /// True once the signal has fired.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Observing side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// True once the signal has fired.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the signal fires. Returns immediately if it already has.
    pub async fn triggered(&mut self) {
        // wait_for only errs when the sender is gone, which also means the
        // session is over; treat it the same as a trigger.
        let _ = self.rx.wait_for(|fired| *fired).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn signal_starts_untriggered() {
        let controller = ShutdownController::new();
        assert!(!controller.is_triggered());
        assert!(!controller.signal().is_triggered());
    }

    #[tokio::test]
    async fn trigger_is_seen_by_all_signals() {
        let controller = ShutdownController::new();
        let first = controller.signal();
        let second = controller.signal();

        controller.trigger();

        assert!(first.is_triggered());
        assert!(second.is_triggered());
    }

    #[tokio::test]
    async fn triggered_returns_immediately_after_the_fact() {
        let controller = ShutdownController::new();
        controller.trigger();

        let mut signal = controller.signal();
        tokio::time::timeout(Duration::from_millis(100), signal.triggered())
            .await
            .expect("triggered() should resolve for an already-fired signal");
    }

    #[tokio::test]
    async fn triggered_wakes_a_waiting_task() {
        let controller = ShutdownController::new();
        let mut signal = controller.signal();

        let waiter = tokio::spawn(async move {
            signal.triggered().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.trigger();

        tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn cloned_controllers_share_the_flag() {
        let controller = ShutdownController::new();
        let clone = controller.clone();

        clone.trigger();
        assert!(controller.is_triggered());
    }

    #[tokio::test]
    async fn trigger_is_idempotent() {
        let controller = ShutdownController::new();
        controller.trigger();
        controller.trigger();
        assert!(controller.is_triggered());
    }
}
