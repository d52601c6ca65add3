//! Shutdown coordination for the service.

use std::sync::Arc;

use tokio::sync::watch;

/// Coordinator for graceful shutdown.
///
/// A single-slot `watch` channel: the first trigger flips it, every listener
/// (including ones subscribing afterwards) observes the flip. Dropping every
/// `Shutdown` handle counts as a trigger for the listeners.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Returns `false` if it was already
    /// triggered.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|triggered| {
            if *triggered {
                false
            } else {
                *triggered = true;
                true
            }
        })
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolve once shutdown has been triggered. Cancel safe.
    pub async fn recv(&mut self) {
        // An error means every coordinator is gone; nobody can trigger any
        // more, so stop as if triggered.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn late_subscriber_sees_trigger() {
        let shutdown = Shutdown::new();
        assert!(shutdown.trigger());
        assert!(!shutdown.trigger());

        let mut listener = shutdown.subscribe();
        tokio::time::timeout(Duration::from_millis(100), listener.recv())
            .await
            .expect("listener should resolve immediately");
        assert!(listener.is_triggered());
    }

    #[tokio::test]
    async fn listener_waits_for_trigger() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.subscribe();

        let pending = tokio::time::timeout(Duration::from_millis(50), listener.recv()).await;
        assert!(pending.is_err());

        let trigger = shutdown.clone();
        tokio::spawn(async move { trigger.trigger() });
        tokio::time::timeout(Duration::from_secs(1), listener.recv())
            .await
            .expect("listener should resolve after trigger");
    }

    #[tokio::test]
    async fn dropping_coordinator_releases_listeners() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.subscribe();
        drop(shutdown);

        tokio::time::timeout(Duration::from_millis(100), listener.recv())
            .await
            .expect("listener should resolve once the sender is gone");
    }
}
