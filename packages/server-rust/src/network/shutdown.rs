//! Shutdown signalling and connection draining.
//!
//! Teardown is coordinated by two channels rather than shared state: a
//! `watch` channel broadcasts the stop signal to every connection task, and
//! an `mpsc` channel tracks task lifetimes. Each task carries a clone of
//! the tracking sender inside its [`ConnectionToken`]; nothing is ever sent
//! on that channel -- when the last clone drops, the receiver closes and
//! the drain is complete. No counters, no polling.

use std::time::Duration;

use tokio::sync::{mpsc, watch};

/// Owned by the accept loop; hands out one [`ConnectionToken`] per
/// accepted socket and, at the end, waits for all of them to come home.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    stop: watch::Sender<bool>,
    track: mpsc::Sender<()>,
    tracked: mpsc::Receiver<()>,
}

impl ShutdownCoordinator {
    #[must_use]
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        let (track, tracked) = mpsc::channel(1);
        Self {
            stop,
            track,
            tracked,
        }
    }

    /// Creates the handle a connection task carries for its lifetime.
    ///
    /// The token observes the stop signal and marks its connection finished
    /// when dropped, on every exit path.
    #[must_use]
    pub fn subscribe(&self) -> ConnectionToken {
        ConnectionToken {
            stop: self.stop.subscribe(),
            _done: self.track.clone(),
        }
    }

    /// Broadcasts the stop signal without waiting for connections to close.
    pub fn signal(&self) {
        let _ = self.stop.send(true);
    }

    /// Signals stop and waits until every [`ConnectionToken`] has dropped.
    ///
    /// Consumes the coordinator: its own tracking sender is dropped here,
    /// so the channel closes exactly when the last live token goes away.
    /// Returns `false` when `timeout` expired with connections still open.
    pub async fn drain(mut self, timeout: Duration) -> bool {
        let _ = self.stop.send(true);
        drop(self.track);
        tokio::time::timeout(timeout, async {
            while self.tracked.recv().await.is_some() {}
        })
        .await
        .is_ok()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-connection shutdown handle: signal receiver plus drain tracking.
#[derive(Debug)]
pub struct ConnectionToken {
    stop: watch::Receiver<bool>,
    _done: mpsc::Sender<()>,
}

impl ConnectionToken {
    /// Resolves once the server has signalled shutdown (or the coordinator
    /// is gone entirely, which means the same thing to a connection).
    ///
    /// Cancel-safe: dropping the future and calling again keeps waiting
    /// for the same signal, and a signal sent before the call still
    /// resolves it.
    pub async fn signalled(&mut self) {
        let _ = self.stop.wait_for(|stop| *stop).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_with_no_connections_is_immediate() {
        let coordinator = ShutdownCoordinator::new();
        assert!(coordinator.drain(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn drain_completes_when_the_last_token_drops() {
        let coordinator = ShutdownCoordinator::new();
        let mut token = coordinator.subscribe();
        tokio::spawn(async move {
            // Simulates a connection task: wait for the signal, then exit,
            // dropping the token.
            token.signalled().await;
        });
        assert!(coordinator.drain(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn drain_times_out_while_a_token_is_held() {
        let coordinator = ShutdownCoordinator::new();
        let _token = coordinator.subscribe();
        assert!(!coordinator.drain(Duration::from_millis(30)).await);
    }

    #[tokio::test]
    async fn signal_reaches_every_token() {
        let coordinator = ShutdownCoordinator::new();
        let mut first = coordinator.subscribe();
        let mut second = coordinator.subscribe();
        coordinator.signal();
        first.signalled().await;
        second.signalled().await;
    }

    #[tokio::test]
    async fn tokens_subscribed_after_the_signal_still_see_it() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.signal();
        let mut token = coordinator.subscribe();
        token.signalled().await;
    }

    #[tokio::test]
    async fn dropping_the_coordinator_counts_as_a_signal() {
        let coordinator = ShutdownCoordinator::new();
        let mut token = coordinator.subscribe();
        drop(coordinator);
        token.signalled().await;
    }
}
