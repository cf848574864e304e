//! Unix signal wiring for the daemon.
//!
//! SIGTERM and SIGINT latch a shutdown flag; SIGHUP bumps a reload
//! generation counter so every reload is observed even when several arrive
//! close together. The daemon holds a [`Signals`] instance, hands
//! [`ShutdownHandle`]s to tasks that need to stop or be stopped, and drives
//! registry reloads from a [`ReloadWatcher`].

use std::sync::Arc;

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::info;

/// Owner of the daemon's signal state.
pub struct Signals {
    shutdown_tx: Arc<watch::Sender<bool>>,
    reload_tx: Arc<watch::Sender<u64>>,
}

impl Signals {
    /// Creates the signal state and spawns the OS signal listener.
    ///
    /// Must run inside a tokio runtime.
    pub fn install() -> Self {
        let signals = Self::disconnected();
        signals.spawn_listener();
        signals
    }

    /// Signal state without an OS listener attached.
    fn disconnected() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (reload_tx, _) = watch::channel(0u64);
        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            reload_tx: Arc::new(reload_tx),
        }
    }

    fn spawn_listener(&self) {
        let shutdown_tx = Arc::clone(&self.shutdown_tx);
        let reload_tx = Arc::clone(&self.reload_tx);

        tokio::spawn(async move {
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
            let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

            loop {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("received SIGTERM, shutting down");
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    _ = sigint.recv() => {
                        info!("received SIGINT, shutting down");
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    _ = sighup.recv() => {
                        info!("received SIGHUP, reloading");
                        reload_tx.send_modify(|generation| *generation += 1);
                    }
                }
            }
        });
    }

    /// Handle for triggering and awaiting shutdown.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Watcher that yields once per reload request.
    pub fn reload_watcher(&self) -> ReloadWatcher {
        ReloadWatcher {
            rx: self.reload_tx.subscribe(),
        }
    }
}

/// Cloneable handle to the daemon's shutdown flag.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Latches the shutdown flag.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once shutdown is requested.
    ///
    /// Also resolves if the flag's owner goes away, so a waiting task never
    /// outlives the daemon.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Receiver side of the reload generation counter.
pub struct ReloadWatcher {
    rx: watch::Receiver<u64>,
}

impl ReloadWatcher {
    /// Waits for the next reload request.
    ///
    /// Returns `false` once the signal state is gone and no further reloads
    /// can arrive.
    pub async fn next(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_handle_round_trip() {
        let signals = Signals::disconnected();
        let handle = signals.shutdown_handle();

        assert!(!handle.is_triggered());
        handle.trigger();
        assert!(handle.is_triggered());

        let clone = handle.clone();
        assert!(clone.is_triggered());
    }

    #[tokio::test]
    async fn triggered_future_resolves_on_trigger() {
        let signals = Signals::disconnected();
        let handle = signals.shutdown_handle();

        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.triggered().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.trigger();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("triggered future never resolved")
            .unwrap();
    }

    #[tokio::test]
    async fn triggered_resolves_immediately_when_already_set() {
        let signals = Signals::disconnected();
        let handle = signals.shutdown_handle();
        handle.trigger();

        tokio::time::timeout(Duration::from_millis(100), handle.triggered())
            .await
            .expect("triggered future never resolved");
    }

    #[tokio::test]
    async fn consecutive_reloads_are_each_observed() {
        let signals = Signals::disconnected();
        let mut watcher = signals.reload_watcher();

        signals.reload_tx.send_modify(|generation| *generation += 1);
        signals.reload_tx.send_modify(|generation| *generation += 1);

        assert!(watcher.next().await);

        signals.reload_tx.send_modify(|generation| *generation += 1);
        assert!(watcher.next().await);
    }

    #[tokio::test]
    async fn watcher_ends_when_signal_state_dropped() {
        let signals = Signals::disconnected();
        let mut watcher = signals.reload_watcher();

        drop(signals);
        assert!(!watcher.next().await);
    }
}
