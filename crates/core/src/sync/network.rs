//! Connectivity observation for sync triggering.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl NetworkStatus {
    pub fn is_online(self) -> bool {
        self == Self::Online
    }
}

/// Reports current connectivity and notifies on transitions.
///
/// The watch channel fires at most once per actual transition; repeated
/// identical states are deduplicated at the sender. Failures during a sync
/// attempt are the ground truth, not the monitor's guess.
pub trait NetworkMonitor: Send + Sync {
    fn current_status(&self) -> NetworkStatus;

    /// Receiver observing connectivity transitions.
    fn watch(&self) -> watch::Receiver<NetworkStatus>;
}

/// Monitor fed by the embedding platform's connectivity probe.
///
/// When no probe ever reports, the monitor stays at its constructed default.
/// [`SharedNetworkMonitor::assume_online`] is the degraded fallback for
/// platforms without a usable connectivity API: sync is attempted and its
/// failures drive the retry machinery instead.
pub struct SharedNetworkMonitor {
    tx: watch::Sender<NetworkStatus>,
}

impl SharedNetworkMonitor {
    pub fn new(initial: NetworkStatus) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn assume_online() -> Self {
        Self::new(NetworkStatus::Online)
    }

    /// Record a connectivity report. Identical repeated states do not notify.
    pub fn set_status(&self, status: NetworkStatus) {
        self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

impl NetworkMonitor for SharedNetworkMonitor {
    fn current_status(&self) -> NetworkStatus {
        *self.tx.borrow()
    }

    fn watch(&self) -> watch::Receiver<NetworkStatus> {
        self.tx.subscribe()
    }
}
