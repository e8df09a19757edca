use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct AdvanceSignal {
    fired: AtomicBool,
    notify: Notify,
}

/// One-shot wakeup tied to a single track.
///
/// The worker waits on it while the track plays; the player's completion
/// callback and transport controls fire it. Firing is idempotent and the
/// handle is never reused for another track, so late or duplicate signals
/// cannot advance the worker past the track they belong to.
#[derive(Debug, Clone, Default)]
pub struct AdvanceHandle {
    signal: Arc<AdvanceSignal>,
}

impl AdvanceHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wakes the waiting worker. Returns `false` if the handle had already fired.
    pub fn fire(&self) -> bool {
        if self.signal.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        // notify_one stores a permit when nobody is waiting yet
        self.signal.notify.notify_one();
        true
    }

    pub fn has_fired(&self) -> bool {
        self.signal.fired.load(Ordering::Acquire)
    }

    /// Resolves once the handle has fired.
    pub async fn wait(&self) {
        if self.has_fired() {
            return;
        }
        self.signal.notify.notified().await;
    }
}
