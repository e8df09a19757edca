use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;
use tracing::debug;

use super::track::TrackEntry;

/// Unbounded FIFO of track entries for one guild.
///
/// Any number of producers may enqueue; a single consumer (the guild's
/// worker) dequeues and is the only side that ever waits.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    items: Mutex<VecDeque<TrackEntry>>,
    available: Notify,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the tail. Never blocks.
    pub fn enqueue(&self, entry: TrackEntry) {
        let len = {
            let mut items = self.items.lock();
            items.push_back(entry);
            items.len()
        };
        debug!("➕ Track enqueued, {} waiting", len);
        self.available.notify_one();
    }

    /// Removes the head, waiting until an entry is available.
    ///
    /// Cancel safe: an entry is only taken once the future completes.
    pub async fn dequeue(&self) -> TrackEntry {
        loop {
            if let Some(entry) = self.items.lock().pop_front() {
                return entry;
            }
            self.available.notified().await;
        }
    }

    pub fn try_dequeue(&self) -> Option<TrackEntry> {
        self.items.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Human-readable descriptions of the first `limit` waiting entries.
    pub fn describe(&self, limit: usize) -> Vec<String> {
        self.items
            .lock()
            .iter()
            .take(limit)
            .map(ToString::to_string)
            .collect()
    }

    /// Drops every waiting entry, returning how many were discarded.
    pub fn clear(&self) -> usize {
        let mut items = self.items.lock();
        let dropped = items.len();
        items.clear();
        dropped
    }
}
