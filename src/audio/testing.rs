//! Test doubles shared by the audio and bot test modules.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, UserId};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::Notify;

use super::{AdvanceHandle, MockVoiceLink, Notifier, Player, TrackEntry, TrackMetadata};
use crate::error::PlaybackError;

/// Player whose lifecycle is driven by the test.
#[derive(Debug, Default)]
pub struct FakePlayer {
    metadata: TrackMetadata,
    fail_start: Option<String>,
    started: AtomicBool,
    paused: AtomicBool,
    finished: AtomicBool,
    stop_calls: AtomicUsize,
    /// Audio is live: set by `start`, cleared by `stop`
    running: AtomicBool,
    entered_start: AtomicBool,
    gate: Option<Arc<Notify>>,
    volume: Mutex<f32>,
    advance: Mutex<Option<AdvanceHandle>>,
}

impl FakePlayer {
    pub fn new(title: &str) -> Arc<Self> {
        Self::with_metadata(TrackMetadata::new(title).with_uploader("tester"))
    }

    pub fn with_metadata(metadata: TrackMetadata) -> Arc<Self> {
        Arc::new(Self {
            metadata,
            volume: Mutex::new(1.0),
            ..Self::default()
        })
    }

    pub fn failing(title: &str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            metadata: TrackMetadata::new(title).with_uploader("tester"),
            fail_start: Some(message.to_string()),
            volume: Mutex::new(1.0),
            ..Self::default()
        })
    }

    /// Player whose `start` parks until the returned gate is notified.
    pub fn gated(title: &str) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let player = Arc::new(Self {
            metadata: TrackMetadata::new(title).with_uploader("tester"),
            gate: Some(gate.clone()),
            volume: Mutex::new(1.0),
            ..Self::default()
        });
        (player, gate)
    }

    /// Simulates the track reaching its natural end.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
        if let Some(advance) = self.advance.lock().clone() {
            advance.fire();
        }
    }

    pub fn entered_start(&self) -> bool {
        self.entered_start.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn was_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Player for FakePlayer {
    fn metadata(&self) -> &TrackMetadata {
        &self.metadata
    }

    async fn start(&self, on_finish: AdvanceHandle) -> Result<(), PlaybackError> {
        self.entered_start.store(true, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(message) = &self.fail_start {
            return Err(PlaybackError::Stream(message.clone()));
        }
        *self.advance.lock() = Some(on_finish);
        self.started.store(true, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    // Mirrors songbird: stopping a track raises its end event.
    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.finish();
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock() = volume;
    }
}

/// Notifier that keeps every message it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(ChannelId, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .map(|(_, content)| content.clone())
            .collect()
    }

    pub fn sent_to(&self, channel: ChannelId) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(target, _)| *target == channel)
            .map(|(_, content)| content.clone())
            .collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|(_, content)| content.contains(needle))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, channel: ChannelId, content: String) {
        self.messages.lock().push((channel, content));
    }
}

pub const TEST_CHANNEL: u64 = 500;

pub fn test_entry(title: &str, requester: u64) -> TrackEntry {
    entry_with(FakePlayer::new(title), requester)
}

pub fn entry_with(player: Arc<FakePlayer>, requester: u64) -> TrackEntry {
    TrackEntry::new(
        UserId::new(requester),
        format!("user{requester}"),
        ChannelId::new(TEST_CHANNEL),
        player,
    )
}

/// Voice link that accepts any number of moves and disconnects.
pub fn permissive_link(channel: u64) -> Arc<MockVoiceLink> {
    let mut link = MockVoiceLink::new();
    link.expect_channel().returning(move || ChannelId::new(channel));
    link.expect_move_to().returning(|_| Ok(()));
    link.expect_disconnect().returning(|| Ok(()));
    Arc::new(link)
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn eventually<F>(description: &str, condition: F)
where
    F: Fn() -> bool,
{
    let wait = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    if tokio::time::timeout(Duration::from_secs(2), wait).await.is_err() {
        panic!("timed out waiting for: {description}");
    }
}

/// Lets spawned tasks run for a short while.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
