use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{collections::HashSet, sync::Arc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{AdvanceHandle, Notifier, PlaybackQueue, TrackEntry, VoiceLink};
use crate::error::PlaybackError;

/// Default number of distinct votes needed to skip someone else's track.
pub const DEFAULT_SKIP_QUORUM: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    pub skip_quorum: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            skip_quorum: DEFAULT_SKIP_QUORUM,
        }
    }
}

/// Outcome of a skip vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipVote {
    /// The requester of the current track skipped it.
    RequesterSkipped,
    /// The vote reached the quorum and the track was skipped.
    Passed { votes: usize },
    /// The vote was recorded; the track keeps playing.
    Recorded { votes: usize, quorum: usize },
    AlreadyVoted,
    NotPlaying,
}

/// Snapshot of the current track for the `playing` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub description: String,
    pub votes: usize,
    pub quorum: usize,
}

#[derive(Default)]
struct PlaybackState {
    current: Option<TrackEntry>,
    advance: Option<AdvanceHandle>,
    voice: Option<Arc<dyn VoiceLink>>,
    skip_votes: HashSet<UserId>,
}

impl PlaybackState {
    fn is_playing(&self) -> bool {
        self.voice.is_some()
            && self
                .current
                .as_ref()
                .is_some_and(|entry| !entry.player.is_finished())
    }

    /// Stops the current player and wakes the worker. Caller checks `is_playing`.
    fn force_skip(&mut self) {
        self.skip_votes.clear();
        if let Some(entry) = &self.current {
            entry.player.stop();
        }
        if let Some(advance) = &self.advance {
            advance.fire();
        }
    }

    /// Clears per-track state once the worker leaves a track.
    fn finish_track(&mut self) -> Option<TrackEntry> {
        self.advance = None;
        self.skip_votes.clear();
        self.current.take()
    }
}

struct WorkerInner {
    guild_id: GuildId,
    settings: WorkerSettings,
    queue: PlaybackQueue,
    state: Mutex<PlaybackState>,
    notifier: Arc<dyn Notifier>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to the background playback task of one guild.
///
/// Cloning the handle is cheap; every clone talks to the same task.
#[derive(Clone)]
pub struct GuildWorker {
    inner: Arc<WorkerInner>,
}

impl GuildWorker {
    /// Creates the worker and starts its loop in the idle state.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        guild_id: GuildId,
        notifier: Arc<dyn Notifier>,
        settings: WorkerSettings,
    ) -> Self {
        let inner = Arc::new(WorkerInner {
            guild_id,
            settings,
            queue: PlaybackQueue::new(),
            state: Mutex::new(PlaybackState::default()),
            notifier,
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        });

        let task = tokio::spawn(inner.clone().run());
        *inner.task.lock() = Some(task);

        info!("🎛️ Worker de reproducción iniciado para guild {}", guild_id);
        Self { inner }
    }

    /// True when both handles point at the same worker.
    pub fn same_worker(&self, other: &GuildWorker) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn enqueue(&self, entry: TrackEntry) {
        self.inner.queue.enqueue(entry);
    }

    pub fn queued(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn upcoming(&self, limit: usize) -> Vec<String> {
        self.inner.queue.describe(limit)
    }

    pub fn attach_voice(&self, link: Arc<dyn VoiceLink>) {
        self.inner.state.lock().voice = Some(link);
    }

    pub fn voice(&self) -> Option<Arc<dyn VoiceLink>> {
        self.inner.state.lock().voice.clone()
    }

    pub fn has_voice(&self) -> bool {
        self.inner.state.lock().voice.is_some()
    }

    /// True iff a voice link and a current track exist and the track has not finished.
    pub fn is_playing(&self) -> bool {
        self.inner.state.lock().is_playing()
    }

    pub fn current_requester(&self) -> Option<UserId> {
        self.inner
            .state
            .lock()
            .current
            .as_ref()
            .map(|entry| entry.requester)
    }

    pub fn skip_vote_count(&self) -> usize {
        self.inner.state.lock().skip_votes.len()
    }

    pub fn now_playing(&self) -> Option<NowPlaying> {
        let state = self.inner.state.lock();
        state.current.as_ref().map(|entry| NowPlaying {
            description: entry.to_string(),
            votes: state.skip_votes.len(),
            quorum: self.inner.settings.skip_quorum,
        })
    }

    /// Clears the votes and, if playing, force-stops the current track.
    pub fn skip(&self) {
        let mut state = self.inner.state.lock();
        state.skip_votes.clear();
        if state.is_playing() {
            info!("⏭️ Track saltado en guild {}", self.inner.guild_id);
            state.force_skip();
        }
    }

    /// Wakes the worker waiting on the current track. Idempotent per track and
    /// safe to call from any thread or task.
    pub fn request_advance(&self) {
        if let Some(advance) = &self.inner.state.lock().advance {
            advance.fire();
        }
    }

    /// Sets the gain of the current track. Out-of-range values are rejected.
    pub fn set_volume(&self, volume: f32) -> Result<f32, PlaybackError> {
        if !(0.0..=2.0).contains(&volume) {
            return Err(PlaybackError::VolumeOutOfRange(volume));
        }

        let state = self.inner.state.lock();
        match &state.current {
            Some(entry) if state.is_playing() => {
                entry.player.set_volume(volume);
                info!("🔊 Volumen ajustado a {}%", (volume * 100.0).round() as u32);
                Ok(entry.player.volume())
            }
            _ => Err(PlaybackError::NotPlaying),
        }
    }

    /// Returns `false` when nothing was playing.
    pub fn pause(&self) -> bool {
        let state = self.inner.state.lock();
        match &state.current {
            Some(entry) if state.is_playing() => {
                entry.player.pause();
                info!("⏸️ Reproducción pausada");
                true
            }
            _ => false,
        }
    }

    /// Returns `false` when nothing was playing.
    pub fn resume(&self) -> bool {
        let state = self.inner.state.lock();
        match &state.current {
            Some(entry) if state.is_playing() => {
                entry.player.resume();
                info!("▶️ Reproducción reanudada");
                true
            }
            _ => false,
        }
    }

    pub fn vote_skip(&self, voter: UserId) -> SkipVote {
        let quorum = self.inner.settings.skip_quorum;
        let mut state = self.inner.state.lock();

        let Some(requester) = state.current.as_ref().map(|entry| entry.requester) else {
            return SkipVote::NotPlaying;
        };
        if !state.is_playing() {
            return SkipVote::NotPlaying;
        }

        if voter == requester {
            state.force_skip();
            return SkipVote::RequesterSkipped;
        }

        if !state.skip_votes.insert(voter) {
            return SkipVote::AlreadyVoted;
        }

        let votes = state.skip_votes.len();
        if votes >= quorum {
            state.force_skip();
            SkipVote::Passed { votes }
        } else {
            SkipVote::Recorded { votes, quorum }
        }
    }

    /// Stops playback, cancels the task and disconnects the voice link.
    ///
    /// Resolves once the task has released its resources. Calling it again is
    /// a no-op. Removing the worker from the registry is the caller's job.
    pub async fn stop(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.is_playing() {
                state.force_skip();
            }
        }
        self.inner.cancel.cancel();

        let task = self.inner.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(
                    "Worker de guild {} terminó con error: {:?}",
                    self.inner.guild_id, e
                );
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

impl WorkerInner {
    async fn run(self: Arc<Self>) {
        loop {
            self.state.lock().skip_votes.clear();

            let entry = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                entry = self.queue.dequeue() => entry,
            };

            self.play(entry).await;

            if self.cancel.is_cancelled() {
                break;
            }
        }

        self.teardown().await;
    }

    async fn play(&self, entry: TrackEntry) {
        let advance = AdvanceHandle::new();
        let channel = entry.origin_channel;
        let player = entry.player.clone();
        let description = entry.to_string();

        {
            let mut state = self.state.lock();
            state.skip_votes.clear();
            state.current = Some(entry);
            state.advance = Some(advance.clone());
        }

        debug!("🎵 Reproduciendo en guild {}: {}", self.guild_id, description);
        self.notifier
            .send(channel, format!("Now playing {description}"));

        match player.start(advance.clone()).await {
            Ok(()) => {
                // a skip during start had no running track to stop
                if advance.has_fired() {
                    player.stop();
                }
                tokio::select! {
                    biased;
                    _ = advance.wait() => {}
                    _ = self.cancel.cancelled() => player.stop(),
                }
            }
            Err(e) => {
                warn!(
                    "❌ No se pudo iniciar el track en guild {}: {}",
                    self.guild_id, e
                );
                self.report_failure(channel, &e);
            }
        }

        self.state.lock().finish_track();
        debug!("Track terminado en guild {}", self.guild_id);
    }

    fn report_failure(&self, channel: ChannelId, error: &PlaybackError) {
        self.notifier.send(
            channel,
            format!(
                "An error occurred while processing this request: ```{}: {}```",
                error.category(),
                error
            ),
        );
    }

    async fn teardown(&self) {
        let (current, voice) = {
            let mut state = self.state.lock();
            let current = state.finish_track();
            (current, state.voice.take())
        };

        if let Some(entry) = current {
            entry.player.stop();
        }

        let dropped = self.queue.clear();
        if dropped > 0 {
            debug!("🗑️ Descartados {} tracks en cola de guild {}", dropped, self.guild_id);
        }

        if let Some(voice) = voice {
            if let Err(e) = voice.disconnect().await {
                warn!(
                    "Error al desconectar voz en guild {}: {}",
                    self.guild_id, e
                );
            }
        }

        info!("⏹️ Worker de guild {} detenido", self.guild_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{
            testing::{
                entry_with, eventually, permissive_link, settle, test_entry, FakePlayer,
                RecordingNotifier, TEST_CHANNEL,
            },
            MockVoiceLink, Player,
        },
        error::VoiceError,
    };
    use pretty_assertions::assert_eq;

    fn worker_with(notifier: Arc<RecordingNotifier>) -> GuildWorker {
        let worker = GuildWorker::spawn(GuildId::new(1), notifier, WorkerSettings::default());
        worker.attach_voice(permissive_link(900));
        worker
    }

    #[tokio::test]
    async fn plays_tracks_in_order_and_idles_when_empty() {
        let notifier = RecordingNotifier::new();
        let worker = worker_with(notifier.clone());
        let first = FakePlayer::new("first");
        let second = FakePlayer::new("second");

        worker.enqueue(entry_with(first.clone(), 10));
        worker.enqueue(entry_with(second.clone(), 10));

        eventually("first track starts", || first.was_started()).await;
        assert!(!second.was_started());
        assert!(worker.is_playing());

        first.finish();
        eventually("second track starts", || second.was_started()).await;

        second.finish();
        eventually("worker goes idle", || worker.now_playing().is_none()).await;
        assert!(!worker.is_playing());

        let now_playing: Vec<_> = notifier
            .messages()
            .into_iter()
            .filter(|m| m.starts_with("Now playing"))
            .collect();
        assert_eq!(
            now_playing,
            vec![
                "Now playing first uploaded by tester and requested by user10",
                "Now playing second uploaded by tester and requested by user10",
            ]
        );
        worker.stop().await;
    }

    #[tokio::test]
    async fn two_votes_then_quorum_skips_to_next_track() {
        let notifier = RecordingNotifier::new();
        let worker = worker_with(notifier.clone());
        let a = FakePlayer::new("A");
        let b = FakePlayer::new("B");
        worker.enqueue(entry_with(a.clone(), 1));
        worker.enqueue(entry_with(b.clone(), 1));

        eventually("A starts", || a.was_started()).await;
        assert_eq!(notifier.count_containing("Now playing A"), 1);

        assert_eq!(
            worker.vote_skip(UserId::new(2)),
            SkipVote::Recorded { votes: 1, quorum: 3 }
        );
        assert_eq!(
            worker.vote_skip(UserId::new(3)),
            SkipVote::Recorded { votes: 2, quorum: 3 }
        );
        assert_eq!(worker.now_playing().map(|n| n.votes), Some(2));
        assert!(a.stop_calls() == 0);

        assert_eq!(worker.vote_skip(UserId::new(4)), SkipVote::Passed { votes: 3 });
        assert!(a.is_finished());

        eventually("B starts", || b.was_started()).await;
        assert_eq!(worker.skip_vote_count(), 0);
        assert_eq!(worker.now_playing().map(|n| n.votes), Some(0));
        assert_eq!(notifier.count_containing("Now playing B"), 1);
        worker.stop().await;
    }

    #[tokio::test]
    async fn repeated_vote_does_not_change_tally() {
        let worker = worker_with(RecordingNotifier::new());
        let track = FakePlayer::new("loop");
        worker.enqueue(entry_with(track.clone(), 1));
        eventually("track starts", || track.was_started()).await;

        assert_eq!(
            worker.vote_skip(UserId::new(2)),
            SkipVote::Recorded { votes: 1, quorum: 3 }
        );
        assert_eq!(worker.vote_skip(UserId::new(2)), SkipVote::AlreadyVoted);
        assert_eq!(worker.vote_skip(UserId::new(2)), SkipVote::AlreadyVoted);
        assert_eq!(worker.skip_vote_count(), 1);
        assert!(!track.is_finished());
        worker.stop().await;
    }

    #[tokio::test]
    async fn requester_skips_without_quorum() {
        let worker = worker_with(RecordingNotifier::new());
        let mine = FakePlayer::new("mine");
        let next = FakePlayer::new("next");
        worker.enqueue(entry_with(mine.clone(), 42));
        worker.enqueue(entry_with(next.clone(), 7));
        eventually("own track starts", || mine.was_started()).await;

        assert_eq!(worker.vote_skip(UserId::new(42)), SkipVote::RequesterSkipped);

        eventually("next track starts", || next.was_started()).await;
        assert_eq!(worker.current_requester(), Some(UserId::new(7)));
        worker.stop().await;
    }

    #[tokio::test]
    async fn vote_without_current_track_reports_not_playing() {
        let worker = worker_with(RecordingNotifier::new());
        assert_eq!(worker.vote_skip(UserId::new(2)), SkipVote::NotPlaying);
        assert_eq!(worker.skip_vote_count(), 0);
        worker.stop().await;
    }

    #[tokio::test]
    async fn duplicate_advance_signals_move_one_track() {
        let worker = worker_with(RecordingNotifier::new());
        let a = FakePlayer::new("a");
        let b = FakePlayer::new("b");
        let c = FakePlayer::new("c");
        for player in [&a, &b, &c] {
            worker.enqueue(entry_with(player.clone(), 1));
        }
        eventually("a starts", || a.was_started()).await;

        // skip racing natural completion plus stray wakeups
        a.finish();
        worker.request_advance();
        worker.skip();
        worker.request_advance();

        eventually("b starts", || b.was_started()).await;
        settle().await;
        assert!(!c.was_started());
        assert!(worker.is_playing());
        assert_eq!(worker.queued(), 1);

        // a late completion signal of `a` no longer reaches the worker
        a.finish();
        settle().await;
        assert!(!c.was_started());
        worker.stop().await;
    }

    #[tokio::test]
    async fn failing_track_is_reported_and_worker_moves_on() {
        let notifier = RecordingNotifier::new();
        let worker = worker_with(notifier.clone());
        let broken = FakePlayer::failing("broken", "network unreachable");
        let fine = FakePlayer::new("fine");
        worker.enqueue(entry_with(broken, 1));
        worker.enqueue(entry_with(fine.clone(), 1));

        eventually("next track starts", || fine.was_started()).await;

        let sent = notifier.sent_to(ChannelId::new(TEST_CHANNEL));
        assert!(sent.iter().any(|m| m
            == "An error occurred while processing this request: ```StreamError: network unreachable```"));
        assert!(worker.is_playing());
        worker.stop().await;
    }

    #[tokio::test]
    async fn transport_controls_require_playback() {
        let worker = worker_with(RecordingNotifier::new());
        assert!(!worker.pause());
        assert!(!worker.resume());
        assert!(matches!(worker.set_volume(0.5), Err(PlaybackError::NotPlaying)));

        let track = FakePlayer::new("song");
        worker.enqueue(entry_with(track.clone(), 1));
        eventually("track starts", || track.was_started()).await;

        assert!(worker.pause());
        assert!(track.is_paused());
        assert!(worker.resume());
        assert!(!track.is_paused());

        assert_eq!(worker.set_volume(0.25).unwrap(), 0.25);
        assert!(matches!(
            worker.set_volume(2.5),
            Err(PlaybackError::VolumeOutOfRange(v)) if v == 2.5
        ));
        assert!(matches!(
            worker.set_volume(-0.1),
            Err(PlaybackError::VolumeOutOfRange(_))
        ));
        assert_eq!(track.volume(), 0.25);
        worker.stop().await;
    }

    #[tokio::test]
    async fn not_playing_without_voice_link() {
        let worker = GuildWorker::spawn(
            GuildId::new(2),
            RecordingNotifier::new(),
            WorkerSettings::default(),
        );
        let track = FakePlayer::new("silent");
        worker.enqueue(entry_with(track.clone(), 1));
        eventually("track starts", || track.was_started()).await;

        assert!(!worker.is_playing());
        assert_eq!(worker.vote_skip(UserId::new(3)), SkipVote::NotPlaying);
        worker.stop().await;
    }

    #[tokio::test]
    async fn stop_while_playing_releases_everything() {
        let notifier = RecordingNotifier::new();
        let worker = GuildWorker::spawn(GuildId::new(3), notifier, WorkerSettings::default());
        let mut link = MockVoiceLink::new();
        link.expect_disconnect().times(1).returning(|| Ok(()));
        worker.attach_voice(Arc::new(link));

        let playing = FakePlayer::new("playing");
        worker.enqueue(entry_with(playing.clone(), 1));
        worker.enqueue(test_entry("never", 1));
        eventually("track starts", || playing.was_started()).await;

        worker.stop().await;

        assert!(worker.is_stopped());
        assert!(playing.is_finished());
        assert!(!worker.has_voice());
        assert!(worker.now_playing().is_none());
        assert_eq!(worker.queued(), 0);

        // second stop is a no-op
        worker.stop().await;
    }

    #[tokio::test]
    async fn stop_while_idle_swallows_disconnect_failure() {
        let worker = GuildWorker::spawn(
            GuildId::new(4),
            RecordingNotifier::new(),
            WorkerSettings::default(),
        );
        let mut link = MockVoiceLink::new();
        link.expect_disconnect()
            .times(1)
            .returning(|| Err(VoiceError::Disconnect("gateway gone".to_string())));
        worker.attach_voice(Arc::new(link));
        settle().await;

        worker.stop().await;
        assert!(worker.is_stopped());
        assert!(!worker.has_voice());
    }

    #[tokio::test]
    async fn custom_quorum_is_honoured() {
        let worker = GuildWorker::spawn(
            GuildId::new(5),
            RecordingNotifier::new(),
            WorkerSettings { skip_quorum: 1 },
        );
        worker.attach_voice(permissive_link(1));
        let track = FakePlayer::new("short");
        worker.enqueue(entry_with(track.clone(), 1));
        eventually("track starts", || track.was_started()).await;

        assert_eq!(worker.vote_skip(UserId::new(9)), SkipVote::Passed { votes: 1 });
        worker.stop().await;
    }

    #[tokio::test]
    async fn skip_while_track_is_starting_stops_it() {
        let worker = worker_with(RecordingNotifier::new());
        let (slow, gate) = FakePlayer::gated("slow");
        let next = FakePlayer::new("next");
        worker.enqueue(entry_with(slow.clone(), 1));
        worker.enqueue(entry_with(next.clone(), 2));

        eventually("slow track is starting", || slow.entered_start()).await;
        assert_eq!(worker.vote_skip(UserId::new(1)), SkipVote::RequesterSkipped);
        gate.notify_one();

        eventually("next track starts", || next.was_started()).await;
        assert!(!slow.is_running());
        assert!(next.is_running());
        assert_eq!(worker.current_requester(), Some(UserId::new(2)));
        worker.stop().await;
    }

    #[tokio::test]
    async fn votes_reset_when_track_ends_naturally() {
        let notifier = RecordingNotifier::new();
        let worker = worker_with(notifier.clone());
        let first = FakePlayer::new("first");
        let second = FakePlayer::new("second");
        worker.enqueue(entry_with(first.clone(), 1));
        worker.enqueue(entry_with(second.clone(), 1));
        eventually("first starts", || first.was_started()).await;

        worker.vote_skip(UserId::new(2));
        worker.vote_skip(UserId::new(3));
        assert_eq!(worker.skip_vote_count(), 2);

        first.finish();
        eventually("second starts", || second.was_started()).await;
        assert_eq!(worker.skip_vote_count(), 0);
        assert_eq!(worker.now_playing().map(|n| n.votes), Some(0));
        assert_eq!(first.stop_calls(), 0);
        assert_eq!(notifier.count_containing("Now playing second"), 1);
        worker.stop().await;
    }
}
