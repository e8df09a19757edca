use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::GuildId;
use songbird::{
    input::Input,
    tracks::TrackHandle,
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, error, info};

use crate::{
    audio::{AdvanceHandle, Player, TrackMetadata},
    error::PlaybackError,
};

const INITIAL_VOLUME: f32 = 1.0;

/// [`Player`] backed by a songbird track on the guild's call.
///
/// The input stays lazy until [`Player::start`] hands it to the driver.
pub struct SongbirdTrack {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    metadata: TrackMetadata,
    input: Mutex<Option<Input>>,
    handle: Mutex<Option<TrackHandle>>,
    volume: Mutex<f32>,
    finished: Arc<AtomicBool>,
}

impl SongbirdTrack {
    pub fn new(
        manager: Arc<Songbird>,
        guild_id: GuildId,
        input: Input,
        metadata: TrackMetadata,
    ) -> Self {
        Self {
            manager,
            guild_id,
            metadata,
            input: Mutex::new(Some(input)),
            handle: Mutex::new(None),
            volume: Mutex::new(INITIAL_VOLUME),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    fn with_handle(&self, action: &str, f: impl FnOnce(&TrackHandle) -> songbird::tracks::TrackResult<()>) {
        if let Some(handle) = self.handle.lock().as_ref() {
            if let Err(e) = f(handle) {
                debug!("No se pudo aplicar '{}' al track: {:?}", action, e);
            }
        }
    }
}

#[async_trait]
impl Player for SongbirdTrack {
    fn metadata(&self) -> &TrackMetadata {
        &self.metadata
    }

    async fn start(&self, on_finish: AdvanceHandle) -> Result<(), PlaybackError> {
        let input = self
            .input
            .lock()
            .take()
            .ok_or(PlaybackError::AlreadyStarted)?;

        let call = self
            .manager
            .get(self.guild_id)
            .ok_or(PlaybackError::NoVoiceConnection)?;

        let handle = {
            let mut call = call.lock().await;
            // stopped while waiting for the call
            if self.is_finished() {
                debug!("Track detenido antes de iniciar en guild {}", self.guild_id);
                return Ok(());
            }
            call.play_input(input)
        };

        let volume = *self.volume.lock();
        handle
            .set_volume(volume)
            .map_err(|e| PlaybackError::Stream(e.to_string()))?;

        for event in [TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(
                    Event::Track(event),
                    TrackEndNotifier {
                        guild_id: self.guild_id,
                        finished: self.finished.clone(),
                        advance: on_finish.clone(),
                    },
                )
                .map_err(|e| PlaybackError::Stream(e.to_string()))?;
        }

        {
            // `stop` sets `finished` before it takes this lock
            let mut slot = self.handle.lock();
            if self.is_finished() {
                if let Err(e) = handle.stop() {
                    debug!("No se pudo detener el track: {:?}", e);
                }
            }
            *slot = Some(handle);
        }
        info!("🎵 Track iniciado en guild {}", self.guild_id);
        Ok(())
    }

    fn stop(&self) {
        self.finished.store(true, Ordering::Release);
        self.with_handle("stop", |handle| handle.stop());
    }

    fn pause(&self) {
        self.with_handle("pause", |handle| handle.pause());
    }

    fn resume(&self) {
        self.with_handle("play", |handle| handle.play());
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock() = volume;
        self.with_handle("volume", |handle| handle.set_volume(volume));
    }
}

/// Fires the track's advance handle when songbird reports its end or an error.
struct TrackEndNotifier {
    guild_id: GuildId,
    finished: Arc<AtomicBool>,
    advance: AdvanceHandle,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            for (state, _handle) in *tracks {
                if let songbird::tracks::PlayMode::Errored(e) = &state.playing {
                    error!("❌ Error en track para guild {}: {:?}", self.guild_id, e);
                }
            }
        }

        self.finished.store(true, Ordering::Release);
        if self.advance.fire() {
            debug!("Track terminó en guild {}", self.guild_id);
        }

        None
    }
}
