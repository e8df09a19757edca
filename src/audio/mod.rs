//! # Audio Module
//!
//! Per-guild playback for the bot.
//!
//! ## Architecture
//!
//! ### [`queue`] - Playback Queue
//! - Unbounded FIFO of [`TrackEntry`] values, one per guild
//! - Producers never block; the worker waits only on an empty queue
//!
//! ### [`worker`] - Guild Playback Worker
//! - One background task per guild, started lazily
//! - Owns the current track, the voice link and the skip-vote set
//! - Waits on a per-track [`AdvanceHandle`] until the track ends or is skipped
//!
//! ### [`registry`] - Guild Registry
//! - Maps guild ids to workers; creation is atomic per guild
//! - Tears every worker down on shutdown
//!
//! The platform (Discord gateway, songbird driver, yt-dlp) is reached only
//! through the [`Player`], [`Notifier`] and [`VoiceLink`] traits, so the
//! whole subsystem runs without a live connection in tests.

pub mod advance;
pub mod queue;
pub mod registry;
pub mod track;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serenity::model::id::ChannelId;

use crate::error::{PlaybackError, VoiceError};

pub use advance::AdvanceHandle;
pub use queue::PlaybackQueue;
pub use registry::GuildRegistry;
pub use track::{TrackEntry, TrackMetadata};
pub use worker::{GuildWorker, NowPlaying, SkipVote, WorkerSettings};

/// Playback capability for a single resolved track.
#[async_trait]
pub trait Player: Send + Sync {
    fn metadata(&self) -> &TrackMetadata;

    /// Starts playback. `on_finish` must be fired once the track ends.
    async fn start(&self, on_finish: AdvanceHandle) -> Result<(), PlaybackError>;

    fn stop(&self);

    fn pause(&self);

    fn resume(&self);

    fn is_finished(&self) -> bool;

    /// Fractional gain, 0.0..=2.0
    fn volume(&self) -> f32;

    fn set_volume(&self, volume: f32);
}

/// Posts text to a channel. Fire-and-forget: delivery failures are logged
/// by the implementation and ordering between sends is not guaranteed.
pub trait Notifier: Send + Sync {
    fn send(&self, channel: ChannelId, content: String);
}

/// An established voice connection for one guild.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceLink: Send + Sync {
    fn channel(&self) -> ChannelId;

    async fn move_to(&self, channel: ChannelId) -> Result<(), VoiceError>;

    async fn disconnect(&self) -> Result<(), VoiceError>;
}
