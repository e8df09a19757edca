//! Music command surface.
//!
//! Every command resolves its guild's worker through the [`GuildRegistry`]
//! and returns the text to echo back to the invoking channel.

use serenity::model::{
    id::{ChannelId, GuildId, UserId},
    mention::Mentionable,
};
use std::sync::Arc;
use tracing::{info, warn};

use super::voice::VoiceGateway;
use crate::{
    audio::{GuildRegistry, SkipVote, TrackEntry},
    error::{PlaybackError, VoiceError},
    sources::TrackResolver,
};

const NOT_PLAYING: &str = "Not playing anything.";
const QUEUE_PREVIEW: usize = 10;

/// Who invoked a command and from where.
#[derive(Debug, Clone)]
pub struct Invoker {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub display_name: String,
    /// Voice channel the user is currently in, if any
    pub voice_channel: Option<ChannelId>,
}

/// Channel picked as `join` target.
#[derive(Debug, Clone, Copy)]
pub struct ChannelTarget {
    pub id: ChannelId,
    pub is_voice: bool,
}

#[derive(Debug)]
pub enum Summon {
    Joined(ChannelId),
    Moved(ChannelId),
    NotInVoice,
    Failed(VoiceError),
}

impl Summon {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Joined(_) | Self::Moved(_))
    }

    pub fn reply(&self) -> String {
        match self {
            Self::Joined(channel) => format!("Ready to play audio in {}", channel.mention()),
            Self::Moved(channel) => format!("Moved to {}", channel.mention()),
            Self::NotInVoice => "You are not in a voice channel.".to_string(),
            Self::Failed(e) => e.to_string(),
        }
    }
}

pub struct MusicService {
    registry: Arc<GuildRegistry>,
    gateway: Arc<dyn VoiceGateway>,
    resolver: Arc<dyn TrackResolver>,
    default_volume: f32,
}

impl MusicService {
    pub fn new(
        registry: Arc<GuildRegistry>,
        gateway: Arc<dyn VoiceGateway>,
        resolver: Arc<dyn TrackResolver>,
        default_volume: f32,
    ) -> Self {
        Self {
            registry,
            gateway,
            resolver,
            default_volume,
        }
    }

    pub fn registry(&self) -> &Arc<GuildRegistry> {
        &self.registry
    }

    pub async fn join(&self, invoker: &Invoker, target: ChannelTarget) -> String {
        match self.connect(invoker.guild_id, target).await {
            Ok(()) => format!("Ready to play audio in {}", target.id.mention()),
            Err(VoiceError::AlreadyConnected) => "Already in a voice channel...".to_string(),
            Err(VoiceError::NotAVoiceChannel) => "This is not a voice channel...".to_string(),
            Err(e) => {
                warn!("Error al unirse al canal {}: {}", target.id, e);
                e.to_string()
            }
        }
    }

    async fn connect(&self, guild_id: GuildId, target: ChannelTarget) -> Result<(), VoiceError> {
        if !target.is_voice {
            return Err(VoiceError::NotAVoiceChannel);
        }

        let worker = self.registry.get_or_create(guild_id);
        if worker.has_voice() {
            return Err(VoiceError::AlreadyConnected);
        }

        let link = self.gateway.connect(guild_id, target.id).await?;
        worker.attach_voice(link);
        Ok(())
    }

    /// Joins the invoker's voice channel, or moves there if already connected.
    pub async fn summon(&self, invoker: &Invoker) -> Summon {
        let Some(channel) = invoker.voice_channel else {
            return Summon::NotInVoice;
        };

        let worker = self.registry.get_or_create(invoker.guild_id);
        match worker.voice() {
            Some(link) => match link.move_to(channel).await {
                Ok(()) => Summon::Moved(channel),
                Err(e) => Summon::Failed(e),
            },
            None => match self.gateway.connect(invoker.guild_id, channel).await {
                Ok(link) => {
                    worker.attach_voice(link);
                    Summon::Joined(channel)
                }
                Err(e) => Summon::Failed(e),
            },
        }
    }

    pub async fn play(&self, invoker: &Invoker, song: &str) -> String {
        let worker = self.registry.get_or_create(invoker.guild_id);
        if !worker.has_voice() {
            let summon = self.summon(invoker).await;
            if !summon.is_success() {
                return summon.reply();
            }
        }

        match self.resolver.resolve(invoker.guild_id, song).await {
            Ok(player) => {
                player.set_volume(self.default_volume);
                let entry = TrackEntry::new(
                    invoker.user_id,
                    invoker.display_name.clone(),
                    invoker.channel_id,
                    player,
                );
                let reply = format!("Enqueued {entry}");
                info!("➕ {} en guild {}", reply, invoker.guild_id);
                worker.enqueue(entry);
                reply
            }
            Err(e) => {
                warn!("❌ No se pudo resolver '{}': {}", song, e);
                format!(
                    "An error occurred while processing this request: ```{}: {}```",
                    e.category(),
                    e
                )
            }
        }
    }

    /// `percent` must be within 0..=100; anything else is rejected, not clamped.
    pub fn volume(&self, invoker: &Invoker, percent: i64) -> String {
        if !(0..=100).contains(&percent) {
            return format!("Volume must be between 0 and 100, got {percent}.");
        }

        let Some(worker) = self.registry.get(invoker.guild_id) else {
            return NOT_PLAYING.to_string();
        };

        match worker.set_volume(percent as f32 / 100.0) {
            Ok(volume) => format!("Set the volume to {:.0}%", volume * 100.0),
            Err(PlaybackError::NotPlaying) => NOT_PLAYING.to_string(),
            Err(e) => e.to_string(),
        }
    }

    pub fn pause(&self, invoker: &Invoker) -> String {
        match self.registry.get(invoker.guild_id) {
            Some(worker) if worker.pause() => "Paused.".to_string(),
            _ => NOT_PLAYING.to_string(),
        }
    }

    pub fn resume(&self, invoker: &Invoker) -> String {
        match self.registry.get(invoker.guild_id) {
            Some(worker) if worker.resume() => "Resumed.".to_string(),
            _ => NOT_PLAYING.to_string(),
        }
    }

    /// Stops playback, clears the queue and leaves the voice channel.
    pub async fn stop(&self, invoker: &Invoker) -> String {
        if self.registry.stop(invoker.guild_id).await {
            "Stopped playing and left the voice channel.".to_string()
        } else {
            "Not connected to a voice channel.".to_string()
        }
    }

    pub fn skip(&self, invoker: &Invoker) -> String {
        let worker = match self.registry.get(invoker.guild_id) {
            Some(worker) if worker.is_playing() => worker,
            _ => return "Not playing any music right now...".to_string(),
        };

        match worker.vote_skip(invoker.user_id) {
            SkipVote::RequesterSkipped => "Requester requested skipping song...".to_string(),
            SkipVote::Passed { .. } => "Skip vote passed, skipping song...".to_string(),
            SkipVote::Recorded { votes, quorum } => {
                format!("Skip vote added, currently at [{votes}/{quorum}]")
            }
            SkipVote::AlreadyVoted => "You have already voted to skip this song.".to_string(),
            SkipVote::NotPlaying => "Not playing any music right now...".to_string(),
        }
    }

    pub fn playing(&self, invoker: &Invoker) -> String {
        match self
            .registry
            .get(invoker.guild_id)
            .and_then(|worker| worker.now_playing())
        {
            Some(now) => format!(
                "Now playing {} [skips: {}/{}]",
                now.description, now.votes, now.quorum
            ),
            None => NOT_PLAYING.to_string(),
        }
    }

    pub fn queue(&self, invoker: &Invoker) -> String {
        let Some(worker) = self.registry.get(invoker.guild_id) else {
            return "The queue is empty.".to_string();
        };

        let upcoming = worker.upcoming(QUEUE_PREVIEW);
        if upcoming.is_empty() {
            return "The queue is empty.".to_string();
        }

        let lines: Vec<String> = upcoming
            .iter()
            .enumerate()
            .map(|(index, description)| format!("{} - {}", index + 1, description))
            .collect();
        let remaining = worker.queued().saturating_sub(upcoming.len());
        let mut reply = format!("**Queue**:\n{}", lines.join("\n"));
        if remaining > 0 {
            reply.push_str(&format!("\n...and {remaining} more"));
        }
        reply
    }
}
