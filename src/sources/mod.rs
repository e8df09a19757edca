//! Track sources: turning a `play` query into a [`Player`].

pub mod handle;
pub mod youtube;

use async_trait::async_trait;
use serenity::model::id::GuildId;
use std::sync::Arc;

use crate::{audio::Player, error::SourceError};

pub use handle::SongbirdTrack;
pub use youtube::YoutubeResolver;

/// Resolves a URL or free-form search into a ready-to-start player.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, guild_id: GuildId, query: &str)
        -> Result<Arc<dyn Player>, SourceError>;
}
