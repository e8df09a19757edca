use async_trait::async_trait;
use serenity::model::id::GuildId;
use songbird::{
    input::{Compose, Input, YoutubeDl},
    Songbird,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{SongbirdTrack, TrackResolver};
use crate::{
    audio::{Player, TrackMetadata},
    error::SourceError,
};

/// Resolves queries through yt-dlp using songbird's `YoutubeDl` source.
pub struct YoutubeResolver {
    manager: Arc<Songbird>,
    client: reqwest::Client,
    // Limitar invocaciones concurrentes de yt-dlp para evitar rate limiting
    rate_limiter: Semaphore,
}

impl YoutubeResolver {
    pub fn new(manager: Arc<Songbird>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Resolve(e.to_string()))?;

        Ok(Self {
            manager,
            client,
            rate_limiter: Semaphore::new(3),
        })
    }

    /// Anything that looks like a link is handed to yt-dlp as-is; the rest is searched.
    pub fn is_url(query: &str) -> bool {
        let query = query.trim();
        query.starts_with("http://") || query.starts_with("https://")
    }
}

#[async_trait]
impl TrackResolver for YoutubeResolver {
    async fn resolve(
        &self,
        guild_id: GuildId,
        query: &str,
    ) -> Result<Arc<dyn Player>, SourceError> {
        if query.trim().is_empty() {
            return Err(SourceError::NoResults(query.to_string()));
        }

        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| SourceError::Resolve(e.to_string()))?;

        info!("🔍 Resolviendo '{}' para guild {}", query, guild_id);
        let target = query.trim().to_string();
        let mut source = if Self::is_url(&target) {
            YoutubeDl::new(self.client.clone(), target)
        } else {
            YoutubeDl::new_search(self.client.clone(), target)
        };

        let aux = source.aux_metadata().await.map_err(|e| {
            warn!("❌ yt-dlp falló para '{}': {}", query, e);
            SourceError::Resolve(e.to_string())
        })?;

        let mut metadata = TrackMetadata {
            title: aux.title.or(aux.track),
            uploader: aux.channel.or(aux.artist),
            duration: aux.duration,
            url: aux.source_url,
        };
        if metadata.title.is_none() && metadata.url.is_none() {
            return Err(SourceError::NoResults(query.to_string()));
        }
        if metadata.url.is_none() && Self::is_url(query) {
            metadata.url = Some(query.trim().to_string());
        }

        debug!("✅ Track resuelto: {:?}", metadata.title);
        let track = SongbirdTrack::new(
            self.manager.clone(),
            guild_id,
            Input::from(source),
            metadata,
        );
        Ok(Arc::new(track))
    }
}
