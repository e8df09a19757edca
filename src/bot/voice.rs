//! Songbird-backed voice connections and the outgoing message channel.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::{
    http::Http,
    model::id::{ChannelId, GuildId},
};
use songbird::Songbird;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    audio::{Notifier, VoiceLink},
    error::VoiceError,
};

/// Opens voice connections.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceLink>, VoiceError>;
}

pub struct SongbirdGateway {
    manager: Arc<Songbird>,
    self_deafen: bool,
}

impl SongbirdGateway {
    pub fn new(manager: Arc<Songbird>, self_deafen: bool) -> Self {
        Self {
            manager,
            self_deafen,
        }
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceLink>, VoiceError> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| VoiceError::Join(e.to_string()))?;

        if self.self_deafen {
            let mut call = call.lock().await;
            if !call.is_deaf() {
                if let Err(e) = call.deafen(true).await {
                    warn!("No se pudo ensordecer al bot: {:?}", e);
                }
            }
        }

        info!("🔊 Conectado al canal de voz en guild {}", guild_id);
        Ok(Arc::new(SongbirdLink {
            manager: self.manager.clone(),
            guild_id,
            channel: Mutex::new(channel_id),
        }))
    }
}

/// Voice connection of one guild, managed by songbird.
pub struct SongbirdLink {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    channel: Mutex<ChannelId>,
}

#[async_trait]
impl VoiceLink for SongbirdLink {
    fn channel(&self) -> ChannelId {
        *self.channel.lock()
    }

    async fn move_to(&self, channel_id: ChannelId) -> Result<(), VoiceError> {
        // join on an existing call moves it
        self.manager
            .join(self.guild_id, channel_id)
            .await
            .map_err(|e| VoiceError::Join(e.to_string()))?;
        *self.channel.lock() = channel_id;
        info!("🔀 Movido al canal {} en guild {}", channel_id, self.guild_id);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), VoiceError> {
        self.manager
            .remove(self.guild_id)
            .await
            .map_err(|e| VoiceError::Disconnect(e.to_string()))?;
        info!("👋 Desconectado del canal de voz en guild {}", self.guild_id);
        Ok(())
    }
}

type OutgoingMessage = (ChannelId, String);

/// [`Notifier`] that hands messages to a delivery task.
///
/// Sending never blocks; the paired [`Outbox`] posts them once the HTTP
/// client exists.
#[derive(Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<OutgoingMessage>,
}

pub struct Outbox {
    rx: mpsc::UnboundedReceiver<OutgoingMessage>,
}

impl ChannelNotifier {
    pub fn channel() -> (Self, Outbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, Outbox { rx })
    }
}

impl Notifier for ChannelNotifier {
    fn send(&self, channel: ChannelId, content: String) {
        if self.tx.send((channel, content)).is_err() {
            warn!("Outbox cerrado, mensaje descartado para canal {}", channel);
        }
    }
}

impl Outbox {
    /// Posts queued messages until every notifier is dropped.
    pub async fn deliver(mut self, http: Arc<Http>) {
        while let Some((channel, content)) = self.rx.recv().await {
            if let Err(why) = channel.say(&http, content).await {
                warn!("Error sending message to {}: {:?}", channel, why);
            }
        }
        debug!("Outbox cerrado");
    }
}
