//! # Bot Module
//!
//! Discord side of SuperBot.
//!
//! - [`music`]: platform-free music commands over the guild registry
//! - [`basic`]: small utility commands (dice, choices, repeat)
//! - [`voice`]: songbird voice connections and outgoing messages
//! - [`commands`] / [`handlers`]: slash-command registration and dispatch
//! - [`events`]: plain message and member events
//!
//! The [`SuperBot`] struct implements Serenity's [`EventHandler`] trait and
//! routes every gateway event to one of the modules above.

use anyhow::Result;
use serenity::{
    all::{
        ChannelId, Context, EventHandler, GuildId, Interaction, Member, Message,
        MessageId, MessageUpdateEvent, Ready, UserId, VoiceState,
    },
    async_trait,
};
use tracing::{debug, error, info, warn};

pub mod basic;
pub mod commands;
pub mod events;
pub mod handlers;
pub mod music;
pub mod voice;

use crate::config::Config;
use events::RecentMessages;
use music::MusicService;

/// Main Discord event handler.
pub struct SuperBot {
    config: Config,
    /// Music commands and the per-guild workers behind them
    music: MusicService,
    /// Recently seen messages, echoed back on edit or delete
    recent: RecentMessages,
}

impl SuperBot {
    pub fn new(config: Config, music: MusicService) -> Self {
        let recent = RecentMessages::new(config.message_cache_size);
        Self {
            config,
            music,
            recent,
        }
    }

    /// Registers slash commands with Discord.
    ///
    /// Commands go to the configured development guild when `GUILD_ID` is
    /// set (propagates in seconds), globally otherwise (up to an hour).
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                commands::register_guild_commands(ctx, guild_id)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for SuperBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// Stops the guild's worker when the bot itself leaves voice.
    async fn voice_state_update(&self, ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        let Some(guild_id) = left_voice(current_user_id, &new) else {
            return;
        };

        if self.music.registry().stop(guild_id).await {
            info!("🔌 Bot desconectado en guild {}, worker detenido", guild_id);
        } else {
            debug!("Guild {} no tenía worker activo", guild_id);
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(e) = events::on_message(&ctx, &msg, &self.recent).await {
            warn!("Error manejando mensaje: {:?}", e);
        }
    }

    async fn message_update(
        &self,
        ctx: Context,
        _old: Option<Message>,
        _new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        if let Err(e) = events::on_message_update(&ctx, &event, &self.recent).await {
            warn!("Error manejando edición: {:?}", e);
        }
    }

    async fn message_delete(
        &self,
        ctx: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        _guild_id: Option<GuildId>,
    ) {
        if let Err(e) =
            events::on_message_delete(&ctx, channel_id, deleted_message_id, &self.recent).await
        {
            warn!("Error manejando borrado: {:?}", e);
        }
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        if !self.config.welcome_members {
            return;
        }
        let guild_id = new_member.guild_id;
        if let Err(e) = events::on_member_join(&ctx, &new_member, guild_id).await {
            warn!("Error enviando bienvenida: {:?}", e);
        }
    }
}

/// Guild the bot was just disconnected from, if `state` says so.
///
/// Does not depend on the previous voice state being cached.
fn left_voice(current_user_id: UserId, state: &VoiceState) -> Option<GuildId> {
    disconnected_guild(current_user_id, state.user_id, state.guild_id, state.channel_id)
}

fn disconnected_guild(
    current_user_id: UserId,
    user_id: UserId,
    guild_id: Option<GuildId>,
    channel_id: Option<ChannelId>,
) -> Option<GuildId> {
    if user_id != current_user_id || channel_id.is_some() {
        return None;
    }
    guild_id
}
