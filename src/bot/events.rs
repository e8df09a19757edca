//! Plain message and member events.

use anyhow::Result;
use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::{
    builder::{CreateMessage, EditMessage},
    model::{
        channel::Message,
        event::MessageUpdateEvent,
        guild::Member,
        id::{ChannelId, GuildId, MessageId},
        mention::Mentionable,
    },
    prelude::Context,
};
use std::{collections::VecDeque, time::Duration};
use tracing::{debug, info};

const EDIT_DELAY: Duration = Duration::from_secs(3);

/// A message as it looked when it was last seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMessage {
    pub channel_id: ChannelId,
    pub author: String,
    pub content: String,
}

/// Bounded store of recent messages, used to echo edits and deletions.
///
/// Oldest entries are evicted first once `capacity` is reached.
pub struct RecentMessages {
    messages: DashMap<MessageId, CachedMessage>,
    order: Mutex<VecDeque<MessageId>>,
    capacity: usize,
}

impl RecentMessages {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn remember(&self, id: MessageId, message: CachedMessage) {
        if self.capacity == 0 {
            return;
        }

        let mut order = self.order.lock();
        if self.messages.insert(id, message).is_none() {
            order.push_back(id);
        }
        while order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.messages.remove(&oldest);
            }
        }
    }

    /// Replaces the stored content and returns the previous version.
    pub fn update(&self, id: MessageId, content: String) -> Option<CachedMessage> {
        let mut entry = self.messages.get_mut(&id)?;
        let previous = entry.clone();
        entry.content = content;
        Some(previous)
    }

    pub fn forget(&self, id: MessageId) -> Option<CachedMessage> {
        let (_, message) = self.messages.remove(&id)?;
        self.order.lock().retain(|known| *known != id);
        Some(message)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub fn hello_reply(author: &impl Mentionable) -> String {
    format!("Hello {}", author.mention())
}

pub fn welcome_text(member: &impl Mentionable, guild_name: &str) -> String {
    format!("Welcome {} to {}!", member.mention(), guild_name)
}

pub fn edited_text(previous: &CachedMessage) -> String {
    format!(
        "**{}** edited their message:\n{}",
        previous.author, previous.content
    )
}

pub fn deleted_text(message: &CachedMessage) -> String {
    format!("{} has deleted the message:\n{}", message.author, message.content)
}

pub async fn on_message(ctx: &Context, msg: &Message, recent: &RecentMessages) -> Result<()> {
    if msg.author.bot {
        return Ok(());
    }

    recent.remember(
        msg.id,
        CachedMessage {
            channel_id: msg.channel_id,
            author: msg.author.name.clone(),
            content: msg.content.clone(),
        },
    );

    match msg.content.trim() {
        "!hello" => {
            msg.channel_id
                .say(&ctx.http, hello_reply(&msg.author))
                .await?;
        }
        "!editme" => {
            let mut sent = msg
                .author
                .direct_message(ctx, CreateMessage::new().content("10"))
                .await?;
            tokio::time::sleep(EDIT_DELAY).await;
            sent.edit(ctx, EditMessage::new().content("40")).await?;
        }
        "!deleteme" => {
            let sent = msg
                .channel_id
                .say(&ctx.http, "I will delete myself now...")
                .await?;
            sent.delete(ctx).await?;
        }
        _ => {}
    }

    Ok(())
}

pub async fn on_message_update(
    ctx: &Context,
    event: &MessageUpdateEvent,
    recent: &RecentMessages,
) -> Result<()> {
    if event.author.as_ref().is_some_and(|author| author.bot) {
        return Ok(());
    }
    let Some(content) = event.content.clone() else {
        return Ok(());
    };

    match recent.update(event.id, content.clone()) {
        Some(previous) if previous.content != content => {
            event
                .channel_id
                .say(&ctx.http, edited_text(&previous))
                .await?;
        }
        Some(_) => {}
        None => debug!("Mensaje {} editado pero no está en caché", event.id),
    }

    Ok(())
}

pub async fn on_message_delete(
    ctx: &Context,
    channel_id: ChannelId,
    message_id: MessageId,
    recent: &RecentMessages,
) -> Result<()> {
    if let Some(message) = recent.forget(message_id) {
        channel_id.say(&ctx.http, deleted_text(&message)).await?;
    }
    Ok(())
}

pub async fn on_member_join(ctx: &Context, member: &Member, guild_id: GuildId) -> Result<()> {
    let guild = ctx
        .cache
        .guild(guild_id)
        .map(|guild| (guild.name.clone(), guild.system_channel_id));

    let Some((name, Some(channel))) = guild else {
        debug!("Guild {} sin canal de sistema, no se envía bienvenida", guild_id);
        return Ok(());
    };

    info!("👋 Nuevo miembro {} en guild {}", member.user.name, guild_id);
    channel
        .say(&ctx.http, welcome_text(&member.user, &name))
        .await?;
    Ok(())
}
