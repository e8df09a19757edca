use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::{CommandDataOptionValue, CommandInteraction},
        channel::ChannelType,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};

use super::{
    basic,
    music::{ChannelTarget, Invoker},
    SuperBot,
};

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &SuperBot) -> Result<()> {
    info!(
        "📝 Comando /{} usado por {} en {:?}",
        command.data.name, command.user.name, command.guild_id
    );

    // Comandos que funcionan sin servidor
    match command.data.name.as_str() {
        "add" => return handle_add(ctx, &command).await,
        "roll" => return handle_roll(ctx, &command).await,
        "choose" => return handle_choose(ctx, &command).await,
        "repeat" => return handle_repeat(ctx, &command, bot).await,
        "cool" => return handle_cool(ctx, &command).await,
        _ => {}
    }

    let Some(guild_id) = command.guild_id else {
        return respond(ctx, &command, "This command can only be used in a server.").await;
    };
    let invoker = invoker_for(ctx, &command, guild_id);
    let music = &bot.music;

    match command.data.name.as_str() {
        "join" => handle_join(ctx, &command, bot, &invoker).await?,
        "summon" => {
            let reply = music.summon(&invoker).await.reply();
            respond(ctx, &command, reply).await?;
        }
        "play" => handle_play(ctx, &command, bot, &invoker).await?,
        "volume" => {
            let reply = match int_option(&command, "value") {
                Some(value) => music.volume(&invoker, value),
                None => "Missing volume value.".to_string(),
            };
            respond(ctx, &command, reply).await?;
        }
        "pause" => respond(ctx, &command, music.pause(&invoker)).await?,
        "resume" => respond(ctx, &command, music.resume(&invoker)).await?,
        "stop" => {
            let reply = music.stop(&invoker).await;
            respond(ctx, &command, reply).await?;
        }
        "skip" => respond(ctx, &command, music.skip(&invoker)).await?,
        "playing" => respond(ctx, &command, music.playing(&invoker)).await?,
        "queue" => respond(ctx, &command, music.queue(&invoker)).await?,
        "joined" => handle_joined(ctx, &command).await?,
        _ => {
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("❌ Comando no reconocido")
                            .ephemeral(true),
                    ),
                )
                .await?;
        }
    }

    Ok(())
}

// Handlers específicos para cada comando

async fn handle_join(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &SuperBot,
    invoker: &Invoker,
) -> Result<()> {
    let Some(channel_id) = channel_option(command, "channel") else {
        return respond(ctx, command, "Missing channel.").await;
    };

    let kind = command
        .data
        .resolved
        .channels
        .get(&channel_id)
        .map(|channel| channel.kind);
    let target = ChannelTarget {
        id: channel_id,
        is_voice: matches!(kind, Some(ChannelType::Voice | ChannelType::Stage)),
    };

    let reply = bot.music.join(invoker, target).await;
    respond(ctx, command, reply).await
}

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &SuperBot,
    invoker: &Invoker,
) -> Result<()> {
    let Some(song) = str_option(command, "song") else {
        return respond(ctx, command, "Missing song.").await;
    };

    // Resolver con yt-dlp puede tardar más que el límite de respuesta
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let reply = bot.music.play(invoker, song).await;
    command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(reply))
        .await?;

    Ok(())
}

async fn handle_joined(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    let Some(user_id) = user_option(command, "member") else {
        return respond(ctx, command, "Missing member.").await;
    };

    let resolved = &command.data.resolved;
    let name = resolved
        .members
        .get(&user_id)
        .and_then(|member| member.nick.clone())
        .or_else(|| resolved.users.get(&user_id).map(|user| user.name.clone()))
        .unwrap_or_else(|| user_id.to_string());

    let reply = match resolved
        .members
        .get(&user_id)
        .and_then(|member| member.joined_at)
    {
        Some(joined_at) => basic::joined(&name, &joined_at.to_string()),
        None => format!("I don't know when {name} joined."),
    };
    respond(ctx, command, reply).await
}

async fn handle_add(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    let reply = match (int_option(command, "left"), int_option(command, "right")) {
        (Some(left), Some(right)) => basic::add(left, right),
        _ => "Two numbers are required.".to_string(),
    };
    respond(ctx, command, reply).await
}

async fn handle_roll(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    let dice = str_option(command, "dice").unwrap_or_default();
    let reply = basic::roll(dice, &mut rand::thread_rng());
    respond(ctx, command, reply).await
}

async fn handle_choose(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    let choices = str_option(command, "choices").unwrap_or_default();
    let reply = basic::choose(choices, &mut rand::thread_rng());
    respond(ctx, command, reply).await
}

async fn handle_repeat(ctx: &Context, command: &CommandInteraction, bot: &SuperBot) -> Result<()> {
    let times = int_option(command, "times").unwrap_or(1);
    let content = str_option(command, "content").unwrap_or("repeating...");
    let messages = basic::repeat(times, content, bot.config.max_repeat);

    let mut messages = messages.into_iter();
    let Some(first) = messages.next() else {
        return respond(ctx, command, "Nothing to repeat.").await;
    };
    respond(ctx, command, first).await?;

    for message in messages {
        if let Err(e) = command.channel_id.say(&ctx.http, message).await {
            warn!("Error enviando repetición: {:?}", e);
            break;
        }
    }
    Ok(())
}

async fn handle_cool(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    let subject = str_option(command, "subject").unwrap_or_default();
    respond(ctx, command, basic::cool(subject)).await
}

// Utilidades

fn invoker_for(ctx: &Context, command: &CommandInteraction, guild_id: GuildId) -> Invoker {
    let voice_channel = ctx.cache.guild(guild_id).and_then(|guild| {
        guild
            .voice_states
            .get(&command.user.id)
            .and_then(|state| state.channel_id)
    });

    let display_name = command
        .member
        .as_ref()
        .map(|member| member.display_name().to_string())
        .unwrap_or_else(|| command.user.display_name().to_string());

    Invoker {
        guild_id,
        channel_id: command.channel_id,
        user_id: command.user.id,
        display_name,
        voice_channel,
    }
}

async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    content: impl Into<String>,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await?;
    Ok(())
}

fn option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a CommandDataOptionValue> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .map(|opt| &opt.value)
}

fn str_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    option(command, name).and_then(|value| value.as_str())
}

fn int_option(command: &CommandInteraction, name: &str) -> Option<i64> {
    option(command, name).and_then(|value| value.as_i64())
}

fn channel_option(command: &CommandInteraction, name: &str) -> Option<ChannelId> {
    option(command, name).and_then(|value| value.as_channel_id())
}

fn user_option(command: &CommandInteraction, name: &str) -> Option<UserId> {
    option(command, name).and_then(|value| value.as_user_id())
}
