use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, channel::ChannelType, id::GuildId},
    prelude::Context,
};

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        join_command(),
        summon_command(),
        play_command(),
        volume_command(),
        pause_command(),
        resume_command(),
        stop_command(),
        skip_command(),
        playing_command(),
        queue_command(),
        add_command(),
        roll_command(),
        choose_command(),
        repeat_command(),
        joined_command(),
        cool_command(),
    ]
}

// Comandos de voz

fn join_command() -> CreateCommand {
    CreateCommand::new("join")
        .description("Joins a voice channel")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Channel, "channel", "Voice channel to join")
                .channel_types(vec![ChannelType::Voice, ChannelType::Stage])
                .required(true),
        )
}

fn summon_command() -> CreateCommand {
    CreateCommand::new("summon").description("Summons the bot to your voice channel")
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Plays a song from a URL or a search")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "song", "URL or search terms")
                .required(true),
        )
}

fn volume_command() -> CreateCommand {
    CreateCommand::new("volume")
        .description("Sets the volume of the current song")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "value", "Volume (0-100)")
                .required(true),
        )
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pauses the current song")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resumes the current song")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Stops playing, clears the queue and leaves")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Votes to skip the current song")
}

fn playing_command() -> CreateCommand {
    CreateCommand::new("playing").description("Shows the song being played")
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Shows the upcoming songs")
}

// Comandos básicos

fn add_command() -> CreateCommand {
    CreateCommand::new("add")
        .description("Adds two numbers together")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "left", "First number")
                .required(true),
        )
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "right", "Second number")
                .required(true),
        )
}

fn roll_command() -> CreateCommand {
    CreateCommand::new("roll")
        .description("Rolls dice in NdN format")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "dice", "For example 2d6")
                .required(true),
        )
}

fn choose_command() -> CreateCommand {
    CreateCommand::new("choose")
        .description("Chooses between multiple choices")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "choices",
                "Choices separated by spaces",
            )
            .required(true),
        )
}

fn repeat_command() -> CreateCommand {
    CreateCommand::new("repeat")
        .description("Repeats a message multiple times")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "times", "How many times")
                .min_int_value(1)
                .required(true),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::String,
            "content",
            "What to repeat",
        ))
}

fn joined_command() -> CreateCommand {
    CreateCommand::new("joined")
        .description("Says when a member joined")
        .add_option(
            CreateCommandOption::new(CommandOptionType::User, "member", "Member to look up")
                .required(true),
        )
}

fn cool_command() -> CreateCommand {
    CreateCommand::new("cool")
        .description("Says if someone is cool")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "subject", "Who to judge")
                .required(true),
        )
}
