//! SuperBot: a Discord bot with per-guild music playback and skip votes.

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod sources;
