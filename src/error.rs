//! Error types for playback, track resolution and voice connections.

use thiserror::Error;

/// Errors raised by a guild worker or by a player capability.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Nothing is currently playing in the guild
    #[error("Not playing anything")]
    NotPlaying,

    /// Volume outside the accepted gain range
    #[error("Volume {0} is outside the range 0.0..=2.0")]
    VolumeOutOfRange(f32),

    /// The player was asked to start twice
    #[error("Track has already been started")]
    AlreadyStarted,

    /// No voice connection to play on
    #[error("No voice connection for this guild")]
    NoVoiceConnection,

    /// The audio stream could not be started
    #[error("{0}")]
    Stream(String),
}

impl PlaybackError {
    /// Short category name shown in chat error reports.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotPlaying => "NotPlaying",
            Self::VolumeOutOfRange(_) => "VolumeOutOfRange",
            Self::AlreadyStarted => "AlreadyStarted",
            Self::NoVoiceConnection => "NoVoiceConnection",
            Self::Stream(_) => "StreamError",
        }
    }
}

/// Errors raised while turning a search string into a player.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("No results found for {0}")]
    NoResults(String),

    #[error("{0}")]
    Resolve(String),
}

impl SourceError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::NoResults(_) => "NoResults",
            Self::Resolve(_) => "ResolveError",
        }
    }
}

/// Errors raised by the voice transport.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("This is not a voice channel")]
    NotAVoiceChannel,

    #[error("Already in a voice channel")]
    AlreadyConnected,

    #[error("Could not join the voice channel: {0}")]
    Join(String),

    #[error("Could not leave the voice channel: {0}")]
    Disconnect(String),
}

/// Rejected `roll` notation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Format has to be in NdN!")]
    Format,

    #[error("Dice count must be between 1 and {max}, got {got}")]
    TooManyDice { got: u32, max: u32 },

    #[error("Dice must have between 1 and {max} faces, got {got}")]
    TooManyFaces { got: u32, max: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn source_error_reports_its_category() {
        let err = SourceError::Resolve("network unreachable".to_string());
        assert_eq!(err.category(), "ResolveError");
        assert_eq!(err.to_string(), "network unreachable");

        let missing = SourceError::NoResults("nothing at all".to_string());
        assert_eq!(missing.category(), "NoResults");
        assert_eq!(missing.to_string(), "No results found for nothing at all");
    }

    #[test]
    fn playback_error_categories_match_chat_reports() {
        let err = PlaybackError::Stream("network unreachable".to_string());
        assert_eq!(err.category(), "StreamError");
        assert_eq!(err.to_string(), "network unreachable");
        assert_eq!(PlaybackError::NoVoiceConnection.category(), "NoVoiceConnection");
    }
}
