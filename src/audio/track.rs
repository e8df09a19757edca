use serenity::model::id::{ChannelId, UserId};
use std::{fmt, sync::Arc, time::Duration};

use super::Player;

const UNKNOWN_TITLE: &str = "Unknown title";
const UNKNOWN_UPLOADER: &str = "unknown uploader";

/// Descriptive metadata reported by a player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub duration: Option<Duration>,
    pub url: Option<String>,
}

impl TrackMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_uploader(mut self, uploader: impl Into<String>) -> Self {
        self.uploader = Some(uploader.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// One accepted playback request.
///
/// Owned by the guild's queue until dequeued, then by the worker as the
/// current track until playback ends.
#[derive(Clone)]
pub struct TrackEntry {
    pub requester: UserId,
    pub requester_name: String,
    pub origin_channel: ChannelId,
    pub player: Arc<dyn Player>,
}

impl TrackEntry {
    pub fn new(
        requester: UserId,
        requester_name: impl Into<String>,
        origin_channel: ChannelId,
        player: Arc<dyn Player>,
    ) -> Self {
        Self {
            requester,
            requester_name: requester_name.into(),
            origin_channel,
            player,
        }
    }

    pub fn title(&self) -> &str {
        self.player
            .metadata()
            .title
            .as_deref()
            .unwrap_or(UNKNOWN_TITLE)
    }
}

impl fmt::Display for TrackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = self.player.metadata();
        write!(
            f,
            "{} uploaded by {} and requested by {}",
            metadata.title.as_deref().unwrap_or(UNKNOWN_TITLE),
            metadata.uploader.as_deref().unwrap_or(UNKNOWN_UPLOADER),
            self.requester_name
        )?;

        if let Some(duration) = metadata.duration {
            let seconds = duration.as_secs();
            write!(f, ", [length: {}m {}s]", seconds / 60, seconds % 60)?;
        }

        Ok(())
    }
}

impl fmt::Debug for TrackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackEntry")
            .field("requester", &self.requester)
            .field("origin_channel", &self.origin_channel)
            .field("title", &self.title())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::FakePlayer;
    use pretty_assertions::assert_eq;

    fn entry(metadata: TrackMetadata) -> TrackEntry {
        TrackEntry::new(
            UserId::new(7),
            "alice",
            ChannelId::new(70),
            FakePlayer::with_metadata(metadata),
        )
    }

    #[test]
    fn description_includes_length_when_known() {
        let entry = entry(
            TrackMetadata::new("Around the World")
                .with_uploader("Daft Punk")
                .with_duration(Duration::from_secs(429)),
        );

        assert_eq!(
            entry.to_string(),
            "Around the World uploaded by Daft Punk and requested by alice, [length: 7m 9s]"
        );
    }

    #[test]
    fn description_omits_length_without_duration() {
        let entry = entry(TrackMetadata::new("Intro").with_uploader("The xx"));

        assert_eq!(
            entry.to_string(),
            "Intro uploaded by The xx and requested by alice"
        );
    }

    #[test]
    fn missing_metadata_falls_back_to_placeholders() {
        let entry = entry(TrackMetadata::default());

        assert_eq!(entry.title(), "Unknown title");
        assert_eq!(
            entry.to_string(),
            "Unknown title uploaded by unknown uploader and requested by alice"
        );
    }
}
