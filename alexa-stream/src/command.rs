//! Push command kinds
//!
//! Every notification arrives tagged with the name of the command that
//! produced it. The state core remembers which kinds it has seen to decide
//! whether push updates alone can be trusted for playback progress.

use std::fmt;
use std::str::FromStr;

/// Kind of push command that produced a notification
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PushCommand {
    PushAudioPlayerState,
    PushMediaChange,
    PushMediaProgressChange,
    PushVolumeChange,
    PushBluetoothStateChange,
    PushDopplerConnectionChange,
    PushActivity,
    PushMediaQueueChange,
    PushEqualizerStateChange,
    PushListItemChange,
    /// A command name this crate does not know about
    Other(String),
}

impl PushCommand {
    /// Map a wire command name to its kind
    pub fn from_name(name: &str) -> Self {
        match name {
            "PUSH_AUDIO_PLAYER_STATE" => PushCommand::PushAudioPlayerState,
            "PUSH_MEDIA_CHANGE" => PushCommand::PushMediaChange,
            "PUSH_MEDIA_PROGRESS_CHANGE" => PushCommand::PushMediaProgressChange,
            "PUSH_VOLUME_CHANGE" => PushCommand::PushVolumeChange,
            "PUSH_BLUETOOTH_STATE_CHANGE" => PushCommand::PushBluetoothStateChange,
            "PUSH_DOPPLER_CONNECTION_CHANGE" => PushCommand::PushDopplerConnectionChange,
            "PUSH_ACTIVITY" => PushCommand::PushActivity,
            "PUSH_MEDIA_QUEUE_CHANGE" => PushCommand::PushMediaQueueChange,
            "PUSH_EQUALIZER_STATE_CHANGE" => PushCommand::PushEqualizerStateChange,
            "PUSH_LIST_ITEM_CHANGE" => PushCommand::PushListItemChange,
            other => PushCommand::Other(other.to_string()),
        }
    }

    /// Wire name of the command
    pub fn as_str(&self) -> &str {
        match self {
            PushCommand::PushAudioPlayerState => "PUSH_AUDIO_PLAYER_STATE",
            PushCommand::PushMediaChange => "PUSH_MEDIA_CHANGE",
            PushCommand::PushMediaProgressChange => "PUSH_MEDIA_PROGRESS_CHANGE",
            PushCommand::PushVolumeChange => "PUSH_VOLUME_CHANGE",
            PushCommand::PushBluetoothStateChange => "PUSH_BLUETOOTH_STATE_CHANGE",
            PushCommand::PushDopplerConnectionChange => "PUSH_DOPPLER_CONNECTION_CHANGE",
            PushCommand::PushActivity => "PUSH_ACTIVITY",
            PushCommand::PushMediaQueueChange => "PUSH_MEDIA_QUEUE_CHANGE",
            PushCommand::PushEqualizerStateChange => "PUSH_EQUALIZER_STATE_CHANGE",
            PushCommand::PushListItemChange => "PUSH_LIST_ITEM_CHANGE",
            PushCommand::Other(name) => name,
        }
    }

    /// True for the kinds that report playback progress
    ///
    /// Once any of these has been seen for an account, push updates are
    /// trusted to keep playback state current.
    pub fn is_playback_progress(&self) -> bool {
        matches!(
            self,
            PushCommand::PushAudioPlayerState
                | PushCommand::PushMediaChange
                | PushCommand::PushMediaProgressChange
        )
    }
}

impl FromStr for PushCommand {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PushCommand::from_name(s))
    }
}

impl fmt::Display for PushCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PUSH_AUDIO_PLAYER_STATE", PushCommand::PushAudioPlayerState, true)]
    #[case("PUSH_MEDIA_CHANGE", PushCommand::PushMediaChange, true)]
    #[case("PUSH_MEDIA_PROGRESS_CHANGE", PushCommand::PushMediaProgressChange, true)]
    #[case("PUSH_VOLUME_CHANGE", PushCommand::PushVolumeChange, false)]
    #[case("PUSH_BLUETOOTH_STATE_CHANGE", PushCommand::PushBluetoothStateChange, false)]
    #[case("PUSH_ACTIVITY", PushCommand::PushActivity, false)]
    fn test_command_names(
        #[case] name: &str,
        #[case] expected: PushCommand,
        #[case] progress: bool,
    ) {
        let command: PushCommand = name.parse().unwrap();
        assert_eq!(command, expected);
        assert_eq!(command.as_str(), name);
        assert_eq!(command.is_playback_progress(), progress);
    }

    #[test]
    fn test_unknown_command_round_trips_name() {
        let command = PushCommand::from_name("PUSH_NOTIFICATION_CHANGE");
        assert_eq!(command, PushCommand::Other("PUSH_NOTIFICATION_CHANGE".to_string()));
        assert_eq!(command.to_string(), "PUSH_NOTIFICATION_CHANGE");
        assert!(!command.is_playback_progress());
    }
}
