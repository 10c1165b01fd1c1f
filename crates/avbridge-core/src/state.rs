//! Receiver and playback state types.

/// Receiver main-zone power, as inferred from commands we issued.
///
/// The control protocol has no power query, so this can diverge from
/// the true device state if the receiver is switched by a physical
/// remote. Callers must treat it as a belief, not a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Power {
    On,
    #[default]
    Off,
}

/// The engine's belief about the receiver.
///
/// Reset to defaults whenever the control connection drops; volume is
/// re-learned from the query the link issues on every connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReceiverState {
    pub power: Power,
    /// Device-native volume, always clamped to the configured ceiling.
    pub volume: u8,
}

/// Last known playback status of the music-player service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
    /// Any status outside the play/pause/stop vocabulary.
    Other,
}

impl PlaybackStatus {
    /// Map the player-bus status vocabulary onto the known states.
    #[must_use]
    pub fn from_bus(status: &str) -> Self {
        match status {
            "play" => Self::Playing,
            "pause" => Self::Paused,
            "stop" => Self::Stopped,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_status_mapping() {
        assert_eq!(PlaybackStatus::from_bus("play"), PlaybackStatus::Playing);
        assert_eq!(PlaybackStatus::from_bus("pause"), PlaybackStatus::Paused);
        assert_eq!(PlaybackStatus::from_bus("stop"), PlaybackStatus::Stopped);
        assert_eq!(PlaybackStatus::from_bus("loading"), PlaybackStatus::Other);
    }

    #[test]
    fn test_receiver_state_defaults_to_off() {
        let state = ReceiverState::default();
        assert_eq!(state.power, Power::Off);
        assert_eq!(state.volume, 0);
    }
}
