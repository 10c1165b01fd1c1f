//! Inbound player bus events.

use serde::{Deserialize, Serialize};

/// A notification pushed by the player service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event", content = "data")]
pub enum BusEvent {
    /// Playback state changed, or the user moved the volume slider.
    PushState(PlaybackNotice),
}

/// Payload of a playback-state push.
///
/// `status` is the player's own vocabulary ("play", "pause", "stop",
/// and whatever else it invents); mapping onto the bridge's states
/// happens in the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackNotice {
    pub status: String,
    #[serde(default)]
    pub volume: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_state_parses() {
        let event: BusEvent =
            serde_json::from_str(r#"{"event":"push_state","data":{"status":"play","volume":42}}"#)
                .expect("event did not parse");
        assert_eq!(
            event,
            BusEvent::PushState(PlaybackNotice { status: "play".to_string(), volume: 42 })
        );
    }

    #[test]
    fn test_volume_defaults_to_zero() {
        let event: BusEvent =
            serde_json::from_str(r#"{"event":"push_state","data":{"status":"stop"}}"#)
                .expect("event did not parse");
        assert_eq!(
            event,
            BusEvent::PushState(PlaybackNotice { status: "stop".to_string(), volume: 0 })
        );
    }

    #[test]
    fn test_unknown_event_is_an_error() {
        let result = serde_json::from_str::<BusEvent>(r#"{"event":"push_queue","data":{}}"#);
        assert!(result.is_err());
    }
}
