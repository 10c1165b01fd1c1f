//! Outbound player bus requests.

use serde::{Deserialize, Serialize};

/// A request sent to the player service. Fire-and-forget; the bus
/// sends no acknowledgements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method", content = "data")]
pub enum BusRequest {
    /// Reflect a volume in the player's own UI.
    SetVolume { volume: u8 },
    /// Show a transient notice to the user.
    PushToast { kind: ToastKind, message: String },
}

/// Severity of a user notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_volume_shape() {
        let json = serde_json::to_string(&BusRequest::SetVolume { volume: 30 }).unwrap();
        assert_eq!(json, r#"{"method":"set_volume","data":{"volume":30}}"#);
    }

    #[test]
    fn test_toast_shape() {
        let json = serde_json::to_string(&BusRequest::PushToast {
            kind: ToastKind::Info,
            message: "No receiver configured".to_string(),
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"method":"push_toast","data":{"kind":"info","message":"No receiver configured"}}"#
        );
    }
}
