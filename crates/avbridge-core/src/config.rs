//! User-facing configuration read from the settings store.

/// Default receiver control port.
pub const DEFAULT_PORT: u16 = 23;

/// Default device-native volume ceiling.
pub const DEFAULT_MAX_VOLUME: u8 = 66;

/// How to reach the receiver.
///
/// Read from the settings store at connect time and again on every
/// reconnect, so a saved change takes effect without a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Receiver host name or IP; empty means "not configured".
    pub host: String,
    pub port: u16,
    /// Volume ceiling; every stored or emitted volume is clamped to it.
    pub max_volume: u8,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { host: String::new(), port: DEFAULT_PORT, max_volume: DEFAULT_MAX_VOLUME }
    }
}

/// What to do on playback transitions.
///
/// A fresh snapshot is read before each decision, so edits made while
/// the daemon runs apply from the next event onward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionConfig {
    /// Power the receiver on when playback starts
    pub power_on_play: bool,
    /// Set a fixed starting volume when playback starts
    pub set_volume_on_play: bool,
    /// The starting volume (clamped to `max_volume`)
    pub volume_on_play: u8,
    /// Select an input source when playback starts
    pub set_input_on_play: bool,
    /// The input source to select
    pub input_on_play: String,
    /// Power off after sustained pause/stop
    pub standby_on_idle: bool,
    /// How long playback must stay idle before powering off
    pub standby_delay_secs: u64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            power_on_play: true,
            set_volume_on_play: false,
            volume_on_play: 20,
            set_input_on_play: false,
            input_on_play: "CD".to_string(),
            standby_on_idle: true,
            standby_delay_secs: 30,
        }
    }
}
