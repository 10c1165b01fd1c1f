//! Typed settings accessors.
//!
//! Settings live in one flat key-value table. Missing keys fall back
//! to the documented defaults, so a fresh or partially configured
//! store always yields a usable config.

use std::str::FromStr;

use rusqlite::{OptionalExtension, params};
use tracing::warn;

use avbridge_core::{ActionConfig, ConnectionConfig};

use crate::{Database, DbResult};

const RECEIVER_HOST: &str = "receiver_host";
const RECEIVER_PORT: &str = "receiver_port";
const MAX_VOLUME: &str = "max_volume";
const POWER_ON_PLAY: &str = "power_on_play";
const SET_VOLUME_ON_PLAY: &str = "set_volume_on_play";
const VOLUME_ON_PLAY: &str = "volume_on_play";
const SET_INPUT_ON_PLAY: &str = "set_input_on_play";
const INPUT_ON_PLAY: &str = "input_on_play";
const STANDBY_ON_IDLE: &str = "standby_on_idle";
const STANDBY_DELAY_SECS: &str = "standby_delay_secs";

impl Database {
    /// Read one raw setting.
    pub fn get_setting(&self, key: &str) -> DbResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Write one raw setting (insert or update).
    pub fn set_setting(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            r"INSERT INTO settings (key, value) VALUES (?, ?)
              ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// Load the receiver connection settings.
    pub fn connection_config(&self) -> DbResult<ConnectionConfig> {
        let defaults = ConnectionConfig::default();
        Ok(ConnectionConfig {
            host: self.get_setting(RECEIVER_HOST)?.unwrap_or(defaults.host),
            port: self.get_parsed(RECEIVER_PORT, defaults.port)?,
            max_volume: self.get_parsed(MAX_VOLUME, defaults.max_volume)?,
        })
    }

    /// Persist the receiver connection settings.
    pub fn save_connection_config(&self, cfg: &ConnectionConfig) -> DbResult<()> {
        self.set_setting(RECEIVER_HOST, &cfg.host)?;
        self.set_setting(RECEIVER_PORT, &cfg.port.to_string())?;
        self.set_setting(MAX_VOLUME, &cfg.max_volume.to_string())?;
        Ok(())
    }

    /// Load the playback action settings.
    pub fn action_config(&self) -> DbResult<ActionConfig> {
        let defaults = ActionConfig::default();
        Ok(ActionConfig {
            power_on_play: self.get_parsed(POWER_ON_PLAY, defaults.power_on_play)?,
            set_volume_on_play: self.get_parsed(SET_VOLUME_ON_PLAY, defaults.set_volume_on_play)?,
            volume_on_play: self.get_parsed(VOLUME_ON_PLAY, defaults.volume_on_play)?,
            set_input_on_play: self.get_parsed(SET_INPUT_ON_PLAY, defaults.set_input_on_play)?,
            input_on_play: self.get_setting(INPUT_ON_PLAY)?.unwrap_or(defaults.input_on_play),
            standby_on_idle: self.get_parsed(STANDBY_ON_IDLE, defaults.standby_on_idle)?,
            standby_delay_secs: self.get_parsed(STANDBY_DELAY_SECS, defaults.standby_delay_secs)?,
        })
    }

    /// Persist the playback action settings.
    pub fn save_action_config(&self, cfg: &ActionConfig) -> DbResult<()> {
        self.set_setting(POWER_ON_PLAY, &cfg.power_on_play.to_string())?;
        self.set_setting(SET_VOLUME_ON_PLAY, &cfg.set_volume_on_play.to_string())?;
        self.set_setting(VOLUME_ON_PLAY, &cfg.volume_on_play.to_string())?;
        self.set_setting(SET_INPUT_ON_PLAY, &cfg.set_input_on_play.to_string())?;
        self.set_setting(INPUT_ON_PLAY, &cfg.input_on_play)?;
        self.set_setting(STANDBY_ON_IDLE, &cfg.standby_on_idle.to_string())?;
        self.set_setting(STANDBY_DELAY_SECS, &cfg.standby_delay_secs.to_string())?;
        Ok(())
    }

    /// Parse a setting, falling back to `default` when the key is
    /// missing or the stored value does not parse.
    fn get_parsed<T: FromStr>(&self, key: &str, default: T) -> DbResult<T> {
        match self.get_setting(key)? {
            Some(raw) => match raw.parse() {
                Ok(value) => Ok(value),
                Err(_) => {
                    warn!(key, value = %raw, "Unparseable setting, using default");
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }
}
