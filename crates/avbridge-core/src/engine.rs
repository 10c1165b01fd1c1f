//! Reconciliation between playback notifications and receiver state.
//!
//! The engine is a synchronous state machine with a single writer: the
//! daemon feeds it one [`Input`] at a time, in arrival order, and
//! carries out the returned [`Effect`]s. All timing (the standby delay)
//! is handled by the caller re-entering the engine with
//! [`Input::StandbyElapsed`].

use std::time::Duration;

use tracing::{debug, info};

use crate::command::AvrCommand;
use crate::config::ActionConfig;
use crate::state::{PlaybackStatus, Power, ReceiverState};

/// An event for the engine to reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A playback notification from the player bus.
    Playback { status: PlaybackStatus, volume: i64 },
    /// A decoded volume report from the receiver.
    VolumeReport(u8),
    /// A previously scheduled standby check has come due.
    StandbyElapsed { epoch: u64 },
    /// The control connection dropped.
    LinkDown,
}

/// An action the caller must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a command to the receiver.
    Send(AvrCommand),
    /// Reflect a volume back onto the player bus.
    PushVolume(u8),
    /// Arrange for `Input::StandbyElapsed { epoch }` after the delay.
    ///
    /// Each new schedule carries a fresh epoch; checks from earlier
    /// pause episodes are stale and must be ignored when they fire.
    ScheduleStandby { after: Duration, epoch: u64 },
}

/// State machine over (playback status, receiver belief).
#[derive(Debug, Default)]
pub struct Engine {
    playback: PlaybackStatus,
    receiver: ReceiverState,
    standby_epoch: u64,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The engine's current belief about the receiver.
    #[must_use]
    pub fn receiver(&self) -> ReceiverState {
        self.receiver
    }

    /// Last stored playback status.
    #[must_use]
    pub fn playback(&self) -> PlaybackStatus {
        self.playback
    }

    /// Process one input and return the effects to carry out.
    ///
    /// `actions` and `max_volume` are the live settings at the moment
    /// the input is processed; the caller re-reads them per event.
    pub fn handle(&mut self, input: Input, actions: &ActionConfig, max_volume: u8) -> Vec<Effect> {
        match input {
            Input::Playback { status, volume } => {
                self.on_playback(status, volume, actions, max_volume)
            }
            Input::VolumeReport(vol) => {
                let vol = vol.min(max_volume);
                debug!(volume = vol, "Receiver volume report stored");
                self.receiver.volume = vol;
                Vec::new()
            }
            Input::StandbyElapsed { epoch } => self.on_standby_elapsed(epoch),
            Input::LinkDown => {
                debug!("Control connection down, resetting receiver belief");
                self.receiver = ReceiverState::default();
                Vec::new()
            }
        }
    }

    fn on_playback(
        &mut self,
        status: PlaybackStatus,
        volume: i64,
        actions: &ActionConfig,
        max_volume: u8,
    ) -> Vec<Effect> {
        if status == self.playback {
            // Same status twice means the user moved the volume slider.
            let vol = clamp_volume(volume, max_volume);
            if self.receiver.power == Power::On && vol != self.receiver.volume {
                info!(volume = vol, "Syncing player volume to receiver");
                self.receiver.volume = vol;
                return vec![Effect::Send(AvrCommand::SetVolume(vol))];
            }
            return Vec::new();
        }

        debug!(?status, previous = ?self.playback, "Playback status changed");
        self.playback = status;

        let mut effects = Vec::new();
        match status {
            PlaybackStatus::Playing => {
                if self.receiver.power == Power::Off {
                    if actions.power_on_play {
                        effects.push(Effect::Send(AvrCommand::PowerOn));
                    }
                    if actions.set_volume_on_play {
                        let vol = actions.volume_on_play.min(max_volume);
                        self.receiver.volume = vol;
                        effects.push(Effect::Send(AvrCommand::SetVolume(vol)));
                        // The player UI must show the volume we just forced.
                        effects.push(Effect::PushVolume(vol));
                    }
                    if actions.set_input_on_play {
                        effects
                            .push(Effect::Send(AvrCommand::SetInput(actions.input_on_play.clone())));
                    }
                    self.receiver.power = Power::On;
                }
            }
            PlaybackStatus::Paused | PlaybackStatus::Stopped => {
                if actions.standby_on_idle && self.receiver.power == Power::On {
                    self.standby_epoch += 1;
                    let after = Duration::from_secs(actions.standby_delay_secs);
                    debug!(delay_secs = actions.standby_delay_secs, epoch = self.standby_epoch,
                        "Scheduling standby check");
                    effects.push(Effect::ScheduleStandby { after, epoch: self.standby_epoch });
                }
            }
            PlaybackStatus::Other => {}
        }
        effects
    }

    fn on_standby_elapsed(&mut self, epoch: u64) -> Vec<Effect> {
        if epoch != self.standby_epoch {
            debug!(epoch, current = self.standby_epoch, "Ignoring stale standby check");
            return Vec::new();
        }
        if self.playback == PlaybackStatus::Playing || self.receiver.power != Power::On {
            debug!("Standby check: playback resumed or receiver already off");
            return Vec::new();
        }
        info!("Playback idle past the standby delay, powering receiver off");
        self.receiver.power = Power::Off;
        vec![Effect::Send(AvrCommand::PowerOff)]
    }
}

/// Clamp a bus volume (which may be any integer) to `[0, max]`.
fn clamp_volume(volume: i64, max: u8) -> u8 {
    u8::try_from(volume.clamp(0, i64::from(max))).unwrap_or(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    const MAX: u8 = 66;

    fn all_actions() -> ActionConfig {
        ActionConfig {
            power_on_play: true,
            set_volume_on_play: true,
            volume_on_play: 30,
            set_input_on_play: true,
            input_on_play: "CD".to_string(),
            standby_on_idle: true,
            standby_delay_secs: 5,
        }
    }

    /// Engine that has seen a Stopped -> Playing transition, so the
    /// receiver is believed to be on.
    fn playing_engine(actions: &ActionConfig) -> Engine {
        let mut engine = Engine::new();
        let effects =
            engine.handle(Input::Playback { status: PlaybackStatus::Playing, volume: 0 }, actions, MAX);
        assert!(!effects.is_empty());
        engine
    }

    #[test]
    fn test_play_transition_orders_power_volume_input() {
        let actions = all_actions();
        let mut engine = Engine::new();

        let effects =
            engine.handle(Input::Playback { status: PlaybackStatus::Playing, volume: 0 }, &actions, MAX);

        let commands: Vec<_> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            commands,
            vec![
                AvrCommand::PowerOn,
                AvrCommand::SetVolume(30),
                AvrCommand::SetInput("CD".to_string()),
            ]
        );
        assert!(effects.contains(&Effect::PushVolume(30)));
        assert_eq!(engine.receiver().power, Power::On);
        assert_eq!(engine.receiver().volume, 30);
    }

    #[test]
    fn test_play_transition_respects_disabled_actions() {
        let actions = ActionConfig {
            power_on_play: false,
            set_volume_on_play: false,
            set_input_on_play: false,
            ..all_actions()
        };
        let mut engine = Engine::new();

        let effects =
            engine.handle(Input::Playback { status: PlaybackStatus::Playing, volume: 0 }, &actions, MAX);

        // No commands fire, but the receiver is still considered on so
        // later volume syncs work.
        assert!(effects.is_empty());
        assert_eq!(engine.receiver().power, Power::On);
    }

    #[test]
    fn test_play_while_already_on_is_quiet() {
        let actions = all_actions();
        let mut engine = playing_engine(&actions);

        engine.handle(Input::Playback { status: PlaybackStatus::Paused, volume: 0 }, &actions, MAX);
        let effects =
            engine.handle(Input::Playback { status: PlaybackStatus::Playing, volume: 0 }, &actions, MAX);

        assert!(effects.is_empty());
    }

    #[test]
    fn test_start_volume_is_clamped_to_ceiling() {
        let actions = ActionConfig { volume_on_play: 99, ..all_actions() };
        let mut engine = Engine::new();

        let effects =
            engine.handle(Input::Playback { status: PlaybackStatus::Playing, volume: 0 }, &actions, MAX);

        assert!(effects.contains(&Effect::Send(AvrCommand::SetVolume(MAX))));
        assert!(effects.contains(&Effect::PushVolume(MAX)));
        assert_eq!(engine.receiver().volume, MAX);
    }

    #[test]
    fn test_volume_sync_emits_single_command() {
        let actions = all_actions();
        let mut engine = playing_engine(&actions);

        let effects =
            engine.handle(Input::Playback { status: PlaybackStatus::Playing, volume: 42 }, &actions, MAX);

        assert_eq!(effects, vec![Effect::Send(AvrCommand::SetVolume(42))]);
        assert_eq!(engine.receiver().volume, 42);
    }

    #[test]
    fn test_volume_sync_noop_when_unchanged() {
        let actions = all_actions();
        let mut engine = playing_engine(&actions);

        let effects =
            engine.handle(Input::Playback { status: PlaybackStatus::Playing, volume: 30 }, &actions, MAX);

        assert!(effects.is_empty());
    }

    #[test]
    fn test_volume_sync_noop_while_off() {
        let actions = all_actions();
        let mut engine = Engine::new();

        // Stopped is the initial status, so this is a pure volume event.
        let effects =
            engine.handle(Input::Playback { status: PlaybackStatus::Stopped, volume: 42 }, &actions, MAX);

        assert!(effects.is_empty());
        assert_eq!(engine.receiver().volume, 0);
    }

    #[test]
    fn test_pause_schedules_standby_check() {
        let actions = all_actions();
        let mut engine = playing_engine(&actions);

        let effects =
            engine.handle(Input::Playback { status: PlaybackStatus::Paused, volume: 0 }, &actions, MAX);

        assert_matches!(
            effects.as_slice(),
            [Effect::ScheduleStandby { after, epoch: 1 }] if *after == Duration::from_secs(5)
        );
    }

    #[test]
    fn test_standby_fires_after_sustained_pause() {
        let actions = all_actions();
        let mut engine = playing_engine(&actions);

        engine.handle(Input::Playback { status: PlaybackStatus::Paused, volume: 0 }, &actions, MAX);
        let effects = engine.handle(Input::StandbyElapsed { epoch: 1 }, &actions, MAX);

        assert_eq!(effects, vec![Effect::Send(AvrCommand::PowerOff)]);
        assert_eq!(engine.receiver().power, Power::Off);
    }

    #[test]
    fn test_standby_cancelled_by_resume() {
        let actions = all_actions();
        let mut engine = playing_engine(&actions);

        engine.handle(Input::Playback { status: PlaybackStatus::Paused, volume: 0 }, &actions, MAX);
        engine.handle(Input::Playback { status: PlaybackStatus::Playing, volume: 30 }, &actions, MAX);
        let effects = engine.handle(Input::StandbyElapsed { epoch: 1 }, &actions, MAX);

        assert!(effects.is_empty());
        assert_eq!(engine.receiver().power, Power::On);
    }

    #[test]
    fn test_stale_standby_check_is_ignored() {
        let actions = all_actions();
        let mut engine = playing_engine(&actions);

        // Two pause episodes; only the second check may fire.
        engine.handle(Input::Playback { status: PlaybackStatus::Paused, volume: 0 }, &actions, MAX);
        engine.handle(Input::Playback { status: PlaybackStatus::Playing, volume: 30 }, &actions, MAX);
        let effects =
            engine.handle(Input::Playback { status: PlaybackStatus::Stopped, volume: 0 }, &actions, MAX);
        assert_matches!(effects.as_slice(), [Effect::ScheduleStandby { epoch: 2, .. }]);

        let stale = engine.handle(Input::StandbyElapsed { epoch: 1 }, &actions, MAX);
        assert!(stale.is_empty());
        assert_eq!(engine.receiver().power, Power::On);

        let current = engine.handle(Input::StandbyElapsed { epoch: 2 }, &actions, MAX);
        assert_eq!(current, vec![Effect::Send(AvrCommand::PowerOff)]);
    }

    #[test]
    fn test_pause_with_standby_disabled_schedules_nothing() {
        let actions = ActionConfig { standby_on_idle: false, ..all_actions() };
        let mut engine = playing_engine(&actions);

        let effects =
            engine.handle(Input::Playback { status: PlaybackStatus::Paused, volume: 0 }, &actions, MAX);

        assert!(effects.is_empty());
    }

    #[test]
    fn test_pause_stop_churn_has_no_power_side_effects() {
        let actions = ActionConfig { standby_on_idle: false, ..all_actions() };
        let mut engine = playing_engine(&actions);

        let a = engine.handle(Input::Playback { status: PlaybackStatus::Paused, volume: 0 }, &actions, MAX);
        let b = engine.handle(Input::Playback { status: PlaybackStatus::Stopped, volume: 0 }, &actions, MAX);

        assert!(a.is_empty());
        assert!(b.is_empty());
        assert_eq!(engine.receiver().power, Power::On);
    }

    #[test]
    fn test_volume_report_stored_without_bus_push() {
        let actions = all_actions();
        let mut engine = playing_engine(&actions);

        let effects = engine.handle(Input::VolumeReport(25), &actions, MAX);

        assert!(effects.is_empty());
        assert_eq!(engine.receiver().volume, 25);
    }

    #[test]
    fn test_volume_report_clamped_to_ceiling() {
        let actions = all_actions();
        let mut engine = Engine::new();

        engine.handle(Input::VolumeReport(80), &actions, MAX);

        assert_eq!(engine.receiver().volume, MAX);
    }

    #[test]
    fn test_link_down_resets_receiver_belief() {
        let actions = all_actions();
        let mut engine = playing_engine(&actions);

        let effects = engine.handle(Input::LinkDown, &actions, MAX);

        assert!(effects.is_empty());
        assert_eq!(engine.receiver(), ReceiverState::default());
    }

    proptest! {
        #[test]
        fn volume_sync_stores_what_it_emits(v in 0i64..=i64::from(MAX)) {
            let actions = all_actions();
            let mut engine = playing_engine(&actions);

            let effects = engine.handle(
                Input::Playback { status: PlaybackStatus::Playing, volume: v },
                &actions,
                MAX,
            );

            let expected = u8::try_from(v).unwrap();
            if expected == 30 {
                // Matches the start volume, so nothing to sync.
                prop_assert!(effects.is_empty());
            } else {
                prop_assert_eq!(effects, vec![Effect::Send(AvrCommand::SetVolume(expected))]);
            }
            prop_assert_eq!(engine.receiver().volume, expected);
        }

        #[test]
        fn bus_volume_never_exceeds_ceiling(v in i64::from(MAX) + 1..=1000) {
            let actions = all_actions();
            let mut engine = playing_engine(&actions);

            engine.handle(
                Input::Playback { status: PlaybackStatus::Playing, volume: v },
                &actions,
                MAX,
            );

            prop_assert_eq!(engine.receiver().volume, MAX);
        }
    }
}
