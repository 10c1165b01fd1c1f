//! The serialized bridge loop.
//!
//! Everything that touches the engine's state funnels through one
//! `select!` loop: player bus notifications, receiver link events,
//! standby timers coming due, and signals. Events are therefore
//! processed one at a time, in arrival order, and the engine never
//! needs a lock.

use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::Sleep;
use tracing::{debug, error, info, warn};

use avbridge_avr::{AvrEvent, AvrLink, LinkEvent};
use avbridge_core::config::DEFAULT_MAX_VOLUME;
use avbridge_core::{ActionConfig, Effect, Engine, Input, PlaybackStatus};
use avbridge_db::Database;
use avbridge_player::{BusEvent, PlaybackNotice, PlayerBus, ToastKind};

use crate::signals::Signal;

/// Delay before retrying a failed player bus connection.
const BUS_RETRY_DELAY: Duration = Duration::from_secs(10);

const NO_RECEIVER_NOTICE: &str =
    "No receiver configured. Save a receiver host to enable the bridge.";

pub struct Bridge {
    db: Database,
    engine: Engine,
    link: AvrLink,
    link_events: mpsc::Receiver<LinkEvent>,
    bus_addr: String,
    bus: Option<PlayerBus>,
    bus_events: Option<mpsc::Receiver<BusEvent>>,
    bus_retry: Option<Pin<Box<Sleep>>>,
    standby_tx: mpsc::Sender<u64>,
    standby_rx: mpsc::Receiver<u64>,
    signals: mpsc::Receiver<Signal>,
}

enum Wake {
    Bus(Option<BusEvent>),
    Link(Option<LinkEvent>),
    Standby(u64),
    BusRetry,
    Signal(Option<Signal>),
}

impl Bridge {
    #[must_use]
    pub fn new(db: Database, bus_addr: String, signals: mpsc::Receiver<Signal>) -> Self {
        let (link_event_tx, link_events) = mpsc::channel(32);
        let link = AvrLink::spawn(link_event_tx);
        let (standby_tx, standby_rx) = mpsc::channel(8);

        Self {
            db,
            engine: Engine::new(),
            link,
            link_events,
            bus_addr,
            bus: None,
            bus_events: None,
            bus_retry: None,
            standby_tx,
            standby_rx,
            signals,
        }
    }

    /// Run the bridge until a shutdown signal arrives.
    ///
    /// # Errors
    /// Returns an error if the settings store is unreadable at startup
    /// or the link task dies.
    pub async fn run(mut self) -> Result<()> {
        self.connect_bus().await;

        let cfg = self.db.connection_config().context("Failed to read connection settings")?;
        if cfg.host.is_empty() {
            warn!("No receiver host configured; the bridge idles until one is saved");
            self.notify(ToastKind::Info, NO_RECEIVER_NOTICE).await;
        } else if let Err(e) = self.link.connect(cfg).await {
            error!(error = %e, "Failed to start the receiver link");
        }

        info!("Bridge running");

        loop {
            let wake = tokio::select! {
                ev = recv_bus(&mut self.bus_events) => Wake::Bus(ev),
                ev = self.link_events.recv() => Wake::Link(ev),
                Some(epoch) = self.standby_rx.recv() => Wake::Standby(epoch),
                () = wait_sleep(&mut self.bus_retry) => Wake::BusRetry,
                sig = self.signals.recv() => Wake::Signal(sig),
            };

            match wake {
                Wake::Bus(Some(BusEvent::PushState(notice))) => self.on_player_state(notice).await,
                Wake::Bus(None) => {
                    warn!("Player bus connection lost");
                    self.schedule_bus_retry();
                }
                Wake::Link(Some(event)) => self.on_link_event(event).await,
                Wake::Link(None) => {
                    error!("Receiver link task is gone");
                    anyhow::bail!("receiver link task exited unexpectedly");
                }
                Wake::Standby(epoch) => self.dispatch(Input::StandbyElapsed { epoch }).await,
                Wake::BusRetry => {
                    self.bus_retry = None;
                    self.connect_bus().await;
                }
                Wake::Signal(Some(Signal::Reload)) => self.reload().await,
                Wake::Signal(Some(Signal::Shutdown) | None) => break,
            }
        }

        info!("Shutting down bridge");
        if let Err(e) = self.link.disconnect().await {
            error!(error = %e, "Link shutdown failed");
        }
        Ok(())
    }

    async fn on_player_state(&mut self, notice: PlaybackNotice) {
        debug!(status = %notice.status, volume = notice.volume, "Player state notification");
        let status = PlaybackStatus::from_bus(&notice.status);
        self.dispatch(Input::Playback { status, volume: notice.volume }).await;
    }

    async fn on_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => info!("Receiver link is up"),
            LinkEvent::Disconnected => self.dispatch(Input::LinkDown).await,
            LinkEvent::Received(AvrEvent::VolumeReport(vol)) => {
                self.dispatch(Input::VolumeReport(vol)).await;
            }
            // Malformed and unrecognized lines are logged by the link.
            LinkEvent::Received(_) => {}
        }
    }

    /// Feed one input to the engine under the live settings and carry
    /// out the resulting effects.
    async fn dispatch(&mut self, input: Input) {
        let actions = match self.db.action_config() {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(error = %e, "Failed to read action settings, using defaults");
                ActionConfig::default()
            }
        };
        let max_volume = match self.db.connection_config() {
            Ok(cfg) => cfg.max_volume,
            Err(e) => {
                error!(error = %e, "Failed to read connection settings, using default ceiling");
                DEFAULT_MAX_VOLUME
            }
        };

        for effect in self.engine.handle(input, &actions, max_volume) {
            self.apply(effect).await;
        }
    }

    async fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Send(cmd) => {
                if let Err(e) = self.link.send(cmd).await {
                    error!(error = %e, "Failed to hand command to the link");
                }
            }
            Effect::PushVolume(volume) => {
                if let Some(bus) = &self.bus {
                    if let Err(e) = bus.set_volume(volume).await {
                        warn!(error = %e, "Failed to push volume to the player");
                    }
                }
            }
            Effect::ScheduleStandby { after, epoch } => {
                let tx = self.standby_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(epoch).await;
                });
            }
        }
    }

    async fn connect_bus(&mut self) {
        match PlayerBus::connect(&self.bus_addr).await {
            Ok((bus, events)) => {
                info!(addr = %self.bus_addr, "Connected to player bus");
                self.bus = Some(bus);
                self.bus_events = Some(events);
                self.bus_retry = None;
            }
            Err(e) => {
                error!(error = %e, addr = %self.bus_addr, "Player bus connection failed");
                self.schedule_bus_retry();
            }
        }
    }

    fn schedule_bus_retry(&mut self) {
        self.bus = None;
        self.bus_events = None;
        info!(delay_secs = BUS_RETRY_DELAY.as_secs(), "Will retry player bus connection");
        self.bus_retry = Some(Box::pin(tokio::time::sleep(BUS_RETRY_DELAY)));
    }

    /// Re-read connection settings and cycle the link (SIGHUP).
    async fn reload(&mut self) {
        info!("Reloading receiver connection settings");
        let cfg = match self.db.connection_config() {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(error = %e, "Failed to reload connection settings");
                return;
            }
        };

        if let Err(e) = self.link.disconnect().await {
            error!(error = %e, "Failed to stop the link for reload");
            return;
        }

        if cfg.host.is_empty() {
            warn!("No receiver host configured after reload");
            self.notify(ToastKind::Info, NO_RECEIVER_NOTICE).await;
        } else if let Err(e) = self.link.connect(cfg).await {
            error!(error = %e, "Failed to restart the receiver link");
        }
    }

    async fn notify(&self, kind: ToastKind, message: &str) {
        if let Some(bus) = &self.bus {
            if let Err(e) = bus.push_toast(kind, message).await {
                warn!(error = %e, "Failed to push notice to the player");
            }
        }
    }
}

async fn recv_bus(events: &mut Option<mpsc::Receiver<BusEvent>>) -> Option<BusEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_sleep(sleep: &mut Option<Pin<Box<Sleep>>>) {
    match sleep {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
