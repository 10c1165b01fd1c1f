//! Receiver control connection.
//!
//! One task owns the socket, the reconnect timer, and the link state;
//! callers talk to it through the cheap [`AvrLink`] handle. That keeps
//! the invariant of at most one socket and one pending reconnect per
//! link without any locking.

use std::pin::Pin;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Sleep;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, trace, warn};

use avbridge_core::{AvrCommand, ConnectionConfig};

use crate::error::{LinkError, LinkResult};
use crate::protocol::{AvrCodec, AvrEvent};

/// Delay before retrying a failed or dropped connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Events the link reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The control connection is up and the volume query was sent.
    Connected,
    /// The control connection is gone (dropped or closed).
    Disconnected,
    /// A decoded line from the receiver.
    Received(AvrEvent),
}

/// Connection lifecycle state, owned by the link task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

enum LinkRequest {
    Connect(ConnectionConfig),
    Send(AvrCommand),
    Disconnect(oneshot::Sender<()>),
}

/// Handle to the receiver connection task.
#[derive(Clone)]
pub struct AvrLink {
    requests: mpsc::Sender<LinkRequest>,
}

impl AvrLink {
    /// Spawn the connection task. Events are delivered on `events` in
    /// the order the link observes them.
    #[must_use]
    pub fn spawn(events: mpsc::Sender<LinkEvent>) -> Self {
        let (requests, request_rx) = mpsc::channel(32);
        tokio::spawn(LinkTask::new(request_rx, events).run());
        Self { requests }
    }

    /// Open the control connection with the given settings.
    ///
    /// A no-op while a connection is already up or being established,
    /// or when no host is configured.
    ///
    /// # Errors
    /// Returns an error only if the link task is gone.
    pub async fn connect(&self, cfg: ConnectionConfig) -> LinkResult<()> {
        self.request(LinkRequest::Connect(cfg)).await
    }

    /// Send a command to the receiver.
    ///
    /// While disconnected the command is dropped (never queued) and a
    /// connect attempt is triggered so a later command may get through.
    ///
    /// # Errors
    /// Returns an error only if the link task is gone.
    pub async fn send(&self, cmd: AvrCommand) -> LinkResult<()> {
        self.request(LinkRequest::Send(cmd)).await
    }

    /// Close the connection and stop reconnecting. Idempotent.
    ///
    /// When this returns, no reconnect attempt can start until the
    /// next explicit `connect`.
    ///
    /// # Errors
    /// Returns an error only if the link task is gone.
    pub async fn disconnect(&self) -> LinkResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.request(LinkRequest::Disconnect(ack_tx)).await?;
        ack_rx.await.map_err(|_| LinkError::ChannelClosed)
    }

    async fn request(&self, req: LinkRequest) -> LinkResult<()> {
        self.requests.send(req).await.map_err(|_| LinkError::ChannelClosed)
    }
}

enum Wake {
    Request(Option<LinkRequest>),
    Frame(Option<Result<AvrEvent, LinkError>>),
    Retry,
}

struct LinkTask {
    requests: mpsc::Receiver<LinkRequest>,
    events: mpsc::Sender<LinkEvent>,
    cfg: ConnectionConfig,
    state: LinkState,
    /// False after `disconnect`; suppresses scheduled reconnects.
    running: bool,
    conn: Option<Framed<TcpStream, AvrCodec>>,
    retry: Option<Pin<Box<Sleep>>>,
}

impl LinkTask {
    fn new(requests: mpsc::Receiver<LinkRequest>, events: mpsc::Sender<LinkEvent>) -> Self {
        Self {
            requests,
            events,
            cfg: ConnectionConfig::default(),
            state: LinkState::Disconnected,
            running: false,
            conn: None,
            retry: None,
        }
    }

    async fn run(mut self) {
        loop {
            let wake = tokio::select! {
                req = self.requests.recv() => Wake::Request(req),
                frame = next_frame(&mut self.conn) => Wake::Frame(frame),
                () = wait_retry(&mut self.retry) => Wake::Retry,
            };

            match wake {
                Wake::Request(Some(req)) => self.on_request(req).await,
                Wake::Request(None) => break,
                Wake::Frame(frame) => self.on_frame(frame).await,
                Wake::Retry => {
                    self.retry = None;
                    self.try_connect().await;
                }
            }
        }
        debug!("Link task exiting");
    }

    async fn on_request(&mut self, req: LinkRequest) {
        match req {
            LinkRequest::Connect(cfg) => {
                self.cfg = cfg;
                self.running = true;
                self.try_connect().await;
            }
            LinkRequest::Send(cmd) => self.send_command(cmd).await,
            LinkRequest::Disconnect(ack) => {
                self.disconnect().await;
                let _ = ack.send(());
            }
        }
    }

    async fn try_connect(&mut self) {
        if self.state != LinkState::Disconnected {
            debug!(state = ?self.state, "Connect requested but link is already active");
            return;
        }
        if self.cfg.host.is_empty() {
            debug!("No receiver host configured, not connecting");
            return;
        }

        self.state = LinkState::Connecting;
        info!(host = %self.cfg.host, port = self.cfg.port, "Connecting to receiver");

        match TcpStream::connect((self.cfg.host.as_str(), self.cfg.port)).await {
            Ok(stream) => {
                let mut framed = Framed::new(stream, AvrCodec);
                // Bootstrap the volume belief from the device.
                if let Err(e) = framed.send(AvrCommand::QueryVolume).await {
                    error!(error = %e, "Failed to send volume query");
                    self.state = LinkState::Disconnected;
                    self.schedule_retry();
                    return;
                }
                info!("Connected to receiver");
                self.conn = Some(framed);
                self.state = LinkState::Connected;
                let _ = self.events.send(LinkEvent::Connected).await;
            }
            Err(e) => {
                error!(error = %e, "Receiver connection failed");
                self.state = LinkState::Disconnected;
                self.schedule_retry();
            }
        }
    }

    async fn send_command(&mut self, cmd: AvrCommand) {
        match self.write_command(cmd).await {
            Ok(()) => {}
            Err(LinkError::NotConnected) => {
                // The command is dropped, never queued; connecting now
                // gives the next one a chance.
                self.running = true;
                self.try_connect().await;
            }
            Err(e) => {
                error!(error = %e, "Receiver write failed");
                self.drop_connection().await;
                self.schedule_retry();
            }
        }
    }

    async fn write_command(&mut self, cmd: AvrCommand) -> LinkResult<()> {
        let Some(framed) = self.conn.as_mut() else {
            warn!(?cmd, "Not connected to receiver, dropping command");
            return Err(LinkError::NotConnected);
        };
        debug!(?cmd, "Sending receiver command");
        framed.send(cmd).await
    }

    async fn on_frame(&mut self, frame: Option<Result<AvrEvent, LinkError>>) {
        match frame {
            Some(Ok(event)) => {
                match &event {
                    AvrEvent::VolumeReport(vol) => debug!(volume = vol, "Receiver volume report"),
                    AvrEvent::MalformedVolumeReport(line) => {
                        warn!(line = %line, "Malformed volume report, dropping");
                    }
                    AvrEvent::Unrecognized(line) => trace!(line = %line, "Receiver line ignored"),
                }
                let _ = self.events.send(LinkEvent::Received(event)).await;
            }
            Some(Err(e)) => {
                error!(error = %e, "Receiver read failed");
                self.drop_connection().await;
                self.schedule_retry();
            }
            None => {
                info!("Receiver closed the connection");
                self.drop_connection().await;
                self.schedule_retry();
            }
        }
    }

    async fn disconnect(&mut self) {
        self.running = false;
        self.retry = None;
        if self.conn.is_some() {
            self.drop_connection().await;
        }
        debug!("Link disconnected and stopped");
    }

    async fn drop_connection(&mut self) {
        self.conn = None;
        self.state = LinkState::Disconnected;
        let _ = self.events.send(LinkEvent::Disconnected).await;
    }

    fn schedule_retry(&mut self) {
        if !self.running || self.retry.is_some() {
            return;
        }
        info!(delay_secs = RECONNECT_DELAY.as_secs(), "Will retry receiver connection");
        self.retry = Some(Box::pin(tokio::time::sleep(RECONNECT_DELAY)));
    }
}

async fn next_frame(
    conn: &mut Option<Framed<TcpStream, AvrCodec>>,
) -> Option<Result<AvrEvent, LinkError>> {
    match conn {
        Some(framed) => framed.next().await,
        None => std::future::pending().await,
    }
}

async fn wait_retry(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
