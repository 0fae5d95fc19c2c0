//! The serving loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use remote_hand_input::{InputCapture, InputEngine, InputError, Platform};
use remote_hand_protocol::{PeerConnection, ProtocolError, TcpTransport};
use remote_hand_types::{MousePosition, RawEvent, Request, Response};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AgentError;
use crate::state::AgentState;

/// Observable snapshot of the agent, published on every transition.
#[derive(Debug, Clone, Default)]
pub struct AgentStatus {
    pub state: AgentState,
    pub local_addr: Option<SocketAddr>,
    pub peer: Option<SocketAddr>,
    pub requests_served: u64,
    pub malformed_requests: u64,
}

/// A single-client remote input agent.
///
/// [`run`](Self::run) accepts one client, serves its requests until the
/// connection fails, then releases the platform. The agent never listens
/// again.
pub struct Agent {
    config: Config,
    transport: Option<TcpTransport>,
    engine: InputEngine,
    capture: Box<dyn InputCapture>,
    status_tx: watch::Sender<AgentStatus>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Agent {
    /// Create an agent on an already bound transport.
    pub fn new(
        config: Config,
        transport: TcpTransport,
        platform: Arc<dyn Platform>,
        capture: Box<dyn InputCapture>,
    ) -> Self {
        let local_addr = transport.local_addr().ok();
        let (status_tx, _) = watch::channel(AgentStatus {
            local_addr,
            ..AgentStatus::default()
        });
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Self {
            config,
            transport: Some(transport),
            engine: InputEngine::new(platform),
            capture,
            status_tx,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Bind the configured address and create the agent.
    pub async fn bind(
        config: Config,
        platform: Arc<dyn Platform>,
        capture: Box<dyn InputCapture>,
    ) -> Result<Self, AgentError> {
        let transport = TcpTransport::bind(&config.server.address, config.server.port)
            .await
            .map_err(AgentError::Listen)?;
        Ok(Self::new(config, transport, platform, capture))
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.status_tx.borrow().local_addr
    }

    /// Get a receiver that tracks the agent's status.
    pub fn status_receiver(&self) -> watch::Receiver<AgentStatus> {
        self.status_tx.subscribe()
    }

    /// Get a sender that stops the agent cleanly.
    pub fn shutdown_sender(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// The input engine shared with the capture task.
    pub fn engine(&self) -> &InputEngine {
        &self.engine
    }

    /// Run the agent until the client goes away or shutdown is requested.
    ///
    /// Returns an error when the client disconnects or the transport fails,
    /// and `Ok` only on a requested shutdown.
    pub async fn run(mut self) -> Result<(), AgentError> {
        let (raw_tx, mut raw_rx) = mpsc::channel::<RawEvent>(1024);
        if let Err(e) = self.capture.start(raw_tx).await {
            warn!(error = %e, "input capture unavailable, echoes will not be suppressed");
        }

        let engine = self.engine.clone();
        let drain = tokio::spawn(async move {
            while let Some(event) = raw_rx.recv().await {
                engine.observe(&event);
            }
        });

        let result = self.serve().await;

        self.close().await;
        drain.abort();
        result
    }

    async fn serve(&mut self) -> Result<(), AgentError> {
        let transport = self
            .transport
            .take()
            .ok_or_else(|| AgentError::Other(anyhow::anyhow!("agent has already served")))?;
        let local = transport.local_addr()?;
        info!(addr = %local, "listening for a client");

        let server = &self.config.server;
        let accept = transport.accept(server.nodelay, server.max_request_size);
        let mut conn = tokio::select! {
            result = accept => result?,
            _ = self.shutdown_rx.recv() => {
                info!("shutdown requested before a client connected");
                return Ok(());
            }
        };

        let peer = conn.remote_address();
        info!(peer = %peer, "client connected");
        self.status_tx.send_modify(|s| {
            s.state = AgentState::Connected;
            s.peer = Some(peer);
        });

        loop {
            let received = tokio::select! {
                result = conn.recv::<Request>() => result,
                _ = self.shutdown_rx.recv() => {
                    info!("shutdown requested");
                    return Ok(());
                }
            };

            let request = match received {
                Ok(request) => request,
                Err(e) if !e.is_fatal() => {
                    warn!(peer = %peer, error = %e, "discarding malformed request");
                    self.status_tx.send_modify(|s| s.malformed_requests += 1);
                    continue;
                }
                Err(ProtocolError::Closed) => {
                    info!(peer = %peer, "client disconnected");
                    return Err(ProtocolError::Closed.into());
                }
                Err(e) => return Err(e.into()),
            };

            let response = handle_request(&self.engine, &request).await;
            respond(&mut conn, &response).await?;
            self.status_tx.send_modify(|s| {
                s.state = AgentState::Serving;
                s.requests_served += 1;
            });
        }
    }

    async fn close(&mut self) {
        let release = self.config.input.release_on_disconnect;
        if let Err(e) = self.engine.shutdown(release) {
            warn!(error = %e, "failed to shut down platform");
        }
        if let Err(e) = self.capture.shutdown().await {
            warn!(error = %e, "failed to stop input capture");
        }
        self.status_tx.send_modify(|s| s.state = AgentState::Closed);
        info!("agent closed");
    }
}

/// Apply one request and build its response.
async fn handle_request(engine: &InputEngine, request: &Request) -> Response {
    debug!(
        press = request.press_keys.len(),
        release = request.release_keys.len(),
        dx = request.mouse.dx,
        dy = request.mouse.dy,
        image = request.get_image,
        "handling request"
    );

    let user_override = request.allow_user_override;
    for name in &request.press_keys {
        inject_key(engine, name, true, user_override);
    }
    for name in &request.release_keys {
        inject_key(engine, name, false, user_override);
    }

    if !request.mouse.is_zero() {
        if let Err(e) = engine.inject_motion(request.mouse.dx, request.mouse.dy) {
            warn!(error = %e, "mouse motion failed");
        }
    }

    let mut response = Response::default();
    if request.get_image {
        response.image =
            capture_image(engine, &request.process_name, request.clamped_quality()).await;
    }
    if request.get_keys {
        response.pressed_keys = Some(engine.poll_pressed_keys().into_iter().collect());
    }
    if request.get_mouse {
        response.mouse = Some(MousePosition::from(engine.poll_mouse_delta()));
    }
    response
}

fn inject_key(engine: &InputEngine, name: &str, down: bool, user_override: bool) {
    match engine.inject_key(name, down, user_override) {
        Ok(()) => {}
        Err(InputError::UserActive) => debug!(key = %name, down, "user is active, key skipped"),
        Err(e) => warn!(key = %name, down, error = %e, "key injection failed"),
    }
}

async fn capture_image(engine: &InputEngine, target: &str, quality: u8) -> Option<Vec<u8>> {
    let engine = engine.clone();
    let owned_target = target.to_string();
    let started = Instant::now();
    let result =
        tokio::task::spawn_blocking(move || engine.capture_image(&owned_target, quality)).await;
    debug!(elapsed = ?started.elapsed(), "screenshot");

    match result {
        Ok(Ok(jpeg)) => Some(jpeg),
        Ok(Err(InputError::TargetNotFound(t))) => {
            warn!(target = %t, "capture target not found, image omitted");
            None
        }
        Ok(Err(e)) => {
            warn!(error = %e, "screen capture failed, image omitted");
            None
        }
        Err(e) => {
            warn!(error = %e, "screen capture task failed");
            None
        }
    }
}

async fn respond(conn: &mut PeerConnection, response: &Response) -> Result<(), ProtocolError> {
    let started = Instant::now();
    conn.send(response).await?;
    debug!(elapsed = ?started.elapsed(), "sent response");
    Ok(())
}
