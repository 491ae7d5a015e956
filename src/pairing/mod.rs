//! Pairing session with the hosted service.
//!
//! A session opens the registration page in the browser exactly once and keeps
//! a socket to the pairing endpoint alive in the background. The socket is
//! reopened after a fixed delay whenever it drops, for as long as the session
//! runs. The registration page and the socket are correlated by a
//! [`SessionId`] that stays the same across reconnects.

mod browser;
mod transport;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use browser::{BrowserLauncher, SystemBrowser};
pub use transport::{Connector, Link, TransportError, WebSocketConnector};

/// Transitions a [`PairingHandle::transitions`] receiver may fall behind by
/// before it starts missing them.
const TRANSITION_BACKLOG: usize = 64;

/// Single-use identifier tying the socket to the browser registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Delay between a drop and the next connection attempt.
///
/// Retries never stop and the delay never grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delay: Duration,
}

impl ReconnectPolicy {
    pub const fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(250))
    }
}

#[derive(Debug, Clone)]
pub struct PairingConfig {
    pub websocket_url: String,
    pub registration_url: String,
    pub reconnect: ReconnectPolicy,
}

impl PairingConfig {
    pub fn registration_url_for(&self, session: &SessionId) -> String {
        let separator = if self.registration_url.contains('?') {
            '&'
        } else {
            '?'
        };
        format!("{}{separator}session={session}", self.registration_url)
    }
}

pub struct PairingSession;

impl PairingSession {
    /// Generate the session id, open the registration page and start the
    /// connection loop. Must be called from within a tokio runtime.
    ///
    /// A browser that fails to open is logged and otherwise ignored; the URL
    /// is still available from [`PairingHandle::registration_url`].
    pub fn start(
        config: PairingConfig,
        connector: Arc<dyn Connector>,
        browser: &dyn BrowserLauncher,
    ) -> PairingHandle {
        let session_id = SessionId::generate();
        let registration_url = config.registration_url_for(&session_id);

        info!(session = %session_id, "opening registration page");
        if let Err(err) = browser.open(&registration_url) {
            warn!(url = %registration_url, "failed to open browser: {err:#}");
        }

        let (latest_tx, latest_rx) = watch::channel(ConnectionState::Connecting);
        let (transitions, _) = broadcast::channel(TRANSITION_BACKLOG);
        let feed = StateFeed {
            latest: latest_tx,
            transitions: transitions.clone(),
        };
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(connection_loop(
            config.websocket_url,
            config.reconnect,
            connector,
            feed,
            shutdown_rx,
        ));

        PairingHandle {
            session_id,
            registration_url,
            state: latest_rx,
            transitions,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

/// Owner of a running pairing session.
///
/// Dropping the handle also stops the session, but only [`shutdown`] waits
/// for the connection loop to finish.
///
/// [`shutdown`]: PairingHandle::shutdown
pub struct PairingHandle {
    session_id: SessionId,
    registration_url: String,
    state: watch::Receiver<ConnectionState>,
    transitions: broadcast::Sender<ConnectionState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for PairingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingHandle")
            .field("session_id", &self.session_id)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl PairingHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn registration_url(&self) -> &str {
        &self.registration_url
    }

    /// Latest published state. A quick `Connecting` to `Closed` cycle can
    /// replace a value before it is observed.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Every transition published after this call, in order.
    pub fn transitions(&self) -> broadcast::Receiver<ConnectionState> {
        self.transitions.subscribe()
    }

    /// Stop the connection loop and wait for it to exit. The final state is
    /// always [`ConnectionState::Closed`].
    pub async fn shutdown(mut self) -> ConnectionState {
        if let Some(signal) = self.shutdown.take() {
            let _ = signal.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!("pairing task ended abnormally: {err}");
            }
        }
        *self.state.borrow()
    }
}

struct StateFeed {
    latest: watch::Sender<ConnectionState>,
    transitions: broadcast::Sender<ConnectionState>,
}

impl StateFeed {
    fn publish(&self, next: ConnectionState) {
        self.latest.send_replace(next);
        // Nobody listening is fine.
        let _ = self.transitions.send(next);
    }

    fn is(&self, state: ConnectionState) -> bool {
        *self.latest.borrow() == state
    }
}

async fn connection_loop(
    url: String,
    policy: ReconnectPolicy,
    connector: Arc<dyn Connector>,
    feed: StateFeed,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        feed.publish(ConnectionState::Connecting);
        debug!(url = %url, "connecting pairing socket");

        let attempt = tokio::select! {
            _ = &mut shutdown => break,
            attempt = connector.connect(&url) => attempt,
        };

        match attempt {
            Ok(mut link) => {
                feed.publish(ConnectionState::Open);
                debug!("pairing socket open");
                let reason = tokio::select! {
                    _ = &mut shutdown => break,
                    reason = link.closed() => reason,
                };
                debug!(%reason, "pairing socket closed");
            }
            Err(err) => debug!(error = %err, "pairing socket failed to open"),
        }

        feed.publish(ConnectionState::Closed);
        tokio::select! {
            _ = &mut shutdown => break,
            () = tokio::time::sleep(policy.delay()) => {}
        }
    }
    if !feed.is(ConnectionState::Closed) {
        feed.publish(ConnectionState::Closed);
    }
}
