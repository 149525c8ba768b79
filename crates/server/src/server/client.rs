//! Client session state.

use protocol::ConnectionId;
use rand::Rng;
use rand::distr::Alphanumeric;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Length of generated connection ids.
pub const CONNECTION_ID_LEN: usize = 20;

/// An encoded frame on its way to one or more clients.
///
/// `seq` grows with every dispatch, so a session can tell a world snapshot
/// that was overtaken by a newer frame.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub seq: u64,
    pub text: Arc<str>,
}

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered, no player spawned yet.
    Connecting,
    /// Player spawned; moves and respawns are accepted.
    Active,
    /// Terminal.
    Disconnected,
}

/// A connected client session.
#[derive(Debug)]
pub struct Client {
    /// Unique connection id.
    pub id: ConnectionId,
    /// Remote address.
    pub addr: SocketAddr,
    pub state: SessionState,
    /// When the connection was accepted.
    pub connected_at: Instant,
    /// Messages meant for this client only. Unbounded so none are lost.
    pub outbox: mpsc::UnboundedSender<Outbound>,
}

impl Client {
    /// Create a new client session.
    pub fn new(
        id: ConnectionId,
        addr: SocketAddr,
        outbox: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            id,
            addr,
            state: SessionState::Connecting,
            connected_at: Instant::now(),
            outbox,
        }
    }

    /// Queue a frame for this client. Fails only once its session is gone.
    pub fn send(&self, frame: Outbound) -> bool {
        self.outbox.send(frame).is_ok()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }
}

/// Random alphanumeric connection id.
pub fn generate_connection_id<R: Rng + ?Sized>(rng: &mut R) -> ConnectionId {
    let id: String = rng
        .sample_iter(&Alphanumeric)
        .take(CONNECTION_ID_LEN)
        .map(char::from)
        .collect();
    ConnectionId::new(id)
}
