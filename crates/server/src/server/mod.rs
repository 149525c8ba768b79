//! Game server implementation.

use crate::config::Config;
use futures_util::{SinkExt, StreamExt, future};
use protocol::{ConnectionId, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, broadcast};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info};

pub mod client;
pub mod game;
pub mod session;

pub use client::{Client, Outbound, SessionState};
pub use game::{GameState, PendingMessages, run_game_loop};
pub use session::{Frame, drive_session};

/// Buffered world snapshots per receiver before it starts skipping.
const WORLD_CHANNEL_CAPACITY: usize = 16;

/// A message addressed to a single client.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetedMessage {
    /// Target client ID.
    pub client_id: ConnectionId,
    pub message: ServerMessage,
}

/// Shared handles every connection task and the game loop hold.
#[derive(Clone)]
pub struct ServerContext {
    pub game: Arc<RwLock<GameState>>,
    world_tx: broadcast::Sender<Outbound>,
    next_seq: Arc<AtomicU64>,
}

impl ServerContext {
    pub fn new(config: &Config) -> Self {
        Self::with_state(GameState::new(config))
    }

    /// Wrap an existing game state.
    pub fn with_state(game: GameState) -> Self {
        let (world_tx, _world_rx) = broadcast::channel(WORLD_CHANNEL_CAPACITY);
        Self {
            game: Arc::new(RwLock::new(game)),
            world_tx,
            next_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Receiver for world broadcasts.
    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.world_tx.subscribe()
    }

    /// Encode and send pending messages.
    ///
    /// Call this while still holding the game lock: sequence numbers then
    /// follow the order in which the world changed. Sending never blocks.
    /// World snapshots go on the lossy broadcast channel; targeted messages
    /// go to the recipient's own outbox and are never dropped while its
    /// session lives.
    pub fn dispatch(&self, game: &GameState, pending: PendingMessages) {
        if let Some(message) = pending.broadcast {
            match message.encode() {
                Ok(text) => {
                    // No subscribers is fine.
                    let _ = self.world_tx.send(self.stamp(text));
                }
                Err(e) => error!("Failed to encode broadcast: {}", e),
            }
        }

        for TargetedMessage { client_id, message } in pending.targeted {
            let Some(client) = game.clients.get(&client_id) else {
                debug!("Dropping message for unknown client {}", client_id);
                continue;
            };
            match message.encode() {
                Ok(text) => {
                    client.send(self.stamp(text));
                }
                Err(e) => error!("Failed to encode message for {}: {}", client_id, e),
            }
        }
    }

    fn stamp(&self, text: String) -> Outbound {
        Outbound {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            text: Arc::from(text),
        }
    }
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", listener.local_addr()?);

    let ctx = ServerContext::new(&config);

    // Start the game loop
    tokio::spawn(run_game_loop(ctx.clone(), config.server.tick_interval()));

    serve(listener, ctx).await
}

/// Accept WebSocket connections on `listener` until it fails.
pub async fn serve(listener: TcpListener, ctx: ServerContext) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let ctx = ctx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, ctx).await {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    ctx: ServerContext,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (write, read) = ws_stream.split();
    let read = read.map(|msg| {
        msg.map(|msg| match msg {
            Message::Text(text) => Frame::Text(text.as_str().to_owned()),
            Message::Close(_) => Frame::Close,
            _ => Frame::Ignored,
        })
    });
    let write = write.with(|text: String| {
        future::ready(Ok::<_, tungstenite::Error>(Message::text(text)))
    });

    drive_session(read, write, addr, ctx).await;
    Ok(())
}
