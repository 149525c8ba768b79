//! Per-connection session loop.
//!
//! The loop is independent of the WebSocket library: callers adapt their
//! socket into a stream of [`Frame`]s and a sink of text messages.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use protocol::ClientMessage;
use std::fmt::Display;
use std::net::SocketAddr;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::ServerContext;

/// An inbound WebSocket frame, reduced to what the session cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Close,
    /// Binary, ping and pong frames.
    Ignored,
}

/// Drive one client session until the socket closes or a send fails.
///
/// Registers the client, spawns its player and then multiplexes inbound
/// frames with world broadcasts and the client's own outbox. A world
/// snapshot older than a frame already written is skipped, so a respawn
/// `init` is never followed by a snapshot from before it.
/// The client and its player are removed on every exit path.
pub async fn drive_session<R, W, RE, WE>(
    mut read: R,
    mut write: W,
    addr: SocketAddr,
    ctx: ServerContext,
) where
    R: Stream<Item = Result<Frame, RE>> + Unpin,
    W: Sink<String, Error = WE> + Unpin,
    RE: Display,
    WE: Display,
{
    // Subscribe first so no snapshot after the init can be missed.
    let mut world_rx = ctx.subscribe();
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel();

    let client_id = {
        let mut game = ctx.game.write().await;
        let client_id = game.add_client(addr, outbox_tx);
        let pending = game.handle_connect(&client_id);
        ctx.dispatch(&game, pending);
        client_id
    };

    // Sequence number of the newest frame written to the socket.
    let mut last_seq = 0;

    loop {
        tokio::select! {
            // Handle incoming WebSocket frames
            frame = read.next() => {
                match frame {
                    Some(Ok(Frame::Text(text))) => match ClientMessage::decode(&text) {
                        Ok(message) => {
                            let mut game = ctx.game.write().await;
                            let pending = game.handle_message(&client_id, message);
                            ctx.dispatch(&game, pending);
                        }
                        Err(e) => warn!("Dropping message from {}: {}", addr, e),
                    },
                    Some(Ok(Frame::Ignored)) => {}
                    Some(Ok(Frame::Close)) | None => break,
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                }
            }
            // Handle world broadcasts
            update = world_rx.recv() => {
                match update {
                    Ok(update) if update.seq < last_seq => {}
                    Ok(update) => {
                        last_seq = update.seq;
                        if let Err(e) = write.send(update.text.to_string()).await {
                            warn!("Failed to send update to {}: {}", addr, e);
                            break;
                        }
                    }
                    // Newer snapshots supersede the skipped ones.
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Client {} skipped {} updates", client_id, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            // Handle messages for this client only
            outbound = outbox_rx.recv() => {
                let Some(outbound) = outbound else {
                    break;
                };
                last_seq = last_seq.max(outbound.seq);
                if let Err(e) = write.send(outbound.text.to_string()).await {
                    warn!("Failed to send message to {}: {}", addr, e);
                    break;
                }
            }
        }
    }

    ctx.game.write().await.remove_client(&client_id);
    info!("Session {} from {} closed", client_id, addr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::{GameState, PendingMessages, TargetedMessage};
    use futures::channel::mpsc as futures_mpsc;
    use protocol::{ConnectionId, ServerMessage};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::Value;
    use std::convert::Infallible;
    use std::time::Duration;
    use tokio::time::timeout;

    type Inbound = futures_mpsc::UnboundedSender<Result<Frame, Infallible>>;

    fn context() -> ServerContext {
        let game = GameState::with_rng(&Config::default(), StdRng::seed_from_u64(5));
        ServerContext::with_state(game)
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    fn inbound() -> (Inbound, futures_mpsc::UnboundedReceiver<Result<Frame, Infallible>>) {
        futures_mpsc::unbounded()
    }

    async fn next_json<S: Stream<Item = String> + Unpin>(rx: &mut S) -> Value {
        let text = timeout(Duration::from_secs(2), rx.next())
            .await
            .expect("timed out waiting for a message")
            .expect("session closed the sink");
        serde_json::from_str(&text).unwrap()
    }

    fn update(game: &GameState) -> PendingMessages {
        PendingMessages {
            broadcast: Some(ServerMessage::Update(game.world.snapshot())),
            targeted: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let ctx = context();
        let (in_tx, in_rx) = inbound();
        let (out_tx, mut out_rx) = futures_mpsc::unbounded::<String>();

        let session = tokio::spawn(drive_session(in_rx, out_tx, addr(), ctx.clone()));

        let init = next_json(&mut out_rx).await;
        assert_eq!(init["type"], "init");
        let id = init["id"].as_str().unwrap().to_owned();
        assert_eq!(init["players"][&id]["radius"], 50.0);

        // Garbage is dropped and the session keeps going.
        in_tx.unbounded_send(Ok(Frame::Text("not json".into()))).unwrap();
        in_tx.unbounded_send(Ok(Frame::Ignored)).unwrap();
        in_tx
            .unbounded_send(Ok(Frame::Text(r#"{"type":"move","x":2000,"y":-5}"#.into())))
            .unwrap();

        let update = next_json(&mut out_rx).await;
        assert_eq!(update["type"], "update");
        assert_eq!(update["players"][&id]["x"], 1000.0);
        assert_eq!(update["players"][&id]["y"], 0.0);

        in_tx.unbounded_send(Ok(Frame::Close)).unwrap();
        timeout(Duration::from_secs(2), session).await.unwrap().unwrap();

        let game = ctx.game.read().await;
        assert_eq!(game.world.player_count(), 0);
        assert!(game.clients.is_empty());
    }

    #[tokio::test]
    async fn test_session_ends_when_stream_ends() {
        let ctx = context();
        let (in_tx, in_rx) = inbound();
        let (out_tx, _out_rx) = futures_mpsc::unbounded::<String>();

        let session = tokio::spawn(drive_session(in_rx, out_tx, addr(), ctx.clone()));
        drop(in_tx);
        timeout(Duration::from_secs(2), session).await.unwrap().unwrap();

        assert!(ctx.game.read().await.clients.is_empty());
    }

    #[tokio::test]
    async fn test_stalled_client_still_gets_player_eaten() {
        let ctx = context();
        let (_in_tx, in_rx) = inbound();
        // Zero-capacity sink: the session blocks until the test reads.
        let (out_tx, mut out_rx) = futures_mpsc::channel::<String>(0);

        tokio::spawn(drive_session(in_rx, out_tx, addr(), ctx.clone()));
        let init = next_json(&mut out_rx).await;
        let id = ConnectionId::new(init["id"].as_str().unwrap());

        {
            let mut game = ctx.game.write().await;
            for _ in 0..3 {
                let pending = update(&game);
                ctx.dispatch(&game, pending);
            }

            let eaten = PendingMessages {
                broadcast: None,
                targeted: vec![TargetedMessage {
                    client_id: id.clone(),
                    message: ServerMessage::PlayerEaten,
                }],
            };
            ctx.dispatch(&game, eaten);

            // Plenty of traffic for other clients afterwards.
            let others: Vec<ConnectionId> = (0..300)
                .map(|_| {
                    let (outbox, _) = tokio::sync::mpsc::unbounded_channel();
                    game.add_client(addr(), outbox)
                })
                .collect();
            let flood = PendingMessages {
                broadcast: None,
                targeted: others
                    .into_iter()
                    .map(|client_id| TargetedMessage {
                        client_id,
                        message: ServerMessage::PlayerEaten,
                    })
                    .collect(),
            };
            ctx.dispatch(&game, flood);
        }

        let mut seen = Vec::new();
        loop {
            let frame = next_json(&mut out_rx).await;
            let kind = frame["type"].as_str().unwrap().to_owned();
            seen.push(kind.clone());
            if kind == "player_eaten" {
                break;
            }
            assert!(seen.len() <= 4, "unexpected frames: {seen:?}");
        }
    }

    #[tokio::test]
    async fn test_stale_snapshot_never_follows_respawn() {
        let ctx = context();
        let (_in_tx, in_rx) = inbound();
        let (out_tx, mut out_rx) = futures_mpsc::channel::<String>(0);

        tokio::spawn(drive_session(in_rx, out_tx, addr(), ctx.clone()));
        let init = next_json(&mut out_rx).await;
        let id = ConnectionId::new(init["id"].as_str().unwrap());

        {
            let mut game = ctx.game.write().await;
            game.world.get_mut(&id).unwrap().radius = 77.0;
            let pending = update(&game);
            ctx.dispatch(&game, pending);

            let pending = game.handle_message(&id, protocol::ClientMessage::Respawn);
            ctx.dispatch(&game, pending);
        }

        let mut frames = Vec::new();
        loop {
            let frame = next_json(&mut out_rx).await;
            let is_init = frame["type"] == "init";
            frames.push(frame);
            if is_init {
                break;
            }
        }
        // Anything still queued comes after the respawn.
        while let Ok(Some(text)) = timeout(Duration::from_millis(200), out_rx.next()).await {
            frames.push(serde_json::from_str(&text).unwrap());
        }

        let init_at = frames.iter().position(|f| f["type"] == "init").unwrap();
        for frame in &frames[init_at..] {
            assert_eq!(frame["players"][id.as_str()]["radius"], 50.0);
        }
    }
}
