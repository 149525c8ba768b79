//! Message definitions for the arena protocol.
//!
//! Every frame is a JSON object tagged by its `type` field.

use crate::{Color, ConnectionId, ProtocolError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Client → Server ──

/// Parsed client message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Requested absolute position of the sender's player.
    Move { x: f64, y: f64 },
    /// Request a fresh player entity.
    Respawn,
}

impl ClientMessage {
    /// Decode a client message from a text frame.
    ///
    /// Rejects missing or non-numeric fields, unknown types and
    /// coordinates that are not finite.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let message: Self = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
        if let ClientMessage::Move { x, y } = message {
            if !x.is_finite() || !y.is_finite() {
                return Err(ProtocolError::NonFiniteCoordinate);
            }
        }
        Ok(message)
    }
}

// ── Server → Client ──

/// Message sent from the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full world, sent to one connection when its player (re)spawns.
    Init {
        /// The recipient's own connection id.
        id: ConnectionId,
        map_size: f64,
        #[serde(flatten)]
        world: WorldSnapshot,
    },
    /// Full world, sent to everyone on every accepted move and every tick.
    Update(WorldSnapshot),
    /// The recipient's player was absorbed.
    PlayerEaten,
}

impl ServerMessage {
    /// Encode into the text of a WebSocket frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Owned copy of the world at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub players: BTreeMap<ConnectionId, PlayerView>,
    pub food: Vec<FoodView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub color: Color,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodView {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub color: Color,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_world() -> WorldSnapshot {
        let mut players = BTreeMap::new();
        players.insert(
            ConnectionId::new("abcdefgh"),
            PlayerView {
                x: 10.0,
                y: 20.0,
                radius: 50.0,
                color: Color::bright(200),
                name: "Guest abcde".to_string(),
            },
        );
        WorldSnapshot {
            players,
            food: vec![FoodView {
                x: 1.5,
                y: 2.5,
                radius: 5.0,
                color: Color::bright(30),
            }],
        }
    }

    #[test]
    fn test_decode_move() {
        let msg = ClientMessage::decode(r#"{"type":"move","x":12.5,"y":-3}"#).unwrap();
        assert_eq!(msg, ClientMessage::Move { x: 12.5, y: -3.0 });
    }

    #[test]
    fn test_decode_respawn() {
        let msg = ClientMessage::decode(r#"{"type":"respawn"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Respawn);
    }

    #[test]
    fn test_decode_rejects_malformed_moves() {
        for text in [
            r#"{"type":"move","x":"left","y":3}"#,
            r#"{"type":"move","x":3}"#,
            r#"{"type":"move"}"#,
            r#"{"type":"teleport","x":1,"y":2}"#,
            r#"{"x":1,"y":2}"#,
            "not json",
        ] {
            assert!(
                matches!(ClientMessage::decode(text), Err(ProtocolError::Malformed(_))),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn test_encode_init() {
        let msg = ServerMessage::Init {
            id: ConnectionId::new("abcdefgh"),
            map_size: 1000.0,
            world: sample_world(),
        };
        let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "init",
                "id": "abcdefgh",
                "map_size": 1000.0,
                "players": {
                    "abcdefgh": {
                        "x": 10.0,
                        "y": 20.0,
                        "radius": 50.0,
                        "color": "hsl(200, 70%, 60%)",
                        "name": "Guest abcde"
                    }
                },
                "food": [
                    { "x": 1.5, "y": 2.5, "radius": 5.0, "color": "hsl(30, 70%, 60%)" }
                ]
            })
        );
    }

    #[test]
    fn test_encode_update_and_player_eaten() {
        let update = ServerMessage::Update(WorldSnapshot::default()).encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&update).unwrap();
        assert_eq!(value, json!({ "type": "update", "players": {}, "food": [] }));

        assert_eq!(
            ServerMessage::PlayerEaten.encode().unwrap(),
            r#"{"type":"player_eaten"}"#
        );
    }
}
