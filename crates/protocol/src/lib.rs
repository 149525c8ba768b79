//! Shared protocol crate for blob-arena.
//!
//! This crate contains:
//! - Client -> server and server -> client message definitions
//! - JSON encoding/decoding of text frames
//! - Shared types (ConnectionId, Color)

mod error;
pub mod messages;

pub use error::ProtocolError;
pub use messages::{ClientMessage, FoodView, PlayerView, ServerMessage, WorldSnapshot};

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Opaque identity of one client connection.
///
/// Stable for the lifetime of the connection and used as the key of the
/// player map in every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first `n` characters of the id (the whole id if shorter).
    pub fn prefix(&self, n: usize) -> &str {
        match self.0.char_indices().nth(n) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// HSL color used for players and food.
///
/// Serialized as a CSS color string, e.g. `hsl(120, 70%, 60%)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub hue: u16,
    pub saturation: u8,
    pub lightness: u8,
}

impl Color {
    pub const fn new(hue: u16, saturation: u8, lightness: u8) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }

    /// A bright color (70% saturation, 60% lightness) with the given hue.
    pub const fn bright(hue: u16) -> Self {
        Self::new(hue % 360, 70, 60)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_css_string() {
        assert_eq!(Color::bright(120).to_string(), "hsl(120, 70%, 60%)");
        assert_eq!(
            serde_json::to_value(Color::bright(7)).unwrap(),
            serde_json::json!("hsl(7, 70%, 60%)")
        );
    }

    #[test]
    fn test_bright_wraps_hue() {
        assert_eq!(Color::bright(360).hue, 0);
    }

    #[test]
    fn test_connection_id_prefix() {
        let id = ConnectionId::new("aB3dEfGh");
        assert_eq!(id.prefix(5), "aB3dE");
        assert_eq!(ConnectionId::new("abc").prefix(5), "abc");
    }
}
