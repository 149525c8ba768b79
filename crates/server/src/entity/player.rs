//! Player avatar.

use crate::geometry::Circle;
use glam::DVec2;
use protocol::{Color, ConnectionId, PlayerView};

/// Number of id characters shown in a guest name.
const GUEST_NAME_ID_CHARS: usize = 5;

/// The circle controlled by one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Owning connection.
    pub id: ConnectionId,
    /// Position in world coordinates.
    pub position: DVec2,
    /// Only ever grows while the player is alive.
    pub radius: f64,
    pub color: Color,
    pub name: String,
}

impl Player {
    /// Create a player with a guest name derived from its id.
    pub fn new(id: ConnectionId, position: DVec2, radius: f64, color: Color) -> Self {
        let name = Self::guest_name(&id);
        Self {
            id,
            position,
            radius,
            color,
            name,
        }
    }

    /// `"Guest "` followed by the first five characters of the id.
    pub fn guest_name(id: &ConnectionId) -> String {
        format!("Guest {}", id.prefix(GUEST_NAME_ID_CHARS))
    }

    /// Grow by `amount`; negative amounts are ignored.
    #[inline]
    pub fn grow(&mut self, amount: f64) {
        self.radius += amount.max(0.0);
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            x: self.position.x,
            y: self.position.y,
            radius: self.radius,
            color: self.color,
            name: self.name.clone(),
        }
    }
}

impl Circle for Player {
    fn center(&self) -> DVec2 {
        self.position
    }

    fn radius(&self) -> f64 {
        self.radius
    }
}
