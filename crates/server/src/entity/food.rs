//! Food pellet.

use crate::geometry::Circle;
use glam::DVec2;
use protocol::{Color, FoodView};

/// A food pellet that can be eaten by players.
///
/// Pellets have no identity; the world removes them by index.
#[derive(Debug, Clone, PartialEq)]
pub struct Food {
    pub position: DVec2,
    pub radius: f64,
    pub color: Color,
}

impl Food {
    pub fn new(position: DVec2, radius: f64, color: Color) -> Self {
        Self {
            position,
            radius,
            color,
        }
    }

    pub fn view(&self) -> FoodView {
        FoodView {
            x: self.position.x,
            y: self.position.y,
            radius: self.radius,
            color: self.color,
        }
    }
}

impl Circle for Food {
    fn center(&self) -> DVec2 {
        self.position
    }

    fn radius(&self) -> f64 {
        self.radius
    }
}
