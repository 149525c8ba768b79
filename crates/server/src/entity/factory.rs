//! Random spawning of players and food.

use super::{Food, Player};
use crate::config::Config;
use glam::DVec2;
use protocol::{Color, ConnectionId};
use rand::Rng;

/// Builds new entities at random positions inside the map.
#[derive(Debug, Clone)]
pub struct EntityFactory {
    map_size: f64,
    base_radius: f64,
    food_radius: f64,
}

impl EntityFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            map_size: config.world.map_size,
            base_radius: config.player.base_radius,
            food_radius: config.food.radius,
        }
    }

    #[inline]
    pub fn map_size(&self) -> f64 {
        self.map_size
    }

    /// A fresh player at base radius for the given connection.
    pub fn spawn_player<R: Rng + ?Sized>(&self, id: ConnectionId, rng: &mut R) -> Player {
        let position = self.random_position(rng);
        Player::new(id, position, self.base_radius, Self::random_color(rng))
    }

    /// A single food pellet.
    pub fn spawn_food<R: Rng + ?Sized>(&self, rng: &mut R) -> Food {
        let position = self.random_position(rng);
        Food::new(position, self.food_radius, Self::random_color(rng))
    }

    /// Exactly `count` new pellets, used to replace the food list at startup.
    pub fn seed_food<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Food> {
        (0..count).map(|_| self.spawn_food(rng)).collect()
    }

    /// Uniform position in `[0, map_size)` on both axes.
    #[inline]
    fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> DVec2 {
        DVec2::new(
            rng.random_range(0.0..self.map_size),
            rng.random_range(0.0..self.map_size),
        )
    }

    /// Bright color with a random hue.
    #[inline]
    pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Color {
        Color::bright(rng.random_range(0..360))
    }
}
