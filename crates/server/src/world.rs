//! World state management.
//!
//! Single source of truth for players and food. Players are keyed by
//! connection id in a sorted map, so iteration order is fixed for a run.

use crate::entity::{Food, Player};
use protocol::{ConnectionId, WorldSnapshot};
use std::collections::BTreeMap;

/// The game world containing all entities.
#[derive(Debug, Default)]
pub struct World {
    players: BTreeMap<ConnectionId, Player>,
    food: Vec<Food>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, id: &ConnectionId) -> Option<&Player> {
        self.players.get(id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: &ConnectionId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    #[inline]
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.players.contains_key(id)
    }

    /// Insert a player, replacing any existing one with the same id.
    pub fn set(&mut self, player: Player) -> Option<Player> {
        self.players.insert(player.id.clone(), player)
    }

    pub fn remove(&mut self, id: &ConnectionId) -> Option<Player> {
        self.players.remove(id)
    }

    /// All players in id order.
    pub fn all_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Ids of all players in iteration order.
    pub fn player_ids(&self) -> Vec<ConnectionId> {
        self.players.keys().cloned().collect()
    }

    #[inline]
    pub fn all_food(&self) -> &[Food] {
        &self.food
    }

    /// Remove the pellet at `index`, keeping the order of the rest.
    pub fn remove_food_at(&mut self, index: usize) -> Option<Food> {
        (index < self.food.len()).then(|| self.food.remove(index))
    }

    pub fn add_food(&mut self, food: Food) {
        self.food.push(food);
    }

    /// Drop every pellet and install `food` instead.
    pub fn replace_food(&mut self, food: Vec<Food>) {
        self.food = food;
    }

    #[inline]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    #[inline]
    pub fn food_count(&self) -> usize {
        self.food.len()
    }

    /// Copy the current state into owned views for broadcasting.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            players: self
                .players
                .iter()
                .map(|(id, player)| (id.clone(), player.view()))
                .collect(),
            food: self.food.iter().map(Food::view).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;
    use protocol::Color;

    fn player(id: &str, x: f64) -> Player {
        Player::new(ConnectionId::new(id), DVec2::new(x, 0.0), 50.0, Color::bright(0))
    }

    fn food(x: f64) -> Food {
        Food::new(DVec2::new(x, 0.0), 5.0, Color::bright(0))
    }

    #[test]
    fn test_set_overwrites_same_id() {
        let mut world = World::new();
        assert!(world.set(player("a", 1.0)).is_none());
        let previous = world.set(player("a", 2.0)).unwrap();
        assert_eq!(previous.position.x, 1.0);
        assert_eq!(world.player_count(), 1);
        assert_eq!(world.get(&ConnectionId::new("a")).unwrap().position.x, 2.0);
    }

    #[test]
    fn test_remove_player() {
        let mut world = World::new();
        world.set(player("a", 1.0));
        assert!(world.remove(&ConnectionId::new("a")).is_some());
        assert!(world.remove(&ConnectionId::new("a")).is_none());
        assert!(!world.contains(&ConnectionId::new("a")));
    }

    #[test]
    fn test_players_iterate_in_id_order() {
        let mut world = World::new();
        world.set(player("c", 0.0));
        world.set(player("a", 0.0));
        world.set(player("b", 0.0));
        let ids: Vec<&str> = world.all_players().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_food_removal_keeps_order() {
        let mut world = World::new();
        for x in [1.0, 2.0, 3.0] {
            world.add_food(food(x));
        }
        assert_eq!(world.remove_food_at(1).unwrap().position.x, 2.0);
        assert!(world.remove_food_at(5).is_none());
        let xs: Vec<f64> = world.all_food().iter().map(|f| f.position.x).collect();
        assert_eq!(xs, [1.0, 3.0]);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut world = World::new();
        world.set(player("a", 10.0));
        world.add_food(food(4.0));

        let snapshot = world.snapshot();
        world.get_mut(&ConnectionId::new("a")).unwrap().position.x = 99.0;
        world.replace_food(Vec::new());

        assert_eq!(snapshot.players[&ConnectionId::new("a")].x, 10.0);
        assert_eq!(snapshot.food.len(), 1);
    }
}
