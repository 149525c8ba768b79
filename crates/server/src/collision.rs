//! Collision detection and resolution.
//!
//! Runs once per accepted move for the moving player (the actor):
//! - Food pass: every overlapping pellet is eaten
//! - Player pass: the actor absorbs, or is absorbed by, other players
//!
//! Both passes mutate the world in place, so the player pass sees the
//! radius the actor reached in the food pass. No messages are sent here;
//! the caller turns the returned outcome into notifications.

use crate::config::Config;
use crate::geometry::{is_fully_absorbed, overlaps};
use crate::world::World;
use protocol::ConnectionId;
use tracing::debug;

/// Fraction of the victim's radius the eater gains.
pub const ABSORB_GAIN: f64 = 0.5;

/// Tunables for collision resolution.
#[derive(Debug, Clone, Copy)]
pub struct CollisionRules {
    /// Eater radius must be at least victim radius times this.
    pub min_eat_ratio: f64,
    /// Radius gained per pellet.
    pub food_growth: f64,
}

impl CollisionRules {
    pub fn new(config: &Config) -> Self {
        Self {
            min_eat_ratio: config.player.min_eat_ratio,
            food_growth: config.food.growth,
        }
    }
}

/// One player absorbing another.
#[derive(Debug, Clone, PartialEq)]
pub struct Absorption {
    pub eater: ConnectionId,
    pub victim: ConnectionId,
    /// Radius the eater gained.
    pub gained: f64,
}

/// What a single resolution changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionOutcome {
    /// Pellets the actor ate.
    pub food_eaten: usize,
    /// Absorptions in the order they happened.
    pub absorptions: Vec<Absorption>,
    /// Whether the actor itself was absorbed (always the last absorption).
    pub actor_absorbed: bool,
}

impl CollisionOutcome {
    /// Connections whose player was removed.
    pub fn victims(&self) -> impl Iterator<Item = &ConnectionId> {
        self.absorptions.iter().map(|a| &a.victim)
    }

    /// Whether anything in the world changed.
    pub fn is_empty(&self) -> bool {
        self.food_eaten == 0 && self.absorptions.is_empty()
    }
}

enum Verdict {
    ActorEats { gained: f64 },
    OtherEats { gained: f64 },
    Nothing,
}

/// Resolve food and player collisions for `actor_id`.
///
/// Does nothing if the actor is not in the world (already absorbed or
/// disconnected).
pub fn resolve(
    world: &mut World,
    actor_id: &ConnectionId,
    rules: &CollisionRules,
) -> CollisionOutcome {
    let mut outcome = CollisionOutcome::default();
    if !world.contains(actor_id) {
        return outcome;
    }

    outcome.food_eaten = resolve_food(world, actor_id, rules.food_growth);
    resolve_players(world, actor_id, rules.min_eat_ratio, &mut outcome);
    outcome
}

/// Eat every pellet overlapping the actor, in list order.
fn resolve_food(world: &mut World, actor_id: &ConnectionId, growth: f64) -> usize {
    let Some(mut actor) = world.get(actor_id).cloned() else {
        return 0;
    };

    let mut eaten = 0;
    let mut index = 0;
    while index < world.food_count() {
        if overlaps(&actor, &world.all_food()[index]) {
            world.remove_food_at(index);
            actor.grow(growth);
            eaten += 1;
        } else {
            index += 1;
        }
    }

    if eaten > 0 {
        if let Some(player) = world.get_mut(actor_id) {
            player.radius = actor.radius;
        }
    }
    eaten
}

/// Compare the actor against every other player in iteration order.
fn resolve_players(
    world: &mut World,
    actor_id: &ConnectionId,
    min_eat_ratio: f64,
    outcome: &mut CollisionOutcome,
) {
    for other_id in world.player_ids() {
        if other_id == *actor_id {
            continue;
        }

        let verdict = {
            let Some(actor) = world.get(actor_id) else {
                break;
            };
            let Some(other) = world.get(&other_id) else {
                continue;
            };

            let actor_eats =
                actor.radius >= other.radius * min_eat_ratio && is_fully_absorbed(other, actor);
            let other_eats =
                other.radius >= actor.radius * min_eat_ratio && is_fully_absorbed(actor, other);

            if actor_eats {
                Verdict::ActorEats {
                    gained: other.radius * ABSORB_GAIN,
                }
            } else if other_eats {
                Verdict::OtherEats {
                    gained: actor.radius * ABSORB_GAIN,
                }
            } else {
                Verdict::Nothing
            }
        };

        match verdict {
            Verdict::ActorEats { gained } => {
                world.remove(&other_id);
                if let Some(actor) = world.get_mut(actor_id) {
                    actor.grow(gained);
                }
                debug!("Player {} absorbed {} (+{:.1})", actor_id, other_id, gained);
                outcome.absorptions.push(Absorption {
                    eater: actor_id.clone(),
                    victim: other_id,
                    gained,
                });
            }
            Verdict::OtherEats { gained } => {
                world.remove(actor_id);
                if let Some(other) = world.get_mut(&other_id) {
                    other.grow(gained);
                }
                debug!("Player {} absorbed {} (+{:.1})", other_id, actor_id, gained);
                outcome.absorptions.push(Absorption {
                    eater: other_id,
                    victim: actor_id.clone(),
                    gained,
                });
                outcome.actor_absorbed = true;
                // The actor is gone; nothing left to compare.
                break;
            }
            Verdict::Nothing => {}
        }
    }
}
