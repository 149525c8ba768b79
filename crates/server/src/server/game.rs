//! Game state and main loop.
//!
//! Every inbound client message is a command handled against the shared
//! [`GameState`]. Handlers mutate the world and return the messages to send;
//! the caller dispatches them before releasing the state lock, so frames go
//! out in the order the world changed.

use crate::collision::{self, CollisionRules};
use crate::config::Config;
use crate::entity::EntityFactory;
use crate::geometry::clamp_to_map;
use crate::world::World;
use glam::DVec2;
use protocol::{ClientMessage, ConnectionId, ServerMessage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use super::client::{Client, Outbound, SessionState, generate_connection_id};
use super::{ServerContext, TargetedMessage};

/// Messages produced by one command, not yet encoded.
#[derive(Debug, Default)]
pub struct PendingMessages {
    /// Sent to every connection.
    pub broadcast: Option<ServerMessage>,
    /// Sent to one connection each.
    pub targeted: Vec<TargetedMessage>,
}

impl PendingMessages {
    pub fn is_empty(&self) -> bool {
        self.broadcast.is_none() && self.targeted.is_empty()
    }

    fn send_to(&mut self, client_id: ConnectionId, message: ServerMessage) {
        self.targeted.push(TargetedMessage { client_id, message });
    }
}

/// Main game state.
pub struct GameState {
    pub config: Config,
    pub tick_count: u64,

    // Connected clients
    pub clients: HashMap<ConnectionId, Client>,

    // Game world (entities)
    pub world: World,

    // Average tick duration in milliseconds (exponential moving average).
    pub update_time_avg: f64,

    factory: EntityFactory,
    rules: CollisionRules,
    rng: StdRng,
}

impl GameState {
    /// Create a new game state with a freshly seeded food list.
    pub fn new(config: &Config) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Create a new game state drawing randomness from `rng`.
    pub fn with_rng(config: &Config, mut rng: StdRng) -> Self {
        let factory = EntityFactory::new(config);
        let mut world = World::new();
        world.replace_food(factory.seed_food(config.food.count, &mut rng));
        info!("World initialized: {} food", world.food_count());

        Self {
            config: config.clone(),
            tick_count: 0,
            clients: HashMap::new(),
            world,
            update_time_avg: 0.0,
            factory,
            rules: CollisionRules::new(config),
            rng,
        }
    }

    /// Register a new connection and return its id.
    ///
    /// Messages targeted at the connection are queued on `outbox`.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        outbox: mpsc::UnboundedSender<Outbound>,
    ) -> ConnectionId {
        let id = loop {
            let id = generate_connection_id(&mut self.rng);
            if !self.clients.contains_key(&id) {
                break id;
            }
        };
        self.clients.insert(id.clone(), Client::new(id.clone(), addr, outbox));
        info!("Client {} connected from {}", id, addr);
        id
    }

    /// Remove a connection and its player.
    pub fn remove_client(&mut self, id: &ConnectionId) -> Option<Client> {
        self.world.remove(id);
        let mut client = self.clients.remove(id)?;
        client.state = SessionState::Disconnected;
        info!(
            "Client {} ({}) disconnected after {:.1}s",
            id,
            client.addr,
            client.connected_at.elapsed().as_secs_f64()
        );
        Some(client)
    }

    /// Spawn the first player of a registered connection and greet it.
    pub fn handle_connect(&mut self, id: &ConnectionId) -> PendingMessages {
        let mut pending = PendingMessages::default();
        match self.clients.get_mut(id) {
            Some(client) if client.state == SessionState::Connecting => {
                client.state = SessionState::Active;
            }
            _ => return pending,
        }

        self.spawn_player(id);
        pending.send_to(id.clone(), self.init_message(id));
        pending
    }

    /// Handle a decoded message from a client.
    pub fn handle_message(
        &mut self,
        id: &ConnectionId,
        message: ClientMessage,
    ) -> PendingMessages {
        match self.clients.get(id) {
            Some(client) if client.is_active() => {}
            _ => return PendingMessages::default(),
        }

        match message {
            ClientMessage::Move { x, y } => self.handle_move(id, x, y),
            ClientMessage::Respawn => self.handle_respawn(id),
        }
    }

    /// Move the player, resolve collisions and broadcast the result.
    fn handle_move(&mut self, id: &ConnectionId, x: f64, y: f64) -> PendingMessages {
        let mut pending = PendingMessages::default();
        if !x.is_finite() || !y.is_finite() {
            return pending;
        }

        let map_size = self.factory.map_size();
        match self.world.get_mut(id) {
            Some(player) => player.position = clamp_to_map(DVec2::new(x, y), map_size),
            // Absorbed and not yet respawned.
            None => return pending,
        }

        let outcome = collision::resolve(&mut self.world, id, &self.rules);
        for victim in outcome.victims() {
            pending.send_to(victim.clone(), ServerMessage::PlayerEaten);
        }
        if outcome.actor_absorbed {
            info!("Client {} was absorbed", id);
        }

        pending.broadcast = Some(ServerMessage::Update(self.world.snapshot()));
        pending
    }

    /// Replace the player with a fresh one and re-send the world.
    fn handle_respawn(&mut self, id: &ConnectionId) -> PendingMessages {
        let mut pending = PendingMessages::default();
        self.spawn_player(id);
        pending.send_to(id.clone(), self.init_message(id));
        pending
    }

    /// Spawn a player for the given client, overwriting any previous one.
    pub fn spawn_player(&mut self, id: &ConnectionId) {
        let player = self.factory.spawn_player(id.clone(), &mut self.rng);
        debug!(
            "Spawned player for client {} at ({:.1}, {:.1})",
            id, player.position.x, player.position.y
        );
        self.world.set(player);
    }

    fn init_message(&self, id: &ConnectionId) -> ServerMessage {
        ServerMessage::Init {
            id: id.clone(),
            map_size: self.factory.map_size(),
            world: self.world.snapshot(),
        }
    }

    /// Run a single game tick and return pending broadcasts.
    pub fn tick(&mut self) -> PendingMessages {
        self.tick_count += 1;

        // At most one pellet per tick.
        if self.world.food_count() < self.config.food.count {
            let food = self.factory.spawn_food(&mut self.rng);
            self.world.add_food(food);
        }

        let report_every = u64::from(self.config.server.tick_rate) * 60;
        if self.tick_count % report_every.max(1) == 0 {
            debug!(
                "Tick #{}: avg {:.3}ms | {} clients, {} players, {} food",
                self.tick_count,
                self.update_time_avg,
                self.clients.len(),
                self.world.player_count(),
                self.world.food_count()
            );
        }

        PendingMessages {
            broadcast: Some(ServerMessage::Update(self.world.snapshot())),
            targeted: Vec::new(),
        }
    }
}

/// Run the main game loop.
pub async fn run_game_loop(ctx: ServerContext, tick_interval: Duration) {
    let start = Instant::now() + tick_interval;
    let mut ticker = interval_at(start, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let tick_budget = tick_interval.mul_f64(0.9);

    loop {
        ticker.tick().await;

        // Run tick and publish while still holding the lock, so a newer
        // snapshot from a move cannot be overtaken by this one.
        {
            let mut game = ctx.game.write().await;
            let tick_start = std::time::Instant::now();
            let pending = game.tick();
            let elapsed = tick_start.elapsed();

            let tick_ms = elapsed.as_secs_f64() * 1000.0;
            game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

            if elapsed > tick_budget {
                warn!(
                    "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} food",
                    game.tick_count,
                    tick_ms,
                    tick_budget.as_secs_f64() * 1000.0,
                    game.world.player_count(),
                    game.world.food_count()
                );
            }

            ctx.dispatch(&game, pending);
        } // Write lock released here
    }
}
