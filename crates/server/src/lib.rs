//! Blob arena game server library.

pub mod collision;
pub mod config;
pub mod entity;
pub mod geometry;
pub mod server;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use server::{
    Frame, GameState, PendingMessages, ServerContext, TargetedMessage, drive_session, run,
    run_game_loop, serve,
};
