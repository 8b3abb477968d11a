//! Authoritative arena simulation core.
//!
//! The [`world::World`] owns every entity and runs the tick pipeline, the
//! [`spatial`] quadtree narrows collision checks, [`visibility`] builds
//! per-player snapshots, and [`server`] runs the single-writer game loop
//! behind a WebSocket listener.

pub mod collision;
pub mod config;
pub mod dispatch;
pub mod entity;
pub mod server;
pub mod spatial;
pub mod visibility;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use dispatch::{validate_name, NameError};
pub use server::{run, serve, ConnectionId, GameState, Inbound, Mailboxes, Transport};
pub use world::{TickReport, World};
