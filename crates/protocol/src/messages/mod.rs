//! Message definitions for the arena protocol.
//!
//! This module contains both client->server commands and server->client events.

mod client;
mod server;

pub use client::*;
pub use server::*;
