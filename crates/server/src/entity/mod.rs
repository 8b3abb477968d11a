//! Game entities.
//!
//! Players (made of cells), pellets and projectiles, plus the dense store
//! the world keeps each kind in.

mod cell;
mod pellet;
mod player;
mod projectile;
mod store;

pub use cell::Cell;
pub use pellet::{chunks, Pellet};
pub use player::{Player, Spill};
pub use projectile::{Projectile, Shot};
pub use store::{Entity, EntityStore};
