//! Spatial indexing utilities.
//!
//! Region QuadTree rebuilt from scratch every tick.

mod quadtree;

pub use quadtree::{Bounds, EntityKind, QuadItem, QuadTree};
