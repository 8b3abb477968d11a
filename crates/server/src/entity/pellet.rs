//! Consumable mass pellet.

use super::store::Entity;
use crate::collision::{heading, mass_to_radius, Circle};
use crate::config::ArenaConfig;
use glam::Vec2;
use protocol::messages::PelletView;
use protocol::PlayerId;

/// Residual speed below which a drifting pellet stops.
const REST_SPEED: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct Pellet {
    pub id: u32,
    pub position: Vec2,
    pub mass: f32,
    pub radius: f32,
    pub hue: u16,
    /// Player that shed this pellet. It cannot pick it back up.
    pub owner: Option<PlayerId>,
    pub speed: f32,
    pub angle: f32,
}

impl Pellet {
    pub fn new(id: u32, position: Vec2, mass: f32, hue: u16) -> Self {
        Self {
            id,
            position,
            mass,
            radius: mass_to_radius(mass),
            hue,
            owner: None,
            speed: 0.0,
            angle: 0.0,
        }
    }

    pub fn with_owner(mut self, owner: PlayerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_motion(mut self, speed: f32, angle: f32) -> Self {
        self.speed = speed;
        self.angle = angle;
        self
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.speed > 0.0
    }

    /// Drift along the residual heading, then decay the residual speed.
    pub fn update(&mut self, arena: &ArenaConfig, friction: f32) {
        if !self.is_moving() {
            return;
        }
        self.position += heading(self.angle) * self.speed;
        self.position = arena.clamp(self.position, self.radius);
        self.speed *= friction;
        if self.speed < REST_SPEED {
            self.speed = 0.0;
        }
    }

    #[inline]
    pub fn circle(&self) -> Circle {
        Circle::new(self.position, self.radius)
    }

    pub fn view(&self) -> PelletView {
        PelletView {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            radius: self.radius,
            mass: self.mass,
            hue: self.hue,
        }
    }
}

impl Entity for Pellet {
    fn id(&self) -> u32 {
        self.id
    }
}

/// Split `total` into chunks of at most `chunk`.
pub fn chunks(total: f32, chunk: f32) -> impl Iterator<Item = f32> {
    let mut left = total;
    std::iter::from_fn(move || {
        if left <= 0.0 || chunk <= 0.0 {
            return None;
        }
        let m = left.min(chunk);
        left -= m;
        Some(m)
    })
}
