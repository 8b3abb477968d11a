//! Per-player view of the world.
//!
//! The visible rectangle is centered on the player and shrinks as the player
//! grows: `scale = min(screen_w, screen_h) / 4 / width`, extent `screen / scale`.

use crate::entity::Player;
use crate::world::World;
use glam::Vec2;
use protocol::messages::Snapshot;
use protocol::Shape;

/// Axis-aligned view rectangle around a player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Vec2,
    pub half_extent: Vec2,
}

impl Viewport {
    pub fn for_player(player: &Player) -> Self {
        let (sw, sh) = (player.screen_width, player.screen_height);
        let mut scale = sw.min(sh) / 4.0 / player.width;
        if !scale.is_finite() || scale <= 0.0 {
            scale = 1.0;
        }
        Self {
            center: player.position,
            half_extent: Vec2::new(sw.max(0.0), sh.max(0.0)) / scale / 2.0,
        }
    }

    /// Strictly inside the rectangle.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        let d = (point - self.center).abs();
        d.x < self.half_extent.x && d.y < self.half_extent.y
    }

    /// Does a box of `half` size around `center` overlap the rectangle
    /// grown by `padding` on every side?
    #[inline]
    pub fn overlaps(&self, center: Vec2, half: f32, padding: f32) -> bool {
        let d = (center - self.center).abs();
        let reach = self.half_extent + Vec2::splat(padding + half);
        d.x < reach.x && d.y < reach.y
    }
}

/// Is any part of `other` within the padded viewport?
fn player_visible(viewport: &Viewport, other: &Player, padding: f32) -> bool {
    match other.shape {
        Shape::Circle => other
            .cells
            .iter()
            .any(|cell| viewport.overlaps(cell.position, cell.radius, padding)),
        Shape::Square => viewport.overlaps(other.position, other.width / 2.0, padding),
    }
}

/// Everything `viewer` can see. The viewer always comes first, without an id.
pub fn snapshot(world: &World, viewer: &Player) -> Snapshot {
    let viewport = Viewport::for_player(viewer);
    let padding = world.config().visibility.padding;

    let mut players = vec![viewer.view(false)];
    players.extend(
        world
            .players()
            .filter(|p| p.id != viewer.id && player_visible(&viewport, p, padding))
            .map(|p| p.view(true)),
    );

    Snapshot {
        players,
        visible_pellets: world
            .pellets()
            .filter(|p| viewport.contains(p.position))
            .map(|p| p.view())
            .collect(),
        visible_projectiles: world
            .projectiles()
            .filter(|p| viewport.contains(p.position))
            .map(|p| p.view())
            .collect(),
    }
}
