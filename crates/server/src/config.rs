//! Server configuration.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub projectile: ProjectileConfig,
    #[serde(default)]
    pub spatial: SpatialConfig,
    #[serde(default)]
    pub visibility: VisibilityConfig,
    #[serde(default)]
    pub rules: RulesConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load configuration from `path`, writing the defaults there if it is missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }
}

/// Server networking and cadence settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum simultaneous connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Simulation ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: u32,
    /// Snapshot pushes per second.
    #[serde(default = "default_update_rate")]
    pub update_rate_hz: u32,
    /// Kick players whose last heartbeat is older than this. 0 disables.
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_ms: u64,
    /// Frames buffered per connection before new ones are dropped.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Commands buffered between connection readers and the game loop.
    #[serde(default = "default_inbound_queue")]
    pub inbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            tick_rate_hz: default_tick_rate(),
            update_rate_hz: default_update_rate(),
            heartbeat_timeout_ms: default_heartbeat_timeout(),
            outbound_queue: default_outbound_queue(),
            inbound_queue: default_inbound_queue(),
        }
    }
}

impl ServerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.update_rate_hz.max(1) as f64)
    }

    pub fn heartbeat_timeout(&self) -> Option<Duration> {
        (self.heartbeat_timeout_ms > 0).then(|| Duration::from_millis(self.heartbeat_timeout_ms))
    }
}

fn default_port() -> u16 {
    3000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_tick_rate() -> u32 {
    60
}
fn default_update_rate() -> u32 {
    40
}
fn default_heartbeat_timeout() -> u64 {
    5000
}
fn default_outbound_queue() -> usize {
    100
}
fn default_inbound_queue() -> usize {
    1024
}

/// Arena rectangle, spanning `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ArenaConfig {
    #[serde(default = "default_arena_size")]
    pub width: f32,
    #[serde(default = "default_arena_size")]
    pub height: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: default_arena_size(),
            height: default_arena_size(),
        }
    }
}

impl ArenaConfig {
    /// Clamp `pos` so a body with the given margin stays inside the arena.
    /// Bodies wider than the arena are centered on that axis.
    pub fn clamp(&self, pos: Vec2, margin: f32) -> Vec2 {
        Vec2::new(clamp_axis(pos.x, margin, self.width), clamp_axis(pos.y, margin, self.height))
    }

    /// Get a random position at least `margin` away from every border.
    pub fn random_position(&self, margin: f32) -> Vec2 {
        let mut rng = rand::rng();
        let mut axis = |dim: f32| {
            if margin * 2.0 >= dim {
                dim / 2.0
            } else {
                rng.random_range(margin..dim - margin)
            }
        };
        Vec2::new(axis(self.width), axis(self.height))
    }
}

#[inline]
fn clamp_axis(v: f32, margin: f32, dim: f32) -> f32 {
    if margin * 2.0 >= dim {
        dim / 2.0
    } else {
        v.clamp(margin, dim - margin)
    }
}

fn default_arena_size() -> f32 {
    5000.0
}

/// Player configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Mass of a freshly spawned player.
    #[serde(default = "default_player_mass")]
    pub default_mass: f32,
    /// Cell speed in units per tick.
    #[serde(default = "default_base_speed")]
    pub base_speed: f32,
    /// Cell speed while sprinting or invulnerable.
    #[serde(default = "default_boost_speed")]
    pub boost_speed: f32,
    #[serde(default = "default_sprint_ms")]
    pub sprint_ms: u64,
    #[serde(default = "default_invulnerable_ms")]
    pub invulnerable_ms: u64,
    /// Minimum age of a split cell before it can merge back.
    #[serde(default = "default_merge_timer")]
    pub merge_timer_ms: u64,
    #[serde(default = "default_max_cells")]
    pub max_cells: usize,
    #[serde(default = "default_clip_size")]
    pub clip_size: u32,
    #[serde(default = "default_reload_ms")]
    pub reload_ms: u64,
    #[serde(default = "default_max_nick_length")]
    pub max_nick_length: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_mass: default_player_mass(),
            base_speed: default_base_speed(),
            boost_speed: default_boost_speed(),
            sprint_ms: default_sprint_ms(),
            invulnerable_ms: default_invulnerable_ms(),
            merge_timer_ms: default_merge_timer(),
            max_cells: default_max_cells(),
            clip_size: default_clip_size(),
            reload_ms: default_reload_ms(),
            max_nick_length: default_max_nick_length(),
        }
    }
}

impl PlayerConfig {
    pub fn sprint_duration(&self) -> Duration {
        Duration::from_millis(self.sprint_ms)
    }

    pub fn invulnerable_duration(&self) -> Duration {
        Duration::from_millis(self.invulnerable_ms)
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_millis(self.reload_ms)
    }

    pub fn merge_delay(&self) -> Duration {
        Duration::from_millis(self.merge_timer_ms)
    }
}

fn default_player_mass() -> f32 {
    10.0
}
fn default_base_speed() -> f32 {
    5.0
}
fn default_boost_speed() -> f32 {
    7.25
}
fn default_sprint_ms() -> u64 {
    1500
}
fn default_invulnerable_ms() -> u64 {
    500
}
fn default_merge_timer() -> u64 {
    15000
}
fn default_max_cells() -> usize {
    16
}
fn default_clip_size() -> u32 {
    10
}
fn default_reload_ms() -> u64 {
    1000
}
fn default_max_nick_length() -> usize {
    25
}

/// Food (pellet) population configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    /// Mass of a balancer pellet.
    #[serde(default = "default_food_mass")]
    pub mass: f32,
    /// Total mass (pellets + players) the balancer converges toward.
    #[serde(default = "default_game_mass")]
    pub game_mass: f32,
    #[serde(default = "default_max_food")]
    pub max_count: usize,
    /// Fraction of residual speed kept each tick by drifting pellets.
    #[serde(default = "default_friction")]
    pub friction: f32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            mass: default_food_mass(),
            game_mass: default_game_mass(),
            max_count: default_max_food(),
            friction: default_friction(),
        }
    }
}

fn default_food_mass() -> f32 {
    1.0
}
fn default_game_mass() -> f32 {
    20000.0
}
fn default_max_food() -> usize {
    1000
}
fn default_friction() -> f32 {
    0.9
}

/// Projectile ballistics.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectileConfig {
    #[serde(default = "default_projectile_speed")]
    pub speed: f32,
    /// Travel budget as a multiple of the shooter's width.
    #[serde(default = "default_range_factor")]
    pub range_factor: f32,
    /// Fraction of the shooter's total mass carried as damage.
    #[serde(default = "default_damage_ratio")]
    pub damage_ratio: f32,
    /// Angle between the center shot and the side shots of circles.
    #[serde(default = "default_spread")]
    pub spread_degrees: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            speed: default_projectile_speed(),
            range_factor: default_range_factor(),
            damage_ratio: default_damage_ratio(),
            spread_degrees: default_spread(),
        }
    }
}

fn default_projectile_speed() -> f32 {
    15.0
}
fn default_range_factor() -> f32 {
    8.0
}
fn default_damage_ratio() -> f32 {
    0.1
}
fn default_spread() -> f32 {
    15.0
}

/// QuadTree tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpatialConfig {
    #[serde(default = "default_max_objects")]
    pub max_objects: usize,
    #[serde(default = "default_max_levels")]
    pub max_levels: u32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            max_objects: default_max_objects(),
            max_levels: default_max_levels(),
        }
    }
}

fn default_max_objects() -> usize {
    200
}
fn default_max_levels() -> u32 {
    7
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisibilityConfig {
    /// Extra margin around the viewport when looking for other players.
    #[serde(default = "default_padding")]
    pub padding: f32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            padding: default_padding(),
        }
    }
}

fn default_padding() -> f32 {
    40.0
}

/// Optional rules, off by default.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RulesConfig {
    /// Heavier players absorb lighter ones instead of only pushing them.
    #[serde(default)]
    pub player_eating: bool,
    /// Required mass ratio for eating.
    #[serde(default = "default_eat_ratio")]
    pub eat_ratio: f32,
    /// Enables the `split` command and merging of split cells.
    #[serde(default)]
    pub cell_merge: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            player_eating: false,
            eat_ratio: default_eat_ratio(),
            cell_merge: false,
        }
    }
}

fn default_eat_ratio() -> f32 {
    1.0
}
