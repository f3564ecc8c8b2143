//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only
//! - Seeded RNG only
//! - Stable iteration order (by pool slot)
//! - No rendering or platform dependencies

pub mod anomaly;
pub mod collision;
pub mod effects;
pub mod enemy;
pub mod player;
pub mod pool;
pub mod rng;
pub mod state;
pub mod tick;
pub mod trail;

pub use anomaly::{Anomaly, AnomalyPhase, AnomalyTrigger, Layer};
pub use enemy::WallHalf;
pub use player::{Beam, HitOutcome};
pub use pool::{Handle, Pool};
pub use rng::Xorshift32;
pub use state::{
    Bullet, Drone, Enemy, EnemyShot, Explosion, GameEvent, GamePhase, KillSource, Particle, Player,
    Shield, SimulationState, Star, TickInput, Upgrade, UpgradeKind, MAX_BULLETS, MAX_DRONES,
    MAX_ENEMIES, MAX_ENEMY_SHOTS, MAX_EXPLOSIONS, MAX_PARTICLES, MAX_UPGRADES,
};
pub use tick::{autopilot, tick};
pub use trail::{Trail, TrailPoint};
