//! Simulation state and entity types
//!
//! Everything a renderer or overlay reads lives here. The whole state is
//! serializable so a consumer can snapshot it once a tick has returned.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::anomaly::{Anomaly, AnomalyTrigger};
use super::effects;
use super::pool::Pool;
use super::rng::Xorshift32;
use super::trail::Trail;
use crate::consts::*;
use crate::tuning::Tuning;

/// Pool capacities
pub const MAX_BULLETS: usize = 96;
pub const MAX_ENEMY_SHOTS: usize = 128;
pub const MAX_ENEMIES: usize = 40;
pub const MAX_PARTICLES: usize = 512;
pub const MAX_EXPLOSIONS: usize = 48;
pub const MAX_UPGRADES: usize = 8;
pub const MAX_DRONES: usize = 2;

/// Trail sample counts
pub const ENEMY_TRAIL_CAPACITY: usize = 32;
pub const MISSILE_TRAIL_CAPACITY: usize = 16;
pub const DRONE_TRAIL_CAPACITY: usize = 64;

/// Player spawn column
pub const PLAYER_START_X: f32 = 120.0;
/// Keep-out margin between the player and the play-area edges
pub const PLAYER_EDGE_MARGIN: f32 = 20.0;
/// Smallest play area the layout may shrink to
const MIN_PLAY_HEIGHT: f32 = 64.0;

/// Delay before the first formation arrives
const FIRST_SPAWN_DELAY: f32 = 1.5;
/// Delay before retry/quit can be selected after game over
pub const GAME_OVER_SELECT_DELAY: f32 = 1.0;

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// Player destroyed; waiting for retry/quit selection
    GameOver,
}

/// Input flags for a tick
///
/// `fire_gun` is a one-shot request: the tick clears it on return.
/// `fire_laser` is level-held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire_gun: bool,
    pub fire_laser: bool,
}

/// What dealt the killing blow to an enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KillSource {
    Bullet,
    PlayerBeam,
    DroneBeam,
}

impl KillSource {
    /// Score for the kill itself (bullet hits score separately)
    pub fn score(&self) -> u32 {
        match self {
            KillSource::Bullet => 20,
            KillSource::PlayerBeam => 30,
            KillSource::DroneBeam => 25,
        }
    }
}

/// Notable things that happened during a tick (cleared every tick)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    EnemyKilled { pos: Vec2, source: KillSource },
    EnemyEscaped,
    EnemyRammed { pos: Vec2 },
    PlayerHit { damage: f32 },
    ShieldDepleted,
    UpgradeCollected(UpgradeKind),
    ProjectileDeflected { pos: Vec2 },
    ProjectileDestroyed { pos: Vec2 },
    AnomalyWarning,
    AnomalySpawned,
    AnomalyShieldBroken,
    AnomalyLayerDestroyed { layer: u8 },
    AnomalyDestroyed,
    GameOver { score: u32 },
}

/// Damage-absorbing shield (player and anomaly)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Shield {
    pub strength: f32,
    pub max: f32,
    pub active: bool,
    /// Cosmetic pulse phase
    pub pulse: f32,
}

/// Player laser hold/recharge bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LaserState {
    pub firing: bool,
    /// Remaining beam time for the current press
    pub hold_timer: f32,
    /// Lockout after a full hold; no firing while > 0
    pub recharge_timer: f32,
    /// Set while the current press has been consumed
    pub latched: bool,
    /// Pulsing beam intensity for rendering
    pub intensity: f32,
    pub origin: Vec2,
}

/// Thumper field upgrade
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thumper {
    pub active: bool,
    /// Counts down to the next pulse ring
    pub pulse_timer: f32,
    /// Phase of the rendered shock wave
    pub wave_timer: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponUpgrades {
    /// Split cannon level (0-2)
    pub split_level: u8,
    pub guidance: bool,
    /// Active drones (0-2)
    pub drone_count: u8,
    /// Beam width multiplier
    pub beam_scale: f32,
    pub thumper: Thumper,
    /// Remaining minigun time; gun cooldown halves while > 0
    pub minigun_timer: f32,
}

impl Default for WeaponUpgrades {
    fn default() -> Self {
        Self {
            split_level: 0,
            guidance: false,
            drone_count: 0,
            beam_scale: 1.0,
            thumper: Thumper::default(),
            minigun_timer: 0.0,
        }
    }
}

/// The player's ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub prev_pos: Vec2,
    pub speed: f32,
    pub radius: f32,
    /// Cosmetic roll angle in [0, 2π)
    pub roll: f32,
    pub health: f32,
    pub max_health: f32,
    pub invulnerable_timer: f32,
    /// Invulnerability granted by each discrete hit
    pub invulnerability_window: f32,
    pub alive: bool,
    pub shield: Shield,
    pub upgrades: WeaponUpgrades,
    pub gun_cooldown: f32,
    pub laser: LaserState,
    pub trail: Trail,
    /// Smoothed vertical lag of the trail behind the ship
    pub trail_offset_y: f32,
    pub exhaust_timer: f32,
}

/// A player bullet
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Bullet {
    pub pos: Vec2,
    pub vel: Vec2,
}

/// An enemy or anomaly projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyShot {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub is_missile: bool,
    /// Damage on hit; zero means "use the default for this kind"
    pub damage: f32,
    /// Bounced off the thumper field; no longer threatens the player
    pub deflected: bool,
    pub trail: Trail,
    pub trail_timer: f32,
}

impl Default for EnemyShot {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            life: 0.0,
            is_missile: false,
            damage: 0.0,
            deflected: false,
            trail: Trail::with_capacity(MISSILE_TRAIL_CAPACITY),
            trail_timer: 0.0,
        }
    }
}

/// An enemy ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub pos: Vec2,
    /// `x` is the ship's own leftward speed (added to world scroll),
    /// `y` its vertical drift
    pub vel: Vec2,
    pub radius: f32,
    pub hp: i32,
    pub rotation: f32,
    pub rotation_speed: f32,
    pub fire_timer: f32,
    pub fire_interval: f32,
    pub trail_timer: f32,
    pub trail: Trail,
}

impl Default for Enemy {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            radius: 8.0,
            hp: 1,
            rotation: 0.0,
            rotation_speed: 0.0,
            fire_timer: 0.0,
            fire_interval: 1.0,
            trail_timer: 0.0,
            trail: Trail::with_capacity(ENEMY_TRAIL_CAPACITY),
        }
    }
}

/// Upgrade pickup types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpgradeKind {
    #[default]
    SplitCannon,
    Guidance,
    Drones,
    BeamFocus,
    Shield,
    Thumper,
    Minigun,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 7] = [
        UpgradeKind::SplitCannon,
        UpgradeKind::Guidance,
        UpgradeKind::Drones,
        UpgradeKind::BeamFocus,
        UpgradeKind::Shield,
        UpgradeKind::Thumper,
        UpgradeKind::Minigun,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            UpgradeKind::SplitCannon => "SPLIT",
            UpgradeKind::Guidance => "GUIDE",
            UpgradeKind::Drones => "DRONE",
            UpgradeKind::BeamFocus => "FOCUS",
            UpgradeKind::Shield => "SHIELD",
            UpgradeKind::Thumper => "THUMP",
            UpgradeKind::Minigun => "MINI",
        }
    }
}

/// An upgrade pickup drifting through the play area
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Upgrade {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Vertical oscillation phase
    pub phase: f32,
    pub kind: UpgradeKind,
}

/// A drone orbiting the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drone {
    pub angle: f32,
    pub orbit_radius: f32,
    pub angular_velocity: f32,
    pub pos: Vec2,
    /// Depth in [-1, 1]; negative is behind the ship
    pub z: f32,
    pub prev_y: f32,
    pub trail_offset_y: f32,
    pub laser_firing: bool,
    pub trail: Trail,
}

impl Default for Drone {
    fn default() -> Self {
        Self {
            angle: 0.0,
            orbit_radius: 0.0,
            angular_velocity: 0.0,
            pos: Vec2::ZERO,
            z: 0.0,
            prev_y: 0.0,
            trail_offset_y: 0.0,
            laser_firing: false,
            trail: Trail::with_capacity(DRONE_TRAIL_CAPACITY),
        }
    }
}

/// A visual particle (not gameplay-affecting)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub max_life: f32,
    pub color: [u8; 3],
}

/// An expanding explosion ring
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Explosion {
    pub pos: Vec2,
    pub radius: f32,
    pub timer: f32,
    pub lifetime: f32,
}

/// A parallax background star
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Star {
    pub pos: Vec2,
    /// Fraction of world scroll speed this star moves at
    pub depth: f32,
    pub brightness: u8,
}

/// Complete simulation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    /// Seed this run was started from
    pub seed: u32,
    pub tuning: Tuning,
    pub rng: Xorshift32,
    pub input: TickInput,
    pub phase: GamePhase,
    /// Counts down after game over before retry can be selected
    pub select_countdown: f32,
    /// Simulated seconds since init
    pub time: f32,
    pub frame: u64,
    pub overlay_height: f32,
    pub play_top: f32,
    pub play_bottom: f32,
    pub score: u32,
    /// Kills counted toward the anomaly trigger (reset when it dies)
    pub enemies_destroyed: u32,
    /// Kills for display
    pub total_enemies_killed: u32,
    pub enemies_escaped: u32,
    pub anomalies_defeated: u32,
    pub scroll_speed: f32,
    pub scroll_target: f32,
    /// Counts down to the next formation
    pub spawn_timer: f32,
    pub player: Player,
    pub bullets: Pool<Bullet>,
    pub enemy_shots: Pool<EnemyShot>,
    pub enemies: Pool<Enemy>,
    pub particles: Pool<Particle>,
    pub explosions: Pool<Explosion>,
    pub upgrades: Pool<Upgrade>,
    pub drones: Pool<Drone>,
    pub stars: Vec<Star>,
    pub anomaly: Anomaly,
    pub trigger: AnomalyTrigger,
    /// Events raised during the last tick
    #[serde(skip)]
    pub events: Vec<GameEvent>,
}

impl SimulationState {
    /// Create a new run with default tuning
    pub fn new(seed: u32) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    /// Create a new run seeded from the clock
    pub fn from_clock() -> Self {
        Self::new(Xorshift32::seed_from_clock())
    }

    pub fn with_tuning(seed: u32, tuning: Tuning) -> Self {
        let mut rng = Xorshift32::new(seed);
        let (play_top, play_bottom) = play_bounds(DEFAULT_OVERLAY_HEIGHT);
        let stars = effects::seed_stars(&mut rng, play_top, play_bottom);
        let center_y = (play_top + play_bottom) * 0.5;
        let player = Player::new(Vec2::new(PLAYER_START_X, center_y), &tuning);

        Self {
            seed,
            rng,
            input: TickInput::default(),
            phase: GamePhase::Playing,
            select_countdown: 0.0,
            time: 0.0,
            frame: 0,
            overlay_height: DEFAULT_OVERLAY_HEIGHT,
            play_top,
            play_bottom,
            score: 0,
            enemies_destroyed: 0,
            total_enemies_killed: 0,
            enemies_escaped: 0,
            anomalies_defeated: 0,
            scroll_speed: tuning.base_scroll_speed,
            scroll_target: tuning.base_scroll_speed,
            spawn_timer: FIRST_SPAWN_DELAY,
            player,
            bullets: Pool::with_capacity(MAX_BULLETS),
            enemy_shots: Pool::with_capacity(MAX_ENEMY_SHOTS),
            enemies: Pool::with_capacity(MAX_ENEMIES),
            particles: Pool::with_capacity(MAX_PARTICLES),
            explosions: Pool::with_capacity(MAX_EXPLOSIONS),
            upgrades: Pool::with_capacity(MAX_UPGRADES),
            drones: Pool::with_capacity(MAX_DRONES),
            stars,
            anomaly: Anomaly::default(),
            trigger: AnomalyTrigger::default(),
            events: Vec::new(),
            tuning,
        }
    }

    /// Start a fresh run, keeping tuning and layout
    pub fn restart(&mut self) {
        let seed = self.rng.next_u32();
        log::info!("Restarting run (seed {seed})");
        let overlay_height = self.overlay_height;
        *self = Self::with_tuning(seed, self.tuning.clone());
        self.update_layout(overlay_height);
    }

    /// Recompute the play area from the overlay height
    pub fn update_layout(&mut self, overlay_height: f32) {
        self.overlay_height = overlay_height.max(0.0);
        let (top, bottom) = play_bounds(self.overlay_height);
        if top > bottom - MIN_PLAY_HEIGHT {
            log::warn!("Overlay height {overlay_height} leaves no play area; clamping");
        }
        self.play_top = top.min(bottom - MIN_PLAY_HEIGHT);
        self.play_bottom = bottom;
        self.player.pos = self.clamp_to_play_area(self.player.pos);
    }

    pub fn play_center_y(&self) -> f32 {
        (self.play_top + self.play_bottom) * 0.5
    }

    pub fn play_height(&self) -> f32 {
        self.play_bottom - self.play_top
    }

    /// Clamp a position into the region the player may occupy
    pub fn clamp_to_play_area(&self, pos: Vec2) -> Vec2 {
        Vec2::new(
            pos.x.clamp(PLAYER_EDGE_MARGIN, SCREEN_W - PLAYER_EDGE_MARGIN),
            pos.y.clamp(
                self.play_top + PLAYER_EDGE_MARGIN,
                self.play_bottom - PLAYER_EDGE_MARGIN,
            ),
        )
    }

    /// Events raised during the last tick
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Retry/quit may be offered once the game-over countdown elapses
    pub fn can_select_retry(&self) -> bool {
        self.phase == GamePhase::GameOver && self.select_countdown <= 0.0
    }
}

/// Play-area vertical bounds for a given overlay height
fn play_bounds(overlay_height: f32) -> (f32, f32) {
    (
        overlay_height + PLAY_AREA_MARGIN,
        SCREEN_H - PLAY_AREA_MARGIN,
    )
}
