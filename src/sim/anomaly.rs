//! The anomaly: a layered boss encounter
//!
//! Lifecycle: Inactive -> Pending (warning countdown) -> Active(layer 0..4)
//! -> Destroyed -> Inactive with a cooldown. Layers are peeled from the
//! outer shell inward; each destroyed layer exposes the next weapon ring.
//! The layer index only ever increases for a given instance.
//!
//! Weapon point and laser positions are never stored; they are derived each
//! frame from the point's angle plus the ring's accumulated rotation.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::spawn_upgrade;
use super::effects::{self, ExplosionSize};
use super::enemy::WallHalf;
use super::player::{drone_beams, player_beam};
use super::state::{EnemyShot, GameEvent, Shield, SimulationState, UpgradeKind};
use crate::consts::*;
use crate::{point_segment_distance, polar_to_cartesian, rotate, wrap_angle};

pub const LAYER_COUNT: usize = 5;
pub const CORE_LAYER: u8 = 4;
/// Layer index once the core has been destroyed
pub const LAYER_DESTROYED: u8 = 5;

/// Weapon points per ring, outer to core
pub const RING_POINT_COUNTS: [usize; LAYER_COUNT] = [10, 8, 6, 4, 20];
/// Ring radius as a fraction of the body radius
const RING_RADIUS: [f32; LAYER_COUNT] = [1.0, 0.8, 0.62, 0.45, 0.25];
const RING_SPIN: [f32; LAYER_COUNT] = [0.3, -0.45, 0.6, -0.8, 1.2];

/// Body radius at scale 1.0
pub const BASE_RADIUS: f32 = 70.0;
/// Hit radius shrinks by this factor per destroyed layer
const LAYER_SHRINK: f32 = 0.8;

pub const RING_LASER_COUNT: usize = 10;
const RING_LASER_PERIOD: f32 = 3.0;
const RING_LASER_OFF: f32 = 1.0;
const RING_LASER_FADE: f32 = 0.3;
const RING_LASER_SPIN: f32 = 0.6;
/// Ring lasers only hurt once this bright
const RING_LASER_MIN_FADE: f32 = 0.5;

pub const ORBITAL_COUNT: usize = 64;

const ENTRY_OFFSET_X: f32 = 90.0;
/// Column the anomaly drifts to and holds
const HOLD_X: f32 = SCREEN_W - 150.0;
const DRIFT_SPEED: f32 = 40.0;
const SWAY_RATE: f32 = 0.45;
const SWAY_AMPLITUDE: f32 = 0.3;

const HIT_FLASH_TIME: f32 = 0.12;
const MUZZLE_FLASH_TIME: f32 = 0.12;
const FIRST_WALL_DELAY: f32 = 3.5;

/// Outer and mid2 rings refire faster once the core is exposed
const OUTER_CORE_RATE: f32 = 0.65;
const MID2_CORE_RATE: f32 = 0.6;
const CORE_SPREAD: f32 = 0.22;

/// The five shells, outer to core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    Outer,
    Mid2,
    Mid1,
    Inner,
    Core,
}

impl Layer {
    pub const ALL: [Layer; LAYER_COUNT] = [
        Layer::Outer,
        Layer::Mid2,
        Layer::Mid1,
        Layer::Inner,
        Layer::Core,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether this layer's ring fires while `current` is the exposed layer
    pub fn fires_at(self, current: u8) -> bool {
        match self {
            Layer::Outer => current == 0 || current == CORE_LAYER,
            Layer::Mid2 => current == 1 || current == CORE_LAYER,
            Layer::Mid1 => (2..=CORE_LAYER).contains(&current),
            Layer::Inner => (3..=CORE_LAYER).contains(&current),
            Layer::Core => current == CORE_LAYER,
        }
    }

    /// Fire-timer reload range for this ring's points
    fn reload_range(self) -> (f32, f32) {
        match self {
            Layer::Outer => (1.5, 3.0),
            Layer::Mid2 => (0.9, 1.6),
            Layer::Mid1 => (0.0, 0.0),
            Layer::Inner => (0.45, 0.8),
            Layer::Core => (0.6, 0.95),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerHealth {
    pub health: f32,
    pub max_health: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeaponPoint {
    /// Angle relative to the ring's rotation
    pub angle: f32,
    /// Fraction of the body radius
    pub radius: f32,
    /// Projectile speed multiplier
    pub speed: f32,
    pub fire_timer: f32,
    /// Muzzle flash countdown
    pub laser_timer: f32,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeaponRing {
    pub points: Vec<WeaponPoint>,
    pub rotation: f32,
    pub rotation_speed: f32,
}

impl WeaponRing {
    pub fn is_active(&self) -> bool {
        self.points.first().is_some_and(|p| p.active)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyLaser {
    pub origin: Vec2,
    pub target: Vec2,
    pub length: f32,
    /// 0 = invisible, 1 = full strength
    pub fade: f32,
    pub active: bool,
}

/// Decorative point orbiting the body
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrbitalPoint {
    pub angle: f32,
    pub angular_velocity: f32,
    pub base_radius: f32,
    pub radius: f32,
    pub phase: f32,
    pub breath_speed: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Anomaly {
    pub active: bool,
    pub pos: Vec2,
    pub target_y: f32,
    pub rotation: f32,
    pub rotation_speed: f32,
    pub scale: f32,
    pub pulse: f32,
    /// Renderer hints
    pub shape: u8,
    pub render_mode: u8,
    /// Seconds since activation
    pub age: f32,
    /// Exposed layer (0 = outer .. 4 = core, 5 = destroyed)
    pub layer: u8,
    pub layers: [LayerHealth; LAYER_COUNT],
    pub rings: [WeaponRing; LAYER_COUNT],
    pub lasers: Vec<AnomalyLaser>,
    /// Position in the ring laser on/off cycle
    pub laser_cycle: f32,
    pub laser_rotation: f32,
    pub orbitals: Vec<OrbitalPoint>,
    pub shield: Shield,
    pub hit_flash: f32,
    /// The inner-layer thumper drop happens once per instance
    pub thumper_dropped: bool,
}

impl Anomaly {
    /// Current collision radius
    pub fn hit_radius(&self) -> f32 {
        let layer = self.layer.min(CORE_LAYER) as i32;
        BASE_RADIUS * self.scale * LAYER_SHRINK.powi(layer)
    }

    pub fn current_layer(&self) -> Option<Layer> {
        if self.active {
            Layer::from_index(self.layer)
        } else {
            None
        }
    }

    /// World position of a weapon point on `layer`'s ring
    pub fn point_position(&self, layer: Layer, point: &WeaponPoint) -> Vec2 {
        let rotation = self.rings[layer.index()].rotation;
        weapon_point_position(self.pos, self.scale, rotation, point)
    }
}

fn weapon_point_position(
    center: Vec2,
    scale: f32,
    ring_rotation: f32,
    point: &WeaponPoint,
) -> Vec2 {
    center + polar_to_cartesian(point.radius * BASE_RADIUS * scale, point.angle + ring_rotation)
}

/// Trigger bookkeeping that outlives individual anomaly instances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyTrigger {
    pub pending: bool,
    /// Blocks a new warning; while pending it doubles as the warning countdown
    pub cooldown_timer: f32,
    pub warning_timer: f32,
    pub wall_timer: f32,
    pub wall_phase: WallHalf,
}

/// Encounter phase, for overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyPhase {
    Inactive,
    Cooldown,
    Pending,
    Active(Layer),
}

impl SimulationState {
    pub fn anomaly_phase(&self) -> AnomalyPhase {
        if let Some(layer) = self.anomaly.current_layer() {
            AnomalyPhase::Active(layer)
        } else if self.trigger.pending {
            AnomalyPhase::Pending
        } else if self.trigger.cooldown_timer > 0.0 {
            AnomalyPhase::Cooldown
        } else {
            AnomalyPhase::Inactive
        }
    }
}

/// Arm the warning once the thresholds are met; activate when it runs out
pub fn update_trigger(state: &mut SimulationState, dt: f32) {
    let trigger = &mut state.trigger;
    if trigger.cooldown_timer > 0.0 {
        trigger.cooldown_timer = (trigger.cooldown_timer - dt).max(0.0);
    }

    if trigger.pending {
        trigger.warning_timer = trigger.cooldown_timer;
        if trigger.cooldown_timer <= 0.0 {
            trigger.pending = false;
            activate(state);
        }
        return;
    }

    let tuning = &state.tuning;
    if !state.anomaly.active
        && trigger.cooldown_timer <= 0.0
        && state.enemies_destroyed >= tuning.anomaly_kill_threshold
        && state.score >= tuning.anomaly_score_threshold
    {
        trigger.pending = true;
        trigger.cooldown_timer = tuning.anomaly_warning_time;
        trigger.warning_timer = tuning.anomaly_warning_time;
        state.events.push(GameEvent::AnomalyWarning);
        log::info!(
            "Anomaly warning: {} kills, score {}",
            state.enemies_destroyed,
            state.score
        );
    }
}

/// Build a fresh anomaly at the right edge
pub fn activate(state: &mut SimulationState) {
    let center_y = state.play_center_y();
    let tuning = &state.tuning;
    let rng = &mut state.rng;

    let layers = tuning.anomaly_layer_health.map(|health| LayerHealth {
        health,
        max_health: health,
    });

    let rings = Layer::ALL.map(|layer| {
        let i = layer.index();
        let count = RING_POINT_COUNTS[i];
        let (lo, hi) = layer.reload_range();
        let points = (0..count)
            .map(|p| WeaponPoint {
                angle: TAU * p as f32 / count as f32,
                radius: RING_RADIUS[i],
                speed: rng.range(0.9, 1.1),
                fire_timer: rng.range(lo, hi),
                laser_timer: 0.0,
                active: layer == Layer::Outer,
            })
            .collect();
        WeaponRing {
            points,
            rotation: rng.range(0.0, TAU),
            rotation_speed: RING_SPIN[i],
        }
    });

    let scale = rng.range(0.9, 1.15);
    let lasers = (0..RING_LASER_COUNT)
        .map(|_| AnomalyLaser {
            length: SCREEN_W * rng.range(1.1, 1.4),
            ..Default::default()
        })
        .collect();
    let orbitals = (0..ORBITAL_COUNT)
        .map(|_| {
            let base_radius = rng.range(0.5, 1.5) * BASE_RADIUS * scale;
            OrbitalPoint {
                angle: rng.range(0.0, TAU),
                angular_velocity: rng.range(-1.2, 1.2),
                base_radius,
                radius: base_radius,
                phase: rng.range(0.0, TAU),
                breath_speed: rng.range(0.5, 2.0),
            }
        })
        .collect();

    state.anomaly = Anomaly {
        active: true,
        pos: Vec2::new(SCREEN_W + ENTRY_OFFSET_X, center_y),
        target_y: center_y,
        rotation: rng.range(0.0, TAU),
        rotation_speed: rng.range(0.2, 0.5) * rng.sign(),
        scale,
        pulse: 0.0,
        shape: rng.range_int(0, 3) as u8,
        render_mode: rng.range_int(0, 2) as u8,
        age: 0.0,
        layer: 0,
        layers,
        rings,
        lasers,
        laser_cycle: 0.0,
        laser_rotation: 0.0,
        orbitals,
        shield: Shield::full(tuning.anomaly_shield),
        hit_flash: 0.0,
        thumper_dropped: false,
    };

    let trigger = &mut state.trigger;
    trigger.warning_timer = 0.0;
    trigger.wall_timer = FIRST_WALL_DELAY;
    trigger.wall_phase = WallHalf::Top;

    state.events.push(GameEvent::AnomalySpawned);
    log::info!("Anomaly activated (scale {:.2})", state.anomaly.scale);
}

/// Route damage through the shield into the exposed layer
pub fn apply_damage(state: &mut SimulationState, amount: f32) {
    let anomaly = &mut state.anomaly;
    if !anomaly.active || amount <= 0.0 {
        return;
    }
    let shield_was_up = anomaly.shield.active;
    let overflow = anomaly.shield.absorb(amount);
    if shield_was_up && !anomaly.shield.active {
        // Gone for good on this instance
        let pos = anomaly.pos;
        effects::explode(state, pos, ExplosionSize::Medium);
        state.events.push(GameEvent::AnomalyShieldBroken);
    }
    if overflow <= 0.0 {
        return;
    }

    let anomaly = &mut state.anomaly;
    let Some(layer) = anomaly.layers.get_mut(anomaly.layer as usize) else {
        return;
    };
    anomaly.hit_flash = HIT_FLASH_TIME;
    layer.health -= overflow;
    if layer.health <= 0.0 {
        layer.health = 0.0;
        destroy_layer(state);
    }
}

fn destroy_layer(state: &mut SimulationState) {
    let n = state.anomaly.layer;
    let pos = state.anomaly.pos;
    let radius = state.anomaly.hit_radius();

    if n < CORE_LAYER {
        state.score += 100 * (n as u32 + 1);
        effects::explosion_ring(state, pos, radius, 8, ExplosionSize::Small);
        let next = n + 1;
        let anomaly = &mut state.anomaly;
        anomaly.layer = next;
        for point in anomaly.rings[next as usize].points.iter_mut() {
            point.active = true;
        }
        state.events.push(GameEvent::AnomalyLayerDestroyed { layer: n });
        log::info!("Anomaly layer {n} destroyed");

        if next == Layer::Inner as u8
            && !state.anomaly.thumper_dropped
            && !state.player.upgrades.thumper.active
        {
            state.anomaly.thumper_dropped = true;
            spawn_upgrade(state, pos, UpgradeKind::Thumper);
        }
        return;
    }

    state.score += 1000;
    effects::explosion_ring(state, pos, radius * 1.5, 8, ExplosionSize::Large);
    let anomaly = &mut state.anomaly;
    anomaly.layer = LAYER_DESTROYED;
    anomaly.active = false;
    for laser in anomaly.lasers.iter_mut() {
        laser.active = false;
        laser.fade = 0.0;
    }

    state.enemies_destroyed = 0;
    state.score = state.score.saturating_sub(state.tuning.anomaly_score_threshold);
    state.anomalies_defeated += 1;
    let trigger = &mut state.trigger;
    trigger.cooldown_timer = state.tuning.anomaly_cooldown_time;
    trigger.pending = false;
    trigger.warning_timer = 0.0;
    trigger.wall_timer = 0.0;

    state.events.push(GameEvent::AnomalyLayerDestroyed { layer: n });
    state.events.push(GameEvent::AnomalyDestroyed);
    log::info!(
        "Anomaly destroyed ({} total), score now {}",
        state.anomalies_defeated,
        state.score
    );
}

/// Bullets inside the hit radius are consumed and deal fixed damage each
pub fn resolve_anomaly_bullets(state: &mut SimulationState) {
    if !state.anomaly.active {
        return;
    }
    let damage = state.tuning.anomaly_bullet_damage;
    let hits: Vec<usize> = {
        let center = state.anomaly.pos;
        let radius = state.anomaly.hit_radius();
        state
            .bullets
            .iter_indexed()
            .filter(|(_, b)| b.pos.distance_squared(center) < radius * radius)
            .map(|(i, _)| i)
            .collect()
    };
    for index in hits {
        if !state.anomaly.active {
            break;
        }
        if let Some(pos) = state.bullets.index_mut(index).map(|b| b.pos) {
            state.bullets.release(index);
            effects::spawn_sparks(
                &mut state.particles,
                &mut state.rng,
                pos,
                2,
                80.0,
                [180, 220, 255],
                0.2,
            );
            apply_damage(state, damage);
        }
    }
}

/// Sustained player and drone beam damage
pub fn apply_beam_damage(state: &mut SimulationState, dt: f32) {
    if !state.anomaly.active {
        return;
    }
    let center = state.anomaly.pos;
    let radius = state.anomaly.hit_radius();
    let mut total = 0.0;
    if player_beam(state).is_some_and(|b| b.overlaps(center, radius)) {
        total += state.tuning.anomaly_laser_dps * dt;
    }
    let drone_hits = drone_beams(state)
        .iter()
        .filter(|b| b.overlaps(center, radius))
        .count();
    total += state.tuning.anomaly_drone_laser_dps * dt * drone_hits as f32;
    apply_damage(state, total);
}

/// Movement, animation and weapons
pub fn update_anomaly(state: &mut SimulationState, dt: f32) {
    if !state.anomaly.active {
        return;
    }
    let center_y = state.play_center_y();
    let play_height = state.play_height();
    let anomaly = &mut state.anomaly;

    anomaly.age += dt;
    if anomaly.pos.x > HOLD_X {
        anomaly.pos.x = (anomaly.pos.x - DRIFT_SPEED * dt).max(HOLD_X);
    }
    anomaly.target_y = center_y + (anomaly.age * SWAY_RATE).sin() * SWAY_AMPLITUDE * play_height;
    anomaly.pos.y += (anomaly.target_y - anomaly.pos.y) * (dt * 1.5).min(1.0);
    anomaly.rotation = wrap_angle(anomaly.rotation + anomaly.rotation_speed * dt);
    anomaly.pulse = wrap_angle(anomaly.pulse + dt * 2.0);
    anomaly.shield.pulse = wrap_angle(anomaly.shield.pulse + dt * 3.0);
    anomaly.hit_flash = (anomaly.hit_flash - dt).max(0.0);
    for ring in anomaly.rings.iter_mut() {
        ring.rotation = wrap_angle(ring.rotation + ring.rotation_speed * dt);
    }

    let min_r = 0.2 * anomaly.scale * BASE_RADIUS;
    let max_r = 1.8 * anomaly.scale * BASE_RADIUS;
    for orbital in anomaly.orbitals.iter_mut() {
        orbital.angle = wrap_angle(orbital.angle + orbital.angular_velocity * dt);
        orbital.phase = wrap_angle(orbital.phase + orbital.breath_speed * dt);
        let breath = 1.0 + 0.35 * orbital.phase.sin();
        orbital.radius = (orbital.base_radius * breath).clamp(min_r, max_r);
    }

    update_ring_lasers(state, dt);
    fire_weapons(state, dt);
}

fn update_ring_lasers(state: &mut SimulationState, dt: f32) {
    let anomaly = &mut state.anomaly;
    let firing = Layer::Mid1.fires_at(anomaly.layer)
        && anomaly.rings[Layer::Mid1.index()].is_active();
    if !firing {
        for laser in anomaly.lasers.iter_mut() {
            laser.active = false;
            laser.fade = 0.0;
        }
        return;
    }

    anomaly.laser_cycle = (anomaly.laser_cycle + dt) % RING_LASER_PERIOD;
    anomaly.laser_rotation = wrap_angle(anomaly.laser_rotation + RING_LASER_SPIN * dt);
    let t = anomaly.laser_cycle;
    let fade = if t < RING_LASER_OFF {
        0.0
    } else if t < RING_LASER_OFF + RING_LASER_FADE {
        (t - RING_LASER_OFF) / RING_LASER_FADE
    } else if t > RING_LASER_PERIOD - RING_LASER_FADE {
        (RING_LASER_PERIOD - t) / RING_LASER_FADE
    } else {
        1.0
    };

    let emitter = RING_RADIUS[Layer::Mid1.index()] * BASE_RADIUS * anomaly.scale;
    let count = anomaly.lasers.len().max(1) as f32;
    let (pos, rotation) = (anomaly.pos, anomaly.laser_rotation);
    for (i, laser) in anomaly.lasers.iter_mut().enumerate() {
        let dir = Vec2::from_angle(rotation + TAU * i as f32 / count);
        laser.origin = pos + dir * emitter;
        laser.target = laser.origin + dir * laser.length;
        laser.fade = fade;
        laser.active = fade > 0.0;
    }
}

fn aimed(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalize_or(Vec2::NEG_X)
}

fn fire_weapons(state: &mut SimulationState, dt: f32) {
    let player_pos = state.player.pos;
    let current = state.anomaly.layer;
    let at_core = current == CORE_LAYER;
    let mut shots = Vec::new();

    let anomaly = &mut state.anomaly;
    let rng = &mut state.rng;
    let (center, scale) = (anomaly.pos, anomaly.scale);
    for layer in Layer::ALL {
        if layer == Layer::Mid1 || !layer.fires_at(current) {
            continue;
        }
        let rate = match layer {
            Layer::Outer if at_core => OUTER_CORE_RATE,
            Layer::Mid2 if at_core => MID2_CORE_RATE,
            _ => 1.0,
        };
        let (lo, hi) = layer.reload_range();
        let ring = &mut anomaly.rings[layer.index()];
        let rotation = ring.rotation;

        for point in ring.points.iter_mut().filter(|p| p.active) {
            point.laser_timer = (point.laser_timer - dt).max(0.0);
            point.fire_timer -= dt;
            if point.fire_timer > 0.0 {
                continue;
            }
            point.fire_timer = rng.range(lo, hi) * rate;
            point.laser_timer = MUZZLE_FLASH_TIME;

            let origin = weapon_point_position(center, scale, rotation, point);
            let dir = aimed(origin, player_pos);
            let speed = point.speed;
            match layer {
                Layer::Outer => {
                    shots.push(projectile(origin, dir * 150.0 * speed, 12.0, 7.0, true))
                }
                Layer::Mid2 => shots.push(projectile(origin, dir * 230.0 * speed, 5.0, 4.0, false)),
                Layer::Inner => {
                    shots.push(projectile(origin, dir * 360.0 * speed, 4.0, 3.0, false))
                }
                Layer::Core => {
                    for spread in [-CORE_SPREAD, 0.0, CORE_SPREAD] {
                        let v = rotate(dir, spread) * 300.0 * speed;
                        shots.push(projectile(origin, v, 4.0, 3.0, false));
                    }
                }
                Layer::Mid1 => {}
            }
        }
    }

    for shot in shots {
        state.enemy_shots.spawn(shot);
    }
}

fn projectile(pos: Vec2, vel: Vec2, damage: f32, life: f32, is_missile: bool) -> EnemyShot {
    EnemyShot {
        pos,
        vel,
        life,
        is_missile,
        damage,
        ..Default::default()
    }
}

/// Ring lasers burn the player while bright enough
pub fn ring_laser_damage(state: &mut SimulationState, dt: f32) {
    if !state.anomaly.active || !state.player.alive {
        return;
    }
    let player = state.player.pos;
    let reach = state.player.radius + 3.0;
    let dps = state.tuning.ring_laser_dps;
    let total: f32 = state
        .anomaly
        .lasers
        .iter()
        .filter(|l| l.active && l.fade >= RING_LASER_MIN_FADE)
        .filter(|l| point_segment_distance(player, l.origin, l.target) < reach)
        .map(|l| dps * l.fade * dt)
        .sum();
    if total > 0.0 {
        state.beam_damage_player(total);
    }
}
