//! Player subsystem: movement, guns, laser, drones, damage and upgrades

use std::f32::consts::PI;

use glam::Vec2;

use super::effects::{self, ExplosionSize};
use super::state::{
    Bullet, Drone, GameEvent, GamePhase, GAME_OVER_SELECT_DELAY, LaserState, Player, Shield,
    SimulationState, UpgradeKind,
};
use crate::consts::*;
use crate::tuning::Tuning;
use crate::{normalize_floor, rotate, wrap_angle};

/// Cosmetic roll rate (radians/s)
const ROLL_RATE: f32 = 1.6;
/// Trail samples start this far behind the ship's nose
const TRAIL_BACK_OFFSET: f32 = 12.0;
/// Vertical lag of the trail per pixel of vertical movement
const TRAIL_LAG: f32 = 6.0;
const TRAIL_SMOOTHING: f32 = 8.0;
pub const PLAYER_TRAIL_DECAY: f32 = 0.8;
pub const DRONE_TRAIL_DECAY: f32 = 0.9;

const EXHAUST_INTERVAL: f32 = 0.02;
const THUMPER_PULSE_INTERVAL: f32 = 1.2;

/// Muzzle offsets
const GUN_OFFSET: Vec2 = Vec2::new(12.0, 0.0);
const LASER_OFFSET: Vec2 = Vec2::new(14.0, 0.0);
const DRONE_LASER_OFFSET: Vec2 = Vec2::new(8.0, 0.0);

/// Split cannon spread per level (radians)
const SPLIT_ANGLE_BASE: f32 = 0.08;
const SPLIT_ANGLE_PER_LEVEL: f32 = 0.06;
pub const MAX_SPLIT_LEVEL: u8 = 2;
pub const MAX_DRONE_COUNT: u8 = 2;
const BEAM_FOCUS_STEP: f32 = 0.25;
pub const MAX_BEAM_SCALE: f32 = 2.0;

const DRONE_ORBIT_RADIUS: f32 = 34.0;
const DRONE_ANGULAR_VELOCITY: f32 = 2.4;
/// Vertical squash of the drone orbit (fake perspective)
const DRONE_ORBIT_SQUASH: f32 = 0.45;
/// Drone beams are narrower than the player's
const DRONE_BAND_FACTOR: f32 = 0.7;

/// Bullets leaving the play area by more than this are despawned
const BULLET_MARGIN: f32 = 24.0;

/// Result of routing damage into the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Dead or invulnerable; nothing changed
    Ignored,
    /// Fully absorbed by the shield
    Absorbed,
    Damaged,
    Killed,
}

impl Shield {
    pub fn full(strength: f32) -> Self {
        Self {
            strength,
            max: strength,
            active: strength > 0.0,
            pulse: 0.0,
        }
    }

    /// Absorb as much of `amount` as possible; returns the overflow.
    pub fn absorb(&mut self, amount: f32) -> f32 {
        let amount = amount.max(0.0);
        if !self.active || self.strength <= 0.0 {
            return amount;
        }
        let absorbed = amount.min(self.strength);
        self.strength = (self.strength - absorbed).max(0.0);
        if self.strength <= 0.0 {
            self.strength = 0.0;
            self.active = false;
        }
        amount - absorbed
    }
}

impl Player {
    pub fn new(pos: Vec2, tuning: &Tuning) -> Self {
        Self {
            pos,
            prev_pos: pos,
            speed: tuning.player_speed,
            radius: tuning.player_radius,
            roll: 0.0,
            health: tuning.player_max_health,
            max_health: tuning.player_max_health,
            invulnerable_timer: 0.0,
            invulnerability_window: tuning.invulnerability_time,
            alive: true,
            shield: Shield::default(),
            upgrades: Default::default(),
            gun_cooldown: 0.0,
            laser: LaserState::default(),
            trail: Default::default(),
            trail_offset_y: 0.0,
            exhaust_timer: 0.0,
        }
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_timer > 0.0
    }

    /// Discrete hit: blocked while invulnerable, grants a fresh window
    pub fn take_damage(&mut self, amount: f32) -> HitOutcome {
        if !self.alive || self.is_invulnerable() {
            return HitOutcome::Ignored;
        }
        self.invulnerable_timer = self.invulnerability_window;
        self.apply_damage(amount)
    }

    /// Continuous beam damage: never blocked by nor grants invulnerability
    pub fn take_beam_damage(&mut self, amount: f32) -> HitOutcome {
        if !self.alive {
            return HitOutcome::Ignored;
        }
        self.apply_damage(amount)
    }

    fn apply_damage(&mut self, amount: f32) -> HitOutcome {
        let overflow = self.shield.absorb(amount);
        if overflow <= 0.0 {
            return HitOutcome::Absorbed;
        }
        self.health = (self.health - overflow).max(0.0);
        if self.health <= 0.0 {
            self.alive = false;
            HitOutcome::Killed
        } else {
            HitOutcome::Damaged
        }
    }

    /// Half-height of the player's beam band
    pub fn beam_band(&self, tuning: &Tuning) -> f32 {
        tuning.laser_band * self.upgrades.beam_scale
    }
}

/// A horizontal beam from `origin` to the right screen edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    pub origin: Vec2,
    pub half_height: f32,
}

impl Beam {
    /// Axis-aligned overlap with a circle of `radius` at `center`
    pub fn overlaps(&self, center: Vec2, radius: f32) -> bool {
        center.x + radius > self.origin.x
            && (center.y - self.origin.y).abs() < radius + self.half_height
    }
}

/// The player's beam, if firing
pub fn player_beam(state: &SimulationState) -> Option<Beam> {
    let player = &state.player;
    (player.alive && player.laser.firing).then(|| Beam {
        origin: player.laser.origin,
        half_height: player.beam_band(&state.tuning),
    })
}

/// Beams of every firing drone
pub fn drone_beams(state: &SimulationState) -> Vec<Beam> {
    let half_height = state.player.beam_band(&state.tuning) * DRONE_BAND_FACTOR;
    state
        .drones
        .iter()
        .filter(|d| d.laser_firing)
        .map(|d| Beam {
            origin: d.pos + DRONE_LASER_OFFSET,
            half_height,
        })
        .collect()
}

impl SimulationState {
    /// Discrete damage to the player (enemy shots, missiles, rams)
    pub fn damage_player(&mut self, amount: f32) -> HitOutcome {
        let shield_was_active = self.player.shield.active;
        let outcome = self.player.take_damage(amount);
        if outcome != HitOutcome::Ignored {
            self.events.push(GameEvent::PlayerHit { damage: amount });
        }
        self.after_player_hit(outcome, shield_was_active);
        outcome
    }

    /// Per-tick beam damage to the player
    pub fn beam_damage_player(&mut self, amount: f32) -> HitOutcome {
        let shield_was_active = self.player.shield.active;
        let outcome = self.player.take_beam_damage(amount);
        self.after_player_hit(outcome, shield_was_active);
        outcome
    }

    fn after_player_hit(&mut self, outcome: HitOutcome, shield_was_active: bool) {
        if shield_was_active && !self.player.shield.active {
            self.events.push(GameEvent::ShieldDepleted);
        }
        if outcome == HitOutcome::Killed {
            self.enter_game_over();
        }
    }

    fn enter_game_over(&mut self) {
        if self.phase == GamePhase::GameOver {
            return;
        }
        self.phase = GamePhase::GameOver;
        self.select_countdown = GAME_OVER_SELECT_DELAY;
        self.player.laser.firing = false;
        for drone in self.drones.iter_mut() {
            drone.laser_firing = false;
        }
        let pos = self.player.pos;
        effects::explode(self, pos, ExplosionSize::Large);
        self.events.push(GameEvent::GameOver { score: self.score });
        log::info!(
            "Game over: score {} kills {} time {:.1}s",
            self.score,
            self.total_enemies_killed,
            self.time
        );
    }
}

/// Movement, roll, timers, trail and exhaust
pub fn update_player(state: &mut SimulationState, dt: f32) {
    if !state.player.alive {
        return;
    }
    let input = state.input;
    let mut dir = Vec2::ZERO;
    if input.up {
        dir.y -= 1.0;
    }
    if input.down {
        dir.y += 1.0;
    }
    if input.left {
        dir.x -= 1.0;
    }
    if input.right {
        dir.x += 1.0;
    }
    // Axes are independent: diagonals are faster than straight moves
    let moved = state.player.pos + dir * state.player.speed * dt;
    let clamped = state.clamp_to_play_area(moved);

    let scroll = state.scroll_speed;
    let player = &mut state.player;
    player.pos = clamped;
    player.roll = wrap_angle(player.roll + ROLL_RATE * dt);
    player.invulnerable_timer = (player.invulnerable_timer - dt).max(0.0);
    player.gun_cooldown -= dt;
    player.shield.pulse = wrap_angle(player.shield.pulse + dt * 4.0);
    player.upgrades.minigun_timer = (player.upgrades.minigun_timer - dt).max(0.0);

    let dy = player.pos.y - player.prev_pos.y;
    let lag_target = -dy * TRAIL_LAG;
    player.trail_offset_y += (lag_target - player.trail_offset_y) * (dt * TRAIL_SMOOTHING).min(1.0);
    player.trail.update(dt, PLAYER_TRAIL_DECAY, scroll);
    let sample = player.pos + Vec2::new(-TRAIL_BACK_OFFSET, player.trail_offset_y);
    player.trail.push(sample);
    player.prev_pos = player.pos;

    player.exhaust_timer -= dt;
    let mut exhaust = 0;
    while player.exhaust_timer <= 0.0 {
        player.exhaust_timer += EXHAUST_INTERVAL;
        exhaust += 1;
    }
    let exhaust_pos = player.pos - Vec2::new(TRAIL_BACK_OFFSET, 0.0);
    for _ in 0..exhaust.min(4) {
        effects::spawn_exhaust(&mut state.particles, &mut state.rng, exhaust_pos, scroll);
    }

    update_thumper(state, dt);
}

fn update_thumper(state: &mut SimulationState, dt: f32) {
    let thumper = &mut state.player.upgrades.thumper;
    if !thumper.active {
        return;
    }
    thumper.wave_timer = (thumper.wave_timer + dt) % THUMPER_PULSE_INTERVAL;
    thumper.pulse_timer -= dt;
    if thumper.pulse_timer <= 0.0 {
        thumper.pulse_timer += THUMPER_PULSE_INTERVAL;
        let center = state.player.pos;
        let radius = state.tuning.thumper_radius;
        effects::spawn_pulse_ring(&mut state.particles, center, radius, 16, [120, 200, 255]);
    }
}

/// Laser hold/recharge state machine; drones mirror the firing flag
pub fn update_laser(state: &mut SimulationState, dt: f32) {
    let held = state.input.fire_laser && state.player.alive;
    let hold_time = state.tuning.laser_hold_time;
    let recharge_time = state.tuning.laser_recharge_time;
    let time = state.time;
    let player = &mut state.player;
    let laser = &mut player.laser;

    if laser.recharge_timer > 0.0 {
        laser.recharge_timer = (laser.recharge_timer - dt).max(0.0);
        laser.firing = false;
        if !held {
            laser.latched = false;
        }
    } else if held {
        if !laser.latched {
            // Fresh press
            laser.latched = true;
            laser.hold_timer = hold_time;
        }
        if laser.hold_timer > 0.0 {
            laser.firing = true;
            laser.hold_timer -= dt;
            if laser.hold_timer <= 0.0 {
                laser.hold_timer = 0.0;
                laser.recharge_timer = recharge_time;
            }
        } else {
            laser.firing = false;
        }
    } else {
        // Released early: no recharge cost
        laser.firing = false;
        laser.hold_timer = 0.0;
        laser.latched = false;
    }

    laser.origin = player.pos + LASER_OFFSET;
    laser.intensity = if laser.firing {
        0.75 + 0.25 * (time * 30.0).sin()
    } else {
        0.0
    };

    let firing = laser.firing;
    for drone in state.drones.iter_mut() {
        drone.laser_firing = firing;
    }
}

/// Orbit drones around the player
pub fn update_drones(state: &mut SimulationState, dt: f32) {
    let center = state.player.pos;
    let scroll = state.scroll_speed;
    for drone in state.drones.iter_mut() {
        drone.angle = wrap_angle(drone.angle + drone.angular_velocity * dt);
        let (sin, cos) = drone.angle.sin_cos();
        drone.pos = center
            + Vec2::new(
                cos * drone.orbit_radius,
                sin * drone.orbit_radius * DRONE_ORBIT_SQUASH,
            );
        drone.z = sin;

        let dy = drone.pos.y - drone.prev_y;
        let lag_target = -dy * TRAIL_LAG * 0.5;
        let blend = (dt * TRAIL_SMOOTHING).min(1.0);
        drone.trail_offset_y += (lag_target - drone.trail_offset_y) * blend;
        drone.trail.update(dt, DRONE_TRAIL_DECAY, scroll);
        drone
            .trail
            .push(drone.pos + Vec2::new(-TRAIL_BACK_OFFSET * 0.5, drone.trail_offset_y));
        drone.prev_y = drone.pos.y;
    }
}

/// Fire the guns if requested and off cooldown
pub fn fire_guns(state: &mut SimulationState) {
    if !state.input.fire_gun || !state.player.alive || state.player.gun_cooldown > 0.0 {
        return;
    }
    let speed = state.tuning.bullet_speed;
    let player = &state.player;
    let muzzle = player.pos + GUN_OFFSET;
    let forward = Vec2::new(speed, 0.0);

    let mut shots = vec![(muzzle, forward)];
    if player.upgrades.split_level > 0 {
        let angle = SPLIT_ANGLE_BASE + SPLIT_ANGLE_PER_LEVEL * player.upgrades.split_level as f32;
        shots.push((muzzle, rotate(forward, -angle)));
        shots.push((muzzle, rotate(forward, angle)));
    }
    for drone in state.drones.iter() {
        shots.push((drone.pos + DRONE_LASER_OFFSET, forward));
    }

    for (pos, vel) in shots {
        state.bullets.spawn(Bullet { pos, vel });
    }

    let mut cooldown = state.tuning.gun_cooldown;
    if state.player.upgrades.minigun_timer > 0.0 {
        cooldown *= 0.5;
    }
    state.player.gun_cooldown = cooldown;
    effects::spawn_sparks(
        &mut state.particles,
        &mut state.rng,
        muzzle,
        3,
        60.0,
        [255, 230, 140],
        0.15,
    );
}

/// Nearest enemy a guided bullet may steer toward
fn guidance_target(state: &SimulationState, from: Vec2, cutoff: f32) -> Option<Vec2> {
    state
        .enemies
        .iter()
        .filter(|e| e.pos.x - from.x >= -cutoff)
        .map(|e| e.pos)
        .min_by(|a, b| {
            a.distance_squared(from)
                .partial_cmp(&b.distance_squared(from))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Move bullets, steer guided ones, despawn those off screen
pub fn update_bullets(state: &mut SimulationState, dt: f32) {
    let tuning = &state.tuning;
    let guided = state.player.upgrades.guidance;
    let accel = tuning.guidance_accel;
    let cutoff = tuning.guidance_behind_cutoff;
    let max_forward = tuning.bullet_speed * tuning.guidance_max_forward;
    let (top, bottom) = (state.play_top - BULLET_MARGIN, state.play_bottom + BULLET_MARGIN);

    let targets: Vec<Option<Vec2>> = if guided {
        state
            .bullets
            .iter()
            .map(|b| guidance_target(state, b.pos, cutoff))
            .collect()
    } else {
        Vec::new()
    };
    let mut targets = targets.into_iter();

    state.bullets.retain_mut(|bullet| {
        if let Some(Some(target)) = targets.next() {
            let steer = normalize_floor(target - bullet.pos);
            bullet.vel += steer * accel * dt;
            bullet.vel.x = bullet.vel.x.min(max_forward);
        }
        bullet.pos += bullet.vel * dt;
        bullet.pos.x <= SCREEN_W + 16.0
            && bullet.pos.x >= -16.0
            && bullet.pos.y >= top
            && bullet.pos.y <= bottom
    });
}

/// Apply a collected upgrade
pub fn apply_upgrade(state: &mut SimulationState, kind: UpgradeKind) {
    let shield_max = state.tuning.player_shield_max;
    let minigun = state.tuning.minigun_duration;
    let upgrades = &mut state.player.upgrades;
    match kind {
        UpgradeKind::SplitCannon => {
            upgrades.split_level = (upgrades.split_level + 1).min(MAX_SPLIT_LEVEL);
        }
        UpgradeKind::Guidance => upgrades.guidance = true,
        UpgradeKind::Drones => {
            if upgrades.drone_count < MAX_DRONE_COUNT {
                upgrades.drone_count += 1;
                spawn_drone(state);
            }
        }
        UpgradeKind::BeamFocus => {
            upgrades.beam_scale = (upgrades.beam_scale + BEAM_FOCUS_STEP).min(MAX_BEAM_SCALE);
        }
        UpgradeKind::Shield => {
            state.player.shield = Shield::full(shield_max);
        }
        UpgradeKind::Thumper => {
            upgrades.thumper.active = true;
            upgrades.thumper.pulse_timer = 0.0;
        }
        UpgradeKind::Minigun => upgrades.minigun_timer = minigun,
    }
    state.score += 40;
    state.events.push(GameEvent::UpgradeCollected(kind));
    log::debug!("Upgrade collected: {}", kind.label());
}

fn spawn_drone(state: &mut SimulationState) {
    // Drones sit on opposite sides of the orbit
    let angle = if state.drones.active_count() == 0 {
        0.0
    } else {
        state.drones.iter().next().map_or(0.0, |d| wrap_angle(d.angle + PI))
    };
    let (sin, cos) = angle.sin_cos();
    let pos = state.player.pos
        + Vec2::new(
            cos * DRONE_ORBIT_RADIUS,
            sin * DRONE_ORBIT_RADIUS * DRONE_ORBIT_SQUASH,
        );
    state.drones.spawn(Drone {
        angle,
        orbit_radius: DRONE_ORBIT_RADIUS,
        angular_velocity: DRONE_ANGULAR_VELOCITY,
        pos,
        z: sin,
        prev_y: pos.y,
        ..Default::default()
    });
}
