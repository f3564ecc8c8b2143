//! Per-frame simulation update
//!
//! One call advances every subsystem in a fixed order. The order matters:
//! later passes see entities already moved and consumed by earlier ones.

use super::state::{GamePhase, SimulationState, TickInput};
use super::{anomaly, collision, effects, enemy, player};

/// Scroll target relaxes back toward the base speed at this rate (px/s²)
const SCROLL_RELAX: f32 = 2.0;
const SCROLL_EASE: f32 = 1.5;

/// Advance the simulation by `dt` seconds
///
/// A non-positive or non-finite `dt` is a no-op apart from clearing the
/// one-shot `fire_gun` request.
pub fn tick(state: &mut SimulationState, dt: f32) {
    if !dt.is_finite() || dt <= 0.0 {
        state.input.fire_gun = false;
        return;
    }

    state.events.clear();
    state.time += dt;
    state.frame += 1;

    if state.phase == GamePhase::GameOver {
        // Only effects keep animating behind the game-over prompt
        state.select_countdown = (state.select_countdown - dt).max(0.0);
        effects::scroll_stars(state, dt);
        effects::update_particles(&mut state.particles, dt);
        effects::update_explosions(&mut state.explosions, dt);
        state.input.fire_gun = false;
        return;
    }

    update_scroll(state, dt);
    effects::scroll_stars(state, dt);

    player::update_player(state, dt);
    player::update_laser(state, dt);
    player::update_drones(state, dt);
    player::fire_guns(state);
    player::update_bullets(state, dt);

    anomaly::update_trigger(state, dt);
    enemy::update_spawners(state, dt);

    enemy::update_enemies(state, dt);
    collision::update_enemy_shots(state, dt);
    collision::update_upgrades(state, dt);
    collision::resolve_bullet_hits(state);
    collision::resolve_laser_missiles(state);

    anomaly::resolve_anomaly_bullets(state);
    anomaly::update_anomaly(state, dt);
    anomaly::apply_beam_damage(state, dt);
    anomaly::ring_laser_damage(state, dt);

    effects::update_particles(&mut state.particles, dt);
    effects::update_explosions(&mut state.explosions, dt);

    state.input.fire_gun = false;
}

fn update_scroll(state: &mut SimulationState, dt: f32) {
    let base = state.tuning.base_scroll_speed;
    if state.scroll_target > base {
        state.scroll_target = (state.scroll_target - SCROLL_RELAX * dt).max(base);
    }
    state.scroll_speed += (state.scroll_target - state.scroll_speed) * (dt * SCROLL_EASE).min(1.0);
}

/// Simple AI pilot for demos and benchmarking
///
/// Tracks the nearest enemy's row, sidesteps shots heading its way, fires
/// the gun every frame and the laser when a target sits in the beam band.
pub fn autopilot(state: &SimulationState) -> TickInput {
    let pos = state.player.pos;
    let mut input = TickInput {
        fire_gun: true,
        ..Default::default()
    };

    let target_y = state
        .enemies
        .iter()
        .filter(|e| e.pos.x > pos.x)
        .min_by(|a, b| {
            a.pos
                .distance_squared(pos)
                .partial_cmp(&b.pos.distance_squared(pos))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|e| e.pos.y)
        .or_else(|| state.anomaly.active.then_some(state.anomaly.pos.y))
        .unwrap_or_else(|| state.play_center_y());

    // Dodge the closest threatening shot
    let threat = state
        .enemy_shots
        .iter()
        .filter(|s| !s.deflected && s.pos.x > pos.x - 10.0 && s.pos.x < pos.x + 120.0)
        .filter(|s| (s.pos.y - pos.y).abs() < state.player.radius * 2.5)
        .map(|s| s.pos.y)
        .next();

    let goal = match threat {
        Some(shot_y) if shot_y >= pos.y => pos.y - 40.0,
        Some(_) => pos.y + 40.0,
        None => target_y,
    };
    if goal < pos.y - 4.0 {
        input.up = true;
    } else if goal > pos.y + 4.0 {
        input.down = true;
    }

    let band = state.player.beam_band(&state.tuning);
    let anomaly_in_band = state.anomaly.active
        && (state.anomaly.pos.y - pos.y).abs() < state.anomaly.hit_radius();
    input.fire_laser = anomaly_in_band
        || state
            .enemies
            .iter()
            .any(|e| e.pos.x > pos.x && (e.pos.y - pos.y).abs() < e.radius + band);
    input
}
