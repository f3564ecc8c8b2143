//! Enemy spawning and per-frame AI

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::credit_kill;
use super::effects::{self, ExplosionSize};
use super::player::{drone_beams, player_beam};
use super::state::{Enemy, EnemyShot, GameEvent, KillSource, SimulationState, ENEMY_TRAIL_CAPACITY};
use super::trail::Trail;
use crate::consts::*;

pub const ENEMY_TRAIL_DECAY: f32 = 3.8;
/// Seconds of travel between enemy trail samples
const TRAIL_EMIT_INTERVAL: f32 = 0.05;

/// Formation ships enter this far past the right edge
const FORMATION_ENTRY_X: f32 = SCREEN_W + 30.0;
const FORMATION_MARGIN_Y: f32 = 40.0;
const MAX_FORMATION_SIZE: i32 = 5;

/// Formation cadence: starts at the base, tightens with score down to the floor
const SPAWN_INTERVAL_BASE: f32 = 1.6;
const SPAWN_INTERVAL_FLOOR: f32 = 0.7;
const SPAWN_INTERVAL_SCORE_SCALE: f32 = 4000.0;

pub const WALL_SIZE: usize = 6;
const WALL_ENTRY_X: f32 = SCREEN_W + 20.0;
const WALL_RADIUS: f32 = 8.0;
const WALL_SPEED: f32 = 55.0;
const WALL_HP: i32 = 3;
const WALL_FIRE_INTERVAL: f32 = 2.0;

const SHOT_BASE_SPEED: f32 = 200.0;
const SHOT_DAMAGE: f32 = 5.0;
const SHOT_LIFE: f32 = 4.0;
/// Enemies only fire once they are on screen
const FIRE_LINE_X: f32 = SCREEN_W - 4.0;

/// Which half of the play area the next wall fills
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallHalf {
    #[default]
    Top,
    Bottom,
}

impl WallHalf {
    pub fn toggle(self) -> Self {
        match self {
            WallHalf::Top => WallHalf::Bottom,
            WallHalf::Bottom => WallHalf::Top,
        }
    }
}

/// Formation spawn interval for the current score
pub fn formation_interval(state: &mut SimulationState) -> f32 {
    let base = (SPAWN_INTERVAL_BASE - state.score as f32 / SPAWN_INTERVAL_SCORE_SCALE)
        .max(SPAWN_INTERVAL_FLOOR);
    base * state.rng.range(0.8, 1.2)
}

fn random_enemy(state: &mut SimulationState, pos: Vec2) -> Enemy {
    let rng = &mut state.rng;
    let radius = rng.range(6.0, 10.0);
    let speed = 40.0 + rng.range(0.0, 50.0);
    let drift = rng.range(-30.0, 30.0);
    let hp = ((radius / 4.0 + rng.range(0.0, 1.5)) as i32).max(1);
    let fire_interval = rng.range(1.4, 3.2) * 0.5;
    Enemy {
        pos,
        vel: Vec2::new(speed, drift),
        radius,
        hp,
        rotation: rng.range(0.0, TAU),
        rotation_speed: rng.range(-3.0, 3.0),
        fire_timer: fire_interval * rng.range(0.3, 1.0),
        fire_interval,
        trail_timer: 0.0,
        trail: Trail::with_capacity(ENEMY_TRAIL_CAPACITY),
    }
}

/// Spawn a formation of 1-5 ships off the right edge; returns how many spawned
pub fn spawn_formation(state: &mut SimulationState) -> usize {
    let count = state.rng.range_int(1, MAX_FORMATION_SIZE) as usize;
    let (lo, hi) = (
        state.play_top + FORMATION_MARGIN_Y,
        state.play_bottom - FORMATION_MARGIN_Y,
    );
    let center_y = if hi > lo {
        state.rng.range(lo, hi)
    } else {
        state.play_center_y()
    };

    let rng = &mut state.rng;
    let positions: Vec<Vec2> = match count {
        1 => vec![Vec2::new(FORMATION_ENTRY_X, center_y)],
        2 | 3 => {
            // Staggered line
            let spacing = rng.range(28.0, 44.0);
            let mid = (count - 1) as f32 * 0.5;
            (0..count)
                .map(|i| {
                    let t = i as f32 - mid;
                    Vec2::new(
                        FORMATION_ENTRY_X + i as f32 * spacing,
                        center_y + t * spacing * 0.6 + rng.range(-6.0, 6.0),
                    )
                })
                .collect()
        }
        _ => {
            let radius = rng.range(30.0, 46.0);
            let start = rng.range(0.0, TAU);
            (0..count)
                .map(|i| {
                    let angle = start + TAU * i as f32 / count as f32;
                    let hub = Vec2::new(FORMATION_ENTRY_X + radius, center_y);
                    hub + Vec2::from_angle(angle) * radius
                })
                .collect()
        }
    };

    let mut spawned = 0;
    for pos in positions {
        let mut enemy = random_enemy(state, pos);
        enemy.pos.y = enemy.pos.y.clamp(
            state.play_top + enemy.radius,
            (state.play_bottom - enemy.radius).max(state.play_top + enemy.radius),
        );
        if state.enemies.spawn(enemy).is_some() {
            spawned += 1;
        }
    }
    spawned
}

/// Spawn a wall of ships evenly spaced across one half of the play area
pub fn spawn_wall(state: &mut SimulationState, half: WallHalf) -> usize {
    let half_height = state.play_height() * 0.5;
    let y0 = match half {
        WallHalf::Top => state.play_top,
        WallHalf::Bottom => state.play_top + half_height,
    };
    let spacing = half_height / WALL_SIZE as f32;

    let mut spawned = 0;
    for i in 0..WALL_SIZE {
        let enemy = Enemy {
            pos: Vec2::new(WALL_ENTRY_X, y0 + spacing * (i as f32 + 0.5)),
            vel: Vec2::new(WALL_SPEED, 0.0),
            radius: WALL_RADIUS,
            hp: WALL_HP,
            rotation: 0.0,
            rotation_speed: 1.5,
            // Staggered so the wall doesn't fire in one volley
            fire_timer: 0.5 + i as f32 * 0.15,
            fire_interval: WALL_FIRE_INTERVAL,
            trail_timer: 0.0,
            trail: Trail::with_capacity(ENEMY_TRAIL_CAPACITY),
        };
        if state.enemies.spawn(enemy).is_some() {
            spawned += 1;
        }
    }
    spawned
}

/// Formation timer outside encounters, wall timer during them
pub fn update_spawners(state: &mut SimulationState, dt: f32) {
    if state.anomaly.active {
        state.trigger.wall_timer -= dt;
        if state.trigger.wall_timer <= 0.0 {
            let half = state.trigger.wall_phase;
            spawn_wall(state, half);
            state.trigger.wall_phase = half.toggle();
            state.trigger.wall_timer = state.tuning.wall_interval;
        }
        return;
    }

    state.spawn_timer -= dt;
    if state.spawn_timer <= 0.0 {
        spawn_formation(state);
        state.spawn_timer = formation_interval(state);
    }
}

enum Outcome {
    Escaped,
    Rammed(Vec2),
    Killed(Vec2, KillSource),
}

/// Move, animate and fire every enemy; resolve escapes, rams and beam kills
pub fn update_enemies(state: &mut SimulationState, dt: f32) {
    let scroll = state.scroll_speed;
    let (top, bottom) = (state.play_top, state.play_bottom);
    let player_alive = state.player.alive;
    let player_pos = state.player.pos;
    let player_radius = state.player.radius;
    let beam = player_beam(state);
    let drones = drone_beams(state);

    let rng = &mut state.rng;
    let mut outcomes = Vec::new();
    let mut shots = Vec::new();

    state.enemies.retain_mut(|enemy| {
        let speed_x = scroll + enemy.vel.x;
        enemy.pos.x -= speed_x * dt;
        enemy.pos.y += enemy.vel.y * dt;
        if enemy.pos.y - enemy.radius < top {
            enemy.pos.y = top + enemy.radius;
            enemy.vel.y = enemy.vel.y.abs();
        } else if enemy.pos.y + enemy.radius > bottom {
            enemy.pos.y = bottom - enemy.radius;
            enemy.vel.y = -enemy.vel.y.abs();
        }
        enemy.rotation = (enemy.rotation + enemy.rotation_speed * dt).rem_euclid(TAU);

        enemy.trail.update(dt, ENEMY_TRAIL_DECAY, scroll);
        enemy.trail_timer += dt;
        while enemy.trail_timer >= TRAIL_EMIT_INTERVAL {
            enemy.trail_timer -= TRAIL_EMIT_INTERVAL;
            // Backtrack to where the ship was when this sample was due
            let age = enemy.trail_timer;
            let behind = Vec2::new(enemy.radius * 0.8 + speed_x * age, -enemy.vel.y * age);
            let jitter = Vec2::new(0.0, rng.range(-1.5, 1.5));
            enemy.trail.push(enemy.pos + behind + jitter);
        }

        if enemy.pos.x + enemy.radius < 0.0 {
            outcomes.push(Outcome::Escaped);
            return false;
        }

        if player_alive {
            let reach = enemy.radius + player_radius;
            if enemy.pos.distance_squared(player_pos) < reach * reach {
                outcomes.push(Outcome::Rammed(enemy.pos));
                return false;
            }
        }

        let beam_hit = if beam.is_some_and(|b| b.overlaps(enemy.pos, enemy.radius)) {
            Some(KillSource::PlayerBeam)
        } else if drones.iter().any(|b| b.overlaps(enemy.pos, enemy.radius)) {
            Some(KillSource::DroneBeam)
        } else {
            None
        };
        if let Some(source) = beam_hit {
            outcomes.push(Outcome::Killed(enemy.pos, source));
            return false;
        }

        enemy.fire_timer -= dt;
        if enemy.fire_timer <= 0.0 {
            enemy.fire_timer += enemy.fire_interval;
            if enemy.pos.x < FIRE_LINE_X {
                shots.push(enemy.pos - Vec2::new(enemy.radius, 0.0));
            }
        }
        true
    });

    for pos in shots {
        state.enemy_shots.spawn(EnemyShot {
            pos,
            vel: Vec2::new(-(SHOT_BASE_SPEED + scroll), 0.0),
            life: SHOT_LIFE,
            damage: SHOT_DAMAGE,
            ..Default::default()
        });
    }

    for outcome in outcomes {
        match outcome {
            Outcome::Escaped => {
                state.enemies_escaped += 1;
                state.events.push(GameEvent::EnemyEscaped);
            }
            Outcome::Rammed(pos) => {
                // Body collisions score nothing
                effects::explode(state, pos, ExplosionSize::Medium);
                state.events.push(GameEvent::EnemyRammed { pos });
                let damage = state.tuning.body_collision_damage;
                state.damage_player(damage);
            }
            Outcome::Killed(pos, source) => credit_kill(state, pos, source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_spawns_six_in_top_half() {
        let mut state = SimulationState::new(17);
        assert_eq!(spawn_wall(&mut state, WallHalf::Top), WALL_SIZE);
        assert_eq!(state.enemies.active_count(), 6);
        let mid = state.play_center_y();
        for enemy in state.enemies.iter() {
            assert!(enemy.pos.y >= state.play_top && enemy.pos.y <= mid);
            assert_eq!(enemy.hp, WALL_HP);
        }
    }

    #[test]
    fn test_wall_spawns_six_in_bottom_half() {
        let mut state = SimulationState::new(17);
        assert_eq!(spawn_wall(&mut state, WallHalf::Bottom), WALL_SIZE);
        let mid = state.play_center_y();
        for enemy in state.enemies.iter() {
            assert!(enemy.pos.y >= mid && enemy.pos.y <= state.play_bottom);
        }
    }

    #[test]
    fn test_wall_halves_alternate_during_encounter() {
        let mut state = SimulationState::new(17);
        state.anomaly.active = true;
        state.trigger.wall_timer = 0.01;
        state.trigger.wall_phase = WallHalf::Top;
        update_spawners(&mut state, 0.02);
        assert_eq!(state.enemies.active_count(), 6);
        assert_eq!(state.trigger.wall_phase, WallHalf::Bottom);
        assert_eq!(state.trigger.wall_timer, state.tuning.wall_interval);
        // Formation timer is frozen
        assert_eq!(state.spawn_timer, 1.5);
    }

    #[test]
    fn test_formation_sizes_and_stats() {
        let mut state = SimulationState::new(99);
        for _ in 0..50 {
            state.enemies.clear();
            let n = spawn_formation(&mut state);
            assert!((1..=5).contains(&n));
            for enemy in state.enemies.iter() {
                assert!(enemy.radius >= 6.0 && enemy.radius < 10.0);
                assert!(enemy.hp >= 1);
                assert!(enemy.fire_interval >= 0.7 && enemy.fire_interval < 1.6);
                assert!(enemy.pos.x > SCREEN_W);
                assert!(enemy.pos.y >= state.play_top && enemy.pos.y <= state.play_bottom);
            }
        }
    }

    #[test]
    fn test_formation_interval_tightens_with_score() {
        let mut state = SimulationState::new(5);
        state.score = 100_000;
        for _ in 0..20 {
            let interval = formation_interval(&mut state);
            assert!(interval >= 0.7 * 0.8 && interval <= 0.7 * 1.2);
        }
    }

    #[test]
    fn test_escaped_enemy_counts_without_score() {
        let mut state = SimulationState::new(3);
        state.enemies.spawn(Enemy {
            pos: Vec2::new(-7.0, 200.0),
            vel: Vec2::new(50.0, 0.0),
            radius: 8.0,
            ..Default::default()
        });
        update_enemies(&mut state, 1.0 / 60.0);
        assert_eq!(state.enemies.active_count(), 0);
        assert_eq!(state.enemies_escaped, 1);
        assert_eq!(state.score, 0);
        assert!(state.events.contains(&GameEvent::EnemyEscaped));
    }

    #[test]
    fn test_ram_damages_player_without_credit() {
        let mut state = SimulationState::new(3);
        let pos = state.player.pos + Vec2::new(5.0, 0.0);
        state.enemies.spawn(Enemy {
            pos,
            ..Default::default()
        });
        update_enemies(&mut state, 1.0 / 60.0);
        assert_eq!(state.enemies.active_count(), 0);
        assert_eq!(state.player.health, 90.0);
        assert_eq!(state.score, 0);
        assert_eq!(state.total_enemies_killed, 0);
    }

    #[test]
    fn test_beam_kill_credits_score() {
        let mut state = SimulationState::new(3);
        state.player.laser.firing = true;
        state.player.laser.origin = state.player.pos + Vec2::new(14.0, 0.0);
        state.enemies.spawn(Enemy {
            pos: Vec2::new(400.0, state.player.pos.y + 3.0),
            ..Default::default()
        });
        update_enemies(&mut state, 1.0 / 60.0);
        assert_eq!(state.enemies.active_count(), 0);
        assert_eq!(state.score, 30);
        assert_eq!(state.enemies_destroyed, 1);
        assert_eq!(state.total_enemies_killed, 1);
    }

    #[test]
    fn test_drone_beam_kill_credits_both_counters() {
        use crate::sim::state::Drone;
        let mut state = SimulationState::new(3);
        let drone_pos = Vec2::new(state.player.pos.x, state.play_top + 40.0);
        state.drones.spawn(Drone {
            pos: drone_pos,
            laser_firing: true,
            ..Default::default()
        });
        state.enemies.spawn(Enemy {
            pos: Vec2::new(400.0, drone_pos.y + 2.0),
            fire_timer: 10.0,
            ..Default::default()
        });
        update_enemies(&mut state, 1.0 / 60.0);
        assert_eq!(state.enemies.active_count(), 0);
        assert_eq!(state.score, 25);
        assert_eq!(state.enemies_destroyed, 1);
        assert_eq!(state.total_enemies_killed, 1);
    }

    #[test]
    fn test_enemy_bounces_off_play_area_edges() {
        let mut state = SimulationState::new(3);
        let (top, bottom) = (state.play_top, state.play_bottom);
        state.enemies.spawn(Enemy {
            pos: Vec2::new(400.0, top + 9.0),
            vel: Vec2::new(0.0, -200.0),
            fire_timer: 10.0,
            ..Default::default()
        });
        state.enemies.spawn(Enemy {
            pos: Vec2::new(500.0, bottom - 9.0),
            vel: Vec2::new(0.0, 200.0),
            fire_timer: 10.0,
            ..Default::default()
        });
        update_enemies(&mut state, 1.0 / 60.0);

        let enemies: Vec<&Enemy> = state.enemies.iter().collect();
        assert_eq!(enemies.len(), 2);
        assert_eq!(enemies[0].pos.y, top + enemies[0].radius);
        assert_eq!(enemies[0].vel.y, 200.0);
        assert_eq!(enemies[1].pos.y, bottom - enemies[1].radius);
        assert_eq!(enemies[1].vel.y, -200.0);
    }

    #[test]
    fn test_enemy_fires_once_on_screen() {
        let mut state = SimulationState::new(3);
        state.enemies.spawn(Enemy {
            pos: Vec2::new(500.0, 100.0),
            fire_timer: 0.01,
            ..Default::default()
        });
        update_enemies(&mut state, 0.02);
        assert_eq!(state.enemy_shots.active_count(), 1);
        let shot = state.enemy_shots.iter().next().expect("shot spawned");
        assert!(shot.vel.x < -200.0);
        assert_eq!(shot.damage, 5.0);
    }

    #[test]
    fn test_trail_emits_with_catch_up() {
        let mut state = SimulationState::new(3);
        state.enemies.spawn(Enemy {
            pos: Vec2::new(500.0, 100.0),
            fire_timer: 10.0,
            ..Default::default()
        });
        update_enemies(&mut state, 0.16);
        let enemy = state.enemies.iter().next().expect("alive");
        assert_eq!(enemy.trail.len(), 3);
    }
}
