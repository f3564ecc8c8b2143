//! Projectile, pickup and kill resolution
//!
//! Every pass consumes the entities it resolves immediately (slot released),
//! so nothing can be hit twice in the same frame. All projectile and beam
//! kills go through [`credit_kill`].

use glam::Vec2;
use rand::seq::IndexedRandom;

use super::effects::{self, ExplosionSize};
use super::player::{apply_upgrade, Beam};
use super::state::{GameEvent, KillSource, SimulationState, Upgrade, UpgradeKind};
use crate::consts::*;
use crate::tuning::ThumperPolicy;

/// Extra reach added to the player's radius for projectile hits
const SHOT_HIT_PADDING: f32 = 6.0;
/// Extra reach added to the player's radius for pickups
const PICKUP_PADDING: f32 = 20.0;
/// Bullet vs missile contact radius
const MISSILE_HIT_RADIUS: f32 = 8.0;

const DEFAULT_SHOT_DAMAGE: f32 = 5.0;
const DEFAULT_MISSILE_DAMAGE: f32 = 12.0;

const MISSILE_TRAIL_DECAY: f32 = 2.5;
const MISSILE_TRAIL_INTERVAL: f32 = 0.03;

const DEFLECT_BASE_SPEED: f32 = 260.0;
const DEFLECT_SCROLL_FACTOR: f32 = 1.5;
const DEFLECT_LIFE: f32 = 3.0;

/// Shots further outside the play area than this are dropped
const SHOT_MARGIN_X: f32 = 30.0;
const SHOT_MARGIN_Y: f32 = 40.0;

const UPGRADE_DRIFT: f32 = 30.0;
const UPGRADE_BOB: f32 = 30.0;

const HIT_SCORE: u32 = 5;
const MISSILE_SCORE: u32 = 10;

/// Award a projectile or beam kill
///
/// Both kill counters advance for every source; the world speeds up a
/// little, and the wreck may drop an upgrade.
pub fn credit_kill(state: &mut SimulationState, pos: Vec2, source: KillSource) {
    state.score += source.score();
    state.enemies_destroyed += 1;
    state.total_enemies_killed += 1;
    let nudged = state.scroll_target + state.tuning.scroll_nudge_per_kill;
    state.scroll_target = nudged.min(state.tuning.max_scroll_target);
    effects::explode(state, pos, ExplosionSize::Medium);
    roll_upgrade_drop(state, pos);
    state.events.push(GameEvent::EnemyKilled { pos, source });
}

pub fn spawn_upgrade(state: &mut SimulationState, pos: Vec2, kind: UpgradeKind) {
    let phase = state.rng.range(0.0, std::f32::consts::TAU);
    state.upgrades.spawn(Upgrade {
        pos,
        vel: Vec2::new(-UPGRADE_DRIFT, 0.0),
        phase,
        kind,
    });
}

/// Random drop after a kill
pub fn roll_upgrade_drop(state: &mut SimulationState, pos: Vec2) {
    if !state.rng.chance(state.tuning.upgrade_drop_chance) {
        return;
    }
    let kind = UpgradeKind::ALL
        .choose(&mut state.rng)
        .copied()
        .unwrap_or_default();
    spawn_upgrade(state, pos, kind);
}

fn effective_damage(damage: f32, is_missile: bool) -> f32 {
    if damage > 0.0 {
        damage
    } else if is_missile {
        DEFAULT_MISSILE_DAMAGE
    } else {
        DEFAULT_SHOT_DAMAGE
    }
}

enum ShotOutcome {
    Hit(f32),
    Deflected(Vec2),
    Destroyed(Vec2),
}

/// Age and move enemy/anomaly shots; resolve the thumper field and player hits
pub fn update_enemy_shots(state: &mut SimulationState, dt: f32) {
    let scroll = state.scroll_speed;
    let (top, bottom) = (state.play_top, state.play_bottom);
    let player_pos = state.player.pos;
    let player_alive = state.player.alive;
    let hit_reach = state.player.radius + SHOT_HIT_PADDING;
    let thumper = state.player.upgrades.thumper.active && player_alive;
    let thumper_radius = state.tuning.thumper_radius;
    let policy = state.tuning.thumper_policy;
    let deflect_speed = DEFLECT_BASE_SPEED + DEFLECT_SCROLL_FACTOR * scroll;

    let rng = &mut state.rng;
    let mut outcomes = Vec::new();

    state.enemy_shots.retain_mut(|shot| {
        shot.life -= dt;
        if shot.life <= 0.0 {
            return false;
        }
        shot.pos += shot.vel * dt;

        if shot.is_missile {
            shot.trail.update(dt, MISSILE_TRAIL_DECAY, scroll);
            shot.trail_timer += dt;
            while shot.trail_timer >= MISSILE_TRAIL_INTERVAL {
                shot.trail_timer -= MISSILE_TRAIL_INTERVAL;
                shot.trail.push(shot.pos);
            }
        }

        if shot.pos.x < -SHOT_MARGIN_X
            || shot.pos.x > SCREEN_W + SHOT_MARGIN_X
            || shot.pos.y < top - SHOT_MARGIN_Y
            || shot.pos.y > bottom + SHOT_MARGIN_Y
        {
            return false;
        }
        if shot.deflected || !player_alive {
            return true;
        }

        let offset = shot.pos - player_pos;
        if thumper && offset.length_squared() < thumper_radius * thumper_radius {
            let deflect = match policy {
                ThumperPolicy::AlwaysDeflect => true,
                ThumperPolicy::CoinFlip => rng.chance(0.5),
            };
            if !deflect {
                outcomes.push(ShotOutcome::Destroyed(shot.pos));
                return false;
            }
            shot.vel = offset.normalize_or(Vec2::X) * deflect_speed;
            shot.damage = effective_damage(shot.damage, shot.is_missile) * 0.5;
            shot.is_missile = false;
            shot.life = DEFLECT_LIFE;
            shot.deflected = true;
            outcomes.push(ShotOutcome::Deflected(shot.pos));
            return true;
        }

        if offset.length_squared() < hit_reach * hit_reach {
            outcomes.push(ShotOutcome::Hit(effective_damage(shot.damage, shot.is_missile)));
            return false;
        }
        true
    });

    for outcome in outcomes {
        match outcome {
            ShotOutcome::Hit(damage) => {
                state.damage_player(damage);
            }
            ShotOutcome::Deflected(pos) => {
                effects::spawn_explosion(&mut state.explosions, pos, ExplosionSize::Small);
                state.events.push(GameEvent::ProjectileDeflected { pos });
            }
            ShotOutcome::Destroyed(pos) => {
                effects::spawn_explosion(&mut state.explosions, pos, ExplosionSize::Small);
                state.events.push(GameEvent::ProjectileDestroyed { pos });
            }
        }
    }
}

/// Drift pickups and apply those the player touches
pub fn update_upgrades(state: &mut SimulationState, dt: f32) {
    let scroll = state.scroll_speed;
    let player_pos = state.player.pos;
    let player_alive = state.player.alive;
    let reach = state.player.radius + PICKUP_PADDING;
    let mut collected = Vec::new();

    state.upgrades.retain_mut(|upgrade| {
        upgrade.phase += dt * 3.0;
        upgrade.pos.x += (upgrade.vel.x - 0.5 * scroll) * dt;
        upgrade.pos.y += upgrade.phase.cos() * UPGRADE_BOB * dt;
        if upgrade.pos.x < -20.0 {
            return false;
        }
        if player_alive && upgrade.pos.distance_squared(player_pos) < reach * reach {
            collected.push(upgrade.kind);
            return false;
        }
        true
    });

    for kind in collected {
        apply_upgrade(state, kind);
    }
}

/// Bullets against enemies, then surviving bullets against missiles
pub fn resolve_bullet_hits(state: &mut SimulationState) {
    let bullet_reach = state.tuning.bullet_radius * 0.5;
    let bullets: Vec<(usize, Vec2)> = state
        .bullets
        .iter_indexed()
        .map(|(i, b)| (i, b.pos))
        .collect();

    for &(bi, pos) in &bullets {
        let Some(ei) = state.enemies.position(|e| {
            let reach = e.radius + bullet_reach;
            e.pos.distance_squared(pos) < reach * reach
        }) else {
            continue;
        };
        state.bullets.release(bi);
        state.score += HIT_SCORE;
        effects::spawn_sparks(
            &mut state.particles,
            &mut state.rng,
            pos,
            4,
            90.0,
            [255, 255, 200],
            0.2,
        );
        let Some(enemy) = state.enemies.index_mut(ei) else {
            continue;
        };
        enemy.hp -= 1;
        if enemy.hp <= 0 {
            let enemy_pos = enemy.pos;
            state.enemies.release(ei);
            credit_kill(state, enemy_pos, KillSource::Bullet);
        }
    }

    for &(bi, pos) in &bullets {
        if !state.bullets.is_active(bi) {
            continue;
        }
        let Some(si) = state.enemy_shots.position(|s| {
            s.is_missile
                && !s.deflected
                && s.pos.distance_squared(pos) < MISSILE_HIT_RADIUS * MISSILE_HIT_RADIUS
        }) else {
            continue;
        };
        state.bullets.release(bi);
        destroy_missile(state, si);
    }
}

/// Player beam against missiles
pub fn resolve_laser_missiles(state: &mut SimulationState) {
    let player = &state.player;
    if !player.alive || !player.laser.firing {
        return;
    }
    let beam = Beam {
        origin: player.laser.origin,
        half_height: state.tuning.laser_missile_band * player.upgrades.beam_scale + 2.0,
    };
    let hits: Vec<usize> = state
        .enemy_shots
        .iter_indexed()
        .filter(|(_, s)| s.is_missile && !s.deflected && beam.overlaps(s.pos, 0.0))
        .map(|(i, _)| i)
        .collect();
    for si in hits {
        destroy_missile(state, si);
    }
}

fn destroy_missile(state: &mut SimulationState, index: usize) {
    let Some(pos) = state.enemy_shots.index_mut(index).map(|s| s.pos) else {
        return;
    };
    state.enemy_shots.release(index);
    state.score += MISSILE_SCORE;
    effects::spawn_explosion(&mut state.explosions, pos, ExplosionSize::Small);
    state.events.push(GameEvent::ProjectileDestroyed { pos });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Bullet, Enemy, EnemyShot};

    fn shot_at(pos: Vec2, is_missile: bool) -> EnemyShot {
        EnemyShot {
            pos,
            vel: Vec2::ZERO,
            life: 4.0,
            is_missile,
            ..Default::default()
        }
    }

    #[test]
    fn test_bullet_hit_then_kill() {
        let mut state = SimulationState::new(8);
        state.tuning.upgrade_drop_chance = 0.0;
        state.enemies.spawn(Enemy {
            pos: Vec2::new(300.0, 200.0),
            hp: 2,
            ..Default::default()
        });
        state.bullets.spawn(Bullet {
            pos: Vec2::new(298.0, 200.0),
            vel: Vec2::ZERO,
        });
        resolve_bullet_hits(&mut state);
        assert_eq!(state.bullets.active_count(), 0);
        assert_eq!(state.enemies.iter().next().map(|e| e.hp), Some(1));
        assert_eq!(state.score, 5);

        state.bullets.spawn(Bullet {
            pos: Vec2::new(298.0, 200.0),
            vel: Vec2::ZERO,
        });
        let target_before = state.scroll_target;
        resolve_bullet_hits(&mut state);
        assert_eq!(state.enemies.active_count(), 0);
        assert_eq!(state.score, 5 + 5 + 20);
        assert_eq!(state.enemies_destroyed, 1);
        assert_eq!(state.total_enemies_killed, 1);
        assert_eq!(state.scroll_target, target_before + 6.0);
        assert_eq!(state.upgrades.active_count(), 0);
    }

    #[test]
    fn test_one_bullet_hits_one_enemy() {
        let mut state = SimulationState::new(8);
        for _ in 0..2 {
            state.enemies.spawn(Enemy {
                pos: Vec2::new(300.0, 200.0),
                hp: 5,
                ..Default::default()
            });
        }
        state.bullets.spawn(Bullet {
            pos: Vec2::new(300.0, 200.0),
            vel: Vec2::ZERO,
        });
        resolve_bullet_hits(&mut state);
        let hps: Vec<i32> = state.enemies.iter().map(|e| e.hp).collect();
        assert_eq!(hps, vec![4, 5]);
    }

    #[test]
    fn test_scroll_target_capped() {
        let mut state = SimulationState::new(8);
        state.tuning.upgrade_drop_chance = 0.0;
        state.scroll_target = 178.0;
        credit_kill(&mut state, Vec2::ZERO, KillSource::DroneBeam);
        assert_eq!(state.scroll_target, 180.0);
        assert_eq!(state.score, 25);
    }

    #[test]
    fn test_guaranteed_drop_spawns_upgrade() {
        let mut state = SimulationState::new(8);
        state.tuning.upgrade_drop_chance = 1.0;
        roll_upgrade_drop(&mut state, Vec2::new(300.0, 200.0));
        assert_eq!(state.upgrades.active_count(), 1);
    }

    #[test]
    fn test_bullet_destroys_missile() {
        let mut state = SimulationState::new(8);
        state.enemy_shots.spawn(shot_at(Vec2::new(300.0, 200.0), true));
        state.bullets.spawn(Bullet {
            pos: Vec2::new(305.0, 200.0),
            vel: Vec2::ZERO,
        });
        resolve_bullet_hits(&mut state);
        assert_eq!(state.enemy_shots.active_count(), 0);
        assert_eq!(state.bullets.active_count(), 0);
        assert_eq!(state.score, 10);
    }

    #[test]
    fn test_laser_destroys_missile_in_band_only() {
        let mut state = SimulationState::new(8);
        let y = state.player.pos.y;
        state.player.laser.firing = true;
        state.player.laser.origin = state.player.pos + Vec2::new(14.0, 0.0);
        state.enemy_shots.spawn(shot_at(Vec2::new(400.0, y + 2.0), true));
        state.enemy_shots.spawn(shot_at(Vec2::new(400.0, y + 20.0), true));
        state.enemy_shots.spawn(shot_at(Vec2::new(400.0, y), false));
        resolve_laser_missiles(&mut state);
        assert_eq!(state.enemy_shots.active_count(), 2);
        assert_eq!(state.score, 10);
    }

    #[test]
    fn test_shot_hits_player_with_default_damage() {
        let mut state = SimulationState::new(8);
        let pos = state.player.pos + Vec2::new(4.0, 0.0);
        state.enemy_shots.spawn(shot_at(pos, true));
        update_enemy_shots(&mut state, 1.0 / 60.0);
        assert_eq!(state.enemy_shots.active_count(), 0);
        assert_eq!(state.player.health, 88.0);
    }

    #[test]
    fn test_thumper_always_deflects() {
        let mut state = SimulationState::new(8);
        state.tuning.thumper_policy = ThumperPolicy::AlwaysDeflect;
        state.player.upgrades.thumper.active = true;
        let pos = state.player.pos + Vec2::new(40.0, 0.0);
        state.enemy_shots.spawn(EnemyShot {
            damage: 12.0,
            ..shot_at(pos, true)
        });
        update_enemy_shots(&mut state, 1.0 / 60.0);
        let shot = state.enemy_shots.iter().next().expect("deflected shot survives");
        assert!(shot.deflected);
        assert!(!shot.is_missile);
        assert_eq!(shot.damage, 6.0);
        assert_eq!(shot.life, 3.0);
        assert!(shot.vel.x > 0.0);
        assert_eq!(state.player.health, 100.0);
    }

    #[test]
    fn test_thumper_coin_flip_never_damages() {
        let mut state = SimulationState::new(8);
        state.player.upgrades.thumper.active = true;
        for i in 0..20 {
            let pos = state.player.pos + Vec2::new(30.0, i as f32 - 10.0);
            state.enemy_shots.spawn(shot_at(pos, false));
        }
        update_enemy_shots(&mut state, 1.0 / 60.0);
        assert_eq!(state.player.health, 100.0);
        assert!(state.enemy_shots.iter().all(|s| s.deflected));
    }

    #[test]
    fn test_expired_and_offscreen_shots_removed() {
        let mut state = SimulationState::new(8);
        state.enemy_shots.spawn(EnemyShot {
            life: 0.01,
            ..shot_at(Vec2::new(300.0, 100.0), false)
        });
        state.enemy_shots.spawn(shot_at(Vec2::new(-35.0, 100.0), false));
        update_enemy_shots(&mut state, 1.0 / 60.0);
        assert_eq!(state.enemy_shots.active_count(), 0);
    }

    #[test]
    fn test_upgrade_pickup_applies_and_scores() {
        let mut state = SimulationState::new(8);
        let pos = state.player.pos + Vec2::new(10.0, 0.0);
        spawn_upgrade(&mut state, pos, UpgradeKind::Guidance);
        update_upgrades(&mut state, 1.0 / 60.0);
        assert_eq!(state.upgrades.active_count(), 0);
        assert!(state.player.upgrades.guidance);
        assert_eq!(state.score, 40);
    }
}
