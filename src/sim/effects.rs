//! Visual effects: particles, explosions, starfield
//!
//! None of this feeds back into gameplay; it only has to stay bounded and
//! deterministic for a given seed.

use std::f32::consts::TAU;

use glam::Vec2;

use super::pool::Pool;
use super::rng::Xorshift32;
use super::state::{Explosion, Particle, SimulationState, Star};
use crate::consts::*;

pub const STAR_COUNT: usize = 96;
/// Parallax layers as fractions of world scroll speed
const STAR_DEPTHS: [f32; 3] = [0.25, 0.5, 1.0];
const STAR_BRIGHTNESS: [u8; 3] = [90, 150, 230];

/// Per-second velocity damping applied to particles
const PARTICLE_DRAG: f32 = 2.5;

/// Explosion presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplosionSize {
    Small,
    Medium,
    Large,
}

impl ExplosionSize {
    /// (radius, lifetime)
    fn params(self) -> (f32, f32) {
        match self {
            ExplosionSize::Small => (10.0, 0.35),
            ExplosionSize::Medium => (28.0, 0.6),
            ExplosionSize::Large => (60.0, 1.0),
        }
    }

    fn spark_count(self) -> usize {
        match self {
            ExplosionSize::Small => 4,
            ExplosionSize::Medium => 12,
            ExplosionSize::Large => 28,
        }
    }
}

pub fn spawn_explosion(explosions: &mut Pool<Explosion>, pos: Vec2, size: ExplosionSize) {
    let (radius, lifetime) = size.params();
    explosions.spawn(Explosion {
        pos,
        radius,
        timer: 0.0,
        lifetime,
    });
}

/// Burst of `count` particles flying out from `pos`
pub fn spawn_sparks(
    particles: &mut Pool<Particle>,
    rng: &mut Xorshift32,
    pos: Vec2,
    count: usize,
    speed: f32,
    color: [u8; 3],
    life: f32,
) {
    for _ in 0..count {
        let angle = rng.range(0.0, TAU);
        let v = Vec2::from_angle(angle) * speed * rng.range(0.4, 1.0);
        let life = life * rng.range(0.6, 1.0);
        particles.spawn(Particle {
            pos,
            vel: v,
            life,
            max_life: life,
            color,
        });
    }
}

/// Engine exhaust puff trailing behind a ship
pub fn spawn_exhaust(particles: &mut Pool<Particle>, rng: &mut Xorshift32, pos: Vec2, scroll: f32) {
    let vel = Vec2::new(-scroll - rng.range(40.0, 90.0), rng.range(-12.0, 12.0));
    let life = rng.range(0.15, 0.3);
    particles.spawn(Particle {
        pos: pos + Vec2::new(0.0, rng.range(-2.0, 2.0)),
        vel,
        life,
        max_life: life,
        color: [255, 160, 60],
    });
}

/// Expanding ring of `count` particles reaching `radius` over their life
pub fn spawn_pulse_ring(
    particles: &mut Pool<Particle>,
    center: Vec2,
    radius: f32,
    count: usize,
    color: [u8; 3],
) {
    const LIFE: f32 = 0.4;
    for i in 0..count {
        let dir = Vec2::from_angle(TAU * i as f32 / count as f32);
        particles.spawn(Particle {
            pos: center,
            vel: dir * radius / LIFE,
            life: LIFE,
            max_life: LIFE,
            color,
        });
    }
}

/// Explosion plus matching sparks
pub fn explode(state: &mut SimulationState, pos: Vec2, size: ExplosionSize) {
    spawn_explosion(&mut state.explosions, pos, size);
    let speed = size.params().0 * 4.0;
    spawn_sparks(
        &mut state.particles,
        &mut state.rng,
        pos,
        size.spark_count(),
        speed,
        [255, 190, 90],
        0.5,
    );
}

/// `count` explosions evenly spaced on a circle
pub fn explosion_ring(
    state: &mut SimulationState,
    center: Vec2,
    radius: f32,
    count: usize,
    size: ExplosionSize,
) {
    for i in 0..count {
        let offset = Vec2::from_angle(TAU * i as f32 / count as f32) * radius;
        explode(state, center + offset, size);
    }
}

pub fn update_particles(particles: &mut Pool<Particle>, dt: f32) {
    let damping = (1.0 - PARTICLE_DRAG * dt).max(0.0);
    particles.retain_mut(|p| {
        p.pos += p.vel * dt;
        p.vel *= damping;
        p.life -= dt;
        p.life > 0.0
    });
}

pub fn update_explosions(explosions: &mut Pool<Explosion>, dt: f32) {
    explosions.retain_mut(|e| {
        e.timer += dt;
        e.timer < e.lifetime
    });
}

/// Populate the starfield across the play area
pub fn seed_stars(rng: &mut Xorshift32, top: f32, bottom: f32) -> Vec<Star> {
    (0..STAR_COUNT)
        .map(|i| {
            let layer = i % STAR_DEPTHS.len();
            Star {
                pos: Vec2::new(rng.range(0.0, SCREEN_W), rng.range(top, bottom)),
                depth: STAR_DEPTHS[layer],
                brightness: STAR_BRIGHTNESS[layer],
            }
        })
        .collect()
}

/// Scroll stars by their depth; wrapped stars re-enter at a random height
pub fn scroll_stars(state: &mut SimulationState, dt: f32) {
    let (top, bottom) = (state.play_top, state.play_bottom);
    let scroll = state.scroll_speed;
    let rng = &mut state.rng;
    for star in state.stars.iter_mut() {
        star.pos.x -= scroll * star.depth * dt;
        if star.pos.x < 0.0 {
            star.pos.x += SCREEN_W;
            star.pos.y = rng.range(top, bottom);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explosion_expires_after_lifetime() {
        let mut pool = Pool::with_capacity(4);
        spawn_explosion(&mut pool, Vec2::ZERO, ExplosionSize::Small);
        update_explosions(&mut pool, 0.2);
        assert_eq!(pool.active_count(), 1);
        update_explosions(&mut pool, 0.2);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_particles_die_and_slow() {
        let mut pool = Pool::with_capacity(16);
        let mut rng = Xorshift32::new(3);
        spawn_sparks(&mut pool, &mut rng, Vec2::ZERO, 8, 100.0, [255; 3], 0.5);
        assert_eq!(pool.active_count(), 8);
        let before: f32 = pool.iter().map(|p| p.vel.length()).sum();
        update_particles(&mut pool, 0.1);
        let after: f32 = pool.iter().map(|p| p.vel.length()).sum();
        assert!(after < before);
        update_particles(&mut pool, 1.0);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_particle_pool_saturates() {
        let mut pool = Pool::with_capacity(4);
        let mut rng = Xorshift32::new(3);
        spawn_sparks(&mut pool, &mut rng, Vec2::ZERO, 10, 50.0, [0; 3], 1.0);
        assert_eq!(pool.active_count(), 4);
        assert_eq!(pool.dropped_spawns(), 6);
    }

    #[test]
    fn test_stars_stay_in_play_area() {
        let mut state = SimulationState::new(21);
        assert_eq!(state.stars.len(), STAR_COUNT);
        state.scroll_speed = 400.0;
        for _ in 0..200 {
            scroll_stars(&mut state, 1.0 / 30.0);
        }
        for star in &state.stars {
            assert!((0.0..=SCREEN_W).contains(&star.pos.x));
            assert!(star.pos.y >= state.play_top && star.pos.y <= state.play_bottom);
        }
    }

    #[test]
    fn test_explosion_ring_spawns_count() {
        let mut state = SimulationState::new(2);
        explosion_ring(&mut state, Vec2::new(300.0, 200.0), 40.0, 8, ExplosionSize::Small);
        assert_eq!(state.explosions.active_count(), 8);
    }
}
