//! Property tests over the public simulation API

use glam::Vec2;
use proptest::prelude::*;

use space_bench::sim::anomaly::{self, CORE_LAYER, LAYER_DESTROYED};
use space_bench::sim::{
    HitOutcome, Player, Pool, Shield, SimulationState, TickInput, Trail, Xorshift32, tick,
};
use space_bench::Tuning;

#[derive(Debug, Default, Clone)]
struct Slot;

fn fresh_player(shield: f32) -> Player {
    let mut player = Player::new(Vec2::new(100.0, 200.0), &Tuning::default());
    player.shield = Shield::full(shield);
    player
}

fn input_from_bits(bits: u8) -> TickInput {
    TickInput {
        up: bits & 1 != 0,
        down: bits & 2 != 0,
        left: bits & 4 != 0,
        right: bits & 8 != 0,
        fire_gun: bits & 16 != 0,
        fire_laser: bits & 32 != 0,
    }
}

proptest! {
    #[test]
    fn pool_never_exceeds_capacity(
        capacity in 1usize..32,
        ops in prop::collection::vec(any::<bool>(), 0..200),
    ) {
        let mut pool: Pool<Slot> = Pool::with_capacity(capacity);
        let mut handles = Vec::new();
        for spawn in ops {
            if spawn {
                let was_full = pool.is_full();
                let before = pool.active_count();
                match pool.spawn(Slot) {
                    Some(handle) => handles.push(handle),
                    None => {
                        prop_assert!(was_full);
                        prop_assert_eq!(pool.active_count(), before);
                    }
                }
            } else if let Some(handle) = handles.pop() {
                prop_assert!(pool.despawn(handle));
            }
            prop_assert!(pool.active_count() <= capacity);
            prop_assert_eq!(pool.active_count() + pool.free_slots(), capacity);
        }
    }

    #[test]
    fn shield_absorbs_before_health(shield in 0.0f32..200.0, amount in 0.0f32..300.0) {
        let mut player = fresh_player(shield);
        let outcome = player.take_damage(amount);
        prop_assert!(player.health >= 0.0);
        prop_assert!(player.shield.strength >= 0.0);
        if amount <= shield {
            prop_assert!((player.shield.strength - (shield - amount)).abs() < 1e-3);
            prop_assert_eq!(player.health, 100.0);
        } else {
            prop_assert_eq!(player.shield.strength, 0.0);
            prop_assert!(!player.shield.active);
            let expected = (100.0 - (amount - shield)).max(0.0);
            prop_assert!((player.health - expected).abs() < 1e-3);
        }
        prop_assert_ne!(outcome, HitOutcome::Ignored);
    }

    #[test]
    fn invulnerability_blocks_only_discrete_hits(
        first in 1.0f32..40.0,
        second in 1.0f32..40.0,
        gap in 0.0f32..1.09,
    ) {
        let mut player = fresh_player(0.0);
        player.take_damage(first);
        let after_first = player.health;
        player.invulnerable_timer -= gap;
        prop_assert_eq!(player.take_damage(second), HitOutcome::Ignored);
        prop_assert_eq!(player.health, after_first);
        player.take_beam_damage(second);
        prop_assert!(player.health < after_first);
    }

    #[test]
    fn trail_keeps_newest_in_order(capacity in 1usize..64, pushes in 0usize..200) {
        let mut trail = Trail::with_capacity(capacity);
        for i in 0..pushes {
            trail.push(Vec2::new(i as f32, 0.0));
        }
        prop_assert_eq!(trail.len(), pushes.min(capacity));
        let xs: Vec<f32> = trail.iter().map(|p| p.pos.x).collect();
        let expected: Vec<f32> =
            (pushes.saturating_sub(capacity)..pushes).map(|i| i as f32).collect();
        prop_assert_eq!(xs, expected);
    }

    #[test]
    fn rng_is_deterministic_and_in_range(
        seed in any::<u32>(),
        min in -100.0f32..100.0,
        span in 0.001f32..100.0,
    ) {
        let mut a = Xorshift32::new(seed);
        let mut b = Xorshift32::new(seed);
        for _ in 0..64 {
            prop_assert_eq!(a.next_u32(), b.next_u32());
            let f = a.next_f32();
            prop_assert!((0.0..1.0).contains(&f));
            let r = b.range(min, min + span);
            prop_assert!(r >= min && r <= min + span + 1e-3);
            a.next_u32();
            prop_assert_ne!(a.state(), 0);
        }
    }

    #[test]
    fn anomaly_layer_never_decreases(
        seed in any::<u32>(),
        hits in prop::collection::vec(0.0f32..900.0, 1..40),
    ) {
        let mut state = SimulationState::new(seed);
        anomaly::activate(&mut state);
        let mut last = state.anomaly.layer;
        for amount in hits {
            anomaly::apply_damage(&mut state, amount);
            let layer = state.anomaly.layer;
            prop_assert!(layer >= last);
            prop_assert!(layer <= LAYER_DESTROYED);
            // Rings are exposed exactly up to the current layer
            for (i, ring) in state.anomaly.rings.iter().enumerate() {
                prop_assert_eq!(ring.is_active(), i <= layer.min(CORE_LAYER) as usize);
            }
            last = layer;
        }
    }

    #[test]
    fn anomaly_layer_never_decreases_across_ticks(
        seed in any::<u32>(),
        steps in prop::collection::vec((any::<u8>(), 0.0f32..400.0), 1..300),
    ) {
        let mut state = SimulationState::new(seed);
        anomaly::activate(&mut state);
        let mut last = state.anomaly.layer;
        for (bits, extra) in steps {
            state.input = input_from_bits(bits);
            if bits & 64 != 0 {
                anomaly::apply_damage(&mut state, extra);
            }
            tick(&mut state, 1.0 / 60.0);
            if state.anomaly.active {
                prop_assert!(state.anomaly.layer >= last);
                last = state.anomaly.layer;
            } else {
                last = 0;
            }
        }
    }

    #[test]
    fn random_input_keeps_state_sane(
        seed in any::<u32>(),
        inputs in prop::collection::vec(any::<u8>(), 1..400),
    ) {
        let mut state = SimulationState::new(seed);
        for bits in inputs {
            state.input = input_from_bits(bits);
            tick(&mut state, 1.0 / 60.0);
            prop_assert!(!state.input.fire_gun);
            prop_assert!(state.player.health >= 0.0);
            prop_assert!(state.player.pos.is_finite());
            let y = state.player.pos.y;
            prop_assert!(y >= state.play_top && y <= state.play_bottom);
            prop_assert!(state.bullets.active_count() <= state.bullets.capacity());
            prop_assert!(state.enemies.iter().all(|e| e.pos.is_finite()));
        }
    }
}
