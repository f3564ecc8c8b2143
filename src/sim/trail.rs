//! Fading motion trails
//!
//! A trail is a bounded FIFO of position samples. Samples fade out over
//! time and scroll left with the world; the renderer draws them as a streak.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Default number of samples kept per trail
pub const DEFAULT_TRAIL_CAPACITY: usize = 128;

/// Samples scrolled further left than this are dropped
const OFFSCREEN_X: f32 = -50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailPoint {
    pub pos: Vec2,
    pub alpha: f32,
}

/// Trail history (oldest first)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    points: VecDeque<TrailPoint>,
    capacity: usize,
}

impl Default for Trail {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TRAIL_CAPACITY)
    }
}

impl Trail {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }

    /// Append a fresh sample, evicting the oldest when full
    pub fn push(&mut self, pos: Vec2) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(TrailPoint { pos, alpha: 1.0 });
    }

    /// Fade and scroll every sample, then drop the expired ones
    pub fn update(&mut self, dt: f32, decay_rate: f32, scroll_speed: f32) {
        let fade = dt * decay_rate;
        let shift = scroll_speed * dt;
        for point in self.points.iter_mut() {
            point.alpha -= fade;
            point.pos.x -= shift;
        }
        self.points.retain(|p| p.alpha > 0.0 && p.pos.x >= OFFSCREEN_X);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailPoint> {
        self.points.iter()
    }

    pub fn newest(&self) -> Option<&TrailPoint> {
        self.points.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut trail = Trail::with_capacity(4);
        for i in 0..10 {
            trail.push(Vec2::new(i as f32, 0.0));
        }
        assert_eq!(trail.len(), 4);
        let xs: Vec<f32> = trail.iter().map(|p| p.pos.x).collect();
        assert_eq!(xs, vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_decay_to_zero_removes_sample() {
        let mut trail = Trail::default();
        trail.push(Vec2::new(100.0, 20.0));
        trail.update(1.0, 1.0, 50.0);
        assert!(trail.is_empty());
    }

    #[test]
    fn test_partial_decay_and_scroll() {
        let mut trail = Trail::default();
        trail.push(Vec2::new(100.0, 20.0));
        trail.update(0.5, 1.0, 50.0);
        let p = trail.newest().copied().expect("sample survives");
        assert!((p.alpha - 0.5).abs() < 1e-6);
        assert!((p.pos.x - 75.0).abs() < 1e-4);
    }

    #[test]
    fn test_offscreen_samples_compacted_in_order() {
        let mut trail = Trail::default();
        trail.push(Vec2::new(-45.0, 0.0));
        trail.push(Vec2::new(10.0, 0.0));
        trail.push(Vec2::new(-49.0, 0.0));
        trail.push(Vec2::new(20.0, 0.0));
        trail.update(0.1, 0.1, 100.0);
        let xs: Vec<f32> = trail.iter().map(|p| p.pos.x.round()).collect();
        assert_eq!(xs, vec![0.0, 10.0]);
    }

    #[test]
    fn test_reset() {
        let mut trail = Trail::with_capacity(8);
        trail.push(Vec2::ZERO);
        trail.reset();
        assert!(trail.is_empty());
        assert_eq!(trail.capacity(), 8);
    }
}
