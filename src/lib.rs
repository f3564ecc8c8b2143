//! Space Bench - space-shooter simulation core for handheld benchmarking
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, weapons, collisions, boss)
//! - `tuning`: Data-driven game balance
//!
//! Rendering, audio and overlays are external consumers: they read a
//! [`sim::SimulationState`] after [`sim::tick`] returns.

pub mod sim;
pub mod tuning;

pub use tuning::{ThumperPolicy, Tuning, TuningError};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Logical screen size (Miyoo Mini panel)
    pub const SCREEN_W: f32 = 640.0;
    pub const SCREEN_H: f32 = 480.0;

    /// Nominal frame timestep used by the benchmark runner
    pub const FRAME_DT: f32 = 1.0 / 60.0;
    /// Floor applied by callers when a measured delta is non-positive
    pub const MIN_DT: f32 = 1.0 / 600.0;
    /// Largest delta a caller should feed a single tick
    pub const MAX_DT: f32 = 0.1;

    /// Overlay height assumed until the layout collaborator reports one
    pub const DEFAULT_OVERLAY_HEIGHT: f32 = 28.0;
    /// Gap between overlay/screen edge and the play area
    pub const PLAY_AREA_MARGIN: f32 = 6.0;
}

/// Clamp a measured frame delta into the range the simulation expects.
#[inline]
pub fn clamp_dt(dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        consts::MIN_DT
    } else {
        dt.min(consts::MAX_DT)
    }
}

/// Wrap an angle into [0, 2π)
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(std::f32::consts::TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= std::f32::consts::TAU {
        0.0
    } else {
        wrapped
    }
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Normalize with the length floored at 1.0.
///
/// Vectors shorter than one pixel come back unchanged, so near-coincident
/// points never produce NaN/Inf directions.
#[inline]
pub fn normalize_floor(v: Vec2) -> Vec2 {
    v / v.length().max(1.0)
}

/// Distance from `p` to the segment `a..b`
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 0.0001 {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}

/// Rotate `v` by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{PI, TAU};

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(TAU + 0.5) - 0.5).abs() < 1e-5);
        assert!((wrap_angle(-PI / 2.0) - 1.5 * PI).abs() < 1e-5);
        assert!(wrap_angle(-1e-9) < TAU);
    }

    #[test]
    fn test_normalize_floor_never_explodes() {
        let tiny = normalize_floor(Vec2::new(1e-6, 0.0));
        assert!(tiny.is_finite());
        assert!(tiny.length() < 1e-5);

        let unit = normalize_floor(Vec2::new(30.0, 40.0));
        assert!((unit.length() - 1.0).abs() < 1e-5);
        assert!(normalize_floor(Vec2::ZERO).is_finite());
    }

    #[test]
    fn test_point_segment_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert!((point_segment_distance(Vec2::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-5);
        assert!((point_segment_distance(Vec2::new(-4.0, 3.0), a, b) - 5.0).abs() < 1e-5);
        assert!((point_segment_distance(Vec2::new(2.0, 2.0), a, a) - 8f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let r = rotate(Vec2::X, PI / 2.0);
        assert!(r.x.abs() < 1e-5);
        assert!((r.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_clamp_dt() {
        assert_eq!(clamp_dt(0.0), consts::MIN_DT);
        assert_eq!(clamp_dt(-1.0), consts::MIN_DT);
        assert_eq!(clamp_dt(f32::NAN), consts::MIN_DT);
        assert_eq!(clamp_dt(1.0), consts::MAX_DT);
        assert_eq!(clamp_dt(0.016), 0.016);
    }
}
