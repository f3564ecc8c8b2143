//! Data-driven game balance
//!
//! Every constant a designer would want to adjust lives here. Defaults
//! reproduce the shipped balance; a JSON file can override any subset.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sim::anomaly::LAYER_COUNT;

/// What the thumper field does to an enemy projectile that enters it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ThumperPolicy {
    /// Every projectile inside the field is deflected back outward
    AlwaysDeflect,
    /// 50/50 between deflecting the projectile and destroying it outright
    #[default]
    CoinFlip,
}

impl ThumperPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumperPolicy::AlwaysDeflect => "always-deflect",
            ThumperPolicy::CoinFlip => "coin-flip",
        }
    }
}

/// Errors raised while loading a tuning file
#[derive(Debug)]
pub enum TuningError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid { field: &'static str, reason: &'static str },
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read tuning file: {err}"),
            Self::Parse(err) => write!(f, "failed to parse tuning file: {err}"),
            Self::Invalid { field, reason } => {
                write!(f, "invalid tuning value `{field}`: {reason}")
            }
        }
    }
}

impl std::error::Error for TuningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for TuningError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for TuningError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}

/// Game balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Player ===
    /// Movement speed per held axis (pixels/s)
    pub player_speed: f32,
    pub player_radius: f32,
    pub player_max_health: f32,
    /// Shield strength granted by a shield pickup
    pub player_shield_max: f32,
    /// Invulnerability window after a discrete hit (seconds)
    pub invulnerability_time: f32,
    /// Flat damage from ramming an enemy
    pub body_collision_damage: f32,

    // === Guns ===
    pub gun_cooldown: f32,
    pub bullet_speed: f32,
    pub bullet_radius: f32,
    /// Steering acceleration applied to guided bullets (pixels/s²)
    pub guidance_accel: f32,
    /// Enemies further behind a bullet than this are ignored by guidance
    pub guidance_behind_cutoff: f32,
    /// Forward speed cap for guided bullets, as a multiple of `bullet_speed`
    pub guidance_max_forward: f32,
    pub minigun_duration: f32,

    // === Laser ===
    pub laser_hold_time: f32,
    pub laser_recharge_time: f32,
    /// Half-height of the beam band at beam scale 1.0
    pub laser_band: f32,
    /// Half-height of the band used against missiles
    pub laser_missile_band: f32,

    // === World ===
    pub base_scroll_speed: f32,
    pub max_scroll_target: f32,
    pub scroll_nudge_per_kill: f32,
    /// Chance an enemy kill drops an upgrade
    pub upgrade_drop_chance: f32,

    // === Thumper ===
    pub thumper_radius: f32,
    pub thumper_policy: ThumperPolicy,

    // === Anomaly ===
    pub anomaly_kill_threshold: u32,
    pub anomaly_score_threshold: u32,
    pub anomaly_warning_time: f32,
    pub anomaly_cooldown_time: f32,
    pub anomaly_layer_health: [f32; LAYER_COUNT],
    pub anomaly_shield: f32,
    pub anomaly_bullet_damage: f32,
    /// Player laser damage per second while overlapping the anomaly
    pub anomaly_laser_dps: f32,
    /// Per-drone laser damage per second while overlapping the anomaly
    pub anomaly_drone_laser_dps: f32,
    /// Damage per second from the anomaly's ring lasers
    pub ring_laser_dps: f32,
    pub wall_interval: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            player_speed: 180.0,
            player_radius: 10.0,
            player_max_health: 100.0,
            player_shield_max: 60.0,
            invulnerability_time: 1.1,
            body_collision_damage: 10.0,

            gun_cooldown: 0.12,
            bullet_speed: 520.0,
            bullet_radius: 4.0,
            guidance_accel: 1400.0,
            guidance_behind_cutoff: 16.0,
            guidance_max_forward: 2.2,
            minigun_duration: 12.0,

            laser_hold_time: 3.0,
            laser_recharge_time: 10.0,
            laser_band: 6.0,
            laser_missile_band: 3.0,

            base_scroll_speed: 60.0,
            max_scroll_target: 180.0,
            scroll_nudge_per_kill: 6.0,
            upgrade_drop_chance: 0.12,

            thumper_radius: 56.0,
            thumper_policy: ThumperPolicy::CoinFlip,

            anomaly_kill_threshold: 60,
            anomaly_score_threshold: 900,
            anomaly_warning_time: 10.0,
            anomaly_cooldown_time: 25.0,
            anomaly_layer_health: [480.0, 640.0, 820.0, 1000.0, 2400.0],
            anomaly_shield: 500.0,
            anomaly_bullet_damage: 12.0,
            anomaly_laser_dps: 220.0,
            anomaly_drone_laser_dps: 180.0,
            ring_laser_dps: 40.0,
            wall_interval: 5.5,
        }
    }
}

impl Tuning {
    /// Parse and validate a JSON tuning document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load a tuning file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.as_ref().display());
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        let positive = [
            ("player_speed", self.player_speed),
            ("player_radius", self.player_radius),
            ("player_max_health", self.player_max_health),
            ("gun_cooldown", self.gun_cooldown),
            ("bullet_speed", self.bullet_speed),
            ("laser_hold_time", self.laser_hold_time),
            ("laser_recharge_time", self.laser_recharge_time),
            ("base_scroll_speed", self.base_scroll_speed),
            ("anomaly_warning_time", self.anomaly_warning_time),
            ("anomaly_cooldown_time", self.anomaly_cooldown_time),
            ("wall_interval", self.wall_interval),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TuningError::Invalid {
                    field,
                    reason: "must be a positive number",
                });
            }
        }
        if !(0.0..=1.0).contains(&self.upgrade_drop_chance) {
            return Err(TuningError::Invalid {
                field: "upgrade_drop_chance",
                reason: "must be within [0, 1]",
            });
        }
        if self.max_scroll_target < self.base_scroll_speed {
            return Err(TuningError::Invalid {
                field: "max_scroll_target",
                reason: "must not be below base_scroll_speed",
            });
        }
        if self.anomaly_layer_health.iter().any(|h| !(h.is_finite() && *h > 0.0)) {
            return Err(TuningError::Invalid {
                field: "anomaly_layer_health",
                reason: "every layer needs positive health",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "player_speed": 240.0, "thumper_policy": "AlwaysDeflect" }"#;
        let tuning = Tuning::from_json(json).expect("valid tuning");
        assert_eq!(tuning.player_speed, 240.0);
        assert_eq!(tuning.thumper_policy, ThumperPolicy::AlwaysDeflect);
        assert_eq!(tuning.anomaly_score_threshold, 900);
        assert_eq!(tuning.anomaly_layer_health[4], 2400.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Tuning::from_json(r#"{ "gun_cooldown": 0.0 }"#).unwrap_err();
        assert!(matches!(err, TuningError::Invalid { field: "gun_cooldown", .. }));

        let err = Tuning::from_json(r#"{ "upgrade_drop_chance": 1.5 }"#).unwrap_err();
        assert!(err.to_string().contains("upgrade_drop_chance"));
    }

    #[test]
    fn test_parse_error() {
        let err = Tuning::from_json("{ not json").unwrap_err();
        assert!(matches!(err, TuningError::Parse(_)));
    }

    #[test]
    fn test_json_round_trip_preserves_policy() {
        let mut tuning = Tuning::default();
        tuning.thumper_policy = ThumperPolicy::AlwaysDeflect;
        let json = tuning.to_json().expect("serializable");
        assert_eq!(Tuning::from_json(&json).expect("valid"), tuning);
    }
}
