//! Pool sizing and generation tunables.
//!
//! Pool sizing is progression-gated: without investigation tooling the
//! target range is `[4, 6]` with no investigation missions; unlocking it
//! widens the range to `[5, 8]` with a 25% per-mission investigation chance.

use serde::Deserialize;

/// Target size range and investigation chance for one progression stage.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PoolTarget {
    /// Minimum visible missions.
    pub min: usize,
    /// Maximum visible missions.
    pub max: usize,
    /// Per-mission probability of an investigation template.
    pub investigation_chance: f64,
}

impl PoolTarget {
    /// Numeric midpoint of the range (`[5, 8]` gives 6.5).
    #[allow(clippy::cast_precision_loss)]
    pub fn midpoint(&self) -> f64 {
        (self.min as f64 + self.max as f64) / 2.0
    }

    /// Whether `size` is strictly below the midpoint.
    #[allow(clippy::cast_precision_loss)]
    pub fn below_midpoint(&self, size: usize) -> bool {
        (size as f64) < self.midpoint()
    }
}

/// Mission pool configuration, the `missions` section of the YAML config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PoolConfig {
    /// Target before investigation tooling is unlocked.
    #[serde(default = "default_standard_target")]
    pub standard: PoolTarget,

    /// Target once investigation tooling is unlocked.
    #[serde(default = "default_advanced_target")]
    pub advanced: PoolTarget,

    /// Earliest expiry after creation, in virtual minutes.
    #[serde(default = "default_expiry_min_minutes")]
    pub expiry_min_minutes: u32,

    /// Latest expiry after creation, in virtual minutes.
    #[serde(default = "default_expiry_max_minutes")]
    pub expiry_max_minutes: u32,

    /// Virtual minutes a client rests after a finished mission.
    #[serde(default = "default_client_cooldown_minutes")]
    pub client_cooldown_minutes: u32,

    /// Chance per refresh of starting a storyline arc.
    #[serde(default = "default_arc_chance")]
    pub arc_chance: f64,

    /// Reputation tier required before arcs are offered.
    #[serde(default = "default_arc_min_reputation")]
    pub arc_min_reputation: u8,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            standard: default_standard_target(),
            advanced: default_advanced_target(),
            expiry_min_minutes: default_expiry_min_minutes(),
            expiry_max_minutes: default_expiry_max_minutes(),
            client_cooldown_minutes: default_client_cooldown_minutes(),
            arc_chance: default_arc_chance(),
            arc_min_reputation: default_arc_min_reputation(),
        }
    }
}

impl PoolConfig {
    /// The target in force for the player's progression.
    pub const fn target(&self, investigation_unlocked: bool) -> &PoolTarget {
        if investigation_unlocked {
            &self.advanced
        } else {
            &self.standard
        }
    }
}

const fn default_standard_target() -> PoolTarget {
    PoolTarget {
        min: 4,
        max: 6,
        investigation_chance: 0.0,
    }
}

const fn default_advanced_target() -> PoolTarget {
    PoolTarget {
        min: 5,
        max: 8,
        investigation_chance: 0.25,
    }
}

const fn default_expiry_min_minutes() -> u32 {
    30
}

const fn default_expiry_max_minutes() -> u32 {
    90
}

const fn default_client_cooldown_minutes() -> u32 {
    10
}

const fn default_arc_chance() -> f64 {
    0.2
}

const fn default_arc_min_reputation() -> u8 {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoints_are_real_numbers() {
        let config = PoolConfig::default();
        assert!((config.standard.midpoint() - 5.0).abs() < f64::EPSILON);
        assert!((config.advanced.midpoint() - 6.5).abs() < f64::EPSILON);
        assert!(config.advanced.below_midpoint(6));
        assert!(!config.advanced.below_midpoint(7));
        assert!(config.standard.below_midpoint(4));
        assert!(!config.standard.below_midpoint(5));
    }

    #[test]
    fn target_follows_progression() {
        let config = PoolConfig::default();
        assert_eq!(config.target(false).max, 6);
        assert_eq!(config.target(true).max, 8);
    }
}
