//! Tunable economy parameters.
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::caravan::Position;
use crate::constants::{
    BPS_DENOM, CARGO_VALUE_BPS, DESTROY_GRACE_MS, GUARD_KARMA_REWARD, GUARD_SHARE_BPS,
    MAX_DESTROY_GRACE_MS, PATH_DESTINATION_X, PATH_DESTINATION_Y, PATH_ORIGIN_X, PATH_ORIGIN_Y,
    PROGRESS_COMPLETE_PERCENT, PROGRESS_STEP_PERCENT,
};
use crate::error::ConfigError;

/// Straight segment a caravan follows in map space; position is interpolated along it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "PathConfig::default_origin")]
    pub origin: Position,
    #[serde(default = "PathConfig::default_destination")]
    pub destination: Position,
}

impl PathConfig {
    const fn default_origin() -> Position {
        Position::new(PATH_ORIGIN_X, PATH_ORIGIN_Y)
    }

    const fn default_destination() -> Position {
        Position::new(PATH_DESTINATION_X, PATH_DESTINATION_Y)
    }

    /// Linear interpolation for a progress percentage in `[0, 100]`.
    #[must_use]
    pub fn position_at(&self, progress_percent: f64) -> Position {
        let t = (progress_percent / PROGRESS_COMPLETE_PERCENT).clamp(0.0, 1.0);
        Position::new(
            (self.destination.x - self.origin.x).mul_add(t, self.origin.x),
            (self.destination.y - self.origin.y).mul_add(t, self.origin.y),
        )
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            origin: Self::default_origin(),
            destination: Self::default_destination(),
        }
    }
}

/// Economy-wide knobs shared by every caravan in a registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Percentage points added per scheduler tick.
    #[serde(default = "EconomyConfig::default_progress_step")]
    pub progress_step: f64,
    /// Cargo value as a basis-point multiple of the investment.
    #[serde(default = "EconomyConfig::default_cargo_value_bps")]
    pub cargo_value_bps: u32,
    /// Flat share each guard is promised at enlistment.
    #[serde(default = "EconomyConfig::default_guard_share_bps")]
    pub guard_share_bps: u32,
    #[serde(default = "EconomyConfig::default_guard_karma")]
    pub guard_karma: u32,
    /// Delay between a caravan being destroyed and its removal.
    #[serde(default = "EconomyConfig::default_destroy_grace_ms")]
    pub destroy_grace_ms: i64,
    #[serde(default)]
    pub path: PathConfig,
}

impl EconomyConfig {
    const fn default_progress_step() -> f64 {
        PROGRESS_STEP_PERCENT
    }

    const fn default_cargo_value_bps() -> u32 {
        CARGO_VALUE_BPS
    }

    const fn default_guard_share_bps() -> u32 {
        GUARD_SHARE_BPS
    }

    const fn default_guard_karma() -> u32 {
        GUARD_KARMA_REWARD
    }

    const fn default_destroy_grace_ms() -> i64 {
        DESTROY_GRACE_MS
    }

    /// Load configuration from a JSON document, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the values fail validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.progress_step > 0.0 && self.progress_step <= PROGRESS_COMPLETE_PERCENT) {
            return Err(ConfigError::ProgressStep(self.progress_step));
        }
        if self.guard_share_bps > BPS_DENOM {
            return Err(ConfigError::BasisPoints {
                field: "guard_share_bps",
                max: BPS_DENOM,
                value: self.guard_share_bps,
            });
        }
        if self.destroy_grace_ms < 0 {
            return Err(ConfigError::NegativeGrace(self.destroy_grace_ms));
        }
        if self.destroy_grace_ms > MAX_DESTROY_GRACE_MS {
            return Err(ConfigError::GraceTooLong {
                value: self.destroy_grace_ms,
                max: MAX_DESTROY_GRACE_MS,
            });
        }
        Ok(())
    }

    /// Grace window, clamped to the accepted range even for unvalidated configs.
    #[must_use]
    pub fn destroy_grace(&self) -> TimeDelta {
        let millis = self.destroy_grace_ms.clamp(0, MAX_DESTROY_GRACE_MS);
        TimeDelta::try_milliseconds(millis).unwrap_or_else(TimeDelta::zero)
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            progress_step: Self::default_progress_step(),
            cargo_value_bps: Self::default_cargo_value_bps(),
            guard_share_bps: Self::default_guard_share_bps(),
            guard_karma: Self::default_guard_karma(),
            destroy_grace_ms: Self::default_destroy_grace_ms(),
            path: PathConfig::default(),
        }
    }
}
