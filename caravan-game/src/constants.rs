//! Centralized balance and tuning constants for the caravan economy.
//!
//! These are the reference values behind `EconomyConfig::default()`. Keeping
//! them together means the economy can only drift through reviewed code
//! changes, while deployments still override them through JSON config.

// Money ---------------------------------------------------------------------
/// Basis-point denominator used for every share and factor.
pub const BPS_DENOM: u32 = 10_000;
/// Cargo value is 1.5x the owner's investment.
pub const CARGO_VALUE_BPS: u32 = 15_000;
/// Flat reward share granted to each active guard (10%).
pub const GUARD_SHARE_BPS: u32 = 1_000;
/// Karma granted to each active guard on arrival.
pub const GUARD_KARMA_REWARD: u32 = 20;

// Travel --------------------------------------------------------------------
/// Percentage points a traveling caravan advances per scheduler tick.
pub const PROGRESS_STEP_PERCENT: f64 = 2.0;
pub const PROGRESS_COMPLETE_PERCENT: f64 = 100.0;
/// Speed rating that maps to the route's listed duration.
pub const REFERENCE_SPEED: f64 = 10.0;

// Map path (presentation space) -------------------------------------------
pub const PATH_ORIGIN_X: f64 = 10.0;
pub const PATH_ORIGIN_Y: f64 = 50.0;
pub const PATH_DESTINATION_X: f64 = 90.0;
pub const PATH_DESTINATION_Y: f64 = 50.0;

// Conflict ------------------------------------------------------------------
/// Window between a caravan being looted and its removal from the registry.
pub const DESTROY_GRACE_MS: i64 = 3_000;
/// Longest accepted grace window (one day).
pub const MAX_DESTROY_GRACE_MS: i64 = 86_400_000;

// Catalog bounds ------------------------------------------------------------
pub const DANGER_LEVEL_MIN: u8 = 1;
pub const DANGER_LEVEL_MAX: u8 = 10;
pub const DANGER_LOW_MAX: u8 = 3;
pub const DANGER_MEDIUM_MAX: u8 = 6;

// Logging targets -----------------------------------------------------------
pub(crate) const LOG_TARGET_REGISTRY: &str = "caravan::registry";
pub(crate) const LOG_TARGET_ROSTER: &str = "caravan::roster";
pub(crate) const LOG_TARGET_CONFLICT: &str = "caravan::conflict";
pub(crate) const LOG_TARGET_SCHEDULER: &str = "caravan::scheduler";
pub(crate) const LOG_TARGET_REWARD: &str = "caravan::reward";
