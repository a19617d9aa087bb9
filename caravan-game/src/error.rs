use thiserror::Error;

use crate::caravan::CaravanStatus;
use crate::ids::CaravanId;

/// Which catalog table a lookup targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTable {
    Type,
    Route,
}

impl std::fmt::Display for CatalogTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Type => f.write_str("caravan type"),
            Self::Route => f.write_str("caravan route"),
        }
    }
}

/// Errors surfaced by registry operations that return `Result`.
///
/// Business-rule rejections on the boolean operations never reach this type;
/// they are reported as `false` and logged at trace level.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaravanError {
    #[error("unknown {table} id {id}")]
    UnknownReference { table: CatalogTable, id: u32 },
    #[error("caravan {0} not found")]
    NotFound(CaravanId),
    #[error("caravan {id} cannot {action} while {status}")]
    InvalidState {
        id: CaravanId,
        status: CaravanStatus,
        action: &'static str,
    },
}

/// Why a guard, conflict or scheduler precondition rejected a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Current status does not permit the action.
    Status(CaravanStatus),
    /// The caravan owner tried to guard or attack their own caravan.
    OwnerConflict,
    /// The player already holds an active guard slot.
    AlreadyGuarding,
    /// Active guards already equal the caravan's capacity.
    RosterFull,
    /// No active guard entry matched.
    NoActiveGuard,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => write!(f, "status is {status}"),
            Self::OwnerConflict => f.write_str("player owns the caravan"),
            Self::AlreadyGuarding => f.write_str("player is already an active guard"),
            Self::RosterFull => f.write_str("guard roster is full"),
            Self::NoActiveGuard => f.write_str("no matching active guard"),
        }
    }
}

/// Catalog shape problems detected while loading or validating reference data.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("catalog JSON invalid: {0}")]
    Parse(String),
    #[error("duplicate {table} id {id}")]
    DuplicateId { table: CatalogTable, id: u32 },
    #[error("caravan type {id}: speed must be positive")]
    ZeroSpeed { id: u32 },
    #[error("caravan type {id}: min guards {min} exceeds max guards {max}")]
    GuardBounds { id: u32, min: u32, max: u32 },
    #[error("{table} {id}: {field} must be positive (got {value})")]
    NonPositiveFactor {
        table: CatalogTable,
        id: u32,
        field: &'static str,
        value: f64,
    },
    #[error("caravan route {id}: danger level {level} outside 1..=10")]
    DangerLevel { id: u32, level: u8 },
    #[error("catalog has no {table} entries")]
    Empty { table: CatalogTable },
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Errors raised when economy configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("config JSON invalid: {0}")]
    Parse(String),
    #[error("progress step must be within (0, 100] (got {0:.2})")]
    ProgressStep(f64),
    #[error("{field} must be at most {max} basis points (got {value})")]
    BasisPoints {
        field: &'static str,
        max: u32,
        value: u32,
    },
    #[error("destroy grace must not be negative (got {0} ms)")]
    NegativeGrace(i64),
    #[error("destroy grace must be at most {max} ms (got {value} ms)")]
    GraceTooLong { value: i64, max: i64 },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Either half of a bundled catalog + config load failing.
#[derive(Debug, Error, PartialEq)]
pub enum LoadError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
