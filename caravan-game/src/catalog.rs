//! Immutable caravan reference data: types and routes.
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::{
    DANGER_LEVEL_MAX, DANGER_LEVEL_MIN, DANGER_LOW_MAX, DANGER_MEDIUM_MAX, REFERENCE_SPEED,
};
use crate::error::{CaravanError, CatalogError, CatalogTable};

const REFERENCE_CATALOG_JSON: &str = include_str!("../assets/data/caravans.json");

static REFERENCE_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::from_json(REFERENCE_CATALOG_JSON).unwrap_or_else(|err| {
        log::error!("embedded caravan catalog rejected: {err}");
        Catalog::empty()
    })
});

/// A class of caravan: how much it carries, how fast it moves and how many guards it admits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaravanType {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub capacity: u32,
    /// Relative speed; 10 covers a route in exactly its listed minutes.
    pub speed: u32,
    pub base_cost: u64,
    #[serde(default)]
    pub min_guards: u32,
    pub max_guards: u32,
    pub reward_multiplier: f64,
}

impl CaravanType {
    /// Travel time on `route` in (fractional) minutes.
    #[must_use]
    pub fn travel_minutes(&self, route: &CaravanRoute) -> f64 {
        f64::from(route.estimated_minutes) * (REFERENCE_SPEED / f64::from(self.speed.max(1)))
    }
}

/// A road between two cities with its danger rating and payout bonus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaravanRoute {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub start_city: String,
    #[serde(default)]
    pub end_city: String,
    pub distance: u32,
    pub danger_level: u8,
    pub estimated_minutes: u32,
    pub reward_bonus: f64,
}

impl CaravanRoute {
    #[must_use]
    pub const fn danger_tier(&self) -> DangerTier {
        DangerTier::from_level(self.danger_level)
    }
}

/// Coarse bucket of a route's danger level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerTier {
    Low,
    Medium,
    High,
}

impl DangerTier {
    #[must_use]
    pub const fn from_level(level: u8) -> Self {
        if level <= DANGER_LOW_MAX {
            Self::Low
        } else if level <= DANGER_MEDIUM_MAX {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// Full set of caravan types and routes, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    types: Vec<CaravanType>,
    #[serde(default)]
    routes: Vec<CaravanRoute>,
}

impl Catalog {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from explicit entries.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry violates the catalog invariants.
    pub fn new(types: Vec<CaravanType>, routes: Vec<CaravanRoute>) -> Result<Self, CatalogError> {
        let catalog = Self { types, routes };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from a JSON document with `types` and `routes` arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The reference deployment catalog (four types, four routes).
    #[must_use]
    pub fn reference() -> &'static Self {
        &REFERENCE_CATALOG
    }

    /// Resolve a caravan type by id.
    ///
    /// # Errors
    ///
    /// Returns [`CaravanError::UnknownReference`] if no type has this id.
    pub fn type_by_id(&self, id: u32) -> Result<&CaravanType, CaravanError> {
        self.types
            .iter()
            .find(|ty| ty.id == id)
            .ok_or(CaravanError::UnknownReference {
                table: CatalogTable::Type,
                id,
            })
    }

    /// Resolve a caravan route by id.
    ///
    /// # Errors
    ///
    /// Returns [`CaravanError::UnknownReference`] if no route has this id.
    pub fn route_by_id(&self, id: u32) -> Result<&CaravanRoute, CaravanError> {
        self.routes
            .iter()
            .find(|route| route.id == id)
            .ok_or(CaravanError::UnknownReference {
                table: CatalogTable::Route,
                id,
            })
    }

    #[must_use]
    pub fn types(&self) -> &[CaravanType] {
        &self.types
    }

    #[must_use]
    pub fn routes(&self) -> &[CaravanRoute] {
        &self.routes
    }

    /// Check both tables are populated, ids are unique and every entry is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.types.is_empty() {
            return Err(CatalogError::Empty {
                table: CatalogTable::Type,
            });
        }
        if self.routes.is_empty() {
            return Err(CatalogError::Empty {
                table: CatalogTable::Route,
            });
        }
        let mut seen = HashSet::new();
        for ty in &self.types {
            if !seen.insert(ty.id) {
                return Err(CatalogError::DuplicateId {
                    table: CatalogTable::Type,
                    id: ty.id,
                });
            }
            if ty.speed == 0 {
                return Err(CatalogError::ZeroSpeed { id: ty.id });
            }
            if ty.min_guards > ty.max_guards {
                return Err(CatalogError::GuardBounds {
                    id: ty.id,
                    min: ty.min_guards,
                    max: ty.max_guards,
                });
            }
            if ty.reward_multiplier.is_nan() || ty.reward_multiplier <= 0.0 {
                return Err(CatalogError::NonPositiveFactor {
                    table: CatalogTable::Type,
                    id: ty.id,
                    field: "reward_multiplier",
                    value: ty.reward_multiplier,
                });
            }
        }

        seen.clear();
        for route in &self.routes {
            if !seen.insert(route.id) {
                return Err(CatalogError::DuplicateId {
                    table: CatalogTable::Route,
                    id: route.id,
                });
            }
            if !(DANGER_LEVEL_MIN..=DANGER_LEVEL_MAX).contains(&route.danger_level) {
                return Err(CatalogError::DangerLevel {
                    id: route.id,
                    level: route.danger_level,
                });
            }
            if route.reward_bonus.is_nan() || route.reward_bonus <= 0.0 {
                return Err(CatalogError::NonPositiveFactor {
                    table: CatalogTable::Route,
                    id: route.id,
                    field: "reward_bonus",
                    value: route.reward_bonus,
                });
            }
        }
        Ok(())
    }
}
