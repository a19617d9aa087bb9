//! Caravan registry: the shared store every actor mutates through.
//!
//! All state lives behind one `RwLock`. Each mutation is a single
//! write-locked check-and-mutate, so concurrent callers observe either the
//! state before or after it and never a partial update. Reads clone the
//! caravans they return.
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::caravan::{Caravan, CaravanStatus, GuardRoster, Owner};
use crate::catalog::{CaravanRoute, CaravanType, Catalog};
use crate::clock::{Clock, SystemClock};
use crate::config::EconomyConfig;
use crate::constants::LOG_TARGET_REGISTRY;
use crate::error::CaravanError;
use crate::ids::{CaravanId, IdSource, PlayerId};
use crate::numbers::{apply_bps_unsigned, floor_f64_to_u64, round_f64_to_i64, u64_to_f64};

/// Up-front numbers for a prospective caravan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaravanQuote {
    pub investment: u64,
    /// `base_cost + investment`; what the owner's wallet must cover.
    pub total_cost: u64,
    pub cargo_value: u64,
    pub potential_reward: u64,
    /// Whole minutes from departure to arrival.
    pub estimated_minutes: u64,
}

impl CaravanQuote {
    /// Price a caravan of `caravan_type` on `route` with `investment` extra gold.
    #[must_use]
    pub fn compute(
        caravan_type: &CaravanType,
        route: &CaravanRoute,
        investment: u64,
        config: &EconomyConfig,
    ) -> Self {
        let cargo_value = apply_bps_unsigned(investment, config.cargo_value_bps);
        let potential_reward = floor_f64_to_u64(
            u64_to_f64(cargo_value) * caravan_type.reward_multiplier * route.reward_bonus,
        );
        Self {
            investment,
            total_cost: caravan_type.base_cost.saturating_add(investment),
            cargo_value,
            potential_reward,
            estimated_minutes: floor_f64_to_u64(caravan_type.travel_minutes(route)),
        }
    }
}

/// Live caravans plus the collaborators needed to mutate them.
#[derive(Debug)]
pub struct CaravanRegistry {
    catalog: Arc<Catalog>,
    config: EconomyConfig,
    clock: Arc<dyn Clock>,
    ids: IdSource,
    caravans: RwLock<Vec<Caravan>>,
}

impl CaravanRegistry {
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        config: EconomyConfig,
        clock: Arc<dyn Clock>,
        ids: IdSource,
    ) -> Self {
        Self {
            catalog,
            config,
            clock,
            ids,
            caravans: RwLock::new(Vec::new()),
        }
    }

    /// Registry over the reference catalog, default config and system time.
    #[must_use]
    pub fn with_reference_catalog() -> Self {
        Self::new(
            Arc::new(Catalog::reference().clone()),
            EconomyConfig::default(),
            Arc::new(SystemClock),
            IdSource::from_entropy(),
        )
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) const fn ids(&self) -> &IdSource {
        &self.ids
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<Caravan>> {
        self.caravans.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Vec<Caravan>> {
        self.caravans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against one caravan under the write lock.
    pub(crate) fn with_caravan_mut<R>(
        &self,
        id: CaravanId,
        f: impl FnOnce(&mut Caravan) -> R,
    ) -> Option<R> {
        let mut caravans = self.write();
        caravans.iter_mut().find(|caravan| caravan.id == id).map(f)
    }

    /// Preview cost, cargo value, reward and travel time without creating anything.
    ///
    /// # Errors
    ///
    /// Returns [`CaravanError::UnknownReference`] if the type or route is not in the catalog.
    pub fn quote(
        &self,
        type_id: u32,
        route_id: u32,
        investment: u64,
    ) -> Result<CaravanQuote, CaravanError> {
        let caravan_type = self.catalog.type_by_id(type_id)?;
        let route = self.catalog.route_by_id(route_id)?;
        Ok(CaravanQuote::compute(
            caravan_type,
            route,
            investment,
            &self.config,
        ))
    }

    /// Create a caravan in `preparing` owned by `owner`.
    ///
    /// The caller is responsible for debiting `total_cost` from the owner's wallet.
    ///
    /// # Errors
    ///
    /// Returns [`CaravanError::UnknownReference`] if the type or route is not in the catalog.
    pub fn create(
        &self,
        owner: Owner,
        type_id: u32,
        route_id: u32,
        investment: u64,
    ) -> Result<Caravan, CaravanError> {
        let caravan_type = self.catalog.type_by_id(type_id)?.clone();
        let route = self.catalog.route_by_id(route_id)?.clone();
        let quote = CaravanQuote::compute(&caravan_type, &route, investment, &self.config);

        let caravan = Caravan {
            id: self.ids.caravan_id(),
            owner,
            max_guards: caravan_type.max_guards,
            caravan_type,
            route,
            status: CaravanStatus::Preparing,
            progress_percent: 0.0,
            position: self.config.path.position_at(0.0),
            investment,
            total_cost: quote.total_cost,
            cargo_value: quote.cargo_value,
            potential_reward: quote.potential_reward,
            guards: GuardRoster::new(),
            created_at: self.now(),
            started_at: None,
            estimated_arrival: None,
            is_under_attack: false,
            times_attacked: 0,
            last_attacker: None,
            remove_after: None,
        };

        debug!(
            target: LOG_TARGET_REGISTRY,
            "caravan {} created by {} (type {}, route {}, reward {})",
            caravan.id,
            caravan.owner.id,
            type_id,
            route_id,
            caravan.potential_reward
        );
        self.write().push(caravan.clone());
        Ok(caravan)
    }

    /// Depart: `preparing` -> `traveling`. Any other status is a no-op returning `false`.
    pub fn start(&self, id: CaravanId) -> bool {
        let now = self.now();
        let started = self.with_caravan_mut(id, |caravan| {
            if caravan.status != CaravanStatus::Preparing {
                trace!(
                    target: LOG_TARGET_REGISTRY,
                    "start rejected for {id}: status is {}",
                    caravan.status
                );
                return false;
            }
            caravan.transition(CaravanStatus::Traveling);
            let travel_ms = round_f64_to_i64(
                caravan.caravan_type.travel_minutes(&caravan.route) * 60_000.0,
            );
            caravan.started_at = Some(now);
            caravan.estimated_arrival = TimeDelta::try_milliseconds(travel_ms)
                .and_then(|travel| now.checked_add_signed(travel));
            true
        });
        if started == Some(true) {
            debug!(target: LOG_TARGET_REGISTRY, "caravan {id} departed");
        }
        started.unwrap_or(false)
    }

    #[must_use]
    pub fn get(&self, id: CaravanId) -> Option<Caravan> {
        self.read().iter().find(|caravan| caravan.id == id).cloned()
    }

    /// Every live caravan, in creation order.
    #[must_use]
    pub fn list(&self) -> Vec<Caravan> {
        self.read().clone()
    }

    /// Caravans still in play: preparing, traveling or under attack.
    #[must_use]
    pub fn active_list(&self) -> Vec<Caravan> {
        self.read()
            .iter()
            .filter(|caravan| caravan.status.is_active())
            .cloned()
            .collect()
    }

    /// The most recent live caravan owned by `player`.
    #[must_use]
    pub fn owned_by(&self, player: &PlayerId) -> Option<Caravan> {
        self.read()
            .iter()
            .rev()
            .find(|caravan| caravan.is_owned_by(player))
            .cloned()
    }

    /// The live caravan `player` is actively guarding, if any.
    #[must_use]
    pub fn guarded_by(&self, player: &PlayerId) -> Option<Caravan> {
        self.read()
            .iter()
            .find(|caravan| caravan.is_guarded_by(player))
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
