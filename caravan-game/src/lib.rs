//! Caravan Economy Engine
//!
//! Platform-agnostic trade caravan logic: owners fund caravans, guards enlist
//! for a share of the payout, raiders interrupt travel, and an externally
//! clocked scheduler moves everything along a route. No transport, storage
//! or UI concerns live here.

pub mod caravan;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod conflict;
pub mod constants;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod numbers;
pub mod registry;
pub mod reward;
pub mod roster;
pub mod scheduler;

use std::sync::Arc;

// Re-export commonly used types
pub use caravan::{
    Caravan, CaravanStatus, Guard, GuardCandidate, GuardRoster, GuardStatus, Owner, Position,
};
pub use catalog::{CaravanRoute, CaravanType, Catalog, DangerTier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EconomyConfig, PathConfig};
pub use conflict::RaidOutcome;
pub use error::{CaravanError, CatalogError, CatalogTable, ConfigError, LoadError, Rejection};
pub use ids::{CaravanId, GuardId, IdSource, PlayerId};
pub use ledger::{LedgerError, MemoryLedger, ReputationLedger, Wallet, fund_and_create, settle};
pub use registry::{CaravanQuote, CaravanRegistry};
pub use reward::{RewardGrant, RewardKind, distribution, owner_share_bps};
pub use scheduler::TickReport;

/// Source of reference data and tuning for a registry.
///
/// Hosts supply their own implementation (files, a database, a remote
/// config service); [`StaticLoader`] serves the data compiled into this crate.
pub trait CatalogLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the caravan type and route catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or fails validation.
    fn load_catalog(&self) -> Result<Catalog, Self::Error>;

    /// Load economy tuning
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read or fails validation.
    fn load_config(&self) -> Result<EconomyConfig, Self::Error>;
}

/// Loader backed by the data compiled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLoader;

impl StaticLoader {
    /// The embedded catalog degrades to empty if it fails to parse; refuse to serve that.
    fn checked(catalog: &Catalog) -> Result<Catalog, LoadError> {
        catalog.validate()?;
        Ok(catalog.clone())
    }
}

impl CatalogLoader for StaticLoader {
    type Error = LoadError;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        Self::checked(Catalog::reference())
    }

    fn load_config(&self) -> Result<EconomyConfig, Self::Error> {
        Ok(EconomyConfig::default())
    }
}

impl CaravanRegistry {
    /// Build a registry from whatever source `loader` wraps.
    ///
    /// # Errors
    ///
    /// Returns the loader's error if either the catalog or config is unusable.
    pub fn from_loader<L: CatalogLoader>(
        loader: &L,
        clock: Arc<dyn Clock>,
        ids: IdSource,
    ) -> Result<Self, L::Error> {
        let catalog = loader.load_catalog()?;
        let config = loader.load_config()?;
        log::debug!(
            "registry loaded {} caravan types and {} routes",
            catalog.types().len(),
            catalog.routes().len()
        );
        Ok(Self::new(Arc::new(catalog), config, clock, ids))
    }
}
