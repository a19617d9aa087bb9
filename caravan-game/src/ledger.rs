//! Wallet and reputation collaborators.
//!
//! The registry never touches balances. Callers debit the owner before a
//! caravan exists and settle reward distributions after `complete` commits.
use std::collections::HashMap;
use thiserror::Error;

use crate::caravan::{Caravan, Owner};
use crate::ids::PlayerId;
use crate::registry::CaravanRegistry;
use crate::reward::{RewardGrant, RewardKind};

/// Gold balances held outside the caravan system.
pub trait Wallet {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Withdraw `amount` gold from `player`.
    ///
    /// # Errors
    ///
    /// Returns an error if the player cannot cover the amount.
    fn debit(&mut self, player: &PlayerId, amount: u64) -> Result<(), Self::Error>;

    /// Deposit `amount` gold (may be negative) to `player`.
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet backend rejects the transfer.
    fn credit(&mut self, player: &PlayerId, amount: i64) -> Result<(), Self::Error>;
}

/// Karma / reputation standings held outside the caravan system.
pub trait ReputationLedger {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Add `amount` karma to `player`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reputation backend rejects the grant.
    fn grant_karma(&mut self, player: &PlayerId, amount: i64) -> Result<(), Self::Error>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{player} needs {needed} gold but holds {available}")]
    InsufficientFunds {
        player: PlayerId,
        needed: u64,
        available: i64,
    },
}

/// Apply a reward distribution to the external ledgers.
///
/// Each grant is applied independently; a failure stops at that grant and
/// the distribution can be replayed from the caravan snapshot.
///
/// # Errors
///
/// Returns the first wallet or reputation failure.
pub fn settle<W, R>(grants: &[RewardGrant], wallet: &mut W, reputation: &mut R) -> anyhow::Result<()>
where
    W: Wallet,
    R: ReputationLedger,
{
    for grant in grants {
        match grant.kind {
            RewardKind::Gold => wallet
                .credit(&grant.recipient_id, grant.amount)
                .map_err(anyhow::Error::from)?,
            RewardKind::Karma => reputation
                .grant_karma(&grant.recipient_id, grant.amount)
                .map_err(anyhow::Error::from)?,
        }
    }
    Ok(())
}

/// Quote, debit the owner's full cost, then create the caravan.
///
/// The debit happens first so a caravan never exists unpaid; if creation
/// then fails the debit is refunded.
///
/// # Errors
///
/// Returns an error for unknown catalog ids or when the owner cannot pay.
pub fn fund_and_create<W: Wallet>(
    registry: &CaravanRegistry,
    wallet: &mut W,
    owner: Owner,
    type_id: u32,
    route_id: u32,
    investment: u64,
) -> anyhow::Result<Caravan> {
    let quote = registry.quote(type_id, route_id, investment)?;
    let owner_id = owner.id.clone();
    wallet.debit(&owner_id, quote.total_cost)?;
    match registry.create(owner, type_id, route_id, investment) {
        Ok(caravan) => Ok(caravan),
        Err(err) => {
            let refund = i64::try_from(quote.total_cost).unwrap_or(i64::MAX);
            wallet.credit(&owner_id, refund)?;
            Err(err.into())
        }
    }
}

/// In-memory wallet and reputation store used by simulations and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryLedger {
    gold: HashMap<PlayerId, i64>,
    karma: HashMap<PlayerId, i64>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fund(&mut self, player: &PlayerId, amount: i64) {
        *self.gold.entry(player.clone()).or_default() += amount;
    }

    #[must_use]
    pub fn gold(&self, player: &PlayerId) -> i64 {
        self.gold.get(player).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn karma(&self, player: &PlayerId) -> i64 {
        self.karma.get(player).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn total_gold(&self) -> i64 {
        self.gold.values().sum()
    }
}

impl Wallet for MemoryLedger {
    type Error = LedgerError;

    fn debit(&mut self, player: &PlayerId, amount: u64) -> Result<(), Self::Error> {
        let available = self.gold(player);
        let needed = i64::try_from(amount).unwrap_or(i64::MAX);
        if available < needed {
            return Err(LedgerError::InsufficientFunds {
                player: player.clone(),
                needed: amount,
                available,
            });
        }
        self.fund(player, -needed);
        Ok(())
    }

    fn credit(&mut self, player: &PlayerId, amount: i64) -> Result<(), Self::Error> {
        self.fund(player, amount);
        Ok(())
    }
}

impl ReputationLedger for MemoryLedger {
    type Error = LedgerError;

    fn grant_karma(&mut self, player: &PlayerId, amount: i64) -> Result<(), Self::Error> {
        *self.karma.entry(player.clone()).or_default() += amount;
        Ok(())
    }
}
