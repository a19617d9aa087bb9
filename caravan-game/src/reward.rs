//! Reward engine: splits an arrived caravan's payout between owner and guards.
//!
//! The engine only computes the distribution. Crediting wallets and
//! reputation is the caller's job (see [`crate::ledger::settle`]), so the
//! split can be recomputed from a snapshot and retried safely.
use log::info;
use serde::{Deserialize, Serialize};

use crate::caravan::{Caravan, CaravanStatus};
use crate::constants::{BPS_DENOM, LOG_TARGET_REWARD};
use crate::error::CaravanError;
use crate::ids::{CaravanId, PlayerId};
use crate::numbers::apply_bps;
use crate::registry::CaravanRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Gold,
    Karma,
}

/// One line of a payout: who gets how much of what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardGrant {
    pub recipient_id: PlayerId,
    pub recipient_name: String,
    pub kind: RewardKind,
    /// Signed: with more than ten guards the owner's share goes negative.
    pub amount: i64,
}

/// Owner's share in basis points: what is left after every active guard's cut.
#[must_use]
pub fn owner_share_bps(caravan: &Caravan) -> i64 {
    let guard_total: i64 = caravan
        .active_guards()
        .map(|guard| i64::from(guard.share_bps))
        .sum();
    i64::from(BPS_DENOM) - guard_total
}

/// Compute the payout for `caravan` as data.
///
/// Owner gold comes first, then one gold line per active guard, then one
/// karma line per active guard. Guards who left or died receive nothing.
#[must_use]
pub fn distribution(caravan: &Caravan, guard_karma: u32) -> Vec<RewardGrant> {
    let pot = caravan.potential_reward;
    let mut grants = Vec::with_capacity(1 + 2 * caravan.guards.len());
    grants.push(RewardGrant {
        recipient_id: caravan.owner.id.clone(),
        recipient_name: caravan.owner.name.clone(),
        kind: RewardKind::Gold,
        amount: apply_bps(pot, owner_share_bps(caravan)),
    });
    grants.extend(caravan.active_guards().map(|guard| RewardGrant {
        recipient_id: guard.player_id.clone(),
        recipient_name: guard.name.clone(),
        kind: RewardKind::Gold,
        amount: apply_bps(pot, i64::from(guard.share_bps)),
    }));
    grants.extend(caravan.active_guards().map(|guard| RewardGrant {
        recipient_id: guard.player_id.clone(),
        recipient_name: guard.name.clone(),
        kind: RewardKind::Karma,
        amount: i64::from(guard_karma),
    }));
    grants
}

/// Total of one reward channel across a distribution.
#[must_use]
pub fn total_of(grants: &[RewardGrant], kind: RewardKind) -> i64 {
    grants
        .iter()
        .filter(|grant| grant.kind == kind)
        .map(|grant| grant.amount)
        .sum()
}

impl CaravanRegistry {
    /// Pay out an arrived caravan and remove it from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`CaravanError::NotFound`] if the caravan is gone (including a
    /// second `complete` on the same id) and [`CaravanError::InvalidState`]
    /// if it has not arrived; in the latter case nothing changes.
    pub fn complete(&self, caravan_id: CaravanId) -> Result<Vec<RewardGrant>, CaravanError> {
        let karma = self.config().guard_karma;
        let mut caravans = self.write();
        let index = caravans
            .iter()
            .position(|caravan| caravan.id == caravan_id)
            .ok_or(CaravanError::NotFound(caravan_id))?;
        let status = caravans[index].status;
        if status != CaravanStatus::Arrived {
            return Err(CaravanError::InvalidState {
                id: caravan_id,
                status,
                action: "complete",
            });
        }
        let caravan = caravans.remove(index);
        drop(caravans);

        let grants = distribution(&caravan, karma);
        info!(
            target: LOG_TARGET_REWARD,
            "caravan {caravan_id} completed: {} gold across {} recipients",
            total_of(&grants, RewardKind::Gold),
            grants.iter().filter(|g| g.kind == RewardKind::Gold).count()
        );
        Ok(grants)
    }
}
