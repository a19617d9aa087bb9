//! Raids on traveling caravans.
//!
//! `attack` only flags the caravan. The combat itself is fought elsewhere and
//! reported back through `end_attack`.
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::caravan::{Caravan, CaravanStatus};
use crate::constants::LOG_TARGET_CONFLICT;
use crate::error::Rejection;
use crate::ids::{CaravanId, PlayerId};
use crate::registry::CaravanRegistry;

/// How a raid ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaidOutcome {
    /// Defenders held; the caravan is back on the road.
    Repelled,
    /// Attackers won; the caravan is destroyed and awaits removal.
    Looted,
}

/// Flag a traveling caravan as under attack.
///
/// # Errors
///
/// Returns the failed precondition; the caravan is left untouched.
pub fn begin_raid(caravan: &mut Caravan, attacker: &PlayerId) -> Result<(), Rejection> {
    if caravan.is_owned_by(attacker) {
        return Err(Rejection::OwnerConflict);
    }
    if !caravan.transition(CaravanStatus::UnderAttack) {
        return Err(Rejection::Status(caravan.status));
    }
    caravan.is_under_attack = true;
    caravan.times_attacked = caravan.times_attacked.saturating_add(1);
    caravan.last_attacker = Some(attacker.clone());
    Ok(())
}

/// Apply the combat verdict to a caravan under attack.
///
/// # Errors
///
/// Returns [`Rejection::Status`] if the caravan is not under attack.
pub fn resolve_raid(
    caravan: &mut Caravan,
    attacker_won: bool,
    now: DateTime<Utc>,
    grace: TimeDelta,
) -> Result<RaidOutcome, Rejection> {
    if caravan.status != CaravanStatus::UnderAttack {
        return Err(Rejection::Status(caravan.status));
    }
    caravan.is_under_attack = false;
    if attacker_won {
        caravan.transition(CaravanStatus::Destroyed);
        caravan.remove_after = Some(now.checked_add_signed(grace).unwrap_or(now));
        Ok(RaidOutcome::Looted)
    } else {
        caravan.transition(CaravanStatus::Traveling);
        Ok(RaidOutcome::Repelled)
    }
}

impl CaravanRegistry {
    /// Strike a traveling caravan.
    ///
    /// This is a compare-and-swap on status: of several concurrent attackers
    /// exactly one moves the caravan to `under_attack`; the rest see the new
    /// status and get `false`.
    pub fn attack(&self, caravan_id: CaravanId, attacker: &PlayerId) -> bool {
        let outcome = self.with_caravan_mut(caravan_id, |caravan| begin_raid(caravan, attacker));
        match outcome {
            Some(Ok(())) => {
                debug!(target: LOG_TARGET_CONFLICT, "{attacker} attacks caravan {caravan_id}");
                true
            }
            Some(Err(reason)) => {
                trace!(target: LOG_TARGET_CONFLICT, "{attacker} cannot attack {caravan_id}: {reason}");
                false
            }
            None => false,
        }
    }

    /// Feed back the combat verdict. No-op unless the caravan is under attack.
    ///
    /// A looted caravan turns `destroyed` and stays visible for the configured
    /// grace period; the scheduler removes it on the first tick after that.
    pub fn end_attack(&self, caravan_id: CaravanId, attacker_won: bool) -> Option<RaidOutcome> {
        let now = self.now();
        let grace = self.config().destroy_grace();
        let outcome = self
            .with_caravan_mut(caravan_id, |caravan| {
                resolve_raid(caravan, attacker_won, now, grace)
            })?
            .map_err(|reason| {
                trace!(target: LOG_TARGET_CONFLICT, "end_attack ignored for {caravan_id}: {reason}");
            })
            .ok()?;
        match outcome {
            RaidOutcome::Looted => info!(target: LOG_TARGET_CONFLICT, "caravan {caravan_id} was looted"),
            RaidOutcome::Repelled => debug!(target: LOG_TARGET_CONFLICT, "raid on caravan {caravan_id} repelled"),
        }
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caravan::{GuardCandidate, Owner};
    use crate::catalog::Catalog;
    use crate::clock::{Clock, ManualClock};
    use crate::config::EconomyConfig;
    use crate::ids::IdSource;
    use std::sync::Arc;

    fn traveling() -> (CaravanRegistry, Arc<ManualClock>, CaravanId) {
        let clock = Arc::new(ManualClock::at_epoch());
        let registry = CaravanRegistry::new(
            Arc::new(Catalog::reference().clone()),
            EconomyConfig::default(),
            clock.clone(),
            IdSource::seeded(3),
        );
        let caravan = registry
            .create(Owner::new("owner", "Owner", 9), 2, 3, 2_000)
            .unwrap();
        assert!(registry.start(caravan.id));
        (registry, clock, caravan.id)
    }

    #[test]
    fn attack_requires_traveling() {
        let clock = Arc::new(ManualClock::at_epoch());
        let registry = CaravanRegistry::new(
            Arc::new(Catalog::reference().clone()),
            EconomyConfig::default(),
            clock,
            IdSource::seeded(3),
        );
        let caravan = registry
            .create(Owner::new("owner", "Owner", 9), 2, 3, 2_000)
            .unwrap();
        assert!(!registry.attack(caravan.id, &PlayerId::from("raider")));
        assert_eq!(
            registry.get(caravan.id).unwrap().status,
            CaravanStatus::Preparing
        );
    }

    #[test]
    fn second_attacker_sees_flag_and_fails() {
        let (registry, _, id) = traveling();
        assert!(registry.attack(id, &PlayerId::from("raider-1")));
        assert!(!registry.attack(id, &PlayerId::from("raider-2")));
        let caravan = registry.get(id).unwrap();
        assert_eq!(caravan.status, CaravanStatus::UnderAttack);
        assert!(caravan.is_under_attack);
        assert_eq!(caravan.times_attacked, 1);
        assert_eq!(caravan.last_attacker, Some(PlayerId::from("raider-1")));
    }

    #[test]
    fn owner_cannot_raid_own_caravan() {
        let (registry, _, id) = traveling();
        assert!(!registry.attack(id, &PlayerId::from("owner")));
        assert_eq!(registry.get(id).unwrap().times_attacked, 0);
    }

    #[test]
    fn repelled_raid_resumes_travel_and_keeps_guards() {
        let (registry, _, id) = traveling();
        assert!(registry.join_as_guard(id, GuardCandidate::new("g1", "G1", 3, "archer")));
        assert!(registry.attack(id, &PlayerId::from("raider")));
        let before = registry.get(id).unwrap().guards;

        assert_eq!(registry.end_attack(id, false), Some(RaidOutcome::Repelled));
        let caravan = registry.get(id).unwrap();
        assert_eq!(caravan.status, CaravanStatus::Traveling);
        assert!(!caravan.is_under_attack);
        assert_eq!(caravan.times_attacked, 1);
        assert_eq!(caravan.guards, before);

        assert!(registry.attack(id, &PlayerId::from("raider")));
        assert_eq!(registry.get(id).unwrap().times_attacked, 2);
    }

    #[test]
    fn looted_raid_destroys_with_expiry() {
        let (registry, clock, id) = traveling();
        assert!(registry.attack(id, &PlayerId::from("raider")));
        assert_eq!(registry.end_attack(id, true), Some(RaidOutcome::Looted));

        let caravan = registry.get(id).unwrap();
        assert_eq!(caravan.status, CaravanStatus::Destroyed);
        assert_eq!(
            caravan.remove_after,
            Some(clock.now() + TimeDelta::seconds(3))
        );
        assert!(registry.active_list().is_empty());
        assert_eq!(registry.list().len(), 1, "stays listed during grace period");
    }

    #[test]
    fn oversized_grace_still_schedules_removal() {
        let clock = Arc::new(ManualClock::new(DateTime::<Utc>::MAX_UTC - TimeDelta::hours(1)));
        let registry = CaravanRegistry::new(
            Arc::new(Catalog::reference().clone()),
            EconomyConfig {
                destroy_grace_ms: i64::MAX,
                ..EconomyConfig::default()
            },
            clock.clone(),
            IdSource::seeded(4),
        );
        let caravan = registry
            .create(Owner::new("owner", "Owner", 9), 1, 1, 100)
            .unwrap();
        assert!(registry.start(caravan.id));
        assert!(registry.attack(caravan.id, &PlayerId::from("raider")));
        assert_eq!(registry.end_attack(caravan.id, true), Some(RaidOutcome::Looted));

        let destroyed = registry.get(caravan.id).unwrap();
        assert_eq!(destroyed.status, CaravanStatus::Destroyed);
        assert_eq!(destroyed.remove_after, Some(clock.now()));
        assert_eq!(registry.tick().expired, vec![caravan.id]);
    }

    #[test]
    fn end_attack_outside_raid_is_ignored() {
        let (registry, _, id) = traveling();
        assert_eq!(registry.end_attack(id, true), None);
        assert_eq!(
            registry.get(id).unwrap().status,
            CaravanStatus::Traveling
        );
        assert_eq!(
            registry.end_attack(IdSource::seeded(8).caravan_id(), false),
            None
        );
    }
}
