//! Guard roster: capacity- and status-gated enlistment.
use chrono::{DateTime, Utc};
use log::{debug, trace};

use crate::caravan::{Caravan, Guard, GuardCandidate, GuardStatus};
use crate::constants::LOG_TARGET_ROSTER;
use crate::error::Rejection;
use crate::ids::{CaravanId, GuardId, PlayerId};
use crate::registry::CaravanRegistry;

/// Check every admission precondition against the caravan as it is right now.
///
/// # Errors
///
/// Returns the first failed precondition.
pub fn check_admission(caravan: &Caravan, player: &PlayerId) -> Result<(), Rejection> {
    if !caravan.status.accepts_guards() {
        return Err(Rejection::Status(caravan.status));
    }
    if caravan.is_owned_by(player) {
        return Err(Rejection::OwnerConflict);
    }
    if caravan.is_guarded_by(player) {
        return Err(Rejection::AlreadyGuarding);
    }
    if caravan.active_guard_count() >= caravan.max_guards {
        return Err(Rejection::RosterFull);
    }
    Ok(())
}

/// Append an active guard if every precondition holds.
///
/// # Errors
///
/// Returns the failed precondition; the caravan is left untouched.
pub fn admit(
    caravan: &mut Caravan,
    candidate: GuardCandidate,
    guard_id: GuardId,
    share_bps: u32,
    now: DateTime<Utc>,
) -> Result<(), Rejection> {
    check_admission(caravan, &candidate.player_id)?;
    caravan.guards.push(Guard {
        id: guard_id,
        player_id: candidate.player_id,
        name: candidate.name,
        level: candidate.level,
        class: candidate.class,
        status: GuardStatus::Active,
        share_bps,
        joined_at: now,
    });
    Ok(())
}

/// Move the player's active guard entry to `status`.
///
/// # Errors
///
/// Returns [`Rejection::NoActiveGuard`] when the player holds no active slot.
pub fn retire(caravan: &mut Caravan, player: &PlayerId, status: GuardStatus) -> Result<(), Rejection> {
    let guard = caravan
        .guards
        .iter_mut()
        .find(|guard| guard.is_active() && &guard.player_id == player)
        .ok_or(Rejection::NoActiveGuard)?;
    guard.status = status;
    Ok(())
}

impl CaravanRegistry {
    /// Enlist `candidate` as a guard. Returns `false` on any failed precondition.
    ///
    /// The capacity check and the append happen under one write lock, so
    /// concurrent joins can never push the active roster past `max_guards`.
    pub fn join_as_guard(&self, caravan_id: CaravanId, candidate: GuardCandidate) -> bool {
        let now = self.now();
        let share_bps = self.config().guard_share_bps;
        let guard_id = self.ids().guard_id();
        let player = candidate.player_id.clone();

        let outcome = self.with_caravan_mut(caravan_id, |caravan| {
            admit(caravan, candidate, guard_id, share_bps, now)
        });
        match outcome {
            Some(Ok(())) => {
                debug!(target: LOG_TARGET_ROSTER, "{player} now guards caravan {caravan_id}");
                true
            }
            Some(Err(reason)) => {
                trace!(target: LOG_TARGET_ROSTER, "{player} cannot guard {caravan_id}: {reason}");
                false
            }
            None => {
                trace!(target: LOG_TARGET_ROSTER, "{player} cannot guard {caravan_id}: not found");
                false
            }
        }
    }

    /// Step down from guarding. No-op when the player holds no active slot.
    pub fn leave_guard(&self, caravan_id: CaravanId, player: &PlayerId) {
        let outcome = self.with_caravan_mut(caravan_id, |caravan| {
            retire(caravan, player, GuardStatus::Left)
        });
        if matches!(outcome, Some(Ok(()))) {
            debug!(target: LOG_TARGET_ROSTER, "{player} left caravan {caravan_id}");
        }
    }

    /// Record that a guard fell in combat. Dead guards keep their entry but earn nothing.
    pub fn mark_guard_dead(&self, caravan_id: CaravanId, player: &PlayerId) -> bool {
        let outcome = self.with_caravan_mut(caravan_id, |caravan| {
            retire(caravan, player, GuardStatus::Dead)
        });
        let fallen = matches!(outcome, Some(Ok(())));
        if fallen {
            debug!(target: LOG_TARGET_ROSTER, "{player} fell guarding caravan {caravan_id}");
        }
        fallen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caravan::{CaravanStatus, Owner};
    use crate::catalog::Catalog;
    use crate::clock::ManualClock;
    use crate::config::EconomyConfig;
    use crate::ids::IdSource;
    use std::sync::Arc;

    fn registry() -> CaravanRegistry {
        CaravanRegistry::new(
            Arc::new(Catalog::reference().clone()),
            EconomyConfig::default(),
            Arc::new(ManualClock::at_epoch()),
            IdSource::seeded(5),
        )
    }

    fn candidate(id: &str) -> GuardCandidate {
        GuardCandidate::new(id, id.to_uppercase(), 10, "warrior")
    }

    #[test]
    fn join_appends_active_guard_with_flat_share() {
        let registry = registry();
        let caravan = registry
            .create(Owner::new("owner", "Owner", 5), 2, 1, 1_000)
            .unwrap();
        assert!(registry.join_as_guard(caravan.id, candidate("g1")));

        let stored = registry.get(caravan.id).unwrap();
        let guard = &stored.guards[0];
        assert_eq!(guard.status, GuardStatus::Active);
        assert_eq!(guard.share_bps, 1_000);
        assert!((guard.reward_share() - 0.10).abs() < f64::EPSILON);
        assert_eq!(guard.class, "warrior");
    }

    #[test]
    fn owner_and_duplicates_are_refused() {
        let registry = registry();
        let caravan = registry
            .create(Owner::new("owner", "Owner", 5), 2, 1, 1_000)
            .unwrap();
        assert!(!registry.join_as_guard(caravan.id, candidate("owner")));
        assert!(registry.join_as_guard(caravan.id, candidate("g1")));
        assert!(!registry.join_as_guard(caravan.id, candidate("g1")));
        assert_eq!(registry.get(caravan.id).unwrap().guards.len(), 1);
    }

    #[test]
    fn capacity_caps_active_guards_and_leaving_frees_a_slot() {
        let registry = registry();
        // type 1 admits two guards
        let caravan = registry
            .create(Owner::new("owner", "Owner", 5), 1, 1, 100)
            .unwrap();
        assert!(registry.join_as_guard(caravan.id, candidate("g1")));
        assert!(registry.join_as_guard(caravan.id, candidate("g2")));
        assert!(!registry.join_as_guard(caravan.id, candidate("g3")));

        registry.leave_guard(caravan.id, &PlayerId::from("g1"));
        assert!(registry.join_as_guard(caravan.id, candidate("g3")));

        let stored = registry.get(caravan.id).unwrap();
        assert_eq!(stored.active_guard_count(), 2);
        assert_eq!(stored.guards.len(), 3, "left guards stay on the roster");
        assert_eq!(stored.guards[0].status, GuardStatus::Left);
    }

    #[test]
    fn leave_is_idempotent_and_rejoin_creates_new_entry() {
        let registry = registry();
        let caravan = registry
            .create(Owner::new("owner", "Owner", 5), 2, 1, 100)
            .unwrap();
        let g1 = PlayerId::from("g1");
        registry.leave_guard(caravan.id, &g1);
        assert!(registry.join_as_guard(caravan.id, candidate("g1")));
        registry.leave_guard(caravan.id, &g1);
        registry.leave_guard(caravan.id, &g1);
        assert!(registry.join_as_guard(caravan.id, candidate("g1")));

        let stored = registry.get(caravan.id).unwrap();
        let statuses: Vec<_> = stored.guards.iter().map(|g| g.status).collect();
        assert_eq!(statuses, vec![GuardStatus::Left, GuardStatus::Active]);
        assert_ne!(stored.guards[0].id, stored.guards[1].id);
    }

    #[test]
    fn joining_requires_preparing_or_traveling() {
        let registry = registry();
        let caravan = registry
            .create(Owner::new("owner", "Owner", 5), 2, 1, 100)
            .unwrap();
        assert!(registry.start(caravan.id));
        assert!(registry.join_as_guard(caravan.id, candidate("g1")));
        assert!(registry.attack(caravan.id, &PlayerId::from("raider")));
        assert!(!registry.join_as_guard(caravan.id, candidate("g2")));

        let mut snapshot = registry.get(caravan.id).unwrap();
        assert_eq!(
            check_admission(&snapshot, &PlayerId::from("g2")),
            Err(Rejection::Status(CaravanStatus::UnderAttack))
        );
        snapshot.status = CaravanStatus::Arrived;
        assert_eq!(
            check_admission(&snapshot, &PlayerId::from("g2")),
            Err(Rejection::Status(CaravanStatus::Arrived))
        );
    }

    #[test]
    fn dead_guards_lose_their_slot() {
        let registry = registry();
        let caravan = registry
            .create(Owner::new("owner", "Owner", 5), 2, 1, 100)
            .unwrap();
        assert!(registry.join_as_guard(caravan.id, candidate("g1")));
        assert!(registry.mark_guard_dead(caravan.id, &PlayerId::from("g1")));
        assert!(!registry.mark_guard_dead(caravan.id, &PlayerId::from("g1")));
        let stored = registry.get(caravan.id).unwrap();
        assert_eq!(stored.guards[0].status, GuardStatus::Dead);
        assert_eq!(stored.active_guard_count(), 0);
    }

    #[test]
    fn unknown_caravan_is_a_quiet_rejection() {
        let registry = registry();
        let ghost = IdSource::seeded(404).caravan_id();
        assert!(!registry.join_as_guard(ghost, candidate("g1")));
        registry.leave_guard(ghost, &PlayerId::from("g1"));
    }
}
