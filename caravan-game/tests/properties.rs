//! Property-based tests for pricing, roster capacity, payouts and raids.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use caravan_game::{
    CaravanId, CaravanRegistry, CaravanStatus, Catalog, EconomyConfig, GuardCandidate, IdSource,
    ManualClock, Owner, PlayerId, RewardKind,
};

fn registry(seed: u64) -> CaravanRegistry {
    CaravanRegistry::new(
        Arc::new(Catalog::reference().clone()),
        EconomyConfig::default(),
        Arc::new(ManualClock::at_epoch()),
        IdSource::seeded(seed),
    )
}

fn guard(index: u8) -> GuardCandidate {
    GuardCandidate::new(format!("guard-{index}"), format!("Guard {index}"), 1, "warrior")
}

fn active_players(registry: &CaravanRegistry, id: CaravanId) -> Vec<PlayerId> {
    registry
        .get(id)
        .unwrap()
        .active_guards()
        .map(|g| g.player_id.clone())
        .collect()
}

#[derive(Debug, Clone)]
enum RosterOp {
    Join(u8),
    Leave(u8),
    Fall(u8),
    Start,
}

fn roster_op() -> impl Strategy<Value = RosterOp> {
    prop_oneof![
        4 => (0u8..12).prop_map(RosterOp::Join),
        2 => (0u8..12).prop_map(RosterOp::Leave),
        1 => (0u8..12).prop_map(RosterOp::Fall),
        1 => Just(RosterOp::Start),
    ]
}

#[derive(Debug, Clone, Copy)]
enum RaidOp {
    Tick,
    Attack,
    Repel,
}

fn raid_op() -> impl Strategy<Value = RaidOp> {
    prop_oneof![
        5 => Just(RaidOp::Tick),
        2 => Just(RaidOp::Attack),
        2 => Just(RaidOp::Repel),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// A fresh caravan is priced from the catalog and starts idle.
    #[test]
    fn prop_create_prices_from_catalog(
        type_id in 1u32..=4,
        route_id in 1u32..=4,
        investment in 0u64..10_000_000,
    ) {
        let registry = registry(1);
        let caravan = registry
            .create(Owner::new("owner", "Owner", 1), type_id, route_id, investment)
            .unwrap();
        let caravan_type = Catalog::reference().type_by_id(type_id).unwrap();
        let route = Catalog::reference().route_by_id(route_id).unwrap();

        let cargo = investment * 3 / 2;
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let reward = (cargo as f64 * caravan_type.reward_multiplier * route.reward_bonus).floor() as u64;

        prop_assert_eq!(caravan.cargo_value, cargo);
        prop_assert_eq!(caravan.potential_reward, reward);
        prop_assert_eq!(caravan.total_cost, caravan_type.base_cost + investment);
        prop_assert_eq!(caravan.status, CaravanStatus::Preparing);
        prop_assert_eq!(caravan.progress_percent, 0.0);
        prop_assert!(caravan.guards.is_empty());
        prop_assert_eq!(caravan.max_guards, caravan_type.max_guards);
    }

    /// Active guards never exceed capacity and no player holds two slots.
    #[test]
    fn prop_roster_capacity_holds(
        type_id in 1u32..=4,
        ops in proptest::collection::vec(roster_op(), 1..60),
    ) {
        let registry = registry(2);
        let caravan = registry
            .create(Owner::new("owner", "Owner", 1), type_id, 1, 100)
            .unwrap();
        for op in ops {
            match op {
                RosterOp::Join(index) => {
                    let before = active_players(&registry, caravan.id).len();
                    let joined = registry.join_as_guard(caravan.id, guard(index));
                    let after = active_players(&registry, caravan.id).len();
                    prop_assert_eq!(after, before + usize::from(joined));
                }
                RosterOp::Leave(index) => {
                    registry.leave_guard(caravan.id, &PlayerId::new(format!("guard-{index}")));
                }
                RosterOp::Fall(index) => {
                    registry.mark_guard_dead(caravan.id, &PlayerId::new(format!("guard-{index}")));
                }
                RosterOp::Start => {
                    registry.start(caravan.id);
                }
            }
            let players = active_players(&registry, caravan.id);
            let unique: HashSet<_> = players.iter().collect();
            prop_assert!(u32::try_from(players.len()).unwrap() <= caravan.max_guards);
            prop_assert_eq!(unique.len(), players.len());
        }
        prop_assert!(!registry.join_as_guard(caravan.id, GuardCandidate::new("owner", "Owner", 1, "x")));
    }

    /// Gold paid out never exceeds the potential reward and each guard earns karma once.
    #[test]
    fn prop_payout_within_reward(
        type_id in 1u32..=4,
        route_id in 1u32..=4,
        investment in 1u64..1_000_000,
        guards in 0u8..12,
    ) {
        let registry = registry(3);
        let caravan = registry
            .create(Owner::new("owner", "Owner", 1), type_id, route_id, investment)
            .unwrap();
        let mut joined = 0i64;
        for index in 0..guards {
            if registry.join_as_guard(caravan.id, guard(index)) {
                joined += 1;
            }
        }
        prop_assert!(registry.start(caravan.id));
        for _ in 0..60 {
            registry.tick();
        }
        let grants = registry.complete(caravan.id).unwrap();

        let gold: i64 = grants.iter().filter(|g| g.kind == RewardKind::Gold).map(|g| g.amount).sum();
        let karma: i64 = grants.iter().filter(|g| g.kind == RewardKind::Karma).map(|g| g.amount).sum();
        let pot = i64::try_from(caravan.potential_reward).unwrap();
        prop_assert!(gold <= pot);
        prop_assert!(gold > pot - (joined + 1));
        prop_assert_eq!(karma, 20 * joined);
        prop_assert_eq!(grants[0].recipient_id.as_str(), "owner");
    }

    /// Progress is monotone and frozen while a raid is in progress.
    #[test]
    fn prop_progress_frozen_under_attack(ops in proptest::collection::vec(raid_op(), 1..120)) {
        let registry = registry(4);
        let caravan = registry
            .create(Owner::new("owner", "Owner", 1), 1, 4, 100)
            .unwrap();
        prop_assert!(registry.start(caravan.id));
        let raider = PlayerId::from("raider");
        let mut last = 0.0;
        for op in ops {
            let before = registry.get(caravan.id).unwrap();
            match op {
                RaidOp::Tick => {
                    registry.tick();
                }
                RaidOp::Attack => {
                    let accepted = registry.attack(caravan.id, &raider);
                    prop_assert_eq!(accepted, before.status == CaravanStatus::Traveling);
                }
                RaidOp::Repel => {
                    let outcome = registry.end_attack(caravan.id, false);
                    prop_assert_eq!(outcome.is_some(), before.is_under_attack);
                }
            }
            let after = registry.get(caravan.id).unwrap();
            prop_assert!(after.progress_percent >= last);
            if before.is_under_attack && after.is_under_attack {
                prop_assert_eq!(after.progress_percent, before.progress_percent);
            }
            prop_assert_eq!(after.is_under_attack, after.status == CaravanStatus::UnderAttack);
            last = after.progress_percent;
        }
    }
}
