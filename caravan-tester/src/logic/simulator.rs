use caravan_game::reward::total_of;
use caravan_game::{
    Caravan, CaravanId, CaravanQuote, CaravanRegistry, CaravanStatus, EconomyConfig,
    GuardCandidate, IdSource, ManualClock, MemoryLedger, Owner, PlayerId, RaidOutcome,
    RewardKind, fund_and_create, settle,
};
use chrono::TimeDelta;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

use crate::assets::TesterAssets;
use crate::logic::plan::{SimulationPlan, SimulationSummary};

const BPS: u32 = 10_000;
const TICK_INTERVAL_MS: i64 = 1_000;

pub(crate) fn roll(rng: &mut ChaCha8Rng, chance_bps: u32) -> bool {
    rng.gen_range(0..BPS) < chance_bps
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) fn owner_for(index: usize) -> Owner {
    Owner::new(format!("owner-{index}"), format!("Owner {index}"), 10)
}

pub(crate) fn candidate_for(caravan: usize, slot: usize) -> GuardCandidate {
    GuardCandidate::new(
        format!("guard-{caravan}-{slot}"),
        format!("Guard {caravan}.{slot}"),
        5,
        "warrior",
    )
}

pub(crate) fn raider_for(wave: usize, slot: usize) -> PlayerId {
    PlayerId::new(format!("raider-{wave}-{slot}"))
}

/// Wallets and reputation are separate collaborators; keep them apart here too.
#[derive(Debug, Default)]
pub(crate) struct Ledgers {
    pub wallets: MemoryLedger,
    pub reputation: MemoryLedger,
}

fn pick_ids(plan: &SimulationPlan, registry: &CaravanRegistry, rng: &mut ChaCha8Rng) -> (u32, u32) {
    let catalog = registry.catalog();
    let type_id = plan.type_id.unwrap_or_else(|| {
        let types = catalog.types();
        types[rng.gen_range(0..types.len())].id
    });
    let route_id = plan.route_id.unwrap_or_else(|| {
        let routes = catalog.routes();
        routes[rng.gen_range(0..routes.len())].id
    });
    (type_id, route_id)
}

/// Fund and open every caravan in the plan, then prove an unfunded owner is turned away.
pub(crate) fn open_caravans(
    registry: &CaravanRegistry,
    ledgers: &mut Ledgers,
    plan: &SimulationPlan,
    rng: &mut ChaCha8Rng,
    summary: &mut SimulationSummary,
) -> Vec<CaravanId> {
    let mut opened = Vec::with_capacity(plan.caravans);
    for index in 0..plan.caravans {
        let (type_id, route_id) = pick_ids(plan, registry, rng);
        let owner = owner_for(index);
        let quote = match registry.quote(type_id, route_id, plan.investment) {
            Ok(quote) => quote,
            Err(err) => {
                summary
                    .invariant_violations
                    .push(format!("quote for caravan {index} failed: {err}"));
                continue;
            }
        };
        ledgers.wallets.fund(&owner.id, to_i64(quote.total_cost));
        match fund_and_create(
            registry,
            &mut ledgers.wallets,
            owner.clone(),
            type_id,
            route_id,
            plan.investment,
        ) {
            Ok(caravan) => {
                summary.caravans_created += 1;
                summary.gold_invested += quote.total_cost;
                if registry.join_as_guard(
                    caravan.id,
                    GuardCandidate::new(owner.id.as_str(), owner.name.as_str(), owner.level, "merchant"),
                ) {
                    summary
                        .invariant_violations
                        .push(format!("owner enlisted on own caravan {}", caravan.id));
                }
                opened.push(caravan.id);
            }
            Err(err) => summary
                .invariant_violations
                .push(format!("funded caravan {index} rejected: {err:#}")),
        }
    }

    if let Some(&first) = opened.first()
        && let Some(caravan) = registry.get(first)
    {
        let broke = Owner::new("broke-owner", "Broke Owner", 1);
        if fund_and_create(
            registry,
            &mut ledgers.wallets,
            broke,
            caravan.caravan_type.id,
            caravan.route.id,
            plan.investment,
        )
        .is_ok()
        {
            summary
                .invariant_violations
                .push("unfunded owner opened a caravan".to_string());
        } else {
            summary.funding_rejections += 1;
        }
    }
    opened
}

pub(crate) fn note_roster(registry: &CaravanRegistry, summary: &mut SimulationSummary) {
    for caravan in registry.list() {
        let active = caravan.active_guard_count();
        if active >= summary.peak_roster.0 {
            summary.peak_roster = (active, caravan.max_guards);
        }
    }
}

/// Apply a combat verdict to a caravan that was just struck.
pub(crate) fn resolve_wave(
    registry: &CaravanRegistry,
    rng: &mut ChaCha8Rng,
    plan: &SimulationPlan,
    id: CaravanId,
    summary: &mut SimulationSummary,
) {
    let Some(caravan) = registry.get(id) else {
        return;
    };
    let defended = caravan.active_guard_count() > 0 && roll(rng, plan.defender_win_bps);
    if defended && roll(rng, plan.casualty_bps) {
        let fallen = caravan.active_guards().next().map(|guard| guard.player_id.clone());
        if let Some(player) = fallen
            && registry.mark_guard_dead(id, &player)
        {
            summary.guards_fallen += 1;
        }
    }
    match registry.end_attack(id, !defended) {
        Some(RaidOutcome::Repelled) => summary.raids_repelled += 1,
        Some(RaidOutcome::Looted) => summary.raids_looted += 1,
        None => summary
            .invariant_violations
            .push(format!("raid on {id} could not be resolved")),
    }
}

/// Complete every arrived caravan and settle its payout.
pub(crate) fn settle_arrivals(
    registry: &CaravanRegistry,
    ledgers: &mut Ledgers,
    summary: &mut SimulationSummary,
) {
    let arrived: Vec<Caravan> = registry
        .list()
        .into_iter()
        .filter(|caravan| caravan.status == CaravanStatus::Arrived)
        .collect();
    for caravan in arrived {
        let grants = match registry.complete(caravan.id) {
            Ok(grants) => grants,
            Err(err) => {
                summary
                    .invariant_violations
                    .push(format!("complete failed: {err}"));
                continue;
            }
        };
        let gold = total_of(&grants, RewardKind::Gold);
        if gold > to_i64(caravan.potential_reward) {
            summary.invariant_violations.push(format!(
                "caravan {} paid {gold} from a pot of {}",
                caravan.id, caravan.potential_reward
            ));
        }
        if let Err(err) = settle(&grants, &mut ledgers.wallets, &mut ledgers.reputation) {
            summary
                .invariant_violations
                .push(format!("settlement failed: {err:#}"));
        }
        summary.completed += 1;
        summary.gold_paid += gold;
        summary.karma_granted += total_of(&grants, RewardKind::Karma);
        summary.reward_pool += caravan.potential_reward;
    }
}

/// Structural checks that must hold for every caravan snapshot.
pub(crate) fn check_invariants(caravans: &[Caravan], config: &EconomyConfig) -> Vec<String> {
    let mut violations = Vec::new();
    for caravan in caravans {
        let id = caravan.id;
        if caravan.active_guard_count() > caravan.max_guards {
            violations.push(format!(
                "{id}: {} active guards over cap {}",
                caravan.active_guard_count(),
                caravan.max_guards
            ));
        }
        if !(0.0..=100.0).contains(&caravan.progress_percent) {
            violations.push(format!("{id}: progress {} out of range", caravan.progress_percent));
        }
        if (caravan.status == CaravanStatus::UnderAttack) != caravan.is_under_attack {
            violations.push(format!(
                "{id}: attack flag {} disagrees with status {}",
                caravan.is_under_attack, caravan.status
            ));
        }
        if caravan.status == CaravanStatus::Arrived && caravan.progress_percent < 100.0 {
            violations.push(format!("{id}: arrived at {}%", caravan.progress_percent));
        }
        if caravan.status == CaravanStatus::Destroyed && caravan.remove_after.is_none() {
            violations.push(format!("{id}: destroyed without an expiry"));
        }
        let quote = CaravanQuote::compute(
            &caravan.caravan_type,
            &caravan.route,
            caravan.investment,
            config,
        );
        if quote.cargo_value != caravan.cargo_value
            || quote.potential_reward != caravan.potential_reward
        {
            violations.push(format!("{id}: stored economics drifted from the quote"));
        }
    }
    violations
}

/// Ledger balances must equal what the economy paid out: owners were funded
/// exactly their total cost and debited it back.
pub(crate) fn check_ledgers(ledgers: &Ledgers, summary: &mut SimulationSummary) {
    let held = ledgers.wallets.total_gold();
    if held != summary.gold_paid {
        summary.invariant_violations.push(format!(
            "wallets hold {held} gold but {} was paid out",
            summary.gold_paid
        ));
    }
}

/// Deterministic, single-threaded simulation runner on a manual clock.
#[derive(Clone)]
pub struct CaravanSimulator {
    assets: Arc<TesterAssets>,
    verbose: bool,
}

impl CaravanSimulator {
    #[must_use]
    pub const fn new(assets: Arc<TesterAssets>, verbose: bool) -> Self {
        Self { assets, verbose }
    }

    #[must_use]
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> SimulationSummary {
        let clock = Arc::new(ManualClock::at_epoch());
        let Ok(registry) =
            CaravanRegistry::from_loader(self.assets.as_ref(), clock.clone(), IdSource::seeded(seed));
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut ledgers = Ledgers::default();
        let mut summary = SimulationSummary::new(seed);

        let opened = open_caravans(&registry, &mut ledgers, plan, &mut rng, &mut summary);
        for (index, id) in opened.iter().enumerate() {
            for slot in 0..plan.guard_candidates {
                if registry.join_as_guard(*id, candidate_for(index, slot)) {
                    summary.guards_joined += 1;
                } else {
                    summary.guard_rejections += 1;
                }
            }
        }
        note_roster(&registry, &mut summary);
        for id in &opened {
            registry.start(*id);
        }
        log::debug!("seed {seed}: {} caravans on the road", opened.len());

        while summary.ticks < plan.max_ticks && !registry.active_list().is_empty() {
            self.raid_round(&registry, &mut rng, plan, &mut summary);
            let report = registry.tick();
            summary.ticks += 1;
            summary.arrivals += report.arrived.len();
            summary.expired += report.expired.len();
            clock.advance(TimeDelta::milliseconds(TICK_INTERVAL_MS));
            settle_arrivals(&registry, &mut ledgers, &mut summary);
            let violations = check_invariants(&registry.list(), registry.config());
            summary.invariant_violations.extend(violations);
        }

        clock.advance(registry.config().destroy_grace());
        summary.expired += registry.tick().expired.len();
        settle_arrivals(&registry, &mut ledgers, &mut summary);
        summary.remaining = registry.len();
        check_ledgers(&ledgers, &mut summary);

        if self.verbose {
            log::info!("{}", summary.one_line());
        }
        summary
    }

    fn raid_round(
        &self,
        registry: &CaravanRegistry,
        rng: &mut ChaCha8Rng,
        plan: &SimulationPlan,
        summary: &mut SimulationSummary,
    ) {
        let traveling: Vec<CaravanId> = registry
            .list()
            .into_iter()
            .filter(|caravan| caravan.status == CaravanStatus::Traveling)
            .map(|caravan| caravan.id)
            .collect();
        for id in traveling {
            if !roll(rng, plan.raid_chance_bps) {
                continue;
            }
            summary.raid_waves += 1;
            let mut winners = 0;
            for slot in 0..plan.raiders_per_wave {
                if registry.attack(id, &raider_for(summary.raid_waves, slot)) {
                    winners += 1;
                } else {
                    summary.attacks_rejected += 1;
                }
            }
            summary.attacks_started += winners;
            if winners != 1 {
                summary
                    .invariant_violations
                    .push(format!("raid wave on {id} had {winners} winners"));
            }
            if self.verbose {
                log::debug!("wave {} on {id}: {winners} winner(s)", summary.raid_waves);
            }
            resolve_wave(registry, rng, plan, id, summary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator() -> CaravanSimulator {
        CaravanSimulator::new(Arc::new(TesterAssets::load_default()), false)
    }

    #[test]
    fn quiet_road_pays_everyone() {
        let plan = SimulationPlan::new(1)
            .with_caravan(2, 1)
            .with_guard_candidates(2);
        let summary = simulator().run_plan(&plan, 7);
        assert!(summary.invariant_violations.is_empty(), "{:?}", summary.invariant_violations);
        assert_eq!(summary.ticks, 50);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.gold_paid, 2_250);
        assert_eq!(summary.karma_granted, 40);
        assert_eq!(summary.funding_rejections, 1);
        assert_eq!(summary.remaining, 0);
    }

    #[test]
    fn runs_are_reproducible_per_seed() {
        let plan = SimulationPlan::new(4)
            .with_guard_candidates(3)
            .with_raids(2_000, 2)
            .with_defense(5_000, 3_000);
        let sim = simulator();
        assert_eq!(sim.run_plan(&plan, 99), sim.run_plan(&plan, 99));
    }

    #[test]
    fn unguarded_raids_always_loot() {
        let plan = SimulationPlan::new(2)
            .with_caravan(1, 1)
            .with_raids(10_000, 1)
            .with_defense(10_000, 0);
        let summary = simulator().run_plan(&plan, 3);
        assert_eq!(summary.raids_looted, 2);
        assert_eq!(summary.expired, 2);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.remaining, 0);
    }

    #[test]
    fn invariant_checker_flags_roster_overflow() {
        let registry = CaravanRegistry::with_reference_catalog();
        let mut caravan = registry
            .create(Owner::new("o", "O", 1), 1, 1, 0)
            .unwrap();
        assert!(check_invariants(std::slice::from_ref(&caravan), registry.config()).is_empty());
        caravan.max_guards = 0;
        registry.join_as_guard(caravan.id, candidate_for(0, 0));
        caravan.guards = registry.get(caravan.id).unwrap().guards;
        let violations = check_invariants(&[caravan], registry.config());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("over cap 0"));
    }
}
