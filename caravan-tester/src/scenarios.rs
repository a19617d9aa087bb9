//! Named convoy scenarios and the expectations each run must satisfy.
use anyhow::{Result, ensure};
use caravan_game::constants::GUARD_KARMA_REWARD;

use crate::logic::{SimulationPlan, SimulationSummary};

pub struct TestScenario {
    pub name: String,
    pub description: &'static str,
    pub plan: SimulationPlan,
}

impl TestScenario {
    fn new(name: &str, description: &'static str, plan: SimulationPlan) -> Self {
        Self {
            name: name.to_string(),
            description,
            plan: plan.with_expectation(no_violations),
        }
    }
}

const SCENARIOS: &[(&str, &str)] = &[
    ("smoke", "One guarded caravan on the safe road"),
    ("guard-capacity", "More volunteers than guard slots"),
    ("attack-race", "Raiders racing to strike the same caravan every tick"),
    ("defended-convoy", "Well guarded convoy that holds every raid"),
    ("looted-convoy", "Unguarded caravans raided until destroyed"),
    ("full-economy", "Mixed catalog, raids, casualties and payouts"),
];

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS.to_vec()
}

pub fn all_scenario_names() -> Vec<String> {
    SCENARIOS.iter().map(|(key, _)| (*key).to_string()).collect()
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let description = SCENARIOS
        .iter()
        .find(|(key, _)| *key == name.to_lowercase())
        .map(|(_, description)| *description)?;
    let plan = match name.to_lowercase().as_str() {
        "smoke" => smoke(),
        "guard-capacity" => guard_capacity(),
        "attack-race" => attack_race(),
        "defended-convoy" => defended_convoy(),
        "looted-convoy" => looted_convoy(),
        "full-economy" => full_economy(),
        _ => return None,
    };
    Some(TestScenario::new(name, description, plan))
}

fn karma_per_guard() -> i64 {
    i64::from(GUARD_KARMA_REWARD)
}

fn no_violations(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.invariant_violations.is_empty(),
        "{} invariant violation(s), first: {}",
        summary.invariant_violations.len(),
        summary.invariant_violations[0]
    );
    Ok(())
}

fn everything_resolved(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.completed + summary.raids_looted == summary.caravans_created,
        "{} created but {} completed and {} looted",
        summary.caravans_created,
        summary.completed,
        summary.raids_looted
    );
    ensure!(
        summary.remaining == 0,
        "{} caravans left in the registry",
        summary.remaining
    );
    ensure!(
        summary.gold_paid <= i64::try_from(summary.reward_pool).unwrap_or(i64::MAX),
        "paid {} gold from a pool of {}",
        summary.gold_paid,
        summary.reward_pool
    );
    Ok(())
}

fn smoke() -> SimulationPlan {
    SimulationPlan::new(1)
        .with_caravan(1, 1)
        .with_guard_candidates(1)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(summary.completed == 1, "caravan never completed");
            ensure!(
                summary.gold_paid == 1_500,
                "expected 1500 gold paid, got {}",
                summary.gold_paid
            );
            ensure!(
                summary.karma_granted == karma_per_guard(),
                "expected one guard's karma, got {}",
                summary.karma_granted
            );
            ensure!(summary.funding_rejections == 1, "unfunded owner was not refused");
            Ok(())
        })
        .with_expectation(everything_resolved)
}

fn guard_capacity() -> SimulationPlan {
    SimulationPlan::new(2)
        .with_caravan(1, 1)
        .with_guard_candidates(5)
        .with_expectation(|summary: &SimulationSummary| {
            let (peak, cap) = summary.peak_roster;
            ensure!(peak == cap && cap == 2, "peak roster {peak}/{cap}, expected 2/2");
            ensure!(
                summary.guards_joined == 4 && summary.guard_rejections == 6,
                "joined {} rejected {}",
                summary.guards_joined,
                summary.guard_rejections
            );
            Ok(())
        })
        .with_expectation(everything_resolved)
}

fn attack_race() -> SimulationPlan {
    SimulationPlan::new(3)
        .with_caravan(2, 1)
        .with_guard_candidates(2)
        .with_raids(10_000, 4)
        .with_defense(10_000, 0)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(summary.raid_waves > 0, "no raids happened");
            ensure!(
                summary.attacks_started == summary.raid_waves,
                "{} attacks started across {} waves",
                summary.attacks_started,
                summary.raid_waves
            );
            ensure!(
                summary.attacks_rejected == summary.raid_waves * 3,
                "{} losing raiders across {} waves",
                summary.attacks_rejected,
                summary.raid_waves
            );
            ensure!(
                summary.raids_repelled == summary.attacks_started,
                "every raid should be repelled"
            );
            Ok(())
        })
        .with_expectation(everything_resolved)
}

fn defended_convoy() -> SimulationPlan {
    SimulationPlan::new(4)
        .with_caravan(3, 2)
        .with_investment(5_000)
        .with_guard_candidates(6)
        .with_raids(2_500, 2)
        .with_defense(10_000, 500)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(summary.raids_looted == 0, "{} raids looted", summary.raids_looted);
            ensure!(
                summary.completed == summary.caravans_created,
                "only {} of {} completed",
                summary.completed,
                summary.caravans_created
            );
            let survivors = summary.guards_joined - summary.guards_fallen;
            let expected = i64::try_from(survivors).unwrap_or(i64::MAX) * karma_per_guard();
            ensure!(
                summary.karma_granted == expected,
                "karma {} for {survivors} surviving guards",
                summary.karma_granted
            );
            Ok(())
        })
        .with_expectation(everything_resolved)
}

fn looted_convoy() -> SimulationPlan {
    SimulationPlan::new(3)
        .with_caravan(1, 4)
        .with_raids(10_000, 1)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(
                summary.raids_looted == summary.caravans_created,
                "{} looted of {}",
                summary.raids_looted,
                summary.caravans_created
            );
            ensure!(
                summary.expired == summary.raids_looted,
                "{} destroyed caravans expired of {}",
                summary.expired,
                summary.raids_looted
            );
            ensure!(summary.gold_paid == 0, "looted caravans paid {}", summary.gold_paid);
            Ok(())
        })
        .with_expectation(everything_resolved)
}

fn full_economy() -> SimulationPlan {
    SimulationPlan::new(8)
        .with_guard_candidates(4)
        .with_raids(1_500, 3)
        .with_defense(6_000, 2_000)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(
                summary.expired == summary.raids_looted,
                "{} expired but {} looted",
                summary.expired,
                summary.raids_looted
            );
            ensure!(
                summary.raids_repelled + summary.raids_looted == summary.attacks_started,
                "unresolved raids"
            );
            Ok(())
        })
        .with_expectation(everything_resolved)
}
