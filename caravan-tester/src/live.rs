//! Live mode: wall-clock time, a tokio interval driving the scheduler, and
//! guards and raiders acting as concurrent tasks against one shared registry.
use anyhow::Result;
use caravan_game::{
    CaravanId, CaravanRegistry, CaravanStatus, EconomyConfig, IdSource, SystemClock, TickReport,
};
use colored::Colorize;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use crate::assets::TesterAssets;
use crate::logic::simulator::{
    Ledgers, candidate_for, check_invariants, check_ledgers, note_roster, open_caravans,
    raider_for, resolve_wave, roll, settle_arrivals,
};
use crate::logic::{IterationLog, ScenarioResult, SimulationPlan, SimulationSummary, iteration_seed};
use crate::scenarios::TestScenario;

/// Destroyed caravans linger this long in live runs.
const LIVE_GRACE_MS: i64 = 50;
/// Upper bound on raid rounds, as a multiple of the plan's tick budget.
const ROUND_BUDGET_FACTOR: u32 = 4;

#[derive(Clone)]
pub struct LiveRunner {
    assets: Arc<TesterAssets>,
    tick: Duration,
    verbose: bool,
}

impl LiveRunner {
    #[must_use]
    pub const fn new(assets: Arc<TesterAssets>, tick: Duration, verbose: bool) -> Self {
        Self {
            assets,
            tick,
            verbose,
        }
    }

    pub async fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Result<Vec<ScenarioResult>> {
        let mut results = Vec::with_capacity(seeds.len());
        for &seed in seeds {
            if self.verbose {
                println!(
                    "🛰️  Live scenario: {} (seed: {seed})",
                    scenario.name.bright_white()
                );
            }
            let mut log = IterationLog::default();
            for i in 0..iterations {
                let start_time = Instant::now();
                let summary = self.run_plan(&scenario.plan, iteration_seed(seed, i)).await?;
                log.record(
                    &scenario.plan,
                    &summary,
                    i,
                    iterations,
                    start_time.elapsed(),
                    self.verbose,
                );
            }
            results.push(log.into_result(&scenario.name, seed, iterations, true));
        }
        Ok(results)
    }

    /// Run one plan against a live registry.
    ///
    /// # Errors
    ///
    /// Returns an error if an actor task panics or is cancelled.
    pub async fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let live_assets = TesterAssets {
            catalog: Arc::clone(&self.assets.catalog),
            config: EconomyConfig {
                destroy_grace_ms: LIVE_GRACE_MS,
                ..self.assets.config.clone()
            },
        };
        let grace = Duration::from_millis(LIVE_GRACE_MS.unsigned_abs());
        let Ok(registry) =
            CaravanRegistry::from_loader(&live_assets, Arc::new(SystemClock), IdSource::seeded(seed));
        let registry = Arc::new(registry);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut ledgers = Ledgers::default();
        let mut summary = SimulationSummary::new(seed);

        let opened = open_caravans(&registry, &mut ledgers, plan, &mut rng, &mut summary);
        enlist_concurrently(&registry, &opened, plan.guard_candidates, &mut summary).await?;
        note_roster(&registry, &mut summary);
        for id in &opened {
            registry.start(*id);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let ticker = tokio::spawn(drive_scheduler(
            Arc::clone(&registry),
            self.tick,
            Arc::clone(&stop),
        ));

        let mut rounds = tokio::time::interval(self.tick);
        let budget = plan.max_ticks.saturating_mul(ROUND_BUDGET_FACTOR);
        let mut spent = 0;
        while spent < budget && !registry.active_list().is_empty() {
            rounds.tick().await;
            self.raid_round(&registry, &mut rng, plan, &mut summary).await?;
            settle_arrivals(&registry, &mut ledgers, &mut summary);
            let violations = check_invariants(&registry.list(), registry.config());
            summary.invariant_violations.extend(violations);
            spent += 1;
        }

        tokio::time::sleep(grace * 2 + self.tick * 4).await;
        stop.store(true, Ordering::Release);
        for report in ticker.await? {
            summary.ticks += 1;
            summary.arrivals += report.arrived.len();
            summary.expired += report.expired.len();
        }
        settle_arrivals(&registry, &mut ledgers, &mut summary);
        summary.remaining = registry.len();
        check_ledgers(&ledgers, &mut summary);
        Ok(summary)
    }

    async fn raid_round(
        &self,
        registry: &Arc<CaravanRegistry>,
        rng: &mut ChaCha8Rng,
        plan: &SimulationPlan,
        summary: &mut SimulationSummary,
    ) -> Result<()> {
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
            let wave = summary.raid_waves + 1;
            let mut raiders = JoinSet::new();
            for slot in 0..plan.raiders_per_wave {
                let registry = Arc::clone(registry);
                let raider = raider_for(wave, slot);
                raiders.spawn(async move {
                    tokio::task::yield_now().await;
                    registry.attack(id, &raider)
                });
            }
            let mut winners = 0;
            let mut losers = 0;
            while let Some(struck) = raiders.join_next().await {
                if struck? {
                    winners += 1;
                } else {
                    losers += 1;
                }
            }

            if winners == 0 {
                // the scheduler moved it off the road before any raider landed
                if registry
                    .get(id)
                    .is_some_and(|caravan| caravan.status == CaravanStatus::Traveling)
                {
                    summary
                        .invariant_violations
                        .push(format!("wave on traveling caravan {id} had no winner"));
                }
                continue;
            }
            summary.raid_waves = wave;
            summary.attacks_started += winners;
            summary.attacks_rejected += losers;
            if winners > 1 {
                summary
                    .invariant_violations
                    .push(format!("raid wave on {id} had {winners} winners"));
            }
            log::debug!("live wave {wave} on {id}: {winners} winner(s), {losers} turned away");
            resolve_wave(registry, rng, plan, id, summary);
        }
        Ok(())
    }
}

async fn enlist_concurrently(
    registry: &Arc<CaravanRegistry>,
    opened: &[CaravanId],
    candidates: usize,
    summary: &mut SimulationSummary,
) -> Result<()> {
    let mut joins = JoinSet::new();
    for (index, &id) in opened.iter().enumerate() {
        for slot in 0..candidates {
            let registry = Arc::clone(registry);
            joins.spawn(async move { registry.join_as_guard(id, candidate_for(index, slot)) });
        }
    }
    while let Some(joined) = joins.join_next().await {
        if joined? {
            summary.guards_joined += 1;
        } else {
            summary.guard_rejections += 1;
        }
    }
    Ok(())
}

async fn drive_scheduler(
    registry: Arc<CaravanRegistry>,
    period: Duration,
    stop: Arc<AtomicBool>,
) -> Vec<TickReport> {
    let mut interval = tokio::time::interval(period);
    let mut reports = Vec::new();
    while !stop.load(Ordering::Acquire) {
        interval.tick().await;
        reports.push(registry.tick());
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::get_scenario;

    fn runner() -> LiveRunner {
        LiveRunner::new(
            Arc::new(TesterAssets::load_default()),
            Duration::from_millis(2),
            false,
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_volunteers_respect_capacity() {
        let scenario = get_scenario("guard-capacity").unwrap();
        let summary = runner().run_plan(&scenario.plan, 11).await.unwrap();
        assert_eq!(summary.guards_joined, 4);
        assert_eq!(summary.guard_rejections, 6);
        assert_eq!(summary.peak_roster, (2, 2));
        assert!(summary.invariant_violations.is_empty(), "{:?}", summary.invariant_violations);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_raiders_produce_one_winner_per_wave() {
        let scenario = get_scenario("attack-race").unwrap();
        let summary = runner().run_plan(&scenario.plan, 5).await.unwrap();
        assert!(summary.raid_waves > 0);
        assert_eq!(summary.attacks_started, summary.raid_waves);
        assert_eq!(summary.attacks_rejected, summary.raid_waves * 3);
        assert_eq!(summary.completed, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn looted_caravans_are_swept_by_the_ticker() {
        let scenario = get_scenario("looted-convoy").unwrap();
        let summary = runner().run_plan(&scenario.plan, 8).await.unwrap();
        assert_eq!(summary.raids_looted, 3);
        assert_eq!(summary.expired, 3);
        assert_eq!(summary.remaining, 0);
        assert!(summary.ticks > 0);
    }
}
