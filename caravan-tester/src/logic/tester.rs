use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::logic::plan::{SimulationPlan, SimulationSummary};
use crate::logic::simulator::CaravanSimulator;
use crate::scenarios::TestScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub live: bool,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// Running tally for one scenario/seed pair, shared by the seeded and live runners.
#[derive(Debug, Default)]
pub struct IterationLog {
    successes: usize,
    failures: Vec<String>,
    performance_data: Vec<Duration>,
}

impl IterationLog {
    pub fn record(
        &mut self,
        plan: &SimulationPlan,
        summary: &SimulationSummary,
        iteration: usize,
        iterations: usize,
        elapsed: Duration,
        verbose: bool,
    ) {
        if let Some(err) = evaluate_expectations(plan, summary) {
            self.failures.push(format!(
                "Iteration {} ({}): {}{}",
                iteration + 1,
                summary.one_line(),
                err,
                describe_violations(summary)
            ));
            if verbose {
                println!(
                    "  ❌ Iteration {}/{} failed: {}",
                    iteration + 1,
                    iterations,
                    err.red()
                );
            }
        } else {
            self.successes += 1;
            self.performance_data.push(elapsed);
            if verbose {
                println!(
                    "  ✅ Iteration {}/{} passed ({elapsed:?}) {}",
                    iteration + 1,
                    iterations,
                    summary.one_line()
                );
            }
        }
    }

    #[must_use]
    pub fn into_result(self, scenario_name: &str, seed: u64, iterations: usize, live: bool) -> ScenarioResult {
        let average_duration = if self.performance_data.is_empty() {
            Duration::ZERO
        } else {
            self.performance_data.iter().sum::<Duration>()
                / u32::try_from(self.performance_data.len()).unwrap_or(1)
        };
        ScenarioResult {
            scenario_name: scenario_name.to_string(),
            seed,
            live,
            passed: self.failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: self.successes,
            failures: self.failures,
            average_duration,
            performance_data: self.performance_data,
        }
    }
}

pub struct LogicTester {
    simulator: CaravanSimulator,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(simulator: CaravanSimulator, verbose: bool) -> Self {
        Self { simulator, verbose }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                if self.verbose {
                    println!(
                        "🧪 Testing scenario: {} - {} (seed: {seed})",
                        scenario.name.bright_white(),
                        scenario.description
                    );
                }
                self.run_single_scenario(scenario, seed, iterations)
            })
            .collect()
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut log = IterationLog::default();
        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = iteration_seed(seed, i);
            let summary = self.simulator.run_plan(&scenario.plan, iteration_seed);
            log.record(
                &scenario.plan,
                &summary,
                i,
                iterations,
                start_time.elapsed(),
                self.verbose,
            );
        }
        log.into_result(&scenario.name, seed, iterations, false)
    }
}

pub fn iteration_seed(seed: u64, iteration: usize) -> u64 {
    seed.wrapping_add(u64::try_from(iteration).unwrap_or(u64::MAX))
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    for expectation in &plan.expectations {
        if let Err(err) = expectation.evaluate(summary) {
            return Some(err.to_string());
        }
    }
    None
}

fn describe_violations(summary: &SimulationSummary) -> String {
    if summary.invariant_violations.is_empty() {
        return String::new();
    }
    let shown: Vec<&str> = summary
        .invariant_violations
        .iter()
        .take(3)
        .map(String::as_str)
        .collect();
    format!(" | violations: {}", shown.join("; "))
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::TesterAssets;
    use crate::scenarios::get_scenario;
    use std::sync::Arc;

    #[test]
    fn failing_expectation_is_reported_with_summary() {
        let plan = SimulationPlan::new(1).with_expectation(|summary: &SimulationSummary| {
            anyhow::ensure!(summary.completed == 99, "expected 99 completions");
            Ok(())
        });
        let mut log = IterationLog::default();
        log.record(&plan, &SimulationSummary::new(5), 0, 1, Duration::ZERO, false);
        let result = log.into_result("custom", 5, 1, false);
        assert!(!result.passed);
        assert_eq!(result.successful_iterations, 0);
        assert!(result.failures[0].contains("expected 99 completions"));
        assert!(result.failures[0].contains("seed 5"));
    }

    #[test]
    fn smoke_passes_for_every_seed() {
        let simulator = CaravanSimulator::new(Arc::new(TesterAssets::load_default()), false);
        let tester = LogicTester::new(simulator, false);
        let scenario = get_scenario("smoke").unwrap();
        let results = tester.run_scenario(&scenario, &[1, 2], 2);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed), "{results:?}");
        assert_eq!(results[1].seed, 2);
    }

    #[test]
    fn iteration_seeds_step_from_base() {
        assert_eq!(iteration_seed(10, 0), 10);
        assert_eq!(iteration_seed(u64::MAX, 1), 0);
    }

    #[test]
    fn durations_serialize_as_millis() {
        let result = IterationLog::default().into_result("x", 1, 0, true);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 0);
        assert_eq!(json["live"], true);
    }
}
