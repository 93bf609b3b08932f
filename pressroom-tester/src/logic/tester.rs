use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::logic::scenarios::TestScenario;
use crate::logic::simulation::{SimulationPlan, SimulationSummary, run_plan, verify_replay};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub orders_completed: u64,
    pub mean_money_delta: f64,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    verbose: bool,
}

impl LogicTester {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    seed
                );
            }

            results.push(self.run_single_scenario(scenario, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let outcome = self.run_simulation_iterations(&scenario.plan, seed, iterations);

        let average_duration = if outcome.performance_data.is_empty() {
            Duration::ZERO
        } else {
            outcome.performance_data.iter().sum::<Duration>()
                / u32::try_from(outcome.performance_data.len()).unwrap_or(1)
        };
        let mean_money_delta = if outcome.money_deltas.is_empty() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let mean = outcome.money_deltas.iter().sum::<i64>() as f64
                / outcome.money_deltas.len() as f64;
            mean
        };

        ScenarioResult {
            scenario_name: scenario.name.to_string(),
            seed,
            passed: outcome.failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: outcome.successes,
            failures: outcome.failures,
            orders_completed: outcome.orders_completed,
            mean_money_delta,
            average_duration,
            performance_data: outcome.performance_data,
        }
    }

    fn run_simulation_iterations(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> IterationOutcome {
        let mut outcome = IterationOutcome::default();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = match run_plan(plan, iteration_seed) {
                Ok(summary) => summary,
                Err(err) => {
                    outcome.failures.push(format!(
                        "Iteration {} (seed {iteration_seed}): run aborted: {err:#}",
                        i + 1
                    ));
                    continue;
                }
            };

            if let Some(err) = evaluate_expectations(plan, &summary, iteration_seed) {
                outcome.failures.push(format!(
                    "Iteration {} (strategy {}, seed {}, ticks {}, ended {}): {} | {}",
                    i + 1,
                    summary.strategy,
                    summary.seed,
                    summary.ticks,
                    summary.final_time,
                    err,
                    summarize_run(&summary)
                ));

                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.red()
                    );
                    println!("     ↳ {}", summarize_run(&summary));
                }
            } else {
                outcome.successes += 1;
                let duration = start_time.elapsed();
                outcome.performance_data.push(duration);

                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) days:{} completed:{} money:{:+}",
                        i + 1,
                        iterations,
                        summary.days_started,
                        summary.orders_completed,
                        summary.money_delta()
                    );
                }
            }
            outcome.orders_completed += summary.orders_completed;
            outcome.money_deltas.push(summary.money_delta());
        }

        outcome
    }
}

#[derive(Debug, Default)]
struct IterationOutcome {
    successes: usize,
    failures: Vec<String>,
    performance_data: Vec<Duration>,
    orders_completed: u64,
    money_deltas: Vec<i64>,
}

fn evaluate_expectations(
    plan: &SimulationPlan,
    summary: &SimulationSummary,
    seed: u64,
) -> Option<String> {
    for expectation in &plan.expectations {
        if let Err(err) = expectation.evaluate(summary) {
            return Some(err.to_string());
        }
    }
    if plan.replay_check
        && let Err(err) = verify_replay(plan, seed, summary)
    {
        return Some(format!("{err:#}"));
    }
    None
}

fn summarize_run(summary: &SimulationSummary) -> String {
    let res = &summary.final_resources;
    format!(
        "generated {} completed {} ({} late) expired {} | money {} rep {} exp {} drive {}/{} | workers {} managers {}",
        summary.orders_generated,
        summary.orders_completed,
        summary.orders_late,
        summary.orders_expired,
        res.money,
        res.reputation,
        res.exp,
        res.drive_display(),
        res.max_drive,
        summary.workers,
        summary.managers
    )
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
    use crate::logic::policy::GameplayStrategy;
    use crate::logic::scenarios::get_scenario;

    #[test]
    fn smoke_scenario_passes_for_each_seed() {
        let scenario = get_scenario("smoke").unwrap();
        let results = LogicTester::new(false).run_scenario(&scenario, &[1, 2], 2);
        assert_eq!(results.len(), 2);
        for result in results {
            assert!(result.passed, "{:?}", result.failures);
            assert_eq!(result.successful_iterations, 2);
            assert_eq!(result.performance_data.len(), 2);
        }
    }

    fn always_fails(_: &SimulationSummary) -> anyhow::Result<()> {
        anyhow::bail!("nope")
    }

    #[test]
    fn failing_expectation_is_reported() {
        let scenario = TestScenario {
            key: "always-fails",
            name: "Always Fails",
            description: "",
            plan: SimulationPlan::new(GameplayStrategy::Idle)
                .with_expectation(always_fails),
        };
        let results = LogicTester::new(false).run_scenario(&scenario, &[5], 1);
        assert!(!results[0].passed);
        assert_eq!(results[0].successful_iterations, 0);
        assert!(results[0].failures[0].contains("nope"));
        assert_eq!(results[0].average_duration, Duration::ZERO);
    }

    #[test]
    fn result_serializes_durations_as_millis() {
        let scenario = get_scenario("smoke").unwrap();
        let result = LogicTester::new(false).run_scenario(&scenario, &[9], 1).remove(0);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["average_duration"].is_u64());
        let back: ScenarioResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.seed, 9);
    }
}
