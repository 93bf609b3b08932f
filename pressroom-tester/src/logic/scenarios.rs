use anyhow::{Result, ensure};
use pressroom_game::GameConfig;

use crate::logic::policy::GameplayStrategy;
use crate::logic::simulation::{SimulationPlan, SimulationSummary};

/// Named logic scenario: a plan plus its expectations.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub plan: SimulationPlan,
}

impl TestScenario {
    const fn new(
        key: &'static str,
        name: &'static str,
        description: &'static str,
        plan: SimulationPlan,
    ) -> Self {
        Self {
            key,
            name,
            description,
            plan,
        }
    }
}

pub fn catalog_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::new(
            "smoke",
            "Smoke",
            "One idle work day: the first quota opens and nothing breaks",
            SimulationPlan::new(GameplayStrategy::Idle)
                .with_expectation(sane_run)
                .with_expectation(first_day_opens),
        ),
        TestScenario::new(
            "manual-shift",
            "Manual Shift",
            "Two days of accepting and pushing orders by hand",
            SimulationPlan::new(GameplayStrategy::Hustler)
                .with_days(2)
                .with_expectation(sane_run)
                .with_expectation(ships_and_profits),
        ),
        TestScenario::new(
            "staffed-week",
            "Staffed Week",
            "A full week hiring workers into the busiest departments",
            SimulationPlan::new(GameplayStrategy::Staffer)
                .with_days(5)
                .with_expectation(sane_run)
                .with_expectation(hires_workers)
                .with_expectation(ships_and_profits),
        ),
        TestScenario::new(
            "managed-week",
            "Managed Week",
            "A manager picks orders while workers run the floor",
            SimulationPlan::new(GameplayStrategy::Delegator)
                .with_days(5)
                .with_setup(wealthy_start)
                .with_expectation(sane_run)
                .with_expectation(manager_accepts_orders),
        ),
        TestScenario::new(
            "idle-expiry",
            "Idle Expiry",
            "Untouched orders lapse and are pruned from the board",
            SimulationPlan::new(GameplayStrategy::Idle)
                .with_days(3)
                .with_setup(no_rare_days)
                .with_expectation(sane_run)
                .with_expectation(orders_expire_untouched),
        ),
        TestScenario::new(
            "trickle-generation",
            "Trickle Generation",
            "Batched generation off: orders arrive one at a time",
            SimulationPlan::new(GameplayStrategy::Hustler)
                .with_days(2)
                .with_setup(single_order_generation)
                .with_expectation(sane_run),
        ),
        TestScenario::new(
            "overnight-clock",
            "Overnight Clock",
            "Idle time is simulated instead of skipped",
            SimulationPlan::new(GameplayStrategy::Hustler)
                .with_days(2)
                .with_setup(no_idle_skip)
                .with_expectation(sane_run)
                .with_expectation(ships_and_profits),
        ),
        TestScenario::new(
            "save-resume",
            "Save and Resume",
            "A midway JSON save/restore continues exactly like the straight run",
            SimulationPlan::new(GameplayStrategy::Staffer)
                .with_days(3)
                .with_replay_check()
                .with_expectation(sane_run),
        ),
    ]
}

/// Every scenario key with its description.
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog_scenarios()
        .iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

/// Look a scenario up by key or display name.
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    catalog_scenarios().into_iter().find(|scenario| {
        scenario.key.eq_ignore_ascii_case(name) || scenario.name.eq_ignore_ascii_case(name)
    })
}

fn wealthy_start(cfg: &mut GameConfig) {
    cfg.starting_money = 4_000;
}

fn no_rare_days(cfg: &mut GameConfig) {
    cfg.features.rare_days = false;
}

fn single_order_generation(cfg: &mut GameConfig) {
    cfg.features.batched_generation = false;
}

fn no_idle_skip(cfg: &mut GameConfig) {
    cfg.features.skip_idle_time = false;
}

fn sane_run(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.drive_violations == 0,
        "drive left [0, max] {} times (min {:.2})",
        summary.drive_violations,
        summary.min_drive
    );
    ensure!(
        summary.quota_violations == 0,
        "daily quota exceeded {} times",
        summary.quota_violations
    );
    ensure!(
        summary.orders_on_time + summary.orders_late
            == u32::try_from(summary.orders_completed).unwrap_or(u32::MAX),
        "settlements do not add up to completions"
    );
    Ok(())
}

fn first_day_opens(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.days_started >= 1, "no work day opened");
    ensure!(
        summary.orders_generated >= 1,
        "no orders generated on the first day"
    );
    ensure!(summary.money_delta() == 0, "idle shop changed money");
    Ok(())
}

fn ships_and_profits(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.orders_completed >= 1, "no orders completed");
    let hiring = i64::from(summary.workers) * GameConfig::default().staffing.worker_cost;
    ensure!(
        summary.money_delta() + hiring > 0,
        "shop lost money: {} after {} hiring spend",
        summary.money_delta(),
        hiring
    );
    Ok(())
}

fn hires_workers(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.workers >= 1, "no workers hired");
    ensure!(summary.stage_moves > 0, "workers never moved an order");
    Ok(())
}

fn manager_accepts_orders(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.managers >= 1, "manager never hired");
    ensure!(summary.manager_accepts >= 1, "manager never accepted an order");
    Ok(())
}

fn orders_expire_untouched(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.orders_expired >= 1, "no orders expired");
    ensure!(summary.orders_completed == 0, "idle shop completed orders");
    Ok(())
}
