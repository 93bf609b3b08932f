use std::sync::Arc;

use anyhow::{Context, Result};
use pressroom_game::numbers::floor_f64_to_u64;
use pressroom_game::{
    GameConfig, GameSession, RarityCounts, ResourceState, SaveState, SimTime, TickReport,
};
use serde::Serialize;

use crate::logic::policy::{GameplayStrategy, PolicyActions};

/// Default real seconds fed to each tick.
pub const DEFAULT_TICK_SECS: f64 = 0.25;

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    /// Evaluate against a finished run.
    ///
    /// # Errors
    ///
    /// Returns the expectation's own failure.
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// How to drive one automated run.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    /// Work days to play before stopping.
    pub days: u32,
    pub tick_secs: f64,
    pub setup: Option<fn(&mut GameConfig)>,
    /// Round-trip the session through a JSON save at this tick.
    pub resume_at_tick: Option<u64>,
    /// Re-run with a save/resume midway and require identical results.
    pub replay_check: bool,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            days: 1,
            tick_secs: DEFAULT_TICK_SECS,
            setup: None,
            resume_at_tick: None,
            replay_check: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    #[must_use]
    pub const fn with_setup(mut self, setup: fn(&mut GameConfig)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub const fn with_replay_check(mut self) -> Self {
        self.replay_check = true;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }

    #[must_use]
    pub fn config(&self) -> GameConfig {
        let mut cfg = GameConfig::default();
        if let Some(setup) = self.setup {
            setup(&mut cfg);
        }
        cfg
    }

    /// Tick budget that comfortably covers `days` work days including nights
    /// and weekends.
    #[must_use]
    pub fn max_ticks(&self, cfg: &GameConfig) -> u64 {
        let real_secs_per_day = 24.0 * cfg.game_hour_to_real_seconds;
        let days = f64::from(self.days.saturating_add(3)) * 7.0 / 5.0;
        let ticks = (days * real_secs_per_day / self.tick_secs).ceil();
        if ticks.is_finite() {
            floor_f64_to_u64(ticks)
        } else {
            0
        }
    }
}

/// Aggregated outcome of one automated run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub ticks: u64,
    pub days_started: u32,
    pub orders_generated: u32,
    pub orders_completed: u64,
    pub orders_on_time: u32,
    pub orders_late: u32,
    pub orders_expired: u32,
    pub manager_accepts: u32,
    pub stage_moves: u64,
    pub completed_rarity: RarityCounts,
    pub actions: PolicyActions,
    pub starting_money: i64,
    pub final_resources: ResourceState,
    pub min_drive: f64,
    pub drive_violations: u32,
    pub quota_violations: u32,
    pub workers: u32,
    pub managers: u32,
    pub history_len: usize,
    pub notifications: usize,
    pub final_time: SimTime,
}

impl SimulationSummary {
    fn start(seed: u64, strategy: GameplayStrategy, session: &GameSession) -> Self {
        Self {
            seed,
            strategy,
            ticks: 0,
            days_started: u32::from(session.daily_plan().is_some()),
            orders_generated: session
                .daily_plan()
                .map_or(0, |plan| plan.generated_count),
            orders_completed: 0,
            orders_on_time: 0,
            orders_late: 0,
            orders_expired: 0,
            manager_accepts: 0,
            stage_moves: 0,
            completed_rarity: RarityCounts::default(),
            actions: PolicyActions::default(),
            starting_money: session.resources().money,
            final_resources: session.resources().clone(),
            min_drive: session.resources().drive,
            drive_violations: 0,
            quota_violations: 0,
            workers: 0,
            managers: 0,
            history_len: 0,
            notifications: 0,
            final_time: session.now(),
        }
    }

    fn record_tick(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.stage_moves += u64::from(report.stage_moves);
        self.orders_generated += report.generated;
        self.orders_expired += report.expired;
        if let Some(day) = report.day_started {
            self.days_started += 1;
            log::debug!("seed {} opened {day}", self.seed);
        }
        if report.manager_accepted.is_some() {
            self.manager_accepts += 1;
        }
        for settlement in &report.completed {
            self.orders_completed += 1;
            self.completed_rarity.record(settlement.rarity);
            if settlement.on_time {
                self.orders_on_time += 1;
            } else {
                self.orders_late += 1;
            }
        }
    }

    const fn record_actions(&mut self, actions: PolicyActions) {
        self.actions.absorb(actions);
    }

    fn check_invariants(&mut self, session: &GameSession) {
        let res = session.resources();
        if res.drive < 0.0 || res.drive > res.max_drive {
            self.drive_violations += 1;
        }
        self.min_drive = self.min_drive.min(res.drive);
        if let Some(plan) = session.daily_plan()
            && plan.generated_count > plan.target_count
        {
            self.quota_violations += 1;
        }
    }

    fn finish(&mut self, session: &GameSession) {
        self.final_resources = session.resources().clone();
        self.final_time = session.now();
        self.workers = session.workforce().workers_hired();
        self.managers = session.workforce().managers();
        self.history_len = session.history(pressroom_game::HistoryFilter::default()).len();
    }

    /// Stable fingerprint used to compare replays.
    #[must_use]
    pub fn digest(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.final_time,
            self.final_resources.money,
            self.final_resources.exp,
            self.final_resources.reputation,
            self.orders_completed,
            self.orders_generated,
            self.orders_expired
        )
    }

    #[must_use]
    pub fn money_delta(&self) -> i64 {
        self.final_resources.money - self.starting_money
    }
}

/// Play `plan` with `seed` until the requested number of work days have
/// finished.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a save round-trip
/// fails.
pub fn run_plan(plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
    run_plan_with_resume(plan, seed, plan.resume_at_tick)
}

fn run_plan_with_resume(
    plan: &SimulationPlan,
    seed: u64,
    resume_at_tick: Option<u64>,
) -> Result<SimulationSummary> {
    let cfg = plan.config();
    let max_ticks = plan.max_ticks(&cfg);
    let mut session = GameSession::new(cfg.clone(), seed).context("building session")?;
    let mut policy = plan.strategy.create_policy();
    let mut summary = SimulationSummary::start(seed, plan.strategy, &session);
    log::debug!("running {} with seed {seed}", policy.name());

    summary.record_actions(policy.act(&mut session));
    while summary.ticks < max_ticks {
        if resume_at_tick == Some(summary.ticks) {
            let json = session.snapshot().to_json().context("encoding save")?;
            let save = SaveState::from_json(&json).context("decoding save")?;
            session = GameSession::from_save(cfg.clone(), save).context("restoring save")?;
            log::debug!("resumed seed {seed} from save at tick {}", summary.ticks);
        }

        let report = session.tick(plan.tick_secs);
        summary.record_tick(&report);
        if summary.days_started > plan.days {
            break;
        }
        summary.record_actions(policy.act(&mut session));
        summary.notifications += session.drain_notifications().len();
        summary.check_invariants(&session);
    }

    summary.finish(&session);
    Ok(summary)
}

/// Run `plan` twice, once straight through and once with a save/resume at
/// the midpoint, and report whether the fingerprints differ.
///
/// # Errors
///
/// Returns an error if either run fails or the fingerprints diverge.
pub fn verify_replay(plan: &SimulationPlan, seed: u64, straight: &SimulationSummary) -> Result<()> {
    let midpoint = straight.ticks / 2;
    let resumed = run_plan_with_resume(plan, seed, Some(midpoint))?;
    anyhow::ensure!(
        resumed.digest() == straight.digest(),
        "replay diverged after resume at tick {midpoint}: {} vs {}",
        resumed.digest(),
        straight.digest()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_day_generates_without_completing() {
        let plan = SimulationPlan::new(GameplayStrategy::Idle);
        let summary = run_plan(&plan, 11).unwrap();
        assert_eq!(summary.days_started, 2);
        assert!(summary.orders_generated >= 1);
        assert_eq!(summary.orders_completed, 0);
        assert_eq!(summary.drive_violations, 0);
        assert_eq!(summary.quota_violations, 0);
        assert_eq!(summary.money_delta(), 0);
    }

    #[test]
    fn hustler_ships_orders() {
        let plan = SimulationPlan::new(GameplayStrategy::Hustler).with_days(2);
        let summary = run_plan(&plan, 12).unwrap();
        assert!(summary.orders_completed >= 1);
        assert!(summary.money_delta() > 0);
        assert_eq!(summary.drive_violations, 0);
        assert!(summary.notifications >= summary.history_len);
    }

    #[test]
    fn same_seed_same_digest() {
        let plan = SimulationPlan::new(GameplayStrategy::Staffer).with_days(2);
        let a = run_plan(&plan, 77).unwrap();
        let b = run_plan(&plan, 77).unwrap();
        assert_eq!(a.digest(), b.digest());
        verify_replay(&plan, 77, &a).unwrap();
    }

    #[test]
    fn tick_budget_covers_weekends() {
        let plan = SimulationPlan::new(GameplayStrategy::Idle).with_days(5);
        let cfg = plan.config();
        let per_day = 24.0 * cfg.game_hour_to_real_seconds / plan.tick_secs;
        #[allow(clippy::cast_precision_loss)]
        let budget = plan.max_ticks(&cfg) as f64;
        assert!(budget > per_day * 7.0);
    }
}
