//! Session coordinator.
//!
//! [`GameSession`] owns every component and advances them through a single
//! deterministic [`GameSession::tick`]. UI layers read through the query
//! methods, mutate through the command methods, and drain notifications.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::clock::{SimClock, SimTime};
use crate::config::GameConfig;
use crate::constants::{
    NOTE_DAY_END, NOTE_DAY_START, NOTE_MANAGER_HIRED, NOTE_NO_FREE_WORKER, NOTE_ORDER_ACCEPTED,
    NOTE_ORDER_COMPLETED, NOTE_ORDER_COMPLETED_LATE, NOTE_ORDER_EXPIRED,
    NOTE_ORDER_MANAGER_ACCEPTED, NOTE_ORDERS_ARRIVED, NOTE_RARE_DAY, NOTE_WORKER_ASSIGNED,
    NOTE_WORKER_HIRED, NOTE_WORKER_UNASSIGNED,
};
use crate::error::{CommandError, ConfigError, RestoreError};
use crate::generator::{DailyOrderPlan, OrderGenerator};
use crate::ledger::{ResourceLedger, ResourceState};
use crate::notify::{
    Category, HistoryFilter, Notification, NotificationLog, NotificationSink, Polarity,
};
use crate::orders::{Order, OrderId, Rarity, RarityCounts};
use crate::pipeline::{Advance, DepartmentId, PipelineEngine, Settlement};
use crate::rng::RngBundle;
use crate::snapshot::{SAVE_FORMAT_VERSION, SaveState};
use crate::workforce::WorkforceManager;

/// What a single tick changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub stage_moves: u32,
    pub completed: SmallVec<[Settlement; 4]>,
    pub generated: u32,
    pub expired: u32,
    pub manager_accepted: Option<OrderId>,
    pub day_started: Option<NaiveDate>,
}

/// Read-only department summary for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentView {
    pub id: DepartmentId,
    pub name: String,
    pub employees: u32,
    pub queued: usize,
    pub badges: RarityCounts,
}

/// One running print shop.
#[derive(Debug, Clone)]
pub struct GameSession {
    config: GameConfig,
    clock: SimClock,
    ledger: ResourceLedger,
    generator: OrderGenerator,
    pipeline: PipelineEngine,
    workforce: WorkforceManager,
    notes: NotificationLog,
    rng: RngBundle,
    closed_day: Option<NaiveDate>,
}

impl GameSession {
    /// Start a fresh session at the configured start date.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when `config` fails validation.
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let clock = SimClock::from_config(&config)?;
        let ledger = ResourceLedger::new(
            config.drive.base_drive,
            config.starting_money,
            config.drive.drive_per_hour,
        );
        let mut session = Self {
            generator: OrderGenerator::new(&config),
            pipeline: PipelineEngine::new(config.orders.late_reward_ratio),
            workforce: WorkforceManager::new(),
            notes: NotificationLog::new(config.history_limit, config.features.history),
            rng: RngBundle::from_user_seed(seed),
            closed_day: None,
            clock,
            ledger,
            config,
        };
        if session.config.features.skip_idle_time {
            session.clock.advance_to_work_start();
        }
        session.open_day_if_due();
        Ok(session)
    }

    /// Rebuild a session from saved state. Payout rules come from `config`,
    /// not from the save.
    ///
    /// # Errors
    ///
    /// Returns `RestoreError::Config` when `config` fails validation, or
    /// `RestoreError::StaleQueueEntry` when a department queue names an order
    /// that is not in progress.
    pub fn from_save(config: GameConfig, save: SaveState) -> Result<Self, RestoreError> {
        config.validate()?;
        save.pipeline.verify_queues()?;
        let mut clock = SimClock::from_config(&config)?;
        clock.set(save.saved_at);
        let mut pipeline = save.pipeline;
        pipeline.set_late_reward_ratio(config.orders.late_reward_ratio);
        Ok(Self {
            generator: OrderGenerator::new(&config).with_state(save.generator),
            ledger: ResourceLedger::from_state(save.resources, config.drive.drive_per_hour),
            pipeline,
            workforce: save.workforce,
            notes: save.notifications,
            rng: RngBundle::restore(&save.rng),
            closed_day: save.closed_day,
            clock,
            config,
        })
    }

    /// Serializable copy of the whole session.
    #[must_use]
    pub fn snapshot(&self) -> SaveState {
        SaveState {
            version: SAVE_FORMAT_VERSION,
            saved_at: self.clock.now(),
            resources: self.ledger.state().clone(),
            pipeline: self.pipeline.clone(),
            workforce: self.workforce.clone(),
            generator: self.generator.state().clone(),
            rng: self.rng.positions(),
            notifications: self.notes.clone(),
            closed_day: self.closed_day,
        }
    }

    // Tick ------------------------------------------------------------------

    /// Advance the session by `elapsed_real_seconds` of real time.
    ///
    /// Order within a tick: clock, passive drain, worker steps, manager pick,
    /// day rollover, expiry, batch generation. Non-positive or non-finite
    /// elapsed times are ignored.
    pub fn tick(&mut self, elapsed_real_seconds: f64) -> TickReport {
        let mut report = TickReport::default();
        if !elapsed_real_seconds.is_finite() || elapsed_real_seconds <= 0.0 {
            return report;
        }

        self.clock.advance(elapsed_real_seconds);
        let working = self.clock.is_work_time();
        if working {
            self.ledger
                .drain_passive(elapsed_real_seconds, self.workforce.assigned_total());

            let steps = self.workforce.worker_steps_due(
                elapsed_real_seconds,
                self.config.staffing.base_employee_speed_ms,
            );
            for _ in 0..steps {
                let advances =
                    self.workforce
                        .run_worker_step(&mut self.pipeline, &mut self.ledger, &self.clock);
                if advances.is_empty() {
                    break;
                }
                for advance in advances {
                    self.record_advance(advance, &mut report);
                }
            }

            if self.config.features.managers
                && self
                    .workforce
                    .manager_pick_due(elapsed_real_seconds, self.config.staffing.manager_interval_secs)
            {
                report.manager_accepted = self.manager_accept();
            }
        }

        report.day_started = self.roll_day();
        report.expired = self.prune_expired();

        if self.clock.is_work_time() {
            let delta = if working { elapsed_real_seconds } else { 0.0 };
            let batch = self.generator.emit_due(
                delta,
                self.clock.now(),
                self.pipeline.available().len(),
                self.clock.work_time_progress(),
                self.rng.orders(),
            );
            report.generated = crate::numbers::usize_to_u32(batch.len());
            if !batch.is_empty() {
                self.publish(
                    Category::Order,
                    None,
                    Polarity::Neutral,
                    NOTE_ORDERS_ARRIVED,
                    format!("{} new orders arrived", batch.len()),
                );
            }
            for order in batch {
                self.pipeline.offer(order);
            }
        }

        log::trace!(
            "tick {:.2}s at {}: drive {:.1}, moves {}, generated {}",
            elapsed_real_seconds,
            self.clock.now(),
            self.ledger.drive(),
            report.stage_moves,
            report.generated
        );
        report
    }

    fn roll_day(&mut self) -> Option<NaiveDate> {
        let today = self.clock.now().date();
        if self.clock.is_past_work_end()
            && self.generator.planned_day() == Some(today)
            && self.closed_day != Some(today)
        {
            self.closed_day = Some(today);
            self.close_day();
        }
        if self.config.features.skip_idle_time && !self.clock.is_work_time() {
            self.clock.advance_to_work_start();
        }
        self.open_day_if_due()
    }

    fn close_day(&mut self) {
        let Some(plan) = self.generator.plan() else {
            return;
        };
        let message = format!(
            "Work day {} closed: {} of {} orders issued, {} completed in total",
            plan.day,
            plan.generated_count,
            plan.target_count,
            self.pipeline.completed_count()
        );
        log::info!("{message}");
        let orders_draws = self.rng.orders().draws();
        let calendar_draws = self.rng.calendar().draws();
        let manager_draws = self.rng.managers().draws();
        log::debug!(
            "rng draws since load: orders {orders_draws}, calendar {calendar_draws}, managers {manager_draws}"
        );
        self.publish(Category::System, None, Polarity::Neutral, NOTE_DAY_END, message);
    }

    fn open_day_if_due(&mut self) -> Option<NaiveDate> {
        if !self.clock.is_work_time() {
            return None;
        }
        let now = self.clock.now();
        if self.generator.planned_day() == Some(now.date()) {
            return None;
        }

        self.ledger.restore_drive();
        let plan = self
            .generator
            .start_day(
                self.ledger.state(),
                self.workforce.assigned_total(),
                now,
                self.rng.calendar(),
            )
            .clone();
        if plan.is_rare_day {
            self.publish(
                Category::System,
                Some(Rarity::Legendary),
                Polarity::Positive,
                NOTE_RARE_DAY,
                "Rare day! More orders than usual are expected today".to_string(),
            );
        }
        for order in self.generator.initial_burst(now, self.rng.orders()) {
            self.pipeline.offer(order);
        }
        let rare_tag = if plan.is_rare_day { " (rare day)" } else { "" };
        log::info!(
            "opened {}{rare_tag}: target {} orders",
            plan.day,
            plan.target_count
        );
        self.publish(
            Category::System,
            plan.is_rare_day.then_some(Rarity::Legendary),
            Polarity::Positive,
            NOTE_DAY_START,
            format!(
                "A new work day has begun: {}{rare_tag}. Target orders: {}",
                plan.day, plan.target_count
            ),
        );
        Some(plan.day)
    }

    fn prune_expired(&mut self) -> u32 {
        let expired = self.pipeline.prune_expired(self.clock.now());
        for order in &expired {
            log::debug!("order {} expired", order.id);
            self.publish(
                Category::Order,
                Some(order.rarity),
                Polarity::Negative,
                NOTE_ORDER_EXPIRED,
                format!("Order \"{}\" expired and was removed", order.name),
            );
        }
        crate::numbers::usize_to_u32(expired.len())
    }

    fn manager_accept(&mut self) -> Option<OrderId> {
        let cost = self.config.drive.actions_per_order;
        let id = self
            .workforce
            .manager_pick(&self.pipeline, &self.ledger, cost, self.rng.managers())?;
        self.pipeline
            .accept_order(id, &mut self.ledger, cost)
            .ok()?;
        let (name, rarity) = self.active_label(id);
        self.publish(
            Category::Employee,
            rarity,
            Polarity::Positive,
            NOTE_ORDER_MANAGER_ACCEPTED,
            format!("A manager accepted order \"{name}\""),
        );
        Some(id)
    }

    fn record_advance(&mut self, advance: Advance, report: &mut TickReport) {
        report.stage_moves = report.stage_moves.saturating_add(1);
        if let Advance::Completed(settlement) = advance {
            self.announce_completion(&settlement);
            report.completed.push(settlement);
        }
    }

    fn announce_completion(&mut self, settlement: &Settlement) {
        let (key, polarity, timing) = if settlement.on_time {
            (NOTE_ORDER_COMPLETED, Polarity::Positive, "on time")
        } else {
            (NOTE_ORDER_COMPLETED_LATE, Polarity::Negative, "late")
        };
        self.publish(
            Category::Order,
            Some(settlement.rarity),
            polarity,
            key,
            format!(
                "Order {} completed {timing}: +{} money, {:+} reputation, +{} exp",
                settlement.id, settlement.reward, settlement.reputation_delta, settlement.exp_reward
            ),
        );
    }

    fn active_label(&self, id: OrderId) -> (String, Option<Rarity>) {
        self.pipeline
            .active()
            .iter()
            .find(|o| o.id == id)
            .map_or_else(|| (id.to_string(), None), |o| (o.name.clone(), Some(o.rarity)))
    }

    fn publish(
        &mut self,
        category: Category,
        rarity: Option<Rarity>,
        polarity: Polarity,
        key: &str,
        message: String,
    ) {
        let at = self.clock.now();
        self.notes.push(at, category, rarity, polarity, key, message);
    }

    // Commands --------------------------------------------------------------

    /// Accept an available order into Design.
    ///
    /// # Errors
    ///
    /// `OrderNotFound` or `InsufficientDrive`; the session is unchanged.
    pub fn accept_order(&mut self, id: OrderId) -> Result<(), CommandError> {
        self.pipeline
            .accept_order(id, &mut self.ledger, self.config.drive.actions_per_order)?;
        let (name, rarity) = self.active_label(id);
        self.publish(
            Category::Order,
            rarity,
            Polarity::Positive,
            NOTE_ORDER_ACCEPTED,
            format!("Order \"{name}\" accepted"),
        );
        Ok(())
    }

    /// Manually process the head of a department's queue.
    ///
    /// # Errors
    ///
    /// `OutsideWorkHours`, `EmptyQueue` or `InsufficientDrive`; the session
    /// is unchanged.
    pub fn process_department(&mut self, department: DepartmentId) -> Result<Advance, CommandError> {
        let advance = self
            .pipeline
            .try_advance(department, &mut self.ledger, &self.clock)?;
        if let Advance::Completed(settlement) = &advance {
            self.announce_completion(settlement);
        }
        Ok(advance)
    }

    /// Hire a worker; returns the number of workers hired so far.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` when money is short.
    pub fn hire_worker(&mut self) -> Result<u32, CommandError> {
        let hired = self
            .workforce
            .hire_worker(&mut self.ledger, &self.config.staffing)?;
        self.publish(
            Category::Employee,
            None,
            Polarity::Positive,
            NOTE_WORKER_HIRED,
            format!(
                "New worker hired. Free workers: {}",
                self.workforce.free_workers()
            ),
        );
        Ok(hired)
    }

    /// Hire an order manager; returns the manager headcount.
    ///
    /// # Errors
    ///
    /// `FeatureDisabled` when managers are switched off, `InsufficientFunds`
    /// when money is short.
    pub fn hire_manager(&mut self) -> Result<u32, CommandError> {
        if !self.config.features.managers {
            return Err(CommandError::FeatureDisabled("managers"));
        }
        let managers = self
            .workforce
            .hire_manager(&mut self.ledger, &self.config.staffing)?;
        self.publish(
            Category::Employee,
            None,
            Polarity::Positive,
            NOTE_MANAGER_HIRED,
            format!("Order manager hired. Managers on staff: {managers}"),
        );
        Ok(managers)
    }

    /// Assign a free worker to `department`.
    ///
    /// # Errors
    ///
    /// `InvalidAssignment` when no worker is free. The failure is also
    /// published as a notification; nothing else changes.
    pub fn assign_employee(&mut self, department: DepartmentId) -> Result<u32, CommandError> {
        let staffed = match self.workforce.assign(department) {
            Ok(staffed) => staffed,
            Err(err) => {
                self.publish(
                    Category::Employee,
                    None,
                    Polarity::Negative,
                    NOTE_NO_FREE_WORKER,
                    "No free workers available to assign".to_string(),
                );
                return Err(err);
            }
        };
        self.publish(
            Category::Employee,
            None,
            Polarity::Positive,
            NOTE_WORKER_ASSIGNED,
            format!("Worker assigned to {}", department.name()),
        );
        Ok(staffed)
    }

    /// Return a worker from `department` to the free pool.
    ///
    /// # Errors
    ///
    /// `InvalidAssignment` when the department has nobody assigned.
    pub fn unassign_employee(&mut self, department: DepartmentId) -> Result<u32, CommandError> {
        let staffed = self.workforce.unassign(department)?;
        self.publish(
            Category::Employee,
            None,
            Polarity::Neutral,
            NOTE_WORKER_UNASSIGNED,
            format!("Worker removed from {}", department.name()),
        );
        Ok(staffed)
    }

    // Queries ---------------------------------------------------------------

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.seed()
    }

    #[must_use]
    pub const fn now(&self) -> SimTime {
        self.clock.now()
    }

    #[must_use]
    pub const fn clock(&self) -> &SimClock {
        &self.clock
    }

    #[must_use]
    pub fn is_work_time(&self) -> bool {
        self.clock.is_work_time()
    }

    #[must_use]
    pub const fn resources(&self) -> &ResourceState {
        self.ledger.state()
    }

    #[must_use]
    pub fn available_orders(&self) -> &[Order] {
        self.pipeline.available()
    }

    #[must_use]
    pub fn active_orders(&self) -> &[Order] {
        self.pipeline.active()
    }

    #[must_use]
    pub const fn completed_count(&self) -> u64 {
        self.pipeline.completed_count()
    }

    /// Orders waiting at `department`, next to be processed first.
    #[must_use]
    pub fn department_queue(&self, department: DepartmentId) -> Vec<&Order> {
        self.pipeline.queue_contents(department)
    }

    #[must_use]
    pub fn department_badges(&self, department: DepartmentId) -> RarityCounts {
        self.pipeline.queue(department).badges()
    }

    /// All seven departments in pipeline order.
    #[must_use]
    pub fn departments(&self) -> Vec<DepartmentView> {
        DepartmentId::all()
            .map(|id| {
                let queue = self.pipeline.queue(id);
                DepartmentView {
                    id,
                    name: id.name().to_string(),
                    employees: self.workforce.assigned(id),
                    queued: queue.len(),
                    badges: queue.badges(),
                }
            })
            .collect()
    }

    /// Department an active order is waiting in.
    #[must_use]
    pub fn order_stage(&self, id: OrderId) -> Option<&'static str> {
        self.pipeline.stage_name(id)
    }

    #[must_use]
    pub const fn workforce(&self) -> &WorkforceManager {
        &self.workforce
    }

    #[must_use]
    pub const fn daily_plan(&self) -> Option<&DailyOrderPlan> {
        self.generator.plan()
    }

    /// Fraction of today's work window already elapsed.
    #[must_use]
    pub fn day_progress(&self) -> f64 {
        self.clock.work_time_progress()
    }

    /// Notification history, newest first.
    #[must_use]
    pub fn history(&self, filter: HistoryFilter) -> Vec<&Notification> {
        self.notes.history(filter)
    }

    /// Take every notification published since the last drain.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notes.drain()
    }

    /// Forward pending notifications to `sink`.
    pub fn forward_notifications(&mut self, sink: &mut dyn NotificationSink) {
        self.notes.forward_to(sink);
    }

    /// Test and tooling hook to move the clock directly.
    pub const fn set_time(&mut self, at: SimTime) {
        self.clock.set(at);
    }
}
