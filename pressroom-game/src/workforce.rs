//! Workers, managers and their automated throughput.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::SimClock;
use crate::config::StaffingConfig;
use crate::error::CommandError;
use crate::ledger::ResourceLedger;
use crate::orders::OrderId;
use crate::pipeline::{AdvanceBatch, DEPARTMENT_COUNT, DepartmentId, PipelineEngine};

/// Staff roster and cadence accumulators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkforceManager {
    free_workers: u32,
    assigned: [u32; DEPARTMENT_COUNT],
    managers: u32,
    workers_hired: u32,
    worker_clock: f64,
    manager_clock: f64,
}

impl WorkforceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn free_workers(&self) -> u32 {
        self.free_workers
    }

    #[must_use]
    pub const fn managers(&self) -> u32 {
        self.managers
    }

    #[must_use]
    pub const fn workers_hired(&self) -> u32 {
        self.workers_hired
    }

    #[must_use]
    pub const fn assigned(&self, department: DepartmentId) -> u32 {
        self.assigned[department.index()]
    }

    /// Workers currently staffing any department.
    #[must_use]
    pub fn assigned_total(&self) -> u32 {
        self.assigned.iter().sum()
    }

    /// Hire a generic worker into the free pool.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` when money is below the worker cost.
    pub fn hire_worker(
        &mut self,
        ledger: &mut ResourceLedger,
        staffing: &StaffingConfig,
    ) -> Result<u32, CommandError> {
        ledger.hire(staffing.worker_cost, staffing.worker_drive_bonus)?;
        self.free_workers = self.free_workers.saturating_add(1);
        self.workers_hired = self.workers_hired.saturating_add(1);
        log::debug!("hired worker #{}", self.workers_hired);
        Ok(self.workers_hired)
    }

    /// Hire an order manager. Managers add no drive capacity.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` when money is below the manager cost.
    pub fn hire_manager(
        &mut self,
        ledger: &mut ResourceLedger,
        staffing: &StaffingConfig,
    ) -> Result<u32, CommandError> {
        ledger.spend_money(staffing.manager_cost)?;
        self.managers = self.managers.saturating_add(1);
        log::debug!("hired manager, {} on staff", self.managers);
        Ok(self.managers)
    }

    /// Move a free worker into `department`.
    ///
    /// # Errors
    ///
    /// `InvalidAssignment` when no worker is free.
    pub fn assign(&mut self, department: DepartmentId) -> Result<u32, CommandError> {
        if self.free_workers == 0 {
            return Err(CommandError::InvalidAssignment);
        }
        self.free_workers -= 1;
        let slot = &mut self.assigned[department.index()];
        *slot = slot.saturating_add(1);
        Ok(*slot)
    }

    /// Return a worker from `department` to the free pool.
    ///
    /// # Errors
    ///
    /// `InvalidAssignment` when nobody works in `department`.
    pub fn unassign(&mut self, department: DepartmentId) -> Result<u32, CommandError> {
        let slot = &mut self.assigned[department.index()];
        if *slot == 0 {
            return Err(CommandError::InvalidAssignment);
        }
        *slot -= 1;
        let remaining = *slot;
        self.free_workers = self.free_workers.saturating_add(1);
        Ok(remaining)
    }

    /// Accumulate work time and return how many worker steps are due.
    pub fn worker_steps_due(&mut self, real_delta_seconds: f64, speed_ms: u64) -> u32 {
        let period = crate::numbers::u64_ms_to_secs(speed_ms);
        due_periods(&mut self.worker_clock, real_delta_seconds, period)
    }

    /// Accumulate work time and report whether a manager pick is due.
    pub fn manager_pick_due(&mut self, real_delta_seconds: f64, interval_secs: f64) -> bool {
        if self.managers == 0 {
            self.manager_clock = 0.0;
            return false;
        }
        self.manager_clock += real_delta_seconds.max(0.0);
        if self.manager_clock < interval_secs {
            return false;
        }
        self.manager_clock = 0.0;
        true
    }

    /// One automated pass: each staffed department advances up to its
    /// headcount, Design first.
    pub fn run_worker_step(
        &self,
        pipeline: &mut PipelineEngine,
        ledger: &mut ResourceLedger,
        clock: &SimClock,
    ) -> AdvanceBatch {
        let mut out = AdvanceBatch::new();
        for department in DepartmentId::all() {
            let staff = self.assigned(department);
            if staff == 0 || !ledger.has_drive(crate::pipeline::DRIVE_PER_STEP) {
                continue;
            }
            let steps = usize::try_from(staff).unwrap_or(usize::MAX);
            out.extend(pipeline.advance_many(department, steps, ledger, clock));
        }
        out
    }

    /// Pick a random available order for a manager to accept. Returns `None`
    /// when the pool is empty or drive cannot cover the admission cost.
    pub fn manager_pick<R: Rng>(
        &self,
        pipeline: &PipelineEngine,
        ledger: &ResourceLedger,
        admission_cost: f64,
        rng: &mut R,
    ) -> Option<OrderId> {
        let pool = pipeline.available().len();
        if self.managers == 0 || pool == 0 || !ledger.has_drive(admission_cost) {
            return None;
        }
        pipeline.available_id_at(rng.gen_range(0..pool))
    }
}

fn due_periods(accumulator: &mut f64, delta: f64, period: f64) -> u32 {
    if delta.is_finite() && delta > 0.0 {
        *accumulator += delta;
    }
    if period <= 0.0 {
        return 0;
    }
    let mut due = 0u32;
    while *accumulator >= period {
        *accumulator -= period;
        due = due.saturating_add(1);
    }
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimTime;
    use crate::config::WorkCalendar;
    use crate::orders::{Order, Rarity, STAGE_AVAILABLE};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn dept(id: u8) -> DepartmentId {
        DepartmentId::try_from(id).unwrap()
    }

    fn order(id: u64) -> Order {
        Order {
            id: OrderId(id),
            name: format!("Catalogs #{id}"),
            kind: "Catalogs".to_string(),
            rarity: Rarity::Common,
            reward: 80,
            deadline: SimTime::from_ymd_hm(2025, 9, 1, 16, 0).unwrap(),
            reputation_reward: 1,
            reputation_penalty: -1,
            exp_reward: 10,
            stage: STAGE_AVAILABLE,
            accepted: false,
        }
    }

    #[test]
    fn hiring_and_assignment_track_pools() {
        let mut staff = WorkforceManager::new();
        let mut ledger = ResourceLedger::new(80.0, 1_000, 1.0);
        let staffing = StaffingConfig::default();
        assert_eq!(staff.assign(dept(1)), Err(CommandError::InvalidAssignment));
        staff.hire_worker(&mut ledger, &staffing).unwrap();
        assert!((ledger.state().max_drive - 160.0).abs() < f64::EPSILON);
        assert_eq!(staff.assign(dept(3)), Ok(1));
        assert_eq!(staff.free_workers(), 0);
        assert_eq!(staff.assigned_total(), 1);
        assert_eq!(staff.unassign(dept(2)), Err(CommandError::InvalidAssignment));
        assert_eq!(staff.unassign(dept(3)), Ok(0));
        assert_eq!(staff.free_workers(), 1);

        let err = staff.hire_manager(&mut ledger, &staffing).unwrap_err();
        assert!(matches!(err, CommandError::InsufficientFunds { needed: 800, .. }));
        assert_eq!(staff.managers(), 0);
    }

    #[test]
    fn cadence_accumulates_fractional_time() {
        let mut staff = WorkforceManager::new();
        assert_eq!(staff.worker_steps_due(0.3, 500), 0);
        assert_eq!(staff.worker_steps_due(0.3, 500), 1);
        assert_eq!(staff.worker_steps_due(1.0, 500), 2);
        assert!(!staff.manager_pick_due(20.0, 10.0));
        staff.managers = 1;
        assert!(!staff.manager_pick_due(9.0, 10.0));
        assert!(staff.manager_pick_due(1.0, 10.0));
        assert!(!staff.manager_pick_due(1.0, 10.0));
    }

    #[test]
    fn worker_step_advances_headcount_per_department() {
        let mut staff = WorkforceManager::new();
        let mut ledger = ResourceLedger::new(200.0, 10_000, 1.0);
        let staffing = StaffingConfig::default();
        let mut pipeline = PipelineEngine::new(0.5);
        let clock = SimClock::new(
            SimTime::from_ymd_hm(2025, 9, 1, 10, 0).unwrap(),
            WorkCalendar::default(),
            8.0,
        );
        for id in 1..=3 {
            pipeline.offer(order(id));
            pipeline.accept_order(OrderId(id), &mut ledger, 7.0).unwrap();
        }
        staff.hire_worker(&mut ledger, &staffing).unwrap();
        staff.hire_worker(&mut ledger, &staffing).unwrap();
        staff.assign(dept(1)).unwrap();
        staff.assign(dept(1)).unwrap();
        let steps = staff.run_worker_step(&mut pipeline, &mut ledger, &clock);
        assert_eq!(steps.len(), 2);
        assert_eq!(pipeline.queue(dept(1)).len(), 1);
        assert_eq!(pipeline.queue(dept(2)).len(), 2);
    }

    #[test]
    fn manager_pick_needs_staff_pool_and_drive() {
        let mut staff = WorkforceManager::new();
        let mut ledger = ResourceLedger::new(80.0, 1_000, 1.0);
        let mut pipeline = PipelineEngine::new(0.5);
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        pipeline.offer(order(1));
        assert_eq!(staff.manager_pick(&pipeline, &ledger, 7.0, &mut rng), None);
        staff
            .hire_manager(&mut ledger, &StaffingConfig::default())
            .unwrap();
        assert_eq!(
            staff.manager_pick(&pipeline, &ledger, 7.0, &mut rng),
            Some(OrderId(1))
        );
        ledger.spend_drive(75.0).unwrap();
        assert_eq!(staff.manager_pick(&pipeline, &ledger, 7.0, &mut rng), None);
    }
}
