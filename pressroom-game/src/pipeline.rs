//! Seven-stage department pipeline.
//!
//! Accepted orders enter Design and leave Packaging. Each department keeps a
//! max-heap keyed by `(rarity rank, enqueue order)`, so legendary jobs are
//! processed before rare ones and rare before common, first-in-first-out
//! within a tier.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

use crate::clock::{SimClock, SimTime};
use crate::error::{CommandError, InvalidDepartmentId, RestoreError};
use crate::ledger::ResourceLedger;
use crate::orders::{Order, OrderId, Rarity, RarityCounts, STAGE_AVAILABLE, STAGE_COMPLETE};

/// Number of departments an order passes through.
pub const DEPARTMENT_COUNT: usize = 7;
/// Drive spent per stage transition.
pub const DRIVE_PER_STEP: f64 = 1.0;

const DEPARTMENT_NAMES: [&str; DEPARTMENT_COUNT] = [
    "Design",
    "Printing",
    "Cutting",
    "Folding",
    "Binding",
    "Lamination",
    "Packaging",
];

/// Department identifier, always within `1..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DepartmentId(u8);

impl DepartmentId {
    pub const DESIGN: Self = Self(1);
    pub const PACKAGING: Self = Self(7);

    /// Every department in pipeline order.
    #[must_use]
    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        (1..=7).map(Self)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        DEPARTMENT_NAMES[self.index()]
    }

    /// The department after this one, `None` after Packaging.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        if self.0 >= 7 {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }
}

impl TryFrom<u8> for DepartmentId {
    type Error = InvalidDepartmentId;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=7).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidDepartmentId(value))
        }
    }
}

impl From<DepartmentId> for u8 {
    fn from(id: DepartmentId) -> Self {
        id.0
    }
}

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct QueueEntry {
    rank: u8,
    seq: Reverse<u64>,
    id: OrderId,
    rarity: Rarity,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.rank, self.seq).cmp(&(other.rank, other.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A department's work queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepartmentQueue {
    heap: BinaryHeap<QueueEntry>,
}

impl DepartmentQueue {
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Queued ids in processing order.
    #[must_use]
    pub fn ids(&self) -> Vec<OrderId> {
        let mut entries = self.heap.clone().into_sorted_vec();
        entries.reverse();
        entries.into_iter().map(|entry| entry.id).collect()
    }

    #[must_use]
    pub fn badges(&self) -> RarityCounts {
        let mut counts = RarityCounts::default();
        for entry in &self.heap {
            counts.record(entry.rarity);
        }
        counts
    }
}

/// Result of a single completed order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: OrderId,
    pub rarity: Rarity,
    pub reward: i64,
    pub reputation_delta: i64,
    pub exp_reward: i64,
    pub on_time: bool,
}

/// Result of one stage transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Advance {
    Moved { id: OrderId, to: DepartmentId },
    Completed(Settlement),
}

pub type AdvanceBatch = SmallVec<[Advance; 4]>;

/// Available pool, active set and department queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEngine {
    available: Vec<Order>,
    active: Vec<Order>,
    queues: [DepartmentQueue; DEPARTMENT_COUNT],
    next_seq: u64,
    completed: u64,
    late_reward_ratio: f64,
}

impl PipelineEngine {
    #[must_use]
    pub fn new(late_reward_ratio: f64) -> Self {
        Self {
            available: Vec::new(),
            active: Vec::new(),
            queues: std::array::from_fn(|_| DepartmentQueue::default()),
            next_seq: 0,
            completed: 0,
            late_reward_ratio,
        }
    }

    /// Replace the late-delivery payout ratio, e.g. after loading a save
    /// under a different configuration.
    pub const fn set_late_reward_ratio(&mut self, ratio: f64) {
        self.late_reward_ratio = ratio;
    }

    #[must_use]
    pub const fn late_reward_ratio(&self) -> f64 {
        self.late_reward_ratio
    }

    /// Every queued id must refer to an order in progress.
    ///
    /// # Errors
    ///
    /// `StaleQueueEntry` for the first queued id with no active order.
    pub fn verify_queues(&self) -> Result<(), RestoreError> {
        for department in DepartmentId::all() {
            let queue = &self.queues[department.index()];
            if let Some(entry) = queue
                .heap
                .iter()
                .find(|entry| !self.active.iter().any(|o| o.id == entry.id))
            {
                return Err(RestoreError::StaleQueueEntry {
                    department,
                    id: entry.id,
                });
            }
        }
        Ok(())
    }

    /// Put a freshly generated order into the available pool.
    pub fn offer(&mut self, mut order: Order) {
        order.stage = STAGE_AVAILABLE;
        order.accepted = false;
        self.available.push(order);
    }

    #[must_use]
    pub fn available(&self) -> &[Order] {
        &self.available
    }

    #[must_use]
    pub fn active(&self) -> &[Order] {
        &self.active
    }

    #[must_use]
    pub const fn completed_count(&self) -> u64 {
        self.completed
    }

    #[must_use]
    pub fn queue(&self, department: DepartmentId) -> &DepartmentQueue {
        &self.queues[department.index()]
    }

    /// Orders queued at `department` in processing order.
    #[must_use]
    pub fn queue_contents(&self, department: DepartmentId) -> Vec<&Order> {
        self.queue(department)
            .ids()
            .into_iter()
            .filter_map(|id| self.active.iter().find(|o| o.id == id))
            .collect()
    }

    /// Name of the department an active order currently waits in.
    #[must_use]
    pub fn stage_name(&self, id: OrderId) -> Option<&'static str> {
        let order = self.active.iter().find(|o| o.id == id)?;
        DepartmentId::try_from(order.stage)
            .ok()
            .map(DepartmentId::name)
    }

    /// Move an available order into Design, charging `cost` drive.
    ///
    /// # Errors
    ///
    /// `OrderNotFound` when `id` is not in the available pool, or
    /// `InsufficientDrive` when the ledger cannot cover `cost`. Neither
    /// failure changes the pool or the ledger.
    pub fn accept_order(
        &mut self,
        id: OrderId,
        ledger: &mut ResourceLedger,
        cost: f64,
    ) -> Result<(), CommandError> {
        let pos = self
            .available
            .iter()
            .position(|o| o.id == id)
            .ok_or(CommandError::OrderNotFound(id))?;
        ledger.spend_drive(cost)?;
        let mut order = self.available.remove(pos);
        order.stage = DepartmentId::DESIGN.get();
        order.accepted = true;
        self.enqueue(DepartmentId::DESIGN, &order);
        log::debug!("accepted order {} ({})", order.id, order.rarity);
        self.active.push(order);
        Ok(())
    }

    /// Process the head of `department`'s queue.
    ///
    /// # Errors
    ///
    /// `OutsideWorkHours`, `EmptyQueue` or `InsufficientDrive`; none of them
    /// mutate state.
    pub fn try_advance(
        &mut self,
        department: DepartmentId,
        ledger: &mut ResourceLedger,
        clock: &SimClock,
    ) -> Result<Advance, CommandError> {
        if !clock.is_work_time() {
            return Err(CommandError::OutsideWorkHours);
        }
        let Some(&head) = self.queues[department.index()].heap.peek() else {
            return Err(CommandError::EmptyQueue(department));
        };
        let pos = self
            .active
            .iter()
            .position(|o| o.id == head.id)
            .ok_or(CommandError::OrderNotFound(head.id))?;
        ledger.spend_drive(DRIVE_PER_STEP)?;
        self.queues[department.index()].heap.pop();

        let order = &mut self.active[pos];
        order.stage = order.stage.saturating_add(1);
        if let Some(next) = department.next() {
            let order = order.clone();
            self.enqueue(next, &order);
            return Ok(Advance::Moved {
                id: order.id,
                to: next,
            });
        }
        self.complete_order(head.id, ledger, clock.now())
            .map(Advance::Completed)
            .ok_or(CommandError::OrderNotFound(head.id))
    }

    /// Silent variant of [`Self::try_advance`] used by automated workers.
    pub fn advance_one_unit(
        &mut self,
        department: DepartmentId,
        ledger: &mut ResourceLedger,
        clock: &SimClock,
    ) -> Option<Advance> {
        self.try_advance(department, ledger, clock).ok()
    }

    /// Advance up to `steps` orders from `department`, stopping early when the
    /// queue empties or drive runs out.
    pub fn advance_many(
        &mut self,
        department: DepartmentId,
        steps: usize,
        ledger: &mut ResourceLedger,
        clock: &SimClock,
    ) -> AdvanceBatch {
        let steps = steps.min(self.queues[department.index()].len());
        let mut out = AdvanceBatch::new();
        for _ in 0..steps {
            match self.advance_one_unit(department, ledger, clock) {
                Some(advance) => out.push(advance),
                None => break,
            }
        }
        out
    }

    /// Settle an active order and drop it from the pipeline. Returns `None`
    /// when `id` is not active, so repeated calls settle at most once.
    pub fn complete_order(
        &mut self,
        id: OrderId,
        ledger: &mut ResourceLedger,
        now: SimTime,
    ) -> Option<Settlement> {
        let pos = self.active.iter().position(|o| o.id == id)?;
        let mut order = self.active.remove(pos);
        for queue in &mut self.queues {
            queue.heap.retain(|entry| entry.id != id);
        }
        order.stage = STAGE_COMPLETE;
        let settlement = Settlement {
            id,
            rarity: order.rarity,
            reward: order.payout(now, self.late_reward_ratio),
            reputation_delta: order.reputation_delta(now),
            exp_reward: order.exp_reward,
            on_time: order.is_on_time(now),
        };
        ledger.apply_order_reward(
            settlement.reward,
            settlement.exp_reward,
            settlement.reputation_delta,
        );
        self.completed = self.completed.saturating_add(1);
        log::debug!(
            "completed order {} for {} (on time: {})",
            id,
            settlement.reward,
            settlement.on_time
        );
        Some(settlement)
    }

    /// Remove available orders whose deadline has passed.
    pub fn prune_expired(&mut self, now: SimTime) -> Vec<Order> {
        let (expired, kept): (Vec<Order>, Vec<Order>) = std::mem::take(&mut self.available)
            .into_iter()
            .partition(|o| o.is_expired(now));
        self.available = kept;
        expired
    }

    /// Id of the available order at `index`; used by manager picks.
    #[must_use]
    pub fn available_id_at(&self, index: usize) -> Option<OrderId> {
        self.available.get(index).map(|o| o.id)
    }

    fn enqueue(&mut self, department: DepartmentId, order: &Order) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.queues[department.index()].heap.push(QueueEntry {
            rank: order.rarity.rank(),
            seq: Reverse(seq),
            id: order.id,
            rarity: order.rarity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkCalendar;

    fn clock() -> SimClock {
        SimClock::new(
            SimTime::from_ymd_hm(2025, 9, 1, 9, 0).unwrap(),
            WorkCalendar::default(),
            8.0,
        )
    }

    fn order(id: u64, rarity: Rarity) -> Order {
        let profile = rarity.profile();
        Order {
            id: OrderId(id),
            name: format!("Flyers #{id}"),
            kind: "Flyers".to_string(),
            rarity,
            reward: 60 * profile.reward_multiplier,
            deadline: SimTime::from_ymd_hm(2025, 9, 1, 15, 0).unwrap(),
            reputation_reward: profile.reputation_reward,
            reputation_penalty: profile.reputation_penalty,
            exp_reward: profile.exp_reward,
            stage: STAGE_AVAILABLE,
            accepted: false,
        }
    }

    #[test]
    fn department_ids_are_bounded() {
        assert!(DepartmentId::try_from(0).is_err());
        assert_eq!(DepartmentId::try_from(8), Err(InvalidDepartmentId(8)));
        let packaging = DepartmentId::try_from(7).unwrap();
        assert_eq!(packaging.name(), "Packaging");
        assert_eq!(packaging.next(), None);
        assert_eq!(DepartmentId::all().count(), DEPARTMENT_COUNT);
        assert_eq!(DepartmentId::DESIGN.to_string(), "1 (Design)");
        let parsed: Result<DepartmentId, _> = serde_json::from_str("9");
        assert!(parsed.is_err());
    }

    #[test]
    fn accept_is_atomic_when_drive_is_short() {
        let mut engine = PipelineEngine::new(0.5);
        let mut ledger = ResourceLedger::new(80.0, 0, 1.0);
        ledger.spend_drive(75.0).unwrap();
        engine.offer(order(1, Rarity::Common));
        let err = engine.accept_order(OrderId(1), &mut ledger, 7.0).unwrap_err();
        assert!(matches!(err, CommandError::InsufficientDrive { .. }));
        assert_eq!(engine.available().len(), 1);
        assert!(!engine.available()[0].accepted);
        assert!((ledger.drive() - 5.0).abs() < 1e-9);
        assert_eq!(
            engine.accept_order(OrderId(99), &mut ledger, 7.0),
            Err(CommandError::OrderNotFound(OrderId(99)))
        );
    }

    #[test]
    fn queue_prefers_rarity_then_arrival() {
        let mut engine = PipelineEngine::new(0.5);
        let mut ledger = ResourceLedger::new(500.0, 0, 1.0);
        for (id, rarity) in [
            (1, Rarity::Common),
            (2, Rarity::Rare),
            (3, Rarity::Common),
            (4, Rarity::Legendary),
            (5, Rarity::Rare),
        ] {
            engine.offer(order(id, rarity));
            engine.accept_order(OrderId(id), &mut ledger, 7.0).unwrap();
        }
        let ids: Vec<u64> = engine
            .queue(DepartmentId::DESIGN)
            .ids()
            .iter()
            .map(|id| id.0)
            .collect();
        assert_eq!(ids, vec![4, 2, 5, 1, 3]);
        let badges = engine.queue(DepartmentId::DESIGN).badges();
        assert_eq!(badges.common, 2);
        assert_eq!(badges.legendary, 1);
    }

    #[test]
    fn seven_advances_complete_exactly_once() {
        let mut engine = PipelineEngine::new(0.5);
        let mut ledger = ResourceLedger::new(80.0, 0, 1.0);
        let clock = clock();
        engine.offer(order(1, Rarity::Common));
        engine.accept_order(OrderId(1), &mut ledger, 7.0).unwrap();
        let mut department = DepartmentId::DESIGN;
        for _ in 0..6 {
            match engine.try_advance(department, &mut ledger, &clock).unwrap() {
                Advance::Moved { to, .. } => department = to,
                Advance::Completed(_) => panic!("completed too early"),
            }
        }
        assert_eq!(engine.stage_name(OrderId(1)), Some("Packaging"));
        let Advance::Completed(settlement) =
            engine.try_advance(department, &mut ledger, &clock).unwrap()
        else {
            panic!("expected completion");
        };
        assert!(settlement.on_time);
        assert_eq!(ledger.money(), 60);
        assert!((ledger.drive() - 66.0).abs() < 1e-9);
        assert!(engine.active().is_empty());
        assert!(engine.complete_order(OrderId(1), &mut ledger, clock.now()).is_none());
        assert_eq!(ledger.money(), 60);
        assert_eq!(engine.completed_count(), 1);
    }

    #[test]
    fn advance_refuses_outside_work_or_empty() {
        let mut engine = PipelineEngine::new(0.5);
        let mut ledger = ResourceLedger::new(80.0, 0, 1.0);
        let mut clock = clock();
        assert_eq!(
            engine.try_advance(DepartmentId::DESIGN, &mut ledger, &clock),
            Err(CommandError::EmptyQueue(DepartmentId::DESIGN))
        );
        engine.offer(order(1, Rarity::Rare));
        engine.accept_order(OrderId(1), &mut ledger, 7.0).unwrap();
        clock.set(SimTime::from_ymd_hm(2025, 9, 6, 10, 0).unwrap());
        assert_eq!(
            engine.try_advance(DepartmentId::DESIGN, &mut ledger, &clock),
            Err(CommandError::OutsideWorkHours)
        );
        assert!((ledger.drive() - 73.0).abs() < 1e-9);
    }

    #[test]
    fn advance_many_is_bounded_by_queue_and_drive() {
        let mut engine = PipelineEngine::new(0.5);
        let mut ledger = ResourceLedger::new(23.0, 0, 1.0);
        let clock = clock();
        for id in 1..=3 {
            engine.offer(order(id, Rarity::Common));
            engine.accept_order(OrderId(id), &mut ledger, 7.0).unwrap();
        }
        let steps = engine.advance_many(DepartmentId::DESIGN, 5, &mut ledger, &clock);
        assert_eq!(steps.len(), 2);
        assert_eq!(engine.queue(DepartmentId::try_from(2).unwrap()).len(), 2);
        assert!(ledger.drive().abs() < 1e-9);
    }

    #[test]
    fn late_completion_pays_half() {
        let mut engine = PipelineEngine::new(0.5);
        let mut ledger = ResourceLedger::new(80.0, 0, 1.0);
        engine.offer(order(1, Rarity::Rare));
        engine.accept_order(OrderId(1), &mut ledger, 7.0).unwrap();
        let late = SimTime::from_ymd_hm(2025, 9, 2, 9, 0).unwrap();
        let settlement = engine.complete_order(OrderId(1), &mut ledger, late).unwrap();
        assert_eq!(settlement.reward, 60);
        assert_eq!(settlement.reputation_delta, -1);
        assert!(engine.queue(DepartmentId::DESIGN).is_empty());
    }

    #[test]
    fn prune_removes_only_lapsed_orders() {
        let mut engine = PipelineEngine::new(0.5);
        engine.offer(order(1, Rarity::Common));
        let mut fresh = order(2, Rarity::Common);
        fresh.deadline = SimTime::from_ymd_hm(2025, 9, 1, 18, 0).unwrap();
        engine.offer(fresh);
        let expired = engine.prune_expired(SimTime::from_ymd_hm(2025, 9, 1, 16, 0).unwrap());
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, OrderId(1));
        assert_eq!(engine.available_id_at(0), Some(OrderId(2)));
    }
}
