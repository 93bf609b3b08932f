//! Daily order quotas and order generation.
use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::SimTime;
use crate::config::{DailyPlanConfig, GameConfig, GenerationConfig, OrderValueConfig};
use crate::ledger::ResourceState;
use crate::numbers::{floor_f64_to_i64, i64_to_f64, usize_to_u32};
use crate::orders::{ORDER_KINDS, Order, OrderId, Rarity, STAGE_AVAILABLE};

/// Per-day order quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyOrderPlan {
    pub day: NaiveDate,
    pub target_count: u32,
    pub generated_count: u32,
    pub is_rare_day: bool,
    pub last_rare_day: Option<SimTime>,
}

impl DailyOrderPlan {
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.target_count.saturating_sub(self.generated_count)
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.generated_count >= self.target_count
    }

    /// Share of the target already generated.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.target_count == 0 {
            return 1.0;
        }
        f64::from(self.generated_count) / f64::from(self.target_count)
    }
}

/// Generator state that survives a save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorState {
    pub next_id: u64,
    pub since_last_emission: f64,
    pub plan: Option<DailyOrderPlan>,
}

impl Default for GeneratorState {
    fn default() -> Self {
        Self {
            next_id: 1,
            since_last_emission: 0.0,
            plan: None,
        }
    }
}

/// Creates orders against the current day's plan.
#[derive(Debug, Clone)]
pub struct OrderGenerator {
    plan_cfg: DailyPlanConfig,
    values: OrderValueConfig,
    generation: GenerationConfig,
    actions_per_order: f64,
    hours_in_workday: u32,
    rare_days: bool,
    batched: bool,
    state: GeneratorState,
}

impl OrderGenerator {
    #[must_use]
    pub fn new(cfg: &GameConfig) -> Self {
        Self {
            plan_cfg: cfg.plan.clone(),
            values: cfg.orders.clone(),
            generation: cfg.generation.clone(),
            actions_per_order: cfg.drive.actions_per_order,
            hours_in_workday: cfg.calendar.hours_in_workday(),
            rare_days: cfg.features.rare_days,
            batched: cfg.features.batched_generation,
            state: GeneratorState::default(),
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: GeneratorState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub const fn state(&self) -> &GeneratorState {
        &self.state
    }

    #[must_use]
    pub const fn plan(&self) -> Option<&DailyOrderPlan> {
        self.state.plan.as_ref()
    }

    /// Date the current plan was computed for.
    #[must_use]
    pub fn planned_day(&self) -> Option<NaiveDate> {
        self.state.plan.as_ref().map(|plan| plan.day)
    }

    /// Compute and install a fresh plan for the day of `now`.
    pub fn start_day<R: Rng>(
        &mut self,
        resources: &ResourceState,
        assigned_workers: u32,
        now: SimTime,
        rng: &mut R,
    ) -> &DailyOrderPlan {
        let last_rare_day = self.state.plan.as_ref().and_then(|plan| plan.last_rare_day);
        let plan = self.compute_daily_plan(resources, assigned_workers, last_rare_day, now, rng);
        self.state.since_last_emission = 0.0;
        self.state.plan.insert(plan)
    }

    /// Quota for the day of `now` from drive capacity, reputation and the
    /// rare-day roll.
    pub fn compute_daily_plan<R: Rng>(
        &self,
        resources: &ResourceState,
        assigned_workers: u32,
        last_rare_day: Option<SimTime>,
        now: SimTime,
        rng: &mut R,
    ) -> DailyOrderPlan {
        let drain_estimate =
            (1.0 + f64::from(assigned_workers)) * f64::from(self.hours_in_workday);
        let usable_drive = resources.max_drive - drain_estimate;
        let max_possible = if self.actions_per_order > 0.0 {
            (usable_drive / self.actions_per_order).floor()
        } else {
            usable_drive.floor()
        };
        let reputation_bonus = i64_to_f64(resources.reputation)
            .mul_add(self.plan_cfg.reputation_impact, 1.0)
            .min(self.plan_cfg.max_reputation_bonus);

        let cooled_down = last_rare_day.is_none_or(|last| {
            now.whole_days_since(last) >= self.plan_cfg.rare_day_cooldown_days
        });
        let is_rare_day =
            self.rare_days && cooled_down && rng.r#gen::<f64>() < self.plan_cfg.rare_day_chance;
        let multiplier_span = if is_rare_day {
            self.plan_cfg.rare_day_multiplier
        } else {
            self.plan_cfg.normal_day_multiplier
        };
        let multiplier = multiplier_span.lerp(rng.r#gen::<f64>());

        let target = floor_f64_to_i64(max_possible * reputation_bonus * multiplier).max(1);
        let target_count = u32::try_from(target).unwrap_or(u32::MAX);
        if is_rare_day {
            log::info!("rare day on {}: target {target_count}", now.date());
        }
        DailyOrderPlan {
            day: now.date(),
            target_count,
            generated_count: 0,
            is_rare_day,
            last_rare_day: if is_rare_day { Some(now) } else { last_rare_day },
        }
    }

    /// Create one order against the plan, `None` once the quota is spent or
    /// no plan exists.
    pub fn generate_order<R: Rng>(&mut self, now: SimTime, rng: &mut R) -> Option<Order> {
        let plan = self.state.plan.as_mut()?;
        if plan.is_exhausted() {
            return None;
        }
        let weights = if plan.is_rare_day {
            self.values.rare_day_weights
        } else {
            self.values.normal_weights
        };
        let roll = rng.r#gen::<f64>();
        let rarity = if roll < weights.legendary {
            Rarity::Legendary
        } else if roll < weights.legendary + weights.rare {
            Rarity::Rare
        } else {
            Rarity::Common
        };
        let profile = rarity.profile();
        let base_reward = rng.gen_range(self.values.reward_min..=self.values.reward_max);
        let base_hours = rng.gen_range(self.values.hours_min..=self.values.hours_max);
        let kind = ORDER_KINDS[rng.gen_range(0..ORDER_KINDS.len())];
        let number = rng.gen_range(0..1_000u32);

        let id = OrderId(self.state.next_id);
        self.state.next_id = self.state.next_id.saturating_add(1);
        plan.generated_count = plan.generated_count.saturating_add(1);

        Some(Order {
            id,
            name: format!("{kind} #{number}"),
            kind: kind.to_string(),
            rarity,
            reward: base_reward.saturating_mul(profile.reward_multiplier),
            deadline: now.plus_hours(f64::from(base_hours) * profile.time_multiplier),
            reputation_reward: profile.reputation_reward,
            reputation_penalty: profile.reputation_penalty,
            exp_reward: profile.exp_reward,
            stage: STAGE_AVAILABLE,
            accepted: false,
        })
    }

    /// Orders released the moment a work day opens.
    pub fn initial_burst<R: Rng>(&mut self, now: SimTime, rng: &mut R) -> Vec<Order> {
        let count = self
            .plan()
            .map_or(0, |plan| self.plan_cfg.initial_orders.min(plan.target_count));
        (0..count)
            .filter_map(|_| self.generate_order(now, rng))
            .collect()
    }

    /// Size of the next batch for a pool currently holding `available` orders.
    #[must_use]
    pub fn batch_size(&self, available: usize, work_progress: f64) -> u32 {
        let Some(plan) = self.plan() else {
            return 0;
        };
        let cap = self.generation.max_batch_size;
        let slots = self
            .generation
            .max_available_orders
            .saturating_sub(usize_to_u32(available));
        let mut size = cap.min(plan.remaining()).min(slots);
        if size == 0 {
            return 0;
        }
        if plan.is_rare_day {
            size = size.saturating_mul(2).min(cap);
        }
        if plan.progress() < work_progress * self.generation.lag_ratio {
            size = size.saturating_mul(2).min(cap);
        }
        size
    }

    /// Accumulate `real_delta_seconds` of work time and emit the orders due.
    pub fn emit_due<R: Rng>(
        &mut self,
        real_delta_seconds: f64,
        now: SimTime,
        available: usize,
        work_progress: f64,
        rng: &mut R,
    ) -> Vec<Order> {
        if real_delta_seconds.is_finite() && real_delta_seconds > 0.0 {
            self.state.since_last_emission += real_delta_seconds;
        }
        let elapsed = self.state.since_last_emission;
        if !self.batched {
            if elapsed < self.generation.single_order_interval_secs {
                return Vec::new();
            }
            self.state.since_last_emission = 0.0;
            return self.generate_order(now, rng).into_iter().collect();
        }

        // A well-stocked pool slows to the long interval; only a pool under
        // the low-water mark is refilled at the short one.
        let low_water = usize_to_u32(available) < self.generation.low_water_mark;
        let interval = if low_water {
            self.generation.min_interval_secs
        } else {
            self.generation.max_interval_secs
        };
        if elapsed < interval {
            return Vec::new();
        }
        let size = self.batch_size(available, work_progress);
        if size == 0 {
            return Vec::new();
        }
        self.state.since_last_emission = 0.0;
        let batch: Vec<Order> = (0..size)
            .filter_map(|_| self.generate_order(now, rng))
            .collect();
        log::debug!("emitted batch of {} orders", batch.len());
        batch
    }
}
