//! Tunable configuration for a pressroom session.
//!
//! Every field carries a serde default so partial JSON overlays can be layered
//! on top of the reference tuning. Call [`GameConfig::validate`] before
//! building a session; the session constructor refuses invalid configs.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::numbers::i64_to_f64;

/// Format accepted for [`GameConfig::start_date`].
pub const START_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Inclusive numeric range used for random multipliers and intervals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Linear interpolation across the span for a unit roll in `[0, 1)`.
    #[must_use]
    pub fn lerp(self, unit: f64) -> f64 {
        self.min + unit * (self.max - self.min)
    }

    fn validate(self, field: &'static str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvertedBounds {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Work calendar: which ISO weekdays are work days and the daily open window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendar {
    #[serde(default = "WorkCalendar::default_work_days")]
    pub work_days: Vec<u8>,
    #[serde(default = "WorkCalendar::default_start_hour")]
    pub start_hour: u32,
    #[serde(default = "WorkCalendar::default_end_hour")]
    pub end_hour: u32,
}

impl WorkCalendar {
    fn default_work_days() -> Vec<u8> {
        vec![1, 2, 3, 4, 5]
    }

    const fn default_start_hour() -> u32 {
        9
    }

    const fn default_end_hour() -> u32 {
        17
    }

    /// Length of the work day in hours.
    #[must_use]
    pub const fn hours_in_workday(&self) -> u32 {
        self.end_hour.saturating_sub(self.start_hour)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.work_days.is_empty() {
            return Err(ConfigError::EmptyWorkDays);
        }
        if let Some(&bad) = self.work_days.iter().find(|d| !(1..=7).contains(*d)) {
            return Err(ConfigError::InvalidWorkDay(bad));
        }
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(ConfigError::InvalidWorkHours {
                start: self.start_hour,
                end: self.end_hour,
            });
        }
        Ok(())
    }
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            work_days: Self::default_work_days(),
            start_hour: Self::default_start_hour(),
            end_hour: Self::default_end_hour(),
        }
    }
}

/// Drive (stamina) economy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveConfig {
    #[serde(default = "DriveConfig::default_base_drive")]
    pub base_drive: f64,
    #[serde(default = "DriveConfig::default_drive_per_hour")]
    pub drive_per_hour: f64,
    /// Admission cost charged when an order is accepted.
    #[serde(default = "DriveConfig::default_actions_per_order")]
    pub actions_per_order: f64,
}

impl DriveConfig {
    const fn default_base_drive() -> f64 {
        80.0
    }

    const fn default_drive_per_hour() -> f64 {
        1.0
    }

    const fn default_actions_per_order() -> f64 {
        7.0
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_drive: Self::default_base_drive(),
            drive_per_hour: Self::default_drive_per_hour(),
            actions_per_order: Self::default_actions_per_order(),
        }
    }
}

/// Hiring costs and automated work cadences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffingConfig {
    #[serde(default = "StaffingConfig::default_worker_cost")]
    pub worker_cost: i64,
    #[serde(default = "StaffingConfig::default_worker_drive_bonus")]
    pub worker_drive_bonus: f64,
    #[serde(default = "StaffingConfig::default_manager_cost")]
    pub manager_cost: i64,
    /// Real milliseconds between automated worker steps.
    #[serde(default = "StaffingConfig::default_base_employee_speed_ms")]
    pub base_employee_speed_ms: u64,
    /// Real seconds between manager auto-accepts.
    #[serde(default = "StaffingConfig::default_manager_interval_secs")]
    pub manager_interval_secs: f64,
}

impl StaffingConfig {
    const fn default_worker_cost() -> i64 {
        500
    }

    const fn default_worker_drive_bonus() -> f64 {
        80.0
    }

    const fn default_manager_cost() -> i64 {
        800
    }

    const fn default_base_employee_speed_ms() -> u64 {
        500
    }

    const fn default_manager_interval_secs() -> f64 {
        10.0
    }
}

impl Default for StaffingConfig {
    fn default() -> Self {
        Self {
            worker_cost: Self::default_worker_cost(),
            worker_drive_bonus: Self::default_worker_drive_bonus(),
            manager_cost: Self::default_manager_cost(),
            base_employee_speed_ms: Self::default_base_employee_speed_ms(),
            manager_interval_secs: Self::default_manager_interval_secs(),
        }
    }
}

/// Daily order quota and rare-day tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlanConfig {
    #[serde(default = "DailyPlanConfig::default_reputation_impact")]
    pub reputation_impact: f64,
    #[serde(default = "DailyPlanConfig::default_max_reputation_bonus")]
    pub max_reputation_bonus: f64,
    #[serde(default = "DailyPlanConfig::default_initial_orders")]
    pub initial_orders: u32,
    #[serde(default = "DailyPlanConfig::default_rare_day_chance")]
    pub rare_day_chance: f64,
    #[serde(default = "DailyPlanConfig::default_rare_day_cooldown_days")]
    pub rare_day_cooldown_days: i64,
    #[serde(default = "DailyPlanConfig::default_rare_day_multiplier")]
    pub rare_day_multiplier: Span,
    #[serde(default = "DailyPlanConfig::default_normal_day_multiplier")]
    pub normal_day_multiplier: Span,
}

impl DailyPlanConfig {
    const fn default_reputation_impact() -> f64 {
        0.1
    }

    const fn default_max_reputation_bonus() -> f64 {
        2.0
    }

    const fn default_initial_orders() -> u32 {
        5
    }

    const fn default_rare_day_chance() -> f64 {
        0.025
    }

    const fn default_rare_day_cooldown_days() -> i64 {
        40
    }

    const fn default_rare_day_multiplier() -> Span {
        Span::new(1.1, 1.5)
    }

    const fn default_normal_day_multiplier() -> Span {
        Span::new(0.2, 1.0)
    }
}

impl Default for DailyPlanConfig {
    fn default() -> Self {
        Self {
            reputation_impact: Self::default_reputation_impact(),
            max_reputation_bonus: Self::default_max_reputation_bonus(),
            initial_orders: Self::default_initial_orders(),
            rare_day_chance: Self::default_rare_day_chance(),
            rare_day_cooldown_days: Self::default_rare_day_cooldown_days(),
            rare_day_multiplier: Self::default_rare_day_multiplier(),
            normal_day_multiplier: Self::default_normal_day_multiplier(),
        }
    }
}

/// Batch emission throttling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "GenerationConfig::default_min_interval_secs")]
    pub min_interval_secs: f64,
    #[serde(default = "GenerationConfig::default_max_interval_secs")]
    pub max_interval_secs: f64,
    #[serde(default = "GenerationConfig::default_max_batch_size")]
    pub max_batch_size: u32,
    #[serde(default = "GenerationConfig::default_max_available_orders")]
    pub max_available_orders: u32,
    /// Below this many available orders the short interval applies.
    #[serde(default = "GenerationConfig::default_low_water_mark")]
    pub low_water_mark: u32,
    /// Batches double when generated/target falls below this share of elapsed work time.
    #[serde(default = "GenerationConfig::default_lag_ratio")]
    pub lag_ratio: f64,
    /// Cadence of single-order emission when batching is disabled.
    #[serde(default = "GenerationConfig::default_single_order_interval_secs")]
    pub single_order_interval_secs: f64,
}

impl GenerationConfig {
    const fn default_min_interval_secs() -> f64 {
        2.0
    }

    const fn default_max_interval_secs() -> f64 {
        5.0
    }

    const fn default_max_batch_size() -> u32 {
        36
    }

    const fn default_max_available_orders() -> u32 {
        50
    }

    const fn default_low_water_mark() -> u32 {
        10
    }

    const fn default_lag_ratio() -> f64 {
        0.7
    }

    const fn default_single_order_interval_secs() -> f64 {
        10.0
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: Self::default_min_interval_secs(),
            max_interval_secs: Self::default_max_interval_secs(),
            max_batch_size: Self::default_max_batch_size(),
            max_available_orders: Self::default_max_available_orders(),
            low_water_mark: Self::default_low_water_mark(),
            lag_ratio: Self::default_lag_ratio(),
            single_order_interval_secs: Self::default_single_order_interval_secs(),
        }
    }
}

/// Rarity roll probabilities; common takes the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RarityWeights {
    pub legendary: f64,
    pub rare: f64,
}

impl RarityWeights {
    #[must_use]
    pub const fn new(legendary: f64, rare: f64) -> Self {
        Self { legendary, rare }
    }

    fn validate(self) -> Result<(), ConfigError> {
        if self.legendary < 0.0 || self.rare < 0.0 || self.legendary + self.rare > 1.0 {
            return Err(ConfigError::BadProbabilities {
                legendary: self.legendary,
                rare: self.rare,
            });
        }
        Ok(())
    }
}

/// Order value ranges shared by every rarity tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderValueConfig {
    #[serde(default = "OrderValueConfig::default_normal_weights")]
    pub normal_weights: RarityWeights,
    #[serde(default = "OrderValueConfig::default_rare_day_weights")]
    pub rare_day_weights: RarityWeights,
    #[serde(default = "OrderValueConfig::default_reward_min")]
    pub reward_min: i64,
    #[serde(default = "OrderValueConfig::default_reward_max")]
    pub reward_max: i64,
    #[serde(default = "OrderValueConfig::default_hours_min")]
    pub hours_min: u32,
    #[serde(default = "OrderValueConfig::default_hours_max")]
    pub hours_max: u32,
    /// Share of the reward paid for late completion.
    #[serde(default = "OrderValueConfig::default_late_reward_ratio")]
    pub late_reward_ratio: f64,
}

impl OrderValueConfig {
    const fn default_normal_weights() -> RarityWeights {
        RarityWeights::new(0.05, 0.20)
    }

    const fn default_rare_day_weights() -> RarityWeights {
        RarityWeights::new(0.10, 0.30)
    }

    const fn default_reward_min() -> i64 {
        50
    }

    const fn default_reward_max() -> i64 {
        99
    }

    const fn default_hours_min() -> u32 {
        2
    }

    const fn default_hours_max() -> u32 {
        5
    }

    const fn default_late_reward_ratio() -> f64 {
        0.5
    }
}

impl Default for OrderValueConfig {
    fn default() -> Self {
        Self {
            normal_weights: Self::default_normal_weights(),
            rare_day_weights: Self::default_rare_day_weights(),
            reward_min: Self::default_reward_min(),
            reward_max: Self::default_reward_max(),
            hours_min: Self::default_hours_min(),
            hours_max: Self::default_hours_max(),
            late_reward_ratio: Self::default_late_reward_ratio(),
        }
    }
}

/// Feature gates that replace the per-variant forks of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct FeatureFlags {
    #[serde(default = "FeatureFlags::enabled")]
    pub managers: bool,
    #[serde(default = "FeatureFlags::enabled")]
    pub rare_days: bool,
    #[serde(default = "FeatureFlags::enabled")]
    pub batched_generation: bool,
    #[serde(default = "FeatureFlags::enabled")]
    pub history: bool,
    /// Jump from the end of one work day straight to the next work day's start.
    #[serde(default = "FeatureFlags::enabled")]
    pub skip_idle_time: bool,
}

impl FeatureFlags {
    const fn enabled() -> bool {
        true
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            managers: true,
            rare_days: true,
            batched_generation: true,
            history: true,
            skip_idle_time: true,
        }
    }
}

/// Complete session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "GameConfig::default_start_date")]
    pub start_date: String,
    #[serde(default)]
    pub calendar: WorkCalendar,
    /// Real seconds that make up one simulated hour.
    #[serde(default = "GameConfig::default_game_hour_to_real_seconds")]
    pub game_hour_to_real_seconds: f64,
    #[serde(default = "GameConfig::default_starting_money")]
    pub starting_money: i64,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub staffing: StaffingConfig,
    #[serde(default)]
    pub plan: DailyPlanConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub orders: OrderValueConfig,
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default = "GameConfig::default_history_limit")]
    pub history_limit: usize,
}

impl GameConfig {
    fn default_start_date() -> String {
        "2025-09-01 09:00:00".to_string()
    }

    const fn default_game_hour_to_real_seconds() -> f64 {
        7.5
    }

    const fn default_starting_money() -> i64 {
        1_000
    }

    const fn default_history_limit() -> usize {
        100
    }

    /// Parse a JSON overlay; missing fields fall back to the reference tuning.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the result fails validation.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parsed start timestamp.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::BadStartDate` when the string does not parse.
    pub fn start_time(&self) -> Result<NaiveDateTime, ConfigError> {
        NaiveDateTime::parse_from_str(&self.start_date, START_DATE_FORMAT)
            .map_err(|_| ConfigError::BadStartDate(self.start_date.clone()))
    }

    /// Virtual minutes that elapse per real second.
    #[must_use]
    pub fn virtual_minutes_per_real_second(&self) -> f64 {
        60.0 / self.game_hour_to_real_seconds
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.start_time()?;
        self.calendar.validate()?;
        min_check(
            "game_hour_to_real_seconds",
            0.01,
            self.game_hour_to_real_seconds,
        )?;
        min_check("drive.base_drive", 1.0, self.drive.base_drive)?;
        min_check("drive.drive_per_hour", 0.0, self.drive.drive_per_hour)?;
        min_check("drive.actions_per_order", 0.0, self.drive.actions_per_order)?;
        min_check(
            "staffing.worker_drive_bonus",
            0.0,
            self.staffing.worker_drive_bonus,
        )?;
        min_check(
            "staffing.manager_interval_secs",
            0.1,
            self.staffing.manager_interval_secs,
        )?;
        if self.staffing.base_employee_speed_ms == 0 {
            return Err(ConfigError::MinViolation {
                field: "staffing.base_employee_speed_ms",
                min: 1.0,
                value: 0.0,
            });
        }
        range_check("plan.rare_day_chance", 0.0, 1.0, self.plan.rare_day_chance)?;
        min_check(
            "plan.max_reputation_bonus",
            0.0,
            self.plan.max_reputation_bonus,
        )?;
        self.plan
            .rare_day_multiplier
            .validate("plan.rare_day_multiplier")?;
        self.plan
            .normal_day_multiplier
            .validate("plan.normal_day_multiplier")?;
        Span::new(
            self.generation.min_interval_secs,
            self.generation.max_interval_secs,
        )
        .validate("generation.interval")?;
        min_check(
            "generation.min_interval_secs",
            0.0,
            self.generation.min_interval_secs,
        )?;
        if self.generation.max_batch_size == 0 {
            return Err(ConfigError::MinViolation {
                field: "generation.max_batch_size",
                min: 1.0,
                value: 0.0,
            });
        }
        min_check(
            "generation.single_order_interval_secs",
            0.1,
            self.generation.single_order_interval_secs,
        )?;
        self.orders.normal_weights.validate()?;
        self.orders.rare_day_weights.validate()?;
        let reward_min = i64_to_f64(self.orders.reward_min);
        let reward_max = i64_to_f64(self.orders.reward_max);
        Span::new(reward_min, reward_max).validate("orders.reward")?;
        min_check("orders.reward_min", 1.0, reward_min)?;
        Span::new(
            f64::from(self.orders.hours_min),
            f64::from(self.orders.hours_max),
        )
        .validate("orders.hours")?;
        range_check(
            "orders.late_reward_ratio",
            0.0,
            1.0,
            self.orders.late_reward_ratio,
        )?;
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_date: Self::default_start_date(),
            calendar: WorkCalendar::default(),
            game_hour_to_real_seconds: Self::default_game_hour_to_real_seconds(),
            starting_money: Self::default_starting_money(),
            drive: DriveConfig::default(),
            staffing: StaffingConfig::default(),
            plan: DailyPlanConfig::default(),
            generation: GenerationConfig::default(),
            orders: OrderValueConfig::default(),
            features: FeatureFlags::default(),
            history_limit: Self::default_history_limit(),
        }
    }
}

fn min_check(field: &'static str, min: f64, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min {
        return Err(ConfigError::MinViolation { field, min, value });
    }
    Ok(())
}

fn range_check(field: &'static str, min: f64, max: f64, value: f64) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}
