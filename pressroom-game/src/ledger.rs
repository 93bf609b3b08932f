//! Drive, money, experience and reputation accounting.
use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Mutable resource record; `0 <= drive <= max_drive` holds after every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub drive: f64,
    pub max_drive: f64,
    pub money: i64,
    pub exp: i64,
    pub reputation: i64,
}

impl ResourceState {
    /// Drive rounded down the way the drive meter shows it.
    #[must_use]
    pub fn drive_display(&self) -> i64 {
        crate::numbers::floor_f64_to_i64(self.drive)
    }
}

/// Owner of the session's [`ResourceState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLedger {
    state: ResourceState,
    drive_per_hour: f64,
}

impl ResourceLedger {
    #[must_use]
    pub fn new(base_drive: f64, money: i64, drive_per_hour: f64) -> Self {
        let max_drive = base_drive.max(0.0);
        Self {
            state: ResourceState {
                drive: max_drive,
                max_drive,
                money,
                exp: 0,
                reputation: 0,
            },
            drive_per_hour,
        }
    }

    /// Rebuild a ledger around a saved record, re-establishing the drive bounds.
    #[must_use]
    pub fn from_state(state: ResourceState, drive_per_hour: f64) -> Self {
        let mut ledger = Self {
            state,
            drive_per_hour,
        };
        ledger.state.max_drive = ledger.state.max_drive.max(0.0);
        ledger.clamp_drive();
        ledger
    }

    #[must_use]
    pub const fn state(&self) -> &ResourceState {
        &self.state
    }

    #[must_use]
    pub const fn drive(&self) -> f64 {
        self.state.drive
    }

    #[must_use]
    pub const fn money(&self) -> i64 {
        self.state.money
    }

    /// Passive drain for `elapsed_seconds` of work time with `worker_count`
    /// assigned workers. The caller only invokes this during work time.
    pub fn drain_passive(&mut self, elapsed_seconds: f64, worker_count: u32) {
        if !elapsed_seconds.is_finite() || elapsed_seconds <= 0.0 {
            return;
        }
        let per_second = self.drive_per_hour * (1.0 + f64::from(worker_count)) / 3_600.0;
        self.state.drive -= per_second * elapsed_seconds;
        self.clamp_drive();
    }

    /// Refill drive to capacity at the start of a work day.
    pub const fn restore_drive(&mut self) {
        self.state.drive = self.state.max_drive;
    }

    /// Whether at least `amount` drive is available.
    #[must_use]
    pub fn has_drive(&self, amount: f64) -> bool {
        self.state.drive >= amount
    }

    /// Deduct `amount` drive or fail without touching the ledger.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InsufficientDrive` when drive is below `amount`.
    pub fn spend_drive(&mut self, amount: f64) -> Result<(), CommandError> {
        if !self.has_drive(amount) {
            return Err(CommandError::InsufficientDrive {
                needed: amount,
                available: self.state.drive,
            });
        }
        self.state.drive -= amount;
        self.clamp_drive();
        Ok(())
    }

    /// Deduct `cost` money or fail without touching the ledger.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InsufficientFunds` when money is below `cost`.
    pub fn spend_money(&mut self, cost: i64) -> Result<(), CommandError> {
        if self.state.money < cost {
            return Err(CommandError::InsufficientFunds {
                needed: cost,
                available: self.state.money,
            });
        }
        self.state.money -= cost;
        Ok(())
    }

    /// Pay for a hire and grow drive capacity by `drive_bonus`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InsufficientFunds` when money is below `cost`.
    pub fn hire(&mut self, cost: i64, drive_bonus: f64) -> Result<(), CommandError> {
        self.spend_money(cost)?;
        let bonus = drive_bonus.max(0.0);
        self.state.max_drive += bonus;
        self.state.drive += bonus;
        self.clamp_drive();
        Ok(())
    }

    /// Credit an order settlement.
    pub fn apply_order_reward(&mut self, reward: i64, exp_reward: i64, reputation_delta: i64) {
        self.state.money = self.state.money.saturating_add(reward);
        self.state.exp = self.state.exp.saturating_add(exp_reward);
        self.state.reputation = self.state.reputation.saturating_add(reputation_delta);
    }

    const fn clamp_drive(&mut self) {
        self.state.drive = self.state.drive.clamp(0.0, self.state.max_drive);
    }
}
