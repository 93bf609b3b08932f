//! Error taxonomy for player commands and configuration.
use thiserror::Error;

use crate::orders::OrderId;
use crate::pipeline::DepartmentId;

/// Recoverable, user-facing reasons a command was rejected.
///
/// A command that returns one of these has not mutated the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("not enough money: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },
    #[error("not enough drive: need {needed:.0}, have {available:.1}")]
    InsufficientDrive { needed: f64, available: f64 },
    #[error("order {0} is not available")]
    OrderNotFound(OrderId),
    #[error("no free worker for that assignment")]
    InvalidAssignment,
    #[error("the shop is closed")]
    OutsideWorkHours,
    #[error("department {0} has nothing queued")]
    EmptyQueue(DepartmentId),
    #[error("{0} are disabled in this configuration")]
    FeatureDisabled(&'static str),
}

impl CommandError {
    /// Stable notification key for presentation layers.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "error.insufficient-funds",
            Self::InsufficientDrive { .. } => "error.insufficient-drive",
            Self::OrderNotFound(_) => "error.order-not-found",
            Self::InvalidAssignment => "error.invalid-assignment",
            Self::OutsideWorkHours => "error.outside-work-hours",
            Self::EmptyQueue(_) => "error.empty-queue",
            Self::FeatureDisabled(_) => "error.feature-disabled",
        }
    }
}

/// A department id outside `1..=7` reached the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("department id {0} is outside 1..=7")]
pub struct InvalidDepartmentId(pub u8);

/// Errors raised when game configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("at least one ISO weekday (1-7) must be a work day")]
    EmptyWorkDays,
    #[error("work day {0} is not an ISO weekday (1-7)")]
    InvalidWorkDay(u8),
    #[error("work hours invalid (start {start} must be before end {end}, both within 0..=24)")]
    InvalidWorkHours { start: u32, end: u32 },
    #[error("{field} bounds invalid (min {min} > max {max})")]
    InvertedBounds {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("rarity weights invalid: legendary {legendary:.3}, rare {rare:.3} must be >= 0 and sum to at most 1")]
    BadProbabilities { legendary: f64, rare: f64 },
    #[error("start date {0:?} is not in YYYY-MM-DD HH:MM:SS form")]
    BadStartDate(String),
}

/// A save could not be turned back into a running session.
#[derive(Debug, Error, PartialEq)]
pub enum RestoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{department} queue holds order {id}, which is not in progress")]
    StaleQueueEntry { department: DepartmentId, id: OrderId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_errors_render_context() {
        let err = CommandError::InsufficientDrive {
            needed: 7.0,
            available: 3.4,
        };
        assert_eq!(err.to_string(), "not enough drive: need 7, have 3.4");
        assert_eq!(err.key(), "error.insufficient-drive");
        assert_eq!(
            CommandError::OrderNotFound(OrderId(12)).to_string(),
            "order #12 is not available"
        );
    }

    #[test]
    fn invalid_department_is_distinct_from_commands() {
        let err = InvalidDepartmentId(9);
        assert!(err.to_string().contains("outside 1..=7"));
    }

    #[test]
    fn restore_errors_wrap_config_failures() {
        let err = RestoreError::from(ConfigError::EmptyWorkDays);
        assert_eq!(err.to_string(), ConfigError::EmptyWorkDays.to_string());
        let stale = RestoreError::StaleQueueEntry {
            department: DepartmentId::DESIGN,
            id: OrderId(4),
        };
        assert!(stale.to_string().contains("#4"));
    }
}
