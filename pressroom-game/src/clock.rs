//! Simulated calendar clock.
//!
//! The clock is advanced only by elapsed real time handed to it by the
//! session, never by polling the wall clock, so identical inputs always land
//! on identical virtual timestamps.
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{GameConfig, WorkCalendar};
use crate::error::ConfigError;
use crate::numbers::round_f64_to_i64;

/// A virtual timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(NaiveDateTime);

impl SimTime {
    #[must_use]
    pub const fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }

    /// Build a timestamp from calendar parts, `None` for impossible dates.
    #[must_use]
    pub fn from_ymd_hm(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .map(Self)
    }

    #[must_use]
    pub const fn as_naive(self) -> NaiveDateTime {
        self.0
    }

    /// ISO weekday, 1 = Monday through 7 = Sunday.
    #[must_use]
    pub fn iso_weekday(self) -> u8 {
        u8::try_from(self.0.weekday().number_from_monday()).unwrap_or(1)
    }

    #[must_use]
    pub fn hour(self) -> u32 {
        self.0.hour()
    }

    #[must_use]
    pub fn minute(self) -> u32 {
        self.0.minute()
    }

    /// Hour of day including the minute and second fraction.
    #[must_use]
    pub fn fractional_hour(self) -> f64 {
        f64::from(self.0.hour())
            + f64::from(self.0.minute()) / 60.0
            + f64::from(self.0.second()) / 3_600.0
    }

    #[must_use]
    pub fn date(self) -> NaiveDate {
        self.0.date()
    }

    /// Shift by a (possibly fractional) number of virtual minutes.
    #[must_use]
    pub fn plus_minutes(self, minutes: f64) -> Self {
        let millis = round_f64_to_i64(minutes * 60_000.0);
        TimeDelta::try_milliseconds(millis)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map_or(self, Self)
    }

    /// Shift by a (possibly fractional) number of virtual hours.
    #[must_use]
    pub fn plus_hours(self, hours: f64) -> Self {
        self.plus_minutes(hours * 60.0)
    }

    #[must_use]
    pub fn is_before(self, other: Self) -> bool {
        self.0 < other.0
    }

    #[must_use]
    pub fn is_after(self, other: Self) -> bool {
        self.0 > other.0
    }

    /// Whole days elapsed since `earlier`, truncated toward zero.
    #[must_use]
    pub fn whole_days_since(self, earlier: Self) -> i64 {
        (self.0 - earlier.0).num_days()
    }

    /// Virtual minutes remaining until `later`, negative once it has passed.
    #[must_use]
    pub fn minutes_until(self, later: Self) -> i64 {
        (later.0 - self.0).num_minutes()
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M (%a)"))
    }
}

/// Clock advancing a virtual calendar at a fixed ratio to real time.
#[derive(Debug, Clone, PartialEq)]
pub struct SimClock {
    now: SimTime,
    calendar: WorkCalendar,
    minutes_per_real_second: f64,
}

impl SimClock {
    #[must_use]
    pub const fn new(start: SimTime, calendar: WorkCalendar, minutes_per_real_second: f64) -> Self {
        Self {
            now: start,
            calendar,
            minutes_per_real_second,
        }
    }

    /// Build the clock described by a session configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::BadStartDate` when the start date does not parse.
    pub fn from_config(cfg: &GameConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            SimTime::new(cfg.start_time()?),
            cfg.calendar.clone(),
            cfg.virtual_minutes_per_real_second(),
        ))
    }

    #[must_use]
    pub const fn now(&self) -> SimTime {
        self.now
    }

    pub const fn set(&mut self, at: SimTime) {
        self.now = at;
    }

    #[must_use]
    pub const fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    /// Add the virtual time corresponding to `real_delta_seconds`.
    pub fn advance(&mut self, real_delta_seconds: f64) {
        if !real_delta_seconds.is_finite() || real_delta_seconds <= 0.0 {
            return;
        }
        self.now = self
            .now
            .plus_minutes(real_delta_seconds * self.minutes_per_real_second);
    }

    #[must_use]
    pub fn is_work_day(&self) -> bool {
        self.calendar.work_days.contains(&self.now.iso_weekday())
    }

    #[must_use]
    pub fn is_work_time(&self) -> bool {
        if !self.is_work_day() {
            return false;
        }
        let hour = self.now.fractional_hour();
        hour >= f64::from(self.calendar.start_hour) && hour < f64::from(self.calendar.end_hour)
    }

    /// True on a work day once the closing hour has been reached.
    #[must_use]
    pub fn is_past_work_end(&self) -> bool {
        self.is_work_day() && self.now.hour() >= self.calendar.end_hour
    }

    /// Fraction of today's work window already elapsed, 0 outside work time.
    #[must_use]
    pub fn work_time_progress(&self) -> f64 {
        if !self.is_work_time() {
            return 0.0;
        }
        let start = f64::from(self.calendar.start_hour);
        let duration = f64::from(self.calendar.hours_in_workday());
        ((self.now.fractional_hour() - start) / duration).clamp(0.0, 1.0)
    }

    /// Jump to `start_hour:00` of the next work day, skipping non-work days.
    pub fn advance_to_next_work_day(&mut self) {
        let mut date = self.now.date();
        for _ in 0..7 {
            let Some(next) = date.succ_opt() else {
                return;
            };
            date = next;
            let weekday = u8::try_from(date.weekday().number_from_monday()).unwrap_or(1);
            if self.calendar.work_days.contains(&weekday) {
                break;
            }
        }
        if let Some(start) = date.and_hms_opt(self.calendar.start_hour, 0, 0) {
            self.now = SimTime::new(start);
        }
    }

    /// Jump to the next moment work time begins: today's opening hour when it
    /// is still ahead on a work day, otherwise the next work day's.
    pub fn advance_to_work_start(&mut self) {
        if self.is_work_time() {
            return;
        }
        if self.is_work_day() && self.now.hour() < self.calendar.start_hour {
            if let Some(start) = self.now.date().and_hms_opt(self.calendar.start_hour, 0, 0) {
                self.now = SimTime::new(start);
            }
            return;
        }
        self.advance_to_next_work_day();
    }
}
