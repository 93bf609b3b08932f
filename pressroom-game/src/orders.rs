//! Orders and rarity tiers.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::SimTime;

/// Stage of an order that has not been accepted yet.
pub const STAGE_AVAILABLE: u8 = 0;
/// Stage reached after the last department.
pub const STAGE_COMPLETE: u8 = 8;

/// Labels an order name is drawn from.
pub const ORDER_KINDS: [&str; 9] = [
    "Business cards",
    "Brochures",
    "Catalogs",
    "Posters",
    "Flyers",
    "Booklets",
    "Postcards",
    "Letterheads",
    "Invitations",
];

/// Unique, monotonically assigned order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Order classification controlling value, deadline pressure and reputation stakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    Legendary,
}

impl Rarity {
    pub const ALL: [Self; 3] = [Self::Legendary, Self::Rare, Self::Common];

    /// Processing priority; higher ranks leave a queue first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Common => 0,
            Self::Rare => 1,
            Self::Legendary => 2,
        }
    }

    #[must_use]
    pub const fn profile(self) -> RarityProfile {
        match self {
            Self::Legendary => RarityProfile {
                reward_multiplier: 5,
                time_multiplier: 3.0,
                reputation_reward: 5,
                reputation_penalty: -3,
                exp_reward: 50,
            },
            Self::Rare => RarityProfile {
                reward_multiplier: 2,
                time_multiplier: 1.5,
                reputation_reward: 2,
                reputation_penalty: -1,
                exp_reward: 20,
            },
            Self::Common => RarityProfile {
                reward_multiplier: 1,
                time_multiplier: 1.0,
                reputation_reward: 1,
                reputation_penalty: -1,
                exp_reward: 10,
            },
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed per-tier multipliers and stakes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RarityProfile {
    pub reward_multiplier: i64,
    pub time_multiplier: f64,
    pub reputation_reward: i64,
    pub reputation_penalty: i64,
    pub exp_reward: i64,
}

/// Per-rarity tallies, used for department badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RarityCounts {
    pub legendary: u32,
    pub rare: u32,
    pub common: u32,
}

impl RarityCounts {
    pub const fn record(&mut self, rarity: Rarity) {
        match rarity {
            Rarity::Legendary => self.legendary = self.legendary.saturating_add(1),
            Rarity::Rare => self.rare = self.rare.saturating_add(1),
            Rarity::Common => self.common = self.common.saturating_add(1),
        }
    }

    #[must_use]
    pub const fn get(&self, rarity: Rarity) -> u32 {
        match rarity {
            Rarity::Legendary => self.legendary,
            Rarity::Rare => self.rare,
            Rarity::Common => self.common,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u32 {
        self.legendary
            .saturating_add(self.rare)
            .saturating_add(self.common)
    }
}

/// A print job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub name: String,
    pub kind: String,
    pub rarity: Rarity,
    pub reward: i64,
    pub deadline: SimTime,
    pub reputation_reward: i64,
    pub reputation_penalty: i64,
    pub exp_reward: i64,
    pub stage: u8,
    pub accepted: bool,
}

impl Order {
    /// Whether the order would still count as on time at `now`.
    #[must_use]
    pub fn is_on_time(&self, now: SimTime) -> bool {
        now.is_before(self.deadline)
    }

    /// Whether an unaccepted order has lapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: SimTime) -> bool {
        now.is_after(self.deadline)
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.stage >= STAGE_COMPLETE
    }

    /// Money paid when the order completes at `now`.
    #[must_use]
    pub fn payout(&self, now: SimTime, late_ratio: f64) -> i64 {
        if self.is_on_time(now) {
            self.reward
        } else {
            crate::numbers::floor_f64_to_i64(crate::numbers::i64_to_f64(self.reward) * late_ratio)
        }
    }

    /// Reputation change applied when the order completes at `now`.
    #[must_use]
    pub fn reputation_delta(&self, now: SimTime) -> i64 {
        if self.is_on_time(now) {
            self.reputation_reward
        } else {
            self.reputation_penalty
        }
    }
}
