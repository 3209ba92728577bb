//! Ranking model
//!
//! Per-person counters, the fixed points table and the leaderboard ordering.
//! Persistence lives in [`crate::storage`]; everything here is pure.

use crate::types::{BugId, Category, EvaluationTier};
use serde::{Deserialize, Serialize};

/// Points per tiered counter
pub mod points {
    pub const FIX_GOLD: u64 = 100;
    pub const FIX_SILVER: u64 = 80;
    pub const FIX_BRONZE: u64 = 60;
    pub const FIX_OTHER: u64 = 50;
    pub const SCR_GOLD: u64 = 25;
    pub const SCR_SILVER: u64 = 20;
    pub const SCR_BRONZE: u64 = 15;
    pub const SCR_OTHER: u64 = 10;
}

/// The counter one classified event increments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    GoldFix,
    SilverFix,
    BronzeFix,
    OtherFix,
    GoldScr,
    SilverScr,
    BronzeScr,
    OtherScr,
    Suspicious,
    Other,
}

impl Counter {
    /// Counter selected by a (category, tier) pair
    ///
    /// Unranked tiers (`OTHER` and unknown) share the `other_*` counters.
    pub fn select(category: Category, tier: EvaluationTier) -> Self {
        use EvaluationTier as T;
        match (category, tier) {
            (Category::Fix, T::Gold) => Counter::GoldFix,
            (Category::Fix, T::Silver) => Counter::SilverFix,
            (Category::Fix, T::Bronze) => Counter::BronzeFix,
            (Category::Fix, T::Other | T::None) => Counter::OtherFix,
            (Category::ScreenedOrNew, T::Gold) => Counter::GoldScr,
            (Category::ScreenedOrNew, T::Silver) => Counter::SilverScr,
            (Category::ScreenedOrNew, T::Bronze) => Counter::BronzeScr,
            (Category::ScreenedOrNew, T::Other | T::None) => Counter::OtherScr,
            (Category::SuspiciousOrReopen, _) => Counter::Suspicious,
            (Category::Other, _) => Counter::Other,
        }
    }
}

/// Counters of one participant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRow {
    pub name: String,
    pub gold_fix: u64,
    pub silver_fix: u64,
    pub bronze_fix: u64,
    pub other_fix: u64,
    pub gold_scr: u64,
    pub silver_scr: u64,
    pub bronze_scr: u64,
    pub other_scr: u64,
    pub suspicious: u64,
    pub other: u64,
}

impl RankingRow {
    /// Fresh row with every counter at zero
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn increment(&mut self, counter: Counter) {
        let slot = match counter {
            Counter::GoldFix => &mut self.gold_fix,
            Counter::SilverFix => &mut self.silver_fix,
            Counter::BronzeFix => &mut self.bronze_fix,
            Counter::OtherFix => &mut self.other_fix,
            Counter::GoldScr => &mut self.gold_scr,
            Counter::SilverScr => &mut self.silver_scr,
            Counter::BronzeScr => &mut self.bronze_scr,
            Counter::OtherScr => &mut self.other_scr,
            Counter::Suspicious => &mut self.suspicious,
            Counter::Other => &mut self.other,
        };
        *slot += 1;
    }

    /// Weighted sum of the eight tiered counters
    ///
    /// Suspicious and other activity never scores.
    pub fn score(&self) -> u64 {
        self.gold_fix * points::FIX_GOLD
            + self.silver_fix * points::FIX_SILVER
            + self.bronze_fix * points::FIX_BRONZE
            + self.other_fix * points::FIX_OTHER
            + self.gold_scr * points::SCR_GOLD
            + self.silver_scr * points::SCR_SILVER
            + self.bronze_scr * points::SCR_BRONZE
            + self.other_scr * points::SCR_OTHER
    }
}

/// One line of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    #[serde(flatten)]
    pub row: RankingRow,
    pub score: u64,
}

/// Score rows and order them by score, highest first
///
/// The sort is stable: rows with equal scores keep their input order.
pub fn leaderboard(rows: Vec<RankingRow>) -> Vec<Standing> {
    let mut standings: Vec<Standing> = rows
        .into_iter()
        .map(|row| {
            let score = row.score();
            Standing { row, score }
        })
        .collect();
    standings.sort_by(|a, b| b.score.cmp(&a.score));
    standings
}

/// Immutable audit record of one classification decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingLogEntry {
    pub name: String,
    pub bug_id: BugId,
    /// Decision trail, e.g. `GOLD,FIX`
    pub status: String,
}

impl RankingLogEntry {
    pub fn new(name: impl Into<String>, bug_id: BugId, category: Category, tier: EvaluationTier) -> Self {
        Self {
            name: name.into(),
            bug_id,
            status: decision_trail(category, tier),
        }
    }
}

/// Tier and category joined the way the ranking log stores them
pub fn decision_trail(category: Category, tier: EvaluationTier) -> String {
    format!("{},{}", tier.as_str(), category.as_str())
}
