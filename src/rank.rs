//! Score classification tables.
//!
//! Both scales are descending `(threshold, label)` lists evaluated top-down with
//! `>=` semantics: a score exactly on a threshold belongs to the higher bucket.
//! Anything below the last threshold (negative scores and NaN included) lands in
//! the open-ended bottom bucket, so classification never fails.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Letter grade for a single analysis
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum LetterRank {
    #[serde(rename = "S+")]
    #[strum(serialize = "S+")]
    SPlus,
    S,
    #[serde(rename = "A+")]
    #[strum(serialize = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    #[strum(serialize = "B+")]
    BPlus,
    B,
    C,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum Tier {
    Challenger,
    Grandmaster,
    Master,
    Diamond,
    Platinum,
    Gold,
    Silver,
    Bronze,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum Division {
    I,
    II,
}

const LETTER_RANK_THRESHOLDS: [(f64, LetterRank); 6] = [
    (95.0, LetterRank::SPlus),
    (90.0, LetterRank::S),
    (85.0, LetterRank::APlus),
    (80.0, LetterRank::A),
    (70.0, LetterRank::BPlus),
    (60.0, LetterRank::B),
];

const TIER_THRESHOLDS: [(f64, Tier, Division); 11] = [
    (95.0, Tier::Challenger, Division::I),
    (90.0, Tier::Grandmaster, Division::I),
    (85.0, Tier::Master, Division::I),
    (80.0, Tier::Diamond, Division::I),
    (75.0, Tier::Diamond, Division::II),
    (70.0, Tier::Platinum, Division::I),
    (65.0, Tier::Platinum, Division::II),
    (60.0, Tier::Gold, Division::I),
    (55.0, Tier::Gold, Division::II),
    (50.0, Tier::Silver, Division::I),
    (45.0, Tier::Silver, Division::II),
];

/// Maps a single-replay ward score to its letter rank.
pub fn letter_rank(score: f64) -> LetterRank {
    LETTER_RANK_THRESHOLDS
        .iter()
        .find(|(threshold, _)| score >= *threshold)
        .map(|(_, rank)| *rank)
        .unwrap_or(LetterRank::C)
}

/// Maps an aggregate ward score to its tier and division.
pub fn tier_division(score: f64) -> (Tier, Division) {
    TIER_THRESHOLDS
        .iter()
        .find(|(threshold, _, _)| score >= *threshold)
        .map(|(_, tier, division)| (*tier, *division))
        .unwrap_or((Tier::Bronze, Division::I))
}
