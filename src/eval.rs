//! Narrow wrapper around the external hand-evaluation and equity oracle
//!
//! Everything the pipeline knows about hand strength flows through
//! `rank` and `win_rate`; no other module touches `rust_poker` directly
//! apart from the scoring helper in `card`.

use crate::card::{self, Card};
use rust_poker::equity_calculator::approx_equity;
use rust_poker::hand_range::{Combo, HandRange};
use serde::{Deserialize, Serialize};

/// Precision budget for Monte-Carlo equity runs
///
/// approx_equity samples until the estimate's standard deviation drops
/// below this target, so repeat calls are comparable in cost
const EQUITY_STDEV_TARGET: f64 = 0.01;

/// Made-hand strength labels in the recorded-game vocabulary
///
/// Discriminants are the fixed rank ordering used by the cleaned
/// feature columns
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HandStrength {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeCard = 3,
    Straight = 4,
    Flash = 5,
    FullHouse = 6,
    FourCard = 7,
    StraightFlash = 8,
}

impl HandStrength {
    /// Rank index in the fixed 9-value ordering
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Maps the evaluator's category bits (score >> 12) to a label
    ///
    /// Category 0 only occurs for empty hands and maps to high card
    fn from_category(category: u16) -> HandStrength {
        match category {
            0 | 1 => HandStrength::HighCard,
            2 => HandStrength::OnePair,
            3 => HandStrength::TwoPair,
            4 => HandStrength::ThreeCard,
            5 => HandStrength::Straight,
            6 => HandStrength::Flash,
            7 => HandStrength::FullHouse,
            8 => HandStrength::FourCard,
            _ => HandStrength::StraightFlash,
        }
    }
}

impl Default for HandStrength {
    fn default() -> Self {
        HandStrength::HighCard
    }
}

/// Strength label plus the determining rank of the made hand
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct HandRankInfo {
    pub strength: HandStrength,
    pub high: u16,
}

/// Evaluates the best hand formed by hole and community cards
pub fn rank(hole: &[Card], community: &[Card]) -> HandRankInfo {
    let score = card::score_hand(community, hole);
    let strength = HandStrength::from_category(score >> 12);
    let mut cards: Vec<Card> = Vec::with_capacity(hole.len() + community.len());
    cards.extend_from_slice(hole);
    cards.extend_from_slice(community);
    let counts = card::count_features(&cards);
    let high = match strength {
        HandStrength::OnePair | HandStrength::TwoPair => counts.pair_max_rank,
        HandStrength::ThreeCard | HandStrength::FullHouse => counts.trips_max_rank,
        HandStrength::FourCard => counts.quads_max_rank,
        // straight/flush high degrades to the highest card held,
        // which is monotone within the category
        _ => counts.max_rank,
    };
    HandRankInfo { strength, high }
}

/// Estimates the win probability of a hole-card pair against
/// `n_opponents` uniformly random hands
///
/// Simulator errors fall back to 0.5 as in the teacher table generators
pub fn win_rate(hole: &[Card], community: &[Card], n_opponents: usize) -> f64 {
    debug_assert_eq!(hole.len(), 2);
    let mut range_strs = vec![Combo(hole[0], hole[1], 100).to_string()];
    for _ in 0..n_opponents {
        range_strs.push(String::from("random"));
    }
    let hand_ranges = HandRange::from_strings(range_strs);
    let mut board_mask = 0u64;
    for c in community {
        board_mask |= 1u64 << c;
    }
    match approx_equity(&hand_ranges, board_mask, 1, EQUITY_STDEV_TARGET) {
        Ok(eq) => eq[0],
        Err(_) => 0.5,
    }
}
