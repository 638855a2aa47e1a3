use crate::error::FeatureError;
use rust_poker::hand_evaluator::{evaluate, Hand, CARDS};
use std::iter::FromIterator;

/// use 8 bit integer to represent a playing card
/// valid cards n: 0->51
/// where n is 4 * rank + suit
pub type Card = u8;

/// Number of cards in deck
pub const CARD_COUNT: u8 = 52;

/// Rank characters in ascending order (deuce to ace)
static RANK_CHARS: [char; 13] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'A',
];

/// Suit characters in the recorded-game label order
static SUIT_CHARS: [char; 4] = ['C', 'D', 'H', 'S'];

/// Rank of a card on the 2..14 scale used by the feature columns
pub const fn rank_value(card: Card) -> u16 {
    (card >> 2) as u16 + 2
}

/// Suit index of a card (0..4)
pub const fn suit_index(card: Card) -> usize {
    (card & 3) as usize
}

/// Parses a recorded-game card label (suit letter then rank, e.g. "SA", "H2")
pub fn card_from_label(label: &str) -> Result<Card, FeatureError> {
    let mut chars = label.chars();
    let invalid = || FeatureError::InvalidCard(label.to_string());
    let suit_char = chars.next().ok_or_else(invalid)?;
    let rank_char = chars.next().ok_or_else(invalid)?;
    if chars.next().is_some() {
        return Err(invalid());
    }
    let suit = SUIT_CHARS.iter().position(|&c| c == suit_char).ok_or_else(invalid)?;
    let rank = RANK_CHARS.iter().position(|&c| c == rank_char).ok_or_else(invalid)?;
    Ok((rank * 4 + suit) as Card)
}

/// Parses a list of recorded-game card labels
pub fn cards_from_labels(labels: &[String]) -> Result<Vec<Card>, FeatureError> {
    labels.iter().map(|l| card_from_label(l)).collect()
}

/// Emits a card in the recorded-game label format
pub fn card_label(card: Card) -> String {
    let mut s = String::with_capacity(2);
    s.push(SUIT_CHARS[suit_index(card)]);
    s.push(RANK_CHARS[usize::from(card >> 2)]);
    s
}

/// Turns an array of cards into a human-readable string
pub fn cards_to_str(cards: &[Card]) -> String {
    let mut chars: Vec<char> = Vec::new();
    cards.iter().filter(|c| **c < CARD_COUNT).for_each(|c| {
        chars.push(RANK_CHARS[usize::from(*c >> 2)]);
        chars.push(SUIT_CHARS[usize::from(*c & 3)]);
    });
    String::from_iter(chars)
}

/// Canonical preflop label of a starting hand ignoring exact suits
///
/// Higher rank first, pairs are two characters ("77"), otherwise a
/// suited/offsuit suffix is appended ("AKs" / "AKo"). Symmetric in its
/// arguments.
pub fn preflop_label(c1: Card, c2: Card) -> String {
    let (hi, lo) = if (c1 >> 2) >= (c2 >> 2) { (c1, c2) } else { (c2, c1) };
    let mut label = String::with_capacity(3);
    label.push(RANK_CHARS[usize::from(hi >> 2)]);
    label.push(RANK_CHARS[usize::from(lo >> 2)]);
    if (hi >> 2) != (lo >> 2) {
        label.push(if (hi & 3) == (lo & 3) { 's' } else { 'o' });
    }
    label
}

/// Scores a texas holdem hand
///
/// Combines private cards and public board cards
/// to create the best 5-card hand possible
/// and returns its score
///
/// higher score is better
pub fn score_hand(board: &[Card], private_cards: &[Card]) -> u16 {
    let mut hand = Hand::default();
    board.iter().for_each(|c| {
        hand += CARDS[usize::from(*c)];
    });
    private_cards.iter().for_each(|c| {
        hand += CARDS[usize::from(*c)];
    });
    evaluate(&hand)
}

/// Rank/suit multiplicity features of a set of cards
///
/// Ranks are on the 2..14 scale; a rank contributes to exactly one of the
/// pair/trips/quads buckets depending on its multiplicity
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct CardCounts {
    pub max_rank: u16,
    pub pairs: u16,
    pub pair_max_rank: u16,
    pub trips: u16,
    pub trips_max_rank: u16,
    pub quads: u16,
    pub quads_max_rank: u16,
    pub suits: [u16; 4],
}

/// Computes rank/suit multiplicity features for a set of cards
pub fn count_features(cards: &[Card]) -> CardCounts {
    let mut rank_counts = [0u16; 13];
    let mut counts = CardCounts::default();
    for c in cards {
        rank_counts[usize::from(c >> 2)] += 1;
        counts.suits[suit_index(*c)] += 1;
        counts.max_rank = counts.max_rank.max(rank_value(*c));
    }
    for (rank, n) in rank_counts.iter().enumerate() {
        let value = rank as u16 + 2;
        match n {
            2 => {
                counts.pairs += 1;
                counts.pair_max_rank = counts.pair_max_rank.max(value);
            }
            3 => {
                counts.trips += 1;
                counts.trips_max_rank = counts.trips_max_rank.max(value);
            }
            4 => {
                counts.quads += 1;
                counts.quads_max_rank = counts.quads_max_rank.max(value);
            }
            _ => {}
        }
    }
    counts
}
