//! Serde model of the recorded-game format
//!
//! One JSON document per game: static seat list plus a sequence of
//! rounds, each with per-street action histories, seat states, and
//! showdown results. Consumed by the replayer; never produced here.

use crate::action::Action;
use crate::eval::HandStrength;
use crate::round::Street;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// One recorded game
#[derive(Debug, Clone, Deserialize)]
pub struct GameRecord {
    pub rule: GameRule,
    pub seats: Vec<GameSeat>,
    pub rounds: Vec<RoundRecord>,
}

/// Table constants fixed for the whole game
#[derive(Debug, Clone, Deserialize)]
pub struct GameRule {
    pub small_blind_amount: u32,
    pub initial_stack: u32,
}

/// A seat as listed at the top of the game document
///
/// `stack` is the end-of-game stack; `top_player` is set by the
/// dataset loader when the seat matched its name filter
#[derive(Debug, Clone, Deserialize)]
pub struct GameSeat {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    pub stack: u32,
    #[serde(default)]
    pub top_player: bool,
}

/// One recorded round (hand)
#[derive(Debug, Clone, Deserialize)]
pub struct RoundRecord {
    pub round_state: RoundState,
    #[serde(default)]
    pub winners: Vec<WinnerRecord>,
    #[serde(default)]
    pub hand_info: Vec<HandInfoRecord>,
}

/// Table state of one round as recorded at round end
#[derive(Debug, Clone, Deserialize)]
pub struct RoundState {
    pub round_count: u32,
    pub dealer_btn: usize,
    pub small_blind_pos: usize,
    pub big_blind_pos: usize,
    #[serde(default)]
    pub community_card: Vec<String>,
    pub seats: Vec<RoundSeat>,
    #[serde(default)]
    pub action_histories: HashMap<Street, Vec<HistoryAction>>,
}

/// A seat's state within one round
///
/// `start_stack` is recorded net of posted blinds; the replayer
/// compensates before re-applying the blind deltas
#[derive(Debug, Clone, Deserialize)]
pub struct RoundSeat {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    pub stack: u32,
    pub start_stack: u32,
    #[serde(default)]
    pub hole_card: Vec<String>,
    pub state: SeatState,
    pub start_state: SeatState,
}

/// Participation state of a seat
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    Participating,
    Folded,
    Allin,
}

/// An action-history entry as logged by the engine
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryAction {
    pub uuid: String,
    pub action: LogAction,
    #[serde(default)]
    pub amount: u32,
    #[serde(default)]
    pub paid: Option<u32>,
    #[serde(default)]
    pub add_amount: Option<u32>,
    /// Decision trace, present only for actions taken by logged bots
    #[serde(default)]
    pub bot: Option<BotTrace>,
}

/// Action kinds appearing in the log, including forced blind posts
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogAction {
    Fold,
    Call,
    Raise,
    SmallBlind,
    BigBlind,
}

impl LogAction {
    /// The countable action, or None for blind posts
    pub fn to_action(self) -> Option<Action> {
        match self {
            LogAction::Fold => Some(Action::Fold),
            LogAction::Call => Some(Action::Call),
            LogAction::Raise => Some(Action::Raise),
            LogAction::SmallBlind | LogAction::BigBlind => None,
        }
    }

    pub fn is_blind(self) -> bool {
        self.to_action().is_none()
    }
}

/// Decision context captured alongside a logged bot action
#[derive(Debug, Clone, Deserialize)]
pub struct BotTrace {
    pub failed: bool,
    pub valid_actions: ValidActions,
}

/// The amounts legal for the observer at a decision point
///
/// `raise_min`/`raise_max` are -1 when no raise is legal
#[derive(Debug, Clone, PartialEq)]
pub struct ValidActions {
    pub call_amount: u32,
    pub raise_min: i64,
    pub raise_max: i64,
}

impl Default for ValidActions {
    fn default() -> Self {
        ValidActions {
            call_amount: 0,
            raise_min: -1,
            raise_max: -1,
        }
    }
}

impl ValidActions {
    /// True if the engine offers a legal raise
    pub fn has_raise(&self) -> bool {
        self.raise_min >= 0
    }
}

/// The engine logs valid actions as a positional list of
/// fold/call/raise entries; decode it into the explicit struct so
/// nothing downstream depends on list order
impl<'de> Deserialize<'de> for ValidActions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum EntryAmount {
            Flat(i64),
            Range { min: i64, max: i64 },
        }
        #[derive(Deserialize)]
        struct Entry {
            action: String,
            #[serde(default)]
            amount: Option<EntryAmount>,
        }
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        let mut valid = ValidActions::default();
        for entry in entries {
            match (entry.action.as_str(), entry.amount) {
                ("call", Some(EntryAmount::Flat(amount))) => {
                    valid.call_amount = amount.max(0) as u32;
                }
                ("raise", Some(EntryAmount::Range { min, max })) => {
                    valid.raise_min = min;
                    valid.raise_max = max;
                }
                _ => {}
            }
        }
        Ok(valid)
    }
}

/// A winner entry of one round
#[derive(Debug, Clone, Deserialize)]
pub struct WinnerRecord {
    pub uuid: String,
}

/// Showdown information for one participant
#[derive(Debug, Clone, Deserialize)]
pub struct HandInfoRecord {
    pub uuid: String,
    pub hand: HandDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HandDetail {
    pub hand: RankDetail,
    pub hole: HoleDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankDetail {
    pub strength: HandStrength,
    pub high: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoleDetail {
    pub high: u16,
    pub low: u16,
}
