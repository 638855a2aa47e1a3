use serde::{Deserialize, Serialize};
use std::fmt;

/// The current betting street of a Texas Holdem round
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

/// All streets in play order
pub static STREETS: [Street; 4] = [Street::Preflop, Street::Flop, Street::Turn, Street::River];

impl Street {
    /// Number of community cards visible on this street
    pub const fn community_cards(self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River => 5,
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let street_str = match self {
            Street::Preflop => "preflop",
            Street::Flop => "flop",
            Street::Turn => "turn",
            Street::River => "river",
        };
        write!(f, "{}", street_str)
    }
}

impl From<Street> for usize {
    fn from(street: Street) -> Self {
        match street {
            Street::Preflop => 0,
            Street::Flop => 1,
            Street::Turn => 2,
            Street::River => 3,
        }
    }
}
