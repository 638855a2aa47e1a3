use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a voluntary player action
///
/// Blind posts are not actions; they only appear in recorded
/// logs and are handled by the replayer's ledger
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Fold,
    Call,
    Raise,
}

/// List of countable actions, indexed by `Action::index`
pub static ACTIONS: [Action; 3] = [Action::Fold, Action::Call, Action::Raise];

impl Action {
    /// Counter-array index for this action
    pub const fn index(self) -> usize {
        match self {
            Action::Fold => 0,
            Action::Call => 1,
            Action::Raise => 2,
        }
    }
}

/// For printing actions to terminal
impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Fold => write!(f, "fold"),
            Action::Call => write!(f, "call"),
            Action::Raise => write!(f, "raise"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_indices() {
        for (i, a) in ACTIONS.iter().enumerate() {
            assert_eq!(a.index(), i);
        }
    }
}
