//! Live decision agent driven by the feature pipeline
//!
//! The agent feeds engine callbacks through the same accumulator and
//! cleaner as offline replay, so the row a model sees at the table is
//! shaped exactly like the rows it trained on.

use crate::action::Action;
use crate::card::Card;
use crate::cleaner::FeatureCleaner;
use crate::equity::HandEquityCache;
use crate::error::FeatureError;
use crate::features::{FeatureAccumulator, SeatSnapshot, StreetView};
use crate::model::MergeModel;
use crate::odds::PreflopOddsTable;
use crate::record::{GameRule, GameSeat, HandInfoRecord, ValidActions, WinnerRecord};
use crate::round::Street;
use std::sync::Arc;
use tracing::debug;

/// The three decision models the agent consults in order
pub struct AgentModels {
    /// stay in the hand at all?
    pub call: MergeModel,
    /// raise rather than call?
    pub raise: MergeModel,
    /// raise size in small blinds
    pub raise_amount: MergeModel,
}

/// A decision returned to the engine
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AgentAction {
    Fold,
    Call(u32),
    Raise(u32),
}

/// One seat's live player: accumulates features from engine callbacks
/// and turns model outputs into legal actions
pub struct LiveAgent {
    acc: FeatureAccumulator,
    cleaner: FeatureCleaner,
    /// shared with the other seats this process plays
    models: Arc<AgentModels>,
    /// pins a single first-stage model when set
    model_num: Option<usize>,
    small_blind: u32,
}

impl LiveAgent {
    pub fn new(
        uuid: impl Into<String>,
        models: Arc<AgentModels>,
        odds: Arc<PreflopOddsTable>,
        equity: Arc<HandEquityCache>,
        model_num: Option<usize>,
    ) -> Self {
        LiveAgent {
            acc: FeatureAccumulator::new(uuid, equity),
            cleaner: FeatureCleaner::new(odds),
            models,
            model_num,
            small_blind: 0,
        }
    }

    pub fn on_game_start(&mut self, rule: &GameRule, seats: &[GameSeat]) {
        self.small_blind = rule.small_blind_amount;
        self.acc.on_game_start(rule, seats);
    }

    pub fn on_round_start(
        &mut self,
        round_count: u32,
        hole: &[Card],
        seats: &[SeatSnapshot],
    ) -> Result<(), FeatureError> {
        self.acc.on_round_start(round_count, hole, seats)
    }

    pub fn on_street_start(&mut self, street: Street, view: &StreetView) {
        self.acc.on_street_start(street, view);
    }

    pub fn on_player_action(&mut self, actor: &str, action: Action) -> Result<(), FeatureError> {
        self.acc.on_player_action(actor, action)
    }

    pub fn on_round_result(
        &mut self,
        winners: &[WinnerRecord],
        hand_info: &[HandInfoRecord],
    ) -> Result<(), FeatureError> {
        self.acc.on_round_result(winners, hand_info)
    }

    /// Decides the action to take at the agent's turn
    pub fn declare_action(
        &mut self,
        pot: u32,
        valid: &ValidActions,
        seats: &[SeatSnapshot],
    ) -> Result<AgentAction, FeatureError> {
        self.acc.on_declare_action(pot, valid, seats)?;
        let record = self.acc.snapshot(None);
        let (row, _) = self.cleaner.clean(&record);
        let values = row.values();
        let action = self.predict_action(&values, valid);
        let action = self.sanity_check(action, valid);
        debug!(pot, ?action, "declared action");
        Ok(action)
    }

    fn predict_action(&self, values: &[f64], valid: &ValidActions) -> AgentAction {
        if self.models.call.predict(values, self.model_num) <= 0.0 {
            return AgentAction::Fold;
        }
        if self.models.raise.predict(values, self.model_num) > 0.0 && valid.has_raise() {
            let predicted = self.models.raise_amount.predict(values, self.model_num);
            let amount = i64::from(self.small_blind) * predicted.round() as i64;
            let amount = amount.max(valid.raise_min).min(valid.raise_max);
            return AgentAction::Raise(amount.max(0) as u32);
        }
        AgentAction::Call(valid.call_amount)
    }

    /// Never fold a free check
    fn sanity_check(&self, action: AgentAction, valid: &ValidActions) -> AgentAction {
        if valid.call_amount == 0 && action == AgentAction::Fold {
            return AgentAction::Call(0);
        }
        action
    }
}
