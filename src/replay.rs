//! Replays recorded games through feature accumulators
//!
//! The recorded documents only carry end-of-round state, so the
//! replayer reconstructs mid-round stacks and the pot by applying the
//! action history to a per-round ledger. One accumulator runs per
//! observed seat; every non-failed bot decision becomes one training
//! record captured before the decision's chips move.

use crate::card::{self, Card};
use crate::equity::HandEquityCache;
use crate::error::FeatureError;
use crate::features::{FeatureAccumulator, FeatureRecord, PrivateInfo, SeatSnapshot, StreetView};
use crate::record::{GameRecord, GameSeat, LogAction, RoundRecord, SeatState};
use crate::round::{Street, STREETS};
use std::sync::Arc;
use tracing::debug;

type SeatFilter = Box<dyn Fn(&GameSeat) -> bool + Send + Sync>;
type ActionFilter = Box<dyn Fn(&FeatureRecord) -> bool + Send + Sync>;

/// One observed seat: its accumulator plus the ground-truth template
/// carried into each capture
struct Tracker {
    acc: FeatureAccumulator,
    private: PrivateInfo,
    hole: Vec<Card>,
}

/// Reconstructed stack and state of one seat while a round replays
struct LedgerSeat {
    uuid: String,
    stack: u32,
    state: SeatState,
    hole: Vec<Card>,
}

/// Replays recorded games and collects training records
pub struct GameReplayer {
    equity: Arc<HandEquityCache>,
    seat_filter: Option<SeatFilter>,
    action_filter: Option<ActionFilter>,
    game_counter: i64,
    records: Vec<FeatureRecord>,
}

impl GameReplayer {
    pub fn new(equity: Arc<HandEquityCache>) -> Self {
        GameReplayer {
            equity,
            seat_filter: None,
            action_filter: None,
            game_counter: -1,
            records: Vec::new(),
        }
    }

    /// Restricts observation to seats accepted by `filter`
    pub fn filter_seats<F>(&mut self, filter: F)
    where
        F: Fn(&GameSeat) -> bool + Send + Sync + 'static,
    {
        self.seat_filter = Some(Box::new(filter));
    }

    /// Drops captured records rejected by `filter`
    pub fn filter_actions<F>(&mut self, filter: F)
    where
        F: Fn(&FeatureRecord) -> bool + Send + Sync + 'static,
    {
        self.action_filter = Some(Box::new(filter));
    }

    /// Overrides the game number assigned to the next replayed game,
    /// for callers partitioning work across workers
    pub fn set_game_counter(&mut self, counter: i64) {
        self.game_counter = counter;
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FeatureRecord> {
        self.records
    }

    /// Replays one game, returning the number of records captured
    pub fn replay(&mut self, game: &GameRecord) -> Result<usize, FeatureError> {
        self.game_counter += 1;
        // the game winner holds the largest end-of-game stack
        let winner = game
            .seats
            .iter()
            .max_by_key(|s| s.stack)
            .map(|s| s.uuid.as_str());

        let mut trackers: Vec<Tracker> = Vec::new();
        for seat in &game.seats {
            if let Some(filter) = &self.seat_filter {
                if !filter(seat) {
                    continue;
                }
            }
            let mut acc = FeatureAccumulator::new(seat.uuid.clone(), Arc::clone(&self.equity));
            acc.on_game_start(&game.rule, &game.seats);
            trackers.push(Tracker {
                acc,
                private: PrivateInfo {
                    game_num: self.game_counter,
                    game_win: winner == Some(seat.uuid.as_str()),
                    game_end_stack: seat.stack,
                    bot_name: seat.name.clone(),
                    bot_top: seat.top_player,
                    ..PrivateInfo::default()
                },
                hole: Vec::new(),
            });
        }

        let captured_before = self.records.len();
        for round in &game.rounds {
            self.replay_round(&mut trackers, round)?;
        }
        let captured = self.records.len() - captured_before;
        debug!(
            game_num = self.game_counter,
            seats = trackers.len(),
            rounds = game.rounds.len(),
            captured,
            "replayed game"
        );
        Ok(captured)
    }

    fn replay_round(
        &mut self,
        trackers: &mut [Tracker],
        round: &RoundRecord,
    ) -> Result<(), FeatureError> {
        let state = &round.round_state;
        let community = card::cards_from_labels(&state.community_card)?;

        let mut ledger: Vec<LedgerSeat> = Vec::with_capacity(state.seats.len());
        for seat in &state.seats {
            ledger.push(LedgerSeat {
                uuid: seat.uuid.clone(),
                stack: seat.start_stack,
                state: seat.start_state,
                hole: card::cards_from_labels(&seat.hole_card)?,
            });
        }

        for tracker in trackers.iter_mut() {
            if let Some(seat) = state
                .seats
                .iter()
                .find(|s| s.uuid == tracker.acc.observer())
            {
                tracker.hole = card::cards_from_labels(&seat.hole_card)?;
                tracker.private.round_end_stack_diff =
                    i64::from(seat.stack) - i64::from(seat.start_stack);
                tracker.private.round_end_stack = seat.stack;
                tracker.private.round_end = seat.stack > seat.start_stack;
                tracker.private.community = community.clone();
                tracker.private.hole = tracker.hole.clone();
            }
        }
        // showdown participants finished the round even when they lost
        for info in &round.hand_info {
            if let Some(tracker) = trackers
                .iter_mut()
                .find(|t| t.acc.observer() == info.uuid)
            {
                tracker.private.round_end = true;
            }
        }

        // recorded start stacks are net of posted blinds; put the
        // blinds back so the event loop deducts them like any other bet
        if let Some(preflop) = state.action_histories.get(&Street::Preflop) {
            for entry in preflop {
                if entry.action.is_blind() {
                    let seat = Self::ledger_mut(&mut ledger, &entry.uuid)?;
                    seat.stack += entry.amount;
                }
            }
        }

        let snapshots = Self::snapshots(&ledger);
        for tracker in trackers.iter_mut() {
            let hole = tracker.hole.clone();
            tracker
                .acc
                .on_round_start(state.round_count, &hole, &snapshots)?;
        }

        let mut pot: u32 = 0;
        for street in &STREETS {
            let history = match state.action_histories.get(street) {
                Some(history) => history,
                None => continue,
            };
            let view = StreetView {
                dealer_btn: state.dealer_btn,
                small_blind_pos: state.small_blind_pos,
                big_blind_pos: state.big_blind_pos,
                community: &community,
            };
            for tracker in trackers.iter_mut() {
                tracker.acc.on_street_start(*street, &view);
            }

            for entry in history {
                let mut money = entry.paid.unwrap_or(0);
                if money == 0 {
                    money = entry.add_amount.unwrap_or(0);
                }

                match entry.action.to_action() {
                    Some(action) => {
                        // capture before this decision's chips move
                        if let Some(bot) = entry.bot.as_ref().filter(|b| !b.failed) {
                            if let Some(tracker) = trackers
                                .iter_mut()
                                .find(|t| t.acc.observer() == entry.uuid)
                            {
                                let mut private = tracker.private.clone();
                                private.opponent_holes = ledger
                                    .iter()
                                    .filter(|s| {
                                        s.state != SeatState::Folded && s.uuid != entry.uuid
                                    })
                                    .map(|s| s.hole.clone())
                                    .collect();
                                private.action = action;
                                private.amount = entry.amount;
                                tracker.acc.on_declare_action(
                                    pot,
                                    &bot.valid_actions,
                                    &Self::snapshots(&ledger),
                                )?;
                                let record = tracker.acc.snapshot(Some(private));
                                let keep = self
                                    .action_filter
                                    .as_ref()
                                    .map_or(true, |filter| filter(&record));
                                if keep {
                                    self.records.push(record);
                                }
                            }
                        }
                    }
                    None => {
                        money = entry.amount;
                    }
                }

                pot += money;
                let seat = Self::ledger_mut(&mut ledger, &entry.uuid)?;
                seat.stack = seat.stack.saturating_sub(money);
                if entry.action == LogAction::Fold {
                    seat.state = SeatState::Folded;
                }

                if let Some(action) = entry.action.to_action() {
                    for tracker in trackers.iter_mut() {
                        tracker.acc.on_player_action(&entry.uuid, action)?;
                    }
                }
            }
        }

        for tracker in trackers.iter_mut() {
            tracker
                .acc
                .on_round_result(&round.winners, &round.hand_info)?;
        }
        Ok(())
    }

    fn snapshots(ledger: &[LedgerSeat]) -> Vec<SeatSnapshot> {
        ledger
            .iter()
            .map(|seat| SeatSnapshot {
                uuid: seat.uuid.clone(),
                stack: seat.stack,
                state: seat.state,
            })
            .collect()
    }

    fn ledger_mut<'a>(
        ledger: &'a mut [LedgerSeat],
        uuid: &str,
    ) -> Result<&'a mut LedgerSeat, FeatureError> {
        ledger
            .iter_mut()
            .find(|s| s.uuid == uuid)
            .ok_or_else(|| FeatureError::UnknownPlayer(uuid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use serde_json::json;

    fn heads_up_game() -> GameRecord {
        let raw = json!({
            "rule": { "small_blind_amount": 10, "initial_stack": 1000 },
            "seats": [
                { "uuid": "p1", "name": "alice", "stack": 1020 },
                { "uuid": "p2", "name": "bob", "stack": 980 }
            ],
            "rounds": [
                {
                    "round_state": {
                        "round_count": 1,
                        "dealer_btn": 0,
                        "small_blind_pos": 0,
                        "big_blind_pos": 1,
                        "community_card": [],
                        "seats": [
                            {
                                "uuid": "p1", "name": "alice",
                                "stack": 1020, "start_stack": 990,
                                "hole_card": ["SA", "HA"],
                                "state": "participating", "start_state": "participating"
                            },
                            {
                                "uuid": "p2", "name": "bob",
                                "stack": 980, "start_stack": 980,
                                "hole_card": ["C2", "D7"],
                                "state": "folded", "start_state": "participating"
                            }
                        ],
                        "action_histories": {
                            "preflop": [
                                { "uuid": "p1", "action": "SMALLBLIND", "amount": 10, "add_amount": 10 },
                                { "uuid": "p2", "action": "BIGBLIND", "amount": 20, "add_amount": 10 },
                                {
                                    "uuid": "p1", "action": "RAISE",
                                    "amount": 40, "paid": 40, "add_amount": 20,
                                    "bot": {
                                        "failed": false,
                                        "valid_actions": [
                                            { "action": "fold", "amount": 0 },
                                            { "action": "call", "amount": 20 },
                                            { "action": "raise", "amount": { "min": 40, "max": 990 } }
                                        ]
                                    }
                                },
                                { "uuid": "p2", "action": "FOLD", "amount": 0 }
                            ]
                        }
                    },
                    "winners": [ { "uuid": "p1" } ],
                    "hand_info": []
                }
            ]
        });
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_captures_only_bot_decisions() {
        let mut replayer = GameReplayer::new(Arc::new(HandEquityCache::new()));
        let captured = replayer.replay(&heads_up_game()).unwrap();
        // p2's fold has no decision trace, so only the raise is kept
        assert_eq!(captured, 1);
        let record = &replayer.records()[0];
        let private = record.private.as_ref().unwrap();
        assert_eq!(private.action, Action::Raise);
        assert_eq!(private.amount, 40);
        assert_eq!(private.game_num, 0);
        assert!(private.game_win);
        assert!(private.round_end);
        assert_eq!(private.round_end_stack_diff, 30);
        assert_eq!(private.opponent_holes.len(), 1);
    }

    #[test]
    fn test_capture_precedes_the_decision_chips() {
        let mut replayer = GameReplayer::new(Arc::new(HandEquityCache::new()));
        replayer.replay(&heads_up_game()).unwrap();
        let record = &replayer.records()[0];
        // blinds only: the raise itself has not hit the pot yet
        assert_eq!(record.ctx.pot, 30);
        assert_eq!(record.ctx.valid.call_amount, 20);
        // blind re-add then small blind deducted again
        assert_eq!(record.players[0].stack, 990);
        assert_eq!(record.players[0].start_stack, 1000);
    }

    #[test]
    fn test_all_seats_count_every_action() {
        let mut replayer = GameReplayer::new(Arc::new(HandEquityCache::new()));
        replayer.replay(&heads_up_game()).unwrap();
        let record = &replayer.records()[0];
        // p2's fold lands after the capture, so the snapshot only has
        // the raise itself; blind posts never count as actions
        assert_eq!(record.players[0].actions[Action::Raise.index()].in_round, 0);
        assert_eq!(record.players[1].actions[Action::Fold.index()].in_round, 0);
        assert_eq!(record.players[0].street_actions[0], 0);
    }

    #[test]
    fn test_seat_filter_drops_observers() {
        let mut replayer = GameReplayer::new(Arc::new(HandEquityCache::new()));
        replayer.filter_seats(|seat| seat.uuid == "p2");
        let captured = replayer.replay(&heads_up_game()).unwrap();
        assert_eq!(captured, 0);
    }

    #[test]
    fn test_action_filter_drops_records() {
        let mut replayer = GameReplayer::new(Arc::new(HandEquityCache::new()));
        replayer.filter_actions(|record| {
            record
                .private
                .as_ref()
                .map_or(false, |p| p.action == Action::Call)
        });
        let captured = replayer.replay(&heads_up_game()).unwrap();
        assert_eq!(captured, 0);
    }

    #[test]
    fn test_game_counter_override() {
        let mut replayer = GameReplayer::new(Arc::new(HandEquityCache::new()));
        replayer.set_game_counter(41);
        replayer.replay(&heads_up_game()).unwrap();
        let private = replayer.records()[0].private.as_ref().unwrap();
        assert_eq!(private.game_num, 42);
    }
}
