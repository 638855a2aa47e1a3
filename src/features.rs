//! Per-player feature accumulation over game lifecycle events
//!
//! One `FeatureAccumulator` tracks a single observer through one game.
//! The same handlers serve offline replay and the live agent; capture
//! points produce immutable `FeatureRecord` snapshots.

use crate::action::{Action, ACTIONS};
use crate::card::{self, Card, CardCounts};
use crate::equity::HandEquityCache;
use crate::error::FeatureError;
use crate::eval::{self, HandRankInfo, HandStrength};
use crate::record::{GameRule, GameSeat, HandInfoRecord, SeatState, ValidActions, WinnerRecord};
use crate::round::Street;
use std::collections::HashMap;
use std::sync::Arc;

/// Fixed number of per-player slots in a cleaned row
pub const MAX_PLAYERS: usize = 6;

/// Running counters for one action kind of one player
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ActionCounters {
    /// occurrences this round
    pub in_round: u32,
    /// occurrences this street
    pub in_street: u32,
    /// occurrences this round, per street kind
    pub in_streets: [u32; 4],
    /// rounds containing at least one occurrence
    pub rounds: u32,
    /// rounds containing at least one occurrence on each street kind
    pub street_rounds: [u32; 4],
}

/// Mutable per-player statistics for one game
#[derive(Debug, Clone)]
pub struct PlayerFeatureState {
    pub seat: usize,
    pub is_me: bool,
    pub dealer: bool,
    pub small_blind: bool,
    pub big_blind: bool,
    pub win_rounds: u32,
    /// wins that went to showdown
    pub win_rounds_shown: u32,
    pub lose_rounds: u32,
    pub stack: u32,
    pub start_stack: u32,
    pub state: SeatState,
    /// chips paid into the last lost showdown
    pub hand_paid: u32,
    /// last revealed showdown hand
    pub hand_strength: HandStrength,
    pub hand_hole_pairs: u16,
    pub hand_hole_high: u16,
    /// counters indexed by `Action::index`
    pub actions: [ActionCounters; 3],
    /// total actions taken per street kind, cumulative over the game
    pub street_actions: [u32; 4],
    /// rounds in which the player saw flop/turn/river while live
    pub streets_seen: [u32; 3],
}

impl PlayerFeatureState {
    fn new(seat: usize) -> Self {
        PlayerFeatureState {
            seat,
            is_me: false,
            dealer: false,
            small_blind: false,
            big_blind: false,
            win_rounds: 0,
            win_rounds_shown: 0,
            lose_rounds: 0,
            stack: 0,
            start_stack: 0,
            state: SeatState::Participating,
            hand_paid: 0,
            hand_strength: HandStrength::HighCard,
            hand_hole_pairs: 0,
            hand_hole_high: 0,
            actions: [ActionCounters::default(); 3],
            street_actions: [0; 4],
            streets_seen: [0; 3],
        }
    }
}

/// Observer card features recomputed whenever visible cards change
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct CardFeatures {
    /// best hand from hole + community
    pub hand: HandRankInfo,
    /// best hand on the community alone
    pub community: HandRankInfo,
    pub hole: CardCounts,
    pub board: CardCounts,
    /// cached rough equity; 0 preflop
    pub equity: f64,
}

/// Shared game context seen by the observer
#[derive(Debug, Clone)]
pub struct GameContext {
    pub small_blind: u32,
    pub initial_stack: u32,
    pub total_stack: u32,
    pub round_count: u32,
    pub street: Street,
    pub pot: u32,
    /// amounts legal at the last decision point
    pub valid: ValidActions,
    pub hole: Vec<Card>,
    pub community: Vec<Card>,
    pub cards: CardFeatures,
    /// rough equity snapshot at flop/turn/river start
    pub street_equity: [f64; 3],
    /// filled lazily by the cleaner when left at zero
    pub preflop_odds: f64,
}

impl Default for GameContext {
    fn default() -> Self {
        GameContext {
            small_blind: 0,
            initial_stack: 0,
            total_stack: 0,
            round_count: 0,
            street: Street::Preflop,
            pot: 0,
            valid: ValidActions::default(),
            hole: Vec::new(),
            community: Vec::new(),
            cards: CardFeatures::default(),
            street_equity: [0.0; 3],
            preflop_odds: 0.0,
        }
    }
}

/// A seat's stack and state as visible at one instant
#[derive(Debug, Clone)]
pub struct SeatSnapshot {
    pub uuid: String,
    pub stack: u32,
    pub state: SeatState,
}

/// Positions and community cards delivered at street start
#[derive(Debug)]
pub struct StreetView<'a> {
    pub dealer_btn: usize,
    pub small_blind_pos: usize,
    pub big_blind_pos: usize,
    pub community: &'a [Card],
}

/// Ground truth attached to training captures, never to live ones
#[derive(Debug, Clone)]
pub struct PrivateInfo {
    pub game_num: i64,
    pub game_win: bool,
    pub game_end_stack: u32,
    pub bot_name: String,
    pub bot_top: bool,
    pub round_end: bool,
    pub round_end_stack: u32,
    pub round_end_stack_diff: i64,
    /// full end-of-round community, for hindsight evaluation
    pub community: Vec<Card>,
    pub hole: Vec<Card>,
    /// hole cards of opponents still live at the decision point
    pub opponent_holes: Vec<Vec<Card>>,
    pub action: Action,
    pub amount: u32,
}

impl Default for PrivateInfo {
    fn default() -> Self {
        PrivateInfo {
            game_num: 0,
            game_win: false,
            game_end_stack: 0,
            bot_name: String::new(),
            bot_top: false,
            round_end: false,
            round_end_stack: 0,
            round_end_stack_diff: 0,
            community: Vec::new(),
            hole: Vec::new(),
            opponent_holes: Vec::new(),
            action: Action::Fold,
            amount: 0,
        }
    }
}

/// Immutable snapshot of accumulated state at a capture point
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub ctx: GameContext,
    /// player states in seat order
    pub players: Vec<PlayerFeatureState>,
    pub observer_seat: usize,
    pub private: Option<PrivateInfo>,
}

/// Accumulates per-player statistics for one observer across one game
#[derive(Debug)]
pub struct FeatureAccumulator {
    equity: Arc<HandEquityCache>,
    observer: String,
    ctx: GameContext,
    players: Vec<PlayerFeatureState>,
    index: HashMap<String, usize>,
    observer_seat: usize,
}

impl FeatureAccumulator {
    pub fn new(observer: impl Into<String>, equity: Arc<HandEquityCache>) -> Self {
        FeatureAccumulator {
            equity,
            observer: observer.into(),
            ctx: GameContext::default(),
            players: Vec::new(),
            index: HashMap::new(),
            observer_seat: 0,
        }
    }

    pub fn observer(&self) -> &str {
        &self.observer
    }

    pub fn ctx(&self) -> &GameContext {
        &self.ctx
    }

    pub fn players(&self) -> &[PlayerFeatureState] {
        &self.players
    }

    /// Registers one state per seat, in seat order, and records blind
    /// and stack constants
    pub fn on_game_start(&mut self, rule: &GameRule, seats: &[GameSeat]) {
        self.ctx = GameContext {
            small_blind: rule.small_blind_amount,
            initial_stack: rule.initial_stack,
            total_stack: rule.initial_stack * seats.len() as u32,
            ..GameContext::default()
        };
        self.players.clear();
        self.index.clear();
        for (i, seat) in seats.iter().enumerate() {
            let mut player = PlayerFeatureState::new(i);
            if seat.uuid == self.observer {
                player.is_me = true;
                self.observer_seat = i;
            }
            self.index.insert(seat.uuid.clone(), i);
            self.players.push(player);
        }
    }

    /// Resets per-round transients and snapshots starting stacks
    pub fn on_round_start(
        &mut self,
        round_count: u32,
        hole: &[Card],
        seats: &[SeatSnapshot],
    ) -> Result<(), FeatureError> {
        self.ctx.round_count = round_count;
        self.ctx.hole = hole.to_vec();
        self.ctx.community.clear();
        self.ctx.street_equity = [0.0; 3];
        self.refresh_cards();
        for snap in seats {
            let idx = self.player_index(&snap.uuid)?;
            let player = &mut self.players[idx];
            player.start_stack = snap.stack;
            player.state = snap.state;
            for action in &ACTIONS {
                let counters = &mut player.actions[action.index()];
                counters.in_round = 0;
                counters.in_street = 0;
                counters.in_streets = [0; 4];
            }
        }
        Ok(())
    }

    /// Marks position flags on preflop; extends the visible community
    /// and credits street participation afterwards
    pub fn on_street_start(&mut self, street: Street, view: &StreetView) {
        self.ctx.street = street;
        if street == Street::Preflop {
            self.ctx.preflop_odds = 0.0;
            for player in &mut self.players {
                player.dealer = player.seat == view.dealer_btn;
                player.small_blind = player.seat == view.small_blind_pos;
                player.big_blind = player.seat == view.big_blind_pos;
            }
            return;
        }
        let visible = street.community_cards().min(view.community.len());
        self.ctx.community = view.community[..visible].to_vec();
        self.refresh_cards();
        let street_idx = usize::from(street) - 1;
        self.ctx.street_equity[street_idx] = self.ctx.cards.equity;
        for player in &mut self.players {
            if player.state != SeatState::Folded {
                player.streets_seen[street_idx] += 1;
            }
            for action in &ACTIONS {
                player.actions[action.index()].in_street = 0;
            }
        }
    }

    /// Counts one action by `actor` on the current street
    ///
    /// First-occurrence counters advance exactly once per round/street,
    /// guarded by their own running count reaching one
    pub fn on_player_action(&mut self, actor: &str, action: Action) -> Result<(), FeatureError> {
        let street_idx = usize::from(self.ctx.street);
        let idx = self.player_index(actor)?;
        let player = &mut self.players[idx];
        player.street_actions[street_idx] += 1;
        let counters = &mut player.actions[action.index()];
        counters.in_round += 1;
        counters.in_street += 1;
        counters.in_streets[street_idx] += 1;
        if counters.in_round == 1 {
            counters.rounds += 1;
        }
        if counters.in_streets[street_idx] == 1 {
            counters.street_rounds[street_idx] += 1;
        }
        Ok(())
    }

    /// Snapshots the pot and legal amounts at the observer's decision
    /// point and refreshes every seat's stack/state
    pub fn on_declare_action(
        &mut self,
        pot: u32,
        valid: &ValidActions,
        seats: &[SeatSnapshot],
    ) -> Result<(), FeatureError> {
        self.ctx.pot = pot;
        self.ctx.valid = valid.clone();
        for snap in seats {
            let idx = self.player_index(&snap.uuid)?;
            let player = &mut self.players[idx];
            player.stack = snap.stack;
            player.state = snap.state;
        }
        Ok(())
    }

    /// Credits winners and records showdown losses
    pub fn on_round_result(
        &mut self,
        winners: &[WinnerRecord],
        hand_info: &[HandInfoRecord],
    ) -> Result<(), FeatureError> {
        let showdown = if hand_info.is_empty() { 0 } else { 1 };
        for winner in winners {
            let idx = self.player_index(&winner.uuid)?;
            let player = &mut self.players[idx];
            player.win_rounds += 1;
            player.win_rounds_shown += showdown;
        }
        for info in hand_info {
            if winners.iter().any(|w| w.uuid == info.uuid) {
                continue;
            }
            let idx = self.player_index(&info.uuid)?;
            let player = &mut self.players[idx];
            player.lose_rounds += 1;
            player.hand_paid = player.start_stack.saturating_sub(player.stack);
            player.hand_strength = info.hand.hand.strength;
            player.hand_hole_high = info.hand.hole.high;
            player.hand_hole_pairs = if info.hand.hole.high == info.hand.hole.low {
                info.hand.hole.high
            } else {
                0
            };
        }
        Ok(())
    }

    /// Produces an immutable record of the current state
    pub fn snapshot(&self, private: Option<PrivateInfo>) -> FeatureRecord {
        FeatureRecord {
            ctx: self.ctx.clone(),
            players: self.players.clone(),
            observer_seat: self.observer_seat,
            private,
        }
    }

    fn player_index(&self, uuid: &str) -> Result<usize, FeatureError> {
        self.index
            .get(uuid)
            .copied()
            .ok_or_else(|| FeatureError::UnknownPlayer(uuid.to_string()))
    }

    fn refresh_cards(&mut self) {
        let hand = eval::rank(&self.ctx.hole, &self.ctx.community);
        let community = if self.ctx.community.is_empty() {
            HandRankInfo::default()
        } else {
            eval::rank(&self.ctx.community, &[])
        };
        let equity = if self.ctx.community.is_empty() {
            0.0
        } else {
            self.equity.estimate(&self.ctx.hole, &self.ctx.community)
        };
        self.ctx.cards = CardFeatures {
            hand,
            community,
            hole: card::count_features(&self.ctx.hole),
            board: card::count_features(&self.ctx.community),
            equity,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::cards_from_labels;

    fn rule() -> GameRule {
        GameRule {
            small_blind_amount: 10,
            initial_stack: 1000,
        }
    }

    fn seats() -> Vec<GameSeat> {
        vec![
            GameSeat {
                uuid: "p1".to_string(),
                name: "alice".to_string(),
                stack: 1000,
                top_player: false,
            },
            GameSeat {
                uuid: "p2".to_string(),
                name: "bob".to_string(),
                stack: 1000,
                top_player: false,
            },
        ]
    }

    fn snapshots() -> Vec<SeatSnapshot> {
        vec![
            SeatSnapshot {
                uuid: "p1".to_string(),
                stack: 1000,
                state: SeatState::Participating,
            },
            SeatSnapshot {
                uuid: "p2".to_string(),
                stack: 1000,
                state: SeatState::Participating,
            },
        ]
    }

    fn hole() -> Vec<Card> {
        cards_from_labels(&["SA".to_string(), "HA".to_string()]).unwrap()
    }

    fn started() -> FeatureAccumulator {
        let mut acc = FeatureAccumulator::new("p1", Arc::new(HandEquityCache::new()));
        acc.on_game_start(&rule(), &seats());
        acc.on_round_start(1, &hole(), &snapshots()).unwrap();
        acc.on_street_start(
            Street::Preflop,
            &StreetView {
                dealer_btn: 0,
                small_blind_pos: 0,
                big_blind_pos: 1,
                community: &[],
            },
        );
        acc
    }

    #[test]
    fn test_game_start_registers_seats() {
        let acc = started();
        assert_eq!(acc.players().len(), 2);
        assert!(acc.players()[0].is_me);
        assert!(!acc.players()[1].is_me);
        assert_eq!(acc.ctx().total_stack, 2000);
        assert_eq!(acc.ctx().cards.hand.strength, HandStrength::OnePair);
        // no community yet, no simulation
        assert_eq!(acc.ctx().cards.equity, 0.0);
    }

    #[test]
    fn test_preflop_marks_positions() {
        let acc = started();
        assert!(acc.players()[0].dealer);
        assert!(acc.players()[0].small_blind);
        assert!(acc.players()[1].big_blind);
    }

    #[test]
    fn test_first_occurrence_counters_guarded() {
        let mut acc = started();
        acc.on_player_action("p2", Action::Raise).unwrap();
        acc.on_player_action("p2", Action::Raise).unwrap();
        let raise = &acc.players()[1].actions[Action::Raise.index()];
        assert_eq!(raise.in_round, 2);
        assert_eq!(raise.in_street, 2);
        assert_eq!(raise.in_streets[0], 2);
        // first-occurrence counters advanced only once
        assert_eq!(raise.rounds, 1);
        assert_eq!(raise.street_rounds[0], 1);
        assert_eq!(acc.players()[1].street_actions[0], 2);
    }

    #[test]
    fn test_round_start_resets_transients() {
        let mut acc = started();
        acc.on_player_action("p1", Action::Call).unwrap();
        acc.on_round_start(2, &hole(), &snapshots()).unwrap();
        let call = &acc.players()[0].actions[Action::Call.index()];
        assert_eq!(call.in_round, 0);
        assert_eq!(call.in_streets, [0; 4]);
        // cumulative counters survive the reset
        assert_eq!(call.rounds, 1);
        assert_eq!(acc.players()[0].street_actions[0], 1);
    }

    #[test]
    fn test_unknown_player_is_a_fault() {
        let mut acc = started();
        let err = acc.on_player_action("ghost", Action::Fold).unwrap_err();
        assert!(matches!(err, FeatureError::UnknownPlayer(_)));
    }

    #[test]
    fn test_declare_action_snapshots_amounts() {
        let mut acc = started();
        let valid = ValidActions {
            call_amount: 20,
            raise_min: 40,
            raise_max: 990,
        };
        let mut seats = snapshots();
        seats[0].stack = 980;
        acc.on_declare_action(45, &valid, &seats).unwrap();
        assert_eq!(acc.ctx().pot, 45);
        assert_eq!(acc.ctx().valid, valid);
        assert_eq!(acc.players()[0].stack, 980);
    }

    #[test]
    fn test_round_result_counters() {
        let mut acc = started();
        let winners = vec![WinnerRecord {
            uuid: "p2".to_string(),
        }];
        acc.on_round_result(&winners, &[]).unwrap();
        assert_eq!(acc.players()[1].win_rounds, 1);
        // no showdown happened
        assert_eq!(acc.players()[1].win_rounds_shown, 0);
        assert_eq!(acc.players()[0].lose_rounds, 0);
    }
}
