//! Turns raw feature records into fixed-width model rows
//!
//! The cleaner normalizes counters, rescales chip amounts into
//! small-blind units, canonicalizes player order into six fixed slots,
//! and splits ground truth into a separate label row. Column layout is
//! owned by the typed `CleanedRow`/`PrivateRow` structs; the CSV header
//! comes from their `columns` methods, never from string assembly at
//! fill time.

use crate::action::{Action, ACTIONS};
use crate::card::{self, CardCounts};
use crate::features::{FeatureRecord, PlayerFeatureState, MAX_PLAYERS};
use crate::odds::PreflopOddsTable;
use crate::record::SeatState;
use crate::round::{Street, STREETS};
use std::sync::Arc;

/// Rounds to one decimal place, the precision of all ratio columns
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Converts a chip amount into rounded small-blind units
fn sb_units(amount: i64, small_blind: u32) -> i64 {
    (amount as f64 / small_blind as f64).round() as i64
}

/// Per-action normalized columns of one player slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionSlot {
    /// share of rounds containing this action
    pub rounds: f64,
    pub in_round: u32,
    pub in_street: u32,
    pub in_streets: [u32; 4],
    /// per-street round share, relative to the player's activity there
    pub street_rounds: [f64; 4],
}

/// One of the six fixed player slots of a cleaned row
///
/// Inactive slots (folded, all-in, or table smaller than six) emit the
/// -1 sentinel in every column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSlot {
    pub active: bool,
    pub dealer: bool,
    pub small_blind: bool,
    pub big_blind: bool,
    pub win_rounds: f64,
    pub lose_rounds: f64,
    /// showdown share of wins
    pub win_rounds_shown: f64,
    /// stack in small blinds
    pub stack: i64,
    /// chips paid into the last lost showdown, in small blinds
    pub hand_paid: i64,
    pub hand_strength: usize,
    pub hand_hole_pairs: u16,
    pub hand_hole_high: u16,
    pub actions: [ActionSlot; 3],
    /// share of rounds reaching flop/turn/river while live
    pub streets_seen: [f64; 3],
    /// chips paid this round, in small blinds
    pub paid: i64,
    pub stack_rel_top: f64,
    pub stack_rel_start: f64,
    pub stack_rel_total: f64,
}

impl PlayerSlot {
    fn columns(slot: usize) -> Vec<String> {
        let p = |name: &str| format!("player_{}_{}", slot, name);
        let mut cols = vec![
            p("dealer"),
            p("small_blind"),
            p("big_blind"),
            p("win_rounds"),
            p("lose_rounds"),
            p("win_rounds_shown"),
            p("stack"),
            p("hand_paid"),
            p("hand_strength"),
            p("hand_hole_pairs"),
            p("hand_hole_high"),
        ];
        for action in &ACTIONS {
            cols.push(p(&format!("{}_rounds", action)));
            cols.push(p(&format!("{}_in_round", action)));
            cols.push(p(&format!("{}_in_street", action)));
            for street in &STREETS {
                cols.push(p(&format!("{}_in_{}", action, street)));
                cols.push(p(&format!("{}_{}_rounds", action, street)));
            }
        }
        for street in &STREETS[1..] {
            cols.push(p(&format!("{}_rounds", street)));
        }
        cols.push(p("paid"));
        cols.push(p("stack_rel_top"));
        cols.push(p("stack_rel_start"));
        cols.push(p("stack_rel_total"));
        cols
    }

    fn values(&self) -> Vec<f64> {
        let mut vals = vec![
            self.dealer as u8 as f64,
            self.small_blind as u8 as f64,
            self.big_blind as u8 as f64,
            self.win_rounds,
            self.lose_rounds,
            self.win_rounds_shown,
            self.stack as f64,
            self.hand_paid as f64,
            self.hand_strength as f64,
            f64::from(self.hand_hole_pairs),
            f64::from(self.hand_hole_high),
        ];
        for action in &self.actions {
            vals.push(action.rounds);
            vals.push(f64::from(action.in_round));
            vals.push(f64::from(action.in_street));
            for s in 0..STREETS.len() {
                vals.push(f64::from(action.in_streets[s]));
                vals.push(action.street_rounds[s]);
            }
        }
        for seen in &self.streets_seen {
            vals.push(*seen);
        }
        vals.push(self.paid as f64);
        vals.push(self.stack_rel_top);
        vals.push(self.stack_rel_start);
        vals.push(self.stack_rel_total);
        if self.active {
            vals
        } else {
            vec![-1.0; vals.len()]
        }
    }
}

/// One fixed-width feature row ready for model consumption
#[derive(Debug, Clone)]
pub struct CleanedRow {
    pub round_count: u32,
    pub street: usize,
    /// money columns are in small-blind units
    pub pot: i64,
    pub call_amount: i64,
    pub raise_amount_min: i64,
    pub raise_amount_max: i64,
    pub preflop_odds: f64,
    pub card_hand_high: u16,
    pub card_hand_strength: usize,
    pub card_community_high: u16,
    pub card_community_strength: usize,
    pub hole: CardCounts,
    pub board: CardCounts,
    pub card_equity: f64,
    pub street_equity: [f64; 3],
    pub players_in_game: u32,
    pub players_in_round: u32,
    pub players: Vec<PlayerSlot>,
}

impl CleanedRow {
    /// CSV header of the feature matrix
    pub fn columns() -> Vec<String> {
        let mut cols: Vec<String> = [
            "round_count",
            "street",
            "pot",
            "call_amount",
            "raise_amount_min",
            "raise_amount_max",
            "preflop_odds",
            "card_hand_high",
            "card_hand_strength",
            "card_community_high",
            "card_community_strength",
            "card_hole_max_rank",
            "card_hole_num2",
            "card_hole_num2_max_rank",
            "card_hole_suit_c",
            "card_hole_suit_d",
            "card_hole_suit_h",
            "card_hole_suit_s",
            "card_community_max_rank",
            "card_community_num2",
            "card_community_num2_max_rank",
            "card_community_num3",
            "card_community_num3_max_rank",
            "card_community_num4",
            "card_community_num4_max_rank",
            "card_community_suit_c",
            "card_community_suit_d",
            "card_community_suit_h",
            "card_community_suit_s",
            "card_equity",
            "flop_equity",
            "turn_equity",
            "river_equity",
            "players_in_game",
            "players_in_round",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        for slot in 0..MAX_PLAYERS {
            cols.extend(PlayerSlot::columns(slot));
        }
        cols
    }

    /// Values in `columns` order
    pub fn values(&self) -> Vec<f64> {
        let mut vals = vec![
            f64::from(self.round_count),
            self.street as f64,
            self.pot as f64,
            self.call_amount as f64,
            self.raise_amount_min as f64,
            self.raise_amount_max as f64,
            self.preflop_odds,
            f64::from(self.card_hand_high),
            self.card_hand_strength as f64,
            f64::from(self.card_community_high),
            self.card_community_strength as f64,
            f64::from(self.hole.max_rank),
            f64::from(self.hole.pairs),
            f64::from(self.hole.pair_max_rank),
            f64::from(self.hole.suits[0]),
            f64::from(self.hole.suits[1]),
            f64::from(self.hole.suits[2]),
            f64::from(self.hole.suits[3]),
            f64::from(self.board.max_rank),
            f64::from(self.board.pairs),
            f64::from(self.board.pair_max_rank),
            f64::from(self.board.trips),
            f64::from(self.board.trips_max_rank),
            f64::from(self.board.quads),
            f64::from(self.board.quads_max_rank),
            f64::from(self.board.suits[0]),
            f64::from(self.board.suits[1]),
            f64::from(self.board.suits[2]),
            f64::from(self.board.suits[3]),
            self.card_equity,
            self.street_equity[0],
            self.street_equity[1],
            self.street_equity[2],
            f64::from(self.players_in_game),
            f64::from(self.players_in_round),
        ];
        for slot in &self.players {
            vals.extend(slot.values());
        }
        vals
    }
}

/// Ground-truth label row matching one cleaned feature row
#[derive(Debug, Clone)]
pub struct PrivateRow {
    pub game_num: i64,
    pub game_win: bool,
    /// small-blind units
    pub game_end_stack: i64,
    pub bot_name: String,
    pub bot_top: bool,
    pub round_end: bool,
    pub round_end_stack: i64,
    pub round_end_stack_diff: i64,
    pub community: String,
    pub hole: String,
    pub opponent_holes: String,
    pub action: Action,
    pub amount: i64,
    /// 1 if the hole would win the round in hindsight, else -1
    pub best_hand: i64,
}

impl PrivateRow {
    /// CSV header of the label matrix
    pub fn columns() -> Vec<String> {
        [
            "game_num",
            "game_win",
            "game_end_stack",
            "bot_name",
            "bot_top",
            "round_end",
            "round_end_stack",
            "round_end_stack_diff",
            "community",
            "hole",
            "opponent_holes",
            "action",
            "amount",
            "best_hand",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// Values in `columns` order
    pub fn values(&self) -> Vec<String> {
        vec![
            self.game_num.to_string(),
            u8::from(self.game_win).to_string(),
            self.game_end_stack.to_string(),
            self.bot_name.clone(),
            u8::from(self.bot_top).to_string(),
            u8::from(self.round_end).to_string(),
            self.round_end_stack.to_string(),
            self.round_end_stack_diff.to_string(),
            self.community.clone(),
            self.hole.clone(),
            self.opponent_holes.clone(),
            self.action.to_string(),
            self.amount.to_string(),
            self.best_hand.to_string(),
        ]
    }
}

/// Normalizes raw feature records into fixed-width rows
#[derive(Debug)]
pub struct FeatureCleaner {
    odds: Arc<PreflopOddsTable>,
}

impl FeatureCleaner {
    pub fn new(odds: Arc<PreflopOddsTable>) -> Self {
        FeatureCleaner { odds }
    }

    /// Cleans one record; the label row is present when the record
    /// carries ground truth
    pub fn clean(&self, record: &FeatureRecord) -> (CleanedRow, Option<PrivateRow>) {
        let ctx = &record.ctx;
        let small_blind = ctx.small_blind.max(1);
        let round_count = ctx.round_count.max(1);

        let players_in_game = record.players.iter().filter(|p| p.start_stack > 0).count() as u32;
        let players_in_round = record
            .players
            .iter()
            .filter(|p| p.state == SeatState::Participating)
            .count() as u32;
        let max_stack = record
            .players
            .iter()
            .map(|p| p.stack)
            .max()
            .unwrap_or(0)
            .max(1);

        let preflop_odds = if ctx.preflop_odds == 0.0 && ctx.hole.len() == 2 {
            let label = card::preflop_label(ctx.hole[0], ctx.hole[1]);
            let opponents = (players_in_game.saturating_sub(1) as usize).min(2);
            round1(self.odds.lookup(&label, opponents))
        } else {
            ctx.preflop_odds
        };

        // slot order: the observer first, then live players nearer the
        // observer's left, then the rest, higher seats first
        let mut order: Vec<&PlayerFeatureState> = record.players.iter().collect();
        order.sort_by_key(|p| {
            std::cmp::Reverse((
                p.is_me,
                p.state == SeatState::Participating,
                p.seat < record.observer_seat,
                p.seat,
            ))
        });

        let mut slots = Vec::with_capacity(MAX_PLAYERS);
        for player in order.iter().take(MAX_PLAYERS) {
            slots.push(self.player_slot(player, record, round_count, max_stack, small_blind));
        }
        while slots.len() < MAX_PLAYERS {
            slots.push(PlayerSlot::default());
        }

        let row = CleanedRow {
            round_count: ctx.round_count,
            street: usize::from(ctx.street),
            pot: sb_units(i64::from(ctx.pot), small_blind),
            call_amount: sb_units(i64::from(ctx.valid.call_amount), small_blind),
            raise_amount_min: sb_units(ctx.valid.raise_min, small_blind),
            raise_amount_max: sb_units(ctx.valid.raise_max, small_blind),
            preflop_odds,
            card_hand_high: ctx.cards.hand.high,
            card_hand_strength: ctx.cards.hand.strength.index(),
            card_community_high: ctx.cards.community.high,
            card_community_strength: ctx.cards.community.strength.index(),
            hole: ctx.cards.hole,
            board: ctx.cards.board,
            card_equity: ctx.cards.equity,
            street_equity: ctx.street_equity,
            players_in_game,
            players_in_round,
            players: slots,
        };

        let private = record.private.as_ref().map(|p| {
            let my_score = card::score_hand(&p.community, &p.hole);
            let op_score = p
                .opponent_holes
                .iter()
                .map(|h| card::score_hand(&p.community, h))
                .max()
                .unwrap_or(0);
            PrivateRow {
                game_num: p.game_num,
                game_win: p.game_win,
                game_end_stack: sb_units(i64::from(p.game_end_stack), small_blind),
                bot_name: p.bot_name.clone(),
                bot_top: p.bot_top,
                round_end: p.round_end,
                round_end_stack: sb_units(i64::from(p.round_end_stack), small_blind),
                round_end_stack_diff: sb_units(p.round_end_stack_diff, small_blind),
                community: card::cards_to_str(&p.community),
                hole: card::cards_to_str(&p.hole),
                opponent_holes: p
                    .opponent_holes
                    .iter()
                    .map(|h| card::cards_to_str(h))
                    .collect::<Vec<_>>()
                    .join(" "),
                action: p.action,
                amount: sb_units(i64::from(p.amount), small_blind),
                best_hand: if my_score >= op_score { 1 } else { -1 },
            }
        });

        (row, private)
    }

    /// Cleans a batch, pairing each feature row with its label row
    pub fn clean_all(&self, records: &[FeatureRecord]) -> (Vec<CleanedRow>, Vec<PrivateRow>) {
        let mut rows = Vec::with_capacity(records.len());
        let mut privates = Vec::new();
        for record in records {
            let (row, private) = self.clean(record);
            rows.push(row);
            if let Some(private) = private {
                privates.push(private);
            }
        }
        (rows, privates)
    }

    fn player_slot(
        &self,
        player: &PlayerFeatureState,
        record: &FeatureRecord,
        round_count: u32,
        max_stack: u32,
        small_blind: u32,
    ) -> PlayerSlot {
        let ctx = &record.ctx;
        let rounds = f64::from(round_count);
        let mut actions: [ActionSlot; 3] = Default::default();
        for kind in &ACTIONS {
            let raw = &player.actions[kind.index()];
            let slot = &mut actions[kind.index()];
            slot.rounds = round1(f64::from(raw.rounds) / rounds);
            slot.in_round = raw.in_round;
            slot.in_street = raw.in_street;
            slot.in_streets = raw.in_streets;
            for s in 0..STREETS.len() {
                let street_activity = f64::from(player.street_actions[s] + 1);
                slot.street_rounds[s] = round1(f64::from(raw.street_rounds[s]) / street_activity);
            }
        }
        let mut streets_seen = [0.0; 3];
        for (s, seen) in player.streets_seen.iter().enumerate() {
            streets_seen[s] = round1(f64::from(*seen) / rounds);
        }
        PlayerSlot {
            active: player.state == SeatState::Participating,
            dealer: player.dealer,
            small_blind: player.small_blind,
            big_blind: player.big_blind,
            win_rounds: round1(f64::from(player.win_rounds) / rounds),
            lose_rounds: round1(f64::from(player.lose_rounds) / rounds),
            // ratio against raw wins, computed before the rescale above
            win_rounds_shown: round1(
                f64::from(player.win_rounds_shown) / f64::from(player.win_rounds + 1),
            ),
            stack: sb_units(i64::from(player.stack), small_blind),
            hand_paid: sb_units(i64::from(player.hand_paid), small_blind),
            hand_strength: player.hand_strength.index(),
            hand_hole_pairs: player.hand_hole_pairs,
            hand_hole_high: player.hand_hole_high,
            actions,
            streets_seen,
            paid: sb_units(
                i64::from(player.start_stack) - i64::from(player.stack),
                small_blind,
            ),
            stack_rel_top: round1(f64::from(player.stack) / f64::from(max_stack)),
            stack_rel_start: round1(f64::from(player.stack) / f64::from(ctx.initial_stack.max(1))),
            stack_rel_total: round1(f64::from(player.stack) / f64::from(ctx.total_stack.max(1))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::cards_from_labels;
    use crate::equity::HandEquityCache;
    use crate::features::{FeatureAccumulator, PrivateInfo, SeatSnapshot, StreetView};
    use crate::record::{GameRule, GameSeat, ValidActions};

    fn cleaner() -> FeatureCleaner {
        let table = "hand\t1\t2\t3\t4\t5\t6\t7\t8\t9\n\
            AA\t85.3\t73.4\t63.9\t55.9\t49.2\t43.6\t38.8\t34.7\t31.1\n";
        FeatureCleaner::new(Arc::new(
            PreflopOddsTable::from_reader(table.as_bytes()).unwrap(),
        ))
    }

    fn seat(uuid: &str) -> GameSeat {
        GameSeat {
            uuid: uuid.to_string(),
            name: uuid.to_string(),
            stack: 1000,
            top_player: false,
        }
    }

    fn snapshot(uuid: &str, stack: u32, state: SeatState) -> SeatSnapshot {
        SeatSnapshot {
            uuid: uuid.to_string(),
            stack,
            state,
        }
    }

    fn accumulator() -> FeatureAccumulator {
        let rule = GameRule {
            small_blind_amount: 10,
            initial_stack: 1000,
        };
        let mut acc = FeatureAccumulator::new("p1", Arc::new(HandEquityCache::new()));
        acc.on_game_start(&rule, &[seat("p1"), seat("p2"), seat("p3")]);
        let hole = cards_from_labels(&["SA".to_string(), "HA".to_string()]).unwrap();
        let snaps = vec![
            snapshot("p1", 1000, SeatState::Participating),
            snapshot("p2", 980, SeatState::Participating),
            snapshot("p3", 1020, SeatState::Folded),
        ];
        acc.on_round_start(1, &hole, &snaps).unwrap();
        acc.on_street_start(
            Street::Preflop,
            &StreetView {
                dealer_btn: 0,
                small_blind_pos: 1,
                big_blind_pos: 2,
                community: &[],
            },
        );
        acc.on_declare_action(
            30,
            &ValidActions {
                call_amount: 20,
                raise_min: 40,
                raise_max: 990,
            },
            &snaps,
        )
        .unwrap();
        acc
    }

    #[test]
    fn test_row_width_matches_header() {
        let (row, _) = cleaner().clean(&accumulator().snapshot(None));
        assert_eq!(row.values().len(), CleanedRow::columns().len());
    }

    #[test]
    fn test_money_in_small_blind_units() {
        let (row, _) = cleaner().clean(&accumulator().snapshot(None));
        assert_eq!(row.pot, 3);
        assert_eq!(row.call_amount, 2);
        assert_eq!(row.raise_amount_min, 4);
        assert_eq!(row.raise_amount_max, 99);
    }

    #[test]
    fn test_slot_order_and_sentinels() {
        let (row, _) = cleaner().clean(&accumulator().snapshot(None));
        assert_eq!(row.players.len(), MAX_PLAYERS);
        // observer first, live opponent second, folded player third
        assert!(row.players[0].active);
        assert_eq!(row.players[0].stack, 100);
        assert!(row.players[1].active);
        assert_eq!(row.players[1].stack, 98);
        assert!(!row.players[2].active);
        // inactive and padding slots emit -1 everywhere
        for slot in &row.players[2..] {
            assert!(slot.values().iter().all(|v| *v == -1.0));
        }
    }

    #[test]
    fn test_nine_seat_table_truncates_to_six_slots() {
        let rule = GameRule {
            small_blind_amount: 10,
            initial_stack: 1000,
        };
        let seats: Vec<GameSeat> = (1..=9).map(|i| seat(&format!("p{}", i))).collect();
        let mut acc = FeatureAccumulator::new("p4", Arc::new(HandEquityCache::new()));
        acc.on_game_start(&rule, &seats);
        let hole = cards_from_labels(&["SA".to_string(), "HA".to_string()]).unwrap();
        let snaps: Vec<SeatSnapshot> = (1..=9)
            .map(|i| {
                let stack = if i == 4 { 900 } else { 1000 };
                snapshot(&format!("p{}", i), stack, SeatState::Participating)
            })
            .collect();
        acc.on_round_start(1, &hole, &snaps).unwrap();
        acc.on_street_start(
            Street::Preflop,
            &StreetView {
                dealer_btn: 0,
                small_blind_pos: 1,
                big_blind_pos: 2,
                community: &[],
            },
        );
        acc.on_declare_action(
            30,
            &ValidActions {
                call_amount: 20,
                raise_min: 40,
                raise_max: 880,
            },
            &snaps,
        )
        .unwrap();

        let (row, _) = cleaner().clean(&acc.snapshot(None));
        // nine live seats still produce exactly six slot groups
        assert_eq!(row.players.len(), MAX_PLAYERS);
        assert_eq!(row.values().len(), CleanedRow::columns().len());
        assert_eq!(row.players_in_game, 9);
        assert_eq!(row.players_in_round, 9);
        // the observer keeps the first slot, here told apart by its
        // shorter stack
        assert!(row.players[0].active);
        assert_eq!(row.players[0].stack, 90);
        for slot in &row.players {
            assert!(slot.active);
        }
    }

    #[test]
    fn test_stack_ratios_use_raw_chips() {
        let (row, _) = cleaner().clean(&accumulator().snapshot(None));
        // 1000 vs top stack 1020 rounds to 1.0
        assert_eq!(row.players[0].stack_rel_top, 1.0);
        assert_eq!(row.players[0].stack_rel_start, 1.0);
        assert_eq!(row.players[0].stack_rel_total, 0.3);
        assert_eq!(row.players[1].stack_rel_total, 0.3);
    }

    #[test]
    fn test_preflop_odds_filled_lazily() {
        let (row, _) = cleaner().clean(&accumulator().snapshot(None));
        // pocket aces against min(2, 3 - 1) = 2 opponents
        assert_eq!(row.preflop_odds, 73.4);
        assert_eq!(row.players_in_game, 3);
        assert_eq!(row.players_in_round, 2);
    }

    #[test]
    fn test_clean_is_deterministic() {
        let record = accumulator().snapshot(None);
        let cleaner = cleaner();
        let (a, _) = cleaner.clean(&record);
        let (b, _) = cleaner.clean(&record);
        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn test_private_row_hindsight_winner() {
        let mut private = PrivateInfo::default();
        private.game_num = 7;
        private.game_win = true;
        private.bot_name = "p1".to_string();
        private.hole = cards_from_labels(&["SA".to_string(), "HA".to_string()]).unwrap();
        private.opponent_holes = vec![
            cards_from_labels(&["S2".to_string(), "H7".to_string()]).unwrap(),
        ];
        private.community =
            cards_from_labels(&["C3".to_string(), "D9".to_string(), "HJ".to_string(), "SK".to_string(), "C6".to_string()])
                .unwrap();
        private.action = Action::Raise;
        private.amount = 40;
        let (_, label) = cleaner().clean(&accumulator().snapshot(Some(private)));
        let label = label.unwrap();
        assert_eq!(label.best_hand, 1);
        assert_eq!(label.amount, 4);
        assert_eq!(label.game_num, 7);
        assert_eq!(label.values().len(), PrivateRow::columns().len());
    }

    #[test]
    fn test_no_private_no_label() {
        let (_, label) = cleaner().clean(&accumulator().snapshot(None));
        assert!(label.is_none());
    }
}
