/*
 * Fulminate Atomic Chess Engine
 * Copyright (C) 2025 Fulminate developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */
use crate::colors::Color;
use crate::eval::FeatureHash;
use crate::moves::{Move, NO_MOVE};
use crate::transposition_table::Bound;

pub const CORR_HISTORY_SIZE: usize = 16384;

const MOVE_INDEX_SIZE: usize = 512;

/// Quiet-move ordering heuristics (counter moves, counter/follow-up history)
/// plus the static-eval correction histories. Shared between worker threads
/// without synchronisation; lost updates are acceptable.
#[derive(Clone)]
pub struct HistoryHeuristics {
    counters: Vec<Move>,
    history: Box<HistoryTable>,
    pawn_corr_history: Box<[[CorrHistoryValue; CORR_HISTORY_SIZE]; 2]>,
    eval_corr_history: Box<[[CorrHistoryValue; CORR_HISTORY_SIZE]; 2]>,
}

impl Default for HistoryHeuristics {
    fn default() -> Self {
        Self {
            counters: vec![NO_MOVE; MOVE_INDEX_SIZE],
            history: Default::default(),
            pawn_corr_history: Box::new([[CorrHistoryValue(0); CORR_HISTORY_SIZE]; 2]),
            eval_corr_history: Box::new([[CorrHistoryValue(0); CORR_HISTORY_SIZE]; 2]),
        }
    }
}

impl HistoryHeuristics {
    pub fn clear(&mut self) {
        self.counters.fill(NO_MOVE);
        self.history.clear();
        self.pawn_corr_history.iter_mut().for_each(|e| e.fill(CorrHistoryValue(0)));
        self.eval_corr_history.iter_mut().for_each(|e| e.fill(CorrHistoryValue(0)));
    }

    #[inline(always)]
    pub fn get_counter_move(&self, opp_move: Move) -> Move {
        if opp_move == NO_MOVE {
            return NO_MOVE;
        }
        self.counters[opp_move.piece_to_index()]
    }

    #[inline(always)]
    pub fn update_counter_move(&mut self, opp_move: Move, counter: Move) {
        if opp_move != NO_MOVE {
            self.counters[opp_move.piece_to_index()] = counter;
        }
    }

    /// Rewards the move that caused a beta cutoff and punishes the quiet
    /// moves that were tried before it.
    pub fn update(&mut self, active_player: Color, opp_move: Move, own_prev: Move, best_move: Move, tried: &[Move], depth: i32) {
        let bonus = (2 + depth / 4).min(6) as i8;
        self.history.update(active_player, opp_move, own_prev, best_move, bonus);
        self.update_counter_move(opp_move, best_move);

        for &mv in tried {
            if mv != best_move && mv.is_quiet() {
                self.history.update(active_player, opp_move, own_prev, mv, -1);
            }
        }
    }

    #[inline(always)]
    pub fn score(&self, active_player: Color, opp_move: Move, own_prev: Move, mv: Move) -> i16 {
        self.history.counter_score(active_player, opp_move, mv) + self.history.follow_up_score(active_player, own_prev, mv)
    }

    #[inline(always)]
    pub fn update_corr_histories(
        &mut self, active_player: Color, depth: i32, feature_hash: FeatureHash, bound: Bound, score_diff: i32,
    ) {
        // one-sided bounds only confirm errors in their own direction
        if (bound == Bound::Lower && score_diff < 0) || (bound == Bound::Upper && score_diff > 0) {
            return;
        }

        let diff = score_diff.clamp(-256, 256) as i16;
        self.pawn_corr_history[active_player.idx()][feature_hash.pawn as usize & (CORR_HISTORY_SIZE - 1)]
            .update(diff, depth);
        self.eval_corr_history[active_player.idx()][feature_hash.eval as usize & (CORR_HISTORY_SIZE - 1)]
            .update(diff, depth);
    }

    #[inline(always)]
    pub fn corr_eval(&self, active_player: Color, feature_hash: FeatureHash) -> i32 {
        let pawn_corr =
            self.pawn_corr_history[active_player.idx()][feature_hash.pawn as usize & (CORR_HISTORY_SIZE - 1)].score();
        let eval_corr =
            self.eval_corr_history[active_player.idx()][feature_hash.eval as usize & (CORR_HISTORY_SIZE - 1)].score();

        i32::from(pawn_corr + eval_corr).clamp(-384, 384)
    }
}

#[derive(Default, Clone, Copy)]
struct HistoryValue(i8);

impl HistoryValue {
    #[inline(always)]
    fn update(&mut self, scale: i8) {
        self.0 = self.0.saturating_add(scale * 4 - self.0 / 32);
    }

    #[inline(always)]
    fn score(&self) -> i16 {
        self.0 as i16
    }
}

const CORR_HISTORY_GRAIN: i32 = 256;
const CORR_HISTORY_MAX: i32 = 64 * CORR_HISTORY_GRAIN;
const CORR_HISTORY_MAX_WEIGHT: i32 = 128;

#[derive(Default, Clone, Copy)]
struct CorrHistoryValue(i16);

impl CorrHistoryValue {
    #[inline(always)]
    fn update(&mut self, diff: i16, depth: i32) {
        let weight = depth.min(CORR_HISTORY_MAX_WEIGHT - 1);
        let weighted_diff = diff as i32 * weight * CORR_HISTORY_GRAIN;
        self.0 = (((CORR_HISTORY_MAX_WEIGHT - weight) * self.0 as i32 + weighted_diff) / CORR_HISTORY_MAX_WEIGHT)
            .clamp(-CORR_HISTORY_MAX, CORR_HISTORY_MAX) as i16;
    }

    #[inline(always)]
    fn score(&self) -> i16 {
        self.0 / CORR_HISTORY_GRAIN as i16
    }
}

// Counter-move and follow-up history, indexed by the relative move and the
// move itself (piece x target square each)
#[derive(Clone)]
struct HistoryTable(Vec<[(HistoryValue, HistoryValue); MOVE_INDEX_SIZE]>);

impl Default for HistoryTable {
    fn default() -> Self {
        HistoryTable(vec![[(HistoryValue::default(), HistoryValue::default()); MOVE_INDEX_SIZE]; MOVE_INDEX_SIZE * 2])
    }
}

impl HistoryTable {
    fn clear(&mut self) {
        self.0.fill([(HistoryValue::default(), HistoryValue::default()); MOVE_INDEX_SIZE]);
    }

    #[inline(always)]
    fn slot(active_player: Color, rel_move: Move) -> usize {
        rel_move.piece_to_index() * 2 + active_player.idx()
    }

    fn update(&mut self, active_player: Color, opp_move: Move, own_prev: Move, mv: Move, scale: i8) {
        self.0[Self::slot(active_player, opp_move)][mv.piece_to_index()].0.update(scale);
        self.0[Self::slot(active_player, own_prev)][mv.piece_to_index()].1.update(scale);
    }

    #[inline(always)]
    fn counter_score(&self, active_player: Color, opp_move: Move, mv: Move) -> i16 {
        self.0[Self::slot(active_player, opp_move)][mv.piece_to_index()].0.score()
    }

    #[inline(always)]
    fn follow_up_score(&self, active_player: Color, own_prev: Move, mv: Move) -> i16 {
        self.0[Self::slot(active_player, own_prev)][mv.piece_to_index()].1.score()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::WHITE;
    use crate::pieces::Piece;

    #[test]
    fn rewards_cutoff_move() {
        let mut hh = HistoryHeuristics::default();
        let opp = Move::new(Piece::Knight, 62, 45);
        let prev = Move::new(Piece::Pawn, 11, 19);
        let good = Move::new(Piece::Bishop, 5, 12);
        let bad = Move::new(Piece::Rook, 7, 15);

        hh.update(WHITE, opp, prev, good, &[bad, good], 6);

        assert!(hh.score(WHITE, opp, prev, good) > 0);
        assert!(hh.score(WHITE, opp, prev, bad) < 0);
    }

    #[test]
    fn counter_move_tracking() {
        let mut hh = HistoryHeuristics::default();
        let opp = Move::new(Piece::Knight, 62, 45);
        let counter = Move::new(Piece::Bishop, 5, 12);

        hh.update_counter_move(opp, counter);
        assert_eq!(counter, hh.get_counter_move(opp));
        assert_eq!(NO_MOVE, hh.get_counter_move(NO_MOVE));
    }

    #[test]
    fn corrections_track_eval_error() {
        let mut hh = HistoryHeuristics::default();
        let hash = FeatureHash { pawn: 0x1234, eval: 0x9876 };

        for _ in 0..32 {
            hh.update_corr_histories(WHITE, 8, hash, Bound::Exact, 120);
        }
        assert!(hh.corr_eval(WHITE, hash) > 0);

        // a lower bound cannot push the correction downward
        let before = hh.corr_eval(WHITE, hash);
        hh.update_corr_histories(WHITE, 8, hash, Bound::Lower, -200);
        assert_eq!(before, hh.corr_eval(WHITE, hash));
    }

    #[test]
    fn corrections_stay_clamped() {
        let mut hh = HistoryHeuristics::default();
        let hash = FeatureHash { pawn: 7, eval: 9 };
        for _ in 0..1000 {
            hh.update_corr_histories(WHITE, 16, hash, Bound::Exact, 256);
        }
        assert!(hh.corr_eval(WHITE, hash) <= 384);
    }
}
