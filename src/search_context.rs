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

use crate::board::cycledetection;
use crate::board::{Board, SidedHash};
use crate::moves::{Move, NO_MOVE};

pub const MAX_PLY: usize = 128;

/// Per-ply metadata maintained alongside the recursion
#[derive(Clone, Copy)]
pub struct StackEntry {
    pub hash: u64,
    pub sided_hash: SidedHash,
    pub eval: i32,
    pub played: Move,
    pub killer: Move,
    pub excluded: Move,
    pub in_check: bool,
}

impl Default for StackEntry {
    fn default() -> Self {
        StackEntry {
            hash: 0,
            sided_hash: SidedHash::default(),
            eval: 0,
            played: NO_MOVE,
            killer: NO_MOVE,
            excluded: NO_MOVE,
            in_check: false,
        }
    }
}

#[derive(Clone, Copy, Default)]
struct GameHistoryEntry {
    hash: u64,
    sided_hash: SidedHash,
    repeated: bool,
}

/// Hashes of the game positions leading up to the search root
#[derive(Clone, Default)]
pub struct GameHistory {
    entries: Vec<GameHistoryEntry>,
}

impl GameHistory {
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn push(&mut self, board: &Board) {
        self.entries.push(GameHistoryEntry { hash: board.hash(), sided_hash: board.sided_hash(), repeated: false });
    }

    /// Flags pre-root positions that already occurred twice; a single further
    /// occurrence inside the search then completes a threefold repetition.
    pub fn mark_repetitions(&mut self, halfmove_clock: u16) {
        let window = (halfmove_clock as usize).min(self.entries.len());
        let start = self.entries.len() - window;

        for i in start..self.entries.len() {
            let hash = self.entries[i].hash;
            self.entries[i].repeated = self.entries[start..i].iter().any(|e| e.hash == hash);
        }
    }
}

pub struct SearchStack {
    entries: Vec<StackEntry>,
    history: GameHistory,
}

impl Default for SearchStack {
    fn default() -> Self {
        SearchStack { entries: vec![StackEntry::default(); MAX_PLY + 2], history: GameHistory::default() }
    }
}

impl SearchStack {
    pub fn set_game_history(&mut self, mut history: GameHistory, halfmove_clock: u16) {
        history.mark_repetitions(halfmove_clock);
        self.history = history;
    }

    pub fn clear_for_search(&mut self) {
        self.entries.fill(StackEntry::default());
    }

    #[inline(always)]
    pub fn entry(&self, ply: usize) -> &StackEntry {
        &self.entries[ply]
    }

    #[inline(always)]
    pub fn entry_mut(&mut self, ply: usize) -> &mut StackEntry {
        &mut self.entries[ply]
    }

    /// Static eval trend: better than two plies ago (and not in check now)
    pub fn improving(&self, ply: usize) -> bool {
        if ply < 2 || self.entries[ply].in_check {
            return false;
        }
        self.entries[ply].eval > self.entries[ply - 2].eval
    }

    /// Null-move pruning is unsound directly after another null move
    pub fn nmp_valid(&self, ply: usize) -> bool {
        ply >= 1 && !self.entries[ply - 1].played.is_null()
    }

    // Predecessor hashes: the last `ply` entries of the stack, preceded by the
    // game history.
    fn predecessor(&self, ply: usize, back: usize) -> Option<(u64, SidedHash, bool, bool)> {
        debug_assert!(back >= 1);
        if back <= ply {
            let entry = &self.entries[ply - back];
            Some((entry.hash, entry.sided_hash, true, false))
        } else {
            let history_back = back - ply;
            if history_back > self.history.entries.len() {
                return None;
            }
            let entry = &self.history.entries[self.history.entries.len() - history_back];
            Some((entry.hash, entry.sided_hash, false, entry.repeated))
        }
    }

    /// Draw by repetition: one recurrence inside the search tree, or a
    /// recurrence of a position that was already repeated in the game.
    pub fn is_repetition_draw(&self, board: &Board, ply: usize) -> bool {
        let hash = board.hash();

        let mut back = 2;
        while back <= board.halfmove_clock as usize {
            match self.predecessor(ply, back) {
                Some((prev_hash, _, after_root, repeated)) => {
                    if prev_hash == hash && (after_root || repeated) {
                        return true;
                    }
                }
                None => break,
            }
            back += 2;
        }

        false
    }

    /// True when the side to move can force a repetition with its next move
    /// (detected via the cuckoo table of reversible move deltas).
    pub fn upcoming_cycle_exists(&self, board: &Board, ply: usize) -> bool {
        let us = board.active_player();
        let sided = board.sided_hash();
        let us_hash = sided.us(us);
        let them_hash = sided.them(us);

        let limit = (board.halfmove_clock as usize).min(self.history.entries.len() + ply);

        let mut back = 3;
        while back <= limit {
            if let Some((_, prev_sided, _, _)) = self.predecessor(ply, back) {
                let delta = us_hash ^ prev_sided.us(us);
                if delta != 0
                    && them_hash == prev_sided.them(us)
                    && cycledetection::has_cycle_move(delta, board.side(us), board.occupancy())
                {
                    return true;
                }
            }
            back += 2;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::parse_fen;
    use crate::move_gen::GenMode;
    use crate::uci_move::UCIMove;

    fn play(board: &Board, uci: &str) -> Board {
        let mv = UCIMove::from_uci(uci).unwrap().to_move(board).unwrap();
        board.forward(mv)
    }

    #[test]
    fn detects_search_tree_repetition() {
        cycledetection::init();

        let mut stack = SearchStack::default();
        let mut board = parse_fen("4k3/8/8/8/8/8/8/4K2R w - - 0 1").unwrap();

        // record the walk Rh2 Kd8 Rh1 Ke8 back to the start position
        let walk = ["h1h2", "e8d8", "h2h1", "d8e8"];
        for (ply, uci) in walk.iter().enumerate() {
            stack.entry_mut(ply).hash = board.hash();
            stack.entry_mut(ply).sided_hash = board.sided_hash();
            board = play(&board, uci);
        }

        assert!(stack.is_repetition_draw(&board, walk.len()));
    }

    #[test]
    fn upcoming_cycle_detected_one_move_early() {
        cycledetection::init();

        let mut stack = SearchStack::default();
        let mut board = parse_fen("4k3/8/8/8/8/8/8/4K2R w - - 0 1").unwrap();

        // after Rh2 Kd8 Rh1, the black king can step back to e8 and repeat
        let walk = ["h1h2", "e8d8", "h2h1"];
        for (ply, uci) in walk.iter().enumerate() {
            stack.entry_mut(ply).hash = board.hash();
            stack.entry_mut(ply).sided_hash = board.sided_hash();
            board = play(&board, uci);
        }

        assert!(stack.upcoming_cycle_exists(&board, walk.len()));
    }

    #[test]
    fn no_cycle_from_start_position() {
        cycledetection::init();

        let stack = SearchStack::default();
        let board = parse_fen(crate::fen::START_POS).unwrap();
        assert!(!stack.upcoming_cycle_exists(&board, 0));
        assert!(!stack.is_repetition_draw(&board, 0));
    }

    #[test]
    fn pre_root_repetition_requires_prior_repeat() {
        cycledetection::init();

        let base = parse_fen("4k3/8/8/8/8/8/8/4K2R w - - 4 3").unwrap();

        // Game history contains the position once: a single in-search
        // recurrence is not yet a draw.
        let mut history = GameHistory::default();
        let mut board = base;
        history.push(&board);
        for uci in ["h1h2", "e8d8", "h2h1", "d8e8"] {
            board = play(&board, uci);
            if board.hash() != base.hash() {
                history.push(&board);
            }
        }
        // `board` equals `base` again here

        let mut stack = SearchStack::default();
        stack.set_game_history(history.clone(), board.halfmove_clock);
        assert!(!stack.is_repetition_draw(&board, 0));

        // after it occurred twice in the game, the next recurrence is a draw
        history.push(&board);
        for uci in ["h1h2", "e8d8", "h2h1", "d8e8"] {
            board = play(&board, uci);
            if board.hash() != base.hash() {
                history.push(&board);
            }
        }
        let mut stack = SearchStack::default();
        stack.set_game_history(history, board.halfmove_clock);
        assert!(stack.is_repetition_draw(&board, 0));
    }

    #[test]
    fn improving_tracks_eval_trend() {
        let mut stack = SearchStack::default();
        stack.entry_mut(0).eval = 10;
        stack.entry_mut(2).eval = 50;
        assert!(stack.improving(2));

        stack.entry_mut(2).in_check = true;
        assert!(!stack.improving(2));
        assert!(!stack.improving(0));
    }

    #[test]
    fn nmp_blocked_after_null_move() {
        let mut stack = SearchStack::default();
        stack.entry_mut(3).played = NO_MOVE;
        assert!(!stack.nmp_valid(4));
        assert!(!stack.nmp_valid(0));

        stack.entry_mut(3).played = parse_fen(crate::fen::START_POS)
            .unwrap()
            .generate_moves(GenMode::All)
            .as_slice()[0];
        assert!(stack.nmp_valid(4));
    }
}
