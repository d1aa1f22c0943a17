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

use crate::board::Board;
use crate::colors::Color;
use crate::engine::{LogLevel, Message};
use crate::eval::{compose_feature_hash, eval_feature_quarter, scale_nnue_score, EvalCache, FeatureHash};
use crate::history_heuristics::HistoryHeuristics;
use crate::move_gen::{GenMode, MoveOrderer};
use crate::moves::{Move, NO_MOVE};
use crate::nn::eval::{build_updates, NnueState};
use crate::nn::network;
use crate::params;
use crate::pieces::Piece;
use crate::scores::{
    is_mate_or_mated_score, is_mated_score, loss_score, mate_in, sanitize_score, win_score, MATED_SCORE, MATE_SCORE,
    MAX_SCORE, MIN_SCORE,
};
use crate::search_context::{GameHistory, SearchStack, MAX_PLY};
use crate::syzygy::tb::TBResult;
use crate::syzygy::ProbeTB;
use crate::time_management::{SearchLimits, TimeManager};
use crate::transposition_table::{
    from_root_relative_score, to_root_relative_score, Bound, TTEntry, TranspositionTable,
};
use crate::uci_move::UCIMove;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use LogLevel::Info;

pub const DEFAULT_SEARCH_THREADS: usize = 1;
pub const MAX_SEARCH_THREADS: usize = 256;

const CANCEL_SEARCH: i32 = i32::MAX - 1;

const MAX_TRIED_MOVES: usize = 32;

#[derive(Copy, Clone)]
struct RootMove {
    mv: Move,
    score: i32,
    nodes: u64,
}

pub struct Search {
    pub board: Board,
    pub hh: HistoryHeuristics,
    pub tt: Arc<TranspositionTable>,

    stack: SearchStack,
    nnue: NnueState,
    cache: EvalCache,
    game_history: GameHistory,

    log_level: LogLevel,
    limits: SearchLimits,
    time_mgr: TimeManager,
    move_overhead_ms: i32,
    tb_probe_depth: i32,

    cancel_possible: bool,
    last_log_time: Instant,
    next_check_node_count: u64,
    current_depth: i32,
    max_reached_depth: usize,

    local_total_node_count: u64,
    local_node_count: u64,
    local_tb_hits: u64,

    node_count: Arc<AtomicU64>,
    is_stopped: Arc<AtomicBool>,
    tb_hits: Arc<AtomicU64>,

    threads: HelperThreads,
    is_helper_thread: bool,
    pondering: bool,

    root_moves: Vec<RootMove>,
}

impl Search {
    pub fn new(
        is_stopped: Arc<AtomicBool>, node_count: Arc<AtomicU64>, tb_hits: Arc<AtomicU64>, log_level: LogLevel,
        limits: SearchLimits, tt: Arc<TranspositionTable>, board: Board, is_helper_thread: bool,
    ) -> Self {
        Search {
            board,
            hh: HistoryHeuristics::default(),
            tt,
            stack: SearchStack::default(),
            nnue: NnueState::new(network()),
            cache: EvalCache::default(),
            game_history: GameHistory::default(),
            log_level,
            limits,
            time_mgr: TimeManager::new(),
            move_overhead_ms: crate::time_management::DEFAULT_MOVE_OVERHEAD_MS,
            tb_probe_depth: 0,
            cancel_possible: false,
            last_log_time: Instant::now(),
            next_check_node_count: 0,
            current_depth: 0,
            max_reached_depth: 0,
            local_total_node_count: 0,
            local_node_count: 0,
            local_tb_hits: 0,
            node_count,
            is_stopped,
            tb_hits,
            threads: HelperThreads::new(),
            is_helper_thread,
            pondering: false,
            root_moves: Vec::new(),
        }
    }

    pub fn resize_tt(&mut self, new_size_mb: i32) {
        // helper threads hold a reference to the table and must be stopped first
        let thread_count = self.threads.count();
        self.threads.resize(0, &self.node_count, &self.tb_hits, &self.tt, &self.is_stopped);

        Arc::get_mut(&mut self.tt).expect("tt still referenced during resize").resize(new_size_mb as u64);

        self.threads.resize(thread_count, &self.node_count, &self.tb_hits, &self.tt, &self.is_stopped);
    }

    pub fn reset_threads(&mut self, thread_count: i32) {
        self.threads.resize((thread_count - 1) as usize, &self.node_count, &self.tb_hits, &self.tt, &self.is_stopped);
    }

    pub fn clear_tt(&mut self) {
        self.threads.clear_tt();
        self.tt.clear(0, self.threads.count() + 1);
    }

    pub fn set_tb_probe_depth(&mut self, depth: i32) {
        self.tb_probe_depth = depth;
    }

    pub fn set_move_overhead(&mut self, overhead_ms: i32) {
        self.move_overhead_ms = overhead_ms;
    }

    pub fn move_overhead(&self) -> i32 {
        self.move_overhead_ms
    }

    pub fn reload_network(&mut self) {
        self.nnue = NnueState::new(network());
        self.cache.clear();
    }

    pub fn update(&mut self, board: &Board, game_history: GameHistory, limits: SearchLimits, ponder: bool) {
        self.board = *board;
        self.game_history = game_history;
        self.limits = limits;
        self.pondering = ponder;
    }

    pub fn update_limits(&mut self, limits: SearchLimits) {
        self.limits = limits;
    }

    fn reset_counters(&mut self) {
        self.local_total_node_count = 0;
        self.local_node_count = 0;
        self.local_tb_hits = 0;
    }

    pub fn find_best_move(&mut self, rx: Option<&Receiver<Message>>, min_depth: i32, skipped_moves: &[Move]) -> (Move, Vec<Move>) {
        self.reset_counters();
        self.time_mgr.reset(self.limits);
        self.last_log_time = Instant::now();

        self.cancel_possible = false;
        self.node_count.store(0, Ordering::Relaxed);
        self.tb_hits.store(0, Ordering::Relaxed);
        self.next_check_node_count = self.limits.node_limit().min(1024);

        self.tt.age_next_search();
        self.set_stopped(false);

        self.init_root_moves(skipped_moves);
        if self.root_moves.is_empty() {
            self.set_stopped(true);
            return (NO_MOVE, Vec::new());
        }

        self.stack.clear_for_search();
        self.stack.set_game_history(self.game_history.clone(), self.board.halfmove_clock);
        self.nnue.reset(&self.board);

        // Root tablebase probe narrows the root move list in TB-won positions
        if let Some((_, tb_moves)) = self.board.probe_root() {
            self.local_tb_hits += 1;
            if !tb_moves.is_empty() {
                self.root_moves.retain(|rm| tb_moves.contains(&rm.mv));
            }
        }

        self.threads.start_search(&self.board, &self.game_history, skipped_moves, self.tb_probe_depth);

        let mut last_best_move = NO_MOVE;
        let mut last_pv: Vec<Move> = Vec::new();
        let mut last_score = 0;

        for depth in 1..=self.limits.depth_limit() {
            self.max_reached_depth = 0;
            self.current_depth = depth;
            let iteration_start_time = Instant::now();

            let result = self.aspiration_search(rx, last_score, depth);

            let iteration_cancelled = result.is_none();
            if let Some((score, best_move, pv)) = result {
                let best_move_changed = last_best_move != NO_MOVE && best_move != last_best_move;
                self.time_mgr.update_iteration(score, best_move_changed);

                last_score = score;
                last_best_move = best_move;
                last_pv = pv;

                if self.log(Info) {
                    self.print_info(depth, score, &last_pv);
                }
            }

            if iteration_cancelled {
                break;
            }

            let now = Instant::now();
            self.cancel_possible = depth >= min_depth;
            let iteration_duration = now.duration_since(iteration_start_time);
            if !self.pondering
                && self.cancel_possible
                && !self.time_mgr.is_time_for_another_iteration(now, iteration_duration)
                && !self.time_mgr.try_extend_timelimit()
            {
                break;
            }

            if let Some(mate_distance) = mate_in(last_score) {
                if self.limits.mate_limit() > 0 && mate_distance <= self.limits.mate_limit() {
                    break;
                }
            }

            if depth == 1 && self.root_moves.len() == 1 {
                self.time_mgr.reduce_timelimit();
            }
        }

        self.flush_node_counts();

        if let Some(rx) = rx {
            while (self.limits.is_infinite() || self.pondering) && !self.is_stopped() {
                self.check_messages(rx, true);
            }
        }

        self.set_stopped(true);
        self.threads.wait_for_completion();

        (last_best_move, last_pv)
    }

    // Aspiration window loop around the root search; fail-highs shrink the
    // effective depth, every re-search widens the window exponentially.
    fn aspiration_search(&mut self, rx: Option<&Receiver<Message>>, score: i32, depth: i32) -> Option<(i32, Move, Vec<Move>)> {
        let mut alpha = if depth >= params::ASPIRATION_DEPTH { (score - params::ASPIRATION_DELTA).max(MIN_SCORE) } else { MIN_SCORE };
        let mut beta = if depth >= params::ASPIRATION_DEPTH { (score + params::ASPIRATION_DELTA).min(MAX_SCORE) } else { MAX_SCORE };

        let mut delta = params::ASPIRATION_DELTA;
        let mut consecutive_failed_high = 0;

        loop {
            let adjusted_depth = (depth - consecutive_failed_high).max(1);
            let (search_score, search_move, pv) = self.root_search(rx, alpha, beta, adjusted_depth)?;

            if search_score <= alpha {
                beta = (alpha + beta) / 2;
                alpha = (search_score - delta).max(MIN_SCORE);
                consecutive_failed_high = 0;
            } else if search_score >= beta {
                beta = (search_score + delta).min(MAX_SCORE);
                consecutive_failed_high += 1;
            } else {
                return Some((search_score, search_move, pv));
            }

            delta += delta / 3;
        }
    }

    fn init_root_moves(&mut self, skipped_moves: &[Move]) {
        self.root_moves.clear();
        for mv in self.board.generate_moves(GenMode::All) {
            if !skipped_moves.contains(&mv) {
                self.root_moves.push(RootMove { mv, score: MIN_SCORE, nodes: 0 });
            }
        }
    }

    fn root_search(
        &mut self, rx: Option<&Receiver<Message>>, mut alpha: i32, beta: i32, depth: i32,
    ) -> Option<(i32, Move, Vec<Move>)> {
        let active_player = self.board.active_player();
        let board = self.board;

        // root stack entry supplies the eval trend for `improving`
        let tt_hint = self.tt.find(board.hash()).map(|e| (to_root_relative_score(0, sanitize_score(e.score)), e.bound));
        let (_, static_value, _) = self.evaluate::<true>(&board, 0, tt_hint);
        {
            let entry = self.stack.entry_mut(0);
            entry.hash = board.hash();
            entry.sided_hash = board.sided_hash();
            entry.eval = static_value;
            entry.in_check = board.is_check() || board.in_atomic_blast_check();
        }

        let mut best_score = MIN_SCORE;
        let mut best_move = NO_MOVE;
        let mut best_pv: Vec<Move> = Vec::new();

        for i in 0..self.root_moves.len() {
            let mv = self.root_moves[i].mv;
            let nodes_before = self.local_total_node_count;

            if !self.is_helper_thread && self.log(Info) && self.local_total_node_count > 2_000_000 {
                let now = Instant::now();
                if now.duration_since(self.last_log_time).as_millis() >= 1000 {
                    self.last_log_time = now;
                    println!("info currmove {} currmovenumber {}", UCIMove::from_move(&board, mv), i + 1);
                }
            }

            // exploding the enemy king ends the game immediately
            if board.is_atomic_king_blast_capture(mv) {
                let score = win_score(1);
                self.root_moves[i].score = score;
                if score > best_score {
                    best_score = score;
                    best_move = mv;
                    best_pv = vec![mv];
                    if score > alpha {
                        alpha = score;
                    }
                }
                if best_score >= beta {
                    break;
                }
                continue;
            }

            let next = board.forward(mv);
            self.stack.entry_mut(0).played = mv;
            self.tt.prefetch(next.hash());
            let updates = build_updates(&board, &next);
            self.nnue.push_update(&updates, &next);
            self.inc_node_count();

            let mut local_pv = PrincipalVariation::default();
            let mut result;
            if i == 0 {
                result = self.pv_search::<true>(rx, &next, -beta, -alpha, depth - 1, 1, None, &mut local_pv);
            } else {
                result = self.pv_search::<false>(rx, &next, -alpha - 1, -alpha, depth - 1, 1, Some(active_player), &mut local_pv);
                if result != CANCEL_SEARCH && -result > alpha {
                    local_pv.clear();
                    result = self.pv_search::<true>(rx, &next, -beta, -alpha, depth - 1, 1, None, &mut local_pv);
                }
            }

            self.nnue.pop();

            if result == CANCEL_SEARCH {
                // the caller falls back to the last completed iteration
                return None;
            }

            let score = -result;
            self.root_moves[i].score = score;
            self.root_moves[i].nodes = self.local_total_node_count - nodes_before;

            if score > best_score {
                best_score = score;
                best_move = mv;

                best_pv = vec![mv];
                best_pv.extend(local_pv.moves());

                if score > alpha {
                    alpha = score;
                }
                if best_score >= beta {
                    break;
                }
            }
        }

        self.reorder_root_moves(best_move);
        self.flush_node_counts();

        Some((best_score, best_move, best_pv))
    }

    // The best move first, the rest ordered by subtree size
    fn reorder_root_moves(&mut self, best_move: Move) {
        self.root_moves.sort_by_key(|rm| std::cmp::Reverse((rm.mv == best_move, rm.nodes, rm.score)));
    }

    #[inline]
    fn inc_node_count(&mut self) {
        self.local_total_node_count += 1;
        self.local_node_count += 1;
    }

    fn flush_node_counts(&mut self) {
        if self.local_node_count > 0 {
            self.node_count.fetch_add(self.local_node_count, Ordering::Relaxed);
            self.local_node_count = 0;
        }
        if self.local_tb_hits > 0 {
            self.tb_hits.fetch_add(self.local_tb_hits, Ordering::Relaxed);
            self.local_tb_hits = 0;
        }
    }

    // Static evaluation with cache, correction history, and TT-bound clamping.
    // PV nodes always recompute; in check the position has no static value.
    fn evaluate<const IS_PV: bool>(
        &mut self, board: &Board, ply: usize, tt: Option<(i32, Bound)>,
    ) -> (FeatureHash, i32, i32) {
        let is_check = board.is_check() || board.in_atomic_blast_check();
        let stm = board.active_player();

        if is_check {
            let feature_hash = compose_feature_hash(board.pawn_hash(), 0);
            let eval = loss_score(ply);
            return (feature_hash, eval, eval);
        }

        let hash = board.hash();
        let (eval, eval_quarter) = match if IS_PV { None } else { self.cache.find(hash) } {
            Some((eval, quarter)) => (eval, quarter),
            None => {
                let eval = scale_nnue_score(self.nnue.evaluate(board, stm));
                let quarter = eval_feature_quarter(self.nnue.outputs(stm));
                (eval, quarter)
            }
        };

        self.cache.insert(hash, eval, eval_quarter);

        let feature_hash = compose_feature_hash(board.pawn_hash(), eval_quarter);
        let static_value = eval + self.hh.corr_eval(stm, feature_hash);

        let mut value = static_value;
        if let Some((tt_score, bound)) = tt {
            if bound == Bound::Upper && static_value > tt_score {
                value = tt_score;
            }
            if bound == Bound::Lower && static_value < tt_score {
                value = tt_score;
            }
        }

        (feature_hash, static_value, value)
    }

    // Principal variation search. `reducer` names the player whose zero-window
    // subtrees may be reduced more aggressively; a fail low there only costs a
    // re-search.
    #[allow(clippy::too_many_arguments)]
    fn pv_search<const IS_PV: bool>(
        &mut self, rx: Option<&Receiver<Message>>, board: &Board, mut alpha: i32, beta: i32, mut depth: i32,
        ply: usize, reducer: Option<Color>, pv: &mut PrincipalVariation,
    ) -> i32 {
        if depth <= 0 {
            return self.q_search::<IS_PV>(rx, board, alpha, beta, ply, 0, pv);
        }

        self.max_reached_depth = ply.max(self.max_reached_depth);
        if let Some(rx) = rx {
            self.check_search_limits(rx);
        }
        if self.is_stopped() {
            return CANCEL_SEARCH;
        }
        self.inc_node_count();
        if self.local_node_count > 1024 {
            self.flush_node_counts();
        }

        let us = board.active_player();

        // step 1: terminal positions - a missing king decides the game
        if board.side(us).king().is_empty() {
            return loss_score(ply);
        }
        if board.side(us.flip()).king().is_empty() {
            return win_score(ply);
        }

        let is_check = board.is_check();
        let atomic_check = board.in_atomic_blast_check();
        let in_check_any = is_check || atomic_check;

        // step 2: draws by repetition and the 50-move rule
        if self.stack.is_repetition_draw(board, ply) {
            return 0;
        }
        if board.is_rule50_draw() && (!in_check_any || !board.generate_moves(GenMode::All).is_empty()) {
            return 0;
        }

        if self.stack.upcoming_cycle_exists(board, ply) {
            if beta <= 0 {
                return 0;
            }
            alpha = alpha.max(0);
        }

        let excluded = self.stack.entry(ply).excluded;
        let hash = board.hash();

        // step 3: transposition table probe
        let tt_entry = if excluded == NO_MOVE { self.tt.find(hash) } else { None };
        let mut tt_move = NO_MOVE;
        let mut hash_score = 0;
        let mut hash_bound = Bound::Upper;
        let mut tt_depth = -1;
        if let Some(entry) = &tt_entry {
            tt_move = entry.best_move;
            hash_score = to_root_relative_score(ply, sanitize_score(entry.score));
            hash_bound = entry.bound;
            tt_depth = entry.depth;

            let is_cutoff = !IS_PV
                && tt_depth >= depth
                && match entry.bound {
                    Bound::Exact => true,
                    Bound::Lower => hash_score >= beta,
                    Bound::Upper => hash_score <= alpha,
                };
            if is_cutoff {
                return hash_score;
            }
        }

        let tt_pv = IS_PV || tt_entry.as_ref().is_some_and(|e| e.tt_pv);

        // step 4: tablebase probe
        if excluded == NO_MOVE && depth.max(0) >= self.tb_probe_depth {
            if let Some(tb_result) = board.probe_wdl() {
                self.local_tb_hits += 1;
                let score = match tb_result {
                    TBResult::Loss => loss_score(ply),
                    TBResult::Draw => 0,
                    TBResult::Win => win_score(ply),
                };
                return score;
            }
        }

        // step 5: internal iterative reductions
        if tt_entry.is_none() && excluded == NO_MOVE && depth >= params::IIR_DEPTH {
            depth -= 1;
        }

        // step 6: static eval and stack bookkeeping
        let tt_hint = tt_entry.as_ref().map(|e| (hash_score, e.bound));
        let (feature_hash, static_value, value) = self.evaluate::<IS_PV>(board, ply, tt_hint);

        if ply >= MAX_PLY - 4 {
            return value;
        }

        {
            let entry = self.stack.entry_mut(ply);
            entry.hash = hash;
            entry.sided_hash = board.sided_hash();
            entry.eval = static_value;
            entry.in_check = in_check_any;
        }
        let improving = !in_check_any && self.stack.improving(ply);
        let threatened = board.them_threat_mask().is_occupied();

        // step 7: razoring
        if !IS_PV
            && !in_check_any
            && excluded == NO_MOVE
            && depth <= params::RAZOR_DEPTH
            && value + params::razor_margin(depth) <= alpha
        {
            let razor_score = self.q_search::<false>(rx, board, alpha, alpha + 1, ply, 0, &mut PrincipalVariation::default());
            if razor_score == CANCEL_SEARCH {
                return CANCEL_SEARCH;
            }
            if razor_score <= alpha {
                return razor_score;
            }
        }

        // step 8: static null move pruning (reverse futility)
        if !IS_PV
            && excluded == NO_MOVE
            && !in_check_any
            && depth <= params::SNMP_DEPTH
            && !is_mate_or_mated_score(value)
            && value > beta + params::snmp_margin(improving, threatened, depth)
        {
            return (beta + value) / 2;
        }

        // step 9: null move pruning, guarded against zugzwang and threats
        let try_nmp = !IS_PV
            && excluded == NO_MOVE
            && !in_check_any
            && depth >= params::NMP_DEPTH
            && value > beta
            && self.stack.nmp_valid(ply)
            && board.has_non_pawn_material()
            && (!threatened || depth >= 4)
            && match &tt_entry {
                None => true,
                Some(entry) => {
                    entry.bound == Bound::Lower
                        && board.is_legal(entry.best_move, GenMode::All)
                        && !board.see_gt(entry.best_move, params::NMP_SEE_THRESHOLD)
                }
            };

        if try_nmp {
            self.stack.entry_mut(ply).played = NO_MOVE;
            let adjusted_depth = (depth - params::nmp_reduction(depth, beta, value)).max(0);
            let bd_null = board.forward(NO_MOVE);
            let updates = build_updates(board, &bd_null);
            self.nnue.push_update(&updates, &bd_null);
            let result = self.pv_search::<false>(
                rx,
                &bd_null,
                -beta,
                -beta + 1,
                adjusted_depth,
                ply + 1,
                Some(us.flip()),
                &mut PrincipalVariation::default(),
            );
            self.nnue.pop();
            if result == CANCEL_SEARCH {
                return CANCEL_SEARCH;
            }
            let nmp_score = -result;
            if nmp_score >= beta {
                // an unproven mate from a null search is not trustworthy
                return if is_mate_or_mated_score(nmp_score) { beta } else { nmp_score };
            }
        }

        // step 10: probcut - a good noisy move that beats beta by a margin
        let probcut_beta = params::probcut_beta(beta);
        let probcut_depth = params::probcut_search_depth(depth);
        let try_probcut = !IS_PV
            && excluded == NO_MOVE
            && depth >= params::PROBCUT_DEPTH
            && !tt_entry.as_ref().is_some_and(|e| e.best_move != NO_MOVE && e.best_move.is_quiet())
            && !tt_entry.as_ref().is_some_and(|e| e.depth >= probcut_depth && hash_score < probcut_beta);

        if try_probcut {
            let mut orderer = MoveOrderer::noisy_only(tt_move);
            while let Some(mv) = orderer.next_move(board, &self.hh, NO_MOVE, NO_MOVE) {
                if self.is_stopped() {
                    return CANCEL_SEARCH;
                }
                if mv == excluded || !board.see_ge(mv, 0) {
                    continue;
                }
                if board.is_atomic_king_blast_capture(mv) {
                    return win_score(ply);
                }

                self.stack.entry_mut(ply).played = mv;
                let next = board.forward(mv);
                self.tt.prefetch(next.hash());
                let updates = build_updates(board, &next);
                self.nnue.push_update(&updates, &next);
                self.inc_node_count();

                let q_result = self.q_search::<false>(
                    rx,
                    &next,
                    -probcut_beta,
                    -probcut_beta + 1,
                    ply + 1,
                    0,
                    &mut PrincipalVariation::default(),
                );
                let probcut_score = if q_result != CANCEL_SEARCH && -q_result >= probcut_beta {
                    let result = self.pv_search::<false>(
                        rx,
                        &next,
                        -probcut_beta,
                        -probcut_beta + 1,
                        probcut_depth,
                        ply + 1,
                        reducer,
                        &mut PrincipalVariation::default(),
                    );
                    if result == CANCEL_SEARCH {
                        self.nnue.pop();
                        return CANCEL_SEARCH;
                    }
                    -result
                } else if q_result == CANCEL_SEARCH {
                    self.nnue.pop();
                    return CANCEL_SEARCH;
                } else {
                    -q_result
                };
                self.nnue.pop();

                if probcut_score >= probcut_beta {
                    return probcut_score;
                }
            }
        }

        // step 11: the move loop
        let opp_move = if ply >= 1 { self.stack.entry(ply - 1).played } else { NO_MOVE };
        let own_prev = if ply >= 2 { self.stack.entry(ply - 2).played } else { NO_MOVE };
        let killer = self.stack.entry(ply).killer;
        let counter = self.hh.get_counter_move(opp_move);

        let mut orderer = MoveOrderer::new(tt_move, killer, counter);

        let mut tried_quiets: Vec<Move> = Vec::with_capacity(16);
        let mut best_score = loss_score(ply);
        let mut best_move = NO_MOVE;
        let original_alpha = alpha;
        let mut legal_count = 0usize;
        let mut did_double_extend = false;

        while let Some(mv) = orderer.next_move(board, &self.hh, opp_move, own_prev) {
            legal_count += 1;
            if self.is_stopped() {
                return CANCEL_SEARCH;
            }
            if mv == excluded {
                continue;
            }
            let move_index = legal_count - 1;
            let history_value = i32::from(self.hh.score(us, opp_move, own_prev, mv));

            // immediate mate override: the capture detonates the enemy king
            if board.is_atomic_king_blast_capture(mv) {
                self.stack.entry_mut(ply).played = mv;
                let score = win_score(ply);
                if score > best_score {
                    best_score = score;
                    best_move = mv;
                    if score > alpha {
                        alpha = score;
                        if IS_PV {
                            pv.update(mv, &mut PrincipalVariation::default());
                        }
                    }
                }
                if best_score >= beta {
                    break;
                }
                continue;
            }

            let next = board.forward(mv);

            // step 12: pruning ladder for late moves
            let try_pruning = move_index >= 2 && !is_mated_score(best_score);
            if try_pruning {
                let child_check_any = next.is_check() || next.in_atomic_blast_check();

                if !child_check_any && depth <= params::LMP_DEPTH && move_index > params::lmp_count(improving, depth) {
                    break;
                }

                if mv.is_quiet() && depth <= params::FUTILITY_PRUNE_DEPTH && value + params::futility_margin(depth) < alpha {
                    continue;
                }

                if mv.is_quiet()
                    && depth <= params::QUIET_SEE_PRUNE_DEPTH
                    && !board.see_ge(mv, params::quiet_see_prune_threshold(depth))
                {
                    continue;
                }

                if mv.is_noisy()
                    && depth <= params::NOISY_SEE_PRUNE_DEPTH
                    && !board.see_ge(mv, params::noisy_see_prune_threshold(depth))
                {
                    continue;
                }

                if mv.is_quiet() && history_value <= params::history_prune_threshold(depth) {
                    continue;
                }
            }

            self.tt.prefetch(next.hash());

            // step 13: singular extensions with multicut
            let mut extension = 0;
            let try_singular = excluded == NO_MOVE
                && depth >= params::SE_DEPTH
                && mv == tt_move
                && tt_entry.is_some()
                && hash_bound != Bound::Upper
                && tt_depth + params::SE_TT_DEPTH_MARGIN >= depth;

            if try_singular {
                let singular_depth = params::singular_search_depth(depth);
                let singular_beta = sanitize_score(params::singular_beta(hash_score, depth));

                self.stack.entry_mut(ply).excluded = mv;
                let result = self.pv_search::<false>(
                    rx,
                    board,
                    singular_beta - 1,
                    singular_beta,
                    singular_depth,
                    ply,
                    reducer,
                    &mut PrincipalVariation::default(),
                );
                self.stack.entry_mut(ply).excluded = NO_MOVE;

                if result == CANCEL_SEARCH {
                    return CANCEL_SEARCH;
                }

                if !IS_PV && result + params::SE_DOUBLE_EXTENSION_MARGIN < singular_beta {
                    did_double_extend = true;
                    extension = 2;
                } else if result < singular_beta {
                    extension = 1;
                } else if result >= beta {
                    // multicut: a second move also fails high
                    return beta;
                } else if !IS_PV {
                    extension = -1;
                }
            }

            self.stack.entry_mut(ply).played = mv;
            let updates = build_updates(board, &next);
            self.nnue.push_update(&updates, &next);
            self.inc_node_count();

            let next_depth = depth + extension - 1;
            let mut local_pv = PrincipalVariation::default();

            let score = 'score: {
                if IS_PV && move_index == 0 {
                    let result = self.pv_search::<IS_PV>(rx, &next, -beta, -alpha, next_depth, ply + 1, reducer, &mut local_pv);
                    if result == CANCEL_SEARCH {
                        break 'score CANCEL_SEARCH;
                    }
                    break 'score -result;
                }

                // step 14: late move reductions on the zero window
                let try_lmr = !in_check_any
                    && (mv.is_quiet() || !board.see_ge(mv, 0))
                    && move_index >= params::LMR_IDX_THRESHOLD
                    && depth >= params::LMR_DEPTH;

                let mut lmr_depth = next_depth;
                let mut zw_score = MIN_SCORE;
                let mut searched_reduced = false;

                if try_lmr {
                    let mut reduction = params::lmr_reduction(depth, move_index);

                    if mv.piece() == Piece::Pawn && (mv.is_promotion() || self.near_promotion(board, mv)) {
                        reduction = 0;
                    }
                    if improving {
                        reduction -= 1;
                    }
                    if next.is_check() || next.in_atomic_blast_check() {
                        reduction -= 1;
                    }
                    if board.creates_threat(mv) {
                        reduction -= 1;
                    }
                    if mv == killer {
                        reduction -= 1;
                    }
                    if !tt_pv {
                        reduction += 1;
                    }
                    if did_double_extend {
                        reduction += 1;
                    }
                    if reducer == Some(us.flip()) {
                        reduction += 1;
                    }
                    if mv.is_quiet() {
                        reduction += params::history_reduction(history_value);
                    }

                    let reduction = reduction.max(0);
                    lmr_depth = (next_depth - reduction).max(1);

                    let next_reducer = if lmr_depth < next_depth { Some(us) } else { reducer };
                    let result = self.pv_search::<false>(rx, &next, -alpha - 1, -alpha, lmr_depth, ply + 1, next_reducer, &mut local_pv);
                    if result == CANCEL_SEARCH {
                        break 'score CANCEL_SEARCH;
                    }
                    zw_score = -result;
                    searched_reduced = true;
                }

                if !searched_reduced || (zw_score > alpha && lmr_depth < next_depth) {
                    let next_reducer = if IS_PV { Some(us) } else { reducer };
                    let result =
                        self.pv_search::<false>(rx, &next, -alpha - 1, -alpha, next_depth, ply + 1, next_reducer, &mut local_pv);
                    if result == CANCEL_SEARCH {
                        break 'score CANCEL_SEARCH;
                    }
                    zw_score = -result;
                }

                if IS_PV && alpha < zw_score && zw_score < beta {
                    local_pv.clear();
                    let result = self.pv_search::<true>(rx, &next, -beta, -alpha, next_depth, ply + 1, reducer, &mut local_pv);
                    if result == CANCEL_SEARCH {
                        break 'score CANCEL_SEARCH;
                    }
                    break 'score -result;
                }

                zw_score
            };

            self.nnue.pop();

            if score == CANCEL_SEARCH {
                return CANCEL_SEARCH;
            }

            if score < beta && (mv.is_quiet() || !board.see_gt(mv, 0)) && tried_quiets.len() < MAX_TRIED_MOVES {
                tried_quiets.push(mv);
            }

            if score > best_score {
                best_score = score;
                best_move = mv;

                if score > alpha {
                    if score < beta {
                        alpha = score;
                    }
                    if IS_PV {
                        pv.update(mv, &mut local_pv);
                    }
                }
            }

            if best_score >= beta {
                break;
            }
        }

        if legal_count == 0 {
            return if excluded != NO_MOVE {
                alpha
            } else if in_check_any {
                loss_score(ply)
            } else {
                0
            };
        }

        // step 15: histories, corrections, and the TT store
        if !self.is_stopped() && excluded == NO_MOVE {
            let bound = if best_score >= beta {
                Bound::Lower
            } else if IS_PV && best_score > original_alpha {
                Bound::Exact
            } else {
                Bound::Upper
            };

            if bound == Bound::Lower && (best_move.is_quiet() || !board.see_gt(best_move, 0)) {
                self.hh.update(us, opp_move, own_prev, best_move, &tried_quiets, depth);
                self.stack.entry_mut(ply).killer = best_move;
            }

            if !in_check_any && best_move.is_quiet() {
                let error = best_score - static_value;
                self.hh.update_corr_histories(us, depth, feature_hash, bound, error);
            }

            self.tt.insert(
                hash,
                TTEntry {
                    best_move,
                    score: from_root_relative_score(ply, best_score),
                    depth,
                    bound,
                    tt_pv,
                },
            );
        }

        best_score
    }

    fn near_promotion(&self, board: &Board, mv: Move) -> bool {
        let to_rank = mv.to() / 8;
        if board.active_player().is_white() {
            to_rank == 6
        } else {
            to_rank == 1
        }
    }

    // Quiescence: noisy moves (all evasions when in check), extended near the
    // window by bounded promotion and blast-threat walks.
    #[allow(clippy::too_many_arguments)]
    fn q_search<const IS_PV: bool>(
        &mut self, rx: Option<&Receiver<Message>>, board: &Board, mut alpha: i32, beta: i32, ply: usize,
        elevation: i32, pv: &mut PrincipalVariation,
    ) -> i32 {
        if self.is_stopped() {
            return CANCEL_SEARCH;
        }
        self.max_reached_depth = ply.max(self.max_reached_depth);
        self.inc_node_count();

        let us = board.active_player();
        if board.side(us).king().is_empty() {
            return loss_score(ply);
        }
        if board.side(us.flip()).king().is_empty() {
            return win_score(ply);
        }

        let is_check = board.is_check();
        let atomic_check = board.in_atomic_blast_check();
        let in_check_any = is_check || atomic_check;

        if self.stack.is_repetition_draw(board, ply) {
            return 0;
        }
        if self.stack.upcoming_cycle_exists(board, ply) {
            if beta <= 0 {
                return 0;
            }
            alpha = alpha.max(0);
        }

        let hash = board.hash();
        let tt_entry = self.tt.find(hash);
        let mut tt_move = NO_MOVE;
        let mut tt_hint = None;
        if let Some(entry) = &tt_entry {
            tt_move = entry.best_move;
            let score = to_root_relative_score(ply, sanitize_score(entry.score));
            tt_hint = Some((score, entry.bound));

            let is_cutoff = match entry.bound {
                Bound::Exact => true,
                Bound::Lower => score >= beta,
                Bound::Upper => score <= alpha,
            };
            if is_cutoff {
                return score;
            }
        }

        let (_, _, value) = self.evaluate::<IS_PV>(board, ply, tt_hint);

        if !in_check_any && value >= beta {
            return value;
        }
        if ply >= MAX_PLY - 4 {
            return value;
        }

        {
            let entry = self.stack.entry_mut(ply);
            entry.hash = hash;
            entry.sided_hash = board.sided_hash();
            entry.eval = value;
            entry.in_check = in_check_any;
        }

        alpha = alpha.max(value);
        let mut best_score = value;
        let mut best_move = NO_MOVE;
        let mut legal_count = 0usize;

        // in check every evasion is searched, otherwise only noisy moves
        let mut orderer =
            if in_check_any { MoveOrderer::new(tt_move, NO_MOVE, NO_MOVE) } else { MoveOrderer::noisy_only(tt_move) };

        while let Some(mv) = orderer.next_move(board, &self.hh, NO_MOVE, NO_MOVE) {
            legal_count += 1;
            if self.is_stopped() {
                return CANCEL_SEARCH;
            }

            let blast_mate = board.is_atomic_king_blast_capture(mv);

            if !in_check_any && !blast_mate && !board.see_ge(mv, 0) {
                break;
            }

            let delta_prune =
                !IS_PV && !in_check_any && !blast_mate && !board.see_gt(mv, 0) && value + params::QS_DELTA_MARGIN < alpha;
            if delta_prune {
                break;
            }

            let good_capture_prune = !IS_PV
                && !in_check_any
                && !blast_mate
                && tt_entry.is_none()
                && board.see_ge(mv, params::QS_GOOD_CAPTURE_PRUNE_SEE_MARGIN)
                && value + params::QS_GOOD_CAPTURE_PRUNE_SCORE_MARGIN > beta;
            if good_capture_prune {
                return beta;
            }

            self.stack.entry_mut(ply).played = mv;

            if blast_mate {
                return win_score(ply);
            }

            let next = board.forward(mv);
            self.tt.prefetch(next.hash());
            let updates = build_updates(board, &next);
            self.nnue.push_update(&updates, &next);

            let mut local_pv = PrincipalVariation::default();
            let result = self.q_search::<IS_PV>(rx, &next, -beta, -alpha, ply + 1, elevation + 1, &mut local_pv);
            self.nnue.pop();
            if result == CANCEL_SEARCH {
                return CANCEL_SEARCH;
            }
            let score = -result;

            if score > best_score {
                best_score = score;
                best_move = mv;
                if score > alpha {
                    if score < beta {
                        alpha = score;
                    }
                    if IS_PV {
                        pv.update(mv, &mut local_pv);
                    }
                }
            }

            if best_score >= beta {
                break;
            }
        }

        // promotion quiescence: quiet under-promotions and pushes are invisible
        // to the noisy generator but can swing the result near the window
        if !in_check_any && best_score < beta && elevation == 0 && best_score + params::QS_NEAR_WINDOW_MARGIN >= alpha && !self.is_stopped() {
            let mut explored = 0usize;
            for mv in board.generate_moves(GenMode::QuietAndCheck) {
                if !mv.is_promotion() {
                    continue;
                }
                if explored >= params::QS_PROMO_LIMIT {
                    break;
                }
                explored += 1;

                self.stack.entry_mut(ply).played = mv;
                let next = board.forward(mv);
                let updates = build_updates(board, &next);
                self.nnue.push_update(&updates, &next);
                let mut local_pv = PrincipalVariation::default();
                let result = self.q_search::<IS_PV>(rx, &next, -beta, -alpha, ply + 1, elevation + 1, &mut local_pv);
                self.nnue.pop();
                if result == CANCEL_SEARCH {
                    return CANCEL_SEARCH;
                }
                let score = -result;

                if score > best_score {
                    best_score = score;
                    best_move = mv;
                    if score > alpha {
                        if score < beta {
                            alpha = score;
                        }
                        if IS_PV {
                            pv.update(mv, &mut local_pv);
                        }
                    }
                }

                if best_score >= beta || self.is_stopped() {
                    break;
                }
            }
        }

        // blast-threat quiescence: quiets that step into the enemy king ring
        // and set up an explosion on the next move
        if !in_check_any && best_score < beta && elevation == 0 && best_score + params::QS_NEAR_WINDOW_MARGIN >= alpha && !self.is_stopped() {
            let enemy_king = board.side(us.flip()).king();
            let king_zone = if enemy_king.is_occupied() {
                crate::bitboard::explosion_mask(enemy_king.first())
            } else {
                crate::bitboard::BitBoard(0)
            };

            let mut explored = 0usize;
            for mv in board.generate_moves(GenMode::QuietAndCheck) {
                if mv.is_promotion() {
                    continue;
                }
                if explored >= params::QS_THREAT_LIMIT {
                    break;
                }
                if !king_zone.is_set(mv.to()) && !mv.is_castle() {
                    continue;
                }

                let next = board.forward(mv);
                if !next.has_atomic_blast_capture_for(us) {
                    continue;
                }
                explored += 1;

                self.stack.entry_mut(ply).played = mv;
                let updates = build_updates(board, &next);
                self.nnue.push_update(&updates, &next);
                let mut local_pv = PrincipalVariation::default();
                let result = self.q_search::<IS_PV>(rx, &next, -beta, -alpha, ply + 1, elevation + 1, &mut local_pv);
                self.nnue.pop();
                if result == CANCEL_SEARCH {
                    return CANCEL_SEARCH;
                }
                let score = -result;

                if score > best_score {
                    best_score = score;
                    best_move = mv;
                    if score > alpha {
                        if score < beta {
                            alpha = score;
                        }
                        if IS_PV {
                            pv.update(mv, &mut local_pv);
                        }
                    }
                }

                if best_score >= beta || self.is_stopped() {
                    break;
                }
            }
        }

        if legal_count == 0 && in_check_any {
            return loss_score(ply);
        }
        if legal_count == 0 {
            return value;
        }

        if !self.is_stopped() {
            let bound = if best_score >= beta { Bound::Lower } else { Bound::Upper };
            self.tt.insert(
                hash,
                TTEntry {
                    best_move,
                    score: from_root_relative_score(ply, best_score),
                    depth: 0,
                    bound,
                    tt_pv: IS_PV,
                },
            );
        }

        best_score
    }

    fn check_search_limits(&mut self, rx: &Receiver<Message>) {
        if self.local_total_node_count < self.next_check_node_count {
            return;
        }

        self.next_check_node_count = if self.limits.node_limit() != u64::MAX {
            self.limits.node_limit().min(self.local_total_node_count + 1024)
        } else {
            self.local_total_node_count + 1024
        };

        self.flush_node_counts();
        self.check_messages(rx, false);

        let now = Instant::now();
        if !self.pondering
            && self.cancel_possible
            && (self.node_count.load(Ordering::Relaxed) >= self.limits.node_limit()
                || self.time_mgr.is_timelimit_exceeded(now))
            && !self.is_stopped()
            && !self.time_mgr.try_extend_timelimit()
        {
            self.set_stopped(true);
        }

        if self.log(Info) && now.duration_since(self.last_log_time).as_millis() >= 1000 {
            self.last_log_time = now;
            println!(
                "info depth {} seldepth {}{}",
                self.current_depth,
                self.max_reached_depth,
                self.base_stats(self.time_mgr.search_duration(now))
            );
        }
    }

    fn print_info(&mut self, depth: i32, score: i32, pv: &[Move]) {
        let stats = self.base_stats(self.time_mgr.search_duration(Instant::now()));
        let pv_info = self.pv_info(pv);
        println!(
            "info depth {} seldepth {} score {}{}{}",
            depth,
            self.max_reached_depth,
            score_info(score),
            stats,
            if pv_info.is_empty() { String::new() } else { format!(" pv {}", pv_info) }
        );
    }

    fn pv_info(&self, pv: &[Move]) -> String {
        let mut board = self.board;
        let mut parts = Vec::with_capacity(pv.len());
        for &mv in pv {
            if !board.is_legal(mv, GenMode::All) {
                break;
            }
            parts.push(UCIMove::from_move(&board, mv));
            board = board.forward(mv);
        }
        parts.join(" ")
    }

    fn base_stats(&self, duration: Duration) -> String {
        let node_count = self.node_count.load(Ordering::Relaxed);
        let tb_hits = self.tb_hits.load(Ordering::Relaxed);
        let duration_micros = duration.as_micros();
        let nodes_per_second = if duration_micros > 0 { node_count as u128 * 1_000_000 / duration_micros } else { 0 };

        if nodes_per_second > 0 {
            format!(
                " nodes {} nps {} tbhits {} hashfull {} time {}",
                node_count,
                nodes_per_second,
                tb_hits,
                self.tt.hash_full(),
                duration_micros / 1000
            )
        } else {
            format!(" nodes {} time {}", node_count, duration_micros / 1000)
        }
    }

    fn log(&self, log_level: LogLevel) -> bool {
        self.log_level <= log_level
    }

    fn is_stopped(&self) -> bool {
        self.is_stopped.load(Ordering::Acquire)
    }

    pub fn set_stopped(&mut self, value: bool) {
        self.is_stopped.store(value, Ordering::Release);
    }

    fn check_messages(&mut self, rx: &Receiver<Message>, blocking: bool) {
        if let Some(msg) = self.receive_message(rx, blocking) {
            match msg {
                Message::IsReady => println!("readyok"),

                Message::Stop => {
                    self.pondering = false;
                    self.set_stopped(true);
                }

                Message::PonderHit => {
                    self.pondering = false;
                }

                _ => (),
            }
        }
    }

    fn receive_message(&mut self, rx: &Receiver<Message>, blocking: bool) -> Option<Message> {
        if blocking {
            match rx.recv() {
                Ok(msg) => Some(msg),
                Err(e) => {
                    self.uci_channel_error(e.to_string());
                    None
                }
            }
        } else {
            match rx.try_recv() {
                Ok(msg) => Some(msg),
                Err(TryRecvError::Empty) => None,
                Err(e) => {
                    self.uci_channel_error(e.to_string());
                    None
                }
            }
        }
    }

    fn uci_channel_error(&mut self, err_msg: String) {
        log::error!("search thread could not read from UCI thread and will be stopped: {}", err_msg);
        self.set_stopped(true);
        self.pondering = false;
    }

    pub fn set_node_limit(&mut self, node_limit: u64) {
        self.limits.set_node_limit(node_limit);
    }
}

fn score_info(score: i32) -> String {
    if !is_mate_or_mated_score(score) {
        return format!("cp {}", score * 100 / 355);
    }

    if score < 0 {
        format!("mate {}", (MATED_SCORE - score - 1) / 2)
    } else {
        format!("mate {}", (MATE_SCORE - score + 1) / 2)
    }
}

/// Collects the sequence of best moves along the principal variation
#[derive(Clone, Default)]
pub struct PrincipalVariation(Vec<Move>);

impl PrincipalVariation {
    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn update(&mut self, best_move: Move, follow_up: &mut PrincipalVariation) {
        self.0.clear();
        self.0.push(best_move);
        self.0.append(&mut follow_up.0);
    }

    pub fn moves(&self) -> Vec<Move> {
        self.0.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

enum ToThreadMessage {
    Search { board: Board, game_history: GameHistory, skipped_moves: Vec<Move>, tb_probe_depth: i32 },
    ClearTT { thread_no: usize, total_threads: usize },
    Terminate,
}

type FromThreadMessage = ();

struct HelperThreads {
    threads: Vec<HelperThread>,
}

impl HelperThreads {
    pub fn new() -> Self {
        HelperThreads { threads: Vec::new() }
    }

    pub fn resize(
        &mut self, target_count: usize, node_count: &Arc<AtomicU64>, tb_hits: &Arc<AtomicU64>,
        tt: &Arc<TranspositionTable>, is_stopped: &Arc<AtomicBool>,
    ) {
        if target_count < self.threads.len() {
            self.threads.drain(target_count..).for_each(|t| {
                t.terminate();
                t.handle.join().expect("could not join helper thread");
            });
            return;
        }

        for _ in 0..(target_count - self.threads.len()) {
            let (to_tx, to_rx) = channel::<ToThreadMessage>();
            let (from_tx, from_rx) = channel::<FromThreadMessage>();

            let node_count = node_count.clone();
            let tb_hits = tb_hits.clone();
            let tt = tt.clone();
            let is_stopped = is_stopped.clone();

            let handle = thread::spawn(move || {
                let board = crate::fen::parse_fen(crate::fen::START_POS).expect("invalid start position");
                let sub_search = Search::new(
                    is_stopped,
                    node_count,
                    tb_hits,
                    LogLevel::Error,
                    SearchLimits::default(),
                    tt,
                    board,
                    true,
                );
                HelperThread::run(to_rx, from_tx, sub_search);
            });

            self.threads.push(HelperThread { handle, to_tx, from_rx });
        }
    }

    pub fn count(&self) -> usize {
        self.threads.len()
    }

    pub fn start_search(&self, board: &Board, game_history: &GameHistory, skipped_moves: &[Move], tb_probe_depth: i32) {
        for t in self.threads.iter() {
            t.search(board, game_history, skipped_moves, tb_probe_depth);
        }
    }

    pub fn clear_tt(&self) {
        let total_count = self.threads.len() + 1;
        for (i, t) in self.threads.iter().enumerate() {
            t.clear_tt(i + 1, total_count);
        }

        self.wait_for_completion();
    }

    pub fn wait_for_completion(&self) {
        for t in self.threads.iter() {
            t.wait_for_completion();
        }
    }

    pub fn terminate(&mut self) {
        for t in self.threads.iter() {
            t.terminate();
        }

        while let Some(t) = self.threads.pop() {
            t.handle.join().expect("could not join helper thread");
        }
    }
}

impl Drop for HelperThreads {
    fn drop(&mut self) {
        self.terminate();
    }
}

struct HelperThread {
    handle: JoinHandle<()>,
    to_tx: Sender<ToThreadMessage>,
    from_rx: Receiver<FromThreadMessage>,
}

impl HelperThread {
    pub fn search(&self, board: &Board, game_history: &GameHistory, skipped_moves: &[Move], tb_probe_depth: i32) {
        self.to_tx
            .send(ToThreadMessage::Search {
                board: *board,
                game_history: game_history.clone(),
                skipped_moves: Vec::from(skipped_moves),
                tb_probe_depth,
            })
            .expect("could not send search request to helper thread");
    }

    pub fn terminate(&self) {
        let _ = self.to_tx.send(ToThreadMessage::Terminate);
    }

    pub fn clear_tt(&self, thread_no: usize, total_threads: usize) {
        self.to_tx
            .send(ToThreadMessage::ClearTT { thread_no, total_threads })
            .expect("could not send clear request to helper thread");
    }

    pub fn wait_for_completion(&self) {
        if let Err(e) = self.from_rx.recv() {
            log::error!("channel communication error while waiting for helper thread: {}", e);
        }
    }

    pub fn run(rx: Receiver<ToThreadMessage>, tx: Sender<FromThreadMessage>, mut sub_search: Search) {
        loop {
            let msg = match rx.recv() {
                Ok(msg) => msg,
                Err(e) => {
                    log::error!("helper thread communication error: {}", e);
                    break;
                }
            };

            match msg {
                ToThreadMessage::Search { board, game_history, skipped_moves, tb_probe_depth } => {
                    sub_search.reset_counters();
                    sub_search.update(&board, game_history, SearchLimits::default(), false);
                    sub_search.set_tb_probe_depth(tb_probe_depth);
                    sub_search.cancel_possible = false;

                    sub_search.stack.clear_for_search();
                    sub_search.stack.set_game_history(sub_search.game_history.clone(), board.halfmove_clock);
                    sub_search.nnue.reset(&board);
                    sub_search.init_root_moves(&skipped_moves);

                    let mut score = 0;
                    for depth in 1..MAX_PLY as i32 {
                        match sub_search.aspiration_search(None, score, depth) {
                            Some((s, _, _)) => score = s,
                            None => break,
                        }
                        if sub_search.is_stopped() || sub_search.root_moves.is_empty() {
                            break;
                        }
                    }

                    sub_search.flush_node_counts();
                    tx.send(()).expect("could not report helper thread completion");
                }

                ToThreadMessage::ClearTT { thread_no, total_threads } => {
                    sub_search.tt.clear(thread_no, total_threads);
                    tx.send(()).expect("could not report helper thread completion");
                }

                ToThreadMessage::Terminate => break,
            }
        }
    }
}
