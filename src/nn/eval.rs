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

use std::sync::Arc;

use crate::align::A64;
use crate::board::Board;
use crate::colors::{Color, BLACK, WHITE};
use crate::nn::{
    feature_index, king_bucket, refresh_required, Network, INPUT_BUCKETS, LAYER1_SIZE, L1_QUANT, OUTPUT_BUCKETS,
    OUTPUT_QUANT, SCALE,
};
use crate::pieces::{Piece, ALL_PIECES};

pub const ACCUMULATOR_STACK_SIZE: usize = 256;

pub const MAX_SUBS: usize = 16;
pub const MAX_ADDS: usize = 4;

/// Occupancy snapshot used for output bucketing and refresh-table deltas
#[derive(Copy, Clone, Default, Eq, PartialEq)]
pub struct BitboardSet {
    colors: [u64; 2],
    pieces: [u64; 6],
}

impl BitboardSet {
    pub fn from_board(board: &Board) -> Self {
        let mut bbs = BitboardSet::default();
        for color in [WHITE, BLACK] {
            bbs.colors[color.idx()] = board.side(color).all().0;
            for piece in ALL_PIECES {
                bbs.pieces[piece.idx()] |= board.side(color).piece(piece).0;
            }
        }
        bbs
    }

    #[inline(always)]
    pub fn for_piece(&self, piece: Piece, color: Color) -> u64 {
        self.pieces[piece.idx()] & self.colors[color.idx()]
    }

    #[inline(always)]
    pub fn occupancy(&self) -> u64 {
        self.colors[0] | self.colors[1]
    }
}

/// Output buckets by material count
#[inline(always)]
fn output_bucket(bbs: &BitboardSet) -> usize {
    const DIV: u32 = 32 / OUTPUT_BUCKETS as u32;
    let pop = bbs.occupancy().count_ones().clamp(2, 32);
    ((pop - 2) / DIV) as usize
}

#[derive(Clone)]
pub struct Accumulator {
    outputs: A64<[[i16; LAYER1_SIZE]; 2]>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Accumulator { outputs: A64([[0; LAYER1_SIZE]; 2]) }
    }
}

impl Accumulator {
    fn init_both(&mut self, net: &Network) {
        self.outputs.0[0].copy_from_slice(&net.ft_biases.0);
        self.outputs.0[1].copy_from_slice(&net.ft_biases.0);
    }

    #[inline(always)]
    pub fn for_color(&self, color: Color) -> &[i16; LAYER1_SIZE] {
        &self.outputs.0[color.idx()]
    }

    #[inline(always)]
    fn for_color_mut(&mut self, color: Color) -> &mut [i16; LAYER1_SIZE] {
        &mut self.outputs.0[color.idx()]
    }

    fn copy_from(&mut self, color: Color, other: &Accumulator) {
        self.outputs.0[color.idx()].copy_from_slice(&other.outputs.0[color.idx()]);
    }

    fn activate_feature(&mut self, net: &Network, color: Color, feature: usize) {
        let weights = &net.ft_weights.0[feature * LAYER1_SIZE..][..LAYER1_SIZE];
        for (node, weight) in self.for_color_mut(color).iter_mut().zip(weights) {
            *node += *weight;
        }
    }

    fn deactivate_feature(&mut self, net: &Network, color: Color, feature: usize) {
        let weights = &net.ft_weights.0[feature * LAYER1_SIZE..][..LAYER1_SIZE];
        for (node, weight) in self.for_color_mut(color).iter_mut().zip(weights) {
            *node -= *weight;
        }
    }
}

// Fused update kernels for the common move shapes

fn sub_add(src: &[i16; LAYER1_SIZE], dst: &mut [i16; LAYER1_SIZE], weights: &[i16], sub: usize, add: usize) {
    let sub_w = &weights[sub * LAYER1_SIZE..][..LAYER1_SIZE];
    let add_w = &weights[add * LAYER1_SIZE..][..LAYER1_SIZE];
    for i in 0..LAYER1_SIZE {
        dst[i] = src[i] + add_w[i] - sub_w[i];
    }
}

fn sub_sub_add(
    src: &[i16; LAYER1_SIZE], dst: &mut [i16; LAYER1_SIZE], weights: &[i16], sub0: usize, sub1: usize, add: usize,
) {
    let sub0_w = &weights[sub0 * LAYER1_SIZE..][..LAYER1_SIZE];
    let sub1_w = &weights[sub1 * LAYER1_SIZE..][..LAYER1_SIZE];
    let add_w = &weights[add * LAYER1_SIZE..][..LAYER1_SIZE];
    for i in 0..LAYER1_SIZE {
        dst[i] = src[i] + add_w[i] - sub0_w[i] - sub1_w[i];
    }
}

#[allow(clippy::too_many_arguments)]
fn sub_sub_add_add(
    src: &[i16; LAYER1_SIZE], dst: &mut [i16; LAYER1_SIZE], weights: &[i16], sub0: usize, sub1: usize, add0: usize,
    add1: usize,
) {
    let sub0_w = &weights[sub0 * LAYER1_SIZE..][..LAYER1_SIZE];
    let sub1_w = &weights[sub1 * LAYER1_SIZE..][..LAYER1_SIZE];
    let add0_w = &weights[add0 * LAYER1_SIZE..][..LAYER1_SIZE];
    let add1_w = &weights[add1 * LAYER1_SIZE..][..LAYER1_SIZE];
    for i in 0..LAYER1_SIZE {
        dst[i] = src[i] + add0_w[i] - sub0_w[i] + add1_w[i] - sub1_w[i];
    }
}

fn sub_bulk(src: &[i16; LAYER1_SIZE], dst: &mut [i16; LAYER1_SIZE], weights: &[i16], subs: &[usize]) {
    dst.copy_from_slice(src);
    for &sub in subs {
        let sub_w = &weights[sub * LAYER1_SIZE..][..LAYER1_SIZE];
        for i in 0..LAYER1_SIZE {
            dst[i] -= sub_w[i];
        }
    }
}

/// Per-ply feature diff: at most 16 deactivations (a full blast) and 4
/// activations, plus a per-perspective refresh flag for king bucket crossings.
#[derive(Clone)]
pub struct NnueUpdates {
    refresh: [bool; 2],
    subs: [(Color, Piece, u8); MAX_SUBS],
    adds: [(Color, Piece, u8); MAX_ADDS],
    sub_count: usize,
    add_count: usize,
}

impl Default for NnueUpdates {
    fn default() -> Self {
        NnueUpdates {
            refresh: [false; 2],
            subs: [(WHITE, Piece::Pawn, 0); MAX_SUBS],
            adds: [(WHITE, Piece::Pawn, 0); MAX_ADDS],
            sub_count: 0,
            add_count: 0,
        }
    }
}

impl NnueUpdates {
    pub fn set_refresh(&mut self, color: Color) {
        self.refresh[color.idx()] = true;
    }

    pub fn push_sub(&mut self, color: Color, piece: Piece, sq: usize) {
        debug_assert!(self.sub_count < MAX_SUBS);
        self.subs[self.sub_count] = (color, piece, sq as u8);
        self.sub_count += 1;
    }

    pub fn push_add(&mut self, color: Color, piece: Piece, sq: usize) {
        debug_assert!(self.add_count < MAX_ADDS);
        self.adds[self.add_count] = (color, piece, sq as u8);
        self.add_count += 1;
    }
}

/// Computes the minimal feature diff between two successive positions
pub fn build_updates(before: &Board, after: &Board) -> NnueUpdates {
    debug_assert!(before.side(WHITE).king().is_occupied() && before.side(BLACK).king().is_occupied());
    debug_assert!(after.side(WHITE).king().is_occupied() && after.side(BLACK).king().is_occupied());

    let mut updates = NnueUpdates::default();

    for color in [WHITE, BLACK] {
        let prev_king = before.side(color).king().first();
        let next_king = after.side(color).king().first();
        if refresh_required(color, prev_king, next_king) {
            updates.set_refresh(color);
        }
    }

    for color in [WHITE, BLACK] {
        for piece in ALL_PIECES {
            let before_plane = before.side(color).piece(piece);
            let after_plane = after.side(color).piece(piece);

            for sq in before_plane & !after_plane {
                updates.push_sub(color, piece, sq as usize);
            }
            for sq in after_plane & !before_plane {
                updates.push_add(color, piece, sq as usize);
            }
        }
    }

    updates
}

struct RefreshTableEntry {
    accumulator: Accumulator,
    bbs: [BitboardSet; 2],
}

/// Per input-bucket cache of the last accumulator state, refreshed by
/// replaying only the piece diff against the cached occupancy.
struct RefreshTable {
    table: Vec<RefreshTableEntry>,
}

impl RefreshTable {
    fn new() -> Self {
        let mut table = Vec::with_capacity(INPUT_BUCKETS);
        for _ in 0..INPUT_BUCKETS {
            table.push(RefreshTableEntry { accumulator: Accumulator::default(), bbs: [BitboardSet::default(); 2] });
        }
        RefreshTable { table }
    }

    fn init(&mut self, net: &Network) {
        for entry in self.table.iter_mut() {
            entry.accumulator.init_both(net);
            entry.bbs = [BitboardSet::default(); 2];
        }
    }
}

fn reset_accumulator(accumulator: &mut Accumulator, net: &Network, color: Color, bbs: &BitboardSet, king: usize) {
    for piece_color in [BLACK, WHITE] {
        for piece in ALL_PIECES {
            for sq in crate::bitboard::BitBoard(bbs.for_piece(piece, piece_color)) {
                let feature = feature_index(color, piece_color, piece, sq as usize, king);
                accumulator.activate_feature(net, color, feature);
            }
        }
    }
}

fn refresh_accumulator(
    accumulator: &mut Accumulator, net: &Network, color: Color, bbs: &BitboardSet, refresh_table: &mut RefreshTable,
    king: usize,
) {
    let bucket = king_bucket(color, king);
    let entry = &mut refresh_table.table[bucket];
    let prev_boards = &entry.bbs[color.idx()];

    for piece_color in [BLACK, WHITE] {
        for piece in ALL_PIECES {
            let prev = prev_boards.for_piece(piece, piece_color);
            let curr = bbs.for_piece(piece, piece_color);

            for sq in crate::bitboard::BitBoard(curr & !prev) {
                let feature = feature_index(color, piece_color, piece, sq as usize, king);
                entry.accumulator.activate_feature(net, color, feature);
            }
            for sq in crate::bitboard::BitBoard(prev & !curr) {
                let feature = feature_index(color, piece_color, piece, sq as usize, king);
                entry.accumulator.deactivate_feature(net, color, feature);
            }
        }
    }

    accumulator.copy_from(color, &entry.accumulator);
    entry.bbs[color.idx()] = *bbs;
}

/// Per-worker NNUE state: a fixed ply stack of accumulators addressed by
/// index, plus the per-bucket refresh table.
pub struct NnueState {
    net: Arc<Network>,
    stack: Vec<Accumulator>,
    curr: usize,
    refresh_table: RefreshTable,
}

impl NnueState {
    pub fn new(net: Arc<Network>) -> Self {
        NnueState { net, stack: vec![Accumulator::default(); ACCUMULATOR_STACK_SIZE], curr: 0, refresh_table: RefreshTable::new() }
    }

    pub fn reset(&mut self, board: &Board) {
        debug_assert!(board.side(WHITE).king().is_occupied() && board.side(BLACK).king().is_occupied());

        let bbs = BitboardSet::from_board(board);
        let white_king = board.side(WHITE).king().first();
        let black_king = board.side(BLACK).king().first();

        self.refresh_table.init(&self.net);
        self.curr = 0;

        for color in [BLACK, WHITE] {
            let king = if color.is_black() { black_king } else { white_king };
            let bucket = king_bucket(color, king);

            let entry = &mut self.refresh_table.table[bucket];
            reset_accumulator(&mut entry.accumulator, &self.net, color, &bbs, king);

            self.stack[0].copy_from(color, &entry.accumulator);
            entry.bbs[color.idx()] = bbs;
        }
    }

    /// Applies the diff into the next stack slot and advances
    pub fn push_update(&mut self, updates: &NnueUpdates, board: &Board) {
        debug_assert!(self.curr + 1 < ACCUMULATOR_STACK_SIZE, "accumulator stack overflow");
        self.apply_update(updates, board, true);
        self.curr += 1;
    }

    /// Applies the diff in place, without consuming a stack slot
    pub fn update_in_place(&mut self, updates: &NnueUpdates, board: &Board) {
        self.apply_update(updates, board, false);
    }

    fn apply_update(&mut self, updates: &NnueUpdates, board: &Board, push: bool) {
        let bbs = BitboardSet::from_board(board);
        let white_king = board.side(WHITE).king().first();
        let black_king = board.side(BLACK).king().first();

        // a copy of the source outputs keeps the kernels free of aliasing,
        // which lets push and in-place updates share the same code path
        let src = self.stack[self.curr].outputs.0;
        let dst_idx = self.curr + usize::from(push);

        for color in [BLACK, WHITE] {
            let king = if color.is_black() { black_king } else { white_king };

            if updates.refresh[color.idx()] {
                refresh_accumulator(&mut self.stack[dst_idx], &self.net, color, &bbs, &mut self.refresh_table, king);
                continue;
            }

            let feature =
                |entry: &(Color, Piece, u8)| feature_index(color, entry.0, entry.1, entry.2 as usize, king);

            let subs = &updates.subs[..updates.sub_count];
            let adds = &updates.adds[..updates.add_count];

            let src_out = &src[color.idx()];
            let weights = &self.net.ft_weights.0[..];
            let dst_out = self.stack[dst_idx].for_color_mut(color);

            match (updates.sub_count, updates.add_count) {
                (0, 0) => dst_out.copy_from_slice(src_out),

                (_, 0) => {
                    let mut sub_features = [0usize; MAX_SUBS];
                    for (slot, entry) in sub_features.iter_mut().zip(subs) {
                        *slot = feature(entry);
                    }
                    sub_bulk(src_out, dst_out, weights, &sub_features[..subs.len()]);
                }

                (1, 1) => sub_add(src_out, dst_out, weights, feature(&subs[0]), feature(&adds[0])),

                (2, 1) => {
                    sub_sub_add(src_out, dst_out, weights, feature(&subs[0]), feature(&subs[1]), feature(&adds[0]))
                }

                (2, 2) => sub_sub_add_add(
                    src_out,
                    dst_out,
                    weights,
                    feature(&subs[0]),
                    feature(&subs[1]),
                    feature(&adds[0]),
                    feature(&adds[1]),
                ),

                _ => {
                    // rare large blasts: copy, then apply the diff feature by feature
                    dst_out.copy_from_slice(src_out);
                    for entry in subs {
                        let sub_w = &weights[feature(entry) * LAYER1_SIZE..][..LAYER1_SIZE];
                        for i in 0..LAYER1_SIZE {
                            dst_out[i] -= sub_w[i];
                        }
                    }
                    for entry in adds {
                        let add_w = &weights[feature(entry) * LAYER1_SIZE..][..LAYER1_SIZE];
                        for i in 0..LAYER1_SIZE {
                            dst_out[i] += add_w[i];
                        }
                    }
                }
            }
        }
    }

    pub fn pop(&mut self) {
        if self.curr > 0 {
            self.curr -= 1;
        }
    }

    #[inline(always)]
    pub fn outputs(&self, color: Color) -> &[i16; LAYER1_SIZE] {
        self.stack[self.curr].for_color(color)
    }

    pub fn evaluate(&self, board: &Board, stm: Color) -> i32 {
        let bbs = BitboardSet::from_board(board);
        evaluate_accumulator(&self.net, &self.stack[self.curr], &bbs, stm)
    }

    /// Scratch evaluation without touching the incremental state
    pub fn evaluate_once(net: &Network, board: &Board, stm: Color) -> i32 {
        let accumulator = scratch_accumulator(net, board);
        let bbs = BitboardSet::from_board(board);
        evaluate_accumulator(net, &accumulator, &bbs, stm)
    }
}

/// Builds an accumulator from scratch (the refresh-correctness oracle)
pub fn scratch_accumulator(net: &Network, board: &Board) -> Accumulator {
    debug_assert!(board.side(WHITE).king().is_occupied() && board.side(BLACK).king().is_occupied());

    let bbs = BitboardSet::from_board(board);
    let mut accumulator = Accumulator::default();
    accumulator.init_both(net);
    reset_accumulator(&mut accumulator, net, BLACK, &bbs, board.side(BLACK).king().first());
    reset_accumulator(&mut accumulator, net, WHITE, &bbs, board.side(WHITE).king().first());
    accumulator
}

fn evaluate_accumulator(net: &Network, accumulator: &Accumulator, bbs: &BitboardSet, stm: Color) -> i32 {
    let (stm_out, ntm_out) = (accumulator.for_color(stm), accumulator.for_color(stm.flip()));

    let bucket = output_bucket(bbs);
    let weights = &net.output_weights.0[bucket * 2 * LAYER1_SIZE..][..2 * LAYER1_SIZE];

    let mut sum = 0i32;
    for i in 0..LAYER1_SIZE {
        sum += i32::from(stm_out[i].max(0)) * i32::from(weights[i]);
    }
    for i in 0..LAYER1_SIZE {
        sum += i32::from(ntm_out[i].max(0)) * i32::from(weights[LAYER1_SIZE + i]);
    }

    let raw = i64::from(sum) + i64::from(net.output_biases.0[bucket]) * i64::from(L1_QUANT);
    (raw * i64::from(SCALE) / i64::from(L1_QUANT * OUTPUT_QUANT)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::{parse_fen, START_POS};
    use crate::move_gen::GenMode;

    // small deterministic weights keep the i16 accumulators far from overflow
    fn patterned_network() -> Arc<Network> {
        let mut net = Network::default();
        for (i, w) in net.ft_weights.0.iter_mut().enumerate() {
            *w = ((i * 31 + 7) % 53) as i16 - 26;
        }
        for (i, b) in net.ft_biases.0.iter_mut().enumerate() {
            *b = ((i * 17 + 3) % 29) as i16 - 14;
        }
        for (i, w) in net.output_weights.0.iter_mut().enumerate() {
            *w = ((i * 13 + 5) % 41) as i16 - 20;
        }
        for (i, b) in net.output_biases.0.iter_mut().enumerate() {
            *b = (i as i16) - 4;
        }
        Arc::new(net)
    }

    fn assert_matches_scratch(state: &NnueState, board: &Board, net: &Network) {
        let scratch = scratch_accumulator(net, board);
        for color in [WHITE, BLACK] {
            assert_eq!(
                scratch.for_color(color)[..],
                state.outputs(color)[..],
                "accumulator diverged from scratch rebuild for {:?}",
                color
            );
        }
    }

    // Walks a game, picking moves deterministically and checking the
    // incremental accumulators against scratch rebuilds at every ply.
    #[test]
    fn incremental_updates_match_scratch_rebuild() {
        let net = patterned_network();
        let mut state = NnueState::new(net.clone());

        let mut board = parse_fen(START_POS).unwrap();
        state.reset(&board);
        assert_matches_scratch(&state, &board, &net);

        for ply in 0..40 {
            let moves = board.generate_moves(GenMode::All);
            let candidates: Vec<_> =
                moves.iter().filter(|&mv| !board.is_atomic_king_blast_capture(mv)).collect();
            if candidates.is_empty() {
                break;
            }

            let mv = candidates[(ply * 7 + 3) % candidates.len()];
            let next = board.forward(mv);

            let updates = build_updates(&board, &next);
            state.push_update(&updates, &next);
            board = next;

            assert_matches_scratch(&state, &board, &net);
        }
    }

    #[test]
    fn pop_restores_previous_accumulator() {
        let net = patterned_network();
        let mut state = NnueState::new(net.clone());

        let board = parse_fen(START_POS).unwrap();
        state.reset(&board);
        let before = state.outputs(WHITE).to_vec();

        let mv = board.generate_moves(GenMode::All).as_slice()[0];
        let next = board.forward(mv);
        state.push_update(&build_updates(&board, &next), &next);
        state.pop();

        assert_eq!(before[..], state.outputs(WHITE)[..]);
    }

    #[test]
    fn refresh_on_bucket_crossing_matches_scratch() {
        let net = patterned_network();
        let mut state = NnueState::new(net.clone());

        // Kd1 crosses from the king-side bucket into the queen-side bucket
        let board = parse_fen("4k3/8/8/8/8/8/3r4/4K3 w - - 0 1").unwrap();
        state.reset(&board);

        let e1 = 3;
        let d1 = 4;
        let mv = crate::moves::Move::new(Piece::King, e1, d1);
        assert!(refresh_required(WHITE, e1, d1));

        let next = board.forward(mv);
        let updates = build_updates(&board, &next);
        state.push_update(&updates, &next);

        assert_matches_scratch(&state, &next, &net);

        // a second crossing re-uses the now-populated refresh entry
        let back = next.forward(crate::moves::Move::new(Piece::Rook, 8 + 4, 8 + 3));
        let updates = build_updates(&next, &back);
        state.push_update(&updates, &back);
        let third = back.forward(crate::moves::Move::new(Piece::King, d1, e1));
        let updates = build_updates(&back, &third);
        state.push_update(&updates, &third);

        assert_matches_scratch(&state, &third, &net);
    }

    #[test]
    fn castling_uses_fused_two_by_two_kernel() {
        let net = patterned_network();
        let mut state = NnueState::new(net.clone());

        let board = parse_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        state.reset(&board);

        let info = crate::board::castling::castle_info(WHITE);
        let mv = crate::moves::Move::new_castle(info.king_start, info.ks_rook);
        let next = board.forward(mv);

        state.push_update(&build_updates(&board, &next), &next);
        assert_matches_scratch(&state, &next, &net);
    }

    #[test]
    fn in_place_update_matches_push() {
        let net = patterned_network();
        let board = parse_fen(START_POS).unwrap();
        let mv = board.generate_moves(GenMode::All).as_slice()[3];
        let next = board.forward(mv);
        let updates = build_updates(&board, &next);

        let mut pushed = NnueState::new(net.clone());
        pushed.reset(&board);
        pushed.push_update(&updates, &next);

        let mut in_place = NnueState::new(net.clone());
        in_place.reset(&board);
        in_place.update_in_place(&updates, &next);

        for color in [WHITE, BLACK] {
            assert_eq!(pushed.outputs(color)[..], in_place.outputs(color)[..]);
        }
    }

    #[test]
    fn evaluation_is_perspective_symmetric() {
        let net = patterned_network();
        let board = parse_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
        let mirrored = board.mirrored();

        let stm = board.active_player();
        let eval = NnueState::evaluate_once(&net, &board, stm);
        let mirrored_eval = NnueState::evaluate_once(&net, &mirrored, mirrored.active_player());
        assert_eq!(eval, mirrored_eval, "evaluation must be invariant under color mirroring");
    }

    #[test]
    fn zero_network_evaluates_to_zero() {
        let net = Arc::new(Network::default());
        let board = parse_fen(START_POS).unwrap();
        assert_eq!(0, NnueState::evaluate_once(&net, &board, WHITE));
    }
}
