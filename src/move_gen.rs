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

use crate::bitboard::{
    explosion_mask, get_bishop_attacks, get_king_attacks, get_knight_attacks, get_pawn_attacks, get_queen_attacks,
    get_rook_attacks, rank_of, BitBoard, LAST_RANKS, PAWN_DOUBLE_MOVE_RANKS,
};
use crate::board::castling::castle_info;
use crate::board::Board;
use crate::colors::Color;
use crate::history_heuristics::HistoryHeuristics;
use crate::moves::{Move, NO_MOVE};
use crate::pieces::Piece;

pub const MAX_MOVES: usize = 256;

/// Generation modes: `All` yields every legal move. `NoisyAndCheck` yields
/// captures (including en passant), queen promotions, and every quiet move
/// that gives check, directly or as a blast threat. `QuietAndCheck` yields
/// all quiet moves (under-promotions and castling included). The filtered
/// modes overlap on check-giving quiets.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum GenMode {
    All,
    NoisyAndCheck,
    QuietAndCheck,
}

impl GenMode {
    #[inline(always)]
    fn includes_noisy(self) -> bool {
        !matches!(self, GenMode::QuietAndCheck)
    }

    #[inline(always)]
    fn includes_quiet(self) -> bool {
        !matches!(self, GenMode::NoisyAndCheck)
    }
}

#[derive(Clone)]
pub struct MoveList {
    moves: [Move; MAX_MOVES],
    len: usize,
}

impl Default for MoveList {
    fn default() -> Self {
        MoveList { moves: [NO_MOVE; MAX_MOVES], len: 0 }
    }
}

impl MoveList {
    #[inline(always)]
    pub fn push(&mut self, mv: Move) {
        debug_assert!(self.len < MAX_MOVES);
        self.moves[self.len] = mv;
        self.len += 1;
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, mv: Move) -> bool {
        self.as_slice().contains(&mv)
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = Move> + '_ {
        self.as_slice().iter().copied()
    }
}

impl IntoIterator for MoveList {
    type Item = Move;
    type IntoIter = std::iter::Take<std::array::IntoIter<Move, MAX_MOVES>>;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.into_iter().take(self.len)
    }
}

#[inline]
fn pawn_pushes(color: Color, from: usize, occ: BitBoard) -> BitBoard {
    // guards against malformed move encodings probed from the TT
    if (color.is_white() && rank_of(from) == 7) || (color.is_black() && rank_of(from) == 0) {
        return BitBoard(0);
    }

    let single = if color.is_white() { 1u64 << (from + 8) } else { 1u64 << (from - 8) };
    if single & occ.0 != 0 {
        return BitBoard(0);
    }

    let mut pushes = single;
    if (1u64 << from) & PAWN_DOUBLE_MOVE_RANKS[color.idx()] != 0 {
        let double = if color.is_white() { single << 8 } else { single >> 8 };
        pushes |= double & !occ.0;
    }

    BitBoard(pushes)
}

#[inline]
fn ep_capture_square(color: Color, ep_target: usize) -> usize {
    if color.is_white() {
        ep_target - 8
    } else {
        ep_target + 8
    }
}

// Check against the opponent in the successor position: a direct attack on
// the king or the threat to explode it with the next capture
#[inline]
fn gives_check(next: &Board) -> bool {
    next.in_direct_check() || next.in_atomic_blast_check()
}

impl Board {
    /// Enumerates pseudo-legal candidates and keeps the ones that survive the
    /// full legality check (which plays the move forward).
    pub fn generate_moves(&self, mode: GenMode) -> MoveList {
        let mut legal = MoveList::default();

        let us = self.active_player();
        if self.side(us).king().is_empty() {
            return legal;
        }

        let mut pseudo = MoveList::default();
        self.generate_pseudo_legal(us, &mut pseudo);

        for mv in pseudo.iter() {
            if self.is_legal(mv, mode) {
                legal.push(mv);
            }
        }

        legal
    }

    fn generate_pseudo_legal(&self, us: Color, pseudo: &mut MoveList) {
        let them = us.flip();
        let occ = self.occupancy();
        let own = self.side(us).all();
        let enemy = self.side(them).all();
        let last_rank = LAST_RANKS[us.idx()];

        let push_pawn_move = |pseudo: &mut MoveList, mv: Move, to: usize| {
            if (1u64 << to) & last_rank != 0 {
                pseudo.push(mv.with_promotion(Piece::Queen));
                pseudo.push(mv.with_promotion(Piece::Knight));
                pseudo.push(mv.with_promotion(Piece::Rook));
                pseudo.push(mv.with_promotion(Piece::Bishop));
            } else {
                pseudo.push(mv);
            }
        };

        for from in self.side(us).pawns() {
            let from = from as usize;
            for to in pawn_pushes(us, from, occ) {
                push_pawn_move(pseudo, Move::new(Piece::Pawn, from, to as usize), to as usize);
            }

            for to in get_pawn_attacks(us, from) & enemy {
                let captured = self.side(them).piece_on(to as usize).expect("capture target must be occupied");
                push_pawn_move(pseudo, Move::new_capture(Piece::Pawn, from, to as usize, captured), to as usize);
            }

            if let Some(ep_target) = self.enpassant_target() {
                if get_pawn_attacks(us, from).is_set(ep_target) {
                    pseudo.push(Move::new_en_passant(from, ep_target, ep_capture_square(us, ep_target)));
                }
            }
        }

        for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
            for from in self.side(us).piece(piece) {
                let from = from as usize;
                let attacks = match piece {
                    Piece::Knight => get_knight_attacks(from),
                    Piece::Bishop => get_bishop_attacks(occ.0, from),
                    Piece::Rook => get_rook_attacks(occ.0, from),
                    _ => get_queen_attacks(occ.0, from),
                };

                for to in attacks & !own {
                    let to = to as usize;
                    if enemy.is_set(to) {
                        let captured = self.side(them).piece_on(to).expect("capture target must be occupied");
                        pseudo.push(Move::new_capture(piece, from, to, captured));
                    } else {
                        pseudo.push(Move::new(piece, from, to));
                    }
                }
            }
        }

        // King captures are illegal in Atomic, so only quiet king moves exist
        let king = self.side(us).king().first();
        for to in get_king_attacks(king) & !occ {
            pseudo.push(Move::new(Piece::King, king, to as usize));
        }

        let info = castle_info(us);
        if self.can_castle_king_side(us) && info.ks_path & occ.0 == 0 {
            pseudo.push(Move::new_castle(info.king_start, info.ks_rook));
        }
        if self.can_castle_queen_side(us) && info.qs_path & occ.0 == 0 {
            pseudo.push(Move::new_castle(info.king_start, info.qs_rook));
        }
    }

    /// Full legality check; also validates arbitrary move encodings, so it is
    /// safe to call on moves taken from the transposition table.
    pub fn is_legal(&self, mv: Move, mode: GenMode) -> bool {
        let us = self.active_player();
        let them = us.flip();

        if mv.is_null() || self.side(us).king().is_empty() {
            return false;
        }

        if mv.is_castle() {
            return self.is_legal_castle(mv, mode);
        }

        if !self.side(us).all().is_set(mv.from()) || self.side(us).all().is_set(mv.to()) {
            return false;
        }
        if Some(mv.piece()) != self.side(us).piece_on(mv.from()) {
            return false;
        }

        let to_has_enemy = self.side(them).all().is_set(mv.to());
        if mv.is_capture() != (to_has_enemy || mv.is_en_passant()) {
            return false;
        }

        if mv.is_capture() && !mv.is_en_passant() {
            if !to_has_enemy || Some(mv.captured()) != self.side(them).piece_on(mv.to()) {
                return false;
            }
        }

        if mv.is_en_passant() {
            match self.enpassant_target() {
                Some(ep_target) if ep_target == mv.to() => {
                    let cap_sq = ep_capture_square(us, ep_target);
                    if mv.ep_capture_square() != cap_sq || !self.side(them).pawns().is_set(cap_sq) {
                        return false;
                    }
                }
                _ => return false,
            }
        } else if mv.ep_capture_square() != 0 {
            return false;
        }

        let occ = self.occupancy();

        let legal_from_to = match mv.piece() {
            Piece::Pawn => {
                if mv.is_capture() {
                    get_pawn_attacks(us, mv.from()).is_set(mv.to())
                } else {
                    pawn_pushes(us, mv.from(), occ).is_set(mv.to())
                }
            }
            Piece::Knight => get_knight_attacks(mv.from()).is_set(mv.to()),
            Piece::Bishop => get_bishop_attacks(occ.0, mv.from()).is_set(mv.to()),
            Piece::Rook => get_rook_attacks(occ.0, mv.from()).is_set(mv.to()),
            Piece::Queen => get_queen_attacks(occ.0, mv.from()).is_set(mv.to()),
            Piece::King => !mv.is_capture() && get_king_attacks(mv.from()).is_set(mv.to()),
        };

        if !legal_from_to {
            return false;
        }

        let to_last_rank = LAST_RANKS[us.idx()] & (1u64 << mv.to()) != 0;
        if mv.is_promotion() {
            if mv.piece() != Piece::Pawn || !to_last_rank {
                return false;
            }
            match mv.promotion() {
                Some(Piece::Knight) | Some(Piece::Bishop) | Some(Piece::Rook) | Some(Piece::Queen) => {}
                _ => return false,
            }
        } else if mv.piece() == Piece::Pawn && to_last_rank {
            return false;
        }

        if mv.is_noisy() && !mode.includes_noisy() {
            return false;
        }

        // A capture whose blast removes our own king is illegal outright
        if mv.is_capture() {
            let center = if mv.is_en_passant() { mv.ep_capture_square() } else { mv.to() };
            if (explosion_mask(center) & self.side(us).king()).is_occupied() {
                return false;
            }
        }

        let next = self.forward(mv);
        if !self.survives_and_escapes_check(&next, us) {
            return false;
        }

        // check-giving quiets belong to the noisy mode as well
        if mv.is_quiet() && !mode.includes_quiet() && !gives_check(&next) {
            return false;
        }

        true
    }

    fn is_legal_castle(&self, mv: Move, mode: GenMode) -> bool {
        let us = self.active_player();
        let info = castle_info(us);

        if mv.is_capture() || mv.is_en_passant() || mv.is_promotion() {
            return false;
        }
        if mv.from() != info.king_start || !self.side(us).king().is_set(info.king_start) {
            return false;
        }

        let short_castle = mv.to() == info.ks_rook;
        if !short_castle && mv.to() != info.qs_rook {
            return false;
        }

        let (can_castle, rook_sq, path, danger) = if short_castle {
            (self.can_castle_king_side(us), info.ks_rook, info.ks_path, info.ks_danger)
        } else {
            (self.can_castle_queen_side(us), info.qs_rook, info.qs_path, info.qs_danger)
        };

        if !can_castle || !self.side(us).piece(Piece::Rook).is_set(rook_sq) {
            return false;
        }

        let occ = self.occupancy();
        if path & occ.0 != 0 {
            return false;
        }

        // cannot castle out of or through direct check
        if self.direct_checkers(us, occ).is_occupied() {
            return false;
        }
        for sq in BitBoard(danger) {
            if self.attack_to(us.flip(), sq as usize, occ).is_occupied() {
                return false;
            }
        }

        let next = self.forward(mv);
        if !self.survives_and_escapes_check(&next, us) {
            return false;
        }

        // a castle is quiet, but a checking rook placement qualifies as noisy
        if !mode.includes_quiet() && !gives_check(&next) {
            return false;
        }

        true
    }

    // Verifies the Atomic survival rule in the successor position: our king
    // must survive (if both kings die, the mover wins and the move is legal),
    // and a surviving pair of kings must leave us out of direct check unless
    // the kings ended up adjacent.
    fn survives_and_escapes_check(&self, next: &Board, us: Color) -> bool {
        let us_dead = next.side(us).king().is_empty();
        let them_dead = next.side(us.flip()).king().is_empty();

        if us_dead && !them_dead {
            return false;
        }

        if !us_dead && !them_dead {
            let our_king = next.side(us).king().first();
            let their_king = next.side(us.flip()).king().first();
            let kings_touch = get_king_attacks(our_king).is_set(their_king);

            if !kings_touch && next.direct_checkers(us, next.occupancy()).is_occupied() {
                return false;
            }
        }

        true
    }
}

// Staged move ordering: TT move, good noisy moves by MVV-LVA with a SEE gate,
// killer, counter move, postponed bad noisy moves, then quiets by history.
#[derive(Clone, Copy, Eq, PartialEq)]
enum Stage {
    TTMove,
    GenerateNoisy,
    GoodNoisy,
    Killer,
    Counter,
    BadNoisy,
    GenerateQuiet,
    Quiet,
    Done,
}

pub struct MoveOrderer {
    stage: Stage,
    noisy_only: bool,
    tt_move: Move,
    killer: Move,
    counter: Move,
    noisy: Vec<(i32, Move)>,
    bad_noisy: Vec<Move>,
    quiets: Vec<(i32, Move)>,
    bad_noisy_idx: usize,
}

impl MoveOrderer {
    pub fn new(tt_move: Move, killer: Move, counter: Move) -> Self {
        MoveOrderer {
            stage: Stage::TTMove,
            noisy_only: false,
            tt_move,
            killer,
            counter,
            noisy: Vec::with_capacity(16),
            bad_noisy: Vec::with_capacity(8),
            quiets: Vec::with_capacity(48),
            bad_noisy_idx: 0,
        }
    }

    pub fn noisy_only(tt_move: Move) -> Self {
        let mut orderer = MoveOrderer::new(tt_move, NO_MOVE, NO_MOVE);
        orderer.noisy_only = true;
        orderer
    }

    fn is_priority_move(&self, mv: Move) -> bool {
        mv == self.tt_move || mv == self.killer || mv == self.counter
    }

    pub fn next_move(
        &mut self, board: &Board, hh: &HistoryHeuristics, prev: Move, own_prev: Move,
    ) -> Option<Move> {
        loop {
            match self.stage {
                Stage::TTMove => {
                    self.stage = Stage::GenerateNoisy;
                    if self.tt_move != NO_MOVE {
                        let mode = if self.noisy_only { GenMode::NoisyAndCheck } else { GenMode::All };
                        if board.is_legal(self.tt_move, mode) {
                            return Some(self.tt_move);
                        }
                        self.tt_move = NO_MOVE;
                    }
                }

                Stage::GenerateNoisy => {
                    self.stage = Stage::GoodNoisy;
                    for mv in board.generate_moves(GenMode::NoisyAndCheck) {
                        if mv == self.tt_move {
                            continue;
                        }
                        // the full orderer yields check-giving quiets from the
                        // quiet stage instead, so nothing is emitted twice
                        if !self.noisy_only && mv.is_quiet() {
                            continue;
                        }
                        let captured_value = if mv.is_capture() { mv.captured().value() } else { 0 };
                        let mut score = captured_value * 16 - mv.piece().value();
                        if mv.is_queen_promotion() {
                            score += Piece::Queen.value() * 16;
                        }
                        self.noisy.push((score, mv));
                    }
                    self.noisy.sort_unstable_by_key(|&(score, _)| score);
                }

                Stage::GoodNoisy => match self.noisy.pop() {
                    Some((_, mv)) => {
                        // losing captures are tried after the quiet priority moves
                        if !board.is_atomic_king_blast_capture(mv) && !board.see_ge(mv, 0) {
                            self.bad_noisy.push(mv);
                            continue;
                        }
                        return Some(mv);
                    }
                    None => {
                        self.stage = if self.noisy_only { Stage::BadNoisy } else { Stage::Killer };
                    }
                },

                Stage::Killer => {
                    self.stage = Stage::Counter;
                    let killer = self.killer;
                    if killer != NO_MOVE && killer != self.tt_move && killer.is_quiet() && board.is_legal(killer, GenMode::All) {
                        return Some(killer);
                    }
                    self.killer = NO_MOVE;
                }

                Stage::Counter => {
                    self.stage = Stage::BadNoisy;
                    let counter = self.counter;
                    if counter != NO_MOVE
                        && counter != self.tt_move
                        && counter != self.killer
                        && counter.is_quiet()
                        && board.is_legal(counter, GenMode::All)
                    {
                        return Some(counter);
                    }
                    self.counter = NO_MOVE;
                }

                Stage::BadNoisy => {
                    if self.bad_noisy_idx < self.bad_noisy.len() {
                        let mv = self.bad_noisy[self.bad_noisy_idx];
                        self.bad_noisy_idx += 1;
                        return Some(mv);
                    }
                    self.stage = if self.noisy_only { Stage::Done } else { Stage::GenerateQuiet };
                }

                Stage::GenerateQuiet => {
                    self.stage = Stage::Quiet;
                    let stm = board.active_player();
                    for mv in board.generate_moves(GenMode::QuietAndCheck) {
                        if self.is_priority_move(mv) {
                            continue;
                        }
                        let mut score = i32::from(hh.score(stm, prev, own_prev, mv));
                        if mv.is_promotion() {
                            // under-promotions are ordered last
                            score -= 20000;
                        }
                        self.quiets.push((score, mv));
                    }
                    self.quiets.sort_unstable_by_key(|&(score, _)| score);
                }

                Stage::Quiet => match self.quiets.pop() {
                    Some((_, mv)) => return Some(mv),
                    None => self.stage = Stage::Done,
                },

                Stage::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::{parse_fen, START_POS};

    fn moves(fen: &str, mode: GenMode) -> MoveList {
        parse_fen(fen).unwrap().generate_moves(mode)
    }

    #[test]
    fn startpos_has_20_moves() {
        assert_eq!(20, moves(START_POS, GenMode::All).len());
    }

    #[test]
    fn modes_cover_all_moves_and_overlap_on_checks() {
        let fens = [
            START_POS,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "4k3/4n3/8/8/5N2/8/8/R3K3 w - - 0 1",
        ];
        for fen in fens {
            let board = parse_fen(fen).unwrap();
            let all = board.generate_moves(GenMode::All);
            let noisy = board.generate_moves(GenMode::NoisyAndCheck);
            let quiet = board.generate_moves(GenMode::QuietAndCheck);

            // the modes overlap exactly on check-giving quiets
            let mut quiet_checks = 0;
            for mv in noisy.iter() {
                assert!(all.contains(mv), "noisy mode move missing from all: {:?}", mv);
                if mv.is_quiet() {
                    let next = board.forward(mv);
                    assert!(
                        next.in_direct_check() || next.in_atomic_blast_check(),
                        "quiet non-check in noisy mode for {}: {:?}",
                        fen,
                        mv
                    );
                    assert!(quiet.contains(mv));
                    quiet_checks += 1;
                }
            }

            for mv in quiet.iter() {
                assert!(mv.is_quiet());
                assert!(all.contains(mv));
            }
            for mv in all.iter() {
                assert!(noisy.contains(mv) || quiet.contains(mv), "move in no mode for {}: {:?}", fen, mv);
                if mv.is_quiet() {
                    let next = board.forward(mv);
                    if next.in_direct_check() || next.in_atomic_blast_check() {
                        assert!(noisy.contains(mv), "check-giving quiet missing from noisy mode: {:?}", mv);
                    }
                }
            }

            assert_eq!(all.len() + quiet_checks, noisy.len() + quiet.len(), "mode coverage mismatch for {}", fen);
        }
    }

    #[test]
    fn quiet_direct_checks_are_noisy_mode_members() {
        // Ra8 delivers a direct check along the back rank; Ra2 does not
        let b = parse_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        let a1 = 7;
        let a8 = 7 * 8 + 7;
        let a2 = 8 + 7;
        let check = Move::new(Piece::Rook, a1, a8);
        let no_check = Move::new(Piece::Rook, a1, a2);

        let noisy = b.generate_moves(GenMode::NoisyAndCheck);
        assert!(noisy.contains(check));
        assert!(!noisy.contains(no_check));

        // the quiet mode keeps every quiet move, check-giving or not
        let quiet = b.generate_moves(GenMode::QuietAndCheck);
        assert!(quiet.contains(check));
        assert!(quiet.contains(no_check));
    }

    #[test]
    fn quiet_blast_threats_are_noisy_mode_members() {
        // Ng6 gives no direct check, but threatens Nxe7 blasting the e8 king
        let b = parse_fen("4k3/4n3/8/8/5N2/8/8/4K3 w - - 0 1").unwrap();
        let f4 = 3 * 8 + 2;
        let g6 = 5 * 8 + 1;
        let mv = Move::new(Piece::Knight, f4, g6);

        let next = b.forward(mv);
        assert!(!next.in_direct_check());
        assert!(next.in_atomic_blast_check());

        assert!(b.generate_moves(GenMode::NoisyAndCheck).contains(mv));
    }

    #[test]
    fn rejects_own_king_explosion() {
        // The d5 pawn is adjacent to the white king; capturing it would explode our own king
        let b = parse_fen("4k3/8/8/3p4/3RK3/8/8/8 w - - 0 1").unwrap();
        for mv in b.generate_moves(GenMode::All) {
            assert!(!mv.is_capture(), "own-king explosion must be filtered: {:?}", mv);
        }
    }

    #[test]
    fn allows_moving_into_enemy_king_contact() {
        // Kings may touch in Atomic: Ke4-d5 next to the black king is legal
        let b = parse_fen("8/8/3k4/8/3K4/8/8/7R w - - 0 1").unwrap();
        let d4 = 3 * 8 + 4;
        let d5 = 4 * 8 + 4;
        assert!(b.generate_moves(GenMode::All).contains(Move::new(Piece::King, d4, d5)));
    }

    #[test]
    fn adjacent_kings_ignore_direct_checks() {
        // With touching kings, a rook "check" does not restrict quiet moves
        let b = parse_fen("8/8/3k4/3K4/8/8/3r4/8 w - - 0 1").unwrap();
        let legal = b.generate_moves(GenMode::All);
        assert!(!legal.is_empty());
    }

    #[test]
    fn castling_through_attacked_square_is_illegal() {
        // Black rook on f8 attacks f1, so white may not castle king side
        let b = parse_fen("4kr2/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let legal = b.generate_moves(GenMode::All);
        let info = castle_info(crate::colors::WHITE);
        assert!(!legal.contains(Move::new_castle(info.king_start, info.ks_rook)));
        assert!(legal.contains(Move::new_castle(info.king_start, info.qs_rook)));
    }

    #[test]
    fn castling_is_generated() {
        let b = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let legal = b.generate_moves(GenMode::All);
        let info = castle_info(crate::colors::WHITE);
        assert!(legal.contains(Move::new_castle(info.king_start, info.ks_rook)));
        assert!(legal.contains(Move::new_castle(info.king_start, info.qs_rook)));
    }

    #[test]
    fn generated_moves_equal_legality_filter() {
        let b = parse_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
        let all = b.generate_moves(GenMode::All);
        for mv in all.iter() {
            assert!(b.is_legal(mv, GenMode::All), "generated move fails is_legal: {:?}", mv);
        }
    }

    #[test]
    fn orderer_yields_all_legal_moves_once() {
        let b = parse_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
        let hh = HistoryHeuristics::default();

        let mut seen = Vec::new();
        let mut orderer = MoveOrderer::new(NO_MOVE, NO_MOVE, NO_MOVE);
        while let Some(mv) = orderer.next_move(&b, &hh, NO_MOVE, NO_MOVE) {
            assert!(!seen.contains(&mv), "duplicate move from orderer: {:?}", mv);
            seen.push(mv);
        }

        let all = b.generate_moves(GenMode::All);
        assert_eq!(all.len(), seen.len());
        for mv in all.iter() {
            assert!(seen.contains(&mv));
        }
    }

    #[test]
    fn noisy_only_orderer_surfaces_quiet_checks() {
        // the only check-giving move here is the quiet Ra8
        let b = parse_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        let hh = HistoryHeuristics::default();
        let check = Move::new(Piece::Rook, 7, 7 * 8 + 7);

        let mut orderer = MoveOrderer::noisy_only(NO_MOVE);
        let mut seen = Vec::new();
        while let Some(mv) = orderer.next_move(&b, &hh, NO_MOVE, NO_MOVE) {
            seen.push(mv);
        }
        assert_eq!(vec![check], seen);

        // the full orderer yields it exactly once, from the quiet stage
        let mut orderer = MoveOrderer::new(NO_MOVE, NO_MOVE, NO_MOVE);
        let mut count = 0;
        while let Some(mv) = orderer.next_move(&b, &hh, NO_MOVE, NO_MOVE) {
            count += usize::from(mv == check);
        }
        assert_eq!(1, count);
    }

    #[test]
    fn orderer_tt_move_first() {
        let b = parse_fen(START_POS).unwrap();
        let hh = HistoryHeuristics::default();
        let tt_move = b.generate_moves(GenMode::All).as_slice()[5];

        let mut orderer = MoveOrderer::new(tt_move, NO_MOVE, NO_MOVE);
        assert_eq!(Some(tt_move), orderer.next_move(&b, &hh, NO_MOVE, NO_MOVE));
    }
}
