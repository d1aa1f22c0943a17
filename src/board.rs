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

pub mod castling;
pub mod cycledetection;

use crate::bitboard::{
    col_of, explosion_mask, get_bishop_attacks, get_king_attacks, get_knight_attacks, get_pawn_attacks,
    get_queen_attacks, get_rook_attacks, v_mirror, BitBoard,
};
use crate::board::castling::{castle_info, CastlingState};
use crate::colors::{Color, BLACK, WHITE};
use crate::moves::Move;
use crate::pieces::{Piece, ALL_PIECES};
use crate::zobrist::{castling_zobrist_key, enpassant_zobrist_key, piece_zobrist_key, player_zobrist_key};

pub const NO_EP: u8 = 64;

// Piece planes are removed by blasts for every type except pawns
const BLAST_PIECES: [Piece; 5] = [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen, Piece::King];

/// Piece planes and occupancy for one color
#[derive(Copy, Clone, Default, Eq, PartialEq, Debug)]
pub struct SideBoards {
    planes: [u64; 6],
    all: u64,
}

impl SideBoards {
    #[inline(always)]
    pub fn piece(&self, piece: Piece) -> BitBoard {
        BitBoard(unsafe { *self.planes.get_unchecked(piece.idx()) })
    }

    #[inline(always)]
    pub fn all(&self) -> BitBoard {
        BitBoard(self.all)
    }

    #[inline(always)]
    pub fn pawns(&self) -> BitBoard {
        self.piece(Piece::Pawn)
    }

    #[inline(always)]
    pub fn king(&self) -> BitBoard {
        self.piece(Piece::King)
    }

    pub fn piece_on(&self, pos: usize) -> Option<Piece> {
        if self.all & (1 << pos as u64) == 0 {
            return None;
        }
        ALL_PIECES.into_iter().find(|&piece| self.piece(piece).is_set(pos))
    }

    #[inline]
    fn flip(&mut self, piece: Piece, pos: usize) {
        let mask = 1 << pos as u64;
        unsafe {
            *self.planes.get_unchecked_mut(piece.idx()) ^= mask;
        }
        self.all ^= mask;
    }
}

/// The per-color Zobrist half hashes used for upcoming-cycle detection
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct SidedHash {
    halves: [u64; 2],
}

impl SidedHash {
    #[inline(always)]
    pub fn us(&self, color: Color) -> u64 {
        self.halves[color.idx()]
    }

    #[inline(always)]
    pub fn them(&self, color: Color) -> u64 {
        self.halves[color.flip().idx()]
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Board {
    sides: [SideBoards; 2],
    castling: CastlingState,
    ep: u8,
    pub halfmove_clock: u16,
    pub ply_count: u16,
    half_hash: [u64; 2],
    pawn_hash: u64,
}

impl Board {
    pub fn empty() -> Self {
        Board {
            sides: [SideBoards::default(); 2],
            castling: CastlingState::default(),
            ep: NO_EP,
            halfmove_clock: 0,
            ply_count: 0,
            half_hash: [0; 2],
            pawn_hash: 0,
        }
    }

    #[inline(always)]
    pub fn active_player(&self) -> Color {
        Color::from_ply_count(self.ply_count)
    }

    #[inline(always)]
    pub fn side(&self, color: Color) -> &SideBoards {
        unsafe { self.sides.get_unchecked(color.idx()) }
    }

    #[inline(always)]
    pub fn us(&self) -> &SideBoards {
        self.side(self.active_player())
    }

    #[inline(always)]
    pub fn them(&self) -> &SideBoards {
        self.side(self.active_player().flip())
    }

    #[inline(always)]
    pub fn occupancy(&self) -> BitBoard {
        BitBoard(self.sides[0].all | self.sides[1].all)
    }

    pub fn piece_on(&self, pos: usize) -> Option<(Color, Piece)> {
        for color in [WHITE, BLACK] {
            if let Some(piece) = self.side(color).piece_on(pos) {
                return Some((color, piece));
            }
        }
        None
    }

    pub fn add_piece(&mut self, color: Color, piece: Piece, pos: usize) {
        debug_assert!(!self.occupancy().is_set(pos));
        self.sides[color.idx()].flip(piece, pos);
        let key = piece_zobrist_key(color, piece, pos);
        self.half_hash[color.idx()] ^= key;
        if piece == Piece::Pawn {
            self.pawn_hash ^= key;
        }
    }

    pub fn remove_piece(&mut self, color: Color, piece: Piece, pos: usize) {
        debug_assert!(self.side(color).piece(piece).is_set(pos));
        self.sides[color.idx()].flip(piece, pos);
        let key = piece_zobrist_key(color, piece, pos);
        self.half_hash[color.idx()] ^= key;
        if piece == Piece::Pawn {
            self.pawn_hash ^= key;
        }
    }

    pub fn set_castling_state(&mut self, state: CastlingState) {
        self.castling = state;
    }

    pub fn castling_state(&self) -> CastlingState {
        self.castling
    }

    pub fn can_castle_king_side(&self, color: Color) -> bool {
        self.castling.can_castle_king_side(color)
    }

    pub fn can_castle_queen_side(&self, color: Color) -> bool {
        self.castling.can_castle_queen_side(color)
    }

    pub fn any_castling(&self) -> bool {
        self.castling.any_castling()
    }

    /// Sets the en passant target, but only when an enemy pawn can actually capture onto it.
    /// A target above the middle of the board belongs to a black double push.
    pub fn set_enpassant_target(&mut self, pos: usize) {
        let moved = if pos >= 32 { BLACK } else { WHITE };
        if (get_pawn_attacks(moved, pos) & self.side(moved.flip()).pawns()).is_occupied() {
            self.ep = pos as u8;
        }
    }

    #[inline(always)]
    pub fn enpassant_target(&self) -> Option<usize> {
        if self.ep == NO_EP {
            None
        } else {
            Some(self.ep as usize)
        }
    }

    pub fn num_pieces(&self) -> u32 {
        self.occupancy().piece_count()
    }

    pub fn fullmove_count(&self) -> u16 {
        self.ply_count / 2 + 1
    }

    // Hashes

    pub fn hash(&self) -> u64 {
        let mut hash = self.half_hash[0] ^ self.half_hash[1] ^ castling_zobrist_key(self.castling.bits());
        if self.ep != NO_EP {
            hash ^= enpassant_zobrist_key(col_of(self.ep as usize));
        }
        if self.active_player().is_black() {
            hash ^= player_zobrist_key();
        }
        hash
    }

    pub fn pawn_hash(&self) -> u64 {
        self.pawn_hash
    }

    pub fn sided_hash(&self) -> SidedHash {
        SidedHash { halves: self.half_hash }
    }

    /// Recomputes all hashes from the piece planes (test oracle for the incremental updates)
    pub fn recompute_hashes(&self) -> (u64, u64, SidedHash) {
        let mut halves = [0u64; 2];
        let mut pawn_hash = 0u64;
        for color in [WHITE, BLACK] {
            for piece in ALL_PIECES {
                for pos in self.side(color).piece(piece) {
                    let key = piece_zobrist_key(color, piece, pos as usize);
                    halves[color.idx()] ^= key;
                    if piece == Piece::Pawn {
                        pawn_hash ^= key;
                    }
                }
            }
        }

        let mut hash = halves[0] ^ halves[1] ^ castling_zobrist_key(self.castling.bits());
        if self.ep != NO_EP {
            hash ^= enpassant_zobrist_key(col_of(self.ep as usize));
        }
        if self.active_player().is_black() {
            hash ^= player_zobrist_key();
        }

        (hash, pawn_hash, SidedHash { halves })
    }

    // Attack queries

    /// All pieces of `attacker` that attack `tgt` under the given occupancy.
    /// King attackers are excluded, since kings cannot capture in Atomic.
    pub fn attack_to(&self, attacker: Color, tgt: usize, occ: BitBoard) -> BitBoard {
        let side = self.side(attacker);
        let mut result = get_pawn_attacks(attacker.flip(), tgt) & side.pawns();
        result = result | (get_knight_attacks(tgt) & side.piece(Piece::Knight));

        let diag = get_bishop_attacks(occ.0, tgt);
        let ortho = get_rook_attacks(occ.0, tgt);
        result = result | (diag & (side.piece(Piece::Bishop) | side.piece(Piece::Queen)));
        result = result | (ortho & (side.piece(Piece::Rook) | side.piece(Piece::Queen)));

        result
    }

    /// Direct (classical) checkers against the king of `color`
    pub fn direct_checkers(&self, color: Color, occ: BitBoard) -> BitBoard {
        let king = self.side(color).king();
        if king.is_empty() {
            return BitBoard(0);
        }
        self.attack_to(color.flip(), king.first(), occ)
    }

    fn kings_touch(&self) -> bool {
        let white_king = self.side(WHITE).king();
        let black_king = self.side(BLACK).king();
        if white_king.is_empty() || black_king.is_empty() {
            return false;
        }
        (get_king_attacks(white_king.first()) & black_king).is_occupied()
    }

    /// Direct attack on the king of the side to move, with the adjacency
    /// shield. Cheaper than `is_check` and used to classify check-giving moves.
    pub fn in_direct_check(&self) -> bool {
        let us = self.active_player();
        if self.side(us).king().is_empty() {
            return true;
        }
        if self.kings_touch() {
            return false;
        }
        self.direct_checkers(us, self.occupancy()).is_occupied()
    }

    /// Direct check on the side to move. Adjacent kings shield each other from
    /// all direct checks; a missing own king counts as check.
    pub fn is_check(&self) -> bool {
        let us = self.active_player();
        if self.side(us).king().is_empty() {
            return true;
        }
        if self.kings_touch() {
            return false;
        }
        self.king_capturable_by(us.flip())
    }

    // True when `attacker` has a capture that removes the defending king while
    // keeping its own. Direct captures onto the king square count as well, so
    // this doubles as the classical check test.
    fn king_capturable_by(&self, attacker: Color) -> bool {
        let defender = attacker.flip();
        if self.side(defender).king().is_empty() {
            return false;
        }

        let occ = self.occupancy();
        let victims = self.side(defender).all();

        let good_capture = |after: &Board| {
            after.side(defender).king().is_empty() && after.side(attacker).king().is_occupied()
        };

        for from in self.side(attacker).pawns() {
            for to in get_pawn_attacks(attacker, from as usize) & victims {
                let captured = self.side(defender).piece_on(to as usize).unwrap_or(Piece::Pawn);
                let mv = Move::new_capture(Piece::Pawn, from as usize, to as usize, captured);
                if good_capture(&self.forward_for(attacker, mv)) {
                    return true;
                }
            }
        }

        for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
            for from in self.side(attacker).piece(piece) {
                let attacks = match piece {
                    Piece::Knight => get_knight_attacks(from as usize),
                    Piece::Bishop => get_bishop_attacks(occ.0, from as usize),
                    Piece::Rook => get_rook_attacks(occ.0, from as usize),
                    _ => get_queen_attacks(occ.0, from as usize),
                };

                for to in attacks & victims {
                    let captured = self.side(defender).piece_on(to as usize).unwrap_or(Piece::Pawn);
                    let mv = Move::new_capture(piece, from as usize, to as usize, captured);
                    if good_capture(&self.forward_for(attacker, mv)) {
                        return true;
                    }
                }
            }
        }

        false
    }

    /// True when `side` can explode the enemy king with an immediate capture
    pub fn has_atomic_blast_capture_for(&self, side: Color) -> bool {
        let enemy_king = self.side(side.flip()).king();
        if enemy_king.is_empty() {
            return false;
        }

        let king_zone = explosion_mask(enemy_king.first());
        let our_king = self.side(side).king();
        let occ = self.occupancy();

        for target in king_zone & self.side(side.flip()).all() {
            // a capture that would explode our own king is illegal
            if (explosion_mask(target as usize) & our_king).is_occupied() {
                continue;
            }
            if self.attack_to(side, target as usize, occ).is_occupied() {
                return true;
            }
        }

        false
    }

    pub fn has_atomic_blast_capture(&self) -> bool {
        self.has_atomic_blast_capture_for(self.active_player())
    }

    /// Blast-check: the opponent threatens to explode our king
    pub fn in_atomic_blast_check(&self) -> bool {
        self.has_atomic_blast_capture_for(self.active_player().flip())
    }

    /// True iff this capture detonates the enemy king (an immediate win)
    pub fn is_atomic_king_blast_capture(&self, mv: Move) -> bool {
        if !mv.is_capture() {
            return false;
        }

        let center = if mv.is_en_passant() { mv.ep_capture_square() } else { mv.to() };
        (explosion_mask(center) & self.them().king()).is_occupied()
    }

    // State transition

    /// Returns the successor position. Null moves advance the clocks and clear
    /// the en passant target, nothing else.
    pub fn forward(&self, mv: Move) -> Board {
        self.forward_for(self.active_player(), mv)
    }

    fn forward_for(&self, us: Color, mv: Move) -> Board {
        let mut copy = *self;
        copy.ep = NO_EP;
        copy.ply_count += 1;
        copy.halfmove_clock += 1;

        if mv.is_null() {
            return copy;
        }

        let them = us.flip();
        let info = castle_info(us);

        let mut placed = mv.piece();
        copy.remove_piece(us, mv.piece(), mv.from());

        if mv.is_castle() {
            copy.castling.clear(us);
            if mv.to() == info.ks_rook {
                copy.remove_piece(us, Piece::Rook, info.ks_rook);
                copy.add_piece(us, Piece::King, info.ks_king_end);
                copy.add_piece(us, Piece::Rook, info.ks_rook_end);
            } else {
                copy.remove_piece(us, Piece::Rook, info.qs_rook);
                copy.add_piece(us, Piece::King, info.qs_king_end);
                copy.add_piece(us, Piece::Rook, info.qs_rook_end);
            }
        } else {
            if let Some(promotion) = mv.promotion() {
                placed = promotion;
            }
            copy.add_piece(us, placed, mv.to());
        }

        if mv.from() == info.king_start && mv.piece() == Piece::King {
            copy.castling.clear(us);
        }
        if mv.from() == info.ks_rook {
            copy.castling.clear_king_side(us);
        }
        if mv.from() == info.qs_rook {
            copy.castling.clear_queen_side(us);
        }

        if mv.is_capture() {
            // For en passant the blast is centred on the captured pawn's
            // square, not on the moving pawn's destination.
            let center = if mv.is_en_passant() {
                copy.remove_piece(them, Piece::Pawn, mv.ep_capture_square());
                mv.ep_capture_square()
            } else {
                copy.remove_piece(them, mv.captured(), mv.to());
                mv.to()
            };

            // The capturing piece explodes as well
            copy.remove_piece(us, placed, mv.to());

            let blast = explosion_mask(center);
            for color in [WHITE, BLACK] {
                for piece in BLAST_PIECES {
                    for pos in copy.side(color).piece(piece) & blast {
                        copy.remove_piece(color, piece, pos as usize);
                    }
                }
            }
        }

        // Any rook home square that no longer holds a rook forfeits its right
        for color in [WHITE, BLACK] {
            let info = castle_info(color);
            let rooks = copy.side(color).piece(Piece::Rook);
            if copy.castling.can_castle_king_side(color) && !rooks.is_set(info.ks_rook) {
                copy.castling.clear_king_side(color);
            }
            if copy.castling.can_castle_queen_side(color) && !rooks.is_set(info.qs_rook) {
                copy.castling.clear_queen_side(color);
            }
        }

        if mv.piece() == Piece::Pawn && mv.to().abs_diff(mv.from()) == 16 {
            copy.set_enpassant_target((mv.from() + mv.to()) / 2);
        }

        if mv.is_capture() || mv.piece() == Piece::Pawn {
            copy.halfmove_clock = 0;
        }

        copy
    }

    // Search support queries

    pub fn has_non_pawn_material(&self) -> bool {
        let us = self.us();
        (us.piece(Piece::Knight) | us.piece(Piece::Bishop) | us.piece(Piece::Rook) | us.piece(Piece::Queen))
            .is_occupied()
    }

    pub fn is_rule50_draw(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// Game phase in [0, 1]; used only for display purposes
    pub fn phase(&self) -> f64 {
        const PHASE_VALUES: [u32; 6] = [0, 1, 1, 2, 4, 0];
        let mut value = 0;
        for piece in ALL_PIECES {
            value += PHASE_VALUES[piece.idx()]
                * (self.side(WHITE).piece(piece) | self.side(BLACK).piece(piece)).piece_count();
        }
        f64::from(value.min(24)) / 24.0
    }

    /// Threats by `side` against higher-valued or undefended enemy pieces
    pub fn threat_mask(&self, side: Color) -> BitBoard {
        let occ = self.occupancy();
        let them = self.side(side.flip());
        let us = self.side(side);

        let mut threats = BitBoard(0);
        let mut vulnerable = them.all();

        vulnerable = vulnerable & !them.pawns();
        let mut pawn_attacks = BitBoard(0);
        for pos in us.pawns() {
            pawn_attacks = pawn_attacks | get_pawn_attacks(side, pos as usize);
        }
        threats = threats | (pawn_attacks & vulnerable);

        vulnerable = vulnerable & !(them.piece(Piece::Knight) | them.piece(Piece::Bishop));
        let mut minor_attacks = BitBoard(0);
        for pos in us.piece(Piece::Knight) {
            minor_attacks = minor_attacks | get_knight_attacks(pos as usize);
        }
        for pos in us.piece(Piece::Bishop) {
            minor_attacks = minor_attacks | get_bishop_attacks(occ.0, pos as usize);
        }
        threats = threats | (minor_attacks & vulnerable);

        vulnerable = vulnerable & !them.piece(Piece::Rook);
        let mut rook_attacks = BitBoard(0);
        for pos in us.piece(Piece::Rook) {
            rook_attacks = rook_attacks | get_rook_attacks(occ.0, pos as usize);
        }
        threats = threats | (rook_attacks & vulnerable);

        threats
    }

    pub fn them_threat_mask(&self) -> BitBoard {
        self.threat_mask(self.active_player().flip())
    }

    /// True if the quiet move creates a new attack on a vulnerable enemy piece
    pub fn creates_threat(&self, mv: Move) -> bool {
        let us = self.active_player();
        let occ = self.occupancy();
        let them = self.side(us.flip());

        let attacks = |piece: Piece, pos: usize| match piece {
            Piece::Pawn => get_pawn_attacks(us, pos),
            Piece::Knight => get_knight_attacks(pos),
            Piece::Bishop => get_bishop_attacks(occ.0, pos),
            Piece::Rook => get_rook_attacks(occ.0, pos),
            _ => BitBoard(0),
        };

        let current_attacks = attacks(mv.piece(), mv.from());
        let next_attacks = attacks(mv.piece(), mv.to());
        let new_attacks = next_attacks & !current_attacks;

        let vulnerable = match mv.piece() {
            Piece::Pawn => them.all() & !(them.pawns() | them.king()),
            Piece::Knight | Piece::Bishop => them.piece(Piece::Rook) | them.piece(Piece::Queen),
            Piece::Rook => them.piece(Piece::Queen),
            _ => BitBoard(0),
        };

        (new_attacks & vulnerable).is_occupied()
    }

    /// Pawn push towards a square no enemy pawn can contest
    pub fn is_passed_push(&self, mv: Move) -> bool {
        let us = self.active_player();
        mv.piece() == Piece::Pawn
            && !mv.is_capture()
            && crate::bitboard::is_passed_pawn(mv.to(), us, self.side(us.flip()).pawns())
    }

    /// Mirrors the position vertically with swapped colors
    pub fn mirrored(&self) -> Board {
        let mut mirror = Board::empty();

        for color in [WHITE, BLACK] {
            for piece in ALL_PIECES {
                for pos in self.side(color).piece(piece) {
                    mirror.add_piece(color.flip(), piece, v_mirror(pos as usize));
                }
            }
        }

        let mut castling = CastlingState::default();
        for color in [WHITE, BLACK] {
            if self.castling.can_castle_king_side(color) {
                castling.set_king_side(color.flip());
            }
            if self.castling.can_castle_queen_side(color) {
                castling.set_queen_side(color.flip());
            }
        }
        mirror.castling = castling;

        if self.ep != NO_EP {
            mirror.ep = v_mirror(self.ep as usize) as u8;
        }
        mirror.ply_count = self.ply_count ^ 1;
        mirror.halfmove_clock = self.halfmove_clock;

        mirror
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::{parse_fen, write_fen, START_POS};

    fn board(fen: &str) -> Board {
        parse_fen(fen).unwrap()
    }

    #[test]
    fn incremental_hash_matches_recompute_after_forward() {
        let mut positions = vec![board(START_POS)];
        positions.push(board("rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1"));
        positions.push(board("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"));

        for b in positions {
            for mv in b.generate_moves(crate::move_gen::GenMode::All) {
                let next = b.forward(mv);
                let (hash, pawn_hash, sided) = next.recompute_hashes();
                assert_eq!(hash, next.hash(), "hash drift after {:?} from {}", mv, write_fen(&b));
                assert_eq!(pawn_hash, next.pawn_hash(), "pawn hash drift after {:?}", mv);
                assert_eq!(sided, next.sided_hash(), "sided hash drift after {:?}", mv);
            }
        }
    }

    #[test]
    fn blast_removes_non_pawns_only() {
        // Nxd5 explodes the knight, the captured pawn and the ring pieces, but not pawns
        let b = board("4k3/8/2n5/3p4/2PN4/8/8/4K3 w - - 0 1");
        let d5 = 4 * 8 + 4;
        let c4 = 3 * 8 + 5;
        let d4 = 3 * 8 + 4;

        let mv = Move::new_capture(Piece::Knight, d4, d5, Piece::Pawn);
        let next = b.forward(mv);

        assert!(next.side(WHITE).piece(Piece::Knight).is_empty(), "capturer must explode");
        assert!(next.side(BLACK).pawns().is_empty(), "captured pawn is removed");
        assert!(next.side(BLACK).piece(Piece::Knight).is_empty(), "knight on c6 is in the blast");
        assert!(next.side(WHITE).pawns().is_set(c4), "own pawn survives the blast");
        assert!(!next.occupancy().is_set(d4));
    }

    #[test]
    fn en_passant_blast_centers_on_captured_pawn() {
        // After 1. e4 d5 2. e5 f5: exf6 explodes around f5, not f6
        let b = board(START_POS);
        let moves = ["e2e4", "d7d5", "e4e5", "f7f5"];
        let mut b = b;
        for uci in moves {
            let mv = crate::uci_move::UCIMove::from_uci(uci).unwrap().to_move(&b).unwrap();
            b = b.forward(mv);
        }
        assert!(b.enpassant_target().is_some());

        let ep_target = b.enpassant_target().unwrap();
        let f5 = 4 * 8 + 2;
        let e5 = 4 * 8 + 3;
        assert_eq!(5 * 8 + 2, ep_target); // f6

        let mv = Move::new_en_passant(e5, ep_target, f5);
        assert!(b.generate_moves(crate::move_gen::GenMode::All).contains(mv));

        let next = b.forward(mv);
        // both pawns are gone: the captured one and the exploded capturer
        assert!(!next.occupancy().is_set(f5));
        assert!(!next.occupancy().is_set(e5));
        assert!(!next.occupancy().is_set(ep_target));
        assert!(next.side(BLACK).king().is_occupied());
    }

    #[test]
    fn en_passant_blast_reaches_ring_of_captured_pawn() {
        // A knight on e4 sits in the ring of f5 but not of f6: it must explode
        let b = board("4k3/8/8/4Pp2/4n3/8/8/4K3 w - f6 0 1");
        let e5 = 4 * 8 + 3;
        let f5 = 4 * 8 + 2;
        let f6 = 5 * 8 + 2;
        assert_eq!(Some(f6), b.enpassant_target());

        let next = b.forward(Move::new_en_passant(e5, f6, f5));
        assert!(next.side(BLACK).piece(Piece::Knight).is_empty(), "e4 knight is inside the f5 blast");
    }

    #[test]
    fn ep_target_requires_capturable_pawn() {
        // double push with no enemy pawn adjacent leaves ep unset
        let b = board(START_POS);
        let mv = crate::uci_move::UCIMove::from_uci("e2e4").unwrap().to_move(&b).unwrap();
        let next = b.forward(mv);
        assert_eq!(None, next.enpassant_target());
    }

    #[test]
    fn castling_rights_forfeit_on_blast() {
        // Bxg2 explodes the h1 rook, which forfeits the white king-side right
        let b = board("4k3/8/8/8/8/7b/6P1/R3K2R b KQ - 0 1");
        let g2 = 8 + 1;
        let h3 = 2 * 8;
        let mv = Move::new_capture(Piece::Bishop, h3, g2, Piece::Pawn);
        let next = b.forward(mv);
        assert!(!next.side(WHITE).piece(Piece::Rook).is_set(0), "h1 rook must be blasted");
        assert!(!next.can_castle_king_side(WHITE));
        assert!(next.can_castle_queen_side(WHITE));
    }

    #[test]
    fn null_move_flips_side_and_clears_ep() {
        let b = board("rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 2");
        assert!(b.enpassant_target().is_some());
        let next = b.forward(crate::moves::NO_MOVE);
        assert_eq!(b.active_player().flip(), next.active_player());
        assert_eq!(None, next.enpassant_target());
        assert_eq!(b.ply_count + 1, next.ply_count);
    }

    #[test]
    fn kings_touching_suppresses_direct_check() {
        // Kings adjacent; rook "checks" along the e-file but adjacency shields it
        let b = board("8/8/8/4k3/4K3/8/4r3/8 w - - 0 1");
        assert!(!b.is_check());
    }

    #[test]
    fn direct_check_detection() {
        let b = board("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1");
        assert!(b.is_check());
    }

    #[test]
    fn blast_check_detection() {
        // White knight can capture f7, exploding the black king on e8
        let b = board("4k3/5p2/3N4/8/8/8/8/4K3 b - - 0 1");
        assert!(b.in_atomic_blast_check());
        assert!(!b.forward(crate::moves::NO_MOVE).in_atomic_blast_check());
    }

    #[test]
    fn king_blast_capture_detection() {
        let b = board("4k3/5p2/3N4/8/8/8/8/4K3 w - - 0 1");
        let d6 = 5 * 8 + 4;
        let f7 = 6 * 8 + 2;
        let mv = Move::new_capture(Piece::Knight, d6, f7, Piece::Pawn);
        assert!(b.is_atomic_king_blast_capture(mv));

        let next = b.forward(mv);
        assert!(next.side(BLACK).king().is_empty());
    }

    #[test]
    fn phase_bounds() {
        assert!((board(START_POS).phase() - 1.0).abs() < 1e-9);
        assert!(board("4k3/8/8/8/8/8/8/4K3 w - - 0 1").phase() < 1e-9);
    }

    #[test]
    fn mirrored_position_swaps_colors() {
        let b = board("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        let m = b.mirrored();
        assert_eq!(b.side(WHITE).all().piece_count(), m.side(BLACK).all().piece_count());
        assert_eq!(b.active_player().flip(), m.active_player());
        assert_eq!(b, m.mirrored());
    }
}
