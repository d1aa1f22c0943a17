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

//! Static exchange evaluation for Atomic. Captures are scored as the material
//! swing of the blast; quiet moves only risk an immediate recapture on the
//! destination square, which would itself explode.

use crate::bitboard::{explosion_mask, get_king_attacks, BitBoard};
use crate::board::Board;
use crate::colors::Color;
use crate::moves::Move;
use crate::pieces::Piece;

const SCORE_MATE: i32 = 1_000_000;

impl Board {
    /// True when an optimistic exchange analysis estimates the material swing
    /// of `mv` to be at least `threshold` centipawns.
    pub fn see_ge(&self, mv: Move, threshold: i32) -> bool {
        self.see_gain(mv) >= threshold
    }

    pub fn see_gt(&self, mv: Move, threshold: i32) -> bool {
        self.see_ge(mv, threshold + 1)
    }

    fn king_ring(&self, color: Color) -> BitBoard {
        let king = self.side(color).king();
        if king.is_empty() {
            return BitBoard(0);
        }
        get_king_attacks(king.first())
    }

    // Cheap one-ply scan: can the opponent capture anything inside our king
    // ring after the exchange? Only called when the ring was weakened.
    fn immediate_indirect_kill(&self, them: Color, occupied_after: BitBoard, our_ring: BitBoard) -> bool {
        for target in our_ring & occupied_after {
            if self.attack_to(them, target as usize, occupied_after).is_occupied() {
                return true;
            }
        }
        false
    }

    // Material swing of a capture: the whole blast is summed up, with mate
    // overrides when a king stands inside it.
    fn capture_gain(&self, mv: Move) -> i32 {
        let us = self.active_player();
        let them = us.flip();

        let mut score = 0;
        let (center, from_to) = if mv.is_en_passant() {
            // the captured pawn never appears in the blast sum (pawns are
            // excluded from the ring), so account for it directly
            score += Piece::Pawn.value();
            (mv.ep_capture_square(), BitBoard(1 << mv.from() as u64))
        } else {
            (mv.to(), BitBoard(1 << mv.to() as u64 | 1 << mv.from() as u64))
        };

        let pawns_all = self.side(us).pawns() | self.side(them).pawns();
        let boom = (explosion_mask(center) & !pawns_all) | from_to;

        if (boom & self.side(us).king()).is_occupied() {
            return -SCORE_MATE;
        }
        if (boom & self.side(them).king()).is_occupied() {
            return SCORE_MATE;
        }

        for pos in boom & self.side(us).all() {
            score -= self.value_on(pos as usize);
        }
        for pos in boom & self.side(them).all() {
            score += self.value_on(pos as usize);
        }

        score
    }

    fn see_gain(&self, mv: Move) -> i32 {
        if mv.is_null() {
            return 0;
        }

        let us = self.active_player();
        let them = us.flip();

        if mv.is_capture() {
            // keep captures cheap; the search handles deeper tactics
            return self.capture_gain(mv) - 1;
        }

        // Quiet moves and castling: no explosion happens now, the only risk is
        // an immediate recapture on the destination square.
        let occ = self.occupancy();
        let from_to = BitBoard(1 << mv.to() as u64 | 1 << mv.from() as u64);
        let pawns_all = self.side(us).pawns() | self.side(them).pawns();

        let boom = (explosion_mask(mv.to()) & !pawns_all) | (from_to & occ);
        let occupied_after = occ ^ from_to;

        let attackers = self.attack_to(them, mv.to(), occupied_after);
        if attackers.is_empty() {
            return 0;
        }

        let mut min_attacker = SCORE_MATE;
        for pos in attackers {
            let pos = pos as usize;
            if self.side(them).piece_on(pos) == Some(Piece::King) {
                // kings never capture
                continue;
            }
            // an attacker inside the boom explodes anyway and costs nothing
            let value = if boom.is_set(pos) { 0 } else { self.value_on(pos) };
            min_attacker = min_attacker.min(value);
        }

        let mut result = 0;
        if min_attacker != SCORE_MATE {
            result += min_attacker;
        }

        if (boom & self.side(us).king()).is_occupied() {
            return (result - SCORE_MATE).min(0);
        }
        if (boom & self.side(them).king()).is_occupied() {
            return (result + SCORE_MATE).min(0);
        }

        let our_ring = self.king_ring(us);
        let their_ring = self.king_ring(them);

        for pos in boom & self.side(us).all() {
            let pos = pos as usize;
            let mut value = self.value_on(pos);
            if our_ring.is_set(pos) {
                // losing the own king shield weighs heavier
                value *= 4;
            }
            result -= value;
        }

        for pos in boom & self.side(them).all() {
            let pos = pos as usize;
            let mut value = self.value_on(pos);
            if their_ring.is_set(pos) {
                value *= 3;
            }
            result += value;
        }

        if our_ring.is_occupied()
            && (boom & our_ring).is_occupied()
            && self.immediate_indirect_kill(them, occupied_after, our_ring)
        {
            result -= SCORE_MATE / 2;
        }

        // quiet moves never gain material
        result.min(0)
    }

    fn value_on(&self, pos: usize) -> i32 {
        match self.piece_on(pos) {
            Some((_, piece)) => piece.value(),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::parse_fen;
    use crate::move_gen::GenMode;

    fn board(fen: &str) -> Board {
        parse_fen(fen).unwrap()
    }

    #[test]
    fn pawn_takes_knight() {
        // exd5: wins the knight, loses the exploding pawn
        let b = board("4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1");
        let e4 = 3 * 8 + 3;
        let d5 = 4 * 8 + 4;
        let mv = Move::new_capture(Piece::Pawn, e4, d5, Piece::Knight);

        assert!(b.see_ge(mv, 349));
        assert!(!b.see_ge(mv, 350));
    }

    #[test]
    fn blast_sums_ring_pieces() {
        // exd5 also removes the c6 knight from the ring
        let b = board("4k3/8/2n5/3n4/4P3/8/8/4K3 w - - 0 1");
        let e4 = 3 * 8 + 3;
        let d5 = 4 * 8 + 4;
        let mv = Move::new_capture(Piece::Pawn, e4, d5, Piece::Knight);

        // 450 + 450 - 100 - 1
        assert!(b.see_ge(mv, 799));
        assert!(!b.see_ge(mv, 800));
    }

    #[test]
    fn enemy_king_in_blast_is_mate() {
        let b = board("3nk3/8/8/8/8/8/8/3RK3 w - - 0 1");
        let d1 = 4;
        let d8 = 7 * 8 + 4;
        let mv = Move::new_capture(Piece::Rook, d1, d8, Piece::Knight);

        assert!(b.is_atomic_king_blast_capture(mv));
        assert!(b.see_ge(mv, 100_000));
    }

    #[test]
    fn own_king_in_blast_is_rejected() {
        // Rxd2 would blast the e1 king
        let b = board("4k3/8/8/8/8/8/3n4/3RK3 w - - 0 1");
        let d1 = 4;
        let d2 = 8 + 4;
        let mv = Move::new_capture(Piece::Rook, d1, d2, Piece::Knight);

        assert!(!b.see_ge(mv, 0));
        assert!(!b.see_ge(mv, -100_000));
    }

    #[test]
    fn quiet_move_to_safe_square() {
        let b = board("4k3/8/8/8/8/8/8/N3K3 w - - 0 1");
        let a1 = 7;
        let b3 = 2 * 8 + 6;
        let mv = Move::new(Piece::Knight, a1, b3);

        assert!(b.see_ge(mv, 0));
        assert!(!b.see_ge(mv, 1), "quiet moves never gain material");
    }

    #[test]
    fn quiet_move_into_pawn_attack_loses_material() {
        // Nc3 walks into the d4 pawn's attack
        let b = board("4k3/8/8/8/3p4/8/8/1N2K3 w - - 0 1");
        let b1 = 6;
        let c3 = 2 * 8 + 5;
        let mv = Move::new(Piece::Knight, b1, c3);

        assert!(!b.see_ge(mv, 0));
    }

    #[test]
    fn see_monotonic_in_threshold() {
        let b = board("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        for mv in b.generate_moves(GenMode::All) {
            for threshold in [-900, -300, -100, -1, 0, 1, 100, 300] {
                if b.see_ge(mv, threshold + 1) {
                    assert!(b.see_ge(mv, threshold), "monotonicity violated for {:?} at {}", mv, threshold);
                }
                assert_eq!(b.see_gt(mv, threshold), b.see_ge(mv, threshold + 1));
            }
        }
    }

    #[test]
    fn castling_with_unattacked_rook_square_is_safe() {
        let b = board("4k3/8/8/8/8/8/8/4K2R w K - 0 1");
        let mv = Move::new_castle(3, 0);
        assert!(b.see_ge(mv, 0));
        assert!(!b.see_gt(mv, 0));
    }
}
