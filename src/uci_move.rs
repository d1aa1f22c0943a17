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

use crate::board::castling::castle_info;
use crate::board::Board;
use crate::fen::{parse_square, square_name};
use crate::move_gen::GenMode;
use crate::moves::Move;
use crate::pieces::Piece;

/// A move in coordinate notation, decoupled from the internal encoding
pub struct UCIMove {
    pub from: usize,
    pub to: usize,
    pub promotion: Option<Piece>,
}

impl UCIMove {
    pub fn from_uci(uci: &str) -> Option<Self> {
        if uci.len() < 4 {
            return None;
        }

        let from = parse_square(&uci[0..2])?;
        let to = parse_square(&uci[2..4])?;

        let promotion = match uci.as_bytes().get(4) {
            Some(b'q') => Some(Piece::Queen),
            Some(b'r') => Some(Piece::Rook),
            Some(b'b') => Some(Piece::Bishop),
            Some(b'n') => Some(Piece::Knight),
            Some(_) => return None,
            None => None,
        };

        Some(UCIMove { from, to, promotion })
    }

    /// Renders the internal move; castling is written as the king's two-square step
    pub fn from_move(board: &Board, mv: Move) -> String {
        let mut to = mv.to();

        if mv.is_castle() {
            let info = castle_info(board.active_player());
            to = if mv.to() == info.ks_rook { info.ks_king_end } else { info.qs_king_end };
        }

        let mut result = square_name(mv.from()) + square_name(to).as_str();
        if let Some(promotion) = mv.promotion() {
            result.push(promotion.fen_char(false));
        }

        result
    }

    /// Resolves the coordinates against the legal moves of the given position.
    /// Castling is accepted both as king-to-rook and as the king's double step.
    pub fn to_move(&self, board: &Board) -> Option<Move> {
        let info = castle_info(board.active_player());

        for mv in board.generate_moves(GenMode::All) {
            if mv.is_castle() && self.from == info.king_start {
                let king_end = if mv.to() == info.ks_rook { info.ks_king_end } else { info.qs_king_end };
                if self.to == mv.to() || self.to == king_end {
                    return Some(mv);
                }
                continue;
            }

            if mv.from() == self.from && mv.to() == self.to && mv.promotion() == self.promotion {
                return Some(mv);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::{parse_fen, START_POS};

    #[test]
    fn parses_coordinates() {
        let mv = UCIMove::from_uci("e2e4").unwrap();
        assert_eq!(8 + 3, mv.from);
        assert_eq!(3 * 8 + 3, mv.to);
        assert_eq!(None, mv.promotion);

        let promo = UCIMove::from_uci("a7a8q").unwrap();
        assert_eq!(Some(Piece::Queen), promo.promotion);

        assert!(UCIMove::from_uci("e2").is_none());
        assert!(UCIMove::from_uci("e2e4x").is_none());
    }

    #[test]
    fn resolves_moves_against_position() {
        let board = parse_fen(START_POS).unwrap();
        let mv = UCIMove::from_uci("g1f3").unwrap().to_move(&board).unwrap();
        assert_eq!(Piece::Knight, mv.piece());
        assert!(UCIMove::from_uci("e2e5").unwrap().to_move(&board).is_none());
    }

    #[test]
    fn round_trips_moves() {
        let board = parse_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
        for mv in board.generate_moves(GenMode::All) {
            let uci = UCIMove::from_move(&board, mv);
            let resolved = UCIMove::from_uci(&uci).unwrap().to_move(&board).unwrap();
            assert_eq!(mv, resolved, "uci round trip failed for {}", uci);
        }
    }

    #[test]
    fn castling_renders_as_king_step() {
        let board = parse_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let mv = Move::new_castle(3, 0);
        assert_eq!("e1g1", UCIMove::from_move(&board, mv));
        // both notations resolve to the same internal move
        assert_eq!(Some(mv), UCIMove::from_uci("e1g1").unwrap().to_move(&board));
        assert_eq!(Some(mv), UCIMove::from_uci("e1h1").unwrap().to_move(&board));
    }
}
