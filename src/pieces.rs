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

use std::fmt;

/// The numeric ordering is used as an index into weight tables and must be preserved.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Piece {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

pub const ALL_PIECES: [Piece; 6] = [Piece::Pawn, Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen, Piece::King];

// Explosion-aware exchange values (centipawns)
const PIECE_VALUES: [i32; 6] = [100, 450, 450, 650, 1250, 0];

impl Piece {
    #[inline(always)]
    pub fn idx(self) -> usize {
        self as usize
    }

    pub fn from_idx(idx: usize) -> Self {
        debug_assert!(idx < 6);
        unsafe { std::mem::transmute(idx as u8) }
    }

    #[inline(always)]
    pub fn value(self) -> i32 {
        PIECE_VALUES[self.idx()]
    }

    pub fn fen_char(self, is_white: bool) -> char {
        let ch = match self {
            Piece::Pawn => 'p',
            Piece::Knight => 'n',
            Piece::Bishop => 'b',
            Piece::Rook => 'r',
            Piece::Queen => 'q',
            Piece::King => 'k',
        };
        if is_white {
            ch.to_ascii_uppercase()
        } else {
            ch
        }
    }

    pub fn from_fen_char(ch: char) -> Option<Self> {
        match ch.to_ascii_lowercase() {
            'p' => Some(Piece::Pawn),
            'n' => Some(Piece::Knight),
            'b' => Some(Piece::Bishop),
            'r' => Some(Piece::Rook),
            'q' => Some(Piece::Queen),
            'k' => Some(Piece::King),
            _ => None,
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fen_char(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_weight_table_ordering() {
        for (i, piece) in ALL_PIECES.iter().enumerate() {
            assert_eq!(i, piece.idx());
            assert_eq!(*piece, Piece::from_idx(i));
        }
    }

    #[test]
    fn exchange_values() {
        assert_eq!(100, Piece::Pawn.value());
        assert_eq!(Piece::Knight.value(), Piece::Bishop.value());
        assert_eq!(0, Piece::King.value());
    }

    #[test]
    fn fen_chars_round_trip() {
        for piece in ALL_PIECES {
            assert_eq!(Some(piece), Piece::from_fen_char(piece.fen_char(true)));
            assert_eq!(Some(piece), Piece::from_fen_char(piece.fen_char(false)));
        }
    }
}
