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
use crate::pieces::Piece;
use crate::slices::SliceElementAccess;

const PLAYER: u64 = 0x8000000000000001;
const EP: u64 = 0x42a6344d1227098d;
const CASTLING: u64 = 0xab28bc31b46cbb3c;
static PIECE: [u64; 12] = [
    0x7eb5140a57a894c8,
    0x467813d5c298de63,
    0xc5c1f1e2594b941c,
    0xf319da8df6cf96b4,
    0xdc8b55eebfca3a40,
    0x5418f15d4c08f4e2,
    0xd0c4b14bdb230807,
    0x73ef23b69de88e14,
    0xb9219d4683de93d9,
    0xe8c0a3740dbb1c7a,
    0x59fd9c7dc2c9298a,
    0x1ffc53c9670efd27,
];

#[inline(always)]
pub fn player_zobrist_key() -> u64 {
    PLAYER
}

#[inline(always)]
pub fn enpassant_zobrist_key(ep_col: usize) -> u64 {
    EP.rotate_left(ep_col as u32)
}

#[inline(always)]
pub fn castling_zobrist_key(castling_state: u8) -> u64 {
    CASTLING.rotate_left(castling_state as u32)
}

#[inline(always)]
pub fn piece_zobrist_key(color: Color, piece: Piece, pos: usize) -> u64 {
    let piece_key = *PIECE.el(color.idx() * 6 + piece.idx());
    piece_key.rotate_left(pos as u32)
}

/// Quarter-hash used to compose the correction-table feature hash
#[inline(always)]
pub fn lower_quarter(hash: u64) -> u16 {
    hash as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{BLACK, WHITE};
    use crate::pieces::ALL_PIECES;

    #[test]
    fn check_key_quality() {
        let mut all_keys = Vec::new();
        all_keys.push(player_zobrist_key());

        for castling in 1u8..16 {
            all_keys.push(castling_zobrist_key(castling));
        }

        for col in 0..8 {
            all_keys.push(enpassant_zobrist_key(col));
        }

        for color in [WHITE, BLACK] {
            for piece in ALL_PIECES {
                for pos in 0..64 {
                    all_keys.push(piece_zobrist_key(color, piece, pos));
                }
            }
        }

        let mut duplicates = all_keys.len();
        all_keys.sort_unstable();
        all_keys.dedup();
        duplicates -= all_keys.len();

        assert_eq!(0, duplicates);
        assert_eq!(0, all_keys.iter().filter(|&k| *k == 0 || *k == u64::MAX).count());
    }
}
