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

/// Static castling geometry for one color. Castling moves are encoded as
/// king-takes-own-rook (from = king start, to = rook home square).
pub struct CastleInfo {
    pub king_start: usize,
    pub ks_rook: usize,
    pub qs_rook: usize,
    pub ks_king_end: usize,
    pub ks_rook_end: usize,
    pub qs_king_end: usize,
    pub qs_rook_end: usize,
    /// Squares between king and rook that must be empty
    pub ks_path: u64,
    pub qs_path: u64,
    /// Squares the king traverses (excluding the start square), which must not be attacked
    pub ks_danger: u64,
    pub qs_danger: u64,
}

// White squares: e1 = 3, f1 = 2, g1 = 1, h1 = 0, d1 = 4, c1 = 5, b1 = 6, a1 = 7
const WHITE_CASTLE_INFO: CastleInfo = CastleInfo {
    king_start: 3,
    ks_rook: 0,
    qs_rook: 7,
    ks_king_end: 1,
    ks_rook_end: 2,
    qs_king_end: 5,
    qs_rook_end: 4,
    ks_path: (1 << 1) | (1 << 2),
    qs_path: (1 << 4) | (1 << 5) | (1 << 6),
    ks_danger: (1 << 1) | (1 << 2),
    qs_danger: (1 << 4) | (1 << 5),
};

const BLACK_CASTLE_INFO: CastleInfo = CastleInfo {
    king_start: 59,
    ks_rook: 56,
    qs_rook: 63,
    ks_king_end: 57,
    ks_rook_end: 58,
    qs_king_end: 61,
    qs_rook_end: 60,
    ks_path: WHITE_CASTLE_INFO.ks_path << 56,
    qs_path: WHITE_CASTLE_INFO.qs_path << 56,
    ks_danger: WHITE_CASTLE_INFO.ks_danger << 56,
    qs_danger: WHITE_CASTLE_INFO.qs_danger << 56,
};

static CASTLE_INFO: [CastleInfo; 2] = [WHITE_CASTLE_INFO, BLACK_CASTLE_INFO];

#[inline(always)]
pub fn castle_info(color: Color) -> &'static CastleInfo {
    &CASTLE_INFO[color.idx()]
}

/// Castling rights as a 4-bit state: WK, WQ, BK, BQ
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct CastlingState(u8);

impl CastlingState {
    pub const ALL: CastlingState = CastlingState(0b1111);

    #[inline(always)]
    fn ks_bit(color: Color) -> u8 {
        1 << (color.idx() * 2)
    }

    #[inline(always)]
    fn qs_bit(color: Color) -> u8 {
        1 << (color.idx() * 2 + 1)
    }

    #[inline(always)]
    pub fn can_castle_king_side(self, color: Color) -> bool {
        self.0 & Self::ks_bit(color) != 0
    }

    #[inline(always)]
    pub fn can_castle_queen_side(self, color: Color) -> bool {
        self.0 & Self::qs_bit(color) != 0
    }

    pub fn any_castling(self) -> bool {
        self.0 != 0
    }

    pub fn set_king_side(&mut self, color: Color) {
        self.0 |= Self::ks_bit(color);
    }

    pub fn set_queen_side(&mut self, color: Color) {
        self.0 |= Self::qs_bit(color);
    }

    pub fn clear_king_side(&mut self, color: Color) {
        self.0 &= !Self::ks_bit(color);
    }

    pub fn clear_queen_side(&mut self, color: Color) {
        self.0 &= !Self::qs_bit(color);
    }

    pub fn clear(&mut self, color: Color) {
        self.0 &= !(Self::ks_bit(color) | Self::qs_bit(color));
    }

    #[inline(always)]
    pub fn bits(self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{BLACK, WHITE};

    #[test]
    fn castle_geometry_is_mirrored() {
        let white = castle_info(WHITE);
        let black = castle_info(BLACK);
        assert_eq!(white.king_start + 56, black.king_start);
        assert_eq!(white.ks_rook + 56, black.ks_rook);
        assert_eq!(white.qs_king_end + 56, black.qs_king_end);
        assert_eq!(white.ks_path << 56, black.ks_path);
    }

    #[test]
    fn state_bits() {
        let mut state = CastlingState::ALL;
        assert!(state.can_castle_king_side(WHITE));
        assert!(state.can_castle_queen_side(BLACK));

        state.clear_king_side(WHITE);
        assert!(!state.can_castle_king_side(WHITE));
        assert!(state.can_castle_queen_side(WHITE));

        state.clear(BLACK);
        assert!(!state.can_castle_king_side(BLACK));
        assert!(!state.can_castle_queen_side(BLACK));
        assert!(state.any_castling());

        state.clear(WHITE);
        assert!(!state.any_castling());
    }
}
