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
    get_between_ray, get_bishop_attacks, get_king_attacks, get_knight_attacks, get_queen_attacks, get_rook_attacks,
    BitBoard,
};
use crate::board::SideBoards;
use crate::colors::{BLACK, WHITE};
use crate::pieces::Piece;
use crate::zobrist::piece_zobrist_key;
use std::mem::swap;
use std::sync::OnceLock;

// Cuckoo table of all reversible non-pawn moves, keyed by the Zobrist delta
// of the from/to piece keys. Used to detect upcoming repetition cycles.

const TABLE_SIZE: usize = 8192;
const EXPECTED_MOVE_COUNT: usize = 3668;

#[derive(Copy, Clone, Default)]
struct CuckooEntry {
    key: u64,
    // from(6) | to(6) | piece(3)
    data: u16,
}

struct CuckooTable {
    entries: Box<[CuckooEntry; TABLE_SIZE]>,
}

static CUCKOO: OnceLock<CuckooTable> = OnceLock::new();

fn cuckoo_hash1(key: u64) -> usize {
    (key & (TABLE_SIZE as u64 - 1)) as usize
}

fn cuckoo_hash2(key: u64) -> usize {
    ((key >> 16) & (TABLE_SIZE as u64 - 1)) as usize
}

fn attacks(piece: Piece, pos: usize) -> BitBoard {
    match piece {
        Piece::Knight => get_knight_attacks(pos),
        Piece::Bishop => get_bishop_attacks(0, pos),
        Piece::Rook => get_rook_attacks(0, pos),
        Piece::Queen => get_queen_attacks(0, pos),
        Piece::King => get_king_attacks(pos),
        Piece::Pawn => unreachable!("pawn moves are not reversible"),
    }
}

fn build_table() -> CuckooTable {
    let mut table = CuckooTable { entries: Box::new([CuckooEntry::default(); TABLE_SIZE]) };

    let mut count = 0;
    for player in [WHITE, BLACK] {
        for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen, Piece::King] {
            for from in 0..64usize {
                for to in (from + 1)..64usize {
                    if !attacks(piece, from).is_set(to) {
                        continue;
                    }

                    let mut data = (from << 9 | to << 3 | piece.idx()) as u16 | 0x8000;
                    let mut key = piece_zobrist_key(player, piece, from) ^ piece_zobrist_key(player, piece, to);

                    let mut i = cuckoo_hash1(key);
                    loop {
                        swap(&mut table.entries[i].key, &mut key);
                        swap(&mut table.entries[i].data, &mut data);
                        if data == 0 {
                            break;
                        }
                        i = if i == cuckoo_hash1(key) { cuckoo_hash2(key) } else { cuckoo_hash1(key) };
                    }
                    count += 1;
                }
            }
        }
    }
    assert_eq!(EXPECTED_MOVE_COUNT, count);

    table
}

pub fn init() {
    let _ = CUCKOO.get_or_init(build_table);
}

/// Checks whether `delta` corresponds to a reversible move that the given side
/// could play on an unobstructed ray, i.e. a repetition is one move away.
pub fn has_cycle_move(delta: u64, side: &SideBoards, occupancy: BitBoard) -> bool {
    let table = CUCKOO.get_or_init(build_table);

    let mut i = cuckoo_hash1(delta);
    if table.entries[i].key != delta || table.entries[i].data == 0 {
        i = cuckoo_hash2(delta);
        if table.entries[i].key != delta || table.entries[i].data == 0 {
            return false;
        }
    }

    let data = table.entries[i].data;
    let from = (data >> 9 & 0x3F) as usize;
    let to = (data >> 3 & 0x3F) as usize;
    let piece = Piece::from_idx((data & 0b111) as usize);

    let candidates = BitBoard(1 << from as u64 | 1 << to as u64);
    if (side.piece(piece) & candidates).is_empty() {
        return false;
    }

    (occupancy & get_between_ray(from, to)).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::parse_fen;

    #[test]
    fn builds_complete_table() {
        init();
    }

    #[test]
    fn detects_reversible_knight_move() {
        let b = parse_fen("4k3/8/8/8/8/5N2/8/4K3 w - - 4 3").unwrap();
        let f3 = 2 * 8 + 2;
        let g1 = 1;
        let delta = piece_zobrist_key(WHITE, Piece::Knight, f3) ^ piece_zobrist_key(WHITE, Piece::Knight, g1);
        assert!(has_cycle_move(delta, b.side(WHITE), b.occupancy()));
    }

    #[test]
    fn rejects_blocked_ray() {
        // rook a1 to a3 with a blocker on a2
        let b = parse_fen("4k3/8/8/8/8/8/P7/R3K3 w - - 4 3").unwrap();
        let a1 = 7;
        let a3 = 2 * 8 + 7;
        let delta = piece_zobrist_key(WHITE, Piece::Rook, a1) ^ piece_zobrist_key(WHITE, Piece::Rook, a3);
        assert!(!has_cycle_move(delta, b.side(WHITE), b.occupancy()));
    }
}
