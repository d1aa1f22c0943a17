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
use crate::move_gen::GenMode;

/* Perft (performance test, move path enumeration) helper to verify the move
  generator: counts the leaf nodes of the legal move tree up to the given
  depth, for comparison against published Atomic reference numbers.
*/
pub fn perft(board: &Board, depth: i32) -> u64 {
    if depth <= 0 {
        return 1;
    }

    let moves = board.generate_moves(GenMode::All);
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0;
    for mv in moves {
        nodes += perft(&board.forward(mv), depth - 1);
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::{parse_fen, START_POS};

    #[test]
    fn startpos_shallow_counts() {
        let board = parse_fen(START_POS).unwrap();
        assert_eq!(1, perft(&board, 0));
        assert_eq!(20, perft(&board, 1));
        assert_eq!(400, perft(&board, 2));
    }
}
