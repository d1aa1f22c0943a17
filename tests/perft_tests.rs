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

extern crate fulminate;

use fulminate::fen::{parse_fen, write_fen};
use fulminate::move_gen::GenMode;
use fulminate::perft::perft;

fn perft_for_fen(fen: &str, depth: i32) -> u64 {
    perft(&parse_fen(fen).unwrap(), depth)
}

// The first three plies of the Atomic start position coincide with standard
// chess: no capture can blast a king yet and no kings can touch.
#[test]
fn atomic_perft_startpos() {
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    assert_eq!(1, perft_for_fen(fen, 0));
    assert_eq!(20, perft_for_fen(fen, 1));
    assert_eq!(400, perft_for_fen(fen, 2));
    assert_eq!(8902, perft_for_fen(fen, 3));
}

// Capturing d5 with either piece would explode the white king on e4
#[test]
fn atomic_perft_excludes_own_king_blasts() {
    let fen = "4k3/8/8/3p4/3RK3/8/8/8 w - - 0 1";
    let board = parse_fen(fen).unwrap();
    for mv in board.generate_moves(GenMode::All) {
        assert!(!mv.is_capture());
    }
}

// Touching kings shield each other: black has quiet king moves despite the rook
#[test]
fn atomic_perft_with_adjacent_kings() {
    let fen = "8/8/3k4/3K4/8/8/3R4/8 b - - 0 1";
    assert!(perft_for_fen(fen, 1) > 0);
}

#[test]
fn forward_keeps_hashes_and_fens_consistent() {
    let fens = [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "rnbqkbnr/p1pppppp/8/8/Pp6/8/1PPPPPPP/RNBQKBNR b KQkq a3 0 1",
    ];

    for fen in fens {
        let board = parse_fen(fen).unwrap();
        for mv in board.generate_moves(GenMode::All) {
            let next = board.forward(mv);

            let (hash, pawn_hash, sided_hash) = next.recompute_hashes();
            assert_eq!(hash, next.hash(), "incremental hash diverged after {:?} from {}", mv, fen);
            assert_eq!(pawn_hash, next.pawn_hash());
            assert_eq!(sided_hash, next.sided_hash());

            let round_tripped = parse_fen(&write_fen(&next)).unwrap();
            assert_eq!(write_fen(&next), write_fen(&round_tripped), "FEN round trip failed after {:?}", mv);
            assert_eq!(next.hash(), round_tripped.hash());
        }
    }
}

// A move is classified as a king blast capture exactly when the enemy king
// is gone after playing it
#[test]
fn king_blast_classification_matches_forward() {
    let fens = [
        "4k3/5p2/3N4/8/8/8/8/4K3 w - - 0 1",
        "3qk3/4pp2/8/8/8/8/8/QQQQK3 w - - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    ];

    for fen in fens {
        let board = parse_fen(fen).unwrap();
        let them = board.active_player().flip();
        for mv in board.generate_moves(GenMode::All) {
            let enemy_king_gone = board.forward(mv).side(them).king().is_empty();
            assert_eq!(
                board.is_atomic_king_blast_capture(mv),
                enemy_king_gone,
                "blast classification mismatch for {:?} in {}",
                mv,
                fen
            );
        }
    }
}

// Every generated move passes the standalone legality check, and no other
// pseudo-move shape does (spot check via the move list itself)
#[test]
fn generated_moves_are_exactly_the_legal_ones() {
    let fens = [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "4k3/5p2/3N4/8/8/8/8/4K3 w - - 0 1",
    ];

    for fen in fens {
        let board = parse_fen(fen).unwrap();
        let all = board.generate_moves(GenMode::All);
        for mv in all.iter() {
            assert!(board.is_legal(mv, GenMode::All), "{:?} generated but not legal in {}", mv, fen);
        }
    }
}
