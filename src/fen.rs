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

use crate::bitboard::{file_of, rank_of};
use crate::board::castling::CastlingState;
use crate::board::Board;
use crate::colors::{Color, BLACK, WHITE};
use crate::pieces::Piece;
use std::error::Error;
use std::fmt;

pub const START_POS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug)]
pub struct FenError {
    msg: String,
}

impl FenError {
    fn new(msg: impl Into<String>) -> Self {
        FenError { msg: msg.into() }
    }
}

impl Error for FenError {}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FEN error: {}", self.msg)
    }
}

pub fn square_name(pos: usize) -> String {
    let file = (b'a' + file_of(pos) as u8) as char;
    let rank = (b'1' + rank_of(pos) as u8) as char;
    format!("{}{}", file, rank)
}

pub fn parse_square(name: &str) -> Option<usize> {
    let bytes = name.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = bytes[0].wrapping_sub(b'a') as usize;
    let rank = bytes[1].wrapping_sub(b'1') as usize;
    if file > 7 || rank > 7 {
        return None;
    }
    Some(rank * 8 + (7 - file))
}

/// Parses a standard 6-field FEN; missing halfmove/fullmove fields default to "0 1"
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let mut parts = fen.split_whitespace();

    let placement = parts.next().ok_or_else(|| FenError::new(format!("missing piece placement: {}", fen)))?;
    let active = parts.next().ok_or_else(|| FenError::new(format!("missing active color: {}", fen)))?;
    let castling = parts.next().ok_or_else(|| FenError::new(format!("missing castling part: {}", fen)))?;
    let ep = parts.next().ok_or_else(|| FenError::new(format!("missing en passant part: {}", fen)))?;
    let halfmove_clock = match parts.next() {
        Some(value) => value.parse::<u16>().map_err(|_| FenError::new(format!("invalid halfmove clock: {}", value)))?,
        None => 0,
    };
    let fullmove_num = match parts.next() {
        Some(value) => value.parse::<u16>().map_err(|_| FenError::new(format!("invalid fullmove number: {}", value)))?,
        None => 1,
    };

    let mut board = Board::empty();

    let active_player = match active {
        "w" => WHITE,
        "b" => BLACK,
        _ => return Err(FenError::new(format!("invalid active color: {}", active))),
    };
    board.ply_count = (fullmove_num.max(1) - 1) * 2 + u16::from(active_player.is_black());
    board.halfmove_clock = halfmove_clock;

    read_pieces(&mut board, placement)?;
    board.set_castling_state(read_castling(castling)?);

    if ep != "-" {
        let ep_sq = parse_square(ep).ok_or_else(|| FenError::new(format!("invalid en passant square: {}", ep)))?;
        board.set_enpassant_target(ep_sq);
    }

    Ok(board)
}

fn read_pieces(board: &mut Board, placement: &str) -> Result<(), FenError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::new(format!("expected 8 ranks, got {}", ranks.len())));
    }

    for (i, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - i;
        let mut file = 0usize;

        for ch in rank_str.chars() {
            if let Some(empty) = ch.to_digit(10) {
                file += empty as usize;
                continue;
            }

            let piece = Piece::from_fen_char(ch).ok_or_else(|| FenError::new(format!("invalid piece: {}", ch)))?;
            let color = if ch.is_ascii_uppercase() { WHITE } else { BLACK };
            if file > 7 {
                return Err(FenError::new(format!("rank overflow: {}", rank_str)));
            }
            board.add_piece(color, piece, rank * 8 + (7 - file));
            file += 1;
        }

        if file != 8 {
            return Err(FenError::new(format!("incomplete rank: {}", rank_str)));
        }
    }

    Ok(())
}

fn read_castling(castling: &str) -> Result<CastlingState, FenError> {
    let mut state = CastlingState::default();
    for ch in castling.chars() {
        match ch {
            'K' => state.set_king_side(WHITE),
            'Q' => state.set_queen_side(WHITE),
            'k' => state.set_king_side(BLACK),
            'q' => state.set_queen_side(BLACK),
            '-' => (),
            _ => return Err(FenError::new(format!("invalid castling flag: {}", ch))),
        }
    }
    Ok(state)
}

pub fn write_fen(board: &Board) -> String {
    write_pieces(board)
        + " "
        + write_color(board.active_player())
        + " "
        + write_castling(board).as_str()
        + " "
        + write_enpassant(board).as_str()
        + " "
        + board.halfmove_clock.to_string().as_str()
        + " "
        + board.fullmove_count().to_string().as_str()
}

fn write_pieces(board: &Board) -> String {
    let mut result = String::new();

    for rank in (0..8).rev() {
        let mut empty_count = 0;
        for file in 0..8 {
            let pos = rank * 8 + (7 - file);
            match board.piece_on(pos) {
                Some((color, piece)) => {
                    if empty_count > 0 {
                        result += empty_count.to_string().as_str();
                        empty_count = 0;
                    }
                    result.push(piece.fen_char(color.is_white()));
                }
                None => empty_count += 1,
            }
        }

        if empty_count > 0 {
            result += empty_count.to_string().as_str();
        }
        if rank > 0 {
            result.push('/');
        }
    }

    result
}

fn write_color(color: Color) -> &'static str {
    if color.is_white() {
        "w"
    } else {
        "b"
    }
}

fn write_castling(board: &Board) -> String {
    let mut result = String::new();

    if board.can_castle_king_side(WHITE) {
        result.push('K');
    }
    if board.can_castle_queen_side(WHITE) {
        result.push('Q');
    }
    if board.can_castle_king_side(BLACK) {
        result.push('k');
    }
    if board.can_castle_queen_side(BLACK) {
        result.push('q');
    }

    if result.is_empty() {
        String::from("-")
    } else {
        result
    }
}

fn write_enpassant(board: &Board) -> String {
    match board.enpassant_target() {
        Some(pos) => square_name(pos),
        None => String::from("-"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_fen(fen: &str) {
        assert_eq!(write_fen(&parse_fen(fen).unwrap()), fen);
    }

    #[test]
    fn read_write_startpos() {
        test_fen(START_POS);
    }

    #[test]
    fn read_write_active_player() {
        test_fen("rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1");
    }

    #[test]
    fn read_write_no_castling() {
        test_fen("r4k1r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R4K1R w - - 0 1");
    }

    #[test]
    fn read_write_partial_castling() {
        test_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQ - 0 1");
        test_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w kq - 0 1");
        test_fen("1r2k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/1R2K2R w Kk - 0 1");
    }

    #[test]
    fn read_write_en_passant() {
        // the adjacent pawn makes the target capturable, so it round-trips
        test_fen("rnbqkbnr/p1pppppp/8/8/Pp6/8/1PPPPPPP/RNBQKBNR b KQkq a3 0 1");
        test_fen("rnbqkbnr/ppppppp1/8/6Pp/8/8/PPPPPP1P/RNBQKBNR w KQkq h6 0 1");
    }

    #[test]
    fn drops_non_capturable_en_passant_target() {
        // no black pawn can capture onto e3
        let board = parse_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap();
        assert_eq!(None, board.enpassant_target());
    }

    #[test]
    fn read_write_clocks() {
        test_fen("rnbqkbnr/ppppppp1/8/6Pp/8/8/PPPPPP1P/RNBQKBNR w KQkq - 2 4");
    }

    #[test]
    fn missing_clock_fields_default() {
        let board = parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -").unwrap();
        assert_eq!(0, board.halfmove_clock);
        assert_eq!(1, board.fullmove_count());
    }

    #[test]
    fn rejects_malformed_fens() {
        assert!(parse_fen("").is_err());
        assert!(parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1").is_err());
        assert!(parse_fen("rnbqkbnr/pppppppp/9/8/8/8/8/PPPPPPPP w KQkq - 0 1").is_err());
        assert!(parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1").is_err());
        assert!(parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KZkq - 0 1").is_err());
    }

    #[test]
    fn square_names() {
        assert_eq!("a1", square_name(7));
        assert_eq!("h1", square_name(0));
        assert_eq!("e4", square_name(3 * 8 + 3));
        assert_eq!(Some(7), parse_square("a1"));
        assert_eq!(Some(3 * 8 + 3), parse_square("e4"));
        assert_eq!(None, parse_square("i9"));
    }
}
