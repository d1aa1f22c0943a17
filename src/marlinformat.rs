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

//! The 32-byte "marlinformat" packed-board record used for training data
//! (https://github.com/jnlt3/marlinflow/blob/main/marlinformat/src/lib.rs).

use crate::bitboard::{h_mirror, BitBoard};
use crate::board::castling::castle_info;
use crate::board::Board;
use crate::colors::{Color, BLACK, WHITE};
use crate::pieces::{Piece, ALL_PIECES};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Error, ErrorKind, Read, Write};

pub const PACKED_BOARD_SIZE: usize = 32;

const UNMOVED_ROOK: u8 = 6;
const NO_EP_SQUARE: u8 = 64;
const BLACK_FLAG: u8 = 1 << 3;
const STM_BLACK: u8 = 1 << 7;

#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Outcome {
    WhiteLoss = 0,
    Draw = 1,
    WhiteWin = 2,
}

impl Outcome {
    fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(Outcome::WhiteLoss),
            1 => Some(Outcome::Draw),
            2 => Some(Outcome::WhiteWin),
            _ => None,
        }
    }
}

/// 32 bytes: occupancy bitmap, 16 piece half-bytes, stm|ep, halfmove clock,
/// fullmove number, eval, WDL outcome, one spare byte.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PackedBoard {
    pub occupancy: u64,
    pub pieces: [u8; 16],
    pub stm_ep_square: u8,
    pub halfmove_clock: u8,
    pub fullmove_number: u16,
    pub eval: i16,
    pub wdl: Outcome,
    pub extra: u8,
}

// occupancy and piece nibbles use the standard little-endian orientation
fn packed_square(pos: usize) -> usize {
    h_mirror(pos)
}

fn is_unmoved_rook(board: &Board, color: Color, pos: usize) -> bool {
    let info = castle_info(color);
    (board.can_castle_king_side(color) && pos == info.ks_rook)
        || (board.can_castle_queen_side(color) && pos == info.qs_rook)
}

impl PackedBoard {
    pub fn pack(board: &Board, eval: i16, wdl: Outcome, extra: u8) -> PackedBoard {
        let mut piece_map = [0u8; 64];
        let mut occupancy = 0u64;

        for color in [WHITE, BLACK] {
            for piece in ALL_PIECES {
                for pos in board.side(color).piece(piece) {
                    let pos = pos as usize;
                    let base_id = if piece == Piece::Rook && is_unmoved_rook(board, color, pos) {
                        UNMOVED_ROOK
                    } else {
                        piece.idx() as u8
                    };
                    let color_id = if color.is_black() { BLACK_FLAG } else { 0 };

                    let idx = packed_square(pos);
                    piece_map[idx] = base_id | color_id;
                    occupancy |= 1 << idx as u64;
                }
            }
        }

        let mut pieces = [0u8; 16];
        for (i, idx) in BitBoard(occupancy).enumerate() {
            let nibble = piece_map[idx as usize] & 0x0F;
            if i & 1 == 0 {
                pieces[i / 2] |= nibble;
            } else {
                pieces[i / 2] |= nibble << 4;
            }
        }

        let stm = if board.active_player().is_black() { STM_BLACK } else { 0 };
        let ep_value = match board.enpassant_target() {
            Some(ep) => packed_square(ep) as u8,
            None => NO_EP_SQUARE,
        };

        PackedBoard {
            occupancy,
            pieces,
            stm_ep_square: stm | ep_value,
            halfmove_clock: board.halfmove_clock.min(255) as u8,
            fullmove_number: board.fullmove_count(),
            eval,
            wdl,
            extra,
        }
    }

    /// Reconstructs the position; unmoved-rook nibbles restore castling rights
    pub fn unpack(&self) -> Result<Board, Error> {
        let mut board = Board::empty();

        let stm_black = self.stm_ep_square & STM_BLACK != 0;
        board.ply_count = (self.fullmove_number.max(1) - 1) * 2 + u16::from(stm_black);
        board.halfmove_clock = u16::from(self.halfmove_clock);

        let mut castling = crate::board::castling::CastlingState::default();

        for (i, idx) in BitBoard(self.occupancy).enumerate() {
            let cell = self.pieces[i / 2];
            let nibble = if i & 1 == 0 { cell & 0x0F } else { cell >> 4 };

            let color = if nibble & BLACK_FLAG != 0 { BLACK } else { WHITE };
            let piece_id = nibble & 0b111;
            let pos = packed_square(idx as usize);

            let piece = if piece_id == UNMOVED_ROOK {
                let info = castle_info(color);
                if pos == info.ks_rook {
                    castling.set_king_side(color);
                } else if pos == info.qs_rook {
                    castling.set_queen_side(color);
                } else {
                    return Err(Error::new(ErrorKind::InvalidData, "unmoved rook outside its home square"));
                }
                Piece::Rook
            } else if piece_id < 6 {
                Piece::from_idx(piece_id as usize)
            } else {
                return Err(Error::new(ErrorKind::InvalidData, "invalid piece nibble"));
            };

            board.add_piece(color, piece, pos);
        }

        board.set_castling_state(castling);

        let ep_value = self.stm_ep_square & 0x7F;
        if ep_value != NO_EP_SQUARE {
            if ep_value >= 64 {
                return Err(Error::new(ErrorKind::InvalidData, "invalid en passant square"));
            }
            board.set_enpassant_target(packed_square(ep_value as usize));
        }

        Ok(board)
    }

    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), Error> {
        writer.write_u64::<LittleEndian>(self.occupancy)?;
        writer.write_all(&self.pieces)?;
        writer.write_u8(self.stm_ep_square)?;
        writer.write_u8(self.halfmove_clock)?;
        writer.write_u16::<LittleEndian>(self.fullmove_number)?;
        writer.write_i16::<LittleEndian>(self.eval)?;
        writer.write_u8(self.wdl as u8)?;
        writer.write_u8(self.extra)
    }

    pub fn read_from(reader: &mut impl Read) -> Result<PackedBoard, Error> {
        let occupancy = reader.read_u64::<LittleEndian>()?;
        let mut pieces = [0u8; 16];
        reader.read_exact(&mut pieces)?;
        let stm_ep_square = reader.read_u8()?;
        let halfmove_clock = reader.read_u8()?;
        let fullmove_number = reader.read_u16::<LittleEndian>()?;
        let eval = reader.read_i16::<LittleEndian>()?;
        let wdl = Outcome::from_byte(reader.read_u8()?)
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "invalid WDL outcome"))?;
        let extra = reader.read_u8()?;

        Ok(PackedBoard { occupancy, pieces, stm_ep_square, halfmove_clock, fullmove_number, eval, wdl, extra })
    }

    pub fn to_bytes(&self) -> [u8; PACKED_BOARD_SIZE] {
        let mut bytes = [0u8; PACKED_BOARD_SIZE];
        let mut cursor = Cursor::new(&mut bytes[..]);
        self.write_to(&mut cursor).expect("packed board serialization cannot fail");
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::{parse_fen, write_fen, START_POS};

    fn round_trip(fen: &str) {
        let board = parse_fen(fen).unwrap();
        let packed = PackedBoard::pack(&board, -250, Outcome::Draw, 0);

        let bytes = packed.to_bytes();
        assert_eq!(PACKED_BOARD_SIZE, bytes.len());

        let restored = PackedBoard::read_from(&mut &bytes[..]).unwrap();
        assert_eq!(packed, restored);

        let unpacked = restored.unpack().unwrap();
        assert_eq!(fen, write_fen(&unpacked));
        assert_eq!(-250, restored.eval);
        assert_eq!(Outcome::Draw, restored.wdl);
    }

    #[test]
    fn round_trips_startpos() {
        round_trip(START_POS);
    }

    #[test]
    fn round_trips_complex_positions() {
        round_trip("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        round_trip("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 b - - 3 12");
        round_trip("rnbqkbnr/p1pppppp/8/8/Pp6/8/1PPPPPPP/RNBQKBNR b KQkq a3 0 1");
    }

    #[test]
    fn unmoved_rooks_encode_castling() {
        let board = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1").unwrap();
        let packed = PackedBoard::pack(&board, 0, Outcome::WhiteWin, 0);
        let unpacked = packed.unpack().unwrap();

        assert!(unpacked.can_castle_king_side(WHITE));
        assert!(!unpacked.can_castle_queen_side(WHITE));
        assert!(!unpacked.can_castle_king_side(BLACK));
        assert!(unpacked.can_castle_queen_side(BLACK));
    }

    #[test]
    fn rejects_invalid_records() {
        let board = parse_fen(START_POS).unwrap();
        let mut packed = PackedBoard::pack(&board, 0, Outcome::Draw, 0);
        packed.pieces[0] |= 0b0111; // piece id 7 is invalid
        assert!(packed.unpack().is_err());

        let mut bytes = PackedBoard::pack(&board, 0, Outcome::Draw, 0).to_bytes();
        bytes[30] = 9; // invalid outcome
        assert!(PackedBoard::read_from(&mut &bytes[..]).is_err());
    }
}
