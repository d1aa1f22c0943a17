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
use std::fs::File;
use std::io::{BufReader, Error as IoError, Read};
use std::sync::{Arc, Mutex};

use log::{error, info, warn};

use crate::align::A64;
use crate::colors::Color;
use crate::nn::io::{read_padded_i16s, HEADER_SIZE};
use crate::pieces::Piece;

pub mod eval;
pub mod io;

// Network dimensions
pub const INPUT_SIZE: usize = 768;
pub const LAYER1_SIZE: usize = 256;
pub const INPUT_BUCKETS: usize = 4;
pub const OUTPUT_BUCKETS: usize = 8;

pub const FT_WEIGHT_COUNT: usize = INPUT_BUCKETS * INPUT_SIZE * LAYER1_SIZE;
pub const OUTPUT_WEIGHT_COUNT: usize = OUTPUT_BUCKETS * 2 * LAYER1_SIZE;

// Quantisation: raw network output is converted to centipawns by SCALE / (L1_QUANT * OUTPUT_QUANT)
pub const SCALE: i32 = 400;
pub const L1_QUANT: i32 = 255;
pub const OUTPUT_QUANT: i32 = 64;

const MAGIC: [u8; 4] = *b"CBNF";
const EXPECTED_VERSION: u16 = 1;
const ARCH_PERSPECTIVE: u8 = 1;
const ACTIVATION_RELU: u8 = 2;
const MAX_NAME_LEN: usize = 48;

const COLOR_STRIDE: usize = 64 * 6;
const PIECE_STRIDE: usize = 64;

// King-square input buckets in standard orientation (a1 = 0): the back two
// ranks split by board half, everything above shares an advanced-king pair.
#[rustfmt::skip]
static KING_BUCKETS: [usize; 64] = [
    0, 0, 0, 0, 1, 1, 1, 1,
    0, 0, 0, 0, 1, 1, 1, 1,
    2, 2, 2, 2, 3, 3, 3, 3,
    2, 2, 2, 2, 3, 3, 3, 3,
    2, 2, 2, 2, 3, 3, 3, 3,
    2, 2, 2, 2, 3, 3, 3, 3,
    2, 2, 2, 2, 3, 3, 3, 3,
    2, 2, 2, 2, 3, 3, 3, 3,
];

/// Feature square: file-flipped into standard orientation, additionally
/// rank-flipped for the black perspective.
#[inline(always)]
pub fn feature_square_index(sq: usize, perspective: Color) -> usize {
    let mut idx = sq ^ 7;
    if perspective.is_black() {
        idx ^= 0x38;
    }
    idx
}

#[inline(always)]
pub fn king_bucket(perspective: Color, king_sq: usize) -> usize {
    KING_BUCKETS[feature_square_index(king_sq, perspective)]
}

/// A king move across a bucket boundary invalidates all features of that perspective
#[inline(always)]
pub fn refresh_required(perspective: Color, prev_king_sq: usize, king_sq: usize) -> bool {
    king_bucket(perspective, prev_king_sq) != king_bucket(perspective, king_sq)
}

#[inline(always)]
pub fn feature_index(perspective: Color, piece_color: Color, piece: Piece, sq: usize, king_sq: usize) -> usize {
    let color_offset = usize::from(piece_color != perspective) * COLOR_STRIDE;
    king_bucket(perspective, king_sq) * INPUT_SIZE
        + color_offset
        + piece.idx() * PIECE_STRIDE
        + feature_square_index(sq, perspective)
}

#[derive(Debug)]
pub enum NetworkError {
    Io(IoError),
    Validation(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Io(e) => write!(f, "network I/O error: {}", e),
            NetworkError::Validation(msg) => write!(f, "network validation error: {}", msg),
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<IoError> for NetworkError {
    fn from(e: IoError) -> Self {
        NetworkError::Io(e)
    }
}

struct NetworkHeader {
    magic: [u8; 4],
    version: u16,
    arch: u8,
    activation: u8,
    hidden_size: u16,
    input_buckets: u8,
    output_buckets: u8,
    name: String,
}

impl NetworkHeader {
    fn read_from(reader: &mut impl Read) -> Result<Self, NetworkError> {
        let mut raw = [0u8; HEADER_SIZE];
        reader.read_exact(&mut raw)?;

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&raw[0..4]);
        let version = u16::from_le_bytes([raw[4], raw[5]]);
        let arch = raw[9];
        let activation = raw[10];
        let hidden_size = u16::from_le_bytes([raw[11], raw[12]]);
        let input_buckets = raw[13];
        let output_buckets = raw[14];
        let name_len = (raw[15] as usize).min(MAX_NAME_LEN);
        let name = String::from_utf8_lossy(&raw[16..16 + name_len]).into_owned();

        Ok(NetworkHeader { magic, version, arch, activation, hidden_size, input_buckets, output_buckets, name })
    }

    fn validate(&self) -> Result<(), NetworkError> {
        if self.magic != MAGIC {
            return Err(NetworkError::Validation("invalid magic bytes in network header".to_string()));
        }
        if self.version != EXPECTED_VERSION {
            return Err(NetworkError::Validation(format!(
                "unsupported network format version {} (expected: {})",
                self.version, EXPECTED_VERSION
            )));
        }
        if self.arch != ARCH_PERSPECTIVE {
            return Err(NetworkError::Validation(format!("wrong network architecture {}", self.arch)));
        }
        if self.activation != ACTIVATION_RELU {
            return Err(NetworkError::Validation(format!("wrong l1 activation function {}", self.activation)));
        }
        if self.hidden_size as usize != LAYER1_SIZE {
            return Err(NetworkError::Validation(format!(
                "wrong number of hidden neurons ({}, expected: {})",
                self.hidden_size, LAYER1_SIZE
            )));
        }
        if self.input_buckets as usize != INPUT_BUCKETS {
            return Err(NetworkError::Validation(format!(
                "wrong number of input buckets ({}, expected: {})",
                self.input_buckets, INPUT_BUCKETS
            )));
        }
        if self.output_buckets as usize != OUTPUT_BUCKETS {
            return Err(NetworkError::Validation(format!(
                "wrong number of output buckets ({}, expected: {})",
                self.output_buckets, OUTPUT_BUCKETS
            )));
        }
        Ok(())
    }
}

pub struct Network {
    pub ft_weights: Box<A64<[i16; FT_WEIGHT_COUNT]>>,
    pub ft_biases: Box<A64<[i16; LAYER1_SIZE]>>,
    pub output_weights: Box<A64<[i16; OUTPUT_WEIGHT_COUNT]>>,
    pub output_biases: A64<[i16; OUTPUT_BUCKETS]>,
    pub name: String,
}

impl Default for Network {
    fn default() -> Self {
        Network {
            ft_weights: Box::new(A64([0; FT_WEIGHT_COUNT])),
            ft_biases: Box::new(A64([0; LAYER1_SIZE])),
            output_weights: Box::new(A64([0; OUTPUT_WEIGHT_COUNT])),
            output_biases: A64([0; OUTPUT_BUCKETS]),
            name: String::new(),
        }
    }
}

impl Network {
    /// Reads a full CBNF file: 64-byte header followed by the parameter
    /// blocks, each padded to a 64-byte boundary.
    pub fn read_from(reader: &mut impl Read) -> Result<Network, NetworkError> {
        let header = NetworkHeader::read_from(reader)?;
        header.validate()?;

        let mut network = Network::default();
        read_padded_i16s(reader, &mut network.ft_weights.0)?;
        read_padded_i16s(reader, &mut network.ft_biases.0)?;
        read_padded_i16s(reader, &mut network.output_weights.0)?;
        read_padded_i16s(reader, &mut network.output_biases.0)?;
        network.name = header.name;

        Ok(network)
    }

    pub fn load_file(path: &str) -> Result<Network, NetworkError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Network::read_from(&mut reader)
    }

    pub fn load_default() -> Network {
        static DEFAULT_NET: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/default.cbnf"));
        match Network::read_from(&mut &DEFAULT_NET[..]) {
            Ok(network) => network,
            // a broken embedded network is a build defect, not a runtime event
            Err(e) => {
                error!("embedded default network is invalid: {}", e);
                panic!("embedded default network is invalid: {}", e);
            }
        }
    }
}

static NETWORK: Mutex<Option<Arc<Network>>> = Mutex::new(None);

/// The process-wide network singleton. Initialised lazily from the embedded
/// default; replaced by `load_eval_file` before the next search starts.
pub fn network() -> Arc<Network> {
    let mut guard = NETWORK.lock().unwrap();
    guard.get_or_insert_with(|| Arc::new(Network::load_default())).clone()
}

/// Loads a network file for `setoption name EvalFile`. On failure the current
/// (or default) network stays active.
pub fn load_eval_file(path: &str) -> bool {
    match Network::load_file(path) {
        Ok(network) => {
            info!("loaded network '{}' from {}", network.name, path);
            *NETWORK.lock().unwrap() = Some(Arc::new(network));
            true
        }
        Err(e) => {
            warn!("could not load network from {}: {} - keeping current network", path, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{BLACK, WHITE};

    #[test]
    fn loads_embedded_default_network() {
        let network = Network::load_default();
        assert_eq!("fulminate-zero", network.name);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..4].copy_from_slice(b"XXXX");
        assert!(matches!(Network::read_from(&mut &data[..]), Err(NetworkError::Validation(_))));
    }

    #[test]
    fn rejects_wrong_dimensions() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..4].copy_from_slice(&MAGIC);
        data[4..6].copy_from_slice(&EXPECTED_VERSION.to_le_bytes());
        data[9] = ARCH_PERSPECTIVE;
        data[10] = ACTIVATION_RELU;
        data[11..13].copy_from_slice(&((LAYER1_SIZE as u16) * 2).to_le_bytes());
        data[13] = INPUT_BUCKETS as u8;
        data[14] = OUTPUT_BUCKETS as u8;
        assert!(matches!(Network::read_from(&mut &data[..]), Err(NetworkError::Validation(_))));
    }

    #[test]
    fn feature_square_flips_file_and_rank() {
        // a1 (internal 7) maps to 0 for white and to a8 for black
        assert_eq!(0, feature_square_index(7, WHITE));
        assert_eq!(56, feature_square_index(7, BLACK));
        // h1 (internal 0) maps to 7 for white
        assert_eq!(7, feature_square_index(0, WHITE));
    }

    #[test]
    fn feature_index_strides() {
        let king = 3; // e1
        let idx = feature_index(WHITE, WHITE, Piece::Pawn, 8 + 3, king);
        let bucket = king_bucket(WHITE, king) * INPUT_SIZE;
        assert_eq!(bucket + feature_square_index(8 + 3, WHITE), idx);

        let opp = feature_index(WHITE, BLACK, Piece::Pawn, 8 + 3, king);
        assert_eq!(idx + COLOR_STRIDE, opp);

        let knight = feature_index(WHITE, WHITE, Piece::Knight, 8 + 3, king);
        assert_eq!(idx + PIECE_STRIDE, knight);
    }

    #[test]
    fn mirrored_perspectives_share_features() {
        // the same physical setup seen from both sides yields the same index
        let white_idx = feature_index(WHITE, WHITE, Piece::Rook, 0, 3);
        let black_idx = feature_index(BLACK, BLACK, Piece::Rook, 56, 59);
        assert_eq!(white_idx, black_idx);
    }

    #[test]
    fn bucket_boundaries_trigger_refresh() {
        // e1 and d1 sit in different buckets (board halves)
        let e1 = 3;
        let d1 = 4;
        assert!(refresh_required(WHITE, e1, d1));
        // g1 and f1 share the king-side bucket
        let g1 = 1;
        let f1 = 2;
        assert!(!refresh_required(WHITE, g1, f1));
    }
}
