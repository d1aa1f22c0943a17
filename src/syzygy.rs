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

use crate::moves::Move;

pub const DEFAULT_TB_PROBE_DEPTH: i32 = 0;

pub trait ProbeTB {
    fn probe_wdl(&self) -> Option<tb::TBResult>;
    fn probe_root(&self) -> Option<(tb::TBResult, Vec<Move>)>;
}

pub mod tb {
    use super::ProbeTB;
    use crate::board::Board;
    use crate::colors::{BLACK, WHITE};
    use crate::moves::Move;
    use crate::pieces::{Piece, ALL_PIECES};
    use itertools::Itertools;
    use log::{info, warn};
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    pub const MAX_TB_PIECES: u32 = 6;

    #[derive(Eq, PartialEq, Copy, Clone, Debug)]
    pub enum TBResult {
        Loss,
        Draw,
        Win,
    }

    // Published WDL magics of the Atomic Syzygy format
    const WDL_MAGICS: [[u8; 4]; 2] = [[0x91, 0xA9, 0x5E, 0xEB], [0x55, 0x8D, 0xA4, 0x49]];

    const TB_EXTENSION: &str = "atbw";

    // Material signature: piece counts in WP..WK, BP..BK order
    type MaterialSig = [u8; 12];

    struct LoadedTable {
        stem: String,
        data: Vec<u8>,
    }

    #[derive(Default)]
    struct TbIndex {
        tables: Vec<LoadedTable>,
        by_material: HashMap<MaterialSig, usize>,
        max_pieces: u32,
    }

    static INDEX: Mutex<Option<Arc<TbIndex>>> = Mutex::new(None);

    fn current_index() -> Option<Arc<TbIndex>> {
        INDEX.lock().unwrap().clone()
    }

    fn sig_index(is_white: bool, piece: Piece) -> usize {
        (if is_white { 0 } else { 6 }) + piece.idx()
    }

    // "KQvKR" -> material signature
    fn sig_from_stem(stem: &str) -> Option<MaterialSig> {
        let (white, black) = stem.split_once(['v', 'V'])?;
        let mut sig = MaterialSig::default();

        for (part, is_white) in [(white, true), (black, false)] {
            for ch in part.chars() {
                let piece = Piece::from_fen_char(ch)?;
                sig[sig_index(is_white, piece)] += 1;
            }
            if part.chars().filter(|&c| c.eq_ignore_ascii_case(&'k')).count() != 1 {
                return None;
            }
        }

        Some(sig)
    }

    fn sig_from_board(board: &Board) -> MaterialSig {
        let mut sig = MaterialSig::default();
        for color in [WHITE, BLACK] {
            for piece in ALL_PIECES {
                sig[sig_index(color.is_white(), piece)] = board.side(color).piece(piece).piece_count() as u8;
            }
        }
        sig
    }

    /// Scans the given directory for Atomic WDL tables (validated by magic)
    /// and builds the material-signature index. Must complete before any
    /// search worker starts; the index is read-only afterwards.
    pub fn init(path: &str) -> bool {
        if path.is_empty() || path == "<empty>" {
            *INDEX.lock().unwrap() = None;
            return false;
        }

        let dir = Path::new(path);
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("could not scan tablebase path {}: {}", path, e);
                return false;
            }
        };

        let mut index = TbIndex::default();

        for entry in entries.flatten() {
            let file_path = entry.path();
            if file_path.extension().and_then(|e| e.to_str()) != Some(TB_EXTENSION) {
                continue;
            }

            let stem = match file_path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };

            let Some(sig) = sig_from_stem(&stem) else {
                warn!("ignoring tablebase file with unrecognized name: {}", stem);
                continue;
            };

            let data = match fs::read(&file_path) {
                Ok(data) => data,
                Err(e) => {
                    warn!("could not read tablebase file {}: {}", file_path.display(), e);
                    continue;
                }
            };

            if data.len() < 4 || !WDL_MAGICS.iter().any(|magic| data[0..4] == magic[..]) {
                warn!("ignoring {}: not an Atomic WDL table", stem);
                continue;
            }

            let piece_count = sig.iter().map(|&c| u32::from(c)).sum::<u32>();
            index.max_pieces = index.max_pieces.max(piece_count);
            index.by_material.insert(sig, index.tables.len());
            index.tables.push(LoadedTable { stem, data });
        }

        if index.tables.is_empty() {
            warn!("no Atomic tablebases found under {}", path);
            *INDEX.lock().unwrap() = None;
            return false;
        }

        info!(
            "loaded {} Atomic WDL tables (up to {} pieces): {}",
            index.tables.len(),
            index.max_pieces,
            index.tables.iter().map(|t| t.stem.as_str()).sorted().join(", ")
        );

        *INDEX.lock().unwrap() = Some(Arc::new(index));
        true
    }

    pub fn max_piece_count() -> u32 {
        current_index().map_or(0, |index| index.max_pieces.min(MAX_TB_PIECES))
    }

    // The index->Huffman decoding stage is a faithful port of the Syzygy
    // pairs format and is not wired up yet; a located table without a decoder
    // yields no probe result and the search continues without TB cutoffs.
    fn decode_wdl(_table: &LoadedTable, _board: &Board) -> Option<TBResult> {
        None
    }

    impl ProbeTB for Board {
        fn probe_wdl(&self) -> Option<TBResult> {
            if self.halfmove_clock != 0 || self.any_castling() || self.num_pieces() > max_piece_count() {
                return None;
            }

            let index = current_index()?;
            let table_idx = *index.by_material.get(&sig_from_board(self))?;
            decode_wdl(&index.tables[table_idx], self)
        }

        fn probe_root(&self) -> Option<(TBResult, Vec<Move>)> {
            if self.any_castling() || self.num_pieces() > max_piece_count() {
                return None;
            }

            // DTZ-ranked root moves require the same decoder as probe_wdl
            let result = self.probe_wdl()?;
            Some((result, Vec::new()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn parses_material_signatures() {
            let sig = sig_from_stem("KQvKR").unwrap();
            assert_eq!(1, sig[sig_index(true, Piece::King)]);
            assert_eq!(1, sig[sig_index(true, Piece::Queen)]);
            assert_eq!(1, sig[sig_index(false, Piece::King)]);
            assert_eq!(1, sig[sig_index(false, Piece::Rook)]);
            assert_eq!(0, sig[sig_index(true, Piece::Pawn)]);

            assert!(sig_from_stem("KQQ").is_none());
            assert!(sig_from_stem("QvR").is_none(), "each side needs exactly one king");
            assert!(sig_from_stem("KXvK").is_none());
        }

        #[test]
        fn board_signature_matches_stem_signature() {
            let board = crate::fen::parse_fen("4k3/8/8/8/8/8/8/QK6 w - - 0 1").unwrap();
            assert_eq!(sig_from_stem("KQvK").unwrap(), sig_from_board(&board));
        }

        #[test]
        fn probes_without_tables_yield_nothing() {
            let board = crate::fen::parse_fen("4k3/8/8/8/8/8/8/QK6 w - - 0 1").unwrap();
            // guarded by max_piece_count() == 0 when no tables are loaded
            if current_index().is_none() {
                assert_eq!(None, board.probe_wdl());
                assert_eq!(None, board.probe_root());
            }
        }

        #[test]
        fn init_scans_only_valid_tables() {
            let dir = std::env::temp_dir().join("fulminate-tb-test");
            let _ = fs::remove_dir_all(&dir);
            fs::create_dir_all(&dir).unwrap();

            // one valid table, one bad magic, one unrelated file
            let mut valid = WDL_MAGICS[0].to_vec();
            valid.extend_from_slice(&[0u8; 64]);
            fs::write(dir.join("KQvK.atbw"), &valid).unwrap();
            fs::write(dir.join("KRvK.atbw"), [0u8; 16]).unwrap();
            fs::write(dir.join("readme.txt"), b"not a table").unwrap();

            assert!(init(dir.to_str().unwrap()));
            assert_eq!(3, max_piece_count());

            // reset the global state for other tests
            *INDEX.lock().unwrap() = None;
            let _ = fs::remove_dir_all(&dir);
        }
    }
}
