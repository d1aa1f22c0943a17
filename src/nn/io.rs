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

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Error, Read};

pub const HEADER_SIZE: usize = 64;

/// Parameter blocks are padded to 64-byte boundaries in the network file
pub const PARAM_BLOCK_ALIGN: usize = 64;

/// Reads one parameter block of little-endian i16 values and skips the
/// padding up to the next block boundary.
pub fn read_padded_i16s(reader: &mut impl Read, dst: &mut [i16]) -> Result<(), Error> {
    reader.read_i16_into::<LittleEndian>(dst)?;

    let bytes = dst.len() * 2;
    let padding = bytes.div_ceil(PARAM_BLOCK_ALIGN) * PARAM_BLOCK_ALIGN - bytes;
    if padding > 0 {
        let mut sink = [0u8; PARAM_BLOCK_ALIGN];
        reader.read_exact(&mut sink[..padding])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_block_and_skips_padding() {
        // 3 i16 values (6 bytes) padded to 64 bytes, followed by a marker
        let mut data = vec![0u8; PARAM_BLOCK_ALIGN + 2];
        data[0..2].copy_from_slice(&100i16.to_le_bytes());
        data[2..4].copy_from_slice(&(-7i16).to_le_bytes());
        data[4..6].copy_from_slice(&32000i16.to_le_bytes());
        data[PARAM_BLOCK_ALIGN] = 0xAB;
        data[PARAM_BLOCK_ALIGN + 1] = 0xCD;

        let mut reader = &data[..];
        let mut block = [0i16; 3];
        read_padded_i16s(&mut reader, &mut block).unwrap();
        assert_eq!([100, -7, 32000], block);

        let mut marker = [0u8; 2];
        reader.read_exact(&mut marker).unwrap();
        assert_eq!([0xAB, 0xCD], marker);
    }

    #[test]
    fn aligned_block_has_no_padding() {
        let values: Vec<u8> = (0..PARAM_BLOCK_ALIGN as u8).collect();
        let mut reader = &values[..];
        let mut block = [0i16; PARAM_BLOCK_ALIGN / 2];
        read_padded_i16s(&mut reader, &mut block).unwrap();
        assert!(reader.is_empty());
    }
}
