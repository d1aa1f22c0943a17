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

// Generates the embedded default network. If FULMINATE_EVALFILE points to a
// real CBNF file, that file is embedded instead; otherwise a zero-weight
// network with a valid header is written, which evaluates every position to
// 0 cp and keeps the engine functional without a bundled binary blob.

use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;

// Must match the constants in src/nn.rs
const LAYER1_SIZE: usize = 256;
const INPUT_SIZE: usize = 768;
const INPUT_BUCKETS: usize = 4;
const OUTPUT_BUCKETS: usize = 8;
const PARAM_BLOCK_ALIGN: usize = 64;

fn padded(len_bytes: usize) -> usize {
    len_bytes.div_ceil(PARAM_BLOCK_ALIGN) * PARAM_BLOCK_ALIGN
}

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let target = Path::new(&out_dir).join("default.cbnf");

    println!("cargo:rerun-if-env-changed=FULMINATE_EVALFILE");

    if let Ok(path) = env::var("FULMINATE_EVALFILE") {
        if !path.is_empty() {
            println!("cargo:rerun-if-changed={}", path);
            fs::copy(&path, &target).expect("failed to copy FULMINATE_EVALFILE");
            return;
        }
    }

    let mut header = [0u8; 64];
    header[0..4].copy_from_slice(b"CBNF");
    header[4..6].copy_from_slice(&1u16.to_le_bytes()); // version
    header[6..8].copy_from_slice(&0u16.to_le_bytes()); // flags
    header[8] = 0; // padding
    header[9] = 1; // arch: perspective
    header[10] = 2; // l1 activation: relu
    header[11..13].copy_from_slice(&(LAYER1_SIZE as u16).to_le_bytes());
    header[13] = INPUT_BUCKETS as u8;
    header[14] = OUTPUT_BUCKETS as u8;
    let name = b"fulminate-zero";
    header[15] = name.len() as u8;
    header[16..16 + name.len()].copy_from_slice(name);

    let ft_weights = padded(INPUT_BUCKETS * INPUT_SIZE * LAYER1_SIZE * 2);
    let ft_biases = padded(LAYER1_SIZE * 2);
    let out_weights = padded(OUTPUT_BUCKETS * 2 * LAYER1_SIZE * 2);
    let out_biases = padded(OUTPUT_BUCKETS * 2);
    let param_bytes = ft_weights + ft_biases + out_weights + out_biases;

    let mut file = fs::File::create(&target).expect("failed to create default network");
    file.write_all(&header).expect("failed to write network header");
    file.write_all(&vec![0u8; param_bytes]).expect("failed to write network parameters");
}
