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

use crate::engine::Message;
use crate::fen::START_POS;
use crate::search::{DEFAULT_SEARCH_THREADS, MAX_SEARCH_THREADS};
use crate::time_management::{
    SearchLimits, DEFAULT_MOVE_OVERHEAD_MS, MAX_MOVE_OVERHEAD_MS, MIN_MOVE_OVERHEAD_MS,
};
use crate::transposition_table::{DEFAULT_SIZE_MB, MAX_HASH_SIZE_MB};
use crate::uci_move::UCIMove;
use std::collections::HashSet;
use std::io;
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::thread::sleep;
use std::time::Duration;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHOR: &str = "Fulminate developers";

const GO_CMDS: [&str; 12] = [
    "searchmoves",
    "ponder",
    "wtime",
    "btime",
    "winc",
    "binc",
    "movestogo",
    "depth",
    "nodes",
    "mate",
    "movetime",
    "infinite",
];

pub fn start_uci_loop(tx: &Sender<Message>) {
    println!("Fulminate Atomic Chess Engine v{}", VERSION);

    let go_cmds = HashSet::from(GO_CMDS);

    loop {
        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            log::error!("failed to read line from stdin");
            return;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        for (i, part) in parts.iter().enumerate() {
            match part.to_lowercase().as_str() {
                "go" => go(tx, &go_cmds, &parts[i + 1..]),

                "isready" => send_message(tx, Message::IsReady),

                "perft" => perft(tx, &parts[i + 1..]),

                "position" => set_position(tx, &parts[i + 1..]),

                "quit" => {
                    send_message(tx, Message::Stop);
                    sleep(Duration::from_millis(10));

                    send_message(tx, Message::Quit);
                    sleep(Duration::from_millis(10));
                    return;
                }

                "setoption" => set_option(tx, &parts[i + 1..]),

                "stop" => send_message(tx, Message::Stop),

                "ponderhit" => send_message(tx, Message::PonderHit),

                "uci" => uci(),

                "ucinewgame" => send_message(tx, Message::NewGame),

                "printfen" => send_message(tx, Message::Fen),

                "profile" | "bench" => {
                    send_message(tx, Message::Profile);
                    sleep(Duration::from_millis(500));
                    return;
                }

                _ => {
                    // skip unknown tokens; the engine state stays unchanged
                }
            }
        }
    }
}

fn send_message(tx: &Sender<Message>, msg: Message) {
    if let Err(err) = tx.send(msg) {
        log::error!("could not send message to engine thread: {}", err);
    }
}

fn uci() {
    println!("id name Fulminate v{}", VERSION);
    println!("id author {}", AUTHOR);
    println!("option name UCI_Variant type combo default atomic var atomic");
    println!("option name Hash type spin default {} min 1 max {}", DEFAULT_SIZE_MB, MAX_HASH_SIZE_MB);
    println!("option name Threads type spin default {} min 1 max {}", DEFAULT_SEARCH_THREADS, MAX_SEARCH_THREADS);
    println!("option name Ponder type check default false");
    println!("option name SyzygyPath type string default <empty>");
    println!("option name SyzygyProbeDepth type spin default 0 min 0 max 100");
    println!("option name EvalFile type string default <embedded>");
    println!(
        "option name MoveOverhead type spin default {} min {} max {}",
        DEFAULT_MOVE_OVERHEAD_MS, MIN_MOVE_OVERHEAD_MS, MAX_MOVE_OVERHEAD_MS
    );
    println!("uciok");
}

fn set_position(tx: &Sender<Message>, parts: &[&str]) {
    let fen = parse_position_cmd(parts);

    let moves = match parts.iter().position(|&part| part == "moves") {
        Some(idx) => parse_moves(idx, parts),
        None => Vec::new(),
    };

    send_message(tx, Message::SetPosition(fen, moves));
}

fn set_option(tx: &Sender<Message>, parts: &[&str]) {
    if parts.len() < 2 || parts[0] != "name" {
        println!("info string malformed setoption command");
        return;
    }

    let name = parts[1].to_ascii_lowercase();
    let value = match parts.iter().position(|&part| part == "value") {
        Some(idx) => parts[idx + 1..].join(" "),
        None => String::new(),
    };

    match name.as_str() {
        "hash" => {
            if let Some(size_mb) = parse_int_option(&value, 1, MAX_HASH_SIZE_MB) {
                send_message(tx, Message::SetTranspositionTableSize(size_mb));
            } else {
                println!("info string invalid hash size: {}", value);
            }
        }

        "threads" => {
            if let Some(threads) = parse_int_option(&value, 1, MAX_SEARCH_THREADS as i32) {
                send_message(tx, Message::SetThreadCount(threads));
            } else {
                println!("info string invalid thread count: {}", value);
            }
        }

        "syzygypath" => send_message(tx, Message::SetTableBasePath(value)),

        "syzygyprobedepth" => {
            if let Some(depth) = parse_int_option(&value, 0, 100) {
                send_message(tx, Message::SetTableBaseProbeDepth(depth));
            }
        }

        "evalfile" => send_message(tx, Message::SetEvalFile(value)),

        "moveoverhead" => {
            if let Some(overhead) = parse_int_option(&value, MIN_MOVE_OVERHEAD_MS, MAX_MOVE_OVERHEAD_MS) {
                send_message(tx, Message::SetMoveOverhead(overhead));
            }
        }

        "clear" | "clearhash" => send_message(tx, Message::ClearHash),

        "ponder" | "uci_variant" => {}

        _ => println!("info string unknown option: {}", name),
    }
}

fn parse_int_option(value: &str, min_value: i32, max_value: i32) -> Option<i32> {
    let value = i32::from_str(value).ok()?;

    if value < min_value {
        println!("info string value too low, clamping to {}", min_value);
        Some(min_value)
    } else if value > max_value {
        println!("info string value too high, clamping to {}", max_value);
        Some(max_value)
    } else {
        Some(value)
    }
}

fn parse_moves(idx: usize, parts: &[&str]) -> Vec<UCIMove> {
    let mut moves: Vec<UCIMove> = Vec::new();

    for part in &parts[idx + 1..] {
        match UCIMove::from_uci(part) {
            Some(m) => moves.push(m),
            None => {
                log::warn!("could not parse move notation: {}", part);
                return moves;
            }
        }
    }

    moves
}

fn perft(tx: &Sender<Message>, parts: &[&str]) {
    if parts.is_empty() {
        println!("info string perft: missing depth");
        return;
    }

    match i32::from_str(parts[0]) {
        Ok(depth) => send_message(tx, Message::Perft(depth)),
        Err(_) => println!("info string perft: invalid depth parameter: {}", parts[0]),
    }
}

fn go(tx: &Sender<Message>, valid_cmds: &HashSet<&str>, parts: &[&str]) {
    let mut depth_limit: Option<i32> = None;
    let mut node_limit: Option<u64> = None;
    let mut wtime: Option<i32> = None;
    let mut btime: Option<i32> = None;
    let mut winc: Option<i32> = None;
    let mut binc: Option<i32> = None;
    let mut move_time: Option<i32> = None;
    let mut moves_to_go: Option<i32> = None;
    let mut search_moves: Option<Vec<String>> = None;
    let mut mate_limit: Option<i32> = None;
    let mut unlimited = false;
    let mut ponder = false;

    let mut i = 0;
    while i < parts.len() {
        i = match parts[i] {
            "wtime" => set_cmd_arg(parts, &mut wtime, i + 1),
            "btime" => set_cmd_arg(parts, &mut btime, i + 1),
            "winc" => set_cmd_arg(parts, &mut winc, i + 1),
            "binc" => set_cmd_arg(parts, &mut binc, i + 1),
            "movetime" => set_cmd_arg(parts, &mut move_time, i + 1),
            "movestogo" => set_cmd_arg(parts, &mut moves_to_go, i + 1),
            "depth" => set_cmd_arg(parts, &mut depth_limit, i + 1),
            "nodes" => set_cmd_arg(parts, &mut node_limit, i + 1),
            "mate" => set_cmd_arg(parts, &mut mate_limit, i + 1),
            "searchmoves" => parse_cmd_multi_arg(valid_cmds, parts, &mut search_moves, i + 1),
            "ponder" => {
                ponder = true;
                i + 1
            }
            "infinite" => {
                unlimited = true;
                i + 1
            }
            _ => i + 1,
        }
    }

    let limits = if unlimited {
        SearchLimits::infinite()
    } else {
        match SearchLimits::new(depth_limit, node_limit, wtime, btime, winc, binc, move_time, moves_to_go, mate_limit) {
            Ok(limits) => limits,
            Err(e) => {
                log::warn!("go: invalid search params: {}", e);
                return;
            }
        }
    };

    send_message(tx, Message::Go(limits, ponder, search_moves));
}

fn set_cmd_arg<T: FromStr>(parts: &[&str], target: &mut Option<T>, pos: usize) -> usize {
    if let Some(value) = parts.get(pos) {
        *target = T::from_str(value).ok();
    }

    pos + 1
}

fn parse_cmd_multi_arg(
    valid_cmds: &HashSet<&str>, parts: &[&str], target: &mut Option<Vec<String>>, mut pos: usize,
) -> usize {
    let mut values = Vec::new();
    while let Some(&value) = parts.get(pos) {
        if valid_cmds.contains(value.to_lowercase().as_str()) {
            break;
        }

        values.push(value.to_string());
        pos += 1;
    }
    *target = Some(values);
    pos
}

fn parse_position_cmd(parts: &[&str]) -> String {
    if parts.is_empty() {
        log::warn!("position command: missing fen/startpos");
        return String::from(START_POS);
    }

    let pos_end = parts.iter().position(|&part| part.to_lowercase().as_str() == "moves").unwrap_or(parts.len());

    let pos_option = if parts[0].to_lowercase() == "fen" { parts[1..pos_end].join(" ") } else { String::new() };

    if pos_option.is_empty() {
        String::from(START_POS)
    } else {
        pos_option
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_position_startpos() {
        let parts: Vec<&str> = "   startpos moves e2e4  ".split_whitespace().collect();
        assert_eq!(parse_position_cmd(&parts), START_POS);
    }

    #[test]
    fn parse_position_fen() {
        let fen: &str = "r3k1r1/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K1R1 w Qq - 0 1";
        let part_str = format!("   fen \t {}   moves e2e4  ", fen);
        let parts: Vec<&str> = part_str.split_whitespace().collect();

        assert_eq!(parse_position_cmd(&parts), fen);
    }
}
