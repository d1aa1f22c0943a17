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
use crate::fen::{parse_fen, write_fen, START_POS};
use crate::moves::{Move, NO_MOVE};
use crate::perft::perft;
use crate::search::{Search, DEFAULT_SEARCH_THREADS};
use crate::search_context::GameHistory;
use crate::syzygy;
use crate::time_management::SearchLimits;
use crate::transposition_table::{TranspositionTable, DEFAULT_SIZE_MB};
use crate::nn;
use crate::uci_move::UCIMove;
use log::warn;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;

pub enum Message {
    ClearHash,
    Fen,
    Go(SearchLimits, bool, Option<Vec<String>>),
    IsReady,
    NewGame,
    Perft(i32),
    Profile,
    Quit,
    SetPosition(String, Vec<UCIMove>),
    SetThreadCount(i32),
    SetTableBasePath(String),
    SetTableBaseProbeDepth(i32),
    SetEvalFile(String),
    SetMoveOverhead(i32),
    SetTranspositionTableSize(i32),
    Stop,
    PonderHit,
}

#[repr(u8)]
#[derive(PartialOrd, PartialEq, Copy, Clone)]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

pub struct Engine {
    rx: Receiver<Message>,
    board: Board,
    game_history: GameHistory,
    initialized: bool,
    new_thread_count: Option<i32>,
    current_thread_count: i32,
    new_tt_size: Option<i32>,
    current_tt_size: i32,
    new_tb_path: Option<String>,
    new_eval_file: Option<String>,
    search: Search,
}

pub fn spawn_engine_thread() -> Sender<Message> {
    let (tx, rx) = mpsc::channel::<Message>();

    thread::spawn(move || {
        let mut engine = Engine::new(rx);
        engine.start_loop();
    });

    tx
}

impl Engine {
    pub fn new_from_fen(rx: Receiver<Message>, fen: &str, tt_size_mb: u64) -> Self {
        let board = parse_fen(fen).expect("invalid initial position");

        let search = Search::new(
            Arc::new(AtomicBool::new(true)),
            Arc::new(AtomicU64::new(0)),
            Arc::new(AtomicU64::new(0)),
            LogLevel::Info,
            SearchLimits::default(),
            TranspositionTable::new(tt_size_mb),
            board,
            false,
        );

        Engine {
            rx,
            board,
            game_history: GameHistory::default(),
            initialized: false,
            new_thread_count: None,
            current_thread_count: DEFAULT_SEARCH_THREADS as i32,
            new_tt_size: None,
            current_tt_size: DEFAULT_SIZE_MB as i32,
            new_tb_path: None,
            new_eval_file: None,
            search,
        }
    }

    pub fn new(rx: Receiver<Message>) -> Self {
        Engine::new_from_fen(rx, START_POS, DEFAULT_SIZE_MB)
    }

    fn start_loop(&mut self) {
        loop {
            match self.rx.recv() {
                Ok(msg) => {
                    if !self.handle_message(msg) {
                        return;
                    }
                }
                Err(err) => {
                    log::error!("engine communication error: {:?}", err);
                    return;
                }
            }
        }
    }

    fn handle_message(&mut self, msg: Message) -> bool {
        match msg {
            Message::NewGame => self.reset(),

            Message::SetPosition(fen, moves) => self.set_position(&fen, &moves),

            Message::SetTranspositionTableSize(size_mb) => {
                if size_mb != self.current_tt_size {
                    self.new_tt_size = Some(size_mb);
                    if self.initialized {
                        self.update_tt_size();
                    }
                }
            }

            Message::SetThreadCount(count) => {
                if count != self.current_thread_count {
                    self.new_thread_count = Some(count);
                    if self.initialized {
                        self.update_thread_count();
                    }
                }
            }

            Message::SetTableBasePath(path) => {
                self.new_tb_path = Some(path.trim().to_string());
                if self.initialized {
                    self.update_tb();
                }
            }

            Message::SetTableBaseProbeDepth(depth) => {
                self.search.set_tb_probe_depth(depth);
            }

            Message::SetEvalFile(path) => {
                self.new_eval_file = Some(path.trim().to_string());
                if self.initialized {
                    self.update_eval_file();
                }
            }

            Message::SetMoveOverhead(overhead) => {
                self.search.set_move_overhead(overhead);
            }

            Message::Perft(depth) => self.perft(depth),

            Message::IsReady => self.check_readiness(),

            Message::Go(limits, ponder, search_moves) => self.go(limits, ponder, search_moves),

            Message::Fen => println!("{}", write_fen(&self.board)),

            Message::Profile => {
                self.profile();
                return false;
            }

            Message::Quit => {
                return false;
            }

            Message::Stop => (),

            Message::PonderHit => println!("info string received 'ponderhit' outside an ongoing search"),

            Message::ClearHash => self.search.clear_tt(),
        }

        true
    }

    fn go(&mut self, limits: SearchLimits, ponder: bool, search_moves: Option<Vec<String>>) {
        let (m, ponder_m) = self.search(limits, ponder, search_moves);
        if m == NO_MOVE {
            println!("bestmove 0000");
            return;
        }

        let move_info = UCIMove::from_move(&self.board, m);

        if ponder_m != NO_MOVE {
            let next = self.board.forward(m);
            println!("bestmove {} ponder {}", move_info, UCIMove::from_move(&next, ponder_m));
        } else {
            println!("bestmove {}", move_info);
        }
    }

    fn search(&mut self, mut limits: SearchLimits, ponder: bool, search_moves: Option<Vec<String>>) -> (Move, Move) {
        let skipped_moves = self.determine_skipped_moves(search_moves);

        limits.update(self.board.active_player(), self.search.move_overhead());
        self.search.update(&self.board, self.game_history.clone(), limits, ponder);

        let (m, pv) = self.search.find_best_move(Some(&self.rx), 3, &skipped_moves);
        let ponder_m = pv.get(1).copied().unwrap_or(NO_MOVE);
        (m, ponder_m)
    }

    // `go searchmoves` restricts the root: everything else is skipped
    fn determine_skipped_moves(&self, search_moves: Option<Vec<String>>) -> Vec<Move> {
        let Some(search_moves) = search_moves else {
            return Vec::new();
        };
        if search_moves.is_empty() {
            return Vec::new();
        }

        let allowed: Vec<Move> = search_moves
            .iter()
            .filter_map(|uci| UCIMove::from_uci(uci))
            .filter_map(|m| m.to_move(&self.board))
            .collect();

        self.board
            .generate_moves(crate::move_gen::GenMode::All)
            .iter()
            .filter(|mv| !allowed.contains(mv))
            .collect()
    }

    fn check_readiness(&mut self) {
        // postponed initializations to keep startup latency low
        self.update_thread_count();
        self.update_tt_size();
        self.update_tb();
        self.update_eval_file();

        self.initialized = true;
        println!("readyok");
    }

    fn update_thread_count(&mut self) {
        if let Some(count) = self.new_thread_count.take() {
            self.search.reset_threads(count);
            self.current_thread_count = count;
        }
    }

    fn update_tt_size(&mut self) {
        if let Some(new_tt_size) = self.new_tt_size.take() {
            self.search.resize_tt(new_tt_size);
            self.current_tt_size = new_tt_size;
        }
    }

    fn update_tb(&mut self) {
        if let Some(path) = self.new_tb_path.take() {
            if syzygy::tb::init(&path) {
                println!("info string found {}-men atomic tablebases", syzygy::tb::max_piece_count());
            } else {
                warn!("no usable tablebases under: {}", path);
            }
        }
    }

    fn update_eval_file(&mut self) {
        if let Some(path) = self.new_eval_file.take() {
            if nn::load_eval_file(&path) {
                self.search.reload_network();
            }
        }
    }

    pub fn set_position(&mut self, fen: &str, moves: &[UCIMove]) {
        let mut board = match parse_fen(fen) {
            Ok(board) => board,
            Err(err) => {
                // the previous position is retained
                log::warn!("position cmd: {}", err);
                return;
            }
        };

        let mut history = GameHistory::default();
        for uci_move in moves {
            history.push(&board);
            match uci_move.to_move(&board) {
                Some(mv) => board = board.forward(mv),
                None => {
                    log::warn!("position cmd: illegal move in move list");
                    return;
                }
            }
        }

        self.board = board;
        self.game_history = history;
    }

    pub fn reset(&mut self) {
        self.search.clear_tt();
        self.hh_clear();
    }

    fn hh_clear(&mut self) {
        self.search.hh.clear();
    }

    fn perft(&mut self, depth: i32) {
        let start = Instant::now();
        let nodes = perft(&self.board, depth);
        let duration = start.elapsed();

        println!("Nodes: {}", nodes);
        println!("Duration: {:?}", duration);

        let duration_micro = duration.as_micros();
        if duration_micro > 0 {
            println!("Nodes per second: {}", nodes as u128 * 1_000_000 / duration_micro);
        }
    }

    pub fn profile(&mut self) {
        println!("Profiling ...");
        self.go(SearchLimits::nodes(100_000), false, None);
    }
}
