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

use fulminate::engine;
use fulminate::engine::Message;
use fulminate::init;
use fulminate::uci;
use std::process::exit;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    init();
    let tx = engine::spawn_engine_thread();

    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "bench" | "profile" => {
                if tx.send(Message::Profile).is_err() {
                    log::error!("failed to start profile run");
                    exit(2);
                }
                std::thread::sleep(std::time::Duration::from_millis(500));
                return;
            }
            other => {
                eprintln!("unknown argument: {}", other);
                exit(2);
            }
        }
    }

    uci::start_uci_loop(&tx);
}
