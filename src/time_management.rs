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

use crate::colors::Color;
use crate::search_context::MAX_PLY;
use std::time::{Duration, Instant};

pub const TIMEEXT_MULTIPLIER: i32 = 3;
pub const MAX_TIMELIMIT_MS: i32 = i32::MAX;

pub const DEFAULT_MOVE_OVERHEAD_MS: i32 = 20;
pub const MAX_MOVE_OVERHEAD_MS: i32 = 1000;
pub const MIN_MOVE_OVERHEAD_MS: i32 = 0;

#[derive(Clone)]
pub struct TimeManager {
    starttime: Instant,
    timelimit_ms: i32,

    allow_time_extension: bool,
    time_extended: bool,

    last_score: Option<i32>,
    score_dropped: bool,
    best_move_changed: bool,
}

impl TimeManager {
    pub fn new() -> Self {
        TimeManager {
            starttime: Instant::now(),
            timelimit_ms: 0,
            allow_time_extension: true,
            time_extended: false,
            last_score: None,
            score_dropped: false,
            best_move_changed: false,
        }
    }

    pub fn reset(&mut self, limits: SearchLimits) {
        self.starttime = Instant::now();
        self.timelimit_ms = limits.time_limit_ms;
        self.allow_time_extension = !limits.strict_time_limit;
        self.time_extended = false;
        self.last_score = None;
        self.score_dropped = false;
        self.best_move_changed = false;
    }

    pub fn update_iteration(&mut self, score: i32, best_move_changed: bool) {
        self.score_dropped = self.last_score.is_some_and(|last| score < last);
        self.best_move_changed = best_move_changed;
        self.last_score = Some(score);
    }

    pub fn is_time_for_another_iteration(&self, now: Instant, previous_iteration_time: Duration) -> bool {
        if self.time_extended && !(self.score_dropped || self.best_move_changed) {
            return false;
        }

        let duration_ms = previous_iteration_time.as_millis() as i32;
        let estimated_iteration_duration = duration_ms * 7 / 4;
        self.remaining_time_ms(now) >= estimated_iteration_duration
    }

    pub fn search_duration_ms(&self, now: Instant) -> i32 {
        self.search_duration(now).as_millis() as i32
    }

    pub fn search_duration(&self, now: Instant) -> Duration {
        now.duration_since(self.starttime)
    }

    pub fn remaining_time_ms(&self, now: Instant) -> i32 {
        self.timelimit_ms.saturating_sub(self.search_duration_ms(now))
    }

    pub fn is_timelimit_exceeded(&self, now: Instant) -> bool {
        self.remaining_time_ms(now) <= 0
    }

    /// Grants extra thinking time once, when the last iteration looked unstable
    pub fn try_extend_timelimit(&mut self) -> bool {
        if !self.allow_time_extension {
            return false;
        }

        if self.best_move_changed || self.score_dropped {
            self.allow_time_extension = false;
            self.timelimit_ms = self.timelimit_ms.saturating_mul(TIMEEXT_MULTIPLIER);
            self.time_extended = true;
            return true;
        }

        false
    }

    /// Spend less time when there is only one sensible move
    pub fn reduce_timelimit(&mut self) {
        self.allow_time_extension = false;
        self.timelimit_ms /= 32;
    }
}

#[derive(Copy, Clone, Debug)]
pub struct SearchLimits {
    node_limit: u64,
    depth_limit: i32,
    mate_limit: i32,
    time_limit_ms: i32,
    strict_time_limit: bool,
    infinite: bool,

    wtime: i32,
    btime: i32,
    winc: i32,
    binc: i32,
    move_time: i32,
    moves_to_go: i32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            node_limit: u64::MAX,
            depth_limit: MAX_PLY as i32 - 1,
            mate_limit: 0,
            time_limit_ms: MAX_TIMELIMIT_MS,
            strict_time_limit: true,
            infinite: false,

            wtime: -1,
            btime: -1,
            winc: 0,
            binc: 0,
            move_time: -1,
            moves_to_go: 25,
        }
    }
}

impl SearchLimits {
    pub fn infinite() -> SearchLimits {
        SearchLimits { infinite: true, ..SearchLimits::default() }
    }

    pub fn nodes(node_limit: u64) -> SearchLimits {
        SearchLimits { node_limit, ..SearchLimits::default() }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        depth_limit: Option<i32>, node_limit: Option<u64>, wtime: Option<i32>, btime: Option<i32>, winc: Option<i32>,
        binc: Option<i32>, move_time: Option<i32>, moves_to_go: Option<i32>, mate_limit: Option<i32>,
    ) -> Result<Self, &'static str> {
        let depth_limit = depth_limit.unwrap_or(MAX_PLY as i32 - 1);
        if depth_limit <= 0 {
            return Err("depth limit must be > 0");
        }

        Ok(SearchLimits {
            depth_limit: depth_limit.min(MAX_PLY as i32 - 1),
            node_limit: node_limit.unwrap_or(u64::MAX),
            mate_limit: mate_limit.unwrap_or(0),
            time_limit_ms: MAX_TIMELIMIT_MS,
            strict_time_limit: true,
            infinite: false,

            wtime: wtime.unwrap_or(-1),
            btime: btime.unwrap_or(-1),
            winc: winc.unwrap_or(0),
            binc: binc.unwrap_or(0),
            move_time: move_time.unwrap_or(-1),
            moves_to_go: moves_to_go.unwrap_or(25),
        })
    }

    /// Derives the effective time budget for the side to move
    pub fn update(&mut self, active_player: Color, move_overhead_ms: i32) {
        let (time_left, inc) = if active_player.is_white() { (self.wtime, self.winc) } else { (self.btime, self.binc) };

        self.time_limit_ms = calc_time_limit(self.move_time, time_left, inc, self.moves_to_go, move_overhead_ms);

        self.strict_time_limit = self.move_time > 0
            || self.time_limit_ms == MAX_TIMELIMIT_MS
            || self.moves_to_go == 1
            || (time_left - (TIMEEXT_MULTIPLIER * self.time_limit_ms) <= move_overhead_ms);
    }

    pub fn node_limit(&self) -> u64 {
        self.node_limit
    }

    pub fn set_node_limit(&mut self, limit: u64) {
        self.node_limit = limit;
    }

    pub fn depth_limit(&self) -> i32 {
        self.depth_limit
    }

    pub fn mate_limit(&self) -> i32 {
        self.mate_limit
    }

    pub fn is_infinite(&self) -> bool {
        self.infinite
    }
}

fn calc_time_limit(move_time: i32, time_left: i32, inc: i32, moves_to_go: i32, move_overhead_ms: i32) -> i32 {
    if move_time > 0 {
        return (move_time - move_overhead_ms).max(1);
    }

    if time_left < 0 {
        return MAX_TIMELIMIT_MS;
    }

    let base = time_left / moves_to_go.max(1) + inc * 3 / 4;
    base.min(time_left - move_overhead_ms).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{BLACK, WHITE};

    #[test]
    fn movetime_is_strict() {
        let mut limits =
            SearchLimits::new(None, None, None, None, None, None, Some(2000), None, None).unwrap();
        limits.update(WHITE, DEFAULT_MOVE_OVERHEAD_MS);
        assert!(limits.strict_time_limit);
        assert_eq!(2000 - DEFAULT_MOVE_OVERHEAD_MS, limits.time_limit_ms);
    }

    #[test]
    fn clock_time_is_budgeted_per_move() {
        let mut limits =
            SearchLimits::new(None, None, Some(60_000), Some(60_000), None, None, None, None, None).unwrap();
        limits.update(BLACK, DEFAULT_MOVE_OVERHEAD_MS);
        assert!(limits.time_limit_ms > 0);
        assert!(limits.time_limit_ms < 60_000);
    }

    #[test]
    fn no_clock_means_unlimited() {
        let mut limits = SearchLimits::default();
        limits.update(WHITE, DEFAULT_MOVE_OVERHEAD_MS);
        assert_eq!(MAX_TIMELIMIT_MS, limits.time_limit_ms);
        assert!(limits.strict_time_limit);
    }

    #[test]
    fn extension_only_on_instability() {
        let mut limits =
            SearchLimits::new(None, None, Some(600_000), Some(600_000), None, None, None, Some(10), None).unwrap();
        limits.update(WHITE, DEFAULT_MOVE_OVERHEAD_MS);

        let mut tm = TimeManager::new();
        tm.reset(limits);

        tm.update_iteration(50, false);
        tm.update_iteration(60, false);
        assert!(!tm.try_extend_timelimit(), "stable iterations do not extend");

        tm.update_iteration(-20, true);
        assert!(tm.try_extend_timelimit());
        assert!(!tm.try_extend_timelimit(), "extension is granted only once");
    }
}
