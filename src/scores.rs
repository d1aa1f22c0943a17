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

pub const MAX_SCORE: i32 = 32000;
pub const MIN_SCORE: i32 = -MAX_SCORE;

pub const MATE_SCORE: i32 = 30000;
pub const MATED_SCORE: i32 = -MATE_SCORE;
const MATE_SCORE_RANGE: i32 = 512;

pub const MAX_EVAL: i32 = MATE_SCORE - (MATE_SCORE_RANGE + 1);
pub const MIN_EVAL: i32 = -MAX_EVAL;

/// Winning by exploding the enemy king at the given ply
#[inline(always)]
pub fn win_score(ply: usize) -> i32 {
    MATE_SCORE - ply as i32
}

#[inline(always)]
pub fn loss_score(ply: usize) -> i32 {
    MATED_SCORE + ply as i32
}

pub fn is_mate_or_mated_score(score: i32) -> bool {
    score.abs() >= (MATE_SCORE - MATE_SCORE_RANGE)
}

pub fn is_mate_score(score: i32) -> bool {
    score >= (MATE_SCORE - MATE_SCORE_RANGE)
}

pub fn is_mated_score(score: i32) -> bool {
    score <= (MATED_SCORE + MATE_SCORE_RANGE)
}

pub fn is_eval_score(score: i32) -> bool {
    score.abs() <= MAX_EVAL
}

pub fn mate_in(score: i32) -> Option<i32> {
    let mate_ply_distance = MATE_SCORE - score;
    if (0..=MATE_SCORE_RANGE).contains(&mate_ply_distance) {
        Some((mate_ply_distance + 1) / 2)
    } else {
        None
    }
}

pub fn sanitize_score(score: i32) -> i32 {
    score.clamp(MATED_SCORE, MATE_SCORE)
}

pub fn sanitize_eval_score(score: i32) -> i32 {
    score.clamp(MIN_EVAL, MAX_EVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_distances() {
        assert_eq!(Some(1), mate_in(win_score(1)));
        assert_eq!(Some(2), mate_in(win_score(3)));
        assert_eq!(None, mate_in(1000));
        assert_eq!(None, mate_in(loss_score(2)));
    }

    #[test]
    fn score_classification() {
        assert!(is_mate_score(win_score(4)));
        assert!(is_mated_score(loss_score(4)));
        assert!(is_mate_or_mated_score(loss_score(0)));
        assert!(is_eval_score(0));
        assert!(!is_eval_score(win_score(10)));
    }

    #[test]
    fn eval_scores_stay_clear_of_mate_range() {
        assert!(sanitize_eval_score(i32::MAX) < MATE_SCORE - MATE_SCORE_RANGE);
        assert!(sanitize_eval_score(i32::MIN) > MATED_SCORE + MATE_SCORE_RANGE);
    }
}
