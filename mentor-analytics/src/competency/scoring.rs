//! Pure scoring rules for competency updates.
//!
//! Everything here is deterministic and side-effect free so the model can
//! apply it inside a single locked read-modify-write.

use crate::types::{Difficulty, MAX_LEVEL, MIN_LEVEL, TaskOutcome};

/// Weight of the running success rate in the level score.
const SUCCESS_RATE_WEIGHT: f64 = 0.6;

/// Weight of practice volume in the level score.
const VOLUME_WEIGHT: f64 = 0.2;

/// Weight of the latest outcome in the level score.
const RECENT_WEIGHT: f64 = 0.2;

/// Tasks after which the volume term saturates.
const VOLUME_SATURATION: f64 = 20.0;

/// Cut points between levels 1|2, 2|3, 3|4 and 4|5.
const LEVEL_CUTS: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

/// Hints above which a sub-topic delta is halved.
const HINT_PENALTY_THRESHOLD: u32 = 2;

/// Score in `[0, 1]` from the post-update success rate (percent), task count
/// and whether the latest task succeeded.
pub fn level_score(success_rate: f64, tasks_completed: u32, last_success: bool) -> f64 {
    let rate = (success_rate / 100.0).clamp(0.0, 1.0);
    let volume = (f64::from(tasks_completed) / VOLUME_SATURATION).min(1.0);
    let recent = if last_success { 1.0 } else { 0.0 };

    SUCCESS_RATE_WEIGHT * rate + VOLUME_WEIGHT * volume + RECENT_WEIGHT * recent
}

/// Bin a score into a level 1-5.
pub fn score_to_level(score: f64) -> u8 {
    let below = LEVEL_CUTS.iter().filter(|cut| score >= **cut).count();
    MIN_LEVEL + below as u8
}

/// Move from `current` towards `target` by at most one level.
pub fn step_towards(current: u8, target: u8) -> u8 {
    let current = current.clamp(MIN_LEVEL, MAX_LEVEL);
    let next = if target > current {
        current + 1
    } else if target < current {
        current - 1
    } else {
        current
    };
    next.clamp(MIN_LEVEL, MAX_LEVEL)
}

/// Incremental mean over `count` samples, `count` including `sample`.
pub fn running_mean(mean: f64, sample: f64, count: u32) -> f64 {
    if count == 0 {
        return 0.0;
    }
    mean + (sample - mean) / f64::from(count)
}

/// Signed sub-topic change implied by a task outcome.
pub fn sub_topic_delta(outcome: &TaskOutcome) -> f64 {
    if outcome.showed_solution {
        return 0.0;
    }

    let base = match (outcome.success, outcome.difficulty) {
        (true, Difficulty::Easy) => 0.25,
        (true, Difficulty::Medium) => 0.5,
        (true, Difficulty::Hard) => 1.0,
        (false, Difficulty::Easy) => -0.5,
        (false, Difficulty::Medium) => -0.3,
        (false, Difficulty::Hard) => -0.2,
    };

    if outcome.hints_used > HINT_PENALTY_THRESHOLD {
        base / 2.0
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_score_extremes() {
        assert_eq!(level_score(0.0, 0, false), 0.0);
        assert!((level_score(100.0, 20, true) - 1.0).abs() < 1e-9);
        // Volume saturates
        assert_eq!(level_score(50.0, 40, false), level_score(50.0, 20, false));
    }

    #[test]
    fn test_score_binning() {
        assert_eq!(score_to_level(0.0), 1);
        assert_eq!(score_to_level(0.19), 1);
        assert_eq!(score_to_level(0.2), 2);
        assert_eq!(score_to_level(0.45), 3);
        assert_eq!(score_to_level(0.6), 4);
        assert_eq!(score_to_level(0.79), 4);
        assert_eq!(score_to_level(0.8), 5);
        assert_eq!(score_to_level(1.0), 5);
    }

    #[test]
    fn test_step_is_at_most_one() {
        assert_eq!(step_towards(3, 5), 4);
        assert_eq!(step_towards(3, 1), 2);
        assert_eq!(step_towards(3, 3), 3);
        assert_eq!(step_towards(1, 1), 1);
        assert_eq!(step_towards(5, 5), 5);
    }

    #[test]
    fn test_running_mean() {
        let mut mean = 0.0;
        for (i, sample) in [10.0, 20.0, 30.0].into_iter().enumerate() {
            mean = running_mean(mean, sample, i as u32 + 1);
        }
        assert!((mean - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_sub_topic_deltas() {
        let hard_win = TaskOutcome::new(true, 30.0).with_difficulty(Difficulty::Hard);
        assert_eq!(sub_topic_delta(&hard_win), 1.0);

        let easy_loss = TaskOutcome::new(false, 30.0).with_difficulty(Difficulty::Easy);
        assert_eq!(sub_topic_delta(&easy_loss), -0.5);

        let hinted = TaskOutcome::new(true, 30.0)
            .with_difficulty(Difficulty::Medium)
            .with_hints(3);
        assert_eq!(sub_topic_delta(&hinted), 0.25);

        let shown = hard_win.clone().with_solution_shown();
        assert_eq!(sub_topic_delta(&shown), 0.0);
    }
}
