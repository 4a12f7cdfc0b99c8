use crate::{dungeons::Dungeon, times::Timing};
use serde::{Deserialize, Serialize};

/// Scores within this distance, inclusive, are treated as the same value.
/// Raider.IO rounds to one decimal place.
const SCORE_TOLERANCE: f64 = 0.05;
const FLOAT_SLACK: f64 = 1e-9;

/// A dungeon score. Compare through [`Score::equals`], never with `==`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(f64);

impl Score {
    pub const ZERO: Score = Score(0.0);

    pub fn new(value: f64) -> Self {
        Score(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn equals(self, other: f64) -> bool {
        (self.0 - other).abs() <= SCORE_TOLERANCE + FLOAT_SLACK
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

pub trait ScoreModel {
    fn base_score(&self, dungeon: Dungeon, timing: &Timing) -> Score;
}

/// Season rules: a level base, a bonus for every seasonal affix the level
/// unlocks, and up to five points for beating par by 40%. Runs over par lose
/// five points plus up to five more, and runs more than 40% over score zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonScoreModel;

const LEVEL_BASE: f64 = 20.0;
const POINTS_PER_LEVEL: f64 = 5.0;
const POINTS_PER_AFFIX: f64 = 10.0;
const AFFIX_LEVELS: [u32; 3] = [2, 7, 14];
const MAX_TIMER_BONUS: f64 = 5.0;
const OVERTIME_PENALTY: f64 = 5.0;
const TIMER_WINDOW: f64 = 0.4;

impl ScoreModel for SeasonScoreModel {
    fn base_score(&self, dungeon: Dungeon, timing: &Timing) -> Score {
        if timing.level < 2 {
            return Score::ZERO;
        }

        let affixes = AFFIX_LEVELS
            .iter()
            .filter(|threshold| timing.level >= **threshold)
            .count() as f64;
        let level_score =
            LEVEL_BASE + POINTS_PER_LEVEL * f64::from(timing.level) + POINTS_PER_AFFIX * affixes;

        let par = dungeon.plus1() as f64;
        let duration = timing.duration as f64;
        let window = par * TIMER_WINDOW;

        if duration <= par {
            let bonus = ((par - duration) / window).min(1.0) * MAX_TIMER_BONUS;
            return Score(level_score + bonus);
        }

        let over = (duration - par) / window;
        if over > 1.0 {
            return Score::ZERO;
        }
        Score(level_score - OVERTIME_PENALTY - over * OVERTIME_PENALTY)
    }
}
