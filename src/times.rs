use crate::dungeons::DungeonTable;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

pub const TYRANNICAL_AFFIX_ID: u32 = 9;
pub const FORTIFIED_AFFIX_ID: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeeklyAffix {
    Tyrannical,
    Fortified,
}

impl WeeklyAffix {
    pub const ALL: [WeeklyAffix; 2] = [WeeklyAffix::Tyrannical, WeeklyAffix::Fortified];

    pub fn as_str(self) -> &'static str {
        match self {
            WeeklyAffix::Tyrannical => "Tyrannical",
            WeeklyAffix::Fortified => "Fortified",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "tyrannical" | "tyr" | "t" => Some(WeeklyAffix::Tyrannical),
            "fortified" | "fort" | "f" => Some(WeeklyAffix::Fortified),
            _ => None,
        }
    }
}

impl std::fmt::Display for WeeklyAffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weekly modifier of a run, from its affix ids.
///
/// Runs carrying neither the Tyrannical nor the Fortified id land on
/// Fortified.
pub fn week_from_affixes(affixes: &[u32]) -> WeeklyAffix {
    if affixes.contains(&TYRANNICAL_AFFIX_ID) {
        return WeeklyAffix::Tyrannical;
    }
    if affixes.contains(&FORTIFIED_AFFIX_ID) {
        return WeeklyAffix::Fortified;
    }
    WeeklyAffix::Fortified
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub level: u32,
    pub plus: u32,
    pub duration: u64,
}

impl Timing {
    pub fn is_empty(&self) -> bool {
        self.level == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoredTiming {
    pub level: u32,
    pub plus: u32,
    pub duration: u64,
    pub score: f64,
}

impl ScoredTiming {
    pub fn timing(&self) -> Timing {
        Timing {
            level: self.level,
            plus: self.plus,
            duration: self.duration,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekTable<T> {
    #[serde(rename = "Tyrannical", default)]
    pub tyrannical: T,
    #[serde(rename = "Fortified", default)]
    pub fortified: T,
}

impl<T> WeekTable<T> {
    pub fn iter(&self) -> impl Iterator<Item = (WeeklyAffix, &T)> {
        [
            (WeeklyAffix::Tyrannical, &self.tyrannical),
            (WeeklyAffix::Fortified, &self.fortified),
        ]
        .into_iter()
    }
}

impl<T> Index<WeeklyAffix> for WeekTable<T> {
    type Output = T;

    fn index(&self, week: WeeklyAffix) -> &T {
        match week {
            WeeklyAffix::Tyrannical => &self.tyrannical,
            WeeklyAffix::Fortified => &self.fortified,
        }
    }
}

impl<T> IndexMut<WeeklyAffix> for WeekTable<T> {
    fn index_mut(&mut self, week: WeeklyAffix) -> &mut T {
        match week {
            WeeklyAffix::Tyrannical => &mut self.tyrannical,
            WeeklyAffix::Fortified => &mut self.fortified,
        }
    }
}

pub type DungeonTimes = DungeonTable<WeekTable<Timing>>;
pub type ScoredTimes = DungeonTable<WeekTable<ScoredTiming>>;

pub fn strip_scores(times: &ScoredTimes) -> DungeonTimes {
    times.map(|_, weeks| WeekTable {
        tyrannical: weeks.tyrannical.timing(),
        fortified: weeks.fortified.timing(),
    })
}

pub fn format_duration(duration_ms: u64) -> String {
    let total_secs = duration_ms / 1000;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
