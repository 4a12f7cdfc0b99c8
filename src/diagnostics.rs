use crate::{dungeons::Dungeon, score::Score, times::WeeklyAffix};
use serde::Serialize;
use std::fmt;

/// Non-fatal findings raised while importing. They never stop an import.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    TimerMismatch {
        dungeon: Dungeon,
        week: WeeklyAffix,
        expected: u64,
        actual: Option<u64>,
    },
    ScoreMismatch {
        dungeon: Dungeon,
        week: WeeklyAffix,
        remote: f64,
        calculated: Score,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::TimerMismatch {
                dungeon,
                week,
                expected,
                actual,
            } => {
                write!(f, "Timer mismatch: {dungeon} {week}, expected {expected} got ")?;
                match actual {
                    Some(actual) => write!(f, "{actual}"),
                    None => f.write_str("nothing"),
                }
            }
            Diagnostic::ScoreMismatch {
                dungeon,
                week,
                remote,
                calculated,
            } => write!(
                f,
                "Score mismatch: {dungeon} {week}, raiderIO {remote} calculated {calculated}"
            ),
        }
    }
}

pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::TimerMismatch {
                dungeon,
                week,
                expected,
                actual,
            } => tracing::warn!(
                dungeon = %dungeon,
                week = %week,
                expected = *expected,
                actual = ?actual,
                "{diagnostic}"
            ),
            Diagnostic::ScoreMismatch {
                dungeon,
                week,
                remote,
                calculated,
            } => tracing::warn!(
                dungeon = %dungeon,
                week = %week,
                remote = *remote,
                calculated = calculated.value(),
                "{diagnostic}"
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn timer_mismatches(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| matches!(diagnostic, Diagnostic::TimerMismatch { .. }))
            .count()
    }

    pub fn score_mismatches(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| matches!(diagnostic, Diagnostic::ScoreMismatch { .. }))
            .count()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
