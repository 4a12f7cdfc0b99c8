use crate::{
    diagnostics::{Diagnostic, DiagnosticSink},
    error::ImportError,
    raiderio::RunRecord,
    times::{week_from_affixes, ScoredTimes, ScoredTiming, WeeklyAffix},
};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Selection {
    pub timings: ScoredTimes,
    pub runs_seen: usize,
    pub timer_mismatches: usize,
}

impl Selection {
    pub fn slots_filled(&self) -> usize {
        self.timings
            .iter()
            .flat_map(|(_, weeks)| weeks.iter())
            .filter(|(_, slot)| !slot.timing().is_empty())
            .count()
    }
}

/// Folds runs into the best run per dungeon and week.
///
/// A run replaces a slot only when its score is strictly higher, so the first
/// of two equal runs is kept. Every run is also checked against the catalog
/// par time. The first malformed run aborts selection.
pub fn select_best_runs<'a, I>(
    runs: I,
    sink: &mut dyn DiagnosticSink,
) -> Result<Selection, ImportError>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut timings = ScoredTimes::default();
    let mut runs_seen = 0;
    let mut timer_mismatches = 0;

    for (index, raw) in runs.into_iter().enumerate() {
        let run = RunRecord::from_value(index, raw)?;
        let week = week_from_affixes(&run.affixes);
        let slot = &mut timings[run.dungeon][week];

        if run.score > slot.score {
            *slot = ScoredTiming {
                level: run.level,
                plus: run.plus,
                duration: run.duration_ms,
                score: run.score,
            };
        }

        if check_timer(&run, week, sink) {
            timer_mismatches += 1;
        }
        runs_seen += 1;
    }

    Ok(Selection {
        timings,
        runs_seen,
        timer_mismatches,
    })
}

/// Reports a run whose par time differs from the catalog's plus-one timer.
/// The expected value is not adjusted for keystone level.
pub fn check_timer(run: &RunRecord, week: WeeklyAffix, sink: &mut dyn DiagnosticSink) -> bool {
    let expected = run.dungeon.plus1();
    if run.par_time_ms == Some(expected) {
        return false;
    }
    sink.report(Diagnostic::TimerMismatch {
        dungeon: run.dungeon,
        week,
        expected,
        actual: run.par_time_ms,
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{diagnostics::CollectingSink, dungeons::Dungeon};
    use serde_json::json;

    fn run(short: &str, affix: u32, level: u32, score: f64) -> Value {
        let dungeon = Dungeon::from_short(short).expect("known dungeon");
        json!({
            "short_name": short,
            "affixes": [{ "id": affix }, { "id": 124 }],
            "mythic_level": level,
            "num_keystone_upgrades": 1,
            "clear_time_ms": dungeon.plus1() - 60_000,
            "par_time_ms": dungeon.plus1(),
            "score": score
        })
    }

    #[test]
    fn empty_input_yields_complete_zero_table() {
        let runs: Vec<Value> = Vec::new();
        let mut sink = CollectingSink::default();
        let selection = select_best_runs(&runs, &mut sink).expect("select");
        assert_eq!(selection.runs_seen, 0);
        assert_eq!(selection.slots_filled(), 0);
        for dungeon in Dungeon::ALL {
            for week in WeeklyAffix::ALL {
                assert_eq!(selection.timings[dungeon][week], ScoredTiming::default());
            }
        }
    }

    #[test]
    fn highest_score_wins_each_slot() {
        let runs = vec![
            run("AD", 9, 18, 140.0),
            run("AD", 9, 21, 160.0),
            run("AD", 9, 19, 150.0),
            run("AD", 10, 15, 120.0),
            run("BRH", 10, 22, 165.0),
        ];
        let mut sink = CollectingSink::default();
        let selection = select_best_runs(&runs, &mut sink).expect("select");

        let ad = selection.timings[Dungeon::AtalDazar];
        assert_eq!(ad.tyrannical.level, 21);
        assert!((ad.tyrannical.score - 160.0).abs() < f64::EPSILON);
        assert_eq!(ad.fortified.level, 15);
        assert_eq!(selection.timings[Dungeon::BlackRookHold].fortified.level, 22);
        assert_eq!(selection.timings[Dungeon::BlackRookHold].tyrannical.level, 0);
        assert_eq!(selection.runs_seen, 5);
        assert_eq!(selection.slots_filled(), 3);
        assert_eq!(selection.timer_mismatches, 0);
        assert!(sink.diagnostics.is_empty());
    }

    #[test]
    fn selection_does_not_depend_on_order() {
        let runs = vec![
            run("EB", 9, 16, 130.0),
            run("EB", 9, 20, 155.0),
            run("EB", 10, 18, 142.0),
            run("WM", 9, 17, 135.0),
        ];
        let mut reversed = runs.clone();
        reversed.reverse();

        let mut sink = CollectingSink::default();
        let forward = select_best_runs(&runs, &mut sink).expect("select forward");
        let backward = select_best_runs(&reversed, &mut sink).expect("select backward");
        assert_eq!(forward.timings, backward.timings);
    }

    #[test]
    fn selected_score_bounds_every_candidate() {
        let runs = vec![
            run("TOTT", 9, 14, 101.5),
            run("TOTT", 9, 19, 144.2),
            run("TOTT", 9, 17, 131.0),
        ];
        let mut sink = CollectingSink::default();
        let selection = select_best_runs(&runs, &mut sink).expect("select");
        let slot = selection.timings[Dungeon::ThroneOfTheTides].tyrannical;
        let candidates = [101.5, 144.2, 131.0];
        assert!(candidates.iter().all(|score| slot.score >= *score));
        assert!(candidates.iter().any(|score| slot.score == *score));
    }

    #[test]
    fn ties_keep_first_seen_run() {
        let runs = vec![run("DHT", 10, 18, 140.0), run("DHT", 10, 19, 140.0)];
        let mut sink = CollectingSink::default();
        let selection = select_best_runs(&runs, &mut sink).expect("select");
        assert_eq!(
            selection.timings[Dungeon::DarkheartThicket].fortified.level,
            18
        );
    }

    #[test]
    fn runs_without_weekly_affix_count_as_fortified() {
        let runs = vec![run("FALL", 124, 12, 90.0)];
        let mut sink = CollectingSink::default();
        let selection = select_best_runs(&runs, &mut sink).expect("select");
        assert_eq!(selection.timings[Dungeon::GalakrondsFall].fortified.level, 12);
        assert_eq!(selection.timings[Dungeon::GalakrondsFall].tyrannical.level, 0);
    }

    #[test]
    fn timer_mismatch_is_reported_without_changing_selection() {
        let mut off_par = run("RISE", 9, 20, 150.0);
        off_par["par_time_ms"] = json!(2_000_000);
        let mut sink = CollectingSink::default();
        let selection = select_best_runs(&[off_par], &mut sink).expect("select");

        assert_eq!(selection.timings[Dungeon::MurozondsRise].tyrannical.level, 20);
        assert_eq!(selection.timer_mismatches, 1);
        assert_eq!(sink.timer_mismatches(), 1);
        match &sink.diagnostics[0] {
            Diagnostic::TimerMismatch {
                dungeon,
                week,
                expected,
                actual,
            } => {
                assert_eq!(*dungeon, Dungeon::MurozondsRise);
                assert_eq!(*week, WeeklyAffix::Tyrannical);
                assert_eq!(*expected, Dungeon::MurozondsRise.plus1());
                assert_eq!(*actual, Some(2_000_000));
            }
            other => panic!("unexpected diagnostic {other:?}"),
        }
    }

    #[test]
    fn malformed_run_aborts_selection() {
        let runs = vec![run("AD", 9, 18, 140.0), json!({ "short_name": "NELTH" })];
        let mut sink = CollectingSink::default();
        let err = select_best_runs(&runs, &mut sink).expect_err("malformed");
        assert!(matches!(err, ImportError::MalformedRunRecord { index: 1, .. }));
    }
}
