use crate::{
    diagnostics::{Diagnostic, DiagnosticSink},
    dungeons::Dungeon,
    player::{CharacterInfo, PlayerStore},
    times::{ScoredTimes, WeeklyAffix},
};

/// Writes every imported slot into both the original and hypothetical tables.
/// Scores are dropped. The character is rewritten with each slot.
pub fn apply_import(
    store: &mut impl PlayerStore,
    timings: &ScoredTimes,
    character: &CharacterInfo,
) {
    for (dungeon, weeks) in timings.iter() {
        for (week, slot) in weeks.iter() {
            store.set_original_time(dungeon, week, slot.timing());
            store.set_hypothetical_time(dungeon, week, slot.timing());
            store.set_character_info(character.clone());
        }
    }
}

/// Compares locally computed base scores with the imported ones and reports
/// every slot that disagrees. Returns the number of mismatches.
pub fn check_scores(
    store: &impl PlayerStore,
    timings: &ScoredTimes,
    sink: &mut dyn DiagnosticSink,
) -> usize {
    let mut mismatches = 0;
    for dungeon in Dungeon::ALL {
        for week in WeeklyAffix::ALL {
            let calculated = store.base_score(dungeon, week);
            let remote = timings[dungeon][week].score;
            if !calculated.equals(remote) {
                sink.report(Diagnostic::ScoreMismatch {
                    dungeon,
                    week,
                    remote,
                    calculated,
                });
                mismatches += 1;
            }
        }
    }
    mismatches
}
