use crate::{
    diagnostics::DiagnosticSink,
    error::ImportError,
    history::{CharacterSnapshot, HistoryArchive},
    player::{CharacterInfo, PlayerStore},
    raiderio::{CharacterRef, ProfileSource},
    reconcile, selector,
    times::strip_scores,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Flags a front end polls while an import runs. `error` stays set until
/// [`Importer::dismiss_error`] is called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStatus {
    pub loading: bool,
    pub error: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub character: CharacterInfo,
    pub runs_seen: usize,
    pub slots_filled: usize,
    pub timer_mismatches: usize,
    pub score_mismatches: usize,
}

pub struct Importer<P> {
    source: P,
    status: ImportStatus,
}

impl<P: ProfileSource> Importer<P> {
    pub fn new(source: P) -> Self {
        Self {
            source,
            status: ImportStatus::default(),
        }
    }

    pub fn status(&self) -> ImportStatus {
        self.status
    }

    /// Fetches a character, picks the best run per slot, archives the result
    /// and merges it into `store`.
    ///
    /// Any failure sets `error` and leaves `loading` raised; nothing already
    /// written to the archive or store is rolled back.
    pub fn import_character(
        &mut self,
        store: &mut impl PlayerStore,
        archive: &mut impl HistoryArchive,
        sink: &mut dyn DiagnosticSink,
        character: &CharacterRef,
        force_refresh: bool,
    ) -> Result<ImportSummary, ImportError> {
        self.status.loading = true;
        info!(character = %character, force_refresh, "Importing character");

        match self.run_import(store, archive, sink, character, force_refresh) {
            Ok(summary) => {
                self.status.loading = false;
                info!(
                    character = %character,
                    runs = summary.runs_seen,
                    slots = summary.slots_filled,
                    timer_mismatches = summary.timer_mismatches,
                    score_mismatches = summary.score_mismatches,
                    "Import finished"
                );
                Ok(summary)
            }
            Err(err) => {
                self.status.error = true;
                warn!(character = %character, error = %err, "Import failed");
                Err(err)
            }
        }
    }

    fn run_import(
        &self,
        store: &mut impl PlayerStore,
        archive: &mut impl HistoryArchive,
        sink: &mut dyn DiagnosticSink,
        character: &CharacterRef,
        force_refresh: bool,
    ) -> Result<ImportSummary, ImportError> {
        let profile = self.source.fetch_profile(character, force_refresh)?;
        debug!(runs = profile.run_count(), "Fetched profile");

        let selection = match selector::select_best_runs(profile.runs(), sink) {
            Ok(selection) => selection,
            Err(err) => {
                self.source.discard(character);
                return Err(err);
            }
        };
        debug!(slots = selection.slots_filled(), "Selected best runs");

        archive.save(&CharacterSnapshot::new(
            profile.character.clone(),
            strip_scores(&selection.timings),
        ))?;

        reconcile::apply_import(store, &selection.timings, &profile.character);
        let score_mismatches = reconcile::check_scores(store, &selection.timings, sink);

        Ok(ImportSummary {
            slots_filled: selection.slots_filled(),
            runs_seen: selection.runs_seen,
            timer_mismatches: selection.timer_mismatches,
            score_mismatches,
            character: profile.character,
        })
    }

    pub fn dismiss_error(&mut self) {
        if self.status.error {
            self.status.loading = false;
            self.status.error = false;
        }
    }
}
