use crate::{
    config::{self, AppConfig},
    diagnostics::{CollectingSink, DiagnosticSink, TracingSink},
    dungeons::Dungeon,
    history::CharacterHistory,
    importer::{ImportStatus, ImportSummary, Importer},
    player::{PlayerData, PlayerStore},
    raiderio::{CharacterRef, ProfileCache, RaiderIoClient},
    times::{Timing, WeeklyAffix},
};
use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf, time::Duration};
use tracing::info;

pub struct App {
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub player: PlayerData,
    pub history: CharacterHistory,
    importer: Importer<RaiderIoClient>,
}

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub summary: ImportSummary,
    pub diagnostics: CollectingSink,
}

impl App {
    pub fn initialize() -> Result<Self> {
        let data_dir = config::base_data_dir()?;
        let cache_dir = config::base_cache_dir()?;
        Self::initialize_in(data_dir, cache_dir)
    }

    pub fn initialize_in(data_dir: PathBuf, cache_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir).context("create data dir")?;
        let config = AppConfig::load_or_create(&data_dir)?;
        let player = PlayerData::load_or_create(&data_dir)?;
        let history = CharacterHistory::load_or_create(&data_dir)?;
        let cache = ProfileCache::new(
            cache_dir.join("profiles"),
            Duration::from_secs(config.cache_ttl_secs),
        );
        let importer = Importer::new(RaiderIoClient::new(&config, Some(cache)));

        Ok(App {
            config,
            data_dir,
            cache_dir,
            player,
            history,
            importer,
        })
    }

    pub fn import_status(&self) -> ImportStatus {
        self.importer.status()
    }

    pub fn character_ref(&self, region: Option<&str>, realm: &str, name: &str) -> CharacterRef {
        let region = region.unwrap_or(self.config.default_region.as_str());
        CharacterRef::new(region, realm, name)
    }

    pub fn import_character(
        &mut self,
        character: &CharacterRef,
        force_refresh: bool,
    ) -> Result<ImportReport> {
        let mut sink = CollectingSink::default();
        let result = self.importer.import_character(
            &mut self.player,
            &mut self.history,
            &mut sink,
            character,
            force_refresh,
        );

        let mut tracing_sink = TracingSink;
        for diagnostic in &sink.diagnostics {
            tracing_sink.report(diagnostic.clone());
        }

        let summary = result.with_context(|| format!("import {character}"))?;
        self.player
            .save(&self.data_dir)
            .context("save imported player")?;
        Ok(ImportReport {
            summary,
            diagnostics: sink,
        })
    }

    pub fn dismiss_import_error(&mut self) {
        self.importer.dismiss_error();
    }

    /// Edits one slot of the hypothetical table. Without an explicit
    /// duration the previous one is kept, or par when the slot was empty.
    /// Without an explicit upgrade count it follows from the duration.
    pub fn plan(
        &mut self,
        dungeon: Dungeon,
        week: WeeklyAffix,
        level: u32,
        plus: Option<u32>,
        duration: Option<u64>,
    ) -> Result<Timing> {
        if level == 1 {
            bail!("Keystone level must be 0 or at least 2");
        }
        let current = self.player.hypothetical_time(dungeon, week);
        let duration = duration.unwrap_or(if current.duration > 0 {
            current.duration
        } else {
            dungeon.plus1()
        });
        let timing = Timing {
            level,
            plus: plus.unwrap_or_else(|| dungeon.upgrades_for(duration)),
            duration,
        };
        self.player.set_hypothetical_time(dungeon, week, timing);
        self.player.save(&self.data_dir)?;
        info!(dungeon = %dungeon, week = %week, level, "Planned hypothetical run");
        Ok(timing)
    }

    pub fn reset_hypothetical(&mut self) -> Result<()> {
        self.player.reset_hypothetical();
        self.player.save(&self.data_dir)?;
        info!("Reset hypothetical times");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_app(dir: &std::path::Path) -> App {
        let data_dir = dir.join("data");
        fs::create_dir_all(&data_dir).expect("create data dir");
        fs::write(
            data_dir.join("config.json"),
            r#"{"api_base": "http://127.0.0.1:9", "connect_timeout_secs": 1, "read_timeout_secs": 1}"#,
        )
        .expect("write config");
        App::initialize_in(data_dir, dir.join("cache")).expect("initialize app")
    }

    #[test]
    fn initialize_creates_state_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = offline_app(dir.path());
        assert!(app.data_dir.join("player.json").exists());
        assert_eq!(app.import_status(), ImportStatus::default());
    }

    #[test]
    fn character_ref_uses_default_region() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = offline_app(dir.path());
        let character = app.character_ref(None, "Stormrage", "Vellin");
        assert_eq!(character.region, "us");
        let character = app.character_ref(Some("EU"), "Stormrage", "Vellin");
        assert_eq!(character.region, "eu");
    }

    #[test]
    fn failed_import_keeps_error_until_dismissed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = offline_app(dir.path());
        let character = app.character_ref(None, "Stormrage", "Vellin");

        assert!(app.import_character(&character, true).is_err());
        assert!(app.import_status().error);
        assert!(app.history.entries().is_empty());

        app.dismiss_import_error();
        assert_eq!(app.import_status(), ImportStatus::default());
    }

    #[test]
    fn malformed_cached_profile_is_not_replayed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = offline_app(dir.path());
        let character = app.character_ref(None, "Stormrage", "Vellin");
        let cache = ProfileCache::new(dir.path().join("cache/profiles"), Duration::from_secs(600));
        let body = serde_json::json!({
            "region": "us",
            "realm": "Stormrage",
            "name": "Vellin",
            "class": "Monk",
            "active_spec_name": "Brewmaster",
            "thumbnail_url": "",
            "guild": null,
            "mythic_plus_best_runs": [{ "short_name": "NELTH" }],
            "mythic_plus_alternate_runs": []
        });
        cache.store(&character, &body).expect("store profile");
        assert!(cache.load_fresh(&character).is_some());

        let err = app.import_character(&character, false).expect_err("malformed run");
        assert!(format!("{err:#}").contains("run record #0"), "{err:#}");
        assert!(cache.load_fresh(&character).is_none());
    }

    #[test]
    fn plan_derives_upgrades_and_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = offline_app(dir.path());
        let dungeon = Dungeon::BlackRookHold;

        let timing = app
            .plan(dungeon, WeeklyAffix::Fortified, 18, None, Some(dungeon.plus2()))
            .expect("plan run");
        assert_eq!(timing.plus, 2);

        let timing = app
            .plan(dungeon, WeeklyAffix::Fortified, 19, None, None)
            .expect("plan run");
        assert_eq!(timing.duration, dungeon.plus2());

        let reloaded = PlayerData::load_or_create(&app.data_dir).expect("reload player");
        assert_eq!(
            reloaded.hypothetical_time(dungeon, WeeklyAffix::Fortified).level,
            19
        );
        assert!(app.plan(dungeon, WeeklyAffix::Fortified, 1, None, None).is_err());
    }

    #[test]
    fn reset_restores_original_times() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = offline_app(dir.path());
        app.plan(Dungeon::Everbloom, WeeklyAffix::Tyrannical, 22, None, None)
            .expect("plan run");
        app.reset_hypothetical().expect("reset");
        assert_eq!(app.player.hypothetical_times, app.player.original_times);
    }
}
