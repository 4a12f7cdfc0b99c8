use crate::{error::ImportError, player::CharacterInfo, times::DungeonTimes};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    pub character: CharacterInfo,
    /// Unix seconds.
    pub imported_at: i64,
    #[serde(default)]
    pub times: DungeonTimes,
}

impl CharacterSnapshot {
    pub fn new(character: CharacterInfo, times: DungeonTimes) -> Self {
        Self {
            character,
            imported_at: OffsetDateTime::now_utc().unix_timestamp(),
            times,
        }
    }

    pub fn imported_at_label(&self) -> String {
        OffsetDateTime::from_unix_timestamp(self.imported_at)
            .ok()
            .and_then(|stamp| stamp.format(&Rfc3339).ok())
            .unwrap_or_else(|| self.imported_at.to_string())
    }
}

pub trait HistoryArchive {
    fn save(&mut self, snapshot: &CharacterSnapshot) -> Result<(), ImportError>;
}

#[derive(Debug)]
pub struct CharacterHistory {
    path: PathBuf,
    entries: Vec<CharacterSnapshot>,
}

impl CharacterHistory {
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("history.json");
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path).context("read history.json")?;
            serde_json::from_str(&raw).context("parse history.json")?
        } else {
            Vec::new()
        };
        Ok(Self { path, entries })
    }

    pub fn entries(&self) -> &[CharacterSnapshot] {
        &self.entries
    }

    /// Newest snapshot for each distinct character, newest first.
    pub fn latest_per_character(&self) -> Vec<&CharacterSnapshot> {
        let mut latest: Vec<&CharacterSnapshot> = Vec::new();
        for snapshot in self.entries.iter().rev() {
            if !latest
                .iter()
                .any(|seen| seen.character.same_character(&snapshot.character))
            {
                latest.push(snapshot);
            }
        }
        latest
    }

    fn write(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.entries).context("serialize history")?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, raw).context("write history")?;
        fs::rename(&temp_path, &self.path).context("replace history")?;
        Ok(())
    }
}

impl HistoryArchive for CharacterHistory {
    fn save(&mut self, snapshot: &CharacterSnapshot) -> Result<(), ImportError> {
        self.entries.push(snapshot.clone());
        if let Err(err) = self.write() {
            self.entries.pop();
            return Err(ImportError::Archival(format!("{err:#}")));
        }
        Ok(())
    }
}
