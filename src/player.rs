use crate::{
    dungeons::{Dungeon, DungeonTable},
    score::{Score, ScoreModel, SeasonScoreModel},
    times::{DungeonTimes, Timing, WeekTable, WeeklyAffix},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterInfo {
    pub region: String,
    pub realm: String,
    pub name: String,
    pub class: String,
    pub spec: String,
    pub thumbnail_url: String,
    #[serde(default)]
    pub guild_name: Option<String>,
}

impl CharacterInfo {
    pub fn display_name(&self) -> String {
        format!("{}-{} ({})", self.name, self.realm, self.region.to_uppercase())
    }

    pub fn same_character(&self, other: &CharacterInfo) -> bool {
        self.region.eq_ignore_ascii_case(&other.region)
            && self.realm.eq_ignore_ascii_case(&other.realm)
            && self.name.eq_ignore_ascii_case(&other.name)
    }
}

pub trait PlayerStore {
    /// Locally computed score for the original time in this slot.
    fn base_score(&self, dungeon: Dungeon, week: WeeklyAffix) -> Score;
    fn original_time(&self, dungeon: Dungeon, week: WeeklyAffix) -> Timing;
    fn set_original_time(&mut self, dungeon: Dungeon, week: WeeklyAffix, timing: Timing);
    fn hypothetical_time(&self, dungeon: Dungeon, week: WeeklyAffix) -> Timing;
    fn set_hypothetical_time(&mut self, dungeon: Dungeon, week: WeeklyAffix, timing: Timing);
    fn set_character_info(&mut self, info: CharacterInfo);
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerData {
    #[serde(default)]
    pub character: Option<CharacterInfo>,
    #[serde(default)]
    pub original_times: DungeonTimes,
    #[serde(default)]
    pub hypothetical_times: DungeonTimes,
    #[serde(skip)]
    model: SeasonScoreModel,
}

impl PlayerData {
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let player_path = data_dir.join("player.json");
        if player_path.exists() {
            let raw = fs::read_to_string(&player_path).context("read player.json")?;
            let player: PlayerData = serde_json::from_str(&raw).context("parse player.json")?;
            return Ok(player);
        }

        let player = PlayerData::default();
        player.save(data_dir)?;
        Ok(player)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let player_path = data_dir.join("player.json");
        let raw = serde_json::to_string_pretty(self).context("serialize player.json")?;
        fs::write(player_path, raw).context("write player.json")?;
        Ok(())
    }

    pub fn original_scores(&self) -> DungeonTable<WeekTable<Score>> {
        self.scores_for(&self.original_times)
    }

    pub fn hypothetical_scores(&self) -> DungeonTable<WeekTable<Score>> {
        self.scores_for(&self.hypothetical_times)
    }

    fn scores_for(&self, times: &DungeonTimes) -> DungeonTable<WeekTable<Score>> {
        times.map(|dungeon, weeks| WeekTable {
            tyrannical: self.model.base_score(dungeon, &weeks.tyrannical),
            fortified: self.model.base_score(dungeon, &weeks.fortified),
        })
    }

    /// Dungeon score: the better week counts 1.5x, the other 0.5x.
    pub fn dungeon_score(scores: &WeekTable<Score>) -> Score {
        let (tyrannical, fortified) = (scores.tyrannical.value(), scores.fortified.value());
        let (best, other) = if tyrannical >= fortified {
            (tyrannical, fortified)
        } else {
            (fortified, tyrannical)
        };
        Score::new(best * 1.5 + other * 0.5)
    }

    pub fn total_score(scores: &DungeonTable<WeekTable<Score>>) -> Score {
        Score::new(
            scores
                .iter()
                .map(|(_, weeks)| PlayerData::dungeon_score(weeks).value())
                .sum(),
        )
    }

    pub fn reset_hypothetical(&mut self) {
        self.hypothetical_times = self.original_times.clone();
    }
}

impl PlayerStore for PlayerData {
    fn base_score(&self, dungeon: Dungeon, week: WeeklyAffix) -> Score {
        self.model.base_score(dungeon, &self.original_times[dungeon][week])
    }

    fn original_time(&self, dungeon: Dungeon, week: WeeklyAffix) -> Timing {
        self.original_times[dungeon][week]
    }

    fn set_original_time(&mut self, dungeon: Dungeon, week: WeeklyAffix, timing: Timing) {
        self.original_times[dungeon][week] = timing;
    }

    fn hypothetical_time(&self, dungeon: Dungeon, week: WeeklyAffix) -> Timing {
        self.hypothetical_times[dungeon][week]
    }

    fn set_hypothetical_time(&mut self, dungeon: Dungeon, week: WeeklyAffix, timing: Timing) {
        self.hypothetical_times[dungeon][week] = timing;
    }

    fn set_character_info(&mut self, info: CharacterInfo) {
        self.character = Some(info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(dungeon: Dungeon, level: u32) -> Timing {
        Timing {
            level,
            plus: 1,
            duration: dungeon.plus1(),
        }
    }

    #[test]
    fn load_or_create_writes_then_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut player = PlayerData::load_or_create(dir.path()).expect("create player");
        assert!(player.character.is_none());
        assert!(dir.path().join("player.json").exists());

        player.set_original_time(
            Dungeon::DarkheartThicket,
            WeeklyAffix::Tyrannical,
            timed(Dungeon::DarkheartThicket, 17),
        );
        player.save(dir.path()).expect("save player");

        let loaded = PlayerData::load_or_create(dir.path()).expect("load player");
        assert_eq!(
            loaded.original_time(Dungeon::DarkheartThicket, WeeklyAffix::Tyrannical),
            timed(Dungeon::DarkheartThicket, 17)
        );
    }

    #[test]
    fn base_score_reads_original_not_hypothetical() {
        let mut player = PlayerData::default();
        let dungeon = Dungeon::ThroneOfTheTides;
        player.set_hypothetical_time(dungeon, WeeklyAffix::Fortified, timed(dungeon, 20));
        assert!(player.base_score(dungeon, WeeklyAffix::Fortified).equals(0.0));

        player.set_original_time(dungeon, WeeklyAffix::Fortified, timed(dungeon, 20));
        assert!(player.base_score(dungeon, WeeklyAffix::Fortified).equals(150.0));
    }

    #[test]
    fn reset_hypothetical_copies_original() {
        let mut player = PlayerData::default();
        let dungeon = Dungeon::GalakrondsFall;
        player.set_original_time(dungeon, WeeklyAffix::Tyrannical, timed(dungeon, 12));
        player.set_hypothetical_time(dungeon, WeeklyAffix::Tyrannical, timed(dungeon, 25));
        player.reset_hypothetical();
        assert_eq!(player.hypothetical_times, player.original_times);
    }

    #[test]
    fn dungeon_score_weights_best_week() {
        let scores = WeekTable {
            tyrannical: Score::new(100.0),
            fortified: Score::new(120.0),
        };
        assert!(PlayerData::dungeon_score(&scores).equals(230.0));
    }
}
