use crate::{config::AppConfig, dungeons::Dungeon, error::ImportError, player::CharacterInfo};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::{
    fs,
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::{debug, warn};

const PROFILE_FIELDS: &str = "mythic_plus_best_runs,mythic_plus_alternate_runs,guild";
const USER_AGENT: &str = "KeySmith";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRef {
    pub region: String,
    pub realm: String,
    pub name: String,
}

impl CharacterRef {
    pub fn new(region: &str, realm: &str, name: &str) -> Self {
        Self {
            region: region.trim().to_ascii_lowercase(),
            realm: realm.trim().to_string(),
            name: name.trim().to_string(),
        }
    }

    fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.region.to_lowercase().as_bytes());
        hasher.update(b"/");
        hasher.update(self.realm.to_lowercase().as_bytes());
        hasher.update(b"/");
        hasher.update(self.name.to_lowercase().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl std::fmt::Display for CharacterRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.region, self.realm, self.name)
    }
}

/// A decoded profile response. Runs stay raw until selection parses them.
#[derive(Debug, Clone)]
pub struct CharacterProfile {
    pub character: CharacterInfo,
    pub best_runs: Vec<Value>,
    pub alternate_runs: Vec<Value>,
}

impl CharacterProfile {
    pub fn from_body(body: &Value) -> Result<Self, ImportError> {
        let response = ProfileResponse::deserialize(body)
            .map_err(|err| ImportError::Transport(format!("decode profile: {err}")))?;
        Ok(response.into())
    }

    pub fn runs(&self) -> impl Iterator<Item = &Value> {
        self.best_runs.iter().chain(self.alternate_runs.iter())
    }

    pub fn run_count(&self) -> usize {
        self.best_runs.len() + self.alternate_runs.len()
    }
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    region: String,
    realm: String,
    name: String,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    active_spec_name: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    guild: Option<GuildRef>,
    mythic_plus_best_runs: Vec<Value>,
    mythic_plus_alternate_runs: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GuildRef {
    name: String,
}

impl From<ProfileResponse> for CharacterProfile {
    fn from(response: ProfileResponse) -> Self {
        CharacterProfile {
            character: CharacterInfo {
                region: response.region,
                realm: response.realm,
                name: response.name,
                class: response.class.unwrap_or_default(),
                spec: response.active_spec_name.unwrap_or_default(),
                thumbnail_url: response.thumbnail_url.unwrap_or_default(),
                guild_name: response.guild.map(|guild| guild.name),
            },
            best_runs: response.mythic_plus_best_runs,
            alternate_runs: response.mythic_plus_alternate_runs,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub dungeon: Dungeon,
    pub affixes: Vec<u32>,
    pub level: u32,
    pub plus: u32,
    pub duration_ms: u64,
    pub par_time_ms: Option<u64>,
    pub score: f64,
}

impl RunRecord {
    pub fn from_value(index: usize, value: &Value) -> Result<Self, ImportError> {
        let object = value
            .as_object()
            .ok_or_else(|| ImportError::malformed(index, "run is not an object"))?;

        let short = object
            .get("short_name")
            .and_then(Value::as_str)
            .ok_or_else(|| ImportError::malformed(index, "missing short_name"))?;
        let dungeon = Dungeon::from_short(short)
            .ok_or_else(|| ImportError::malformed(index, format!("unknown dungeon {short}")))?;

        let level = required_whole(object, "mythic_level", index)?;
        let level = u32::try_from(level)
            .map_err(|_| ImportError::malformed(index, "mythic_level out of range"))?;
        let duration_ms = required_whole(object, "clear_time_ms", index)?;
        let score = object
            .get("score")
            .and_then(Value::as_f64)
            .ok_or_else(|| ImportError::malformed(index, "missing or non-numeric score"))?;

        let plus = object
            .get("num_keystone_upgrades")
            .and_then(as_whole)
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(0);
        let par_time_ms = object.get("par_time_ms").and_then(as_whole);
        let affixes = object
            .get("affixes")
            .and_then(Value::as_array)
            .map(|affixes| {
                affixes
                    .iter()
                    .filter_map(|affix| affix.get("id").and_then(as_whole))
                    .filter_map(|id| u32::try_from(id).ok())
                    .collect()
            })
            .unwrap_or_default();

        Ok(RunRecord {
            dungeon,
            affixes,
            level,
            plus,
            duration_ms,
            par_time_ms,
            score,
        })
    }
}

fn as_whole(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|number| *number >= 0.0 && number.fract() == 0.0)
            .map(|number| number as u64)
    })
}

fn required_whole(
    object: &Map<String, Value>,
    field: &str,
    index: usize,
) -> Result<u64, ImportError> {
    object
        .get(field)
        .and_then(as_whole)
        .ok_or_else(|| ImportError::malformed(index, format!("missing or non-numeric {field}")))
}

pub trait ProfileSource {
    fn fetch_profile(
        &self,
        character: &CharacterRef,
        force_refresh: bool,
    ) -> Result<CharacterProfile, ImportError>;

    /// Called when a fetched profile for `character` fails selection.
    fn discard(&self, _character: &CharacterRef) {}
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedProfile {
    fetched_at: u64,
    body: Value,
}

#[derive(Debug, Clone)]
pub struct ProfileCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ProfileCache {
    pub fn new(dir: PathBuf, ttl: Duration) -> Self {
        Self { dir, ttl }
    }

    fn path_for(&self, character: &CharacterRef) -> PathBuf {
        self.dir.join(format!("{}.json", character.cache_key()))
    }

    pub fn load_fresh(&self, character: &CharacterRef) -> Option<Value> {
        let path = self.path_for(character);
        if !path.exists() {
            return None;
        }
        let cached = fs::read_to_string(&path)
            .context("read cached profile")
            .and_then(|raw| {
                serde_json::from_str::<CachedProfile>(&raw).context("parse cached profile")
            });
        let cached = match cached {
            Ok(cached) => cached,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "Ignoring unreadable profile cache");
                return None;
            }
        };
        let age = now_secs().saturating_sub(cached.fetched_at);
        if age >= self.ttl.as_secs() {
            debug!(character = %character, age, "Cached profile is stale");
            return None;
        }
        Some(cached.body)
    }

    pub fn store(&self, character: &CharacterRef, body: &Value) -> Result<()> {
        fs::create_dir_all(&self.dir).context("create profile cache dir")?;
        let cached = CachedProfile {
            fetched_at: now_secs(),
            body: body.clone(),
        };
        let raw = serde_json::to_string(&cached).context("serialize cached profile")?;
        fs::write(self.path_for(character), raw).context("write cached profile")?;
        Ok(())
    }

    pub fn remove(&self, character: &CharacterRef) -> Result<()> {
        let path = self.path_for(character);
        if path.exists() {
            fs::remove_file(&path).context("remove cached profile")?;
        }
        Ok(())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub struct RaiderIoClient {
    agent: ureq::Agent,
    api_base: String,
    cache: Option<ProfileCache>,
}

impl RaiderIoClient {
    pub fn new(config: &AppConfig, cache: Option<ProfileCache>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.connect_timeout_secs))
            .timeout_read(Duration::from_secs(config.read_timeout_secs))
            .timeout_write(Duration::from_secs(config.read_timeout_secs))
            .build();
        Self {
            agent,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            cache,
        }
    }

    fn request_profile(
        &self,
        character: &CharacterRef,
        force_refresh: bool,
    ) -> Result<Value, ImportError> {
        let url = format!("{}/characters/profile", self.api_base);
        let mut request = self
            .agent
            .get(&url)
            .set("User-Agent", USER_AGENT)
            .query("region", &character.region)
            .query("realm", &character.realm)
            .query("name", &character.name)
            .query("fields", PROFILE_FIELDS);
        if force_refresh {
            request = request
                .set("Cache-Control", "no-cache")
                .set("Pragma", "no-cache");
        }

        debug!(character = %character, force_refresh, "Requesting profile");
        let response = request.call()?;
        let body: Value = response
            .into_json()
            .map_err(|err| ImportError::Transport(format!("decode profile body: {err}")))?;
        Ok(body)
    }
}

impl ProfileSource for RaiderIoClient {
    fn fetch_profile(
        &self,
        character: &CharacterRef,
        force_refresh: bool,
    ) -> Result<CharacterProfile, ImportError> {
        if !force_refresh {
            if let Some(body) = self
                .cache
                .as_ref()
                .and_then(|cache| cache.load_fresh(character))
            {
                debug!(character = %character, "Using cached profile");
                return CharacterProfile::from_body(&body);
            }
        }

        let body = self.request_profile(character, force_refresh)?;
        let profile = CharacterProfile::from_body(&body)?;
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.store(character, &body) {
                warn!(character = %character, error = %err, "Failed to cache profile");
            }
        }
        Ok(profile)
    }

    fn discard(&self, character: &CharacterRef) {
        if let Some(cache) = &self.cache {
            match cache.remove(character) {
                Ok(()) => debug!(character = %character, "Dropped cached profile"),
                Err(err) => {
                    warn!(character = %character, error = %err, "Failed to drop cached profile")
                }
            }
        }
    }
}
