use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Config, ConfigError};

const MAX_RECENT_LOOKUPS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentLookup {
    pub headword: String,
    pub target_language: String,
    pub definition_language: String,
}

/// Represents a user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub value: Config,
    #[serde(default)]
    pub recent_lookups: Vec<RecentLookup>,
}

impl Profile {
    fn fresh() -> Self {
        Self {
            name: "main".into(),
            value: Config::default(),
            recent_lookups: Vec::new(),
        }
    }
}

/// File-backed profile; every mutation is written straight back
pub struct ProfileStore {
    path: PathBuf,
    profile: Profile,
}

impl ProfileStore {
    /// Load the profile at `path`, creating it from defaults when missing.
    /// An unreadable file is replaced by defaults in memory only.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();

        if !path.exists() {
            let store = Self {
                path,
                profile: Profile::fresh(),
            };
            store.save()?;
            tracing::info!("Created profile at {}", store.path.display());
            return Ok(store);
        }

        let profile = match read_profile(&path) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(
                    "Could not load profile {}, using defaults: {}",
                    path.display(),
                    e
                );
                Profile::fresh()
            }
        };

        Ok(Self { path, profile })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn config(&self) -> &Config {
        &self.profile.value
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.profile)?)?;
        Ok(())
    }

    /// Change lookup languages. Definition and source language move together.
    pub fn update_languages(
        &mut self,
        target: Option<&str>,
        definition: Option<&str>,
    ) -> Result<(), ConfigError> {
        let languages = &mut self.profile.value.languages;
        if let Some(target) = target {
            languages.target_language = target.to_string();
        }
        if let Some(definition) = definition {
            languages.definition_language = definition.to_string();
        }
        self.save()
    }

    /// Move the lookup to the front of the recent list, keeping five.
    pub fn add_recent_lookup(&mut self, lookup: RecentLookup) -> Result<&[RecentLookup], ConfigError> {
        let recent = &mut self.profile.recent_lookups;
        recent.retain(|existing| existing != &lookup);
        recent.insert(0, lookup);
        recent.truncate(MAX_RECENT_LOOKUPS);
        self.save()?;
        Ok(&self.profile.recent_lookups)
    }
}

fn read_profile(path: &Path) -> Result<Profile, ConfigError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
