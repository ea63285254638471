//! TOML level files consumed by the command-line adapter.

use std::{collections::BTreeSet, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use wave_scheduler_core::{
    LevelDef, LevelResources, MonsterRef, Path, Position, SpawnerDef, WaveDef,
};
use wave_scheduler_world::World;

/// Level file format version understood by this adapter.
pub(crate) const SUPPORTED_LEVEL_VERSION: u32 = 1;

/// Level bundled with the binary and used when no file is supplied.
pub(crate) const DEMO_LEVEL: &str = include_str!("../levels/meadow.toml");

/// Authored level: definitions plus the host data the world needs.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct LevelFile {
    version: u32,
    name: String,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(default)]
    resources: LevelResources,
    /// Monsters the world can build; defaults to every referenced monster.
    #[serde(default)]
    monsters: Option<Vec<String>>,
    #[serde(default)]
    paths: Vec<PathEntry>,
    #[serde(default)]
    waves: Vec<WaveEntry>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
struct PathEntry {
    name: String,
    points: Vec<[f32; 2]>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
struct WaveEntry {
    #[serde(default)]
    delay: f32,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(default)]
    spawners: Vec<SpawnerEntry>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
struct SpawnerEntry {
    monster: String,
    #[serde(default = "one")]
    times: u32,
    #[serde(default = "one")]
    number: u32,
    #[serde(default)]
    pulse: f32,
    #[serde(default)]
    delay: f32,
    #[serde(default)]
    path: Option<String>,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

fn one() -> u32 {
    1
}

/// Errors raised while loading a level file.
#[derive(Debug, Error)]
pub(crate) enum LevelFileError {
    /// The TOML document could not be deserialised.
    #[error("could not parse level file: {0}")]
    Parse(#[from] toml::de::Error),
    /// The document declares a version this adapter does not understand.
    #[error("unsupported level file version {found}; expected {}", SUPPORTED_LEVEL_VERSION)]
    UnsupportedVersion {
        /// Version declared by the document.
        found: u32,
    },
    /// A duration field was negative, infinite or not a number.
    #[error("{field} of wave {wave} must be a non-negative number of seconds, got {value}")]
    InvalidDuration {
        /// Name of the offending field.
        field: &'static str,
        /// 1-based wave number containing the field.
        wave: usize,
        /// Value found in the document.
        value: f32,
    },
    /// A path was declared without any waypoint.
    #[error("path `{0}` has no points")]
    EmptyPath(String),
}

impl LevelFile {
    /// Parses and validates the version of a TOML level document.
    pub(crate) fn parse(contents: &str) -> Result<Self, LevelFileError> {
        let file: Self = toml::from_str(contents)?;
        if file.version != SUPPORTED_LEVEL_VERSION {
            return Err(LevelFileError::UnsupportedVersion {
                found: file.version,
            });
        }
        for path in &file.paths {
            if path.points.is_empty() {
                return Err(LevelFileError::EmptyPath(path.name.clone()));
            }
        }
        Ok(file)
    }

    /// Converts the authored waves into an immutable level definition.
    pub(crate) fn to_level_def(&self) -> Result<LevelDef, LevelFileError> {
        let waves = self
            .waves
            .iter()
            .enumerate()
            .map(|(index, wave)| wave.to_wave_def(index + 1))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LevelDef::new(self.name.clone(), waves)
            .with_resources(self.resources)
            .with_enabled(self.enabled))
    }

    /// Registers the level's paths and monsters with the world.
    pub(crate) fn populate(&self, world: &mut World) {
        for entry in &self.paths {
            let points = entry
                .points
                .iter()
                .map(|[x, y]| Position::new(*x, *y))
                .collect();
            world.insert_path(entry.name.clone(), Path::new(points));
        }

        for monster in self.catalogue() {
            world.register_monster(MonsterRef::new(monster));
        }
    }

    fn catalogue(&self) -> BTreeSet<&str> {
        match &self.monsters {
            Some(monsters) => monsters.iter().map(String::as_str).collect(),
            None => self
                .waves
                .iter()
                .flat_map(|wave| wave.spawners.iter())
                .map(|spawner| spawner.monster.as_str())
                .collect(),
        }
    }
}

impl WaveEntry {
    fn to_wave_def(&self, wave: usize) -> Result<WaveDef, LevelFileError> {
        let spawners = self
            .spawners
            .iter()
            .map(|spawner| spawner.to_spawner_def(wave))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WaveDef::new(spawners)
            .with_delay(seconds("wave delay", wave, self.delay)?)
            .with_enabled(self.enabled))
    }
}

impl SpawnerEntry {
    fn to_spawner_def(&self, wave: usize) -> Result<SpawnerDef, LevelFileError> {
        let monster = MonsterRef::new(self.monster.clone());
        let mut def = SpawnerDef::new(monster, self.times, self.number)
            .with_pulse(seconds("spawner pulse", wave, self.pulse)?)
            .with_delay(seconds("spawner delay", wave, self.delay)?)
            .with_enabled(self.enabled);
        if let Some(path) = &self.path {
            def = def.with_path(path.clone());
        }
        Ok(def)
    }
}

fn seconds(field: &'static str, wave: usize, value: f32) -> Result<Duration, LevelFileError> {
    Duration::try_from_secs_f32(value)
        .map_err(|_| LevelFileError::InvalidDuration { field, wave, value })
}
