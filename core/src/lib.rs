#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the wave scheduler workspace.
//!
//! This crate defines the immutable level definitions authored by content
//! tooling, the handles exchanged with the host game, and the collaborator
//! traits the scheduler calls into. Hosts implement [`UnitFactory`] and
//! [`PathProvider`] to materialise units, while listeners implement
//! [`SchedulerObserver`] to react to [`SchedulerEvent`] notifications emitted
//! synchronously from inside the scheduler's update pass.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Name of the path used by spawners that do not reference one explicitly.
pub const DEFAULT_PATH_NAME: &str = "main";

/// Opaque key handed to the unit factory to select what to create.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonsterRef(String);

impl MonsterRef {
    /// Creates a monster reference from the provided key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Retrieves the underlying key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reports whether the reference carries no key at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for MonsterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle identifying a unit created by the host's unit factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitHandle(u64);

impl UnitHandle {
    /// Creates a new unit handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Handle describing the player or faction that owns spawned units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerHandle(u32);

impl OwnerHandle {
    /// Creates a new owner handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Stable identifier of a spawner, expressed as indices into the level definition.
///
/// Indices refer to the authored lists, so disabled waves and spawners leave
/// gaps rather than shifting the identifiers of their siblings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpawnerId {
    wave: u32,
    spawner: u32,
}

impl SpawnerId {
    /// Creates a spawner identifier from wave and spawner indices.
    #[must_use]
    pub const fn new(wave: u32, spawner: u32) -> Self {
        Self { wave, spawner }
    }

    /// Zero-based index of the owning wave within the level definition.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }

    /// Zero-based index of the spawner within its wave definition.
    #[must_use]
    pub const fn spawner(&self) -> u32 {
        self.spawner
    }
}

/// Location in world space where units are placed.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    x: f32,
    y: f32,
}

impl Position {
    /// Creates a new position from world coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical coordinate.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }
}

/// Ordered list of waypoints units follow after spawning.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Path {
    points: Vec<Position>,
}

impl Path {
    /// Creates a path from the provided waypoints.
    #[must_use]
    pub fn new(points: Vec<Position>) -> Self {
        Self { points }
    }

    /// Returns the waypoint at `index`, if the path is long enough.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<Position> {
        self.points.get(index).copied()
    }

    /// All waypoints in traversal order.
    #[must_use]
    pub fn points(&self) -> &[Position] {
        &self.points
    }
}

/// Immutable description of a repeating pulse generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnerDef {
    /// Unit factory input selecting what to create.
    pub monster: MonsterRef,
    /// Total number of pulses the spawner fires.
    pub times: u32,
    /// Units created per pulse.
    pub number: u32,
    /// Interval between pulses after the first.
    pub pulse: Duration,
    /// Offset from wave activation to the first pulse.
    pub delay: Duration,
    /// Path used to resolve the spawn position; `None` selects the default path.
    pub path: Option<String>,
    /// Disabled spawners never receive runtime state.
    pub enabled: bool,
}

impl SpawnerDef {
    /// Creates an enabled spawner that fires `times` pulses of `number` units.
    ///
    /// Pulse interval and initial delay default to zero and the default path
    /// is used.
    #[must_use]
    pub fn new(monster: MonsterRef, times: u32, number: u32) -> Self {
        Self {
            monster,
            times,
            number,
            pulse: Duration::ZERO,
            delay: Duration::ZERO,
            path: None,
            enabled: true,
        }
    }

    /// Sets the interval between pulses.
    #[must_use]
    pub fn with_pulse(mut self, pulse: Duration) -> Self {
        self.pulse = pulse;
        self
    }

    /// Sets the offset from wave activation to the first pulse.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Routes spawned units along the named path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets whether the spawner participates in scheduling.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Name of the path this spawner references, ignoring blank names.
    #[must_use]
    pub fn path_name(&self) -> Option<&str> {
        self.path
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Units produced by one complete run of the spawner.
    #[must_use]
    pub fn unit_volume(&self) -> u64 {
        u64::from(self.times) * u64::from(self.number)
    }
}

/// Immutable description of a phase within a level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveDef {
    /// Offset before the wave activates.
    pub wave_delay: Duration,
    /// Spawners started in parallel when the wave activates.
    pub spawners: Vec<SpawnerDef>,
    /// Disabled waves never receive runtime state.
    pub enabled: bool,
}

impl WaveDef {
    /// Creates an enabled wave with no delay.
    #[must_use]
    pub fn new(spawners: Vec<SpawnerDef>) -> Self {
        Self {
            wave_delay: Duration::ZERO,
            spawners,
            enabled: true,
        }
    }

    /// Sets the activation delay of the wave.
    #[must_use]
    pub fn with_delay(mut self, wave_delay: Duration) -> Self {
        self.wave_delay = wave_delay;
        self
    }

    /// Sets whether the wave participates in scheduling.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Iterator over the enabled spawners paired with their authored index.
    pub fn enabled_spawners(&self) -> impl Iterator<Item = (usize, &SpawnerDef)> {
        self.spawners
            .iter()
            .enumerate()
            .filter(|(_, spawner)| spawner.enabled)
    }
}

/// Player resources granted when the level begins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelResources {
    /// Starting currency.
    pub gold: u32,
    /// Units allowed to leak before the player loses.
    pub lives: u32,
}

/// Immutable description of a level: an ordered list of waves plus metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    /// Human readable name of the level.
    pub name: String,
    /// Disabled levels cannot be started.
    pub enabled: bool,
    /// Resources consumed by the host when the level starts.
    pub resources: LevelResources,
    /// Waves in activation order.
    pub waves: Vec<WaveDef>,
}

impl LevelDef {
    /// Creates an enabled level with default resources.
    #[must_use]
    pub fn new(name: impl Into<String>, waves: Vec<WaveDef>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            resources: LevelResources::default(),
            waves,
        }
    }

    /// Sets the starting resources of the level.
    #[must_use]
    pub fn with_resources(mut self, resources: LevelResources) -> Self {
        self.resources = resources;
        self
    }

    /// Sets whether the level may be started.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Iterator over the enabled waves paired with their authored index.
    pub fn enabled_waves(&self) -> impl Iterator<Item = (usize, &WaveDef)> {
        self.waves.iter().enumerate().filter(|(_, wave)| wave.enabled)
    }

    /// Units one full pass of the level is expected to create.
    ///
    /// Only enabled waves and enabled spawners contribute.
    #[must_use]
    pub fn expected_unit_count(&self) -> u64 {
        self.enabled_waves()
            .flat_map(|(_, wave)| wave.enabled_spawners())
            .map(|(_, spawner)| spawner.unit_volume())
            .sum()
    }
}

/// Creates units on behalf of the scheduler.
pub trait UnitFactory {
    /// Creates a unit of the requested kind at `position` owned by `owner`.
    ///
    /// Returns `None` when construction fails; the scheduler logs the failure
    /// and moves on.
    fn create_unit(
        &mut self,
        monster: &MonsterRef,
        position: Position,
        owner: OwnerHandle,
    ) -> Option<UnitHandle>;
}

/// Resolves named paths used to position spawned units.
pub trait PathProvider {
    /// Looks up a path by name.
    fn path(&self, name: &str) -> Option<&Path>;
}

/// Notifications broadcast by the scheduler during an update pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchedulerEvent {
    /// A wave became active. Wave numbers are 1-based.
    WaveStarted {
        /// 1-based number of the wave within the enabled waves.
        wave: u32,
    },
    /// Every spawner of a wave finished. Wave numbers are 1-based.
    WaveCompleted {
        /// 1-based number of the wave within the enabled waves.
        wave: u32,
    },
    /// All waves finished and loop mode is disabled.
    LevelCompleted,
    /// All waves finished and the level restarted from its first wave.
    LevelLooped {
        /// Number of loops performed since the level started.
        loop_count: u32,
    },
    /// The unit factory created a unit.
    MonsterSpawned {
        /// Handle of the created unit.
        unit: UnitHandle,
    },
}

/// Listener contract for scheduler notifications.
///
/// Every method defaults to a no-op so listeners only implement what they
/// care about. Callbacks run synchronously inside the update pass.
pub trait SchedulerObserver {
    /// Called when a wave activates.
    fn on_wave_started(&mut self, _wave: u32) {}

    /// Called when a wave completes.
    fn on_wave_completed(&mut self, _wave: u32) {}

    /// Called once when a non-looping level finishes.
    fn on_level_completed(&mut self) {}

    /// Called each time a looping level restarts.
    fn on_level_looped(&mut self, _loop_count: u32) {}

    /// Called once per unit created by the factory.
    fn on_monster_spawned(&mut self, _unit: UnitHandle) {}
}

impl SchedulerObserver for () {}

impl SchedulerObserver for Vec<SchedulerEvent> {
    fn on_wave_started(&mut self, wave: u32) {
        self.push(SchedulerEvent::WaveStarted { wave });
    }

    fn on_wave_completed(&mut self, wave: u32) {
        self.push(SchedulerEvent::WaveCompleted { wave });
    }

    fn on_level_completed(&mut self) {
        self.push(SchedulerEvent::LevelCompleted);
    }

    fn on_level_looped(&mut self, loop_count: u32) {
        self.push(SchedulerEvent::LevelLooped { loop_count });
    }

    fn on_monster_spawned(&mut self, unit: UnitHandle) {
        self.push(SchedulerEvent::MonsterSpawned { unit });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    fn sample_level() -> LevelDef {
        LevelDef::new(
            "sample",
            vec![
                WaveDef::new(vec![
                    SpawnerDef::new(MonsterRef::new("slime"), 3, 2),
                    SpawnerDef::new(MonsterRef::new("bat"), 4, 1).with_enabled(false),
                ]),
                WaveDef::new(vec![SpawnerDef::new(MonsterRef::new("ogre"), 10, 10)])
                    .with_enabled(false),
                WaveDef::new(vec![SpawnerDef::new(MonsterRef::new("wolf"), 2, 5)
                    .with_pulse(Duration::from_millis(1_500))
                    .with_path("north")]),
            ],
        )
    }

    #[test]
    fn expected_unit_count_skips_disabled_entries() {
        assert_eq!(sample_level().expected_unit_count(), 3 * 2 + 2 * 5);
    }

    #[test]
    fn enabled_waves_keep_authored_indices() {
        let level = sample_level();
        let indices: Vec<usize> = level.enabled_waves().map(|(index, _)| index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn blank_path_names_resolve_to_none() {
        let spawner = SpawnerDef::new(MonsterRef::new("slime"), 1, 1).with_path("   ");
        assert_eq!(spawner.path_name(), None);
        let spawner = spawner.with_path("west");
        assert_eq!(spawner.path_name(), Some("west"));
    }

    #[test]
    fn blank_monster_refs_are_empty() {
        assert!(MonsterRef::new("").is_empty());
        assert!(MonsterRef::new(" ").is_empty());
        assert!(!MonsterRef::new("slime").is_empty());
    }

    #[test]
    fn level_round_trips_through_bincode() {
        assert_round_trip(&sample_level());
    }

    #[test]
    fn recording_observer_preserves_order() {
        let mut events = Vec::new();
        events.on_wave_started(1);
        events.on_monster_spawned(UnitHandle::new(7));
        events.on_wave_completed(1);
        events.on_level_looped(1);
        events.on_level_completed();

        assert_eq!(
            events,
            vec![
                SchedulerEvent::WaveStarted { wave: 1 },
                SchedulerEvent::MonsterSpawned {
                    unit: UnitHandle::new(7)
                },
                SchedulerEvent::WaveCompleted { wave: 1 },
                SchedulerEvent::LevelLooped { loop_count: 1 },
                SchedulerEvent::LevelCompleted,
            ],
        );
    }
}
