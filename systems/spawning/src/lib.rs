#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave scheduler that drives timed unit generation for a level.
//!
//! The scheduler is poll-driven: the host advances it once per simulation tick
//! through [`SpawnScheduler::update`], passing the elapsed simulated time. All
//! state transitions (wave activation, spawner pulses, completion detection
//! and looping) happen synchronously inside that call, and observers are
//! notified before it returns.

mod ledger;
mod runtime;

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use wave_scheduler_core::{
    LevelDef, OwnerHandle, PathProvider, SchedulerObserver, SpawnerId, UnitFactory, UnitHandle,
    DEFAULT_PATH_NAME,
};

use crate::ledger::SpawnLedger;
pub use crate::runtime::{SpawnerRuntime, WaveRuntime};

/// Pause between the end of a looping level and its restart.
pub const LOOP_DELAY: Duration = Duration::from_secs(10);

/// Controls how `wave_delay` is interpreted for waves after the first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WaveDelayPolicy {
    /// Only the first wave waits for its delay; later waves start as soon as
    /// their predecessor completes.
    #[default]
    FirstWaveOnly,
    /// Every later wave waits its own delay after the predecessor completes.
    AfterPredecessor,
}

/// Configuration parameters required to construct the scheduler.
#[derive(Clone, Debug)]
pub struct Config {
    owner: OwnerHandle,
    loop_mode: bool,
    loop_delay: Duration,
    default_path: String,
    wave_delay_policy: WaveDelayPolicy,
}

impl Config {
    /// Creates a looping configuration whose units belong to `owner`.
    #[must_use]
    pub fn new(owner: OwnerHandle) -> Self {
        Self {
            owner,
            loop_mode: true,
            loop_delay: LOOP_DELAY,
            default_path: DEFAULT_PATH_NAME.to_owned(),
            wave_delay_policy: WaveDelayPolicy::default(),
        }
    }

    /// Sets whether completed levels restart automatically.
    #[must_use]
    pub fn with_loop_mode(mut self, loop_mode: bool) -> Self {
        self.loop_mode = loop_mode;
        self
    }

    /// Overrides the pause between loops.
    #[must_use]
    pub fn with_loop_delay(mut self, loop_delay: Duration) -> Self {
        self.loop_delay = loop_delay;
        self
    }

    /// Overrides the path used by spawners without an explicit path.
    #[must_use]
    pub fn with_default_path(mut self, default_path: impl Into<String>) -> Self {
        self.default_path = default_path.into();
        self
    }

    /// Overrides how later waves honour their delay.
    #[must_use]
    pub fn with_wave_delay_policy(mut self, policy: WaveDelayPolicy) -> Self {
        self.wave_delay_policy = policy;
        self
    }

    /// Owner assigned to every spawned unit.
    #[must_use]
    pub const fn owner(&self) -> OwnerHandle {
        self.owner
    }

    /// Path used by spawners without an explicit path.
    #[must_use]
    pub fn default_path(&self) -> &str {
        &self.default_path
    }
}

/// Lifecycle phase of the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    /// No level is loaded.
    Idle,
    /// A level is loaded and advances on every update.
    Running,
    /// A non-looping level finished; progress remains queryable.
    Completed,
}

/// Snapshot of how far the scheduler progressed through the level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Index of the wave in progress, equal to the number of waves completed in this cycle.
    pub current_wave: usize,
    /// Number of enabled waves in the level.
    pub total_waves: usize,
    /// Whether the level is finished. Always `false` while loop mode is on.
    pub is_completed: bool,
}

/// Reasons a level may be rejected by [`SpawnScheduler::try_start_level`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StartLevelError {
    /// Another level is still running; stop it first.
    #[error("a level is already running")]
    AlreadyRunning,
    /// The level contains no waves at all.
    #[error("level `{name}` contains no waves")]
    EmptyLevel {
        /// Name of the rejected level.
        name: String,
    },
    /// The level is flagged as disabled.
    #[error("level `{name}` is disabled")]
    Disabled {
        /// Name of the rejected level.
        name: String,
    },
    /// Every wave of the level is disabled.
    #[error("level `{name}` has no enabled waves")]
    NoEnabledWaves {
        /// Name of the rejected level.
        name: String,
    },
}

/// Orchestrates the waves of a single level.
#[derive(Debug)]
pub struct SpawnScheduler {
    config: Config,
    state: SchedulerState,
    level: Option<LevelDef>,
    waves: Vec<WaveRuntime>,
    cursor: usize,
    clock: Duration,
    predecessor_completed_at: Option<Duration>,
    loop_pending_since: Option<Duration>,
    loop_count: u32,
    ledger: SpawnLedger,
}

impl SpawnScheduler {
    /// Creates an idle scheduler using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: SchedulerState::Idle,
            level: None,
            waves: Vec::new(),
            cursor: 0,
            clock: Duration::ZERO,
            predecessor_completed_at: None,
            loop_pending_since: None,
            loop_count: 0,
            ledger: SpawnLedger::default(),
        }
    }

    /// Starts `level`, logging and returning `false` when it is rejected.
    pub fn start_level(&mut self, level: &LevelDef) -> bool {
        match self.try_start_level(level) {
            Ok(()) => true,
            Err(error) => {
                warn!(level = %level.name, reason = %error, "level_start_rejected");
                false
            }
        }
    }

    /// Materialises runtime state for every enabled wave and spawner of `level`.
    ///
    /// Fails without touching the current state when a level is already
    /// running or the level has nothing to schedule. Spawners without a
    /// monster reference or with zero pulses or units are skipped.
    pub fn try_start_level(&mut self, level: &LevelDef) -> Result<(), StartLevelError> {
        if self.state == SchedulerState::Running {
            return Err(StartLevelError::AlreadyRunning);
        }
        if level.waves.is_empty() {
            return Err(StartLevelError::EmptyLevel {
                name: level.name.clone(),
            });
        }
        if !level.enabled {
            return Err(StartLevelError::Disabled {
                name: level.name.clone(),
            });
        }

        let waves = build_waves(level);
        if waves.is_empty() {
            return Err(StartLevelError::NoEnabledWaves {
                name: level.name.clone(),
            });
        }

        self.clear_run();
        info!(
            level = %level.name,
            waves = waves.len(),
            expected_units = level.expected_unit_count(),
            loop_mode = self.config.loop_mode,
            "level_started"
        );
        self.level = Some(level.clone());
        self.waves = waves;
        self.state = SchedulerState::Running;
        Ok(())
    }

    /// Discards all runtime state and returns to [`SchedulerState::Idle`].
    ///
    /// No event is emitted; spawners mid-pulse are abandoned.
    pub fn stop_level(&mut self) {
        if self.state != SchedulerState::Idle {
            debug!(loop_count = self.loop_count, "level_stopped");
        }
        self.clear_run();
    }

    /// Advances the virtual clock by `dt` and runs one scheduling pass.
    ///
    /// Does nothing unless a level is running. At most one pulse fires per
    /// spawner per call.
    pub fn update<H, O>(&mut self, dt: Duration, host: &mut H, observer: &mut O)
    where
        H: UnitFactory + PathProvider + ?Sized,
        O: SchedulerObserver + ?Sized,
    {
        if self.state != SchedulerState::Running {
            return;
        }

        self.clock = self.clock.saturating_add(dt);
        let now = self.clock;

        if let Some(since) = self.loop_pending_since {
            if !self.config.loop_mode {
                self.finish_level(observer);
                return;
            }
            if now.saturating_sub(since) < self.config.loop_delay {
                return;
            }
            self.restart_cycle(observer);
        }

        self.advance_current_wave(now, host, observer);

        if self.cursor == self.waves.len() && self.loop_pending_since.is_none() {
            if self.config.loop_mode {
                info!(loop_count = self.loop_count, "level_cycle_finished");
                self.loop_pending_since = Some(now);
            } else {
                self.finish_level(observer);
            }
        }
    }

    /// Reports whether completed levels restart automatically.
    #[must_use]
    pub const fn loop_mode(&self) -> bool {
        self.config.loop_mode
    }

    /// Enables or disables automatic restarts, effective from the next update.
    pub fn set_loop_mode(&mut self, loop_mode: bool) {
        self.config.loop_mode = loop_mode;
    }

    /// Reports how far the level progressed.
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            current_wave: self.cursor,
            total_waves: self.waves.len(),
            is_completed: !self.config.loop_mode && self.state == SchedulerState::Completed,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// Reports whether a level is advancing on updates.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Simulated time elapsed since the level started.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.clock
    }

    /// Number of loops performed since the level started.
    #[must_use]
    pub const fn loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Zero-based index of the wave in progress.
    #[must_use]
    pub const fn current_wave_index(&self) -> usize {
        self.cursor
    }

    /// Runtime state of every enabled wave, in activation order.
    #[must_use]
    pub fn waves(&self) -> &[WaveRuntime] {
        &self.waves
    }

    /// Definition of the level being run, if any.
    #[must_use]
    pub fn level(&self) -> Option<&LevelDef> {
        self.level.as_ref()
    }

    /// Units created by `spawner` that are still tracked.
    #[must_use]
    pub fn spawned_units(&self, spawner: SpawnerId) -> &[UnitHandle] {
        self.ledger.units_for(spawner)
    }

    /// Units created since the level started, including released ones.
    #[must_use]
    pub fn total_spawned(&self) -> u64 {
        self.ledger.total_spawned()
    }

    /// Number of spawned units still tracked.
    #[must_use]
    pub fn tracked_unit_count(&self) -> usize {
        self.ledger.tracked_count()
    }

    /// Stops tracking `unit`; returns whether it was tracked.
    ///
    /// The ledger keeps every handle across loops until it is released, so
    /// hosts must call this whenever they destroy a spawned unit.
    pub fn release_unit(&mut self, unit: UnitHandle) -> bool {
        self.ledger.release(unit)
    }

    fn clear_run(&mut self) {
        self.state = SchedulerState::Idle;
        self.level = None;
        self.waves.clear();
        self.cursor = 0;
        self.clock = Duration::ZERO;
        self.predecessor_completed_at = None;
        self.loop_pending_since = None;
        self.loop_count = 0;
        self.ledger.clear();
    }

    fn advance_current_wave<H, O>(&mut self, now: Duration, host: &mut H, observer: &mut O)
    where
        H: UnitFactory + PathProvider + ?Sized,
        O: SchedulerObserver + ?Sized,
    {
        let activation_due = self.activation_due(now);
        let wave_number = wave_number(self.cursor);
        let Some(wave) = self.waves.get_mut(self.cursor) else {
            return;
        };

        if !wave.is_active() {
            if !activation_due {
                return;
            }
            wave.activate(now);
            debug!(
                wave = wave_number,
                spawners = wave.spawners().len(),
                "wave_started"
            );
            observer.on_wave_started(wave_number);
        }

        for spawner in wave.spawners_mut() {
            if spawner.is_due(now) {
                fire_pulse(spawner, now, &self.config, &mut self.ledger, host, observer);
            }
        }

        if wave.refresh_completion() {
            debug!(wave = wave_number, "wave_completed");
            observer.on_wave_completed(wave_number);
            self.cursor += 1;
            self.predecessor_completed_at = Some(now);
        }
    }

    fn activation_due(&self, now: Duration) -> bool {
        let Some(wave) = self.waves.get(self.cursor) else {
            return false;
        };

        // The level clock starts at zero and keeps running across loops.
        if self.cursor == 0 {
            return now >= wave.wave_delay();
        }

        if !self.waves[self.cursor - 1].is_completed() {
            return false;
        }

        match self.config.wave_delay_policy {
            WaveDelayPolicy::FirstWaveOnly => true,
            WaveDelayPolicy::AfterPredecessor => self
                .predecessor_completed_at
                .map_or(true, |completed| {
                    now.saturating_sub(completed) >= wave.wave_delay()
                }),
        }
    }

    fn restart_cycle<O>(&mut self, observer: &mut O)
    where
        O: SchedulerObserver + ?Sized,
    {
        for wave in &mut self.waves {
            wave.reset();
        }
        self.cursor = 0;
        self.predecessor_completed_at = None;
        self.loop_pending_since = None;
        self.loop_count = self.loop_count.saturating_add(1);
        info!(loop_count = self.loop_count, "level_looped");
        observer.on_level_looped(self.loop_count);
    }

    fn finish_level<O>(&mut self, observer: &mut O)
    where
        O: SchedulerObserver + ?Sized,
    {
        self.state = SchedulerState::Completed;
        self.loop_pending_since = None;
        info!(
            total_spawned = self.ledger.total_spawned(),
            "level_completed"
        );
        observer.on_level_completed();
    }
}

fn build_waves(level: &LevelDef) -> Vec<WaveRuntime> {
    level
        .enabled_waves()
        .map(|(wave_index, wave)| {
            let spawners = wave
                .enabled_spawners()
                .filter_map(|(spawner_index, def)| {
                    let id = SpawnerId::new(to_u32(wave_index), to_u32(spawner_index));
                    if def.monster.is_empty() {
                        warn!(
                            wave = id.wave(),
                            spawner = id.spawner(),
                            "spawner_skipped_missing_monster"
                        );
                        return None;
                    }
                    if def.times == 0 || def.number == 0 {
                        warn!(
                            wave = id.wave(),
                            spawner = id.spawner(),
                            times = def.times,
                            number = def.number,
                            "spawner_skipped_empty_volume"
                        );
                        return None;
                    }
                    Some(SpawnerRuntime::new(id, def.clone()))
                })
                .collect();
            WaveRuntime::new(wave_index, wave.wave_delay, spawners)
        })
        .collect()
}

/// Fires one pulse of `spawner`, creating up to `number` units.
///
/// The pulse counts even when the path is missing or the factory fails, so a
/// broken spawner under-delivers instead of stalling its wave.
fn fire_pulse<H, O>(
    spawner: &mut SpawnerRuntime,
    now: Duration,
    config: &Config,
    ledger: &mut SpawnLedger,
    host: &mut H,
    observer: &mut O,
) where
    H: UnitFactory + PathProvider + ?Sized,
    O: SchedulerObserver + ?Sized,
{
    let id = spawner.id();
    let def = spawner.def();
    let path_name = def.path_name().unwrap_or(config.default_path());
    let position = host.path(path_name).and_then(|path| path.point(0));

    match position {
        Some(position) => {
            for _ in 0..def.number {
                match host.create_unit(&def.monster, position, config.owner) {
                    Some(unit) => {
                        ledger.record(id, unit);
                        observer.on_monster_spawned(unit);
                    }
                    None => warn!(
                        wave = id.wave(),
                        spawner = id.spawner(),
                        monster = %def.monster,
                        "unit_creation_failed"
                    ),
                }
            }
        }
        None => warn!(
            wave = id.wave(),
            spawner = id.spawner(),
            path = path_name,
            "spawn_path_missing"
        ),
    }

    spawner.record_pulse(now);
    debug!(
        wave = id.wave(),
        spawner = id.spawner(),
        pulses = spawner.spawned_count(),
        times = spawner.def().times,
        "spawner_pulsed"
    );
}

fn wave_number(index: usize) -> u32 {
    to_u32(index.saturating_add(1))
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wave_scheduler_core::{MonsterRef, SpawnerDef, WaveDef};

    fn level(waves: Vec<WaveDef>) -> LevelDef {
        LevelDef::new("unit", waves)
    }

    #[test]
    fn skips_spawners_without_monster_or_volume() {
        let waves = build_waves(&level(vec![WaveDef::new(vec![
            SpawnerDef::new(MonsterRef::new(""), 1, 1),
            SpawnerDef::new(MonsterRef::new("slime"), 0, 1),
            SpawnerDef::new(MonsterRef::new("slime"), 1, 0),
            SpawnerDef::new(MonsterRef::new("slime"), 1, 1),
        ])]));

        assert_eq!(waves.len(), 1);
        let ids: Vec<SpawnerId> = waves[0].spawners().iter().map(SpawnerRuntime::id).collect();
        assert_eq!(ids, vec![SpawnerId::new(0, 3)]);
    }

    #[test]
    fn wave_numbers_are_one_based() {
        assert_eq!(wave_number(0), 1);
        assert_eq!(wave_number(4), 5);
    }

    #[test]
    fn config_defaults_to_looping_on_main_path() {
        let config = Config::new(OwnerHandle::new(2));
        assert!(config.loop_mode);
        assert_eq!(config.loop_delay, LOOP_DELAY);
        assert_eq!(config.default_path(), DEFAULT_PATH_NAME);
        assert_eq!(config.wave_delay_policy, WaveDelayPolicy::FirstWaveOnly);
        assert_eq!(config.owner(), OwnerHandle::new(2));
    }
}
