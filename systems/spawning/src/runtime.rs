//! Mutable progress counters tracked for waves and spawners during a run.

use std::time::Duration;

use wave_scheduler_core::{SpawnerDef, SpawnerId};

/// Progress of a single enabled spawner.
///
/// The definition is held by value and never mutated; only the counters
/// change as pulses fire and loops reset the run.
#[derive(Clone, Debug)]
pub struct SpawnerRuntime {
    id: SpawnerId,
    def: SpawnerDef,
    spawned_count: u32,
    is_active: bool,
    is_completed: bool,
    started_at: Option<Duration>,
    next_spawn_at: Option<Duration>,
}

impl SpawnerRuntime {
    pub(crate) fn new(id: SpawnerId, def: SpawnerDef) -> Self {
        Self {
            id,
            def,
            spawned_count: 0,
            is_active: false,
            is_completed: false,
            started_at: None,
            next_spawn_at: None,
        }
    }

    /// Identifier of the spawner within the level definition.
    #[must_use]
    pub const fn id(&self) -> SpawnerId {
        self.id
    }

    /// Definition the spawner was materialised from.
    #[must_use]
    pub const fn def(&self) -> &SpawnerDef {
        &self.def
    }

    /// Number of pulses fired so far, failed spawns included.
    #[must_use]
    pub const fn spawned_count(&self) -> u32 {
        self.spawned_count
    }

    /// Reports whether the owning wave activated the spawner.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Reports whether every configured pulse has fired.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Clock reading at which the spawner was activated.
    #[must_use]
    pub const fn started_at(&self) -> Option<Duration> {
        self.started_at
    }

    /// Clock reading at which the next pulse becomes due.
    #[must_use]
    pub const fn next_spawn_at(&self) -> Option<Duration> {
        self.next_spawn_at
    }

    pub(crate) fn activate(&mut self, now: Duration) {
        self.is_active = true;
        self.started_at = Some(now);
        self.next_spawn_at = Some(now.saturating_add(self.def.delay));
    }

    pub(crate) fn is_due(&self, now: Duration) -> bool {
        if !self.is_active || self.is_completed || self.spawned_count >= self.def.times {
            return false;
        }
        self.next_spawn_at.is_some_and(|due| now >= due)
    }

    /// Counts a pulse and schedules the next one, or completes the spawner.
    pub(crate) fn record_pulse(&mut self, now: Duration) {
        self.spawned_count = self.spawned_count.saturating_add(1).min(self.def.times);
        if self.spawned_count < self.def.times {
            self.next_spawn_at = Some(now.saturating_add(self.def.pulse));
        } else {
            self.is_completed = true;
            self.next_spawn_at = None;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.spawned_count = 0;
        self.is_active = false;
        self.is_completed = false;
        self.started_at = None;
        self.next_spawn_at = None;
    }
}

/// Progress of a single enabled wave and the spawners it owns.
#[derive(Clone, Debug)]
pub struct WaveRuntime {
    index: usize,
    wave_delay: Duration,
    spawners: Vec<SpawnerRuntime>,
    is_active: bool,
    is_completed: bool,
    activated_at: Option<Duration>,
}

impl WaveRuntime {
    pub(crate) fn new(index: usize, wave_delay: Duration, spawners: Vec<SpawnerRuntime>) -> Self {
        Self {
            index,
            wave_delay,
            spawners,
            is_active: false,
            is_completed: false,
            activated_at: None,
        }
    }

    /// Zero-based index of the wave within the level definition.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Activation delay copied from the wave definition.
    #[must_use]
    pub const fn wave_delay(&self) -> Duration {
        self.wave_delay
    }

    /// Spawners materialised for the wave, in authored order.
    #[must_use]
    pub fn spawners(&self) -> &[SpawnerRuntime] {
        &self.spawners
    }

    /// Reports whether the wave has been activated in the current cycle.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Reports whether every spawner of the wave completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Clock reading at which the wave was activated.
    #[must_use]
    pub const fn activated_at(&self) -> Option<Duration> {
        self.activated_at
    }

    pub(crate) fn spawners_mut(&mut self) -> &mut [SpawnerRuntime] {
        &mut self.spawners
    }

    pub(crate) fn activate(&mut self, now: Duration) {
        self.is_active = true;
        self.activated_at = Some(now);
        for spawner in &mut self.spawners {
            spawner.activate(now);
        }
    }

    /// Marks the wave completed once all spawners are; returns `true` on the transition.
    pub(crate) fn refresh_completion(&mut self) -> bool {
        if !self.is_active || self.is_completed {
            return false;
        }
        if !self.spawners.iter().all(SpawnerRuntime::is_completed) {
            return false;
        }
        self.is_completed = true;
        true
    }

    pub(crate) fn reset(&mut self) {
        self.is_active = false;
        self.is_completed = false;
        self.activated_at = None;
        for spawner in &mut self.spawners {
            spawner.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wave_scheduler_core::MonsterRef;

    fn spawner(times: u32) -> SpawnerRuntime {
        SpawnerRuntime::new(
            SpawnerId::new(0, 0),
            SpawnerDef::new(MonsterRef::new("slime"), times, 1)
                .with_pulse(Duration::from_secs(2))
                .with_delay(Duration::from_secs(1)),
        )
    }

    #[test]
    fn inactive_spawner_is_never_due() {
        let runtime = spawner(2);
        assert!(!runtime.is_due(Duration::from_secs(100)));
    }

    #[test]
    fn activation_applies_delay_then_pulse() {
        let mut runtime = spawner(2);
        runtime.activate(Duration::from_secs(5));
        assert!(!runtime.is_due(Duration::from_secs(5)));
        assert!(runtime.is_due(Duration::from_secs(6)));

        runtime.record_pulse(Duration::from_secs(6));
        assert_eq!(runtime.next_spawn_at(), Some(Duration::from_secs(8)));
        assert!(!runtime.is_completed());

        runtime.record_pulse(Duration::from_secs(8));
        assert!(runtime.is_completed());
        assert_eq!(runtime.spawned_count(), 2);
        assert!(!runtime.is_due(Duration::from_secs(50)));
    }

    #[test]
    fn wave_with_no_spawners_completes_on_activation() {
        let mut wave = WaveRuntime::new(0, Duration::ZERO, Vec::new());
        assert!(!wave.refresh_completion(), "inactive waves never complete");
        wave.activate(Duration::ZERO);
        assert!(wave.refresh_completion());
        assert!(!wave.refresh_completion(), "completion reported once");
    }

    #[test]
    fn reset_restores_initial_counters() {
        let mut wave = WaveRuntime::new(3, Duration::ZERO, vec![spawner(1)]);
        wave.activate(Duration::from_secs(1));
        wave.spawners_mut()[0].record_pulse(Duration::from_secs(2));
        assert!(wave.refresh_completion());

        wave.reset();

        assert!(!wave.is_active());
        assert!(!wave.is_completed());
        assert_eq!(wave.activated_at(), None);
        let runtime = &wave.spawners()[0];
        assert_eq!(runtime.spawned_count(), 0);
        assert!(!runtime.is_active());
        assert_eq!(runtime.next_spawn_at(), None);
        assert_eq!(runtime.started_at(), None);
    }
}
