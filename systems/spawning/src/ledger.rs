//! Scheduler-owned record of the units each spawner created.

use std::collections::BTreeMap;

use wave_scheduler_core::{SpawnerId, UnitHandle};

#[derive(Debug, Default)]
pub(crate) struct SpawnLedger {
    units: BTreeMap<SpawnerId, Vec<UnitHandle>>,
    owners: BTreeMap<UnitHandle, SpawnerId>,
    total_spawned: u64,
}

impl SpawnLedger {
    pub(crate) fn record(&mut self, spawner: SpawnerId, unit: UnitHandle) {
        self.units.entry(spawner).or_default().push(unit);
        let _ = self.owners.insert(unit, spawner);
        self.total_spawned = self.total_spawned.saturating_add(1);
    }

    pub(crate) fn units_for(&self, spawner: SpawnerId) -> &[UnitHandle] {
        self.units.get(&spawner).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Forgets a tracked unit; returns whether it was known.
    pub(crate) fn release(&mut self, unit: UnitHandle) -> bool {
        let Some(spawner) = self.owners.remove(&unit) else {
            return false;
        };
        if let Some(units) = self.units.get_mut(&spawner) {
            units.retain(|tracked| *tracked != unit);
        }
        true
    }

    pub(crate) fn tracked_count(&self) -> usize {
        self.owners.len()
    }

    pub(crate) fn total_spawned(&self) -> u64 {
        self.total_spawned
    }

    pub(crate) fn clear(&mut self) {
        self.units.clear();
        self.owners.clear();
        self.total_spawned = 0;
    }
}
