#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Reference host world that materialises units for the wave scheduler.
//!
//! The world owns the named spawn paths, the catalogue of monsters it knows
//! how to build, and the roster of live units. It implements
//! [`UnitFactory`] and [`PathProvider`] so it can be handed straight to the
//! scheduler's update pass.

use std::collections::{BTreeMap, BTreeSet};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use wave_scheduler_core::{
    MonsterRef, OwnerHandle, Path, PathProvider, Position, UnitFactory, UnitHandle,
};

/// Configuration parameters required to construct the world.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
    failure_chance: f32,
}

impl Config {
    /// Creates a configuration whose unit factory never fails on purpose.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self {
            rng_seed,
            failure_chance: 0.0,
        }
    }

    /// Sets the probability, clamped to `[0, 1]`, that a unit creation fails.
    #[must_use]
    pub fn with_failure_chance(mut self, failure_chance: f32) -> Self {
        self.failure_chance = if failure_chance.is_nan() {
            0.0
        } else {
            failure_chance.clamp(0.0, 1.0)
        };
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(0x5eed_0f_ca11)
    }
}

/// Live unit created by the world's factory.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    handle: UnitHandle,
    monster: MonsterRef,
    position: Position,
    owner: OwnerHandle,
}

impl Unit {
    /// Handle assigned to the unit.
    #[must_use]
    pub const fn handle(&self) -> UnitHandle {
        self.handle
    }

    /// Kind of monster the unit was built from.
    #[must_use]
    pub const fn monster(&self) -> &MonsterRef {
        &self.monster
    }

    /// Position the unit spawned at.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Player or faction owning the unit.
    #[must_use]
    pub const fn owner(&self) -> OwnerHandle {
        self.owner
    }
}

/// Authoritative host state consulted by the scheduler.
#[derive(Debug)]
pub struct World {
    paths: BTreeMap<String, Path>,
    catalogue: BTreeSet<MonsterRef>,
    units: Vec<Unit>,
    next_handle: u64,
    failure_chance: f32,
    rng: ChaCha8Rng,
}

impl World {
    /// Creates an empty world using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            paths: BTreeMap::new(),
            catalogue: BTreeSet::new(),
            units: Vec::new(),
            next_handle: 1,
            failure_chance: config.failure_chance,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Registers or replaces the path stored under `name`.
    pub fn insert_path(&mut self, name: impl Into<String>, path: Path) {
        let _ = self.paths.insert(name.into(), path);
    }

    /// Teaches the factory how to build `monster`.
    pub fn register_monster(&mut self, monster: MonsterRef) {
        let _ = self.catalogue.insert(monster);
    }

    /// Removes a unit from the roster; returns whether it existed.
    pub fn despawn(&mut self, unit: UnitHandle) -> bool {
        match self.units.iter().position(|candidate| candidate.handle == unit) {
            Some(index) => {
                let _ = self.units.remove(index);
                true
            }
            None => false,
        }
    }

    fn allocate_handle(&mut self) -> UnitHandle {
        let handle = UnitHandle::new(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        handle
    }

    fn injected_failure(&mut self) -> bool {
        self.failure_chance > 0.0 && self.rng.gen::<f32>() < self.failure_chance
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl UnitFactory for World {
    fn create_unit(
        &mut self,
        monster: &MonsterRef,
        position: Position,
        owner: OwnerHandle,
    ) -> Option<UnitHandle> {
        if !self.catalogue.contains(monster) {
            debug!(monster = %monster, "unknown_monster");
            return None;
        }
        if self.injected_failure() {
            debug!(monster = %monster, "injected_unit_failure");
            return None;
        }

        let handle = self.allocate_handle();
        self.units.push(Unit {
            handle,
            monster: monster.clone(),
            position,
            owner,
        });
        Some(handle)
    }
}

impl PathProvider for World {
    fn path(&self, name: &str) -> Option<&Path> {
        self.paths.get(name)
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{Unit, World};
    use wave_scheduler_core::{MonsterRef, UnitHandle};

    /// Live units in creation order.
    #[must_use]
    pub fn units(world: &World) -> &[Unit] {
        &world.units
    }

    /// Number of live units.
    #[must_use]
    pub fn unit_count(world: &World) -> usize {
        world.units.len()
    }

    /// Looks up a live unit by handle.
    #[must_use]
    pub fn unit(world: &World, handle: UnitHandle) -> Option<&Unit> {
        world.units.iter().find(|unit| unit.handle == handle)
    }

    /// Number of live units built from `monster`.
    #[must_use]
    pub fn count_of(world: &World, monster: &MonsterRef) -> usize {
        world
            .units
            .iter()
            .filter(|unit| &unit.monster == monster)
            .count()
    }

    /// Names of every registered path, sorted.
    #[must_use]
    pub fn path_names(world: &World) -> Vec<&str> {
        world.paths.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_slime(config: Config) -> World {
        let mut world = World::new(config);
        world.register_monster(MonsterRef::new("slime"));
        world.insert_path("main", Path::new(vec![Position::new(1.0, 2.0)]));
        world
    }

    #[test]
    fn unknown_monsters_fail_to_spawn() {
        let mut world = world_with_slime(Config::default());
        let created = world.create_unit(
            &MonsterRef::new("dragon"),
            Position::default(),
            OwnerHandle::new(1),
        );
        assert_eq!(created, None);
        assert_eq!(query::unit_count(&world), 0);
    }

    #[test]
    fn handles_increase_monotonically() {
        let mut world = world_with_slime(Config::default());
        let slime = MonsterRef::new("slime");
        let first = world.create_unit(&slime, Position::default(), OwnerHandle::new(1));
        let second = world.create_unit(&slime, Position::default(), OwnerHandle::new(1));
        assert_eq!(first, Some(UnitHandle::new(1)));
        assert_eq!(second, Some(UnitHandle::new(2)));
        assert_eq!(query::count_of(&world, &slime), 2);
    }

    #[test]
    fn certain_failure_never_spawns() {
        let mut world = world_with_slime(Config::new(7).with_failure_chance(1.0));
        for _ in 0..16 {
            let created = world.create_unit(
                &MonsterRef::new("slime"),
                Position::default(),
                OwnerHandle::new(1),
            );
            assert_eq!(created, None);
        }
    }

    #[test]
    fn failure_chance_is_clamped() {
        let config = Config::new(1).with_failure_chance(4.0);
        assert!((config.failure_chance - 1.0).abs() < f32::EPSILON);
        let config = Config::new(1).with_failure_chance(f32::NAN);
        assert!(config.failure_chance.abs() < f32::EPSILON);
    }

    #[test]
    fn despawn_removes_unit_once() {
        let mut world = world_with_slime(Config::default());
        let handle = world
            .create_unit(
                &MonsterRef::new("slime"),
                Position::new(1.0, 2.0),
                OwnerHandle::new(3),
            )
            .expect("slime is registered");
        let unit = query::unit(&world, handle).expect("unit is live");
        assert_eq!(unit.position(), Position::new(1.0, 2.0));
        assert_eq!(unit.owner(), OwnerHandle::new(3));

        assert!(world.despawn(handle));
        assert!(!world.despawn(handle));
        assert!(query::units(&world).is_empty());
    }

    #[test]
    fn paths_are_resolved_by_name() {
        let world = world_with_slime(Config::default());
        assert_eq!(
            world.path("main").and_then(|path| path.point(0)),
            Some(Position::new(1.0, 2.0)),
        );
        assert!(world.path("north").is_none());
        assert_eq!(query::path_names(&world), vec!["main"]);
    }
}
