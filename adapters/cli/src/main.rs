#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a level's wave schedule against the reference world.

mod level_file;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wave_scheduler_core::{OwnerHandle, PathProvider, SchedulerObserver, UnitHandle};
use wave_scheduler_system_spawning::{Config, SpawnScheduler};
use wave_scheduler_world::{self as world, query, World};

use crate::level_file::{LevelFile, DEMO_LEVEL};

/// Faction owning every unit spawned by the scheduler.
const HOSTILE_OWNER: OwnerHandle = OwnerHandle::new(2);

/// Runs a wave schedule on a fixed timestep and reports what it spawned.
#[derive(Debug, Parser)]
#[command(name = "wave-scheduler", version)]
struct CliArgs {
    /// TOML level file to run; the bundled demo level is used when omitted.
    #[arg(long, value_name = "FILE")]
    level: Option<PathBuf>,
    /// Simulated seconds to run before stopping.
    #[arg(long, value_name = "SECS", default_value_t = 60.0)]
    duration: f32,
    /// Length of one simulation tick in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 100)]
    tick_ms: u64,
    /// Finish the level after one pass instead of looping.
    #[arg(long)]
    no_loop: bool,
    /// Seed for the world's failure injection.
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
    /// Probability that the world fails to create a unit.
    #[arg(long, value_name = "P", default_value_t = 0.0)]
    failure_chance: f32,
}

/// Observer that logs scheduler notifications and tallies them.
#[derive(Debug, Default)]
struct EventLog {
    waves_started: u32,
    waves_completed: u32,
    loops: u32,
    spawned: u64,
    level_completed: bool,
}

impl SchedulerObserver for EventLog {
    fn on_wave_started(&mut self, wave: u32) {
        self.waves_started += 1;
        info!(wave, "wave_started");
    }

    fn on_wave_completed(&mut self, wave: u32) {
        self.waves_completed += 1;
        info!(wave, "wave_completed");
    }

    fn on_level_completed(&mut self) {
        self.level_completed = true;
        info!("level_completed");
    }

    fn on_level_looped(&mut self, loop_count: u32) {
        self.loops = loop_count;
        info!(loop_count, "level_looped");
    }

    fn on_monster_spawned(&mut self, unit: UnitHandle) {
        self.spawned += 1;
        debug!(unit = unit.get(), "monster_spawned");
    }
}

/// Entry point for the wave scheduler command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = CliArgs::parse();

    let contents = match &args.level {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read level file at {}", path.display()))?,
        None => DEMO_LEVEL.to_owned(),
    };
    let file = LevelFile::parse(&contents).context("failed to load level file")?;
    let level = file
        .to_level_def()
        .context("level file contains invalid definitions")?;

    let run_for = Duration::try_from_secs_f32(args.duration)
        .context("--duration must be a non-negative number of seconds")?;
    let tick = Duration::from_millis(args.tick_ms.max(1));

    let mut world =
        World::new(world::Config::new(args.seed).with_failure_chance(args.failure_chance));
    file.populate(&mut world);

    let mut scheduler =
        SpawnScheduler::new(Config::new(HOSTILE_OWNER).with_loop_mode(!args.no_loop));
    if !scheduler.start_level(&level) {
        bail!("level `{}` could not be started", level.name);
    }
    info!(
        level = %level.name,
        gold = level.resources.gold,
        lives = level.resources.lives,
        "simulation_started"
    );

    let mut log = EventLog::default();
    while scheduler.is_running() && scheduler.elapsed() < run_for {
        scheduler.update(tick, &mut world, &mut log);
    }

    print_summary(&scheduler, &world, &log, level.expected_unit_count());
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn print_summary(scheduler: &SpawnScheduler, world: &World, log: &EventLog, expected: u64) {
    let progress = scheduler.progress();
    println!(
        "simulated {:.1}s: {} waves started, {} completed, {} loops",
        scheduler.elapsed().as_secs_f32(),
        log.waves_started,
        log.waves_completed,
        log.loops,
    );
    println!(
        "wave {}/{} in current pass, level completed: {}",
        progress.current_wave, progress.total_waves, log.level_completed,
    );
    println!(
        "units spawned: {} (one full pass expects {expected}), live in world: {}",
        log.spawned,
        query::unit_count(world),
    );

    for name in query::path_names(world) {
        let Some(path) = world.path(name) else {
            continue;
        };
        match path.points().first() {
            Some(start) => println!(
                "  path {name}: {} points from ({:.1}, {:.1})",
                path.points().len(),
                start.x(),
                start.y(),
            ),
            None => println!("  path {name}: no points"),
        }
    }

    for wave in scheduler.waves() {
        for spawner in wave.spawners() {
            let def = spawner.def();
            let units = scheduler.spawned_units(spawner.id());
            let origin = units
                .first()
                .and_then(|handle| query::unit(world, *handle))
                .map(|unit| {
                    format!(
                        " at ({:.1}, {:.1}) for owner {}",
                        unit.position().x(),
                        unit.position().y(),
                        unit.owner().get(),
                    )
                })
                .unwrap_or_default();
            println!(
                "  wave {} spawner {} [{}]: {}/{} pulses, {} units tracked{origin}",
                spawner.id().wave() + 1,
                spawner.id().spawner() + 1,
                def.monster,
                spawner.spawned_count(),
                def.times,
                units.len(),
            );
        }
    }
}
