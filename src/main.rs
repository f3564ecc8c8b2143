//! Space Bench entry point
//!
//! Runs the simulation headless under the autopilot and reports how long
//! each tick took.
//!
//! Usage: space-bench [--seed N] [--frames N] [--dt S] [--tuning FILE]
//!                    [--thumper always-deflect|coin-flip] [--json]

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use space_bench::consts::FRAME_DT;
use space_bench::sim::{GameEvent, SimulationState, Xorshift32, autopilot, tick};
use space_bench::{ThumperPolicy, Tuning, clamp_dt};

const DEFAULT_FRAMES: u64 = 60 * 60 * 5;

#[derive(Parser, Debug)]
#[command(name = "space-bench")]
#[command(about = "Run the space shooter simulation headless and time every tick")]
struct Args {
    /// Simulation seed (taken from the system clock when omitted)
    #[arg(long)]
    seed: Option<u32>,
    /// Number of ticks to run
    #[arg(long, default_value_t = DEFAULT_FRAMES)]
    frames: u64,
    /// Timestep per tick in seconds
    #[arg(long, default_value_t = FRAME_DT)]
    dt: f32,
    /// JSON file overriding any subset of the balance constants
    #[arg(long)]
    tuning: Option<PathBuf>,
    /// What the thumper field does to enemy projectiles
    #[arg(long, value_enum)]
    thumper: Option<CliThumper>,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CliThumper {
    AlwaysDeflect,
    CoinFlip,
}

impl From<CliThumper> for ThumperPolicy {
    fn from(value: CliThumper) -> Self {
        match value {
            CliThumper::AlwaysDeflect => ThumperPolicy::AlwaysDeflect,
            CliThumper::CoinFlip => ThumperPolicy::CoinFlip,
        }
    }
}

/// Results of one benchmark run
#[derive(Debug, Default, Serialize)]
struct BenchSummary {
    seed: u32,
    frames: u64,
    dt: f32,
    thumper: &'static str,
    runs: u32,
    best_score: u32,
    total_kills: u32,
    anomalies_spawned: u32,
    anomalies_defeated: u32,
    dropped_spawns: u64,
    mean_tick_us: f64,
    max_tick_us: f64,
    total_ms: f64,
}

fn run(args: &Args) -> Result<BenchSummary> {
    let mut tuning = match &args.tuning {
        Some(path) => Tuning::load(path)
            .with_context(|| format!("loading tuning from {}", path.display()))?,
        None => Tuning::default(),
    };
    if let Some(thumper) = args.thumper {
        tuning.thumper_policy = thumper.into();
    }
    let seed = args.seed.unwrap_or_else(Xorshift32::seed_from_clock);
    let dt = clamp_dt(args.dt);
    if dt != args.dt {
        log::warn!("dt {} clamped to {}", args.dt, dt);
    }
    let thumper = tuning.thumper_policy.as_str();
    log::info!(
        "Space Bench starting: seed {seed}, {} frames at dt {dt}, thumper {thumper}",
        args.frames
    );

    let mut state = SimulationState::with_tuning(seed, tuning);
    let mut summary = BenchSummary {
        seed,
        frames: args.frames,
        dt,
        thumper,
        runs: 1,
        ..Default::default()
    };
    let mut total = Duration::ZERO;
    let mut max = Duration::ZERO;
    let mut kills_before_run = 0;

    for _ in 0..args.frames {
        state.input = autopilot(&state);
        let start = Instant::now();
        tick(&mut state, dt);
        let elapsed = start.elapsed();
        total += elapsed;
        max = max.max(elapsed);

        for event in state.events() {
            match event {
                GameEvent::AnomalySpawned => summary.anomalies_spawned += 1,
                GameEvent::AnomalyDestroyed => summary.anomalies_defeated += 1,
                _ => {}
            }
        }

        if state.can_select_retry() {
            summary.best_score = summary.best_score.max(state.score);
            summary.total_kills += state.total_enemies_killed;
            summary.dropped_spawns += dropped_spawns(&state);
            kills_before_run = 0;
            summary.runs += 1;
            state.restart();
        } else {
            kills_before_run = state.total_enemies_killed;
        }
    }
    summary.best_score = summary.best_score.max(state.score);
    summary.total_kills += kills_before_run;
    summary.dropped_spawns += dropped_spawns(&state);

    summary.total_ms = total.as_secs_f64() * 1e3;
    summary.max_tick_us = max.as_secs_f64() * 1e6;
    if args.frames > 0 {
        summary.mean_tick_us = total.as_secs_f64() * 1e6 / args.frames as f64;
    }
    Ok(summary)
}

fn dropped_spawns(state: &SimulationState) -> u64 {
    state.bullets.dropped_spawns()
        + state.enemy_shots.dropped_spawns()
        + state.enemies.dropped_spawns()
        + state.particles.dropped_spawns()
        + state.explosions.dropped_spawns()
        + state.upgrades.dropped_spawns()
        + state.drones.dropped_spawns()
}

fn report(summary: &BenchSummary, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(summary)?;
        println!("{out}");
        return Ok(());
    }
    println!("seed            {}", summary.seed);
    println!("frames          {} @ {:.4}s", summary.frames, summary.dt);
    println!("thumper         {}", summary.thumper);
    println!("runs            {}", summary.runs);
    println!("best score      {}", summary.best_score);
    println!("kills           {}", summary.total_kills);
    println!(
        "anomalies       {} spawned, {} defeated",
        summary.anomalies_spawned, summary.anomalies_defeated
    );
    println!("dropped spawns  {}", summary.dropped_spawns);
    println!(
        "tick            mean {:.2}us, max {:.2}us, total {:.1}ms",
        summary.mean_tick_us, summary.max_tick_us, summary.total_ms
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let summary = run(&args)?;
    log::info!(
        "Finished {} frames: mean tick {:.2}us",
        summary.frames,
        summary.mean_tick_us
    );
    report(&summary, args.json)
}
