//! `skyfollow` CLI: scenario runs, realtime playback, replay and config checks.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use follow_core::{metrics::FollowMetrics, FollowConfig};
use sim::replay::{load_replay, replay_metrics, save_replay};
use sim::scenarios::{Scenario, ScenarioKind};
use sim::{run_realtime, CommandKind, ScenarioRunner};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "skyfollow", about = "Camera-following control loop CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a named scenario and output metrics.
    RunScenario {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// JSON config file (missing fields take defaults)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the platform command model
        #[arg(long, value_enum)]
        command: Option<CommandKind>,
        /// Play through the threaded scheduler in wall-clock time
        #[arg(long)]
        realtime: bool,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the full replay log
        #[arg(long)]
        save_replay: Option<PathBuf>,
    },
    /// Re-score a previously recorded run.
    Replay {
        /// Path to replay JSON file
        input: PathBuf,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate a config file, or print the defaults when none is given.
    CheckConfig { path: Option<PathBuf> },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunScenario {
            scenario,
            seed,
            config,
            command,
            realtime,
            output,
            save_replay: save_path,
        } => {
            let config = load_config(config.as_deref())?;
            let mut scenario = Scenario::build(scenario, seed);
            if let Some(kind) = command {
                scenario.command = kind;
            }
            if realtime {
                run_live(scenario, config)?;
            } else {
                run_scenario(scenario, config, output.as_deref(), save_path.as_deref())?;
            }
        }
        Commands::Replay { input, output } => {
            run_replay(&input, output.as_deref())?;
        }
        Commands::CheckConfig { path } => match path {
            Some(p) => {
                let cfg = FollowConfig::load(&p)?;
                println!("{} is valid", p.display());
                println!("  target area: {:.1} px²", cfg.target_area());
                println!(
                    "  ensemble: {} slots, lost at {}",
                    cfg.ensemble_size, cfg.lost_quorum
                );
            }
            None => println!("{}", serde_json::to_string_pretty(&FollowConfig::default())?),
        },
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<FollowConfig> {
    let config = match path {
        Some(p) => FollowConfig::load(p).with_context(|| format!("loading {}", p.display()))?,
        None => FollowConfig::default(),
    };
    tracing::debug!(?config, "config loaded");
    Ok(config)
}

fn run_scenario(
    scenario: Scenario,
    config: FollowConfig,
    output_path: Option<&Path>,
    replay_path: Option<&Path>,
) -> Result<()> {
    println!(
        "Running scenario '{}' (seed={}, duration={:.0}s, {} frames)...",
        scenario.name,
        scenario.seed,
        scenario.duration,
        scenario.frame_count()
    );

    let outcome = ScenarioRunner::new(scenario, config)?.run();

    println!(
        "Done: {} arms, camera at [{:.0}, {:.0}, {:.0}], elapsed={:.1}ms",
        outcome.arms,
        outcome.final_camera[0],
        outcome.final_camera[1],
        outcome.final_camera[2],
        outcome.wall_time_ms,
    );
    print_metrics(&outcome.metrics);

    if let Some(rpath) = replay_path {
        save_replay(&outcome.replay, rpath)?;
        println!("Replay saved to {}", rpath.display());
    }
    if let Some(opath) = output_path {
        write_metrics(&outcome.metrics, opath)?;
    }
    Ok(())
}

fn run_live(scenario: Scenario, config: FollowConfig) -> Result<()> {
    println!(
        "Playing scenario '{}' in real time ({:.0}s)...",
        scenario.name, scenario.duration
    );
    let pace = Duration::from_secs_f64(scenario.frame_dt);
    let outcome = run_realtime(scenario, config, Some(pace), Duration::from_millis(20))?;
    println!(
        "Done: {} frames, {} ticks, {} arms, {} moves, {} stops, camera at [{:.0}, {:.0}, {:.0}]",
        outcome.frames,
        outcome.ticks,
        outcome.arms,
        outcome.move_commands,
        outcome.stop_commands,
        outcome.final_camera[0],
        outcome.final_camera[1],
        outcome.final_camera[2],
    );
    Ok(())
}

fn run_replay(input: &Path, output: Option<&Path>) -> Result<()> {
    let log = load_replay(input)?;
    println!(
        "Replay '{}' (seed={}, {} frames)",
        log.scenario_name,
        log.seed,
        log.frames.len()
    );
    let metrics = replay_metrics(&log);
    print_metrics(&metrics);
    if let Some(opath) = output {
        write_metrics(&metrics, opath)?;
    }
    Ok(())
}

fn print_metrics(m: &FollowMetrics) {
    println!(
        "Tracking: {:.1}% of {} frames, RMSE={:.1}px, precision={:.3}, recall={:.3}",
        m.tracking_ratio() * 100.0,
        m.n_frames,
        m.rmse_center(),
        m.precision(),
        m.recall(),
    );
    println!(
        "Losses: {}, slot failures={}, outliers={}, border timeouts={}",
        m.lost_events, m.slot_failures, m.slot_outliers, m.slot_border_timeouts
    );
    println!(
        "Commands: {} moves, {} stops, centred {} frames",
        m.move_commands, m.stop_commands, m.centred_frames
    );
}

fn write_metrics(m: &FollowMetrics, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(m)?;
    std::fs::write(path, json)?;
    println!("Metrics written to {}", path.display());
    Ok(())
}
