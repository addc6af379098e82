use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gait_geometry::{load_trial, CoordinateSpace, GaitConfig, GaitPipeline, Side};
use log::info;

/// Riemannian gait analysis of a keypoint trial.
#[derive(Parser, Debug)]
#[command(name = "gait-geometry", version)]
struct Args {
    /// Keypoint trial (JSON array of timestamped frames)
    input: PathBuf,

    /// JSON configuration file; missing fields use walking defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Side used for leg length and step detection (left|right)
    #[arg(long)]
    side: Option<Side>,

    /// Read 3D world keypoints instead of 2D image keypoints
    #[arg(long, default_value_t = false)]
    use_3d: bool,

    /// Moving-average window in frames
    #[arg(long)]
    smooth_window: Option<usize>,

    /// Minimum step duration in seconds
    #[arg(long)]
    min_step_seconds: Option<f64>,

    /// Append phase velocities to the feature vector
    #[arg(long, default_value_t = false)]
    velocity: bool,

    /// Print the report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Write the step embedding as a JSON array of rows
    #[arg(long)]
    embedding_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = build_config(&args)?;
    let trial = load_trial(&args.input)
        .with_context(|| format!("failed to load trial {}", args.input.display()))?;

    let report = GaitPipeline::prepare(config, trial)
        .context("trial does not fit the configuration")?
        .run()
        .context("gait analysis failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }

    if let Some(path) = &args.embedding_out {
        let coordinates = report.embedding_coordinates().unwrap_or_default();
        fs::write(path, serde_json::to_string(coordinates)?)
            .with_context(|| format!("failed to write embedding {}", path.display()))?;
        info!("wrote {} embedding rows to {}", coordinates.len(), path.display());
    }
    Ok(())
}

fn build_config(args: &Args) -> Result<GaitConfig> {
    let mut config = match &args.config {
        Some(path) => GaitConfig::from_json_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => GaitConfig::walking(),
    };
    if let Some(side) = args.side {
        config = mirror_joints(config.with_side(side), side);
    }
    if args.use_3d {
        config = config.with_space(CoordinateSpace::World3D);
    }
    if let Some(window) = args.smooth_window {
        config = config.with_smoothing_window(window);
    }
    if let Some(seconds) = args.min_step_seconds {
        config = config.with_min_step_seconds(seconds);
    }
    if args.velocity {
        config = config.with_velocity(true);
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Rename joints of the opposite side to `side`, e.g. `left_knee` → `right_knee`.
fn mirror_joints(config: GaitConfig, side: Side) -> GaitConfig {
    let other = match side {
        Side::Left => Side::Right,
        Side::Right => Side::Left,
    };
    let from = format!("{}_", other.prefix());
    let to = format!("{}_", side.prefix());
    let joints: Vec<String> = config
        .joints
        .iter()
        .map(|joint| match joint.strip_prefix(&from) {
            Some(rest) => format!("{to}{rest}"),
            None => joint.clone(),
        })
        .collect();
    config.with_joints(joints)
}
