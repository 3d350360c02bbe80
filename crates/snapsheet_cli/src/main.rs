//! Snapsheet CLI
//!
//! Headless tooling for the bottom sheet motion core:
//! - `init`: write a default `snapsheet.toml` and a sample trace
//! - `replay`: drive a sheet from a JSON input trace and print every frame
//! - `spring`: print a spring trajectory between two values

mod config;
mod project;
mod replay;
mod trajectory;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::SnapsheetConfig;
use crate::replay::{Replayer, Trace};

#[derive(Parser, Debug)]
#[command(name = "snapsheet")]
#[command(about = "Replay input traces against a headless bottom sheet")]
#[command(version)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default snapsheet.toml and a sample trace
    Init {
        /// Target directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Container height written into the config
        #[arg(long, default_value_t = 800.0)]
        height: f32,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Replay a JSON input trace and print rendered frames
    Replay {
        /// Trace file
        trace: PathBuf,

        /// Config file or directory (defaults to ./snapsheet.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Frame interval in milliseconds
        #[arg(long)]
        frame_ms: Option<f64>,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Print the trajectory of a spring between two values
    Spring {
        #[arg(long, allow_negative_numbers = true)]
        from: f32,

        #[arg(long, allow_negative_numbers = true)]
        to: f32,

        #[arg(long)]
        tension: Option<f32>,

        #[arg(long)]
        friction: Option<f32>,

        #[arg(long)]
        precision: Option<f32>,

        /// Config file or directory providing the base spring
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Frame interval in milliseconds
        #[arg(long)]
        frame_ms: Option<f64>,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init {
            path,
            height,
            force,
        } => cmd_init(path, height, force),
        Commands::Replay {
            trace,
            config,
            frame_ms,
            json,
        } => cmd_replay(trace, config, frame_ms, json),
        Commands::Spring {
            from,
            to,
            tension,
            friction,
            precision,
            config,
            frame_ms,
            json,
        } => cmd_spring(
            from,
            to,
            SpringOverrides {
                tension,
                friction,
                precision,
            },
            config,
            frame_ms,
            json,
        ),
    }
}

fn cmd_init(path: PathBuf, height: f32, force: bool) -> Result<()> {
    if !(height.is_finite() && height >= 0.0) {
        anyhow::bail!("--height must be a non-negative number, got {height}");
    }
    project::init_project(&path, height, force)?;
    println!("Wrote {}", path.join(config::CONFIG_FILE).display());
    println!("Try: snapsheet replay {}", path.join(project::SAMPLE_TRACE).display());
    Ok(())
}

fn cmd_replay(
    trace_path: PathBuf,
    config_path: Option<PathBuf>,
    frame_ms: Option<f64>,
    json: bool,
) -> Result<()> {
    let mut config = SnapsheetConfig::resolve(config_path.as_deref())?;
    if let Some(frame_ms) = frame_ms {
        config.replay.frame_ms = frame_ms;
    }
    let trace = Trace::load(&trace_path)?;
    let sheet_config = trace.sheet_config(config.sheet);

    tracing::info!(
        "Replaying {} ({} steps, container {}px)",
        trace_path.display(),
        trace.steps.len(),
        sheet_config.container_height
    );

    let mut replayer = Replayer::new(sheet_config, config.replay)?;
    let outcome = replayer.run(&trace);
    // Print what was observed even if a step failed
    for event in replayer.take_events() {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{event}");
        }
    }
    outcome?;

    let sheet = replayer.sheet();
    tracing::info!(
        "Finished at {:.1}ms: {} (offset {:.2}, progress {:.3})",
        replayer.now(),
        sheet.snap_point(),
        sheet.offset(),
        sheet.progress()
    );
    Ok(())
}

struct SpringOverrides {
    tension: Option<f32>,
    friction: Option<f32>,
    precision: Option<f32>,
}

fn cmd_spring(
    from: f32,
    to: f32,
    overrides: SpringOverrides,
    config_path: Option<PathBuf>,
    frame_ms: Option<f64>,
    json: bool,
) -> Result<()> {
    let config = SnapsheetConfig::resolve(config_path.as_deref())?;
    let mut spring = config.sheet.spring;
    spring.tension = overrides.tension.unwrap_or(spring.tension);
    spring.friction = overrides.friction.unwrap_or(spring.friction);
    spring.precision = overrides.precision.unwrap_or(spring.precision);

    let samples = trajectory::trajectory(
        from,
        to,
        spring,
        frame_ms.unwrap_or(config.replay.frame_ms),
        config.replay.max_frames,
    )
    .context("Failed to compute trajectory")?;

    for sample in &samples {
        if json {
            println!("{}", serde_json::to_string(sample)?);
        } else {
            println!("{sample}");
        }
    }
    tracing::info!(
        "{} samples, damping ratio {:.3}",
        samples.len(),
        spring.damping_ratio()
    );
    Ok(())
}
