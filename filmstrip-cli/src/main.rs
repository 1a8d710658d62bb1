//! Filmstrip CLI Tool
//!
//! Command-line interface for probing videos and rendering thumbnail strips.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use filmstrip_core::{
    PositionTimeMapper, RationalTime, StripGeometry, VideoAsset, ViewportState,
};
use filmstrip_engine::{NoLayoutHost, StripCanvas, StripConfig, ThumbnailStrip};
use filmstrip_ffmpeg::{probe_asset, FfmpegFrameExtractor};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "filmstrip")]
#[command(about = "Filmstrip - Scrollable video thumbnail strips")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show duration, size and orientation of a video file
    Probe {
        /// Input video file path
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a thumbnail strip to an image file
    Render {
        /// Input video file path
        input: PathBuf,

        /// Output image path (PNG)
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        viewport: ViewportArgs,

        /// Device pixels per point
        #[arg(long, default_value = "1.0")]
        scale: f64,

        /// Seconds to wait for extraction before saving what is ready
        #[arg(long, default_value = "120")]
        timeout: u64,
    },

    /// Map between strip position and video time
    Map {
        /// Input video file path
        input: PathBuf,

        #[command(flatten)]
        viewport: ViewportArgs,

        /// Horizontal strip position in points
        #[arg(long, conflicts_with = "time", required_unless_present = "time")]
        position: Option<f64>,

        /// Time in seconds
        #[arg(long)]
        time: Option<f64>,
    },
}

#[derive(Args)]
struct ViewportArgs {
    /// Viewport width in points
    #[arg(long, default_value = "300")]
    width: f64,

    /// Viewport height in points
    #[arg(long, default_value = "50")]
    height: f64,

    /// Seconds of video that fit in one viewport width
    #[arg(long, default_value = "15")]
    max_visible: f64,
}

impl ViewportArgs {
    fn viewport(&self, scale: f64) -> Result<ViewportState> {
        let viewport = ViewportState {
            width: self.width,
            height: self.height,
            scale_factor: scale,
            max_visible_duration: self.max_visible,
        };
        if !viewport.has_bounds() {
            bail!("Viewport must have positive width and height");
        }
        if !(viewport.max_visible_duration.is_finite() && viewport.max_visible_duration > 0.0) {
            bail!("--max-visible must be a positive number of seconds");
        }
        if !(scale.is_finite() && scale > 0.0) {
            bail!("--scale must be positive");
        }
        Ok(viewport)
    }
}

#[derive(Serialize)]
struct ProbeReport<'a> {
    asset: &'a VideoAsset,
    duration_seconds: f64,
    rotation_quarter_turns: u8,
}

#[derive(Serialize)]
struct MapReport {
    strip_width: f64,
    position: Option<f64>,
    time: Option<RationalTime>,
    seconds: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::Probe { input, json } => probe_video(&input, json)?,

        Commands::Render {
            input,
            output,
            viewport,
            scale,
            timeout,
        } => render_strip(&input, &output, &viewport, scale, timeout)?,

        Commands::Map {
            input,
            viewport,
            position,
            time,
        } => map_position(&input, &viewport, position, time)?,
    }

    Ok(())
}

fn open_asset(input: &Path) -> Result<VideoAsset> {
    probe_asset(input).with_context(|| format!("Failed to open video file {}", input.display()))
}

fn probe_video(input: &Path, json: bool) -> Result<()> {
    let asset = open_asset(input)?;
    let quarter_turns = asset
        .first_video_track()
        .map_or(0, |track| track.preferred_transform.quarter_turns());

    if json {
        let report = ProbeReport {
            asset: &asset,
            duration_seconds: asset.duration.seconds(),
            rotation_quarter_turns: quarter_turns,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n=== Video Information ===");
    println!("Source: {}", asset.source().display());
    println!(
        "Duration: {} ({:.3} seconds)",
        asset.duration,
        asset.duration.seconds()
    );
    match asset.first_video_track() {
        Some(track) => {
            println!(
                "Natural size: {}x{}",
                track.natural_size.width, track.natural_size.height
            );
            println!("Rotation: {} degrees", u32::from(quarter_turns) * 90);
        }
        None => println!("No video track"),
    }

    Ok(())
}

fn render_strip(
    input: &Path,
    output: &Path,
    viewport: &ViewportArgs,
    scale: f64,
    timeout: u64,
) -> Result<()> {
    let bounds = viewport.viewport(scale)?;
    let asset = open_asset(input)?;

    info!(input = %input.display(), "rendering strip");

    let config = StripConfig {
        max_visible_duration: bounds.max_visible_duration,
        scale_factor: bounds.scale_factor,
    };
    let mut strip = ThumbnailStrip::new(
        FfmpegFrameExtractor::new(),
        StripCanvas::new(bounds.scale_factor),
        NoLayoutHost,
        config,
    );
    strip.layout_pass_completed(bounds.width, bounds.height);
    strip.set_asset(asset);

    let geometry = strip
        .geometry()
        .cloned()
        .context("Video has no usable video track")?;
    println!(
        "Strip: {} tiles of {:.1}x{:.1} points, {:.1} points wide",
        geometry.tile_count, geometry.tile_size.width, geometry.tile_size.height, geometry.strip_width
    );

    if !strip.wait_for_completion(Duration::from_secs(timeout)) {
        warn!("extraction did not finish in time; saving partial strip");
    }
    println!(
        "Filled {} / {} tiles",
        strip.tiles().filled(),
        strip.tiles().len()
    );

    strip
        .presenter()
        .image()
        .save(output)
        .context("Failed to save strip image")?;
    strip.teardown();

    println!("Saved strip to {}", output.display());

    Ok(())
}

fn map_position(
    input: &Path,
    viewport: &ViewportArgs,
    position: Option<f64>,
    time: Option<f64>,
) -> Result<()> {
    let asset = open_asset(input)?;
    let geometry = StripGeometry::compute(&asset, &viewport.viewport(1.0)?)
        .context("Failed to compute strip geometry")?;
    let mapper = PositionTimeMapper::new(geometry.strip_width, Some(asset.duration));

    let report = match (position, time) {
        (Some(position), _) => {
            let time = mapper.time_for_position(position);
            MapReport {
                strip_width: geometry.strip_width,
                position: Some(position),
                time,
                seconds: time.map(|t| t.seconds()),
            }
        }
        (None, Some(seconds)) => {
            if !seconds.is_finite() {
                bail!("Time must be a finite number of seconds");
            }
            let time = RationalTime::from_seconds(seconds, asset.duration.timescale);
            MapReport {
                strip_width: geometry.strip_width,
                position: mapper.position_for_time(time),
                time: Some(time),
                seconds: Some(seconds),
            }
        }
        (None, None) => bail!("Either --position or --time is required"),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
