use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write, stderr, stdout},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use fern::Dispatch;
use log::{LevelFilter, info};
use tracker::{CentroidTracker, TrackerConfig};

use crate::frames::{FrameOutput, parse_frame};

mod frames;

/// Replays recorded detections through a centroid tracker, printing one JSON line of tracks per
/// frame.
#[derive(Parser, Debug)]
#[command(name = "replay", version)]
struct Args {
    /// JSON lines file with one array of `[x1, y1, x2, y2]` boxes per frame.
    detections: PathBuf,
    /// JSON tracker configuration. Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also appends logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Logs every match.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    log_panics::init();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => TrackerConfig::default(),
    };
    let mut tracker = CentroidTracker::new(config).context("invalid tracker configuration")?;
    let file = File::open(&args.detections)
        .with_context(|| format!("unable to open {}", args.detections.display()))?;

    let mut out = BufWriter::new(stdout().lock());
    let mut frame = 0;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let detections = parse_frame(&line).with_context(|| format!("frame {frame}"))?;
        let tracks = tracker
            .update(&detections)
            .with_context(|| format!("frame {frame}"))?;
        serde_json::to_writer(
            &mut out,
            &FrameOutput {
                frame,
                tracks: &tracks,
            },
        )?;
        writeln!(out)?;
        frame += 1;
    }
    out.flush()?;

    info!(
        target: "replay",
        "replayed {frame} frames with {} live tracks, {} registered in total",
        tracker.len(),
        tracker.next_id() - tracker.config().first_id
    );
    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    let level = if args.verbose {
        LevelFilter::Trace
    } else if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut dispatch = Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(stderr());
    if let Some(path) = &args.log_file {
        dispatch = dispatch.chain(
            fern::log_file(path)
                .with_context(|| format!("unable to open log file {}", path.display()))?,
        );
    }
    dispatch.apply()?;

    Ok(())
}

fn load_config(path: &Path) -> Result<TrackerConfig> {
    let file =
        File::open(path).with_context(|| format!("unable to open config {}", path.display()))?;
    let config = serde_json::from_reader::<_, TrackerConfig>(BufReader::new(file))
        .with_context(|| format!("unable to parse config {}", path.display()))?;
    info!(target: "replay", "loaded {config:?}");

    Ok(config)
}
