use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, warn, Level};

use stack_compositor::{
    accel::SoftwareAccelerator,
    config::StackConfig,
    filter::{CollectSink, StackFilter, StackVariant, StepStatus},
    sync::SyntheticSource,
    video::FrameRate,
};

/// Base colours handed out to the synthetic inputs in turn
const PALETTE: [[u8; 3]; 6] = [
    [81, 90, 240],
    [145, 54, 34],
    [41, 240, 110],
    [210, 16, 146],
    [170, 166, 16],
    [106, 202, 222],
];

/// Consecutive idle steps tolerated before giving up on the inputs
const MAX_IDLE_STEPS: u32 = 10_000;

#[derive(Parser)]
#[command(
    name = "stack-compositor",
    version,
    about = "Stack synthetic video streams side by side or on top of each other",
    long_about = "Runs N synthetic test-pattern streams through an hstack/vstack filter on the CPU reference accelerator and reports what came out."
)]
struct Cli {
    /// Filter to run (hstack_accel, vstack_accel)
    #[arg(short, long, default_value = "hstack_accel")]
    filter: String,

    /// Number of inputs (overrides the configuration file)
    #[arg(short, long)]
    inputs: Option<usize>,

    /// Stop at the first input that ends
    #[arg(short, long)]
    shortest: bool,

    /// Frames produced by the first input; each further input produces 10 more
    #[arg(long, default_value_t = 100)]
    frames: u64,

    /// Width of every input
    #[arg(long, default_value_t = 320)]
    width: u32,

    /// Height of every input
    #[arg(long, default_value_t = 240)]
    height: u32,

    /// Probability that an input stalls or skips a frame
    #[arg(long, default_value_t = 0.0)]
    gap_probability: f64,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Save the last output frame as PNG
    #[arg(short, long)]
    dump: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("Starting Stack-Compositor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            StackConfig::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            StackConfig::default()
        }
    };
    if let Some(inputs) = cli.inputs {
        config.inputs = inputs;
    }
    config.shortest |= cli.shortest;

    let variant = StackVariant::from_name(&cli.filter)?;
    let inputs = config.inputs;
    let mut filter = StackFilter::open(config, variant, Box::new(SoftwareAccelerator::new()))?;

    for index in 0..inputs {
        let frames = cli.frames + 10 * index as u64;
        let source = SyntheticSource::new(cli.width, cli.height, FrameRate::FPS_25, frames)
            .with_color(PALETTE[index % PALETTE.len()])
            .with_gaps(cli.gap_probability, index as u64 + 1);
        filter.attach_input(index, Box::new(source))?;
    }

    let canvas = filter.configure_output()?;
    info!(
        "Output canvas {}x{} {} at {}",
        canvas.width, canvas.height, canvas.format, canvas.time_base
    );

    let started = Instant::now();
    let mut sink = CollectSink::new();
    let mut idle = 0;
    loop {
        match filter.step(&mut sink) {
            Ok(StepStatus::Drained) => break,
            Ok(StepStatus::NotReady) => {
                idle += 1;
                if idle > MAX_IDLE_STEPS {
                    bail!("inputs stopped delivering frames");
                }
            }
            Ok(_) => idle = 0,
            Err(err) => bail!(err.user_message()),
        }
    }

    let stats = filter.stats();
    let session = filter.session().stats();
    info!(
        "Produced {} frames ({} dropped, {} accelerator jobs) in {:.2?}",
        stats.frames_emitted,
        stats.frames_dropped,
        session.jobs_completed,
        started.elapsed()
    );
    if let (Some(first), Some(last)) = (sink.frames().first(), sink.frames().last()) {
        info!("Output pts range {:?}..={:?}", first.pts(), last.pts());
    }

    if let Some(path) = &cli.dump {
        match sink.frames().last() {
            Some(frame) => match frame.save_png(path) {
                Ok(()) => info!("Last frame saved to: {:?}", path),
                Err(err) if !err.is_fatal() => warn!("Could not save {:?}: {}", path, err),
                Err(err) => return Err(err.into()),
            },
            None => info!("No output frame to save"),
        }
    }

    filter.close();
    Ok(())
}
