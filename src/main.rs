//! Rigdrive - headless drive loop host
//!
//! Runs the drive loop on a frame ticker against an in-memory model, speaks
//! text through the simulated synthesizer and logs what the avatar does.

use clap::Parser;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rigdrive::{
    avatar::{ParameterSet, SpeechPhase},
    config::{Config, LipSyncStrategy},
    input::ModelLayout,
    random,
    runtime::{FrameCounter, HeadlessModel},
    speech::{Narrator, SimulatedSynth, Voice},
    DriveLoop,
};

/// Rigdrive - drive a rigged 2D character from pointer and speech input
#[derive(Parser, Debug)]
#[command(name = "rigdrive", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Text to speak; repeat to queue more
    #[arg(short, long = "say")]
    say: Vec<String>,

    /// Stop after this many frames
    #[arg(short, long)]
    frames: Option<u64>,

    /// Frame rate (overrides config)
    #[arg(long)]
    fps: Option<u32>,

    /// Lip sync strategy: jitter, word_timing or amplitude (overrides config)
    #[arg(long)]
    strategy: Option<LipSyncStrategy>,

    /// Seed for expression, motion and jitter picks
    #[arg(long)]
    seed: Option<u64>,

    /// Hold a drag at screen position x,y
    #[arg(long)]
    drag: Option<Point>,

    /// Hover the pointer at screen position x,y
    #[arg(long)]
    pointer: Option<Point>,

    /// Expression to show before the first frame
    #[arg(short, long)]
    expression: Option<String>,

    /// Start the next queued utterance after this many ms instead of waiting
    #[arg(long)]
    interrupt_ms: Option<u64>,

    /// Print the final parameter table as JSON
    #[arg(long)]
    dump: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Screen position given as `x,y`
#[derive(Debug, Clone, Copy)]
struct Point {
    x: f32,
    y: f32,
}

impl FromStr for Point {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected x,y but got '{}'", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f32>()
                .map_err(|e| format!("invalid coordinate '{}': {}", v, e))
        };
        Ok(Self {
            x: parse(x)?,
            y: parse(y)?,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", rigdrive::NAME, rigdrive::VERSION);

    // Load configuration
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if let Some(fps) = args.fps {
        config.frame.fps = fps;
    }
    if let Some(strategy) = args.strategy {
        config.lipsync.strategy = strategy;
    }

    config.validate()?;

    info!("Frame rate: {} fps", config.frame.fps);
    info!("Lip sync: {:?}, release: {:?}", config.lipsync.strategy, config.lipsync.release);
    info!("Expressions: {:?}", config.expression.mode);

    let runtime = tokio::runtime::Runtime::new()?;
    let parameters = runtime.block_on(run(&args, config))?;

    if args.dump {
        println!("{}", serde_json::to_string_pretty(&parameters)?);
    }

    info!("Rigdrive stopped");
    Ok(())
}

/// Drive the loop until the frame limit, the end of the speech queue, or a
/// shutdown signal. Returns the last published parameter set.
async fn run(args: &Args, config: Config) -> anyhow::Result<ParameterSet> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let synth = SimulatedSynth::new(events_tx, config.lipsync.word_ms).with_voices(demo_voices());
    let mut narrator = Narrator::new(synth, &config.speech);

    let model = demo_model(&config);
    let rng = random::seeded(args.seed);
    let amplitude = config.lipsync.strategy == LipSyncStrategy::Amplitude;
    let frame_period = Duration::from_secs_f64(1.0 / f64::from(config.frame.fps));
    let interrupt_after = args.interrupt_ms.map(Duration::from_millis);

    let mut drive = DriveLoop::new(config, Some(model), FrameCounter::default(), Box::new(rng));

    if let Some(ref expression) = args.expression {
        if let Err(e) = drive.set_expression(expression) {
            warn!("Could not show expression {}: {}", expression, e);
        }
    }
    if let Some(p) = args.pointer {
        drive.on_pointer_move(p.x, p.y);
    }
    if let Some(p) = args.drag {
        if let Some(target) = drive.on_pointer_down(p.x, p.y) {
            info!("Drag started on {:?}", target);
        }
    }

    let mut queue: VecDeque<String> = args.say.iter().cloned().collect();
    let mut spoke_at: Option<Duration> = None;
    let mut caption = String::new();

    let mut ticker = tokio::time::interval(frame_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            now = ticker.tick() => {
                let dt = now.saturating_duration_since(last);
                last = now;

                if amplitude && drive.phase() == SpeechPhase::Speaking {
                    drive.feed_audio(&synthetic_voice(drive.clock(), dt));
                }
                drive.tick(dt);

                if let Some(text) = drive.caption() {
                    if text != caption {
                        info!("Caption: {}", text);
                        caption = text;
                    }
                }

                let due = match (spoke_at, interrupt_after) {
                    (None, _) => true,
                    (Some(at), Some(after)) => drive.clock().saturating_sub(at) >= after,
                    (Some(_), None) => !drive.is_speech_busy(),
                };
                if due {
                    if let Some(text) = queue.pop_front() {
                        match drive.speak(&mut narrator, &text) {
                            Ok(id) => debug!("Queued {} ({} left)", id, queue.len()),
                            Err(e) => error!("Failed to speak: {}", e),
                        }
                        spoke_at = Some(drive.clock());
                        caption.clear();
                    }
                }

                if let Some(limit) = args.frames {
                    if drive.frames() >= limit {
                        info!("Frame limit reached");
                        break;
                    }
                } else if !args.say.is_empty() && queue.is_empty() && !drive.is_speech_busy() {
                    // Let the mouth settle before stopping.
                    if drive.speech().mouth_openness() == 0.0 {
                        info!("Nothing left to say");
                        break;
                    }
                }
            }
            Some(event) = events_rx.recv() => {
                drive.on_speech_event(event);
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    drive.cancel_speech(&mut narrator);
    if let Some(model) = drive.model() {
        info!(
            "Ran {} frames over {:?}, model updated {} times",
            drive.frames(),
            drive.clock(),
            model.updates()
        );
    } else {
        warn!("Ran {} frames without a model", drive.frames());
    }
    debug!("Render requests: {}", drive.host().frames());

    Ok(drive.parameters().clone())
}

fn demo_voices() -> Vec<Voice> {
    let mut default = Voice::new("Simulated English", "en-US");
    default.default = true;
    vec![
        default,
        Voice::new("Simulated English Female", "en-GB"),
        Voice::new("Simulated English Male", "en-AU"),
    ]
}

/// In-memory model with a head hit area over the top of the figure and a
/// body hit area below it
fn demo_model(config: &Config) -> HeadlessModel {
    let [width, height] = config.placement.model_size;
    let layout = ModelLayout::resolve(&config.placement, &config.viewport, [width, height]);
    let [w, h] = layout.size;
    let left = layout.center[0] - w * 0.5;
    let top = layout.center[1] - h * 0.5;

    HeadlessModel::new()
        .with_size(width, height)
        .with_expressions(&["neutral", "happy", "sad", "surprised"])
        .with_motions(&config.interaction.tap_motion_group, 3)
        .with_hit_area(&config.interaction.head_area, [left + w * 0.25, top, w * 0.5, h * 0.3])
        .with_hit_area(&config.interaction.body_area, [left, top + h * 0.3, w, h * 0.7])
}

/// Stand-in for played-back speech audio: a voiced tone whose loudness
/// pulses at a syllable-like rate
fn synthetic_voice(clock: Duration, dt: Duration) -> Vec<f32> {
    const SAMPLE_RATE: f32 = 16_000.0;
    const PITCH_HZ: f32 = 180.0;
    const SYLLABLE_HZ: f32 = 4.0;

    let start = clock.as_secs_f32();
    let count = ((dt.as_secs_f32() * SAMPLE_RATE) as usize).max(1);
    (0..count)
        .map(|i| {
            let t = start + i as f32 / SAMPLE_RATE;
            let envelope = 0.5 + 0.5 * (std::f32::consts::TAU * SYLLABLE_HZ * t).sin();
            0.3 * envelope * (std::f32::consts::TAU * PITCH_HZ * t).sin()
        })
        .collect()
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
