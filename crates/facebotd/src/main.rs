use anyhow::{Context, Result};
use clap::Parser;
use facebot_core::{Config, IdentityRegistry};
use facebot_hw::{
    read_encoding_file, DifferentialDrive, FileEncodingLoader, GpioButtons, LedMatrix,
    ScriptedButtons, SimulatedCamera, StopSignal,
};
use facebotd::engine::{CycleSettings, DecisionCore};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Pause between startup animation frames and after check/cross glyphs.
const MATRIX_FRAME_HOLD: Duration = Duration::from_millis(300);

#[derive(Parser)]
#[command(name = "facebotd", about = "FaceBot recognition daemon")]
struct Args {
    /// Path to the TOML configuration (default: $FACEBOT_CONFIG, then built-in defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Stop after this many cycles when no GPIO stop buttons are configured
    #[arg(long)]
    cycles: Option<usize>,
    /// Seed for simulated face encodings
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args
        .config
        .or_else(|| std::env::var_os("FACEBOT_CONFIG").map(PathBuf::from));
    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    tracing::info!(robot = %config.robot_name, version = env!("CARGO_PKG_VERSION"), "facebotd starting");

    let mut loader = FileEncodingLoader::new(config.encoding_dim);
    let registry = IdentityRegistry::load(&config.identity_sources(), &mut loader);
    if registry.is_empty() {
        tracing::warn!("no identities loaded; every face will show as unknown");
    }

    let mut camera = SimulatedCamera::new(config.camera.width, config.camera.height, config.encoding_dim);
    if let Some(seed) = args.seed {
        camera = camera.with_seed(seed);
    }
    if let Some(probe_path) = &config.camera.probe {
        let probe = read_encoding_file(probe_path, config.encoding_dim)
            .with_context(|| format!("failed to load probe {}", probe_path.display()))?;
        camera = camera.with_probe(probe)?;
        tracing::info!(path = %probe_path.display(), "replaying probe encoding");
    }

    let matrix = LedMatrix::new(std::io::stdout(), config.display.brightness)
        .with_frame_hold(MATRIX_FRAME_HOLD);
    let motors = DifferentialDrive::new(config.motors.forward_speed, config.motors.turn_speed);
    let stop = stop_signal(&config, args.cycles);

    let mut core = DecisionCore::new(
        registry,
        CycleSettings::from_config(&config),
        camera,
        matrix,
        motors,
        stop,
    );

    let summary = core.run().context("recognition loop aborted")?;
    tracing::info!(cycles = summary.cycles, "facebotd exiting");
    Ok(())
}

fn stop_signal(config: &Config, cycles: Option<usize>) -> Box<dyn StopSignal> {
    match (&config.buttons.a, &config.buttons.b) {
        (Some(a), Some(b)) => {
            tracing::info!(a = %a.display(), b = %b.display(), "stop buttons on GPIO");
            Box::new(GpioButtons::new(a.clone(), b.clone()))
        }
        _ => match cycles {
            Some(n) => {
                tracing::info!(cycles = n, "no stop buttons configured; bounded run");
                Box::new(ScriptedButtons::pressed_after(n))
            }
            None => {
                tracing::warn!("no stop buttons configured; running until interrupted");
                Box::new(ScriptedButtons::released())
            }
        },
    }
}
