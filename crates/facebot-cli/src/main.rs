use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facebot_core::store::{self, ProtectedRecord};
use facebot_core::{best_match, protect, Config, IdentityRegistry};
use facebot_hw::{read_encoding_file, FeedbackSink, FileEncodingLoader, Glyph, LedMatrix};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "facebot", about = "FaceBot face registry and recognition tools")]
struct Cli {
    /// Path to the TOML configuration (default: $FACEBOT_CONFIG, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the protected reference of an encoding file
    Protect {
        /// JSON array of encoding values
        file: PathBuf,
    },
    /// Match one probe encoding against the configured identities
    Verify {
        /// JSON array of encoding values
        probe: PathBuf,
    },
    /// List configured identities and whether they loaded
    Identities,
    /// Write the loaded registry to a protected record
    Seal {
        /// Output JSON path
        out: PathBuf,
        /// Extra metadata, as key=value (repeatable)
        #[arg(short, long = "meta")]
        meta: Vec<String>,
    },
    /// Print the privacy report for a protected record
    Report {
        /// Protected record JSON path
        record: PathBuf,
    },
    /// Preview a 25-pixel LED pattern (e.g. "90009:09090:00900:09090:90009")
    Glyph { pattern: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .or_else(|| std::env::var_os("FACEBOT_CONFIG").map(PathBuf::from));
    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Protect { file } => {
            let encoding = read_encoding_file(&file, config.encoding_dim)?;
            println!("{}", protect(&encoding)?);
        }
        Commands::Verify { probe } => verify(&config, &probe)?,
        Commands::Identities => {
            let registry = load_registry(&config);
            for identity in &config.identities {
                let status = if registry.contains(&identity.name) {
                    "loaded"
                } else {
                    "missing"
                };
                println!(
                    "{:<12} digit={} action={:<10} {status}",
                    identity.name,
                    config.digit_for(&identity.name),
                    config.action_for(&identity.name).as_str(),
                );
            }
            for skipped in registry.skipped() {
                eprintln!("{skipped}");
            }
        }
        Commands::Seal { out, meta } => {
            let registry = load_registry(&config);
            let mut record = ProtectedRecord::from_registry(&config.robot_name, &registry);
            for pair in meta {
                let Some((key, value)) = pair.split_once('=') else {
                    bail!("metadata must be key=value, got {pair:?}");
                };
                record.metadata.insert(key.to_string(), value.to_string());
            }
            store::save_record(&record, &out)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "Sealed {} protected references to {}",
                record.references.len(),
                out.display()
            );
        }
        Commands::Report { record } => {
            let record = store::load_record(&record)
                .with_context(|| format!("failed to read {}", record.display()))?;
            let report = store::privacy_report(&record);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Glyph { pattern } => {
            let glyph = Glyph::parse(&pattern)?;
            for row in glyph.render(config.display.brightness) {
                println!("{row}");
            }
        }
    }

    Ok(())
}

fn load_registry(config: &Config) -> IdentityRegistry {
    let mut loader = FileEncodingLoader::new(config.encoding_dim);
    let registry = IdentityRegistry::load(&config.identity_sources(), &mut loader);
    tracing::debug!(
        loaded = registry.len(),
        skipped = registry.skipped().len(),
        "registry loaded for command"
    );
    registry
}

/// One-shot recognition: check mark and digit on a match, cross otherwise.
fn verify(config: &Config, probe: &Path) -> Result<()> {
    let registry = load_registry(config);
    let encoding = read_encoding_file(probe, config.encoding_dim)?;
    let result = best_match(&encoding, &registry, config.threshold)?;

    let mut matrix = LedMatrix::new(std::io::stdout(), config.display.brightness);
    match &result.identity {
        Some(name) if result.matched => {
            matrix.show_success()?;
            matrix.show_digit(config.digit_for(name))?;
        }
        _ => matrix.show_failure()?,
    }

    println!(
        "{}",
        serde_json::json!({
            "matched": result.matched,
            "identity": result.identity,
            "score": result.score,
            "action": result.identity.as_deref().map(|n| config.action_for(n).as_str()),
        })
    );
    Ok(())
}
