//! Robot configuration, loaded from a TOML file with `FACEBOT_*`
//! environment overrides.

use crate::registry::IdentitySource;
use crate::types::{Action, DEFAULT_ENCODING_DIM};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Robot configuration. Constant for the lifetime of a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub robot_name: String,
    /// Match confidence that must be strictly exceeded, in (0, 1].
    pub threshold: f32,
    /// Dimensionality of face encodings.
    pub encoding_dim: usize,
    /// Pause between recognition cycles, in milliseconds.
    pub cycle_delay_ms: u64,
    /// How long an action is held before the motors stop, in milliseconds.
    pub action_duration_ms: u64,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub display: DisplayConfig,
    pub motors: MotorConfig,
    pub camera: CameraConfig,
    pub buttons: ButtonConfig,
    #[serde(rename = "identity")]
    pub identities: Vec<IdentityConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// LED brightness, 0..=9.
    pub brightness: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    pub forward_speed: u16,
    pub turn_speed: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    /// Encoding file replayed for every detected face instead of a random one.
    pub probe: Option<PathBuf>,
}

/// sysfs GPIO `value` files for the two stop buttons.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub a: Option<PathBuf>,
    pub b: Option<PathBuf>,
}

/// One known person: where their reference encoding lives, and what the
/// robot shows and does on recognizing them.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub name: String,
    pub source: PathBuf,
    pub digit: Option<u8>,
    pub action: Option<Action>,
}

impl Default for Config {
    fn default() -> Self {
        let identity = |name: &str, file: &str, digit, action| IdentityConfig {
            name: name.into(),
            source: PathBuf::from("data/faces").join(file),
            digit: Some(digit),
            action: Some(action),
        };

        Self {
            robot_name: "FaceBot v1.0".into(),
            threshold: 0.70,
            encoding_dim: DEFAULT_ENCODING_DIM,
            cycle_delay_ms: 500,
            action_duration_ms: 300,
            log_level: "info".into(),
            display: DisplayConfig::default(),
            motors: MotorConfig::default(),
            camera: CameraConfig::default(),
            buttons: ButtonConfig::default(),
            identities: vec![
                identity("Alice", "alice_face.json", 1, Action::Forward),
                identity("Bob", "bob_face.json", 2, Action::TurnRight),
                identity("Charlie", "charlie_face.json", 3, Action::TurnLeft),
            ],
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { brightness: 7 }
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            forward_speed: 512,
            turn_speed: 300,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            probe: None,
        }
    }
}

impl Config {
    /// Load from `path` (defaults when `None`), apply environment overrides,
    /// then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `FACEBOT_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env_parse(&lookup, "FACEBOT_THRESHOLD") {
            self.threshold = v;
        }
        if let Some(v) = env_parse(&lookup, "FACEBOT_ENCODING_DIM") {
            self.encoding_dim = v;
        }
        if let Some(v) = env_parse(&lookup, "FACEBOT_CYCLE_DELAY_MS") {
            self.cycle_delay_ms = v;
        }
        if let Some(v) = env_parse(&lookup, "FACEBOT_ACTION_DURATION_MS") {
            self.action_duration_ms = v;
        }
        if let Some(v) = lookup("FACEBOT_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = lookup("FACEBOT_PROBE") {
            self.camera.probe = Some(PathBuf::from(v));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        if self.encoding_dim == 0 {
            return Err(ConfigError::Invalid("encoding_dim must be positive".into()));
        }
        if self.display.brightness > 9 {
            return Err(ConfigError::Invalid(format!(
                "display brightness must be 0..=9, got {}",
                self.display.brightness
            )));
        }
        for identity in &self.identities {
            if let Some(digit) = identity.digit.filter(|d| *d > 9) {
                return Err(ConfigError::Invalid(format!(
                    "digit for {} must be 0..=9, got {digit}",
                    identity.name
                )));
            }
        }
        Ok(())
    }

    /// Ordered name → reference-source bindings for registry load.
    pub fn identity_sources(&self) -> Vec<IdentitySource> {
        self.identities
            .iter()
            .map(|i| IdentitySource {
                name: i.name.clone(),
                source: i.source.clone(),
            })
            .collect()
    }

    /// Digit shown for `name`; unmapped names show 0.
    pub fn digit_for(&self, name: &str) -> u8 {
        self.identity(name).and_then(|i| i.digit).unwrap_or(0)
    }

    /// Action performed for `name`; unmapped names stop.
    pub fn action_for(&self, name: &str) -> Action {
        self.identity(name)
            .and_then(|i| i.action)
            .unwrap_or_default()
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }

    pub fn action_duration(&self) -> Duration {
        Duration::from_millis(self.action_duration_ms)
    }

    fn identity(&self, name: &str) -> Option<&IdentityConfig> {
        self.identities.iter().find(|i| i.name == name)
    }
}

fn env_parse<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.parse().ok())
}
