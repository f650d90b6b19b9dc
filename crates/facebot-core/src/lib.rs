//! facebot-core — Identity registry and recognition matching.
//!
//! Face encodings are reduced to SHA-256 protected references before they
//! are stored or compared; the registry, matcher and persisted record only
//! ever see those references.

pub mod config;
pub mod matcher;
pub mod protect;
pub mod registry;
pub mod store;
pub mod types;

pub use config::{Config, ConfigError};
pub use matcher::{best_match, DigestMatcher, Matcher};
pub use protect::{protect, EncodingError};
pub use registry::{EncodingLoader, IdentityRegistry, IdentitySource, LoadError, RegistryLoadError};
pub use types::{Action, Encoding, MatchResult, ProtectedReference};
