//! Registry of known identities, holding only protected references.

use crate::protect::{protect, EncodingError};
use crate::types::{Encoding, ProtectedReference};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("reference source not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("unusable encoding: {0}")]
    Encoding(#[from] EncodingError),
}

/// Why one identity was left out of the registry.
#[derive(Error, Debug)]
#[error("identity {name} not registered: {source}")]
pub struct RegistryLoadError {
    pub name: String,
    #[source]
    pub source: LoadError,
}

/// Produces the reference encoding for an identity from its configured source.
pub trait EncodingLoader {
    fn load(&mut self, source: &Path) -> Result<Encoding, LoadError>;
}

/// A configured name → reference-source binding.
#[derive(Debug, Clone)]
pub struct IdentitySource {
    pub name: String,
    pub source: PathBuf,
}

/// A registered identity.
#[derive(Debug, Clone)]
pub struct Identity {
    pub name: String,
    pub reference: ProtectedReference,
}

/// Read-only set of known identities, in registration order.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    identities: Vec<Identity>,
    skipped: Vec<RegistryLoadError>,
}

impl IdentityRegistry {
    /// Load every configured identity through `loader`.
    ///
    /// A source that fails to load or protect is skipped with a warning; the
    /// registry holds whatever loaded successfully. A name seen twice keeps
    /// its first registration.
    pub fn load(sources: &[IdentitySource], loader: &mut dyn EncodingLoader) -> Self {
        let mut registry = Self::default();

        for entry in sources {
            if registry.contains(&entry.name) {
                tracing::warn!(name = %entry.name, "duplicate identity; keeping first registration");
                continue;
            }

            let reference = loader
                .load(&entry.source)
                .and_then(|encoding| protect(&encoding).map_err(LoadError::from));

            match reference {
                Ok(reference) => {
                    tracing::info!(name = %entry.name, "loaded identity");
                    registry.identities.push(Identity {
                        name: entry.name.clone(),
                        reference,
                    });
                }
                Err(source) => {
                    let err = RegistryLoadError {
                        name: entry.name.clone(),
                        source,
                    };
                    tracing::warn!(error = %err, "skipping identity");
                    registry.skipped.push(err);
                }
            }
        }

        tracing::info!(
            loaded = registry.identities.len(),
            skipped = registry.skipped.len(),
            "identity registry ready"
        );
        registry
    }

    /// Build a registry directly from protected references.
    pub fn from_references<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, ProtectedReference)>,
    {
        let mut registry = Self::default();
        for (name, reference) in entries {
            if !registry.contains(&name) {
                registry.identities.push(Identity { name, reference });
            }
        }
        registry
    }

    /// All identities in registration order.
    pub fn lookup_all(&self) -> impl Iterator<Item = (&str, &ProtectedReference)> {
        self.identities
            .iter()
            .map(|i| (i.name.as_str(), &i.reference))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.identities.iter().map(|i| i.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.identities.iter().any(|i| i.name == name)
    }

    /// Identities that failed to load.
    pub fn skipped(&self) -> &[RegistryLoadError] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
