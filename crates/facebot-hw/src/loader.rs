//! Reference encoding files.
//!
//! An encoding file is a JSON array of numbers, one per dimension.

use facebot_core::protect::check_dim;
use facebot_core::{Encoding, EncodingLoader, LoadError};
use std::path::Path;

/// Read and dimension-check one encoding file.
pub fn read_encoding_file(path: &Path, dim: usize) -> Result<Encoding, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let values: Vec<f64> = serde_json::from_str(&text).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let encoding = Encoding::new(values);
    check_dim(&encoding, dim)?;
    Ok(encoding)
}

/// Loads reference encodings from JSON files on disk.
pub struct FileEncodingLoader {
    dim: usize,
}

impl FileEncodingLoader {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EncodingLoader for FileEncodingLoader {
    fn load(&mut self, source: &Path) -> Result<Encoding, LoadError> {
        tracing::debug!(path = %source.display(), "loading reference encoding");
        read_encoding_file(source, self.dim)
    }
}
