//! One-way protection of face encodings.
//!
//! An encoding is canonicalized to bytes (each component as IEEE-754
//! little-endian `f64`) and digested with SHA-256. Only exact byte identity
//! survives protection; closeness between encodings does not.

use crate::types::{Encoding, ProtectedReference};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("encoding is empty")]
    Empty,
    #[error("encoding component {index} is not finite ({value})")]
    NonFinite { index: usize, value: f64 },
    #[error("encoding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Canonical byte representation of an encoding.
pub fn canonical_bytes(encoding: &Encoding) -> Result<Vec<u8>, EncodingError> {
    if encoding.values.is_empty() {
        return Err(EncodingError::Empty);
    }

    let mut bytes = Vec::with_capacity(encoding.values.len() * 8);
    for (index, &value) in encoding.values.iter().enumerate() {
        if !value.is_finite() {
            return Err(EncodingError::NonFinite { index, value });
        }
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    Ok(bytes)
}

/// Reject encodings whose dimensionality differs from the configured one.
pub fn check_dim(encoding: &Encoding, expected: usize) -> Result<(), EncodingError> {
    if encoding.dim() != expected {
        return Err(EncodingError::DimensionMismatch {
            expected,
            actual: encoding.dim(),
        });
    }
    Ok(())
}

/// Digest an encoding into a [`ProtectedReference`].
pub fn protect(encoding: &Encoding) -> Result<ProtectedReference, EncodingError> {
    let bytes = canonical_bytes(encoding)?;
    let digest = Sha256::digest(&bytes);
    Ok(ProtectedReference::from_digest_hex(hex::encode(digest)))
}
