//! Probe-to-registry matching.

use crate::protect::{protect, EncodingError};
use crate::registry::IdentityRegistry;
use crate::types::{Encoding, MatchResult, ProtectedReference};

/// Strategy for comparing a probe encoding against the identity registry.
pub trait Matcher {
    fn compare(
        &self,
        probe: &Encoding,
        registry: &IdentityRegistry,
        threshold: f32,
    ) -> Result<MatchResult, EncodingError>;
}

/// Matcher over protected references.
///
/// Identical digests score 1.0. Any other pair falls back to
/// [`digest_similarity`], a weak placeholder: hex positions agreeing between
/// two SHA-256 digests say nothing about how close the faces are. Real
/// closeness must be computed on raw encodings before protection, by a
/// different `Matcher`.
///
/// Always visits every registry entry, with no early exit on a perfect hit.
pub struct DigestMatcher;

impl Matcher for DigestMatcher {
    fn compare(
        &self,
        probe: &Encoding,
        registry: &IdentityRegistry,
        threshold: f32,
    ) -> Result<MatchResult, EncodingError> {
        let probe_ref = protect(probe)?;

        let mut best_score = 0.0f32;
        let mut best_name: Option<&str> = None;

        for (name, reference) in registry.lookup_all() {
            let score = if probe_ref == *reference {
                1.0
            } else {
                digest_similarity(&probe_ref, reference)
            };
            // Strictly greater: ties keep the earlier registration.
            if best_name.is_none() || score > best_score {
                best_score = score;
                best_name = Some(name);
            }
        }

        match best_name {
            Some(name) if best_score > threshold => Ok(MatchResult {
                matched: true,
                identity: Some(name.to_string()),
                score: best_score,
            }),
            _ => Ok(MatchResult::no_match()),
        }
    }
}

/// Find the best identity for `probe` using the digest matcher.
pub fn best_match(
    probe: &Encoding,
    registry: &IdentityRegistry,
    threshold: f32,
) -> Result<MatchResult, EncodingError> {
    DigestMatcher.compare(probe, registry, threshold)
}

/// Fraction of positions at which two hex digests carry the same character.
pub fn digest_similarity(a: &ProtectedReference, b: &ProtectedReference) -> f32 {
    let len = a.len().max(b.len());
    if len == 0 {
        return 0.0;
    }
    let same = a
        .as_str()
        .bytes()
        .zip(b.as_str().bytes())
        .filter(|(x, y)| x == y)
        .count();
    same as f32 / len as f32
}
