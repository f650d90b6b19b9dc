use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default encoding dimensionality produced by the sensing pipeline.
pub const DEFAULT_ENCODING_DIM: usize = 128;

/// Face encoding vector (typically 128-dimensional).
///
/// Raw encodings live only for the duration of a load or a cycle; the
/// registry and the persisted record hold [`ProtectedReference`]s instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    pub values: Vec<f64>,
}

impl Encoding {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }
}

impl From<Vec<f64>> for Encoding {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

/// One-way digest of an [`Encoding`]: lowercase hex SHA-256.
///
/// Constructed only by [`crate::protect::protect`] or by deserializing a
/// previously protected record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtectedReference(String);

impl ProtectedReference {
    pub(crate) fn from_digest_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digest length in hex characters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ProtectedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of matching a probe encoding against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    /// Name of the matched identity (if any).
    pub identity: Option<String>,
    /// Confidence of the match in [0, 1]; 0.0 whenever `matched` is false.
    pub score: f32,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            identity: None,
            score: 0.0,
        }
    }
}

/// Movement the robot performs after recognizing someone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Forward,
    TurnLeft,
    TurnRight,
    #[default]
    Stop,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Forward => "forward",
            Action::TurnLeft => "turn_left",
            Action::TurnRight => "turn_right",
            Action::Stop => "stop",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Action::Forward),
            "turn_left" => Ok(Action::TurnLeft),
            "turn_right" => Ok(Action::TurnRight),
            "stop" => Ok(Action::Stop),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_default_is_stop() {
        assert_eq!(Action::default(), Action::Stop);
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("turn_left".parse::<Action>(), Ok(Action::TurnLeft));
        assert_eq!("forward".parse::<Action>(), Ok(Action::Forward));
        assert!("backward".parse::<Action>().is_err());
    }

    #[test]
    fn test_action_serde_snake_case() {
        let json = serde_json::to_string(&Action::TurnRight).unwrap();
        assert_eq!(json, "\"turn_right\"");
        let back: Action = serde_json::from_str("\"turn_left\"").unwrap();
        assert_eq!(back, Action::TurnLeft);
    }

    #[test]
    fn test_no_match_has_zero_score() {
        let r = MatchResult::no_match();
        assert!(!r.matched);
        assert!(r.identity.is_none());
        assert_eq!(r.score, 0.0);
    }
}
