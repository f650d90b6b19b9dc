//! Persisted record of protected references.
//!
//! The record is a pretty-printed JSON document. Its types can only hold
//! [`ProtectedReference`]s, so a raw encoding never reaches disk.

use crate::registry::IdentityRegistry;
use crate::types::ProtectedReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

const PROTECTION_METHOD: &str = "sha256_hashing";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedEntry {
    pub name: String,
    pub reference: ProtectedReference,
}

/// Protected references plus free-form metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedRecord {
    pub record_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub robot_name: String,
    pub references: Vec<ProtectedEntry>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ProtectedRecord {
    /// Snapshot a registry into a new record.
    pub fn from_registry(robot_name: &str, registry: &IdentityRegistry) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            created_at: Utc::now(),
            robot_name: robot_name.to_string(),
            references: registry
                .lookup_all()
                .map(|(name, reference)| ProtectedEntry {
                    name: name.to_string(),
                    reference: reference.clone(),
                })
                .collect(),
            metadata: BTreeMap::new(),
        }
    }

    /// Rebuild a read-only registry from the stored references.
    pub fn to_registry(&self) -> IdentityRegistry {
        IdentityRegistry::from_references(
            self.references
                .iter()
                .map(|e| (e.name.clone(), e.reference.clone())),
        )
    }
}

/// Summary of how a record protects face data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyReport {
    pub data_type: String,
    pub protection_method: String,
    pub original_data_stored: bool,
    pub pseudonymized: bool,
    pub hash_count: usize,
    pub compliance_check: String,
}

pub fn privacy_report(record: &ProtectedRecord) -> PrivacyReport {
    PrivacyReport {
        data_type: "face_encodings".into(),
        protection_method: PROTECTION_METHOD.into(),
        original_data_stored: false,
        pseudonymized: true,
        hash_count: record.references.len(),
        compliance_check: "GDPR_friendly".into(),
    }
}

pub fn save_record(record: &ProtectedRecord, path: &Path) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json)?;
    tracing::info!(
        path = %path.display(),
        references = record.references.len(),
        "protected record saved"
    );
    Ok(())
}

pub fn load_record(path: &Path) -> Result<ProtectedRecord, StoreError> {
    let json = std::fs::read_to_string(path)?;
    let record: ProtectedRecord = serde_json::from_str(&json)?;
    tracing::info!(path = %path.display(), record_id = %record.record_id, "protected record loaded");
    Ok(record)
}
