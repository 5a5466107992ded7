//! Encoding of the persisted session record.
//!
//! The record is a flat JSON object. Records written before versioning was
//! introduced carry no `schemaVersion` and no checksum; they are read as
//! version 0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::auth::identity::Identity;
use crate::error::{AuthError, AuthResult};

/// Schema version written by this crate
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Version assumed for records without a `schemaVersion` field
pub const LEGACY_SCHEMA_VERSION: u32 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredIdentityRecord {
    #[serde(default)]
    schema_version: u32,
    id: String,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    age_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
    /// Hex SHA-256 checksum over the identity fields. Unkeyed: it catches
    /// corruption and partial writes, not deliberate edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    integrity: Option<String>,
}

/// Serialize an identity into the current record format
pub fn encode_identity(identity: &Identity) -> AuthResult<String> {
    let record = StoredIdentityRecord {
        schema_version: CURRENT_SCHEMA_VERSION,
        id: identity.id().to_string(),
        email: identity.email.clone(),
        display_name: identity.display_name.clone(),
        gender: identity.gender.clone(),
        age_group: identity.age_group.clone(),
        saved_at: Some(Utc::now()),
        integrity: Some(checksum(identity)),
    };

    serde_json::to_string(&record)
        .map_err(|e| AuthError::persistence(format!("Failed to encode session record: {}", e)))
}

/// Parse a persisted record back into an identity.
///
/// Every failure is reported as `MalformedStoredRecord`.
pub fn decode_identity(raw: &str) -> AuthResult<Identity> {
    let record: StoredIdentityRecord = serde_json::from_str(raw)
        .map_err(|e| AuthError::malformed(format!("Invalid JSON: {}", e)))?;

    if record.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(AuthError::malformed(format!(
            "Unsupported schema version {} (newest known is {})",
            record.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }

    if record.id.trim().is_empty() {
        return Err(AuthError::malformed("Record has an empty id"));
    }
    if record.email.trim().is_empty() {
        return Err(AuthError::malformed("Record has an empty email"));
    }

    let mut identity = Identity::new(record.id, record.email);
    identity.display_name = record.display_name;
    identity.gender = record.gender;
    identity.age_group = record.age_group;

    if record.schema_version >= 1 {
        let expected = checksum(&identity);
        match record.integrity.as_deref() {
            Some(actual) if actual == expected => {}
            Some(_) => return Err(AuthError::malformed("Checksum mismatch")),
            None => return Err(AuthError::malformed("Checksum missing")),
        }
    }

    Ok(identity)
}

/// Schema version of a raw record, if it parses as a JSON object at all
pub fn schema_version_of(raw: &str) -> Option<u32> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    match object.get("schemaVersion") {
        Some(version) => version.as_u64().and_then(|v| u32::try_from(v).ok()),
        None => Some(LEGACY_SCHEMA_VERSION),
    }
}

/// Each field is length-prefixed so no two field splits share an input
fn checksum(identity: &Identity) -> String {
    let fields = [
        identity.id(),
        identity.email.as_str(),
        identity.display_name.as_deref().unwrap_or(""),
        identity.gender.as_deref().unwrap_or(""),
        identity.age_group.as_deref().unwrap_or(""),
    ];

    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
