//! Key custody domain models.
//!
//! Private keys never touch the database. They live in PKCS#12
//! archives on disk; what is persisted is a custody record holding
//! the AES-GCM-wrapped archive password, bound to the operator whose
//! wrap key encrypted it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Links a certificate's private-key archive to its owning operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyRecord {
    pub id: Uuid,
    pub certificate_id: Uuid,
    /// Operator whose wrap key protects the archive password.
    pub owner_id: Uuid,
    /// Keystore alias — the certificate's SHA-256 fingerprint, which
    /// also names the archive file on disk.
    pub alias: String,
    /// `base64(nonce || tag || ciphertext)` of the archive password.
    pub wrapped_password: String,
    /// Version of the owner's wrap key used for encryption.
    pub wrap_key_version: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to persist a custody record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustodyRecord {
    pub certificate_id: Uuid,
    pub owner_id: Uuid,
    pub alias: String,
    pub wrapped_password: String,
    pub wrap_key_version: u32,
}

/// A per-operator wrap key, stored only in protected form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorWrapKey {
    pub id: Uuid,
    pub operator_id: Uuid,
    pub version: u32,
    /// Output of the configured key protector over the raw 32-byte key.
    pub protected_key: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to persist a wrap key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOperatorWrapKey {
    pub operator_id: Uuid,
    pub version: u32,
    pub protected_key: String,
}
