//! Operator domain models.
//!
//! Operators are the human principals the engine authorizes against.
//! Identity management (registration, credentials, sessions) lives
//! outside the engine; only the attributes issuance policy needs are
//! stored here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A CA operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub id: Uuid,
    pub name: String,
    /// Organization the operator belongs to. Cross-operator issuance
    /// is only permitted within the same organization.
    pub organization: String,
    /// Administrators bypass chain assignment and key ownership
    /// checks and may create root CAs.
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to register a new operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOperator {
    pub name: String,
    pub organization: String,
    pub is_admin: bool,
}
