//! Chain assignment domain models.
//!
//! A chain assignment grants an operator the right to work under a
//! specific chain of trust, identified by its root certificate. It is
//! one of the two factors required for issuance — the other being
//! custody of the issuer's private key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Grants an operator access to a chain of trust.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainAssignment {
    pub id: Uuid,
    pub operator_id: Uuid,
    /// Root certificate identifying the chain.
    pub chain_root_id: Uuid,
    /// The operator that created the assignment, when known.
    pub assigned_by: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a chain assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChainAssignment {
    pub operator_id: Uuid,
    pub chain_root_id: Uuid,
    pub assigned_by: Option<Uuid>,
}
