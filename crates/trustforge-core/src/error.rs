//! Error types for the TRUSTFORGE system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict on {entity}: {detail}")]
    Conflict { entity: String, detail: String },

    #[error("Issuer certificate is revoked")]
    IssuerRevoked,

    #[error("Issuer certificate is outside its validity window")]
    IssuerTimeInvalid,

    #[error("Issuer certificate is not a CA")]
    IssuerNotCa,

    #[error("Issuer path length constraint forbids issuing CA certificates")]
    PathLenBlocksCa,

    #[error("Issuer chain of trust failed signature verification")]
    ChainSignatureInvalid,

    #[error("Authorization denied: {reason}")]
    Unauthorized { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Keystore error: {0}")]
    Keystore(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CaResult<T> = Result<T, CaError>;
