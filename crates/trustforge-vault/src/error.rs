//! Vault error types.

use thiserror::Error;
use trustforge_core::error::CaError;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("keystore I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("key protector error: {0}")]
    Protector(String),

    #[error("keystore entry missing: {0}")]
    MissingEntry(String),
}

impl From<openssl::error::ErrorStack> for VaultError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        VaultError::Crypto(err.to_string())
    }
}

impl From<VaultError> for CaError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Crypto(msg) => CaError::Crypto(msg),
            other => CaError::Keystore(other.to_string()),
        }
    }
}
