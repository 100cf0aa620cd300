//! X.509 error types.

use thiserror::Error;
use trustforge_core::error::CaError;

#[derive(Debug, Error)]
pub enum X509Error {
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("invalid PEM: {0}")]
    InvalidPem(String),

    #[error("invalid CSR: {0}")]
    InvalidCsr(String),

    #[error("unsupported key: {0}")]
    UnsupportedKey(String),
}

impl From<X509Error> for CaError {
    fn from(err: X509Error) -> Self {
        match err {
            X509Error::InvalidCsr(msg) => CaError::Validation {
                message: format!("invalid CSR: {msg}"),
            },
            X509Error::InvalidPem(msg) => CaError::Validation {
                message: format!("invalid PEM: {msg}"),
            },
            X509Error::UnsupportedKey(msg) => CaError::Validation {
                message: format!("unsupported key: {msg}"),
            },
            X509Error::OpenSsl(stack) => CaError::Crypto(stack.to_string()),
        }
    }
}
