//! TRUSTFORGE X.509 — Certificate construction and verification.
//!
//! Builds X.509v3 root, intermediate, and end-entity certificates
//! with RSA keys and SHA-256 signatures, parses and verifies CSRs,
//! and provides chain signature verification and PEM utilities.
//! All cryptography is delegated to OpenSSL.

pub mod builder;
pub mod chain;
pub mod csr;
pub mod error;
pub mod key_usage;
pub mod name;
pub mod serial;

pub use builder::{CA_KEY_BITS, CaCertParams, LeafParams};
pub use error::X509Error;
pub use key_usage::KeyUsageFlags;
pub use name::DistinguishedName;
pub use serial::SerialNumber;
