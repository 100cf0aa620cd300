//! Wrap key protection boundary.
//!
//! Raw wrap keys are never persisted. Before storage they pass
//! through a [`KeyProtector`], the seam where an OS keychain, KMS, or
//! HSM plugs in. [`LocalKeyProtector`] is the built-in implementation
//! for single-host deployments.

use crate::aead;
use crate::error::VaultError;

/// Protects and recovers per-operator wrap keys.
pub trait KeyProtector: Send + Sync {
    /// Transform a raw wrap key into its storable form.
    fn protect(&self, plaintext: &[u8]) -> Result<String, VaultError>;

    /// Recover a raw wrap key from its storable form.
    fn unprotect(&self, protected: &str) -> Result<Vec<u8>, VaultError>;
}

/// AES-256-GCM protection under a host-local master key.
#[derive(Clone)]
pub struct LocalKeyProtector {
    master_key: [u8; 32],
}

impl LocalKeyProtector {
    pub fn new(master_key: [u8; 32]) -> Self {
        Self { master_key }
    }
}

impl KeyProtector for LocalKeyProtector {
    fn protect(&self, plaintext: &[u8]) -> Result<String, VaultError> {
        aead::seal(&self.master_key, plaintext)
            .map_err(|e| VaultError::Protector(e.to_string()))
    }

    fn unprotect(&self, protected: &str) -> Result<Vec<u8>, VaultError> {
        aead::open(&self.master_key, protected)
            .map_err(|e| VaultError::Protector(e.to_string()))
    }
}
