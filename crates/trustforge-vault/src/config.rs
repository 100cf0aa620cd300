//! Vault configuration.

use std::path::PathBuf;

/// Configuration for the key vault.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Directory where PKCS#12 archives are written.
    pub keystore_dir: PathBuf,
    /// Generated archive password length (default: 24).
    pub password_length: usize,
}

impl VaultConfig {
    pub fn new(keystore_dir: impl Into<PathBuf>) -> Self {
        Self {
            keystore_dir: keystore_dir.into(),
            password_length: 24,
        }
    }
}
