//! TRUSTFORGE Vault — encrypted custody of CA private keys.
//!
//! Private keys are exported to password-protected PKCS#12 archives
//! on disk, named by certificate fingerprint. Archive passwords are
//! generated fresh per archive and AES-256-GCM-wrapped under a
//! per-operator wrap key; wrap keys in turn are stored only in the
//! form produced by the configured [`KeyProtector`].

pub mod aead;
pub mod config;
pub mod error;
pub mod keystore;
pub mod password;
pub mod protect;
pub mod vault;
pub mod wrap;

pub use config::VaultConfig;
pub use error::VaultError;
pub use protect::{KeyProtector, LocalKeyProtector};
pub use vault::{KeyVault, UnlockedKey};
pub use wrap::WrapKeys;
