//! Key vault orchestration: store and unlock private key archives.

use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::x509::{X509, X509Ref};
use tracing::info;
use trustforge_core::error::{CaError, CaResult};
use trustforge_core::models::custody::{CustodyRecord, NewCustodyRecord};
use trustforge_core::repository::{CustodyRepository, WrapKeyRepository};
use uuid::Uuid;

use crate::aead;
use crate::config::VaultConfig;
use crate::keystore;
use crate::password;
use crate::protect::KeyProtector;
use crate::wrap::WrapKeys;

/// A private key recovered from custody.
pub struct UnlockedKey {
    pub cert: X509,
    pub key: PKey<Private>,
    pub chain: Vec<X509>,
}

/// Encrypted custody of CA private keys.
///
/// Generic over repositories and the key protector so the vault has
/// no dependency on the database crate.
pub struct KeyVault<C: CustodyRepository, W: WrapKeyRepository, P: KeyProtector> {
    custody: C,
    wrap_keys: WrapKeys<W, P>,
    config: VaultConfig,
}

impl<C: CustodyRepository, W: WrapKeyRepository, P: KeyProtector> KeyVault<C, W, P> {
    pub fn new(custody: C, wrap_repo: W, protector: P, config: VaultConfig) -> Self {
        Self {
            custody,
            wrap_keys: WrapKeys::new(wrap_repo, protector),
            config,
        }
    }

    /// Archive a private key under the given owner's custody.
    ///
    /// Writes a PKCS#12 file named by the certificate fingerprint,
    /// wraps its freshly generated password under the owner's wrap
    /// key, and persists the custody record.
    pub async fn store(
        &self,
        owner_id: Uuid,
        certificate_id: Uuid,
        cert: &X509Ref,
        key: &PKeyRef<Private>,
        chain: &[X509],
    ) -> CaResult<CustodyRecord> {
        let alias = trustforge_x509::chain::fingerprint_hex(cert)?;
        let archive_password = password::generate(self.config.password_length);

        let der = keystore::bundle(&alias, &archive_password, key, cert, chain)?;
        keystore::write_archive(&self.config.keystore_dir, &alias, &der)?;

        let (version, wrap_key) = self.wrap_keys.get_or_create(owner_id).await?;
        let wrapped_password = aead::seal(&wrap_key, archive_password.as_bytes())?;

        let record = self
            .custody
            .create(NewCustodyRecord {
                certificate_id,
                owner_id,
                alias,
                wrapped_password,
                wrap_key_version: version,
            })
            .await?;

        info!(
            certificate_id = %certificate_id,
            owner_id = %owner_id,
            "Private key archived"
        );

        Ok(record)
    }

    /// Unlock the archive behind a custody record.
    pub async fn load(&self, record: &CustodyRecord) -> CaResult<UnlockedKey> {
        let wrap_key = self
            .wrap_keys
            .get(record.owner_id, record.wrap_key_version)
            .await?;

        let password_bytes = aead::open(&wrap_key, &record.wrapped_password)?;
        let archive_password = String::from_utf8(password_bytes)
            .map_err(|_| CaError::Crypto("archive password is not valid UTF-8".into()))?;

        let der = keystore::read_archive(&self.config.keystore_dir, &record.alias)?;
        let (key, cert, chain) = keystore::open_bundle(&der, &archive_password)?;

        Ok(UnlockedKey { cert, key, chain })
    }

    /// The active custody record for a certificate, if any.
    pub async fn active_custody(&self, certificate_id: Uuid) -> CaResult<Option<CustodyRecord>> {
        self.custody.get_active_for_certificate(certificate_id).await
    }

    /// All active custody records owned by an operator.
    pub async fn custody_by_owner(&self, owner_id: Uuid) -> CaResult<Vec<CustodyRecord>> {
        self.custody.list_by_owner(owner_id).await
    }
}
