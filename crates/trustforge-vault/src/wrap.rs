//! Per-operator wrap key provisioning.

use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use trustforge_core::error::{CaError, CaResult};
use trustforge_core::models::custody::NewOperatorWrapKey;
use trustforge_core::repository::WrapKeyRepository;
use uuid::Uuid;

use crate::protect::KeyProtector;

/// Lazily provisions and recovers operator wrap keys.
///
/// A wrap key is created the first time an operator takes custody of
/// a private key and reused afterwards. Only its protected form is
/// persisted.
pub struct WrapKeys<R: WrapKeyRepository, P: KeyProtector> {
    repo: R,
    protector: P,
}

impl<R: WrapKeyRepository, P: KeyProtector> WrapKeys<R, P> {
    pub fn new(repo: R, protector: P) -> Self {
        Self { repo, protector }
    }

    /// The operator's current wrap key, creating version 1 on first
    /// use. Returns the key version alongside the raw key.
    pub async fn get_or_create(&self, operator_id: Uuid) -> CaResult<(u32, [u8; 32])> {
        if let Some(existing) = self.repo.get_latest(operator_id).await? {
            let raw = self.protector.unprotect(&existing.protected_key)?;
            return Ok((existing.version, to_key(raw)?));
        }

        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        let protected = self.protector.protect(&key)?;

        let created = self
            .repo
            .create(NewOperatorWrapKey {
                operator_id,
                version: 1,
                protected_key: protected,
            })
            .await?;

        Ok((created.version, key))
    }

    /// Recover a specific wrap key version, as recorded on a custody
    /// record.
    pub async fn get(&self, operator_id: Uuid, version: u32) -> CaResult<[u8; 32]> {
        let record = self.repo.get_by_version(operator_id, version).await?;
        let raw = self.protector.unprotect(&record.protected_key)?;
        to_key(raw)
    }
}

fn to_key(raw: Vec<u8>) -> CaResult<[u8; 32]> {
    raw.try_into()
        .map_err(|_| CaError::Crypto("wrap key is not 32 bytes".into()))
}
