//! PKCS#12 archive handling.
//!
//! Archives live on disk as `<keystore_dir>/<alias>.p12`, where the
//! alias is the certificate's SHA-256 fingerprint.

use std::fs;
use std::path::{Path, PathBuf};

use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::stack::Stack;
use openssl::x509::{X509, X509Ref};

use crate::error::VaultError;

/// Serialize a key + certificate + chain into a PKCS#12 archive.
pub fn bundle(
    alias: &str,
    password: &str,
    key: &PKeyRef<Private>,
    cert: &X509Ref,
    chain: &[X509],
) -> Result<Vec<u8>, VaultError> {
    let mut ca_stack = Stack::new()?;
    for ca in chain {
        ca_stack.push(ca.clone())?;
    }

    let mut builder = Pkcs12::builder();
    builder.name(alias);
    builder.pkey(key);
    builder.cert(cert);
    builder.ca(ca_stack);

    let pkcs12 = builder.build2(password)?;
    Ok(pkcs12.to_der()?)
}

/// Open a PKCS#12 archive, returning key, certificate, and chain.
pub fn open_bundle(
    der: &[u8],
    password: &str,
) -> Result<(PKey<Private>, X509, Vec<X509>), VaultError> {
    let parsed = Pkcs12::from_der(der)?.parse2(password)?;

    let key = parsed
        .pkey
        .ok_or_else(|| VaultError::MissingEntry("private key".into()))?;
    let cert = parsed
        .cert
        .ok_or_else(|| VaultError::MissingEntry("certificate".into()))?;
    let chain = parsed
        .ca
        .map(|stack| stack.iter().map(|c| c.to_owned()).collect())
        .unwrap_or_default();

    Ok((key, cert, chain))
}

pub fn archive_path(dir: &Path, alias: &str) -> PathBuf {
    dir.join(format!("{alias}.p12"))
}

/// Write an archive to disk, creating the keystore directory if
/// needed.
pub fn write_archive(dir: &Path, alias: &str, der: &[u8]) -> Result<PathBuf, VaultError> {
    fs::create_dir_all(dir)?;
    let path = archive_path(dir, alias);
    fs::write(&path, der)?;
    Ok(path)
}

pub fn read_archive(dir: &Path, alias: &str) -> Result<Vec<u8>, VaultError> {
    let path = archive_path(dir, alias);
    if !path.exists() {
        return Err(VaultError::MissingEntry(format!(
            "archive not found for alias {alias}"
        )));
    }
    Ok(fs::read(path)?)
}
