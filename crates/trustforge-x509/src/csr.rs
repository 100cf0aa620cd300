//! CSR parsing, verification, and hashing.

use openssl::hash::{MessageDigest, hash};
use openssl::x509::{X509Req, X509ReqRef};

use crate::error::X509Error;

/// Parse a PEM-encoded CSR and check its self-signature.
///
/// A request whose signature does not verify against its own public
/// key is rejected outright; nothing downstream should ever see it.
pub fn parse_and_verify(pem: &str) -> Result<X509Req, X509Error> {
    let req = X509Req::from_pem(pem.as_bytes())
        .map_err(|e| X509Error::InvalidCsr(format!("PEM parse failed: {e}")))?;

    let key = req
        .public_key()
        .map_err(|e| X509Error::InvalidCsr(format!("no usable public key: {e}")))?;

    let valid = req
        .verify(&key)
        .map_err(|e| X509Error::InvalidCsr(format!("signature check failed: {e}")))?;
    if !valid {
        return Err(X509Error::InvalidCsr("self-signature mismatch".into()));
    }

    Ok(req)
}

/// Size in bits of the request's public key.
pub fn key_bits(req: &X509ReqRef) -> Result<u32, X509Error> {
    Ok(req.public_key()?.bits())
}

/// SHA-256 over the DER encoding of the request, uppercase hex.
///
/// Used to deduplicate repeated submissions of the same CSR to the
/// same CA.
pub fn hash_hex(req: &X509ReqRef) -> Result<String, X509Error> {
    let der = req.to_der()?;
    let digest = hash(MessageDigest::sha256(), &der)?;
    Ok(hex::encode_upper(digest))
}
