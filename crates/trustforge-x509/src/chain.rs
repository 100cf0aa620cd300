//! Chain parsing, signature verification, and PEM utilities.

use openssl::hash::MessageDigest;
use openssl::x509::{X509, X509Ref};

use crate::error::X509Error;

/// Parse a concatenated PEM bundle into its certificates, in order.
pub fn parse_chain(pem: &str) -> Result<Vec<X509>, X509Error> {
    X509::stack_from_pem(pem.as_bytes())
        .map_err(|e| X509Error::InvalidPem(format!("chain parse failed: {e}")))
}

/// Verify the cryptographic integrity of a chain ordered leaf-first.
///
/// Each certificate's signature is checked against the next one's
/// public key; the final certificate is checked against itself, so a
/// well-formed chain must terminate in a self-signed root. Returns
/// `false` for an empty chain or any failed hop.
pub fn verify_chain(chain: &[X509]) -> Result<bool, X509Error> {
    if chain.is_empty() {
        return Ok(false);
    }

    for pair in chain.windows(2) {
        let issuer_key = pair[1].public_key()?;
        if !pair[0].verify(&issuer_key)? {
            return Ok(false);
        }
    }

    let last = &chain[chain.len() - 1];
    let anchor_key = last.public_key()?;
    Ok(last.verify(&anchor_key)?)
}

/// SHA-256 fingerprint of a certificate, lowercase hex.
pub fn fingerprint_hex(cert: &X509Ref) -> Result<String, X509Error> {
    let digest = cert.digest(MessageDigest::sha256())?;
    Ok(hex::encode(digest))
}

pub fn to_pem(cert: &X509Ref) -> Result<String, X509Error> {
    let bytes = cert.to_pem()?;
    String::from_utf8(bytes).map_err(|e| X509Error::InvalidPem(e.to_string()))
}

/// Prepend a certificate's PEM to its issuer's chain PEM.
pub fn prepend_to_chain(cert_pem: &str, issuer_chain_pem: &str) -> String {
    let mut combined = String::with_capacity(cert_pem.len() + issuer_chain_pem.len() + 1);
    combined.push_str(cert_pem.trim_end());
    combined.push('\n');
    combined.push_str(issuer_chain_pem.trim_start());
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{CaCertParams, create_intermediate, create_self_signed_root};
    use crate::key_usage::KeyUsageFlags;
    use crate::name::DistinguishedName;
    use crate::serial::SerialNumber;
    use chrono::{Duration, Utc};

    fn params(cn: &str) -> CaCertParams {
        let now = Utc::now();
        CaCertParams {
            subject: DistinguishedName::new(cn),
            serial: SerialNumber::generate().unwrap(),
            not_before: now,
            not_after: now + Duration::days(365),
            path_len: None,
            key_usage: KeyUsageFlags::default(),
        }
    }

    #[test]
    fn two_level_chain_verifies() {
        let (root_key, root) = create_self_signed_root(&params("Root")).unwrap();
        let (_ik, inter) = create_intermediate(&params("Inter"), &root, &root_key).unwrap();

        let chain_pem = prepend_to_chain(&to_pem(&inter).unwrap(), &to_pem(&root).unwrap());
        let chain = parse_chain(&chain_pem).unwrap();
        assert_eq!(chain.len(), 2);
        assert!(verify_chain(&chain).unwrap());
    }

    #[test]
    fn reordered_chain_fails() {
        let (root_key, root) = create_self_signed_root(&params("Root")).unwrap();
        let (_ik, inter) = create_intermediate(&params("Inter"), &root, &root_key).unwrap();

        assert!(!verify_chain(&[root, inter]).unwrap());
    }

    #[test]
    fn foreign_root_fails() {
        let (root_key, root) = create_self_signed_root(&params("Root")).unwrap();
        let (_ok, other_root) = create_self_signed_root(&params("Other Root")).unwrap();
        let (_ik, inter) = create_intermediate(&params("Inter"), &root, &root_key).unwrap();

        assert!(!verify_chain(&[inter, other_root]).unwrap());
    }

    #[test]
    fn empty_chain_is_invalid() {
        assert!(!verify_chain(&[]).unwrap());
    }

    #[test]
    fn non_self_signed_top_is_invalid() {
        let (root_key, root) = create_self_signed_root(&params("Root")).unwrap();
        let (_ik, inter) = create_intermediate(&params("Inter"), &root, &root_key).unwrap();

        // Chain that stops at the intermediate never reaches a trust
        // anchor.
        assert!(!verify_chain(&[inter]).unwrap());
    }
}
