//! Chain-of-trust verification over stored certificates.

use openssl::x509::X509;
use trustforge_core::error::{CaError, CaResult};
use trustforge_core::repository::CertificateRepository;
use uuid::Uuid;

/// Cryptographic oracle over a certificate's stored chain.
///
/// Walks `parent_id` links upward, collecting the PEM of every hop,
/// and verifies each signature against the next certificate's public
/// key. Performs no writes.
pub struct ChainVerifier<R: CertificateRepository> {
    certs: R,
}

impl<R: CertificateRepository> ChainVerifier<R> {
    pub fn new(certs: R) -> Self {
        Self { certs }
    }

    /// Whether the certificate's full chain up to a self-signed root
    /// verifies. A missing certificate, an unparseable PEM, or any
    /// failed signature hop yields `false` — there is no partial
    /// trust.
    pub async fn verify(&self, certificate_id: Uuid) -> CaResult<bool> {
        let mut chain: Vec<X509> = Vec::new();
        let mut next = Some(certificate_id);

        while let Some(id) = next {
            let cert = match self.certs.get_by_id(id).await {
                Ok(c) => c,
                Err(CaError::NotFound { .. }) => return Ok(false),
                Err(e) => return Err(e),
            };

            match trustforge_x509::chain::parse_chain(&cert.pem) {
                Ok(mut parsed) if parsed.len() == 1 => {
                    // parse_chain on a single PEM yields exactly one
                    // certificate; anything else is a malformed row.
                    chain.push(parsed.remove(0));
                }
                _ => return Ok(false),
            }

            next = cert.parent_id;
        }

        Ok(trustforge_x509::chain::verify_chain(&chain)?)
    }
}
