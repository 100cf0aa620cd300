//! Configuration for the issuance services.

/// Settings for root and intermediate CA issuance.
#[derive(Debug, Clone)]
pub struct IssuanceConfig {
    /// Validity period applied when a request gives none.
    pub default_validity_days: i64,
    /// Minutes to backdate notBefore on CA certificates, absorbing
    /// clock skew between the engine and relying parties.
    pub backdate_minutes: i64,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            default_validity_days: 365,
            backdate_minutes: 5,
        }
    }
}

/// How CSR validity requests outside the issuing CA's window are
/// handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidityPolicy {
    /// Silently clamp the requested window into the CA's window.
    #[default]
    Clamp,
    /// Reject requests that exceed the CA's window.
    Reject,
}

/// Policy applied to incoming certificate signing requests.
#[derive(Debug, Clone)]
pub struct CsrPolicy {
    /// Minimum RSA modulus size accepted from a CSR.
    pub min_rsa_bits: u32,
    pub validity_policy: ValidityPolicy,
    /// Validity period applied when the request gives none.
    pub default_validity_days: i64,
    /// OCSP responder URL embedded into issued leaves as an AIA
    /// extension. No extension is added when unset.
    pub ocsp_url: Option<String>,
}

impl Default for CsrPolicy {
    fn default() -> Self {
        Self {
            min_rsa_bits: 2048,
            validity_policy: ValidityPolicy::default(),
            default_validity_days: 365,
            ocsp_url: None,
        }
    }
}

/// The dedicated OCSP responder identity and response lifetime.
#[derive(Debug, Clone)]
pub struct OcspResponderConfig {
    /// PEM-encoded responder certificate, included in responses.
    pub certificate_pem: String,
    /// PEM-encoded responder private key.
    pub private_key_pem: String,
    /// Hours until nextUpdate.
    pub validity_hours: i64,
}

impl OcspResponderConfig {
    pub fn new(certificate_pem: String, private_key_pem: String) -> Self {
        Self {
            certificate_pem,
            private_key_pem,
            validity_hours: 12,
        }
    }
}
