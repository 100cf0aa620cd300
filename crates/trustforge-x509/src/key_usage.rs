//! RFC 5280 key usage flag mapping.

use openssl::x509::X509Extension;
use openssl::x509::extension::KeyUsage;

use crate::error::X509Error;

/// The nine RFC 5280 key usage bits.
///
/// An all-false value on a CA request falls back to the
/// keyCertSign + cRLSign pair every CA certificate needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyUsageFlags {
    pub digital_signature: bool,
    pub non_repudiation: bool,
    pub key_encipherment: bool,
    pub data_encipherment: bool,
    pub key_agreement: bool,
    pub key_cert_sign: bool,
    pub crl_sign: bool,
    pub encipher_only: bool,
    pub decipher_only: bool,
}

impl KeyUsageFlags {
    /// The minimum usage set for a CA certificate.
    pub fn ca_default() -> Self {
        Self {
            key_cert_sign: true,
            crl_sign: true,
            ..Default::default()
        }
    }

    /// Usage set applied to CSR-signed end-entity certificates.
    pub fn leaf_default() -> Self {
        Self {
            digital_signature: true,
            key_encipherment: true,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Build the critical KeyUsage extension for these flags.
    pub fn to_extension(&self) -> Result<X509Extension, X509Error> {
        let flags = if self.is_empty() {
            Self::ca_default()
        } else {
            *self
        };

        let mut usage = KeyUsage::new();
        usage.critical();
        if flags.digital_signature {
            usage.digital_signature();
        }
        if flags.non_repudiation {
            usage.non_repudiation();
        }
        if flags.key_encipherment {
            usage.key_encipherment();
        }
        if flags.data_encipherment {
            usage.data_encipherment();
        }
        if flags.key_agreement {
            usage.key_agreement();
        }
        if flags.key_cert_sign {
            usage.key_cert_sign();
        }
        if flags.crl_sign {
            usage.crl_sign();
        }
        if flags.encipher_only {
            usage.encipher_only();
        }
        if flags.decipher_only {
            usage.decipher_only();
        }
        Ok(usage.build()?)
    }
}
