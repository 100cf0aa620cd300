//! X.500 distinguished name mapping.

use std::fmt;

use openssl::nid::Nid;
use openssl::x509::{X509Name, X509NameBuilder, X509NameRef};

use crate::error::X509Error;

/// Subject attributes for a certificate to be issued.
///
/// Only the common name is mandatory; empty optional attributes are
/// omitted from the encoded name entirely.
#[derive(Debug, Clone, Default)]
pub struct DistinguishedName {
    pub common_name: String,
    pub organizational_unit: Option<String>,
    pub organization: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl DistinguishedName {
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ..Default::default()
        }
    }

    /// Build the OpenSSL name, CN first, skipping empty attributes.
    pub fn to_x509_name(&self) -> Result<X509Name, X509Error> {
        let mut builder = X509NameBuilder::new()?;
        builder.append_entry_by_nid(Nid::COMMONNAME, &self.common_name)?;

        let optional = [
            (Nid::ORGANIZATIONALUNITNAME, &self.organizational_unit),
            (Nid::ORGANIZATIONNAME, &self.organization),
            (Nid::LOCALITYNAME, &self.locality),
            (Nid::STATEORPROVINCENAME, &self.state),
            (Nid::COUNTRYNAME, &self.country),
        ];
        for (nid, value) in optional {
            if let Some(v) = value {
                if !v.is_empty() {
                    builder.append_entry_by_nid(nid, v)?;
                }
            }
        }

        Ok(builder.build())
    }
}

/// Render an encoded X.509 name as `KEY=value` pairs.
///
/// Entries whose attribute type has no short name are skipped rather
/// than failing the whole name.
pub fn encoded_name_to_string(name: &X509NameRef) -> String {
    name.entries()
        .filter_map(|entry| {
            let key = entry.object().nid().short_name().ok()?;
            let value = entry.data().as_utf8().ok()?;
            Some(format!("{key}={value}"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CN={}", self.common_name)?;

        let optional = [
            ("OU", &self.organizational_unit),
            ("O", &self.organization),
            ("L", &self.locality),
            ("ST", &self.state),
            ("C", &self.country),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                if !v.is_empty() {
                    write!(f, ", {key}={v}")?;
                }
            }
        }
        Ok(())
    }
}
