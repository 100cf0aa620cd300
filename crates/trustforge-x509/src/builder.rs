//! X.509v3 certificate construction.
//!
//! Three build paths: self-signed roots, CA-signed intermediates, and
//! CSR-signed end-entity certificates. All certificates carry SHA-256
//! signatures, critical BasicConstraints and KeyUsage, a subject key
//! identifier, and an authority key identifier (self-referential on
//! roots).

use chrono::{DateTime, Utc};
use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, SubjectKeyIdentifier,
};
use openssl::x509::{X509, X509Builder, X509Extension, X509Ref, X509Req};

use crate::error::X509Error;
use crate::key_usage::KeyUsageFlags;
use crate::name::DistinguishedName;
use crate::serial::SerialNumber;

/// RSA modulus size for CA keys.
pub const CA_KEY_BITS: u32 = 3072;

/// Parameters shared by root and intermediate construction.
#[derive(Debug, Clone)]
pub struct CaCertParams {
    pub subject: DistinguishedName,
    pub serial: SerialNumber,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub path_len: Option<u32>,
    pub key_usage: KeyUsageFlags,
}

/// Parameters for signing an end-entity certificate from a CSR.
#[derive(Debug, Clone)]
pub struct LeafParams {
    pub serial: SerialNumber,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// OCSP responder URL embedded as an AIA extension when set.
    pub ocsp_url: Option<String>,
}

fn base_builder(
    serial: &SerialNumber,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
) -> Result<X509Builder, X509Error> {
    let mut builder = X509::builder()?;
    builder.set_version(2)?;
    let serial = serial.to_asn1()?;
    builder.set_serial_number(&serial)?;
    let not_before = Asn1Time::from_unix(not_before.timestamp())?;
    builder.set_not_before(&not_before)?;
    let not_after = Asn1Time::from_unix(not_after.timestamp())?;
    builder.set_not_after(&not_after)?;
    Ok(builder)
}

fn append_ca_extensions(
    builder: &mut X509Builder,
    path_len: Option<u32>,
    key_usage: KeyUsageFlags,
) -> Result<(), X509Error> {
    let mut bc = BasicConstraints::new();
    bc.critical();
    bc.ca();
    if let Some(n) = path_len {
        bc.pathlen(n);
    }
    builder.append_extension(bc.build()?)?;
    builder.append_extension(key_usage.to_extension()?)?;
    Ok(())
}

/// Generate a fresh RSA key pair and build a self-signed root CA
/// certificate around it.
pub fn create_self_signed_root(params: &CaCertParams) -> Result<(PKey<Private>, X509), X509Error> {
    let rsa = Rsa::generate(CA_KEY_BITS)?;
    let key = PKey::from_rsa(rsa)?;

    let name = params.subject.to_x509_name()?;
    let mut builder = base_builder(&params.serial, params.not_before, params.not_after)?;
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(&name)?;
    builder.set_pubkey(&key)?;

    append_ca_extensions(&mut builder, params.path_len, params.key_usage)?;

    // SKI must exist before the AKI can reference it.
    let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(None, None))?;
    builder.append_extension(ski)?;
    let aki = AuthorityKeyIdentifier::new()
        .keyid(false)
        .build(&builder.x509v3_context(None, None))?;
    builder.append_extension(aki)?;

    builder.sign(&key, MessageDigest::sha256())?;
    Ok((key, builder.build()))
}

/// Generate a fresh RSA key pair and build an intermediate CA
/// certificate signed by the given issuer.
pub fn create_intermediate(
    params: &CaCertParams,
    issuer_cert: &X509Ref,
    issuer_key: &PKeyRef<Private>,
) -> Result<(PKey<Private>, X509), X509Error> {
    let rsa = Rsa::generate(CA_KEY_BITS)?;
    let key = PKey::from_rsa(rsa)?;

    let name = params.subject.to_x509_name()?;
    let mut builder = base_builder(&params.serial, params.not_before, params.not_after)?;
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(issuer_cert.subject_name())?;
    builder.set_pubkey(&key)?;

    append_ca_extensions(&mut builder, params.path_len, params.key_usage)?;

    let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(Some(issuer_cert), None))?;
    builder.append_extension(ski)?;
    let aki = AuthorityKeyIdentifier::new()
        .keyid(false)
        .build(&builder.x509v3_context(Some(issuer_cert), None))?;
    builder.append_extension(aki)?;

    builder.sign(issuer_key, MessageDigest::sha256())?;
    Ok((key, builder.build()))
}

/// Sign an end-entity certificate from a verified CSR.
///
/// The subject and public key come from the request; BasicConstraints
/// is critical non-CA, key usage is digitalSignature + keyEncipherment,
/// and EKU covers both serverAuth and clientAuth.
#[allow(deprecated)]
pub fn sign_leaf_from_csr(
    params: &LeafParams,
    csr: &X509Req,
    issuer_cert: &X509Ref,
    issuer_key: &PKeyRef<Private>,
) -> Result<X509, X509Error> {
    let csr_key = csr.public_key()?;

    let mut builder = base_builder(&params.serial, params.not_before, params.not_after)?;
    builder.set_subject_name(csr.subject_name())?;
    builder.set_issuer_name(issuer_cert.subject_name())?;
    builder.set_pubkey(&csr_key)?;

    let mut bc = BasicConstraints::new();
    bc.critical();
    builder.append_extension(bc.build()?)?;
    builder.append_extension(KeyUsageFlags::leaf_default().to_extension()?)?;
    builder.append_extension(ExtendedKeyUsage::new().server_auth().client_auth().build()?)?;

    let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(Some(issuer_cert), None))?;
    builder.append_extension(ski)?;
    let aki = AuthorityKeyIdentifier::new()
        .keyid(false)
        .build(&builder.x509v3_context(Some(issuer_cert), None))?;
    builder.append_extension(aki)?;

    if let Some(url) = &params.ocsp_url {
        let aia = X509Extension::new_nid(
            None,
            Some(&builder.x509v3_context(Some(issuer_cert), None)),
            Nid::INFO_ACCESS,
            &format!("OCSP;URI:{url}"),
        )?;
        builder.append_extension(aia)?;
    }

    builder.sign(issuer_key, MessageDigest::sha256())?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use openssl::x509::X509ReqBuilder;

    fn ca_params(cn: &str, path_len: Option<u32>) -> CaCertParams {
        let now = Utc::now();
        CaCertParams {
            subject: DistinguishedName::new(cn),
            serial: SerialNumber::generate().unwrap(),
            not_before: now,
            not_after: now + Duration::days(365),
            path_len,
            key_usage: KeyUsageFlags::default(),
        }
    }

    fn test_csr(cn: &str, bits: u32) -> (PKey<Private>, X509Req) {
        let key = PKey::from_rsa(Rsa::generate(bits).unwrap()).unwrap();
        let mut builder = X509ReqBuilder::new().unwrap();
        builder
            .set_subject_name(&DistinguishedName::new(cn).to_x509_name().unwrap())
            .unwrap();
        builder.set_pubkey(&key).unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();
        (key, builder.build())
    }

    #[test]
    fn root_is_self_signed() {
        let (key, cert) = create_self_signed_root(&ca_params("Test Root", Some(1))).unwrap();
        assert!(cert.verify(&key).unwrap());
        assert_eq!(
            cert.subject_name().to_der().unwrap(),
            cert.issuer_name().to_der().unwrap()
        );
    }

    #[test]
    fn intermediate_verifies_against_root() {
        let (root_key, root) = create_self_signed_root(&ca_params("Test Root", None)).unwrap();
        let (inter_key, inter) =
            create_intermediate(&ca_params("Test Intermediate", Some(0)), &root, &root_key)
                .unwrap();
        assert!(inter.verify(&root.public_key().unwrap()).unwrap());
        assert!(!inter.verify(&inter_key).unwrap());
    }

    #[test]
    fn leaf_carries_csr_subject_and_verifies() {
        let (root_key, root) = create_self_signed_root(&ca_params("Test Root", None)).unwrap();
        let (_csr_key, csr) = test_csr("leaf.example.org", 2048);

        let now = Utc::now();
        let leaf = sign_leaf_from_csr(
            &LeafParams {
                serial: SerialNumber::generate().unwrap(),
                not_before: now,
                not_after: now + Duration::days(90),
                ocsp_url: Some("http://ocsp.example.org".into()),
            },
            &csr,
            &root,
            &root_key,
        )
        .unwrap();

        assert!(leaf.verify(&root.public_key().unwrap()).unwrap());
        let subject = format!("{:?}", leaf.subject_name());
        assert!(subject.contains("leaf.example.org"));
    }
}
