//! RFC 6960 OCSP responder.
//!
//! Request parsing and response encoding use the `ocsp` crate; the
//! response signature itself is produced with OpenSSL using a
//! dedicated responder key. Unrecognized issuers and serials degrade
//! to `Unknown` per protocol convention instead of erroring.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use ocsp::common::asn1::{CertId, GeneralizedTime, Oid};
use ocsp::common::ocsp::{OcspExt, OcspExtI};
use ocsp::request::OcspRequest;
use ocsp::response::{
    BasicResponse, CertStatus, CertStatusCode, CrlReason, OcspRespStatus, OcspResponse, OneResp,
    ResponderId, ResponseBytes, ResponseData, RevokedInfo,
};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::sign::Signer;
use openssl::x509::{X509, X509Ref};
use tracing::{debug, warn};
use trustforge_core::error::{CaError, CaResult};
use trustforge_core::models::certificate::{Certificate, RevocationReason};
use trustforge_core::repository::CertificateRepository;

use crate::config::OcspResponderConfig;

const SHA256_WITH_RSA_DOT: &str = "1.2.840.113549.1.1.11";

/// Locates the intermediate CA a CertID refers to.
///
/// Abstracted so that the linear scan below can be replaced with an
/// indexed lookup without touching the responder logic.
pub trait IssuerLookup: Send + Sync {
    fn find_issuer(
        &self,
        issuer_name_hash: &[u8],
        issuer_key_hash: &[u8],
    ) -> impl Future<Output = CaResult<Option<Certificate>>> + Send;
}

/// Default issuer lookup: recompute SHA-1 name and key hashes over
/// every known intermediate until one matches both. O(n) per request,
/// acceptable at small CA counts.
pub struct CaTableLookup<R: CertificateRepository> {
    certs: R,
}

impl<R: CertificateRepository> CaTableLookup<R> {
    pub fn new(certs: R) -> Self {
        Self { certs }
    }
}

impl<R: CertificateRepository> IssuerLookup for CaTableLookup<R> {
    async fn find_issuer(
        &self,
        issuer_name_hash: &[u8],
        issuer_key_hash: &[u8],
    ) -> CaResult<Option<Certificate>> {
        for candidate in self.certs.list_intermediates().await? {
            let parsed = match trustforge_x509::chain::parse_chain(&candidate.pem) {
                Ok(mut chain) if chain.len() == 1 => chain.remove(0),
                _ => continue,
            };
            let (name_hash, key_hash) = match certid_hashes(&parsed) {
                Ok(hashes) => hashes,
                Err(_) => continue,
            };
            if name_hash == issuer_name_hash && key_hash == issuer_key_hash {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

/// SHA-1 hashes over a CA certificate's subject name and public key,
/// matching the CertID construction relying parties use.
fn certid_hashes(cert: &X509Ref) -> CaResult<(Vec<u8>, Vec<u8>)> {
    let name_der = cert
        .subject_name()
        .to_der()
        .map_err(|e| CaError::Crypto(e.to_string()))?;
    let name_hash = openssl::hash::hash(MessageDigest::sha1(), &name_der)
        .map_err(|e| CaError::Crypto(e.to_string()))?;

    // The key hash covers the subjectPublicKey bits, which for RSA is
    // the PKCS#1 encoding.
    let key_der = cert
        .public_key()
        .and_then(|k| k.rsa())
        .and_then(|r| r.public_key_to_der_pkcs1())
        .map_err(|e| CaError::Crypto(e.to_string()))?;
    let key_hash = openssl::hash::hash(MessageDigest::sha1(), &key_der)
        .map_err(|e| CaError::Crypto(e.to_string()))?;

    Ok((name_hash.to_vec(), key_hash.to_vec()))
}

fn to_generalized_time(t: DateTime<Utc>) -> CaResult<GeneralizedTime> {
    GeneralizedTime::new(
        t.year(),
        t.month(),
        t.day(),
        t.hour(),
        t.minute(),
        t.second(),
    )
    .map_err(|e| CaError::Crypto(format!("OCSP timestamp encoding failed: {e}")))
}

fn crl_reason(reason: RevocationReason) -> CrlReason {
    match reason {
        RevocationReason::Unspecified => CrlReason::OcspRevokeUnspecified,
        RevocationReason::KeyCompromise => CrlReason::OcspRevokeKeyCompromise,
        RevocationReason::CaCompromise => CrlReason::OcspRevokeCaCompromise,
        RevocationReason::AffiliationChanged => CrlReason::OcspRevokeAffChanged,
        RevocationReason::Superseded => CrlReason::OcspRevokeSuperseded,
        RevocationReason::CessationOfOperation => CrlReason::OcspRevokeCessOperation,
        RevocationReason::PrivilegeWithdrawn => CrlReason::OcspRevokePrivWithdrawn,
    }
}

/// OCSP responder backed by the certificate table.
pub struct OcspResponder<L: IssuerLookup, R: CertificateRepository> {
    lookup: L,
    certs: R,
    responder_cert: X509,
    responder_key: PKey<Private>,
    validity_hours: i64,
}

impl<L: IssuerLookup, R: CertificateRepository> OcspResponder<L, R> {
    pub fn new(lookup: L, certs: R, config: &OcspResponderConfig) -> CaResult<Self> {
        let responder_cert = X509::from_pem(config.certificate_pem.as_bytes())
            .map_err(|e| CaError::Crypto(format!("responder certificate: {e}")))?;
        let responder_key = PKey::private_key_from_pem(config.private_key_pem.as_bytes())
            .map_err(|e| CaError::Crypto(format!("responder key: {e}")))?;
        Ok(Self {
            lookup,
            certs,
            responder_cert,
            responder_key,
            validity_hours: config.validity_hours,
        })
    }

    /// Answer a DER-encoded OCSP request with a DER-encoded response.
    ///
    /// A request that does not parse yields a malformed-request
    /// status response rather than an error.
    pub async fn respond(&self, der_request: &[u8]) -> CaResult<Vec<u8>> {
        let request = match OcspRequest::parse(der_request) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Unparseable OCSP request");
                return OcspResponse::new_non_success(OcspRespStatus::MalformedReq)
                    .map_err(|e| CaError::Crypto(format!("OCSP status encoding failed: {e}")))?
                    .to_der()
                    .map_err(|e| CaError::Crypto(format!("OCSP encoding failed: {e}")));
            }
        };

        // Echo the request nonce, if present.
        let nonce = request.tbs_request.request_ext.as_ref().and_then(|exts| {
            exts.iter().find_map(|ext| match &ext.ext {
                OcspExt::Nonce { nonce } => Some(nonce.clone()),
                _ => None,
            })
        });

        let cert_id = request
            .extract_certid_owned()
            .into_iter()
            .next()
            .ok_or_else(|| CaError::Validation {
                message: "OCSP request carries no CertID".into(),
            })?;

        let status = self.resolve_status(&cert_id).await?;

        self.encode_response(cert_id, status, nonce)
    }

    async fn resolve_status(&self, cert_id: &CertId) -> CaResult<CertStatus> {
        let unknown = CertStatus::new(CertStatusCode::Unknown, None);

        let issuer = match self
            .lookup
            .find_issuer(&cert_id.issuer_name_hash, &cert_id.issuer_key_hash)
            .await?
        {
            Some(c) => c,
            None => {
                debug!("OCSP CertID matches no known issuer");
                return Ok(unknown);
            }
        };

        // Serials are stored as fixed-width hex; the DER integer in
        // the request drops leading zero octets, so pad it back.
        let serial_hex = format!("{:0>32}", hex::encode_upper(&cert_id.serial_num));
        let cert = match self
            .certs
            .get_by_parent_and_serial(issuer.id, &serial_hex)
            .await?
        {
            Some(c) => c,
            None => return Ok(unknown),
        };

        if !cert.is_within_validity(Utc::now()) && !cert.revoked {
            return Ok(unknown);
        }

        if cert.revoked {
            let revoked_at = cert.revoked_at.unwrap_or(cert.created_at);
            let reason = cert
                .revocation_reason
                .unwrap_or(RevocationReason::Unspecified);
            return Ok(CertStatus::new(
                CertStatusCode::Revoked,
                Some(RevokedInfo::new(
                    to_generalized_time(revoked_at)?,
                    Some(crl_reason(reason)),
                )),
            ));
        }

        Ok(CertStatus::new(CertStatusCode::Good, None))
    }

    fn encode_response(
        &self,
        cert_id: CertId,
        status: CertStatus,
        nonce: Option<Vec<u8>>,
    ) -> CaResult<Vec<u8>> {
        let now = Utc::now();

        let one_resp = OneResp {
            cid: cert_id,
            cert_status: status,
            this_update: to_generalized_time(now)?,
            next_update: Some(to_generalized_time(
                now + Duration::hours(self.validity_hours),
            )?),
            one_resp_ext: None,
        };

        // The `id` is the crate-internal index for the nonce extension
        // (`ocsp::oid::OCSP_EXT_NONCE_ID`, not exported); encoding only
        // uses `ext`.
        let resp_ext = nonce.map(|nonce| {
            vec![OcspExtI {
                id: 0,
                ext: OcspExt::Nonce { nonce },
            }]
        });

        let key_der = self
            .responder_cert
            .public_key()
            .and_then(|k| k.rsa())
            .and_then(|r| r.public_key_to_der_pkcs1())
            .map_err(|e| CaError::Crypto(e.to_string()))?;
        let key_hash = openssl::hash::hash(MessageDigest::sha1(), &key_der)
            .map_err(|e| CaError::Crypto(e.to_string()))?;
        let responder_id = ResponderId::new_key_hash(&key_hash);

        let resp_data = ResponseData::new(
            responder_id,
            to_generalized_time(now)?,
            vec![one_resp],
            resp_ext,
        );

        let tbs_der = resp_data
            .to_der()
            .map_err(|e| CaError::Crypto(format!("OCSP tbsResponseData encoding failed: {e}")))?;

        let mut signer = Signer::new(MessageDigest::sha256(), &self.responder_key)
            .map_err(|e| CaError::Crypto(e.to_string()))?;
        signer
            .update(&tbs_der)
            .map_err(|e| CaError::Crypto(e.to_string()))?;
        let signature = signer
            .sign_to_vec()
            .map_err(|e| CaError::Crypto(e.to_string()))?;

        // ocsp 0.4 cannot DER-encode embedded certificates
        // (`BasicResponse::to_der` is unimplemented for `certs: Some`),
        // so the responder certificate stays out of the response.
        let _responder_cert_der = self
            .responder_cert
            .to_der()
            .map_err(|e| CaError::Crypto(e.to_string()))?;

        let algo = Oid::new_from_dot(SHA256_WITH_RSA_DOT)
            .map_err(|e| CaError::Crypto(format!("OCSP signature OID: {e}")))?;
        let basic = BasicResponse::new(resp_data, algo, signature, None);

        let basic_oid = Oid::new_from_dot(ocsp::oid::OCSP_RESPONSE_BASIC_DOT)
            .map_err(|e| CaError::Crypto(format!("OCSP response type OID: {e}")))?;
        let resp_bytes = ResponseBytes::new_basic(basic_oid, basic)
            .map_err(|e| CaError::Crypto(format!("OCSP responseBytes encoding failed: {e}")))?;

        OcspResponse::new_success(resp_bytes)
            .to_der()
            .map_err(|e| CaError::Crypto(format!("OCSP encoding failed: {e}")))
    }
}
