//! TRUSTFORGE issuance — CA lifecycle orchestration.
//!
//! Services generic over the repository traits: chain verification,
//! issuer eligibility, root and intermediate issuance, CSR-based leaf
//! signing, revocation, and an RFC 6960 OCSP responder.

pub mod chain;
pub mod config;
pub mod csr;
pub mod eligibility;
pub mod issuer;
pub mod ocsp;

pub use chain::ChainVerifier;
pub use config::{CsrPolicy, IssuanceConfig, OcspResponderConfig, ValidityPolicy};
pub use csr::{CaSummary, CsrSigningService, SignCsrInput, SignedCsr};
pub use issuer::{CreateRootInput, IssuanceService, IssueIntermediateInput};
pub use ocsp::{CaTableLookup, IssuerLookup, OcspResponder};
