//! SurrealDB repository implementations.

mod assignment;
mod certificate;
mod custody;
mod operator;
mod wrap_key;

pub use assignment::SurrealChainAssignmentRepository;
pub use certificate::SurrealCertificateRepository;
pub use custody::SurrealCustodyRepository;
pub use operator::SurrealOperatorRepository;
pub use wrap_key::SurrealWrapKeyRepository;
