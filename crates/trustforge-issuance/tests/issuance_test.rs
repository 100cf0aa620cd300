//! Integration tests for root and intermediate issuance using
//! in-memory SurrealDB and a temporary keystore directory.

use std::path::Path;

use chrono::Utc;
use openssl::hash::MessageDigest;
use openssl::sign::{Signer, Verifier};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tempfile::TempDir;
use trustforge_core::error::CaError;
use trustforge_core::models::certificate::CertificateKind;
use trustforge_core::models::operator::NewOperator;
use trustforge_core::repository::{
    CertificateRepository, ChainAssignmentRepository, CustodyRepository, OperatorRepository,
};
use trustforge_core::models::assignment::NewChainAssignment;
use trustforge_db::repository::{
    SurrealCertificateRepository, SurrealChainAssignmentRepository, SurrealCustodyRepository,
    SurrealOperatorRepository, SurrealWrapKeyRepository,
};
use trustforge_issuance::{CreateRootInput, IssuanceConfig, IssuanceService, IssueIntermediateInput};
use trustforge_vault::{KeyVault, LocalKeyProtector, VaultConfig};
use trustforge_x509::{DistinguishedName, KeyUsageFlags};
use uuid::Uuid;

type Issuance = IssuanceService<
    SurrealCertificateRepository<Db>,
    SurrealChainAssignmentRepository<Db>,
    SurrealOperatorRepository<Db>,
    SurrealCustodyRepository<Db>,
    SurrealWrapKeyRepository<Db>,
    LocalKeyProtector,
>;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> (Surreal<Db>, TempDir) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    trustforge_db::run_migrations(&db).await.unwrap();
    (db, TempDir::new().unwrap())
}

fn vault(
    db: &Surreal<Db>,
    dir: &Path,
) -> KeyVault<SurrealCustodyRepository<Db>, SurrealWrapKeyRepository<Db>, LocalKeyProtector> {
    KeyVault::new(
        SurrealCustodyRepository::new(db.clone()),
        SurrealWrapKeyRepository::new(db.clone()),
        LocalKeyProtector::new([7u8; 32]),
        VaultConfig::new(dir),
    )
}

fn service(db: &Surreal<Db>, dir: &Path) -> Issuance {
    IssuanceService::new(
        SurrealCertificateRepository::new(db.clone()),
        SurrealChainAssignmentRepository::new(db.clone()),
        SurrealOperatorRepository::new(db.clone()),
        vault(db, dir),
        IssuanceConfig::default(),
    )
}

async fn create_operator(db: &Surreal<Db>, name: &str, org: &str, is_admin: bool) -> Uuid {
    SurrealOperatorRepository::new(db.clone())
        .create(NewOperator {
            name: name.into(),
            organization: org.into(),
            is_admin,
        })
        .await
        .unwrap()
        .id
}

fn root_input(cn: &str, path_len: Option<u32>) -> CreateRootInput {
    CreateRootInput {
        subject: DistinguishedName::new(cn),
        validity_days: 365,
        path_len,
        key_usage: KeyUsageFlags::ca_default(),
    }
}

fn inter_input(
    issuer: Uuid,
    cn: &str,
    path_len: Option<u32>,
    target: Uuid,
    acting: Uuid,
    acting_is_admin: bool,
) -> IssueIntermediateInput {
    IssueIntermediateInput {
        issuer_certificate_id: issuer,
        subject: DistinguishedName::new(cn),
        validity_days: 180,
        path_len,
        key_usage: KeyUsageFlags::ca_default(),
        target_operator_id: target,
        acting_operator_id: acting,
        acting_is_admin,
    }
}

#[tokio::test]
async fn admin_creates_root_and_issues_intermediate() {
    let (db, dir) = setup().await;
    let svc = service(&db, dir.path());
    let admin = create_operator(&db, "admin", "ACME", true).await;
    let alice = create_operator(&db, "alice", "ACME", false).await;

    let root = svc.create_root(root_input("ACME Root", Some(1)), admin).await.unwrap();
    assert_eq!(root.kind, CertificateKind::Root);
    assert_eq!(root.chain_root_id, root.id);
    assert!(root.parent_id.is_none());
    assert!(root.not_before < Utc::now());
    assert_eq!(root.serial_hex.len(), 32);

    let inter = svc
        .issue_intermediate(inter_input(root.id, "ACME Issuing CA", Some(0), alice, admin, true))
        .await
        .unwrap();
    assert_eq!(inter.kind, CertificateKind::Intermediate);
    assert_eq!(inter.parent_id, Some(root.id));
    assert_eq!(inter.chain_root_id, root.id);
    assert_eq!(inter.owner_id, alice);
    // Chain PEM carries the intermediate plus the root.
    assert_eq!(inter.chain_pem.matches("BEGIN CERTIFICATE").count(), 2);

    // Custody and assignment landed with the target operator.
    let custody = SurrealCustodyRepository::new(db.clone())
        .get_active_for_certificate(inter.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(custody.owner_id, alice);

    let assignment = SurrealChainAssignmentRepository::new(db.clone())
        .get_active(alice, root.id)
        .await
        .unwrap();
    assert!(assignment.is_some());
}

#[tokio::test]
async fn key_custody_round_trip_signs_and_verifies() {
    let (db, dir) = setup().await;
    let svc = service(&db, dir.path());
    let admin = create_operator(&db, "admin", "ACME", true).await;

    let root = svc.create_root(root_input("ACME Root", None), admin).await.unwrap();

    let custody = SurrealCustodyRepository::new(db.clone())
        .get_active_for_certificate(root.id)
        .await
        .unwrap()
        .unwrap();
    let unlocked = vault(&db, dir.path()).load(&custody).await.unwrap();

    // The unlocked key must match the stored certificate's public key.
    let message = b"custody round trip";
    let mut signer = Signer::new(MessageDigest::sha256(), &unlocked.key).unwrap();
    signer.update(message).unwrap();
    let signature = signer.sign_to_vec().unwrap();

    let public = unlocked.cert.public_key().unwrap();
    let mut verifier = Verifier::new(MessageDigest::sha256(), &public).unwrap();
    verifier.update(message).unwrap();
    assert!(verifier.verify(&signature).unwrap());
}

#[tokio::test]
async fn path_len_zero_blocks_further_delegation() {
    let (db, dir) = setup().await;
    let svc = service(&db, dir.path());
    let admin = create_operator(&db, "admin", "ACME", true).await;
    let alice = create_operator(&db, "alice", "ACME", false).await;

    let root = svc.create_root(root_input("ACME Root", Some(1)), admin).await.unwrap();
    let i1 = svc
        .issue_intermediate(inter_input(root.id, "I1", Some(0), alice, admin, true))
        .await
        .unwrap();

    // Alice holds I1's key and an assignment, but I1's own budget is
    // exhausted.
    let result = svc
        .issue_intermediate(inter_input(i1.id, "I2", None, alice, alice, false))
        .await;
    assert!(matches!(result, Err(CaError::PathLenBlocksCa)));
}

#[tokio::test]
async fn not_after_is_clamped_to_issuer() {
    let (db, dir) = setup().await;
    let svc = service(&db, dir.path());
    let admin = create_operator(&db, "admin", "ACME", true).await;
    let alice = create_operator(&db, "alice", "ACME", false).await;

    let root = svc.create_root(root_input("ACME Root", Some(1)), admin).await.unwrap();

    let mut input = inter_input(root.id, "Long-lived CA", Some(0), alice, admin, true);
    input.validity_days = 10_000;
    let inter = svc.issue_intermediate(input).await.unwrap();

    assert!(inter.not_after <= root.not_after);
    assert_eq!(inter.not_after, root.not_after);
}

#[tokio::test]
async fn non_admin_cannot_issue_under_root() {
    let (db, dir) = setup().await;
    let svc = service(&db, dir.path());
    let admin = create_operator(&db, "admin", "ACME", true).await;
    let alice = create_operator(&db, "alice", "ACME", false).await;

    let root = svc.create_root(root_input("ACME Root", Some(1)), admin).await.unwrap();

    let result = svc
        .issue_intermediate(inter_input(root.id, "Rogue CA", None, alice, alice, false))
        .await;
    assert!(matches!(result, Err(CaError::Unauthorized { .. })));
}

#[tokio::test]
async fn non_admin_needs_active_chain_assignment() {
    let (db, dir) = setup().await;
    let svc = service(&db, dir.path());
    let admin = create_operator(&db, "admin", "ACME", true).await;
    let alice = create_operator(&db, "alice", "ACME", false).await;
    let mallory = create_operator(&db, "mallory", "ACME", false).await;

    let root = svc.create_root(root_input("ACME Root", Some(2)), admin).await.unwrap();
    let i1 = svc
        .issue_intermediate(inter_input(root.id, "I1", Some(1), alice, admin, true))
        .await
        .unwrap();

    // Mallory has no assignment for this chain at all.
    let result = svc
        .issue_intermediate(inter_input(i1.id, "I2", None, mallory, mallory, false))
        .await;
    assert!(matches!(result, Err(CaError::Unauthorized { .. })));
}

#[tokio::test]
async fn cross_operator_issuance_requires_shared_organization() {
    let (db, dir) = setup().await;
    let svc = service(&db, dir.path());
    let admin = create_operator(&db, "admin", "ACME", true).await;
    let alice = create_operator(&db, "alice", "ACME", false).await;
    let carol = create_operator(&db, "carol", "ACME", false).await;
    let eve = create_operator(&db, "eve", "Umbrella", false).await;

    let root = svc.create_root(root_input("ACME Root", Some(2)), admin).await.unwrap();
    let i1 = svc
        .issue_intermediate(inter_input(root.id, "I1", Some(1), alice, admin, true))
        .await
        .unwrap();

    // Different organization: rejected.
    let result = svc
        .issue_intermediate(inter_input(i1.id, "Eve CA", None, eve, alice, false))
        .await;
    assert!(matches!(result, Err(CaError::Unauthorized { .. })));

    // Same organization: allowed.
    let issued = svc
        .issue_intermediate(inter_input(i1.id, "Carol CA", None, carol, alice, false))
        .await
        .unwrap();
    assert_eq!(issued.owner_id, carol);
}

#[tokio::test]
async fn non_owner_cannot_borrow_issuer_key() {
    let (db, dir) = setup().await;
    let svc = service(&db, dir.path());
    let admin = create_operator(&db, "admin", "ACME", true).await;
    let alice = create_operator(&db, "alice", "ACME", false).await;
    let bob = create_operator(&db, "bob", "ACME", false).await;

    let root = svc.create_root(root_input("ACME Root", Some(2)), admin).await.unwrap();
    let i1 = svc
        .issue_intermediate(inter_input(root.id, "I1", Some(1), alice, admin, true))
        .await
        .unwrap();

    // Bob shares the chain by assignment but does not hold I1's key.
    SurrealChainAssignmentRepository::new(db.clone())
        .create(NewChainAssignment {
            operator_id: bob,
            chain_root_id: root.id,
            assigned_by: Some(admin),
        })
        .await
        .unwrap();

    let result = svc
        .issue_intermediate(inter_input(i1.id, "Bob CA", None, bob, bob, false))
        .await;
    assert!(matches!(result, Err(CaError::Unauthorized { .. })));
}

#[tokio::test]
async fn revoked_issuer_is_rejected_first() {
    let (db, dir) = setup().await;
    let svc = service(&db, dir.path());
    let admin = create_operator(&db, "admin", "ACME", true).await;
    let alice = create_operator(&db, "alice", "ACME", false).await;

    let root = svc.create_root(root_input("ACME Root", Some(2)), admin).await.unwrap();
    let i1 = svc
        .issue_intermediate(inter_input(root.id, "I1", Some(1), alice, admin, true))
        .await
        .unwrap();

    SurrealCertificateRepository::new(db.clone())
        .mark_revoked(
            i1.id,
            Utc::now(),
            trustforge_core::models::certificate::RevocationReason::CaCompromise,
            None,
        )
        .await
        .unwrap();

    let result = svc
        .issue_intermediate(inter_input(i1.id, "I2", None, alice, alice, false))
        .await;
    assert!(matches!(result, Err(CaError::IssuerRevoked)));
}

#[tokio::test]
async fn operator_listing_applies_assignment_and_ownership() {
    let (db, dir) = setup().await;
    let svc = service(&db, dir.path());
    let admin = create_operator(&db, "admin", "ACME", true).await;
    let alice = create_operator(&db, "alice", "ACME", false).await;
    let bob = create_operator(&db, "bob", "ACME", false).await;

    let root = svc.create_root(root_input("ACME Root", Some(2)), admin).await.unwrap();
    let i1 = svc
        .issue_intermediate(inter_input(root.id, "I1", Some(1), alice, admin, true))
        .await
        .unwrap();

    // Bob gets an assignment to the same chain but owns no key there.
    SurrealChainAssignmentRepository::new(db.clone())
        .create(NewChainAssignment {
            operator_id: bob,
            chain_root_id: root.id,
            assigned_by: Some(admin),
        })
        .await
        .unwrap();

    let alice_cas = svc.operator_ca_certificates(alice).await.unwrap();
    assert_eq!(alice_cas.len(), 1);
    assert_eq!(alice_cas[0].id, i1.id);
    // Roots never appear in the operator view.
    assert!(alice_cas.iter().all(|c| c.kind == CertificateKind::Intermediate));

    // Assignment without key custody yields nothing.
    let bob_cas = svc.operator_ca_certificates(bob).await.unwrap();
    assert!(bob_cas.is_empty());

    // The administrator view sees every CA certificate.
    let all = svc.all_ca_certificates().await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn rejects_non_positive_validity() {
    let (db, dir) = setup().await;
    let svc = service(&db, dir.path());
    let admin = create_operator(&db, "admin", "ACME", true).await;

    let mut input = root_input("ACME Root", None);
    input.validity_days = 0;
    let result = svc.create_root(input, admin).await;
    assert!(matches!(result, Err(CaError::Validation { .. })));
}
